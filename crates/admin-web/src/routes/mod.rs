//! Route handlers for the admin service.

pub mod health;
pub mod kidoos;
pub mod stats;
pub mod tags;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health))
        // API endpoints
        .route("/api/stats", get(stats::stats_api))
        .route("/api/kidoos/:id", get(kidoos::kidoo_details_api))
        .route("/api/users/:id/kidoos", get(kidoos::user_kidoos_api))
        .route("/api/tags/:tag_id", get(tags::tag_api))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use kidoo_database::{
        dream_schedule, file, kidoo, kidoo_config_dream, tag, user, Database, DreamSettings,
        NewFile, NewKidoo, NewTag, NewUser, ScheduleEntry, ScheduleKind, TagType,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    async fn test_app() -> (Router, Database) {
        let db = Database::connect_in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let app = router().with_state(AppState::new(db.clone()));
        (app, db)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// One user owning one device with a dream config, a bedtime and a tag
    /// holding two files.
    async fn seed(db: &Database) -> (String, String) {
        let pool = db.pool();
        let owner = user::create_user(
            pool,
            &NewUser {
                email: "parent@x.com".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let device = kidoo::create_kidoo(
            pool,
            &NewKidoo {
                name: "Bedroom".to_string(),
                model: "dream".to_string(),
                device_id: "dev-1".to_string(),
                user_id: Some(owner.id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let dream =
            kidoo_config_dream::create_config_dream(pool, &device.id, &DreamSettings::default())
                .await
                .unwrap();
        dream_schedule::create_schedule(
            pool,
            ScheduleKind::Bedtime,
            &dream.id,
            &ScheduleEntry::new("MON", 21, 30),
        )
        .await
        .unwrap();

        let nfc = tag::create_tag(
            pool,
            &NewTag {
                tag_id: Some("04:A2:19".to_string()),
                tag_type: Some(TagType::Story),
                kidoo_id: device.id.clone(),
                user_id: owner.id.clone(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        for (name, size) in [("one.mp3", 100), ("two.mp3", 300)] {
            file::create_file(
                pool,
                &NewFile {
                    url: format!("https://cdn.example.com/{name}"),
                    path: name.to_string(),
                    file_name: name.to_string(),
                    original_name: name.to_string(),
                    size,
                    mime_type: "audio/mpeg".to_string(),
                    tag_id: nfc.id.clone(),
                    user_id: owner.id.clone(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }

        (owner.id, device.id)
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _db) = test_app().await;
        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_stats() {
        let (app, db) = test_app().await;
        seed(&db).await;

        let (status, body) = get_json(app, "/api/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_count"], 1);
        assert_eq!(body["kidoo_count"], 1);
        assert_eq!(body["connected_kidoo_count"], 0);
        assert_eq!(body["file_count"], 2);
        assert_eq!(body["file_size"]["sum"], 400);
        assert_eq!(body["tags_by_type"][0]["type"], "STORY");
        assert_eq!(body["tags_by_type"][0]["_count"], 1);
    }

    #[tokio::test]
    async fn test_kidoo_details() {
        let (app, db) = test_app().await;
        let (_, device_id) = seed(&db).await;

        let (status, body) = get_json(app.clone(), &format!("/api/kidoos/{device_id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deviceId"], "dev-1");
        assert!(body["configBasic"].is_null());
        let bedtimes = body["configDream"]["bedtimeSchedules"].as_array().unwrap();
        assert_eq!(bedtimes.len(), 1);
        assert_eq!(bedtimes[0]["weekday"], "MON");

        let (status, body) = get_json(app, "/api/kidoos/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn test_user_kidoos() {
        let (app, db) = test_app().await;
        let (user_id, _) = seed(&db).await;

        let (status, body) = get_json(app.clone(), &format!("/api/users/{user_id}/kidoos")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, _) = get_json(app, "/api/users/nobody/kidoos").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tag_lookup() {
        let (app, db) = test_app().await;
        seed(&db).await;

        let (status, body) = get_json(app.clone(), "/api/tags/04:A2:19").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "STORY");
        let files = body["multimediaFiles"].as_array().unwrap();
        assert_eq!(files[0]["fileName"], "one.mp3");
        assert_eq!(files[1]["fileName"], "two.mp3");

        let (status, _) = get_json(app, "/api/tags/unknown").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

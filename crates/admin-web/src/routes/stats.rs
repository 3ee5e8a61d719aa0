//! Dashboard statistics.

use axum::extract::State;
use axum::Json;
use kidoo_database::file::{self, FileNumericField};
use kidoo_database::tag::{self, TagGroup, TagGroupField};
use kidoo_database::{kidoo, user, Aggregate, GroupBy, OrderBy};
use serde::Serialize;

use crate::error::Result;
use crate::state::AppState;

/// Dashboard statistics.
#[derive(Clone, Serialize)]
pub struct Stats {
    pub user_count: i64,
    pub kidoo_count: i64,
    pub connected_kidoo_count: i64,
    pub tag_count: i64,
    pub file_count: i64,
    pub tags_by_type: Vec<TagGroup>,
    pub file_size: Aggregate,
}

/// Get dashboard statistics as JSON.
pub async fn stats_api(State(state): State<AppState>) -> Result<Json<Stats>> {
    let stats = get_stats(&state).await?;
    Ok(Json(stats))
}

/// Fetch statistics from the database.
async fn get_stats(state: &AppState) -> Result<Stats> {
    let pool = state.db.pool();

    let by_type =
        GroupBy::new(vec![TagGroupField::Type]).order_by(OrderBy::asc(TagGroupField::Type));

    Ok(Stats {
        user_count: user::count_users(pool).await?,
        kidoo_count: kidoo::count_kidoos(pool).await?,
        connected_kidoo_count: kidoo::count_connected_kidoos(pool).await?,
        tag_count: tag::count_tags(pool).await?,
        file_count: file::count_files(pool).await?,
        tags_by_type: tag::group_by(pool, &by_type).await?,
        file_size: file::aggregate(pool, FileNumericField::Size, None).await?,
    })
}

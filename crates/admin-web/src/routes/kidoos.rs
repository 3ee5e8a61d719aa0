//! Device lookups.

use axum::extract::{Path, State};
use axum::Json;
use kidoo_database::{kidoo, Kidoo, KidooDetails};

use crate::error::Result;
use crate::state::AppState;

/// A device with its configuration and schedules.
pub async fn kidoo_details_api(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<KidooDetails>> {
    let details = kidoo::get_kidoo_details(state.db.pool(), &id).await?;
    Ok(Json(details))
}

/// Devices owned by a user.
///
/// Unknown users yield 404 rather than an empty list.
pub async fn user_kidoos_api(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Kidoo>>> {
    let pool = state.db.pool();
    kidoo_database::user::get_user(pool, &user_id).await?;
    let kidoos = kidoo::list_kidoos_by_user(pool, &user_id).await?;
    Ok(Json(kidoos))
}

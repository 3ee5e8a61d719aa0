//! NFC tag lookups.

use axum::extract::{Path, State};
use axum::Json;
use kidoo_database::{tag, TagWithFiles};

use crate::error::Result;
use crate::state::AppState;

/// Resolve a scanned tag id to the tag and its playable files.
pub async fn tag_api(
    State(state): State<AppState>,
    Path(tag_id): Path<String>,
) -> Result<Json<TagWithFiles>> {
    let tag = tag::get_tag_with_files(state.db.pool(), &tag_id).await?;
    Ok(Json(tag))
}

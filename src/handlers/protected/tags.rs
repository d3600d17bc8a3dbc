use axum::extract::{Extension, Path, State};

use crate::app::AppState;
use crate::auth::Identity;
use crate::middleware::{ApiResponse, ApiResult, ValidJson};
use crate::models::{Tag, TagCreate, TagUpdate};

/// POST /api/tags/
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ValidJson(body): ValidJson<TagCreate>,
) -> ApiResult<Tag> {
    let tag = state.tags.create(&identity.uid, body).await?;
    Ok(ApiResponse::created(tag).with_message("Tag created successfully"))
}

/// GET /api/tags/
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Vec<Tag>> {
    let tags = state.tags.list(&identity.uid).await?;
    let message = format!("Retrieved {} tags", tags.len());
    Ok(ApiResponse::success(tags).with_message(message))
}

/// GET /api/tags/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(tag_id): Path<String>,
) -> ApiResult<Tag> {
    let tag = state.tags.get(&identity.uid, &tag_id).await?;
    Ok(ApiResponse::success(tag).with_message("Tag retrieved successfully"))
}

/// PUT /api/tags/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(tag_id): Path<String>,
    ValidJson(body): ValidJson<TagUpdate>,
) -> ApiResult<Tag> {
    let tag = state.tags.update(&identity.uid, &tag_id, body).await?;
    Ok(ApiResponse::success(tag).with_message("Tag updated successfully"))
}

/// DELETE /api/tags/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(tag_id): Path<String>,
) -> ApiResult<()> {
    state.tags.delete(&identity.uid, &tag_id).await?;
    Ok(ApiResponse::empty("Tag deleted successfully"))
}

use axum::extract::{Extension, Path, State};

use crate::app::AppState;
use crate::auth::Identity;
use crate::middleware::{ApiResponse, ApiResult, ValidJson};
use crate::models::{Note, NoteCreate, NoteUpdate};

/// POST /api/notes/ - Create a note owned by the caller
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ValidJson(body): ValidJson<NoteCreate>,
) -> ApiResult<Note> {
    let note = state.notes.create(&identity.uid, body).await?;
    Ok(ApiResponse::created(note).with_message("Note created successfully"))
}

/// GET /api/notes/ - List the caller's notes
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Vec<Note>> {
    let notes = state.notes.list(&identity.uid).await?;
    let message = format!("Retrieved {} notes", notes.len());
    Ok(ApiResponse::success(notes).with_message(message))
}

/// GET /api/notes/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(note_id): Path<String>,
) -> ApiResult<Note> {
    let note = state.notes.get(&identity.uid, &note_id).await?;
    Ok(ApiResponse::success(note).with_message("Note retrieved successfully"))
}

/// PUT /api/notes/:id - Partial update; only the owner can update
pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(note_id): Path<String>,
    ValidJson(body): ValidJson<NoteUpdate>,
) -> ApiResult<Note> {
    let note = state.notes.update(&identity.uid, &note_id, body).await?;
    Ok(ApiResponse::success(note).with_message("Note updated successfully"))
}

/// DELETE /api/notes/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(note_id): Path<String>,
) -> ApiResult<()> {
    state.notes.delete(&identity.uid, &note_id).await?;
    Ok(ApiResponse::empty("Note deleted successfully"))
}

/// PATCH /api/notes/:id/favorite - Flip the favorite flag
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(note_id): Path<String>,
) -> ApiResult<Note> {
    let note = state.notes.toggle_favorite(&identity.uid, &note_id).await?;
    let message = if note.is_favorite {
        "Note added to favorites"
    } else {
        "Note removed from favorites"
    };
    Ok(ApiResponse::success(note).with_message(message))
}

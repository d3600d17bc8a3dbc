use axum::extract::Extension;
use serde::Serialize;

use crate::auth::Identity;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Serialize)]
pub struct VerifiedUid {
    pub uid: String,
}

/// GET /api/auth/me - Profile claims of the authenticated caller
pub async fn me(Extension(identity): Extension<Identity>) -> ApiResult<Identity> {
    Ok(ApiResponse::success(identity).with_message("User information retrieved successfully"))
}

/// GET /api/auth/verify - Confirms the bearer token is valid
pub async fn verify(Extension(identity): Extension<Identity>) -> ApiResult<VerifiedUid> {
    Ok(ApiResponse::success(VerifiedUid { uid: identity.uid }).with_message("Token is valid"))
}

use axum::Json;
use utoipa::OpenApi;

use crate::api::handlers::{Avatar, User};
use crate::errors::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "errs demo service",
        version = "0.1.0",
        description = "Small user directory that renders its failures through the errs error layer. Every non-2xx response carries an ErrorResponse body."
    ),
    paths(
        crate::api::handlers::health,
        crate::api::handlers::get_user,
        crate::api::handlers::get_avatar,
    ),
    components(
        schemas(
            ErrorResponse,
            User,
            Avatar,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "User lookup endpoints"),
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI document as JSON
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

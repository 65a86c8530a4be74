use axum::response::{IntoResponse, Json, Response};

use crate::models::EndpointResponse;

/// Handler responses go out as-is: their status code and their body, no envelope
impl IntoResponse for EndpointResponse {
    fn into_response(self) -> Response {
        (self.code, Json(self.body)).into_response()
    }
}

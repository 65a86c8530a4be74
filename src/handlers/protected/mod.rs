// Endpoints that only run behind the authorization guard
pub mod concepts;
pub mod engagement;

use axum::http::StatusCode;

use crate::handlers::lifecycle::{unclassified, EndpointError};
use crate::models::EndpointResponse;

pub use concepts::{CreateConcept, LinkConcepts};
pub use engagement::{CreateComment, FollowAccount, LikeConcept, UnfollowAccount, UnlikeConcept};

fn conflict_or_not_found(err: EndpointError) -> EndpointResponse {
    match err {
        EndpointError::Conflict(msg) => EndpointResponse::error(StatusCode::FORBIDDEN, msg),
        EndpointError::NotFound(msg) => EndpointResponse::error(StatusCode::NOT_FOUND, msg),
        other => unclassified(other),
    }
}

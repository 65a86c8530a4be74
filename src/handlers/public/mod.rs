// Endpoints that run without an authorization token
pub mod accounts;
pub mod concepts;
pub mod engagement;
pub mod health;

pub use accounts::{Authenticate, CreateAccount, ProfileRetrieval};
pub use concepts::{ConceptRetrieval, LineageRetrieval};
pub use engagement::{CommentThread, FollowStatus, LikeStatus};
pub use health::HealthCheck;

pub mod auth;
pub mod response;

pub use auth::{PresentedToken, PRESENTER_HEADER};

pub mod account;
pub mod concept;
pub mod engagement;

pub use account::{AccountCreated, AuthenticationInfo, ProfileRow};
pub use concept::{ConceptCreated, ConceptRow, LinkRow};
pub use engagement::{CommentCreated, CommentRow, FollowRow, LikeRow};

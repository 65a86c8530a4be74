pub mod artifacts;
pub mod payloads;
pub mod responses;

pub use artifacts::*;
pub use payloads::{
    Acting, Authorized, AuthorizedRequest, CommentPayload, CommentThreadRequest, ConceptDataPayload,
    ConceptLinkPayload, ConceptRequest, CredentialSet, FollowPayload, LikePayload, ProfileRequest,
};
pub use responses::{EndpointResponse, ErrorMessage, InformationalMessage, ResponseBody};

use axum::http::StatusCode;
use serde::Serialize;

use crate::models::artifacts::{
    AuthorizationToken, CommentRecord, CommentView, ConceptLineage, ConceptLinkRecord,
    ConceptSimpleView, ConceptView, ProfileView, RelationStatus,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InformationalMessage {
    pub msg: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorMessage {
    pub err_msg: String,
}

/// Everything a handler may put in a response body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Message(InformationalMessage),
    Error(ErrorMessage),
    Token(AuthorizationToken),
    Profile(ProfileView),
    ConceptSimple(ConceptSimpleView),
    Concept(ConceptView),
    Link(ConceptLinkRecord),
    Lineage(ConceptLineage),
    Comment(CommentRecord),
    Comments(Vec<CommentView>),
    Relation(RelationStatus),
}

/// The single artifact a handler produces once it finishes
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointResponse {
    pub code: StatusCode,
    pub body: ResponseBody,
}

impl EndpointResponse {
    pub fn new(code: StatusCode, body: ResponseBody) -> Self {
        Self { code, body }
    }

    pub fn message(code: StatusCode, msg: impl Into<String>) -> Self {
        Self::new(code, ResponseBody::Message(InformationalMessage { msg: msg.into() }))
    }

    pub fn error(code: StatusCode, err_msg: impl Into<String>) -> Self {
        Self::new(code, ResponseBody::Error(ErrorMessage { err_msg: err_msg.into() }))
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Message text for informational and error bodies
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Message(m) => Some(&m.msg),
            ResponseBody::Error(e) => Some(&e.err_msg),
            _ => None,
        }
    }
}

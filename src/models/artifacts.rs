use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lineage::LineageNode;

/// Bearer token plus the identity the caller claims to hold it for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationToken {
    pub token: String,
    pub presenter: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileView {
    pub preferred_name: String,
    pub biography: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptSimpleView {
    pub identifier: String,
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptView {
    pub identifier: String,
    pub author: String,
    pub title: String,
    pub description: String,
    pub diagram: Value,
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptLinkRecord {
    pub ancestor: String,
    pub descendant: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptLineage {
    pub node_count: usize,
    pub tree: LineageNode<ConceptSimpleView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub comment_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    pub comment_id: i64,
    pub comment_by: String,
    pub free_text: String,
    pub response_to: Option<i64>,
    pub created_at: String,
}

/// Whether a like or follow relation is present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationStatus {
    pub exists: bool,
}

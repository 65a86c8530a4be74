use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::models::artifacts::AuthorizationToken;

/// Requests that carry a token for the authorization guard
pub trait Authorized {
    fn auth_token(&self) -> &AuthorizationToken;

    /// Account the request acts on behalf of, which must be the token's presenter
    fn acting_account(&self) -> Option<&str>;
}

/// Payloads that name the account performing the action
pub trait Acting {
    fn acting_account(&self) -> Option<&str>;
}

/// A payload paired with the token presented for it
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizedRequest<T> {
    pub auth_token: AuthorizationToken,
    pub payload: T,
}

impl<T> AuthorizedRequest<T> {
    pub fn new(auth_token: AuthorizationToken, payload: T) -> Self {
        Self { auth_token, payload }
    }
}

impl<T: Acting> Authorized for AuthorizedRequest<T> {
    fn auth_token(&self) -> &AuthorizationToken {
        &self.auth_token
    }

    fn acting_account(&self) -> Option<&str> {
        self.payload.acting_account()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSet {
    pub display_name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRequest {
    pub display_name: String,
}

/// Identifies a concept by its two key parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptRequest {
    pub author: String,
    pub title: String,
}

impl ConceptRequest {
    pub fn identifier(&self) -> String {
        format!("{}/{}", self.author, self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptDataPayload {
    pub author: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub diagram: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptLinkPayload {
    pub ancestor: String,
    pub descendant: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikePayload {
    pub user_liking: String,
    pub concept_liked: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowPayload {
    pub follower: String,
    pub followee: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentPayload {
    pub comment_author: String,
    pub comment_on: String,
    pub comment_text: String,
    #[serde(default)]
    pub response_to: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentThreadRequest {
    pub concept_id: String,
    pub response_to: Option<i64>,
}

impl Acting for ConceptDataPayload {
    fn acting_account(&self) -> Option<&str> {
        Some(&self.author)
    }
}

// Any verified account may link two existing concepts
impl Acting for ConceptLinkPayload {
    fn acting_account(&self) -> Option<&str> {
        None
    }
}

impl Acting for LikePayload {
    fn acting_account(&self) -> Option<&str> {
        Some(&self.user_liking)
    }
}

impl Acting for FollowPayload {
    fn acting_account(&self) -> Option<&str> {
        Some(&self.follower)
    }
}

impl Acting for CommentPayload {
    fn acting_account(&self) -> Option<&str> {
        Some(&self.comment_author)
    }
}

static DISPLAY_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w{3,64}$").expect("display name pattern"));
static PASSWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w{8,32}$").expect("password pattern"));

fn field_error(field: &str, message: &str) -> ApiError {
    let mut field_errors = HashMap::new();
    field_errors.insert(field.to_string(), message.to_string());
    ApiError::validation_error("Invalid request body", Some(field_errors))
}

/// Display names are 3-64 word characters
pub fn validate_display_name(field: &str, value: &str) -> Result<(), ApiError> {
    if DISPLAY_NAME.is_match(value) {
        Ok(())
    } else {
        Err(field_error(field, "must be 3 to 64 letters, digits or underscores"))
    }
}

impl CredentialSet {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_display_name("display_name", &self.display_name)?;
        if !PASSWORD.is_match(&self.password) {
            return Err(field_error("password", "must be 8 to 32 letters, digits or underscores"));
        }
        Ok(())
    }
}

impl ConceptDataPayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_display_name("author", &self.author)?;
        let title = self.title.trim();
        if title.is_empty() || self.title.chars().count() > 128 || self.title.contains('/') {
            return Err(field_error("title", "must be 1 to 128 characters and may not contain '/'"));
        }
        Ok(())
    }
}

impl CommentPayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_display_name("comment_author", &self.comment_author)?;
        if self.comment_text.trim().is_empty() {
            return Err(field_error("comment_text", "must not be empty"));
        }
        Ok(())
    }
}

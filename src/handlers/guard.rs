// handlers/guard.rs - token check wrapped around a lifecycle

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use tracing::{debug, warn};

use crate::auth::{AuthError, TokenAuthority};
use crate::handlers::lifecycle::{Fault, HandlerError, HandlerStatus, Lifecycle};
use crate::models::{Authorized, EndpointResponse};

/// Verifies the presented token, and that the request acts for its presenter,
/// before the wrapped lifecycle sees the request at all.
pub struct AuthorizationGuard<L> {
    inner: L,
    tokens: Arc<TokenAuthority>,
    denial: Option<EndpointResponse>,
}

impl<L> AuthorizationGuard<L> {
    pub fn new(inner: L, tokens: Arc<TokenAuthority>) -> Self {
        Self { inner, tokens, denial: None }
    }
}

fn check<R: Authorized>(tokens: &TokenAuthority, request: &R) -> Result<String, AuthError> {
    let claims = tokens.verify(request.auth_token())?;
    match request.acting_account() {
        Some(actor) if actor != claims.username => Err(AuthError::OwnershipMismatch),
        _ => Ok(claims.username),
    }
}

#[async_trait]
impl<L> Lifecycle for AuthorizationGuard<L>
where
    L: Lifecycle,
    L::Request: Authorized,
{
    type Request = L::Request;

    async fn receive(&mut self, request: &L::Request) -> Result<(), Fault> {
        let status = self.status();
        if status != HandlerStatus::Idle {
            return Err(HandlerError::NotIdle(status).into());
        }

        match check(&self.tokens, request) {
            Ok(username) => {
                debug!("Authorized request from {}", username);
                self.inner.receive(request).await
            }
            Err(err) => {
                warn!("Denied request presented by {}: {}", request.auth_token().presenter, err);
                self.denial = Some(EndpointResponse::error(StatusCode::UNAUTHORIZED, err.to_string()));
                Ok(())
            }
        }
    }

    fn status(&self) -> HandlerStatus {
        if self.denial.is_some() {
            HandlerStatus::Error
        } else {
            self.inner.status()
        }
    }

    fn result(&self) -> Result<&EndpointResponse, HandlerError> {
        match &self.denial {
            Some(response) => Ok(response),
            None => self.inner.result(),
        }
    }

    fn into_result(self) -> Result<EndpointResponse, HandlerError> {
        match self.denial {
            Some(response) => Ok(response),
            None => self.inner.into_result(),
        }
    }
}

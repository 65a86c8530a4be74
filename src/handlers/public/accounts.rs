// handlers/public/accounts.rs - account creation, authentication and profiles

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;

use crate::auth::{password, TokenAuthority};
use crate::database::models::{AccountCreated, AuthenticationInfo, ProfileRow};
use crate::database::QueryError;
use crate::handlers::execute_single;
use crate::handlers::lifecycle::{unclassified, Endpoint, EndpointError};
use crate::models::{AuthorizationToken, CredentialSet, EndpointResponse, ProfileRequest, ProfileView, ResponseBody};
use crate::services::{AccountsService, DataService, ServiceName, ServiceRegistry};

/// POST /accounts
pub struct CreateAccount;

#[async_trait]
impl Endpoint for CreateAccount {
    type Request = CredentialSet;
    type Output = String;

    const NAME: &'static str = "create_account";
    const SERVICES: &'static [ServiceName] = &[ServiceName::Accounts];

    async fn do_data_ops(
        &self,
        request: &CredentialSet,
        services: &mut ServiceRegistry,
    ) -> Result<String, EndpointError> {
        tracing::info!("Creating account {}", request.display_name);
        let secured = password::secure(&request.password);
        let statement = AccountsService::create_account(&request.display_name, secured);

        let accounts = services.accounts()?;
        let created: AccountCreated = execute_single(accounts.queries(), statement)
            .await
            .map_err(|e| match e {
                QueryError::Duplicate(_) => EndpointError::Conflict(format!(
                    "Account not created: {} not available",
                    request.display_name
                )),
                other => other.into(),
            })?
            .one()?;
        Ok(created.display_name)
    }

    fn build_success_response(&self, display_name: String) -> EndpointResponse {
        EndpointResponse::message(
            StatusCode::CREATED,
            format!("Account for {} successfully created", display_name),
        )
    }

    fn build_error_response(&self, err: EndpointError) -> EndpointResponse {
        match err {
            EndpointError::Conflict(msg) => EndpointResponse::error(StatusCode::FORBIDDEN, msg),
            other => unclassified(other),
        }
    }
}

/// POST /accounts/authenticate
pub struct Authenticate {
    tokens: Arc<TokenAuthority>,
}

impl Authenticate {
    pub fn new(tokens: Arc<TokenAuthority>) -> Self {
        Self { tokens }
    }
}

const INVALID_CREDENTIALS: &str = "Invalid display name or password";

#[async_trait]
impl Endpoint for Authenticate {
    type Request = CredentialSet;
    type Output = AuthorizationToken;

    const NAME: &'static str = "authenticate";
    const SERVICES: &'static [ServiceName] = &[ServiceName::Accounts];

    async fn do_data_ops(
        &self,
        request: &CredentialSet,
        services: &mut ServiceRegistry,
    ) -> Result<AuthorizationToken, EndpointError> {
        let statement = AccountsService::fetch_authentication_information(&request.display_name);
        let accounts = services.accounts()?;
        let stored: Option<AuthenticationInfo> = execute_single(accounts.queries(), statement).await?.optional()?;

        let stored = stored
            .filter(|info| password::verify(&request.password, &info.salt_value, &info.password_hash))
            .ok_or_else(|| EndpointError::InvalidCredentials(INVALID_CREDENTIALS.to_string()))?;

        self.tokens
            .issue(&stored.display_name)
            .map_err(|e| EndpointError::Unclassified(e.to_string()))
    }

    fn build_success_response(&self, token: AuthorizationToken) -> EndpointResponse {
        EndpointResponse::new(StatusCode::OK, ResponseBody::Token(token))
    }

    fn build_error_response(&self, err: EndpointError) -> EndpointResponse {
        match err {
            EndpointError::InvalidCredentials(msg) => EndpointResponse::error(StatusCode::UNAUTHORIZED, msg),
            other => unclassified(other),
        }
    }
}

/// GET /accounts/:name/profile
pub struct ProfileRetrieval;

#[async_trait]
impl Endpoint for ProfileRetrieval {
    type Request = ProfileRequest;
    type Output = ProfileView;

    const NAME: &'static str = "profile_retrieval";
    const SERVICES: &'static [ServiceName] = &[ServiceName::Accounts];

    async fn do_data_ops(
        &self,
        request: &ProfileRequest,
        services: &mut ServiceRegistry,
    ) -> Result<ProfileView, EndpointError> {
        let statement = AccountsService::fetch_profile(&request.display_name);
        let accounts = services.accounts()?;
        let row: ProfileRow = execute_single(accounts.queries(), statement)
            .await?
            .optional()?
            .ok_or_else(|| {
                EndpointError::NotFound(format!("Profile for {} is not available", request.display_name))
            })?;

        Ok(ProfileView {
            avatar_url: accounts.share_avatar(&row.display_name).await?,
            preferred_name: row.preferred_name,
            biography: row.biography,
        })
    }

    fn build_success_response(&self, profile: ProfileView) -> EndpointResponse {
        EndpointResponse::new(StatusCode::OK, ResponseBody::Profile(profile))
    }

    fn build_error_response(&self, err: EndpointError) -> EndpointResponse {
        match err {
            EndpointError::NotFound(msg) => EndpointResponse::error(StatusCode::NOT_FOUND, msg),
            other => unclassified(other),
        }
    }
}

// handlers/lifecycle.rs - per-request state machine every endpoint plugs into

use std::fmt;

use async_trait::async_trait;
use axum::http::StatusCode;
use thiserror::Error;
use tracing::{debug, error};

use crate::database::QueryError;
use crate::models::EndpointResponse;
use crate::services::{ServiceBox, ServiceName, ServiceRegistry, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerStatus {
    Idle,
    Processing,
    Complete,
    Error,
}

impl HandlerStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, HandlerStatus::Complete | HandlerStatus::Error)
    }
}

impl fmt::Display for HandlerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            HandlerStatus::Idle => "idle",
            HandlerStatus::Processing => "processing",
            HandlerStatus::Complete => "complete",
            HandlerStatus::Error => "error",
        };
        f.write_str(status)
    }
}

/// Misuse of a handler or its registry. Never turned into a response.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Handler cannot receive a request while {0}")]
    NotIdle(HandlerStatus),

    #[error("Result requested before the handler finished (status: {0})")]
    PrematureResult(HandlerStatus),

    #[error("No provider registered for the {0} service")]
    NoProvider(ServiceName),

    #[error("Provider bound for the {expected} service is a {found} provider")]
    Misconfigured { expected: ServiceName, found: ServiceName },
}

/// Failures that escape `receive` instead of producing a response
#[derive(Debug, Error)]
pub enum Fault {
    #[error(transparent)]
    Protocol(#[from] HandlerError),

    #[error(transparent)]
    Storage(#[from] QueryError),
}

impl Fault {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Fault::Storage(QueryError::Connection(_)))
    }
}

/// Outcome of an endpoint's data operations other than success
#[derive(Debug, Error)]
pub enum EndpointError {
    /// Duplicate, invalid reference or self reference, already phrased for the caller
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidCredentials(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Downstream(String),

    #[error("{0}")]
    Unclassified(String),

    /// Recoverable storage outcome (duplicate, invalid reference, no result...)
    #[error("{0}")]
    DataService(QueryError),

    #[error(transparent)]
    Fatal(Fault),
}

impl From<QueryError> for EndpointError {
    fn from(err: QueryError) -> Self {
        if err.is_transport() {
            EndpointError::Fatal(Fault::Storage(err))
        } else {
            EndpointError::DataService(err)
        }
    }
}

impl From<HandlerError> for EndpointError {
    fn from(err: HandlerError) -> Self {
        EndpointError::Fatal(Fault::Protocol(err))
    }
}

impl From<StorageError> for EndpointError {
    fn from(err: StorageError) -> Self {
        EndpointError::Downstream(err.to_string())
    }
}

/// Fallback mapping for errors an endpoint does not recognise
pub fn unclassified(err: EndpointError) -> EndpointResponse {
    match err {
        EndpointError::Downstream(msg) => EndpointResponse::error(StatusCode::BAD_GATEWAY, msg),
        other => EndpointResponse::error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

/// One API operation: the services it needs, its data operations and its two response builders
#[async_trait]
pub trait Endpoint: Send + Sync {
    type Request: Send + Sync;
    type Output: Send;

    const NAME: &'static str;
    const SERVICES: &'static [ServiceName];

    async fn do_data_ops(
        &self,
        request: &Self::Request,
        services: &mut ServiceRegistry,
    ) -> Result<Self::Output, EndpointError>;

    fn build_success_response(&self, output: Self::Output) -> EndpointResponse;

    fn build_error_response(&self, err: EndpointError) -> EndpointResponse {
        unclassified(err)
    }
}

/// Anything that can be driven through the receive/result protocol
#[async_trait]
pub trait Lifecycle: Send {
    type Request: Send + Sync;

    async fn receive(&mut self, request: &Self::Request) -> Result<(), Fault>;

    fn status(&self) -> HandlerStatus;

    fn result(&self) -> Result<&EndpointResponse, HandlerError>;

    fn into_result(self) -> Result<EndpointResponse, HandlerError>
    where
        Self: Sized;
}

/// Runs one endpoint for exactly one request
pub struct EndpointHandler<E: Endpoint> {
    endpoint: E,
    status: HandlerStatus,
    response: Option<EndpointResponse>,
    services: ServiceRegistry,
}

impl<E: Endpoint> EndpointHandler<E> {
    pub fn new(endpoint: E) -> Self {
        Self {
            endpoint,
            status: HandlerStatus::Idle,
            response: None,
            services: ServiceRegistry::new(),
        }
    }

    pub fn use_service(&mut self, name: ServiceName, provider: ServiceBox) {
        self.services.bind(name, provider);
    }

    pub fn get_service(&self, name: ServiceName) -> Result<&ServiceBox, HandlerError> {
        self.services.get(name)
    }
}

#[async_trait]
impl<E: Endpoint> Lifecycle for EndpointHandler<E> {
    type Request = E::Request;

    async fn receive(&mut self, request: &E::Request) -> Result<(), Fault> {
        if self.status != HandlerStatus::Idle {
            return Err(HandlerError::NotIdle(self.status).into());
        }

        self.status = HandlerStatus::Processing;
        debug!("{} processing request", E::NAME);

        match self.endpoint.do_data_ops(request, &mut self.services).await {
            Ok(output) => {
                self.response = Some(self.endpoint.build_success_response(output));
                self.status = HandlerStatus::Complete;
            }
            Err(EndpointError::Fatal(fault)) => {
                error!("{} failed: {}", E::NAME, fault);
                return Err(fault);
            }
            Err(err) => {
                debug!("{} finished with error: {}", E::NAME, err);
                self.response = Some(self.endpoint.build_error_response(err));
                self.status = HandlerStatus::Error;
            }
        }

        Ok(())
    }

    fn status(&self) -> HandlerStatus {
        self.status
    }

    fn result(&self) -> Result<&EndpointResponse, HandlerError> {
        match (&self.response, self.status.is_finished()) {
            (Some(response), true) => Ok(response),
            _ => Err(HandlerError::PrematureResult(self.status)),
        }
    }

    fn into_result(self) -> Result<EndpointResponse, HandlerError> {
        match (self.response, self.status.is_finished()) {
            (Some(response), true) => Ok(response),
            _ => Err(HandlerError::PrematureResult(self.status)),
        }
    }
}

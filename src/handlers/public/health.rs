// handlers/public/health.rs - GET /health

use async_trait::async_trait;
use axum::http::StatusCode;

use crate::database::Statement;
use crate::handlers::execute_single;
use crate::handlers::lifecycle::{Endpoint, EndpointError};
use crate::models::EndpointResponse;
use crate::services::{ServiceName, ServiceRegistry};

/// Round-trips a trivial statement through the raw query service
pub struct HealthCheck;

#[async_trait]
impl Endpoint for HealthCheck {
    type Request = ();
    type Output = ();

    const NAME: &'static str = "health_check";
    const SERVICES: &'static [ServiceName] = &[ServiceName::RawQuery];

    async fn do_data_ops(&self, _: &(), services: &mut ServiceRegistry) -> Result<(), EndpointError> {
        let queries = services.raw_query()?;
        execute_single(queries, Statement::Ping).await?;
        Ok(())
    }

    fn build_success_response(&self, _: ()) -> EndpointResponse {
        EndpointResponse::message(StatusCode::OK, "Service is healthy")
    }
}

// handlers/protected/concepts.rs - concept creation and linking

use async_trait::async_trait;
use axum::http::StatusCode;

use crate::database::models::{ConceptCreated, LinkRow};
use crate::database::QueryError;
use crate::handlers::execute_single;
use crate::handlers::lifecycle::{Endpoint, EndpointError};
use crate::handlers::protected::conflict_or_not_found;
use crate::models::{
    AuthorizedRequest, ConceptDataPayload, ConceptLinkPayload, ConceptLinkRecord, ConceptSimpleView,
    EndpointResponse, ResponseBody,
};
use crate::services::{ConceptsService, DataService, ServiceName, ServiceRegistry};

/// POST /concepts
pub struct CreateConcept;

#[async_trait]
impl Endpoint for CreateConcept {
    type Request = AuthorizedRequest<ConceptDataPayload>;
    type Output = ConceptSimpleView;

    const NAME: &'static str = "create_concept";
    const SERVICES: &'static [ServiceName] = &[ServiceName::Concepts];

    async fn do_data_ops(
        &self,
        request: &Self::Request,
        services: &mut ServiceRegistry,
    ) -> Result<ConceptSimpleView, EndpointError> {
        let payload = &request.payload;
        let statement = ConceptsService::create_concept(
            &payload.author,
            &payload.title,
            &payload.description,
            payload.diagram.clone(),
        );

        let concepts = services.concepts()?;
        let created: ConceptCreated = execute_single(concepts.queries(), statement)
            .await
            .map_err(|e| match e {
                QueryError::Duplicate(_) => {
                    EndpointError::Conflict(format!("{}/{} is not available", payload.author, payload.title))
                }
                QueryError::InvalidReference(_) => {
                    EndpointError::Conflict(format!("Account {} does not exist", payload.author))
                }
                other => other.into(),
            })?
            .one()?;

        Ok(ConceptSimpleView {
            thumbnail_url: concepts.share_thumbnail(&created.identifier).await?,
            identifier: created.identifier,
        })
    }

    fn build_success_response(&self, view: ConceptSimpleView) -> EndpointResponse {
        EndpointResponse::new(StatusCode::CREATED, ResponseBody::ConceptSimple(view))
    }

    fn build_error_response(&self, err: EndpointError) -> EndpointResponse {
        conflict_or_not_found(err)
    }
}

/// POST /links
pub struct LinkConcepts;

#[async_trait]
impl Endpoint for LinkConcepts {
    type Request = AuthorizedRequest<ConceptLinkPayload>;
    type Output = ConceptLinkRecord;

    const NAME: &'static str = "link_concepts";
    const SERVICES: &'static [ServiceName] = &[ServiceName::Concepts];

    async fn do_data_ops(
        &self,
        request: &Self::Request,
        services: &mut ServiceRegistry,
    ) -> Result<ConceptLinkRecord, EndpointError> {
        let ConceptLinkPayload { ancestor, descendant } = &request.payload;
        if ancestor == descendant {
            return Err(EndpointError::Conflict("A concept cannot be linked to itself".to_string()));
        }

        tracing::info!("Linking {} -> {}", ancestor, descendant);
        let statement = ConceptsService::link_existing_concept(ancestor, descendant);
        let concepts = services.concepts()?;
        let link: LinkRow = execute_single(concepts.queries(), statement)
            .await
            .map_err(|e| match e {
                QueryError::Duplicate(_) => {
                    EndpointError::Conflict(format!("A link already exists between {} and {}", ancestor, descendant))
                }
                QueryError::InvalidReference(_) => {
                    EndpointError::Conflict("Both concepts must exist to link them".to_string())
                }
                other => other.into(),
            })?
            .one()?;

        Ok(ConceptLinkRecord { ancestor: link.ancestor, descendant: link.descendant })
    }

    fn build_success_response(&self, link: ConceptLinkRecord) -> EndpointResponse {
        EndpointResponse::new(StatusCode::CREATED, ResponseBody::Link(link))
    }

    fn build_error_response(&self, err: EndpointError) -> EndpointResponse {
        conflict_or_not_found(err)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use serde_json::Map;

    use super::*;
    use crate::auth::{password, TokenAuthority};
    use crate::database::{MemoryStore, QueryService};
    use crate::handlers::lifecycle::{HandlerStatus, Lifecycle};
    use crate::handlers::HandlerFactory;
    use crate::services::{AccountsService, MemoryObjectStore};

    fn factory(store: &MemoryStore) -> HandlerFactory {
        let tokens = TokenAuthority::new("concepts-test-secret", Duration::hours(1), Duration::zero(), 5).unwrap();
        HandlerFactory::new(Arc::new(store.clone()), Arc::new(MemoryObjectStore::new()), Arc::new(tokens), 10)
    }

    fn link(factory: &HandlerFactory, ancestor: &str, descendant: &str) -> AuthorizedRequest<ConceptLinkPayload> {
        AuthorizedRequest::new(
            factory.tokens().issue("nathan").unwrap(),
            ConceptLinkPayload { ancestor: ancestor.into(), descendant: descendant.into() },
        )
    }

    async fn seed_account(store: &MemoryStore, name: &str) {
        let statement = AccountsService::create_account(name, password::secure("password123"));
        QueryService::new(Arc::new(store.clone()))
            .transaction(move |tx| {
                Box::pin(async move {
                    tx.add_query(statement);
                    tx.exec_next().await
                })
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn concepts_can_be_created_from_a_spawned_task() {
        let store = MemoryStore::new();
        seed_account(&store, "nathan").await;
        let factory = factory(&store);

        let request = AuthorizedRequest::new(
            factory.tokens().issue("nathan").unwrap(),
            ConceptDataPayload {
                author: "nathan".into(),
                title: "gravity".into(),
                description: "Things fall".into(),
                diagram: Map::new(),
            },
        );
        let response = tokio::spawn(async move {
            let mut handler = factory.create_guarded(CreateConcept);
            handler.receive(&request).await.unwrap();
            handler.into_result().unwrap()
        })
        .await
        .unwrap();

        assert_eq!(response.code, StatusCode::CREATED);
        match response.body {
            ResponseBody::ConceptSimple(view) => {
                assert_eq!(view.identifier, "nathan/gravity");
                assert_eq!(view.thumbnail_url, "memory://objects/thumbnails/nathan/gravity");
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[tokio::test]
    async fn self_link_is_refused_before_any_session_opens() {
        let store = MemoryStore::new();
        let factory = factory(&store);

        let mut handler = factory.create_guarded(LinkConcepts);
        handler.receive(&link(&factory, "nathan/gravity", "nathan/gravity")).await.unwrap();

        assert_eq!(handler.status(), HandlerStatus::Error);
        let response = handler.into_result().unwrap();
        assert_eq!(response.code, StatusCode::FORBIDDEN);
        assert_eq!(response.text(), Some("A concept cannot be linked to itself"));
        assert_eq!(store.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn linking_unknown_concepts_is_forbidden() {
        let store = MemoryStore::new();
        let factory = factory(&store);

        let mut handler = factory.create_guarded(LinkConcepts);
        handler.receive(&link(&factory, "nathan/gravity", "nathan/orbits")).await.unwrap();

        let response = handler.into_result().unwrap();
        assert_eq!(response.code, StatusCode::FORBIDDEN);
        assert_eq!(response.text(), Some("Both concepts must exist to link them"));
        assert_eq!(store.sessions_opened(), 1);
    }
}

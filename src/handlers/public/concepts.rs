// handlers/public/concepts.rs - concept views and lineage trees

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::StatusCode;

use crate::database::models::ConceptRow;
use crate::database::QueryError;
use crate::handlers::execute_single;
use crate::handlers::lifecycle::{unclassified, Endpoint, EndpointError};
use crate::lineage::{self, LineageEdge};
use crate::models::{ConceptLineage, ConceptRequest, ConceptSimpleView, ConceptView, EndpointResponse, ResponseBody};
use crate::services::{ConceptsService, DataService, ServiceName, ServiceRegistry};

fn missing(request: &ConceptRequest) -> EndpointError {
    EndpointError::NotFound(format!("Concept {} does not exist", request.identifier()))
}

fn not_found_or_default(err: EndpointError) -> EndpointResponse {
    match err {
        EndpointError::NotFound(msg) => EndpointResponse::error(StatusCode::NOT_FOUND, msg),
        other => unclassified(other),
    }
}

/// GET /concepts/:author/:title
pub struct ConceptRetrieval;

#[async_trait]
impl Endpoint for ConceptRetrieval {
    type Request = ConceptRequest;
    type Output = ConceptView;

    const NAME: &'static str = "concept_retrieval";
    const SERVICES: &'static [ServiceName] = &[ServiceName::Concepts];

    async fn do_data_ops(
        &self,
        request: &ConceptRequest,
        services: &mut ServiceRegistry,
    ) -> Result<ConceptView, EndpointError> {
        let statement = ConceptsService::find_exact_concept(&request.author, &request.title);
        let concepts = services.concepts()?;
        let row: ConceptRow = execute_single(concepts.queries(), statement)
            .await?
            .optional()?
            .ok_or_else(|| missing(request))?;

        Ok(ConceptView {
            thumbnail_url: concepts.share_thumbnail(&row.identifier).await?,
            identifier: row.identifier,
            author: row.author,
            title: row.title,
            description: row.description,
            diagram: row.diagram,
        })
    }

    fn build_success_response(&self, view: ConceptView) -> EndpointResponse {
        EndpointResponse::new(StatusCode::OK, ResponseBody::Concept(view))
    }

    fn build_error_response(&self, err: EndpointError) -> EndpointResponse {
        not_found_or_default(err)
    }
}

/// GET /concepts/:author/:title/lineage
///
/// Looks the focus up and walks both directions in a single transaction, then
/// merges the two edge lists into one tree. Each identifier in the tree gets
/// exactly one thumbnail link.
pub struct LineageRetrieval {
    max_depth: u32,
}

impl LineageRetrieval {
    pub fn new(max_depth: u32) -> Self {
        Self { max_depth }
    }
}

#[async_trait]
impl Endpoint for LineageRetrieval {
    type Request = ConceptRequest;
    type Output = ConceptLineage;

    const NAME: &'static str = "lineage_retrieval";
    const SERVICES: &'static [ServiceName] = &[ServiceName::Concepts];

    async fn do_data_ops(
        &self,
        request: &ConceptRequest,
        services: &mut ServiceRegistry,
    ) -> Result<ConceptLineage, EndpointError> {
        let focus = request.identifier();
        let find = ConceptsService::find_exact_concept(&request.author, &request.title);
        let ancestors = ConceptsService::ancestors_of(&focus, self.max_depth);
        let descendants = ConceptsService::descendants_of(&focus, self.max_depth);

        let concepts = services.concepts()?;
        let edges = concepts
            .queries()
            .transaction(move |tx| {
                Box::pin(async move {
                    tx.add_query(find);
                    tx.exec_next().await?;
                    if tx.optional::<ConceptRow>()?.is_none() {
                        return Ok::<_, QueryError>(None);
                    }

                    tx.add_query(ancestors);
                    tx.exec_next().await?;
                    let up = tx.all::<LineageEdge>()?;

                    tx.add_query(descendants);
                    tx.exec_next().await?;
                    let down = tx.all::<LineageEdge>()?;

                    Ok::<_, QueryError>(Some((up, down)))
                })
            })
            .await?;

        let (up, down) = edges.ok_or_else(|| missing(request))?;
        let tree = lineage::assemble(&focus, &up, &down);
        tracing::debug!("Lineage of {} has {} node(s)", focus, tree.node_count());

        let mut thumbnails = HashMap::new();
        for identifier in tree.identifiers() {
            let url = concepts.share_thumbnail(identifier).await?;
            thumbnails.insert(identifier.to_string(), url);
        }

        let view = |identifier: &str| ConceptSimpleView {
            identifier: identifier.to_string(),
            thumbnail_url: thumbnails.get(identifier).cloned().unwrap_or_default(),
        };

        Ok(ConceptLineage {
            node_count: tree.node_count(),
            tree: tree.render(&view),
        })
    }

    fn build_success_response(&self, lineage: ConceptLineage) -> EndpointResponse {
        EndpointResponse::new(StatusCode::OK, ResponseBody::Lineage(lineage))
    }

    fn build_error_response(&self, err: EndpointError) -> EndpointResponse {
        not_found_or_default(err)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use serde_json::Map;

    use super::*;
    use crate::auth::{password, TokenAuthority};
    use crate::handlers::lifecycle::{HandlerStatus, Lifecycle};
    use crate::handlers::HandlerFactory;
    use crate::services::AccountsService;

    fn factory() -> HandlerFactory {
        let tokens = TokenAuthority::new("concepts-test-secret", Duration::hours(1), Duration::zero(), 5).unwrap();
        HandlerFactory::in_memory(tokens, 10)
    }

    async fn seed(factory: &HandlerFactory, titles: &[&str], links: &[(&str, &str)]) {
        let mut queries = crate::database::QueryService::new(Arc::clone(factory.sessions()));
        let mut statements = vec![AccountsService::create_account("nathan", password::secure("password123"))];
        for title in titles {
            statements.push(ConceptsService::create_concept("nathan", title, "", Map::new()));
        }
        for (a, d) in links {
            statements.push(ConceptsService::link_existing_concept(
                &format!("nathan/{}", a),
                &format!("nathan/{}", d),
            ));
        }
        queries
            .transaction(move |tx| {
                Box::pin(async move {
                    for statement in statements {
                        tx.add_query(statement);
                        tx.exec_next().await?;
                    }
                    Ok::<_, QueryError>(())
                })
            })
            .await
            .unwrap();
    }

    fn focus(title: &str) -> ConceptRequest {
        ConceptRequest { author: "nathan".into(), title: title.into() }
    }

    #[tokio::test]
    async fn lineage_is_rooted_at_the_farthest_ancestor() {
        let factory = factory();
        seed(&factory, &["A", "B", "C", "D"], &[("A", "B"), ("B", "C"), ("B", "D")]).await;

        let mut handler = factory.create_handler(LineageRetrieval::new(factory.lineage_depth()));
        handler.receive(&focus("B")).await.unwrap();

        let response = handler.into_result().unwrap();
        let ResponseBody::Lineage(lineage) = response.body else {
            panic!("expected a lineage body");
        };
        assert_eq!(lineage.node_count, 4);
        assert_eq!(lineage.tree.data.identifier, "nathan/A");
        assert_eq!(lineage.tree.children.len(), 1);

        let b = &lineage.tree.children[0];
        assert_eq!(b.data.identifier, "nathan/B");
        let mut grandchildren: Vec<_> = b.children.iter().map(|n| n.data.identifier.as_str()).collect();
        grandchildren.sort();
        assert_eq!(grandchildren, vec!["nathan/C", "nathan/D"]);
        assert_eq!(b.data.thumbnail_url, "memory://objects/thumbnails/nathan/B");
    }

    #[tokio::test]
    async fn unlinked_concept_is_a_single_node() {
        let factory = factory();
        seed(&factory, &["Solo"], &[]).await;

        let mut handler = factory.create_handler(LineageRetrieval::new(3));
        handler.receive(&focus("Solo")).await.unwrap();

        let ResponseBody::Lineage(lineage) = handler.into_result().unwrap().body else {
            panic!("expected a lineage body");
        };
        assert_eq!(lineage.node_count, 1);
        assert!(lineage.tree.children.is_empty());
    }

    #[tokio::test]
    async fn missing_concepts_are_404() {
        let factory = factory();
        let mut handler = factory.create_handler(LineageRetrieval::new(3));
        handler.receive(&focus("Nothing")).await.unwrap();

        assert_eq!(handler.status(), HandlerStatus::Error);
        let response = handler.into_result().unwrap();
        assert_eq!(response.code, StatusCode::NOT_FOUND);
        assert_eq!(response.text(), Some("Concept nathan/Nothing does not exist"));
    }

    #[tokio::test]
    async fn concept_view_carries_a_thumbnail() {
        let factory = factory();
        seed(&factory, &["Gravity"], &[]).await;

        let mut handler = factory.create_handler(ConceptRetrieval);
        handler.receive(&focus("Gravity")).await.unwrap();

        let ResponseBody::Concept(view) = handler.into_result().unwrap().body else {
            panic!("expected a concept body");
        };
        assert_eq!(view.identifier, "nathan/Gravity");
        assert_eq!(view.thumbnail_url, "memory://objects/thumbnails/nathan/Gravity");
    }
}

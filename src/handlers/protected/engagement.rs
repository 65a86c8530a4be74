// handlers/protected/engagement.rs - likes, follows and comments

use async_trait::async_trait;
use axum::http::StatusCode;

use crate::database::models::CommentCreated;
use crate::database::QueryError;
use crate::handlers::execute_single;
use crate::handlers::lifecycle::{Endpoint, EndpointError};
use crate::handlers::protected::conflict_or_not_found;
use crate::models::{
    AuthorizedRequest, CommentPayload, CommentRecord, EndpointResponse, FollowPayload, LikePayload, ResponseBody,
};
use crate::services::{DataService, EngagementService, ServiceName, ServiceRegistry};

/// POST /likes
pub struct LikeConcept;

#[async_trait]
impl Endpoint for LikeConcept {
    type Request = AuthorizedRequest<LikePayload>;
    type Output = String;

    const NAME: &'static str = "like_concept";
    const SERVICES: &'static [ServiceName] = &[ServiceName::Engagement];

    async fn do_data_ops(&self, request: &Self::Request, services: &mut ServiceRegistry) -> Result<String, EndpointError> {
        let LikePayload { user_liking, concept_liked } = &request.payload;
        let statement = EngagementService::insert_liking(user_liking, concept_liked);
        let engagement = services.engagement()?;

        execute_single(engagement.queries(), statement).await.map_err(|e| match e {
            QueryError::Duplicate(_) => EndpointError::Conflict(format!("{} already likes {}", user_liking, concept_liked)),
            QueryError::InvalidReference(_) => {
                EndpointError::Conflict(format!("Cannot like {}: account or concept does not exist", concept_liked))
            }
            other => other.into(),
        })?;

        Ok(format!("{} likes {}", user_liking, concept_liked))
    }

    fn build_success_response(&self, msg: String) -> EndpointResponse {
        EndpointResponse::message(StatusCode::CREATED, msg)
    }

    fn build_error_response(&self, err: EndpointError) -> EndpointResponse {
        conflict_or_not_found(err)
    }
}

/// DELETE /likes
pub struct UnlikeConcept;

#[async_trait]
impl Endpoint for UnlikeConcept {
    type Request = AuthorizedRequest<LikePayload>;
    type Output = String;

    const NAME: &'static str = "unlike_concept";
    const SERVICES: &'static [ServiceName] = &[ServiceName::Engagement];

    async fn do_data_ops(&self, request: &Self::Request, services: &mut ServiceRegistry) -> Result<String, EndpointError> {
        let LikePayload { user_liking, concept_liked } = &request.payload;
        let statement = EngagementService::revoke_liking(user_liking, concept_liked);
        let engagement = services.engagement()?;

        let removed = execute_single(engagement.queries(), statement).await?;
        if removed.is_empty() {
            return Err(EndpointError::NotFound(format!("{} does not like {}", user_liking, concept_liked)));
        }

        Ok(format!("{} no longer likes {}", user_liking, concept_liked))
    }

    fn build_success_response(&self, msg: String) -> EndpointResponse {
        EndpointResponse::message(StatusCode::OK, msg)
    }

    fn build_error_response(&self, err: EndpointError) -> EndpointResponse {
        conflict_or_not_found(err)
    }
}

/// POST /follows
pub struct FollowAccount;

#[async_trait]
impl Endpoint for FollowAccount {
    type Request = AuthorizedRequest<FollowPayload>;
    type Output = String;

    const NAME: &'static str = "follow_account";
    const SERVICES: &'static [ServiceName] = &[ServiceName::Engagement];

    async fn do_data_ops(&self, request: &Self::Request, services: &mut ServiceRegistry) -> Result<String, EndpointError> {
        let FollowPayload { follower, followee } = &request.payload;
        if follower == followee {
            return Err(EndpointError::Conflict("An account cannot follow itself".to_string()));
        }

        let statement = EngagementService::insert_following(follower, followee);
        let engagement = services.engagement()?;

        execute_single(engagement.queries(), statement).await.map_err(|e| match e {
            QueryError::Duplicate(_) => EndpointError::Conflict(format!("{} is already following {}", follower, followee)),
            QueryError::InvalidReference(_) => {
                EndpointError::Conflict("Both accounts must exist to follow".to_string())
            }
            other => other.into(),
        })?;

        Ok(format!("{} is now following {}", follower, followee))
    }

    fn build_success_response(&self, msg: String) -> EndpointResponse {
        EndpointResponse::message(StatusCode::CREATED, msg)
    }

    fn build_error_response(&self, err: EndpointError) -> EndpointResponse {
        conflict_or_not_found(err)
    }
}

/// DELETE /follows
pub struct UnfollowAccount;

#[async_trait]
impl Endpoint for UnfollowAccount {
    type Request = AuthorizedRequest<FollowPayload>;
    type Output = String;

    const NAME: &'static str = "unfollow_account";
    const SERVICES: &'static [ServiceName] = &[ServiceName::Engagement];

    async fn do_data_ops(&self, request: &Self::Request, services: &mut ServiceRegistry) -> Result<String, EndpointError> {
        let FollowPayload { follower, followee } = &request.payload;
        tracing::info!("Removing the following record {} <- {}", followee, follower);

        let statement = EngagementService::revoke_following(follower, followee);
        let engagement = services.engagement()?;

        let removed = execute_single(engagement.queries(), statement).await?;
        if removed.is_empty() {
            return Err(EndpointError::NotFound(format!("{} is not following {}", follower, followee)));
        }

        Ok(format!("{} is no longer following {}", follower, followee))
    }

    fn build_success_response(&self, msg: String) -> EndpointResponse {
        EndpointResponse::message(StatusCode::OK, msg)
    }

    fn build_error_response(&self, err: EndpointError) -> EndpointResponse {
        conflict_or_not_found(err)
    }
}

/// POST /comments
pub struct CreateComment;

#[async_trait]
impl Endpoint for CreateComment {
    type Request = AuthorizedRequest<CommentPayload>;
    type Output = CommentRecord;

    const NAME: &'static str = "create_comment";
    const SERVICES: &'static [ServiceName] = &[ServiceName::Engagement];

    async fn do_data_ops(
        &self,
        request: &Self::Request,
        services: &mut ServiceRegistry,
    ) -> Result<CommentRecord, EndpointError> {
        let payload = &request.payload;
        let statement = EngagementService::create_comment(
            &payload.comment_author,
            &payload.comment_on,
            &payload.comment_text,
            payload.response_to,
        );
        let engagement = services.engagement()?;

        let created: CommentCreated = execute_single(engagement.queries(), statement)
            .await
            .map_err(|e| match e {
                QueryError::InvalidReference(_) => EndpointError::Conflict(match payload.response_to {
                    Some(parent) => format!("Cannot reply to comment {} on {}", parent, payload.comment_on),
                    None => format!("Cannot comment on {}: concept does not exist", payload.comment_on),
                }),
                other => other.into(),
            })?
            .one()?;

        Ok(CommentRecord { comment_id: created.comment_id })
    }

    fn build_success_response(&self, record: CommentRecord) -> EndpointResponse {
        EndpointResponse::new(StatusCode::CREATED, ResponseBody::Comment(record))
    }

    fn build_error_response(&self, err: EndpointError) -> EndpointResponse {
        conflict_or_not_found(err)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::auth::{password, TokenAuthority};
    use crate::database::{MemoryStore, QueryService};
    use crate::handlers::lifecycle::{HandlerStatus, Lifecycle};
    use crate::handlers::HandlerFactory;
    use crate::services::{AccountsService, MemoryObjectStore};

    fn factory(store: &MemoryStore) -> HandlerFactory {
        let tokens = TokenAuthority::new("engagement-test-secret", Duration::hours(1), Duration::zero(), 5).unwrap();
        HandlerFactory::new(Arc::new(store.clone()), Arc::new(MemoryObjectStore::new()), Arc::new(tokens), 10)
    }

    async fn seed_accounts(store: &MemoryStore, names: &[&str]) {
        let statements: Vec<_> = names
            .iter()
            .map(|name| AccountsService::create_account(name, password::secure("password123")))
            .collect();
        QueryService::new(Arc::new(store.clone()))
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

    fn follow(factory: &HandlerFactory, follower: &str, followee: &str) -> AuthorizedRequest<FollowPayload> {
        AuthorizedRequest::new(
            factory.tokens().issue(follower).unwrap(),
            FollowPayload { follower: follower.into(), followee: followee.into() },
        )
    }

    #[tokio::test]
    async fn self_follow_is_refused_before_any_session_opens() {
        let store = MemoryStore::new();
        let factory = factory(&store);

        let mut handler = factory.create_guarded(FollowAccount);
        handler.receive(&follow(&factory, "nathan", "nathan")).await.unwrap();

        let response = handler.into_result().unwrap();
        assert_eq!(response.code, StatusCode::FORBIDDEN);
        assert_eq!(response.text(), Some("An account cannot follow itself"));
        assert_eq!(store.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn follow_then_unfollow() {
        let store = MemoryStore::new();
        seed_accounts(&store, &["nathan", "alice"]).await;
        let factory = factory(&store);

        let mut handler = factory.create_guarded(FollowAccount);
        handler.receive(&follow(&factory, "nathan", "alice")).await.unwrap();
        assert_eq!(handler.result().unwrap().code, StatusCode::CREATED);

        let mut again = factory.create_guarded(FollowAccount);
        again.receive(&follow(&factory, "nathan", "alice")).await.unwrap();
        assert_eq!(again.result().unwrap().code, StatusCode::FORBIDDEN);

        let mut handler = factory.create_guarded(UnfollowAccount);
        handler.receive(&follow(&factory, "nathan", "alice")).await.unwrap();
        let response = handler.into_result().unwrap();
        assert_eq!(response.code, StatusCode::OK);
        assert_eq!(response.text(), Some("nathan is no longer following alice"));

        let mut handler = factory.create_guarded(UnfollowAccount);
        handler.receive(&follow(&factory, "nathan", "alice")).await.unwrap();
        assert_eq!(handler.status(), HandlerStatus::Error);
        assert_eq!(handler.result().unwrap().code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn following_unknown_accounts_is_forbidden() {
        let store = MemoryStore::new();
        seed_accounts(&store, &["nathan"]).await;
        let factory = factory(&store);

        let mut handler = factory.create_guarded(FollowAccount);
        handler.receive(&follow(&factory, "nathan", "ghost")).await.unwrap();

        assert_eq!(handler.result().unwrap().text(), Some("Both accounts must exist to follow"));
    }

    #[tokio::test]
    async fn comments_on_unknown_concepts_are_forbidden() {
        let store = MemoryStore::new();
        seed_accounts(&store, &["nathan"]).await;
        let factory = factory(&store);

        let request = AuthorizedRequest::new(
            factory.tokens().issue("nathan").unwrap(),
            CommentPayload {
                comment_author: "nathan".into(),
                comment_on: "nathan/Missing".into(),
                comment_text: "Nice".into(),
                response_to: None,
            },
        );
        let mut handler = factory.create_guarded(CreateComment);
        handler.receive(&request).await.unwrap();

        assert_eq!(handler.result().unwrap().code, StatusCode::FORBIDDEN);
    }
}

// handlers/public/engagement.rs - read-only like, follow and comment queries

use async_trait::async_trait;
use axum::http::StatusCode;

use crate::database::models::CommentRow;
use crate::handlers::execute_single;
use crate::handlers::lifecycle::{Endpoint, EndpointError};
use crate::models::{
    CommentThreadRequest, CommentView, EndpointResponse, FollowPayload, LikePayload, RelationStatus, ResponseBody,
};
use crate::services::{DataService, EngagementService, ServiceName, ServiceRegistry};

/// GET /concepts/:author/:title/likes/:name
pub struct LikeStatus;

#[async_trait]
impl Endpoint for LikeStatus {
    type Request = LikePayload;
    type Output = RelationStatus;

    const NAME: &'static str = "like_status";
    const SERVICES: &'static [ServiceName] = &[ServiceName::Engagement];

    async fn do_data_ops(
        &self,
        request: &LikePayload,
        services: &mut ServiceRegistry,
    ) -> Result<RelationStatus, EndpointError> {
        let statement = EngagementService::check_liking(&request.user_liking, &request.concept_liked);
        let engagement = services.engagement()?;
        let results = execute_single(engagement.queries(), statement).await?;
        Ok(RelationStatus { exists: !results.is_empty() })
    }

    fn build_success_response(&self, status: RelationStatus) -> EndpointResponse {
        EndpointResponse::new(StatusCode::OK, ResponseBody::Relation(status))
    }
}

/// GET /accounts/:follower/following/:followee
pub struct FollowStatus;

#[async_trait]
impl Endpoint for FollowStatus {
    type Request = FollowPayload;
    type Output = RelationStatus;

    const NAME: &'static str = "follow_status";
    const SERVICES: &'static [ServiceName] = &[ServiceName::Engagement];

    async fn do_data_ops(
        &self,
        request: &FollowPayload,
        services: &mut ServiceRegistry,
    ) -> Result<RelationStatus, EndpointError> {
        let statement = EngagementService::check_following(&request.follower, &request.followee);
        let engagement = services.engagement()?;
        let results = execute_single(engagement.queries(), statement).await?;
        Ok(RelationStatus { exists: !results.is_empty() })
    }

    fn build_success_response(&self, status: RelationStatus) -> EndpointResponse {
        EndpointResponse::new(StatusCode::OK, ResponseBody::Relation(status))
    }
}

/// GET /concepts/:author/:title/comments
pub struct CommentThread;

#[async_trait]
impl Endpoint for CommentThread {
    type Request = CommentThreadRequest;
    type Output = Vec<CommentView>;

    const NAME: &'static str = "comment_thread";
    const SERVICES: &'static [ServiceName] = &[ServiceName::Engagement];

    async fn do_data_ops(
        &self,
        request: &CommentThreadRequest,
        services: &mut ServiceRegistry,
    ) -> Result<Vec<CommentView>, EndpointError> {
        let statement = EngagementService::comments_on(&request.concept_id, request.response_to);
        let engagement = services.engagement()?;
        let rows: Vec<CommentRow> = execute_single(engagement.queries(), statement).await?.all()?;

        Ok(rows
            .into_iter()
            .map(|row| CommentView {
                comment_id: row.comment_id,
                comment_by: row.comment_by,
                free_text: row.free_text,
                response_to: row.parent,
                created_at: row.created_at.to_rfc3339(),
            })
            .collect())
    }

    fn build_success_response(&self, comments: Vec<CommentView>) -> EndpointResponse {
        EndpointResponse::new(StatusCode::OK, ResponseBody::Comments(comments))
    }
}

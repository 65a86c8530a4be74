// router.rs - HTTP surface: one route per endpoint, each creating a fresh handler

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, Query, State},
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::handlers::protected::{
    CreateComment, CreateConcept, FollowAccount, LikeConcept, LinkConcepts, UnfollowAccount, UnlikeConcept,
};
use crate::handlers::public::{
    Authenticate, CommentThread, ConceptRetrieval, CreateAccount, FollowStatus, HealthCheck, LikeStatus,
    LineageRetrieval, ProfileRetrieval,
};
use crate::handlers::{HandlerFactory, Lifecycle};
use crate::middleware::PresentedToken;
use crate::models::payloads::validate_display_name;
use crate::models::{
    AuthorizedRequest, CommentPayload, CommentThreadRequest, ConceptDataPayload, ConceptLinkPayload, ConceptRequest,
    CredentialSet, EndpointResponse, FollowPayload, LikePayload, ProfileRequest,
};

#[derive(Clone)]
pub struct AppState {
    pub factory: HandlerFactory,
}

impl AppState {
    pub fn new(factory: HandlerFactory) -> Self {
        Self { factory }
    }
}

type Reply = Result<EndpointResponse, ApiError>;

/// Drive one handler through receive/result
async fn run<L: Lifecycle>(mut handler: L, request: L::Request) -> Reply {
    handler.receive(&request).await?;
    Ok(handler.into_result()?)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::invalid_json(rejection.body_text()))
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .merge(account_routes())
        .merge(concept_routes())
        .merge(engagement_routes())
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        router = router.layer(cors(&config.security.cors_origins));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn cors(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()).collect();
    CorsLayer::permissive().allow_origin(AllowOrigin::list(allowed))
}

fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(create_account))
        .route("/accounts/authenticate", post(authenticate))
        .route("/accounts/:name/profile", get(profile))
        .route("/accounts/:follower/following/:followee", get(follow_status))
        .route("/follows", post(follow).delete(unfollow))
}

fn concept_routes() -> Router<AppState> {
    Router::new()
        .route("/concepts", post(create_concept))
        .route("/concepts/:author/:title", get(concept))
        .route("/concepts/:author/:title/lineage", get(lineage))
        .route("/links", post(link_concepts))
}

fn engagement_routes() -> Router<AppState> {
    Router::new()
        .route("/concepts/:author/:title/likes/:name", get(like_status))
        .route("/concepts/:author/:title/comments", get(comment_thread))
        .route("/likes", post(like).delete(unlike))
        .route("/comments", post(create_comment))
}

async fn not_found() -> ApiError {
    ApiError::not_found("No such route")
}

async fn health(State(state): State<AppState>) -> Reply {
    run(state.factory.create_handler(HealthCheck), ()).await
}

// Accounts

async fn create_account(
    State(state): State<AppState>,
    payload: Result<Json<CredentialSet>, JsonRejection>,
) -> Reply {
    let credentials = body(payload)?;
    credentials.validate()?;
    run(state.factory.create_handler(CreateAccount), credentials).await
}

async fn authenticate(
    State(state): State<AppState>,
    payload: Result<Json<CredentialSet>, JsonRejection>,
) -> Reply {
    let credentials = body(payload)?;
    credentials.validate()?;
    let endpoint = Authenticate::new(state.factory.tokens().clone());
    run(state.factory.create_handler(endpoint), credentials).await
}

async fn profile(State(state): State<AppState>, Path(display_name): Path<String>) -> Reply {
    validate_display_name("display_name", &display_name)?;
    run(state.factory.create_handler(ProfileRetrieval), ProfileRequest { display_name }).await
}

async fn follow_status(
    State(state): State<AppState>,
    Path((follower, followee)): Path<(String, String)>,
) -> Reply {
    run(state.factory.create_handler(FollowStatus), FollowPayload { follower, followee }).await
}

async fn follow(
    State(state): State<AppState>,
    PresentedToken(token): PresentedToken,
    payload: Result<Json<FollowPayload>, JsonRejection>,
) -> Reply {
    let payload = body(payload)?;
    validate_display_name("follower", &payload.follower)?;
    validate_display_name("followee", &payload.followee)?;
    run(state.factory.create_guarded(FollowAccount), AuthorizedRequest::new(token, payload)).await
}

async fn unfollow(
    State(state): State<AppState>,
    PresentedToken(token): PresentedToken,
    payload: Result<Json<FollowPayload>, JsonRejection>,
) -> Reply {
    let payload = body(payload)?;
    run(state.factory.create_guarded(UnfollowAccount), AuthorizedRequest::new(token, payload)).await
}

// Concepts

async fn create_concept(
    State(state): State<AppState>,
    PresentedToken(token): PresentedToken,
    payload: Result<Json<ConceptDataPayload>, JsonRejection>,
) -> Reply {
    let payload = body(payload)?;
    payload.validate()?;
    run(state.factory.create_guarded(CreateConcept), AuthorizedRequest::new(token, payload)).await
}

async fn concept(State(state): State<AppState>, Path((author, title)): Path<(String, String)>) -> Reply {
    run(state.factory.create_handler(ConceptRetrieval), ConceptRequest { author, title }).await
}

async fn lineage(State(state): State<AppState>, Path((author, title)): Path<(String, String)>) -> Reply {
    let endpoint = LineageRetrieval::new(state.factory.lineage_depth());
    run(state.factory.create_handler(endpoint), ConceptRequest { author, title }).await
}

async fn link_concepts(
    State(state): State<AppState>,
    PresentedToken(token): PresentedToken,
    payload: Result<Json<ConceptLinkPayload>, JsonRejection>,
) -> Reply {
    let payload = body(payload)?;
    run(state.factory.create_guarded(LinkConcepts), AuthorizedRequest::new(token, payload)).await
}

// Likes and comments

async fn like_status(
    State(state): State<AppState>,
    Path((author, title, name)): Path<(String, String, String)>,
) -> Reply {
    let request = LikePayload { user_liking: name, concept_liked: format!("{}/{}", author, title) };
    run(state.factory.create_handler(LikeStatus), request).await
}

async fn like(
    State(state): State<AppState>,
    PresentedToken(token): PresentedToken,
    payload: Result<Json<LikePayload>, JsonRejection>,
) -> Reply {
    let payload = body(payload)?;
    validate_display_name("user_liking", &payload.user_liking)?;
    run(state.factory.create_guarded(LikeConcept), AuthorizedRequest::new(token, payload)).await
}

async fn unlike(
    State(state): State<AppState>,
    PresentedToken(token): PresentedToken,
    payload: Result<Json<LikePayload>, JsonRejection>,
) -> Reply {
    let payload = body(payload)?;
    run(state.factory.create_guarded(UnlikeConcept), AuthorizedRequest::new(token, payload)).await
}

#[derive(Debug, Deserialize)]
struct ThreadQuery {
    response_to: Option<i64>,
}

async fn comment_thread(
    State(state): State<AppState>,
    Path((author, title)): Path<(String, String)>,
    Query(thread): Query<ThreadQuery>,
) -> Reply {
    let request = CommentThreadRequest {
        concept_id: format!("{}/{}", author, title),
        response_to: thread.response_to,
    };
    run(state.factory.create_handler(CommentThread), request).await
}

async fn create_comment(
    State(state): State<AppState>,
    PresentedToken(token): PresentedToken,
    payload: Result<Json<CommentPayload>, JsonRejection>,
) -> Reply {
    let payload = body(payload)?;
    payload.validate()?;
    run(state.factory.create_guarded(CreateComment), AuthorizedRequest::new(token, payload)).await
}

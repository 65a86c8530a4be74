mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{authorized, create_concept, get, sign_up, test_app};

#[tokio::test]
async fn self_follow_is_forbidden() -> Result<()> {
    let app = test_app();
    let token = sign_up(&app, "nathan").await?;

    let (status, body) =
        authorized(&app, "POST", "/follows", &token, json!({ "follower": "nathan", "followee": "nathan" })).await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["err_msg"], "An account cannot follow itself");
    Ok(())
}

#[tokio::test]
async fn follow_lifecycle() -> Result<()> {
    let app = test_app();
    let token = sign_up(&app, "nathan").await?;
    sign_up(&app, "alice").await?;
    let follow = json!({ "follower": "nathan", "followee": "alice" });

    let (status, _) = authorized(&app, "POST", "/follows", &token, follow.clone()).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = get(&app, "/accounts/nathan/following/alice").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], true);

    let (status, body) = authorized(&app, "DELETE", "/follows", &token, follow.clone()).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "nathan is no longer following alice");

    let (_, body) = get(&app, "/accounts/nathan/following/alice").await?;
    assert_eq!(body["exists"], false);

    let (status, _) = authorized(&app, "DELETE", "/follows", &token, follow).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn likes_are_unique_per_account() -> Result<()> {
    let app = test_app();
    let token = sign_up(&app, "nathan").await?;
    create_concept(&app, &token, "Gravity").await?;
    let like = json!({ "user_liking": "nathan", "concept_liked": "nathan/Gravity" });

    let (status, _) = authorized(&app, "POST", "/likes", &token, like.clone()).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = authorized(&app, "POST", "/likes", &token, like.clone()).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["err_msg"], "nathan already likes nathan/Gravity");

    let (_, body) = get(&app, "/concepts/nathan/Gravity/likes/nathan").await?;
    assert_eq!(body["exists"], true);

    let (status, _) = authorized(&app, "DELETE", "/likes", &token, like.clone()).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = authorized(&app, "DELETE", "/likes", &token, like).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn comment_threads() -> Result<()> {
    let app = test_app();
    let token = sign_up(&app, "nathan").await?;
    create_concept(&app, &token, "Gravity").await?;

    let comment = |text: &str, response_to: Option<i64>| {
        json!({
            "comment_author": "nathan",
            "comment_on": "nathan/Gravity",
            "comment_text": text,
            "response_to": response_to
        })
    };

    let (status, first) = authorized(&app, "POST", "/comments", &token, comment("First!", None)).await?;
    assert_eq!(status, StatusCode::CREATED);
    let first_id = first["comment_id"].as_i64().unwrap_or_default();

    let (status, _) = authorized(&app, "POST", "/comments", &token, comment("Reply", Some(first_id))).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = authorized(&app, "POST", "/comments", &token, comment("Orphan", Some(9999))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, top) = get(&app, "/concepts/nathan/Gravity/comments").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(top.as_array().map(Vec::len), Some(1));
    assert_eq!(top[0]["free_text"], "First!");

    let (_, replies) = get(&app, &format!("/concepts/nathan/Gravity/comments?response_to={first_id}")).await?;
    assert_eq!(replies[0]["free_text"], "Reply");
    assert_eq!(replies[0]["response_to"], first_id);
    Ok(())
}

#[tokio::test]
async fn presenter_must_own_the_token() -> Result<()> {
    let app = test_app();
    let mut token = sign_up(&app, "nathan").await?;
    sign_up(&app, "alice").await?;
    token["presenter"] = json!("alice");

    let (status, body) =
        authorized(&app, "POST", "/follows", &token, json!({ "follower": "alice", "followee": "nathan" })).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["err_msg"], "Cannot verify ownership of token.");

    let (_, body) = get(&app, "/accounts/alice/following/nathan").await?;
    assert_eq!(body["exists"], false);
    Ok(())
}

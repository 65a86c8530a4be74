use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use crate::error::ApiError;
use crate::models::AuthorizationToken;

/// Header naming the account the bearer token is presented for
pub const PRESENTER_HEADER: &str = "x-presenter";

/// Token and presenter taken from the request headers.
///
/// Only the header shape is checked here; signature, expiry and ownership are
/// left to the authorization guard so a bad token still becomes a handler
/// response.
#[derive(Debug, Clone)]
pub struct PresentedToken(pub AuthorizationToken);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for PresentedToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_jwt_from_headers(&parts.headers).map_err(ApiError::unauthorized)?;
        let presenter = extract_presenter(&parts.headers).map_err(ApiError::unauthorized)?;
        Ok(PresentedToken(AuthorizationToken { token, presenter }))
    }
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

fn extract_presenter(headers: &HeaderMap) -> Result<String, String> {
    let presenter = headers
        .get(PRESENTER_HEADER)
        .ok_or_else(|| "Missing X-Presenter header".to_string())?
        .to_str()
        .map_err(|_| "Invalid X-Presenter header format".to_string())?
        .trim();

    if presenter.is_empty() {
        return Err("Empty X-Presenter header".to_string());
    }
    Ok(presenter.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Token abc"));
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_jwt_from_headers(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn presenter_header_must_be_present() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_presenter(&headers).unwrap_err(), "Missing X-Presenter header");

        headers.insert(PRESENTER_HEADER, HeaderValue::from_static(" nathan "));
        assert_eq!(extract_presenter(&headers).unwrap(), "nathan");
    }
}

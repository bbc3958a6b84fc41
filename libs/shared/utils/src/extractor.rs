use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use shared_config::AppConfig;
use shared_models::auth::Actor;
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Validates the bearer token and stores both the `User` and the derived
/// [`Actor`] in request extensions.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_value = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let user = validate_token(token, &config.supabase_jwt_secret).map_err(AppError::Auth)?;
    let actor = Actor::try_from(&user).map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(actor);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::{http::StatusCode, middleware, routing::get, Extension, Router};
    use tower::ServiceExt;

    use crate::test_utils::{JwtTestUtils, TestConfig, TestUser};

    fn app(config: Arc<AppConfig>) -> Router {
        Router::new()
            .route(
                "/whoami",
                get(|Extension(actor): Extension<Actor>| async move { actor.role.to_string() }),
            )
            .layer(middleware::from_fn_with_state(config, auth_middleware))
    }

    async fn call(config: Arc<AppConfig>, authorization: Option<String>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }
        let response = app(config)
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn valid_token_exposes_the_actor() {
        let config = TestConfig::default();
        let doctor = TestUser::doctor("doc@example.com");
        let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, None);

        let (status, body) = call(config.to_arc(), Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "doctor");
    }

    #[tokio::test]
    async fn missing_or_bad_credentials_are_rejected() {
        let config = TestConfig::default();
        let patient = TestUser::patient("pat@example.com");

        let (status, _) = call(config.to_arc(), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = JwtTestUtils::create_invalid_signature_token(&patient);
        let (status, body) = call(config.to_arc(), Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Invalid token signature"));

        let (status, _) = call(config.to_arc(), Some(format!("Token {}", token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_party_roles_are_not_actors() {
        let config = TestConfig::default();
        let admin = TestUser::new("admin@example.com", "admin");
        let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, None);

        let (status, _) = call(config.to_arc(), Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let user = admin.to_user();
        assert_matches!(Actor::try_from(&user), Err(_));
    }
}

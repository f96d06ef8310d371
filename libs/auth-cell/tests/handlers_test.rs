use std::sync::Arc;
use axum::{extract::State, http::{HeaderMap, HeaderValue}};

use auth_cell::handlers::{validate, verify};
use shared_config::AppConfig;
use shared_models::auth::UserRole;
use shared_models::error::AppError;
use shared_utils::test_utils::{TestConfig, TestUser, JwtTestUtils};

fn create_test_config() -> AppConfig {
    TestConfig::default().to_app_config()
}

fn create_auth_header(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "authorization",
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    headers
}

#[tokio::test]
async fn test_validate_success() {
    let config = Arc::new(create_test_config());
    let user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let headers = create_auth_header(&token);

    let result = validate(State(config), headers).await;

    assert!(result.is_ok());
    let response = result.unwrap().0;
    assert_eq!(response.valid, true);
    assert_eq!(response.user_id, user.id);
    assert_eq!(response.email, Some(user.email));
    assert_eq!(response.role, Some(UserRole::Patient));
}

#[tokio::test]
async fn test_validate_missing_header() {
    let config = Arc::new(create_test_config());
    let headers = HeaderMap::new();

    let result = validate(State(config), headers).await;

    assert!(result.is_err());
    match result.unwrap_err() {
        AppError::Auth(msg) => assert_eq!(msg, "Missing authorization header"),
        _ => panic!("Expected Auth error"),
    }
}

#[tokio::test]
async fn test_validate_invalid_header_format() {
    let config = Arc::new(create_test_config());
    let mut headers = HeaderMap::new();
    headers.insert("authorization", HeaderValue::from_static("sometoken"));

    let result = validate(State(config), headers).await;

    assert!(result.is_err());
    match result.unwrap_err() {
        AppError::Auth(msg) => assert_eq!(msg, "Invalid authorization header format"),
        _ => panic!("Expected Auth error"),
    }
}

#[tokio::test]
async fn test_validate_expired_token() {
    let config = Arc::new(create_test_config());
    let user = TestUser::default();
    let token = JwtTestUtils::create_expired_token(&user, &config.supabase_jwt_secret);
    let headers = create_auth_header(&token);

    let result = validate(State(config), headers).await;

    assert!(result.is_err());
    match result.unwrap_err() {
        AppError::Auth(_) => {}, // Expected
        _ => panic!("Expected Auth error"),
    }
}

#[tokio::test]
async fn test_validate_invalid_signature() {
    let config = Arc::new(create_test_config());
    let user = TestUser::default();
    let token = JwtTestUtils::create_invalid_signature_token(&user);
    let headers = create_auth_header(&token);

    let result = validate(State(config), headers).await;

    assert!(result.is_err());
    match result.unwrap_err() {
        AppError::Auth(_) => {}, // Expected
        _ => panic!("Expected Auth error"),
    }
}

#[tokio::test]
async fn test_validate_malformed_token() {
    let config = Arc::new(create_test_config());
    let token = JwtTestUtils::create_malformed_token();
    let headers = create_auth_header(&token);

    let result = validate(State(config), headers).await;

    assert!(result.is_err());
    match result.unwrap_err() {
        AppError::Auth(_) => {}, // Expected
        _ => panic!("Expected Auth error"),
    }
}

#[tokio::test]
async fn test_verify_valid() {
    let config = Arc::new(create_test_config());
    let user = TestUser::physiotherapist("physio@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let headers = create_auth_header(&token);

    let result = verify(State(config), headers).await;

    assert!(result.is_ok());
    let response = result.unwrap().0;
    assert_eq!(response["valid"], true);
}

#[tokio::test]
async fn test_verify_invalid() {
    let config = Arc::new(create_test_config());
    let user = TestUser::default();
    let token = JwtTestUtils::create_expired_token(&user, &config.supabase_jwt_secret);
    let headers = create_auth_header(&token);

    let result = verify(State(config), headers).await;

    assert!(result.is_ok());
    let response = result.unwrap().0;
    assert_eq!(response["valid"], false);
}

#[tokio::test]
async fn test_every_clinic_role_resolves() {
    let config = Arc::new(create_test_config());

    let cases = [
        (TestUser::administrator("admin@clinic.test"), UserRole::Administrator),
        (TestUser::physiotherapist("physio@clinic.test"), UserRole::Physiotherapist),
        (TestUser::secretary("secretary@clinic.test"), UserRole::Secretary),
        (TestUser::patient("patient@clinic.test"), UserRole::Patient),
        (TestUser::partner("partner@clinic.test"), UserRole::Partner),
    ];

    for (user, expected_role) in cases {
        let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
        let headers = create_auth_header(&token);

        let result = validate(State(config.clone()), headers).await;
        assert!(result.is_ok());
        let response = result.unwrap().0;
        assert_eq!(response.role, Some(expected_role));
    }
}

#[tokio::test]
async fn test_unknown_role_label_yields_no_role() {
    let config = Arc::new(create_test_config());

    let user = TestUser::new("stranger@clinic.test", "janitor");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let headers = create_auth_header(&token);

    let result = validate(State(config), headers).await;
    assert!(result.is_ok());
    let response = result.unwrap().0;
    assert_eq!(response.role, None);
}

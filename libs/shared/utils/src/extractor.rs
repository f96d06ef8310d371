use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
};

use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;
use shared_config::AppConfig;

use crate::jwt::validate_token;

// Middleware for authentication
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    // Extract token from headers
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    let token = &auth_value[7..];

    // Validate token
    let user = validate_token(token, &config.supabase_jwt_secret)
        .map_err(AppError::Auth)?;

    // Add user to request extensions
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

// Function to extract user from request extensions
pub fn extract_user<B>(request: &Request<B>) -> Result<User, AppError> {
    request
        .extensions()
        .get::<User>()
        .cloned()
        .ok_or_else(|| AppError::Auth("User not found in request extensions".to_string()))
}

/// Route guard: the authenticated user's role must be in the allow-list,
/// otherwise the guarded handler never runs.
pub fn require_roles<B>(request: &Request<B>, allowed: &[UserRole]) -> Result<User, AppError> {
    let user = request
        .extensions()
        .get::<User>()
        .cloned()
        .ok_or_else(|| AppError::Auth("User not found in request extensions".to_string()))?;

    let role = user
        .role
        .ok_or_else(|| AppError::Forbidden("Access denied: no role assigned".to_string()))?;

    if !allowed.contains(&role) {
        return Err(AppError::Forbidden(format!(
            "Access denied for role {}",
            role
        )));
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use shared_models::auth::UserRole;

    fn request_with_role(role: Option<UserRole>) -> Request<Body> {
        let mut request = Request::builder().uri("/patients").body(Body::empty()).unwrap();
        request.extensions_mut().insert(User {
            id: "user-1".to_string(),
            email: None,
            role,
            metadata: None,
            created_at: None,
        });
        request
    }

    #[test]
    fn allowed_role_passes_the_guard() {
        let request = request_with_role(Some(UserRole::Secretary));
        let user = require_roles(&request, &[UserRole::Secretary, UserRole::Administrator]);
        assert!(user.is_ok());
    }

    #[test]
    fn disallowed_role_is_denied() {
        let request = request_with_role(Some(UserRole::Partner));
        let result = require_roles(&request, &[UserRole::Secretary, UserRole::Administrator]);
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn missing_role_is_denied() {
        let request = request_with_role(None);
        let result = require_roles(&request, &[UserRole::Patient]);
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn unauthenticated_request_is_rejected() {
        let request = Request::builder().uri("/patients").body(Body::empty()).unwrap();
        let result = require_roles(&request, &[UserRole::Patient]);
        assert!(matches!(result, Err(AppError::Auth(_))));
    }
}

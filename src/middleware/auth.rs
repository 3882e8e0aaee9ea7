// src/middleware/auth.rs

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{common::error::AppError, config::AppState, models::auth::Actor};

// Valida o Bearer token e guarda o ator nos "extensions" da requisição.
// O papel vem das claims assinadas, sem consulta ao banco.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::InvalidToken)?;

    let claims = app_state.auth_service.validate_token(bearer.token())?;

    request.extensions_mut().insert(AuthenticatedUser(Actor::from(&claims)));
    Ok(next.run(request).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Actor);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or(AppError::InvalidToken)
    }
}

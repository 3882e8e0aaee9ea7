// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{
        AuthResponse, LoginUserPayload, OtpSentResponse, OtpVerifiedResponse, RegisterUserPayload,
        SendOtpPayload, User, VerifyOtpPayload,
    },
};

// Handler de registro
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Usuário registrado", body = AuthResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "E-mail já cadastrado")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (token, user) = app_state.auth_service.register_user(&payload).await?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

// Handler de login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Login efetuado", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginUserPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;

    let (token, user) = app_state
        .auth_service
        .login_user(&payload.email, &payload.password)
        .await?;

    Ok(Json(AuthResponse { token, user }))
}

#[utoipa::path(
    post,
    path = "/api/auth/otp/send",
    tag = "Auth",
    request_body = SendOtpPayload,
    responses(
        (status = 200, description = "Código gerado", body = OtpSentResponse),
        (status = 404, description = "Usuário não encontrado")
    )
)]
pub async fn send_otp(
    State(app_state): State<AppState>,
    Json(payload): Json<SendOtpPayload>,
) -> Result<Json<OtpSentResponse>, AppError> {
    payload.validate()?;

    let expires_in_secs = app_state.auth_service.send_otp(&payload.email).await?;

    Ok(Json(OtpSentResponse { success: true, expires_in_secs }))
}

#[utoipa::path(
    post,
    path = "/api/auth/otp/verify",
    tag = "Auth",
    request_body = VerifyOtpPayload,
    responses(
        (status = 200, description = "E-mail verificado", body = OtpVerifiedResponse),
        (status = 401, description = "Código inválido ou expirado")
    )
)]
pub async fn verify_otp(
    State(app_state): State<AppState>,
    Json(payload): Json<VerifyOtpPayload>,
) -> Result<Json<OtpVerifiedResponse>, AppError> {
    payload.validate()?;

    app_state.auth_service.verify_otp(&payload.email, &payload.code).await?;

    Ok(Json(OtpVerifiedResponse { success: true, email_verified: true }))
}

// Handler da rota protegida /me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Usuário autenticado", body = User),
        (status = 401, description = "Token ausente ou inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> Result<Json<User>, AppError> {
    let user = app_state.auth_service.current_user(actor.id).await?;
    Ok(Json(user))
}

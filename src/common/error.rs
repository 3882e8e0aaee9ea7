// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Um único tipo de erro para repositórios, serviços e handlers.
// Cada variante pertence a uma categoria (validação, autenticação, permissão,
// não encontrado, conflito, interno) e vira um status HTTP no IntoResponse.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Código OTP inválido ou expirado")]
    InvalidOtp,

    #[error("{0}")]
    Forbidden(String),

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("{0} não encontrado(a)")]
    ResourceNotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Transição inválida: {action} não é permitido a partir de '{from}'")]
    InvalidTransition { from: String, action: String },

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::InvalidToken | AppError::InvalidOtp => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::UserNotFound | AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::EmailAlreadyExists
            | AppError::Conflict(_)
            | AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Retorna todos os detalhes da validação, campo a campo.
        if let AppError::ValidationError(errors) = &self {
            let mut details = std::collections::HashMap::new();
            for (field, field_errors) in errors.field_errors() {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                details.insert(field.to_string(), messages);
            }
            let body = Json(json!({
                "success": false,
                "message": "Um ou mais campos são inválidos.",
                "details": details,
            }));
            return (status, body).into_response();
        }

        // Erros internos: loga a causa real e devolve uma mensagem genérica.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro Interno do Servidor: {:?}", self);
            "Ocorreu um erro inesperado.".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({ "success": false, "message": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn categories_map_to_status_codes() {
        assert_eq!(AppError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::ResourceNotFound("Reserva".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InvalidTransition { from: "completed".into(), action: "accept".into() }
                .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::InternalServerError(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn conflict_is_rendered_in_envelope() {
        let response = AppError::Conflict("Reserva já aceita".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Reserva já aceita");
    }

    #[tokio::test]
    async fn internal_errors_hide_the_cause() {
        let response =
            AppError::InternalServerError(anyhow::anyhow!("senha do banco vazou")).into_response();
        let body = body_json(response).await;
        assert_eq!(body["message"], "Ocorreu um erro inesperado.");
    }
}

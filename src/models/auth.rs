// src/models/auth.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Customer,
    Provider,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Provider => "provider",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quem está fazendo a requisição (vem das claims do token).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<&Claims> for Actor {
    fn from(claims: &Claims) -> Self {
        Self { id: claims.sub, role: claims.role }
    }
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(example = "Maria Souza")]
    pub name: String,
    #[schema(example = "maria@exemplo.com")]
    pub email: String,
    pub phone: Option<String>,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: String,

    pub role: UserRole,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Dados para registro de um novo usuário
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserPayload {
    #[validate(length(min = 2, message = "O nome deve ter no mínimo 2 caracteres."))]
    #[schema(example = "Maria Souza")]
    pub name: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
    #[validate(length(min = 8, max = 20, message = "Telefone inválido."))]
    pub phone: Option<String>,
    /// `customer` (padrão) ou `provider`. Administradores não se registram.
    pub role: Option<UserRole>,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,      // Subject (ID do usuário)
    pub role: UserRole, // Papel usado pela política de acesso
    pub exp: usize,     // Expiration time (quando o token expira)
    pub iat: usize,     // Issued At (quando o token foi criado)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SendOtpPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyOtpPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(equal = 6, message = "O código deve ter 6 dígitos."))]
    #[schema(example = "482913")]
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtpSentResponse {
    pub success: bool,
    pub expires_in_secs: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerifiedResponse {
    pub success: bool,
    pub email_verified: bool,
}

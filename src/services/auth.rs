// src/services/auth.rs

use std::{sync::Arc, time::Duration};

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ProviderRepository, UserRepository},
    models::{
        auth::{Claims, RegisterUserPayload, User, UserRole},
        provider::CommissionRule,
    },
    services::otp_store::{generate_code, OtpCheck, OtpStore},
};

/// Gera um JWT HS256 com o papel do usuário nas claims.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    role: UserRole,
    ttl: chrono::Duration,
) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = now + ttl;

    let claims = Claims {
        sub: user_id,
        role,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;

    Ok(token_data.claims)
}

async fn hash_password(password: &str) -> Result<String, AppError> {
    let password_clone = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    provider_repo: ProviderRepository,
    pool: PgPool,
    jwt_secret: String,
    token_ttl: chrono::Duration,
    default_commission: CommissionRule,
    otp_store: Arc<dyn OtpStore>,
    otp_ttl: Duration,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_repo: UserRepository,
        provider_repo: ProviderRepository,
        pool: PgPool,
        jwt_secret: String,
        token_ttl: chrono::Duration,
        default_commission: CommissionRule,
        otp_store: Arc<dyn OtpStore>,
        otp_ttl: Duration,
    ) -> Self {
        Self {
            user_repo,
            provider_repo,
            pool,
            jwt_secret,
            token_ttl,
            default_commission,
            otp_store,
            otp_ttl,
        }
    }

    pub async fn register_user(&self, payload: &RegisterUserPayload) -> Result<(String, User), AppError> {
        let role = payload.role.unwrap_or(UserRole::Customer);
        if role == UserRole::Admin {
            return Err(AppError::Forbidden(
                "Não é possível registrar um administrador.".to_string(),
            ));
        }

        // Hashing fora da transação, pois não toca no banco
        let hashed_password = hash_password(&payload.password).await?;

        let mut tx = self.pool.begin().await?;

        let new_user = self
            .user_repo
            .create_user(
                &mut *tx,
                payload.name.trim(),
                &payload.email.to_lowercase(),
                &hashed_password,
                payload.phone.as_deref(),
                role,
            )
            .await?;

        // Prestador nasce com a comissão padrão da plataforma
        if role == UserRole::Provider {
            self.provider_repo
                .create_profile(&mut *tx, new_user.id, self.default_commission)
                .await?;
        }

        tx.commit().await?;

        tracing::info!("👤 Novo usuário {} registrado como {}", new_user.id, role);

        let token = self.create_token(&new_user)?;
        Ok((token, new_user))
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<(String, User), AppError> {
        let user = self
            .user_repo
            .find_by_email(&email.to_lowercase())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.create_token(&user)?;
        Ok((token, user))
    }

    // Só confere a assinatura e a validade; o papel vem das claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        decode_token(&self.jwt_secret, token)
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<User, AppError> {
        self.user_repo
            .find_by_id(&self.pool, user_id)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    /// Cria o administrador inicial se ele ainda não existir.
    pub async fn ensure_admin(&self, name: &str, email: &str, password: &str) -> Result<(), AppError> {
        let email = email.to_lowercase();
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Ok(());
        }

        let hashed_password = hash_password(password).await?;
        let admin = self
            .user_repo
            .create_user(&self.pool, name, &email, &hashed_password, None, UserRole::Admin)
            .await?;

        tracing::info!("🔑 Administrador inicial {} criado", admin.email);
        Ok(())
    }

    // =========================================================================
    //  OTP
    // =========================================================================

    pub async fn send_otp(&self, email: &str) -> Result<u64, AppError> {
        let email = email.to_lowercase();
        self.user_repo
            .find_by_email(&email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let code = generate_code();
        self.otp_store.put(&email, &code, self.otp_ttl).await;

        // A entrega (e-mail/SMS) é feita por um serviço externo
        tracing::info!("✉️ Código OTP gerado para {}", email);

        Ok(self.otp_ttl.as_secs())
    }

    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<(), AppError> {
        let email = email.to_lowercase();
        match self.otp_store.verify(&email, code).await {
            OtpCheck::Valid => {}
            OtpCheck::Invalid | OtpCheck::Missing => return Err(AppError::InvalidOtp),
        }

        if !self.user_repo.mark_email_verified(&email).await? {
            return Err(AppError::UserNotFound);
        }
        Ok(())
    }

    fn create_token(&self, user: &User) -> Result<String, AppError> {
        issue_token(&self.jwt_secret, user.id, user.role, self.token_ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "segredo-de-teste";

    #[test]
    fn token_round_trip_keeps_role() {
        let user_id = Uuid::new_v4();
        let token = issue_token(SECRET, user_id, UserRole::Provider, chrono::Duration::days(7)).unwrap();

        let claims = decode_token(SECRET, &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, UserRole::Provider);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token("outro", Uuid::new_v4(), UserRole::Admin, chrono::Duration::days(1)).unwrap();
        assert!(matches!(decode_token(SECRET, &token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token =
            issue_token(SECRET, Uuid::new_v4(), UserRole::Customer, chrono::Duration::hours(-2)).unwrap();
        assert!(matches!(decode_token(SECRET, &token), Err(AppError::InvalidToken)));
    }
}

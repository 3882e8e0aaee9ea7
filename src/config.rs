// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        BookingRepository, CatalogRepository, ComplaintRepository, InvoiceRepository,
        PaymentRepository, ProviderRepository, UserRepository,
    },
    models::provider::CommissionRule,
    services::{
        auth::AuthService,
        booking_service::BookingService,
        catalog_service::CatalogService,
        complaint_service::ComplaintService,
        invoice_service::InvoiceService,
        otp_store::{InMemoryOtpStore, OtpStore},
        payment_service::PaymentService,
        provider_service::ProviderService,
    },
};

// Credenciais do administrador criado na inicialização
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Configuração lida do ambiente (`.env` é carregado antes).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub jwt_ttl_days: i64,
    pub tax_rate: Decimal,
    pub default_commission_rate: Decimal,
    pub otp_ttl: Duration,
    pub otp_sweep_interval: Duration,
    pub admin: Option<AdminBootstrap>,
}

// Lê uma variável opcional, usando o padrão quando ausente
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} inválida ({}): {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(AdminBootstrap {
                name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrador".to_string()),
                email,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5)?,
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000".to_string())?,
            jwt_secret,
            jwt_ttl_days: env_or("JWT_TTL_DAYS", 7)?,
            tax_rate: env_or("TAX_RATE", Decimal::from(18))?,
            default_commission_rate: env_or("DEFAULT_COMMISSION_RATE", Decimal::from(10))?,
            otp_ttl: Duration::from_secs(env_or("OTP_TTL_SECS", 300)?),
            otp_sweep_interval: Duration::from_secs(env_or("OTP_SWEEP_SECS", 60)?),
            admin,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<AppConfig>,
    pub otp_store: Arc<dyn OtpStore>,
    pub auth_service: AuthService,
    pub catalog_service: CatalogService,
    pub provider_service: ProviderService,
    pub booking_service: BookingService,
    pub invoice_service: InvoiceService,
    pub payment_service: PaymentService,
    pub complaint_service: ComplaintService,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let otp_store: Arc<dyn OtpStore> = Arc::new(InMemoryOtpStore::default());
        Ok(Self::build(db_pool, config, otp_store))
    }

    /// Monta o gráfico de dependências sobre um pool já criado.
    pub fn build(db_pool: PgPool, config: AppConfig, otp_store: Arc<dyn OtpStore>) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let provider_repo = ProviderRepository::new(db_pool.clone());
        let catalog_repo = CatalogRepository::new(db_pool.clone());
        let booking_repo = BookingRepository::new(db_pool.clone());
        let invoice_repo = InvoiceRepository::new(db_pool.clone());
        let payment_repo = PaymentRepository::new(db_pool.clone());
        let complaint_repo = ComplaintRepository::new(db_pool.clone());

        let auth_service = AuthService::new(
            user_repo.clone(),
            provider_repo.clone(),
            db_pool.clone(),
            config.jwt_secret.clone(),
            chrono::Duration::days(config.jwt_ttl_days),
            CommissionRule::percentage(config.default_commission_rate),
            otp_store.clone(),
            config.otp_ttl,
        );

        let invoice_service = InvoiceService::new(
            db_pool.clone(),
            invoice_repo.clone(),
            booking_repo.clone(),
            user_repo.clone(),
            provider_repo.clone(),
            payment_repo.clone(),
            config.tax_rate,
        );

        let booking_service = BookingService::new(
            db_pool.clone(),
            booking_repo.clone(),
            catalog_repo.clone(),
            user_repo,
            invoice_service.clone(),
        );

        let payment_service = PaymentService::new(
            db_pool.clone(),
            payment_repo,
            invoice_repo,
            provider_repo.clone(),
        );

        let complaint_service = ComplaintService::new(db_pool.clone(), complaint_repo, booking_repo);

        Self {
            db_pool,
            config: Arc::new(config),
            otp_store,
            auth_service,
            catalog_service: CatalogService::new(catalog_repo),
            provider_service: ProviderService::new(provider_repo),
            booking_service,
            invoice_service,
            payment_service,
            complaint_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_optional_keys_fall_back_to_defaults() {
        let rate: Decimal = env_or("MARKETPLACE_TEST_UNSET_TAX_RATE", Decimal::from(18)).unwrap();
        assert_eq!(rate, Decimal::from(18));

        let secs: u64 = env_or("MARKETPLACE_TEST_UNSET_OTP_TTL", 300).unwrap();
        assert_eq!(secs, 300);
    }
}

// src/services/otp_store.rs

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use dashmap::DashMap;
use rand::Rng;
use sha2::{Digest, Sha256};
use tokio::{task::JoinHandle, time::Instant};

/// Resultado da conferência de um código.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Valid,
    Invalid,
    /// Expirado, inexistente ou bloqueado por tentativas.
    Missing,
}

/// Armazenamento de códigos com expiração, injetado no `AppState`.
/// A implementação em memória serve para uma instância só; para várias
/// instâncias basta outra implementação (Redis, tabela, ...).
#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn put(&self, key: &str, code: &str, ttl: Duration);
    /// Um código válido é consumido. Códigos errados contam tentativas.
    async fn verify(&self, key: &str, code: &str) -> OtpCheck;
    /// Remove entradas vencidas e devolve quantas saíram.
    async fn purge_expired(&self) -> usize;
}

struct OtpEntry {
    code_hash: String,
    expires_at: Instant,
    attempts: u32,
}

// O código em claro nunca fica guardado
fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct InMemoryOtpStore {
    entries: DashMap<String, OtpEntry>,
    max_attempts: u32,
}

impl InMemoryOtpStore {
    pub fn new(max_attempts: u32) -> Self {
        Self { entries: DashMap::new(), max_attempts }
    }
}

impl Default for InMemoryOtpStore {
    fn default() -> Self {
        Self::new(5)
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn put(&self, key: &str, code: &str, ttl: Duration) {
        let entry = OtpEntry {
            code_hash: hash_code(code),
            expires_at: Instant::now() + ttl,
            attempts: 0,
        };
        self.entries.insert(key.to_string(), entry);
    }

    async fn verify(&self, key: &str, code: &str) -> OtpCheck {
        let now = Instant::now();
        let code_hash = hash_code(code);

        // Consome de forma atômica: duas conferências simultâneas não passam juntas
        if self
            .entries
            .remove_if(key, |_, entry| now < entry.expires_at && entry.code_hash == code_hash)
            .is_some()
        {
            return OtpCheck::Valid;
        }

        let burned = match self.entries.get_mut(key) {
            None => return OtpCheck::Missing,
            Some(mut entry) => {
                if now >= entry.expires_at {
                    drop(entry);
                    self.entries.remove(key);
                    return OtpCheck::Missing;
                }
                entry.attempts += 1;
                entry.attempts >= self.max_attempts
            }
        };

        if burned {
            self.entries.remove(key);
        }
        OtpCheck::Invalid
    }

    async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }
}

// Código numérico de 6 dígitos
pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{n:06}")
}

/// Varredura periódica das entradas vencidas.
pub fn spawn_sweeper(store: Arc<dyn OtpStore>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let removed = store.purge_expired().await;
            if removed > 0 {
                tracing::debug!("🧹 {} códigos OTP expirados removidos", removed);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn valid_code_is_consumed() {
        let store = InMemoryOtpStore::default();
        store.put("maria@exemplo.com", "123456", TTL).await;

        assert_eq!(store.verify("maria@exemplo.com", "123456").await, OtpCheck::Valid);
        assert_eq!(store.verify("maria@exemplo.com", "123456").await, OtpCheck::Missing);
    }

    #[tokio::test]
    async fn expired_code_is_rejected() {
        let store = InMemoryOtpStore::default();
        store.put("maria@exemplo.com", "123456", Duration::ZERO).await;

        assert_eq!(store.verify("maria@exemplo.com", "123456").await, OtpCheck::Missing);
    }

    #[tokio::test]
    async fn too_many_attempts_burn_the_code() {
        let store = InMemoryOtpStore::new(3);
        store.put("joao@exemplo.com", "654321", TTL).await;

        for _ in 0..3 {
            assert_eq!(store.verify("joao@exemplo.com", "000000").await, OtpCheck::Invalid);
        }
        assert_eq!(store.verify("joao@exemplo.com", "654321").await, OtpCheck::Missing);
    }

    #[tokio::test]
    async fn purge_removes_only_expired_entries() {
        let store = InMemoryOtpStore::default();
        store.put("a@exemplo.com", "111111", Duration::ZERO).await;
        store.put("b@exemplo.com", "222222", TTL).await;

        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.verify("b@exemplo.com", "222222").await, OtpCheck::Valid);
    }

    #[tokio::test]
    async fn only_the_hash_is_kept() {
        let store = InMemoryOtpStore::default();
        store.put("ana@exemplo.com", "424242", TTL).await;

        let entry = store.entries.get("ana@exemplo.com").unwrap();
        assert_ne!(entry.code_hash, "424242");
        assert_eq!(entry.code_hash, hash_code("424242"));
        assert_eq!(entry.code_hash.len(), 64);
    }

    #[test]
    fn codes_have_six_digits() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}

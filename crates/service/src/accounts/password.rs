use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use tokio::task::JoinSet;

use crate::errors::ServiceError;

/// Passwords hashed per blocking task.
const HASH_CHUNK: usize = 32;

/// Salted argon2 PHC string for `raw`.
pub fn hash_password(raw: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ServiceError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(raw: &str, phc: &str) -> bool {
    PasswordHash::new(phc)
        .map(|parsed| Argon2::default().verify_password(raw.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

/// Hash a batch off the async runtime. Output order matches input order.
pub async fn hash_passwords(raw: Vec<String>) -> Result<Vec<String>, ServiceError> {
    let mut tasks = JoinSet::new();
    let mut chunks = 0;
    let mut iter = raw.into_iter().peekable();
    while iter.peek().is_some() {
        let chunk: Vec<String> = iter.by_ref().take(HASH_CHUNK).collect();
        let idx = chunks;
        chunks += 1;
        tasks.spawn_blocking(move || {
            let hashed = chunk.iter().map(|p| hash_password(p)).collect::<Result<Vec<_>, _>>();
            (idx, hashed)
        });
    }

    let mut parts: Vec<Option<Vec<String>>> = vec![None; chunks];
    while let Some(joined) = tasks.join_next().await {
        let (idx, hashed) = joined.map_err(|e| ServiceError::Internal(format!("hashing task failed: {e}")))?;
        parts[idx] = Some(hashed?);
    }
    Ok(parts.into_iter().flatten().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_salted_and_verifiable() {
        let a = hash_password("Secret99").unwrap();
        let b = hash_password("Secret99").unwrap();
        assert!(a.starts_with("$argon2"));
        assert_ne!(a, b);
        assert!(verify_password("Secret99", &a));
        assert!(!verify_password("secret99", &a));
        assert!(!verify_password("Secret99", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn batch_hashing_keeps_order() {
        let raw: Vec<String> = (0..(HASH_CHUNK + 3)).map(|i| format!("pw{i}")).collect();
        let hashed = hash_passwords(raw.clone()).await.unwrap();
        assert_eq!(hashed.len(), raw.len());
        for (p, h) in raw.iter().zip(&hashed) {
            assert!(verify_password(p, h));
        }
        assert!(hash_passwords(Vec::new()).await.unwrap().is_empty());
    }
}

// 🔐 Credential Store - password digests, signup and login
//
// Passwords are stored as the lowercase-hex SHA-256 of their UTF-8 bytes.
// NOTE: unsalted single-round SHA-256 is kept for compatibility with the
// existing `users` table. It is weak against offline guessing; a hardened
// deployment should swap in a salted, iterated KDF behind `hash_password`
// while keeping `verify` returning a plain bool.

use crate::db::{Ack, Gateway, QueryError, Scalar};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Hex-encoded SHA-256 of `password`. Always 64 characters.
pub fn hash_password(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The insert failed, including when the store enforces username uniqueness
    #[error("storage rejected account '{username}': {source}")]
    StorageRejected {
        username: String,
        #[source]
        source: QueryError,
    },
}

/// Proof of a successful login, handed to operations that require one.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    id: Uuid,
    username: String,
    started_at: DateTime<Utc>,
}

impl Session {
    fn new(username: &str) -> Self {
        Session {
            id: Uuid::new_v4(),
            username: username.to_string(),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

pub struct CredentialStore<'a> {
    gateway: &'a Gateway,
}

impl<'a> CredentialStore<'a> {
    pub fn new(gateway: &'a Gateway) -> Self {
        CredentialStore { gateway }
    }

    /// Create an account. Uniqueness is left entirely to the store's
    /// constraint on `users.username`; without one, duplicates are accepted.
    pub fn register(&self, username: &str, password: &str) -> Result<Ack, RegistrationError> {
        let digest = hash_password(password);

        let ack = self
            .gateway
            .execute(
                "INSERT INTO users (username, password) VALUES (?1, ?2)",
                params![username, digest],
            )
            .map_err(|source| RegistrationError::StorageRejected {
                username: username.to_string(),
                source,
            })?;

        info!(username, "account registered");
        Ok(ack)
    }

    /// True iff `username` exists and its stored digest equals `hash_password(password)`.
    /// Storage failures count as a failed login.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let digest = hash_password(password);

        match self.gateway.fetch_scalar(
            "SELECT 1 FROM users WHERE username = ?1 AND password = ?2 LIMIT 1",
            params![username, digest],
        ) {
            Ok(Scalar::Value(_)) => true,
            Ok(Scalar::Empty) => false,
            Err(e) => {
                warn!(username, error = %e, "credential lookup failed");
                false
            }
        }
    }

    /// Verify and, on success, open a session for `username`.
    pub fn login(&self, username: &str, password: &str) -> Option<Session> {
        if self.verify(username, password) {
            let session = Session::new(username);
            info!(username, session = %session.id, "logged in");
            Some(session)
        } else {
            warn!(username, "invalid credentials");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fixtures, Gateway, QueryErrorKind};

    #[test]
    fn test_hash_password_known_value() {
        // SHA-256 of "secret123"
        assert_eq!(
            hash_password("secret123"),
            "fcf730b6d95236ecd3c9fc2d92d7b6b2bb061514961aec041d6c7a7192f592e4"
        );
    }

    #[test]
    fn test_hash_password_deterministic() {
        let first = hash_password("correct horse battery staple");
        let second = hash_password("correct horse battery staple");

        assert_eq!(first, second);
        assert_eq!(first.len(), 64, "SHA-256 hash should be 64 hex characters");
        assert_ne!(first, hash_password("correct horse battery stapler"));
    }

    #[test]
    fn test_register_then_verify() {
        let gateway = fixtures::gateway();
        let store = CredentialStore::new(&gateway);

        store.register("alice", "secret123").unwrap();

        assert!(store.verify("alice", "secret123"));
        assert!(!store.verify("alice", "wrong"));
        assert!(!store.verify("bob", "secret123"));
    }

    #[test]
    fn test_plaintext_never_stored() {
        let gateway = fixtures::gateway();
        let store = CredentialStore::new(&gateway);
        store.register("alice", "secret123").unwrap();

        let stored = gateway
            .fetch_scalar("SELECT password FROM users WHERE username = ?1", params!["alice"])
            .unwrap();
        assert_eq!(stored.value().as_str(), Some(hash_password("secret123").as_str()));
    }

    #[test]
    fn test_duplicate_username_rejected_by_store() {
        let gateway = fixtures::gateway();
        let store = CredentialStore::new(&gateway);
        store.register("alice", "secret123").unwrap();

        let err = store.register("alice", "other").unwrap_err();
        let RegistrationError::StorageRejected { username, source } = err;
        assert_eq!(username, "alice");
        assert!(source.is_constraint_violation());

        // First password still works
        assert!(store.verify("alice", "secret123"));
    }

    #[test]
    fn test_duplicate_accepted_without_store_constraint() {
        let gateway = Gateway::open_in_memory().unwrap();
        gateway
            .lease()
            .unwrap()
            .execute_batch("CREATE TABLE users (username TEXT, password TEXT);")
            .unwrap();
        let store = CredentialStore::new(&gateway);

        assert!(store.register("alice", "one").is_ok());
        assert!(store.register("alice", "two").is_ok());
        assert!(store.verify("alice", "one"));
        assert!(store.verify("alice", "two"));
    }

    #[test]
    fn test_verify_without_users_table_is_false() {
        let gateway = Gateway::open_in_memory().unwrap();
        let store = CredentialStore::new(&gateway);

        assert!(!store.verify("alice", "secret123"));

        let err = store.register("alice", "secret123").unwrap_err();
        let RegistrationError::StorageRejected { source, .. } = err;
        assert_eq!(source.kind(), QueryErrorKind::Statement);
    }

    #[test]
    fn test_login_returns_session() {
        let gateway = fixtures::gateway();
        let store = CredentialStore::new(&gateway);
        store.register("alice", "secret123").unwrap();

        let session = store.login("alice", "secret123").unwrap();
        assert_eq!(session.username(), "alice");
        assert!(session.started_at() <= Utc::now());

        let again = store.login("alice", "secret123").unwrap();
        assert_ne!(session.id(), again.id());

        assert!(store.login("alice", "wrong").is_none());
    }
}

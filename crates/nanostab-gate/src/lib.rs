//! Password gate in front of the dataset browser.
//!
//! The expected digest ships inside the binary and the comparison runs
//! locally, so this keeps casual visitors out and nothing more. It is not
//! access control over the dataset.

mod store;

pub use store::{default_gate_dir, FileSecretStore, MemorySecretStore, SecretStore, GATE_DIR_ENV};

use log::{debug, warn};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// SHA-256 hex digest of the shared password.
pub const EXPECTED_DIGEST: &str =
    "c956bdd0bc06cb6bcf0ea845b90498f2c2adbbeef9cab3d16ec66f3798bf70d3";

#[derive(Debug, Error)]
pub enum GateError {
    #[error("incorrect password")]
    Mismatch,
    #[error("secret storage failed: {0}")]
    Storage(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Unauthenticated,
    Checking,
    Authenticated,
}

/// Lowercase hex SHA-256 of `text`'s UTF-8 bytes.
pub fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

pub struct AccessGate<S: SecretStore> {
    store: S,
    expected_digest: String,
    state: GateState,
}

impl<S: SecretStore> AccessGate<S> {
    pub fn new(store: S) -> Self {
        Self::with_digest(store, EXPECTED_DIGEST)
    }

    /// Gate accepting the secret whose SHA-256 hex digest is `digest`.
    pub fn with_digest(store: S, digest: impl Into<String>) -> Self {
        Self {
            store,
            expected_digest: digest.into().trim().to_ascii_lowercase(),
            state: GateState::Unauthenticated,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == GateState::Authenticated
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Unlock from a previously remembered secret. A remembered secret that
    /// no longer matches is discarded.
    pub fn start(&mut self) -> Result<GateState, GateError> {
        let Some(saved) = self.store.load()? else {
            self.transition(GateState::Unauthenticated);
            return Ok(self.state);
        };
        self.transition(GateState::Checking);
        if self.matches(&saved) {
            self.transition(GateState::Authenticated);
        } else {
            warn!("remembered secret does not match; discarding it");
            self.store.clear()?;
            self.transition(GateState::Unauthenticated);
        }
        Ok(self.state)
    }

    /// Check `candidate`; on success remember it for the next `start`.
    pub fn submit(&mut self, candidate: &str) -> Result<(), GateError> {
        self.transition(GateState::Checking);
        if !self.matches(candidate) {
            self.transition(GateState::Unauthenticated);
            return Err(GateError::Mismatch);
        }
        if let Err(err) = self.store.save(candidate) {
            self.transition(GateState::Unauthenticated);
            return Err(err.into());
        }
        self.transition(GateState::Authenticated);
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), GateError> {
        self.store.clear()?;
        self.transition(GateState::Unauthenticated);
        Ok(())
    }

    fn matches(&self, candidate: &str) -> bool {
        sha256_hex(candidate) == self.expected_digest
    }

    fn transition(&mut self, next: GateState) {
        if self.state != next {
            debug!("gate {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

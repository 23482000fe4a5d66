use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferralErrorKind {
    /// Settled through `reject` with a caller-supplied reason.
    Rejected,
    /// The settle capability was dropped before anyone settled the deferral.
    Abandoned,
    AlreadyInstalled,
    NotInstalled,
}

/// Failure payload carried by a rejected [`Deferred`](crate::deferral::Deferred).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct DeferralError {
    pub kind: DeferralErrorKind,
    pub message: String,
}

impl DeferralError {
    pub fn new(kind: DeferralErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.kind == DeferralErrorKind::Rejected
    }

    pub fn is_abandoned(&self) -> bool {
        self.kind == DeferralErrorKind::Abandoned
    }
}

impl From<&str> for DeferralError {
    fn from(message: &str) -> Self {
        rejected(message)
    }
}

impl From<String> for DeferralError {
    fn from(message: String) -> Self {
        rejected(message)
    }
}

pub fn rejected(message: impl Into<String>) -> DeferralError {
    DeferralError::new(DeferralErrorKind::Rejected, message)
}

pub fn abandoned(message: impl Into<String>) -> DeferralError {
    DeferralError::new(DeferralErrorKind::Abandoned, message)
}

pub fn already_installed(message: impl Into<String>) -> DeferralError {
    DeferralError::new(DeferralErrorKind::AlreadyInstalled, message)
}

pub fn not_installed(message: impl Into<String>) -> DeferralError {
    DeferralError::new(DeferralErrorKind::NotInstalled, message)
}

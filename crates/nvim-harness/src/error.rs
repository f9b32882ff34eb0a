//! Harness error taxonomy.
//!
//! Every failure the harness can surface to a test is a [`HarnessError`]
//! carrying an [`ErrorKind`] discriminator, a human readable message and an
//! optional JSON context. Nothing is retried or swallowed on the way to the
//! caller.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Discriminator for [`HarnessError`], serialized on the wire as `kind`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorKind {
    /// A fixture key outside the catalog was requested.
    UnknownFixtureKey,
    /// A startup-script modification outside the vocabulary was requested.
    UnknownModification,
    /// A `{token}` in terminal input is not a known key.
    UnknownKeyToken,
    /// The test directory could not be materialized.
    ProvisionFailed,
    /// The editor did not reach readiness within the bounded wait.
    LaunchFailed,
    /// The session has ended; no further input is accepted.
    SessionTerminated,
    /// A bounded wait expired.
    Timeout,
    /// The harness configuration is invalid or unreadable.
    Config,
    /// A request could not be decoded.
    Protocol,
    /// Unexpected I/O failure outside provisioning.
    Io,
    /// Internal invariant failure (poisoned lock, closed channel).
    Internal,
}

impl ErrorKind {
    /// Stable error code for the kind.
    pub fn code(self) -> &'static str {
        match self {
            Self::UnknownFixtureKey => "E_UNKNOWN_FIXTURE_KEY",
            Self::UnknownModification => "E_UNKNOWN_MODIFICATION",
            Self::UnknownKeyToken => "E_UNKNOWN_KEY_TOKEN",
            Self::ProvisionFailed => "E_PROVISION_FAILED",
            Self::LaunchFailed => "E_LAUNCH_FAILED",
            Self::SessionTerminated => "E_SESSION_TERMINATED",
            Self::Timeout => "E_TIMEOUT",
            Self::Config => "E_CONFIG",
            Self::Protocol => "E_PROTOCOL",
            Self::Io => "E_IO",
            Self::Internal => "E_INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Wire representation of an error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error kind discriminator.
    pub kind: ErrorKind,
    /// Stable error code.
    pub code: String,
    /// Human readable message.
    pub message: String,
    /// Structured details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// Error surfaced by every harness operation.
#[derive(Debug, Error, Diagnostic)]
#[error("{kind}: {message}")]
pub struct HarnessError {
    /// Error kind.
    pub kind: ErrorKind,
    /// Human readable message.
    pub message: String,
    /// Structured details.
    pub context: Option<Value>,
}

impl HarnessError {
    /// Build an error of any kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>, context: impl Into<Option<Value>>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: context.into(),
        }
    }

    pub fn unknown_fixture_key(key: &str) -> Self {
        Self::new(
            ErrorKind::UnknownFixtureKey,
            format!("'{key}' is not a fixture key"),
            serde_json::json!({
                "received": key,
                "known_keys": crate::fixtures::FixtureKey::ALL
                    .iter()
                    .map(|key| key.as_str())
                    .collect::<Vec<_>>(),
            }),
        )
    }

    pub fn unknown_modification(name: &str) -> Self {
        Self::new(
            ErrorKind::UnknownModification,
            format!("'{name}' is not a startup script modification"),
            serde_json::json!({
                "received": name,
                "known_modifications": crate::model::StartupScriptModification::ALL
                    .iter()
                    .map(|modification| modification.as_str())
                    .collect::<Vec<_>>(),
            }),
        )
    }

    pub fn unknown_key_token(token: &str) -> Self {
        Self::new(
            ErrorKind::UnknownKeyToken,
            format!("unsupported key token '{{{token}}}'"),
            serde_json::json!({
                "received": token,
                "supported_tokens": crate::keys::SUPPORTED_TOKENS,
                "note": "chords use control+<letter> or alt+<char>; write '{{' for a literal brace",
            }),
        )
    }

    pub fn provision(message: impl Into<String>, path: &std::path::Path, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::ProvisionFailed,
            message,
            serde_json::json!({
                "path": path.display().to_string(),
                "source": err.to_string(),
            }),
        )
    }

    pub fn launch_failed(message: impl Into<String>, context: impl Into<Option<Value>>) -> Self {
        Self::new(ErrorKind::LaunchFailed, message, context)
    }

    pub fn session_terminated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SessionTerminated, message, None)
    }

    pub fn timeout(message: impl Into<String>, context: impl Into<Option<Value>>) -> Self {
        Self::new(ErrorKind::Timeout, message, context)
    }

    pub fn config(message: impl Into<String>, context: impl Into<Option<Value>>) -> Self {
        Self::new(ErrorKind::Config, message, context)
    }

    pub fn protocol(message: impl Into<String>, context: impl Into<Option<Value>>) -> Self {
        Self::new(ErrorKind::Protocol, message, context)
    }

    pub fn io(message: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::Io,
            message,
            serde_json::json!({ "source": err.to_string() }),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message, None)
    }

    /// Stable code of this error's kind.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo {
            kind: self.kind,
            code: self.code().to_string(),
            message: self.message.clone(),
            context: self.context.clone(),
        }
    }
}

impl From<ErrorInfo> for HarnessError {
    fn from(info: ErrorInfo) -> Self {
        Self::new(info.kind, info.message, info.context)
    }
}

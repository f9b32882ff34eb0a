use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one editor session.
///
/// Transitions only move forward:
/// `Requested → Provisioning → Launching → Ready → Terminated`, and any state
/// may jump straight to `Terminated`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Requested,
    Provisioning,
    Launching,
    Ready,
    Terminated,
}

impl SessionState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        match (self, next) {
            (Self::Terminated, _) => false,
            (_, Self::Terminated) => true,
            (Self::Requested, Self::Provisioning)
            | (Self::Provisioning, Self::Launching)
            | (Self::Launching, Self::Ready) => true,
            _ => false,
        }
    }

    pub fn is_live(self) -> bool {
        !matches!(self, Self::Terminated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Requested => "requested",
            Self::Provisioning => "provisioning",
            Self::Launching => "launching",
            Self::Ready => "ready",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

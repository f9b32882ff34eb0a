//! nvim-harness: end-to-end test harness for terminal editors.
//!
//! Tests ask for a uniquely provisioned directory of known fixtures, start
//! Neovim inside it on a pseudo-terminal, type symbolic keys into it and
//! assert on rendered screen snapshots. Fixture names are a closed enum, so a
//! test cannot reference a file the harness does not create.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

pub mod bootstrap;
pub mod bridge;
pub mod client;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod keys;
pub mod model;
pub mod provision;
pub mod session;
pub mod terminal;

pub use crate::client::{LocalHarness, TerminalHarness};
pub use crate::error::{ErrorKind, HarnessError, HarnessResult};
pub use crate::fixtures::{FileEntry, FixtureKey};
pub use crate::model::*;

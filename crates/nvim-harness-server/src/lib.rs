//! HTTP and WebSocket front end for nvim-harness.
//!
//! [`api::router`] exposes a [`BootstrapService`](nvim_harness::bootstrap::BootstrapService)
//! to remote test runners and [`client::HttpHarness`] is the matching client,
//! implementing the same [`TerminalHarness`](nvim_harness::TerminalHarness)
//! trait as the in-process harness.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

pub mod api;
pub mod client;
mod ws;

pub use api::router;
pub use client::HttpHarness;

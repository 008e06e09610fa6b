//! # pulse-core
//!
//! Shared vocabulary for the Pulse real-time notification channel.
//!
//! Every other Pulse crate depends on the types defined here:
//!
//! - **Updates**: [`UpdateKind`] and [`UpdateDescriptor`], the values fanned out
//!   to application consumers when server data changes
//! - **Wire frames**: [`InboundMessage`] parsing, [`CloseFrame`] and close codes
//! - **Retry**: [`RetryBudget`] with linear reconnect backoff
//! - **Errors**: [`CoreError`] via `thiserror`
//! - **Logging**: `tracing` subscriber setup and log capture for tests

#![deny(unsafe_code)]

pub mod constants;
pub mod errors;
pub mod logging;
pub mod retry;
pub mod update;
pub mod wire;

pub use errors::CoreError;
pub use retry::RetryBudget;
pub use update::{UpdateDescriptor, UpdateKind};
pub use wire::{CloseFrame, InboundKind, InboundMessage};

// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! ccapi core - canonical types shared by remote generation adapters.
//!
//! ## Core Modules
//!
//! - [`types`]: Canonical media buffers and task state ([`MediaBuffer`], [`ImageBuffer`],
//!   [`GenerationTask`])
//! - [`error`]: Error taxonomy ([`CcApiError`])
//! - [`credentials`]: Argument → environment → file credential resolution
//! - [`clock`]: Injectable clock and sleeper used by polling and caching
//! - [`cache`]: Advisory request memoization with expiry

// Re-export async_trait for transport and sleeper implementations
pub use async_trait::async_trait;

pub mod cache;
pub mod clock;
pub mod credentials;
pub mod error;
pub mod types;

pub use error::{CcApiError, Result};

pub use types::{ChannelLayout, GenerationTask, ImageBuffer, MediaBuffer, TaskStatus};

pub use credentials::{Credential, CredentialResolver, CredentialSource};

pub use clock::{Clock, Sleeper, SystemClock, TokioSleeper};

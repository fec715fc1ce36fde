// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Media codec, transport and provider adapters for the ccapi plugin pack.
//!
//! - [`audio`], [`containers`] and [`image`] convert between provider wire formats and the
//!   canonical buffers of `ccapi-core`.
//! - [`transport`] holds the HTTP seam and the submit/poll [`transport::AsyncTaskClient`].
//! - [`providers`] builds request payloads and decodes responses for each backend.
//! - [`fallback`] is the opt-in placeholder policy for hosts.

pub mod audio;
pub mod containers;
pub mod fallback;
pub mod image;
pub mod providers;
pub mod transport;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub mod test_utils;

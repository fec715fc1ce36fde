// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

pub mod http;
pub mod task_client;

#[cfg(feature = "http")]
pub use http::{HttpSettings, ReqwestTransport};
pub use http::{HttpResponse, HttpTransport, MultipartFile, MultipartForm};
pub use task_client::{parse_task_status, AsyncTaskClient, PollPolicy};

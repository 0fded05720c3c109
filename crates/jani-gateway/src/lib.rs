// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Telegram Mini App.
//!
//! Every `/api` route is authenticated with the Mini App init data the
//! client forwards, then handed to the shared [`ChatOrchestrator`]. Chat
//! replies can be returned as one JSON body or streamed as Server-Sent
//! Events.
//!
//! [`ChatOrchestrator`]: jani_agent::ChatOrchestrator

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod sse;

pub use error::ApiError;
pub use server::{GatewayState, build_router, start_server};

// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram Mini App init-data verification.
//!
//! The Mini App forwards the `initData` query string it received from
//! Telegram. Its `hash` is an HMAC-SHA256 over the remaining pairs, keyed
//! by a secret derived from the bot token. [`validate_init_data`] checks
//! the signature and the `auth_date` freshness window and returns an
//! [`AuthResult`](jani_core::types::AuthResult).

pub mod init_data;

pub use init_data::{
    InitDataError, InitDataValidator, SecretSource, build_check_string, sign_init_data,
    validate_init_data, validate_init_data_now,
};

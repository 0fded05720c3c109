// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HMAC verification of Telegram init data.

use hmac::{Hmac, Mac};
use jani_config::model::AuthConfig;
use jani_core::JaniError;
use jani_core::types::{AuthResult, TelegramUser};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Key used to derive the signing secret from a bot token.
const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

/// Why a claims string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitDataError {
    #[error("hash is required in init data")]
    MissingHash,

    #[error("init data secret is not configured")]
    Configuration,

    #[error("invalid init data signature")]
    InvalidSignature,

    #[error("auth_date is required in init data")]
    MissingAuthDate,

    #[error("auth_date must be a number")]
    InvalidAuthDate,

    #[error("init data has expired")]
    Expired,
}

impl InitDataError {
    /// Stable error code surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            InitDataError::MissingHash => "MISSING_HASH",
            InitDataError::Configuration => "CONFIGURATION",
            InitDataError::InvalidSignature => "INVALID_SIGNATURE",
            InitDataError::MissingAuthDate => "MISSING_AUTH_DATE",
            InitDataError::InvalidAuthDate => "INVALID_AUTH_DATE",
            InitDataError::Expired => "EXPIRED",
        }
    }
}

impl From<InitDataError> for JaniError {
    fn from(err: InitDataError) -> Self {
        match err {
            InitDataError::Configuration => JaniError::Config(err.to_string()),
            other => JaniError::Validation {
                code: other.code(),
                message: other.to_string(),
            },
        }
    }
}

/// Where the HMAC secret comes from.
///
/// An explicit `secret_key` wins over `bot_token`. A 64-character hex
/// secret is decoded; any other value is used as raw bytes.
#[derive(Clone, Default)]
pub struct SecretSource {
    pub secret_key: Option<String>,
    pub bot_token: Option<String>,
}

impl SecretSource {
    pub fn bot_token(token: impl Into<String>) -> Self {
        Self {
            secret_key: None,
            bot_token: Some(token.into()),
        }
    }

    pub fn secret_key(key: impl Into<String>) -> Self {
        Self {
            secret_key: Some(key.into()),
            bot_token: None,
        }
    }

    /// Resolves the signing key bytes.
    pub fn resolve(&self) -> Result<Vec<u8>, InitDataError> {
        if let Some(key) = self.secret_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            if key.len() == 64 && key.bytes().all(|b| b.is_ascii_hexdigit()) {
                return hex::decode(key).map_err(|_| InitDataError::Configuration);
            }
            return Ok(key.as_bytes().to_vec());
        }

        if let Some(token) = self.bot_token.as_deref().filter(|t| !t.is_empty()) {
            let mut mac = HmacSha256::new_from_slice(WEB_APP_DATA_KEY)
                .map_err(|_| InitDataError::Configuration)?;
            mac.update(token.as_bytes());
            return Ok(mac.finalize().into_bytes().to_vec());
        }

        Err(InitDataError::Configuration)
    }
}

impl std::fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretSource")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Sorted `key=value` lines over every pair, joined by `\n`.
pub fn build_check_string(pairs: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = pairs.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Validates raw init data against `secret`.
///
/// `max_age_secs` of `None` disables the freshness check. `now` is unix
/// seconds; an `auth_date` exactly `max_age_secs` old is still accepted.
pub fn validate_init_data(
    raw: &str,
    secret: &SecretSource,
    max_age_secs: Option<u64>,
    now: i64,
) -> Result<AuthResult, InitDataError> {
    let mut claims: Vec<(String, String)> = url::form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let hash_index = claims
        .iter()
        .position(|(k, _)| k == "hash")
        .ok_or(InitDataError::MissingHash)?;
    let (_, hash) = claims.remove(hash_index);
    claims.retain(|(k, _)| k != "hash");
    if hash.is_empty() {
        return Err(InitDataError::MissingHash);
    }

    let key = secret.resolve()?;
    let check_string = build_check_string(&claims);

    let provided = hex::decode(hash.trim()).map_err(|_| InitDataError::InvalidSignature)?;
    let mut mac = HmacSha256::new_from_slice(&key).map_err(|_| InitDataError::Configuration)?;
    mac.update(check_string.as_bytes());
    // verify_slice rejects a length mismatch before the constant-time compare.
    mac.verify_slice(&provided)
        .map_err(|_| InitDataError::InvalidSignature)?;

    let auth_date_raw = claims
        .iter()
        .find(|(k, _)| k == "auth_date")
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
        .ok_or(InitDataError::MissingAuthDate)?;
    let auth_timestamp: i64 = auth_date_raw
        .trim()
        .parse()
        .map_err(|_| InitDataError::InvalidAuthDate)?;

    if let Some(max_age) = max_age_secs {
        let age = now.saturating_sub(auth_timestamp);
        if age > i64::try_from(max_age).unwrap_or(i64::MAX) {
            return Err(InitDataError::Expired);
        }
    }

    let parsed_user = claims
        .iter()
        .find(|(k, _)| k == "user")
        .and_then(|(_, v)| match serde_json::from_str::<TelegramUser>(v) {
            Ok(user) => Some(user),
            Err(e) => {
                debug!(error = %e, "init data user payload is not valid JSON");
                None
            }
        });

    Ok(AuthResult {
        identity_id: parsed_user.as_ref().map(|u| u.id),
        auth_timestamp,
        raw_claims: claims,
        parsed_user,
    })
}

/// [`validate_init_data`] against the wall clock.
pub fn validate_init_data_now(
    raw: &str,
    secret: &SecretSource,
    max_age_secs: Option<u64>,
) -> Result<AuthResult, InitDataError> {
    validate_init_data(raw, secret, max_age_secs, chrono::Utc::now().timestamp())
}

/// Signs `pairs` and returns a URL-encoded init data string with `hash`
/// appended. Mirrors what Telegram produces for a Mini App launch.
pub fn sign_init_data(
    pairs: &[(&str, &str)],
    secret: &SecretSource,
) -> Result<String, InitDataError> {
    let owned: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let key = secret.resolve()?;
    let mut mac = HmacSha256::new_from_slice(&key).map_err(|_| InitDataError::Configuration)?;
    mac.update(build_check_string(&owned).as_bytes());
    let hash = hex::encode(mac.finalize().into_bytes());

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in pairs {
        serializer.append_pair(k, v);
    }
    serializer.append_pair("hash", &hash);
    Ok(serializer.finish())
}

/// Validator bound to the configured secret and freshness window.
#[derive(Debug, Clone)]
pub struct InitDataValidator {
    secret: SecretSource,
    max_age_secs: Option<u64>,
}

impl InitDataValidator {
    pub fn new(secret: SecretSource, max_age_secs: Option<u64>) -> Self {
        Self {
            secret,
            max_age_secs,
        }
    }

    /// Builds a validator from `[auth]`. `max_age_secs = 0` disables expiry.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            secret: SecretSource {
                secret_key: config.secret_key.clone(),
                bot_token: config.bot_token.clone(),
            },
            max_age_secs: (config.max_age_secs > 0).then_some(config.max_age_secs),
        }
    }

    pub fn max_age_secs(&self) -> Option<u64> {
        self.max_age_secs
    }

    pub fn validate(&self, raw: &str) -> Result<AuthResult, InitDataError> {
        validate_init_data_now(raw, &self.secret, self.max_age_secs)
    }

    pub fn validate_at(&self, raw: &str, now: i64) -> Result<AuthResult, InitDataError> {
        validate_init_data(raw, &self.secret, self.max_age_secs, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT_TOKEN: &str = "123456789:ABCdefGHIjklMNOpqrSTUvwxYZ0123456789";
    const NOW: i64 = 1_700_000_000;
    const USER: &str = r#"{"id":42,"first_name":"Ada","username":"ada"}"#;

    fn signed(auth_date: i64) -> String {
        let date = auth_date.to_string();
        sign_init_data(
            &[("query_id", "AAF"), ("user", USER), ("auth_date", &date)],
            &SecretSource::bot_token(BOT_TOKEN),
        )
        .unwrap()
    }

    #[test]
    fn valid_payload_returns_embedded_user() {
        let raw = signed(NOW - 10);
        let result =
            validate_init_data(&raw, &SecretSource::bot_token(BOT_TOKEN), Some(86_400), NOW)
                .unwrap();
        assert_eq!(result.identity_id, Some(42));
        assert_eq!(result.auth_timestamp, NOW - 10);
        let user = result.parsed_user.unwrap();
        assert_eq!(user.first_name, "Ada");
        assert_eq!(user.username.as_deref(), Some("ada"));
        assert!(result.raw_claims.iter().all(|(k, _)| k != "hash"));
        assert_eq!(result.raw_claims.len(), 3);
    }

    #[test]
    fn missing_hash_is_reported_first() {
        let err = validate_init_data("auth_date=1", &SecretSource::default(), None, NOW)
            .unwrap_err();
        assert_eq!(err, InitDataError::MissingHash);
    }

    #[test]
    fn missing_secret_is_a_configuration_error() {
        let raw = signed(NOW);
        let err = validate_init_data(&raw, &SecretSource::default(), None, NOW).unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION");
        assert!(matches!(JaniError::from(err), JaniError::Config(_)));
    }

    #[test]
    fn wrong_token_fails_signature() {
        let raw = signed(NOW);
        let err = validate_init_data(&raw, &SecretSource::bot_token("1:other"), None, NOW)
            .unwrap_err();
        assert_eq!(err, InitDataError::InvalidSignature);
    }

    #[test]
    fn truncated_or_non_hex_hash_fails_signature() {
        let raw = signed(NOW);
        let truncated = &raw[..raw.len() - 2];
        let secret = SecretSource::bot_token(BOT_TOKEN);
        assert_eq!(
            validate_init_data(truncated, &secret, None, NOW).unwrap_err(),
            InitDataError::InvalidSignature
        );
        let garbage = format!("{}zz", &raw[..raw.len() - 2]);
        assert_eq!(
            validate_init_data(&garbage, &secret, None, NOW).unwrap_err(),
            InitDataError::InvalidSignature
        );
    }

    #[test]
    fn freshness_boundary_is_inclusive() {
        let secret = SecretSource::bot_token(BOT_TOKEN);
        let at_boundary = signed(NOW - 3600);
        assert!(validate_init_data(&at_boundary, &secret, Some(3600), NOW).is_ok());

        let past = signed(NOW - 3601);
        assert_eq!(
            validate_init_data(&past, &secret, Some(3600), NOW).unwrap_err(),
            InitDataError::Expired
        );
        assert!(validate_init_data(&past, &secret, None, NOW).is_ok());
    }

    #[test]
    fn auth_date_must_be_present_and_numeric() {
        let secret = SecretSource::bot_token(BOT_TOKEN);
        let no_date = sign_init_data(&[("user", USER)], &secret).unwrap();
        assert_eq!(
            validate_init_data(&no_date, &secret, None, NOW).unwrap_err(),
            InitDataError::MissingAuthDate
        );

        let bad_date = sign_init_data(&[("auth_date", "yesterday")], &secret).unwrap();
        let err = validate_init_data(&bad_date, &secret, None, NOW).unwrap_err();
        assert_eq!(err, InitDataError::InvalidAuthDate);
        match JaniError::from(err) {
            JaniError::Validation { code, .. } => assert_eq!(code, "INVALID_AUTH_DATE"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn malformed_user_json_only_drops_user() {
        let secret = SecretSource::bot_token(BOT_TOKEN);
        let raw = sign_init_data(&[("auth_date", "1700000000"), ("user", "{not json")], &secret)
            .unwrap();
        let result = validate_init_data(&raw, &secret, None, NOW).unwrap();
        assert!(result.parsed_user.is_none());
        assert!(result.identity_id.is_none());
    }

    #[test]
    fn hex_secret_key_is_decoded() {
        let hex_key = "ab".repeat(32);
        let hex_secret = SecretSource::secret_key(hex_key.clone());
        let raw = sign_init_data(&[("auth_date", "1700000000")], &hex_secret).unwrap();
        assert!(validate_init_data(&raw, &hex_secret, None, NOW).is_ok());

        let decoded = hex::decode(&hex_key).unwrap();
        assert_eq!(hex_secret.resolve().unwrap(), decoded);
        assert_eq!(
            SecretSource::secret_key("plain-secret").resolve().unwrap(),
            b"plain-secret".to_vec()
        );
    }

    #[test]
    fn secret_key_takes_precedence_over_bot_token() {
        let both = SecretSource {
            secret_key: Some("explicit".into()),
            bot_token: Some(BOT_TOKEN.into()),
        };
        assert_eq!(both.resolve().unwrap(), b"explicit".to_vec());
    }

    #[test]
    fn validator_from_config_treats_zero_as_disabled() {
        let config = AuthConfig {
            bot_token: Some(BOT_TOKEN.into()),
            secret_key: None,
            max_age_secs: 0,
        };
        let validator = InitDataValidator::from_config(&config);
        assert_eq!(validator.max_age_secs(), None);
        assert!(validator.validate_at(&signed(0), NOW).is_ok());
    }

    #[test]
    fn check_string_is_sorted_by_key() {
        let pairs = vec![
            ("user".to_string(), "u".to_string()),
            ("auth_date".to_string(), "1".to_string()),
            ("query_id".to_string(), "q".to_string()),
        ];
        assert_eq!(build_check_string(&pairs), "auth_date=1\nquery_id=q\nuser=u");
    }

    #[test]
    fn debug_hides_secrets() {
        let dbg = format!("{:?}", SecretSource::bot_token(BOT_TOKEN));
        assert!(!dbg.contains("ABCdef"));
    }

    proptest::proptest! {
        #[test]
        fn mutating_any_signed_field_breaks_signature(
            field in 0usize..3,
            replacement in "[a-zA-Z0-9]{1,12}",
        ) {
            let secret = SecretSource::bot_token(BOT_TOKEN);
            let mut pairs = vec![
                ("query_id".to_string(), "AAF".to_string()),
                ("user".to_string(), USER.to_string()),
                ("auth_date".to_string(), NOW.to_string()),
            ];
            let borrowed: Vec<(&str, &str)> =
                pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            let raw = sign_init_data(&borrowed, &secret).unwrap();
            let hash = raw.rsplit("hash=").next().unwrap().to_string();

            proptest::prop_assume!(pairs[field].1 != replacement);
            pairs[field].1 = replacement;

            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (k, v) in &pairs {
                serializer.append_pair(k, v);
            }
            serializer.append_pair("hash", &hash);
            let tampered = serializer.finish();

            proptest::prop_assert_eq!(
                validate_init_data(&tampered, &secret, None, NOW).unwrap_err(),
                InitDataError::InvalidSignature
            );
        }
    }
}

//! Bearer tokens and password hashing
//!
//! # Token format
//!
//! `<hex(canonical claims JSON)>.<hex HMAC-SHA256(canonical claims JSON)>`
//!
//! - Canonical JSON: keys sorted, no whitespace
//! - Secret: i64 stored in the `settings` table (`api_shared_secret`), used
//!   as the HMAC key in big-endian byte order
//! - Secret value 0 disables authentication entirely
//! - `token_type` separates short-lived access tokens from refresh tokens
//!
//! # Passwords
//!
//! Argon2id with a random salt, stored as a single PHC string
//! (`$argon2id$v=19$...`).
//!
//! # Pure Functions
//!
//! This module contains ONLY pure functions and database operations.
//! No HTTP framework dependencies - those live in the service crate.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[cfg(feature = "sqlx")]
use sqlx::SqlitePool;

// ========================================
// Error Types
// ========================================

/// Authentication error types
#[derive(Debug, Clone, PartialEq)]
pub enum ApiAuthError {
    /// Token is not `<payload>.<signature>` or payload is not valid claims
    Malformed(String),

    /// Signature does not match the payload
    InvalidSignature,

    /// Token lifetime elapsed
    Expired { exp: i64, now: i64 },

    /// Refresh token presented where an access token is required, or vice versa
    WrongTokenType { expected: TokenType, found: TokenType },

    /// Database error loading shared secret
    DatabaseError(String),

    /// Signing key or password hash could not be computed
    Crypto(String),
}

impl std::fmt::Display for ApiAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiAuthError::Malformed(reason) => write!(f, "Malformed token: {}", reason),
            ApiAuthError::InvalidSignature => write!(f, "Invalid token signature"),
            ApiAuthError::Expired { exp, now } => {
                write!(f, "Token expired {}ms ago", now - exp)
            }
            ApiAuthError::WrongTokenType { expected, found } => {
                write!(f, "Expected {:?} token, got {:?} token", expected, found)
            }
            ApiAuthError::DatabaseError(err) => write!(f, "Database error: {}", err),
            ApiAuthError::Crypto(err) => write!(f, "Crypto error: {}", err),
        }
    }
}

impl std::error::Error for ApiAuthError {}

// ========================================
// Claims
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub is_admin: bool,
    pub token_type: TokenType,
    /// Expiry, Unix epoch milliseconds
    pub exp: i64,
}

impl Claims {
    /// Same identity, new type and expiry
    pub fn reissue(&self, token_type: TokenType, exp: i64) -> Self {
        Self {
            token_type,
            exp,
            ..self.clone()
        }
    }
}

/// Current time as Unix epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ========================================
// Shared Secret Management
// ========================================

/// Load shared secret from database settings
///
/// - Key: `api_shared_secret`
/// - Value: i64
/// - Special value 0: Disables auth checking
/// - Missing: a new secret is generated and stored
#[cfg(feature = "sqlx")]
pub async fn load_shared_secret(db: &SqlitePool) -> Result<i64, ApiAuthError> {
    let result: Option<(String,)> =
        sqlx::query_as("SELECT value FROM settings WHERE key = 'api_shared_secret'")
            .fetch_optional(db)
            .await
            .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    match result {
        Some((value,)) => value
            .parse::<i64>()
            .map_err(|e| ApiAuthError::DatabaseError(format!("Invalid i64: {}", e))),
        None => initialize_shared_secret(db).await,
    }
}

/// Generate and store a random non-zero secret
#[cfg(feature = "sqlx")]
pub async fn initialize_shared_secret(db: &SqlitePool) -> Result<i64, ApiAuthError> {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    let secret: i64 = loop {
        let val = rng.gen::<i64>();
        if val != 0 {
            break val;
        }
    };

    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES ('api_shared_secret', ?)")
        .bind(secret.to_string())
        .execute(db)
        .await
        .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    Ok(secret)
}

// ========================================
// Token Issue and Validation
// ========================================

/// Sign claims into a bearer token
///
/// # Examples
///
/// ```
/// use explorer_common::api::auth::{issue_token, validate_token, Claims, TokenType};
///
/// let claims = Claims {
///     user_id: 1,
///     email: "lab@example.org".to_string(),
///     is_admin: false,
///     token_type: TokenType::Access,
///     exp: 4_102_444_800_000,
/// };
///
/// let token = issue_token(&claims, 123456789).unwrap();
/// let decoded = validate_token(&token, 123456789, TokenType::Access, 0).unwrap();
/// assert_eq!(decoded, claims);
/// ```
pub fn issue_token(claims: &Claims, shared_secret: i64) -> Result<String, ApiAuthError> {
    let value = serde_json::to_value(claims)
        .map_err(|e| ApiAuthError::Malformed(format!("claims not serializable: {}", e)))?;
    let canonical = to_canonical_json(&value);
    let signature = keyed_mac(&canonical, shared_secret)?.finalize().into_bytes();
    Ok(format!(
        "{}.{}",
        hex::encode(canonical.as_bytes()),
        hex::encode(signature)
    ))
}

/// Verify signature, expiry and token type; return the claims
pub fn validate_token(
    token: &str,
    shared_secret: i64,
    expected: TokenType,
    now: i64,
) -> Result<Claims, ApiAuthError> {
    let (payload_hex, signature) = token
        .split_once('.')
        .ok_or_else(|| ApiAuthError::Malformed("missing signature".to_string()))?;

    let payload = hex::decode(payload_hex)
        .map_err(|e| ApiAuthError::Malformed(format!("payload not hex: {}", e)))?;
    let canonical = String::from_utf8(payload)
        .map_err(|e| ApiAuthError::Malformed(format!("payload not UTF-8: {}", e)))?;

    let signature = hex::decode(signature).map_err(|_| ApiAuthError::InvalidSignature)?;
    keyed_mac(&canonical, shared_secret)?
        .verify_slice(&signature)
        .map_err(|_| ApiAuthError::InvalidSignature)?;

    let claims: Claims = serde_json::from_str(&canonical)
        .map_err(|e| ApiAuthError::Malformed(format!("invalid claims: {}", e)))?;

    if claims.exp <= now {
        return Err(ApiAuthError::Expired {
            exp: claims.exp,
            now,
        });
    }

    if claims.token_type != expected {
        return Err(ApiAuthError::WrongTokenType {
            expected,
            found: claims.token_type,
        });
    }

    Ok(claims)
}

/// HMAC-SHA256 over the canonical JSON, keyed by the shared secret
fn keyed_mac(canonical: &str, shared_secret: i64) -> Result<HmacSha256, ApiAuthError> {
    let mut mac = HmacSha256::new_from_slice(&shared_secret.to_be_bytes())
        .map_err(|e| ApiAuthError::Crypto(e.to_string()))?;
    mac.update(canonical.as_bytes());
    Ok(mac)
}

/// Convert JSON to canonical form (sorted keys, no whitespace)
///
/// # Examples
///
/// ```
/// use explorer_common::api::auth::to_canonical_json;
/// use serde_json::json;
///
/// let json = json!({"z": 3, "a": 1, "m": 2});
/// assert_eq!(to_canonical_json(&json), r#"{"a":1,"m":2,"z":3}"#);
/// ```
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by_key(|(k, _)| *k);
            let items: Vec<String> = pairs
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::from(k.as_str()), to_canonical_json(v)))
                .collect();
            format!("{{{}}}", items.join(","))
        }
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null => value.to_string(),
    }
}

// ========================================
// Passwords
// ========================================

/// Argon2id hash of a password as a PHC string
///
/// The salt is 16 random bytes and is embedded in the returned string.
pub fn hash_password(password: &str) -> Result<String, ApiAuthError> {
    use rand::RngCore;

    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    let salt = SaltString::encode_b64(&bytes).map_err(|e| ApiAuthError::Crypto(e.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiAuthError::Crypto(e.to_string()))
}

/// Check a password against a stored PHC string
///
/// An unparseable stored hash never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

//! Shared API request/response types
//!
//! Authentication payloads. Field names are camelCase on the wire, the shape
//! the browser client already sends and reads.

use serde::{Deserialize, Serialize};

// ========================================
// Authentication Types
// ========================================

/// POST /api/auth/login body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/auth/login response
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub msg: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// POST /api/auth/refresh body
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /api/auth/refresh response
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// POST /api/user body
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

// ========================================
// Error Response Types
// ========================================

/// Authentication failure body: `{"error": true, "msg": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthErrorResponse {
    pub error: bool,
    pub msg: String,
}

impl AuthErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: true,
            msg: msg.into(),
        }
    }
}

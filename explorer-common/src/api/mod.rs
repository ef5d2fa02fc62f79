//! API module for shared HTTP API functionality
//!
//! Bearer token issuing/validation, password hashing and the request and
//! response types around them.
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Database operations (via sqlx)
//! - Shared types
//!
//! The service wraps these with framework-specific middleware (Axum).

pub mod auth;
pub mod types;

pub use auth::{
    hash_password, initialize_shared_secret, issue_token, load_shared_secret, validate_token,
    verify_password, ApiAuthError, Claims, TokenType,
};
pub use types::{
    AuthErrorResponse, CreateUserRequest, LoginRequest, LoginResponse, RefreshRequest,
    RefreshResponse,
};

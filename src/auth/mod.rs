// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Session tokens and student credentials for the tuition API.
//!
//! ## Auth Flow
//!
//! 1. Student registers or logs in with student number and password
//! 2. Server verifies the Argon2id hash and issues an HS256 JWT, returned
//!    in the body and as the `jwt` cookie
//! 3. Protected routes:
//!    - read the token from the cookie, else `Authorization: Bearer <token>`
//!    - verify algorithm (HS256 only), signature and expiry
//!    - expose `sub` as the caller's student number
//!
//! ## Security
//!
//! - Tokens are valid for 24 hours and cannot be revoked
//! - Login does not reveal whether a student number exists
//! - Expiry is checked with zero leeway

pub mod error;
pub mod extractor;
pub mod middleware;
pub mod password;
pub mod token;

pub use error::AuthError;
pub use extractor::{Caller, Identity};
pub use middleware::{authenticate, session_cookie, SESSION_COOKIE};
pub use password::{CredentialError, Credentials};
pub use token::{IdentityClaims, IssuedToken, TokenService, TOKEN_VALIDITY_SECS};

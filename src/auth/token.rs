// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity token issuance and verification.
//!
//! Tokens are HS256 JWTs carrying `sub` (student number), `iat` and `exp`.
//! They are stateless: nothing is stored server-side and there is no
//! revocation, so expiry is the only lifecycle bound.
//!
//! Verification is a pure function of `(token, secret, now)`. The library's
//! own clock check is disabled and `exp` is compared against the `now`
//! passed in, which keeps expiry deterministic under test.

use chrono::Utc;
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use super::AuthError;
use crate::models::StudentId;

/// Validity window of an issued token (24 hours).
pub const TOKEN_VALIDITY_SECS: i64 = 24 * 60 * 60;

/// The only accepted signing algorithm.
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims carried by an identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Student number
    pub sub: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expires at (Unix seconds)
    pub exp: i64,
}

impl IdentityClaims {
    pub fn subject(&self) -> StudentId {
        StudentId(self.sub.clone())
    }
}

/// A freshly signed token and its claims.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: IdentityClaims,
}

/// Signs and verifies identity tokens with the process-wide secret.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validity_secs: i64,
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validity_secs: TOKEN_VALIDITY_SECS,
        }
    }

    pub fn validity_secs(&self) -> i64 {
        self.validity_secs
    }

    /// Issue a token for `student` valid from now.
    pub fn issue(&self, student: &StudentId) -> Result<IssuedToken, AuthError> {
        self.issue_at(student, Utc::now().timestamp())
    }

    pub fn issue_at(&self, student: &StudentId, now: i64) -> Result<IssuedToken, AuthError> {
        let claims = IdentityClaims {
            sub: student.as_str().to_string(),
            iat: now,
            exp: now + self.validity_secs,
        };
        let token = encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(format!("token signing failed: {e}")))?;
        Ok(IssuedToken { token, claims })
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<IdentityClaims, AuthError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify algorithm, signature and expiry of `token` at time `now`.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<IdentityClaims, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
        if header.alg != SIGNING_ALGORITHM {
            return Err(AuthError::InvalidAlgorithm);
        }

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;

        let token_data = decode::<IdentityClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => AuthError::InvalidAlgorithm,
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::MalformedToken,
            })?;

        let claims = token_data.claims;
        if claims.sub.trim().is_empty() {
            return Err(AuthError::MalformedToken);
        }
        // RFC 7519: the token must not be accepted on or after `exp`.
        if now >= claims.exp {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }
}

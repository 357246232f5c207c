// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Student credentials.
//!
//! Passwords are stored only as Argon2id PHC strings. Login failures for an
//! unknown student and for a wrong password are indistinguishable.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

use crate::models::StudentId;
use crate::storage::{CredentialStore, StorageError};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Invalid student number or password")]
    InvalidCredentials,

    #[error("Student {0} is already registered")]
    AlreadyRegistered(StudentId),

    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Store(StorageError),
}

/// Registers students and checks their passwords.
#[derive(Clone)]
pub struct Credentials {
    store: Arc<dyn CredentialStore>,
}

impl Credentials {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub fn register(&self, student: &StudentId, password: &str) -> Result<(), CredentialError> {
        if password.is_empty() {
            return Err(CredentialError::EmptyPassword);
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| CredentialError::Hashing(e.to_string()))?
            .to_string();

        self.store
            .insert_credential(student, &hash)
            .map_err(|e| match e {
                StorageError::AlreadyExists(_) => {
                    CredentialError::AlreadyRegistered(student.clone())
                }
                other => CredentialError::Store(other),
            })
    }

    pub fn verify_login(&self, student: &StudentId, password: &str) -> Result<(), CredentialError> {
        let stored = self
            .store
            .credential_hash(student)
            .map_err(CredentialError::Store)?
            .ok_or(CredentialError::InvalidCredentials)?;

        let parsed =
            PasswordHash::new(&stored).map_err(|e| CredentialError::Hashing(e.to_string()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| CredentialError::InvalidCredentials)
    }
}

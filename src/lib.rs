// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tuition Server - Student Tuition Payment Service
//!
//! HTTP service for querying and paying student tuition. Requests pass
//! through a fixed interceptor chain (request logging, context, JWT
//! authentication, daily limit) before reaching the tuition ledger.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers and router (Axum)
//! - `auth` - Session tokens, credentials and the auth interceptor
//! - `middleware` - Logging, context and daily-limit interceptors
//! - `tuition` - Queries, settlement and provisioning
//! - `storage` - Ledger backends (in-memory, redb) and the request log
//! - `budget` - Background daily-limit reset

pub mod api;
pub mod auth;
pub mod budget;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod state;
pub mod storage;
pub mod tuition;

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request interceptors.
//!
//! Applied outermost first: logging, routing (context), authentication,
//! daily limit. The authentication interceptor lives in [`crate::auth`].

pub mod context;
pub mod logging;
pub mod rate_limit;
pub mod routing;

pub use context::{AuthOutcome, RequestContext, RequestId};
pub use logging::log_request;
pub use rate_limit::enforce_daily_limit;
pub use routing::attach_context;

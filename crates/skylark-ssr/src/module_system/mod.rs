// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! On-demand SSR module instantiation
//!
//! The pieces that turn a module identifier into a live namespace object:
//!
//! - [`ModuleRunner`]: memoized, circular-safe instantiation protocol
//! - [`sandbox`]: the six-binding execution contract for compiled code
//! - [`ExternalLoader`]: bridge to the platform's native loader
//! - [`shim_external`]: default-export interop for external modules

mod external;
mod interop;
mod runner;
pub mod sandbox;
mod stacktrace;

pub use external::ExternalLoader;
pub use interop::{ESM_MARKER, shim_external};
pub use runner::{
    ModuleRunner, NULL_BYTE_PLACEHOLDER, RunnerHost, VALID_ID_PREFIX, unwrap_id,
};
pub use stacktrace::rewrite_stacktrace;

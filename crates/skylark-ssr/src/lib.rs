// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # skylark-ssr
//!
//! On-demand module instantiation for server-side rendering.
//!
//! The dev server does not bundle project source for SSR. Instead, this
//! runtime instantiates modules on demand: given a module identifier it
//! produces a live, fully-evaluated namespace object, handling along the way
//!
//! - concurrent requests for the same module (one shared execution),
//! - circular dependency chains (partially-populated namespaces keep
//!   cycles live instead of deadlocking),
//! - interop between ES modules and CommonJS modules loaded through the
//!   platform's native loader.
//!
//! The transform pipeline, the platform loader and the compiling engine are
//! collaborators consumed through traits; the runtime owns the module graph
//! and the instantiation protocol.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use skylark_ssr::{ModuleGraph, ModuleRunner, RunnerHost, RunnerOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> skylark_ssr::Result<()> {
//!     let graph = Arc::new(ModuleGraph::new());
//!     let host = RunnerHost::new(graph, transform, platform, engine);
//!     let runner = ModuleRunner::new(host, RunnerOptions::default());
//!
//!     let entry = runner.load("/src/entry-server.js").await?;
//!     let render = entry.get("render");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod graph;
pub mod logger;
pub mod module_system;
pub mod platform;
pub mod transform;

// Re-exports
pub use config::{ResolveOptions, RunnerOptions};
pub use error::{Result, SsrError};
pub use graph::{ModuleGraph, ModuleRecord};
pub use module_system::sandbox::{CompiledUnit, EvalContext, JsEngine, SSR_BINDINGS};
pub use module_system::{ModuleRunner, RunnerHost, shim_external, unwrap_id};
pub use platform::{HookGuard, PlatformLoader, ResolutionHook};
pub use transform::{CompiledResult, TransformPipeline};

/// Version of the skylark-ssr runtime
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

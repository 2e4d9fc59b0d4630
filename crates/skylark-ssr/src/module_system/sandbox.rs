// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Sandboxed execution of transformed module code
//!
//! Compiled module code runs as an asynchronous callable unit parameterized
//! by exactly six named bindings. The transform pipeline injects references
//! to these names; the sandbox supplies the concrete values. Nothing else
//! from the host is reachable.

use crate::error::Result;
use futures::future::BoxFuture;
use skylark_js::{ObjectRef, Value};
use std::sync::Arc;

/// Binding name for the shared global context.
pub const GLOBAL_KEY: &str = "__ssr_global__";
/// Binding name for the module's exports sink.
pub const EXPORTS_KEY: &str = "__ssr_exports__";
/// Binding name for the module's import.meta value.
pub const IMPORT_META_KEY: &str = "__ssr_import_meta__";
/// Binding name for the static-import function.
pub const IMPORT_KEY: &str = "__ssr_import__";
/// Binding name for the dynamic-import function.
pub const DYNAMIC_IMPORT_KEY: &str = "__ssr_dynamic_import__";
/// Binding name for the export-all helper.
pub const EXPORT_ALL_KEY: &str = "__ssr_export_all__";

/// The six bindings injected into every compiled unit, in parameter order.
pub const SSR_BINDINGS: [&str; 6] = [
    GLOBAL_KEY,
    EXPORTS_KEY,
    IMPORT_META_KEY,
    IMPORT_KEY,
    DYNAMIC_IMPORT_KEY,
    EXPORT_ALL_KEY,
];

/// Dependency-import function handed to a compiled unit.
///
/// Resolves to the dependency's namespace value, or `Undefined` when a
/// circular dependency has no object attached yet.
pub type ImportFn = Arc<dyn Fn(&str) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// Export-all helper handed to a compiled unit. Installs live re-export
/// accessors on the module's exports for a source module value.
pub type ExportAllFn = Arc<dyn Fn(&Value) + Send + Sync>;

/// The concrete values bound to [`SSR_BINDINGS`] for one execution.
#[derive(Clone)]
pub struct EvalContext {
    /// Shared global context object.
    pub global: Value,
    /// The namespace under construction (exports sink).
    pub exports: ObjectRef,
    /// The module's import.meta value.
    pub import_meta: Value,
    /// Static-import bridge.
    pub import_fn: ImportFn,
    /// Dynamic-import bridge with relative-specifier resolution.
    pub dynamic_import_fn: ImportFn,
    /// Live re-export installer.
    pub export_all_fn: ExportAllFn,
}

/// A compiled, callable module body.
pub type CompiledUnit = Arc<dyn Fn(EvalContext) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Compiles executable source text into callable units.
///
/// Implemented by the hosting engine. Failures to compile surface the same
/// way evaluation failures do.
pub trait JsEngine: Send + Sync {
    /// Compiles `source` into an async unit parameterized by `params`.
    fn compile(&self, source: &str, params: &[&str]) -> Result<CompiledUnit>;
}

/// Executes compiled module code under the six-binding contract.
pub struct Sandbox {
    engine: Arc<dyn JsEngine>,
}

impl Sandbox {
    /// Creates a sandbox over the given engine.
    pub fn new(engine: Arc<dyn JsEngine>) -> Self {
        Self { engine }
    }

    /// Compiles and runs `code` for the module `url`, suspending until the
    /// unit completes. An origin annotation is appended to the source text
    /// so raised stacks can be mapped back to the module.
    ///
    /// Failures propagate unmodified; attribution and stack rewriting are
    /// the caller's concern.
    pub async fn run(&self, code: &str, url: &str, ctx: EvalContext) -> Result<()> {
        let source = format!("{code}\n//# sourceURL={url}");
        let unit = self.engine.compile(&source, &SSR_BINDINGS)?;
        unit(ctx).await
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Memoized, circular-safe module instantiation
//!
//! One [`ModuleRunner`] serves a whole dev-server session. Concurrent loads
//! of the same identifier converge on a single in-flight instantiation, and
//! circular imports receive the partially-populated namespace of their
//! ancestor instead of deadlocking on it.

use crate::config::RunnerOptions;
use crate::error::{Result, SsrError};
use crate::graph::{ModuleGraph, ModuleRecord};
use crate::logger::{LogErrorOptions, Logger, TracingLogger};
use crate::module_system::external::{ExternalLoader, file_url};
use crate::module_system::sandbox::{EvalContext, ExportAllFn, ImportFn, JsEngine, Sandbox};
use crate::module_system::stacktrace::rewrite_stacktrace;
use crate::platform::PlatformLoader;
use crate::transform::TransformPipeline;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use skylark_js::{ObjectRef, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Prefix the dev server uses to ship otherwise-invalid identifiers through
/// import specifiers.
pub const VALID_ID_PREFIX: &str = "/@id/";

/// Placeholder for the null byte marking virtual module identifiers.
pub const NULL_BYTE_PLACEHOLDER: &str = "__x00__";

/// Restores a module identifier to its canonical form: strips the id
/// prefix and decodes the null-byte placeholder.
pub fn unwrap_id(id: &str) -> String {
    match id.strip_prefix(VALID_ID_PREFIX) {
        Some(rest) => rest.replace(NULL_BYTE_PLACEHOLDER, "\0"),
        None => id.to_string(),
    }
}

type PendingModule = Shared<BoxFuture<'static, Result<ObjectRef>>>;

/// Collaborators and shared state a [`ModuleRunner`] is constructed over.
pub struct RunnerHost {
    /// Module graph holding per-identifier records.
    pub graph: Arc<ModuleGraph>,
    /// Transform pipeline producing executable code.
    pub transform: Arc<dyn TransformPipeline>,
    /// Native platform loader for external modules.
    pub platform: Arc<dyn PlatformLoader>,
    /// Engine compiling transformed source into callable units.
    pub engine: Arc<dyn JsEngine>,
    /// Error reporting sink.
    pub logger: Arc<dyn Logger>,
    /// Global context object shared by every executed module.
    pub global: Value,
}

impl RunnerHost {
    /// Creates a host with the default logger and an empty global context.
    pub fn new(
        graph: Arc<ModuleGraph>,
        transform: Arc<dyn TransformPipeline>,
        platform: Arc<dyn PlatformLoader>,
        engine: Arc<dyn JsEngine>,
    ) -> Self {
        Self {
            graph,
            transform,
            platform,
            engine,
            logger: Arc::new(TracingLogger),
            global: Value::Object(ObjectRef::new()),
        }
    }

    /// Replaces the error reporting sink.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Replaces the shared global context.
    pub fn with_global(mut self, global: Value) -> Self {
        self.global = global;
        self
    }
}

/// On-demand module instantiation runtime.
///
/// `load` is idempotent per identifier for the lifetime of the runner:
/// until the record is invalidated through the graph, every call observes
/// the same namespace object (or the same failure).
pub struct ModuleRunner {
    inner: Arc<RunnerInner>,
}

struct RunnerInner {
    graph: Arc<ModuleGraph>,
    transform: Arc<dyn TransformPipeline>,
    sandbox: Sandbox,
    external: ExternalLoader,
    logger: Arc<dyn Logger>,
    global: Value,
    options: RunnerOptions,
    /// In-flight instantiations, at most one per identifier.
    pending_modules: DashMap<String, PendingModule>,
    /// Dependencies each in-progress importer is currently awaiting.
    pending_imports: DashMap<String, Vec<String>>,
}

impl ModuleRunner {
    /// Creates a runner over the host collaborators.
    pub fn new(host: RunnerHost, options: RunnerOptions) -> Self {
        let external = ExternalLoader::new(Arc::clone(&host.platform), &options.resolve);
        Self {
            inner: Arc::new(RunnerInner {
                graph: host.graph,
                transform: host.transform,
                sandbox: Sandbox::new(host.engine),
                external,
                logger: host.logger,
                global: host.global,
                options,
                pending_modules: DashMap::new(),
                pending_imports: DashMap::new(),
            }),
        }
    }

    /// Instantiates the module for `id`, or returns the already-materialized
    /// namespace. Concurrent calls for one identifier share a single
    /// execution.
    pub async fn load(&self, id: &str) -> Result<ObjectRef> {
        Arc::clone(&self.inner).load_with_chain(id, Vec::new()).await
    }

    /// The module graph backing this runner.
    pub fn graph(&self) -> &Arc<ModuleGraph> {
        &self.inner.graph
    }
}

impl RunnerInner {
    /// Deduplicating entry point. The future is registered in the pending
    /// table synchronously, before any suspension point, so a racing load
    /// of the same identifier can never start a second instantiation.
    fn load_with_chain(
        self: Arc<Self>,
        id: &str,
        chain: Vec<String>,
    ) -> BoxFuture<'static, Result<ObjectRef>> {
        let id = unwrap_id(id);

        let pending = match self.pending_modules.entry(id.clone()) {
            // Converge on the in-flight instantiation.
            Entry::Occupied(entry) => return entry.get().clone().boxed(),
            Entry::Vacant(entry) => {
                let pending: PendingModule = {
                    let inner = Arc::clone(&self);
                    let id = id.clone();
                    async move { inner.instantiate(&id, chain).await }.boxed().shared()
                };
                entry.insert(pending.clone());
                pending
            }
        };

        // Only the registering call clears the entry; every waiter above
        // shares the same settled result.
        let inner = self;
        async move {
            let result = pending.await;
            inner.pending_modules.remove(&id);
            if result.is_err() {
                inner.pending_imports.remove(&id);
            }
            result
        }
        .boxed()
    }

    /// One full instantiation: record, compiled code, namespace, dependency
    /// wiring, execution, freeze.
    async fn instantiate(self: Arc<Self>, id: &str, chain: Vec<String>) -> Result<ObjectRef> {
        let record = self.graph.ensure_record(id);

        // Cache hit, or circular re-entry after the record was populated.
        if let Some(existing) = record.module() {
            return Ok(existing);
        }

        let compiled = match record.transform_result() {
            Some(result) => result,
            None => {
                let result = self
                    .transform
                    .transform(id)
                    .await?
                    .ok_or_else(|| SsrError::TransformUnavailable { url: id.to_string() })?;
                record.set_transform_result(Arc::clone(&result));
                result
            }
        };

        tracing::debug!(url = id, "instantiating ssr module");

        // The namespace is attached before evaluation so circular importers
        // can observe it while it is still being populated.
        let module = ObjectRef::new_module();
        record.set_module(module.clone());

        let import_meta = import_meta_for(&record);

        let chain = {
            let mut chain = chain;
            chain.push(id.to_string());
            chain
        };

        let import_fn = Arc::clone(&self).import_fn(id.to_string(), chain, record.file.clone());
        let dynamic_import_fn = dynamic_import_fn(id.to_string(), import_fn.clone());
        let export_all_fn = export_all_fn(module.clone());

        let ctx = EvalContext {
            global: self.global.clone(),
            exports: module.clone(),
            import_meta,
            import_fn,
            dynamic_import_fn,
            export_all_fn,
        };

        match self.sandbox.run(&compiled.code, id, ctx).await {
            Ok(()) => {
                module.freeze();
                Ok(module)
            }
            Err(err) => {
                // The record keeps its (unfrozen) namespace and the error;
                // instantiation is not retried here.
                let err = self.attribute_failure(id, err);
                record.set_error(err.clone());
                let report = match err.stack() {
                    Some(stack) => format!("Error when evaluating SSR module {id}:\n{stack}"),
                    None => format!("Error when evaluating SSR module {id}: {err}"),
                };
                self.logger.error(
                    &report,
                    &LogErrorOptions {
                        timestamp: true,
                        clear: self.options.clear_screen,
                        error: Some(err.clone()),
                    },
                );
                Err(err)
            }
        }
    }

    /// Locates a raised exception on this module and rewrites its stack
    /// against the graph. Failures of nested loads pass through untouched:
    /// they were already attributed where they happened.
    fn attribute_failure(&self, url: &str, err: SsrError) -> SsrError {
        match err {
            SsrError::Thrown { message, stack } => SsrError::Evaluation {
                url: url.to_string(),
                message,
                stack: stack.map(|stack| rewrite_stacktrace(&stack, &self.graph)),
            },
            other => other,
        }
    }

    fn import_fn(
        self: Arc<Self>,
        importer: String,
        chain: Vec<String>,
        importer_file: Option<PathBuf>,
    ) -> ImportFn {
        Arc::new(move |dep: &str| {
            let inner = Arc::clone(&self);
            let importer = importer.clone();
            let chain = chain.clone();
            let importer_file = importer_file.clone();
            let dep = dep.to_string();
            async move {
                inner
                    .import_dependency(&importer, &chain, importer_file.as_deref(), &dep)
                    .await
            }
            .boxed()
        })
    }

    /// The dependency-import bridge handed to a compiled unit.
    async fn import_dependency(
        self: Arc<Self>,
        importer: &str,
        chain: &[String],
        importer_file: Option<&Path>,
        dep: &str,
    ) -> Result<Value> {
        // External references go through the platform bridge and are not
        // circularity-tracked.
        if !dep.starts_with('.') && !dep.starts_with('/') {
            return self.external.load(dep, importer_file).await;
        }

        let dep = unwrap_id(dep);
        let on_chain = |candidate: &str| chain.iter().any(|entry| entry == candidate);
        // A dependency is circular when it sits on our own chain, or when an
        // in-progress instantiation of it is itself waiting on one of our
        // ancestors: awaiting either would deadlock both chains.
        let circular = on_chain(&dep)
            || self
                .pending_imports
                .get(&dep)
                .is_some_and(|waiting| waiting.iter().any(|entry| on_chain(entry)));

        if !circular {
            self.pending_imports
                .entry(importer.to_string())
                .or_default()
                .push(dep.clone());
            Arc::clone(&self).load_with_chain(&dep, chain.to_vec()).await?;
            // Deregister on success; a failure tears down this importer's
            // whole pending list on its own way out.
            if let Some(mut waiting) = self.pending_imports.get_mut(importer) {
                if let Some(position) = waiting.iter().position(|entry| entry == &dep) {
                    waiting.remove(position);
                }
                let emptied = waiting.is_empty();
                drop(waiting);
                if emptied {
                    self.pending_imports
                        .remove_if(importer, |_, waiting| waiting.is_empty());
                }
            }
        }

        // Hand back whatever object the record currently holds: for a
        // resolved dependency its namespace, for a circular one the
        // partially-populated object. Returning the record's own object
        // keeps both sides of a racing circular pair on one identity.
        Ok(self
            .graph
            .get(&dep)
            .and_then(|record| record.module())
            .map(Value::Object)
            .unwrap_or_default())
    }
}

/// Wraps the import bridge for dynamic imports: relative specifiers are
/// resolved against the importing module's directory first.
fn dynamic_import_fn(importer: String, import_fn: ImportFn) -> ImportFn {
    Arc::new(move |dep: &str| {
        if dep.starts_with('.') {
            import_fn(&resolve_relative(&importer, dep))
        } else {
            import_fn(dep)
        }
    })
}

/// Builds the export-all helper: installs a live accessor on `target` for
/// every enumerable key of the source module except its default export.
fn export_all_fn(target: ObjectRef) -> ExportAllFn {
    Arc::new(move |source: &Value| {
        let Some(source) = source.as_object() else {
            return;
        };
        for key in source.keys() {
            if key == "default" {
                continue;
            }
            let source = source.clone();
            let name = key.clone();
            target.define_getter(
                &key,
                Arc::new(move || source.get(&name).unwrap_or_default()),
                true,
            );
        }
    })
}

/// import.meta for a module record: the resolved file location as a
/// URL-shaped string, plus filename/dirname when a file backs the module.
fn import_meta_for(record: &ModuleRecord) -> Value {
    let meta = ObjectRef::new();
    match &record.file {
        Some(file) => {
            meta.set("url", Value::String(file_url(file)));
            meta.set("filename", Value::String(file.display().to_string()));
            let dirname = file
                .parent()
                .map(|parent| parent.display().to_string())
                .unwrap_or_default();
            meta.set("dirname", Value::String(dirname));
        }
        None => {
            meta.set("url", Value::String(record.url.clone()));
        }
    }
    Value::Object(meta)
}

/// Resolves a relative specifier against the importing module's URL
/// directory, posix style.
fn resolve_relative(importer: &str, dep: &str) -> String {
    let base = match importer.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => "",
    };
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for part in dep.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

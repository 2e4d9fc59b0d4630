// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Shared fakes for integration tests: a scripted engine, a counting
//! transform pipeline, a recording platform loader and a collecting logger.

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use skylark_js::Value;
use skylark_ssr::logger::{LogErrorOptions, Logger};
use skylark_ssr::platform::{HookGuard, PlatformLoader, ResolutionHook};
use skylark_ssr::{
    CompiledResult, CompiledUnit, EvalContext, JsEngine, ModuleGraph, ModuleRunner, ResolveOptions,
    Result, RunnerHost, RunnerOptions, SsrError, TransformPipeline,
};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Builds a compiled unit from an async closure.
pub fn unit<F, Fut>(body: F) -> CompiledUnit
where
    F: Fn(EvalContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |ctx| body(ctx).boxed())
}

/// Engine that looks compiled units up by a `//unit:<name>` marker line in
/// the source text.
#[derive(Default)]
pub struct ScriptedEngine {
    units: Mutex<HashMap<String, CompiledUnit>>,
    pub last_source: Mutex<Option<String>>,
    pub last_params: Mutex<Option<Vec<String>>>,
}

impl ScriptedEngine {
    pub fn register(&self, name: &str, unit: CompiledUnit) {
        self.units.lock().insert(name.to_string(), unit);
    }
}

impl JsEngine for ScriptedEngine {
    fn compile(&self, source: &str, params: &[&str]) -> Result<CompiledUnit> {
        *self.last_source.lock() = Some(source.to_string());
        *self.last_params.lock() = Some(params.iter().map(|p| p.to_string()).collect());
        let name = source
            .lines()
            .find_map(|line| line.strip_prefix("//unit:"))
            .ok_or_else(|| SsrError::engine("source carries no unit marker"))?;
        self.units
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| SsrError::engine(format!("no unit registered for '{name}'")))
    }
}

/// Transform pipeline over a fixed url → code table, counting calls per url.
#[derive(Default)]
pub struct StaticTransform {
    sources: Mutex<HashMap<String, String>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl StaticTransform {
    pub fn insert(&self, url: &str, code: &str) {
        self.sources.lock().insert(url.to_string(), code.to_string());
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl TransformPipeline for StaticTransform {
    async fn transform(&self, url: &str) -> Result<Option<Arc<CompiledResult>>> {
        *self.calls.lock().entry(url.to_string()).or_insert(0) += 1;
        // Suspend so overlapping loads really interleave.
        tokio::task::yield_now().await;
        Ok(self.sources.lock().get(url).map(|code| {
            Arc::new(CompiledResult {
                code: code.clone(),
                file: url.starts_with('/').then(|| PathBuf::from(url)),
            })
        }))
    }
}

/// Platform loader over fixed resolution and module tables, recording every
/// resolve/load/hook interaction.
#[derive(Default)]
pub struct RecordingPlatform {
    resolutions: Mutex<HashMap<String, PathBuf>>,
    modules: Mutex<HashMap<String, Value>>,
    pub loads: Mutex<Vec<String>>,
    pub resolve_calls: Mutex<Vec<(String, bool)>>,
    pub hooks_installed: Arc<AtomicUsize>,
    pub hooks_removed: Arc<AtomicUsize>,
}

impl RecordingPlatform {
    pub fn add_resolution(&self, id: &str, path: &str) {
        self.resolutions
            .lock()
            .insert(id.to_string(), PathBuf::from(path));
    }

    pub fn add_module(&self, location: &str, value: Value) {
        self.modules.lock().insert(location.to_string(), value);
    }
}

#[async_trait]
impl PlatformLoader for RecordingPlatform {
    fn resolve(
        &self,
        id: &str,
        _importer: Option<&Path>,
        options: &ResolveOptions,
        _is_main_entry: bool,
    ) -> Result<Option<PathBuf>> {
        self.resolve_calls
            .lock()
            .push((id.to_string(), options.prefer_cjs));
        Ok(self.resolutions.lock().get(id).cloned())
    }

    async fn dynamic_load(&self, location: &str) -> Result<Value> {
        self.loads.lock().push(location.to_string());
        self.modules
            .lock()
            .get(location)
            .cloned()
            .ok_or_else(|| SsrError::engine(format!("platform cannot load '{location}'")))
    }

    fn install_resolution_hook(&self, _hook: ResolutionHook) -> HookGuard {
        self.hooks_installed.fetch_add(1, Ordering::SeqCst);
        let removed = Arc::clone(&self.hooks_removed);
        HookGuard::new(move || {
            removed.fetch_add(1, Ordering::SeqCst);
        })
    }
}

/// Logger collecting every report for assertions.
#[derive(Default)]
pub struct CollectingLogger {
    pub reports: Mutex<Vec<(String, LogErrorOptions)>>,
}

impl Logger for CollectingLogger {
    fn error(&self, message: &str, options: &LogErrorOptions) {
        self.reports
            .lock()
            .push((message.to_string(), options.clone()));
    }
}

/// A runner wired to fake collaborators, all of them inspectable.
pub struct Harness {
    pub graph: Arc<ModuleGraph>,
    pub engine: Arc<ScriptedEngine>,
    pub transform: Arc<StaticTransform>,
    pub platform: Arc<RecordingPlatform>,
    pub logger: Arc<CollectingLogger>,
    pub runner: ModuleRunner,
}

pub fn harness() -> Harness {
    let graph = Arc::new(ModuleGraph::new());
    let engine = Arc::new(ScriptedEngine::default());
    let transform = Arc::new(StaticTransform::default());
    let platform = Arc::new(RecordingPlatform::default());
    let logger = Arc::new(CollectingLogger::default());
    let host = RunnerHost::new(
        Arc::clone(&graph),
        transform.clone(),
        platform.clone(),
        engine.clone(),
    )
    .with_logger(logger.clone());
    let runner = ModuleRunner::new(host, RunnerOptions::default());
    Harness {
        graph,
        engine,
        transform,
        platform,
        logger,
        runner,
    }
}

/// Registers a project module: the transform serves a marker that the
/// scripted engine maps back to `body`.
pub fn add_module(harness: &Harness, url: &str, body: CompiledUnit) {
    harness.transform.insert(url, &format!("//unit:{url}"));
    harness.engine.register(url, body);
}

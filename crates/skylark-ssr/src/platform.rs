// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Native platform loader interface
//!
//! External (non-project) identifiers are loaded through the hosting
//! platform's own module machinery. The runtime consumes three primitives:
//! a resolution step honoring project rules, a dynamic-load step, and a
//! temporary override of the platform's internal resolution.

use crate::config::ResolveOptions;
use crate::error::Result;
use skylark_js::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Built-in platform module names.
pub const BUILTIN_MODULES: &[&str] = &[
    "assert",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "https",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "worker_threads",
    "zlib",
];

/// Check if an identifier names a built-in platform module.
///
/// Handles the `node:` prefix.
pub fn is_builtin(id: &str) -> bool {
    let id = id.strip_prefix("node:").unwrap_or(id);
    let id = id.split('/').next().unwrap_or(id);
    BUILTIN_MODULES.contains(&id)
}

/// A temporary override of the platform's internal resolution step.
///
/// Called with the requested identifier and the requesting module's file.
/// Returning `None` defers to the platform's default resolution.
pub type ResolutionHook = Arc<dyn Fn(&str, Option<&Path>) -> Option<PathBuf> + Send + Sync>;

/// Uninstalls a temporarily installed resolution hook when dropped.
///
/// Dropping on every exit path is what guarantees the override never leaks
/// into unrelated loads.
pub struct HookGuard {
    uninstall: Option<Box<dyn FnOnce() + Send>>,
}

impl HookGuard {
    /// Wraps the platform's uninstall function.
    pub fn new(uninstall: impl FnOnce() + Send + 'static) -> Self {
        Self {
            uninstall: Some(Box::new(uninstall)),
        }
    }

    /// A guard with nothing to uninstall.
    pub fn noop() -> Self {
        Self { uninstall: None }
    }
}

impl Drop for HookGuard {
    fn drop(&mut self) {
        if let Some(uninstall) = self.uninstall.take() {
            uninstall();
        }
    }
}

/// The native platform loader collaborator.
#[async_trait::async_trait]
pub trait PlatformLoader: Send + Sync {
    /// Resolution primitive: resolves `id` from `importer` under the given
    /// project rules. `None` means the identifier does not resolve.
    fn resolve(
        &self,
        id: &str,
        importer: Option<&Path>,
        options: &ResolveOptions,
        is_main_entry: bool,
    ) -> Result<Option<PathBuf>>;

    /// Native dynamic-load primitive. `location` is a built-in module name
    /// or a `file://` URL.
    async fn dynamic_load(&self, location: &str) -> Result<Value>;

    /// Temporarily overrides the platform's internal resolution step.
    fn install_resolution_hook(&self, hook: ResolutionHook) -> HookGuard;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_is_builtin() {
        assert!(is_builtin("fs"));
        assert!(is_builtin("path"));
        assert!(is_builtin("node:fs"));
        assert!(is_builtin("fs/promises"));
        assert!(!is_builtin("lodash"));
        assert!(!is_builtin("./fs"));
    }

    #[test]
    fn test_hook_guard_uninstalls_on_drop() {
        let uninstalled = Arc::new(AtomicBool::new(false));
        {
            let flag = Arc::clone(&uninstalled);
            let _guard = HookGuard::new(move || flag.store(true, Ordering::SeqCst));
            assert!(!uninstalled.load(Ordering::SeqCst));
        }
        assert!(uninstalled.load(Ordering::SeqCst));
    }
}

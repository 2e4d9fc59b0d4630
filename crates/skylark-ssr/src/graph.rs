// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module graph: per-identifier records and their cached artifacts

use crate::error::SsrError;
use crate::transform::CompiledResult;
use dashmap::DashMap;
use parking_lot::RwLock;
use skylark_js::ObjectRef;
use std::path::PathBuf;
use std::sync::Arc;

/// Strips the query string and fragment from an identifier.
pub fn clean_url(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// A node in the module graph.
///
/// Records are created on demand and mutated in place as the runtime
/// produces artifacts for them; they are never deleted, only invalidated.
pub struct ModuleRecord {
    /// Normalized module identifier.
    pub url: String,
    /// Backing file, when the identifier maps to one. Virtual modules have
    /// no file.
    pub file: Option<PathBuf>,
    transform_result: RwLock<Option<Arc<CompiledResult>>>,
    module: RwLock<Option<ObjectRef>>,
    error: RwLock<Option<SsrError>>,
}

impl ModuleRecord {
    fn new(url: String) -> Self {
        let cleaned = clean_url(&url);
        let file = cleaned.starts_with('/').then(|| PathBuf::from(cleaned));
        Self {
            url,
            file,
            transform_result: RwLock::new(None),
            module: RwLock::new(None),
            error: RwLock::new(None),
        }
    }

    /// The materialized module object, once instantiation has attached one.
    pub fn module(&self) -> Option<ObjectRef> {
        self.module.read().clone()
    }

    /// Attaches the module object. A record's object is never replaced;
    /// returns false when one is already attached.
    pub fn set_module(&self, module: ObjectRef) -> bool {
        let mut slot = self.module.write();
        if slot.is_some() {
            return false;
        }
        *slot = Some(module);
        true
    }

    /// The cached transform result, when one exists.
    pub fn transform_result(&self) -> Option<Arc<CompiledResult>> {
        self.transform_result.read().clone()
    }

    /// Caches a transform result on the record.
    pub fn set_transform_result(&self, result: Arc<CompiledResult>) {
        *self.transform_result.write() = Some(result);
    }

    /// The last evaluation error, when the module failed.
    pub fn error(&self) -> Option<SsrError> {
        self.error.read().clone()
    }

    /// Records an evaluation failure.
    pub fn set_error(&self, error: SsrError) {
        *self.error.write() = Some(error);
    }

    fn invalidate(&self) {
        *self.transform_result.write() = None;
        *self.module.write() = None;
        *self.error.write() = None;
    }
}

/// Process-wide module graph.
///
/// Thread-safe; lookups during cycle short-circuits read through the same
/// map the instantiation protocol writes.
pub struct ModuleGraph {
    records: DashMap<String, Arc<ModuleRecord>>,
}

impl ModuleGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Returns the record for `url`, creating it if absent.
    pub fn ensure_record(&self, url: &str) -> Arc<ModuleRecord> {
        self.records
            .entry(url.to_string())
            .or_insert_with(|| Arc::new(ModuleRecord::new(url.to_string())))
            .clone()
    }

    /// Returns the record for `url`, when one exists.
    pub fn get(&self, url: &str) -> Option<Arc<ModuleRecord>> {
        self.records.get(url).map(|entry| Arc::clone(entry.value()))
    }

    /// Clears a record's cached artifacts so the next load re-instantiates.
    ///
    /// Returns false when the identifier has no record.
    pub fn invalidate(&self, url: &str) -> bool {
        match self.records.get(url) {
            Some(record) => {
                record.invalidate();
                true
            }
            None => false,
        }
    }

    /// Invalidates every record in the graph.
    pub fn invalidate_all(&self) {
        for entry in self.records.iter() {
            entry.value().invalidate();
        }
    }

    /// Number of records in the graph.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the graph has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for ModuleGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skylark_js::Value;

    #[test]
    fn test_clean_url() {
        assert_eq!(clean_url("/src/a.js?v=123"), "/src/a.js");
        assert_eq!(clean_url("/src/a.js#frag"), "/src/a.js");
        assert_eq!(clean_url("/src/a.js"), "/src/a.js");
    }

    #[test]
    fn test_ensure_record_is_idempotent() {
        let graph = ModuleGraph::new();
        let a = graph.ensure_record("/src/a.js");
        let b = graph.ensure_record("/src/a.js");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_file_derivation() {
        let graph = ModuleGraph::new();
        let record = graph.ensure_record("/src/a.js?v=1");
        assert_eq!(record.file, Some(PathBuf::from("/src/a.js")));

        let virtual_record = graph.ensure_record("\0virtual:config");
        assert_eq!(virtual_record.file, None);
    }

    #[test]
    fn test_module_object_is_never_replaced() {
        let graph = ModuleGraph::new();
        let record = graph.ensure_record("/src/a.js");

        let first = ObjectRef::new_module();
        assert!(record.set_module(first.clone()));
        assert!(!record.set_module(ObjectRef::new_module()));
        assert!(record.module().unwrap().ptr_eq(&first));
    }

    #[test]
    fn test_invalidate_clears_artifacts() {
        let graph = ModuleGraph::new();
        let record = graph.ensure_record("/src/a.js");
        let module = ObjectRef::new_module();
        module.set("x", Value::Number(1.0));
        record.set_module(module);
        record.set_error(SsrError::thrown("boom"));

        assert!(graph.invalidate("/src/a.js"));
        assert!(record.module().is_none());
        assert!(record.error().is_none());

        assert!(!graph.invalidate("/never-seen.js"));
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Runner configuration
//!
//! Options deserialize from the dev server's configuration file, so field
//! names follow its camelCase convention.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level options for a [`crate::ModuleRunner`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunnerOptions {
    /// Resolution rules applied to external (platform) loads.
    pub resolve: ResolveOptions,
    /// Whether error reports may clear the screen.
    pub clear_screen: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            resolve: ResolveOptions::default(),
            clear_screen: true,
        }
    }
}

/// Module resolution options mirrored into the platform's resolution
/// primitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolveOptions {
    /// Project root directory; deduplicated packages resolve from here.
    pub root: PathBuf,
    /// package.json fields consulted for a package entry point, in order.
    pub main_fields: Vec<String>,
    /// Extensions tried when a specifier has none.
    pub extensions: Vec<String>,
    /// Packages always resolved against the project root, regardless of the
    /// importer's position in the dependency tree.
    pub dedupe: Vec<String>,
    /// Keep symlinked paths instead of resolving to the real file.
    pub preserve_symlinks: bool,
    /// Prefer the CommonJS entry of dual-format packages.
    pub prefer_cjs: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
            main_fields: vec!["main".to_string()],
            extensions: vec![
                ".js".to_string(),
                ".mjs".to_string(),
                ".cjs".to_string(),
                ".json".to_string(),
                ".node".to_string(),
            ],
            dedupe: Vec::new(),
            preserve_symlinks: false,
            prefer_cjs: false,
        }
    }
}

impl ResolveOptions {
    /// The variant used for external loads: forces CommonJS entries where
    /// possible so the platform's require path can evaluate them without
    /// format-mismatch failures.
    pub fn for_external(&self) -> ResolveOptions {
        ResolveOptions {
            prefer_cjs: true,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RunnerOptions::default();
        assert_eq!(options.resolve.main_fields, vec!["main"]);
        assert!(options.clear_screen);
        assert!(!options.resolve.prefer_cjs);
    }

    #[test]
    fn test_for_external_forces_cjs() {
        let options = ResolveOptions::default();
        assert!(options.for_external().prefer_cjs);
        // The original is untouched
        assert!(!options.prefer_cjs);
    }

    #[test]
    fn test_deserialize_camel_case() {
        let options: RunnerOptions = serde_json::from_str(
            r#"{
                "clearScreen": false,
                "resolve": { "root": "/srv/app", "mainFields": ["module", "main"], "dedupe": ["react"] }
            }"#,
        )
        .unwrap();
        assert_eq!(options.resolve.root, PathBuf::from("/srv/app"));
        assert!(!options.clear_screen);
        assert_eq!(options.resolve.main_fields, vec!["module", "main"]);
        assert_eq!(options.resolve.dedupe, vec!["react"]);
        // Unspecified fields keep their defaults
        assert!(!options.resolve.extensions.is_empty());
    }
}

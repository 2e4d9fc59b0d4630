// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Platform bridge: loading external (non-project) modules
//!
//! Bare specifiers reference packages the platform's own loader evaluates.
//! For the duration of such a load the platform's internal resolution is
//! overridden so transitive requests follow the project's resolution rules
//! (main-field order, dedupe, CommonJS preference) instead of the
//! platform's defaults.

use crate::config::ResolveOptions;
use crate::error::{Result, SsrError};
use crate::module_system::interop::shim_external;
use crate::platform::{PlatformLoader, ResolutionHook, is_builtin};
use skylark_js::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;

/// Loads external identifiers through the platform's native loader.
pub struct ExternalLoader {
    platform: Arc<dyn PlatformLoader>,
    resolve_options: ResolveOptions,
    // External loads are serialized: overlapping hook installations would
    // corrupt the platform's resolution state.
    serial: Mutex<()>,
}

impl ExternalLoader {
    /// Creates a loader over the platform collaborator. `options` is the
    /// project resolution configuration; the CommonJS-forced variant is
    /// applied to every external load.
    pub fn new(platform: Arc<dyn PlatformLoader>, options: &ResolveOptions) -> Self {
        Self {
            platform,
            resolve_options: options.for_external(),
            serial: Mutex::new(()),
        }
    }

    /// Resolves and loads `id` through the platform, passing the result
    /// through the default-export interop shim.
    ///
    /// External loads are not circularity-tracked; the platform's own
    /// loader handles cycles among external modules.
    pub async fn load(&self, id: &str, importer: Option<&Path>) -> Result<Value> {
        let _serial = self.serial.lock().await;
        let _hook = self.platform.install_resolution_hook(self.resolution_hook());

        let location = self.load_location(id, importer)?;
        tracing::debug!(id, %location, "loading external module");
        let loaded = self.platform.dynamic_load(&location).await?;
        Ok(shim_external(loaded))
        // _hook drops here on every path, uninstalling the override
    }

    /// Where the platform should load `id` from. Built-ins, relative ids
    /// and ids with a non-loadable extension keep the platform's default
    /// resolution; everything else resolves through the project rules
    /// up front.
    fn load_location(&self, id: &str, importer: Option<&Path>) -> Result<String> {
        if is_builtin(id) || id.starts_with('.') || self.has_foreign_extension(id) {
            return Ok(id.to_string());
        }
        let resolved = self
            .platform
            .resolve(id, importer, &self.resolve_options, false)?
            .ok_or_else(|| SsrError::ModuleNotFound {
                id: id.to_string(),
                importer: importer
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string()),
            })?;
        Ok(file_url(&resolved))
    }

    fn has_foreign_extension(&self, id: &str) -> bool {
        let last = id.rsplit('/').next().unwrap_or(id);
        match last.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => !self
                .resolve_options
                .extensions
                .iter()
                .any(|known| known.trim_start_matches('.') == ext),
            _ => false,
        }
    }

    fn resolution_hook(&self) -> ResolutionHook {
        let platform = Arc::clone(&self.platform);
        let options = self.resolve_options.clone();
        Arc::new(move |request: &str, parent: Option<&Path>| {
            // Relative requests and built-ins keep the default resolution.
            if request.starts_with('.') || is_builtin(request) {
                return None;
            }
            match parent {
                // Known parent: apply the project's resolution rules.
                Some(parent) => platform
                    .resolve(request, Some(parent), &options, false)
                    .ok()
                    .flatten(),
                // No parent means an ES module importing a CommonJS one;
                // the request is already an absolute path.
                None => None,
            }
        })
    }
}

/// Formats a filesystem path as a `file://` URL string.
pub(crate) fn file_url(path: &Path) -> String {
    Url::from_file_path(path)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| format!("file://{}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_file_url() {
        assert_eq!(
            file_url(&PathBuf::from("/node_modules/pkg/index.js")),
            "file:///node_modules/pkg/index.js"
        );
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Transform pipeline interface
//!
//! The pipeline that turns raw project source into executable code with the
//! runtime bindings injected is an external collaborator. The runtime
//! consumes it as a black box and caches its output on the module record.

use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Output of the transform pipeline for one module.
#[derive(Debug, Clone)]
pub struct CompiledResult {
    /// Executable source text with the runtime bindings injected.
    pub code: String,
    /// The file the code was produced from, when the identifier maps to one.
    pub file: Option<PathBuf>,
}

/// The transform pipeline collaborator.
#[async_trait]
pub trait TransformPipeline: Send + Sync {
    /// Produces executable code for `url`, or `None` when the identifier
    /// cannot be transformed.
    async fn transform(&self, url: &str) -> Result<Option<Arc<CompiledResult>>>;
}

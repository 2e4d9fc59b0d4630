// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error reporting sink

use crate::error::SsrError;

/// Structured metadata attached to an error report.
#[derive(Debug, Clone, Default)]
pub struct LogErrorOptions {
    /// Ask the sink to prefix the message with a timestamp.
    pub timestamp: bool,
    /// Allow the sink to clear the screen before printing.
    pub clear: bool,
    /// The underlying error, when available.
    pub error: Option<SsrError>,
}

/// Error reporting sink consumed by the instantiation protocol.
///
/// The runner formats the message; the sink decides presentation. The
/// metadata flags are hints the sink is free to ignore.
pub trait Logger: Send + Sync {
    /// Reports an error message with structured metadata.
    fn error(&self, message: &str, options: &LogErrorOptions);
}

/// Default logger backed by the `tracing` macros.
///
/// `tracing` subscribers handle timestamps themselves and never clear the
/// screen, so the corresponding hints are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn error(&self, message: &str, options: &LogErrorOptions) {
        match &options.error {
            Some(err) => tracing::error!(code = err.code(), "{message}"),
            None => tracing::error!("{message}"),
        }
    }
}

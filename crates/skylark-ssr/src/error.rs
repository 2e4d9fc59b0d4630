// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the SSR runtime

use thiserror::Error;

/// Result type for SSR runtime operations
pub type Result<T> = std::result::Result<T, SsrError>;

/// Errors that can occur while instantiating SSR modules.
///
/// All variants are cheap to clone: a single in-flight instantiation is
/// shared by every concurrent requester, and each of them receives the same
/// failure.
#[derive(Debug, Clone, Error)]
pub enum SsrError {
    /// No compiled result could be produced for a module
    #[error("failed to load module for ssr: {url}")]
    TransformUnavailable {
        /// The module identifier that could not be transformed
        url: String,
    },

    /// An external identifier could not be resolved
    #[error("Cannot find module '{id}' imported from '{importer}'")]
    ModuleNotFound {
        /// The unresolvable identifier
        id: String,
        /// The importing module's file
        importer: String,
    },

    /// An exception raised inside a compiled unit, not yet attributed to a
    /// module (the instantiation protocol attributes and rewrites it)
    #[error("{message}")]
    Thrown {
        /// The exception message
        message: String,
        /// The raw stack trace, when the engine captured one
        stack: Option<String>,
    },

    /// A module's evaluation failed
    #[error("error when evaluating SSR module {url}: {message}")]
    Evaluation {
        /// The module whose evaluation raised
        url: String,
        /// The exception message
        message: String,
        /// The stack trace, rewritten against the module graph
        stack: Option<String>,
    },

    /// A host collaborator (engine, platform loader, transform pipeline)
    /// failed
    #[error("{0}")]
    Engine(String),
}

impl SsrError {
    /// Create an error for an exception raised inside a compiled unit
    pub fn thrown(message: impl Into<String>) -> Self {
        Self::Thrown {
            message: message.into(),
            stack: None,
        }
    }

    /// Create a host collaborator error
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine(message.into())
    }

    /// Diagnostic code identifying the error kind
    pub fn code(&self) -> &'static str {
        match self {
            Self::TransformUnavailable { .. } => "ERR_TRANSFORM_UNAVAILABLE",
            Self::ModuleNotFound { .. } => "ERR_MODULE_NOT_FOUND",
            Self::Thrown { .. } | Self::Evaluation { .. } => "ERR_EVALUATION_FAILED",
            Self::Engine(_) => "ERR_ENGINE",
        }
    }

    /// The stack trace attached to the error, when there is one
    pub fn stack(&self) -> Option<&str> {
        match self {
            Self::Thrown { stack, .. } | Self::Evaluation { stack, .. } => stack.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = SsrError::TransformUnavailable { url: "/src/a.js".into() };
        assert_eq!(err.to_string(), "failed to load module for ssr: /src/a.js");

        let err = SsrError::ModuleNotFound {
            id: "missing-pkg".into(),
            importer: "/src/a.js".into(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot find module 'missing-pkg' imported from '/src/a.js'"
        );
        assert_eq!(err.code(), "ERR_MODULE_NOT_FOUND");
    }

    #[test]
    fn test_clone_preserves_stack() {
        let err = SsrError::Evaluation {
            url: "/src/a.js".into(),
            message: "boom".into(),
            stack: Some("at /src/a.js:1:1".into()),
        };
        assert_eq!(err.clone().stack(), Some("at /src/a.js:1:1"));
    }
}

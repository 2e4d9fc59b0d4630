// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # skylark-js
//!
//! A minimal JavaScript value and object model for the Skylark SSR runtime.
//!
//! This crate does not execute JavaScript. It provides the data shapes the
//! runtime passes across the engine boundary:
//!
//! - [`Value`]: undefined, null, booleans, numbers, strings, objects
//! - [`ObjectRef`]: a shared-identity object with insertion-ordered
//!   properties, getter (accessor) properties, and freeze semantics
//!
//! Objects are reference types: cloning an [`ObjectRef`] (or a
//! [`Value::Object`]) yields another handle to the same object, exactly like
//! a JavaScript object reference. This is what lets a module namespace be
//! handed out while it is still being populated.
//!
//! ## Quick Start
//!
//! ```rust
//! use skylark_js::{ObjectRef, Value};
//!
//! let obj = ObjectRef::new();
//! obj.set("answer", Value::Number(42.0));
//!
//! let alias = obj.clone();
//! assert_eq!(alias.get("answer"), Some(Value::Number(42.0)));
//!
//! obj.freeze();
//! assert!(!obj.set("answer", Value::Null));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod object;
pub mod value;

// Re-exports for convenience
pub use object::{Getter, ObjectKind, ObjectRef};
pub use value::Value;

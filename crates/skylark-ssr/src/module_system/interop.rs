// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Default-export interop for externally loaded modules
//!
//! The platform loads external modules through two conventions: ES modules
//! with declared exports, and CommonJS modules whose exports object is the
//! module itself. Consumers of the runtime always see the ESM shape; this
//! shim normalizes what `default` means for a CommonJS-loaded value.

use skylark_js::{ObjectRef, Value};
use std::sync::Arc;

/// Marker key transpilers set on modules converted from ESM syntax.
pub const ESM_MARKER: &str = "__esModule";

/// Wraps an externally loaded module value in a namespace view.
///
/// Primitives pass through unchanged. For objects the view provides:
///
/// - `default`: the module's own `default` field when the [`ESM_MARKER`]
///   convention was used, otherwise the whole module value. A computed
///   default that is itself a transpiled wrapper (marker plus nested
///   `default`) is unwrapped one level further: ESM sources compiled to
///   CommonJS and loaded through the require path nest the real default one
///   level deeper than the native loader expects.
/// - any other key: the live module value, falling back to the computed
///   default for keys nullish or absent on the module.
///
/// The view is frozen and never mutates the underlying module.
pub fn shim_external(value: Value) -> Value {
    let Some(target) = value.as_object().cloned() else {
        return value;
    };
    let default = compute_default(&value, &target);

    let view = ObjectRef::new();
    {
        let default = default.clone();
        view.define_getter("default", Arc::new(move || default.clone()), true);
    }
    for key in target.keys() {
        if key != "default" {
            install_fallback_getter(&view, &key, &target, &default);
        }
    }
    // Named members that only exist on the unwrapped default stay reachable.
    if let Some(extra) = default.as_object() {
        if !extra.ptr_eq(&target) {
            for key in extra.keys() {
                if key != "default" && !view.has(&key) {
                    install_fallback_getter(&view, &key, &target, &default);
                }
            }
        }
    }
    view.freeze();
    Value::Object(view)
}

fn compute_default(module: &Value, target: &ObjectRef) -> Value {
    let mut default = if target.get(ESM_MARKER).is_some_and(|marker| marker.to_boolean()) {
        target.get("default").unwrap_or_default()
    } else {
        module.clone()
    };
    if let Some(wrapper) = default.as_object() {
        if wrapper.has(ESM_MARKER) && wrapper.has("default") {
            default = wrapper.get("default").unwrap_or_default();
        }
    }
    default
}

fn install_fallback_getter(view: &ObjectRef, key: &str, target: &ObjectRef, default: &Value) {
    let target = target.clone();
    let default = default.clone();
    let name = key.to_string();
    view.define_getter(
        key,
        Arc::new(move || match target.get(&name) {
            Some(value) if !value.is_nullish() => value,
            _ => default
                .as_object()
                .and_then(|default| default.get(&name))
                .unwrap_or_default(),
        }),
        true,
    );
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Shared-identity JavaScript objects.
//!
//! An [`ObjectRef`] is a handle to a property map with JS object semantics:
//! insertion-ordered keys, data and getter (accessor) properties, per-key
//! enumerability, and `Object.freeze` behavior. Handles are cheap to clone
//! and all clones observe the same underlying object.

use crate::value::Value;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A getter property. Re-evaluated on every read, which is what makes
/// re-exported bindings live rather than snapshots.
pub type Getter = Arc<dyn Fn() -> Value + Send + Sync>;

/// Distinguishes plain objects from module namespace objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// An ordinary object.
    Plain,
    /// A module namespace object produced by instantiation.
    Module,
}

#[derive(Clone)]
enum Binding {
    Data(Value),
    Accessor(Getter),
}

struct Slot {
    binding: Binding,
    enumerable: bool,
}

struct ObjectInner {
    kind: ObjectKind,
    slots: RwLock<IndexMap<String, Slot>>,
    frozen: AtomicBool,
}

/// A handle to a shared JavaScript object.
#[derive(Clone)]
pub struct ObjectRef {
    inner: Arc<ObjectInner>,
}

impl ObjectRef {
    /// Creates a new empty plain object.
    pub fn new() -> Self {
        Self::with_kind(ObjectKind::Plain)
    }

    /// Creates a new empty module namespace object.
    pub fn new_module() -> Self {
        Self::with_kind(ObjectKind::Module)
    }

    fn with_kind(kind: ObjectKind) -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                kind,
                slots: RwLock::new(IndexMap::new()),
                frozen: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the object's kind marker.
    pub fn kind(&self) -> ObjectKind {
        self.inner.kind
    }

    /// Returns true if this object is a module namespace.
    pub fn is_module(&self) -> bool {
        self.inner.kind == ObjectKind::Module
    }

    /// Reads a property. Getter properties are evaluated on every call.
    pub fn get(&self, key: &str) -> Option<Value> {
        // Clone the binding out before evaluating a getter: the getter may
        // read other shared objects and must not run under our lock.
        let binding = self.inner.slots.read().get(key).map(|s| s.binding.clone())?;
        match binding {
            Binding::Data(value) => Some(value),
            Binding::Accessor(getter) => Some(getter()),
        }
    }

    /// Assigns a data property, creating it when absent.
    ///
    /// Returns false (and leaves the object untouched) when the object is
    /// frozen or the key names a getter property.
    pub fn set(&self, key: &str, value: Value) -> bool {
        if self.is_frozen() {
            return false;
        }
        let mut slots = self.inner.slots.write();
        match slots.get_mut(key) {
            Some(slot) => match slot.binding {
                Binding::Accessor(_) => false,
                Binding::Data(_) => {
                    slot.binding = Binding::Data(value);
                    true
                }
            },
            None => {
                slots.insert(
                    key.to_string(),
                    Slot {
                        binding: Binding::Data(value),
                        enumerable: true,
                    },
                );
                true
            }
        }
    }

    /// Defines (or redefines) a data property with explicit enumerability.
    ///
    /// Returns false when the object is frozen.
    pub fn define_data(&self, key: &str, value: Value, enumerable: bool) -> bool {
        self.define(key, Binding::Data(value), enumerable)
    }

    /// Defines (or redefines) a getter property with explicit enumerability.
    ///
    /// Returns false when the object is frozen.
    pub fn define_getter(&self, key: &str, getter: Getter, enumerable: bool) -> bool {
        self.define(key, Binding::Accessor(getter), enumerable)
    }

    fn define(&self, key: &str, binding: Binding, enumerable: bool) -> bool {
        if self.is_frozen() {
            return false;
        }
        self.inner
            .slots
            .write()
            .insert(key.to_string(), Slot { binding, enumerable });
        true
    }

    /// Removes a property. Returns false when the object is frozen or the
    /// key does not exist.
    pub fn delete(&self, key: &str) -> bool {
        if self.is_frozen() {
            return false;
        }
        self.inner.slots.write().shift_remove(key).is_some()
    }

    /// Returns true if the property exists (enumerable or not).
    pub fn has(&self, key: &str) -> bool {
        self.inner.slots.read().contains_key(key)
    }

    /// Returns the enumerable keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .slots
            .read()
            .iter()
            .filter(|(_, slot)| slot.enumerable)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Returns the number of properties (enumerable or not).
    pub fn len(&self) -> usize {
        self.inner.slots.read().len()
    }

    /// Returns true if the object has no properties.
    pub fn is_empty(&self) -> bool {
        self.inner.slots.read().is_empty()
    }

    /// Freezes the object. All subsequent mutation is ignored.
    pub fn freeze(&self) {
        self.inner.frozen.store(true, Ordering::Release);
    }

    /// Returns true if the object has been frozen.
    pub fn is_frozen(&self) -> bool {
        self.inner.frozen.load(Ordering::Acquire)
    }

    /// Returns true if both handles refer to the same object.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for ObjectRef {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<(String, Value)> for ObjectRef {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let obj = ObjectRef::new();
        for (key, value) in iter {
            obj.set(&key, value);
        }
        obj
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.inner.slots.read();
        let mut dbg = f.debug_struct(match self.inner.kind {
            ObjectKind::Plain => "Object",
            ObjectKind::Module => "Module",
        });
        for (key, slot) in slots.iter() {
            match &slot.binding {
                Binding::Data(value) => dbg.field(key, value),
                Binding::Accessor(_) => dbg.field(key, &"<getter>"),
            };
        }
        dbg.finish()
    }
}

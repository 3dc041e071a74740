// Copyright 2014 Nick Fitzgerald
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The embedder-facing handle: `Context`, its construction/teardown, and
//! the small cross-cutting helpers (`type_of`, `error`, global `set`'s
//! partner `resolve`) used throughout the rest of the crate.
//!
//! There is exactly one implementation of this surface, so — following
//! the teacher's `Heap` — it is a plain struct with inherent methods
//! rather than a trait. Unlike the teacher, the methods are spread
//! across the module whose concern they match (`gc.rs` for collection,
//! `value.rs` for constructors, `reader.rs`/`writer.rs` for I/O,
//! `environment.rs` for binding, `eval.rs` for evaluation) rather than
//! all living in one file, since `emblisp` has enough concerns that one
//! file would stop being a useful unit of organization.

use std::collections::HashMap;
use std::marker::PhantomData;

use crate::cell::{Arena, FinalizeHook, Kind, MarkHook, Value};
use crate::error::FeError;
use crate::gc::GcStack;
use crate::reader::Location;

/// Hooks an embedder may install to participate in marking, finalize a
/// foreign resource, or observe errors. All three are optional; `fn`
/// pointers for `mark`/`finalize` (no state beyond what a `Ptr` cell's
/// payload already carries), a boxed closure for `error` since observing
/// an error is commonly stateful (a log sink, a counter).
pub struct Handlers {
    pub error: Option<Box<dyn FnMut(&mut Context, &FeError, &[Value])>>,
    pub mark: Option<MarkHook>,
    pub finalize: Option<FinalizeHook>,
}

impl Default for Handlers {
    fn default() -> Self {
        Handlers {
            error: None,
            mark: None,
            finalize: None,
        }
    }
}

/// A conservative default: enough headroom for interning every
/// primitive name plus a modest user program without embedders having
/// to think about sizing up front.
pub const DEFAULT_CAPACITY: usize = 1 << 14;

/// The smallest capacity bootstrap can run in. Interning the primitive
/// table and the `t` symbol costs on the order of a few hundred cells;
/// this floor keeps `Context::open` from panicking on a capacity an
/// embedder picked without accounting for that fixed cost.
const MIN_CAPACITY: usize = 512;

pub struct Context {
    pub(crate) arena: Arena,
    pub(crate) gcstack: GcStack,
    pub(crate) symlist: Value,
    pub(crate) calllist: Vec<Value>,
    pub(crate) t: Value,
    pub(crate) nextchr: Option<u8>,
    pub(crate) line: u32,
    pub(crate) col: u32,
    pub(crate) locations: HashMap<Value, Location>,
    pub handlers: Handlers,
    _not_send_sync: PhantomData<*const ()>,
}

impl Context {
    /// Allocates a cell pool of `capacity` cells and binds the
    /// primitive table and the self-bound `t` symbol into it, mirroring
    /// `fe_open`. The pool is never resized after this call.
    pub fn open(capacity: usize) -> Context {
        assert!(
            capacity >= MIN_CAPACITY,
            "capacity {} is too small to bootstrap emblisp's primitive table (need at least {})",
            capacity,
            MIN_CAPACITY
        );
        let mut ctx = Context {
            arena: Arena::with_capacity(capacity),
            gcstack: GcStack::new(),
            symlist: Value::Nil,
            calllist: Vec::new(),
            t: Value::Nil,
            nextchr: None,
            line: 1,
            col: 0,
            locations: HashMap::new(),
            handlers: Handlers::default(),
            _not_send_sync: PhantomData,
        };
        ctx.bootstrap();
        ctx
    }

    fn bootstrap(&mut self) {
        let t = self
            .intern("t")
            .expect("interning `t` cannot fail on a freshly opened context");
        self.t = t;
        self.set(t, t)
            .expect("self-binding `t` cannot fail on a freshly opened context");

        let save = self.gcstack.save();
        for &(name, op) in crate::primitives::PRIMS {
            let sym = self
                .intern(name)
                .expect("interning a primitive name cannot fail on a freshly opened context");
            let v = self
                .allocate()
                .expect("binding the primitive table cannot fail on a freshly opened context");
            *self.arena.get_mut(v) = crate::cell::Cell::Prim(op);
            self.set(sym, v)
                .expect("binding a primitive cannot fail on a freshly opened context");
            self.gcstack.restore(save);
        }
    }

    /// Drops every root, runs a final collection (so any registered
    /// finalizer sees every still-live `Ptr` cell reclaimed), then
    /// consumes `self`. There is nothing further to free explicitly:
    /// the pool is an ordinary `Vec` and is dropped along with the
    /// `Context`.
    pub fn close(mut self) {
        self.gcstack.restore(0);
        self.symlist = Value::Nil;
        self.calllist.clear();
        self.collect_garbage();
    }

    /// The symbol `t`, self-bound at open time.
    pub fn t(&self) -> Value {
        self.t
    }

    pub fn is_nil(&self, v: Value) -> bool {
        v.is_nil()
    }

    /// The tag of `v`; `nil` reports `Kind::Nil` even though it is
    /// never actually stored in the pool.
    pub fn type_of(&self, v: Value) -> Kind {
        self.kind_of(v)
    }

    pub fn type_code(&self, v: Value) -> u8 {
        self.type_of(v).into()
    }

    pub(crate) fn kind_of(&self, v: Value) -> Kind {
        match v {
            Value::Nil => Kind::Nil,
            Value::Cell(_) => self.arena.get(v).kind(),
        }
    }

    pub(crate) fn type_error(&self, expected: Kind, got: Kind) -> FeError {
        FeError::TypeMismatch {
            expected: expected.name(),
            got: got.name(),
        }
    }

    /// Builds an `FeError` from a message, the equivalent of a native
    /// function calling `fe_error`. Unlike the C original this simply
    /// constructs the error; the caller still has to propagate it with
    /// `?` or an explicit `Err(...)`, since Rust has no `longjmp` to
    /// unwind through on its behalf.
    pub fn error(&self, msg: impl Into<String>) -> FeError {
        FeError::Custom(msg.into())
    }

    pub(crate) fn current_location(&self) -> Location {
        Location {
            line: self.line,
            col: self.col,
        }
    }

    pub(crate) fn location_of(&self, v: Value) -> Option<Location> {
        self.locations.get(&v).copied()
    }
}

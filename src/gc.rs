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

//! Explicit-root garbage collection.
//!
//! The teacher's `heap.rs` spends a long doc comment on precise vs.
//! conservative rooting and settles on a refcounted `Rooted<T>` RAII
//! guard per live reference. `emblisp` takes the C original's simpler
//! (and, for an interpreter whose own evaluator is the only long-lived
//! native caller, perfectly adequate) approach instead: a single
//! depth-bounded stack of roots that callers `save()` a depth from and
//! later `restore()` to, giving an O(1)-rooted-set property across
//! loops (`while`, the reader's list-building loop) without needing a
//! guard type per reference. `Context::push_root`/`save_roots`/
//! `restore_roots` are the embedder-facing names for this.
//!
//! Marking itself is a direct match over `Cell` (see `Context::mark`
//! below) rather than the teacher's `Trace` trait over a `GcThing` sum
//! type — with one homogeneous pool there is nothing left for a second
//! trait to abstract over, but the idea it encodes (every GC participant
//! declares what it holds) survives as the match arms here.

use crate::cell::{Cell, Value};
use crate::error::{FeError, FeResult};

/// Matches `GCSTACKSIZE` in the original: deep enough for realistic
/// nesting, shallow enough that runaway recursion fails fast instead of
/// growing without bound.
const GCSTACK_CAPACITY: usize = 256;

pub(crate) struct GcStack {
    stack: Vec<Value>,
}

impl GcStack {
    pub fn new() -> GcStack {
        GcStack {
            stack: Vec::with_capacity(GCSTACK_CAPACITY),
        }
    }

    pub fn save(&self) -> usize {
        self.stack.len()
    }

    pub fn restore(&mut self, depth: usize) {
        self.stack.truncate(depth);
    }

    pub fn push(&mut self, v: Value) -> FeResult<()> {
        if self.stack.len() == GCSTACK_CAPACITY {
            return Err(FeError::GcStackOverflow);
        }
        self.stack.push(v);
        Ok(())
    }

    pub fn pop(&mut self) {
        self.stack.pop();
    }

    pub fn roots(&self) -> &[Value] {
        &self.stack
    }
}

impl crate::context::Context {
    /// Root `v` on the explicit GC stack. Exposed so a native `cfunc`
    /// can protect a value it builds across further allocations, the
    /// same contract `fe_pushgc` gives embedders.
    pub fn push_root(&mut self, v: Value) -> FeResult<()> {
        self.gcstack.push(v)
    }

    /// Current depth of the root stack, to be handed back to
    /// `restore_roots` later.
    pub fn save_roots(&self) -> usize {
        self.gcstack.save()
    }

    /// Drop every root pushed since `depth` was captured by
    /// `save_roots`.
    pub fn restore_roots(&mut self, depth: usize) {
        self.gcstack.restore(depth);
    }

    /// Trace `v` and everything it reaches, setting mark bits as it
    /// goes. Written as a `while`-loop over the "next" pointer of each
    /// kind (car is recursed into, cdr/body/binding continues the loop)
    /// so that long lists and bodies don't consume native stack depth —
    /// the same tail-loop shape `fe_mark` uses.
    ///
    /// Public so an embedder's `mark` hook can call back in to trace
    /// whatever a `Ptr` cell's foreign structure reaches, the same way
    /// `fe_mark` is exposed to `fe_Handlers::mark` in the original.
    pub fn mark(&mut self, root: Value) {
        let mut v = root;
        loop {
            if self.arena.is_marked(v) {
                return;
            }
            self.arena.mark(v);
            let cell = *self.arena.get(v);
            match cell {
                Cell::Pair { car, cdr } => {
                    self.mark(car);
                    v = cdr;
                }
                Cell::Func { env, params, body } | Cell::Macro { env, params, body } => {
                    self.mark(env);
                    self.mark(params);
                    v = body;
                }
                Cell::Symbol { binding } => {
                    v = binding;
                }
                Cell::String { next, .. } => {
                    v = next;
                }
                Cell::Ptr(_) => {
                    if let Some(hook) = self.handlers.mark {
                        hook(self, v);
                    }
                    return;
                }
                _ => return,
            }
        }
    }

    /// Marks every root (the explicit GC stack, the symbol table, and
    /// the call list), sweeps the pool, and runs any registered
    /// finalizer over the `Ptr` cells reclaimed.
    pub fn collect_garbage(&mut self) {
        log::debug!(
            "collecting garbage: {} cells in use of {}",
            self.arena.capacity() - self.arena.free_count(),
            self.arena.capacity()
        );
        let roots: Vec<Value> = self.gcstack.roots().to_vec();
        for r in roots {
            self.mark(r);
        }
        let symlist = self.symlist;
        self.mark(symlist);
        let calllist: Vec<Value> = self.calllist.clone();
        for r in calllist {
            self.mark(r);
        }
        let freed = self.arena.sweep();
        for (_, ptr) in freed {
            if let Some(hook) = self.handlers.finalize {
                hook(self, ptr);
            }
        }
    }

    /// Pops the free list, running a collection first if it is empty
    /// and failing with `OutOfMemory` if the pool is still exhausted
    /// afterward. The freshly allocated cell is pushed onto the root
    /// stack before being handed back, exactly like `object()` in the
    /// original — every constructor goes through this.
    pub(crate) fn allocate(&mut self) -> FeResult<Value> {
        if self.arena.free_is_empty() {
            self.collect_garbage();
            if self.arena.free_is_empty() {
                return Err(FeError::OutOfMemory);
            }
        }
        let v = self
            .arena
            .alloc()
            .expect("freelist checked non-empty immediately above");
        self.gcstack.push(v)?;
        Ok(v)
    }
}

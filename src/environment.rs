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

//! Symbol interning and the runtime environment that binds symbols to
//! values.
//!
//! There is no compile-time resolution here, unlike a de-Bruijn-indexed
//! scheme: an environment is a plain association list consed onto as
//! `let`/function calls introduce bindings, and `resolve` walks it by
//! identity before falling back to a symbol's own global binding cell.
//! That fallback is what makes every symbol double as a one-slot global
//! variable even before any local environment is involved.

use crate::cell::{Cell, Kind, Value};
use crate::context::Context;
use crate::error::FeResult;

impl Context {
    /// The symbol's `(name . value)` binding pair, as stored directly in
    /// the `Symbol` cell.
    pub(crate) fn symbol_binding_pair(&self, sym: Value) -> Value {
        match *self.arena.get(sym) {
            Cell::Symbol { binding } => binding,
            _ => unreachable!("symbol_binding_pair called on a non-symbol cell"),
        }
    }

    /// Finds the interned symbol named `name`, creating and threading it
    /// onto the symbol table if this is the first time it has been
    /// seen. Interning is linear in the number of distinct symbols seen
    /// so far, same as the original's `fe_symbol`.
    pub fn intern(&mut self, name: &str) -> FeResult<Value> {
        let mut cur = self.symlist;
        while let Value::Cell(_) = cur {
            let sym = self.car(cur)?;
            let binding_pair = self.symbol_binding_pair(sym);
            let sym_name = self.car(binding_pair)?;
            if self.string_equals_str(sym_name, name) {
                return Ok(sym);
            }
            cur = self.cdr(cur)?;
        }

        let name_str = self.string(name)?;
        let binding_pair = self.cons(name_str, Value::Nil)?;
        let sym = self.allocate()?;
        *self.arena.get_mut(sym) = Cell::Symbol {
            binding: binding_pair,
        };
        self.symlist = self.cons(sym, self.symlist)?;
        Ok(sym)
    }

    /// Walks `env` for a pair whose car is `sym` by identity; on a miss,
    /// returns the symbol's own global binding pair. Either way, the
    /// value is `cdr` of whatever pair comes back.
    pub(crate) fn resolve(&self, sym: Value, env: Value) -> FeResult<Value> {
        let mut cur = env;
        while let Value::Cell(_) = cur {
            let pair = self.car(cur)?;
            let bound_sym = self.car(pair)?;
            if bound_sym == sym {
                return Ok(pair);
            }
            cur = self.cdr(cur)?;
        }
        Ok(self.symbol_binding_pair(sym))
    }

    /// Assigns into a symbol's *global* binding cell, ignoring any local
    /// environment — the behavior `Context::error`-raising native code
    /// and top-level `def`-style setup want, and what `fe_set` provides.
    pub fn set(&mut self, sym: Value, v: Value) -> FeResult<()> {
        if self.kind_of(sym) != Kind::Symbol {
            return Err(self.type_error(Kind::Symbol, self.kind_of(sym)));
        }
        let pair = self.resolve(sym, Value::Nil)?;
        self.set_cdr(pair, v)
    }

    /// Assigns into whichever binding `resolve` finds for `sym` under
    /// `env` — local if shadowed, global otherwise. Used by the `=`
    /// special form.
    pub(crate) fn assign(&mut self, sym: Value, env: Value, v: Value) -> FeResult<()> {
        let pair = self.resolve(sym, env)?;
        self.set_cdr(pair, v)
    }

    /// True if `v` is the symbol named `s`, compared structurally
    /// without re-interning.
    pub(crate) fn is_symbol_named(&self, v: Value, s: &str) -> bool {
        if self.kind_of(v) != Kind::Symbol {
            return false;
        }
        let binding_pair = self.symbol_binding_pair(v);
        match self.car(binding_pair) {
            Ok(name) => self.string_equals_str(name, s),
            Err(_) => false,
        }
    }
}

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

//! Value constructors and the handful of structural accessors
//! (`car`/`cdr`, `set_car`/`set_cdr`, `is`) every higher module builds
//! on.
//!
//! Every constructor here funnels through `Context::allocate` (see
//! `gc.rs`), which is what roots the freshly built cell and runs a
//! collection if the pool is full — callers never touch the arena's
//! freelist directly.

use crate::cell::{Cell, Kind, Value, CFunc, STRBUF_LEN};
use crate::context::Context;
use crate::error::FeResult;

impl Context {
    pub fn cons(&mut self, car: Value, cdr: Value) -> FeResult<Value> {
        let v = self.allocate()?;
        *self.arena.get_mut(v) = Cell::Pair { car, cdr };
        Ok(v)
    }

    pub fn number(&mut self, n: f64) -> FeResult<Value> {
        let v = self.allocate()?;
        *self.arena.get_mut(v) = Cell::Number(n);
        Ok(v)
    }

    /// The canonical boolean encoding: `t` for true, `nil` for false.
    pub fn bool_value(&mut self, flag: bool) -> Value {
        if flag {
            self.t
        } else {
            Value::Nil
        }
    }

    pub fn cfunc(&mut self, f: CFunc) -> FeResult<Value> {
        let v = self.allocate()?;
        *self.arena.get_mut(v) = Cell::Cfunc(f);
        Ok(v)
    }

    /// Wraps an arbitrary foreign pointer so it can be stored in a cons
    /// structure and reclaimed like anything else; the embedder is
    /// responsible for what the pointer means and for registering a
    /// `finalize` hook if it needs cleanup.
    pub fn ptr(&mut self, p: *mut ()) -> FeResult<Value> {
        let v = self.allocate()?;
        *self.arena.get_mut(v) = Cell::Ptr(p);
        Ok(v)
    }

    /// Builds a new, empty string chunk cell (`len == 0`, not yet
    /// linked to anything).
    pub(crate) fn new_string_chunk(&mut self) -> FeResult<Value> {
        let v = self.allocate()?;
        *self.arena.get_mut(v) = Cell::String {
            buf: [0; STRBUF_LEN],
            len: 0,
            next: Value::Nil,
        };
        Ok(v)
    }

    /// Appends one byte to the string chain whose current tail chunk is
    /// `tail`, allocating and linking a fresh chunk first if `tail` is
    /// full. Returns the (possibly new) tail. Used both by
    /// `Context::string` and by the reader, which builds string
    /// literals incrementally as it decodes escapes.
    pub(crate) fn string_append_byte(&mut self, tail: Value, byte: u8) -> FeResult<Value> {
        let full = match *self.arena.get(tail) {
            Cell::String { len, .. } => len as usize == STRBUF_LEN,
            _ => unreachable!("string_append_byte called on a non-string cell"),
        };
        let tail = if full {
            let next = self.new_string_chunk()?;
            if let Cell::String { next: n, .. } = self.arena.get_mut(tail) {
                *n = next;
            }
            // `next` is reachable through `tail` now; stop separately
            // rooting it, mirroring `buildstring`'s `gcstack_idx--`.
            self.gcstack.pop();
            next
        } else {
            tail
        };
        if let Cell::String { buf, len, .. } = self.arena.get_mut(tail) {
            buf[*len as usize] = byte;
            *len += 1;
        }
        Ok(tail)
    }

    /// Builds a string cell chain holding the UTF-8 bytes of `s`.
    /// Embedded NUL bytes are stored faithfully (unlike the C original,
    /// which cannot represent them), but the representation otherwise
    /// chunks exactly like `fe_string`.
    pub fn string(&mut self, s: &str) -> FeResult<Value> {
        let head = self.new_string_chunk()?;
        let mut tail = head;
        for &b in s.as_bytes() {
            tail = self.string_append_byte(tail, b)?;
        }
        Ok(head)
    }

    /// Builds a list from `items`, most recently consed last (so the
    /// final `cons` call, and thus the full list, ends up on top of the
    /// root stack). Each `cons` call roots its own result; like
    /// `fe_list`, a very long slice will walk the GC-stack depth
    /// linearly, so this is meant for short, fixed argument lists.
    pub fn list(&mut self, items: &[Value]) -> FeResult<Value> {
        let mut res = Value::Nil;
        for &item in items.iter().rev() {
            res = self.cons(item, res)?;
        }
        Ok(res)
    }

    pub fn car(&self, v: Value) -> FeResult<Value> {
        if v.is_nil() {
            return Ok(Value::Nil);
        }
        match *self.arena.get(v) {
            Cell::Pair { car, .. } => Ok(car),
            _ => Err(self.type_error(Kind::Pair, self.kind_of(v))),
        }
    }

    pub fn cdr(&self, v: Value) -> FeResult<Value> {
        if v.is_nil() {
            return Ok(Value::Nil);
        }
        match *self.arena.get(v) {
            Cell::Pair { cdr, .. } => Ok(cdr),
            _ => Err(self.type_error(Kind::Pair, self.kind_of(v))),
        }
    }

    pub fn set_car(&mut self, pair: Value, v: Value) -> FeResult<()> {
        let kind = self.kind_of(pair);
        match self.arena.get_mut(pair) {
            Cell::Pair { car, .. } => {
                *car = v;
                Ok(())
            }
            _ => Err(self.type_error(Kind::Pair, kind)),
        }
    }

    pub fn set_cdr(&mut self, pair: Value, v: Value) -> FeResult<()> {
        let kind = self.kind_of(pair);
        match self.arena.get_mut(pair) {
            Cell::Pair { cdr, .. } => {
                *cdr = v;
                Ok(())
            }
            _ => Err(self.type_error(Kind::Pair, kind)),
        }
    }

    pub fn to_number(&self, v: Value) -> FeResult<f64> {
        if v.is_nil() {
            return Err(self.type_error(Kind::Number, Kind::Nil));
        }
        match *self.arena.get(v) {
            Cell::Number(n) => Ok(n),
            _ => Err(self.type_error(Kind::Number, self.kind_of(v))),
        }
    }

    pub fn to_ptr(&self, v: Value) -> FeResult<*mut ()> {
        if v.is_nil() {
            return Err(self.type_error(Kind::Ptr, Kind::Nil));
        }
        match *self.arena.get(v) {
            Cell::Ptr(p) => Ok(p),
            _ => Err(self.type_error(Kind::Ptr, self.kind_of(v))),
        }
    }

    /// Structural equality: identical cells are always equal; beyond
    /// that, two numbers are equal by value and two strings are equal
    /// by contents. Everything else (pairs, symbols, functions, ...)
    /// is compared by identity only, matching `fe_equal`.
    pub fn is(&self, a: Value, b: Value) -> bool {
        if a == b {
            return true;
        }
        match (a, b) {
            (Value::Cell(_), Value::Cell(_)) => match (self.arena.get(a), self.arena.get(b)) {
                (Cell::Number(x), Cell::Number(y)) => x == y,
                (Cell::String { .. }, Cell::String { .. }) => self.strings_equal(a, b),
                _ => false,
            },
            _ => false,
        }
    }

    fn strings_equal(&self, a: Value, b: Value) -> bool {
        let mut ca = a;
        let mut cb = b;
        loop {
            match (ca, cb) {
                (Value::Nil, Value::Nil) => return true,
                (Value::Cell(_), Value::Cell(_)) => {
                    let (buf_a, len_a, next_a) = match *self.arena.get(ca) {
                        Cell::String { buf, len, next } => (buf, len, next),
                        _ => return false,
                    };
                    let (buf_b, len_b, next_b) = match *self.arena.get(cb) {
                        Cell::String { buf, len, next } => (buf, len, next),
                        _ => return false,
                    };
                    if len_a != len_b || buf_a[..len_a as usize] != buf_b[..len_b as usize] {
                        return false;
                    }
                    ca = next_a;
                    cb = next_b;
                }
                _ => return false,
            }
        }
    }

    /// Compares a string cell chain against a plain Rust string,
    /// without allocating; used for symbol interning and for detecting
    /// the reader's `.` token.
    pub(crate) fn string_equals_str(&self, str_val: Value, s: &str) -> bool {
        let mut cur = str_val;
        let mut rest = s.as_bytes();
        loop {
            match cur {
                Value::Nil => return rest.is_empty(),
                Value::Cell(_) => {
                    let (buf, len, next) = match *self.arena.get(cur) {
                        Cell::String { buf, len, next } => (buf, len, next),
                        _ => return false,
                    };
                    let chunk = &buf[..len as usize];
                    if rest.len() < chunk.len() || &rest[..chunk.len()] != chunk {
                        return false;
                    }
                    rest = &rest[chunk.len()..];
                    cur = next;
                }
            }
        }
    }
}

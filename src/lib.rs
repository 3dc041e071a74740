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

//! An embeddable interpreter for a small LISP-family expression
//! language: a fixed-capacity cell pool, a mark-and-sweep collector
//! with an explicit root stack, a pull-based reader, and an evaluator
//! with closures, macros, and a small primitive set.
//!
//! Start at [`Context::open`] for the embedder-facing API surface:
//! [`Context::read`], [`Context::eval`], [`Context::write`], and the
//! value constructors in the `value` module's `impl Context` block.

mod cell;
mod context;
mod environment;
mod error;
mod eval;
mod gc;
mod primitives;
mod reader;
mod value;
mod writer;

pub use cell::{CFunc, FinalizeHook, Kind, MarkHook, Value};
pub use context::{Context, Handlers, DEFAULT_CAPACITY};
pub use error::{FeError, FeResult};
pub use reader::{CharSource, Location, ReadSource, StrSource};
pub use writer::{BoundedBuffer, Writer};

#[cfg(test)]
mod tests;

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

//! The interpreter's single error channel.
//!
//! The original C source has one: every failure condition funnels through
//! `fe_error`, which hands the embedder a `const char*` and a traceback and
//! either long-jumps away or terminates the process. Rust has no `longjmp`,
//! so the channel here is a `Result`: every fallible operation returns
//! `FeResult<T>`, and `?` propagation plays the role the C source gives to
//! `fe_error`'s stack unwind. See `Context::eval` for where the unwound
//! error is finally handed to the embedder's error hook.

use thiserror::Error;

/// One variant per message family listed in the interpreter's error
/// channel. Matching on the *kind* of error (rather than a formatted
/// string, as the C original requires) is a small, idiomatic improvement
/// that costs nothing here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeError {
    #[error("too few arguments")]
    TooFewArguments,

    #[error("dotted pair in argument list")]
    DottedPairInArgList,

    #[error("expected {expected}, got {got}")]
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },

    #[error("gc stack overflow")]
    GcStackOverflow,

    #[error("out of memory")]
    OutOfMemory,

    #[error("unclosed list")]
    UnclosedList,

    #[error("unclosed string")]
    UnclosedString,

    #[error("stray ')'")]
    StrayCloseParen,

    #[error("stray '''")]
    StrayQuote,

    #[error("symbol too long")]
    SymbolTooLong,

    #[error("tried to call non-callable value")]
    NotCallable,

    /// Raised by `Context::error`, the equivalent of a native function
    /// calling `fe_error` with a custom message.
    #[error("{0}")]
    Custom(String),
}

pub type FeResult<T> = Result<T, FeError>;

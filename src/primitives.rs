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

//! The primitive table: special forms and built-in functions that are
//! bound into the global environment at `Context::open` time, each
//! represented as a `Cell::Prim` holding one of these tags.
//!
//! Mirrors `fe.c`'s `P_LET .. P_DIV` enum and its parallel `primnames`
//! array, just without the raw integer indices into a C array.

/// One variant per entry the original's `primnames`/`prim(...)` table
/// carries. Dispatch lives in `eval.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimOp {
    Let,
    Set,
    If,
    Fn,
    Mac,
    While,
    Quote,
    And,
    Or,
    Do,
    Cons,
    Car,
    Cdr,
    SetCar,
    SetCdr,
    List,
    Not,
    Is,
    Atom,
    Print,
    Lt,
    Lte,
    Add,
    Sub,
    Mul,
    Div,
}

/// Name/tag pairs bound into the global environment when a `Context`
/// opens, in the same order `fe_open` binds them.
pub const PRIMS: &[(&str, PrimOp)] = &[
    ("let", PrimOp::Let),
    ("=", PrimOp::Set),
    ("if", PrimOp::If),
    ("fn", PrimOp::Fn),
    ("mac", PrimOp::Mac),
    ("while", PrimOp::While),
    ("quote", PrimOp::Quote),
    ("and", PrimOp::And),
    ("or", PrimOp::Or),
    ("do", PrimOp::Do),
    ("cons", PrimOp::Cons),
    ("car", PrimOp::Car),
    ("cdr", PrimOp::Cdr),
    ("setcar", PrimOp::SetCar),
    ("setcdr", PrimOp::SetCdr),
    ("list", PrimOp::List),
    ("not", PrimOp::Not),
    ("is", PrimOp::Is),
    ("atom", PrimOp::Atom),
    ("print", PrimOp::Print),
    ("<", PrimOp::Lt),
    ("<=", PrimOp::Lte),
    ("+", PrimOp::Add),
    ("-", PrimOp::Sub),
    ("*", PrimOp::Mul),
    ("/", PrimOp::Div),
];

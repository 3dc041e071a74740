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

//! The pull-based reader: tokenizes and parses one form at a time from
//! anything implementing `CharSource`, mirroring `fe_read`'s
//! `fe_ReadFn` callback contract.
//!
//! A one-character lookahead (`Context::nextchr`) persists across calls
//! the same way `ctx->nextchr` does in the original, which is what lets
//! a REPL call `read` repeatedly against the same source and have
//! delimiter characters consumed by one atom correctly reinjected for
//! the next.

use crate::cell::Value;
use crate::context::Context;
use crate::error::{FeError, FeResult};

/// A pull source of bytes; returns `None` at end of input, playing the
/// role of the `'\0'` sentinel the C callback returns at EOF.
pub trait CharSource {
    fn next_char(&mut self) -> Option<u8>;
}

/// Reads directly out of a borrowed string, for embedding a literal
/// program or for feeding one line of REPL input at a time.
pub struct StrSource<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> StrSource<'a> {
    pub fn new(s: &'a str) -> Self {
        StrSource {
            bytes: s.as_bytes(),
            pos: 0,
        }
    }
}

impl<'a> CharSource for StrSource<'a> {
    fn next_char(&mut self) -> Option<u8> {
        if self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            self.pos += 1;
            Some(b)
        } else {
            None
        }
    }
}

/// Reads out of anything implementing `std::io::Read`, one byte at a
/// time — the closest analogue to handing `fe_read` a `FILE*`.
pub struct ReadSource<R> {
    inner: R,
}

impl<R: std::io::Read> ReadSource<R> {
    pub fn new(inner: R) -> Self {
        ReadSource { inner }
    }
}

impl<R: std::io::Read> CharSource for ReadSource<R> {
    fn next_char(&mut self) -> Option<u8> {
        let mut buf = [0u8; 1];
        match self.inner.read(&mut buf) {
            Ok(1) => Some(buf[0]),
            _ => None,
        }
    }
}

/// A source position, attached to list cells the reader builds (not to
/// values built by `cons` at eval time). Not present in the C original;
/// see `Context::enlocate`/`locate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: u32,
    pub col: u32,
}

impl Location {
    pub fn unknown() -> Location {
        Location { line: 0, col: 0 }
    }
}

const DELIMS: &[u8] = b" \n\t\r();";
const ATOM_BUF_LEN: usize = 63;

enum ReadToken {
    Eof,
    CloseParen,
    Form(Value),
}

impl Context {
    fn getc<S: CharSource>(&mut self, src: &mut S) -> Option<u8> {
        if let Some(c) = self.nextchr.take() {
            return Some(c);
        }
        let c = src.next_char();
        if let Some(b) = c {
            if b == b'\n' {
                self.line += 1;
                self.col = 0;
            } else {
                self.col += 1;
            }
        }
        c
    }

    fn is_dot_token(&self, v: Value) -> bool {
        self.is_symbol_named(v, ".")
    }

    fn read_form<S: CharSource>(&mut self, src: &mut S) -> FeResult<ReadToken> {
        let mut c = self.getc(src);
        loop {
            match c {
                Some(b' ') | Some(b'\n') | Some(b'\t') | Some(b'\r') => {
                    c = self.getc(src);
                }
                _ => break,
            }
        }
        let c = match c {
            None => return Ok(ReadToken::Eof),
            Some(b) => b,
        };

        match c {
            b';' => {
                let mut c = Some(c);
                while let Some(b) = c {
                    if b == b'\n' {
                        break;
                    }
                    c = self.getc(src);
                }
                self.read_form(src)
            }
            b')' => Ok(ReadToken::CloseParen),
            b'(' => self.read_list(src),
            b'\'' => self.read_quote(src),
            b'"' => self.read_string(src),
            _ => self.read_atom(src, c),
        }
    }

    fn read_list<S: CharSource>(&mut self, src: &mut S) -> FeResult<ReadToken> {
        let loc = self.current_location();
        let mut res = Value::Nil;
        let mut tail_cell: Option<Value> = None;
        let save = self.gcstack.save();
        self.gcstack.push(res)?;

        loop {
            match self.read_form(src)? {
                ReadToken::CloseParen => break,
                ReadToken::Eof => return Err(FeError::UnclosedList),
                ReadToken::Form(v) => {
                    if self.is_dot_token(v) {
                        match self.read(src)? {
                            Some(t) => {
                                if let Some(tc) = tail_cell {
                                    self.set_cdr(tc, t)?;
                                } else {
                                    res = t;
                                }
                            }
                            None => return Err(FeError::UnclosedList),
                        }
                    } else {
                        let cell = self.cons(v, Value::Nil)?;
                        if let Some(tc) = tail_cell {
                            self.set_cdr(tc, cell)?;
                        } else {
                            res = cell;
                        }
                        tail_cell = Some(cell);
                    }
                }
            }
            self.gcstack.restore(save);
            self.gcstack.push(res)?;
        }

        if let Value::Cell(_) = res {
            self.locations.insert(res, loc);
        }
        Ok(ReadToken::Form(res))
    }

    fn read_quote<S: CharSource>(&mut self, src: &mut S) -> FeResult<ReadToken> {
        match self.read(src)? {
            Some(v) => {
                let quote_sym = self.intern("quote")?;
                let inner = self.cons(v, Value::Nil)?;
                let form = self.cons(quote_sym, inner)?;
                Ok(ReadToken::Form(form))
            }
            None => Err(FeError::StrayQuote),
        }
    }

    fn read_string<S: CharSource>(&mut self, src: &mut S) -> FeResult<ReadToken> {
        let head = self.new_string_chunk()?;
        let mut tail = head;
        loop {
            let c = self.getc(src).ok_or(FeError::UnclosedString)?;
            if c == b'"' {
                break;
            }
            let c = if c == b'\\' {
                let escaped = self.getc(src).ok_or(FeError::UnclosedString)?;
                match escaped {
                    b'n' => b'\n',
                    b'r' => b'\r',
                    b't' => b'\t',
                    other => other,
                }
            } else {
                c
            };
            tail = self.string_append_byte(tail, c)?;
        }
        Ok(ReadToken::Form(head))
    }

    fn read_atom<S: CharSource>(&mut self, src: &mut S, first: u8) -> FeResult<ReadToken> {
        let mut buf: Vec<u8> = Vec::new();
        let mut c = Some(first);
        loop {
            let b = c.expect("loop only continues while a byte is present");
            if buf.len() == ATOM_BUF_LEN {
                return Err(FeError::SymbolTooLong);
            }
            buf.push(b);
            c = self.getc(src);
            match c {
                Some(n) if !DELIMS.contains(&n) => continue,
                _ => break,
            }
        }
        self.nextchr = c;

        let text = String::from_utf8_lossy(&buf);
        if let Ok(n) = text.parse::<f64>() {
            return Ok(ReadToken::Form(self.number(n)?));
        }
        if text == "nil" {
            return Ok(ReadToken::Form(Value::Nil));
        }
        Ok(ReadToken::Form(self.intern(&text)?))
    }

    /// Reads one form, or `None` at end of input. A stray `)` is an
    /// error here (it is only a valid token inside `read_list`).
    pub fn read<S: CharSource>(&mut self, src: &mut S) -> FeResult<Option<Value>> {
        match self.read_form(src)? {
            ReadToken::Eof => Ok(None),
            ReadToken::CloseParen => Err(FeError::StrayCloseParen),
            ReadToken::Form(v) => Ok(Some(v)),
        }
    }

    /// The source location a list was read from, if any is recorded.
    pub fn locate(&self, v: Value) -> Option<Location> {
        self.location_of(v)
    }

    /// Reads and evaluates every form in `src` in turn, returning the
    /// last value (or `nil` if `src` held no forms). A convenience for
    /// embedders and tests alike, in the spirit of the teacher's own
    /// `evaluate_file` test helper.
    pub fn eval_source(&mut self, src: &str) -> FeResult<Value> {
        let mut source = StrSource::new(src);
        let mut result = Value::Nil;
        loop {
            let save = self.save_roots();
            match self.read(&mut source)? {
                Some(form) => result = self.eval(form)?,
                None => break,
            }
            self.restore_roots(save);
        }
        Ok(result)
    }
}

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

//! Printing values to a byte sink.
//!
//! Two sink shapes mirror the two the original source offers: a
//! `FILE*`-backed `fe_writefp` and a bounded-buffer `fe_tostring`. Here
//! that's the `Writer` trait (any byte sink implements it; `Vec<u8>`
//! does out of the box) and `BoundedBuffer`, which truncates silently
//! and still reports how many bytes it *would* have written, matching
//! `fe_tostring`'s `size_t` return.

use crate::cell::{Cell, Kind, Value};
use crate::context::Context;
use crate::error::FeResult;

pub trait Writer {
    fn write_byte(&mut self, byte: u8);

    fn write_str(&mut self, s: &str) {
        for b in s.bytes() {
            self.write_byte(b);
        }
    }
}

impl Writer for Vec<u8> {
    fn write_byte(&mut self, byte: u8) {
        self.push(byte);
    }
}

/// A fixed-size destination that silently drops bytes past its
/// capacity while still counting every byte that was *asked* to be
/// written, so a caller can detect truncation by comparing `written()`
/// against the buffer length.
pub struct BoundedBuffer<'a> {
    buf: &'a mut [u8],
    written: usize,
}

impl<'a> BoundedBuffer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        BoundedBuffer { buf, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl<'a> Writer for BoundedBuffer<'a> {
    fn write_byte(&mut self, byte: u8) {
        if self.written < self.buf.len() {
            self.buf[self.written] = byte;
        }
        self.written += 1;
    }
}

/// Approximates the original's `sprintf(buf, "%.7g", n)`: seven
/// significant digits, scientific notation outside `[1e-4, 1e7)`,
/// trailing zeros trimmed.
pub(crate) fn format_number(n: f64) -> String {
    const SIG: i32 = 7;
    if n == 0.0 {
        return if n.is_sign_negative() {
            "-0".to_string()
        } else {
            "0".to_string()
        };
    }
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let neg = n.is_sign_negative();
    let mag = n.abs();
    let exp = mag.log10().floor() as i32;
    let use_sci = exp < -4 || exp >= SIG;

    let mut out = if use_sci {
        let mantissa = mag / 10f64.powi(exp);
        let digits = trim_trailing_zeros(&format!("{:.*}", (SIG - 1) as usize, mantissa));
        format!("{}e{}{:02}", digits, if exp >= 0 { "+" } else { "-" }, exp.abs())
    } else {
        let decimals = (SIG - 1 - exp).max(0) as usize;
        trim_trailing_zeros(&format!("{:.*}", decimals, mag))
    };
    if neg {
        out.insert(0, '-');
    }
    out
}

fn trim_trailing_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

impl Context {
    /// Writes `v` to `sink`. `quoted` controls string rendering: at the
    /// top level and inside a list, strings are quoted with escaped
    /// `"` characters; a symbol's own name (itself a string cell) is
    /// always written unquoted, regardless of `quoted`.
    pub fn write<W: Writer>(&self, v: Value, sink: &mut W, quoted: bool) -> FeResult<()> {
        match self.kind_of(v) {
            Kind::Nil => {
                sink.write_str("nil");
                Ok(())
            }
            Kind::Number => {
                sink.write_str(&format_number(self.to_number(v)?));
                Ok(())
            }
            Kind::Pair => self.write_pair(v, sink),
            Kind::Symbol => {
                let binding_pair = self.symbol_binding_pair(v);
                let name = self.car(binding_pair)?;
                self.write(name, sink, false)
            }
            Kind::String => {
                self.write_string(v, sink, quoted);
                Ok(())
            }
            other => {
                sink.write_str(&format!("[{} 0x{:x}]", other.name(), self.address_of(v)));
                Ok(())
            }
        }
    }

    fn write_pair<W: Writer>(&self, v: Value, sink: &mut W) -> FeResult<()> {
        sink.write_byte(b'(');
        let mut cur = v;
        loop {
            let (car, cdr) = match *self.arena.get(cur) {
                Cell::Pair { car, cdr } => (car, cdr),
                _ => unreachable!("write_pair called on a non-pair cell"),
            };
            self.write(car, sink, true)?;
            if self.kind_of(cdr) != Kind::Pair {
                if !cdr.is_nil() {
                    sink.write_str(" . ");
                    self.write(cdr, sink, true)?;
                }
                break;
            }
            sink.write_byte(b' ');
            cur = cdr;
        }
        sink.write_byte(b')');
        Ok(())
    }

    fn write_string<W: Writer>(&self, v: Value, sink: &mut W, quoted: bool) {
        if quoted {
            sink.write_byte(b'"');
        }
        let mut cur = v;
        while let Value::Cell(_) = cur {
            let (buf, len, next) = match *self.arena.get(cur) {
                Cell::String { buf, len, next } => (buf, len, next),
                _ => break,
            };
            for &b in &buf[..len as usize] {
                if quoted && b == b'"' {
                    sink.write_byte(b'\\');
                }
                sink.write_byte(b);
            }
            cur = next;
        }
        if quoted {
            sink.write_byte(b'"');
        }
    }

    /// A stable per-object identifier for the `[kind 0xADDR]` rendering
    /// of funcs/macros/prims/cfuncs/ptrs. The original prints the
    /// object's real pointer address; since exposing real addresses has
    /// no purpose here beyond distinguishing objects in debug output,
    /// the pool index serves the same role.
    fn address_of(&self, v: Value) -> usize {
        match v {
            Value::Cell(i) => i as usize,
            Value::Nil => 0,
        }
    }

    /// Writes `v` into a fixed-size buffer, returning the number of
    /// bytes that were written (or would have been, had the buffer been
    /// large enough) — the `fe_tostring` contract.
    pub fn to_string_buf(&self, v: Value, dst: &mut [u8]) -> FeResult<usize> {
        let mut sink = BoundedBuffer::new(dst);
        self.write(v, &mut sink, false)?;
        Ok(sink.written())
    }
}

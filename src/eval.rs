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

//! The evaluator: symbol lookup, self-evaluation, and the call dispatch
//! that handles primitives, native `cfunc`s, closures, and in-place
//! macro expansion.
//!
//! Errors propagate with `?` the whole way up, which is this crate's
//! replacement for the original's `setjmp`/`longjmp` recovery: instead
//! of jumping directly to a saved point, an `Err` simply unwinds the
//! Rust call stack, and `Context::eval` — the one public entry point —
//! is where the call-list snapshot is handed to the error hook and the
//! call list is reset, ready for the embedder to resume (see the
//! `calllist` bookkeeping below).

use crate::cell::{Cell, Kind, Value};
use crate::context::Context;
use crate::error::{FeError, FeResult};
use crate::primitives::PrimOp;
use crate::writer::Writer;

struct StdoutSink<'a>(std::io::StdoutLock<'a>);

impl<'a> Writer for StdoutSink<'a> {
    fn write_byte(&mut self, byte: u8) {
        use std::io::Write;
        let _ = self.0.write_all(&[byte]);
    }
}

impl Context {
    /// Evaluates `form` in the global environment. This is the one
    /// public entry point into the evaluator; every recursive
    /// evaluation inside a closure, macro expansion, or special form
    /// goes through `eval_with_newenv` instead, which does not reset the
    /// call list on error, since only the outermost call is the right
    /// place to hand the embedder a complete traceback and resume from
    /// a clean slate.
    pub fn eval(&mut self, form: Value) -> FeResult<Value> {
        match self.eval_with_newenv(form, Value::Nil, None) {
            Ok(v) => Ok(v),
            Err(e) => {
                let cl = std::mem::take(&mut self.calllist);
                if let Some(mut hook) = self.handlers.error.take() {
                    hook(self, &e, &cl);
                    self.handlers.error = Some(hook);
                }
                Err(e)
            }
        }
    }

    /// The call-list-tracking core of evaluation. `newenv`, when
    /// present, lets a caller that is sequencing a body of forms (`do`,
    /// a function body, `while`'s body) thread an environment extended
    /// by a `let` partway through that body back out to the next form.
    pub(crate) fn eval_with_newenv(
        &mut self,
        form: Value,
        env: Value,
        newenv: Option<&mut Value>,
    ) -> FeResult<Value> {
        if self.kind_of(form) == Kind::Symbol {
            let pair = self.resolve(form, env)?;
            return self.cdr(pair);
        }
        if self.kind_of(form) != Kind::Pair {
            return Ok(form);
        }

        self.calllist.push(form);
        let result = self.eval_call(form, env, newenv);
        if result.is_ok() {
            self.calllist.pop();
        }
        result
    }

    fn eval_call(
        &mut self,
        form: Value,
        env: Value,
        newenv: Option<&mut Value>,
    ) -> FeResult<Value> {
        let save = self.gcstack.save();
        let head = self.car(form)?;
        let callee = self.eval_with_newenv(head, env, None)?;
        let mut arg = self.cdr(form)?;

        let res = match self.kind_of(callee) {
            Kind::Prim => {
                let op = match *self.arena.get(callee) {
                    Cell::Prim(op) => op,
                    _ => unreachable!(),
                };
                self.eval_prim(op, &mut arg, env, newenv)?
            }
            Kind::Cfunc => {
                let f = match *self.arena.get(callee) {
                    Cell::Cfunc(f) => f,
                    _ => unreachable!(),
                };
                let args = self.evallist(arg, env)?;
                f(self, args)?
            }
            Kind::Func => {
                let (captured_env, params, body) = match *self.arena.get(callee) {
                    Cell::Func { env, params, body } => (env, params, body),
                    _ => unreachable!(),
                };
                let args = self.evallist(arg, env)?;
                let call_env = self.argstoenv(params, args, captured_env)?;
                self.dolist(body, call_env)?
            }
            Kind::Macro => {
                let (captured_env, params, body) = match *self.arena.get(callee) {
                    Cell::Macro { env, params, body } => (env, params, body),
                    _ => unreachable!(),
                };
                let call_env = self.argstoenv(params, arg, captured_env)?;
                let expansion = self.dolist(body, call_env)?;
                self.overwrite_in_place(form, expansion)?;
                self.gcstack.restore(save);
                return self.eval_with_newenv(form, env, None);
            }
            _ => return Err(FeError::NotCallable),
        };

        self.gcstack.restore(save);
        self.gcstack.push(res)?;
        Ok(res)
    }

    /// Rewrites the call-site pair `dest` to hold whatever `src`
    /// currently holds, so a macro's expansion replaces its own call
    /// site in the program tree and is evaluated directly on the next
    /// pass (and reused without re-expanding, if the same tree node is
    /// ever evaluated again). `src == Value::Nil` can't be copied this
    /// way (nil isn't a pool cell to alias), so an expansion of nil is
    /// rewritten as the self-quoting form `(quote nil)` instead, which
    /// evaluates to the same thing.
    fn overwrite_in_place(&mut self, dest: Value, src: Value) -> FeResult<()> {
        match src {
            Value::Nil => {
                let quote_sym = self.intern("quote")?;
                let nil_pair = self.cons(Value::Nil, Value::Nil)?;
                *self.arena.get_mut(dest) = Cell::Pair {
                    car: quote_sym,
                    cdr: nil_pair,
                };
            }
            Value::Cell(_) => {
                let content = *self.arena.get(src);
                *self.arena.get_mut(dest) = content;
            }
        }
        Ok(())
    }

    /// Pops the next argument off `arg`, erroring if the list runs out
    /// early or is improperly dotted. Exposed so native `cfunc`s can
    /// walk their own argument list the same way special forms do.
    pub fn next_arg(&self, arg: &mut Value) -> FeResult<Value> {
        match *arg {
            Value::Nil => Err(FeError::TooFewArguments),
            Value::Cell(_) => match *self.arena.get(*arg) {
                Cell::Pair { car, cdr } => {
                    *arg = cdr;
                    Ok(car)
                }
                _ => Err(FeError::DottedPairInArgList),
            },
        }
    }

    fn eval_arg(&mut self, arg: &mut Value, env: Value) -> FeResult<Value> {
        let form = self.next_arg(arg)?;
        self.eval_with_newenv(form, env, None)
    }

    /// Evaluates every form in `lst` under `env`, collecting the
    /// results into a new list in order.
    fn evallist(&mut self, mut lst: Value, env: Value) -> FeResult<Value> {
        let mut res = Value::Nil;
        let mut tail: Option<Value> = None;
        while !lst.is_nil() {
            let form = self.next_arg(&mut lst)?;
            let v = self.eval_with_newenv(form, env, None)?;
            let cell = self.cons(v, Value::Nil)?;
            match tail {
                Some(t) => self.set_cdr(t, cell)?,
                None => res = cell,
            }
            tail = Some(cell);
        }
        Ok(res)
    }

    /// Evaluates a body of forms in sequence, threading any environment
    /// a `let` inside the body introduces to the next form, and
    /// restoring the GC-stack depth between forms so a long body
    /// doesn't consume unbounded root-stack space.
    fn dolist(&mut self, mut lst: Value, mut env: Value) -> FeResult<Value> {
        let mut res = Value::Nil;
        let save = self.gcstack.save();
        while !lst.is_nil() {
            self.gcstack.restore(save);
            self.gcstack.push(lst)?;
            self.gcstack.push(env)?;
            let form = self.next_arg(&mut lst)?;
            res = self.eval_with_newenv(form, env, Some(&mut env))?;
        }
        Ok(res)
    }

    /// Extends `env` by binding `prm` against `arg` positionally. A
    /// bare trailing symbol in place of a pair (an improper parameter
    /// list, `(a b . rest)`) binds the remainder of `arg` as a rest
    /// parameter.
    fn argstoenv(&mut self, mut prm: Value, mut arg: Value, mut env: Value) -> FeResult<Value> {
        while !prm.is_nil() {
            if self.kind_of(prm) != Kind::Pair {
                let pair = self.cons(prm, arg)?;
                env = self.cons(pair, env)?;
                return Ok(env);
            }
            let prm_car = self.car(prm)?;
            let arg_car = self.car(arg)?;
            let pair = self.cons(prm_car, arg_car)?;
            env = self.cons(pair, env)?;
            prm = self.cdr(prm)?;
            arg = self.cdr(arg)?;
        }
        Ok(env)
    }

    fn eval_prim(
        &mut self,
        op: PrimOp,
        arg: &mut Value,
        env: Value,
        newenv: Option<&mut Value>,
    ) -> FeResult<Value> {
        use PrimOp::*;
        match op {
            Let => {
                let sym = self.next_arg(arg)?;
                if self.kind_of(sym) != Kind::Symbol {
                    return Err(self.type_error(Kind::Symbol, self.kind_of(sym)));
                }
                let value = self.eval_arg(arg, env)?;
                if let Some(out) = newenv {
                    let pair = self.cons(sym, value)?;
                    *out = self.cons(pair, env)?;
                }
                Ok(value)
            }

            Set => {
                let sym = self.next_arg(arg)?;
                if self.kind_of(sym) != Kind::Symbol {
                    return Err(self.type_error(Kind::Symbol, self.kind_of(sym)));
                }
                let value = self.eval_arg(arg, env)?;
                self.assign(sym, env, value)?;
                Ok(Value::Nil)
            }

            If => {
                let mut result = Value::Nil;
                loop {
                    if arg.is_nil() {
                        break;
                    }
                    let cond = self.eval_arg(arg, env)?;
                    if !cond.is_nil() {
                        result = if arg.is_nil() {
                            cond
                        } else {
                            self.eval_arg(arg, env)?
                        };
                        break;
                    }
                    if arg.is_nil() {
                        break;
                    }
                    *arg = self.cdr(*arg)?;
                }
                Ok(result)
            }

            Fn | Mac => {
                let params = self.next_arg(arg)?;
                let body = *arg;
                let v = self.allocate()?;
                *self.arena.get_mut(v) = if op == Fn {
                    Cell::Func { env, params, body }
                } else {
                    Cell::Macro { env, params, body }
                };
                Ok(v)
            }

            While => {
                let cond_form = self.next_arg(arg)?;
                let body = *arg;
                let save = self.gcstack.save();
                loop {
                    let test = self.eval_with_newenv(cond_form, env, None)?;
                    if test.is_nil() {
                        break;
                    }
                    self.dolist(body, env)?;
                    self.gcstack.restore(save);
                }
                Ok(Value::Nil)
            }

            Quote => self.next_arg(arg),

            And => {
                let mut res = Value::Nil;
                while !arg.is_nil() {
                    res = self.eval_arg(arg, env)?;
                    if res.is_nil() {
                        break;
                    }
                }
                Ok(res)
            }

            Or => {
                let mut res = Value::Nil;
                while !arg.is_nil() {
                    res = self.eval_arg(arg, env)?;
                    if !res.is_nil() {
                        break;
                    }
                }
                Ok(res)
            }

            Do => self.dolist(*arg, env),

            Cons => {
                let a = self.eval_arg(arg, env)?;
                let d = self.eval_arg(arg, env)?;
                self.cons(a, d)
            }

            Car => {
                let v = self.eval_arg(arg, env)?;
                self.car(v)
            }

            Cdr => {
                let v = self.eval_arg(arg, env)?;
                self.cdr(v)
            }

            SetCar => {
                let pair = self.eval_arg(arg, env)?;
                if self.kind_of(pair) != Kind::Pair {
                    return Err(self.type_error(Kind::Pair, self.kind_of(pair)));
                }
                let v = self.eval_arg(arg, env)?;
                self.set_car(pair, v)?;
                Ok(Value::Nil)
            }

            SetCdr => {
                let pair = self.eval_arg(arg, env)?;
                if self.kind_of(pair) != Kind::Pair {
                    return Err(self.type_error(Kind::Pair, self.kind_of(pair)));
                }
                let v = self.eval_arg(arg, env)?;
                self.set_cdr(pair, v)?;
                Ok(Value::Nil)
            }

            List => self.evallist(*arg, env),

            Not => {
                let v = self.eval_arg(arg, env)?;
                Ok(self.bool_value(v.is_nil()))
            }

            Is => {
                let a = self.eval_arg(arg, env)?;
                let b = self.eval_arg(arg, env)?;
                Ok(self.bool_value(self.is(a, b)))
            }

            Atom => {
                let v = self.eval_arg(arg, env)?;
                Ok(self.bool_value(self.kind_of(v) != Kind::Pair))
            }

            Print => {
                let stdout = std::io::stdout();
                let mut sink = StdoutSink(stdout.lock());
                let mut first = true;
                while !arg.is_nil() {
                    let v = self.eval_arg(arg, env)?;
                    if !first {
                        sink.write_byte(b' ');
                    }
                    first = false;
                    self.write(v, &mut sink, false)?;
                }
                sink.write_byte(b'\n');
                Ok(Value::Nil)
            }

            Lt => self.numcmp(arg, env, |x, y| x < y),
            Lte => self.numcmp(arg, env, |x, y| x <= y),

            Add => self.arith(arg, env, |x, y| x + y),
            Sub => self.arith(arg, env, |x, y| x - y),
            Mul => self.arith(arg, env, |x, y| x * y),
            Div => self.arith(arg, env, |x, y| x / y),
        }
    }

    fn numcmp(&mut self, arg: &mut Value, env: Value, op: fn(f64, f64) -> bool) -> FeResult<Value> {
        let a = self.eval_arg(arg, env)?;
        let x = self.to_number(a)?;
        let b = self.eval_arg(arg, env)?;
        let y = self.to_number(b)?;
        Ok(self.bool_value(op(x, y)))
    }

    fn arith(&mut self, arg: &mut Value, env: Value, op: fn(f64, f64) -> f64) -> FeResult<Value> {
        let first = self.eval_arg(arg, env)?;
        let mut acc = self.to_number(first)?;
        while !arg.is_nil() {
            let next = self.eval_arg(arg, env)?;
            acc = op(acc, self.to_number(next)?);
        }
        self.number(acc)
    }
}

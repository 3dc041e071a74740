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

//! Crate-internal tests covering the invariants, laws, and concrete
//! scenarios from the interpreter's testable-properties section:
//! cell-pool accounting, GC idempotence, reader/writer round trips,
//! and the worked example programs.

use crate::cell::{Kind, Value};
use crate::context::Context;
use crate::error::FeError;
use crate::reader::StrSource;

const CAP: usize = 4096;

fn ctx() -> Context {
    Context::open(CAP)
}

fn read_one(ctx: &mut Context, src: &str) -> Value {
    let mut s = StrSource::new(src);
    ctx.read(&mut s)
        .expect("read should not error")
        .expect("source should hold exactly one form")
}

fn write_to_string(ctx: &Context, v: Value, quoted: bool) -> String {
    let mut buf: Vec<u8> = Vec::new();
    ctx.write(v, &mut buf, quoted).expect("write should not error");
    String::from_utf8(buf).expect("writer only emits valid UTF-8 for these tests")
}

fn live_cell_count(ctx: &Context) -> usize {
    ctx.arena.capacity() - ctx.arena.free_count()
}

// --- §8 invariants -------------------------------------------------

#[test]
fn pool_accounting_sums_to_capacity() {
    let mut c = ctx();
    for i in 0..50 {
        c.number(i as f64).unwrap();
    }
    assert_eq!(c.arena.capacity(), CAP);
    assert!(c.arena.free_count() <= CAP);
    assert_eq!(live_cell_count(&c) + c.arena.free_count(), CAP);
}

#[test]
fn intern_is_identity_stable() {
    let mut c = ctx();
    let a = c.intern("foo").unwrap();
    let b = c.intern("foo").unwrap();
    assert_eq!(a, b, "interning the same name twice must return the same cell");

    let other = c.intern("bar").unwrap();
    assert_ne!(a, other);
}

#[test]
fn is_matches_spec_equality_rules() {
    let mut c = ctx();
    let x = c.number(1.5).unwrap();
    assert!(c.is(x, x));

    let a = c.number(7.0).unwrap();
    let b = c.number(7.0).unwrap();
    assert!(c.is(a, b), "two distinct number cells with the same value are `is`");

    let sa = c.string("hi").unwrap();
    let sb = c.string("hi").unwrap();
    assert!(c.is(sa, sb), "two distinct string cells with equal bytes are `is`");

    let p1 = c.cons(Value::Nil, Value::Nil).unwrap();
    let p2 = c.cons(Value::Nil, Value::Nil).unwrap();
    assert!(!c.is(p1, p2), "freshly allocated pairs are only `is` by identity");

    assert!(c.is(Value::Nil, Value::Nil));
}

#[test]
fn no_live_cell_reports_free_kind() {
    let mut c = ctx();
    let v = c.cons(Value::Nil, Value::Nil).unwrap();
    assert_ne!(c.type_of(v), Kind::Free);
}

// --- §4.C constructors ----------------------------------------------

#[test]
fn car_cdr_of_cons_round_trip() {
    let mut c = ctx();
    let a = c.number(1.0).unwrap();
    let b = c.number(2.0).unwrap();
    let p = c.cons(a, b).unwrap();
    assert_eq!(c.car(p).unwrap(), a);
    assert_eq!(c.cdr(p).unwrap(), b);
}

#[test]
fn car_cdr_of_nil_is_nil() {
    let c = ctx();
    assert_eq!(c.car(Value::Nil).unwrap(), Value::Nil);
    assert_eq!(c.cdr(Value::Nil).unwrap(), Value::Nil);
}

#[test]
fn setcar_setcdr_require_a_pair() {
    let mut c = ctx();
    let n = c.number(1.0).unwrap();
    let err = c.set_car(n, Value::Nil).unwrap_err();
    assert!(matches!(err, FeError::TypeMismatch { .. }));
}

#[test]
fn list_builder_matches_repeated_cons() {
    let mut c = ctx();
    let a = c.number(1.0).unwrap();
    let b = c.number(2.0).unwrap();
    let lst = c.list(&[a, b]).unwrap();
    assert_eq!(c.car(lst).unwrap(), a);
    let rest = c.cdr(lst).unwrap();
    assert_eq!(c.car(rest).unwrap(), b);
    assert_eq!(c.cdr(rest).unwrap(), Value::Nil);
}

#[test]
fn bool_value_encodes_t_and_nil() {
    let mut c = ctx();
    assert_eq!(c.bool_value(true), c.t());
    assert_eq!(c.bool_value(false), Value::Nil);
}

// --- §8 laws: reader/writer round trip --------------------------------

#[test]
fn roundtrip_number() {
    let mut c = ctx();
    let v = read_one(&mut c, "42.5");
    assert_eq!(write_to_string(&c, v, false), "42.5");
}

#[test]
fn roundtrip_nil() {
    let mut c = ctx();
    let v = read_one(&mut c, "nil");
    assert!(v.is_nil());
    assert_eq!(write_to_string(&c, v, false), "nil");
}

#[test]
fn roundtrip_t_symbol() {
    let mut c = ctx();
    let v = read_one(&mut c, "t");
    assert_eq!(v, c.t());
    assert_eq!(write_to_string(&c, v, false), "t");
}

#[test]
fn roundtrip_symbol() {
    let mut c = ctx();
    let v = read_one(&mut c, "hello-world");
    assert_eq!(c.type_of(v), Kind::Symbol);
    assert_eq!(write_to_string(&c, v, false), "hello-world");
}

#[test]
fn roundtrip_proper_list() {
    let mut c = ctx();
    let v = read_one(&mut c, "(1 2 3)");
    assert_eq!(write_to_string(&c, v, false), "(1 2 3)");
}

#[test]
fn roundtrip_dotted_pair() {
    let mut c = ctx();
    let v = read_one(&mut c, "(1 . 2)");
    assert_eq!(write_to_string(&c, v, false), "(1 . 2)");
}

#[test]
fn roundtrip_quoted_form() {
    let mut c = ctx();
    let v = read_one(&mut c, "'x");
    assert_eq!(write_to_string(&c, v, false), "(quote x)");
}

#[test]
fn roundtrip_string_without_embedded_quotes() {
    let mut c = ctx();
    let v = read_one(&mut c, "\"hello\"");
    assert_eq!(write_to_string(&c, v, true), "\"hello\"");
    assert_eq!(write_to_string(&c, v, false), "hello");
}

#[test]
fn string_longer_than_one_chunk_round_trips() {
    let mut c = ctx();
    let long = "abcdefghijklmnopqrstuvwxyz0123456789";
    let v = c.string(long).unwrap();
    assert_eq!(write_to_string(&c, v, false), long);
}

// --- reader syntax edge cases -----------------------------------------

#[test]
fn reader_skips_line_comments() {
    let mut c = ctx();
    let v = read_one(&mut c, "; a comment\n7");
    assert_eq!(write_to_string(&c, v, false), "7");
}

#[test]
fn reader_decodes_string_escapes() {
    let mut c = ctx();
    let v = read_one(&mut c, "\"a\\nb\"");
    let mut buf = [0u8; 16];
    let n = c.to_string_buf(v, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"a\nb");
}

#[test]
fn stray_close_paren_is_an_error() {
    let mut c = ctx();
    let mut s = StrSource::new(")");
    assert_eq!(c.read(&mut s).unwrap_err(), FeError::StrayCloseParen);
}

#[test]
fn unclosed_list_is_an_error() {
    let mut c = ctx();
    let mut s = StrSource::new("(1 2");
    assert_eq!(c.read(&mut s).unwrap_err(), FeError::UnclosedList);
}

#[test]
fn unclosed_string_is_an_error() {
    let mut c = ctx();
    let mut s = StrSource::new("\"abc");
    assert_eq!(c.read(&mut s).unwrap_err(), FeError::UnclosedString);
}

#[test]
fn stray_quote_is_an_error() {
    let mut c = ctx();
    let mut s = StrSource::new("'");
    assert_eq!(c.read(&mut s).unwrap_err(), FeError::StrayQuote);
}

// --- §8 laws: eval ------------------------------------------------------

#[test]
fn eval_quote_returns_form_unevaluated() {
    let mut c = ctx();
    let v = c.eval_source("(quote (1 2 3))").unwrap();
    assert_eq!(write_to_string(&c, v, false), "(1 2 3)");
}

#[test]
fn assignment_is_visible_in_same_environment() {
    let mut c = ctx();
    let v = c.eval_source("(do (= x 5) x)").unwrap();
    assert_eq!(write_to_string(&c, v, false), "5");
}

#[test]
fn while_with_nil_condition_does_not_leak_cells() {
    let mut c = ctx();
    c.eval_source("(= i 0)").unwrap();
    // Parse the form ahead of time so the measurement below covers only
    // `eval`'s own allocation, not the cost of reading the program text.
    let form = {
        let mut src = StrSource::new("(while nil (= i (+ i 1)))");
        c.read(&mut src).unwrap().unwrap()
    };
    let free_before = c.arena.free_count();
    c.eval(form).unwrap();
    let free_after = c.arena.free_count();
    assert!(
        free_after >= free_before,
        "a loop that never runs its body must not consume net cells"
    );
}

#[test]
fn gc_is_idempotent_with_no_intervening_allocation() {
    let mut c = ctx();
    c.eval_source("(= x (cons 1 2))").unwrap();
    c.collect_garbage();
    let after_first = c.arena.free_count();
    c.collect_garbage();
    let after_second = c.arena.free_count();
    assert_eq!(after_first, after_second);
}

// --- §8 concrete scenarios ------------------------------------------

#[test]
fn scenario_1_arithmetic() {
    let mut c = ctx();
    let v = c.eval_source("(+ 1 2 3)").unwrap();
    assert_eq!(write_to_string(&c, v, false), "6");
}

#[test]
fn scenario_2_closure_over_let_binding() {
    let mut c = ctx();
    let v = c
        .eval_source("(do (= x 10) (= y (fn (n) (* n n))) (y x))")
        .unwrap();
    assert_eq!(write_to_string(&c, v, false), "100");
}

#[test]
fn scenario_3_macro_rewrite() {
    let mut c = ctx();
    c.eval_source("(= unless (mac (c . body) (list (quote if) c nil (cons (quote do) body))))")
        .unwrap();
    let v = c.eval_source("(unless nil 42)").unwrap();
    assert_eq!(write_to_string(&c, v, false), "42");

    // The call-site pair is rewritten in place; re-evaluating the same
    // syntactic form again must not re-expand the macro, only re-run
    // the (by-now-ordinary) expansion.
    let call_form = {
        let mut src = StrSource::new("(unless nil 99)");
        c.read(&mut src).unwrap().unwrap()
    };
    let v1 = c.eval(call_form).unwrap();
    assert_eq!(write_to_string(&c, v1, false), "99");
    assert_eq!(c.type_of(call_form), Kind::Pair);
    let head = c.car(call_form).unwrap();
    assert!(c.is_symbol_named(head, "if"), "expansion should have overwritten the call cell");
}

#[test]
fn scenario_4_let_and_while_loop() {
    let mut c = ctx();
    let v = c
        .eval_source("(do (let acc 0) (let i 0) (while (< i 5) (= acc (+ acc i)) (= i (+ i 1))) acc)")
        .unwrap();
    assert_eq!(write_to_string(&c, v, false), "10");
}

#[test]
fn scenario_5_rest_parameters() {
    let mut c = ctx();
    let v = c.eval_source("((fn (x . rest) rest) 1 2 3)").unwrap();
    assert_eq!(write_to_string(&c, v, false), "(2 3)");
}

#[test]
fn scenario_6_freelist_reclaimed_after_loop() {
    let mut c = ctx();
    c.eval_source("(= i 0)").unwrap();
    c.eval_source("(while (< i 2000) (cons i i) (= i (+ i 1)))")
        .unwrap();
    let v = c.eval_source("(+ 1 2)").unwrap();
    assert_eq!(write_to_string(&c, v, false), "3");
}

// --- evaluator error paths ---------------------------------------------

#[test]
fn calling_non_callable_errors() {
    let mut c = ctx();
    let err = c.eval_source("(1 2 3)").unwrap_err();
    assert_eq!(err, FeError::NotCallable);
}

#[test]
fn too_few_arguments_errors() {
    let mut c = ctx();
    let err = c.eval_source("(cons 1)").unwrap_err();
    assert_eq!(err, FeError::TooFewArguments);
}

#[test]
fn arithmetic_on_non_number_is_a_type_error() {
    let mut c = ctx();
    let err = c.eval_source("(+ 1 (quote foo))").unwrap_err();
    assert!(matches!(err, FeError::TypeMismatch { .. }));
}

#[test]
fn and_or_short_circuit() {
    let mut c = ctx();
    assert_eq!(write_to_string(&c, c.eval_source("(and)").unwrap(), false), "nil");
    let v = c.eval_source("(and 1 2 3)").unwrap();
    assert_eq!(write_to_string(&c, v, false), "3");
    let v = c.eval_source("(and 1 nil 3)").unwrap();
    assert_eq!(write_to_string(&c, v, false), "nil");

    let v = c.eval_source("(or nil nil 5)").unwrap();
    assert_eq!(write_to_string(&c, v, false), "5");
    let v = c.eval_source("(or nil nil)").unwrap();
    assert_eq!(write_to_string(&c, v, false), "nil");
}

#[test]
fn if_with_trailing_else_form() {
    let mut c = ctx();
    let v = c.eval_source("(if nil 1 nil 2 3)").unwrap();
    assert_eq!(write_to_string(&c, v, false), "3");
}

#[test]
fn if_with_failing_condition_and_no_else_returns_nil() {
    let mut c = ctx();
    let v = c.eval_source("(if nil 1)").unwrap();
    assert!(v.is_nil());
}

// --- GC root-stack & ptr hooks ------------------------------------------

#[test]
fn gc_stack_overflow_is_reported() {
    let mut c = ctx();
    let v = Value::Nil;
    let mut failed = false;
    for _ in 0..1000 {
        if c.push_root(v).is_err() {
            failed = true;
            break;
        }
    }
    assert!(failed, "pushing unboundedly many roots must eventually overflow");
}

#[test]
fn ptr_cells_survive_a_collection_while_rooted() {
    let mut c = ctx();
    let mut payload = 5i32;
    let p = c.ptr(&mut payload as *mut i32 as *mut ()).unwrap();
    let depth = c.save_roots();
    c.push_root(p).unwrap();
    c.collect_garbage();
    assert_eq!(c.type_of(p), Kind::Ptr);
    c.restore_roots(depth);
}

#[test]
fn finalize_hook_runs_once_a_ptr_cell_is_unreachable() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static FINALIZED: AtomicUsize = AtomicUsize::new(0);

    fn finalize(_ctx: &mut Context, _p: *mut ()) {
        FINALIZED.fetch_add(1, Ordering::SeqCst);
    }

    let mut c = ctx();
    c.handlers.finalize = Some(finalize);
    let depth = c.save_roots();
    {
        let mut payload = 1i32;
        c.ptr(&mut payload as *mut i32 as *mut ()).unwrap();
    }
    // `ptr` leaves its cell rooted only transiently on the GC stack by
    // `allocate`; dropping that root before collecting makes the cell
    // unreachable.
    c.restore_roots(depth);
    c.collect_garbage();
    assert_eq!(FINALIZED.load(Ordering::SeqCst), 1);
}

// --- symbol/global binding semantics -------------------------------------

#[test]
fn set_mutates_global_binding_cell() {
    let mut c = ctx();
    let sym = c.intern("g").unwrap();
    let v = c.number(1.0).unwrap();
    c.set(sym, v).unwrap();
    let result = c.eval_source("g").unwrap();
    assert_eq!(result, v);
}

#[test]
fn symbol_cell_shape_matches_spec() {
    let mut c = ctx();
    let sym = c.intern("zzz").unwrap();
    assert_eq!(c.type_of(sym), Kind::Symbol);
    let binding = c.symbol_binding_pair(sym);
    let name = c.car(binding).unwrap();
    assert_eq!(write_to_string(&c, name, false), "zzz");
}

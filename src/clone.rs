//! Variable renaming and structural ordering (§3.3, §4.2, §4.3).
//!
//! `clone_term` and `clone_clause` give every *unbound* variable a
//! fresh identity while leaving bound substructure shared (cheap, and
//! safe since bound substructure is immutable from here on). Renaming
//! state lives in a local map keyed on the source variable's identity
//! (its `Rc` pointer), built up and dropped with the clone pass, so the
//! source clause is left untouched for the next renaming (§4.3).

use crate::context::Context;
use crate::term::{dereference, FunctorData, ListData, Term, TermRef};
use std::collections::HashMap;
use std::rc::Rc;

/// Deep-copy `t`, giving each distinct unbound variable reachable from
/// it a fresh variable. Bound (ground or partially ground) substructure
/// is returned as-is rather than copied.
pub fn clone_term(ctx: &Context, t: &TermRef) -> TermRef {
    let mut renames = HashMap::new();
    clone_with(ctx, t, &mut renames)
}

/// Rename a clause's head and body together so that a source variable
/// occurring in both maps to the *same* fresh variable (§4.3). Pass
/// `None` for `body` when cloning a fact.
pub fn clone_clause(ctx: &Context, head: &TermRef, body: Option<&TermRef>) -> (TermRef, Option<TermRef>) {
    let mut renames = HashMap::new();
    let new_head = clone_with(ctx, head, &mut renames);
    let new_body = body.map(|b| clone_with(ctx, b, &mut renames));
    (new_head, new_body)
}

fn clone_with(ctx: &Context, t: &TermRef, renames: &mut HashMap<*const (), TermRef>) -> TermRef {
    // Variables and member variables are not dereferenced here: an
    // *unbound* source variable must be recognized and renamed, which
    // calling `dereference` would short-circuit into a no-op lookup
    // only for already-bound ones. We inspect `t` directly and recurse
    // into bound cases below.
    match t.as_ref() {
        Term::Var(v) => {
            if let Some(bound) = v.value.borrow().clone() {
                return clone_with(ctx, &bound, renames);
            }
            let key = Rc::as_ptr(v) as *const ();
            renames
                .entry(key)
                .or_insert_with(|| ctx.arena.create_var(v.name.clone()))
                .clone()
        }
        Term::MemberVar(mv) => {
            // Member variables are owned by an object's dictionary and
            // are never clause-local, so they are shared, not renamed.
            let d = dereference(ctx, t);
            if matches!(d.as_ref(), Term::MemberVar(_)) {
                d
            } else {
                clone_with(ctx, &d, renames)
            }
        }
        Term::Functor(f) => {
            let args = f.args().iter().map(|a| clone_with(ctx, a, renames)).collect();
            Rc::new(Term::Functor(FunctorData::new(f.name.clone(), args)))
        }
        Term::List(l) => {
            let head = clone_with(ctx, &l.head, renames);
            let tail = clone_with(ctx, &l.tail, renames);
            Rc::new(Term::List(ListData { head, tail }))
        }
        Term::Atom(_) | Term::Integer(_) | Term::Real(_) | Term::Str(_) | Term::Object(_) => t.clone(),
    }
}

fn strcmp(a: &[u8], b: &[u8]) -> i32 {
    match a.cmp(b) {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    }
}

fn ptr_order(a: usize, b: usize) -> i32 {
    if a < b {
        -1
    } else if a > b {
        1
    } else {
        0
    }
}

/// Standard order of terms rank, low to high: variables, then reals,
/// integers, strings, atoms, compounds (functors and lists together),
/// objects (§4.2's structural ordering, mirroring the reference
/// engine's `precedes_ordering` table).
fn group(t: &Term) -> u8 {
    match t {
        Term::Var(_) | Term::MemberVar(_) => 1,
        Term::Real(_) => 2,
        Term::Integer(_) => 3,
        Term::Str(_) => 4,
        Term::Atom(_) => 5,
        Term::Functor(_) | Term::List(_) => 6,
        Term::Object(_) => 7,
    }
}

/// `-1`, `0`, or `1` according to whether `a` precedes, is identical
/// to, or follows `b` in the engine's standard order of terms (§4.2,
/// §8.8: `precedes(a, b) == -precedes(b, a)` and `precedes(a, a) == 0`).
///
/// Reals compare with `f64::total_cmp` rather than the reference
/// engine's raw `<`/`>`, which treats NaN as equal to anything it's
/// measured against; a total order is the only one that keeps this
/// function's own antisymmetry invariant true when NaN is involved.
pub fn precedes(ctx: &Context, a: &TermRef, b: &TermRef) -> i32 {
    let da = dereference(ctx, a);
    let db = dereference(ctx, b);
    if same_term(&da, &db) {
        return 0;
    }
    let (ga, gb) = (group(&da), group(&db));
    if ga != gb {
        return if ga < gb { -1 } else { 1 };
    }
    if ga == 1 || ga == 7 {
        return ptr_order(term_ptr(&da), term_ptr(&db));
    }
    match (da.as_ref(), db.as_ref()) {
        (Term::Real(x), Term::Real(y)) => match x.total_cmp(y) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        },
        (Term::Integer(x), Term::Integer(y)) => match x.cmp(y) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        },
        (Term::Str(x), Term::Str(y)) => strcmp(x, y),
        (Term::Atom(x), Term::Atom(y)) => strcmp(x.name(), y.name()),
        (Term::Functor(_), _) | (Term::List(_), _) => precedes_compound(ctx, &da, &db),
        _ => 0,
    }
}

fn same_term(a: &TermRef, b: &TermRef) -> bool {
    match (a.as_ref(), b.as_ref()) {
        (Term::Var(x), Term::Var(y)) => Rc::ptr_eq(x, y),
        (Term::Object(x), Term::Object(y)) => Rc::ptr_eq(x, y),
        _ => Rc::ptr_eq(a, b),
    }
}

fn term_ptr(t: &TermRef) -> usize {
    Rc::as_ptr(t) as *const () as usize
}

fn compound_name_size(t: &Term) -> (usize, Vec<u8>) {
    match t {
        Term::Functor(f) => (f.arity(), f.name.name().to_vec()),
        Term::List(_) => (2, b".".to_vec()),
        _ => unreachable!("compound_name_size called on a non-compound term"),
    }
}

fn precedes_compound(ctx: &Context, da: &TermRef, db: &TermRef) -> i32 {
    let (size_a, name_a) = compound_name_size(da);
    let (size_b, name_b) = compound_name_size(db);
    if size_a != size_b {
        return if size_a < size_b { -1 } else { 1 };
    }
    let c = strcmp(&name_a, &name_b);
    if c != 0 {
        return c;
    }
    match (da.as_ref(), db.as_ref()) {
        (Term::Functor(fa), Term::Functor(fb)) => {
            for i in 0..fa.arity() {
                let c = precedes(ctx, &fa.arg(i), &fb.arg(i));
                if c != 0 {
                    return c;
                }
            }
            0
        }
        (Term::List(_), Term::List(_)) => {
            let mut ca = da.clone();
            let mut cb = db.clone();
            loop {
                let la = match ca.as_ref() {
                    Term::List(l) => l,
                    _ => return precedes(ctx, &ca, &cb),
                };
                let lb = match cb.as_ref() {
                    Term::List(l) => l,
                    _ => return precedes(ctx, &ca, &cb),
                };
                let c = precedes(ctx, &la.head, &lb.head);
                if c != 0 {
                    return c;
                }
                ca = dereference(ctx, &la.tail);
                cb = dereference(ctx, &lb.tail);
            }
        }
        _ => 0,
    }
}

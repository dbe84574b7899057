//! Unification (§3.4, §4.2). `unify` is the single place that writes
//! through the trail, so every caller gets the rollback-on-failure
//! invariant (§8.4) for free: the function marks the trail on entry
//! and rolls back to that mark itself before returning `false`.

use crate::context::Context;
use crate::term::{dereference, Term, TermRef};
use std::rc::Rc;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum UnifyMode {
    /// Ordinary unification: bind unbound variables either way.
    Default,
    /// Skip the occurs check that `Default` mode otherwise performs —
    /// for callers that can assert the bound variable is fresh and
    /// want to avoid the scan (e.g. clause cloning, where the fresh
    /// variable cannot possibly occur in the value it's bound to).
    NoOccursCheck,
    /// Bind variables but do not record the bindings on the trail —
    /// used by callers that roll back the whole trail segment
    /// unconditionally afterward (e.g. `\+/1`) and want to skip the
    /// bookkeeping.
    NoRecord,
    /// Bind variables on either side as `Default` would, but only put
    /// the left-hand side's bindings on the trail; a right-hand
    /// variable that gets bound stays bound past any later backtrack to
    /// a mark taken before this call (§4.2's `record-one-way` flag).
    RecordOneWay,
    /// Only the left-hand side's variables may be bound; a variable on
    /// the right-hand side is treated as a fixed pattern rather than
    /// something this call may bind (§4.2's `one-way` flag).
    OneWay,
    /// Structural equality only — variables never bind, two terms
    /// unify only if already identical (`==/2`).
    EqualityOnly,
}

#[derive(Clone, Copy)]
pub struct UnifyFlags {
    pub mode: UnifyMode,
}

impl Default for UnifyFlags {
    fn default() -> Self {
        UnifyFlags {
            mode: UnifyMode::Default,
        }
    }
}

impl UnifyFlags {
    pub fn equality_only() -> Self {
        UnifyFlags {
            mode: UnifyMode::EqualityOnly,
        }
    }
    pub fn no_record() -> Self {
        UnifyFlags {
            mode: UnifyMode::NoRecord,
        }
    }
    pub fn one_way() -> Self {
        UnifyFlags {
            mode: UnifyMode::OneWay,
        }
    }
    pub fn record_one_way() -> Self {
        UnifyFlags {
            mode: UnifyMode::RecordOneWay,
        }
    }
}

/// Depth-first scan for whether `var` is reachable from `t` (§4.2).
/// Lists are walked iteratively along the tail so a long list doesn't
/// cost stack depth; objects are scanned across every own property,
/// matching the source's "all extension blocks" sweep (this port has
/// no separate extension-block concept, so the property map stands in
/// for the whole set).
fn occurs(ctx: &Context, var: &Rc<crate::term::VarData>, t: &TermRef) -> bool {
    let d = dereference(ctx, t);
    match d.as_ref() {
        Term::Var(v) => Rc::ptr_eq(v, var),
        Term::Functor(f) => f.args().iter().any(|a| occurs(ctx, var, a)),
        Term::List(_) => {
            let mut cur = d;
            loop {
                match cur.as_ref() {
                    Term::List(l) => {
                        if occurs(ctx, var, &l.head) {
                            return true;
                        }
                        cur = dereference(ctx, &l.tail);
                    }
                    Term::Var(v) => return Rc::ptr_eq(v, var),
                    _ => return false,
                }
            }
        }
        Term::Object(o) => o
            .properties
            .borrow()
            .values()
            .any(|cell| occurs(ctx, var, &cell.borrow())),
        _ => false,
    }
}

fn bind_var(ctx: &Context, var: &Rc<crate::term::VarData>, value: TermRef, flags: UnifyFlags, record: bool) -> bool {
    if flags.mode == UnifyMode::Default && occurs(ctx, var, &value) {
        return false;
    }
    *var.value.borrow_mut() = Some(value);
    if record {
        ctx.trail.push_unbind(var.clone());
    }
    true
}

fn bind_member(
    ctx: &Context,
    cell: &Rc<std::cell::RefCell<TermRef>>,
    value: TermRef,
    record: bool,
) {
    let previous = cell.borrow().clone();
    *cell.borrow_mut() = value;
    if record {
        ctx.trail.push_restore(cell.clone(), previous);
    }
}

/// Whether a binding made to the left-hand operand's slot should be
/// recorded on the trail under `flags` — true for every mode except
/// `NoRecord`.
fn records_lhs(flags: UnifyFlags) -> bool {
    flags.mode != UnifyMode::NoRecord
}

/// Whether a binding made to the right-hand operand's slot should be
/// recorded — like `records_lhs`, but `RecordOneWay` additionally
/// leaves the right-hand side unrecorded (§4.2).
fn records_rhs(flags: UnifyFlags) -> bool {
    flags.mode != UnifyMode::NoRecord && flags.mode != UnifyMode::RecordOneWay
}

/// Dereference `t`; if it is an unbound `Variable` or `MemberVariable`,
/// also return a binder closure that writes `value` into that exact
/// slot. Used so the main unify loop doesn't need to match on the
/// variable kind twice.
enum Slot {
    Var(Rc<crate::term::VarData>),
    Member(Rc<std::cell::RefCell<TermRef>>),
    Bound(TermRef),
}

fn slot_of(ctx: &Context, t: &TermRef) -> Slot {
    // `dereference` already performs member-variable resolution — chasing
    // the owner (including through the global-objects table and the
    // prototype chain) and auto-creating a fresh property when the
    // variable's `auto_create` flag is set — down to a non-variable, an
    // unbound variable, or (property genuinely absent, not
    // auto-creating) an unresolved member-variable term. In the latter
    // case there is no writable cell to hand back, so it unifies as an
    // opaque bound term (matching nothing, per `unify_bound`'s default).
    let d = dereference(ctx, t);
    match d.as_ref() {
        Term::Var(v) => Slot::Var(v.clone()),
        Term::MemberVar(mv) => {
            let owner = dereference(ctx, &mv.object);
            let od = match owner.as_ref() {
                Term::Object(od) => Some(od.clone()),
                Term::Atom(name) => ctx.global_object(name).and_then(|o| match o.as_ref() {
                    Term::Object(od) => Some(od.clone()),
                    _ => None,
                }),
                _ => None,
            };
            match od.and_then(|od| od.own_property(&mv.name)) {
                Some(cell) => Slot::Member(cell),
                None => Slot::Bound(d),
            }
        }
        _ => Slot::Bound(d),
    }
}

/// Attempt to unify `a` and `b` under `flags`, returning whether it
/// succeeded. On failure the trail is exactly as it was on entry.
pub fn unify(ctx: &Context, a: &TermRef, b: &TermRef, flags: UnifyFlags) -> bool {
    let mark = ctx.trail.mark();
    if unify_inner(ctx, a, b, flags) {
        true
    } else {
        ctx.trail.backtrack(mark);
        false
    }
}

fn unify_inner(ctx: &Context, a: &TermRef, b: &TermRef, flags: UnifyFlags) -> bool {
    let sa = slot_of(ctx, a);
    let sb = slot_of(ctx, b);

    match (sa, sb) {
        (Slot::Var(va), Slot::Var(vb)) if Rc::ptr_eq(&va, &vb) => true,
        (Slot::Var(va), sb) => {
            if flags.mode == UnifyMode::EqualityOnly {
                return false;
            }
            let value = match sb {
                Slot::Var(vb) => Rc::new(Term::Var(vb)),
                Slot::Member(cell) => cell.borrow().clone(),
                Slot::Bound(t) => t,
            };
            bind_var(ctx, &va, value, flags, records_lhs(flags))
        }
        (sa, Slot::Var(vb)) => {
            if flags.mode == UnifyMode::EqualityOnly || flags.mode == UnifyMode::OneWay {
                return false;
            }
            let value = match sa {
                Slot::Var(va) => Rc::new(Term::Var(va)),
                Slot::Member(cell) => cell.borrow().clone(),
                Slot::Bound(t) => t,
            };
            bind_var(ctx, &vb, value, flags, records_rhs(flags))
        }
        (Slot::Member(ca), sb) => {
            if flags.mode == UnifyMode::EqualityOnly {
                return false;
            }
            let value = match sb {
                Slot::Var(vb) => Rc::new(Term::Var(vb)),
                Slot::Member(cb) => cb.borrow().clone(),
                Slot::Bound(t) => t,
            };
            bind_member(ctx, &ca, value, records_lhs(flags));
            true
        }
        (sa, Slot::Member(cb)) => {
            if flags.mode == UnifyMode::EqualityOnly || flags.mode == UnifyMode::OneWay {
                return false;
            }
            let value = match sa {
                Slot::Var(va) => Rc::new(Term::Var(va)),
                Slot::Member(ca) => ca.borrow().clone(),
                Slot::Bound(t) => t,
            };
            bind_member(ctx, &cb, value, records_rhs(flags));
            true
        }
        (Slot::Bound(ta), Slot::Bound(tb)) => unify_bound(ctx, &ta, &tb, flags),
    }
}

fn unify_bound(ctx: &Context, ta: &TermRef, tb: &TermRef, flags: UnifyFlags) -> bool {
    match (ta.as_ref(), tb.as_ref()) {
        (Term::Atom(x), Term::Atom(y)) => x == y,
        (Term::Integer(x), Term::Integer(y)) => x == y,
        (Term::Real(x), Term::Real(y)) => x == y,
        (Term::Str(x), Term::Str(y)) => x == y,
        (Term::Object(x), Term::Object(y)) => Rc::ptr_eq(x, y),
        (Term::Functor(fa), Term::Functor(fb)) => {
            if fa.name != fb.name || fa.arity() != fb.arity() {
                return false;
            }
            for i in 0..fa.arity() {
                if !unify_inner(ctx, &fa.arg(i), &fb.arg(i), flags) {
                    return false;
                }
            }
            true
        }
        (Term::List(la), Term::List(lb)) => {
            unify_inner(ctx, &la.head, &lb.head, flags) && unify_inner(ctx, &la.tail, &lb.tail, flags)
        }
        _ => false,
    }
}

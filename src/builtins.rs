//! Deterministic builtins (§6.3): ordinary `(context, args) -> outcome`
//! dispatchers with no access to the executor's choice/cut/catch
//! machinery. Control constructs that need that machinery — cut,
//! disjunction, if-then-else, catch/throw's frame handling, call/once,
//! negation — are special-cased directly in `executor.rs` instead of
//! living here.

use crate::atom::Atom;
use crate::clone::{clone_term, precedes};
use crate::context::Context;
use crate::database::{Builtin, ClassInfo};
use crate::error::{self, EngineError};
use crate::executor::{call_once, BuiltinOutcome, Solved};
use crate::term::{dereference, is_ground, Term, TermRef};
use crate::unify::{unify, UnifyFlags};

fn bool_outcome(b: bool) -> BuiltinOutcome {
    if b {
        BuiltinOutcome::True
    } else {
        BuiltinOutcome::Fail
    }
}

/// Register every builtin this module provides into `ctx`'s database
/// (called once from `Context::new`, mirroring the way the teacher's
/// `register_clara_evaluate` wires a callback into its engine at
/// startup).
pub fn install(ctx: &Context) {
    let reg = |name: &[u8], arity: usize, f: Builtin| {
        ctx.database.register_builtin(ctx.arena.intern(name), arity, f);
    };

    reg(b"true", 0, bi_true);
    reg(b"fail", 0, bi_fail);
    reg(b"false", 0, bi_fail);
    reg(b"=", 2, bi_unify);
    reg(b"\\=", 2, bi_not_unifiable);
    reg(b"==", 2, bi_equal);
    reg(b"\\==", 2, bi_not_equal);
    reg(b"@<", 2, bi_lt);
    reg(b"@>", 2, bi_gt);
    reg(b"@=<", 2, bi_le);
    reg(b"@>=", 2, bi_ge);
    reg(b"compare", 3, bi_compare);
    reg(b"var", 1, bi_var);
    reg(b"nonvar", 1, bi_nonvar);
    reg(b"atom", 1, bi_atom);
    reg(b"number", 1, bi_number);
    reg(b"integer", 1, bi_integer);
    reg(b"float", 1, bi_float);
    reg(b"atomic", 1, bi_atomic);
    reg(b"compound", 1, bi_compound);
    reg(b"callable", 1, bi_callable);
    reg(b"is_list", 1, bi_is_list);
    reg(b"ground", 1, bi_ground);
    reg(b"functor", 3, bi_functor);
    reg(b"arg", 3, bi_arg);
    reg(b"=..", 2, bi_univ);
    reg(b"copy_term", 2, bi_copy_term);
    reg(b"fuzzy", 1, bi_fuzzy);
    reg(b"set_fuzzy", 1, bi_set_fuzzy);
    reg(b"asserta", 1, bi_asserta);
    reg(b"assertz", 1, bi_assertz);
    reg(b"assert", 1, bi_assertz);
    reg(b"retract", 1, bi_retract);
    reg(b"abolish", 1, bi_abolish);
    reg(b"halt", 0, bi_halt0);
    reg(b"halt", 1, bi_halt1);
    reg(b"new_object", 2, bi_new_object);
    reg(b"new_class", 2, bi_new_class);

    reg(b"throw", 1, bi_throw);
    reg(b"\\+", 1, bi_naf);
    reg(b"not", 1, bi_naf);
    reg(b"call", 1, bi_call);
    reg(b"once", 1, bi_once);
    reg(b"$if", 3, bi_dollar_if);
    reg(b"$while", 2, bi_dollar_while);
    reg(b"$do", 2, bi_dollar_do);
    reg(b"$for", 4, bi_dollar_for);
    reg(b"$switch", 2, bi_dollar_switch);
}

/// Fold a sub-call's result into the outcome a builtin returns to the
/// executor (§4.6): a solved sub-goal succeeds the builtin, a failed
/// one fails it, `halt` propagates as-is, and an unhandled thrown
/// error becomes the builtin's own error result instead of unwinding
/// through a Rust `Result` the executor's dispatch loop never sees.
fn outcome_of(result: Result<Solved, EngineError>) -> BuiltinOutcome {
    match result {
        Ok(Solved::True) => BuiltinOutcome::True,
        Ok(Solved::Fail) => BuiltinOutcome::Fail,
        Ok(Solved::Halt(n)) => BuiltinOutcome::Halt(n),
        Err(EngineError::Thrown(t)) => BuiltinOutcome::Error(t),
        Err(_) => BuiltinOutcome::Fail,
    }
}

/// `throw(Ball)` (§4.8): raise `Ball` (cloned so later backtracking
/// past the throw site can't retract the culprit from under a
/// `catch/3` that hasn't matched it yet) as an error outcome, which
/// the executor's catch-chain walk then handles exactly like a
/// builtin-raised ISO error.
fn bi_throw(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    let ball = dereference(ctx, &args[0]);
    if matches!(ball.as_ref(), Term::Var(_)) {
        return BuiltinOutcome::Error(error::instantiation_error(ctx, "throw", 1));
    }
    BuiltinOutcome::Error(clone_term(ctx, &ball))
}

/// `\+ Goal` (§4.6): succeed iff `Goal` has no solution, undoing any
/// bindings the attempt made either way.
fn bi_naf(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    let mark = ctx.trail.mark();
    let result = call_once(ctx, &args[0]);
    ctx.trail.backtrack(mark);
    match result {
        Ok(Solved::True) => BuiltinOutcome::Fail,
        Ok(Solved::Fail) => BuiltinOutcome::True,
        other => outcome_of(other),
    }
}

/// `call(Goal)` (§4.6): run `Goal` with cut local to the call.
fn bi_call(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    outcome_of(call_once(ctx, &args[0]))
}

/// `once(Goal)` (§4.6): commit to `Goal`'s first solution, discarding
/// any further choice points it left (`call_once` already does this by
/// construction, since it never exposes its inner executor).
fn bi_once(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    outcome_of(call_once(ctx, &args[0]))
}

/// `$if(Cond, Then, Else)` — the desugared form of a surface-syntax
/// `if (...) { ... } else { ... }` statement (§2, REDESIGN FLAGS):
/// evaluate as an ordinary once-committed if-then-else rather than a
/// bespoke executor node, since none of the three arguments need to
/// leave a choice point behind for the statement as a whole.
fn bi_dollar_if(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    match call_once(ctx, &args[0]) {
        Ok(Solved::True) => outcome_of(call_once(ctx, &args[1])),
        Ok(Solved::Fail) => outcome_of(call_once(ctx, &args[2])),
        other => outcome_of(other),
    }
}

/// `$while(Cond, Body)` — desugared `while (...) { ... }`: repeat
/// `Body` once per time `Cond` succeeds, stopping (without failing the
/// whole construct) the first time `Cond` fails. Each iteration is run
/// via `call_once`, so a loop body does not accumulate choice points
/// across iterations (documented simplification: an iteration cannot
/// be backtracked into to try its own later solutions, only re-run
/// from the top on the next pass of `Cond`).
fn bi_dollar_while(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    loop {
        match call_once(ctx, &args[0]) {
            Ok(Solved::True) => {}
            Ok(Solved::Fail) => return BuiltinOutcome::True,
            other => return outcome_of(other),
        }
        match call_once(ctx, &args[1]) {
            Ok(Solved::True) => continue,
            other => return outcome_of(other),
        }
    }
}

/// `$do(Body, Cond)` — desugared `do { ... } while (...)`: like
/// `$while/2` but `Body` always runs at least once before `Cond` is
/// tested.
fn bi_dollar_do(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    loop {
        match call_once(ctx, &args[0]) {
            Ok(Solved::True) => {}
            other => return outcome_of(other),
        }
        match call_once(ctx, &args[1]) {
            Ok(Solved::True) => continue,
            Ok(Solved::Fail) => return BuiltinOutcome::True,
            other => return outcome_of(other),
        }
    }
}

/// `$for(Init, Cond, Step, Body)` — desugared C-style `for (...)`: run
/// `Init` once, then behave like `$while(Cond, (Body, Step))`.
fn bi_dollar_for(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    match call_once(ctx, &args[0]) {
        Ok(Solved::True) => {}
        other => return outcome_of(other),
    }
    loop {
        match call_once(ctx, &args[1]) {
            Ok(Solved::True) => {}
            Ok(Solved::Fail) => return BuiltinOutcome::True,
            other => return outcome_of(other),
        }
        match call_once(ctx, &args[3]) {
            Ok(Solved::True) => {}
            other => return outcome_of(other),
        }
        match call_once(ctx, &args[2]) {
            Ok(Solved::True) => continue,
            other => return outcome_of(other),
        }
    }
}

/// `$switch(Subject, Cases)` — desugared C-style `switch`: `Cases` is
/// a proper list of `Pattern-Goal` pairs, tried in order (§2 "first
/// matching case wins, no fallthrough"), plus an optional trailing
/// `default-Goal` entry whose `Pattern` is the atom `default`. Pattern
/// matching is unification, not equality, so a case may bind
/// variables in `Subject` rather than only testing it.
fn bi_dollar_switch(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    let subject = args[0].clone();
    let mut cur = dereference(ctx, &args[1]);
    loop {
        let entry = match cur.as_ref() {
            Term::List(l) => {
                let entry = l.head.clone();
                cur = dereference(ctx, &l.tail);
                entry
            }
            Term::Atom(a) if a == &ctx.atoms.nil => return BuiltinOutcome::Fail,
            _ => return BuiltinOutcome::Error(error::type_error(ctx, "list", &cur, "$switch", 2)),
        };
        let entry = dereference(ctx, &entry);
        let pair = match entry.as_functor() {
            Some(f) if f.name.name() == b"-" && f.arity() == 2 => f,
            _ => return BuiltinOutcome::Error(error::type_error(ctx, "pair", &entry, "$switch", 2)),
        };
        let pattern = pair.arg(0);
        let goal = pair.arg(1);
        let is_default = matches!(dereference(ctx, &pattern).as_atom(), Some(a) if a.name() == b"default");
        let mark = ctx.trail.mark();
        if is_default || unify(ctx, &subject, &pattern, UnifyFlags::default()) {
            return outcome_of(call_once(ctx, &goal));
        }
        ctx.trail.backtrack(mark);
    }
}

/// `true/0` (§4.4 "Control builtins"): the constant that always
/// succeeds.
fn bi_true(_ctx: &Context, _args: &[TermRef]) -> BuiltinOutcome {
    BuiltinOutcome::True
}

/// `fail/0` (and its `false/0` synonym): the constant that always
/// fails.
fn bi_fail(_ctx: &Context, _args: &[TermRef]) -> BuiltinOutcome {
    BuiltinOutcome::Fail
}

fn bi_unify(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    bool_outcome(unify(ctx, &args[0], &args[1], UnifyFlags::default()))
}

fn bi_not_unifiable(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    let mark = ctx.trail.mark();
    let ok = unify(ctx, &args[0], &args[1], UnifyFlags::default());
    ctx.trail.backtrack(mark);
    bool_outcome(!ok)
}

fn bi_equal(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    bool_outcome(unify(ctx, &args[0], &args[1], UnifyFlags::equality_only()))
}

fn bi_not_equal(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    bool_outcome(!unify(ctx, &args[0], &args[1], UnifyFlags::equality_only()))
}

fn bi_lt(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    bool_outcome(precedes(ctx, &args[0], &args[1]) < 0)
}
fn bi_gt(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    bool_outcome(precedes(ctx, &args[0], &args[1]) > 0)
}
fn bi_le(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    bool_outcome(precedes(ctx, &args[0], &args[1]) <= 0)
}
fn bi_ge(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    bool_outcome(precedes(ctx, &args[0], &args[1]) >= 0)
}

fn bi_compare(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    let order = precedes(ctx, &args[1], &args[2]);
    let sym: &[u8] = if order < 0 {
        b"<"
    } else if order > 0 {
        b">"
    } else {
        b"="
    };
    let atom = ctx.arena.create_atom_term(sym);
    bool_outcome(unify(ctx, &args[0], &atom, UnifyFlags::default()))
}

fn bi_var(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    bool_outcome(matches!(dereference(ctx, &args[0]).as_ref(), Term::Var(_)))
}
fn bi_nonvar(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    bool_outcome(!matches!(dereference(ctx, &args[0]).as_ref(), Term::Var(_)))
}
fn bi_atom(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    bool_outcome(matches!(dereference(ctx, &args[0]).as_ref(), Term::Atom(_)))
}
fn bi_number(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    bool_outcome(matches!(
        dereference(ctx, &args[0]).as_ref(),
        Term::Integer(_) | Term::Real(_)
    ))
}
fn bi_integer(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    bool_outcome(matches!(dereference(ctx, &args[0]).as_ref(), Term::Integer(_)))
}
fn bi_float(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    bool_outcome(matches!(dereference(ctx, &args[0]).as_ref(), Term::Real(_)))
}
fn bi_atomic(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    bool_outcome(matches!(
        dereference(ctx, &args[0]).as_ref(),
        Term::Atom(_) | Term::Integer(_) | Term::Real(_) | Term::Str(_)
    ))
}
fn bi_compound(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    bool_outcome(matches!(
        dereference(ctx, &args[0]).as_ref(),
        Term::Functor(_) | Term::List(_)
    ))
}
fn bi_callable(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    bool_outcome(matches!(
        dereference(ctx, &args[0]).as_ref(),
        Term::Atom(_) | Term::Functor(_)
    ))
}
fn bi_is_list(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    let mut cur = dereference(ctx, &args[0]);
    loop {
        match cur.as_ref() {
            Term::List(l) => cur = dereference(ctx, &l.tail),
            Term::Atom(a) if a == &ctx.atoms.nil => return BuiltinOutcome::True,
            _ => return BuiltinOutcome::Fail,
        }
    }
}
fn bi_ground(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    bool_outcome(is_ground(ctx, &args[0]))
}

fn bi_functor(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    let t = dereference(ctx, &args[0]);
    if !matches!(t.as_ref(), Term::Var(_)) {
        let (name, arity): (TermRef, i64) = match t.as_ref() {
            Term::Functor(f) => (ctx.arena.atom_term(f.name.clone()), f.arity() as i64),
            Term::List(_) => (ctx.arena.atom_term(ctx.atoms.dot.clone()), 2),
            Term::Atom(a) => (ctx.arena.atom_term(a.clone()), 0),
            other => (std::rc::Rc::new(clone_value(other)), 0),
        };
        let name_ok = unify(ctx, &args[1], &name, UnifyFlags::default());
        let arity_term = ctx.arena.create_integer(arity);
        return bool_outcome(name_ok && unify(ctx, &args[2], &arity_term, UnifyFlags::default()));
    }
    let name = dereference(ctx, &args[1]);
    let arity = dereference(ctx, &args[2]);
    let arity = match arity.as_integer() {
        Some(n) if n >= 0 => n as usize,
        _ => return BuiltinOutcome::Error(error::type_error(ctx, "integer", &arity, "functor", 3)),
    };
    if arity == 0 {
        return bool_outcome(unify(ctx, &args[0], &name, UnifyFlags::default()));
    }
    let name_atom = match name.as_atom() {
        Some(a) => a.clone(),
        None => return BuiltinOutcome::Error(error::type_error(ctx, "atom", &name, "functor", 3)),
    };
    let new_args: Vec<TermRef> = (0..arity).map(|_| ctx.arena.create_var(None)).collect();
    let built = ctx.arena.create_functor(name_atom, new_args);
    bool_outcome(unify(ctx, &args[0], &built, UnifyFlags::default()))
}

fn clone_value(t: &Term) -> Term {
    match t {
        Term::Integer(i) => Term::Integer(*i),
        Term::Real(r) => Term::Real(*r),
        Term::Str(s) => Term::Str(s.clone()),
        _ => unreachable!("clone_value only called on atomic numeric/string terms"),
    }
}

fn bi_arg(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    let n = dereference(ctx, &args[0]);
    let n = match n.as_integer() {
        Some(n) if n >= 1 => n as usize,
        Some(_) => return BuiltinOutcome::Fail,
        None => return BuiltinOutcome::Error(error::type_error(ctx, "integer", &n, "arg", 3)),
    };
    let t = dereference(ctx, &args[1]);
    let f = match t.as_functor() {
        Some(f) => f,
        None => return BuiltinOutcome::Error(error::type_error(ctx, "compound", &t, "arg", 3)),
    };
    if n > f.arity() {
        return BuiltinOutcome::Fail;
    }
    bool_outcome(unify(ctx, &args[2], &f.arg(n - 1), UnifyFlags::default()))
}

fn bi_univ(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    let t = dereference(ctx, &args[0]);
    if !matches!(t.as_ref(), Term::Var(_)) {
        let items: Vec<TermRef> = match t.as_ref() {
            Term::Functor(f) => {
                let mut v = vec![ctx.arena.atom_term(f.name.clone())];
                v.extend(f.args().iter().cloned());
                v
            }
            Term::Atom(a) => vec![ctx.arena.atom_term(a.clone())],
            _ => vec![t.clone()],
        };
        let list = ctx.arena.list_from(items);
        return bool_outcome(unify(ctx, &args[1], &list, UnifyFlags::default()));
    }
    let mut items = Vec::new();
    let mut cur = dereference(ctx, &args[1]);
    loop {
        match cur.as_ref() {
            Term::List(l) => {
                items.push(l.head.clone());
                cur = dereference(ctx, &l.tail);
            }
            Term::Atom(a) if a == &ctx.atoms.nil => break,
            _ => return BuiltinOutcome::Error(error::instantiation_error(ctx, "=..", 2)),
        }
    }
    if items.is_empty() {
        return BuiltinOutcome::Error(error::domain_error(ctx, "non_empty_list", &args[1], "=..", 2));
    }
    let built = if items.len() == 1 {
        items.into_iter().next().unwrap()
    } else {
        let name = match dereference(ctx, &items[0]).as_atom() {
            Some(a) => a.clone(),
            None => return BuiltinOutcome::Error(error::type_error(ctx, "atom", &items[0], "=..", 2)),
        };
        ctx.arena.create_functor(name, items[1..].to_vec())
    };
    bool_outcome(unify(ctx, &args[0], &built, UnifyFlags::default()))
}

fn bi_copy_term(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    let copy = clone_term(ctx, &args[0]);
    bool_outcome(unify(ctx, &args[1], &copy, UnifyFlags::default()))
}

fn bi_fuzzy(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    let x = dereference(ctx, &args[0]);
    if matches!(x.as_ref(), Term::Var(_)) {
        let cur = ctx.arena.create_real(ctx.fuzzy_confidence());
        return bool_outcome(unify(ctx, &args[0], &cur, UnifyFlags::default()));
    }
    let val = match x.as_ref() {
        Term::Integer(i) => *i as f64,
        Term::Real(r) => *r,
        _ => return BuiltinOutcome::Error(error::type_error(ctx, "number", &x, "fuzzy", 1)),
    };
    if val <= 0.0 {
        return BuiltinOutcome::Fail;
    }
    ctx.narrow_confidence(val);
    BuiltinOutcome::True
}

fn bi_set_fuzzy(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    let x = dereference(ctx, &args[0]);
    let val = match x.as_ref() {
        Term::Integer(i) => *i as f64,
        Term::Real(r) => *r,
        _ => return BuiltinOutcome::Error(error::type_error(ctx, "number", &x, "set_fuzzy", 1)),
    };
    ctx.set_fuzzy_confidence(val);
    BuiltinOutcome::True
}

fn goal_indicator(ctx: &Context, term: &TermRef) -> Option<(Atom, usize)> {
    dereference(ctx, term).goal_indicator()
}

fn split_clause(ctx: &Context, term: &TermRef) -> (TermRef, TermRef) {
    let d = dereference(ctx, term);
    match d.as_ref() {
        Term::Functor(f) if f.name == ctx.atoms.clause && f.arity() == 2 => (f.arg(0), f.arg(1)),
        _ => (d.clone(), ctx.arena.atom_term(ctx.atoms.true_.clone())),
    }
}

fn bi_asserta(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    assert_clause(ctx, &args[0], true)
}
fn bi_assertz(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    assert_clause(ctx, &args[0], false)
}

fn assert_clause(ctx: &Context, term: &TermRef, first: bool) -> BuiltinOutcome {
    let (head, body) = split_clause(ctx, term);
    let (name, arity) = match goal_indicator(ctx, &head) {
        Some(ga) => ga,
        None => return BuiltinOutcome::Error(error::type_error(ctx, "callable", &head, "assertz", 1)),
    };
    if !ctx.database.is_assertable(&name, arity) {
        return BuiltinOutcome::Error(error::permission_error(
            ctx, "modify", "static_procedure", &head, "assertz", 1,
        ));
    }
    let head = clone_term(ctx, &head);
    let body = clone_term(ctx, &body);
    let pred = ctx.database.predicate_for_assert(name, arity);
    if first {
        pred.assert_first(ctx, head, body);
    } else {
        pred.assert_last(ctx, head, body);
    }
    BuiltinOutcome::True
}

fn bi_retract(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    let (head, body) = split_clause(ctx, &args[0]);
    let (name, arity) = match goal_indicator(ctx, &head) {
        Some(ga) => ga,
        None => return BuiltinOutcome::Error(error::type_error(ctx, "callable", &head, "retract", 1)),
    };
    let pred = match ctx.database.predicate(&name, arity) {
        Some(p) => p,
        None => return BuiltinOutcome::Fail,
    };
    for clause in pred.clauses_in_order() {
        let mark = ctx.trail.mark();
        let (chead, cbody) = clone_term_clause(ctx, &clause.head, &clause.body);
        let ok = unify(ctx, &head, &chead, UnifyFlags::default())
            && unify(ctx, &body, &cbody, UnifyFlags::default());
        if ok {
            pred.retract_clause(ctx, &clause);
            return BuiltinOutcome::True;
        }
        ctx.trail.backtrack(mark);
    }
    BuiltinOutcome::Fail
}

fn clone_term_clause(ctx: &Context, head: &TermRef, body: &TermRef) -> (TermRef, TermRef) {
    let (h, b) = crate::clone::clone_clause(ctx, head, Some(body));
    (h, b.unwrap())
}

fn bi_abolish(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    let t = dereference(ctx, &args[0]);
    let f = match t.as_functor() {
        Some(f) if f.name == ctx.atoms.slash && f.arity() == 2 => f,
        _ => return BuiltinOutcome::Error(error::type_error(ctx, "predicate_indicator", &t, "abolish", 1)),
    };
    let name = match dereference(ctx, &f.arg(0)).as_atom() {
        Some(a) => a.clone(),
        None => return BuiltinOutcome::Error(error::type_error(ctx, "atom", &f.arg(0), "abolish", 1)),
    };
    let arity = match dereference(ctx, &f.arg(1)).as_integer() {
        Some(n) if n >= 0 => n as usize,
        _ => return BuiltinOutcome::Error(error::type_error(ctx, "integer", &f.arg(1), "abolish", 1)),
    };
    ctx.database.abolish(ctx, &name, arity);
    BuiltinOutcome::True
}

fn bi_halt0(_ctx: &Context, _args: &[TermRef]) -> BuiltinOutcome {
    BuiltinOutcome::Halt(0)
}

fn bi_halt1(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    let n = dereference(ctx, &args[0]).as_integer().unwrap_or(0);
    // §7 "Fatal paths": negative halt values are clamped to 127.
    let n = if n < 0 { 127 } else { n.min(i32::MAX as i64) as i32 };
    BuiltinOutcome::Halt(n)
}

/// `new_object(Prototype, Obj)` — instantiate an object whose
/// `prototype` is `Prototype` (an atom naming a class object, or
/// `none`) (§4.1).
fn bi_new_object(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    let proto_term = dereference(ctx, &args[0]);
    let proto = match proto_term.as_ref() {
        Term::Atom(a) if a == &ctx.atoms.nil => None,
        Term::Atom(a) => match ctx.global_object(a) {
            Some(o) => Some(o),
            None => return BuiltinOutcome::Error(error::existence_error(ctx, "object", &proto_term, "new_object", 2)),
        },
        Term::Object(_) => Some(proto_term.clone()),
        _ => return BuiltinOutcome::Error(error::type_error(ctx, "object", &proto_term, "new_object", 2)),
    };
    let obj = ctx.arena.create_object(proto, None);
    bool_outcome(unify(ctx, &args[1], &obj, UnifyFlags::default()))
}

/// `new_class(ClassName, Obj)` — bind a fresh class object under
/// `ClassName` in the global objects table (§3.1, §4.1).
fn bi_new_class(ctx: &Context, args: &[TermRef]) -> BuiltinOutcome {
    let name_term = dereference(ctx, &args[0]);
    let name = match name_term.as_atom() {
        Some(a) => a.clone(),
        None => return BuiltinOutcome::Error(error::type_error(ctx, "atom", &name_term, "new_class", 2)),
    };
    let obj = ctx.arena.create_class_object(name.clone(), None);
    ctx.set_global_object(name.clone(), obj.clone());
    ctx.database.set_class_info(name, 0, ClassInfo { parent: None });
    bool_outcome(unify(ctx, &args[1], &obj, UnifyFlags::default()))
}

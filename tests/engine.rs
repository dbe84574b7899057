//! End-to-end tests driving the engine through its public API: parse a
//! goal with the convenience reader, run it, inspect bindings.

use plang_core::context::Context;
use plang_core::executor::Solved;
use plang_core::reader::{read_term, read_term_with_vars};
use plang_core::term::{dereference, Term};
use plang_core::unify::{unify, UnifyFlags};

fn consult(ctx: &Context, clause_text: &str) {
    // Route through the same `assertz/1` builtin a consulted program
    // would use, rather than poking the database directly, so these
    // tests exercise the exact path a REPL `consult` does.
    let assertz_text = format!("assertz({}).", clause_text.trim_end_matches('.'));
    let goal = read_term(ctx, &assertz_text).expect("assertz goal should parse");
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::True);
}

#[test]
fn facts_backtrack_in_assertion_order() {
    let ctx = Context::new();
    consult(&ctx, "p(a).");
    consult(&ctx, "p(b).");
    consult(&ctx, "p(c).");

    let (goal, vars) = read_term_with_vars(&ctx, "p(X).").unwrap();
    let x = vars["X"].clone();

    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::True);
    assert_eq!(dereference(&ctx, &x).to_string(), "a");

    assert_eq!(ctx.reexecute_goal().unwrap(), Solved::True);
    assert_eq!(dereference(&ctx, &x).to_string(), "b");

    assert_eq!(ctx.reexecute_goal().unwrap(), Solved::True);
    assert_eq!(dereference(&ctx, &x).to_string(), "c");

    assert_eq!(ctx.reexecute_goal().unwrap(), Solved::Fail);
}

#[test]
fn append_builds_the_concatenated_list() {
    let ctx = Context::new();
    consult(&ctx, "app([], L, L).");
    consult(&ctx, "app([H|T], L, [H|R]) :- app(T, L, R).");

    let (goal, vars) = read_term_with_vars(&ctx, "app([1,2], [3,4], Z).").unwrap();
    let z = vars["Z"].clone();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::True);
    assert_eq!(dereference(&ctx, &z).to_string(), "[1, 2, 3, 4]");
}

#[test]
fn catch_recovers_the_thrown_ball() {
    let ctx = Context::new();
    let (goal, vars) = read_term_with_vars(&ctx, "catch(throw(oops), E, true).").unwrap();
    let e = vars["E"].clone();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::True);
    assert_eq!(dereference(&ctx, &e).to_string(), "oops");
}

#[test]
fn catch_lets_a_non_matching_ball_propagate() {
    let ctx = Context::new();
    let goal = read_term(&ctx, "catch(throw(oops), wrong_pattern, true).").unwrap();
    let err = ctx.execute_goal(goal).unwrap_err();
    assert!(matches!(err, plang_core::EngineError::Thrown(_)));
}

#[test]
fn cut_commits_to_the_first_disjunct() {
    let ctx = Context::new();
    let goal = read_term(&ctx, "((=(X,1) ; =(X,2)), !, =(X,2)).").unwrap();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::Fail);
}

#[test]
fn indexing_finds_a_clause_past_the_threshold() {
    let ctx = Context::new();
    for i in 1..=100 {
        consult(&ctx, &format!("q({}).", i));
    }
    let goal = read_term(&ctx, "q(73).").unwrap();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::True);
    let goal = read_term(&ctx, "q(999).").unwrap();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::Fail);
}

#[test]
fn indexed_and_unindexed_paths_agree() {
    // Below INDEX_THRESHOLD (4): no index built yet.
    let below = Context::new();
    for i in 1..=3 {
        consult(&below, &format!("r({}).", i));
    }
    let goal = read_term(&below, "r(2).").unwrap();
    assert_eq!(below.execute_goal(goal).unwrap(), Solved::True);

    // Above the threshold: same query against an indexed predicate.
    let above = Context::new();
    for i in 1..=10 {
        consult(&above, &format!("r({}).", i));
    }
    let goal = read_term(&above, "r(2).").unwrap();
    assert_eq!(above.execute_goal(goal).unwrap(), Solved::True);
}

#[test]
fn fuzzy_confidence_narrows_and_fails_below_zero() {
    let ctx = Context::new();
    ctx.set_fuzzy_confidence(0.8);

    let goal = read_term(&ctx, "fuzzy(0.5).").unwrap();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::True);
    assert_eq!(ctx.fuzzy_confidence(), 0.5);

    let goal = read_term(&ctx, "fuzzy(0).").unwrap();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::Fail);
}

#[test]
fn call_true_and_fail_and_negation() {
    let ctx = Context::new();
    assert_eq!(ctx.execute_goal(read_term(&ctx, "call(fail).").unwrap()).unwrap(), Solved::Fail);
    assert_eq!(ctx.execute_goal(read_term(&ctx, "call(true).").unwrap()).unwrap(), Solved::True);
    assert_eq!(ctx.execute_goal(read_term(&ctx, "\\+(fail).").unwrap()).unwrap(), Solved::True);
    assert_eq!(ctx.execute_goal(read_term(&ctx, "\\+(true).").unwrap()).unwrap(), Solved::Fail);
}

#[test]
fn once_discards_remaining_choice_points() {
    let ctx = Context::new();
    consult(&ctx, "p(a).");
    consult(&ctx, "p(b).");
    let goal = read_term(&ctx, "once(p(_)).").unwrap();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::True);
    assert_eq!(ctx.reexecute_goal().unwrap(), Solved::Fail);
}

#[test]
fn if_then_else_picks_the_matching_branch() {
    let ctx = Context::new();
    let (goal, vars) = read_term_with_vars(&ctx, "(=(1,2) -> =(X,yes) ; =(X,no)).").unwrap();
    let x = vars["X"].clone();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::True);
    assert_eq!(dereference(&ctx, &x).to_string(), "no");
}

#[test]
fn if_then_commits_to_condition_first_solution() {
    let ctx = Context::new();
    consult(&ctx, "p(a).");
    consult(&ctx, "p(b).");
    let (goal, vars) = read_term_with_vars(&ctx, "(p(X) -> true ; true).").unwrap();
    let x = vars["X"].clone();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::True);
    assert_eq!(dereference(&ctx, &x).to_string(), "a");
    // No choice point survives into Then, so the whole construct has
    // exactly one solution even though p/1 itself has two.
    assert_eq!(ctx.reexecute_goal().unwrap(), Solved::Fail);
}

#[test]
fn retract_removes_the_first_matching_clause() {
    let ctx = Context::new();
    consult(&ctx, "p(a).");
    consult(&ctx, "p(b).");

    let goal = read_term(&ctx, "retract(p(a)).").unwrap();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::True);

    let goal = read_term(&ctx, "p(a).").unwrap();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::Fail);

    let goal = read_term(&ctx, "p(b).").unwrap();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::True);
}

#[test]
fn dollar_switch_picks_the_first_matching_case() {
    let ctx = Context::new();
    consult(&ctx, "result(none).");
    let goal = read_term(
        &ctx,
        "$switch(b, [-(a,retract(result(_))), -(b,(retract(result(_)), assertz(result(matched_b)))), -(default,true)]).",
    )
    .unwrap();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::True);
    let check = read_term(&ctx, "result(matched_b).").unwrap();
    assert_eq!(ctx.execute_goal(check).unwrap(), Solved::True);
}

#[test]
fn dollar_while_loops_until_the_condition_fails() {
    // A raw variable in the Cond/Body terms can't carry the loop state:
    // `$while` re-runs the same two terms via `call_once` every pass,
    // and a successful call_once's bindings are kept rather than undone,
    // so a variable bound on the first iteration is still bound (to the
    // same value) on the second. Threading the shrinking list through
    // `state/1` instead works because each call to `pop_state/0` gets a
    // fresh clause instantiation of its own head variables.
    let ctx = Context::new();
    consult(&ctx, "state([a,b,c]).");
    consult(&ctx, "can_pop_state :- state([_|_]).");
    consult(&ctx, "pop_state :- retract(state([_|T])), assertz(state(T)).");
    let goal = read_term(&ctx, "$while(can_pop_state, pop_state).").unwrap();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::True);
    let check = read_term(&ctx, "state([]).").unwrap();
    assert_eq!(ctx.execute_goal(check).unwrap(), Solved::True);
}

#[test]
fn occurs_check_rejects_a_self_referential_binding() {
    let ctx = Context::new();
    let (goal, vars) = read_term_with_vars(&ctx, "=(X, f(X)).").unwrap();
    let mark = ctx.trail.mark();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::Fail);
    assert_eq!(ctx.trail.mark(), mark);
    assert!(matches!(dereference(&ctx, &vars["X"]).as_ref(), Term::Var(_)));
}

#[test]
fn confidence_reads_zero_after_a_failed_top_level_goal() {
    let ctx = Context::new();
    ctx.set_fuzzy_confidence(0.8);
    let goal = read_term(&ctx, "fail.").unwrap();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::Fail);
    assert_eq!(ctx.fuzzy_confidence(), 0.0);
}

#[test]
fn asserta_prepends_before_existing_clauses() {
    let ctx = Context::new();
    consult(&ctx, "p(a).");
    consult(&ctx, "p(b).");
    let goal = read_term(&ctx, "asserta(p(z)).").unwrap();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::True);

    let (goal, vars) = read_term_with_vars(&ctx, "p(X).").unwrap();
    let x = vars["X"].clone();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::True);
    assert_eq!(dereference(&ctx, &x).to_string(), "z");
    assert_eq!(ctx.reexecute_goal().unwrap(), Solved::True);
    assert_eq!(dereference(&ctx, &x).to_string(), "a");
}

#[test]
fn member_variable_auto_creates_a_property_and_reverts_its_write_on_backtrack() {
    let ctx = Context::new();
    let obj = ctx.arena.create_object(None, None);
    let name = ctx.arena.intern(b"age");
    let member = ctx.arena.create_member_var(obj.clone(), name.clone(), true);

    let mark = ctx.trail.mark();
    let val = ctx.arena.create_integer(42);
    assert!(unify(&ctx, &member, &val, UnifyFlags::default()));
    assert_eq!(dereference(&ctx, &member).as_integer(), Some(42));

    let od = match obj.as_ref() {
        Term::Object(od) => od.clone(),
        _ => unreachable!(),
    };
    assert!(od.own_property(&name).is_some(), "auto-created property stays after backtrack");

    ctx.trail.backtrack(mark);
    assert!(
        od.own_property(&name).is_some(),
        "property addition itself is not undone on backtrack"
    );
    assert!(matches!(dereference(&ctx, &member).as_ref(), Term::Var(_)));
}

#[test]
fn abandon_goal_leaves_the_trail_undone() {
    let ctx = Context::new();
    let mark_before = ctx.trail.mark();
    let goal = read_term(&ctx, "=(X, bound).").unwrap();
    assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::True);
    assert!(ctx.trail.mark() > mark_before);
    ctx.abandon_goal();
    assert_eq!(ctx.trail.mark(), mark_before);
}

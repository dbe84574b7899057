//! The goal executor (§3.4, §4.4): resolution driven by an explicit
//! tree of execution nodes rather than compiled WAM instructions (§9
//! "Open question" — this crate implements the interpreter-with-
//! explicit-nodes model). `Cont` is the "current node" chain (current
//! goal, success continuation, cut barrier); `ChoicePoint` is the
//! "fail node" chain; `CatchFrame` is the "catch node" chain. All
//! three are described in §3.4/§4.4 as linked nodes; this port backs
//! them with `Rc`-linked conses (`Cont`) and growable `Vec`s
//! (`choice_points`, `catch_stack`) rather than raw-pointer lists —
//! the arena-of-nodes style `index.rs` already uses for the red-black
//! tree, just simpler here since nodes don't need in-place mutation.

use crate::clone::clone_term;
use crate::context::Context;
use crate::database::INDEX_THRESHOLD;
use crate::error::{self, EngineError, EngineResult};
use crate::term::{dereference, Term, TermRef};
use crate::unify::{unify, UnifyFlags};
use std::rc::Rc;

/// One outcome of a deterministic builtin call (§6.3). Folds the
/// C contract's result code plus out-parameter error into a single
/// enum, which is the idiomatic Rust shape for the same information.
pub enum BuiltinOutcome {
    True,
    Fail,
    Error(TermRef),
    Halt(i32),
}

/// What `execute_goal`/`reexecute_goal`/`call_once` report to their
/// caller on anything other than an unhandled thrown error (§4.4
/// "Result codes", §6.1). Unhandled errors are carried by `Err` of the
/// surrounding `Result` (`EngineError::Thrown`) instead of folded into
/// this enum, since at the embedder boundary they are exceptional,
/// not a normal outcome to match on alongside `True`/`Fail`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Solved {
    True,
    Fail,
    Halt(i32),
}

/// The "current node" chain (§3.4, §4.4): a goal still to run, the
/// cut barrier in effect for it (the choice-point stack depth `!`
/// truncates back to), and what to run next on success. Sharing `Rc`
/// tails is what lets a choice point capture "resume here" for O(1)
/// instead of copying the remaining goal list.
enum Cont {
    Done,
    Goal {
        goal: TermRef,
        cut_barrier: usize,
        next: Rc<Cont>,
    },
}

/// A choice point (§3.4 "fail_node"): everything needed to roll back
/// to a prior point in the search and try the next alternative.
struct ChoicePoint {
    kind: ChoicePointKind,
    /// Continuation to resume with once the alternative is chosen.
    next: Rc<Cont>,
    trail_mark: usize,
    confidence: f64,
    /// Catch-stack depth at creation time; restored on backtrack so a
    /// catch frame pushed after this choice point, and now moot, does
    /// not linger (§4.4 "the enclosing catch chain at the point of the
    /// choice").
    catch_len: usize,
}

enum ChoicePointKind {
    /// Remaining, not-yet-tried clauses of a user predicate call
    /// (§3.4 "the pointer to the next unexplored clause").
    Clauses {
        original_goal: TermRef,
        candidates: Rc<Vec<std::rc::Rc<crate::database::Clause>>>,
        next_index: usize,
        body_cut_barrier: usize,
    },
    /// The untried right branch of a plain `(A ; B)` disjunction.
    Disjunction { alt: TermRef, cut_barrier: usize },
}

/// A catch frame (§3.4 "catch_node", §4.4 step 7).
struct CatchFrame {
    pattern: TermRef,
    recovery: TermRef,
    outer_cont: Rc<Cont>,
    /// Barrier to use while running `recovery` — opaque to cuts from
    /// outside, like `call/1` (§4.6's "limited in scope to that
    /// wrapper").
    cut_barrier: usize,
    trail_mark: usize,
    confidence: f64,
}

/// One driven goal and its search state (§4.4). `Context::execute_goal`
/// constructs one of these per top-level query and keeps it around (in
/// `Context`) so `reexecute_goal` can resume the same search.
pub struct Executor {
    cont: Rc<Cont>,
    choice_points: Vec<ChoicePoint>,
    catch_stack: Vec<CatchFrame>,
    /// Trail position when this executor was created, for
    /// `abandon_goal` (§6.1).
    top_mark: usize,
}

enum Step {
    Continue,
    Fail,
    Error(TermRef),
    Halt(i32),
    Done,
}

impl Executor {
    pub fn new(ctx: &Context, goal: TermRef) -> Self {
        Executor {
            cont: Rc::new(Cont::Goal {
                goal,
                cut_barrier: 0,
                next: Rc::new(Cont::Done),
            }),
            choice_points: Vec::new(),
            catch_stack: Vec::new(),
            top_mark: ctx.trail.mark(),
        }
    }

    pub fn top_mark(&self) -> usize {
        self.top_mark
    }

    /// Drive `self.cont` to the next result: a solution, exhaustion,
    /// an unhandled error, or a halt (§4.4 "Outer loop").
    pub fn run(&mut self, ctx: &Context) -> EngineResult<Solved> {
        loop {
            match self.step(ctx) {
                Step::Continue => continue,
                Step::Done => return Ok(Solved::True),
                Step::Fail => {
                    if !self.backtrack(ctx) {
                        return Ok(Solved::Fail);
                    }
                }
                Step::Halt(n) => return Ok(Solved::Halt(n)),
                Step::Error(term) => {
                    if !self.handle_error(ctx, term.clone()) {
                        return Err(EngineError::Thrown(term));
                    }
                }
            }
        }
    }

    /// Force backtracking for the next solution (§6.1
    /// `reexecute_goal`), then drive to the next result the same way
    /// `run` does.
    pub fn reexecute(&mut self, ctx: &Context) -> EngineResult<Solved> {
        if !self.backtrack(ctx) {
            return Ok(Solved::Fail);
        }
        self.run(ctx)
    }

    /// One step of the outer loop (§4.4 items 1-5). Returns what
    /// happened; `run` interprets the result.
    fn step(&mut self, ctx: &Context) -> Step {
        let (goal, cut_barrier, next) = match self.cont.as_ref() {
            Cont::Done => return Step::Done,
            Cont::Goal {
                goal,
                cut_barrier,
                next,
            } => (goal.clone(), *cut_barrier, next.clone()),
        };
        let g = dereference(ctx, &goal);

        if matches!(g.as_ref(), Term::Var(_)) {
            return Step::Error(error::instantiation_error(ctx, "call", 1));
        }

        let Some((name, arity)) = g.goal_indicator() else {
            return Step::Error(error::type_error(ctx, "callable", &g, "call", 1));
        };
        let atoms = &ctx.atoms;

        // Conjunction splits the node in two, sharing the same cut
        // barrier (§4.4 step 3).
        if name == atoms.comma && arity == 2 {
            let args = g.goal_args();
            let second = Rc::new(Cont::Goal {
                goal: args[1].clone(),
                cut_barrier,
                next,
            });
            self.cont = Rc::new(Cont::Goal {
                goal: args[0].clone(),
                cut_barrier,
                next: second,
            });
            return Step::Continue;
        }

        // `!/0`: prune every choice point back to the barrier recorded
        // for the clause invocation this cut lives in (§4.4 "Cut
        // semantics").
        if name == atoms.cut && arity == 0 {
            self.choice_points.truncate(cut_barrier);
            self.cont = next;
            return Step::Continue;
        }

        if name == atoms.semicolon && arity == 2 {
            let args = g.goal_args();
            let left = dereference(ctx, &args[0]);
            if let Some((n2, 2)) = left.goal_indicator() {
                if n2 == atoms.arrow {
                    let ite_args = left.goal_args();
                    return self.if_then_else(
                        ctx,
                        ite_args[0].clone(),
                        ite_args[1].clone(),
                        args[1].clone(),
                        cut_barrier,
                        next,
                    );
                }
            }
            // Plain disjunction: try the left branch now, leave the
            // right branch as a choice point (§4.4 "(A ; B)").
            self.choice_points.push(ChoicePoint {
                kind: ChoicePointKind::Disjunction {
                    alt: args[1].clone(),
                    cut_barrier,
                },
                next: next.clone(),
                trail_mark: ctx.trail.mark(),
                confidence: ctx.confidence.get(),
                catch_len: self.catch_stack.len(),
            });
            self.cont = Rc::new(Cont::Goal {
                goal: args[0].clone(),
                cut_barrier,
                next,
            });
            return Step::Continue;
        }

        if name == atoms.arrow && arity == 2 {
            // Bare if-then: `(C -> D)` with an implicit `fail` else.
            let args = g.goal_args();
            let fail_goal = ctx.arena.atom_term(atoms.fail.clone());
            return self.if_then_else(ctx, args[0].clone(), args[1].clone(), fail_goal, cut_barrier, next);
        }

        if name == atoms.catch_atom && arity == 3 {
            let args = g.goal_args();
            self.catch_stack.push(CatchFrame {
                pattern: args[1].clone(),
                recovery: args[2].clone(),
                outer_cont: next.clone(),
                cut_barrier,
                trail_mark: ctx.trail.mark(),
                confidence: ctx.confidence.get(),
            });
            let inner_barrier = self.choice_points.len();
            self.cont = Rc::new(Cont::Goal {
                goal: args[0].clone(),
                cut_barrier: inner_barrier,
                next: Rc::new(Cont::Goal {
                    // `$$pop_catch` below is a sentinel atom never looked
                    // up in the database — it is recognized by name
                    // before dispatch ever reaches the lookup stage.
                    goal: ctx.arena.atom_term(ctx.arena.intern(b"$$pop_catch")),
                    cut_barrier,
                    next,
                }),
            });
            return Step::Continue;
        }

        if name.name() == b"$$pop_catch" && arity == 0 {
            // G of the enclosing `catch/3` produced a solution: this
            // catch frame no longer guards the outer continuation
            // (§4.4 step 7's scope is bounded to G's own activation;
            // see DESIGN.md for the backtracking-into-G tradeoff this
            // implies).
            self.catch_stack.pop();
            self.cont = next;
            return Step::Continue;
        }

        // Builtins (§6.3) before user clauses, matching the source's
        // dispatch order.
        if let Some(builtin) = ctx.database.lookup_builtin(&name, arity) {
            let args = g.goal_args();
            return match builtin(ctx, &args) {
                BuiltinOutcome::True => {
                    self.cont = next;
                    Step::Continue
                }
                BuiltinOutcome::Fail => Step::Fail,
                BuiltinOutcome::Error(t) => Step::Error(t),
                BuiltinOutcome::Halt(n) => Step::Halt(n),
            };
        }

        if let Some(pred) = ctx.database.predicate(&name, arity) {
            let candidates = self.select_candidates(ctx, &pred, &g, arity);
            return self.try_clauses(ctx, &g, candidates, 0, next);
        }

        match ctx.unknown_policy.get() {
            crate::context::UnknownPolicy::Fail => Step::Fail,
            crate::context::UnknownPolicy::Error => {
                Step::Error(error::existence_error(ctx, "procedure", &g, "call", 1))
            }
        }
    }

    /// Candidate clauses for a goal against `pred` (§4.5): the indexed
    /// bucket (once the predicate has crossed `INDEX_THRESHOLD`) or
    /// the full assertion-order list otherwise, so both paths are
    /// guaranteed to agree on solution order.
    fn select_candidates(
        &self,
        ctx: &Context,
        pred: &Rc<crate::database::Predicate>,
        goal: &TermRef,
        arity: usize,
    ) -> Vec<Rc<crate::database::Clause>> {
        if arity == 0 || pred.clause_count() <= INDEX_THRESHOLD {
            return pred.clauses_in_order();
        }
        let args = goal.goal_args();
        let key_term = dereference(ctx, &args[pred.index_arg.min(args.len() - 1)]);
        pred.candidates(ctx, &key_term)
    }

    /// Try `candidates[start..]` against `goal`, in order, committing
    /// to the first clause whose (freshly renamed) head unifies and
    /// leaving a choice point for the rest if any remain (§4.5
    /// "Ordering guarantees").
    fn try_clauses(
        &mut self,
        ctx: &Context,
        goal: &TermRef,
        candidates: Vec<Rc<crate::database::Clause>>,
        start: usize,
        next: Rc<Cont>,
    ) -> Step {
        let barrier = self.choice_points.len();
        let mark = ctx.trail.mark();
        let confidence = ctx.confidence.get();
        let catch_len = self.catch_stack.len();

        for i in start..candidates.len() {
            let clause = &candidates[i];
            let (chead, cbody) = crate::clone::clone_clause(ctx, &clause.head, Some(&clause.body));
            let cbody = cbody.expect("clone_clause with a body argument always returns Some");
            if unify(ctx, goal, &chead, UnifyFlags::default()) {
                if i + 1 < candidates.len() {
                    self.choice_points.push(ChoicePoint {
                        kind: ChoicePointKind::Clauses {
                            original_goal: goal.clone(),
                            candidates: Rc::new(candidates),
                            next_index: i + 1,
                            body_cut_barrier: barrier,
                        },
                        next: next.clone(),
                        trail_mark: mark,
                        confidence,
                        catch_len,
                    });
                }
                self.cont = Rc::new(Cont::Goal {
                    goal: cbody,
                    cut_barrier: barrier,
                    next,
                });
                return Step::Continue;
            }
        }
        Step::Fail
    }

    /// `(Cond -> Then ; Else)` (§4.4): run `Cond` committing to its
    /// first solution (a fresh inner barrier absorbs any choice points
    /// `Cond` itself creates), then continue with `Then` under the
    /// *outer* barrier; if `Cond` fails outright, run `Else` instead.
    fn if_then_else(
        &mut self,
        ctx: &Context,
        cond: TermRef,
        then_goal: TermRef,
        else_goal: TermRef,
        outer_barrier: usize,
        next: Rc<Cont>,
    ) -> Step {
        let commit_barrier = self.choice_points.len();
        self.choice_points.push(ChoicePoint {
            kind: ChoicePointKind::Disjunction {
                alt: else_goal,
                cut_barrier: outer_barrier,
            },
            next: next.clone(),
            trail_mark: ctx.trail.mark(),
            confidence: ctx.confidence.get(),
            catch_len: self.catch_stack.len(),
        });
        // Cond runs with its own barrier so its solution commits (cuts
        // away any choice points it made, including the Else branch
        // above) the moment it succeeds, via the synthetic cut below.
        let cut_goal = ctx.arena.atom_term(ctx.atoms.cut.clone());
        let then_under_outer = Rc::new(Cont::Goal {
            goal: then_goal,
            cut_barrier: outer_barrier,
            next,
        });
        let commit_then = Rc::new(Cont::Goal {
            goal: cut_goal,
            cut_barrier: commit_barrier,
            next: then_under_outer,
        });
        self.cont = Rc::new(Cont::Goal {
            goal: cond,
            cut_barrier: commit_barrier,
            next: commit_then,
        });
        Step::Continue
    }

    /// Pop the most recent choice point and resume its alternative,
    /// restoring the trail/confidence/catch-chain state recorded when
    /// it was pushed (§4.4 step 6). Returns `false` once the whole
    /// search is exhausted.
    fn backtrack(&mut self, ctx: &Context) -> bool {
        while let Some(cp) = self.choice_points.pop() {
            ctx.trail.backtrack(cp.trail_mark);
            ctx.confidence.set(cp.confidence);
            self.catch_stack.truncate(cp.catch_len);
            match cp.kind {
                ChoicePointKind::Disjunction { alt, cut_barrier } => {
                    self.cont = Rc::new(Cont::Goal {
                        goal: alt,
                        cut_barrier,
                        next: cp.next,
                    });
                    return true;
                }
                ChoicePointKind::Clauses {
                    original_goal,
                    candidates,
                    next_index,
                    body_cut_barrier,
                } => {
                    // Re-run the same scan `try_clauses` uses, starting
                    // past the clause already tried. A fresh push (if
                    // any candidates remain after the next match) gets
                    // its own trail mark from right here, same as the
                    // first attempt.
                    let candidates_vec = match Rc::try_unwrap(candidates) {
                        Ok(v) => v,
                        Err(rc) => (*rc).clone(),
                    };
                    // Reuse body_cut_barrier as the barrier for the
                    // retried body too, but the new attempt's own
                    // choice point (if pushed) must record the depth
                    // *now*, which is below this frame already, so
                    // `try_clauses` computing a fresh `barrier` would
                    // be wrong (it would double-count this level).
                    // Temporarily restore the barrier explicitly:
                    if let Step::Continue = self.try_clauses_at_barrier(
                        ctx,
                        &original_goal,
                        candidates_vec,
                        next_index,
                        cp.next,
                        body_cut_barrier,
                    ) {
                        return true;
                    }
                    continue;
                }
            }
        }
        false
    }

    /// Like `try_clauses`, but for retry out of an existing choice
    /// point: the cut barrier is the one recorded when the predicate
    /// was first called, not `choice_points.len()` at retry time (the
    /// original choice point has already been popped by `backtrack`).
    fn try_clauses_at_barrier(
        &mut self,
        ctx: &Context,
        goal: &TermRef,
        candidates: Vec<Rc<crate::database::Clause>>,
        start: usize,
        next: Rc<Cont>,
        barrier: usize,
    ) -> Step {
        let mark = ctx.trail.mark();
        let confidence = ctx.confidence.get();
        let catch_len = self.catch_stack.len();

        for i in start..candidates.len() {
            let clause = &candidates[i];
            let (chead, cbody) = crate::clone::clone_clause(ctx, &clause.head, Some(&clause.body));
            let cbody = cbody.expect("clone_clause with a body argument always returns Some");
            if unify(ctx, goal, &chead, UnifyFlags::default()) {
                if i + 1 < candidates.len() {
                    self.choice_points.push(ChoicePoint {
                        kind: ChoicePointKind::Clauses {
                            original_goal: goal.clone(),
                            candidates: Rc::new(candidates),
                            next_index: i + 1,
                            body_cut_barrier: barrier,
                        },
                        next: next.clone(),
                        trail_mark: mark,
                        confidence,
                        catch_len,
                    });
                }
                self.cont = Rc::new(Cont::Goal {
                    goal: cbody,
                    cut_barrier: barrier,
                    next,
                });
                return Step::Continue;
            }
        }
        Step::Fail
    }

    /// Walk the catch chain for an error (§4.4 step 7). Returns
    /// `true` (and resumes `self.cont` at the matching recovery goal)
    /// if some frame's pattern unifies; `false` if the error is
    /// unhandled and must propagate out of `run`.
    fn handle_error(&mut self, ctx: &Context, term: TermRef) -> bool {
        while let Some(frame) = self.catch_stack.pop() {
            ctx.trail.backtrack(frame.trail_mark);
            ctx.confidence.set(frame.confidence);
            let culprit = clone_term(ctx, &term);
            if unify(ctx, &culprit, &frame.pattern, UnifyFlags::default()) {
                self.cont = Rc::new(Cont::Goal {
                    goal: frame.recovery,
                    cut_barrier: frame.cut_barrier,
                    next: frame.outer_cont,
                });
                return true;
            }
        }
        false
    }
}

/// The re-entrant "call once" sub-call (§4.6): run `goal` to its first
/// solution (or failure/error/halt) under a brand new execution tree,
/// so choice points and catch frames inside `goal` are invisible to
/// the caller, and cuts inside it are local. Confidence narrows by
/// min-propagation on success; a failed or erroring attempt restores
/// the caller's confidence so a dead-end sub-goal can't taint it.
pub fn call_once(ctx: &Context, goal: &TermRef) -> EngineResult<Solved> {
    let saved_confidence = ctx.confidence.get();
    let mut exec = Executor::new(ctx, goal.clone());
    let result = exec.run(ctx);
    match &result {
        Ok(Solved::True) => {}
        _ => ctx.confidence.set(saved_confidence),
    }
    result
}

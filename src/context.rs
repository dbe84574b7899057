//! The per-context runtime (§5, §6.1). A `Context` owns every mutable
//! structure the engine touches — the arena, the trail, the predicate
//! database, the table of named global objects, and the current fuzzy
//! confidence — so that two contexts never share state and an
//! embedder can run several independently (one per OS thread, since
//! `Context` is intentionally `!Send`).

use crate::arena::Arena;
use crate::atom::Atom;
use crate::clone::clone_clause;
use crate::database::Database;
use crate::error::{EngineError, EngineResult};
use crate::executor::{Executor, Solved};
use crate::term::{dereference, TermRef};
use crate::trail::Trail;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Control atoms cached at startup for fast identity comparison
/// throughout the engine (§3.2), rather than re-interning the same
/// handful of bytes on every dispatch.
pub struct ControlAtoms {
    pub nil: Atom,
    pub dot: Atom,
    pub clause: Atom,
    pub comma: Atom,
    pub semicolon: Atom,
    pub arrow: Atom,
    pub slash: Atom,
    pub true_: Atom,
    pub fail: Atom,
    pub cut: Atom,
    pub eq: Atom,
    pub naf: Atom,
    pub call_atom: Atom,
    pub once_atom: Atom,
    pub catch_atom: Atom,
    pub throw_atom: Atom,
    /// The reader's top-level query wrapper `?-(Goal)` (§6.2), distinct
    /// from the two-argument `:-`/2 clause functor above.
    pub query: Atom,
}

impl ControlAtoms {
    fn new(arena: &Arena) -> Self {
        ControlAtoms {
            nil: arena.intern(b"[]"),
            dot: arena.intern(b"."),
            clause: arena.intern(b":-"),
            comma: arena.intern(b","),
            semicolon: arena.intern(b";"),
            arrow: arena.intern(b"->"),
            slash: arena.intern(b"/"),
            true_: arena.intern(b"true"),
            fail: arena.intern(b"fail"),
            cut: arena.intern(b"!"),
            eq: arena.intern(b"="),
            naf: arena.intern(b"\\+"),
            call_atom: arena.intern(b"call"),
            once_atom: arena.intern(b"once"),
            catch_atom: arena.intern(b"catch"),
            throw_atom: arena.intern(b"throw"),
            query: arena.intern(b"?-"),
        }
    }
}

/// Whether a call to an undefined predicate fails silently or raises
/// `existence_error(procedure, Name/Arity)` (§4.4 step 5: "configurable
/// per context").
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum UnknownPolicy {
    Fail,
    Error,
}

pub struct Context {
    pub arena: Arena,
    pub trail: Trail,
    pub database: Database,
    pub atoms: ControlAtoms,
    pub confidence: Cell<f64>,
    pub unknown_policy: Cell<UnknownPolicy>,
    global_objects: RefCell<HashMap<Atom, TermRef>>,
    /// The currently driven top-level query, if any (§6.1
    /// `execute_goal`/`reexecute_goal`/`abandon_goal`). Only one query
    /// is live at a time per context; starting a new one with
    /// `execute_goal` replaces it.
    query: RefCell<Option<Executor>>,
}

impl Context {
    pub fn new() -> Self {
        let arena = Arena::new();
        let atoms = ControlAtoms::new(&arena);
        let ctx = Context {
            arena,
            trail: Trail::new(),
            database: Database::new(),
            atoms,
            confidence: Cell::new(1.0),
            unknown_policy: Cell::new(UnknownPolicy::Error),
            global_objects: RefCell::new(HashMap::new()),
            query: RefCell::new(None),
        };
        crate::builtins::install(&ctx);
        log::info!("context initialized");
        ctx
    }

    /// Current fuzzy confidence, in (0, 1] by construction (§4.7).
    pub fn fuzzy_confidence(&self) -> f64 {
        self.confidence.get()
    }

    /// Clamp `x` into (0, 1] and install it as the current confidence
    /// (§4.7, `set_fuzzy/1`).
    pub fn set_fuzzy_confidence(&self, x: f64) {
        self.confidence.set(x.clamp(f64::MIN_POSITIVE, 1.0));
    }

    /// Reduce confidence by min-propagation (§4.6, §4.7): a nested
    /// call's confidence can only pull the caller's down, never up.
    pub fn narrow_confidence(&self, x: f64) {
        if x < self.confidence.get() {
            self.confidence.set(x);
        }
    }

    pub fn reset_confidence(&self) {
        self.confidence.set(1.0);
    }

    /// Look up an object bound under a top-level name (§4.2's
    /// member-variable resolution: "If the owner is an atom, look it
    /// up in a per-context global objects map").
    pub fn global_object(&self, name: &Atom) -> Option<TermRef> {
        self.global_objects.borrow().get(name).cloned()
    }

    pub fn set_global_object(&self, name: Atom, value: TermRef) {
        self.global_objects.borrow_mut().insert(name, value);
    }

    /// Start driving a fresh top-level query, replacing any query
    /// already in progress (§6.1). Bindings made by the previous query
    /// are left as-is on the trail; an embedder that wants a clean
    /// slate should call `abandon_goal` first. Confidence resets to
    /// `1.0` here (§8 scenario 6), since a prior goal's failure or
    /// success must not leak into an unrelated new top-level call;
    /// `reexecute_goal` does not reset, since it continues the same
    /// goal rather than starting a new one.
    pub fn execute_goal(&self, goal: TermRef) -> EngineResult<Solved> {
        log::debug!("execute_goal: {}", goal);
        self.reset_confidence();
        let mut exec = Executor::new(self, goal);
        let result = exec.run(self);
        self.settle_confidence(&result);
        *self.query.borrow_mut() = Some(exec);
        result
    }

    /// Resume the current query's search for another solution (§6.1).
    /// Fails if no query is in progress.
    pub fn reexecute_goal(&self) -> EngineResult<Solved> {
        let mut exec = match self.query.borrow_mut().take() {
            Some(exec) => exec,
            None => return Ok(Solved::Fail),
        };
        let result = exec.reexecute(self);
        self.settle_confidence(&result);
        *self.query.borrow_mut() = Some(exec);
        result
    }

    /// Load a sequence of clauses, facts, and directives (§6.1, §6.2).
    /// Each term is read, then dispatched: a two-argument `:-`/2 term
    /// asserts a clause; a one-argument `:-`/1 or `?-`/1 term runs
    /// immediately as a directive, whose failure only warns rather than
    /// aborting the rest of the load (matching how a real consult keeps
    /// going past one bad directive); anything else callable asserts as
    /// a fact with body `true`.
    pub fn consult_source(&self, source: &str) -> EngineResult<()> {
        let terms = crate::reader::read_all_terms(self, source)?;
        log::info!("consult_source: loading {} term(s)", terms.len());
        for term in terms {
            self.consult_term(&term)?;
        }
        Ok(())
    }

    fn consult_term(&self, term: &TermRef) -> EngineResult<()> {
        let d = dereference(self, term);
        if let Some(f) = d.as_functor() {
            if f.name == self.atoms.clause && f.arity() == 1 {
                return self.run_directive(&f.arg(0));
            }
            if f.name == self.atoms.query && f.arity() == 1 {
                return self.run_directive(&f.arg(0));
            }
            if f.name == self.atoms.clause && f.arity() == 2 {
                return self.assert_clause_term(&f.arg(0), &f.arg(1));
            }
        }
        if d.goal_indicator().is_none() {
            return Err(EngineError::NotCallable(format!("{}", d)));
        }
        let true_term = self.arena.atom_term(self.atoms.true_.clone());
        self.assert_clause_term(&d, &true_term)
    }

    /// Run a loaded directive or top-level query to its first solution,
    /// logging (rather than propagating) a failed or erroring directive
    /// so one bad line doesn't stop the rest of the file from loading.
    fn run_directive(&self, goal: &TermRef) -> EngineResult<()> {
        match crate::executor::call_once(self, goal) {
            Ok(Solved::True) => Ok(()),
            Ok(Solved::Fail) => {
                log::warn!("directive failed: {}", goal);
                Ok(())
            }
            Ok(Solved::Halt(n)) => Err(EngineError::Halt(n)),
            Err(err) => {
                log::warn!("directive raised an error: {}: {}", goal, err);
                Ok(())
            }
        }
    }

    fn assert_clause_term(&self, head: &TermRef, body: &TermRef) -> EngineResult<()> {
        let (name, arity) = match dereference(self, head).goal_indicator() {
            Some(ga) => ga,
            None => return Err(EngineError::NotCallable(format!("{}", head))),
        };
        if !self.database.is_assertable(&name, arity) {
            return Err(EngineError::NotCallable(format!("{}/{} is not dynamic", name.name_str(), arity)));
        }
        let (head, body) = clone_clause(self, head, Some(body));
        let pred = self.database.predicate_for_assert(name, arity);
        pred.assert_last(self, head, body.unwrap());
        Ok(())
    }

    /// §4.7/§7: "failure or error returns confidence 0" — a top-level
    /// `Fail`/`Halt` or an unhandled thrown error zeroes the reported
    /// confidence; a `True` result leaves whatever `run` left behind
    /// (the min-propagated value built up along the solution).
    fn settle_confidence(&self, result: &EngineResult<Solved>) {
        match result {
            Ok(Solved::True) => {}
            _ => self.confidence.set(0.0),
        }
    }

    /// Discard the current query and undo every binding it made
    /// (§6.1), returning the trail to where it stood when the query
    /// started.
    pub fn abandon_goal(&self) {
        if let Some(exec) = self.query.borrow_mut().take() {
            log::debug!("abandon_goal: discarding in-progress query");
            self.trail.backtrack(exec.top_mark());
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

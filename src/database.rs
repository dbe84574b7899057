//! The predicate database (§3.3). Each atom carries one `ArityInfo`
//! record per arity it has been used at; the record folds together
//! everything the rest of the engine needs to dispatch a goal —
//! operator syntax (consumed only by the external parser), a builtin
//! dispatcher, an arithmetic-function dispatcher, flag bits, optional
//! class info, and the clause container itself.

use crate::atom::Atom;
use crate::context::Context;
use crate::index::ClauseIndex;
use crate::term::TermRef;
use fnv::FnvHashMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Threshold at which a predicate's clause list gains a first-argument
/// index (§4.5, §9 "Indexing trigger"). Chosen to match the source;
/// the indexed and non-indexed paths are required to produce identical
/// solution sequences regardless of this value.
pub const INDEX_THRESHOLD: usize = 4;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    Xf,
    Yf,
    Xfx,
    Xfy,
    Yfx,
    Fx,
    Fy,
}

#[derive(Clone, Copy)]
pub struct OperatorInfo {
    pub kind: OperatorKind,
    pub priority: u16,
}

/// The native dispatcher contract for builtins (§6.3): takes the
/// context and the already-dereferenced-at-call-time goal arguments,
/// returns a result code folding success/fail/error into one enum.
pub type Builtin = fn(&Context, &[TermRef]) -> crate::executor::BuiltinOutcome;

/// Native arithmetic function dispatcher, consumed by the (out of
/// scope) arithmetic evaluator; the core only stores the registration.
pub type ArithFn = fn(&Context, &[TermRef]) -> Result<TermRef, crate::error::EngineError>;

pub struct ClassInfo {
    pub parent: Option<Atom>,
}

/// A single stored clause: always `Head :- Body`, with `Body` the atom
/// `true` for a fact (§3.1). `seq` is the assertion-order sequence
/// number used to interleave indexed and variable-headed candidates
/// back into one assertion-order stream (§4.5).
#[derive(Clone)]
pub struct Clause {
    pub seq: u64,
    pub head: TermRef,
    pub body: TermRef,
}

/// The clause container for one (name, arity) pair (§3.3).
pub struct Predicate {
    pub name: Atom,
    pub arity: usize,
    clauses: RefCell<Vec<Rc<Clause>>>,
    next_seq: Cell<u64>,
    pub index_arg: usize,
    index: RefCell<ClauseIndex>,
    dynamic: Cell<bool>,
}

impl Predicate {
    fn new(name: Atom, arity: usize) -> Self {
        Predicate {
            name,
            arity,
            clauses: RefCell::new(Vec::new()),
            next_seq: Cell::new(0),
            index_arg: 0,
            index: RefCell::new(ClauseIndex::new()),
            dynamic: Cell::new(false),
        }
    }

    pub fn mark_dynamic(&self) {
        self.dynamic.set(true);
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic.get()
    }

    pub fn clause_count(&self) -> usize {
        self.clauses.borrow().len()
    }

    pub fn is_indexed(&self) -> bool {
        self.clause_count() > INDEX_THRESHOLD
    }

    fn next_seq(&self) -> u64 {
        let s = self.next_seq.get();
        self.next_seq.set(s + 1);
        s
    }

    /// `asserta/1` (§4.5 "Consistency with assert/retract").
    pub fn assert_first(&self, ctx: &Context, head: TermRef, body: TermRef) -> Rc<Clause> {
        let clause = Rc::new(Clause {
            seq: self.next_seq(),
            head,
            body,
        });
        self.clauses.borrow_mut().insert(0, clause.clone());
        self.index
            .borrow_mut()
            .insert(ctx, self.index_arg, clause.clone());
        self.log_index_crossing();
        clause
    }

    /// `assertz/1`.
    pub fn assert_last(&self, ctx: &Context, head: TermRef, body: TermRef) -> Rc<Clause> {
        let clause = Rc::new(Clause {
            seq: self.next_seq(),
            head,
            body,
        });
        self.clauses.borrow_mut().push(clause.clone());
        self.index
            .borrow_mut()
            .insert(ctx, self.index_arg, clause.clone());
        self.log_index_crossing();
        clause
    }

    fn log_index_crossing(&self) {
        if self.clause_count() == INDEX_THRESHOLD + 1 {
            log::debug!(
                "predicate {}/{} crossed the indexing threshold ({} clauses)",
                self.name.name_str(),
                self.arity,
                self.clause_count()
            );
        }
    }

    /// Remove `clause` from both the assertion-order list and the
    /// index, keeping both structures consistent (§4.5).
    pub fn retract_clause(&self, ctx: &Context, clause: &Rc<Clause>) {
        self.clauses.borrow_mut().retain(|c| !Rc::ptr_eq(c, clause));
        self.index.borrow_mut().remove(ctx, self.index_arg, clause);
    }

    pub fn abolish(&self, ctx: &Context) {
        log::debug!("abolishing {}/{}", self.name.name_str(), self.arity);
        self.clauses.borrow_mut().clear();
        *self.index.borrow_mut() = ClauseIndex::new();
        let _ = ctx;
    }

    /// All clauses in assertion order, ignoring the index — the
    /// fallback path used below the indexing threshold or when the
    /// goal's index argument is an unbound variable (§4.5).
    pub fn clauses_in_order(&self) -> Vec<Rc<Clause>> {
        self.clauses.borrow().clone()
    }

    /// Candidate clauses for a goal whose index argument dereferences
    /// to `key_term`, in assertion order: the indexed bucket for that
    /// key merged with the always-tried variable-headed clauses
    /// (§4.5). Falls back to `clauses_in_order` below the threshold so
    /// the two paths are guaranteed to agree.
    pub fn candidates(&self, ctx: &Context, key_term: &TermRef) -> Vec<Rc<Clause>> {
        if !self.is_indexed() {
            return self.clauses_in_order();
        }
        self.index.borrow().candidates(ctx, key_term)
    }
}

/// Operator info, builtin/arithmetic dispatchers, flags, class info,
/// and the clause container for one (atom, arity) pair (§3.3).
pub struct ArityInfo {
    pub operator: Option<OperatorInfo>,
    pub builtin: Option<Builtin>,
    pub arith: Option<ArithFn>,
    pub compiled: bool,
    pub builtin_flag: bool,
    pub class_info: Option<ClassInfo>,
    pub predicate: Option<Rc<Predicate>>,
}

impl ArityInfo {
    fn new() -> Self {
        ArityInfo {
            operator: None,
            builtin: None,
            arith: None,
            compiled: false,
            builtin_flag: false,
            class_info: None,
            predicate: None,
        }
    }

    pub fn is_assertable(&self) -> bool {
        !self.compiled && !self.builtin_flag
    }
}

/// The whole predicate database: an atom-keyed map of (name, arity) to
/// `ArityInfo` (§3.3). Keyed on `(u64, usize)` — the atom's interning
/// id plus arity — rather than `(Atom, usize)` directly, since `Atom`
/// only compares by `Rc` pointer identity and a `HashMap` key needs a
/// stable hash independent of which particular `Rc` clone is used to
/// look it up.
pub struct Database {
    table: RefCell<FnvHashMap<(u64, usize), ArityInfo>>,
}

impl Database {
    pub fn new() -> Self {
        Database {
            table: RefCell::new(FnvHashMap::default()),
        }
    }

    pub fn register_builtin(&self, name: Atom, arity: usize, f: Builtin) {
        let mut table = self.table.borrow_mut();
        let entry = table.entry((name.id(), arity)).or_insert_with(ArityInfo::new);
        entry.builtin = Some(f);
        entry.builtin_flag = true;
    }

    pub fn register_arith(&self, name: Atom, arity: usize, f: ArithFn) {
        let mut table = self.table.borrow_mut();
        let entry = table.entry((name.id(), arity)).or_insert_with(ArityInfo::new);
        entry.arith = Some(f);
    }

    pub fn lookup_builtin(&self, name: &Atom, arity: usize) -> Option<Builtin> {
        self.table.borrow().get(&(name.id(), arity)).and_then(|e| e.builtin)
    }

    pub fn lookup_arith(&self, name: &Atom, arity: usize) -> Option<ArithFn> {
        self.table.borrow().get(&(name.id(), arity)).and_then(|e| e.arith)
    }

    pub fn set_operator(&self, name: Atom, arity: usize, info: OperatorInfo) {
        let mut table = self.table.borrow_mut();
        let entry = table.entry((name.id(), arity)).or_insert_with(ArityInfo::new);
        entry.operator = Some(info);
    }

    pub fn get_operator(&self, name: &Atom, arity: usize) -> Option<OperatorInfo> {
        self.table.borrow().get(&(name.id(), arity)).and_then(|e| e.operator)
    }

    pub fn set_class_info(&self, name: Atom, arity: usize, info: ClassInfo) {
        let mut table = self.table.borrow_mut();
        let entry = table.entry((name.id(), arity)).or_insert_with(ArityInfo::new);
        entry.class_info = Some(info);
    }

    /// Fetch (creating if absent) the clause container for `(name,
    /// arity)`, marking it dynamic — the flag that excludes it from
    /// `compiled`/`builtin` assert/retract protection (§3.3).
    pub fn predicate_for_assert(&self, name: Atom, arity: usize) -> Rc<Predicate> {
        let mut table = self.table.borrow_mut();
        let entry = table.entry((name.id(), arity)).or_insert_with(ArityInfo::new);
        if entry.predicate.is_none() {
            entry.predicate = Some(Rc::new(Predicate::new(name.clone(), arity)));
        }
        let pred = entry.predicate.clone().unwrap();
        pred.mark_dynamic();
        pred
    }

    pub fn predicate(&self, name: &Atom, arity: usize) -> Option<Rc<Predicate>> {
        self.table
            .borrow()
            .get(&(name.id(), arity))
            .and_then(|e| e.predicate.clone())
    }

    pub fn is_assertable(&self, name: &Atom, arity: usize) -> bool {
        self.table
            .borrow()
            .get(&(name.id(), arity))
            .map(|e| e.is_assertable())
            .unwrap_or(true)
    }

    pub fn abolish(&self, ctx: &Context, name: &Atom, arity: usize) {
        if let Some(pred) = self.predicate(name, arity) {
            pred.abolish(ctx);
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

//! Term representation (§3). A `Term` is immutable once built except for
//! the single mutable cell each `Variable` and object-property slot
//! carries, which the trail knows how to undo.

use crate::atom::Atom;
use crate::context::Context;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

pub type TermRef = Rc<Term>;

pub struct VarData {
    pub id: u64,
    pub name: Option<Atom>,
    pub value: RefCell<Option<TermRef>>,
}

pub struct MemberVarData {
    pub id: u64,
    pub object: TermRef,
    pub name: Atom,
    pub auto_create: bool,
}

/// An object instance (§3.1). `prototype` and `class_name` are the two
/// reserved properties the spec calls out by name; everything else is
/// an ordinary own property in `properties`, kept in insertion order
/// so that a property listing reproduces assertion order (§3.1: "an
/// ordered sequence of (name-atom → value) property pairs").
pub struct ObjectData {
    pub id: u64,
    pub prototype: RefCell<Option<TermRef>>,
    pub class_name: RefCell<Option<Atom>>,
    pub properties: RefCell<IndexMap<Atom, Rc<RefCell<TermRef>>>>,
}

impl ObjectData {
    /// `true` iff this object carries a `className` property, marking
    /// it as a class object rather than a plain instance (§3.1).
    pub fn is_class(&self) -> bool {
        self.class_name.borrow().is_some()
    }

    /// Fetch an own property cell, without walking the prototype chain.
    pub fn own_property(&self, name: &Atom) -> Option<Rc<RefCell<TermRef>>> {
        self.properties.borrow().get(name).cloned()
    }

    /// Fetch a property cell, walking the `prototype` chain if the
    /// property is not present directly on this object (§4.1).
    pub fn property_chain(ctx: &Context, obj: &Rc<ObjectData>, name: &Atom) -> Option<Rc<RefCell<TermRef>>> {
        if let Some(cell) = obj.own_property(name) {
            return Some(cell);
        }
        let proto = obj.prototype.borrow().clone();
        match proto {
            Some(p) => match dereference(ctx, &p).as_ref() {
                Term::Object(parent) => ObjectData::property_chain(ctx, parent, name),
                _ => None,
            },
            None => None,
        }
    }

    /// Insert or overwrite an own property, preserving the position of
    /// an existing key and appending a new one at the end (§4.1).
    pub fn set_property(&self, name: Atom, value: Rc<RefCell<TermRef>>) {
        self.properties.borrow_mut().insert(name, value);
    }
}

pub struct FunctorData {
    pub name: Atom,
    args: Vec<TermRef>,
}

impl FunctorData {
    pub fn new(name: Atom, args: Vec<TermRef>) -> Self {
        FunctorData { name, args }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn arg(&self, i: usize) -> TermRef {
        self.args[i].clone()
    }

    pub fn args(&self) -> &[TermRef] {
        &self.args
    }
}

pub struct ListData {
    pub head: TermRef,
    pub tail: TermRef,
}

/// The tagged term variants participating in unification. Predicate and
/// clause bookkeeping live in `database.rs` instead of here — neither is
/// ever an argument to `unify`, so folding them into this enum would
/// only force every match in this module to account for cases that can
/// never occur.
pub enum Term {
    Atom(Atom),
    Integer(i64),
    Real(f64),
    Str(Rc<[u8]>),
    Functor(FunctorData),
    List(ListData),
    Var(Rc<VarData>),
    MemberVar(Rc<MemberVarData>),
    Object(Rc<ObjectData>),
}

impl Term {
    pub fn as_functor(&self) -> Option<&FunctorData> {
        match self {
            Term::Functor(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListData> {
        match self {
            Term::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Term::Atom(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Term::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Term::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_str_bytes(&self) -> Option<&[u8]> {
        match self {
            Term::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Rc<ObjectData>> {
        match self {
            Term::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_) | Term::MemberVar(_))
    }

    /// Name/arity pair for goal dispatch: a bare atom counts as arity 0.
    pub fn goal_indicator(&self) -> Option<(Atom, usize)> {
        match self {
            Term::Atom(a) => Some((a.clone(), 0)),
            Term::Functor(f) => Some((f.name.clone(), f.arity())),
            _ => None,
        }
    }

    pub fn goal_args(&self) -> Vec<TermRef> {
        match self {
            Term::Functor(f) => f.args().to_vec(),
            _ => Vec::new(),
        }
    }
}

/// Chase variable bindings and auto-vivifying member-variable property
/// slots until reaching a term that is not itself a bound reference
/// (§3.4). Every other operation in this crate reads terms through
/// this function rather than matching on `Term::Var`/`Term::MemberVar`
/// directly.
pub fn dereference(ctx: &Context, t: &TermRef) -> TermRef {
    let mut cur = t.clone();
    loop {
        match cur.as_ref() {
            Term::Var(v) => {
                let bound = v.value.borrow().clone();
                match bound {
                    Some(next) => cur = next,
                    None => return cur,
                }
            }
            Term::MemberVar(mv) => {
                let owner = dereference(ctx, &mv.object);
                let obj = match owner.as_ref() {
                    Term::Object(_) => Some(owner.clone()),
                    Term::Atom(name) => ctx.global_object(name),
                    _ => None,
                };
                let od = match obj.as_deref() {
                    Some(Term::Object(od)) => od.clone(),
                    _ => return cur,
                };
                match ObjectData::property_chain(ctx, &od, &mv.name) {
                    Some(cell) => {
                        let val = cell.borrow().clone();
                        cur = val;
                    }
                    None if mv.auto_create => {
                        let fresh = ctx.arena.create_var(None);
                        od.set_property(mv.name.clone(), Rc::new(RefCell::new(fresh.clone())));
                        cur = fresh;
                    }
                    None => return cur,
                }
            }
            _ => return cur,
        }
    }
}

/// `true` only once every leaf of `t` has been dereferenced to
/// something other than an unbound variable (§3.4, §8.1).
pub fn is_ground(ctx: &Context, t: &TermRef) -> bool {
    let d = dereference(ctx, t);
    match d.as_ref() {
        Term::Var(_) | Term::MemberVar(_) => false,
        Term::Functor(f) => f.args().iter().all(|a| is_ground(ctx, a)),
        Term::List(l) => is_ground(ctx, &l.head) && is_ground(ctx, &l.tail),
        Term::Object(od) => od
            .properties
            .borrow()
            .values()
            .all(|cell| is_ground(ctx, &cell.borrow())),
        _ => true,
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(a) => write!(f, "{}", a.name_str()),
            Term::Integer(i) => write!(f, "{i}"),
            Term::Real(r) => write!(f, "{r}"),
            Term::Str(s) => write!(f, "\"{}\"", String::from_utf8_lossy(s)),
            Term::Var(v) => match &v.name {
                Some(n) => write!(f, "{}", n.name_str()),
                None => write!(f, "_G{}", v.id),
            },
            Term::MemberVar(mv) => write!(f, "self#{}.{}", mv.id, mv.name.name_str()),
            Term::Object(o) => write!(
                f,
                "<object#{} {}>",
                o.id,
                o.class_name
                    .borrow()
                    .as_ref()
                    .map(|c| c.name_str().into_owned())
                    .unwrap_or_else(|| "?".into())
            ),
            Term::Functor(fd) => {
                write!(f, "{}(", fd.name.name_str())?;
                for (i, a) in fd.args().iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Term::List(_) => {
                write!(f, "[")?;
                let mut first = true;
                let mut cur: TermRef = match self {
                    Term::List(l) => Rc::new(Term::List(ListData {
                        head: l.head.clone(),
                        tail: l.tail.clone(),
                    })),
                    _ => unreachable!(),
                };
                // Walk the spine without calling dereference (no Context
                // available in Display); this only prints as far as the
                // literal structure goes, which is enough for diagnostics.
                loop {
                    match cur.as_ref() {
                        Term::List(l) => {
                            if !first {
                                write!(f, ",")?;
                            }
                            first = false;
                            write!(f, "{}", l.head)?;
                            cur = l.tail.clone();
                        }
                        Term::Atom(a) if a.name() == b"[]" => break,
                        other => {
                            write!(f, "|{other}")?;
                            break;
                        }
                    }
                }
                write!(f, "]")
            }
        }
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Breadth-first collection of every distinct unbound variable
/// reachable from `t`, in first-encountered order — used by the
/// convenience reader (§6.5) to report solution bindings.
pub fn collect_vars(ctx: &Context, t: &TermRef, out: &mut Vec<TermRef>) {
    let mut seen: Vec<*const VarData> = Vec::new();
    let mut queue = VecDeque::new();
    queue.push_back(t.clone());
    while let Some(term) = queue.pop_front() {
        let d = dereference(ctx, &term);
        match d.as_ref() {
            Term::Var(v) => {
                let ptr = Rc::as_ptr(v);
                if !seen.contains(&ptr) {
                    seen.push(ptr);
                    out.push(d.clone());
                }
            }
            Term::Functor(fd) => {
                for a in fd.args() {
                    queue.push_back(a.clone());
                }
            }
            Term::List(l) => {
                queue.push_back(l.head.clone());
                queue.push_back(l.tail.clone());
            }
            _ => {}
        }
    }
}

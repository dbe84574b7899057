//! Term construction (§3.1). The arena owns the atom table; every other
//! piece of term storage is ordinary `Rc` allocation, reclaimed by
//! reference counting once the last `TermRef` pointing at it drops.
//! Reference cycles (a variable bound into a structure that contains
//! it) are possible in principle but never arise from `unify`, which
//! always binds a *fresh* variable outward, never into its own value.

use crate::atom::{Atom, AtomTable};
use crate::term::{FunctorData, ListData, MemberVarData, ObjectData, Term, TermRef, VarData};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub struct Arena {
    atoms: AtomTable,
    next_var_id: Cell<u64>,
    next_object_id: Cell<u64>,
}

impl Arena {
    pub fn new() -> Self {
        Arena {
            atoms: AtomTable::new(),
            next_var_id: Cell::new(0),
            next_object_id: Cell::new(0),
        }
    }

    pub fn intern(&self, name: &[u8]) -> Atom {
        self.atoms.intern(name)
    }

    pub fn create_atom_term(&self, name: &[u8]) -> TermRef {
        Rc::new(Term::Atom(self.intern(name)))
    }

    pub fn atom_term(&self, atom: Atom) -> TermRef {
        Rc::new(Term::Atom(atom))
    }

    pub fn create_integer(&self, v: i64) -> TermRef {
        Rc::new(Term::Integer(v))
    }

    pub fn create_real(&self, v: f64) -> TermRef {
        Rc::new(Term::Real(v))
    }

    pub fn create_string(&self, bytes: &[u8]) -> TermRef {
        Rc::new(Term::Str(Rc::from(bytes)))
    }

    pub fn create_functor(&self, name: Atom, args: Vec<TermRef>) -> TermRef {
        Rc::new(Term::Functor(FunctorData::new(name, args)))
    }

    pub fn nil(&self) -> TermRef {
        self.create_atom_term(b"[]")
    }

    pub fn cons(&self, head: TermRef, tail: TermRef) -> TermRef {
        Rc::new(Term::List(ListData { head, tail }))
    }

    pub fn list_from(&self, items: Vec<TermRef>) -> TermRef {
        let mut tail = self.nil();
        for item in items.into_iter().rev() {
            tail = self.cons(item, tail);
        }
        tail
    }

    /// A fresh unbound variable, optionally carrying a source name for
    /// diagnostics/solution printing (§3.1, §6.5). The id is a
    /// deterministic, process-local stand-in for pointer identity,
    /// used when `precedes` needs to break a tie between two variables.
    pub fn create_var(&self, name: Option<Atom>) -> TermRef {
        let id = self.next_var_id.get();
        self.next_var_id.set(id + 1);
        Rc::new(Term::Var(Rc::new(VarData {
            id,
            name,
            value: RefCell::new(None),
        })))
    }

    pub fn create_member_var(&self, object: TermRef, name: Atom, auto_create: bool) -> TermRef {
        let id = self.next_var_id.get();
        self.next_var_id.set(id + 1);
        Rc::new(Term::MemberVar(Rc::new(MemberVarData {
            id,
            object,
            name,
            auto_create,
        })))
    }

    /// Create an object instance with an optional `prototype` parent
    /// and an optional `className` marking it as a class object (§4.1).
    pub fn create_object(&self, prototype: Option<TermRef>, class_name: Option<Atom>) -> TermRef {
        let id = self.next_object_id.get();
        self.next_object_id.set(id + 1);
        Rc::new(Term::Object(Rc::new(ObjectData {
            id,
            prototype: RefCell::new(prototype),
            class_name: RefCell::new(class_name),
            properties: RefCell::new(indexmap::IndexMap::default()),
        })))
    }

    /// Create a class object: a named object meant to serve as a
    /// `prototype` for instances, optionally itself extending a parent
    /// class (§3.1, §4.1).
    pub fn create_class_object(&self, class_name: Atom, parent: Option<TermRef>) -> TermRef {
        self.create_object(parent, Some(class_name))
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

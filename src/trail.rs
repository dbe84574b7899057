//! The binding trail (§3.5). Every destructive write — a variable
//! binding or an object-property slot write — is recorded here first,
//! which is what makes backtracking O(k) in the number of bindings
//! undone rather than O(n) in term size.

use crate::term::{TermRef, VarData};
use std::cell::RefCell;
use std::rc::Rc;

pub enum TrailEntry {
    /// Undo a variable binding by clearing its cell back to unbound.
    Unbind(Rc<VarData>),
    /// Undo an object-property write by restoring the cell's previous
    /// value. Holding the cell directly (rather than an object + key)
    /// keeps this valid even if the object's property map rehashes.
    Restore(Rc<RefCell<TermRef>>, TermRef),
}

pub struct Trail {
    entries: RefCell<Vec<TrailEntry>>,
}

impl Trail {
    pub fn new() -> Self {
        Trail {
            entries: RefCell::new(Vec::new()),
        }
    }

    /// Current length, to be passed back to `backtrack` later.
    pub fn mark(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push_unbind(&self, var: Rc<VarData>) {
        self.entries.borrow_mut().push(TrailEntry::Unbind(var));
    }

    pub fn push_restore(&self, cell: Rc<RefCell<TermRef>>, previous: TermRef) {
        self.entries
            .borrow_mut()
            .push(TrailEntry::Restore(cell, previous));
    }

    /// Undo every entry pushed since `mark`, most recent first (§3.5,
    /// §8.4). Idempotent if `mark >= len()`.
    pub fn backtrack(&self, mark: usize) {
        let mut entries = self.entries.borrow_mut();
        while entries.len() > mark {
            match entries.pop() {
                Some(TrailEntry::Unbind(var)) => {
                    *var.value.borrow_mut() = None;
                }
                Some(TrailEntry::Restore(cell, previous)) => {
                    *cell.borrow_mut() = previous;
                }
                None => break,
            }
        }
    }
}

impl Default for Trail {
    fn default() -> Self {
        Self::new()
    }
}

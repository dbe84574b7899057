//! Atom interning (§3.2). Within one context, two atoms with identical
//! byte content are the same reference — `Atom` equality is `Rc`
//! pointer identity, never a byte comparison.

use fnv::FnvHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

struct AtomData {
    name: Box<[u8]>,
    id: u64,
}

/// An interned identifier term. Cloning an `Atom` only clones the `Rc`;
/// the name bytes are never copied after interning.
#[derive(Clone)]
pub struct Atom(Rc<AtomData>);

impl Atom {
    /// Raw name bytes, which may contain NUL (§3.1).
    pub fn name(&self) -> &[u8] {
        &self.0.name
    }

    pub fn name_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0.name)
    }

    /// Creation-order id, used as a stand-in for pointer-identity
    /// ordering (§3.3, §4.5) since two atoms interned from the same
    /// bytes always share one id and atoms never reorder.
    pub fn id(&self) -> u64 {
        self.0.id
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Atom {}

impl std::hash::Hash for Atom {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state)
    }
}

impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Atom {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.id.cmp(&other.0.id)
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name_str())
    }
}

/// Per-context interning table, keyed on raw name bytes (§3.2).
pub struct AtomTable {
    table: RefCell<FnvHashMap<Box<[u8]>, Atom>>,
    next_id: RefCell<u64>,
}

impl AtomTable {
    pub fn new() -> Self {
        AtomTable {
            table: RefCell::new(FnvHashMap::default()),
            next_id: RefCell::new(0),
        }
    }

    /// Intern `name`, returning the existing atom if these bytes were
    /// already seen, or allocating a fresh one otherwise.
    pub fn intern(&self, name: &[u8]) -> Atom {
        if let Some(existing) = self.table.borrow().get(name) {
            return existing.clone();
        }
        let atom = {
            let mut next_id = self.next_id.borrow_mut();
            let id = *next_id;
            *next_id += 1;
            Atom(Rc::new(AtomData {
                name: name.to_vec().into_boxed_slice(),
                id,
            }))
        };
        self.table
            .borrow_mut()
            .insert(atom.name().to_vec().into_boxed_slice(), atom.clone());
        atom
    }
}

impl Default for AtomTable {
    fn default() -> Self {
        Self::new()
    }
}

//! First-argument clause indexing (§3.3, §4.5): a red-black tree keyed
//! on a `(type-tag, arity-or-size, discriminant)` tuple, built once a
//! predicate's clause count crosses `INDEX_THRESHOLD`. Clauses whose
//! index argument is a variable at assert time are never indexable —
//! they go in a separate always-tried list — and are merged back with
//! whatever bucket a concrete goal key matches, in assertion order, so
//! the indexed and unindexed paths agree on solution order (§8.7).

use crate::context::Context;
use crate::database::Clause;
use crate::term::{dereference, Term, TermRef};
use std::cmp::Ordering;
use std::rc::Rc;

#[derive(Clone, Copy, PartialEq)]
struct OrdF64(f64);
impl Eq for OrdF64 {}
impl PartialOrd for OrdF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for OrdF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// The first-argument key (§3.3). Variant order doubles as the
/// type-tag ordering the red-black tree sorts by; nothing in the spec
/// requires this ordering to match `clone::precedes`'s standard order
/// of terms, since indexing only needs *some* total order, not that
/// one.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum IndexKey {
    Real(OrdF64),
    Integer(i64),
    Atom(u64),
    Str(Vec<u8>),
    /// A list whose head is itself a variable or another list — these
    /// share one key rather than discriminating further (§3.3).
    ConsGeneric,
    /// A list whose head is a concrete, non-list, non-variable term —
    /// keyed one level deeper so `[a|_]` and `[b|_]` index apart.
    Cons(Box<IndexKey>),
    Functor(u64, usize),
}

/// Compute the indexing key for a dereferenced term, or `None` if it
/// is an unbound variable (not indexable; goals/clauses with a
/// variable here must be tried against every candidate bucket).
pub fn index_key(ctx: &Context, term: &TermRef) -> Option<IndexKey> {
    let d = dereference(ctx, term);
    match d.as_ref() {
        Term::Var(_) | Term::MemberVar(_) => None,
        Term::Atom(a) => Some(IndexKey::Atom(a.id())),
        Term::Integer(i) => Some(IndexKey::Integer(*i)),
        Term::Real(r) => Some(IndexKey::Real(OrdF64(*r))),
        Term::Str(s) => Some(IndexKey::Str(s.to_vec())),
        Term::Functor(f) => Some(IndexKey::Functor(f.name.id(), f.arity())),
        Term::List(l) => {
            let head = dereference(ctx, &l.head);
            match head.as_ref() {
                Term::Var(_) | Term::MemberVar(_) | Term::List(_) => Some(IndexKey::ConsGeneric),
                _ => match index_key(ctx, &head) {
                    Some(k) => Some(IndexKey::Cons(Box::new(k))),
                    None => Some(IndexKey::ConsGeneric),
                },
            }
        }
        // Objects unify only by reference identity, which makes a
        // useful index key (a stable integer) unavailable without
        // growing the object arena a discriminant field the rest of
        // the spec never asks for; fall back to the unindexed scan.
        Term::Object(_) => None,
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    Red,
    Black,
}

struct Node {
    key: IndexKey,
    clauses: Vec<Rc<Clause>>,
    color: Color,
    left: Option<usize>,
    right: Option<usize>,
    parent: Option<usize>,
}

/// Red-black tree mapping `IndexKey` to the clauses asserted under it,
/// plus the side list of clauses whose index argument is a variable
/// (§3.3, §4.5). Standard CLRS insertion/deletion with rotations,
/// implemented over a `Vec<Node>` arena (node indices instead of raw
/// pointers/`Rc` parent links, since nodes never outlive the tree and
/// the tree itself owns mutation).
pub struct ClauseIndex {
    nodes: Vec<Node>,
    root: Option<usize>,
    free: Vec<usize>,
    var_head: Vec<Rc<Clause>>,
}

impl ClauseIndex {
    pub fn new() -> Self {
        ClauseIndex {
            nodes: Vec::new(),
            root: None,
            free: Vec::new(),
            var_head: Vec::new(),
        }
    }

    fn color(&self, n: Option<usize>) -> Color {
        match n {
            Some(i) => self.nodes[i].color,
            None => Color::Black,
        }
    }

    fn alloc(&mut self, key: IndexKey, clause: Rc<Clause>) -> usize {
        let node = Node {
            key,
            clauses: vec![clause],
            color: Color::Red,
            left: None,
            right: None,
            parent: None,
        };
        if let Some(slot) = self.free.pop() {
            self.nodes[slot] = node;
            slot
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    fn find(&self, key: &IndexKey) -> Option<usize> {
        let mut cur = self.root;
        while let Some(i) = cur {
            match key.cmp(&self.nodes[i].key) {
                Ordering::Less => cur = self.nodes[i].left,
                Ordering::Greater => cur = self.nodes[i].right,
                Ordering::Equal => return Some(i),
            }
        }
        None
    }

    /// Insert `clause` under the first-argument key of its index
    /// argument, or into the variable-headed side list if it has none
    /// (§4.5 "Consistency with assert/retract").
    pub fn insert(&mut self, ctx: &Context, index_arg: usize, clause: Rc<Clause>) {
        let arg = match clause.head.as_ref() {
            Term::Functor(f) if index_arg < f.arity() => Some(f.arg(index_arg)),
            _ => None,
        };
        let key = match arg {
            Some(a) => index_key(ctx, &a),
            None => None,
        };
        match key {
            None => self.var_head.push(clause),
            Some(key) => {
                if let Some(i) = self.find(&key) {
                    self.nodes[i].clauses.push(clause);
                    return;
                }
                self.insert_node(key, clause);
            }
        }
    }

    fn insert_node(&mut self, key: IndexKey, clause: Rc<Clause>) {
        let mut parent = None;
        let mut cur = self.root;
        let mut went_left = false;
        while let Some(i) = cur {
            parent = Some(i);
            match key.cmp(&self.nodes[i].key) {
                Ordering::Less => {
                    went_left = true;
                    cur = self.nodes[i].left;
                }
                Ordering::Greater => {
                    went_left = false;
                    cur = self.nodes[i].right;
                }
                Ordering::Equal => {
                    self.nodes[i].clauses.push(clause);
                    return;
                }
            }
        }
        let z = self.alloc(key, clause);
        self.nodes[z].parent = parent;
        match parent {
            None => self.root = Some(z),
            Some(p) if went_left => self.nodes[p].left = Some(z),
            Some(p) => self.nodes[p].right = Some(z),
        }
        self.insert_fixup(z);
    }

    fn rotate_left(&mut self, x: usize) {
        let y = self.nodes[x].right.expect("rotate_left requires a right child");
        self.nodes[x].right = self.nodes[y].left;
        if let Some(yl) = self.nodes[y].left {
            self.nodes[yl].parent = Some(x);
        }
        self.nodes[y].parent = self.nodes[x].parent;
        match self.nodes[x].parent {
            None => self.root = Some(y),
            Some(p) if self.nodes[p].left == Some(x) => self.nodes[p].left = Some(y),
            Some(p) => self.nodes[p].right = Some(y),
        }
        self.nodes[y].left = Some(x);
        self.nodes[x].parent = Some(y);
    }

    fn rotate_right(&mut self, x: usize) {
        let y = self.nodes[x].left.expect("rotate_right requires a left child");
        self.nodes[x].left = self.nodes[y].right;
        if let Some(yr) = self.nodes[y].right {
            self.nodes[yr].parent = Some(x);
        }
        self.nodes[y].parent = self.nodes[x].parent;
        match self.nodes[x].parent {
            None => self.root = Some(y),
            Some(p) if self.nodes[p].left == Some(x) => self.nodes[p].left = Some(y),
            Some(p) => self.nodes[p].right = Some(y),
        }
        self.nodes[y].right = Some(x);
        self.nodes[x].parent = Some(y);
    }

    fn insert_fixup(&mut self, mut z: usize) {
        while self.color(self.nodes[z].parent) == Color::Red {
            let parent = self.nodes[z].parent.unwrap();
            let grandparent = self.nodes[parent].parent.unwrap();
            if Some(parent) == self.nodes[grandparent].left {
                let uncle = self.nodes[grandparent].right;
                if self.color(uncle) == Color::Red {
                    self.nodes[parent].color = Color::Black;
                    self.nodes[uncle.unwrap()].color = Color::Black;
                    self.nodes[grandparent].color = Color::Red;
                    z = grandparent;
                } else {
                    if Some(z) == self.nodes[parent].right {
                        z = parent;
                        self.rotate_left(z);
                    }
                    let parent = self.nodes[z].parent.unwrap();
                    let grandparent = self.nodes[parent].parent.unwrap();
                    self.nodes[parent].color = Color::Black;
                    self.nodes[grandparent].color = Color::Red;
                    self.rotate_right(grandparent);
                }
            } else {
                let uncle = self.nodes[grandparent].left;
                if self.color(uncle) == Color::Red {
                    self.nodes[parent].color = Color::Black;
                    self.nodes[uncle.unwrap()].color = Color::Black;
                    self.nodes[grandparent].color = Color::Red;
                    z = grandparent;
                } else {
                    if Some(z) == self.nodes[parent].left {
                        z = parent;
                        self.rotate_right(z);
                    }
                    let parent = self.nodes[z].parent.unwrap();
                    let grandparent = self.nodes[parent].parent.unwrap();
                    self.nodes[parent].color = Color::Black;
                    self.nodes[grandparent].color = Color::Red;
                    self.rotate_left(grandparent);
                }
            }
            if Some(z) == self.root {
                break;
            }
        }
        if let Some(r) = self.root {
            self.nodes[r].color = Color::Black;
        }
    }

    /// Remove `clause` from the index, deleting the whole node (with
    /// standard RB delete-fixup) once its clause bucket empties out
    /// (§4.5).
    pub fn remove(&mut self, ctx: &Context, index_arg: usize, clause: &Rc<Clause>) {
        self.var_head.retain(|c| !Rc::ptr_eq(c, clause));
        let arg = match clause.head.as_ref() {
            Term::Functor(f) if index_arg < f.arity() => Some(f.arg(index_arg)),
            _ => None,
        };
        let key = match arg {
            Some(a) => index_key(ctx, &a),
            None => None,
        };
        let Some(key) = key else { return };
        let Some(i) = self.find(&key) else { return };
        self.nodes[i].clauses.retain(|c| !Rc::ptr_eq(c, clause));
        if self.nodes[i].clauses.is_empty() {
            self.delete_node(i);
        }
    }

    fn transplant(&mut self, u: usize, v: Option<usize>) {
        match self.nodes[u].parent {
            None => self.root = v,
            Some(p) if self.nodes[p].left == Some(u) => self.nodes[p].left = v,
            Some(p) => self.nodes[p].right = v,
        }
        if let Some(v) = v {
            self.nodes[v].parent = self.nodes[u].parent;
        }
    }

    fn minimum(&self, mut x: usize) -> usize {
        while let Some(l) = self.nodes[x].left {
            x = l;
        }
        x
    }

    fn delete_node(&mut self, z: usize) {
        let mut y = z;
        let mut y_original_color = self.nodes[y].color;
        let x: Option<usize>;
        // A sentinel is needed when `x` is `None` but still needs a
        // parent recorded for `delete_fixup`; track it alongside `x`.
        let x_parent: Option<usize>;

        if self.nodes[z].left.is_none() {
            x = self.nodes[z].right;
            x_parent = self.nodes[z].parent;
            self.transplant(z, self.nodes[z].right);
        } else if self.nodes[z].right.is_none() {
            x = self.nodes[z].left;
            x_parent = self.nodes[z].parent;
            self.transplant(z, self.nodes[z].left);
        } else {
            y = self.minimum(self.nodes[z].right.unwrap());
            y_original_color = self.nodes[y].color;
            x = self.nodes[y].right;
            if self.nodes[y].parent == Some(z) {
                x_parent = Some(y);
                if let Some(xi) = x {
                    self.nodes[xi].parent = Some(y);
                }
            } else {
                x_parent = self.nodes[y].parent;
                self.transplant(y, self.nodes[y].right);
                self.nodes[y].right = self.nodes[z].right;
                if let Some(r) = self.nodes[y].right {
                    self.nodes[r].parent = Some(y);
                }
            }
            self.transplant(z, Some(y));
            self.nodes[y].left = self.nodes[z].left;
            if let Some(l) = self.nodes[y].left {
                self.nodes[l].parent = Some(y);
            }
            self.nodes[y].color = self.nodes[z].color;
        }

        self.free.push(z);

        if y_original_color == Color::Black {
            self.delete_fixup(x, x_parent);
        }
    }

    fn delete_fixup(&mut self, mut x: Option<usize>, mut x_parent: Option<usize>) {
        while x != self.root && self.color(x) == Color::Black {
            let Some(parent) = x_parent else { break };
            if x == self.nodes[parent].left {
                let mut w = self.nodes[parent].right;
                if self.color(w) == Color::Red {
                    self.nodes[w.unwrap()].color = Color::Black;
                    self.nodes[parent].color = Color::Red;
                    self.rotate_left(parent);
                    w = self.nodes[parent].right;
                }
                let w_idx = w.unwrap();
                if self.color(self.nodes[w_idx].left) == Color::Black
                    && self.color(self.nodes[w_idx].right) == Color::Black
                {
                    self.nodes[w_idx].color = Color::Red;
                    x = Some(parent);
                    x_parent = self.nodes[parent].parent;
                } else {
                    if self.color(self.nodes[w_idx].right) == Color::Black {
                        if let Some(wl) = self.nodes[w_idx].left {
                            self.nodes[wl].color = Color::Black;
                        }
                        self.nodes[w_idx].color = Color::Red;
                        self.rotate_right(w_idx);
                        w = self.nodes[parent].right;
                    }
                    let w_idx = w.unwrap();
                    self.nodes[w_idx].color = self.nodes[parent].color;
                    self.nodes[parent].color = Color::Black;
                    if let Some(wr) = self.nodes[w_idx].right {
                        self.nodes[wr].color = Color::Black;
                    }
                    self.rotate_left(parent);
                    x = self.root;
                    x_parent = None;
                }
            } else {
                let mut w = self.nodes[parent].left;
                if self.color(w) == Color::Red {
                    self.nodes[w.unwrap()].color = Color::Black;
                    self.nodes[parent].color = Color::Red;
                    self.rotate_right(parent);
                    w = self.nodes[parent].left;
                }
                let w_idx = w.unwrap();
                if self.color(self.nodes[w_idx].right) == Color::Black
                    && self.color(self.nodes[w_idx].left) == Color::Black
                {
                    self.nodes[w_idx].color = Color::Red;
                    x = Some(parent);
                    x_parent = self.nodes[parent].parent;
                } else {
                    if self.color(self.nodes[w_idx].left) == Color::Black {
                        if let Some(wr) = self.nodes[w_idx].right {
                            self.nodes[wr].color = Color::Black;
                        }
                        self.nodes[w_idx].color = Color::Red;
                        self.rotate_left(w_idx);
                        w = self.nodes[parent].left;
                    }
                    let w_idx = w.unwrap();
                    self.nodes[w_idx].color = self.nodes[parent].color;
                    self.nodes[parent].color = Color::Black;
                    if let Some(wl) = self.nodes[w_idx].left {
                        self.nodes[wl].color = Color::Black;
                    }
                    self.rotate_right(parent);
                    x = self.root;
                    x_parent = None;
                }
            }
        }
        if let Some(xi) = x {
            self.nodes[xi].color = Color::Black;
        }
    }

    /// Candidate clauses for a goal whose index-argument key is
    /// `key_term`: the matching bucket (if the key is concrete) merged
    /// with the variable-headed side list, sorted back into assertion
    /// order (§4.5).
    pub fn candidates(&self, ctx: &Context, key_term: &TermRef) -> Vec<Rc<Clause>> {
        let mut out: Vec<Rc<Clause>> = match index_key(ctx, key_term) {
            Some(key) => match self.find(&key) {
                Some(i) => self.nodes[i].clauses.clone(),
                None => Vec::new(),
            },
            None => {
                // Goal's index argument is a variable: every clause is
                // a candidate, not just the variable-headed ones.
                let mut all: Vec<Rc<Clause>> = self.var_head.clone();
                self.collect_all(self.root, &mut all);
                all.sort_by_key(|c| c.seq);
                return all;
            }
        };
        out.extend(self.var_head.iter().cloned());
        out.sort_by_key(|c| c.seq);
        out
    }

    fn collect_all(&self, node: Option<usize>, out: &mut Vec<Rc<Clause>>) {
        if let Some(i) = node {
            self.collect_all(self.nodes[i].left, out);
            out.extend(self.nodes[i].clauses.iter().cloned());
            self.collect_all(self.nodes[i].right, out);
        }
    }
}

impl Default for ClauseIndex {
    fn default() -> Self {
        Self::new()
    }
}

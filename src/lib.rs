//! plang-core: the runtime of a Prolog-derived logic programming
//! engine — term arena, unification with a trail, an indexed clause
//! database, and a goal executor driving resolution, objects, and
//! fuzzy-confidence logic.
//!
//! # Architecture
//!
//! - [`Context`]: one engine instance — arena, trail, database,
//!   fuzzy confidence, global objects. `!Send`/`!Sync`; run one per
//!   thread if concurrency is needed.
//! - [`term`]/[`arena`]: the term universe and its constructors.
//! - [`unify`]/[`trail`]/[`clone`]: unification, backtracking, and
//!   fresh-variable renaming for clause instantiation.
//! - [`database`]/[`index`]: the predicate store and its first-argument
//!   red-black tree index.
//! - [`executor`]: resolution — cut, disjunction, if-then-else,
//!   catch/throw, and the re-entrant `call_once` sub-call.
//! - [`reader`]: a convenience term-text reader for the REPL and tests.
//!
//! # Example
//!
//! ```ignore
//! use plang_core::{Context, Solved};
//!
//! let ctx = Context::new();
//! let goal = plang_core::reader::read_term(&ctx, "=(X, hello).").unwrap();
//! assert_eq!(ctx.execute_goal(goal).unwrap(), Solved::True);
//! ```

pub mod arena;
pub mod atom;
pub mod builtins;
pub mod clone;
pub mod context;
pub mod database;
pub mod error;
pub mod executor;
pub mod index;
pub mod reader;
pub mod term;
pub mod trail;
pub mod unify;

pub use context::{Context, UnknownPolicy};
pub use error::{EngineError, EngineResult};
pub use executor::Solved;
pub use term::{Term, TermRef};

#[cfg(test)]
mod tests {
    #[test]
    fn test_crate_compiles() {
        // Basic smoke test; detailed behavior is covered in submodules
        // and in tests/engine.rs.
    }
}

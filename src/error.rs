//! Ambient engine errors (§7 "Ambient error taxonomy") and ISO-style
//! in-language error *term* constructors (§4.8). These are two
//! distinct concepts that happen to share a name: `EngineError` is the
//! Rust-level `Result` error for host-facing operations (a malformed
//! reader token, a consult directive that isn't callable); an
//! `error(Inner, Context)` *term* is a value flowing through the goal
//! executor's own result codes, which this crate carries as
//! `EngineError::Thrown` at the one point the two channels meet
//! (`execute_goal`'s return type, §6.1).

use crate::clone::clone_term as clone_on_raise;
use crate::context::Context;
use crate::term::TermRef;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// An in-language `error(Inner, Context)` term thrown by `throw/1`
    /// or a builtin, unhandled by any `catch/3` frame (§7).
    #[error("unhandled Prolog exception: {0}")]
    Thrown(TermRef),

    /// `halt/0` or `halt/1` unwound past the top level (§7 "Fatal
    /// paths"); the embedder is expected to observe this and exit.
    #[error("halt({0})")]
    Halt(i32),

    /// The convenience reader (§6.5) could not parse its input.
    #[error("syntax error: {0}")]
    Reader(String),

    /// A term passed to `consult_source` was not callable (an atom or
    /// functor) where a clause head, directive, or fact was expected,
    /// or named a predicate the database won't let a consult modify.
    #[error("not a callable term: {0}")]
    NotCallable(String),

    /// A host API call referenced a predicate name/arity that has no
    /// definition and the context's unknown policy is `Fail` silently
    /// disabled for embedder-level lookups (distinct from the
    /// in-language `existence_error` a goal raises).
    #[error("no such predicate: {0}/{1}")]
    NoSuchPredicate(String, usize),
}

/// Construct `error(Inner, Context)` where `Context` is `Name/Arity`
/// (§4.8). `culprit` terms the caller passes into `inner` must already
/// be cloned by the caller if they need to survive backtracking past
/// the raise site (`clone_on_raise` below does this for the common
/// single-culprit shape).
fn error_term(ctx: &Context, inner: TermRef, pred_name: &str, arity: usize) -> TermRef {
    let name_atom = ctx.arena.intern(pred_name.as_bytes());
    let arity_term = ctx.arena.create_integer(arity as i64);
    let context_term = ctx.arena.create_functor(
        ctx.atoms.slash.clone(),
        vec![ctx.arena.atom_term(name_atom), arity_term],
    );
    let error_atom = ctx.arena.intern(b"error");
    ctx.arena
        .create_functor(error_atom, vec![inner, context_term])
}

fn atom(ctx: &Context, name: &[u8]) -> TermRef {
    ctx.arena.create_atom_term(name)
}

fn functor(ctx: &Context, name: &[u8], args: Vec<TermRef>) -> TermRef {
    let a = ctx.arena.intern(name);
    ctx.arena.create_functor(a, args)
}

pub fn instantiation_error(ctx: &Context, pred_name: &str, arity: usize) -> TermRef {
    error_term(ctx, atom(ctx, b"instantiation_error"), pred_name, arity)
}

pub fn type_error(ctx: &Context, expected: &str, culprit: &TermRef, pred_name: &str, arity: usize) -> TermRef {
    let culprit = clone_on_raise(ctx, culprit);
    let inner = functor(ctx, b"type_error", vec![atom(ctx, expected.as_bytes()), culprit]);
    error_term(ctx, inner, pred_name, arity)
}

pub fn domain_error(ctx: &Context, domain: &str, culprit: &TermRef, pred_name: &str, arity: usize) -> TermRef {
    let culprit = clone_on_raise(ctx, culprit);
    let inner = functor(ctx, b"domain_error", vec![atom(ctx, domain.as_bytes()), culprit]);
    error_term(ctx, inner, pred_name, arity)
}

pub fn existence_error(ctx: &Context, kind: &str, culprit: &TermRef, pred_name: &str, arity: usize) -> TermRef {
    let culprit = clone_on_raise(ctx, culprit);
    let inner = functor(ctx, b"existence_error", vec![atom(ctx, kind.as_bytes()), culprit]);
    error_term(ctx, inner, pred_name, arity)
}

pub fn permission_error(
    ctx: &Context,
    op: &str,
    kind: &str,
    culprit: &TermRef,
    pred_name: &str,
    arity: usize,
) -> TermRef {
    let culprit = clone_on_raise(ctx, culprit);
    let inner = functor(
        ctx,
        b"permission_error",
        vec![atom(ctx, op.as_bytes()), atom(ctx, kind.as_bytes()), culprit],
    );
    error_term(ctx, inner, pred_name, arity)
}

pub fn representation_error(ctx: &Context, flag: &str, pred_name: &str, arity: usize) -> TermRef {
    let inner = functor(ctx, b"representation_error", vec![atom(ctx, flag.as_bytes())]);
    error_term(ctx, inner, pred_name, arity)
}

pub fn evaluation_error(ctx: &Context, kind: &str, pred_name: &str, arity: usize) -> TermRef {
    let inner = functor(ctx, b"evaluation_error", vec![atom(ctx, kind.as_bytes())]);
    error_term(ctx, inner, pred_name, arity)
}

pub fn resource_error(ctx: &Context, resource: &str, pred_name: &str, arity: usize) -> TermRef {
    let inner = functor(ctx, b"resource_error", vec![atom(ctx, resource.as_bytes())]);
    error_term(ctx, inner, pred_name, arity)
}

pub fn syntax_error(ctx: &Context, detail: &str, pred_name: &str, arity: usize) -> TermRef {
    let inner = functor(ctx, b"syntax_error", vec![atom(ctx, detail.as_bytes())]);
    error_term(ctx, inner, pred_name, arity)
}

pub fn system_error(ctx: &Context, pred_name: &str, arity: usize) -> TermRef {
    error_term(ctx, atom(ctx, b"system_error"), pred_name, arity)
}

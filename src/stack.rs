//! Stack growth for the recursive passes
//!
//! Parsing, resolution and evaluation all recurse over the AST, and a Lox call adds a Rust
//! frame for every nested block and subexpression it walks through. Each recursive entry point
//! goes through [`ensure_sufficient_stack`] so deep nesting grows the stack instead of aborting
//! the process. The interpreter's call limit still decides when recursion is an error.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first moving to a fresh stack segment if the current one is nearly exhausted.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

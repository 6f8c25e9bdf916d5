//! Stack growth for the recursive parser and evaluator.
//!
//! Deeply nested source (long `else if` chains, recursion in user code) would
//! otherwise overflow the host stack before the call-depth guard reports a
//! proper error.

/// If less than this remains, grow the stack.
const RED_ZONE: usize = 100 * 1024;

/// Each growth allocates this much additional stack space.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

//! The operation library.
//!
//! This module implements the concrete instruction semantics the ISA
//! description binds to. It provides:
//! 1. **Operands:** A typed union resolved once when the machine is built.
//! 2. **Operation kinds:** A closed registry enum; unknown names fail at load.
//! 3. **Flow protocol:** Typed proceed/blocked/signal results, no exceptions.
//! 4. **Handlers:** Arithmetic, comparison, copy, memory, branch, and syscall.

/// Operation handlers and dispatch.
pub mod ops;

pub use ops::{Flow, OpContext, OpKind, Operand, dispatch};

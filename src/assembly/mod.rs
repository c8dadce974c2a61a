//! CIL instruction model consumed by the marking engine.
//!
//! # Key Types
//! - [`Instruction`] - One decoded CIL instruction
//! - [`OpCode`] - The opcode taxonomy with per-opcode metadata
//! - [`Operand`] - Typed operand payloads
//! - [`FlowType`] - Control flow classification
//! - [`StackBehavior`] - Declared stack push/pop arity

mod instruction;

pub use instruction::{FlowType, Instruction, OpCode, Operand, StackBehavior};

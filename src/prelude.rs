//! Convenient re-exports of the types most marking drivers need.
//!
//! ```rust,ignore
//! use trimscope::prelude::*;
//! ```

/// The crate error type
pub use crate::Error;

/// The crate result type
pub use crate::Result;

/// The marking engine and its policy switches
pub use crate::mark::{MarkOptions, MarkStep};

/// The annotation store and its value types
pub use crate::annotations::{
    Annotations, AssemblyAction, DependencyInfo, DependencyKind, MethodAction, StubValue,
    TypePreserve,
};

/// The metadata graph and its builder
pub use crate::metadata::graph::{GraphBuilder, MetadataGraph};

/// Token handles addressing graph nodes
pub use crate::metadata::token::Token;

/// Table taxonomy behind token high bytes
pub use crate::metadata::tables::TableId;

/// Precomputed virtual-method relations
pub use crate::metadata::typemap::VirtualMaps;

/// Run diagnostics
pub use crate::metadata::diagnostics::{DiagnosticCategory, DiagnosticSeverity, Diagnostics};

/// The instruction model used to express method bodies
pub use crate::assembly::{Instruction, OpCode, Operand};

//! Dependency-edge recording.
//!
//! Every time the engine marks a node it attaches a [`DependencyInfo`]
//! describing why: the kind of edge and the node it was reached from. The
//! recorded trace is purely diagnostic output for dependency reporting; it
//! never drives control flow.

use strum::Display;

use crate::metadata::token::Token;

/// The closed taxonomy of reasons a node gets marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DependencyKind {
    /// Externally supplied root
    Root,
    /// Assembly retained because it is loaded
    AssemblyReference,
    /// The synthetic `<Module>` type of a marked assembly
    ModuleType,
    /// Member reached from its declaring type's structural closure
    MemberOfType,
    /// Base type of a marked type
    BaseType,
    /// Enclosing type of a nested marked type
    DeclaringType,
    /// Scope assembly of a marked type
    ScopeOfType,
    /// Field type of a marked field
    FieldType,
    /// Parameter type or attribute of a marked method
    Parameter,
    /// Return type or attribute of a marked method
    ReturnType,
    /// Generic parameter or constraint closure
    GenericParameter,
    /// Generic argument of an instantiated shape
    GenericArgument,
    /// Default constructor required by a `new()` constraint
    DefaultCtorConstraint,
    /// Override kept because its base slot is marked
    Override,
    /// Base slot of a marked override
    BaseMethod,
    /// Explicit `.override` declaration
    MethodImplOverride,
    /// Interface implementation edge
    InterfaceImplementation,
    /// Custom attribute on a marked provider
    CustomAttribute,
    /// Constructor of a marked custom attribute
    AttributeConstructor,
    /// `typeof` argument of a marked custom attribute
    AttributeArgument,
    /// Security declaration on a marked provider
    SecurityDeclaration,
    /// Operand of an instruction in a scanned body
    InstructionOperand,
    /// Local variable type of a scanned body
    LocalVariable,
    /// Catch clause type of a scanned body
    CatchType,
    /// Interface needed by a value observable on the evaluation stack
    InterfaceOnStack,
    /// Interop marshaling requirement of a P/Invoke or internal call
    InteropShape,
    /// Serialization support for a serializable type
    Serialization,
    /// Static tracing field of an event-source provider group
    EventSourceProviderField,
    /// Method kept on a delegate-derived type
    MethodForSpecialType,
    /// Explicit preservation request
    TypePreserve,
    /// Method preserved through an anchor's preserved-method list
    PreservedMethod,
    /// Static constructor triggered by a marked field
    CctorForField,
    /// Parameterless base constructor needed by a stubbed constructor
    BaseDefaultCtor,
    /// Exception constructor needed by a throwing replacement body
    NotSupportedExceptionCtor,
    /// Member discovered through a reflection pattern
    AccessedViaReflection,
    /// Member referenced by a debugger display string
    DebuggerDisplay,
    /// Proxy type referenced by a debugger proxy attribute
    DebuggerTypeProxy,
    /// Attribute force-kept once reflection-only usage exists
    DisablePrivateReflection,
    /// Exported alias of a marked forwarded type
    ExportedType,
}

/// Why a node was marked: edge kind plus the marking origin.
#[derive(Debug, Clone, Copy)]
pub struct DependencyInfo {
    /// The edge kind
    pub kind: DependencyKind,
    /// The node the edge originates from; `None` for external roots
    pub source: Option<Token>,
}

impl DependencyInfo {
    /// An edge from `source`.
    #[must_use]
    pub fn new(kind: DependencyKind, source: Token) -> Self {
        DependencyInfo {
            kind,
            source: Some(source),
        }
    }

    /// An externally supplied root.
    #[must_use]
    pub fn root() -> Self {
        DependencyInfo {
            kind: DependencyKind::Root,
            source: None,
        }
    }
}

/// One recorded mark event.
#[derive(Debug, Clone, Copy)]
pub struct DependencyRecord {
    /// The node that was marked
    pub target: Token,
    /// The edge that caused the mark
    pub info: DependencyInfo,
}

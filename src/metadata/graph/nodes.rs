//! Node payloads for the metadata graph arena.
//!
//! Every entity the marking engine can reach lives in one of these node
//! shapes, addressed by a stable [`Token`]. Cross-entity references are
//! always tokens, never Rust references, which keeps the cyclic metadata
//! graph (types ↔ methods ↔ attributes ↔ generics) free of ownership cycles.

use crate::assembly::Instruction;
use crate::metadata::flags::{
    FieldAttributes, MethodAttributes, MethodImplAttributes, TypeAttributes,
};
use crate::metadata::token::Token;

/// An assembly definition.
#[derive(Debug)]
pub struct AssemblyNode {
    /// Arena token of this node
    pub token: Token,
    /// Simple assembly name
    pub name: String,
    /// The synthetic `<Module>` type, when the assembly has one
    pub module_type: Option<Token>,
    /// Assembly-level custom attributes
    pub custom_attributes: Vec<Token>,
    /// Module-level custom attributes
    pub module_attributes: Vec<Token>,
    /// Exported (forwarded) type aliases declared by this assembly
    pub exported_types: Vec<Token>,
    /// Top-level types defined in this assembly
    pub types: Vec<Token>,
}

/// A type definition.
#[derive(Debug)]
pub struct TypeNode {
    /// Arena token of this node
    pub token: Token,
    /// Namespace, empty for the global namespace
    pub namespace: String,
    /// Simple name (including any generic arity suffix, e.g. `List`1`)
    pub name: String,
    /// Attribute flags
    pub flags: TypeAttributes,
    /// Declaring assembly
    pub assembly: Token,
    /// Base type (`TypeDef` or `TypeRef`), `None` only for `System.Object`
    /// and interfaces
    pub base: Option<Token>,
    /// Enclosing type for nested types
    pub declaring: Option<Token>,
    /// Field members
    pub fields: Vec<Token>,
    /// Method members
    pub methods: Vec<Token>,
    /// Property members
    pub properties: Vec<Token>,
    /// Event members
    pub events: Vec<Token>,
    /// Interface implementation edges
    pub interfaces: Vec<Token>,
    /// Nested type definitions
    pub nested: Vec<Token>,
    /// Generic parameter definitions
    pub generic_params: Vec<Token>,
    /// Generic arguments, non-empty only for instantiated generic shapes
    pub generic_args: Vec<Token>,
    /// Custom attributes
    pub custom_attributes: Vec<Token>,
    /// Security declaration attributes
    pub security: Vec<Token>,
}

impl TypeNode {
    /// Namespace-qualified name.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Whether this type is an interface.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(TypeAttributes::INTERFACE)
    }

    /// Whether this type is COM-imported.
    #[must_use]
    pub fn is_import(&self) -> bool {
        self.flags.contains(TypeAttributes::IMPORT)
    }

    /// Whether this type carries the serializable flag.
    #[must_use]
    pub fn is_serializable(&self) -> bool {
        self.flags.contains(TypeAttributes::SERIALIZABLE)
    }
}

/// A method parameter.
#[derive(Debug)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter type (`TypeDef` or `TypeRef`)
    pub ty: Token,
    /// Whether the parameter is passed by reference
    pub by_ref: bool,
    /// Custom attributes on the parameter
    pub custom_attributes: Vec<Token>,
    /// Marshaling descriptor, when present
    pub marshal: Option<MarshalSpec>,
}

/// A marshaling descriptor attached to a parameter, return value or field.
#[derive(Debug)]
pub struct MarshalSpec {
    /// Native type descriptor
    pub native: String,
    /// Custom marshaler type, when the descriptor names one
    pub custom_marshaler: Option<Token>,
}

/// An exception handler clause of a method body.
#[derive(Debug)]
pub struct ExceptionHandler {
    /// The caught exception type for catch clauses, `None` for
    /// finally/fault/filter clauses
    pub catch_type: Option<Token>,
}

/// A decoded method body.
#[derive(Debug)]
pub struct MethodBody {
    /// Local variable types
    pub locals: Vec<Token>,
    /// Decoded instruction stream
    pub instructions: Vec<Instruction>,
    /// Exception handler clauses
    pub handlers: Vec<ExceptionHandler>,
}

/// Platform-invoke information for a method.
#[derive(Debug)]
pub struct PInvokeInfo {
    /// Target module name
    pub module: String,
    /// Native entry point name
    pub entry_point: String,
}

/// A method definition.
#[derive(Debug)]
pub struct MethodNode {
    /// Arena token of this node
    pub token: Token,
    /// Method name (`.ctor` / `.cctor` for constructors)
    pub name: String,
    /// Attribute flags
    pub flags: MethodAttributes,
    /// Implementation attribute flags
    pub impl_flags: MethodImplAttributes,
    /// Declaring type
    pub declaring: Token,
    /// Parameters in signature order
    pub params: Vec<Parameter>,
    /// Return type (`System.Void` for void methods)
    pub return_type: Token,
    /// Custom attributes on the return value
    pub return_attributes: Vec<Token>,
    /// Marshaling descriptor for the return value
    pub return_marshal: Option<MarshalSpec>,
    /// Generic parameter definitions
    pub generic_params: Vec<Token>,
    /// Explicit override targets (`.override` declarations)
    pub overrides: Vec<Token>,
    /// Custom attributes
    pub custom_attributes: Vec<Token>,
    /// Security declaration attributes
    pub security: Vec<Token>,
    /// Decoded body, `None` for abstract/runtime/P/Invoke methods
    pub body: Option<MethodBody>,
    /// Platform-invoke information
    pub pinvoke: Option<PInvokeInfo>,
}

impl MethodNode {
    /// Whether the method is static.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodAttributes::STATIC)
    }

    /// Whether the method is virtual.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.flags.contains(MethodAttributes::VIRTUAL)
    }

    /// Whether the method is abstract.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(MethodAttributes::ABSTRACT)
    }

    /// Whether this is an instance constructor.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == ".ctor"
    }

    /// Whether this is the static constructor.
    #[must_use]
    pub fn is_static_constructor(&self) -> bool {
        self.name == ".cctor"
    }

    /// Whether the method is a platform-invoke entry.
    #[must_use]
    pub fn is_pinvoke(&self) -> bool {
        self.flags.contains(MethodAttributes::PINVOKE_IMPL) || self.pinvoke.is_some()
    }

    /// Whether the method is an internal call into the runtime.
    #[must_use]
    pub fn is_internal_call(&self) -> bool {
        self.impl_flags.contains(MethodImplAttributes::INTERNAL_CALL)
    }

    /// `this` counts as a parameter slot for instance methods.
    #[must_use]
    pub fn has_this(&self) -> bool {
        !self.is_static()
    }
}

/// A field definition.
#[derive(Debug)]
pub struct FieldNode {
    /// Arena token of this node
    pub token: Token,
    /// Field name
    pub name: String,
    /// Attribute flags
    pub flags: FieldAttributes,
    /// Declaring type
    pub declaring: Token,
    /// Field type (`TypeDef` or `TypeRef`)
    pub field_type: Token,
    /// Custom attributes
    pub custom_attributes: Vec<Token>,
    /// Marshaling descriptor, when present
    pub marshal: Option<MarshalSpec>,
}

impl FieldNode {
    /// Whether the field is static.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(FieldAttributes::STATIC)
    }
}

/// A property definition.
#[derive(Debug)]
pub struct PropertyNode {
    /// Arena token of this node
    pub token: Token,
    /// Property name
    pub name: String,
    /// Declaring type
    pub declaring: Token,
    /// Getter accessor
    pub getter: Option<Token>,
    /// Setter accessor
    pub setter: Option<Token>,
    /// Custom attributes
    pub custom_attributes: Vec<Token>,
}

/// An event definition.
#[derive(Debug)]
pub struct EventNode {
    /// Arena token of this node
    pub token: Token,
    /// Event name
    pub name: String,
    /// Declaring type
    pub declaring: Token,
    /// `add_` accessor
    pub add_method: Option<Token>,
    /// `remove_` accessor
    pub remove_method: Option<Token>,
    /// `raise_` accessor
    pub raise_method: Option<Token>,
    /// Custom attributes
    pub custom_attributes: Vec<Token>,
}

/// A generic parameter definition.
#[derive(Debug)]
pub struct GenericParamNode {
    /// Arena token of this node
    pub token: Token,
    /// Parameter name (`T`, `TKey`, ...)
    pub name: String,
    /// Owning type or method
    pub owner: Token,
    /// Constraint types
    pub constraints: Vec<Token>,
    /// Whether the parameter carries a default-constructor (`new()`) constraint
    pub has_default_ctor_constraint: bool,
    /// Custom attributes
    pub custom_attributes: Vec<Token>,
}

/// An interface implementation edge.
#[derive(Debug)]
pub struct InterfaceImplNode {
    /// Arena token of this node
    pub token: Token,
    /// The implementing type
    pub implementing: Token,
    /// The implemented interface (`TypeDef` or `TypeRef`)
    pub interface: Token,
    /// Custom attributes on the implementation edge
    pub custom_attributes: Vec<Token>,
}

/// A decoded custom-attribute constructor argument.
#[derive(Debug, Clone)]
pub enum AttributeArgument {
    /// A string literal
    String(String),
    /// A type reference (`typeof(...)` argument)
    Type(Token),
    /// An integral value
    Int(i64),
    /// A boolean value
    Bool(bool),
}

/// A named (property/field) custom-attribute argument.
#[derive(Debug, Clone)]
pub struct NamedArgument {
    /// Target property or field name
    pub name: String,
    /// Argument value
    pub value: AttributeArgument,
}

/// A custom attribute instance.
#[derive(Debug)]
pub struct CustomAttributeNode {
    /// Arena token of this node
    pub token: Token,
    /// Attribute constructor (`MethodDef` or `MemberRef`)
    pub constructor: Token,
    /// Positional constructor arguments
    pub args: Vec<AttributeArgument>,
    /// Named arguments
    pub named_args: Vec<NamedArgument>,
}

/// An external type reference.
#[derive(Debug)]
pub struct TypeRefNode {
    /// Arena token of this node
    pub token: Token,
    /// Namespace of the referenced type
    pub namespace: String,
    /// Name of the referenced type
    pub name: String,
    /// Resolution result, `None` when the target is not in the graph
    pub resolved: Option<Token>,
}

impl TypeRefNode {
    /// Namespace-qualified name.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

/// An external member reference.
#[derive(Debug)]
pub struct MemberRefNode {
    /// Arena token of this node
    pub token: Token,
    /// Name of the referenced member
    pub name: String,
    /// Declaring type reference
    pub declaring: Token,
    /// Resolution result (`MethodDef` or `Field`), `None` when unresolved
    pub resolved: Option<Token>,
}

/// An exported (forwarded) type alias.
#[derive(Debug)]
pub struct ExportedTypeNode {
    /// Arena token of this node
    pub token: Token,
    /// Namespace of the forwarded type
    pub namespace: String,
    /// Name of the forwarded type
    pub name: String,
    /// The forwarding target (`TypeDef` or `TypeRef`)
    pub target: Token,
    /// Declaring assembly of the alias
    pub assembly: Token,
}

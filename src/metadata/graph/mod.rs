//! The metadata graph arena.
//!
//! All metadata entities live in per-table vectors addressed by stable
//! [`Token`] handles (table id in the high byte, 1-based row in the low 24
//! bits). The graph is built once by a loader (or the [`builder`] in tests)
//! and is immutable during a marking run; the marking engine mutates only the
//! annotation store.
//!
//! Reference tokens (`TypeRef`, `MemberRef`) resolve through the graph to
//! definition tokens; a failed resolution is a first-class `None` outcome
//! that the engine maps to its resolution-failure policy.

mod builder;
mod nodes;

pub use builder::{
    CoreTypes, FieldBuilder, GenericParamBuilder, GraphBuilder, MethodBuilder, TypeBuilder,
};
pub use nodes::{
    AssemblyNode, AttributeArgument, CustomAttributeNode, EventNode, ExceptionHandler,
    ExportedTypeNode, FieldNode, GenericParamNode, InterfaceImplNode, MarshalSpec, MemberRefNode,
    MethodBody, MethodNode, NamedArgument, PInvokeInfo, Parameter, PropertyNode, TypeNode,
    TypeRefNode,
};

use std::collections::HashMap;

use crate::metadata::tables::TableId;
use crate::metadata::token::Token;
use crate::metadata::wellknown;

/// The arena holding every metadata node of the loaded assemblies.
#[derive(Debug, Default)]
pub struct MetadataGraph {
    pub(crate) assemblies: Vec<AssemblyNode>,
    pub(crate) type_refs: Vec<TypeRefNode>,
    pub(crate) types: Vec<TypeNode>,
    pub(crate) fields: Vec<FieldNode>,
    pub(crate) methods: Vec<MethodNode>,
    pub(crate) interface_impls: Vec<InterfaceImplNode>,
    pub(crate) member_refs: Vec<MemberRefNode>,
    pub(crate) custom_attributes: Vec<CustomAttributeNode>,
    pub(crate) events: Vec<EventNode>,
    pub(crate) properties: Vec<PropertyNode>,
    pub(crate) exported_types: Vec<ExportedTypeNode>,
    pub(crate) generic_params: Vec<GenericParamNode>,
    /// "Namespace.Name" to `TypeDef` token
    pub(crate) fullname_index: HashMap<String, Token>,
}

macro_rules! typed_accessor {
    ($name:ident, $try_name:ident, $field:ident, $node:ty, $table:expr) => {
        /// Returns the node addressed by `token`.
        ///
        /// # Panics
        ///
        /// Panics when the token does not address a live node of this table;
        /// callers use this only for tokens whose provenance guarantees the
        /// table.
        #[must_use]
        pub fn $name(&self, token: Token) -> &$node {
            self.$try_name(token)
                .unwrap_or_else(|| panic!("token {token} does not address a {:?} row", $table))
        }

        /// Returns the node addressed by `token`, or `None` when the token
        /// belongs to another table or is out of range.
        #[must_use]
        pub fn $try_name(&self, token: Token) -> Option<&$node> {
            if token.table_id() != Some($table) || token.is_null() {
                return None;
            }
            self.$field.get(token.slot())
        }
    };
}

impl MetadataGraph {
    typed_accessor!(assembly, try_assembly, assemblies, AssemblyNode, TableId::Assembly);
    typed_accessor!(type_node, try_type, types, TypeNode, TableId::TypeDef);
    typed_accessor!(type_ref, try_type_ref, type_refs, TypeRefNode, TableId::TypeRef);
    typed_accessor!(method, try_method, methods, MethodNode, TableId::MethodDef);
    typed_accessor!(field, try_field, fields, FieldNode, TableId::Field);
    typed_accessor!(property, try_property, properties, PropertyNode, TableId::Property);
    typed_accessor!(event, try_event, events, EventNode, TableId::Event);
    typed_accessor!(
        interface_impl,
        try_interface_impl,
        interface_impls,
        InterfaceImplNode,
        TableId::InterfaceImpl
    );
    typed_accessor!(
        member_ref,
        try_member_ref,
        member_refs,
        MemberRefNode,
        TableId::MemberRef
    );
    typed_accessor!(
        custom_attribute,
        try_custom_attribute,
        custom_attributes,
        CustomAttributeNode,
        TableId::CustomAttribute
    );
    typed_accessor!(
        generic_param,
        try_generic_param,
        generic_params,
        GenericParamNode,
        TableId::GenericParam
    );
    typed_accessor!(
        exported_type,
        try_exported_type,
        exported_types,
        ExportedTypeNode,
        TableId::ExportedType
    );

    /// Number of rows in the given table, for sizing annotation bitsets.
    #[must_use]
    pub fn table_len(&self, table: TableId) -> usize {
        match table {
            TableId::TypeRef => self.type_refs.len(),
            TableId::TypeDef => self.types.len(),
            TableId::Field => self.fields.len(),
            TableId::MethodDef => self.methods.len(),
            TableId::InterfaceImpl => self.interface_impls.len(),
            TableId::MemberRef => self.member_refs.len(),
            TableId::CustomAttribute => self.custom_attributes.len(),
            TableId::Event => self.events.len(),
            TableId::Property => self.properties.len(),
            TableId::Assembly => self.assemblies.len(),
            TableId::ExportedType => self.exported_types.len(),
            TableId::GenericParam => self.generic_params.len(),
        }
    }

    /// Iterates all assemblies.
    pub fn assemblies(&self) -> impl Iterator<Item = &AssemblyNode> {
        self.assemblies.iter()
    }

    /// Iterates all type definitions.
    pub fn types(&self) -> impl Iterator<Item = &TypeNode> {
        self.types.iter()
    }

    /// Iterates all method definitions.
    pub fn methods(&self) -> impl Iterator<Item = &MethodNode> {
        self.methods.iter()
    }

    /// Iterates all exported-type aliases.
    pub fn exported_types(&self) -> impl Iterator<Item = &ExportedTypeNode> {
        self.exported_types.iter()
    }

    /// Iterates all interface-implementation edges.
    pub fn interface_impls(&self) -> impl Iterator<Item = &InterfaceImplNode> {
        self.interface_impls.iter()
    }

    /// Resolves a type-shaped token (`TypeDef` or `TypeRef`) to a `TypeDef`
    /// token. `None` means the reference has no definition in the graph.
    #[must_use]
    pub fn resolve_type(&self, token: Token) -> Option<Token> {
        match token.table_id() {
            Some(TableId::TypeDef) => self.try_type(token).map(|t| t.token),
            Some(TableId::TypeRef) => self.try_type_ref(token).and_then(|r| r.resolved),
            _ => None,
        }
    }

    /// Resolves a method-shaped token (`MethodDef` or `MemberRef`) to a
    /// `MethodDef` token.
    #[must_use]
    pub fn resolve_method(&self, token: Token) -> Option<Token> {
        match token.table_id() {
            Some(TableId::MethodDef) => self.try_method(token).map(|m| m.token),
            Some(TableId::MemberRef) => self
                .try_member_ref(token)
                .and_then(|r| r.resolved)
                .filter(|t| t.table_id() == Some(TableId::MethodDef)),
            _ => None,
        }
    }

    /// Resolves a field-shaped token (`Field` or `MemberRef`) to a `Field`
    /// token.
    #[must_use]
    pub fn resolve_field(&self, token: Token) -> Option<Token> {
        match token.table_id() {
            Some(TableId::Field) => self.try_field(token).map(|f| f.token),
            Some(TableId::MemberRef) => self
                .try_member_ref(token)
                .and_then(|r| r.resolved)
                .filter(|t| t.table_id() == Some(TableId::Field)),
            _ => None,
        }
    }

    /// Looks up a type definition by namespace-qualified name.
    ///
    /// Accepts an optional assembly-qualified suffix (`"Ns.Name, Asm"`),
    /// which is ignored for lookup purposes: type names are unique across
    /// the graph.
    #[must_use]
    pub fn type_by_fullname(&self, full_name: &str) -> Option<Token> {
        let name = full_name.split(',').next().unwrap_or(full_name).trim();
        self.fullname_index.get(name).copied()
    }

    /// Resolved base type of a type definition.
    #[must_use]
    pub fn base_of(&self, type_token: Token) -> Option<Token> {
        self.try_type(type_token)
            .and_then(|t| t.base)
            .and_then(|b| self.resolve_type(b))
    }

    /// Whether `type_token` derives (transitively) from the type named
    /// `full_name`. The type itself does not count as its own subclass.
    #[must_use]
    pub fn is_subclass_of(&self, type_token: Token, full_name: &str) -> bool {
        let mut current = self.base_of(type_token);
        while let Some(base) = current {
            if self.type_node(base).full_name() == full_name {
                return true;
            }
            current = self.base_of(base);
        }
        false
    }

    /// Whether the type is a value type (derives from `System.ValueType`,
    /// including enums).
    #[must_use]
    pub fn is_value_type(&self, type_token: Token) -> bool {
        self.is_subclass_of(type_token, wellknown::VALUE_TYPE)
            || self.is_subclass_of(type_token, wellknown::ENUM)
    }

    /// Whether a type-shaped token names `System.Void`, without requiring
    /// resolution.
    #[must_use]
    pub fn is_void(&self, token: Token) -> bool {
        match token.table_id() {
            Some(TableId::TypeDef) => self
                .try_type(token)
                .is_some_and(|t| t.full_name() == wellknown::VOID),
            Some(TableId::TypeRef) => self
                .try_type_ref(token)
                .is_some_and(|t| t.full_name() == wellknown::VOID),
            _ => false,
        }
    }

    /// Whether the type is an enum.
    #[must_use]
    pub fn is_enum(&self, type_token: Token) -> bool {
        self.base_of(type_token)
            .is_some_and(|b| self.type_node(b).full_name() == wellknown::ENUM)
    }

    /// Whether the type derives from `System.MulticastDelegate`.
    #[must_use]
    pub fn is_delegate(&self, type_token: Token) -> bool {
        self.is_subclass_of(type_token, wellknown::MULTICAST_DELEGATE)
    }

    /// Whether the type is an event-source provider.
    #[must_use]
    pub fn is_event_source(&self, type_token: Token) -> bool {
        self.is_subclass_of(type_token, wellknown::EVENT_SOURCE)
    }

    /// `Namespace.Type::Method` rendering for diagnostics and errors.
    #[must_use]
    pub fn method_full_name(&self, method_token: Token) -> String {
        let method = self.method(method_token);
        let declaring = self.type_node(method.declaring);
        format!("{}::{}", declaring.full_name(), method.name)
    }

    /// The parameterless instance constructor of a type, if one exists.
    #[must_use]
    pub fn default_ctor(&self, type_token: Token) -> Option<Token> {
        self.try_type(type_token)?
            .methods
            .iter()
            .copied()
            .find(|&m| {
                let method = self.method(m);
                method.is_constructor() && method.params.is_empty()
            })
    }

    /// The static constructor of a type, if one exists.
    #[must_use]
    pub fn static_ctor(&self, type_token: Token) -> Option<Token> {
        self.try_type(type_token)?
            .methods
            .iter()
            .copied()
            .find(|&m| self.method(m).is_static_constructor())
    }

    /// Resolved attribute type of a custom attribute (the declaring type of
    /// its constructor).
    #[must_use]
    pub fn attribute_type_of(&self, attribute: &CustomAttributeNode) -> Option<Token> {
        let ctor = self.resolve_method(attribute.constructor)?;
        Some(self.method(ctor).declaring)
    }

    /// Name of the assembly declaring the given method, for error context.
    #[must_use]
    pub fn assembly_name_of_method(&self, method_token: Token) -> String {
        let method = self.method(method_token);
        let declaring = self.type_node(method.declaring);
        self.assembly(declaring.assembly).name.clone()
    }
}

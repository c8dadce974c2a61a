//! Programmatic construction of metadata graphs.
//!
//! A loader normally populates the arena from a binary; the builder provides
//! the same population path for synthetic assemblies, which is how the test
//! suite and benchmarks express marking scenarios. Builders hand out tokens
//! eagerly so cyclic shapes (a type referencing itself, mutually recursive
//! types) can be expressed naturally.

use crate::assembly::Instruction;
use crate::metadata::flags::{
    FieldAttributes, MethodAttributes, MethodImplAttributes, TypeAttributes,
};
use crate::metadata::graph::nodes::{
    AssemblyNode, AttributeArgument, CustomAttributeNode, EventNode, ExceptionHandler,
    ExportedTypeNode, FieldNode, GenericParamNode, InterfaceImplNode, MarshalSpec, MemberRefNode,
    MethodBody, MethodNode, PInvokeInfo, Parameter, PropertyNode, TypeNode, TypeRefNode,
};
use crate::metadata::graph::MetadataGraph;
use crate::metadata::tables::TableId;
use crate::metadata::token::Token;
use crate::metadata::wellknown;

/// Frequently used core types, defined once per builder on demand.
#[derive(Debug, Clone, Copy)]
pub struct CoreTypes {
    /// `System.Object`
    pub object: Token,
    /// `System.ValueType`
    pub value_type: Token,
    /// `System.Enum`
    pub enum_type: Token,
    /// `System.Void`
    pub void: Token,
    /// `System.String`
    pub string: Token,
    /// `System.Type`
    pub type_type: Token,
    /// `System.NotSupportedException`
    pub not_supported_exception: Token,
}

/// Builds a [`MetadataGraph`] incrementally.
#[derive(Debug)]
pub struct GraphBuilder {
    graph: MetadataGraph,
    current_assembly: Token,
}

impl GraphBuilder {
    /// Creates a builder with one initial assembly.
    #[must_use]
    pub fn new(assembly_name: &str) -> Self {
        let mut builder = GraphBuilder {
            graph: MetadataGraph::default(),
            current_assembly: Token::new(0),
        };
        builder.current_assembly = builder.add_assembly(assembly_name);
        builder
    }

    /// Adds another assembly and makes it current for subsequent definitions.
    pub fn add_assembly(&mut self, name: &str) -> Token {
        let token = Token::from_parts(TableId::Assembly, self.graph.assemblies.len() as u32 + 1);
        self.graph.assemblies.push(AssemblyNode {
            token,
            name: name.to_string(),
            module_type: None,
            custom_attributes: Vec::new(),
            module_attributes: Vec::new(),
            exported_types: Vec::new(),
            types: Vec::new(),
        });
        self.current_assembly = token;
        token
    }

    /// The assembly definitions currently target.
    #[must_use]
    pub fn current_assembly(&self) -> Token {
        self.current_assembly
    }

    /// Starts a class definition in the current assembly.
    pub fn class(&mut self, namespace: &str, name: &str) -> TypeBuilder<'_> {
        TypeBuilder::new(self, namespace, name, TypeAttributes::empty())
    }

    /// Starts an interface definition in the current assembly.
    pub fn interface(&mut self, namespace: &str, name: &str) -> TypeBuilder<'_> {
        TypeBuilder::new(
            self,
            namespace,
            name,
            TypeAttributes::INTERFACE | TypeAttributes::ABSTRACT,
        )
    }

    /// Defines a minimal type with no members and no base, typically a
    /// runtime type another definition needs to reference.
    pub fn external_type(&mut self, namespace: &str, name: &str) -> Token {
        let full = if namespace.is_empty() {
            name.to_string()
        } else {
            format!("{namespace}.{name}")
        };
        if let Some(existing) = self.graph.fullname_index.get(&full) {
            return *existing;
        }
        self.class(namespace, name).define()
    }

    /// Defines (or returns) the common core types.
    pub fn core_types(&mut self) -> CoreTypes {
        let object = self.external_type("System", "Object");
        let value_type = if let Some(t) = self.graph.type_by_fullname(wellknown::VALUE_TYPE) {
            t
        } else {
            self.class("System", "ValueType").base(object).define()
        };
        let enum_type = if let Some(t) = self.graph.type_by_fullname(wellknown::ENUM) {
            t
        } else {
            self.class("System", "Enum").base(value_type).define()
        };
        let void = self.external_type("System", "Void");
        let string = self.external_type("System", "String");
        let type_type = self.external_type("System", "Type");
        let not_supported_exception =
            if let Some(t) = self.graph.type_by_fullname(wellknown::NOT_SUPPORTED_EXCEPTION) {
                t
            } else {
                let exception = self.external_type("System", "Exception");
                let token = self
                    .class("System", "NotSupportedException")
                    .base(exception)
                    .define();
                self.method(token, ".ctor").param(string).define();
                token
            };
        CoreTypes {
            object,
            value_type,
            enum_type,
            void,
            string,
            type_type,
            not_supported_exception,
        }
    }

    /// Defines the synthetic `<Module>` type for the current assembly.
    pub fn module_type(&mut self) -> Token {
        if let Some(existing) = self
            .graph
            .assembly(self.current_assembly)
            .module_type
        {
            return existing;
        }
        let token = self.class("", "<Module>").define();
        let assembly = self.current_assembly;
        self.graph.assemblies[assembly.slot()].module_type = Some(token);
        token
    }

    /// Starts a method definition on `declaring`.
    pub fn method(&mut self, declaring: Token, name: &str) -> MethodBuilder<'_> {
        MethodBuilder::new(self, declaring, name)
    }

    /// Defines a field on `declaring`.
    pub fn field(&mut self, declaring: Token, name: &str, field_type: Token) -> FieldBuilder<'_> {
        FieldBuilder::new(self, declaring, name, field_type)
    }

    /// Defines a property on `declaring` wired to existing accessors.
    pub fn property(
        &mut self,
        declaring: Token,
        name: &str,
        getter: Option<Token>,
        setter: Option<Token>,
    ) -> Token {
        let token = Token::from_parts(TableId::Property, self.graph.properties.len() as u32 + 1);
        self.graph.properties.push(PropertyNode {
            token,
            name: name.to_string(),
            declaring,
            getter,
            setter,
            custom_attributes: Vec::new(),
        });
        self.graph.types[declaring.slot()].properties.push(token);
        token
    }

    /// Defines an event on `declaring` wired to existing accessors.
    pub fn event(
        &mut self,
        declaring: Token,
        name: &str,
        add_method: Option<Token>,
        remove_method: Option<Token>,
    ) -> Token {
        let token = Token::from_parts(TableId::Event, self.graph.events.len() as u32 + 1);
        self.graph.events.push(EventNode {
            token,
            name: name.to_string(),
            declaring,
            add_method,
            remove_method,
            raise_method: None,
            custom_attributes: Vec::new(),
        });
        self.graph.types[declaring.slot()].events.push(token);
        token
    }

    /// Adds an interface-implementation edge to `implementing`.
    pub fn interface_impl(&mut self, implementing: Token, interface: Token) -> Token {
        let token = Token::from_parts(
            TableId::InterfaceImpl,
            self.graph.interface_impls.len() as u32 + 1,
        );
        self.graph.interface_impls.push(InterfaceImplNode {
            token,
            implementing,
            interface,
            custom_attributes: Vec::new(),
        });
        self.graph.types[implementing.slot()].interfaces.push(token);
        token
    }

    /// Defines a generic parameter on a type or method.
    pub fn generic_param(&mut self, owner: Token, name: &str) -> GenericParamBuilder<'_> {
        GenericParamBuilder::new(self, owner, name)
    }

    /// Defines an unresolved (or pre-resolved) external type reference.
    pub fn type_ref(&mut self, namespace: &str, name: &str, resolved: Option<Token>) -> Token {
        let token = Token::from_parts(TableId::TypeRef, self.graph.type_refs.len() as u32 + 1);
        self.graph.type_refs.push(TypeRefNode {
            token,
            namespace: namespace.to_string(),
            name: name.to_string(),
            resolved,
        });
        token
    }

    /// Defines an external member reference.
    pub fn member_ref(&mut self, declaring: Token, name: &str, resolved: Option<Token>) -> Token {
        let token = Token::from_parts(TableId::MemberRef, self.graph.member_refs.len() as u32 + 1);
        self.graph.member_refs.push(MemberRefNode {
            token,
            name: name.to_string(),
            declaring,
            resolved,
        });
        token
    }

    /// Defines a custom attribute instance.
    pub fn attribute(&mut self, constructor: Token, args: Vec<AttributeArgument>) -> Token {
        let token = Token::from_parts(
            TableId::CustomAttribute,
            self.graph.custom_attributes.len() as u32 + 1,
        );
        self.graph.custom_attributes.push(CustomAttributeNode {
            token,
            constructor,
            args,
            named_args: Vec::new(),
        });
        token
    }

    /// Attaches a custom attribute to a type, method, field, property, event
    /// or interface implementation.
    pub fn attach_attribute(&mut self, provider: Token, attribute: Token) {
        match provider.table_id() {
            Some(TableId::TypeDef) => self.graph.types[provider.slot()]
                .custom_attributes
                .push(attribute),
            Some(TableId::MethodDef) => self.graph.methods[provider.slot()]
                .custom_attributes
                .push(attribute),
            Some(TableId::Field) => self.graph.fields[provider.slot()]
                .custom_attributes
                .push(attribute),
            Some(TableId::Property) => self.graph.properties[provider.slot()]
                .custom_attributes
                .push(attribute),
            Some(TableId::Event) => self.graph.events[provider.slot()]
                .custom_attributes
                .push(attribute),
            Some(TableId::InterfaceImpl) => self.graph.interface_impls[provider.slot()]
                .custom_attributes
                .push(attribute),
            Some(TableId::GenericParam) => self.graph.generic_params[provider.slot()]
                .custom_attributes
                .push(attribute),
            _ => panic!("cannot attach attribute to {provider}"),
        }
    }

    /// Attaches an assembly-level custom attribute.
    pub fn attach_assembly_attribute(&mut self, assembly: Token, attribute: Token) {
        self.graph.assemblies[assembly.slot()]
            .custom_attributes
            .push(attribute);
    }

    /// Attaches a module-level custom attribute.
    pub fn attach_module_attribute(&mut self, assembly: Token, attribute: Token) {
        self.graph.assemblies[assembly.slot()]
            .module_attributes
            .push(attribute);
    }

    /// Attaches a security declaration (modeled as an attribute) to a type or
    /// method.
    pub fn attach_security(&mut self, provider: Token, attribute: Token) {
        match provider.table_id() {
            Some(TableId::TypeDef) => self.graph.types[provider.slot()].security.push(attribute),
            Some(TableId::MethodDef) => {
                self.graph.methods[provider.slot()].security.push(attribute);
            }
            _ => panic!("cannot attach security declaration to {provider}"),
        }
    }

    /// Defines an exported (forwarded) type alias on the current assembly.
    pub fn exported_type(&mut self, namespace: &str, name: &str, target: Token) -> Token {
        let token = Token::from_parts(
            TableId::ExportedType,
            self.graph.exported_types.len() as u32 + 1,
        );
        let assembly = self.current_assembly;
        self.graph.exported_types.push(ExportedTypeNode {
            token,
            namespace: namespace.to_string(),
            name: name.to_string(),
            target,
            assembly,
        });
        self.graph.assemblies[assembly.slot()]
            .exported_types
            .push(token);
        token
    }

    /// Defines an instantiated generic shape of `definition`.
    ///
    /// Instantiations are anonymous: they keep the definition's name but are
    /// not registered in the name index.
    pub fn generic_instance(&mut self, definition: Token, args: Vec<Token>) -> Token {
        let (namespace, name, flags, assembly, base, generic_params) = {
            let def = &self.graph.types[definition.slot()];
            (
                def.namespace.clone(),
                def.name.clone(),
                def.flags,
                def.assembly,
                def.base,
                def.generic_params.clone(),
            )
        };
        let token = Token::from_parts(TableId::TypeDef, self.graph.types.len() as u32 + 1);
        self.graph.types.push(TypeNode {
            token,
            namespace,
            name,
            flags,
            assembly,
            base,
            declaring: None,
            fields: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            interfaces: Vec::new(),
            nested: Vec::new(),
            generic_params,
            generic_args: args,
            custom_attributes: Vec::new(),
            security: Vec::new(),
        });
        self.graph.assemblies[assembly.slot()].types.push(token);
        token
    }

    /// Finalizes the graph.
    #[must_use]
    pub fn build(self) -> MetadataGraph {
        self.graph
    }
}

/// Staged state for a type definition.
#[derive(Debug)]
pub struct TypeBuilder<'a> {
    builder: &'a mut GraphBuilder,
    namespace: String,
    name: String,
    flags: TypeAttributes,
    base: Option<Token>,
    declaring: Option<Token>,
}

impl<'a> TypeBuilder<'a> {
    fn new(
        builder: &'a mut GraphBuilder,
        namespace: &str,
        name: &str,
        flags: TypeAttributes,
    ) -> Self {
        TypeBuilder {
            builder,
            namespace: namespace.to_string(),
            name: name.to_string(),
            flags,
            base: None,
            declaring: None,
        }
    }

    /// Sets the base type.
    #[must_use]
    pub fn base(mut self, base: Token) -> Self {
        self.base = Some(base);
        self
    }

    /// Adds attribute flags.
    #[must_use]
    pub fn flags(mut self, flags: TypeAttributes) -> Self {
        self.flags |= flags;
        self
    }

    /// Marks the type serializable.
    #[must_use]
    pub fn serializable(self) -> Self {
        self.flags(TypeAttributes::SERIALIZABLE)
    }

    /// Marks the type sequential-layout.
    #[must_use]
    pub fn sequential_layout(self) -> Self {
        self.flags(TypeAttributes::SEQUENTIAL_LAYOUT)
    }

    /// Marks the type COM-imported.
    #[must_use]
    pub fn com_import(self) -> Self {
        self.flags(TypeAttributes::IMPORT)
    }

    /// Nests the type inside `declaring`.
    #[must_use]
    pub fn nested_in(mut self, declaring: Token) -> Self {
        self.declaring = Some(declaring);
        self
    }

    /// Inserts the type into the graph and returns its token.
    pub fn define(self) -> Token {
        let token = Token::from_parts(TableId::TypeDef, self.builder.graph.types.len() as u32 + 1);
        let assembly = self.builder.current_assembly;
        let full_name = if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        };
        self.builder.graph.types.push(TypeNode {
            token,
            namespace: self.namespace,
            name: self.name,
            flags: self.flags,
            assembly,
            base: self.base,
            declaring: self.declaring,
            fields: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            interfaces: Vec::new(),
            nested: Vec::new(),
            generic_params: Vec::new(),
            generic_args: Vec::new(),
            custom_attributes: Vec::new(),
            security: Vec::new(),
        });
        self.builder.graph.assemblies[assembly.slot()].types.push(token);
        if let Some(declaring) = self.declaring {
            self.builder.graph.types[declaring.slot()].nested.push(token);
        }
        self.builder
            .graph
            .fullname_index
            .entry(full_name)
            .or_insert(token);
        token
    }
}

/// Staged state for a method definition.
#[derive(Debug)]
pub struct MethodBuilder<'a> {
    builder: &'a mut GraphBuilder,
    declaring: Token,
    name: String,
    flags: MethodAttributes,
    impl_flags: MethodImplAttributes,
    params: Vec<Parameter>,
    return_type: Option<Token>,
    return_marshal: Option<MarshalSpec>,
    overrides: Vec<Token>,
    body: Option<MethodBody>,
    pinvoke: Option<PInvokeInfo>,
}

impl<'a> MethodBuilder<'a> {
    fn new(builder: &'a mut GraphBuilder, declaring: Token, name: &str) -> Self {
        MethodBuilder {
            builder,
            declaring,
            name: name.to_string(),
            flags: MethodAttributes::empty(),
            impl_flags: MethodImplAttributes::empty(),
            params: Vec::new(),
            return_type: None,
            return_marshal: None,
            overrides: Vec::new(),
            body: None,
            pinvoke: None,
        }
    }

    /// Marks the method static.
    #[must_use]
    pub fn static_(mut self) -> Self {
        self.flags |= MethodAttributes::STATIC;
        self
    }

    /// Marks the method virtual.
    #[must_use]
    pub fn virtual_(mut self) -> Self {
        self.flags |= MethodAttributes::VIRTUAL;
        self
    }

    /// Marks the method abstract (implies virtual).
    #[must_use]
    pub fn abstract_(mut self) -> Self {
        self.flags |= MethodAttributes::ABSTRACT | MethodAttributes::VIRTUAL;
        self
    }

    /// Marks the method public.
    #[must_use]
    pub fn public(mut self) -> Self {
        self.flags |= MethodAttributes::PUBLIC;
        self
    }

    /// Marks the method private.
    #[must_use]
    pub fn private(mut self) -> Self {
        self.flags |= MethodAttributes::PRIVATE;
        self
    }

    /// Adds raw attribute flags.
    #[must_use]
    pub fn flags(mut self, flags: MethodAttributes) -> Self {
        self.flags |= flags;
        self
    }

    /// Marks the method as an internal call.
    #[must_use]
    pub fn internal_call(mut self) -> Self {
        self.impl_flags |= MethodImplAttributes::INTERNAL_CALL;
        self
    }

    /// Adds a parameter of the given type.
    #[must_use]
    pub fn param(mut self, ty: Token) -> Self {
        let name = format!("arg{}", self.params.len());
        self.params.push(Parameter {
            name,
            ty,
            by_ref: false,
            custom_attributes: Vec::new(),
            marshal: None,
        });
        self
    }

    /// Adds a by-reference parameter of the given type.
    #[must_use]
    pub fn param_by_ref(mut self, ty: Token) -> Self {
        let name = format!("arg{}", self.params.len());
        self.params.push(Parameter {
            name,
            ty,
            by_ref: true,
            custom_attributes: Vec::new(),
            marshal: None,
        });
        self
    }

    /// Adds a parameter carrying a marshaling descriptor.
    #[must_use]
    pub fn param_marshaled(mut self, ty: Token, native: &str) -> Self {
        let name = format!("arg{}", self.params.len());
        self.params.push(Parameter {
            name,
            ty,
            by_ref: false,
            custom_attributes: Vec::new(),
            marshal: Some(MarshalSpec {
                native: native.to_string(),
                custom_marshaler: None,
            }),
        });
        self
    }

    /// Sets the return type (defaults to `System.Void`).
    #[must_use]
    pub fn returns(mut self, ty: Token) -> Self {
        self.return_type = Some(ty);
        self
    }

    /// Adds an explicit `.override` declaration.
    #[must_use]
    pub fn explicit_override(mut self, target: Token) -> Self {
        self.overrides.push(target);
        self
    }

    /// Attaches a body with the given instruction stream.
    #[must_use]
    pub fn body(mut self, instructions: Vec<Instruction>) -> Self {
        let instructions = number_offsets(instructions);
        match &mut self.body {
            Some(existing) => existing.instructions = instructions,
            None => {
                self.body = Some(MethodBody {
                    locals: Vec::new(),
                    instructions,
                    handlers: Vec::new(),
                });
            }
        }
        self
    }

    /// Declares local variable types for the body.
    #[must_use]
    pub fn locals(mut self, locals: Vec<Token>) -> Self {
        match &mut self.body {
            Some(existing) => existing.locals = locals,
            None => {
                self.body = Some(MethodBody {
                    locals,
                    instructions: Vec::new(),
                    handlers: Vec::new(),
                });
            }
        }
        self
    }

    /// Adds a catch handler for the given exception type.
    #[must_use]
    pub fn catch_handler(mut self, catch_type: Option<Token>) -> Self {
        let handler = ExceptionHandler { catch_type };
        match &mut self.body {
            Some(existing) => existing.handlers.push(handler),
            None => {
                self.body = Some(MethodBody {
                    locals: Vec::new(),
                    instructions: Vec::new(),
                    handlers: vec![handler],
                });
            }
        }
        self
    }

    /// Marks the method as a platform-invoke entry.
    #[must_use]
    pub fn pinvoke(mut self, module: &str, entry_point: &str) -> Self {
        self.flags |= MethodAttributes::PINVOKE_IMPL;
        self.pinvoke = Some(PInvokeInfo {
            module: module.to_string(),
            entry_point: entry_point.to_string(),
        });
        self
    }

    /// Inserts the method into the graph and returns its token.
    pub fn define(self) -> Token {
        let return_type = match self.return_type {
            Some(ty) => ty,
            None => self.builder.external_type("System", "Void"),
        };
        let token =
            Token::from_parts(TableId::MethodDef, self.builder.graph.methods.len() as u32 + 1);
        self.builder.graph.methods.push(MethodNode {
            token,
            name: self.name,
            flags: self.flags,
            impl_flags: self.impl_flags,
            declaring: self.declaring,
            params: self.params,
            return_type,
            return_attributes: Vec::new(),
            return_marshal: self.return_marshal,
            generic_params: Vec::new(),
            overrides: self.overrides,
            custom_attributes: Vec::new(),
            security: Vec::new(),
            body: self.body,
            pinvoke: self.pinvoke,
        });
        self.builder.graph.types[self.declaring.slot()]
            .methods
            .push(token);
        token
    }
}

/// Staged state for a field definition.
#[derive(Debug)]
pub struct FieldBuilder<'a> {
    builder: &'a mut GraphBuilder,
    declaring: Token,
    name: String,
    field_type: Token,
    flags: FieldAttributes,
    marshal: Option<MarshalSpec>,
}

impl<'a> FieldBuilder<'a> {
    fn new(builder: &'a mut GraphBuilder, declaring: Token, name: &str, field_type: Token) -> Self {
        FieldBuilder {
            builder,
            declaring,
            name: name.to_string(),
            field_type,
            flags: FieldAttributes::empty(),
            marshal: None,
        }
    }

    /// Marks the field static.
    #[must_use]
    pub fn static_(mut self) -> Self {
        self.flags |= FieldAttributes::STATIC;
        self
    }

    /// Marks the field public.
    #[must_use]
    pub fn public(mut self) -> Self {
        self.flags |= FieldAttributes::PUBLIC;
        self
    }

    /// Attaches a marshaling descriptor.
    #[must_use]
    pub fn marshaled(mut self, native: &str, custom_marshaler: Option<Token>) -> Self {
        self.marshal = Some(MarshalSpec {
            native: native.to_string(),
            custom_marshaler,
        });
        self
    }

    /// Inserts the field into the graph and returns its token.
    pub fn define(self) -> Token {
        let token = Token::from_parts(TableId::Field, self.builder.graph.fields.len() as u32 + 1);
        self.builder.graph.fields.push(FieldNode {
            token,
            name: self.name,
            flags: self.flags,
            declaring: self.declaring,
            field_type: self.field_type,
            custom_attributes: Vec::new(),
            marshal: self.marshal,
        });
        self.builder.graph.types[self.declaring.slot()]
            .fields
            .push(token);
        token
    }
}

/// Staged state for a generic parameter definition.
#[derive(Debug)]
pub struct GenericParamBuilder<'a> {
    builder: &'a mut GraphBuilder,
    owner: Token,
    name: String,
    constraints: Vec<Token>,
    has_default_ctor_constraint: bool,
}

impl<'a> GenericParamBuilder<'a> {
    fn new(builder: &'a mut GraphBuilder, owner: Token, name: &str) -> Self {
        GenericParamBuilder {
            builder,
            owner,
            name: name.to_string(),
            constraints: Vec::new(),
            has_default_ctor_constraint: false,
        }
    }

    /// Adds a constraint type.
    #[must_use]
    pub fn constraint(mut self, ty: Token) -> Self {
        self.constraints.push(ty);
        self
    }

    /// Adds a default-constructor (`new()`) constraint.
    #[must_use]
    pub fn default_ctor_constraint(mut self) -> Self {
        self.has_default_ctor_constraint = true;
        self
    }

    /// Inserts the generic parameter and returns its token.
    pub fn define(self) -> Token {
        let token = Token::from_parts(
            TableId::GenericParam,
            self.builder.graph.generic_params.len() as u32 + 1,
        );
        self.builder.graph.generic_params.push(GenericParamNode {
            token,
            name: self.name,
            owner: self.owner,
            constraints: self.constraints,
            has_default_ctor_constraint: self.has_default_ctor_constraint,
            custom_attributes: Vec::new(),
        });
        match self.owner.table_id() {
            Some(TableId::TypeDef) => self.builder.graph.types[self.owner.slot()]
                .generic_params
                .push(token),
            Some(TableId::MethodDef) => self.builder.graph.methods[self.owner.slot()]
                .generic_params
                .push(token),
            _ => panic!("generic parameter owner must be a type or method"),
        }
        token
    }
}

fn number_offsets(mut instructions: Vec<Instruction>) -> Vec<Instruction> {
    for (index, instruction) in instructions.iter_mut().enumerate() {
        instruction.offset = index as u32;
    }
    instructions
}

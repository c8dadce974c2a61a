//! Structural marking rules for types.

use crate::annotations::{DependencyInfo, DependencyKind, TypePreserve};
use crate::mark::MarkStep;
use crate::metadata::diagnostics::DiagnosticCategory;
use crate::metadata::token::Token;
use crate::metadata::wellknown;
use crate::Result;

impl MarkStep<'_> {
    /// Marks a type-shaped reference and runs its structural closure once.
    ///
    /// Returns the resolved definition token, or `None` when the reference
    /// was dropped under the resolution policy.
    pub(crate) fn mark_type(
        &mut self,
        type_ref: Token,
        info: DependencyInfo,
    ) -> Result<Option<Token>> {
        let Some(type_token) = self.try_resolve_type(type_ref, "type reference")? else {
            return Ok(None);
        };

        self.annotations.mark(type_token, info);
        if !self.annotations.set_processed(type_token) {
            return Ok(Some(type_token));
        }

        self.scope.push(type_token);
        let result = self.process_type(type_token);
        self.scope.pop(type_token);
        result?;
        Ok(Some(type_token))
    }

    fn process_type(&mut self, type_token: Token) -> Result<()> {
        let ty = self.graph.type_node(type_token);

        // Scope: the declaring assembly is needed by anything in it.
        self.annotations.mark(
            ty.assembly,
            DependencyInfo::new(DependencyKind::ScopeOfType, type_token),
        );

        if let Some(base) = ty.base {
            self.mark_type(base, DependencyInfo::new(DependencyKind::BaseType, type_token))?;
        }
        // Nesting is transitive: the enclosing type recurses into its own
        // declaring type when marked.
        if let Some(declaring) = ty.declaring {
            self.mark_type(
                declaring,
                DependencyInfo::new(DependencyKind::DeclaringType, type_token),
            )?;
        }

        for &argument in &ty.generic_args {
            self.mark_type(
                argument,
                DependencyInfo::new(DependencyKind::GenericArgument, type_token),
            )?;
        }
        self.mark_generic_argument_constraints(type_token)?;

        self.mark_custom_attributes_of(type_token, &ty.custom_attributes)?;
        self.mark_security_declarations(type_token, &ty.security)?;
        for &generic_param in &ty.generic_params {
            self.mark_generic_parameter(generic_param)?;
        }

        if self.graph.is_delegate(type_token) {
            // Delegates are instantiated by the runtime without visible
            // constructor calls; their whole method set stays.
            for &method in &ty.methods {
                self.enqueue_method(
                    method,
                    DependencyInfo::new(DependencyKind::MethodForSpecialType, type_token),
                );
            }
        }

        if ty.is_serializable() {
            self.mark_serializable(type_token)?;
        }

        if self.graph.is_event_source(type_token) {
            self.mark_event_source_provider_groups(type_token)?;
        }

        // Layout-dependent types cannot have fields removed safely; value
        // types (including enums) always keep theirs.
        if self.graph.is_value_type(type_token) || !ty.flags.is_auto_layout() {
            self.mark_fields_of(type_token, true)?;
        }

        if let Some(preserve) = self.annotations.preserve(type_token) {
            self.apply_preserve(type_token, preserve)?;
        }
        self.deliver_preserved_methods(type_token)?;

        if ty.is_interface()
            || self.graph.is_value_type(type_token)
            || self.is_fully_preserved(type_token)
            || self.is_runtime_instantiated(type_token)
        {
            self.mark_requirements_for_instantiated_type(type_token)?;
        }

        if !ty.interfaces.is_empty() {
            self.types_with_interfaces.push(type_token);
        }

        Ok(())
    }

    /// Types the runtime constructs from native code; instantiation analysis
    /// never sees a constructor call for them.
    fn is_runtime_instantiated(&self, type_token: Token) -> bool {
        let full_name = self.graph.type_node(type_token).full_name();
        wellknown::RUNTIME_INSTANTIATED_TYPES
            .iter()
            .any(|&name| name == full_name)
    }

    /// Flags the type instantiated and marks what a live instance requires.
    pub(crate) fn mark_requirements_for_instantiated_type(
        &mut self,
        type_token: Token,
    ) -> Result<()> {
        if self.annotations.is_instantiated(type_token) {
            return Ok(());
        }
        self.annotations.mark_instantiated(type_token);

        // An instance makes the used interface implementations reachable; the
        // scheduler sweep picks up interfaces that become used later.
        self.mark_interface_implementations_conditional(type_token)?;
        Ok(())
    }

    /// Generic arguments paired with a `new()`-constrained parameter
    /// contribute their default constructor.
    fn mark_generic_argument_constraints(&mut self, type_token: Token) -> Result<()> {
        let ty = self.graph.type_node(type_token);
        for (&param, &argument) in ty.generic_params.iter().zip(ty.generic_args.iter()) {
            if !self.graph.generic_param(param).has_default_ctor_constraint {
                continue;
            }
            let Some(argument_type) = self.try_resolve_type(argument, "generic argument")? else {
                continue;
            };
            if let Some(ctor) = self.graph.default_ctor(argument_type) {
                self.enqueue_method(
                    ctor,
                    DependencyInfo::new(DependencyKind::DefaultCtorConstraint, type_token),
                );
            }
        }
        Ok(())
    }

    pub(crate) fn mark_generic_parameter(&mut self, param: Token) -> Result<()> {
        self.annotations.mark(
            param,
            DependencyInfo::new(DependencyKind::GenericParameter, param),
        );
        if !self.annotations.set_processed(param) {
            return Ok(());
        }
        let node = self.graph.generic_param(param);
        self.mark_custom_attributes_of(param, &node.custom_attributes)?;
        for &constraint in &node.constraints {
            self.mark_type(
                constraint,
                DependencyInfo::new(DependencyKind::GenericParameter, param),
            )?;
        }
        Ok(())
    }

    /// Serialization infrastructure constructs instances reflectively and
    /// invokes callback methods by attribute.
    fn mark_serializable(&mut self, type_token: Token) -> Result<()> {
        if let Some(ctor) = self.graph.default_ctor(type_token) {
            self.enqueue_method(
                ctor,
                DependencyInfo::new(DependencyKind::Serialization, type_token),
            );
        }
        let methods = &self.graph.type_node(type_token).methods;
        for &method in methods {
            let node = self.graph.method(method);
            if node.params.len() != 1 {
                continue;
            }
            if self.has_serialization_callback_attribute(method) {
                self.enqueue_method(
                    method,
                    DependencyInfo::new(DependencyKind::Serialization, type_token),
                );
            }
        }
        Ok(())
    }

    fn has_serialization_callback_attribute(&self, method: Token) -> bool {
        self.graph
            .method(method)
            .custom_attributes
            .iter()
            .any(|&attribute| {
                let node = self.graph.custom_attribute(attribute);
                self.graph
                    .attribute_type_of(node)
                    .map(|t| self.graph.type_node(t).full_name())
                    .is_some_and(|name| {
                        wellknown::SERIALIZATION_CALLBACK_ATTRIBUTES.contains(&name.as_str())
                    })
            })
    }

    /// The tracing runtime reads the static fields of `Keywords`/`Tasks`/
    /// `Opcodes` groups nested in an event-source provider.
    fn mark_event_source_provider_groups(&mut self, type_token: Token) -> Result<()> {
        let nested: Vec<Token> = self
            .graph
            .type_node(type_token)
            .nested
            .iter()
            .copied()
            .filter(|&n| {
                let name = &self.graph.type_node(n).name;
                wellknown::EVENT_SOURCE_PROVIDER_GROUPS.contains(&name.as_str())
            })
            .collect();
        for group in nested {
            self.mark_type(
                group,
                DependencyInfo::new(DependencyKind::EventSourceProviderField, type_token),
            )?;
            let fields: Vec<Token> = self
                .graph
                .type_node(group)
                .fields
                .iter()
                .copied()
                .filter(|&f| self.graph.field(f).is_static())
                .collect();
            for field in fields {
                self.mark_field(
                    field,
                    DependencyInfo::new(DependencyKind::EventSourceProviderField, group),
                )?;
            }
        }
        Ok(())
    }

    /// Marks the fields of a type, optionally including statics.
    pub(crate) fn mark_fields_of(&mut self, type_token: Token, include_static: bool) -> Result<()> {
        let fields = &self.graph.type_node(type_token).fields;
        for &field in fields {
            if !include_static && self.graph.field(field).is_static() {
                continue;
            }
            self.mark_field(
                field,
                DependencyInfo::new(DependencyKind::MemberOfType, type_token),
            )?;
        }
        Ok(())
    }

    /// Marks a field-shaped reference and runs its structural closure once.
    pub(crate) fn mark_field_ref(
        &mut self,
        field_ref: Token,
        info: DependencyInfo,
    ) -> Result<Option<Token>> {
        let Some(field) = self.try_resolve_field(field_ref, "field reference")? else {
            return Ok(None);
        };
        self.mark_field(field, info)?;
        Ok(Some(field))
    }

    pub(crate) fn mark_field(&mut self, field: Token, info: DependencyInfo) -> Result<()> {
        self.annotations.mark(field, info);
        if !self.annotations.set_processed(field) {
            return Ok(());
        }

        let node = self.graph.field(field);
        let declaring = node.declaring;
        self.mark_type(
            declaring,
            DependencyInfo::new(DependencyKind::DeclaringType, field),
        )?;
        self.mark_type(
            node.field_type,
            DependencyInfo::new(DependencyKind::FieldType, field),
        )?;
        self.mark_custom_attributes_of(field, &node.custom_attributes)?;
        if let Some(marshal) = &node.marshal {
            if let Some(marshaler) = marshal.custom_marshaler {
                self.mark_type(
                    marshaler,
                    DependencyInfo::new(DependencyKind::InteropShape, field),
                )?;
            }
        }

        // Static state must be initialized if any field of the type lives on.
        if !self.annotations.is_cctor_exempt(declaring) {
            if let Some(cctor) = self.graph.static_ctor(declaring) {
                self.enqueue_method(
                    cctor,
                    DependencyInfo::new(DependencyKind::CctorForField, field),
                );
            }
        }
        Ok(())
    }

    fn apply_preserve(&mut self, type_token: Token, preserve: TypePreserve) -> Result<()> {
        if self.annotations.preserve_was_duplicated(type_token) {
            self.diagnostics.warning(
                DiagnosticCategory::Preserve,
                format!(
                    "Duplicate preserve of '{}'",
                    self.graph.type_node(type_token).full_name()
                ),
            );
        }
        let (fields, methods) = match preserve {
            TypePreserve::Nothing => (false, false),
            TypePreserve::Fields => (true, false),
            TypePreserve::Methods => (false, true),
            TypePreserve::All => (true, true),
        };
        if fields {
            self.mark_fields_of(type_token, true)?;
        }
        if methods {
            let members = self.graph.type_node(type_token).methods.clone();
            for method in members {
                self.enqueue_method(
                    method,
                    DependencyInfo::new(DependencyKind::TypePreserve, type_token),
                );
            }
        }
        Ok(())
    }

    /// Delivers the preserved-method list anchored on a marked node.
    pub(crate) fn deliver_preserved_methods(&mut self, anchor: Token) -> Result<()> {
        let Some(methods) = self.annotations.preserved_methods_of(anchor) else {
            return Ok(());
        };
        let methods: Vec<Token> = methods.to_vec();
        for method in methods {
            self.enqueue_method(
                method,
                DependencyInfo::new(DependencyKind::PreservedMethod, anchor),
            );
        }
        Ok(())
    }

    /// Marks property metadata (the accessors are marked independently by
    /// whoever reaches them).
    pub(crate) fn mark_property(&mut self, property: Token, info: DependencyInfo) -> Result<()> {
        self.annotations.mark(property, info);
        if !self.annotations.set_processed(property) {
            return Ok(());
        }
        let attributes = self.graph.property(property).custom_attributes.clone();
        self.mark_custom_attributes_of(property, &attributes)?;
        Ok(())
    }

    /// Marks event metadata and its accessors.
    pub(crate) fn mark_event(&mut self, event: Token, info: DependencyInfo) -> Result<()> {
        self.annotations.mark(event, info);
        if !self.annotations.set_processed(event) {
            return Ok(());
        }
        let node = self.graph.event(event);
        let accessors = [node.add_method, node.remove_method, node.raise_method];
        let attributes = node.custom_attributes.clone();
        self.mark_custom_attributes_of(event, &attributes)?;
        for accessor in accessors.into_iter().flatten() {
            self.enqueue_method(
                accessor,
                DependencyInfo::new(DependencyKind::MemberOfType, event),
            );
        }
        Ok(())
    }
}

//! Structural marking rules for methods.

use crate::annotations::{DependencyInfo, DependencyKind, MethodAction};
use crate::mark::MarkStep;
use crate::metadata::token::Token;
use crate::metadata::wellknown;
use crate::{Error, Result};

impl MarkStep<'_> {
    /// Marks a method-shaped reference and schedules its processing.
    pub(crate) fn mark_method_ref(
        &mut self,
        method_ref: Token,
        info: DependencyInfo,
    ) -> Result<Option<Token>> {
        let Some(method) = self.try_resolve_method(method_ref, "method reference")? else {
            return Ok(None);
        };
        self.enqueue_method(method, info);
        Ok(Some(method))
    }

    /// Structurally processes one dequeued method.
    ///
    /// Any failure is wrapped with the method's full name and declaring
    /// assembly; a half-marked graph is not a valid downstream input, so the
    /// wrapped error aborts the run.
    pub(crate) fn process_method(&mut self, method: Token) -> Result<()> {
        if !self.annotations.set_processed(method) {
            return Ok(());
        }

        self.scope.push(method);
        let result = self.process_method_inner(method);
        self.scope.pop(method);

        result.map_err(|source| Error::MethodProcessing {
            method: self.graph.method_full_name(method),
            assembly: self.graph.assembly_name_of_method(method),
            source: Box::new(source),
        })
    }

    fn process_method_inner(&mut self, method: Token) -> Result<()> {
        let node = self.graph.method(method);
        let declaring = node.declaring;

        self.mark_type(
            declaring,
            DependencyInfo::new(DependencyKind::DeclaringType, method),
        )?;

        if self.annotations.action(method) == MethodAction::Nothing {
            self.annotations.set_action(method, MethodAction::Parse);
        }

        for param in &node.params {
            self.mark_type(
                param.ty,
                DependencyInfo::new(DependencyKind::Parameter, method),
            )?;
            self.mark_custom_attributes_of(method, &param.custom_attributes)?;
            if let Some(marshal) = &param.marshal {
                if let Some(marshaler) = marshal.custom_marshaler {
                    self.mark_type(
                        marshaler,
                        DependencyInfo::new(DependencyKind::InteropShape, method),
                    )?;
                }
            }
        }
        self.mark_type(
            node.return_type,
            DependencyInfo::new(DependencyKind::ReturnType, method),
        )?;
        self.mark_custom_attributes_of(method, &node.return_attributes)?;
        if let Some(marshal) = &node.return_marshal {
            if let Some(marshaler) = marshal.custom_marshaler {
                self.mark_type(
                    marshaler,
                    DependencyInfo::new(DependencyKind::InteropShape, method),
                )?;
            }
        }

        self.mark_custom_attributes_of(method, &node.custom_attributes)?;
        self.mark_security_declarations(method, &node.security)?;
        for &generic_param in &node.generic_params {
            self.mark_generic_parameter(generic_param)?;
        }

        for &target in &node.overrides {
            self.mark_explicit_override(method, target)?;
        }
        self.mark_base_methods(method)?;
        self.mark_accessor_owner(method)?;

        if node.is_pinvoke() || node.is_internal_call() {
            self.process_interop_method(method)?;
        }

        if node.is_virtual() {
            self.virtual_methods.push(method);
        }

        // A marked instance constructor means an instance of the declaring
        // type may exist.
        if node.is_constructor() {
            self.mark_requirements_for_instantiated_type(declaring)?;
        }

        self.deliver_preserved_methods(method)?;

        match self.annotations.action(method) {
            MethodAction::Parse => {
                let assembly = self.graph.type_node(declaring).assembly;
                if self.annotations.assembly_action(assembly).allows_body_processing() {
                    self.process_method_body(method)?;
                }
            }
            MethodAction::ForceParse => {
                self.process_method_body(method)?;
            }
            MethodAction::ConvertToStub => {
                self.mark_stub_support(method)?;
            }
            MethodAction::ConvertToThrow => {
                self.mark_throw_support(method)?;
            }
            MethodAction::Nothing => {}
        }

        Ok(())
    }

    /// An explicit `.override` keeps the base slot and, when the slot lives
    /// on an interface, the implementation edge that makes the override legal.
    fn mark_explicit_override(&mut self, method: Token, target: Token) -> Result<()> {
        let Some(base) =
            self.mark_method_ref(target, DependencyInfo::new(DependencyKind::MethodImplOverride, method))?
        else {
            return Ok(());
        };
        let base_declaring = self.graph.method(base).declaring;
        if !self.graph.type_node(base_declaring).is_interface() {
            return Ok(());
        }
        let declaring = self.graph.method(method).declaring;
        let implementations = &self.graph.type_node(declaring).interfaces;
        for &interface_impl in implementations {
            let interface = self.graph.interface_impl(interface_impl).interface;
            if self.graph.resolve_type(interface) == Some(base_declaring) {
                self.mark_interface_implementation(
                    interface_impl,
                    DependencyInfo::new(DependencyKind::MethodImplOverride, method),
                )?;
            }
        }
        Ok(())
    }

    /// Walks up the override chain. Base slots on interfaces are skipped when
    /// the overriding type is not itself an interface; those edges are owned
    /// by override resolution, which prunes them on never-instantiated types.
    fn mark_base_methods(&mut self, method: Token) -> Result<()> {
        let Some(bases) = self.annotations.base_methods(method) else {
            return Ok(());
        };
        let bases: Vec<Token> = bases.to_vec();
        let declaring_is_interface = {
            let declaring = self.graph.method(method).declaring;
            self.graph.type_node(declaring).is_interface()
        };
        for base in bases {
            let base_declaring = self.graph.method(base).declaring;
            if self.graph.type_node(base_declaring).is_interface() && !declaring_is_interface {
                continue;
            }
            self.enqueue_method(base, DependencyInfo::new(DependencyKind::BaseMethod, method));
            self.mark_base_methods(base)?;
        }
        Ok(())
    }

    /// Property/event accessors keep their owning member's metadata.
    fn mark_accessor_owner(&mut self, method: Token) -> Result<()> {
        let declaring = self.graph.method(method).declaring;
        let ty = self.graph.type_node(declaring);

        for &property in &ty.properties {
            let node = self.graph.property(property);
            if node.getter == Some(method) || node.setter == Some(method) {
                self.mark_property(
                    property,
                    DependencyInfo::new(DependencyKind::MemberOfType, method),
                )?;
            }
        }
        for &event in &ty.events {
            let node = self.graph.event(event);
            if node.add_method == Some(method)
                || node.remove_method == Some(method)
                || node.raise_method == Some(method)
            {
                self.mark_event(event, DependencyInfo::new(DependencyKind::MemberOfType, method))?;
            }
        }
        Ok(())
    }

    /// Marshaling touches fields directly and may construct by-reference
    /// parameters in place, bypassing the instructions the scanner sees.
    fn process_interop_method(&mut self, method: Token) -> Result<()> {
        let node = self.graph.method(method);

        if let Some(return_type) = self.graph.resolve_type(node.return_type) {
            if !self.graph.type_node(return_type).is_import() {
                self.mark_fields_of(return_type, false)?;
                if let Some(ctor) = self.graph.default_ctor(return_type) {
                    self.enqueue_method(
                        ctor,
                        DependencyInfo::new(DependencyKind::InteropShape, method),
                    );
                }
            }
        }

        if node.has_this() {
            let declaring = node.declaring;
            if !self.graph.type_node(declaring).is_import() {
                self.mark_fields_of(declaring, false)?;
            }
        }

        for param in &node.params {
            let Some(param_type) = self.graph.resolve_type(param.ty) else {
                continue;
            };
            if self.graph.type_node(param_type).is_import() {
                continue;
            }
            self.mark_fields_of(param_type, false)?;
            if param.by_ref {
                if let Some(ctor) = self.graph.default_ctor(param_type) {
                    self.enqueue_method(
                        ctor,
                        DependencyInfo::new(DependencyKind::InteropShape, method),
                    );
                }
            }
        }
        Ok(())
    }

    /// A stubbed instance constructor still chains to its base; keep a
    /// parameterless base constructor for the synthesized body.
    fn mark_stub_support(&mut self, method: Token) -> Result<()> {
        let node = self.graph.method(method);
        if !node.is_constructor() {
            return Ok(());
        }
        let declaring = node.declaring;
        let Some(base) = self.graph.base_of(declaring) else {
            return Ok(());
        };
        if let Some(base_ctor) = self.graph.default_ctor(base) {
            self.enqueue_method(
                base_ctor,
                DependencyInfo::new(DependencyKind::BaseDefaultCtor, method),
            );
        }
        Ok(())
    }

    /// A throwing replacement body needs `NotSupportedException(string)`.
    pub(crate) fn mark_throw_support(&mut self, method: Token) -> Result<()> {
        let Some(exception) = self
            .graph
            .type_by_fullname(wellknown::NOT_SUPPORTED_EXCEPTION)
        else {
            return Ok(());
        };
        self.mark_type(
            exception,
            DependencyInfo::new(DependencyKind::NotSupportedExceptionCtor, method),
        )?;
        let ctor = self
            .graph
            .type_node(exception)
            .methods
            .iter()
            .copied()
            .find(|&m| {
                let node = self.graph.method(m);
                node.is_constructor() && node.params.len() == 1
            });
        if let Some(ctor) = ctor {
            self.enqueue_method(
                ctor,
                DependencyInfo::new(DependencyKind::NotSupportedExceptionCtor, method),
            );
        }
        Ok(())
    }
}

//! Custom-attribute marking and the staged attribute queues.
//!
//! Assembly/module-level attributes cannot be marked eagerly: their target
//! types may not be discovered yet when the attribute is first seen. They
//! wait in a lazy queue drained after the primary phase, with skip/requeue
//! semantics. Under the used-attribute-types-only policy, member-level
//! attributes wait in a second, late queue gated on their own attribute type
//! becoming used.

use std::sync::OnceLock;

use regex::Regex;

use crate::annotations::{DependencyInfo, DependencyKind};
use crate::mark::{AttributeProviderPair, MarkStep};
use crate::metadata::diagnostics::DiagnosticCategory;
use crate::metadata::graph::AttributeArgument;
use crate::metadata::tables::TableId;
use crate::metadata::token::Token;
use crate::metadata::wellknown;
use crate::Result;

/// `{Member}`, `{Method()}`, `{Field,nq}` references in a debugger display
/// string.
fn display_reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("display pattern is valid"))
}

impl MarkStep<'_> {
    /// Marks the attributes of a member provider, or queues them for the
    /// late phase under the used-attribute-types-only policy.
    pub(crate) fn mark_custom_attributes_of(
        &mut self,
        provider: Token,
        attributes: &[Token],
    ) -> Result<()> {
        for &attribute in attributes {
            if self.options.used_attribute_types_only {
                self.late_marked_attributes.push_back(AttributeProviderPair {
                    attribute,
                    provider,
                });
                continue;
            }
            self.mark_custom_attribute(attribute, provider)?;
        }
        Ok(())
    }

    /// Security declarations are attribute-shaped and always marked eagerly;
    /// the runtime enforces them regardless of attribute-type usage.
    pub(crate) fn mark_security_declarations(
        &mut self,
        provider: Token,
        declarations: &[Token],
    ) -> Result<()> {
        for &declaration in declarations {
            self.mark_attribute_like(declaration, provider, DependencyKind::SecurityDeclaration)?;
        }
        Ok(())
    }

    pub(crate) fn mark_custom_attribute(
        &mut self,
        attribute: Token,
        provider: Token,
    ) -> Result<()> {
        self.mark_attribute_like(attribute, provider, DependencyKind::CustomAttribute)
    }

    fn mark_attribute_like(
        &mut self,
        attribute: Token,
        provider: Token,
        kind: DependencyKind,
    ) -> Result<()> {
        self.annotations
            .mark(attribute, DependencyInfo::new(kind, provider));
        if !self.annotations.set_processed(attribute) {
            return Ok(());
        }

        let node = self.graph.custom_attribute(attribute);
        let constructor = node.constructor;
        self.mark_method_ref(
            constructor,
            DependencyInfo::new(DependencyKind::AttributeConstructor, attribute),
        )?;

        for argument in node.args.iter().chain(node.named_args.iter().map(|n| &n.value)) {
            if let AttributeArgument::Type(type_ref) = argument {
                self.mark_type(
                    *type_ref,
                    DependencyInfo::new(DependencyKind::AttributeArgument, attribute),
                )?;
            }
        }

        if self.options.keep_members_for_debugger {
            let attribute_type_name = self
                .graph
                .attribute_type_of(node)
                .map(|t| self.graph.type_node(t).full_name());
            match attribute_type_name.as_deref() {
                Some(wellknown::DEBUGGER_DISPLAY_ATTRIBUTE) => {
                    self.mark_debugger_display_references(attribute, provider)?;
                }
                Some(wellknown::DEBUGGER_TYPE_PROXY_ATTRIBUTE) => {
                    self.mark_debugger_type_proxy(attribute, provider)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Decodes a `DebuggerDisplayAttribute` format string and marks the
    /// members it references by name on the decorated type.
    fn mark_debugger_display_references(
        &mut self,
        attribute: Token,
        provider: Token,
    ) -> Result<()> {
        let Some(target) = self.debugger_attribute_target(attribute, provider) else {
            return Ok(());
        };
        let node = self.graph.custom_attribute(attribute);
        let Some(AttributeArgument::String(display)) = node.args.first() else {
            return Ok(());
        };

        let mut names: Vec<String> = Vec::new();
        for capture in display_reference_pattern().captures_iter(display) {
            let raw = capture[1].trim();
            // Format specifiers like ",nq" follow the member reference.
            let raw = raw.split(',').next().unwrap_or(raw).trim();
            let name = raw.strip_suffix("()").unwrap_or(raw);
            names.push(name.to_string());
        }

        for name in names {
            self.mark_members_named(target, &name, attribute)?;
        }
        Ok(())
    }

    /// Marks every field, property (with accessors) and method named `name`
    /// on `target`.
    fn mark_members_named(&mut self, target: Token, name: &str, attribute: Token) -> Result<()> {
        let ty = self.graph.type_node(target);
        let info = DependencyInfo::new(DependencyKind::DebuggerDisplay, attribute);

        let fields: Vec<Token> = ty
            .fields
            .iter()
            .copied()
            .filter(|&f| self.graph.field(f).name == name)
            .collect();
        for field in fields {
            self.mark_field(field, info)?;
        }

        let properties: Vec<Token> = ty
            .properties
            .iter()
            .copied()
            .filter(|&p| self.graph.property(p).name == name)
            .collect();
        for property in properties {
            self.mark_property(property, info)?;
            let node = self.graph.property(property);
            for accessor in [node.getter, node.setter].into_iter().flatten() {
                self.enqueue_method(accessor, info);
            }
        }

        let methods: Vec<Token> = ty
            .methods
            .iter()
            .copied()
            .filter(|&m| self.graph.method(m).name == name)
            .collect();
        for method in methods {
            self.enqueue_method(method, info);
        }
        Ok(())
    }

    /// Marks the proxy type referenced by a `DebuggerTypeProxyAttribute`,
    /// with its fields and methods: the debugger instantiates it
    /// reflectively.
    fn mark_debugger_type_proxy(&mut self, attribute: Token, _provider: Token) -> Result<()> {
        let node = self.graph.custom_attribute(attribute);
        let proxy = match node.args.first() {
            Some(AttributeArgument::Type(type_ref)) => self.graph.resolve_type(*type_ref),
            Some(AttributeArgument::String(type_name)) => {
                let resolved = self.graph.type_by_fullname(type_name);
                if resolved.is_none() {
                    self.diagnostics.warning(
                        DiagnosticCategory::Attribute,
                        format!("Could not resolve debugger proxy type '{type_name}'"),
                    );
                }
                resolved
            }
            _ => None,
        };
        let Some(proxy) = proxy else {
            return Ok(());
        };

        let info = DependencyInfo::new(DependencyKind::DebuggerTypeProxy, attribute);
        self.mark_type(proxy, info)?;
        self.mark_fields_of(proxy, true)?;
        let methods = self.graph.type_node(proxy).methods.clone();
        for method in methods {
            self.enqueue_method(method, info);
        }
        Ok(())
    }

    /// The type whose members a debugger attribute refers to: the decorated
    /// type itself, or the `Target` named argument at assembly level.
    fn debugger_attribute_target(&self, attribute: Token, provider: Token) -> Option<Token> {
        if provider.table_id() == Some(TableId::TypeDef) {
            return Some(provider);
        }
        let node = self.graph.custom_attribute(attribute);
        node.named_args
            .iter()
            .find(|named| named.name == "Target")
            .and_then(|named| match &named.value {
                AttributeArgument::Type(type_ref) => self.graph.resolve_type(*type_ref),
                _ => None,
            })
    }

    /// Drains the assembly-level queue once. An attribute whose declaring
    /// module is unmarked and whose own attribute type is unmarked is
    /// requeued: its target may still be discovered by a later pass.
    pub(crate) fn process_lazy_attributes(&mut self) -> Result<bool> {
        let mut progressed = false;
        let pending = self.assembly_level_attributes.len();
        for _ in 0..pending {
            let pair = self
                .assembly_level_attributes
                .pop_front()
                .expect("queue length was just checked");
            let module_marked = self.annotations.is_marked(pair.provider);
            let attribute_type_marked = self
                .graph
                .attribute_type_of(self.graph.custom_attribute(pair.attribute))
                .is_some_and(|t| self.annotations.is_marked(t));
            if !module_marked && !attribute_type_marked {
                self.assembly_level_attributes.push_back(pair);
                continue;
            }
            self.mark_custom_attribute(pair.attribute, pair.provider)?;
            progressed = true;
        }
        Ok(progressed)
    }

    /// Drains the late queue once, gated on the attribute's own type being
    /// marked. Active only under the used-attribute-types-only policy.
    pub(crate) fn process_late_attributes(&mut self) -> Result<bool> {
        if !self.options.used_attribute_types_only {
            return Ok(false);
        }
        let mut progressed = false;

        if self.annotations.any_indirectly_called() && !self.disable_private_reflection_marked {
            self.disable_private_reflection_marked = true;
            if let Some(disable) = self
                .graph
                .type_by_fullname(wellknown::DISABLE_PRIVATE_REFLECTION_ATTRIBUTE)
            {
                self.mark_type(
                    disable,
                    DependencyInfo::new(DependencyKind::DisablePrivateReflection, disable),
                )?;
                if let Some(ctor) = self.graph.default_ctor(disable) {
                    self.enqueue_method(
                        ctor,
                        DependencyInfo::new(DependencyKind::DisablePrivateReflection, disable),
                    );
                }
                progressed = true;
            }
        }

        let pending = self.late_marked_attributes.len();
        for _ in 0..pending {
            let pair = self
                .late_marked_attributes
                .pop_front()
                .expect("queue length was just checked");
            let attribute_type_marked = self
                .graph
                .attribute_type_of(self.graph.custom_attribute(pair.attribute))
                .is_some_and(|t| self.annotations.is_marked(t));
            if !attribute_type_marked {
                self.late_marked_attributes.push_back(pair);
                continue;
            }
            self.mark_custom_attribute(pair.attribute, pair.provider)?;
            progressed = true;
        }
        Ok(progressed)
    }
}

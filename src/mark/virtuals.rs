//! Virtual dispatch and interface-implementation resolution.
//!
//! Override edges move through *unconsidered → needs-marking → marked* or to
//! the terminal *pruned* state. Pruning is never final across the whole run:
//! the resolution sweep re-runs every scheduler pass, so an edge pruned while
//! its declaring type looked dead is reconsidered when a later discovery
//! (instantiation, a derived interface becoming used) changes the facts.

use crate::annotations::{DependencyInfo, DependencyKind};
use crate::mark::MarkStep;
use crate::metadata::token::Token;
use crate::metadata::typemap::OverrideInformation;
use crate::Result;

impl MarkStep<'_> {
    /// Re-resolves override obligations for every marked virtual method.
    /// Returns whether any new mark was produced.
    pub(crate) fn process_virtual_methods(&mut self) -> Result<bool> {
        let before = self.annotations.dependency_trace().len();
        // The list grows while overrides are marked; iterate a snapshot.
        let mut index = 0;
        while index < self.virtual_methods.len() {
            let method = self.virtual_methods[index];
            index += 1;
            self.process_virtual_method(method)?;
        }
        Ok(self.annotations.dependency_trace().len() > before)
    }

    fn process_virtual_method(&mut self, base: Token) -> Result<()> {
        let Some(infos) = self.annotations.overrides(base) else {
            return Ok(());
        };
        let infos: Vec<OverrideInformation> = infos.to_vec();
        for info in infos {
            self.process_override(&info)?;
        }
        Ok(())
    }

    /// The per-edge transition rule.
    fn process_override(&mut self, info: &OverrideInformation) -> Result<()> {
        let override_method = info.override_method;
        if self.annotations.is_marked(override_method)
            || self.annotations.is_processed(override_method)
        {
            return Ok(());
        }

        let declaring = self.graph.method(override_method).declaring;
        let instantiated = self.annotations.is_instantiated(declaring);

        if info.base_is_interface && !instantiated {
            // A pruned interface override can be re-enabled by its matching
            // implementation edge, or by a more-derived interface carrying
            // the same slot becoming used on the type.
            let reachable = match info.matching_interface_impl {
                Some(interface_impl) => self.annotations.is_marked(interface_impl),
                None => {
                    let interface = self.graph.method(info.base).declaring;
                    self.is_interface_marked_on_type(declaring, interface)
                }
            };
            if !reachable {
                return Ok(());
            }
        } else if !info.base_is_interface {
            let base_is_abstract = self.graph.method(info.base).is_abstract();
            if !base_is_abstract && !instantiated && self.options.enable_override_removal {
                // No instance of the type can exist, so a virtual call can
                // never dispatch here.
                return Ok(());
            }
        }

        self.enqueue_method(
            override_method,
            DependencyInfo::new(DependencyKind::Override, info.base),
        );
        // Multi-level chains: the override becomes the base for its own
        // overrides.
        self.process_virtual_method(override_method)?;
        Ok(())
    }

    /// Whether any marked implementation edge on `type_token` leads to
    /// `target_interface`, directly or through derived interfaces.
    fn is_interface_marked_on_type(&self, type_token: Token, target_interface: Token) -> bool {
        for &interface_impl in &self.graph.type_node(type_token).interfaces {
            if !self.annotations.is_marked(interface_impl) {
                continue;
            }
            let Some(interface) = self
                .graph
                .resolve_type(self.graph.interface_impl(interface_impl).interface)
            else {
                continue;
            };
            if self.interface_requires(interface, target_interface) {
                return true;
            }
        }
        false
    }

    /// Whether `interface` is `target` or derives from it. Walks the
    /// derived-interface relation supplied with the annotation store.
    pub(crate) fn interface_requires(&self, interface: Token, target: Token) -> bool {
        if interface == target {
            return true;
        }
        let Some(derived) = self.annotations.derived_interfaces_of(target) else {
            return false;
        };
        for &candidate in derived {
            if candidate == interface || self.interface_requires(interface, candidate) {
                return true;
            }
        }
        false
    }

    /// Re-evaluates implementation edges of marked types with interfaces.
    /// Returns whether any new mark was produced.
    ///
    /// A type's edges are only eligible once the type is instantiated (or its
    /// assembly is wholly preserved): interfaces of a type that never has an
    /// instance are removable, which is what lets the override rule prune
    /// their implementations. An interface marked late re-enables edges
    /// through this sweep re-running every pass.
    pub(crate) fn process_types_with_interfaces(&mut self) -> Result<bool> {
        let before = self.annotations.dependency_trace().len();
        let mut index = 0;
        while index < self.types_with_interfaces.len() {
            let type_token = self.types_with_interfaces[index];
            index += 1;
            if !self.annotations.is_instantiated(type_token)
                && !self.is_fully_preserved(type_token)
            {
                continue;
            }
            self.mark_interface_implementations_conditional(type_token)?;
        }
        Ok(self.annotations.dependency_trace().len() > before)
    }

    /// An implementation edge of an eligible type is kept when its interface
    /// type is marked, the interface is COM-imported (unprovable from managed
    /// code alone), or the assembly is wholly preserved; unused interfaces
    /// stay removable.
    pub(crate) fn mark_interface_implementations_conditional(
        &mut self,
        type_token: Token,
    ) -> Result<()> {
        let fully_preserved = self.is_fully_preserved(type_token);
        let implementations = self.graph.type_node(type_token).interfaces.clone();

        for interface_impl in implementations {
            if self.annotations.is_marked(interface_impl) {
                continue;
            }
            let interface_ref = self.graph.interface_impl(interface_impl).interface;
            let resolved = self.graph.resolve_type(interface_ref);
            let keep = fully_preserved
                || resolved.is_some_and(|interface| {
                    self.annotations.is_marked(interface)
                        || self.graph.type_node(interface).is_import()
                });
            if keep {
                self.mark_interface_implementation(
                    interface_impl,
                    DependencyInfo::new(DependencyKind::InterfaceImplementation, type_token),
                )?;
            }
        }
        Ok(())
    }

    /// Marks one implementation edge: the edge node, its interface type, and
    /// the edge's custom attributes.
    pub(crate) fn mark_interface_implementation(
        &mut self,
        interface_impl: Token,
        info: DependencyInfo,
    ) -> Result<()> {
        self.annotations.mark(interface_impl, info);
        if !self.annotations.set_processed(interface_impl) {
            return Ok(());
        }
        let node = self.graph.interface_impl(interface_impl);
        let interface = node.interface;
        self.mark_custom_attributes_of(interface_impl, &node.custom_attributes)?;
        self.mark_type(
            interface,
            DependencyInfo::new(DependencyKind::InterfaceImplementation, interface_impl),
        )?;
        Ok(())
    }
}

//! Virtual-method and interface relation maps.
//!
//! A marking run needs to know, for every virtual method, which base and
//! interface methods it satisfies. That relation is computed once, ahead of
//! marking, by walking the type hierarchy; the marking engine consumes it
//! read-only through the annotation store.
//!
//! Matching is name plus parameter count plus generic arity. `NEW_SLOT`
//! methods do not override base-class slots but can still satisfy interface
//! contracts.

use std::collections::HashMap;

use crate::metadata::flags::MethodAttributes;
use crate::metadata::graph::MetadataGraph;
use crate::metadata::token::Token;

/// One override edge: `override_method` satisfies the slot declared by `base`.
#[derive(Debug, Clone)]
pub struct OverrideInformation {
    /// The base or interface method whose slot is satisfied
    pub base: Token,
    /// The overriding method
    pub override_method: Token,
    /// The interface-implementation edge that makes the override an
    /// interface contract, when one matches
    pub matching_interface_impl: Option<Token>,
    /// Whether `base` is declared on an interface
    pub base_is_interface: bool,
}

/// The override and derived-interface relations for one graph.
#[derive(Debug, Default)]
pub struct VirtualMaps {
    /// Base method to the overrides satisfying its slot
    pub overrides: HashMap<Token, Vec<OverrideInformation>>,
    /// Override method to the base methods it satisfies
    pub base_methods: HashMap<Token, Vec<Token>>,
    /// Interface type to the interfaces deriving from it
    pub derived_interfaces: HashMap<Token, Vec<Token>>,
}

impl VirtualMaps {
    /// Walks the graph and computes the full relation set.
    #[must_use]
    pub fn build(graph: &MetadataGraph) -> Self {
        let mut maps = VirtualMaps::default();

        for ty in graph.types() {
            for &method_token in &ty.methods {
                let method = graph.method(method_token);
                if !method.is_virtual() {
                    continue;
                }

                if !method.flags.contains(MethodAttributes::NEW_SLOT) {
                    if let Some(base) = find_base_slot(graph, ty.token, method_token) {
                        maps.record(graph, base, method_token, None);
                    }
                }

                for &impl_token in &ty.interfaces {
                    let interface_impl = graph.interface_impl(impl_token);
                    let Some(interface) = graph.resolve_type(interface_impl.interface) else {
                        continue;
                    };
                    for &candidate in &graph.type_node(interface).methods {
                        if signatures_match(graph, candidate, method_token) {
                            maps.record(graph, candidate, method_token, Some(impl_token));
                        }
                    }
                }

                for &target in &method.overrides {
                    let Some(base) = graph.resolve_method(target) else {
                        continue;
                    };
                    let declaring = graph.method(base).declaring;
                    let matching = if graph.type_node(declaring).is_interface() {
                        ty.interfaces
                            .iter()
                            .copied()
                            .find(|&impl_token| {
                                graph
                                    .resolve_type(graph.interface_impl(impl_token).interface)
                                    == Some(declaring)
                            })
                    } else {
                        None
                    };
                    maps.record(graph, base, method_token, matching);
                }
            }
        }

        for interface_impl in graph.interface_impls() {
            let implementing = interface_impl.implementing;
            if !graph.type_node(implementing).is_interface() {
                continue;
            }
            if let Some(base_interface) = graph.resolve_type(interface_impl.interface) {
                maps.derived_interfaces
                    .entry(base_interface)
                    .or_default()
                    .push(implementing);
            }
        }

        maps
    }

    fn record(
        &mut self,
        graph: &MetadataGraph,
        base: Token,
        override_method: Token,
        matching_interface_impl: Option<Token>,
    ) {
        let entries = self.overrides.entry(base).or_default();
        if entries
            .iter()
            .any(|info| info.override_method == override_method)
        {
            return;
        }
        let base_declaring = graph.method(base).declaring;
        entries.push(OverrideInformation {
            base,
            override_method,
            matching_interface_impl,
            base_is_interface: graph.type_node(base_declaring).is_interface(),
        });
        self.base_methods
            .entry(override_method)
            .or_default()
            .push(base);
    }
}

/// Finds the closest base-class virtual slot a method overrides.
fn find_base_slot(graph: &MetadataGraph, declaring: Token, method: Token) -> Option<Token> {
    let mut current = graph.base_of(declaring);
    while let Some(base_type) = current {
        for &candidate in &graph.type_node(base_type).methods {
            if graph.method(candidate).is_virtual() && signatures_match(graph, candidate, method) {
                return Some(candidate);
            }
        }
        current = graph.base_of(base_type);
    }
    None
}

fn signatures_match(graph: &MetadataGraph, a: Token, b: Token) -> bool {
    let left = graph.method(a);
    let right = graph.method(b);
    left.name == right.name
        && left.params.len() == right.params.len()
        && left.generic_params.len() == right.generic_params.len()
}

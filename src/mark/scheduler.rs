//! Phase ordering and the fixpoint loop.

use crate::annotations::{DependencyInfo, DependencyKind, MethodAction};
use crate::mark::{AttributeProviderPair, MarkStep};
use crate::Result;

impl MarkStep<'_> {
    /// Runs the marking engine to a global fixpoint.
    ///
    /// # Panics
    ///
    /// Panics when no root was seeded: an empty primary queue at entry is an
    /// invariant violation, not a recoverable condition.
    ///
    /// # Errors
    ///
    /// Returns an error on an unresolved reference (unless the ignore policy
    /// is active) or when structural marking of a method fails.
    pub fn process(&mut self) -> Result<()> {
        assert!(
            !self.method_queue.is_empty(),
            "marking started with an empty method queue; at least one root is required"
        );

        self.initialize()?;

        while self.process_primary_queue()?
            || self.process_lazy_attributes()?
            || self.process_late_attributes()?
        {}

        debug_assert!(self.method_queue.is_empty());
        self.finalize()?;
        Ok(())
    }

    /// Marks assembly-level constructs and replays pre-marked roots.
    fn initialize(&mut self) -> Result<()> {
        let assemblies: Vec<_> = self.graph.assemblies().map(|a| a.token).collect();
        for assembly in assemblies {
            self.annotations.set_processed(assembly);
            if self.annotations.assembly_action(assembly).is_fully_preserved() {
                self.annotations
                    .mark(assembly, DependencyInfo::new(DependencyKind::AssemblyReference, assembly));
            }

            let node = self.graph.assembly(assembly);
            let attribute_pairs: Vec<AttributeProviderPair> = node
                .custom_attributes
                .iter()
                .chain(node.module_attributes.iter())
                .map(|&attribute| AttributeProviderPair {
                    attribute,
                    provider: assembly,
                })
                .collect();
            self.assembly_level_attributes.extend(attribute_pairs);

            // Module initializers run unconditionally once the module loads.
            if let Some(module_type) = node.module_type {
                if !self.graph.type_node(module_type).methods.is_empty() {
                    self.mark_type(
                        module_type,
                        DependencyInfo::new(DependencyKind::ModuleType, assembly),
                    )?;
                    let methods = self.graph.type_node(module_type).methods.clone();
                    for method in methods {
                        self.enqueue_method(
                            method,
                            DependencyInfo::new(DependencyKind::MemberOfType, module_type),
                        );
                    }
                }
            }
        }

        // Replay roots marked by earlier phases: full structural closure for
        // types, queue admission for methods, field processing for fields.
        let premarked_types: Vec<_> = self
            .graph
            .types()
            .filter(|t| self.annotations.is_marked(t.token))
            .map(|t| t.token)
            .collect();
        for type_token in premarked_types {
            self.mark_type(type_token, DependencyInfo::root())?;
        }

        let premarked_methods: Vec<_> = self
            .graph
            .methods()
            .filter(|m| self.annotations.is_marked(m.token))
            .map(|m| m.token)
            .collect();
        for method in premarked_methods {
            if !self.annotations.is_processed(method) {
                self.method_queue.push_back(method);
            }
        }

        Ok(())
    }

    /// The primary phase: drains the method queue and the three subordinate
    /// passes until none makes progress. Returns whether anything happened.
    fn process_primary_queue(&mut self) -> Result<bool> {
        let mut any = false;
        loop {
            let mut progressed = false;
            progressed |= self.drain_method_queue()?;
            progressed |= self.process_virtual_methods()?;
            progressed |= self.process_types_with_interfaces()?;
            progressed |= self.process_deferred_bodies()?;
            if !progressed {
                break;
            }
            any = true;
        }
        Ok(any)
    }

    fn drain_method_queue(&mut self) -> Result<bool> {
        let mut progressed = false;
        while let Some(method) = self.method_queue.pop_front() {
            progressed = true;
            self.process_method(method)?;
        }
        Ok(progressed)
    }

    /// Finalization: undelivered deferred bodies are provably unreachable and
    /// become throw conversions; exported aliases of marked forwarded types
    /// are resolved.
    fn finalize(&mut self) -> Result<()> {
        // Throw support was marked when each body was deferred, so only the
        // action flips here.
        let undelivered = std::mem::take(&mut self.unreachable_bodies);
        for method in undelivered {
            self.annotations.set_action(method, MethodAction::ConvertToThrow);
        }

        let forwarded: Vec<_> = self
            .graph
            .exported_types()
            .map(|e| (e.token, e.target))
            .collect();
        for (exported, target) in forwarded {
            let Some(resolved) = self.graph.resolve_type(target) else {
                continue;
            };
            if self.annotations.is_marked(resolved) {
                self.annotations.mark(
                    exported,
                    DependencyInfo::new(DependencyKind::ExportedType, resolved),
                );
            }
        }
        Ok(())
    }
}

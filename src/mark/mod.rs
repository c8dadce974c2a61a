//! The reachability marking engine.
//!
//! A work-list fixpoint algorithm over the metadata graph: starting from
//! externally supplied roots, it computes the closure of types, methods,
//! fields, attributes and generic instantiations that must survive trimming,
//! and attaches per-method actions for a downstream body rewriter.
//!
//! # Architecture
//!
//! [`MarkStep`] owns the queues and drives the phases:
//!
//! 1. a primary phase draining the method queue, then re-resolving virtual
//!    overrides, interface requirements of newly instantiated types, and
//!    deferred bodies, until locally stable;
//! 2. a lazy assembly-level attribute phase and, under the
//!    used-attribute-types-only policy, a late member-attribute phase, both
//!    with skip/requeue semantics resolving forward references;
//! 3. finalization: undelivered deferred bodies become throw conversions and
//!    exported aliases of marked forwarded types are resolved.
//!
//! The engine is single-threaded and non-reentrant; it is the sole mutator
//! of the annotation store for the duration of [`MarkStep::process`].

mod attributes;
mod bodies;
mod methods;
mod options;
mod reflection;
mod scheduler;
mod scope;
mod types;
mod virtuals;

pub use options::MarkOptions;
pub use scope::{ScopeEntry, ScopeStack};

use std::collections::VecDeque;
use std::sync::Arc;

use crate::annotations::{Annotations, DependencyInfo};
use crate::metadata::diagnostics::{DiagnosticCategory, Diagnostics};
use crate::metadata::graph::MetadataGraph;
use crate::metadata::tables::TableId;
use crate::metadata::token::Token;
use crate::Result;

/// One queued attribute: the attribute instance and the provider it decorates.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AttributeProviderPair {
    /// The custom attribute instance
    pub attribute: Token,
    /// The decorated assembly/member
    pub provider: Token,
}

/// The marking engine for one run.
///
/// The graph is read-only for the lifetime of the step; all discovered state
/// lands in the annotation store. Roots must be seeded through
/// [`MarkStep::root_method`] / [`MarkStep::root_type`] before calling
/// [`MarkStep::process`].
pub struct MarkStep<'a> {
    graph: &'a MetadataGraph,
    annotations: &'a mut Annotations,
    diagnostics: Arc<Diagnostics>,
    options: MarkOptions,
    method_queue: VecDeque<Token>,
    virtual_methods: Vec<Token>,
    types_with_interfaces: Vec<Token>,
    unreachable_bodies: Vec<Token>,
    assembly_level_attributes: VecDeque<AttributeProviderPair>,
    late_marked_attributes: VecDeque<AttributeProviderPair>,
    disable_private_reflection_marked: bool,
    scope: ScopeStack,
}

impl<'a> MarkStep<'a> {
    /// Creates an engine over `graph` writing into `annotations`.
    #[must_use]
    pub fn new(
        graph: &'a MetadataGraph,
        annotations: &'a mut Annotations,
        diagnostics: Arc<Diagnostics>,
        options: MarkOptions,
    ) -> Self {
        MarkStep {
            graph,
            annotations,
            diagnostics,
            options,
            method_queue: VecDeque::new(),
            virtual_methods: Vec::new(),
            types_with_interfaces: Vec::new(),
            unreachable_bodies: Vec::new(),
            assembly_level_attributes: VecDeque::new(),
            late_marked_attributes: VecDeque::new(),
            disable_private_reflection_marked: false,
            scope: ScopeStack::new(),
        }
    }

    /// Seeds a root method: marks it and enqueues it for processing.
    pub fn root_method(&mut self, method: Token) {
        self.enqueue_method(method, DependencyInfo::root());
    }

    /// Seeds a root type: marks it so initialization runs its structural
    /// closure.
    pub fn root_type(&mut self, type_token: Token) {
        self.annotations.mark(type_token, DependencyInfo::root());
    }

    /// Marks a method and schedules its structural processing.
    pub(crate) fn enqueue_method(&mut self, method: Token, info: DependencyInfo) {
        self.annotations.mark(method, info);
        if !self.annotations.is_processed(method) {
            self.method_queue.push_back(method);
        }
    }

    /// Resolves a type-shaped reference under the resolution policy.
    ///
    /// `Ok(None)` means the reference was dropped: either a null token, or an
    /// unresolved reference under the ignore policy (logged).
    pub(crate) fn try_resolve_type(&mut self, token: Token, context: &str) -> Result<Option<Token>> {
        if token.is_null() {
            return Ok(None);
        }
        match self.graph.resolve_type(token) {
            Some(resolved) => Ok(Some(resolved)),
            None => self.handle_unresolved(token, context),
        }
    }

    /// Resolves a method-shaped reference under the resolution policy.
    pub(crate) fn try_resolve_method(
        &mut self,
        token: Token,
        context: &str,
    ) -> Result<Option<Token>> {
        if token.is_null() {
            return Ok(None);
        }
        match self.graph.resolve_method(token) {
            Some(resolved) => Ok(Some(resolved)),
            None => self.handle_unresolved(token, context),
        }
    }

    /// Resolves a field-shaped reference under the resolution policy.
    pub(crate) fn try_resolve_field(
        &mut self,
        token: Token,
        context: &str,
    ) -> Result<Option<Token>> {
        if token.is_null() {
            return Ok(None);
        }
        match self.graph.resolve_field(token) {
            Some(resolved) => Ok(Some(resolved)),
            None => self.handle_unresolved(token, context),
        }
    }

    fn handle_unresolved(&mut self, token: Token, context: &str) -> Result<Option<Token>> {
        if self.options.ignore_unresolved_references {
            self.diagnostics.error(
                DiagnosticCategory::Resolution,
                format!("Ignoring unresolved reference {token} ({context})"),
            );
            Ok(None)
        } else {
            Err(unresolved_error!(token, context))
        }
    }

    /// Whether the assembly declaring `type_token` is wholly preserved.
    pub(crate) fn is_fully_preserved(&self, type_token: Token) -> bool {
        debug_assert_eq!(type_token.table_id(), Some(TableId::TypeDef));
        let assembly = self.graph.type_node(type_token).assembly;
        self.annotations.assembly_action(assembly).is_fully_preserved()
    }
}

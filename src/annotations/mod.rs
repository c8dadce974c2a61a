//! The annotation store: all mutable state of one marking run.
//!
//! The metadata graph itself is immutable during marking; everything the
//! engine learns lands here. Mark/processed/instantiated bits are stored in
//! per-table bitsets parallel to the arena, actions and policy state in
//! token-keyed maps. The store is an explicit context object passed into
//! every marking operation; its lifetime is one analysis run.
//!
//! All bits are monotonic: they flip false→true at most once and are never
//! cleared. There is no "unmark".

mod dependency;

pub use dependency::{DependencyInfo, DependencyKind, DependencyRecord};

use std::collections::{HashMap, HashSet};

use strum::IntoEnumIterator;

use crate::metadata::graph::MetadataGraph;
use crate::metadata::tables::TableId;
use crate::metadata::token::Token;
use crate::metadata::typemap::{OverrideInformation, VirtualMaps};
use crate::utils::BitSet;

/// Per-method body-processing directive.
///
/// Producers (descriptor/substitution readers) set stub/throw actions; the
/// marking engine defaults a reached method from `Nothing` to `Parse` and
/// never invents stub/throw itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MethodAction {
    /// No decision yet
    #[default]
    Nothing,
    /// Scan the body and mark what it references
    Parse,
    /// Scan the body even when the assembly action would skip it
    ForceParse,
    /// Replace the body with a constant-returning stub downstream
    ConvertToStub,
    /// Replace the body with a throwing stub downstream
    ConvertToThrow,
}

/// Per-assembly processing directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssemblyAction {
    /// Trim the assembly normally
    #[default]
    Link,
    /// Keep the assembly unchanged; everything in it is preserved
    Copy,
    /// Re-save without trimming; everything in it is preserved
    Save,
    /// Do not process bodies in this assembly
    Skip,
    /// Remove the assembly from the output
    Delete,
}

impl AssemblyAction {
    /// Whether the action preserves the assembly contents wholesale.
    #[must_use]
    pub fn is_fully_preserved(&self) -> bool {
        matches!(self, AssemblyAction::Copy | AssemblyAction::Save)
    }

    /// Whether method bodies in the assembly may be scanned.
    #[must_use]
    pub fn allows_body_processing(&self) -> bool {
        !matches!(self, AssemblyAction::Skip | AssemblyAction::Delete)
    }
}

/// Explicit preservation request for a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypePreserve {
    /// Nothing beyond the type itself
    Nothing,
    /// All fields
    Fields,
    /// All methods
    Methods,
    /// All fields and methods
    All,
}

impl TypePreserve {
    /// Unions two preservation requests.
    #[must_use]
    pub fn union(self, other: TypePreserve) -> TypePreserve {
        use TypePreserve::{All, Fields, Methods, Nothing};
        match (self, other) {
            (All, _) | (_, All) | (Fields, Methods) | (Methods, Fields) => All,
            (Fields, _) | (_, Fields) => Fields,
            (Methods, _) | (_, Methods) => Methods,
            (Nothing, Nothing) => Nothing,
        }
    }
}

/// Constant value attached to a method stubbed by a substitution producer.
#[derive(Debug, Clone, PartialEq)]
pub enum StubValue {
    /// Return the type default
    Default,
    /// Return a constant integer
    Int(i64),
    /// Return a constant boolean
    Bool(bool),
    /// Return a constant string
    String(String),
}

/// Per-table bit storage parallel to the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TableBits {
    bits: HashMap<TableId, BitSet>,
}

impl TableBits {
    fn new(graph: &MetadataGraph) -> Self {
        let mut bits = HashMap::new();
        for table in TableId::iter() {
            bits.insert(table, BitSet::new(graph.table_len(table)));
        }
        TableBits { bits }
    }

    fn insert(&mut self, token: Token) -> bool {
        let table = token
            .table_id()
            .unwrap_or_else(|| panic!("token {token} does not address a known table"));
        self.bits
            .get_mut(&table)
            .expect("all tables are initialized")
            .insert(token.slot())
    }

    fn contains(&self, token: Token) -> bool {
        let Some(table) = token.table_id() else {
            return false;
        };
        let set = &self.bits[&table];
        let slot = token.row() as usize;
        if slot == 0 || slot > set.len() {
            return false;
        }
        set.contains(slot - 1)
    }

    fn tokens(&self) -> Vec<Token> {
        let mut tokens = Vec::new();
        for table in TableId::iter() {
            for slot in self.bits[&table].iter() {
                tokens.push(Token::from_parts(table, slot as u32 + 1));
            }
        }
        tokens.sort();
        tokens
    }
}

/// The mutable state of one marking run.
#[derive(Debug)]
pub struct Annotations {
    marked: TableBits,
    processed: TableBits,
    instantiated: BitSet,
    actions: Vec<MethodAction>,
    assembly_actions: Vec<AssemblyAction>,
    maps: VirtualMaps,
    preserves: HashMap<Token, TypePreserve>,
    duplicated_preserves: HashSet<Token>,
    preserved_methods: HashMap<Token, Vec<Token>>,
    stub_values: HashMap<Token, StubValue>,
    indirectly_called: HashSet<Token>,
    cctor_exempt: HashSet<Token>,
    scanned_bodies: HashSet<Token>,
    trace: Vec<DependencyRecord>,
}

impl Annotations {
    /// Creates a store sized to `graph`, consuming the precomputed virtual
    /// maps.
    #[must_use]
    pub fn new(graph: &MetadataGraph, maps: VirtualMaps) -> Self {
        Annotations {
            marked: TableBits::new(graph),
            processed: TableBits::new(graph),
            instantiated: BitSet::new(graph.table_len(TableId::TypeDef)),
            actions: vec![MethodAction::Nothing; graph.table_len(TableId::MethodDef)],
            assembly_actions: vec![AssemblyAction::Link; graph.table_len(TableId::Assembly)],
            maps,
            preserves: HashMap::new(),
            duplicated_preserves: HashSet::new(),
            preserved_methods: HashMap::new(),
            stub_values: HashMap::new(),
            indirectly_called: HashSet::new(),
            cctor_exempt: HashSet::new(),
            scanned_bodies: HashSet::new(),
            trace: Vec::new(),
        }
    }

    /// Whether `token` is marked.
    #[must_use]
    pub fn is_marked(&self, token: Token) -> bool {
        self.marked.contains(token)
    }

    /// Marks `token`, recording the dependency edge.
    ///
    /// Returns `true` when the node was newly marked.
    pub fn mark(&mut self, token: Token, info: DependencyInfo) -> bool {
        let newly = self.marked.insert(token);
        if newly {
            self.trace.push(DependencyRecord {
                target: token,
                info,
            });
        }
        newly
    }

    /// Whether `token` has been structurally visited.
    #[must_use]
    pub fn is_processed(&self, token: Token) -> bool {
        self.processed.contains(token)
    }

    /// Flags `token` as structurally visited.
    ///
    /// Returns `true` when the flag was newly set.
    pub fn set_processed(&mut self, token: Token) -> bool {
        self.processed.insert(token)
    }

    /// Whether a concrete instance of the type may exist at runtime.
    #[must_use]
    pub fn is_instantiated(&self, type_token: Token) -> bool {
        debug_assert_eq!(type_token.table_id(), Some(TableId::TypeDef));
        self.instantiated.contains(type_token.slot())
    }

    /// Flags the type as instantiated. The type must already be marked;
    /// Instantiated ⇒ Marked is a store invariant.
    ///
    /// Returns `true` when the flag was newly set.
    pub fn mark_instantiated(&mut self, type_token: Token) -> bool {
        assert!(
            self.is_marked(type_token),
            "type {type_token} must be marked before it is flagged instantiated"
        );
        self.instantiated.insert(type_token.slot())
    }

    /// Current action of a method.
    #[must_use]
    pub fn action(&self, method: Token) -> MethodAction {
        self.actions[method.slot()]
    }

    /// Sets a method action.
    pub fn set_action(&mut self, method: Token, action: MethodAction) {
        self.actions[method.slot()] = action;
    }

    /// Current action of an assembly.
    #[must_use]
    pub fn assembly_action(&self, assembly: Token) -> AssemblyAction {
        self.assembly_actions[assembly.slot()]
    }

    /// Sets an assembly action.
    pub fn set_assembly_action(&mut self, assembly: Token, action: AssemblyAction) {
        self.assembly_actions[assembly.slot()] = action;
    }

    /// Overrides satisfying the slot declared by `base`.
    #[must_use]
    pub fn overrides(&self, base: Token) -> Option<&[OverrideInformation]> {
        self.maps.overrides.get(&base).map(Vec::as_slice)
    }

    /// Base slots satisfied by `override_method`.
    #[must_use]
    pub fn base_methods(&self, override_method: Token) -> Option<&[Token]> {
        self.maps.base_methods.get(&override_method).map(Vec::as_slice)
    }

    /// Interfaces deriving from `interface`.
    #[must_use]
    pub fn derived_interfaces_of(&self, interface: Token) -> Option<&[Token]> {
        self.maps
            .derived_interfaces
            .get(&interface)
            .map(Vec::as_slice)
    }

    /// Explicit preserve recorded for a type.
    #[must_use]
    pub fn preserve(&self, type_token: Token) -> Option<TypePreserve> {
        self.preserves.get(&type_token).copied()
    }

    /// Records an explicit preserve, unioning with any existing request.
    pub fn set_preserve(&mut self, type_token: Token, preserve: TypePreserve) {
        match self.preserves.get_mut(&type_token) {
            Some(existing) => {
                *existing = existing.union(preserve);
                self.duplicated_preserves.insert(type_token);
            }
            None => {
                self.preserves.insert(type_token, preserve);
            }
        }
    }

    /// Whether the type received more than one explicit preserve.
    #[must_use]
    pub fn preserve_was_duplicated(&self, type_token: Token) -> bool {
        self.duplicated_preserves.contains(&type_token)
    }

    /// Anchors `method` so that it is marked whenever `anchor` is marked.
    pub fn add_preserved_method(&mut self, anchor: Token, method: Token) {
        self.preserved_methods.entry(anchor).or_default().push(method);
    }

    /// The preserved-method list of an anchor.
    #[must_use]
    pub fn preserved_methods_of(&self, anchor: Token) -> Option<&[Token]> {
        self.preserved_methods.get(&anchor).map(Vec::as_slice)
    }

    /// Attaches a stub value to a method.
    pub fn set_method_stub_value(&mut self, method: Token, value: StubValue) {
        self.stub_values.insert(method, value);
    }

    /// Stub value attached to a method, if any.
    #[must_use]
    pub fn method_stub_value(&self, method: Token) -> Option<&StubValue> {
        self.stub_values.get(&method)
    }

    /// Flags a method as discovered only through reflection.
    pub fn set_indirectly_called(&mut self, method: Token) {
        self.indirectly_called.insert(method);
    }

    /// Whether a method is known to be called only indirectly.
    #[must_use]
    pub fn is_indirectly_called(&self, method: Token) -> bool {
        self.indirectly_called.contains(&method)
    }

    /// Whether any member is known to be called only indirectly.
    #[must_use]
    pub fn any_indirectly_called(&self) -> bool {
        !self.indirectly_called.is_empty()
    }

    /// Exempts a static constructor's type from field-triggered cctor marking.
    pub fn exempt_cctor(&mut self, type_token: Token) {
        self.cctor_exempt.insert(type_token);
    }

    /// Whether the type's static constructor is exempted.
    #[must_use]
    pub fn is_cctor_exempt(&self, type_token: Token) -> bool {
        self.cctor_exempt.contains(&type_token)
    }

    /// Records that a method body was scanned.
    pub fn set_body_scanned(&mut self, method: Token) {
        self.scanned_bodies.insert(method);
    }

    /// Whether a method body was scanned during the run.
    #[must_use]
    pub fn is_body_scanned(&self, method: Token) -> bool {
        self.scanned_bodies.contains(&method)
    }

    /// The recorded dependency trace, in mark order.
    #[must_use]
    pub fn dependency_trace(&self) -> &[DependencyRecord] {
        &self.trace
    }

    /// Sorted snapshot of all marked tokens.
    #[must_use]
    pub fn marked_tokens(&self) -> Vec<Token> {
        self.marked.tokens()
    }

    /// Sorted snapshot of all instantiated type tokens.
    #[must_use]
    pub fn instantiated_tokens(&self) -> Vec<Token> {
        self.instantiated
            .iter()
            .map(|slot| Token::from_parts(TableId::TypeDef, slot as u32 + 1))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::graph::GraphBuilder;

    fn small_store() -> (Token, Token, Annotations) {
        let mut builder = GraphBuilder::new("Test");
        let core = builder.core_types();
        let ty = builder.class("Ns", "T").base(core.object).define();
        let method = builder.method(ty, "M").define();
        let graph = builder.build();
        let annotations = Annotations::new(&graph, VirtualMaps::default());
        (ty, method, annotations)
    }

    #[test]
    fn test_mark_is_monotonic_and_traced() {
        let (ty, _, mut annotations) = small_store();
        assert!(!annotations.is_marked(ty));
        assert!(annotations.mark(ty, DependencyInfo::root()));
        assert!(!annotations.mark(ty, DependencyInfo::root()));
        assert!(annotations.is_marked(ty));
        assert_eq!(annotations.dependency_trace().len(), 1);
    }

    #[test]
    fn test_instantiated_requires_marked() {
        let (ty, _, mut annotations) = small_store();
        annotations.mark(ty, DependencyInfo::root());
        assert!(annotations.mark_instantiated(ty));
        assert!(!annotations.mark_instantiated(ty));
        assert!(annotations.is_instantiated(ty));
    }

    #[test]
    #[should_panic(expected = "must be marked")]
    fn test_instantiated_unmarked_panics() {
        let (ty, _, mut annotations) = small_store();
        annotations.mark_instantiated(ty);
    }

    #[test]
    fn test_action_defaults_to_nothing() {
        let (_, method, mut annotations) = small_store();
        assert_eq!(annotations.action(method), MethodAction::Nothing);
        annotations.set_action(method, MethodAction::Parse);
        assert_eq!(annotations.action(method), MethodAction::Parse);
    }

    #[test]
    fn test_preserve_union_and_duplicate_tracking() {
        let (ty, _, mut annotations) = small_store();
        annotations.set_preserve(ty, TypePreserve::Fields);
        assert!(!annotations.preserve_was_duplicated(ty));
        annotations.set_preserve(ty, TypePreserve::Methods);
        assert_eq!(annotations.preserve(ty), Some(TypePreserve::All));
        assert!(annotations.preserve_was_duplicated(ty));
    }

    #[test]
    fn test_type_preserve_union_table() {
        use TypePreserve::{All, Fields, Methods, Nothing};
        assert_eq!(Fields.union(Methods), All);
        assert_eq!(Fields.union(Fields), Fields);
        assert_eq!(Nothing.union(Methods), Methods);
        assert_eq!(All.union(Nothing), All);
    }

    #[test]
    fn test_marked_tokens_snapshot_sorted() {
        let (ty, method, mut annotations) = small_store();
        annotations.mark(method, DependencyInfo::root());
        annotations.mark(ty, DependencyInfo::root());
        let snapshot = annotations.marked_tokens();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot[0] < snapshot[1]);
    }
}

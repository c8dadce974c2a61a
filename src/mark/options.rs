/// Policy switches for one marking run.
///
/// Defaults match normal trimming: size optimizations on, attribute
/// narrowing off, strict resolution.
#[derive(Debug, Clone, Copy)]
pub struct MarkOptions {
    /// Prune overrides of non-abstract virtuals on never-instantiated types
    pub enable_override_removal: bool,
    /// Defer bodies on never-instantiated types and finalize them as throw
    /// conversions when the type stays uninstantiated
    pub enable_unreachable_bodies: bool,
    /// Keep member-level attributes only when their attribute type is itself
    /// used; queues them into the late attribute phase
    pub used_attribute_types_only: bool,
    /// Honor `DebuggerDisplayAttribute` / `DebuggerTypeProxyAttribute` member
    /// references
    pub keep_members_for_debugger: bool,
    /// Downgrade unresolved references to diagnostics instead of failing
    pub ignore_unresolved_references: bool,
}

impl Default for MarkOptions {
    fn default() -> Self {
        MarkOptions {
            enable_override_removal: true,
            enable_unreachable_bodies: true,
            used_attribute_types_only: false,
            keep_members_for_debugger: true,
            ignore_unresolved_references: false,
        }
    }
}

impl MarkOptions {
    /// Creates the default option set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the override-removal optimization.
    #[must_use]
    pub fn override_removal(mut self, enabled: bool) -> Self {
        self.enable_override_removal = enabled;
        self
    }

    /// Sets the unreachable-bodies optimization.
    #[must_use]
    pub fn unreachable_bodies(mut self, enabled: bool) -> Self {
        self.enable_unreachable_bodies = enabled;
        self
    }

    /// Sets the used-attribute-types-only policy.
    #[must_use]
    pub fn used_attribute_types_only_policy(mut self, enabled: bool) -> Self {
        self.used_attribute_types_only = enabled;
        self
    }

    /// Sets the keep-members-for-debugger policy.
    #[must_use]
    pub fn keep_members_for_debugger_policy(mut self, enabled: bool) -> Self {
        self.keep_members_for_debugger = enabled;
        self
    }

    /// Sets the ignore-unresolved-references policy.
    #[must_use]
    pub fn ignore_unresolved(mut self, enabled: bool) -> Self {
        self.ignore_unresolved_references = enabled;
        self
    }
}

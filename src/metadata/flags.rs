//! Attribute flag groups for metadata nodes.
//!
//! These are the ECMA-335 attribute bits the marking engine consults, grouped
//! with `bitflags`. Only the bits that influence marking decisions are
//! modeled; everything else in the raw attribute words is ignored.

use bitflags::bitflags;

/// Bitmask for the class layout bits of `TypeAttributes`
pub const TYPE_LAYOUT_MASK: u32 = 0x0018;
/// Bitmask for the member access bits of `MethodAttributes` / `FieldAttributes`
pub const MEMBER_ACCESS_MASK: u32 = 0x0007;

bitflags! {
    /// Type definition attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TypeAttributes: u32 {
        /// Class is sequential-layout
        const SEQUENTIAL_LAYOUT = 0x0008;
        /// Class is explicit-layout
        const EXPLICIT_LAYOUT = 0x0010;
        /// Type is an interface
        const INTERFACE = 0x0020;
        /// Type is abstract
        const ABSTRACT = 0x0080;
        /// Type is sealed
        const SEALED = 0x0100;
        /// Type is imported from COM
        const IMPORT = 0x1000;
        /// Type is serializable
        const SERIALIZABLE = 0x2000;
    }
}

impl TypeAttributes {
    /// Returns `true` when the type uses automatic field layout.
    ///
    /// Sequential- and explicit-layout types cannot have fields removed
    /// safely, so the marker keeps all their fields.
    #[must_use]
    pub fn is_auto_layout(&self) -> bool {
        (self.bits() & TYPE_LAYOUT_MASK) == 0
    }
}

bitflags! {
    /// Method definition attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MethodAttributes: u32 {
        /// Accessible only by the declaring type
        const PRIVATE = 0x0001;
        /// Accessible by anyone with visibility of the scope
        const PUBLIC = 0x0006;
        /// Method is static
        const STATIC = 0x0010;
        /// Method cannot be overridden further
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method hides by name and signature
        const HIDE_BY_SIG = 0x0080;
        /// Method always gets a new vtable slot
        const NEW_SLOT = 0x0100;
        /// Method is abstract
        const ABSTRACT = 0x0400;
        /// Method name carries special meaning (accessors, operators)
        const SPECIAL_NAME = 0x0800;
        /// Runtime treats the name as special (.ctor/.cctor)
        const RT_SPECIAL_NAME = 0x1000;
        /// Method is a platform-invoke entry
        const PINVOKE_IMPL = 0x2000;
    }
}

impl MethodAttributes {
    /// Returns `true` when the method is public.
    #[must_use]
    pub fn is_public(&self) -> bool {
        (self.bits() & MEMBER_ACCESS_MASK) == MethodAttributes::PUBLIC.bits()
    }
}

bitflags! {
    /// Method implementation attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MethodImplAttributes: u32 {
        /// Implementation is provided by the runtime
        const RUNTIME = 0x0003;
        /// Implementation is an internal call into native code
        const INTERNAL_CALL = 0x1000;
    }
}

bitflags! {
    /// Field definition attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FieldAttributes: u32 {
        /// Accessible only by the declaring type
        const PRIVATE = 0x0001;
        /// Accessible by anyone with visibility of the scope
        const PUBLIC = 0x0006;
        /// Field is static
        const STATIC = 0x0010;
        /// Field is a compile-time constant
        const LITERAL = 0x0040;
        /// Field name carries special meaning
        const SPECIAL_NAME = 0x0200;
    }
}

impl FieldAttributes {
    /// Returns `true` when the field is public.
    #[must_use]
    pub fn is_public(&self) -> bool {
        (self.bits() & MEMBER_ACCESS_MASK) == FieldAttributes::PUBLIC.bits()
    }
}

bitflags! {
    /// Reflection lookup constraints recovered from `ldc.i4` operands at
    /// recognized reflection call sites.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BindingFlags: u32 {
        /// Match instance members
        const INSTANCE = 0x0004;
        /// Match static members
        const STATIC = 0x0008;
        /// Match public members
        const PUBLIC = 0x0010;
        /// Match non-public members
        const NON_PUBLIC = 0x0020;
    }
}

impl BindingFlags {
    /// Whether a member with the given staticness/visibility satisfies these
    /// flags. An axis with no bits set matches everything, which is the
    /// conservative behavior the scanner needs when a recovered flag word
    /// omits that axis entirely.
    #[must_use]
    pub fn admits(&self, is_static: bool, is_public: bool) -> bool {
        let static_ok = if !self.intersects(BindingFlags::STATIC | BindingFlags::INSTANCE) {
            true
        } else if is_static {
            self.contains(BindingFlags::STATIC)
        } else {
            self.contains(BindingFlags::INSTANCE)
        };
        let visibility_ok = if !self.intersects(BindingFlags::PUBLIC | BindingFlags::NON_PUBLIC) {
            true
        } else if is_public {
            self.contains(BindingFlags::PUBLIC)
        } else {
            self.contains(BindingFlags::NON_PUBLIC)
        };
        static_ok && visibility_ok
    }
}

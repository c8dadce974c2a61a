//! The table taxonomy behind token high bytes.

use strum::{Display, EnumCount, EnumIter};

/// The metadata tables the marking engine operates over.
///
/// Values match the ECMA-335 table numbering so that [`crate::metadata::token::Token`]
/// high bytes round-trip to table ids. This is a deliberately narrow subset:
/// only tables whose rows are annotation targets (markable nodes) or
/// reference shapes the engine resolves appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, Display)]
#[repr(u8)]
pub enum TableId {
    /// An external type reference, resolved through the graph to a `TypeDef`
    TypeRef = 0x01,
    /// A type definition
    TypeDef = 0x02,
    /// A field definition
    Field = 0x04,
    /// A method definition
    MethodDef = 0x06,
    /// An interface implementation edge (type implements interface)
    InterfaceImpl = 0x09,
    /// An external member reference, resolved to a `MethodDef` or `Field`
    MemberRef = 0x0A,
    /// A custom attribute instance
    CustomAttribute = 0x0C,
    /// An event definition
    Event = 0x14,
    /// A property definition
    Property = 0x17,
    /// An assembly definition
    Assembly = 0x20,
    /// An exported (forwarded) type alias
    ExportedType = 0x27,
    /// A generic parameter definition
    GenericParam = 0x2A,
}

impl TableId {
    /// Maps a raw token high byte back to a table id.
    #[must_use]
    pub fn from_byte(value: u8) -> Option<TableId> {
        match value {
            0x01 => Some(TableId::TypeRef),
            0x02 => Some(TableId::TypeDef),
            0x04 => Some(TableId::Field),
            0x06 => Some(TableId::MethodDef),
            0x09 => Some(TableId::InterfaceImpl),
            0x0A => Some(TableId::MemberRef),
            0x0C => Some(TableId::CustomAttribute),
            0x14 => Some(TableId::Event),
            0x17 => Some(TableId::Property),
            0x20 => Some(TableId::Assembly),
            0x27 => Some(TableId::ExportedType),
            0x2A => Some(TableId::GenericParam),
            _ => None,
        }
    }
}

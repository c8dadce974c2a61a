//! CIL instruction representation for already-decoded method bodies.
//!
//! The marking engine consumes instruction streams that a loader has decoded
//! ahead of time, so instructions here carry pre-resolved metadata tokens and
//! string literals rather than raw heap indices. The taxonomy is the closed
//! set the engine dispatches over: opcode identity, a typed operand, control
//! flow classification, and declared stack push/pop arity.
//!
//! # Key Components
//!
//! - [`Instruction`] - One decoded instruction with its operand
//! - [`OpCode`] - Closed opcode set with per-opcode metadata
//! - [`Operand`] - Typed operand payloads (tokens, literals, slots, targets)
//! - [`FlowType`] - How an instruction affects control flow
//! - [`StackBehavior`] - Declared stack effect; call-shaped opcodes are
//!   variable-arity and resolved against method signatures at scan time

use crate::metadata::token::Token;

/// Types of opcodes the engine dispatches over.
///
/// This is not the full CIL opcode map; it is the subset with distinct
/// marking or stack behavior. Opcode families that the marker treats
/// identically (e.g. the conditional branch family) collapse onto one
/// representative where the distinction carries no analysis weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// No operation
    Nop,
    /// Duplicate the top stack value
    Dup,
    /// Discard the top stack value
    Pop,
    /// Load a string literal
    Ldstr,
    /// Load a null reference
    Ldnull,
    /// Load a 32-bit integer constant
    LdcI4,
    /// Load a 64-bit integer constant
    LdcI8,
    /// Load a 32-bit float constant
    LdcR4,
    /// Load a 64-bit float constant
    LdcR8,
    /// Load a local variable
    Ldloc,
    /// Load a local variable address
    Ldloca,
    /// Store to a local variable
    Stloc,
    /// Load an argument
    Ldarg,
    /// Load an argument address
    Ldarga,
    /// Store to an argument
    Starg,
    /// Call a method
    Call,
    /// Call a virtual method
    Callvirt,
    /// Allocate and construct an object
    Newobj,
    /// Load a method pointer
    Ldftn,
    /// Load a virtual method pointer
    Ldvirtftn,
    /// Load an instance field
    Ldfld,
    /// Load an instance field address
    Ldflda,
    /// Store to an instance field
    Stfld,
    /// Load a static field
    Ldsfld,
    /// Load a static field address
    Ldsflda,
    /// Store to a static field
    Stsfld,
    /// Load a metadata token handle
    Ldtoken,
    /// Box a value type
    Box,
    /// Unbox to a value type
    Unbox,
    /// Unbox or cast
    UnboxAny,
    /// Cast with exception on failure
    Castclass,
    /// Type test yielding null on failure
    Isinst,
    /// Allocate a one-dimensional array
    Newarr,
    /// Initialize a value type at an address
    Initobj,
    /// Load a value type from an address
    Ldobj,
    /// Store a value type to an address
    Stobj,
    /// Load the size of a type
    Sizeof,
    /// Constrain the next virtual call's receiver type
    Constrained,
    /// Load an array element
    Ldelem,
    /// Load an array element address
    Ldelema,
    /// Store an array element
    Stelem,
    /// Return from the current method
    Ret,
    /// Unconditional branch
    Br,
    /// Branch when true/non-null
    Brtrue,
    /// Branch when false/null
    Brfalse,
    /// Multi-way branch
    Switch,
    /// Leave a protected region
    Leave,
    /// Throw an exception
    Throw,
    /// Rethrow the current exception
    Rethrow,
    /// End a finally clause
    Endfinally,
    /// Add the top two stack values
    Add,
    /// Subtract the top two stack values
    Sub,
    /// Multiply the top two stack values
    Mul,
    /// Divide the top two stack values
    Div,
    /// Remainder of the top two stack values
    Rem,
    /// Negate the top stack value
    Neg,
    /// Bitwise and
    And,
    /// Bitwise or
    Or,
    /// Bitwise xor
    Xor,
    /// Bitwise not
    Not,
    /// Shift left
    Shl,
    /// Shift right
    Shr,
    /// Compare equal
    Ceq,
    /// Compare greater-than
    Cgt,
    /// Compare less-than
    Clt,
    /// Convert to 32-bit integer
    ConvI4,
    /// Convert to 64-bit integer
    ConvI8,
    /// Convert to 64-bit float
    ConvR8,
}

/// How an instruction affects control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowType {
    /// Normal execution continues to the next instruction
    Sequential,
    /// Conditional branch to another location
    ConditionalBranch,
    /// Always branches to another location
    UnconditionalBranch,
    /// Call to another method
    Call,
    /// Returns from the current method
    Return,
    /// Multi-way branch
    Switch,
    /// Exception throwing
    Throw,
    /// End of a finally clause
    EndFinally,
    /// Leave a protected region
    Leave,
    /// Prefix modifying the next instruction
    Prefix,
}

/// Declared stack effect of an instruction.
///
/// Call-shaped opcodes (`call`, `callvirt`, `newobj`, `ret`) have
/// signature-dependent arity; their declared counts here are placeholders
/// and [`OpCode::is_variable_arity`] is `true` for them. The reflection
/// scanner resolves the effective counts against method signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackBehavior {
    /// Number of items popped from the stack
    pub pops: u8,
    /// Number of items pushed to the stack
    pub pushes: u8,
}

impl OpCode {
    /// Human-readable mnemonic.
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpCode::Nop => "nop",
            OpCode::Dup => "dup",
            OpCode::Pop => "pop",
            OpCode::Ldstr => "ldstr",
            OpCode::Ldnull => "ldnull",
            OpCode::LdcI4 => "ldc.i4",
            OpCode::LdcI8 => "ldc.i8",
            OpCode::LdcR4 => "ldc.r4",
            OpCode::LdcR8 => "ldc.r8",
            OpCode::Ldloc => "ldloc",
            OpCode::Ldloca => "ldloca",
            OpCode::Stloc => "stloc",
            OpCode::Ldarg => "ldarg",
            OpCode::Ldarga => "ldarga",
            OpCode::Starg => "starg",
            OpCode::Call => "call",
            OpCode::Callvirt => "callvirt",
            OpCode::Newobj => "newobj",
            OpCode::Ldftn => "ldftn",
            OpCode::Ldvirtftn => "ldvirtftn",
            OpCode::Ldfld => "ldfld",
            OpCode::Ldflda => "ldflda",
            OpCode::Stfld => "stfld",
            OpCode::Ldsfld => "ldsfld",
            OpCode::Ldsflda => "ldsflda",
            OpCode::Stsfld => "stsfld",
            OpCode::Ldtoken => "ldtoken",
            OpCode::Box => "box",
            OpCode::Unbox => "unbox",
            OpCode::UnboxAny => "unbox.any",
            OpCode::Castclass => "castclass",
            OpCode::Isinst => "isinst",
            OpCode::Newarr => "newarr",
            OpCode::Initobj => "initobj",
            OpCode::Ldobj => "ldobj",
            OpCode::Stobj => "stobj",
            OpCode::Sizeof => "sizeof",
            OpCode::Constrained => "constrained.",
            OpCode::Ldelem => "ldelem",
            OpCode::Ldelema => "ldelema",
            OpCode::Stelem => "stelem",
            OpCode::Ret => "ret",
            OpCode::Br => "br",
            OpCode::Brtrue => "brtrue",
            OpCode::Brfalse => "brfalse",
            OpCode::Switch => "switch",
            OpCode::Leave => "leave",
            OpCode::Throw => "throw",
            OpCode::Rethrow => "rethrow",
            OpCode::Endfinally => "endfinally",
            OpCode::Add => "add",
            OpCode::Sub => "sub",
            OpCode::Mul => "mul",
            OpCode::Div => "div",
            OpCode::Rem => "rem",
            OpCode::Neg => "neg",
            OpCode::And => "and",
            OpCode::Or => "or",
            OpCode::Xor => "xor",
            OpCode::Not => "not",
            OpCode::Shl => "shl",
            OpCode::Shr => "shr",
            OpCode::Ceq => "ceq",
            OpCode::Cgt => "cgt",
            OpCode::Clt => "clt",
            OpCode::ConvI4 => "conv.i4",
            OpCode::ConvI8 => "conv.i8",
            OpCode::ConvR8 => "conv.r8",
        }
    }

    /// Control flow classification.
    #[must_use]
    pub fn flow_type(&self) -> FlowType {
        match self {
            OpCode::Call | OpCode::Callvirt | OpCode::Newobj => FlowType::Call,
            OpCode::Ret => FlowType::Return,
            OpCode::Br => FlowType::UnconditionalBranch,
            OpCode::Brtrue | OpCode::Brfalse => FlowType::ConditionalBranch,
            OpCode::Switch => FlowType::Switch,
            OpCode::Leave => FlowType::Leave,
            OpCode::Throw | OpCode::Rethrow => FlowType::Throw,
            OpCode::Endfinally => FlowType::EndFinally,
            OpCode::Constrained => FlowType::Prefix,
            _ => FlowType::Sequential,
        }
    }

    /// Declared stack effect; see [`StackBehavior`] for the variable-arity caveat.
    #[must_use]
    pub fn stack_behavior(&self) -> StackBehavior {
        let (pops, pushes) = match self {
            OpCode::Nop
            | OpCode::Br
            | OpCode::Leave
            | OpCode::Endfinally
            | OpCode::Rethrow
            | OpCode::Constrained => (0, 0),
            OpCode::Dup => (1, 2),
            OpCode::Pop
            | OpCode::Brtrue
            | OpCode::Brfalse
            | OpCode::Switch
            | OpCode::Throw
            | OpCode::Stloc
            | OpCode::Starg
            | OpCode::Stsfld
            | OpCode::Initobj => (1, 0),
            OpCode::Ldstr
            | OpCode::Ldnull
            | OpCode::LdcI4
            | OpCode::LdcI8
            | OpCode::LdcR4
            | OpCode::LdcR8
            | OpCode::Ldloc
            | OpCode::Ldloca
            | OpCode::Ldarg
            | OpCode::Ldarga
            | OpCode::Ldsfld
            | OpCode::Ldsflda
            | OpCode::Ldtoken
            | OpCode::Ldftn
            | OpCode::Sizeof => (0, 1),
            OpCode::Ldfld
            | OpCode::Ldflda
            | OpCode::Box
            | OpCode::Unbox
            | OpCode::UnboxAny
            | OpCode::Castclass
            | OpCode::Isinst
            | OpCode::Newarr
            | OpCode::Ldobj
            | OpCode::Neg
            | OpCode::Not
            | OpCode::ConvI4
            | OpCode::ConvI8
            | OpCode::ConvR8
            | OpCode::Ldvirtftn => (1, 1),
            OpCode::Stfld | OpCode::Stobj => (2, 0),
            OpCode::Ldelem
            | OpCode::Ldelema
            | OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::Div
            | OpCode::Rem
            | OpCode::And
            | OpCode::Or
            | OpCode::Xor
            | OpCode::Shl
            | OpCode::Shr
            | OpCode::Ceq
            | OpCode::Cgt
            | OpCode::Clt => (2, 1),
            OpCode::Stelem => (3, 0),
            // Signature-dependent; resolved at scan time
            OpCode::Call | OpCode::Callvirt | OpCode::Newobj | OpCode::Ret => (0, 0),
        };
        StackBehavior { pops, pushes }
    }

    /// Whether the stack arity depends on a method signature.
    #[must_use]
    pub fn is_variable_arity(&self) -> bool {
        matches!(
            self,
            OpCode::Call | OpCode::Callvirt | OpCode::Newobj | OpCode::Ret
        )
    }
}

/// An instruction operand after decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand present
    None,
    /// A 32-bit integer constant
    Int32(i32),
    /// A 64-bit integer constant
    Int64(i64),
    /// A 32-bit float constant
    Float32(f32),
    /// A 64-bit float constant
    Float64(f64),
    /// A string literal (pre-resolved from the user-string heap)
    String(String),
    /// A metadata token reference
    Token(Token),
    /// A local variable slot
    Local(u16),
    /// An argument slot
    Argument(u16),
    /// A branch displacement
    Target(i32),
    /// Switch displacements
    SwitchTargets(Vec<i32>),
}

/// A decoded CIL instruction.
#[derive(Debug, Clone)]
pub struct Instruction {
    /// IL offset of this instruction within its body, for diagnostics
    pub offset: u32,
    /// Opcode identity
    pub opcode: OpCode,
    /// The operand payload
    pub operand: Operand,
}

impl Instruction {
    /// Creates an operand-less instruction.
    #[must_use]
    pub fn simple(opcode: OpCode) -> Self {
        Instruction {
            offset: 0,
            opcode,
            operand: Operand::None,
        }
    }

    /// Creates a token-operand instruction (`call`, `ldfld`, `box`, ...).
    #[must_use]
    pub fn with_token(opcode: OpCode, token: Token) -> Self {
        Instruction {
            offset: 0,
            opcode,
            operand: Operand::Token(token),
        }
    }

    /// Creates an `ldstr` instruction.
    #[must_use]
    pub fn ldstr(value: impl Into<String>) -> Self {
        Instruction {
            offset: 0,
            opcode: OpCode::Ldstr,
            operand: Operand::String(value.into()),
        }
    }

    /// Creates an `ldc.i4` instruction.
    #[must_use]
    pub fn ldc_i4(value: i32) -> Self {
        Instruction {
            offset: 0,
            opcode: OpCode::LdcI4,
            operand: Operand::Int32(value),
        }
    }

    /// Creates an `ldloc` instruction.
    #[must_use]
    pub fn ldloc(slot: u16) -> Self {
        Instruction {
            offset: 0,
            opcode: OpCode::Ldloc,
            operand: Operand::Local(slot),
        }
    }

    /// Creates an `stloc` instruction.
    #[must_use]
    pub fn stloc(slot: u16) -> Self {
        Instruction {
            offset: 0,
            opcode: OpCode::Stloc,
            operand: Operand::Local(slot),
        }
    }

    /// Creates an `ldarg` instruction.
    #[must_use]
    pub fn ldarg(slot: u16) -> Self {
        Instruction {
            offset: 0,
            opcode: OpCode::Ldarg,
            operand: Operand::Argument(slot),
        }
    }

    /// Creates a branch instruction with a displacement operand.
    #[must_use]
    pub fn branch(opcode: OpCode, target: i32) -> Self {
        Instruction {
            offset: 0,
            opcode,
            operand: Operand::Target(target),
        }
    }

    /// Human-readable mnemonic of the opcode.
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        self.opcode.mnemonic()
    }

    /// Control flow classification of the opcode.
    #[must_use]
    pub fn flow_type(&self) -> FlowType {
        self.opcode.flow_type()
    }

    /// Declared stack effect of the opcode.
    #[must_use]
    pub fn stack_behavior(&self) -> StackBehavior {
        self.opcode.stack_behavior()
    }

    /// Returns the token operand, if this instruction carries one.
    #[must_use]
    pub fn token_operand(&self) -> Option<Token> {
        match self.operand {
            Operand::Token(token) => Some(token),
            _ => None,
        }
    }

    /// Returns the string operand, if this instruction carries one.
    #[must_use]
    pub fn string_operand(&self) -> Option<&str> {
        match &self.operand {
            Operand::String(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::TableId;

    #[test]
    fn test_stack_behavior_basics() {
        assert_eq!(
            OpCode::Add.stack_behavior(),
            StackBehavior { pops: 2, pushes: 1 }
        );
        assert_eq!(
            OpCode::Ldstr.stack_behavior(),
            StackBehavior { pops: 0, pushes: 1 }
        );
        assert_eq!(
            OpCode::Stfld.stack_behavior(),
            StackBehavior { pops: 2, pushes: 0 }
        );
    }

    #[test]
    fn test_variable_arity_opcodes() {
        assert!(OpCode::Call.is_variable_arity());
        assert!(OpCode::Newobj.is_variable_arity());
        assert!(OpCode::Ret.is_variable_arity());
        assert!(!OpCode::Ldstr.is_variable_arity());
    }

    #[test]
    fn test_flow_types() {
        assert_eq!(OpCode::Callvirt.flow_type(), FlowType::Call);
        assert_eq!(OpCode::Brtrue.flow_type(), FlowType::ConditionalBranch);
        assert_eq!(OpCode::Throw.flow_type(), FlowType::Throw);
        assert_eq!(OpCode::Constrained.flow_type(), FlowType::Prefix);
        assert_eq!(OpCode::Nop.flow_type(), FlowType::Sequential);
    }

    #[test]
    fn test_instruction_constructors() {
        let token = Token::from_parts(TableId::MethodDef, 1);
        let call = Instruction::with_token(OpCode::Call, token);
        assert_eq!(call.token_operand(), Some(token));
        assert_eq!(call.mnemonic(), "call");

        let load = Instruction::ldstr("Foo");
        assert_eq!(load.string_operand(), Some("Foo"));
        assert_eq!(load.token_operand(), None);
    }
}

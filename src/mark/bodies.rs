//! Method-body scanning and deferred ("unreachable") bodies.

use std::collections::HashSet;

use crate::annotations::{DependencyInfo, DependencyKind};
use crate::assembly::{Instruction, OpCode};
use crate::mark::MarkStep;
use crate::metadata::tables::TableId;
use crate::metadata::token::Token;
use crate::Result;

impl MarkStep<'_> {
    /// Entry point for a method whose action requests body processing.
    ///
    /// Bodies of non-static methods on never-instantiated types that are
    /// worth replacing with a throw are deferred: their scan cost is only
    /// paid if the type later proves instantiated, and the throw-support
    /// constructor is marked up front so a later conversion needs no new
    /// marking.
    pub(crate) fn process_method_body(&mut self, method: Token) -> Result<()> {
        let node = self.graph.method(method);
        let Some(body) = node.body.as_ref() else {
            return Ok(());
        };

        if self.options.enable_unreachable_bodies
            && !node.is_static()
            && !self.annotations.is_instantiated(node.declaring)
            && is_worth_converting_to_throw(&body.instructions)
        {
            self.unreachable_bodies.push(method);
            self.mark_throw_support(method)?;
            return Ok(());
        }

        self.mark_method_body(method)
    }

    /// Re-evaluates deferred bodies: those whose declaring type has become
    /// instantiated are scanned now and leave the deferred list.
    pub(crate) fn process_deferred_bodies(&mut self) -> Result<bool> {
        let mut progressed = false;
        let deferred = std::mem::take(&mut self.unreachable_bodies);
        for method in deferred {
            let declaring = self.graph.method(method).declaring;
            if self.annotations.is_instantiated(declaring) {
                self.mark_method_body(method)?;
                progressed = true;
            } else {
                self.unreachable_bodies.push(method);
            }
        }
        Ok(progressed)
    }

    /// Full structural scan of one body.
    pub(crate) fn mark_method_body(&mut self, method: Token) -> Result<()> {
        self.annotations.set_body_scanned(method);

        let body = self
            .graph
            .method(method)
            .body
            .as_ref()
            .unwrap_or_else(|| panic!("scanning {method} which has no body"));

        for &local in &body.locals {
            self.mark_type(
                local,
                DependencyInfo::new(DependencyKind::LocalVariable, method),
            )?;
        }
        for handler in &body.handlers {
            if let Some(catch_type) = handler.catch_type {
                self.mark_type(
                    catch_type,
                    DependencyInfo::new(DependencyKind::CatchType, method),
                )?;
            }
        }
        for instruction in &body.instructions {
            self.scope.push_with_offset(method, instruction.offset);
            let result = self.mark_instruction_operand(method, instruction);
            self.scope.pop(method);
            result?;
        }

        self.mark_interfaces_needed_by_stack(method)?;
        self.scan_reflection_patterns(method)?;
        Ok(())
    }

    fn mark_instruction_operand(
        &mut self,
        method: Token,
        instruction: &Instruction,
    ) -> Result<()> {
        let Some(token) = instruction.token_operand() else {
            return Ok(());
        };
        let info = DependencyInfo::new(DependencyKind::InstructionOperand, method);
        match instruction.opcode {
            OpCode::Call
            | OpCode::Callvirt
            | OpCode::Newobj
            | OpCode::Ldftn
            | OpCode::Ldvirtftn => {
                self.mark_method_ref(token, info)?;
            }
            OpCode::Ldfld
            | OpCode::Ldflda
            | OpCode::Stfld
            | OpCode::Ldsfld
            | OpCode::Ldsflda
            | OpCode::Stsfld => {
                self.mark_field_ref(token, info)?;
            }
            OpCode::Ldtoken => {
                self.mark_token_operand(token, info)?;
            }
            _ => {
                self.mark_type(token, info)?;
            }
        }
        Ok(())
    }

    /// `ldtoken` accepts type, method and field tokens alike.
    fn mark_token_operand(&mut self, token: Token, info: DependencyInfo) -> Result<()> {
        match token.table_id() {
            Some(TableId::TypeDef | TableId::TypeRef) => {
                self.mark_type(token, info)?;
            }
            Some(TableId::MethodDef) => {
                self.mark_method_ref(token, info)?;
            }
            Some(TableId::Field) => {
                self.mark_field_ref(token, info)?;
            }
            Some(TableId::MemberRef) => {
                if self.graph.resolve_method(token).is_some() {
                    self.mark_method_ref(token, info)?;
                } else {
                    self.mark_field_ref(token, info)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// When a value of an interface-implementing type can sit on the stack
    /// where the interface itself is observed by the body, that
    /// implementation edge is not safe to remove even if the type never
    /// proves instantiated.
    fn mark_interfaces_needed_by_stack(&mut self, method: Token) -> Result<()> {
        let node = self.graph.method(method);
        let body = node.body.as_ref().unwrap_or_else(|| {
            panic!("interface stack analysis on {method} which has no body")
        });

        let mut referenced: HashSet<Token> = HashSet::new();
        for instruction in &body.instructions {
            let Some(token) = instruction.token_operand() else {
                continue;
            };
            match instruction.opcode {
                OpCode::Call | OpCode::Callvirt | OpCode::Ldftn | OpCode::Ldvirtftn => {
                    if let Some(target) = self.graph.resolve_method(token) {
                        let declaring = self.graph.method(target).declaring;
                        if self.graph.type_node(declaring).is_interface() {
                            referenced.insert(declaring);
                        }
                    }
                }
                OpCode::Castclass | OpCode::Isinst | OpCode::Box | OpCode::UnboxAny => {
                    if let Some(ty) = self.graph.resolve_type(token) {
                        if self.graph.type_node(ty).is_interface() {
                            referenced.insert(ty);
                        }
                    }
                }
                _ => {}
            }
        }
        if referenced.is_empty() {
            return Ok(());
        }

        let mut stack_types: Vec<Token> = Vec::new();
        for &local in &body.locals {
            stack_types.extend(self.graph.resolve_type(local));
        }
        for param in &node.params {
            stack_types.extend(self.graph.resolve_type(param.ty));
        }
        for instruction in &body.instructions {
            let Some(token) = instruction.token_operand() else {
                continue;
            };
            match instruction.opcode {
                OpCode::Newobj => {
                    if let Some(ctor) = self.graph.resolve_method(token) {
                        stack_types.push(self.graph.method(ctor).declaring);
                    }
                }
                OpCode::Box => {
                    stack_types.extend(self.graph.resolve_type(token));
                }
                _ => {}
            }
        }

        for stack_type in stack_types {
            let implementations = self.graph.type_node(stack_type).interfaces.clone();
            for interface_impl in implementations {
                let interface = self.graph.interface_impl(interface_impl).interface;
                let Some(interface) = self.graph.resolve_type(interface) else {
                    continue;
                };
                if referenced
                    .iter()
                    .any(|&target| self.interface_requires(interface, target))
                {
                    self.mark_interface_implementation(
                        interface_impl,
                        DependencyInfo::new(DependencyKind::InterfaceOnStack, method),
                    )?;
                }
            }
        }
        Ok(())
    }
}

/// Whether converting this body to a throw would actually shrink it.
/// Bodies that are already trivial are not worth deferring.
fn is_worth_converting_to_throw(instructions: &[Instruction]) -> bool {
    instructions
        .iter()
        .any(|i| !matches!(i.opcode, OpCode::Nop | OpCode::Ret))
}

//! The reflection-pattern scanner.
//!
//! A local, per-method, backward abstract interpreter over the decoded
//! instruction stream. For call sites to a closed set of recognized
//! reflection APIs it recovers literal member names, declaring types and
//! binding flags, and conservatively marks every member the call could
//! address. The recognized list is fixed; an argument that cannot be
//! resolved to a literal degrades the whole call site to an advisory
//! diagnostic — the analysis is allowed to miss members there, and that
//! unsoundness is deliberate.

use crate::annotations::{DependencyInfo, DependencyKind};
use crate::assembly::{FlowType, Instruction, OpCode, Operand};
use crate::mark::MarkStep;
use crate::metadata::diagnostics::DiagnosticCategory;
use crate::metadata::flags::BindingFlags;
use crate::metadata::token::Token;
use crate::metadata::wellknown;
use crate::Result;

/// The recognized reflection entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReflectionApi {
    GetMethod,
    GetField,
    GetProperty,
    GetEvent,
    GetConstructor,
    GetType,
    ExpressionCall,
    ExpressionField,
    ExpressionProperty,
}

impl MarkStep<'_> {
    /// Scans one body for recognized reflection call sites.
    pub(crate) fn scan_reflection_patterns(&mut self, method: Token) -> Result<()> {
        let body = self
            .graph
            .method(method)
            .body
            .as_ref()
            .unwrap_or_else(|| panic!("reflection scan on {method} which has no body"));
        let instructions = &body.instructions;

        for (index, instruction) in instructions.iter().enumerate() {
            if !matches!(instruction.opcode, OpCode::Call | OpCode::Callvirt) {
                continue;
            }
            let Some(token) = instruction.token_operand() else {
                continue;
            };
            let Some(target) = self.graph.resolve_method(token) else {
                continue;
            };
            let Some(api) = self.recognize_api(target) else {
                continue;
            };
            self.process_reflection_call(method, instructions, index, target, api)?;
        }
        Ok(())
    }

    fn recognize_api(&self, target: Token) -> Option<ReflectionApi> {
        let node = self.graph.method(target);
        let declaring = self.graph.type_node(node.declaring).full_name();
        match (declaring.as_str(), node.name.as_str()) {
            (wellknown::TYPE, "GetMethod") => Some(ReflectionApi::GetMethod),
            (wellknown::TYPE, "GetField") => Some(ReflectionApi::GetField),
            (wellknown::TYPE, "GetProperty") => Some(ReflectionApi::GetProperty),
            (wellknown::TYPE, "GetEvent") => Some(ReflectionApi::GetEvent),
            (wellknown::TYPE, "GetConstructor") => Some(ReflectionApi::GetConstructor),
            (wellknown::TYPE, "GetType") if node.is_static() => Some(ReflectionApi::GetType),
            (wellknown::EXPRESSION, "Call") => Some(ReflectionApi::ExpressionCall),
            (wellknown::EXPRESSION, "Field") => Some(ReflectionApi::ExpressionField),
            (wellknown::EXPRESSION, "Property") => Some(ReflectionApi::ExpressionProperty),
            _ => None,
        }
    }

    fn process_reflection_call(
        &mut self,
        method: Token,
        instructions: &[Instruction],
        call_index: usize,
        target: Token,
        api: ReflectionApi,
    ) -> Result<()> {
        let target_node = self.graph.method(target);
        let param_count = target_node.params.len();
        // Stack at the call: [this?, arg0, .., argN-1], top is the last
        // argument. Argument i sits at depth (N - 1 - i); `this` below all.
        let this_depth = param_count;
        let arg_depth = |index: usize| param_count - 1 - index;

        match api {
            ReflectionApi::GetType => {
                if param_count == 0 {
                    return Ok(());
                }
                let Some(name) = self.string_argument(instructions, call_index, arg_depth(0))
                else {
                    self.report_unanalyzable(method, instructions, call_index);
                    return Ok(());
                };
                match self.graph.type_by_fullname(&name) {
                    Some(resolved) => {
                        self.mark_type(
                            resolved,
                            DependencyInfo::new(DependencyKind::AccessedViaReflection, method),
                        )?;
                    }
                    None => {
                        self.diagnostics.info(
                            DiagnosticCategory::Reflection,
                            format!(
                                "Type name '{name}' used in {} does not resolve",
                                self.graph.method_full_name(method)
                            ),
                        );
                    }
                }
            }
            ReflectionApi::GetMethod
            | ReflectionApi::GetField
            | ReflectionApi::GetProperty
            | ReflectionApi::GetEvent => {
                let Some(declaring) = self.type_argument(instructions, call_index, this_depth)
                else {
                    self.report_unanalyzable(method, instructions, call_index);
                    return Ok(());
                };
                if param_count == 0 {
                    return Ok(());
                }
                let Some(name) =
                    self.string_argument(instructions, call_index, arg_depth(0))
                else {
                    self.report_unanalyzable(method, instructions, call_index);
                    return Ok(());
                };
                let flags = if param_count >= 2 {
                    match self.flags_argument(instructions, call_index, arg_depth(1)) {
                        Some(flags) => flags,
                        None => {
                            self.report_unanalyzable(method, instructions, call_index);
                            return Ok(());
                        }
                    }
                } else {
                    BindingFlags::empty()
                };
                self.mark_reflected_members(declaring, api, Some(&name), flags, method)?;
            }
            ReflectionApi::GetConstructor => {
                let Some(declaring) = self.type_argument(instructions, call_index, this_depth)
                else {
                    self.report_unanalyzable(method, instructions, call_index);
                    return Ok(());
                };
                self.mark_reflected_members(
                    declaring,
                    api,
                    None,
                    BindingFlags::empty(),
                    method,
                )?;
            }
            ReflectionApi::ExpressionCall
            | ReflectionApi::ExpressionField
            | ReflectionApi::ExpressionProperty => {
                if param_count < 2 {
                    return Ok(());
                }
                let Some(declaring) =
                    self.type_argument(instructions, call_index, arg_depth(0))
                else {
                    self.report_unanalyzable(method, instructions, call_index);
                    return Ok(());
                };
                let Some(name) =
                    self.string_argument(instructions, call_index, arg_depth(1))
                else {
                    self.report_unanalyzable(method, instructions, call_index);
                    return Ok(());
                };
                self.mark_reflected_members(
                    declaring,
                    api,
                    Some(&name),
                    BindingFlags::empty(),
                    method,
                )?;
            }
        }
        Ok(())
    }

    /// Walks backward from `from_index` to the instruction that produced the
    /// stack slot `depth` positions below the top at that point. `None` when
    /// the walk leaves straight-line code or hits an unresolvable arity.
    fn find_producer(
        &self,
        instructions: &[Instruction],
        from_index: usize,
        mut depth: usize,
    ) -> Option<usize> {
        let mut index = from_index;
        while index > 0 {
            index -= 1;
            let instruction = &instructions[index];
            match instruction.flow_type() {
                FlowType::Sequential | FlowType::Call | FlowType::Prefix => {}
                // A control-flow boundary means the slot may have multiple
                // producers; give up.
                _ => return None,
            }
            let (pushes, pops) = self.effective_arity(instruction)?;
            if pushes > depth {
                return Some(index);
            }
            depth -= pushes;
            depth += pops;
        }
        None
    }

    /// Push/pop arity of an instruction, resolving signature-dependent
    /// opcodes against the graph.
    fn effective_arity(&self, instruction: &Instruction) -> Option<(usize, usize)> {
        if !instruction.opcode.is_variable_arity() {
            let behavior = instruction.stack_behavior();
            return Some((behavior.pushes as usize, behavior.pops as usize));
        }
        match instruction.opcode {
            OpCode::Call | OpCode::Callvirt => {
                let target = self.graph.resolve_method(instruction.token_operand()?)?;
                let node = self.graph.method(target);
                let pops = node.params.len() + usize::from(node.has_this());
                let pushes = usize::from(!self.graph.is_void(node.return_type));
                Some((pushes, pops))
            }
            OpCode::Newobj => {
                let target = self.graph.resolve_method(instruction.token_operand()?)?;
                let node = self.graph.method(target);
                Some((1, node.params.len()))
            }
            // `ret` is a flow boundary and never appears mid-walk.
            _ => None,
        }
    }

    fn string_argument(
        &self,
        instructions: &[Instruction],
        call_index: usize,
        depth: usize,
    ) -> Option<String> {
        let producer = self.find_producer(instructions, call_index, depth)?;
        instructions[producer].string_operand().map(str::to_string)
    }

    fn flags_argument(
        &self,
        instructions: &[Instruction],
        call_index: usize,
        depth: usize,
    ) -> Option<BindingFlags> {
        let producer = self.find_producer(instructions, call_index, depth)?;
        match instructions[producer].operand {
            Operand::Int32(value) if instructions[producer].opcode == OpCode::LdcI4 => {
                Some(BindingFlags::from_bits_truncate(value as u32))
            }
            _ => None,
        }
    }

    fn type_argument(
        &self,
        instructions: &[Instruction],
        call_index: usize,
        depth: usize,
    ) -> Option<Token> {
        let producer = self.find_producer(instructions, call_index, depth)?;
        self.resolve_type_producer(instructions, producer, true)
    }

    /// Recognizes the `ldtoken T; call GetTypeFromHandle` shape, optionally
    /// routed through a single-assignment local.
    fn resolve_type_producer(
        &self,
        instructions: &[Instruction],
        producer: usize,
        allow_local_hop: bool,
    ) -> Option<Token> {
        let instruction = &instructions[producer];
        match instruction.opcode {
            OpCode::Call => {
                let target = self.graph.resolve_method(instruction.token_operand()?)?;
                let node = self.graph.method(target);
                let declaring = self.graph.type_node(node.declaring).full_name();
                if node.name != wellknown::GET_TYPE_FROM_HANDLE || declaring != wellknown::TYPE {
                    return None;
                }
                let handle = self.find_producer(instructions, producer, 0)?;
                let handle_instruction = &instructions[handle];
                if handle_instruction.opcode != OpCode::Ldtoken {
                    return None;
                }
                self.graph.resolve_type(handle_instruction.token_operand()?)
            }
            OpCode::Ldloc => {
                if !allow_local_hop {
                    return None;
                }
                let Operand::Local(slot) = instruction.operand else {
                    return None;
                };
                let stores: Vec<usize> = instructions
                    .iter()
                    .enumerate()
                    .filter(|(_, i)| {
                        i.opcode == OpCode::Stloc && i.operand == Operand::Local(slot)
                    })
                    .map(|(index, _)| index)
                    .collect();
                // Multiple assignments mean the local's value is not a
                // single known type.
                if stores.len() != 1 {
                    return None;
                }
                let value = self.find_producer(instructions, stores[0], 0)?;
                self.resolve_type_producer(instructions, value, false)
            }
            _ => None,
        }
    }

    /// Conservatively marks every member on `declaring` the recovered
    /// name/flags could address.
    fn mark_reflected_members(
        &mut self,
        declaring: Token,
        api: ReflectionApi,
        name: Option<&str>,
        flags: BindingFlags,
        source: Token,
    ) -> Result<()> {
        let info = DependencyInfo::new(DependencyKind::AccessedViaReflection, source);
        let (base_name, arity) = match name {
            Some(name) => {
                let (base, arity) = split_name_arity(name);
                (Some(base.to_string()), arity)
            }
            None => (None, None),
        };
        let mut matched = false;

        match api {
            ReflectionApi::GetMethod | ReflectionApi::ExpressionCall => {
                let methods: Vec<Token> = self
                    .graph
                    .type_node(declaring)
                    .methods
                    .iter()
                    .copied()
                    .filter(|&m| {
                        let node = self.graph.method(m);
                        base_name.as_deref() == Some(node.name.as_str())
                            && arity.is_none_or(|a| node.generic_params.len() == a)
                            && flags.admits(node.is_static(), node.flags.is_public())
                    })
                    .collect();
                for candidate in methods {
                    matched = true;
                    self.enqueue_method(candidate, info);
                    self.annotations.set_indirectly_called(candidate);
                }
            }
            ReflectionApi::GetConstructor => {
                let constructors: Vec<Token> = self
                    .graph
                    .type_node(declaring)
                    .methods
                    .iter()
                    .copied()
                    .filter(|&m| self.graph.method(m).is_constructor())
                    .collect();
                for candidate in constructors {
                    matched = true;
                    self.enqueue_method(candidate, info);
                    self.annotations.set_indirectly_called(candidate);
                }
            }
            ReflectionApi::GetField | ReflectionApi::ExpressionField => {
                let fields: Vec<Token> = self
                    .graph
                    .type_node(declaring)
                    .fields
                    .iter()
                    .copied()
                    .filter(|&f| {
                        let node = self.graph.field(f);
                        base_name.as_deref() == Some(node.name.as_str())
                            && flags.admits(node.is_static(), node.flags.is_public())
                    })
                    .collect();
                for candidate in fields {
                    matched = true;
                    self.mark_field(candidate, info)?;
                }
            }
            ReflectionApi::GetProperty | ReflectionApi::ExpressionProperty => {
                let properties: Vec<Token> = self
                    .graph
                    .type_node(declaring)
                    .properties
                    .iter()
                    .copied()
                    .filter(|&p| {
                        base_name.as_deref() == Some(self.graph.property(p).name.as_str())
                    })
                    .collect();
                for candidate in properties {
                    let node = self.graph.property(candidate);
                    let accessors: Vec<Token> =
                        [node.getter, node.setter].into_iter().flatten().collect();
                    let admitted = accessors.iter().any(|&a| {
                        let accessor = self.graph.method(a);
                        flags.admits(accessor.is_static(), accessor.flags.is_public())
                    });
                    if !admitted && !accessors.is_empty() {
                        continue;
                    }
                    matched = true;
                    self.mark_property(candidate, info)?;
                    for accessor in accessors {
                        self.enqueue_method(accessor, info);
                        self.annotations.set_indirectly_called(accessor);
                    }
                }
            }
            ReflectionApi::GetEvent => {
                let events: Vec<Token> = self
                    .graph
                    .type_node(declaring)
                    .events
                    .iter()
                    .copied()
                    .filter(|&e| base_name.as_deref() == Some(self.graph.event(e).name.as_str()))
                    .collect();
                for candidate in events {
                    matched = true;
                    self.mark_event(candidate, info)?;
                }
            }
            ReflectionApi::GetType => {}
        }

        if !matched {
            self.diagnostics.info(
                DiagnosticCategory::Reflection,
                format!(
                    "No members on '{}' match reflection lookup '{}' in {}",
                    self.graph.type_node(declaring).full_name(),
                    name.unwrap_or(".ctor"),
                    self.graph.method_full_name(source)
                ),
            );
        }
        Ok(())
    }

    fn report_unanalyzable(
        &self,
        method: Token,
        instructions: &[Instruction],
        call_index: usize,
    ) {
        self.diagnostics.warning(
            DiagnosticCategory::Reflection,
            format!(
                "Could not analyze reflection call at IL_{:04x} in {}",
                instructions[call_index].offset,
                self.graph.method_full_name(method)
            ),
        );
    }
}

/// Splits a possibly arity-suffixed name (`List`1`) into base name and
/// generic arity.
fn split_name_arity(name: &str) -> (&str, Option<usize>) {
    match name.split_once('`') {
        Some((base, arity)) => match arity.parse::<usize>() {
            Ok(arity) => (base, Some(arity)),
            Err(_) => (name, None),
        },
        None => (name, None),
    }
}

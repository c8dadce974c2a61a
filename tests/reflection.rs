//! Reflection-pattern recovery: literal name marking, binding-flag
//! constraints, the local-variable hop, and unanalyzable degradation.

use std::sync::Arc;

use trimscope::annotations::Annotations;
use trimscope::assembly::{Instruction, OpCode};
use trimscope::metadata::diagnostics::{DiagnosticCategory, DiagnosticSeverity, Diagnostics};
use trimscope::metadata::graph::{GraphBuilder, MetadataGraph};
use trimscope::metadata::token::Token;
use trimscope::metadata::typemap::VirtualMaps;
use trimscope::mark::{MarkOptions, MarkStep};

/// Reflection surface shared by the scenarios below.
struct ReflectionApis {
    get_type_from_handle: Token,
    get_method: Token,
    get_method_with_flags: Token,
    get_field: Token,
    get_constructor: Token,
    get_type: Token,
    expression_call: Token,
}

fn define_reflection_apis(builder: &mut GraphBuilder) -> ReflectionApis {
    let core = builder.core_types();
    let type_type = core.type_type;
    let handle = builder.external_type("System", "RuntimeTypeHandle");
    let method_info = builder.external_type("System.Reflection", "MethodInfo");
    let field_info = builder.external_type("System.Reflection", "FieldInfo");
    let ctor_info = builder.external_type("System.Reflection", "ConstructorInfo");
    let type_array = builder.external_type("System", "Type[]");
    let int_type = builder.external_type("System", "Int32");

    let get_type_from_handle = builder
        .method(type_type, "GetTypeFromHandle")
        .static_()
        .public()
        .param(handle)
        .returns(type_type)
        .define();
    let get_method = builder
        .method(type_type, "GetMethod")
        .public()
        .param(core.string)
        .returns(method_info)
        .define();
    let get_method_with_flags = builder
        .method(type_type, "GetMethod")
        .public()
        .param(core.string)
        .param(int_type)
        .returns(method_info)
        .define();
    let get_field = builder
        .method(type_type, "GetField")
        .public()
        .param(core.string)
        .returns(field_info)
        .define();
    let get_constructor = builder
        .method(type_type, "GetConstructor")
        .public()
        .param(type_array)
        .returns(ctor_info)
        .define();
    let get_type = builder
        .method(type_type, "GetType")
        .static_()
        .public()
        .param(core.string)
        .returns(type_type)
        .define();

    let expression = builder
        .class("System.Linq.Expressions", "Expression")
        .base(core.object)
        .define();
    let expression_call = builder
        .method(expression, "Call")
        .static_()
        .public()
        .param(type_type)
        .param(core.string)
        .returns(expression)
        .define();

    ReflectionApis {
        get_type_from_handle,
        get_method,
        get_method_with_flags,
        get_field,
        get_constructor,
        get_type,
        expression_call,
    }
}

fn run(graph: &MetadataGraph, main: Token) -> (Annotations, Arc<Diagnostics>) {
    let maps = VirtualMaps::build(graph);
    let mut annotations = Annotations::new(graph, maps);
    let diagnostics = Arc::new(Diagnostics::new());
    let mut step = MarkStep::new(
        graph,
        &mut annotations,
        diagnostics.clone(),
        MarkOptions::default(),
    );
    step.root_method(main);
    step.process().expect("marking completes");
    drop(step);
    (annotations, diagnostics)
}

#[test]
fn get_method_marks_private_static_member() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let apis = define_reflection_apis(&mut builder);
    let target = builder.class("App", "Target").base(core.object).define();
    let foo = builder
        .method(target, "Foo")
        .static_()
        .private()
        .body(vec![Instruction::simple(OpCode::Ret)])
        .define();
    let other = builder
        .method(target, "Other")
        .static_()
        .private()
        .define();
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::with_token(OpCode::Ldtoken, target),
            Instruction::with_token(OpCode::Call, apis.get_type_from_handle),
            Instruction::ldstr("Foo"),
            Instruction::with_token(OpCode::Callvirt, apis.get_method),
            Instruction::simple(OpCode::Pop),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let (annotations, _) = run(&graph, main);
    assert!(annotations.is_marked(foo));
    assert!(annotations.is_indirectly_called(foo));
    assert!(!annotations.is_marked(other));
}

#[test]
fn get_method_with_unknown_name_only_logs() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let apis = define_reflection_apis(&mut builder);
    let target = builder.class("App", "Target").base(core.object).define();
    let foo = builder
        .method(target, "Foo")
        .static_()
        .private()
        .define();
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::with_token(OpCode::Ldtoken, target),
            Instruction::with_token(OpCode::Call, apis.get_type_from_handle),
            Instruction::ldstr("Bar"),
            Instruction::with_token(OpCode::Callvirt, apis.get_method),
            Instruction::simple(OpCode::Pop),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let (annotations, diagnostics) = run(&graph, main);
    assert!(!annotations.is_marked(foo));
    let advisory = diagnostics
        .iter()
        .any(|d| d.category == DiagnosticCategory::Reflection && d.message.contains("Bar"));
    assert!(advisory);
}

#[test]
fn unanalyzable_argument_degrades_to_warning() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let apis = define_reflection_apis(&mut builder);
    let target = builder.class("App", "Target").base(core.object).define();
    let foo = builder.method(target, "Foo").static_().private().define();
    let program = builder.class("App", "Program").base(core.object).define();
    // The member name comes from a local whose value is unknown.
    let main = builder
        .method(program, "Main")
        .static_()
        .locals(vec![core.string])
        .body(vec![
            Instruction::with_token(OpCode::Ldtoken, target),
            Instruction::with_token(OpCode::Call, apis.get_type_from_handle),
            Instruction::ldloc(0),
            Instruction::with_token(OpCode::Callvirt, apis.get_method),
            Instruction::simple(OpCode::Pop),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let (annotations, diagnostics) = run(&graph, main);
    assert!(!annotations.is_marked(foo));
    let warned = diagnostics.iter().any(|d| {
        d.severity == DiagnosticSeverity::Warning
            && d.category == DiagnosticCategory::Reflection
            && d.message.contains("Could not analyze")
    });
    assert!(warned);
}

#[test]
fn get_type_resolves_literal_type_names() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let apis = define_reflection_apis(&mut builder);
    let hidden = builder.class("App", "Hidden").base(core.object).define();
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::ldstr("App.Hidden"),
            Instruction::with_token(OpCode::Call, apis.get_type),
            Instruction::simple(OpCode::Pop),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let (annotations, _) = run(&graph, main);
    assert!(annotations.is_marked(hidden));
}

#[test]
fn type_object_routed_through_single_local() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let apis = define_reflection_apis(&mut builder);
    let target = builder.class("App", "Target").base(core.object).define();
    let foo = builder.method(target, "Foo").static_().private().define();
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .locals(vec![core.type_type])
        .body(vec![
            Instruction::with_token(OpCode::Ldtoken, target),
            Instruction::with_token(OpCode::Call, apis.get_type_from_handle),
            Instruction::stloc(0),
            Instruction::ldloc(0),
            Instruction::ldstr("Foo"),
            Instruction::with_token(OpCode::Callvirt, apis.get_method),
            Instruction::simple(OpCode::Pop),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let (annotations, _) = run(&graph, main);
    assert!(annotations.is_marked(foo));
}

#[test]
fn binding_flags_constrain_the_match() {
    // STATIC = 0x08, PUBLIC = 0x10, NON_PUBLIC = 0x20
    for (flags, expect_marked) in [(0x08 | 0x10, false), (0x08 | 0x20, true)] {
        let mut builder = GraphBuilder::new("App");
        let core = builder.core_types();
        let apis = define_reflection_apis(&mut builder);
        let target = builder.class("App", "Target").base(core.object).define();
        let foo = builder.method(target, "Foo").static_().private().define();
        let program = builder.class("App", "Program").base(core.object).define();
        let main = builder
            .method(program, "Main")
            .static_()
            .body(vec![
                Instruction::with_token(OpCode::Ldtoken, target),
                Instruction::with_token(OpCode::Call, apis.get_type_from_handle),
                Instruction::ldstr("Foo"),
                Instruction::ldc_i4(flags),
                Instruction::with_token(OpCode::Callvirt, apis.get_method_with_flags),
                Instruction::simple(OpCode::Pop),
                Instruction::simple(OpCode::Ret),
            ])
            .define();
        let graph = builder.build();

        let (annotations, _) = run(&graph, main);
        assert_eq!(
            annotations.is_marked(foo),
            expect_marked,
            "flags 0x{flags:02x}"
        );
    }
}

#[test]
fn get_field_and_get_constructor_mark_members() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let apis = define_reflection_apis(&mut builder);
    let target = builder.class("App", "Target").base(core.object).define();
    let count = builder.field(target, "count", core.string).define();
    let ctor = builder.method(target, ".ctor").public().define();
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::with_token(OpCode::Ldtoken, target),
            Instruction::with_token(OpCode::Call, apis.get_type_from_handle),
            Instruction::ldstr("count"),
            Instruction::with_token(OpCode::Callvirt, apis.get_field),
            Instruction::simple(OpCode::Pop),
            Instruction::with_token(OpCode::Ldtoken, target),
            Instruction::with_token(OpCode::Call, apis.get_type_from_handle),
            Instruction::simple(OpCode::Ldnull),
            Instruction::with_token(OpCode::Callvirt, apis.get_constructor),
            Instruction::simple(OpCode::Pop),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let (annotations, _) = run(&graph, main);
    assert!(annotations.is_marked(count));
    assert!(annotations.is_marked(ctor));
    assert!(annotations.is_indirectly_called(ctor));
}

#[test]
fn expression_call_marks_named_methods() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let apis = define_reflection_apis(&mut builder);
    let target = builder.class("App", "Target").base(core.object).define();
    let process = builder
        .method(target, "Process")
        .static_()
        .public()
        .define();
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::with_token(OpCode::Ldtoken, target),
            Instruction::with_token(OpCode::Call, apis.get_type_from_handle),
            Instruction::ldstr("Process"),
            Instruction::with_token(OpCode::Call, apis.expression_call),
            Instruction::simple(OpCode::Pop),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let (annotations, _) = run(&graph, main);
    assert!(annotations.is_marked(process));
    assert!(annotations.is_indirectly_called(process));
}

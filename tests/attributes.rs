//! Staged attribute processing: the lazy assembly-level queue, the late
//! used-attribute-types-only queue, and debugger attribute decoding.

use std::sync::Arc;

use trimscope::annotations::Annotations;
use trimscope::assembly::{Instruction, OpCode};
use trimscope::metadata::diagnostics::Diagnostics;
use trimscope::metadata::graph::{AttributeArgument, GraphBuilder, MetadataGraph};
use trimscope::metadata::token::Token;
use trimscope::metadata::typemap::VirtualMaps;
use trimscope::mark::{MarkOptions, MarkStep};

fn run(
    graph: &MetadataGraph,
    root_methods: &[Token],
    root_types: &[Token],
    options: MarkOptions,
) -> (Annotations, Arc<Diagnostics>) {
    let maps = VirtualMaps::build(graph);
    let mut annotations = Annotations::new(graph, maps);
    let diagnostics = Arc::new(Diagnostics::new());
    let mut step = MarkStep::new(graph, &mut annotations, diagnostics.clone(), options);
    for &ty in root_types {
        step.root_type(ty);
    }
    for &method in root_methods {
        step.root_method(method);
    }
    step.process().expect("marking completes");
    drop(step);
    (annotations, diagnostics)
}

struct ForwardReferenceScenario {
    graph: MetadataGraph,
    attribute: Token,
    target: Token,
    main: Token,
}

/// An assembly-level `[MyAttr(typeof(Target))]` in a library that the
/// application does not otherwise touch.
fn forward_reference_scenario() -> ForwardReferenceScenario {
    let mut builder = GraphBuilder::new("Corlib");
    let core = builder.core_types();
    let lib_assembly = builder.add_assembly("Lib");
    let my_attr = builder.class("Lib", "MyAttr").base(core.object).define();
    let my_attr_ctor = builder
        .method(my_attr, ".ctor")
        .public()
        .param(core.type_type)
        .define();
    let target = builder.class("Lib", "Target").base(core.object).define();
    let attribute = builder.attribute(my_attr_ctor, vec![AttributeArgument::Type(target)]);
    builder.attach_assembly_attribute(lib_assembly, attribute);

    builder.add_assembly("App");
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![Instruction::simple(OpCode::Ret)])
        .define();

    ForwardReferenceScenario {
        graph: builder.build(),
        attribute,
        target,
        main,
    }
}

#[test]
fn assembly_attribute_in_unused_library_stays_unmarked() {
    let scenario = forward_reference_scenario();
    let (annotations, _) = run(
        &scenario.graph,
        &[scenario.main],
        &[],
        MarkOptions::default(),
    );

    assert!(!annotations.is_marked(scenario.attribute));
    assert!(!annotations.is_marked(scenario.target));
}

#[test]
fn assembly_attribute_marked_once_library_is_used() {
    let scenario = forward_reference_scenario();
    let (annotations, _) = run(
        &scenario.graph,
        &[scenario.main],
        &[scenario.target],
        MarkOptions::default(),
    );

    // Rooting the target marks the library module, which lets the lazy
    // phase deliver the attribute in the same run.
    assert!(annotations.is_marked(scenario.attribute));
    assert!(annotations.is_marked(scenario.target));
}

#[test]
fn member_attributes_marked_eagerly_by_default() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let marker = builder.class("App", "MarkerAttribute").base(core.object).define();
    let marker_ctor = builder.method(marker, ".ctor").public().define();
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![Instruction::simple(OpCode::Ret)])
        .define();
    let attribute = builder.attribute(marker_ctor, vec![]);
    builder.attach_attribute(main, attribute);
    let graph = builder.build();

    let (annotations, _) = run(&graph, &[main], &[], MarkOptions::default());
    assert!(annotations.is_marked(attribute));
    assert!(annotations.is_marked(marker_ctor));
    assert!(annotations.is_marked(marker));
}

#[test]
fn used_attribute_types_only_gates_member_attributes() {
    let build = || {
        let mut builder = GraphBuilder::new("App");
        let core = builder.core_types();
        let marker = builder
            .class("App", "MarkerAttribute")
            .base(core.object)
            .define();
        let marker_ctor = builder.method(marker, ".ctor").public().define();
        let program = builder.class("App", "Program").base(core.object).define();
        let main = builder
            .method(program, "Main")
            .static_()
            .body(vec![Instruction::simple(OpCode::Ret)])
            .define();
        let used_main = builder
            .method(program, "UsedMain")
            .static_()
            .body(vec![
                Instruction::with_token(OpCode::Ldtoken, marker),
                Instruction::simple(OpCode::Pop),
                Instruction::simple(OpCode::Ret),
            ])
            .define();
        let attribute = builder.attribute(marker_ctor, vec![]);
        builder.attach_attribute(main, attribute);
        (builder.build(), main, used_main, attribute)
    };
    let options = MarkOptions::default().used_attribute_types_only_policy(true);

    // The attribute type is never used: the attribute is dropped.
    let (graph, main, _, attribute) = build();
    let (annotations, _) = run(&graph, &[main], &[], options);
    assert!(!annotations.is_marked(attribute));

    // A second root makes the attribute type used: the late phase delivers.
    let (graph, main, used_main, attribute) = build();
    let (annotations, _) = run(&graph, &[main, used_main], &[], options);
    assert!(annotations.is_marked(attribute));
}

#[test]
fn debugger_display_marks_referenced_members() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let display_attr = builder
        .class("System.Diagnostics", "DebuggerDisplayAttribute")
        .base(core.object)
        .define();
    let display_ctor = builder
        .method(display_attr, ".ctor")
        .public()
        .param(core.string)
        .define();

    let inventory = builder.class("App", "Inventory").base(core.object).define();
    let count_field = builder.field(inventory, "count", core.string).define();
    let describe = builder
        .method(inventory, "Describe")
        .public()
        .body(vec![Instruction::simple(OpCode::Ret)])
        .define();
    let untouched = builder.method(inventory, "Untouched").public().define();
    let attribute = builder.attribute(
        display_ctor,
        vec![AttributeArgument::String(
            "{count}: {Describe(),nq}".to_string(),
        )],
    );
    builder.attach_attribute(inventory, attribute);

    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::with_token(OpCode::Ldtoken, inventory),
            Instruction::simple(OpCode::Pop),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let (annotations, _) = run(&graph, &[main], &[], MarkOptions::default());
    assert!(annotations.is_marked(count_field));
    assert!(annotations.is_marked(describe));
    assert!(!annotations.is_marked(untouched));

    let no_debugger = MarkOptions::default().keep_members_for_debugger_policy(false);
    let (annotations, _) = run(&graph, &[main], &[], no_debugger);
    assert!(!annotations.is_marked(count_field));
    assert!(!annotations.is_marked(describe));
}

#[test]
fn debugger_type_proxy_marks_proxy_members() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let proxy_attr = builder
        .class("System.Diagnostics", "DebuggerTypeProxyAttribute")
        .base(core.object)
        .define();
    let proxy_ctor = builder
        .method(proxy_attr, ".ctor")
        .public()
        .param(core.type_type)
        .define();

    let proxy = builder.class("App", "InventoryView").base(core.object).define();
    let proxy_items = builder.method(proxy, "Items").public().define();

    let inventory = builder.class("App", "Inventory").base(core.object).define();
    let attribute = builder.attribute(proxy_ctor, vec![AttributeArgument::Type(proxy)]);
    builder.attach_attribute(inventory, attribute);

    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::with_token(OpCode::Ldtoken, inventory),
            Instruction::simple(OpCode::Pop),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let (annotations, _) = run(&graph, &[main], &[], MarkOptions::default());
    assert!(annotations.is_marked(proxy));
    assert!(annotations.is_marked(proxy_items));
}

#[test]
fn reflection_usage_forces_disable_private_reflection() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let disable = builder
        .class(
            "System.Runtime.CompilerServices",
            "DisablePrivateReflectionAttribute",
        )
        .base(core.object)
        .define();
    let disable_ctor = builder.method(disable, ".ctor").public().define();

    let handle = builder.external_type("System", "RuntimeTypeHandle");
    let method_info = builder.external_type("System.Reflection", "MethodInfo");
    let get_type_from_handle = builder
        .method(core.type_type, "GetTypeFromHandle")
        .static_()
        .public()
        .param(handle)
        .returns(core.type_type)
        .define();
    let get_method = builder
        .method(core.type_type, "GetMethod")
        .public()
        .param(core.string)
        .returns(method_info)
        .define();

    let target = builder.class("App", "Target").base(core.object).define();
    let hidden = builder.method(target, "Hidden").static_().private().define();
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::with_token(OpCode::Ldtoken, target),
            Instruction::with_token(OpCode::Call, get_type_from_handle),
            Instruction::ldstr("Hidden"),
            Instruction::with_token(OpCode::Callvirt, get_method),
            Instruction::simple(OpCode::Pop),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let options = MarkOptions::default().used_attribute_types_only_policy(true);
    let (annotations, _) = run(&graph, &[main], &[], options);

    assert!(annotations.is_marked(hidden));
    assert!(annotations.is_marked(disable));
    assert!(annotations.is_marked(disable_ctor));
}

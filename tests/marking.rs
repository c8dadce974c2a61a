//! Structural marking fundamentals: reachability closure, field/cctor rules,
//! resolution policy, special type shapes, assembly actions.

use std::sync::Arc;

use trimscope::annotations::Annotations;
use trimscope::assembly::{Instruction, OpCode};
use trimscope::metadata::diagnostics::Diagnostics;
use trimscope::metadata::graph::{GraphBuilder, MetadataGraph};
use trimscope::metadata::token::Token;
use trimscope::metadata::typemap::VirtualMaps;
use trimscope::mark::{MarkOptions, MarkStep};
use trimscope::prelude::{AssemblyAction, MethodAction, StubValue, TypePreserve};
use trimscope::{Error, Result};

fn run(
    graph: &MetadataGraph,
    root_methods: &[Token],
    root_types: &[Token],
    options: MarkOptions,
    setup: impl FnOnce(&mut Annotations),
) -> Result<(Annotations, Arc<Diagnostics>)> {
    let maps = VirtualMaps::build(graph);
    let mut annotations = Annotations::new(graph, maps);
    setup(&mut annotations);
    let diagnostics = Arc::new(Diagnostics::new());
    let mut step = MarkStep::new(graph, &mut annotations, diagnostics.clone(), options);
    for &ty in root_types {
        step.root_type(ty);
    }
    for &method in root_methods {
        step.root_method(method);
    }
    step.process()?;
    drop(step);
    Ok((annotations, diagnostics))
}

#[test]
fn root_method_closure() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let helper = builder.class("App", "Helper").base(core.object).define();
    let work = builder
        .method(helper, "Work")
        .static_()
        .public()
        .body(vec![Instruction::simple(OpCode::Ret)])
        .define();
    let unrelated = builder.class("App", "Unused").base(core.object).define();
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .public()
        .body(vec![
            Instruction::with_token(OpCode::Call, work),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let (annotations, _) = run(&graph, &[main], &[], MarkOptions::default(), |_| {}).unwrap();

    assert!(annotations.is_marked(main));
    assert!(annotations.is_marked(work));
    assert!(annotations.is_marked(program));
    assert!(annotations.is_marked(helper));
    assert!(annotations.is_marked(graph.type_node(program).assembly));
    assert!(!annotations.is_marked(unrelated));
    assert_eq!(annotations.action(main), MethodAction::Parse);
    assert_eq!(annotations.action(work), MethodAction::Parse);
    assert!(annotations.is_body_scanned(main));
}

#[test]
fn marked_field_pulls_static_constructor() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let config = builder.class("App", "Config").base(core.object).define();
    let value = builder
        .field(config, "value", core.string)
        .static_()
        .define();
    let cctor = builder
        .method(config, ".cctor")
        .static_()
        .body(vec![Instruction::simple(OpCode::Ret)])
        .define();
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::with_token(OpCode::Ldsfld, value),
            Instruction::simple(OpCode::Pop),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let (annotations, _) = run(&graph, &[main], &[], MarkOptions::default(), |_| {}).unwrap();
    assert!(annotations.is_marked(value));
    assert!(annotations.is_marked(cctor));

    // An exempted (side-effect-free) static constructor stays removable.
    let (annotations, _) = run(&graph, &[main], &[], MarkOptions::default(), |a| {
        a.exempt_cctor(config);
    })
    .unwrap();
    assert!(annotations.is_marked(value));
    assert!(!annotations.is_marked(cctor));
}

#[test]
fn unresolved_reference_is_fatal_by_default() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let missing_type = builder.type_ref("Elsewhere", "Gone", None);
    let missing = builder.member_ref(missing_type, "Vanish", None);
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::with_token(OpCode::Call, missing),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let error = run(&graph, &[main], &[], MarkOptions::default(), |_| {}).unwrap_err();
    match error {
        Error::MethodProcessing { method, assembly, .. } => {
            assert!(method.contains("Main"));
            assert_eq!(assembly, "App");
        }
        other => panic!("expected MethodProcessing, got {other}"),
    }
}

#[test]
fn unresolved_reference_ignored_by_policy() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let missing_type = builder.type_ref("Elsewhere", "Gone", None);
    let missing = builder.member_ref(missing_type, "Vanish", None);
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::with_token(OpCode::Call, missing),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let options = MarkOptions::default().ignore_unresolved(true);
    let (annotations, diagnostics) = run(&graph, &[main], &[], options, |_| {}).unwrap();
    assert!(annotations.is_marked(main));
    assert_eq!(diagnostics.error_count(), 1);
}

#[test]
fn delegate_type_keeps_whole_method_set() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let delegate_base = builder
        .class("System", "Delegate")
        .base(core.object)
        .define();
    let multicast = builder
        .class("System", "MulticastDelegate")
        .base(delegate_base)
        .define();
    let callback = builder.class("App", "Callback").base(multicast).define();
    let ctor = builder.method(callback, ".ctor").public().define();
    let invoke = builder.method(callback, "Invoke").public().define();
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::with_token(OpCode::Ldtoken, callback),
            Instruction::simple(OpCode::Pop),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let (annotations, _) = run(&graph, &[main], &[], MarkOptions::default(), |_| {}).unwrap();
    assert!(annotations.is_marked(callback));
    assert!(annotations.is_marked(ctor));
    assert!(annotations.is_marked(invoke));
}

#[test]
fn exported_alias_resolved_for_marked_target() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let target = builder.class("Lib", "Moved").base(core.object).define();
    let orphan = builder.class("Lib", "Orphan").base(core.object).define();
    let alias = builder.exported_type("Lib", "Moved", target);
    let orphan_alias = builder.exported_type("Lib", "Orphan", orphan);
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::with_token(OpCode::Ldtoken, target),
            Instruction::simple(OpCode::Pop),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let (annotations, _) = run(&graph, &[main], &[], MarkOptions::default(), |_| {}).unwrap();
    assert!(annotations.is_marked(alias));
    assert!(!annotations.is_marked(orphan_alias));
}

#[test]
fn interop_method_marks_marshaling_shape() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let native_buffer = builder
        .class("App", "NativeBuffer")
        .base(core.value_type)
        .sequential_layout()
        .define();
    let length = builder.field(native_buffer, "length", core.string).define();
    let buffer_ctor = builder.method(native_buffer, ".ctor").public().define();
    let program = builder.class("App", "Program").base(core.object).define();
    let native = builder
        .method(program, "NativeCall")
        .static_()
        .pinvoke("native.dll", "native_call")
        .param_by_ref(native_buffer)
        .define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::with_token(OpCode::Call, native),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let (annotations, _) = run(&graph, &[main], &[], MarkOptions::default(), |_| {}).unwrap();
    assert!(annotations.is_marked(native));
    // Marshaling reaches fields directly and may construct by-ref
    // parameters on the native side.
    assert!(annotations.is_marked(length));
    assert!(annotations.is_marked(buffer_ctor));
}

#[test]
fn serializable_type_keeps_callbacks_and_default_ctor() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let on_serializing = builder
        .class("System.Runtime.Serialization", "OnSerializingAttribute")
        .base(core.object)
        .define();
    let on_serializing_ctor = builder.method(on_serializing, ".ctor").public().define();
    let context = builder.external_type("System.Runtime.Serialization", "StreamingContext");

    let snapshot = builder
        .class("App", "Snapshot")
        .base(core.object)
        .serializable()
        .define();
    let ctor = builder.method(snapshot, ".ctor").public().define();
    let callback = builder
        .method(snapshot, "OnSerializing")
        .private()
        .param(context)
        .define();
    let attribute = builder.attribute(on_serializing_ctor, vec![]);
    builder.attach_attribute(callback, attribute);

    let plain = builder
        .method(snapshot, "Plain")
        .private()
        .param(context)
        .define();

    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::with_token(OpCode::Ldtoken, snapshot),
            Instruction::simple(OpCode::Pop),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let (annotations, _) = run(&graph, &[main], &[], MarkOptions::default(), |_| {}).unwrap();
    assert!(annotations.is_marked(ctor));
    assert!(annotations.is_marked(callback));
    assert!(!annotations.is_marked(plain));
}

#[test]
fn event_source_provider_groups_keep_static_fields() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let event_source = builder
        .class("System.Diagnostics.Tracing", "EventSource")
        .base(core.object)
        .define();
    let provider = builder
        .class("App", "AppEvents")
        .base(event_source)
        .define();
    let keywords = builder
        .class("App", "Keywords")
        .base(core.object)
        .nested_in(provider)
        .define();
    let flag = builder
        .field(keywords, "Startup", core.string)
        .static_()
        .define();
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::with_token(OpCode::Ldtoken, provider),
            Instruction::simple(OpCode::Pop),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let (annotations, _) = run(&graph, &[main], &[], MarkOptions::default(), |_| {}).unwrap();
    assert!(annotations.is_marked(keywords));
    assert!(annotations.is_marked(flag));
}

#[test]
fn fully_preserved_assembly_counts_as_instantiated() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let iface = builder.interface("App", "IThing").define();
    let service = builder.class("App", "Service").base(core.object).define();
    builder.interface_impl(service, iface);
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![Instruction::simple(OpCode::Ret)])
        .define();
    let assembly = builder.current_assembly();
    let graph = builder.build();

    let (annotations, _) = run(&graph, &[main], &[service], MarkOptions::default(), |a| {
        a.set_assembly_action(assembly, AssemblyAction::Copy);
    })
    .unwrap();

    assert!(annotations.is_instantiated(service));
    // All implementation edges of a fully preserved type are kept.
    let edge = graph.type_node(service).interfaces[0];
    assert!(annotations.is_marked(edge));
}

#[test]
fn preserve_requests_are_applied_and_duplicates_warn() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let store = builder.class("App", "Store").base(core.object).define();
    let save = builder.method(store, "Save").public().define();
    let count = builder.field(store, "count", core.string).define();
    let anchored = builder.method(store, "Anchored").private().define();
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::with_token(OpCode::Ldtoken, store),
            Instruction::simple(OpCode::Pop),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let (annotations, diagnostics) = run(&graph, &[main], &[], MarkOptions::default(), |a| {
        a.set_preserve(store, TypePreserve::Fields);
        a.set_preserve(store, TypePreserve::Methods);
        a.add_preserved_method(store, anchored);
    })
    .unwrap();

    assert!(annotations.is_marked(save));
    assert!(annotations.is_marked(count));
    assert!(annotations.is_marked(anchored));
    assert_eq!(diagnostics.warning_count(), 1);
}

#[test]
fn generic_instantiation_marks_arguments_and_constraints() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let constraint = builder.interface("App", "IConstraint").define();
    let container = builder
        .class("App.Collections", "Box`1")
        .base(core.object)
        .define();
    builder
        .generic_param(container, "T")
        .constraint(constraint)
        .default_ctor_constraint()
        .define();

    let argument = builder.class("App", "Payload").base(core.object).define();
    let argument_ctor = builder.method(argument, ".ctor").public().define();
    let instance = builder.generic_instance(container, vec![argument]);

    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::with_token(OpCode::Ldtoken, instance),
            Instruction::simple(OpCode::Pop),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let (annotations, _) = run(&graph, &[main], &[], MarkOptions::default(), |_| {}).unwrap();
    assert!(annotations.is_marked(instance));
    assert!(annotations.is_marked(argument));
    assert!(annotations.is_marked(constraint));
    // The `new()` constraint keeps the argument's default constructor.
    assert!(annotations.is_marked(argument_ctor));
}

#[test]
fn module_type_with_methods_is_premarked() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let module_type = builder.module_type();
    let module_cctor = builder
        .method(module_type, ".cctor")
        .static_()
        .body(vec![Instruction::simple(OpCode::Ret)])
        .define();
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![Instruction::simple(OpCode::Ret)])
        .define();
    let graph = builder.build();

    let (annotations, _) = run(&graph, &[main], &[], MarkOptions::default(), |_| {}).unwrap();
    // Module initializers run unconditionally once the module loads.
    assert!(annotations.is_marked(module_type));
    assert!(annotations.is_marked(module_cctor));
}

#[test]
fn accessor_marks_owning_property_and_event() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let widget = builder.class("App", "Widget").base(core.object).define();
    let getter = builder
        .method(widget, "get_Count")
        .public()
        .returns(core.string)
        .body(vec![Instruction::simple(OpCode::Ret)])
        .define();
    let property = builder.property(widget, "Count", Some(getter), None);
    let add_handler = builder
        .method(widget, "add_Changed")
        .public()
        .body(vec![Instruction::simple(OpCode::Ret)])
        .define();
    let remove_handler = builder
        .method(widget, "remove_Changed")
        .public()
        .body(vec![Instruction::simple(OpCode::Ret)])
        .define();
    let event = builder.event(widget, "Changed", Some(add_handler), Some(remove_handler));
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::with_token(OpCode::Call, getter),
            Instruction::simple(OpCode::Pop),
            Instruction::with_token(OpCode::Call, add_handler),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();

    let (annotations, _) = run(&graph, &[main], &[], MarkOptions::default(), |_| {}).unwrap();
    assert!(annotations.is_marked(property));
    // Event marking pulls in the remaining accessors.
    assert!(annotations.is_marked(event));
    assert!(annotations.is_marked(remove_handler));
}

#[test]
fn stub_and_throw_actions_mark_minimal_support() {
    let mut builder = GraphBuilder::new("App");
    let core = builder.core_types();
    let base = builder.class("App", "Base").base(core.object).define();
    let base_ctor = builder.method(base, ".ctor").public().define();
    let widget = builder.class("App", "Widget").base(base).define();
    let widget_ctor = builder
        .method(widget, ".ctor")
        .public()
        .body(vec![
            Instruction::ldc_i4(7),
            Instruction::simple(OpCode::Pop),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let helper = builder
        .method(widget, "Helper")
        .static_()
        .body(vec![
            Instruction::ldc_i4(1),
            Instruction::simple(OpCode::Pop),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let program = builder.class("App", "Program").base(core.object).define();
    let main = builder
        .method(program, "Main")
        .static_()
        .body(vec![
            Instruction::with_token(OpCode::Newobj, widget_ctor),
            Instruction::simple(OpCode::Pop),
            Instruction::with_token(OpCode::Call, helper),
            Instruction::simple(OpCode::Ret),
        ])
        .define();
    let graph = builder.build();
    let exception_ctor = graph
        .type_node(core.not_supported_exception)
        .methods
        .iter()
        .copied()
        .find(|&m| graph.method(m).is_constructor())
        .unwrap();

    let (annotations, _) = run(&graph, &[main], &[], MarkOptions::default(), |a| {
        a.set_action(widget_ctor, MethodAction::ConvertToStub);
        a.set_action(helper, MethodAction::ConvertToThrow);
        a.set_method_stub_value(helper, StubValue::Int(0));
    })
    .unwrap();

    // Stub constructors chain to a parameterless base constructor.
    assert!(annotations.is_marked(base_ctor));
    // Throw bodies need the exception constructor.
    assert!(annotations.is_marked(exception_ctor));
    // Neither replaced body is scanned.
    assert!(!annotations.is_body_scanned(widget_ctor));
    assert!(!annotations.is_body_scanned(helper));
    assert_eq!(
        annotations.method_stub_value(helper),
        Some(&StubValue::Int(0))
    );
}

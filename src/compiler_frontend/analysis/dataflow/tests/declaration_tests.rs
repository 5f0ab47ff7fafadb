#![cfg(test)]

use crate::compiler_frontend::analysis::dataflow::VisibilityCeiling;
use crate::compiler_frontend::analysis::dataflow::tests::test_support::{
    bit, class_of, declare, run,
};
use crate::compiler_frontend::schema::schema_builder::{
    SchemaBuilder, assign_stmt, bits, boolean, if_stmt, int, new_object,
};
use crate::compiler_frontend::schema::schema_nodes::{
    ClassId, DataType, FunctionId, Stmt, VarId,
};

struct PacketClass {
    builder: SchemaBuilder,
    class: ClassId,
    constructor: FunctionId,
    header: VarId,
    payload: VarId,
}

/// `class Packet { bit[7:0] header, payload; new(bit full) { header = 1; if (full) payload = 2; } }`
fn packet_class() -> PacketClass {
    let mut builder = SchemaBuilder::new();
    let unit = builder.unit("net/packet.hvl", "net");
    let class = builder.class(unit, "Packet", None);
    let header = builder.field(class, "header", bit(8));
    let payload = builder.field(class, "payload", bit(8));

    let constructor = builder.constructor(class);
    let full = builder.param(constructor, "full", DataType::Bool);
    let body = vec![
        assign_stmt(builder.read(header), bits(1, 8)),
        if_stmt(
            builder.read(full),
            assign_stmt(builder.read(payload), bits(2, 8)),
            None,
        ),
    ];
    builder.set_body(constructor, body);

    PacketClass {
        builder,
        class,
        constructor,
        header,
        payload,
    }
}

#[test]
fn field_skipped_by_a_constructor_is_possibly_unassigned() {
    let PacketClass {
        mut builder,
        class,
        header,
        payload,
        ..
    } = packet_class();

    let peek = builder.method(class, "peek", Some(bit(8)), false);
    let first = builder.local(peek, "first", bit(8));
    let second = builder.local(peek, "second", bit(8));
    let read_header = builder.read(header);
    let read_payload = builder.read(payload);
    let body = vec![
        declare(&mut builder, first, read_header),
        declare(&mut builder, second, read_payload),
    ];
    builder.set_body(peek, body);

    let report = run(&builder.finish());
    let record = report.class(class).expect("class is analysed");
    assert_eq!(record.possibly_unassigned_fields(), &[payload]);
    assert!(!record.has_default_constructor());

    assert!(
        report
            .variable(payload)
            .is_some_and(|field| field.is_possibly_unassigned_after_construction())
    );
    assert!(report.is_read_when_unassigned(payload));
    assert!(!report.is_read_when_unassigned(header));
}

#[test]
fn field_initializers_assign_before_every_constructor() {
    let mut builder = SchemaBuilder::new();
    let unit = builder.unit("top.hvl", "src");
    let class = builder.class(unit, "Counter", None);
    let count = builder.field(class, "count", DataType::Integer);
    builder.set_initializer(count, int(0));
    builder.constructor(class);

    let report = run(&builder.finish());
    let record = report.class(class).expect("class is analysed");
    assert!(record.possibly_unassigned_fields().is_empty());
    assert!(record.has_default_constructor());
    assert!(report.variable(count).is_some_and(|field| field.is_effectively_final()));
}

#[test]
fn object_created_without_arguments_needs_a_default_constructor() {
    let PacketClass {
        mut builder,
        class,
        constructor,
        ..
    } = packet_class();

    let unit = builder.schema().class(class).unit;
    let main = builder.task(unit, "main");
    let handle = builder.local(main, "handle", class_of(class));
    let with_args = builder.local(main, "with_args", class_of(class));
    let body = vec![
        declare(
            &mut builder,
            with_args,
            new_object(class, Some(constructor), vec![boolean(true)]),
        ),
        declare(&mut builder, handle, new_object(class, None, vec![])),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    assert!(report.needs_default_constructor(class));
}

#[test]
fn subclass_constructor_without_super_call_needs_base_default_constructor() {
    let PacketClass {
        mut builder, class, ..
    } = packet_class();

    let unit = builder.schema().class(class).unit;
    let tagged = builder.class(unit, "Tagged", Some(class));
    let tag = builder.field(tagged, "tag", bit(4));
    let constructor = builder.constructor(tagged);
    builder.set_body(constructor, vec![assign_stmt(builder.read(tag), bits(0, 4))]);

    let report = run(&builder.finish());
    assert!(report.needs_default_constructor(class));
    assert!(!report.needs_default_constructor(tagged));
    assert!(!report.transform_super_constructor_call(tagged));
}

#[test]
fn subclass_without_constructors_needs_base_default_constructor() {
    let PacketClass {
        mut builder, class, ..
    } = packet_class();

    let unit = builder.schema().class(class).unit;
    let empty = builder.class(unit, "Empty", Some(class));

    let report = run(&builder.finish());
    assert!(report.needs_default_constructor(class));
    assert!(report.class(empty).is_some_and(|record| record.has_default_constructor()));
}

#[test]
fn super_call_reading_instance_state_must_be_transformed() {
    let PacketClass {
        mut builder,
        class,
        constructor: base_constructor,
        payload,
        ..
    } = packet_class();

    let unit = builder.schema().class(class).unit;
    let derived = builder.class(unit, "Derived", Some(class));
    let ready = builder.field(derived, "ready", DataType::Bool);

    let plain = builder.constructor(derived);
    builder.set_body(
        plain,
        vec![Stmt::SuperNew {
            constructor: Some(base_constructor),
            args: vec![boolean(false)],
        }],
    );

    let reading = builder.constructor(derived);
    let seed = builder.param(reading, "seed", bit(8));
    let body = vec![
        Stmt::SuperNew {
            constructor: Some(base_constructor),
            args: vec![builder.read(ready)],
        },
        assign_stmt(builder.read(payload), builder.read(seed)),
    ];
    builder.set_body(reading, body);

    let report = run(&builder.finish());
    assert!(report.transform_super_constructor_call(derived));
    assert!(!report.needs_default_constructor(class));
    assert!(report.log.contains("super.new call in Derived::new must be transformed"));

    // The base class can't make it final once a subclass constructor assigns it
    assert!(!report.variable(payload).is_some_and(|field| field.is_effectively_final()));
}

#[test]
fn super_call_with_constants_is_left_alone() {
    let PacketClass {
        mut builder,
        class,
        constructor: base_constructor,
        ..
    } = packet_class();

    let unit = builder.schema().class(class).unit;
    let derived = builder.class(unit, "Derived", Some(class));
    let constructor = builder.constructor(derived);
    builder.set_body(
        constructor,
        vec![Stmt::SuperNew {
            constructor: Some(base_constructor),
            args: vec![boolean(true)],
        }],
    );

    let report = run(&builder.finish());
    assert!(!report.transform_super_constructor_call(derived));
    assert!(!report.needs_default_constructor(class));
}

#[test]
fn field_written_by_a_method_is_not_effectively_final() {
    let PacketClass {
        mut builder,
        class,
        header,
        payload,
        ..
    } = packet_class();

    let reset = builder.method(class, "reset", None, false);
    builder.set_body(reset, vec![assign_stmt(builder.read(header), bits(0, 8))]);

    let report = run(&builder.finish());
    assert!(!report.variable(header).is_some_and(|field| field.is_effectively_final()));
    assert!(report.variable(payload).is_some_and(|field| field.is_effectively_final()));
}

#[test]
fn base_field_assigned_by_a_subclass_constructor_is_not_final() {
    let PacketClass {
        mut builder,
        class,
        header,
        ..
    } = packet_class();

    let unit = builder.schema().class(class).unit;
    let derived = builder.class(unit, "Jumbo", Some(class));
    let constructor = builder.constructor(derived);
    builder.set_body(constructor, vec![assign_stmt(builder.read(header), bits(9, 8))]);

    let report = run(&builder.finish());
    assert!(!report.variable(header).is_some_and(|field| field.is_effectively_final()));
}

#[test]
fn field_of_another_object_assigned_in_a_constructor_is_not_final() {
    let PacketClass {
        mut builder,
        class,
        header,
        payload,
        ..
    } = packet_class();

    let copy_constructor = builder.constructor(class);
    let source = builder.param(copy_constructor, "source", class_of(class));
    let target = builder.field_of(builder.read(source), payload);
    let body = vec![
        assign_stmt(builder.read(header), bits(1, 8)),
        assign_stmt(builder.read(payload), bits(2, 8)),
        assign_stmt(target, bits(0, 8)),
    ];
    builder.set_body(copy_constructor, body);

    let report = run(&builder.finish());
    assert!(!report.variable(payload).is_some_and(|field| field.is_effectively_final()));
    assert!(report.variable(header).is_some_and(|field| field.is_effectively_final()));
}

#[test]
fn visibility_narrows_to_the_widest_access() {
    let mut builder = SchemaBuilder::new();
    let net = builder.unit("net/frame.hvl", "net");
    let app = builder.unit("app/main.hvl", "app");

    let frame = builder.class(net, "Frame", None);
    let hidden = builder.field(frame, "hidden", bit(8));
    let package = builder.field(frame, "package", bit(8));
    let inherited = builder.field(frame, "inherited", bit(8));
    let open = builder.field(frame, "open", bit(8));
    let unused = builder.field(frame, "unused", bit(8));

    let touch = builder.method(frame, "touch", None, false);
    builder.set_body(touch, vec![assign_stmt(builder.read(hidden), bits(1, 8))]);

    // Same directory, outside the class
    let inspect = builder.task(net, "inspect");
    let frame_param = builder.param(inspect, "frame", class_of(frame));
    let target = builder.field_of(builder.read(frame_param), package);
    builder.set_body(inspect, vec![assign_stmt(target, bits(2, 8))]);

    // Subclass in another directory
    let special = builder.class(app, "Special", Some(frame));
    let bump = builder.method(special, "bump", None, false);
    builder.set_body(bump, vec![assign_stmt(builder.read(inherited), bits(3, 8))]);

    // Unrelated code in another directory
    let poke = builder.task(app, "poke");
    let handle = builder.param(poke, "handle", class_of(frame));
    let target = builder.field_of(builder.read(handle), open);
    builder.set_body(poke, vec![assign_stmt(target, bits(4, 8))]);

    let report = run(&builder.finish());
    let ceiling = |var| {
        report
            .variable(var)
            .map(|record| record.visibility_ceiling())
            .expect("field has a record")
    };

    assert_eq!(ceiling(hidden), VisibilityCeiling::Private);
    assert_eq!(ceiling(package), VisibilityCeiling::Package);
    assert_eq!(ceiling(inherited), VisibilityCeiling::Protected);
    assert_eq!(ceiling(open), VisibilityCeiling::Public);
    assert_eq!(ceiling(unused), VisibilityCeiling::Private);
}

#[test]
fn fields_of_another_object_are_not_flow_tracked() {
    let PacketClass {
        mut builder,
        class,
        payload,
        ..
    } = packet_class();

    let copy_from = builder.method(class, "copy_from", None, false);
    let other = builder.param(copy_from, "other", class_of(class));
    let local = builder.local(copy_from, "local", bit(8));
    let read_other = builder.field_of(builder.read(other), payload);
    let body = vec![declare(&mut builder, local, read_other)];
    builder.set_body(copy_from, body);

    let report = run(&builder.finish());
    assert!(!report.is_read_when_unassigned(payload));
}

#![cfg(test)]

use crate::compiler_frontend::analysis::dataflow::analyze_schema;
use crate::compiler_frontend::analysis::dataflow::tests::test_support::{
    bit, copy, declare, run, task_fixture,
};
use crate::compiler_frontend::schema::schema_builder::{
    SchemaBuilder, assign_stmt, bits, expr_stmt, fork, if_stmt, string, string_method, while_stmt,
    xz_bits,
};
use crate::compiler_frontend::schema::schema_nodes::{
    ClassId, DataType, FunctionId, JoinKind, Schema, Stmt, StringMethod,
};
use crate::settings::AnalysisConfig;

struct OverrideTree {
    builder: SchemaBuilder,
    base: ClassId,
    derived: ClassId,
    base_method: FunctionId,
    derived_method: FunctionId,
}

/// `Base::put(bit[3:0] value)` and an override in `Derived`, both with empty bodies.
fn override_tree(base_is_virtual: bool) -> OverrideTree {
    let mut builder = SchemaBuilder::new();
    let unit = builder.unit("top.hvl", "src");
    let base = builder.class(unit, "Base", None);
    let derived = builder.class(unit, "Derived", Some(base));

    let base_method = builder.method(base, "put", Some(bit(4)), base_is_virtual);
    builder.param(base_method, "value", bit(4));
    builder.set_body(base_method, vec![Stmt::Return(Some(bits(0, 4)))]);

    let derived_method = builder.method(derived, "put", Some(bit(4)), false);
    builder.param(derived_method, "value", bit(4));
    builder.set_overrides(derived_method, base_method);

    OverrideTree {
        builder,
        base,
        derived,
        base_method,
        derived_method,
    }
}

#[test]
fn override_tree_shares_argument_and_return_xz() {
    let OverrideTree {
        mut builder,
        base_method,
        derived_method,
        ..
    } = override_tree(true);
    builder.set_body(derived_method, vec![Stmt::Return(Some(xz_bits(4)))]);

    let unit = builder.schema().function(base_method).unit;
    let main = builder.task(unit, "main");
    let call = builder.call(derived_method, vec![xz_bits(4)]);
    builder.set_body(main, vec![expr_stmt(call)]);

    let base_value = builder.schema().function(base_method).params[0];
    let report = run(&builder.finish());

    // Only the override was called with X/Z, but a call through the base can land there
    assert!(!report.can_be_xz(base_value));
    assert!(report.argument_can_be_xz_in_override(base_method, 0));
    assert!(report.argument_can_be_xz_in_override(derived_method, 0));
    assert!(report.return_can_be_xz_in_override(base_method));

    let base_record = report.function(base_method).expect("base is analysed");
    assert_eq!(base_record.overridden_by(), &[derived_method]);
    assert!(!base_record.is_non_virtual_but_overridden());
    assert_eq!(
        report.function(derived_method).and_then(|record| record.overrides()),
        Some(base_method)
    );
}

#[test]
fn call_through_the_base_reaches_every_override() {
    let OverrideTree {
        mut builder,
        base_method,
        derived_method,
        ..
    } = override_tree(true);

    let unit = builder.schema().function(base_method).unit;
    let main = builder.task(unit, "main");
    let call = builder.call(base_method, vec![xz_bits(4)]);
    builder.set_body(main, vec![expr_stmt(call)]);

    let derived_value = builder.schema().function(derived_method).params[0];
    let report = run(&builder.finish());
    assert!(report.can_be_xz(derived_value));
}

#[test]
fn overriding_a_non_virtual_method_is_flagged() {
    let OverrideTree {
        builder,
        base_method,
        derived_method,
        ..
    } = override_tree(false);

    let report = run(&builder.finish());
    assert!(
        report
            .function(base_method)
            .is_some_and(|record| record.is_non_virtual_but_overridden())
    );
    assert!(
        !report
            .function(derived_method)
            .is_some_and(|record| record.is_non_virtual_but_overridden())
    );
    assert!(report.log.contains("Warning: Base::put is overridden but is not virtual"));
}

#[test]
fn virtual_ancestor_covers_a_non_virtual_middle_override() {
    let OverrideTree {
        mut builder,
        derived,
        derived_method,
        ..
    } = override_tree(true);

    let unit = builder.schema().class(derived).unit;
    let leaf = builder.class(unit, "Leaf", Some(derived));
    let leaf_method = builder.method(leaf, "put", Some(bit(4)), false);
    builder.param(leaf_method, "value", bit(4));
    builder.set_overrides(leaf_method, derived_method);

    let report = run(&builder.finish());
    assert!(
        !report
            .function(derived_method)
            .is_some_and(|record| record.is_non_virtual_but_overridden())
    );
}

#[test]
#[should_panic(expected = "inconsistent argument counts")]
fn override_with_a_different_argument_count_panics() {
    let OverrideTree {
        mut builder,
        base,
        base_method,
        ..
    } = override_tree(true);

    let unit = builder.schema().class(base).unit;
    let odd = builder.class(unit, "Odd", Some(base));
    let odd_method = builder.method(odd, "put", Some(bit(4)), false);
    builder.set_overrides(odd_method, base_method);

    run(&builder.finish());
}

#[test]
fn wait_target_reaches_callers_through_reference_chains() {
    let mut builder = SchemaBuilder::new();
    let unit = builder.unit("top.hvl", "src");

    let block_on = builder.task(unit, "block_on");
    let signal = builder.ref_param(block_on, "signal", bit(1));
    builder.set_body(block_on, vec![Stmt::WaitVar(vec![builder.read(signal)])]);

    let relay = builder.task(unit, "relay");
    let forwarded = builder.ref_param(relay, "forwarded", bit(1));
    let inner_call = builder.call(block_on, vec![builder.read(forwarded)]);
    builder.set_body(relay, vec![expr_stmt(inner_call)]);

    let main = builder.task(unit, "main");
    let ready = builder.local(main, "ready", bit(1));
    let idle = builder.local(main, "idle", bit(1));
    let outer_call = builder.call(relay, vec![builder.read(ready)]);
    let body = vec![
        declare(&mut builder, ready, bits(0, 1)),
        declare(&mut builder, idle, bits(0, 1)),
        expr_stmt(outer_call),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    assert!(report.variable(signal).is_some_and(|record| record.is_wait_target()));
    assert!(report.variable(forwarded).is_some_and(|record| record.is_wait_alias()));
    assert!(report.variable(ready).is_some_and(|record| record.is_wait_alias()));
    assert!(!report.variable(idle).is_some_and(|record| record.is_wait_alias()));
}

#[test]
fn waiting_on_var_args_marks_the_function() {
    let mut builder = SchemaBuilder::new();
    let unit = builder.unit("top.hvl", "src");
    let watch = builder.task(unit, "watch");
    let signals = builder.var_args_param(watch, "signals", bit(1));
    builder.set_body(watch, vec![Stmt::WaitVar(vec![builder.read(signals)])]);

    let report = run(&builder.finish());
    assert!(
        report
            .function(watch)
            .is_some_and(|record| record.is_var_args_alias_wait_target())
    );
}

#[test]
fn matcher_state_readers_spread_the_stateful_representation() {
    let mut builder = SchemaBuilder::new();
    let unit = builder.unit("top.hvl", "src");

    let scan = builder.task(unit, "scan");
    let text = builder.ref_param(scan, "text", DataType::String);
    let prefix = string_method(builder.read(text), StringMethod::Prematch, vec![]);
    builder.set_body(scan, vec![expr_stmt(prefix)]);

    let main = builder.task(unit, "main");
    let line = builder.local(main, "line", DataType::String);
    let other = builder.local(main, "other", DataType::String);
    let matched = string_method(builder.read(line), StringMethod::Match, vec![string("a.*b")]);
    let call = builder.call(scan, vec![builder.read(line)]);
    let body = vec![
        declare(&mut builder, line, string("aab")),
        declare(&mut builder, other, string("plain")),
        expr_stmt(matched),
        expr_stmt(call),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    let text = report.variable(text).expect("parameter is referenced");
    assert!(text.reads_matcher_state());
    assert!(text.needs_stateful_string_representation());

    let line = report.variable(line).expect("local is referenced");
    assert!(line.writes_matcher_state());
    assert!(!line.reads_matcher_state());
    assert!(line.needs_stateful_string_representation());

    assert!(
        !report
            .variable(other)
            .is_some_and(|record| record.needs_stateful_string_representation())
    );
}

#[test]
fn stateful_string_parameters_agree_across_overrides() {
    let mut builder = SchemaBuilder::new();
    let unit = builder.unit("top.hvl", "src");
    let base = builder.class(unit, "Base", None);
    let derived = builder.class(unit, "Derived", Some(base));

    let base_method = builder.method(base, "scan", None, true);
    let base_text = builder.param(base_method, "text", DataType::String);

    let derived_method = builder.method(derived, "scan", None, false);
    let derived_text = builder.param(derived_method, "text", DataType::String);
    builder.set_overrides(derived_method, base_method);
    let suffix = string_method(builder.read(derived_text), StringMethod::Postmatch, vec![]);
    builder.set_body(derived_method, vec![expr_stmt(suffix)]);

    let report = run(&builder.finish());
    assert!(
        report
            .variable(base_text)
            .is_some_and(|record| record.needs_stateful_string_representation())
    );
    assert!(
        report
            .function(base_method)
            .is_some_and(|record| record.argument_is_stateful_in_override(0))
    );
}

/// A bit of everything, for whole-pass properties.
fn mixed_program() -> Schema {
    let (mut builder, unit, main) = task_fixture();
    let flag = builder.param(main, "flag", DataType::Bool);
    let shared = builder.global(unit, "shared", bit(8));
    let a = builder.local(main, "a", bit(8));
    let b = builder.local(main, "b", bit(8));
    let c = builder.local(main, "c", bit(8));

    let class = builder.class(unit, "Holder", None);
    let field = builder.field(class, "value", bit(8));
    let constructor = builder.constructor(class);
    builder.set_body(
        constructor,
        vec![assign_stmt(builder.read(field), builder.read(shared))],
    );

    let read_a = builder.read(a);
    let body = vec![
        Stmt::VarDecl(a),
        declare(&mut builder, b, read_a),
        Stmt::VarDecl(c),
        while_stmt(builder.read(flag), copy(&builder, a, b)),
        if_stmt(builder.read(flag), assign_stmt(builder.read(c), xz_bits(8)), None),
        fork(
            vec![copy(&builder, shared, c), copy(&builder, c, a)],
            JoinKind::Any,
        ),
    ];
    builder.set_body(main, body);
    builder.finish()
}

#[test]
fn analysing_twice_gives_the_same_result() {
    let schema = mixed_program();
    let first = run(&schema);
    let second = run(&schema);

    assert_eq!(first.table, second.table);
    assert_eq!(first.stats, second.stats);
    assert_eq!(first.log, second.log);
}

#[test]
fn summary_counts_every_declaration() {
    let schema = mixed_program();
    let report = run(&schema);

    assert_eq!(report.stats.units_analyzed, 1);
    assert_eq!(report.stats.classes_analyzed, 1);
    assert_eq!(report.stats.functions_analyzed, 2);
    assert_eq!(report.stats.forks_analyzed, 1);
    assert_eq!(report.stats.variables_tracked, schema.variables.len());
    assert_eq!(
        report.stats.xz_assigned + report.stats.xz_not_assigned,
        report.stats.variables_tracked
    );
    assert!(report.stats.xz_assigned > 0);
    assert!(report.log.contains("Summary:"));

    for var in report.table.variable_ids() {
        assert!(!report.xz_state(var).is_unknown());
    }
}

#[test]
fn log_indentation_follows_the_config() {
    let schema = mixed_program();
    let config = AnalysisConfig {
        log_indent: 4,
        ..AnalysisConfig::default()
    };
    let report = analyze_schema(&schema, &config);

    let rendered = report.log.render();
    assert!(rendered.starts_with("Dataflow analysis\n"));
    assert!(rendered.contains("\n    Summary:\n"));
}

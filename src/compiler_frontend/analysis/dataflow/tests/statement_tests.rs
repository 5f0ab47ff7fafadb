#![cfg(test)]

use crate::compiler_frontend::analysis::dataflow::XzSource;
use crate::compiler_frontend::analysis::dataflow::tests::test_support::{
    bit, copy, declare, run, task_fixture,
};
use crate::compiler_frontend::schema::schema_builder::{
    assign, assign_stmt, binary, bits, block, boolean, case_stmt, do_while_stmt, expr_stmt, fork,
    for_stmt, if_stmt, int, randcase, repeat_stmt, unary, while_stmt,
};
use crate::compiler_frontend::schema::schema_nodes::{
    BinaryOp, DataType, JoinKind, Schema, Stmt, UnaryOp, VarId,
};

#[test]
fn constant_true_condition_only_follows_the_then_branch() {
    let (mut builder, _, main) = task_fixture();
    let x = builder.local(main, "x", bit(8));
    let y = builder.local(main, "y", bit(8));

    let read_x = builder.read(x);
    let body = vec![
        Stmt::VarDecl(x),
        if_stmt(boolean(true), assign_stmt(builder.read(x), bits(1, 8)), None),
        declare(&mut builder, y, read_x),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    assert!(!report.is_read_when_unassigned(x));
    assert!(!report.can_be_xz(x));
    assert!(!report.can_be_xz(y));
}

#[test]
fn constant_false_condition_only_follows_the_else_branch() {
    let (mut builder, _, main) = task_fixture();
    let x = builder.local(main, "x", bit(8));
    let y = builder.local(main, "y", bit(8));

    let body = vec![
        Stmt::VarDecl(x),
        Stmt::VarDecl(y),
        if_stmt(
            unary(UnaryOp::LogicalNot, boolean(true)),
            block(vec![]),
            Some(assign_stmt(builder.read(x), bits(2, 8))),
        ),
        copy(&builder, y, x),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    assert!(!report.is_read_when_unassigned(x));
}

#[test]
fn constant_true_condition_with_else_leaves_the_target_definitely_assigned() {
    let (mut builder, _, main) = task_fixture();
    let x = builder.local(main, "x", bit(8));
    let z = builder.local(main, "z", bit(8));

    let body = vec![
        Stmt::VarDecl(x),
        Stmt::VarDecl(z),
        if_stmt(
            boolean(true),
            block(vec![
                assign_stmt(builder.read(x), bits(1, 8)),
                assign_stmt(builder.read(z), bits(1, 8)),
            ]),
            Some(block(vec![
                assign_stmt(builder.read(x), bits(2, 8)),
                assign_stmt(builder.read(z), bits(2, 8)),
            ])),
        ),
        assign_stmt(builder.read(x), bits(3, 8)),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());

    // The dead else branch doesn't count as a second write
    assert!(!report.is_written_when_assigned(z));

    // No longer DU after the if, so the next write overwrites a value
    assert!(report.is_written_when_assigned(x));
    assert!(!report.is_read_when_unassigned(x));
}

#[test]
fn branch_without_else_leaves_variable_possibly_unassigned() {
    let (mut builder, _, main) = task_fixture();
    let flag = builder.param(main, "flag", DataType::Bool);
    let x = builder.local(main, "x", bit(8));
    let y = builder.local(main, "y", bit(8));

    let read_x = builder.read(x);
    let body = vec![
        Stmt::VarDecl(x),
        if_stmt(
            builder.read(flag),
            assign_stmt(builder.read(x), bits(1, 8)),
            None,
        ),
        declare(&mut builder, y, read_x),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    assert!(report.is_read_when_unassigned(x));
    assert_eq!(
        report.variable(x).and_then(|record| record.xz_source()),
        Some(XzSource::UninitializedRead)
    );
    assert_eq!(report.variable(y).and_then(|record| record.xz_origin()), Some(x));
}

#[test]
fn assignment_inside_short_circuit_condition_reaches_the_true_branch() {
    let (mut builder, _, main) = task_fixture();
    let flag = builder.param(main, "flag", DataType::Bool);
    let x = builder.local(main, "x", bit(8));
    let y = builder.local(main, "y", bit(8));

    let condition = binary(
        BinaryOp::LogicalAnd,
        builder.read(flag),
        binary(BinaryOp::Eq, assign(builder.read(x), bits(1, 8)), bits(1, 8)),
    );
    let body = vec![
        Stmt::VarDecl(x),
        Stmt::VarDecl(y),
        if_stmt(condition, copy(&builder, y, x), None),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    assert!(!report.is_read_when_unassigned(x));
    assert!(report.variable(x).is_some_and(|record| record.is_written_as_side_effect()));
}

#[test]
fn loop_that_assigns_an_unassigned_variable_takes_a_second_pass() {
    let (mut builder, _, main) = task_fixture();
    let flag = builder.param(main, "flag", DataType::Bool);
    let x = builder.local(main, "x", bit(8));
    let y = builder.local(main, "y", bit(8));

    let body = vec![
        Stmt::VarDecl(x),
        Stmt::VarDecl(y),
        while_stmt(
            builder.read(flag),
            block(vec![assign_stmt(builder.read(x), bits(1, 8))]),
        ),
        copy(&builder, y, x),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    assert_eq!(report.stats.loop_second_passes, 1);
    assert!(report.is_written_when_assigned(x));
    assert!(report.is_read_when_unassigned(x));
}

#[test]
fn second_loop_pass_reports_its_body_once() {
    let (mut builder, _, main) = task_fixture();
    let flag = builder.param(main, "flag", DataType::Bool);
    let x = builder.local(main, "x", bit(8));

    let body = vec![
        Stmt::VarDecl(x),
        while_stmt(
            builder.read(flag),
            fork(vec![assign_stmt(builder.read(x), bits(1, 8))], JoinKind::All),
        ),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    assert_eq!(report.stats.loop_second_passes, 1);
    assert_eq!(report.stats.forks_analyzed, 1);

    let fork_reports = report
        .log
        .lines()
        .iter()
        .filter(|line| line.text.starts_with("Fork branch 0 in main"))
        .count();
    assert_eq!(fork_reports, 1);
}

#[test]
fn loop_over_assigned_variables_needs_one_pass() {
    let (mut builder, _, main) = task_fixture();
    let flag = builder.param(main, "flag", DataType::Bool);
    let count = builder.local(main, "count", DataType::Integer);

    let increment = binary(BinaryOp::Add, builder.read(count), int(1));
    let body = vec![
        declare(&mut builder, count, int(0)),
        while_stmt(
            builder.read(flag),
            assign_stmt(builder.read(count), increment),
        ),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    assert_eq!(report.stats.loop_second_passes, 0);
    assert!(report.is_written_when_assigned(count));
    assert!(!report.is_read_when_unassigned(count));
}

#[test]
fn do_while_body_runs_at_least_once() {
    let (mut builder, _, main) = task_fixture();
    let flag = builder.param(main, "flag", DataType::Bool);
    let x = builder.local(main, "x", bit(8));
    let y = builder.local(main, "y", bit(8));

    let body = vec![
        Stmt::VarDecl(x),
        Stmt::VarDecl(y),
        do_while_stmt(assign_stmt(builder.read(x), bits(1, 8)), builder.read(flag)),
        copy(&builder, y, x),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    assert!(!report.is_read_when_unassigned(x));

    // The second iteration writes over the first
    assert!(report.is_written_when_assigned(x));
}

#[test]
fn repeat_may_run_zero_times() {
    let (mut builder, _, main) = task_fixture();
    let x = builder.local(main, "x", bit(8));
    let y = builder.local(main, "y", bit(8));

    let body = vec![
        Stmt::VarDecl(x),
        Stmt::VarDecl(y),
        repeat_stmt(int(3), assign_stmt(builder.read(x), bits(1, 8))),
        copy(&builder, y, x),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    assert!(report.is_read_when_unassigned(x));
}

#[test]
fn endless_for_loop_only_exits_through_break() {
    let (mut builder, _, main) = task_fixture();
    let x = builder.local(main, "x", bit(8));
    let y = builder.local(main, "y", bit(8));

    let body = vec![
        Stmt::VarDecl(x),
        Stmt::VarDecl(y),
        for_stmt(
            vec![],
            None,
            vec![],
            block(vec![assign_stmt(builder.read(x), bits(1, 8)), Stmt::Break]),
        ),
        copy(&builder, y, x),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    assert!(!report.is_read_when_unassigned(x));
    assert_eq!(report.stats.loop_second_passes, 0);
}

#[test]
fn for_header_variables_are_scoped_to_the_loop() {
    let (mut builder, _, main) = task_fixture();
    let i = builder.local(main, "i", DataType::Integer);
    let total = builder.local(main, "total", DataType::Integer);

    let condition = binary(BinaryOp::Lt, builder.read(i), int(4));
    let step = assign(builder.read(i), binary(BinaryOp::Add, builder.read(i), int(1)));
    let sum = binary(BinaryOp::Add, builder.read(total), builder.read(i));
    let body = vec![
        declare(&mut builder, total, int(0)),
        for_stmt(
            vec![declare(&mut builder, i, int(0))],
            Some(condition),
            vec![step],
            assign_stmt(builder.read(total), sum),
        ),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    assert!(!report.is_read_when_unassigned(i));
    assert!(!report.is_read_when_unassigned(total));
    assert!(report.variable(i).is_some_and(|record| record.is_scope_complete()));
}

#[test]
fn continue_rejoins_the_loop_and_break_leaves_it() {
    let (mut builder, _, main) = task_fixture();
    let flag = builder.param(main, "flag", DataType::Bool);
    let done = builder.param(main, "done", DataType::Bool);
    let x = builder.local(main, "x", bit(8));
    let y = builder.local(main, "y", bit(8));

    let loop_body = block(vec![
        if_stmt(builder.read(flag), Stmt::Continue, None),
        assign_stmt(builder.read(x), bits(1, 8)),
        if_stmt(builder.read(done), Stmt::Break, None),
    ]);
    let body = vec![
        Stmt::VarDecl(x),
        Stmt::VarDecl(y),
        while_stmt(boolean(true), loop_body),
        copy(&builder, y, x),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());

    // The only way out is the break, which comes after the assignment
    assert!(!report.is_read_when_unassigned(x));
    assert_eq!(report.stats.loop_second_passes, 1);
}

#[test]
fn case_with_default_assigns_on_every_path() {
    let (mut builder, _, main) = task_fixture();
    let select = builder.param(main, "select", bit(2));
    let x = builder.local(main, "x", bit(8));
    let y = builder.local(main, "y", bit(8));

    let body = vec![
        Stmt::VarDecl(x),
        Stmt::VarDecl(y),
        case_stmt(
            builder.read(select),
            vec![
                (vec![bits(0, 2)], assign_stmt(builder.read(x), bits(1, 8))),
                (vec![bits(1, 2), bits(2, 2)], assign_stmt(builder.read(x), bits(2, 8))),
            ],
            Some(assign_stmt(builder.read(x), bits(3, 8))),
        ),
        copy(&builder, y, x),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    assert!(!report.is_read_when_unassigned(x));
}

#[test]
fn case_without_default_may_match_nothing() {
    let (mut builder, _, main) = task_fixture();
    let select = builder.param(main, "select", bit(2));
    let x = builder.local(main, "x", bit(8));
    let y = builder.local(main, "y", bit(8));

    let body = vec![
        Stmt::VarDecl(x),
        Stmt::VarDecl(y),
        case_stmt(
            builder.read(select),
            vec![
                (vec![bits(0, 2)], assign_stmt(builder.read(x), bits(1, 8))),
                (vec![bits(1, 2)], assign_stmt(builder.read(x), bits(2, 8))),
            ],
            None,
        ),
        copy(&builder, y, x),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    assert!(report.is_read_when_unassigned(x));
}

#[test]
fn randcase_may_pick_nothing() {
    let (mut builder, _, main) = task_fixture();
    let x = builder.local(main, "x", bit(8));
    let y = builder.local(main, "y", bit(8));

    let body = vec![
        Stmt::VarDecl(x),
        Stmt::VarDecl(y),
        randcase(vec![
            (int(1), assign_stmt(builder.read(x), bits(1, 8))),
            (int(3), assign_stmt(builder.read(x), bits(2, 8))),
        ]),
        copy(&builder, y, x),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    assert!(report.is_read_when_unassigned(x));
}

/// Two branches that both assign `x`, followed by a read of `x`.
fn fork_program(join: JoinKind) -> (Schema, VarId) {
    let (mut builder, _, main) = task_fixture();
    let x = builder.local(main, "x", bit(8));
    let y = builder.local(main, "y", bit(8));

    let body = vec![
        Stmt::VarDecl(x),
        Stmt::VarDecl(y),
        fork(
            vec![
                assign_stmt(builder.read(x), bits(1, 8)),
                block(vec![assign_stmt(builder.read(x), bits(2, 8))]),
            ],
            join,
        ),
        copy(&builder, y, x),
    ];
    builder.set_body(main, body);
    (builder.finish(), x)
}

#[test]
fn join_all_waits_for_every_branch() {
    let (schema, x) = fork_program(JoinKind::All);
    let report = run(&schema);

    assert!(!report.is_read_when_unassigned(x));
    assert_eq!(report.stats.forks_analyzed, 1);
}

#[test]
fn join_any_may_continue_before_a_branch_assigns() {
    let (schema, x) = fork_program(JoinKind::Any);
    assert!(run(&schema).is_read_when_unassigned(x));
}

#[test]
fn join_none_continues_with_the_pre_fork_facts() {
    let (schema, x) = fork_program(JoinKind::None);
    assert!(run(&schema).is_read_when_unassigned(x));
}

#[test]
fn fork_branches_record_captured_variables() {
    let (mut builder, unit, main) = task_fixture();
    let shared = builder.global(unit, "shared", bit(8));
    let x = builder.local(main, "x", bit(8));
    let scratch = builder.local(main, "scratch", bit(8));

    let read_shared = builder.read(shared);
    let branch = block(vec![
        declare(&mut builder, scratch, read_shared),
        copy(&builder, x, scratch),
    ]);
    let body = vec![Stmt::VarDecl(x), fork(vec![branch], JoinKind::All)];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    let shared = report.variable(shared).expect("global is referenced");
    assert!(shared.is_fork_read());
    assert!(!shared.is_fork_write());

    let x = report.variable(x).expect("local is referenced");
    assert!(x.is_fork_write());
    assert!(!x.is_fork_read());

    let scratch = report.variable(scratch).expect("branch local is referenced");
    assert!(!scratch.is_fork_read());
    assert!(!scratch.is_fork_write());

    assert!(report.log.contains("Fork branch 0 in main references:"));
    assert!(report.log.contains("needs an execution context"));
}

#[test]
fn code_after_return_is_unreachable() {
    let (mut builder, _, main) = task_fixture();
    let x = builder.local(main, "x", bit(8));
    let y = builder.local(main, "y", bit(8));

    let body = vec![
        Stmt::VarDecl(x),
        Stmt::VarDecl(y),
        Stmt::Return(None),
        copy(&builder, y, x),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    assert!(!report.is_read_when_unassigned(x));
}

#[test]
fn assignment_used_as_a_condition_or_return_value_is_a_side_effect() {
    let (mut builder, unit, main) = task_fixture();
    let x = builder.local(main, "x", bit(8));
    let y = builder.local(main, "y", bit(8));

    let pick = builder.function(unit, "pick", Some(bit(8)));
    let z = builder.local(pick, "z", bit(8));
    builder.set_body(
        pick,
        vec![
            Stmt::VarDecl(z),
            Stmt::Return(Some(assign(builder.read(z), bits(2, 8)))),
        ],
    );

    let body = vec![
        Stmt::VarDecl(x),
        Stmt::VarDecl(y),
        if_stmt(assign(builder.read(x), bits(1, 8)), block(vec![]), None),
        for_stmt(
            vec![],
            Some(boolean(false)),
            vec![assign(builder.read(y), bits(0, 8))],
            block(vec![]),
        ),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    assert!(report.variable(x).is_some_and(|record| record.is_written_as_side_effect()));
    assert!(report.variable(z).is_some_and(|record| record.is_written_as_side_effect()));

    // A loop update's value is thrown away, like an expression statement's
    assert!(!report.variable(y).is_some_and(|record| record.is_written_as_side_effect()));
}

#[test]
fn nested_assignment_is_a_side_effect() {
    let (mut builder, _, main) = task_fixture();
    let x = builder.local(main, "x", bit(8));
    let y = builder.local(main, "y", bit(8));

    let inner = assign(builder.read(x), bits(1, 8));
    let body = vec![
        Stmt::VarDecl(x),
        Stmt::VarDecl(y),
        assign_stmt(builder.read(y), inner),
        expr_stmt(unary(UnaryOp::PostIncrement, builder.read(y))),
    ];
    builder.set_body(main, body);

    let report = run(&builder.finish());
    let x = report.variable(x).expect("x is referenced");
    let y = report.variable(y).expect("y is referenced");

    assert!(x.is_written_as_side_effect());
    assert!(!y.is_written_as_side_effect());
    assert!(y.is_written_when_assigned());
    assert!(!y.is_effectively_final());
}

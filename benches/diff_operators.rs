//! Benchmarks for per-operator `evaluate`/`merge` cost.
//!
//! All operations are pure in-process Rust — no external service required.
//!
//! Run with: `cargo bench --bench diff_operators`

use criterion::{criterion_group, criterion_main, black_box, BenchmarkId, Criterion};
use polars::df;
use std::collections::HashMap;

use inkling::config::EngineConfig;
use inkling::frame::Frame;
use inkling::expr::{CmpOp, Expr, Literal, PredForm, Predicate};
use inkling::operators::groupby_agg::{AggColumn, AggFn, AggSpec};
use inkling::operators::{GroupByAggOp, InnerJoinOp, OrderByOp, SelectOp, SelectSpec, WhereOp};
use inkling::operators::orderby::OrderKey;
use inkling::state::NodeState;

fn lineitem(n: i64) -> Frame {
    let ids: Vec<i64> = (0..n).collect();
    let qty: Vec<i64> = (0..n).map(|i| i % 50).collect();
    let brand: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "A" } else { "B" }).collect();
    Frame::new(df!("id" => ids, "qty" => qty, "brand" => brand).unwrap())
}

fn bench_where(c: &mut Criterion) {
    let mut group = c.benchmark_group("where_evaluate");
    let op = WhereOp::new(
        vec![vec![Predicate { left: "qty".into(), op: CmpOp::Gt, right: Literal::Int(10) }]],
        PredForm::Dnf,
    )
    .unwrap();

    for n in [1_000i64, 10_000, 100_000] {
        let mut inputs = HashMap::new();
        inputs.insert("input0".to_string(), lineitem(n));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| op.evaluate(black_box("n"), black_box(&inputs)).unwrap());
        });
    }
    group.finish();
}

fn bench_select(c: &mut Criterion) {
    let op = SelectOp::new(SelectSpec::Columns(vec!["qty".into(), "brand".into()])).unwrap();
    let mut inputs = HashMap::new();
    inputs.insert("input0".to_string(), lineitem(50_000));
    c.bench_function("select_project_2_of_3", |b| {
        b.iter(|| op.evaluate(black_box("n"), black_box(&inputs)).unwrap());
    });
}

fn bench_groupby_agg_merge(c: &mut Criterion) {
    let op = GroupByAggOp::new(
        vec!["brand".into()],
        vec![AggSpec {
            op: AggFn::Sum,
            col: AggColumn::Expr(Expr::col("qty")),
            alias: "total".into(),
        }],
    )
    .unwrap();

    c.bench_function("groupby_agg_merge_50k_then_10k", |b| {
        b.iter(|| {
            let mut state = NodeState::new_result();
            let mut first = HashMap::new();
            first.insert("input0".to_string(), lineitem(50_000));
            op.merge(black_box("n"), &mut state, &first, false).unwrap();

            let mut second = HashMap::new();
            second.insert("input0".to_string(), lineitem(10_000));
            op.merge(black_box("n"), &mut state, &second, false).unwrap()
        });
    });
}

fn bench_orderby_merge(c: &mut Criterion) {
    let op = OrderByOp::new(vec![OrderKey { column: "qty".into(), descending: true }]).unwrap();
    let config = EngineConfig::default();
    c.bench_function("orderby_merge_re_sort_20k", |b| {
        b.iter(|| {
            let mut state = NodeState::new_result();
            let mut first = HashMap::new();
            first.insert("input0".to_string(), lineitem(20_000));
            op.merge(black_box("n"), &mut state, &first, false, &config).unwrap()
        });
    });
}

fn bench_inner_join_merge(c: &mut Criterion) {
    let op = InnerJoinOp::new(vec!["id".into()], vec!["id".into()]).unwrap();
    c.bench_function("inner_join_merge_10k_against_10k", |b| {
        b.iter(|| {
            let mut state = NodeState::new_join_buffers();
            let mut left = HashMap::new();
            left.insert("input0".to_string(), lineitem(10_000));
            op.merge(black_box("n"), &mut state, &left, false).unwrap();

            let mut right = HashMap::new();
            right.insert("input1".to_string(), lineitem(10_000));
            op.merge(black_box("n"), &mut state, &right, false).unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_where,
    bench_select,
    bench_groupby_agg_merge,
    bench_orderby_merge,
    bench_inner_join_merge,
);
criterion_main!(benches);

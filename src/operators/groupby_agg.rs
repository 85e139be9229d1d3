//! `GROUPBYAGG` — key-grouped aggregation (§4.1).
//!
//! `evaluate` computes per-group aggregates on the delta alone; `merge` is
//! the algebraic reduction that re-groups the concatenation of the prior
//! result and the new `evaluate` output, since both `sum` and `count`
//! distribute over union. Auto-generated suffixes from the underlying
//! aggregator are stripped so the reduction step's column names match the
//! original aliases exactly.

use polars::prelude::{self as pl};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::expr::{validate_columns_exist, Expr};
use crate::frame::Frame;
use crate::state::NodeState;

use super::{SlotInputs, SLOT_0};

/// `sum`/`count`, per §4.1 — the only two aggregate operators this runtime
/// implements. Anything else is `UnsupportedError`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AggFn {
    Sum,
    Count,
}

/// The aggregate's input column: either a literal `*` (row count) or an
/// arithmetic expression over column references, per §4.1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AggColumn {
    Star,
    Expr(Expr),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggSpec {
    pub op: AggFn,
    pub col: AggColumn,
    pub alias: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupByAggOp {
    pub groupby_key: Vec<String>,
    pub aggregates: Vec<AggSpec>,
}

impl GroupByAggOp {
    pub fn new(groupby_key: Vec<String>, aggregates: Vec<AggSpec>) -> Result<Self, EngineError> {
        if aggregates.is_empty() {
            return Err(EngineError::InvalidArgs {
                node: "<unbound>".to_string(),
                operator: "GROUPBYAGG",
                reason: "`aggregates` must not be empty".to_string(),
            });
        }
        Ok(GroupByAggOp {
            groupby_key,
            aggregates,
        })
    }

    fn aggregate_exprs(&self, node: &str) -> Vec<pl::Expr> {
        let _ = node;
        self.aggregates
            .iter()
            .map(|agg| {
                let base = match &agg.col {
                    AggColumn::Star => pl::lit(1i64),
                    AggColumn::Expr(expr) => expr.to_polars(),
                };
                match agg.op {
                    AggFn::Sum => base.sum().alias(&agg.alias),
                    AggFn::Count => base.count().alias(&agg.alias),
                }
            })
            .collect()
    }

    fn validate_referenced_columns(
        &self,
        schema: &pl::Schema,
        node: &str,
    ) -> Result<(), EngineError> {
        validate_columns_exist(&self.groupby_key, schema, node, "GROUPBYAGG")?;
        let mut cols = Vec::new();
        for agg in &self.aggregates {
            if let AggColumn::Expr(expr) = &agg.col {
                expr.referenced_columns(&mut cols);
            }
        }
        validate_columns_exist(&cols, schema, node, "GROUPBYAGG")
    }

    pub fn evaluate(&self, node: &str, inputs: &SlotInputs) -> Result<Option<Frame>, EngineError> {
        let frame = match inputs.get(SLOT_0) {
            Some(f) => f,
            None => return Ok(None),
        };
        if frame.is_empty() {
            return Ok(Some(Frame::empty()));
        }
        self.validate_referenced_columns(&frame.schema(), node)?;
        let aggs = self.aggregate_exprs(node);
        let out = frame.group_by_agg(&self.groupby_key, aggs, node, "GROUPBYAGG")?;
        Ok(Some(out))
    }

    /// `merge` re-groups `concat(prior, evaluate(delta))` per key, summing
    /// every alias column (sum-of-sums == total sum; sum-of-counts ==
    /// total count), which is the reduction step described in §4.1.
    pub fn merge(
        &self,
        node: &str,
        state: &mut NodeState,
        delta: &SlotInputs,
        return_delta: bool,
    ) -> Result<Option<Frame>, EngineError> {
        let output = match self.evaluate(node, delta)? {
            Some(f) => f,
            None => return Ok(None),
        };

        let NodeState::Result { result } = state else {
            return Err(EngineError::Internal {
                node: node.to_string(),
                reason: "GROUPBYAGG node state is not Result".to_string(),
            });
        };

        let merged = match result.take() {
            Some(prior) if !prior.is_empty() => {
                let concatenated = Frame::concat(&[&prior, &output], node, "GROUPBYAGG")?;
                let reduce_exprs: Vec<pl::Expr> = self
                    .aggregates
                    .iter()
                    .map(|agg| pl::col(&agg.alias).sum().alias(&agg.alias))
                    .collect();
                concatenated.group_by_agg(&self.groupby_key, reduce_exprs, node, "GROUPBYAGG")?
            }
            _ => output.clone(),
        };
        *result = Some(merged.clone());

        if return_delta {
            Ok(Some(output))
        } else {
            Ok(Some(merged))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;
    use std::collections::HashMap;

    fn input(g: &[&str], x: &[i64]) -> SlotInputs {
        let mut m = HashMap::new();
        m.insert(SLOT_0.to_string(), Frame::new(df!("g" => g, "x" => x).unwrap()));
        m
    }

    fn sum_x() -> GroupByAggOp {
        GroupByAggOp::new(
            vec!["g".into()],
            vec![AggSpec {
                op: AggFn::Sum,
                col: AggColumn::Expr(Expr::col("x")),
                alias: "total".into(),
            }],
        )
        .unwrap()
    }

    #[test]
    fn rejects_empty_aggregate_list() {
        assert!(GroupByAggOp::new(vec!["g".into()], vec![]).is_err());
    }

    #[test]
    fn evaluate_sums_within_a_single_delta() {
        let op = sum_x();
        let out = op
            .evaluate("n", &input(&["a", "b"], &[1, 2]))
            .unwrap()
            .unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn merge_accumulates_grouped_sums_across_ticks() {
        let op = sum_x();
        let mut state = NodeState::new_result();

        let first = op
            .merge("n", &mut state, &input(&["a", "b"], &[1, 2]), false)
            .unwrap()
            .unwrap();
        assert_eq!(first.height(), 2);

        let second = op
            .merge("n", &mut state, &input(&["a", "b", "a"], &[3, 4, 5]), false)
            .unwrap()
            .unwrap();
        assert_eq!(second.height(), 2);

        let totals: Vec<i64> = second
            .as_polars()
            .column("total")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        let sum_all: i64 = totals.iter().sum();
        assert_eq!(sum_all, 9 + 6);
    }

    #[test]
    fn empty_groupby_key_uses_a_single_synthetic_group() {
        let op = GroupByAggOp::new(
            vec![],
            vec![AggSpec {
                op: AggFn::Sum,
                col: AggColumn::Expr(Expr::col("x")),
                alias: "total".into(),
            }],
        )
        .unwrap();
        let out = op
            .evaluate("n", &input(&["a", "b"], &[1, 2]))
            .unwrap()
            .unwrap();
        assert_eq!(out.height(), 1);
    }

    #[test]
    fn count_star_counts_rows_not_values() {
        let op = GroupByAggOp::new(
            vec!["g".into()],
            vec![AggSpec {
                op: AggFn::Count,
                col: AggColumn::Star,
                alias: "n".into(),
            }],
        )
        .unwrap();
        let out = op
            .evaluate("n", &input(&["a", "a", "b"], &[1, 2, 3]))
            .unwrap()
            .unwrap();
        assert_eq!(out.height(), 2);
    }
}

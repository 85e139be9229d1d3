//! Operator algebra (§4.1): the closed set of relational operator kinds.
//!
//! Polymorphism over operator kinds is expressed as a tagged variant
//! (closed set) rather than inheritance from a base class, per §9's
//! re-architecture note. [`OperatorSpec`] is the capability record the
//! session scheduler dispatches through — `evaluate`, `merge`,
//! `stateful_inputs`, and the operator's own arguments — with exhaustive
//! `match` dispatch standing in for virtual method calls, and the same tag
//! used for serialization (§4.2's `save`/`load`).

pub mod groupby_agg;
pub mod inner_join;
pub mod limit;
pub mod orderby;
pub mod select;
pub mod table;
pub mod where_op;

pub use groupby_agg::GroupByAggOp;
pub use inner_join::InnerJoinOp;
pub use limit::LimitOp;
pub use orderby::OrderByOp;
pub use select::{SelectOp, SelectSpec};
pub use table::TableOp;
pub use where_op::WhereOp;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::frame::Frame;
use crate::graph::NodeKind;
use crate::state::NodeState;

/// Slot name for the sole input of a unary operator, or the left input of `INNERJOIN`.
pub const SLOT_0: &str = "input0";
/// Slot name for the right input of `INNERJOIN`.
pub const SLOT_1: &str = "input1";

/// A slot-keyed map of frames — the unified `evaluate`/`merge` input shape
/// described in §9 (never a bare frame, even for unary operators).
pub type SlotInputs = HashMap<String, Frame>;

/// How many inbound edges an operator's slot layout expects (§4.2's
/// `compile()` arity check).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Zero,
    One,
    Two,
}

impl Arity {
    pub fn count(self) -> usize {
        match self {
            Arity::Zero => 0,
            Arity::One => 1,
            Arity::Two => 2,
        }
    }
}

/// The closed set of operator kinds (§3), carrying each kind's own
/// arguments. Serializes with an explicit `operator`/`args` tag pair
/// matching §6's serialized graph format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operator", content = "args")]
pub enum OperatorSpec {
    #[serde(rename = "TABLE")]
    Table(TableOp),
    #[serde(rename = "WHERE")]
    Where(WhereOp),
    #[serde(rename = "SELECT")]
    Select(SelectOp),
    #[serde(rename = "INNERJOIN")]
    InnerJoin(InnerJoinOp),
    #[serde(rename = "GROUPBYAGG")]
    GroupByAgg(GroupByAggOp),
    #[serde(rename = "ORDERBY")]
    OrderBy(OrderByOp),
    #[serde(rename = "LIMIT")]
    Limit(LimitOp),
}

impl OperatorSpec {
    /// The closed-set tag name, used both in error messages and as the
    /// registry key for `save`/`load`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            OperatorSpec::Table(_) => "TABLE",
            OperatorSpec::Where(_) => "WHERE",
            OperatorSpec::Select(_) => "SELECT",
            OperatorSpec::InnerJoin(_) => "INNERJOIN",
            OperatorSpec::GroupByAgg(_) => "GROUPBYAGG",
            OperatorSpec::OrderBy(_) => "ORDERBY",
            OperatorSpec::Limit(_) => "LIMIT",
        }
    }

    /// Expected inbound arity, per §4.2's `compile()` validation
    /// (`TABLE`: 0; `INNERJOIN`: 2; otherwise 1).
    pub fn expected_arity(&self) -> Arity {
        match self {
            OperatorSpec::Table(_) => Arity::Zero,
            OperatorSpec::InnerJoin(_) => Arity::Two,
            _ => Arity::One,
        }
    }

    /// Default node classification (§3) for a node registered without an
    /// explicit override.
    pub fn default_classification(&self) -> NodeKind {
        match self {
            OperatorSpec::OrderBy(_) | OperatorSpec::Limit(_) => NodeKind::Dm,
            _ => NodeKind::Da,
        }
    }

    /// Whether correct incremental execution requires retaining all prior
    /// inputs per edge (§3). True only for `INNERJOIN`.
    pub fn stateful_inputs(&self) -> bool {
        matches!(self, OperatorSpec::InnerJoin(_))
    }

    /// A freshly-initialized state value appropriate to this operator's
    /// shape, used when a node's `needs_state` is true.
    pub fn fresh_state(&self) -> NodeState {
        match self {
            OperatorSpec::InnerJoin(_) => NodeState::new_join_buffers(),
            _ => NodeState::new_result(),
        }
    }

    pub fn evaluate(
        &self,
        node: &str,
        inputs: &SlotInputs,
        config: &EngineConfig,
    ) -> Result<Option<Frame>, EngineError> {
        match self {
            OperatorSpec::Table(op) => op.evaluate(node, inputs),
            OperatorSpec::Where(op) => op.evaluate(node, inputs),
            OperatorSpec::Select(op) => op.evaluate(node, inputs),
            OperatorSpec::InnerJoin(op) => op.evaluate(node, inputs),
            OperatorSpec::GroupByAgg(op) => op.evaluate(node, inputs),
            OperatorSpec::OrderBy(op) => op.evaluate(node, inputs, config),
            OperatorSpec::Limit(op) => op.evaluate(node, inputs),
        }
    }

    pub fn merge(
        &self,
        node: &str,
        state: &mut NodeState,
        delta: &SlotInputs,
        return_delta: bool,
        config: &EngineConfig,
    ) -> Result<Option<Frame>, EngineError> {
        match self {
            OperatorSpec::Table(op) => op.merge(node, state, delta, return_delta),
            OperatorSpec::Where(op) => op.merge(node, state, delta, return_delta),
            OperatorSpec::Select(op) => op.merge(node, state, delta, return_delta),
            OperatorSpec::InnerJoin(op) => op.merge(node, state, delta, return_delta),
            OperatorSpec::GroupByAgg(op) => op.merge(node, state, delta, return_delta),
            OperatorSpec::OrderBy(op) => op.merge(node, state, delta, return_delta, config),
            OperatorSpec::Limit(op) => op.merge(node, state, delta, return_delta),
        }
    }
}

/// Generic "concat prior result with a fresh output, stash it, return the
/// requested form" step shared by the `DA` unary operators (`TABLE`,
/// `WHERE`, `SELECT`) whenever they happen to sit at a materialization
/// boundary (an output node that is not itself `DM`).
pub(crate) fn accumulate_result(
    state: &mut NodeState,
    output: Frame,
    node: &str,
    operator: &'static str,
    return_delta: bool,
) -> Result<Option<Frame>, EngineError> {
    match state {
        NodeState::Stateless => Ok(Some(output)),
        NodeState::Result { result } => {
            let merged = match result.take() {
                Some(prior) => Frame::concat(&[&prior, &output], node, operator)?,
                None => output.clone(),
            };
            *result = Some(merged.clone());
            if return_delta {
                Ok(Some(output))
            } else {
                Ok(Some(merged))
            }
        }
        NodeState::JoinBuffers { .. } => Err(EngineError::Internal {
            node: node.to_string(),
            reason: format!("{operator} node has join-shaped state"),
        }),
    }
}

//! `TABLE` — leaf source operator (§4.1).
//!
//! The entry point for externally-supplied partitions. Has zero inbound
//! edges (§3, invariant 4); deltas are injected directly by
//! `Session::run_incremental` against the node's own slot.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::frame::Frame;
use crate::state::NodeState;

use super::{accumulate_result, SlotInputs, SLOT_0};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableOp {
    pub table: String,
}

impl TableOp {
    pub fn new(table: impl Into<String>) -> Result<Self, EngineError> {
        let table = table.into();
        if table.is_empty() {
            return Err(EngineError::InvalidArgs {
                node: "<unbound>".to_string(),
                operator: "TABLE",
                reason: "`table` must not be empty".to_string(),
            });
        }
        Ok(TableOp { table })
    }

    /// Returns the sole value of `inputs`, per §4.1.
    pub fn evaluate(&self, _node: &str, inputs: &SlotInputs) -> Result<Option<Frame>, EngineError> {
        Ok(inputs.get(SLOT_0).cloned())
    }

    /// Appends the delta frame to `state.result` (or installs it).
    pub fn merge(
        &self,
        node: &str,
        state: &mut NodeState,
        delta: &SlotInputs,
        return_delta: bool,
    ) -> Result<Option<Frame>, EngineError> {
        let delta_frame = match delta.get(SLOT_0) {
            Some(f) => f.clone(),
            None => return Ok(None),
        };
        accumulate_result(state, delta_frame, node, "TABLE", return_delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;
    use std::collections::HashMap;

    fn frame(vals: &[i64]) -> Frame {
        Frame::new(df!("k" => vals).unwrap())
    }

    #[test]
    fn rejects_empty_table_name() {
        assert!(TableOp::new("").is_err());
    }

    #[test]
    fn evaluate_passes_through_sole_input() {
        let op = TableOp::new("lineitem").unwrap();
        let mut inputs = HashMap::new();
        inputs.insert(SLOT_0.to_string(), frame(&[1, 2]));
        let out = op.evaluate("t", &inputs).unwrap().unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn merge_accumulates_across_ticks() {
        let op = TableOp::new("lineitem").unwrap();
        let mut state = NodeState::new_result();
        let mut delta1 = HashMap::new();
        delta1.insert(SLOT_0.to_string(), frame(&[1]));
        let first = op.merge("t", &mut state, &delta1, false).unwrap().unwrap();
        assert_eq!(first.height(), 1);

        let mut delta2 = HashMap::new();
        delta2.insert(SLOT_0.to_string(), frame(&[2, 3]));
        let second = op.merge("t", &mut state, &delta2, false).unwrap().unwrap();
        assert_eq!(second.height(), 3);
    }

    #[test]
    fn merge_return_delta_true_yields_only_the_increment() {
        let op = TableOp::new("lineitem").unwrap();
        let mut state = NodeState::new_result();
        let mut delta1 = HashMap::new();
        delta1.insert(SLOT_0.to_string(), frame(&[1]));
        op.merge("t", &mut state, &delta1, false).unwrap();

        let mut delta2 = HashMap::new();
        delta2.insert(SLOT_0.to_string(), frame(&[2, 3]));
        let inc = op.merge("t", &mut state, &delta2, true).unwrap().unwrap();
        assert_eq!(inc.height(), 2);
    }
}

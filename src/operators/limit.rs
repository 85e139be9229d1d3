//! `LIMIT` — top-k prefix (§4.1).
//!
//! Classified `DM`: `merge` concatenates the prior result with the new
//! delta and re-applies `evaluate`. Deterministic only downstream of an
//! `ORDERBY` node.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::frame::Frame;
use crate::state::NodeState;

use super::{SlotInputs, SLOT_0};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitOp {
    pub k: usize,
}

impl LimitOp {
    pub fn new(k: usize) -> Result<Self, EngineError> {
        Ok(LimitOp { k })
    }

    pub fn evaluate(&self, _node: &str, inputs: &SlotInputs) -> Result<Option<Frame>, EngineError> {
        let frame = match inputs.get(SLOT_0) {
            Some(f) => f,
            None => return Ok(None),
        };
        Ok(Some(frame.head(self.k)))
    }

    pub fn merge(
        &self,
        node: &str,
        state: &mut NodeState,
        delta: &SlotInputs,
        _return_delta: bool,
    ) -> Result<Option<Frame>, EngineError> {
        let delta_frame = match delta.get(SLOT_0) {
            Some(f) => f.clone(),
            None => return Ok(None),
        };
        let NodeState::Result { result } = state else {
            return Err(EngineError::Internal {
                node: node.to_string(),
                reason: "LIMIT node state is not Result".to_string(),
            });
        };
        let combined = match result.take() {
            Some(prior) => Frame::concat(&[&prior, &delta_frame], node, "LIMIT")?,
            None => delta_frame,
        };
        let limited = combined.head(self.k);
        *result = Some(limited.clone());
        Ok(Some(limited))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;
    use std::collections::HashMap;

    fn input(v: &[i64]) -> SlotInputs {
        let mut m = HashMap::new();
        m.insert(SLOT_0.to_string(), Frame::new(df!("v" => v).unwrap()));
        m
    }

    #[test]
    fn evaluate_takes_first_k_rows() {
        let op = LimitOp::new(2).unwrap();
        let out = op.evaluate("n", &input(&[5, 3, 8])).unwrap().unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn merge_re_applies_limit_over_accumulation() {
        let op = LimitOp::new(3).unwrap();
        let mut state = NodeState::new_result();
        let first = op.merge("n", &mut state, &input(&[5, 3]), false).unwrap().unwrap();
        assert_eq!(first.height(), 2);
        let second = op.merge("n", &mut state, &input(&[8, 1, 7]), false).unwrap().unwrap();
        assert_eq!(second.height(), 3);
    }

    #[test]
    fn k_zero_yields_no_rows() {
        let op = LimitOp::new(0).unwrap();
        let out = op.evaluate("n", &input(&[1, 2, 3])).unwrap().unwrap();
        assert!(out.is_empty());
    }
}

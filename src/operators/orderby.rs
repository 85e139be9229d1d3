//! `ORDERBY` — multi-key stable sort with per-key direction (§4.1).
//!
//! Classified `DM`: `merge` concatenates the prior result with the new
//! delta and re-sorts the entire accumulation, since a sort cannot be
//! maintained incrementally in general.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::expr::validate_columns_exist;
use crate::frame::Frame;
use crate::state::NodeState;

use super::{SlotInputs, SLOT_0};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderKey {
    pub column: String,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderByOp {
    pub keys: Vec<OrderKey>,
}

impl OrderByOp {
    pub fn new(keys: Vec<OrderKey>) -> Result<Self, EngineError> {
        if keys.is_empty() {
            return Err(EngineError::InvalidArgs {
                node: "<unbound>".to_string(),
                operator: "ORDERBY",
                reason: "at least one sort key is required".to_string(),
            });
        }
        Ok(OrderByOp { keys })
    }

    fn sort(&self, frame: &Frame, node: &str, config: &EngineConfig) -> Result<Frame, EngineError> {
        let columns: Vec<String> = self.keys.iter().map(|k| k.column.clone()).collect();
        validate_columns_exist(&columns, &frame.schema(), node, "ORDERBY")?;
        let descending: Vec<bool> = self.keys.iter().map(|k| k.descending).collect();
        frame.sort_by(&columns, &descending, config.case_sensitive_sort, node, "ORDERBY")
    }

    pub fn evaluate(
        &self,
        node: &str,
        inputs: &SlotInputs,
        config: &EngineConfig,
    ) -> Result<Option<Frame>, EngineError> {
        let frame = match inputs.get(SLOT_0) {
            Some(f) => f,
            None => return Ok(None),
        };
        Ok(Some(self.sort(frame, node, config)?))
    }

    /// `merge` always returns the full accumulation (§4.1: `return_delta`
    /// is not meaningful for a `DM` materialization boundary).
    pub fn merge(
        &self,
        node: &str,
        state: &mut NodeState,
        delta: &SlotInputs,
        _return_delta: bool,
        config: &EngineConfig,
    ) -> Result<Option<Frame>, EngineError> {
        let delta_frame = match delta.get(SLOT_0) {
            Some(f) => f.clone(),
            None => return Ok(None),
        };
        let NodeState::Result { result } = state else {
            return Err(EngineError::Internal {
                node: node.to_string(),
                reason: "ORDERBY node state is not Result".to_string(),
            });
        };
        let combined = match result.take() {
            Some(prior) => Frame::concat(&[&prior, &delta_frame], node, "ORDERBY")?,
            None => delta_frame,
        };
        let sorted = self.sort(&combined, node, config)?;
        *result = Some(sorted.clone());
        Ok(Some(sorted))
    }
}

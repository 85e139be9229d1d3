//! `SELECT` — column projection (§4.1).

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::expr::validate_columns_exist;
use crate::frame::Frame;
use crate::state::NodeState;

use super::{accumulate_result, SlotInputs, SLOT_0};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectOp {
    pub columns: SelectSpec,
}

/// `{columns: list<string> | "*"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SelectSpec {
    All,
    Columns(Vec<String>),
}

impl SelectOp {
    pub fn new(columns: SelectSpec) -> Result<Self, EngineError> {
        if let SelectSpec::Columns(cols) = &columns {
            if cols.is_empty() {
                return Err(EngineError::InvalidArgs {
                    node: "<unbound>".to_string(),
                    operator: "SELECT",
                    reason: "`columns` must not be empty".to_string(),
                });
            }
        }
        Ok(SelectOp { columns })
    }

    pub fn evaluate(&self, node: &str, inputs: &SlotInputs) -> Result<Option<Frame>, EngineError> {
        let frame = match inputs.get(SLOT_0) {
            Some(f) => f,
            None => return Ok(None),
        };
        match &self.columns {
            SelectSpec::All => Ok(Some(frame.clone())),
            SelectSpec::Columns(cols) => {
                if frame.is_empty() {
                    return Ok(Some(frame.clone()));
                }
                validate_columns_exist(cols, &frame.schema(), node, "SELECT")?;
                Ok(Some(frame.select(cols, node, "SELECT")?))
            }
        }
    }

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
        accumulate_result(state, output, node, "SELECT", return_delta)
    }
}

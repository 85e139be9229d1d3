//! `INNERJOIN` — equi-join on named key lists (§4.1).
//!
//! `stateful_inputs = true`: correct incremental execution requires
//! retaining every prior chunk on both slots. On a delta arriving at slot
//! `s`, join the new chunk against the *current* buffer of the other slot,
//! then append the new chunk to slot `s`'s own buffer — append strictly
//! after the join, never before, so the emitted delta never joins the new
//! chunk against itself (new-left × new-right is never double-counted;
//! see DESIGN.md's resolution of the source's buffer-update asymmetry).

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::frame::Frame;
use crate::state::NodeState;

use super::{SlotInputs, SLOT_0, SLOT_1};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InnerJoinOp {
    pub left_on: Vec<String>,
    pub right_on: Vec<String>,
}

impl InnerJoinOp {
    pub fn new(left_on: Vec<String>, right_on: Vec<String>) -> Result<Self, EngineError> {
        if left_on.is_empty() || right_on.is_empty() || left_on.len() != right_on.len() {
            return Err(EngineError::InvalidArgs {
                node: "<unbound>".to_string(),
                operator: "INNERJOIN",
                reason: format!(
                    "left_on ({}) and right_on ({}) must be non-empty and equal length",
                    left_on.len(),
                    right_on.len()
                ),
            });
        }
        Ok(InnerJoinOp { left_on, right_on })
    }

    /// Pure join of two frames; does not touch state. Used both by
    /// `evaluate` (which requires pre-gated, non-empty buffers) and by
    /// `merge`.
    fn join_frames(&self, left: &Frame, right: &Frame, node: &str) -> Result<Frame, EngineError> {
        left.inner_join(right, &self.left_on, &self.right_on, node)
    }

    /// §4.1: "the operator joins the incoming chunk against the full
    /// accumulated buffer of the other slot". This is only meaningful once
    /// both buffers are non-empty; the scheduler's missing-input gate
    /// ensures `evaluate`/`merge` are not invoked otherwise, but `evaluate`
    /// itself stays pure and simply reports no output when a side is empty.
    pub fn evaluate(&self, node: &str, inputs: &SlotInputs) -> Result<Option<Frame>, EngineError> {
        match (inputs.get(SLOT_0), inputs.get(SLOT_1)) {
            (Some(l), Some(r)) if !l.is_empty() && !r.is_empty() => {
                Ok(Some(self.join_frames(l, r, node)?))
            }
            _ => Ok(None),
        }
    }

    pub fn merge(
        &self,
        node: &str,
        state: &mut NodeState,
        delta: &SlotInputs,
        return_delta: bool,
    ) -> Result<Option<Frame>, EngineError> {
        let NodeState::JoinBuffers { input0, input1, result } = state else {
            return Err(EngineError::Internal {
                node: node.to_string(),
                reason: "INNERJOIN node state is not JoinBuffers".to_string(),
            });
        };

        let left_delta = delta.get(SLOT_0);
        let right_delta = delta.get(SLOT_1);

        let delta_join = match (left_delta, right_delta) {
            (Some(new_left), None) => {
                if new_left.is_empty() {
                    None
                } else if input1.is_empty() {
                    input0.push(new_left.clone());
                    None
                } else {
                    let opposite = Frame::concat(
                        &input1.iter().collect::<Vec<_>>(),
                        node,
                        "INNERJOIN",
                    )?;
                    let joined = self.join_frames(new_left, &opposite, node)?;
                    input0.push(new_left.clone());
                    Some(joined)
                }
            }
            (None, Some(new_right)) => {
                if new_right.is_empty() {
                    None
                } else if input0.is_empty() {
                    input1.push(new_right.clone());
                    None
                } else {
                    let opposite = Frame::concat(
                        &input0.iter().collect::<Vec<_>>(),
                        node,
                        "INNERJOIN",
                    )?;
                    let joined = self.join_frames(&opposite, new_right, node)?;
                    input1.push(new_right.clone());
                    Some(joined)
                }
            }
            (Some(_), Some(_)) => {
                return Err(EngineError::Internal {
                    node: node.to_string(),
                    reason: "INNERJOIN delta arrived on both slots in one task".to_string(),
                });
            }
            (None, None) => None,
        };

        let Some(joined) = delta_join else {
            return Ok(None);
        };

        let merged = match result.take() {
            Some(prior) => Frame::concat(&[&prior, &joined], node, "INNERJOIN")?,
            None => joined.clone(),
        };
        *result = Some(merged.clone());

        if return_delta {
            Ok(Some(joined))
        } else {
            Ok(Some(merged))
        }
    }
}

//! `WHERE` — row filter by a DNF/CNF predicate matrix (§4.1).
//!
//! ΔI(σP(Q)) = σP(ΔI(Q)): the predicate is applied to the child's delta
//! stream directly. `WHERE` is classified `DA` (§3) — `merge` is the
//! trivial pass-through of `evaluate`.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::expr::{compile_predicate_matrix, validate_columns_exist, Literal, PredForm, Predicate};
use crate::frame::Frame;
use crate::state::NodeState;

use super::{accumulate_result, SlotInputs, SLOT_0};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhereOp {
    pub predicates: Vec<Vec<Predicate>>,
    pub form: PredForm,
}

impl WhereOp {
    pub fn new(predicates: Vec<Vec<Predicate>>, form: PredForm) -> Result<Self, EngineError> {
        if predicates.iter().any(|group| group.is_empty()) {
            return Err(EngineError::InvalidArgs {
                node: "<unbound>".to_string(),
                operator: "WHERE",
                reason: "predicate groups must not be empty".to_string(),
            });
        }
        Ok(WhereOp { predicates, form })
    }

    pub fn evaluate(&self, node: &str, inputs: &SlotInputs) -> Result<Option<Frame>, EngineError> {
        let frame = match inputs.get(SLOT_0) {
            Some(f) => f,
            None => return Ok(None),
        };
        if frame.is_empty() {
            return Ok(Some(frame.clone()));
        }

        let schema = frame.schema();
        let referenced: Vec<String> = self
            .predicates
            .iter()
            .flatten()
            .map(|p| p.left.clone())
            .collect();
        validate_columns_exist(&referenced, &schema, node, "WHERE")?;

        let coerced: Vec<Vec<Predicate>> = self
            .predicates
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|p| {
                        let dtype = schema.get(&p.left).expect("validated above");
                        Literal::coerce_to_dtype(&p.right, dtype, node, "WHERE").map(|right| {
                            Predicate {
                                left: p.left.clone(),
                                op: p.op,
                                right,
                            }
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let expr = compile_predicate_matrix(&coerced, self.form);
        let out = frame.filter(expr, node, "WHERE")?;
        Ok(Some(out))
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
        accumulate_result(state, output, node, "WHERE", return_delta)
    }
}

//! Columnar table facade (§4.4).
//!
//! A [`Frame`] is an ordered, typed, named-column table — the sole currency
//! between operators. Frames are immutable once produced; every operation
//! below returns a new `Frame` rather than mutating in place. The facade is
//! backed by `polars`, treated as a pure library with no thread-local state
//! or global mutable registry.

use polars::prelude::{self as pl, IntoLazy};

use crate::error::EngineError;

/// An ordered, typed, named-column table.
#[derive(Debug, Clone)]
pub struct Frame(pl::DataFrame);

impl Frame {
    /// Wrap an already-constructed `polars::DataFrame`.
    pub fn new(df: pl::DataFrame) -> Self {
        Frame(df)
    }

    /// The empty frame with no columns and no rows.
    pub fn empty() -> Self {
        Frame(pl::DataFrame::empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.height() == 0
    }

    pub fn height(&self) -> usize {
        self.0.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.0
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// The underlying frame's schema, used to validate column references
    /// and to detect a target column's declared type for literal coercion.
    pub fn schema(&self) -> pl::Schema {
        self.0.schema().as_ref().clone()
    }

    pub fn as_polars(&self) -> &pl::DataFrame {
        &self.0
    }

    pub fn into_polars(self) -> pl::DataFrame {
        self.0
    }

    /// Two frames are *concatenable* if they share schema (§3). Concatenation
    /// preserves order by appending.
    pub fn concat(frames: &[&Frame], node: &str, operator: &'static str) -> Result<Frame, EngineError> {
        let non_empty: Vec<&Frame> = frames.iter().copied().filter(|f| !f.is_empty()).collect();
        if non_empty.is_empty() {
            return Ok(Frame::empty());
        }
        if non_empty.len() == 1 {
            return Ok(non_empty[0].clone());
        }
        let lazy_frames: Vec<pl::LazyFrame> =
            non_empty.iter().map(|f| f.0.clone().lazy()).collect();
        let combined = pl::concat(&lazy_frames, pl::UnionArgs::default())
            .map_err(|source| EngineError::Frame { node: node.to_string(), source })?
            .collect()
            .map_err(|source| EngineError::Frame { node: node.to_string(), source })?;
        let _ = operator;
        Ok(Frame(combined))
    }

    /// Row filter by a boolean `polars` expression.
    pub fn filter(
        &self,
        predicate: pl::Expr,
        node: &str,
        operator: &'static str,
    ) -> Result<Frame, EngineError> {
        if self.is_empty() {
            return Ok(self.clone());
        }
        let out = self
            .0
            .clone()
            .lazy()
            .filter(predicate)
            .collect()
            .map_err(|source| EngineError::Frame { node: node.to_string(), source })?;
        let _ = operator;
        Ok(Frame(out))
    }

    /// Column projection, in the given order. Errors with `SchemaError` if
    /// any requested column is unknown (checked by the caller beforehand).
    pub fn select(
        &self,
        columns: &[String],
        node: &str,
        operator: &'static str,
    ) -> Result<Frame, EngineError> {
        let exprs: Vec<pl::Expr> = columns.iter().map(|c| pl::col(c)).collect();
        let out = self
            .0
            .clone()
            .lazy()
            .select(exprs)
            .collect()
            .map_err(|source| EngineError::Frame { node: node.to_string(), source })?;
        let _ = operator;
        Ok(Frame(out))
    }

    /// Inner equi-join on the given key-column pairs. Right-side key
    /// columns are dropped on match, per §4.1's `INNERJOIN` contract.
    pub fn inner_join(
        &self,
        other: &Frame,
        left_on: &[String],
        right_on: &[String],
        node: &str,
    ) -> Result<Frame, EngineError> {
        if self.is_empty() || other.is_empty() {
            return Ok(Frame::empty());
        }
        let left_cols: Vec<pl::Expr> = left_on.iter().map(|c| pl::col(c)).collect();
        let right_cols: Vec<pl::Expr> = right_on.iter().map(|c| pl::col(c)).collect();
        let out = self
            .0
            .clone()
            .lazy()
            .join(
                other.0.clone().lazy(),
                left_cols,
                right_cols,
                pl::JoinArgs::new(pl::JoinType::Inner),
            )
            .collect()
            .map_err(|source| EngineError::Frame { node: node.to_string(), source })?;
        Ok(Frame(out))
    }

    /// Group by the given key columns and apply the given aggregate
    /// expressions, each producing a column under its own alias.
    ///
    /// When `group_keys` is empty, a single synthetic group is used, per
    /// §4.1's `GROUPBYAGG` contract for an empty `groupby_key`.
    pub fn group_by_agg(
        &self,
        group_keys: &[String],
        aggregates: Vec<pl::Expr>,
        node: &str,
        operator: &'static str,
    ) -> Result<Frame, EngineError> {
        let lazy = self.0.clone().lazy();
        let grouped = if group_keys.is_empty() {
            let aliases = aggregates_aliases(&aggregates);
            lazy.with_column(pl::lit(1i32).alias("__engine_literal_group"))
                .group_by([pl::col("__engine_literal_group")])
                .agg(aggregates)
                .select(aggregates_output_exprs(&aliases))
        } else {
            let key_exprs: Vec<pl::Expr> = group_keys.iter().map(|c| pl::col(c)).collect();
            lazy.group_by(key_exprs).agg(aggregates)
        };
        let out = grouped
            .collect()
            .map_err(|source| EngineError::Frame { node: node.to_string(), source })?;
        let _ = operator;
        Ok(Frame(out))
    }

    /// Multi-key stable sort with per-column direction.
    ///
    /// When `case_sensitive` is false, any string-typed sort column is
    /// compared via a lowercased shadow key so letter case does not affect
    /// row order; the original column values are returned unchanged.
    pub fn sort_by(
        &self,
        columns: &[String],
        descending: &[bool],
        case_sensitive: bool,
        node: &str,
        operator: &'static str,
    ) -> Result<Frame, EngineError> {
        if self.is_empty() {
            return Ok(self.clone());
        }
        let schema = self.0.schema();
        let mut lazy = self.0.clone().lazy();
        let mut sort_cols: Vec<String> = Vec::with_capacity(columns.len());
        let mut shadow_keys: Vec<String> = Vec::new();
        for c in columns {
            let is_string = !case_sensitive
                && matches!(schema.get(c.as_str()), Some(pl::DataType::String));
            if is_string {
                let key = format!("__orderby_ci_{c}");
                lazy = lazy.with_column(pl::col(c).str().to_lowercase().alias(&key));
                sort_cols.push(key.clone());
                shadow_keys.push(key);
            } else {
                sort_cols.push(c.clone());
            }
        }
        let sort_options = pl::SortMultipleOptions::default()
            .with_order_descending_multi(descending.to_vec())
            .with_maintain_order(true);
        let mut out_lazy = lazy.sort(sort_cols, sort_options);
        if !shadow_keys.is_empty() {
            let keep: Vec<pl::Expr> = self.column_names().iter().map(|c| pl::col(c)).collect();
            out_lazy = out_lazy.select(keep);
        }
        let out = out_lazy
            .collect()
            .map_err(|source| EngineError::Frame { node: node.to_string(), source })?;
        let _ = operator;
        Ok(Frame(out))
    }

    /// The first `k` rows, per §4.1's `LIMIT` contract.
    pub fn head(&self, k: usize) -> Frame {
        Frame(self.0.head(Some(k)))
    }
}

/// Helper retained for the empty-group-key path of [`Frame::group_by_agg`]:
/// extracts the output alias of each aggregate expression so the synthetic
/// grouping column can be dropped from the final projection.
fn aggregates_aliases(aggregates: &[pl::Expr]) -> Vec<String> {
    aggregates
        .iter()
        .map(|e| e.clone().meta().output_name().unwrap_or_default().to_string())
        .collect()
}

fn aggregates_output_exprs(aliases: &[String]) -> Vec<pl::Expr> {
    aliases.iter().map(|a| pl::col(a)).collect()
}

//! Error types for the incremental query engine.
//!
//! All fallible operations in the crate return `Result<T, EngineError>`.
//!
//! # Error Classification
//!
//! Errors fall into three fatal categories plus one non-error signal:
//! - **Config** — invalid operator arguments or an invalid graph. Fatal at
//!   construction/compile time.
//! - **Schema** — column/type mismatches discovered while running a node.
//!   Fatal for the session.
//! - **Unsupported** — an aggregate operator, predicate form, or join type
//!   the runtime does not implement. Fatal.
//!
//! There is no retry policy: a task error aborts the current tick and the
//! session's prior state remains valid for inspection but is not advanced.

use std::fmt;

/// Primary error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    // ── Config errors — fatal at construction/compile ────────────────────
    /// A required operator argument was missing or malformed.
    #[error("invalid arguments for operator {operator} at node '{node}': {reason}")]
    InvalidArgs {
        node: String,
        operator: &'static str,
        reason: String,
    },

    /// `add_operation` was called with a name already present in the graph.
    #[error("duplicate node name: '{0}'")]
    DuplicateNode(String),

    /// `add_edge` referenced a node that does not exist.
    #[error("edge references unknown node: '{0}'")]
    UnknownNode(String),

    /// The graph contains a cycle, so no topological order exists.
    #[error("cycle detected in graph, involving nodes: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),

    /// A node's inbound arity does not match what its operator expects.
    #[error(
        "node '{node}' (operator {operator}) expects {expected} inbound edge(s), has {actual}"
    )]
    ArityMismatch {
        node: String,
        operator: &'static str,
        expected: usize,
        actual: usize,
    },

    /// `run_incremental` was called with an `eval_node` that is not an output node.
    #[error("eval_node '{0}' is not an output node")]
    NotAnOutputNode(String),

    /// A graph operation was attempted before/after the wrong lifecycle phase.
    #[error("graph is not compiled (call compile() first)")]
    NotCompiled,

    /// `compile()` was called on an already-compiled graph, or a mutating
    /// operation was attempted on a compiled one.
    #[error("graph is already compiled and immutable")]
    AlreadyCompiled,

    // ── Schema errors — fatal for the session ────────────────────────────
    /// A column name was referenced that does not exist on the frame.
    #[error("unknown column '{column}' at node '{node}' (operator {operator})")]
    UnknownColumn {
        node: String,
        operator: &'static str,
        column: String,
    },

    /// Two frames expected to be concatenable do not share a schema.
    #[error("schema mismatch at node '{node}' (operator {operator}): {reason}")]
    SchemaMismatch {
        node: String,
        operator: &'static str,
        reason: String,
    },

    /// A literal could not be interpreted as the type the target column requires.
    #[error("type-incompatible literal at node '{node}' (operator {operator}): {reason}")]
    TypeMismatch {
        node: String,
        operator: &'static str,
        reason: String,
    },

    // ── Unsupported errors — fatal ────────────────────────────────────────
    /// An aggregate operator other than `sum`/`count` was requested.
    #[error("unsupported aggregate '{op}' at node '{node}'")]
    UnsupportedAggregate { node: String, op: String },

    /// A predicate form other than DNF/CNF was requested.
    #[error("unsupported predicate form '{form}' at node '{node}'")]
    UnsupportedPredicateForm { node: String, form: String },

    /// A join type other than inner equi-join was requested.
    #[error("unsupported join type '{join_type}' at node '{node}'")]
    UnsupportedJoinType { node: String, join_type: String },

    // ── Internal ───────────────────────────────────────────────────────────
    /// Something the engine's own invariants should have prevented.
    #[error("internal engine error at node '{node}': {reason}")]
    Internal { node: String, reason: String },

    /// Propagated verbatim from the underlying frame library.
    #[error("frame library error at node '{node}': {source}")]
    Frame {
        node: String,
        #[source]
        source: polars::error::PolarsError,
    },
}

impl EngineError {
    /// Coarse classification, useful for callers that want to branch on
    /// category without matching every variant. Has no bearing on retry
    /// behavior — this engine never retries a failed task.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidArgs { .. }
            | EngineError::DuplicateNode(_)
            | EngineError::UnknownNode(_)
            | EngineError::CycleDetected(_)
            | EngineError::ArityMismatch { .. }
            | EngineError::NotAnOutputNode(_)
            | EngineError::NotCompiled
            | EngineError::AlreadyCompiled => ErrorKind::Config,

            EngineError::UnknownColumn { .. }
            | EngineError::SchemaMismatch { .. }
            | EngineError::TypeMismatch { .. } => ErrorKind::Schema,

            EngineError::UnsupportedAggregate { .. }
            | EngineError::UnsupportedPredicateForm { .. }
            | EngineError::UnsupportedJoinType { .. } => ErrorKind::Unsupported,

            EngineError::Internal { .. } | EngineError::Frame { .. } => ErrorKind::Internal,
        }
    }

    /// The failing node's name, when the error is attributable to one node.
    pub fn node(&self) -> Option<&str> {
        match self {
            EngineError::InvalidArgs { node, .. }
            | EngineError::ArityMismatch { node, .. }
            | EngineError::UnknownColumn { node, .. }
            | EngineError::SchemaMismatch { node, .. }
            | EngineError::TypeMismatch { node, .. }
            | EngineError::UnsupportedAggregate { node, .. }
            | EngineError::UnsupportedPredicateForm { node, .. }
            | EngineError::UnsupportedJoinType { node, .. }
            | EngineError::Internal { node, .. }
            | EngineError::Frame { node, .. } => Some(node),
            EngineError::DuplicateNode(n) | EngineError::UnknownNode(n) => Some(n),
            EngineError::NotAnOutputNode(n) => Some(n),
            EngineError::CycleDetected(_)
            | EngineError::NotCompiled
            | EngineError::AlreadyCompiled => None,
        }
    }
}

/// Coarse classification of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Schema,
    Unsupported,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Config => write!(f, "CONFIG"),
            ErrorKind::Schema => write!(f, "SCHEMA"),
            ErrorKind::Unsupported => write!(f, "UNSUPPORTED"),
            ErrorKind::Internal => write!(f, "INTERNAL"),
        }
    }
}

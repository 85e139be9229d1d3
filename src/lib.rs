//! An incremental relational query engine core.
//!
//! Leaf *table* nodes receive partition deltas; a session scheduler
//! propagates each delta through a compiled operator graph — filtering,
//! projecting, joining, grouping, sorting, and limiting — while preserving
//! the invariant that every materialized result equals the batch result of
//! running the same query over the union of all partitions delivered so
//! far.
//!
//! # Theoretical Basis
//!
//! - **DBSP**: Budiu et al., "DBSP: Automatic Differential View Maintenance
//!   for Rich Query Languages", PVLDB 2023. <https://arxiv.org/abs/2203.16684>
//! - **Gupta & Mumick (1995)**: "Maintenance of Materialized Views: Problems,
//!   Techniques, and Applications", IEEE Data Engineering Bulletin.
//! - **Kahn (1962)**: "Topological sorting of large networks", CACM —
//!   the graph's cycle-detection/ordering algorithm.
//!
//! # Module Map
//!
//! - [`expr`] — the column/literal/predicate expression AST.
//! - [`frame`] — the columnar table facade used by every operator.
//! - [`operators`] — the closed operator algebra (`TABLE`, `WHERE`,
//!   `SELECT`, `INNERJOIN`, `GROUPBYAGG`, `ORDERBY`, `LIMIT`).
//! - [`state`] — per-node state shapes.
//! - [`graph`] — the typed query DAG: registration, wiring, compilation,
//!   (de)serialization.
//! - [`scheduler`] — the session task queue that drives deltas through a
//!   compiled graph.
//! - [`config`] — session construction options.
//! - [`error`] — the engine's unified error type.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod error;
pub mod expr;
pub mod frame;
pub mod graph;
pub mod operators;
pub mod scheduler;
pub mod state;

pub use config::EngineConfig;
pub use error::{EngineError, ErrorKind};
pub use frame::Frame;
pub use graph::{Graph, NodeKind};
pub use scheduler::Session;

//! Session-level task scheduler (§4.3).
//!
//! A [`Session`] owns one compiled [`Graph`] and a per-node state map. Its
//! single entry point, [`Session::run_incremental`], drains a FIFO task
//! queue seeded from the caller's per-table deltas, propagating output
//! frames toward `eval_node` while choosing — per edge, per tick — whether
//! the downstream node should incrementally evaluate, merge into stateful
//! buffers, or re-evaluate from scratch above a materialization boundary.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, instrument};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::frame::Frame;
use crate::graph::{Graph, NodeKind};
use crate::operators::{SlotInputs, SLOT_0, SLOT_1};
use crate::state::NodeState;

/// The four task dispatch types described in §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    IncrementalEvaluate,
    MergeStateful,
    MergeResult,
    Evaluate,
}

#[derive(Debug, Clone)]
struct Task {
    node: String,
    input: SlotInputs,
    kind: TaskKind,
}

/// One running instance of a compiled graph, holding all per-node state
/// across ticks.
pub struct Session {
    graph: Graph,
    state: HashMap<String, NodeState>,
    /// The last frame received on each slot of each node, used to fill in
    /// untouched slots when building a pure `evaluate`'s combined input
    /// (§4.3 step 3's "built_input").
    last_input: HashMap<String, SlotInputs>,
    config: EngineConfig,
}

impl Session {
    /// Construct a session from a compiled graph. Fails with `NotCompiled`
    /// if `graph.compile()` was never called.
    pub fn new(graph: Graph, config: EngineConfig) -> Result<Self, EngineError> {
        if !graph.is_compiled() {
            return Err(EngineError::NotCompiled);
        }
        let mut state = HashMap::new();
        for name in graph.node_names() {
            let node = graph.node(name).expect("listed node exists");
            let node_state = if graph.needs_state(name) {
                node.operator.fresh_state()
            } else {
                NodeState::Stateless
            };
            state.insert(name.clone(), node_state);
        }
        Ok(Session {
            graph,
            state,
            last_input: HashMap::new(),
            config,
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The accumulated result at `node`, if any has been produced yet.
    pub fn node_result(&self, node: &str) -> Option<&Frame> {
        self.state.get(node).and_then(NodeState::accumulated_result)
    }

    /// Drive one tick's worth of deltas through the graph and return the
    /// last frame produced at `eval_node` once the queue drains.
    #[instrument(skip(self, input_nodes), fields(eval_node = eval_node))]
    pub fn run_incremental(
        &mut self,
        eval_node: &str,
        input_nodes: HashMap<String, SlotInputs>,
    ) -> Result<Frame, EngineError> {
        let eval = self
            .graph
            .node(eval_node)
            .ok_or_else(|| EngineError::UnknownNode(eval_node.to_string()))?;
        if !eval.output {
            return Err(EngineError::NotAnOutputNode(eval_node.to_string()));
        }

        let mut queue: VecDeque<Task> = VecDeque::new();
        for (table, delta) in input_nodes {
            if self.graph.node(&table).is_none() {
                return Err(EngineError::UnknownNode(table));
            }
            queue.push_back(Task {
                node: table,
                input: delta,
                kind: TaskKind::IncrementalEvaluate,
            });
        }

        // The last `output` actually computed for `eval_node` this tick.
        // Captured directly rather than read back out of `state[eval_node]`
        // afterward: a node reached via a pure `evaluate` (the re-evaluation
        // path above a materialization boundary, e.g. a `LIMIT` sitting
        // right after a `MergeResult`-driven `ORDERBY`) never mutates its
        // own state, so `node_result` would stay stale or empty even though
        // a correct snapshot was just produced (examples/original_source's
        // `query/session.py` returns the computed `output` the same way).
        let mut last_eval_output: Option<Frame> = None;

        while let Some(task) = queue.pop_front() {
            let node_name = task.node.clone();
            let node_outbound = self
                .graph
                .node(&node_name)
                .expect("validated node")
                .outbound
                .clone();

            // Fold this task's delta into the node's per-slot cache; used
            // below by the pure evaluate path.
            let entry = self.last_input.entry(node_name.clone()).or_default();
            for (slot, frame) in &task.input {
                entry.insert(slot.clone(), frame.clone());
            }
            let built_input = entry.clone();

            let output = {
                let node = self.graph.node(&node_name).expect("validated node");
                match task.kind {
                    TaskKind::IncrementalEvaluate | TaskKind::Evaluate => {
                        node.operator.evaluate(&node_name, &built_input, &self.config)?
                    }
                    TaskKind::MergeStateful => {
                        let state = self
                            .state
                            .get_mut(&node_name)
                            .expect("state seeded at construction");
                        node.operator
                            .merge(&node_name, state, &task.input, true, &self.config)?
                    }
                    TaskKind::MergeResult => {
                        let state = self
                            .state
                            .get_mut(&node_name)
                            .expect("state seeded at construction");
                        node.operator
                            .merge(&node_name, state, &task.input, false, &self.config)?
                    }
                }
            };

            let Some(output) = output else {
                debug!(node = %node_name, task = ?task.kind, "gated: no output produced this task");
                continue;
            };

            if node_name == eval_node {
                last_eval_output = Some(output.clone());
            }

            for parent_name in &node_outbound {
                let parent = self.graph.node(parent_name).expect("edge target exists");
                let slot_index = parent
                    .inbound
                    .iter()
                    .position(|s| s == &node_name)
                    .expect("edge recorded on both ends");
                let slot_name = if slot_index == 0 { SLOT_0 } else { SLOT_1 };

                let mut parent_delta = SlotInputs::new();
                parent_delta.insert(slot_name.to_string(), output.clone());

                let kind = dispatch_kind(
                    parent_name == eval_node,
                    parent.kind,
                    parent.operator.stateful_inputs(),
                    task.kind,
                );
                debug!(parent = %parent_name, ?kind, "enqueue");
                queue.push_back(Task {
                    node: parent_name.clone(),
                    input: parent_delta,
                    kind,
                });
            }
        }

        Ok(last_eval_output.unwrap_or_else(Frame::empty))
    }
}

/// The ordered dispatch-type rule of §4.3 step 4, first match wins.
fn dispatch_kind(
    parent_is_eval_node: bool,
    parent_kind: NodeKind,
    parent_stateful_inputs: bool,
    current_task_kind: TaskKind,
) -> TaskKind {
    let came_from_increment = matches!(
        current_task_kind,
        TaskKind::IncrementalEvaluate | TaskKind::MergeStateful
    );
    if (parent_is_eval_node || parent_kind == NodeKind::Dm) && came_from_increment {
        return TaskKind::MergeResult;
    }
    if parent_stateful_inputs {
        return TaskKind::MergeStateful;
    }
    if current_task_kind == TaskKind::MergeResult {
        return TaskKind::Evaluate;
    }
    TaskKind::IncrementalEvaluate
}

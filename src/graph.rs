//! Typed query graph (§4.2).
//!
//! The graph stores, per node name: operator, kind (`DA`|`DM`), ordered
//! inbound/outbound edge lists, and an `output` flag. Nodes and edges are
//! created once at compile time and are immutable afterward (§3's
//! lifecycle invariant). Acyclicity is checked with Kahn's algorithm
//! (Kahn, "Topological sorting of large networks", CACM 1962):
//! repeatedly remove zero-in-degree nodes; anything left over once no more
//! can be removed sits on a cycle.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::operators::{Arity, OperatorSpec};

/// Node classification attached at graph-build time (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Differentially applicable: evaluate-on-delta plus associative merge.
    Da,
    /// Differentially materialized: accumulated state must be reduced
    /// before downstream consumers see a usable frame.
    Dm,
}

#[derive(Debug, Clone)]
pub struct GraphNode {
    pub operator: OperatorSpec,
    pub kind: NodeKind,
    pub output: bool,
    /// Ordered by registration; inbound[i] is the source feeding slot i.
    pub inbound: Vec<String>,
    pub outbound: Vec<String>,
}

/// The compiled/uncompiled query graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: HashMap<String, GraphNode>,
    /// Registration order, kept so `save()` emits a deterministic document
    /// even though `nodes` itself is a hash map.
    order: Vec<String>,
    compiled: bool,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// `add_operation(name, operator, kind, output)` — duplicates fail.
    /// `kind` defaults to the operator's own classification (§3) when `None`.
    pub fn add_operation(
        &mut self,
        name: impl Into<String>,
        operator: OperatorSpec,
        kind: Option<NodeKind>,
        output: bool,
    ) -> Result<(), EngineError> {
        if self.compiled {
            return Err(EngineError::AlreadyCompiled);
        }
        let name = name.into();
        if self.nodes.contains_key(&name) {
            return Err(EngineError::DuplicateNode(name));
        }
        let kind = kind.unwrap_or_else(|| operator.default_classification());
        self.order.push(name.clone());
        self.nodes.insert(
            name,
            GraphNode {
                operator,
                kind,
                output,
                inbound: Vec::new(),
                outbound: Vec::new(),
            },
        );
        Ok(())
    }

    /// `add_edge(source, destination)` — both must exist; the position in
    /// `destination`'s inbound list defines the slot index of that input.
    pub fn add_edge(
        &mut self,
        source: impl AsRef<str>,
        destination: impl AsRef<str>,
    ) -> Result<(), EngineError> {
        if self.compiled {
            return Err(EngineError::AlreadyCompiled);
        }
        let source = source.as_ref();
        let destination = destination.as_ref();
        if !self.nodes.contains_key(source) {
            return Err(EngineError::UnknownNode(source.to_string()));
        }
        if !self.nodes.contains_key(destination) {
            return Err(EngineError::UnknownNode(destination.to_string()));
        }
        self.nodes
            .get_mut(destination)
            .expect("checked above")
            .inbound
            .push(source.to_string());
        self.nodes
            .get_mut(source)
            .expect("checked above")
            .outbound
            .push(destination.to_string());
        Ok(())
    }

    /// Validates acyclicity and per-node arity, then freezes the graph.
    pub fn compile(&mut self) -> Result<(), EngineError> {
        if self.compiled {
            return Err(EngineError::AlreadyCompiled);
        }
        self.topological_order()?;
        for name in &self.order {
            let node = &self.nodes[name];
            let expected = node.operator.expected_arity();
            let actual = node.inbound.len();
            let ok = match expected {
                Arity::Zero => actual == 0,
                Arity::One => actual == 1,
                Arity::Two => actual == 2,
            };
            if !ok {
                return Err(EngineError::ArityMismatch {
                    node: name.clone(),
                    operator: node.operator.kind_name(),
                    expected: expected.count(),
                    actual,
                });
            }
        }
        self.compiled = true;
        Ok(())
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    pub fn node(&self, name: &str) -> Option<&GraphNode> {
        self.nodes.get(name)
    }

    pub fn node_names(&self) -> &[String] {
        &self.order
    }

    /// True iff the node is an output node, has kind `DM`, or its operator
    /// declares `stateful_inputs` (§4.2).
    pub fn needs_state(&self, name: &str) -> bool {
        match self.nodes.get(name) {
            Some(n) => n.output || n.kind == NodeKind::Dm || n.operator.stateful_inputs(),
            None => false,
        }
    }

    /// Kahn's algorithm: returns a topological order, or `CycleDetected`
    /// naming every node that could never reach zero in-degree.
    pub fn topological_order(&self) -> Result<Vec<String>, EngineError> {
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        for name in &self.order {
            in_degree.insert(name.as_str(), self.nodes[name].inbound.len());
        }
        let mut queue: VecDeque<&str> = self
            .order
            .iter()
            .map(|s| s.as_str())
            .filter(|n| in_degree[n] == 0)
            .collect();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        while let Some(n) = queue.pop_front() {
            visited.insert(n);
            out.push(n.to_string());
            for child in &self.nodes[n].outbound {
                let entry = in_degree.get_mut(child.as_str()).expect("known node");
                *entry -= 1;
                if *entry == 0 {
                    queue.push_back(child.as_str());
                }
            }
        }
        if out.len() != self.nodes.len() {
            let remaining: Vec<String> = self
                .order
                .iter()
                .filter(|n| !visited.contains(n.as_str()))
                .cloned()
                .collect();
            return Err(EngineError::CycleDetected(remaining));
        }
        Ok(out)
    }

    /// Serialize to the portable structural form described in §6.
    pub fn save(&self) -> SerializedGraph {
        let mut nodes = HashMap::new();
        let mut edges = Vec::new();
        for name in &self.order {
            let node = &self.nodes[name];
            nodes.insert(
                name.clone(),
                SerializedNode {
                    kind: node.kind,
                    output: node.output,
                    operator: node.operator.clone(),
                },
            );
            for src in &node.inbound {
                edges.push((src.clone(), name.clone()));
            }
        }
        SerializedGraph { nodes, edges }
    }

    /// Reconstructs a graph from its serialized form. Node registration
    /// order is not preserved (the document is a map), but slot ordering
    /// is: it comes entirely from `edges`' occurrence order per
    /// destination, which round-trips exactly.
    pub fn load(doc: SerializedGraph) -> Result<Graph, EngineError> {
        let mut graph = Graph::new();
        let mut names: Vec<&String> = doc.nodes.keys().collect();
        names.sort();
        for name in names {
            let node = &doc.nodes[name];
            graph.add_operation(name.clone(), node.operator.clone(), Some(node.kind), node.output)?;
        }
        for (src, dst) in &doc.edges {
            graph.add_edge(src, dst)?;
        }
        Ok(graph)
    }
}

/// Portable structural form of a [`Graph`] (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedGraph {
    pub nodes: HashMap<String, SerializedNode>,
    pub edges: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedNode {
    pub kind: NodeKind,
    pub output: bool,
    #[serde(flatten)]
    pub operator: OperatorSpec,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::{LimitOp, OrderByOp, SelectOp, SelectSpec, TableOp};

    fn table(name: &str) -> OperatorSpec {
        OperatorSpec::Table(TableOp::new(name).unwrap())
    }

    fn select_star() -> OperatorSpec {
        OperatorSpec::Select(SelectOp::new(SelectSpec::All).unwrap())
    }

    #[test]
    fn simple_chain_topologically_sorts() {
        let mut g = Graph::new();
        g.add_operation("t", table("lineitem"), None, false).unwrap();
        g.add_operation("s", select_star(), None, true).unwrap();
        g.add_edge("t", "s").unwrap();
        let order = g.topological_order().unwrap();
        assert_eq!(order, vec!["t".to_string(), "s".to_string()]);
    }

    #[test]
    fn duplicate_node_name_fails() {
        let mut g = Graph::new();
        g.add_operation("t", table("a"), None, false).unwrap();
        let err = g.add_operation("t", table("b"), None, false).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateNode(_)));
    }

    #[test]
    fn edge_to_unknown_node_fails() {
        let mut g = Graph::new();
        g.add_operation("t", table("a"), None, false).unwrap();
        let err = g.add_edge("t", "missing").unwrap_err();
        assert!(matches!(err, EngineError::UnknownNode(_)));
    }

    #[test]
    fn two_node_cycle_is_detected() {
        let mut g = Graph::new();
        g.add_operation("a", select_star(), None, false).unwrap();
        g.add_operation("b", select_star(), None, false).unwrap();
        g.add_edge("a", "b").unwrap();
        g.add_edge("b", "a").unwrap();
        let err = g.topological_order().unwrap_err();
        match err {
            EngineError::CycleDetected(nodes) => {
                assert!(nodes.contains(&"a".to_string()));
                assert!(nodes.contains(&"b".to_string()));
            }
            _ => panic!("expected CycleDetected"),
        }
    }

    #[test]
    fn three_node_cycle_is_detected() {
        let mut g = Graph::new();
        for n in ["a", "b", "c"] {
            g.add_operation(n, select_star(), None, false).unwrap();
        }
        g.add_edge("a", "b").unwrap();
        g.add_edge("b", "c").unwrap();
        g.add_edge("c", "a").unwrap();
        assert!(g.topological_order().is_err());
    }

    #[test]
    fn compile_rejects_arity_mismatch() {
        let mut g = Graph::new();
        // SELECT expects exactly one inbound edge; give it zero.
        g.add_operation("s", select_star(), None, true).unwrap();
        let err = g.compile().unwrap_err();
        assert!(matches!(err, EngineError::ArityMismatch { .. }));
    }

    #[test]
    fn compile_accepts_table_with_zero_inbound_edges() {
        let mut g = Graph::new();
        g.add_operation("t", table("lineitem"), None, true).unwrap();
        assert!(g.compile().is_ok());
        assert!(g.is_compiled());
    }

    #[test]
    fn compile_twice_fails() {
        let mut g = Graph::new();
        g.add_operation("t", table("lineitem"), None, true).unwrap();
        g.compile().unwrap();
        assert!(matches!(g.compile().unwrap_err(), EngineError::AlreadyCompiled));
    }

    #[test]
    fn needs_state_true_for_output_dm_and_stateful_nodes() {
        let mut g = Graph::new();
        g.add_operation("t", table("lineitem"), None, false).unwrap();
        g.add_operation(
            "o",
            OperatorSpec::OrderBy(OrderByOp::new(vec![crate::operators::orderby::OrderKey {
                column: "v".into(),
                descending: false,
            }]).unwrap()),
            None,
            false,
        )
        .unwrap();
        g.add_operation("l", OperatorSpec::Limit(LimitOp::new(3).unwrap()), None, true).unwrap();
        g.add_edge("t", "o").unwrap();
        g.add_edge("o", "l").unwrap();

        assert!(!g.needs_state("t")); // TABLE is DA, not output
        assert!(g.needs_state("o")); // ORDERBY is DM
        assert!(g.needs_state("l")); // output node
    }

    #[test]
    fn save_load_round_trip_preserves_slot_order() {
        let mut g = Graph::new();
        g.add_operation(
            "left",
            table("l"),
            None,
            false,
        )
        .unwrap();
        g.add_operation("right", table("r"), None, false).unwrap();
        g.add_operation(
            "j",
            OperatorSpec::InnerJoin(
                crate::operators::InnerJoinOp::new(vec!["id".into()], vec!["id".into()]).unwrap(),
            ),
            None,
            true,
        )
        .unwrap();
        g.add_edge("left", "j").unwrap();
        g.add_edge("right", "j").unwrap();
        g.compile().unwrap();

        let doc = g.save();
        let json = serde_json::to_string(&doc).unwrap();
        let decoded: SerializedGraph = serde_json::from_str(&json).unwrap();
        let mut reloaded = Graph::load(decoded).unwrap();
        reloaded.compile().unwrap();

        let j = reloaded.node("j").unwrap();
        assert_eq!(j.inbound, vec!["left".to_string(), "right".to_string()]);
    }
}

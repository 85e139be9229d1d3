//! Per-node state (§3, §9).
//!
//! Rather than a shape-polymorphic dictionary (some nodes store a frame,
//! some a map of slot buffers plus a frame, some nothing — visible in the
//! source's bare `state['result']` for most operators versus
//! `state['input'] = {'input0': [], 'input1': []}` for joins), state is a
//! tagged union per node kind. A node's [`NodeState`] variant is fixed once
//! at session construction, determined by `Graph::needs_state`.

use crate::frame::Frame;

/// State held for one node across a session's lifetime.
#[derive(Debug, Clone)]
pub enum NodeState {
    /// `needs_state(node)` is false: nothing is retained between ticks.
    Stateless,

    /// A single accumulated result, used by `TABLE`, `SELECT`, `GROUPBYAGG`,
    /// `ORDERBY`, and `LIMIT` when acting as an output node or a
    /// materialization boundary.
    Result { result: Option<Frame> },

    /// Two per-slot accumulation buffers plus the accumulated join result,
    /// used by `INNERJOIN` (`stateful_inputs = true`).
    JoinBuffers {
        input0: Vec<Frame>,
        input1: Vec<Frame>,
        result: Option<Frame>,
    },
}

impl NodeState {
    pub fn new_result() -> Self {
        NodeState::Result { result: None }
    }

    pub fn new_join_buffers() -> Self {
        NodeState::JoinBuffers {
            input0: Vec::new(),
            input1: Vec::new(),
            result: None,
        }
    }

    /// The definitive accumulated frame at this node, if any has been
    /// produced yet. Returns `None` for `Stateless` nodes or before the
    /// first `merge`.
    pub fn accumulated_result(&self) -> Option<&Frame> {
        match self {
            NodeState::Stateless => None,
            NodeState::Result { result } => result.as_ref(),
            NodeState::JoinBuffers { result, .. } => result.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stateless_has_no_accumulated_result() {
        assert!(NodeState::Stateless.accumulated_result().is_none());
    }

    #[test]
    fn fresh_result_state_has_no_accumulated_result() {
        assert!(NodeState::new_result().accumulated_result().is_none());
    }

    #[test]
    fn fresh_join_buffers_are_empty() {
        let state = NodeState::new_join_buffers();
        match state {
            NodeState::JoinBuffers { input0, input1, result } => {
                assert!(input0.is_empty());
                assert!(input1.is_empty());
                assert!(result.is_none());
            }
            _ => panic!("expected JoinBuffers"),
        }
    }
}

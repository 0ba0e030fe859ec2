// src/dag/builder.rs

//! Fluent construction of pipeline graphs.
//!
//! Topology is declared separately from task definitions: add the nodes,
//! then wire them with explicit edges or the `then`/`fan_out`/`fan_in`
//! combinators. Validation (duplicates, unknown references, cycles) happens
//! once, in [`GraphBuilder::build`].

use crate::dag::graph::PipelineGraph;
use crate::dag::task::{TaskName, TaskNode};
use crate::errors::Result;

#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<TaskNode>,
    edges: Vec<(TaskName, TaskName)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(mut self, node: TaskNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add a single must-complete-before edge: `to` depends on `from`.
    pub fn edge(mut self, from: &str, to: &str) -> Self {
        self.edges.push((from.to_string(), to.to_string()));
        self
    }

    /// Chain two tasks: `to` runs after `from`.
    pub fn then(self, from: &str, to: &str) -> Self {
        self.edge(from, to)
    }

    /// One task unlocking many: every task in `tos` depends on `from`.
    pub fn fan_out(mut self, from: &str, tos: &[&str]) -> Self {
        for to in tos {
            self.edges.push((from.to_string(), to.to_string()));
        }
        self
    }

    /// Many tasks required before one: `to` depends on every task in `froms`.
    pub fn fan_in(mut self, froms: &[&str], to: &str) -> Self {
        for from in froms {
            self.edges.push((from.to_string(), to.to_string()));
        }
        self
    }

    /// Validate and freeze the graph.
    pub fn build(self) -> Result<PipelineGraph> {
        PipelineGraph::build(self.nodes, self.edges)
    }
}

// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::ConfigFile;
use crate::dag::task::{TaskName, TaskNode};
use crate::errors::{PipelineError, Result};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct Adjacency {
    /// Direct dependencies: tasks that must succeed before this one can run.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskName>,
}

/// Immutable DAG of task nodes keyed by name.
///
/// Built once before a run begins and never mutated during execution;
/// per-run state lives in the scheduler.
#[derive(Debug, Clone)]
pub struct PipelineGraph {
    nodes: BTreeMap<TaskName, TaskNode>,
    adjacency: HashMap<TaskName, Adjacency>,
}

impl PipelineGraph {
    /// Build a graph from task nodes and (from, to) edges, where `to`
    /// depends on `from`.
    ///
    /// Fails with [`PipelineError::DuplicateTask`] if two nodes share a
    /// name, [`PipelineError::UnknownTask`] if an edge references a missing
    /// node, and [`PipelineError::DagCycle`] if the edges contain a cycle
    /// (detected via topological sort).
    pub fn build(
        nodes: Vec<TaskNode>,
        edges: Vec<(TaskName, TaskName)>,
    ) -> Result<Self> {
        let mut node_map: BTreeMap<TaskName, TaskNode> = BTreeMap::new();
        for node in nodes {
            if node_map.contains_key(&node.name) {
                return Err(PipelineError::DuplicateTask(node.name));
            }
            node_map.insert(node.name.clone(), node);
        }

        let mut adjacency: HashMap<TaskName, Adjacency> = node_map
            .keys()
            .map(|name| (name.clone(), Adjacency::default()))
            .collect();

        for (from, to) in &edges {
            for endpoint in [from, to] {
                if !node_map.contains_key(endpoint) {
                    return Err(PipelineError::UnknownTask(endpoint.clone()));
                }
            }
            adjacency
                .get_mut(to)
                .expect("endpoint checked above")
                .deps
                .push(from.clone());
            adjacency
                .get_mut(from)
                .expect("endpoint checked above")
                .dependents
                .push(to.clone());
        }

        let graph = Self {
            nodes: node_map,
            adjacency,
        };
        graph.check_acyclic()?;
        Ok(graph)
    }

    /// Build a graph from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let nodes = cfg
            .task
            .iter()
            .map(|(name, tc)| Ok(TaskNode::new(name.clone(), tc.to_kind()?)))
            .collect::<Result<Vec<_>>>()?;

        let edges = cfg
            .task
            .iter()
            .flat_map(|(name, tc)| {
                tc.after
                    .iter()
                    .map(move |dep| (dep.clone(), name.clone()))
            })
            .collect();

        Self::build(nodes, edges)
    }

    fn check_acyclic(&self) -> Result<()> {
        // Edge direction: dep -> task, so a topological sort fails exactly
        // when the dependency relation contains a cycle.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for name in self.nodes.keys() {
            graph.add_node(name.as_str());
        }
        for (name, adj) in self.adjacency.iter() {
            for dep in adj.deps.iter() {
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(PipelineError::DagCycle(format!(
                "cycle involving task '{}'",
                cycle.node_id()
            ))),
        }
    }

    /// Return all task names.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, name: &str) -> Option<&TaskNode> {
        self.nodes.get(name)
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.adjacency
            .get(name)
            .map(|adj| adj.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.adjacency
            .get(name)
            .map(|adj| adj.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Tasks with no dependencies.
    pub fn roots(&self) -> Vec<TaskName> {
        self.nodes
            .keys()
            .filter(|name| self.dependencies_of(name).is_empty())
            .cloned()
            .collect()
    }

    /// Tasks with no dependents.
    pub fn terminals(&self) -> Vec<TaskName> {
        self.nodes
            .keys()
            .filter(|name| self.dependents_of(name).is_empty())
            .cloned()
            .collect()
    }

    /// Partition the tasks into ordered ready-batches.
    ///
    /// Batch 0 is every task with no dependencies; batch k is every task
    /// whose dependencies all live in batches 0..k. Tasks inside a batch
    /// are independent of each other, which is what permits fan-out and
    /// fan-in parallelism.
    ///
    /// Kahn layering over the in-degree map; batches come out sorted by
    /// name so dispatch order is deterministic for logs and tests.
    pub fn topological_batches(&self) -> Vec<Vec<TaskName>> {
        let mut in_degree: BTreeMap<&str, usize> = self
            .nodes
            .keys()
            .map(|name| (name.as_str(), self.dependencies_of(name).len()))
            .collect();

        let mut batches = Vec::new();
        let mut current: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(name, _)| *name)
            .collect();

        while !current.is_empty() {
            let mut next = BTreeSet::new();
            for name in &current {
                for dependent in self.dependents_of(name) {
                    let deg = in_degree
                        .get_mut(dependent.as_str())
                        .expect("dependent is a known node");
                    *deg -= 1;
                    if *deg == 0 {
                        next.insert(dependent.as_str());
                    }
                }
            }
            batches.push(current.iter().map(|s| s.to_string()).collect());
            current = next;
        }

        batches
    }
}

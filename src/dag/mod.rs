// src/dag/mod.rs

//! Pipeline DAG: task definitions, the immutable graph, and its builder.

pub mod builder;
pub mod graph;
pub mod task;

pub use builder::GraphBuilder;
pub use graph::PipelineGraph;
pub use task::{TaskKind, TaskName, TaskNode, TaskState};

// tests/property_graph.rs

//! Property tests over randomly generated acyclic graphs.
//!
//! Acyclicity is guaranteed by construction: task N may only depend on
//! tasks 0..N-1.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use proptest::prelude::*;

use loaddag::dag::{PipelineGraph, TaskName, TaskNode, TaskState};
use loaddag::exec::{RetryPolicy, Scheduler};
use loaddag::sink::MemorySink;

type DagSpec = (Vec<TaskNode>, Vec<(TaskName, TaskName)>);

fn arb_dag(max_tasks: usize) -> impl Strategy<Value = DagSpec> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        // A list of potential dependency indices per task; sanitized below so
        // task i only depends on tasks with a smaller index.
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(move |raw_deps| {
            let nodes: Vec<TaskNode> = (0..num_tasks)
                .map(|i| TaskNode::noop(format!("task_{i}")))
                .collect();

            let mut edges = Vec::new();
            for (i, potential_deps) in raw_deps.into_iter().enumerate() {
                let mut valid_deps = HashSet::new();
                for dep_idx in potential_deps {
                    if i > 0 {
                        valid_deps.insert(dep_idx % i);
                    }
                }
                for dep_idx in valid_deps {
                    edges.push((format!("task_{dep_idx}"), format!("task_{i}")));
                }
            }

            (nodes, edges)
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn batches_partition_nodes_and_respect_dependencies((nodes, edges) in arb_dag(10)) {
        let node_count = nodes.len();
        let graph = PipelineGraph::build(nodes, edges).unwrap();
        let batches = graph.topological_batches();

        // Partition: every node appears in exactly one batch.
        let mut index: HashMap<String, usize> = HashMap::new();
        for (i, batch) in batches.iter().enumerate() {
            for name in batch {
                let previous = index.insert(name.clone(), i);
                prop_assert!(previous.is_none(), "task {name} appears twice");
            }
        }
        prop_assert_eq!(index.len(), node_count);

        // Ordering: every dependency lives in a strictly earlier batch.
        for name in graph.tasks() {
            for dep in graph.dependencies_of(name) {
                prop_assert!(
                    index[dep] < index[name],
                    "dependency {} of {} not in an earlier batch", dep, name
                );
            }
        }
    }

    #[test]
    fn all_success_run_terminates_with_every_task_succeeded((nodes, edges) in arb_dag(10)) {
        let graph = PipelineGraph::build(nodes, edges).unwrap();
        let scheduler = Scheduler::new(graph, RetryPolicy::immediate(0));

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let result = rt
            .block_on(scheduler.run(Arc::new(MemorySink::new())))
            .unwrap();

        prop_assert!(result.succeeded());
        for report in result.reports.values() {
            prop_assert_eq!(report.state, TaskState::Succeeded);
            prop_assert_eq!(report.attempts, 1);
        }
    }
}

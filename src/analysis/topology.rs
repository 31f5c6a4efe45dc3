use crate::error::ComputeError;
use crate::store::{tokens, ContextMap, NodeId, NodeStore};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use std::collections::{HashSet, VecDeque};

/// Reference graph of a context map. Edges point from a referenced index to
/// the index whose context references it.
pub fn dependency_graph(map: &ContextMap) -> DiGraphMap<u32, ()> {
    let mut graph = DiGraphMap::new();
    for (id, context) in map.iter() {
        graph.add_node(id.0);
        for dep in tokens::references(context) {
            graph.add_edge(dep.0, id.0, ());
        }
    }
    graph
}

/// Dependencies-first order of a context map, or the index where a cycle was found.
pub fn acyclic_order(map: &ContextMap) -> Result<Vec<NodeId>, NodeId> {
    toposort(&dependency_graph(map), None)
        .map(|order| order.into_iter().map(NodeId).collect())
        .map_err(|cycle| NodeId(cycle.node_id()))
}

/// `acyclic_order` with the cycle reported as an evaluation error.
pub fn evaluation_order(map: &ContextMap) -> Result<Vec<NodeId>, ComputeError> {
    acyclic_order(map).map_err(|index| ComputeError::CycleDetected { index })
}

/// Every node reachable from `start` through its dependencies, `start` excluded
/// unless it depends on itself.
pub fn closure(store: &NodeStore, start: NodeId) -> HashSet<NodeId> {
    let mut reached = HashSet::new();
    let mut queue: VecDeque<NodeId> = store.get_parents(start).iter().copied().collect();

    while let Some(node) = queue.pop_front() {
        if reached.insert(node) {
            queue.extend(store.get_parents(node).iter().copied());
        }
    }
    reached
}

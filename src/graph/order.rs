use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use crate::foundation::error::{TexflowError, TexflowResult};
use crate::graph::model::{Edge, Graph, NodeId};

/// Kahn's algorithm over the full node set.
///
/// Ready nodes are taken smallest id first, so the order only depends on the node and edge sets.
pub fn topological_order(
    nodes: impl IntoIterator<Item = NodeId>,
    edges: &[Edge],
) -> TexflowResult<Vec<NodeId>> {
    let mut indegree: BTreeMap<NodeId, usize> = nodes.into_iter().map(|n| (n, 0)).collect();
    let mut downstream: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for e in edges {
        if !indegree.contains_key(&e.from.node) {
            return Err(TexflowError::graph(format!(
                "edge {} -> {} starts at an unknown node",
                e.from, e.to
            )));
        }
        let Some(d) = indegree.get_mut(&e.to.node) else {
            return Err(TexflowError::graph(format!(
                "edge {} -> {} ends at an unknown node",
                e.from, e.to
            )));
        };
        *d += 1;
        downstream.entry(e.from.node).or_default().push(e.to.node);
    }

    let mut ready: BinaryHeap<Reverse<NodeId>> = indegree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(n, _)| Reverse(*n))
        .collect();
    let mut order = Vec::with_capacity(indegree.len());
    while let Some(Reverse(n)) = ready.pop() {
        order.push(n);
        for next in downstream.get(&n).into_iter().flatten() {
            if let Some(d) = indegree.get_mut(next) {
                *d -= 1;
                if *d == 0 {
                    ready.push(Reverse(*next));
                }
            }
        }
    }

    if order.len() != indegree.len() {
        let stuck: Vec<String> = indegree
            .iter()
            .filter(|(n, _)| !order.contains(n))
            .map(|(n, _)| n.to_string())
            .collect();
        return Err(TexflowError::graph(format!(
            "cycle through nodes [{}]",
            stuck.join(", ")
        )));
    }
    Ok(order)
}

/// Upstream chain of `node` in ascending compute order, `node` itself last.
///
/// Walks input edges with an explicit stack. Continuously-updating nodes are always ready and
/// are neither included nor traversed through.
#[tracing::instrument(level = "trace", skip(graph))]
pub fn dependencies(graph: &Graph, node: NodeId) -> TexflowResult<Vec<NodeId>> {
    if graph.node(node).is_none() {
        return Err(TexflowError::graph(format!("unknown node {node}")));
    }
    let mut visited = BTreeSet::from([node]);
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        for e in graph.edges_into(n) {
            let up = e.from.node;
            if visited.contains(&up) {
                continue;
            }
            let continuous = graph.node(up).is_some_and(|u| u.is_continuous());
            if continuous {
                continue;
            }
            visited.insert(up);
            stack.push(up);
        }
    }

    let mut deps: Vec<NodeId> = visited.into_iter().collect();
    deps.sort_by_key(|id| graph.node(*id).map_or(0, |n| n.compute_order()));
    Ok(deps)
}

#[cfg(test)]
#[path = "../../tests/unit/graph/order.rs"]
mod tests;

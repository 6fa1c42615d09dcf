/// Graph construction and execution ordering
///
/// Builds a petgraph DiGraph from a workflow's nodes and edges and derives
/// a deterministic execution order with Kahn's algorithm. Ready nodes are
/// taken lowest-position-first in the original node list, so identical
/// graphs always produce identical orders.

use crate::runtime::error::GraphError;
use crate::workflow::types::{Edge, Node};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Borrowed view of a workflow as a petgraph DAG
///
/// Node indices equal each node's position in the original node list and
/// edge indices equal each edge's position in the original edge list.
#[derive(Debug)]
pub struct WorkflowGraph<'a> {
    graph: DiGraph<&'a Node, &'a Edge>,
    node_id_to_index: HashMap<&'a str, NodeIndex>,
}

impl<'a> WorkflowGraph<'a> {
    /// Build the graph, rejecting duplicate node ids and dangling edges
    pub fn build(nodes: &'a [Node], edges: &'a [Edge]) -> Result<Self, GraphError> {
        tracing::debug!("🏗️ Building workflow graph with {} nodes and {} edges", nodes.len(), edges.len());

        let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
        let mut node_id_to_index = HashMap::with_capacity(nodes.len());

        for node in nodes {
            let index = graph.add_node(node);
            if node_id_to_index.insert(node.id.as_str(), index).is_some() {
                return Err(GraphError::DuplicateNode { node_id: node.id.clone() });
            }
        }

        for edge in edges {
            let lookup = |id: &str| {
                node_id_to_index.get(id).copied().ok_or_else(|| GraphError::UnknownNode {
                    edge_id: edge.id.clone(),
                    node_id: id.to_string(),
                })
            };
            let from = lookup(&edge.source)?;
            let to = lookup(&edge.target)?;

            graph.add_edge(from, to, edge);
            tracing::debug!("  🔗 Added edge: '{}' → '{}'", edge.source, edge.target);
        }

        Ok(Self { graph, node_id_to_index })
    }

    /// Kahn's algorithm over the full edge multiset
    ///
    /// Parallel edges each contribute to in-degree. A short result means some
    /// nodes sit on or behind a cycle; those are reported, no partial order is.
    pub fn topological_order(&self) -> Result<Vec<NodeIndex>, GraphError> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|idx| self.graph.edges_directed(idx, Direction::Incoming).count())
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(position, _)| Reverse(position))
            .collect();

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(Reverse(position)) = ready.pop() {
            let index = NodeIndex::new(position);
            order.push(index);

            for edge in self.graph.edges_directed(index, Direction::Outgoing) {
                let target = edge.target().index();
                in_degree[target] -= 1;
                if in_degree[target] == 0 {
                    ready.push(Reverse(target));
                }
            }
        }

        if order.len() < in_degree.len() {
            let unresolved = self
                .graph
                .node_indices()
                .filter(|idx| in_degree[idx.index()] > 0)
                .map(|idx| self.graph[idx].id.clone())
                .collect();
            return Err(GraphError::Cycle { unresolved });
        }

        Ok(order)
    }

    pub fn node(&self, index: NodeIndex) -> &'a Node {
        self.graph[index]
    }

    pub fn index_of(&self, node_id: &str) -> Option<NodeIndex> {
        self.node_id_to_index.get(node_id).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Incoming edges in original edge-list order
    pub fn incoming(&self, index: NodeIndex) -> Vec<(EdgeIndex, &'a Edge)> {
        self.edges_sorted(index, Direction::Incoming)
    }

    /// Outgoing edges in original edge-list order
    pub fn outgoing(&self, index: NodeIndex) -> Vec<(EdgeIndex, &'a Edge)> {
        self.edges_sorted(index, Direction::Outgoing)
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn edges_sorted(&self, index: NodeIndex, direction: Direction) -> Vec<(EdgeIndex, &'a Edge)> {
        // petgraph walks adjacency lists newest-first
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(index, direction)
            .map(|edge| (edge.id(), *edge.weight()))
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges
    }
}

/// Derive the execution order of a node set as node ids
pub fn order(nodes: &[Node], edges: &[Edge]) -> Result<Vec<String>, GraphError> {
    let graph = WorkflowGraph::build(nodes, edges)?;
    let order = graph.topological_order()?;
    Ok(order.into_iter().map(|idx| graph.node(idx).id.clone()).collect())
}

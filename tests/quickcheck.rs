#[macro_use]
extern crate quickcheck;

use std::collections::{HashMap, HashSet};

use bitgraph::{Graph, Node, NodeId};

const MAX_NODES: usize = 48;

fn deletion_set(raw: Vec<u8>, n: usize) -> Vec<NodeId> {
    let mut ids: Vec<NodeId> = raw.into_iter().map(|i| i as usize % n).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Build a graph of `n` nodes whose weights witness their original ids.
fn witness_graph(n: usize) -> Graph<usize> {
    let mut g = Graph::new();
    let _ = g.create_nodes(n);
    for id in 0..n {
        *g.node_weight_mut(id) = id;
    }
    g
}

quickcheck! {
    fn deletion_restores_dense_ids_and_keeps_surviving_edges(
        n: u8,
        edges: Vec<(u8, u8)>,
        dels: Vec<u8>
    ) -> bool {
        let n = n as usize % MAX_NODES + 1;
        let mut g = witness_graph(n);
        let edges: Vec<(NodeId, NodeId, Option<usize>)> = edges
            .into_iter()
            .map(|(s, d)| (s as usize % n, d as usize % n, None))
            .collect();
        g.connect_nodes(&edges);

        let dels = deletion_set(dels, n);
        let survivors: HashSet<usize> = (0..n).filter(|id| !dels.contains(id)).collect();
        let expected_edges: HashSet<(usize, usize)> = edges
            .iter()
            .filter(|(s, d, _)| survivors.contains(s) && survivors.contains(d))
            .map(|&(s, d, _)| (s, d))
            .collect();

        g.delete_nodes(&dels);

        let post = n - dels.len();
        if g.node_count() != post {
            return false;
        }
        if g.nodes().map(Node::id).ne(0..post) {
            return false;
        }
        // Weights survive relocation and map old identities to new ids.
        let relocated: HashMap<usize, usize> =
            g.nodes().map(|node| (node.weight, node.id())).collect();
        if relocated.len() != post || !relocated.keys().all(|w| survivors.contains(w)) {
            return false;
        }

        let a = g.adjacency_matrix();
        a.dim() == post
            && a.nvals() == expected_edges.len()
            && expected_edges
                .iter()
                .all(|&(s, d)| a.contains(relocated[&d], relocated[&s]))
    }

    fn typed_entries_imply_adjacency(n: u8, edges: Vec<(u8, u8, u8)>, dels: Vec<u8>) -> bool {
        let n = n as usize % MAX_NODES + 1;
        let mut g = witness_graph(n);
        let r0 = g.add_relation();
        let r1 = g.add_relation();
        let edges: Vec<(NodeId, NodeId, Option<usize>)> = edges
            .into_iter()
            .map(|(s, d, r)| {
                let relation = match r % 3 {
                    0 => Some(r0),
                    1 => Some(r1),
                    _ => None,
                };
                (s as usize % n, d as usize % n, relation)
            })
            .collect();
        g.connect_nodes(&edges);

        let dels = deletion_set(dels, n);
        let survivors: HashSet<usize> = (0..n).filter(|id| !dels.contains(id)).collect();
        g.delete_nodes(&dels);

        let relocated: HashMap<usize, usize> =
            g.nodes().map(|node| (node.weight, node.id())).collect();
        let a = g.adjacency_matrix();
        for relation in [r0, r1] {
            let m = g.relation_matrix(relation);
            if m.dim() != g.node_count() {
                return false;
            }
            // Every typed entry must be backed by an adjacency entry.
            for row in 0..m.dim() {
                if !m.extract_row(row).ones().all(|col| a.contains(row, col)) {
                    return false;
                }
            }
            // Every surviving typed edge must still be recorded.
            let missing = edges.iter().any(|&(s, d, r)| {
                r == Some(relation)
                    && survivors.contains(&s)
                    && survivors.contains(&d)
                    && !m.contains(relocated[&d], relocated[&s])
            });
            if missing {
                return false;
            }
        }
        true
    }

    fn labels_stay_diagonal_and_follow_relocation(labels: Vec<u8>, dels: Vec<u8>) -> bool {
        if labels.is_empty() {
            return true;
        }
        let n = labels.len().min(MAX_NODES);
        let mut g = Graph::<usize>::new();
        let l0 = g.add_label();
        let l1 = g.add_label();
        let labeling: Vec<Option<usize>> = labels[..n]
            .iter()
            .map(|&l| match l % 3 {
                0 => Some(l0),
                1 => Some(l1),
                _ => None,
            })
            .collect();
        let _ = g.create_nodes_with_labels(&labeling);
        for id in 0..n {
            *g.node_weight_mut(id) = id;
        }

        let dels = deletion_set(dels, n);
        g.delete_nodes(&dels);

        for label in [l0, l1] {
            let m = g.label_matrix(label);
            let expected = g
                .nodes()
                .filter(|node| labeling[node.weight] == Some(label))
                .count();
            if m.nvals() != expected {
                return false;
            }
            for node in g.nodes() {
                let id = node.id();
                if m.contains(id, id) != (labeling[node.weight] == Some(label)) {
                    return false;
                }
            }
        }
        true
    }

    fn accessors_track_node_count(first: u8, dels: Vec<u8>, second: u8) -> bool {
        let n = first as usize % MAX_NODES + 1;
        let mut g = Graph::<()>::new();
        let r = g.add_relation();
        let l = g.add_label();
        let _ = g.create_nodes(n);

        g.delete_nodes(&deletion_set(dels, n));
        let _ = g.create_nodes(second as usize % MAX_NODES);

        let count = g.node_count();
        g.adjacency_matrix().dim() == count
            && g.relation_matrix(r).dim() == count
            && g.label_matrix(l).dim() == count
    }
}

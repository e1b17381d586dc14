use super::{BondGraph, FragmentEnumerator};
use std::collections::{BTreeMap, BTreeSet};

/// Enumerates every connected bond subgraph with 1..=N bonds.
///
/// Subgraphs are grown one incident bond at a time from single-bond seeds
/// and deduplicated as sorted bond lists, so each subgraph is reported
/// exactly once regardless of the order in which it was reached.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConnectedSubgraphs;

impl FragmentEnumerator for ConnectedSubgraphs {
    fn bond_paths(&self, graph: &BondGraph, max_len: usize) -> BTreeMap<usize, Vec<Vec<usize>>> {
        let mut by_length = BTreeMap::new();
        let mut frontier: BTreeSet<Vec<usize>> =
            (0..graph.bonds().len()).map(|b| vec![b]).collect();

        for len in 1..=max_len {
            if frontier.is_empty() {
                break;
            }
            if len < max_len {
                let next = grow(graph, &frontier);
                by_length.insert(len, frontier.into_iter().collect());
                frontier = next;
            } else {
                by_length.insert(len, frontier.into_iter().collect());
                break;
            }
        }
        by_length
    }
}

fn grow(graph: &BondGraph, frontier: &BTreeSet<Vec<usize>>) -> BTreeSet<Vec<usize>> {
    let mut next = BTreeSet::new();
    for subgraph in frontier {
        let atoms: BTreeSet<usize> = subgraph
            .iter()
            .filter_map(|&b| graph.bond(b))
            .flat_map(|(a1, a2)| [a1, a2])
            .collect();
        for atom in atoms {
            for &bond in graph.incident_bonds(atom) {
                if subgraph.contains(&bond) {
                    continue;
                }
                let mut grown = subgraph.clone();
                grown.push(bond);
                grown.sort_unstable();
                next.insert(grown);
            }
        }
    }
    next
}

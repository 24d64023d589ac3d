//! Index-based view of a [`Topology`] for graph algorithms.
//!
//! Vertices are numbered in lexical id order and every adjacency list is
//! sorted by (neighbour, link), so every traversal below is deterministic.

use std::collections::{HashMap, VecDeque};

use super::{LinkId, Topology};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub to: usize,
    pub link: LinkId,
}

/// Predecessor of a vertex in a BFS tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hop {
    pub via: usize,
    pub link: LinkId,
}

#[derive(Debug, Clone)]
pub struct BfsTree {
    pub dist: Vec<Option<usize>>,
    pub parent: Vec<Option<Hop>>,
}

impl BfsTree {
    /// Links crossed from `v` back to the nearest source.
    pub fn links_to_source(&self, mut v: usize) -> Vec<LinkId> {
        let mut links = Vec::new();
        while let Some(hop) = self.parent[v] {
            links.push(hop.link);
            v = hop.via;
        }
        links
    }
}

#[derive(Debug, Clone)]
pub struct TopologyGraph {
    ids: Vec<String>,
    index: HashMap<String, usize>,
    adjacency: Vec<Vec<Edge>>,
}

impl TopologyGraph {
    pub fn from_topology(topology: &Topology) -> Self {
        let mut ids: Vec<String> = topology.devices.iter().map(|d| d.id.clone()).collect();
        ids.sort();
        ids.dedup();
        let index: HashMap<String, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let mut adjacency = vec![Vec::new(); ids.len()];
        for link in &topology.links {
            let (Some(&a), Some(&b)) = (index.get(&link.a.device), index.get(&link.b.device))
            else {
                continue;
            };
            adjacency[a].push(Edge { to: b, link: link.id });
            adjacency[b].push(Edge { to: a, link: link.id });
        }
        for edges in &mut adjacency {
            edges.sort_by_key(|e| (e.to, e.link));
        }

        Self {
            ids,
            index,
            adjacency,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn id(&self, v: usize) -> &str {
        &self.ids[v]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn edges(&self, v: usize) -> &[Edge] {
        &self.adjacency[v]
    }

    pub fn degree(&self, v: usize) -> usize {
        self.adjacency[v].len()
    }

    /// Multi-source breadth-first search.
    pub fn bfs(&self, sources: &[usize]) -> BfsTree {
        let n = self.len();
        let mut dist = vec![None; n];
        let mut parent = vec![None; n];
        let mut queue = VecDeque::new();
        for &s in sources {
            if dist[s].is_none() {
                dist[s] = Some(0);
                queue.push_back(s);
            }
        }
        while let Some(v) = queue.pop_front() {
            let next = dist[v].map_or(0, |d| d + 1);
            for edge in &self.adjacency[v] {
                if dist[edge.to].is_none() {
                    dist[edge.to] = Some(next);
                    parent[edge.to] = Some(Hop {
                        via: v,
                        link: edge.link,
                    });
                    queue.push_back(edge.to);
                }
            }
        }
        BfsTree { dist, parent }
    }

    pub fn shortest_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        let (from, to) = (self.index_of(from)?, self.index_of(to)?);
        let tree = self.bfs(&[from]);
        tree.dist[to]?;
        let mut path = vec![self.ids[to].clone()];
        let mut v = to;
        while let Some(hop) = tree.parent[v] {
            path.push(self.ids[hop.via].clone());
            v = hop.via;
        }
        path.reverse();
        Some(path)
    }

    pub fn diameter(&self) -> Option<usize> {
        let mut longest = 0;
        for v in 0..self.len() {
            let tree = self.bfs(&[v]);
            for d in tree.dist {
                longest = longest.max(d?);
            }
        }
        Some(longest)
    }

    /// Cut vertices via iterative DFS low-link. The parent edge is skipped by
    /// link id so parallel links between two devices count as redundancy.
    pub fn articulation_points(&self) -> Vec<usize> {
        const UNSEEN: usize = usize::MAX;
        let n = self.len();
        let mut disc = vec![UNSEEN; n];
        let mut low = vec![0; n];
        let mut is_cut = vec![false; n];
        let mut timer = 0;

        for root in 0..n {
            if disc[root] != UNSEEN {
                continue;
            }
            disc[root] = timer;
            low[root] = timer;
            timer += 1;
            let mut root_children = 0;
            // (vertex, link used to reach it, next edge to explore)
            let mut stack: Vec<(usize, Option<LinkId>, usize)> = vec![(root, None, 0)];

            while let Some(top) = stack.len().checked_sub(1) {
                let (v, via, next) = stack[top];
                if next < self.adjacency[v].len() {
                    stack[top].2 += 1;
                    let edge = self.adjacency[v][next];
                    if Some(edge.link) == via {
                        continue;
                    }
                    if disc[edge.to] == UNSEEN {
                        disc[edge.to] = timer;
                        low[edge.to] = timer;
                        timer += 1;
                        if v == root {
                            root_children += 1;
                        }
                        stack.push((edge.to, Some(edge.link), 0));
                    } else {
                        low[v] = low[v].min(disc[edge.to]);
                    }
                } else {
                    stack.pop();
                    if let Some(&(parent, _, _)) = stack.last() {
                        low[parent] = low[parent].min(low[v]);
                        if parent != root && low[v] >= disc[parent] {
                            is_cut[parent] = true;
                        }
                    }
                }
            }
            if root_children > 1 {
                is_cut[root] = true;
            }
        }

        (0..n).filter(|&v| is_cut[v]).collect()
    }
}

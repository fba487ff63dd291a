use std::collections::VecDeque;

use rand::Rng;

use crate::graph::csr::CsrGraph;
use crate::rng::SplitRng;

/// Hard cap on the number of distinct vertices a single walk may visit.
/// A walk that reaches it indicates a graph whose weights do not behave
/// like probabilities; treated as a data-integrity failure.
pub const MAX_SET_SIZE: usize = 256;

/// One reverse-reachable set: distinct vertex ids, sorted ascending.
pub type RrrSet = Vec<u32>;
pub type RrrSets = Vec<RrrSet>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffusionModel {
    LinearThreshold,
    IndependentCascade,
}

impl DiffusionModel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lt" | "linear-threshold" | "linearthreshold" => Some(DiffusionModel::LinearThreshold),
            "ic" | "independent-cascade" | "independentcascade" => {
                Some(DiffusionModel::IndependentCascade)
            }
            _ => None,
        }
    }
}

/// Run one walk under `model`, leaving the sorted set in `set`.
pub fn add_rrr_set(g: &CsrGraph, root: u32, rng: &mut SplitRng, set: &mut RrrSet, model: DiffusionModel) {
    match model {
        DiffusionModel::LinearThreshold => lt_walk(g, root, rng, set),
        DiffusionModel::IndependentCascade => ic_walk(g, root, rng, set),
    }
}

/// Reverse linear-threshold walk from `root`.
///
/// At each step a fresh threshold in (0, 1] is drawn and the out-edges of
/// the current vertex are scanned in CSR order, subtracting weights; the
/// first edge that drives the threshold to <= 0 names the candidate. The
/// walk stops when no edge fires or the candidate was already visited
/// (self-loops fall under the latter).
pub fn lt_walk(g: &CsrGraph, root: u32, rng: &mut SplitRng, set: &mut RrrSet) {
    set.clear();
    set.push(root);

    let mut cur = root;
    loop {
        let mut threshold: f32 = 1.0 - rng.gen::<f32>();

        let mut next = None;
        for ei in g.edge_range(cur) {
            threshold -= g.w[ei];
            if threshold <= 0.0 {
                next = Some(g.dst[ei]);
                break;
            }
        }

        match next {
            Some(v) if !set.contains(&v) => {
                if set.len() >= MAX_SET_SIZE {
                    panic!("LT walk from root {root} exceeded MAX_SET_SIZE ({MAX_SET_SIZE})");
                }
                set.push(v);
                cur = v;
            }
            _ => break,
        }
    }

    set.sort_unstable();
}

/// Reverse independent-cascade walk from `root`.
///
/// Frontier BFS where each out-edge is kept with its own probability. The
/// set is every vertex reached, root included.
pub fn ic_walk(g: &CsrGraph, root: u32, rng: &mut SplitRng, set: &mut RrrSet) {
    set.clear();
    set.push(root);

    let mut q = VecDeque::new();
    q.push_back(root);

    while let Some(v) = q.pop_front() {
        for ei in g.edge_range(v) {
            let to = g.dst[ei];
            let keep = rng.gen::<f32>() <= g.w[ei];
            if keep && !set.contains(&to) {
                if set.len() >= MAX_SET_SIZE {
                    panic!("IC walk from root {root} exceeded MAX_SET_SIZE ({MAX_SET_SIZE})");
                }
                set.push(to);
                q.push_back(to);
            }
        }
    }

    set.sort_unstable();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> SplitRng {
        SplitRng::new(42).split(1, 0)
    }

    #[test]
    fn parse_model_tags() {
        assert_eq!(DiffusionModel::parse("lt"), Some(DiffusionModel::LinearThreshold));
        assert_eq!(DiffusionModel::parse("IC"), Some(DiffusionModel::IndependentCascade));
        assert_eq!(DiffusionModel::parse("bogus"), None);
    }

    #[test]
    fn lt_walk_on_chain_is_suffix_interval() {
        // 0 -> 1 -> 2 -> 3 -> 4, weight 1.0: every threshold fires the only
        // edge, so the walk from r visits exactly {r, ..., 4}.
        let g = CsrGraph::from_edges(
            5,
            &[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (3, 4, 1.0)],
        );
        let mut r = rng();
        let mut set = Vec::new();
        for root in 0..5u32 {
            lt_walk(&g, root, &mut r, &mut set);
            let expect: Vec<u32> = (root..5).collect();
            assert_eq!(set, expect);
        }
    }

    #[test]
    fn lt_walk_sink_vertex_is_singleton() {
        let g = CsrGraph::from_edges(3, &[(0, 1, 1.0)]);
        let mut r = rng();
        let mut set = Vec::new();
        lt_walk(&g, 2, &mut r, &mut set);
        assert_eq!(set, vec![2]);
    }

    #[test]
    fn lt_walk_self_loop_terminates() {
        let g = CsrGraph::from_edges(2, &[(0, 0, 1.0)]);
        let mut r = rng();
        let mut set = Vec::new();
        lt_walk(&g, 0, &mut r, &mut set);
        assert_eq!(set, vec![0]);
    }

    #[test]
    fn lt_walk_zero_weights_never_fire() {
        let g = CsrGraph::from_edges(3, &[(0, 1, 0.0), (0, 2, 0.0)]);
        let mut r = rng();
        let mut set = Vec::new();
        lt_walk(&g, 0, &mut r, &mut set);
        assert_eq!(set, vec![0]);
    }

    #[test]
    fn ic_walk_star_reaches_all_from_center() {
        // 0 -> {1,2,3} with weight 1.0 in the reverse graph.
        let g = CsrGraph::from_edges(4, &[(0, 1, 1.0), (0, 2, 1.0), (0, 3, 1.0)]);
        let mut r = rng();
        let mut set = Vec::new();
        ic_walk(&g, 0, &mut r, &mut set);
        assert_eq!(set, vec![0, 1, 2, 3]);

        ic_walk(&g, 2, &mut r, &mut set);
        assert_eq!(set, vec![2]);
    }

    #[test]
    fn ic_walk_includes_root_always() {
        let g = CsrGraph::from_edges(4, &[(0, 1, 0.3), (1, 2, 0.3), (2, 3, 0.3)]);
        let mut r = rng();
        let mut set = Vec::new();
        for root in 0..4u32 {
            for _ in 0..32 {
                ic_walk(&g, root, &mut r, &mut set);
                assert!(set.binary_search(&root).is_ok());
            }
        }
    }

    #[test]
    fn walks_are_sorted_and_distinct() {
        // Dense little random graph; exercise both models.
        let mut edges = Vec::new();
        for u in 0..8u32 {
            for v in 0..8u32 {
                if u != v {
                    edges.push((u, v, 0.4f32));
                }
            }
        }
        let g = CsrGraph::from_edges(8, &edges);
        let mut r = rng();
        let mut set = Vec::new();
        for i in 0..200u32 {
            let root = i % 8;
            add_rrr_set(&g, root, &mut r, &mut set, DiffusionModel::IndependentCascade);
            assert!(set.windows(2).all(|p| p[0] < p[1]));
            add_rrr_set(&g, root, &mut r, &mut set, DiffusionModel::LinearThreshold);
            assert!(set.windows(2).all(|p| p[0] < p[1]));
        }
    }

    #[test]
    #[should_panic(expected = "MAX_SET_SIZE")]
    fn lt_walk_aborts_past_max_set_size() {
        // A 300-cycle with weight 1.0 walks forever until the cap trips.
        let n = 300u32;
        let edges: Vec<(u32, u32, f32)> =
            (0..n).map(|u| (u, (u + 1) % n, 1.0f32)).collect();
        let g = CsrGraph::from_edges(n as usize, &edges);
        let mut r = rng();
        let mut set = Vec::new();
        lt_walk(&g, 0, &mut r, &mut set);
    }
}

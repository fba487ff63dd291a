use std::ops::Range;

/// Immutable weighted directed graph in CSR form.
///
/// Weights are per-edge probabilities in [0, 1]. For reverse-reachability
/// sampling the caller supplies the transpose of the influence graph, so
/// "out-neighbors" here are the in-neighbors of the original.
#[derive(Debug, Clone)]
pub struct CsrGraph {
    pub offsets: Vec<u32>, // len = n+1
    pub dst: Vec<u32>,     // len = m
    pub w: Vec<f32>,       // len = m
}

impl CsrGraph {
    pub fn n(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn m(&self) -> usize {
        self.dst.len()
    }

    /// Out-of-range vertex id used as "no vertex" in packed device buffers.
    pub fn sentinel(&self) -> u32 {
        self.n() as u32
    }

    pub fn neighbors(&self, u: u32) -> &[u32] {
        let r = self.edge_range(u);
        &self.dst[r]
    }

    pub fn edge_range(&self, u: u32) -> Range<usize> {
        let u = u as usize;
        self.offsets[u] as usize..self.offsets[u + 1] as usize
    }

    /// Build a CSR graph from an explicit edge list. Two-pass: count
    /// degrees, prefix-sum into offsets, then fill dst/w with a per-vertex
    /// cursor. Edge order within a vertex follows input order.
    pub fn from_edges(n: usize, edges: &[(u32, u32, f32)]) -> Self {
        let mut deg = vec![0u32; n];
        for &(u, _, _) in edges {
            deg[u as usize] += 1;
        }

        let mut offsets = vec![0u32; n + 1];
        let mut sum: u32 = 0;
        for i in 0..n {
            offsets[i] = sum;
            sum += deg[i];
        }
        offsets[n] = sum;

        let mut cursor: Vec<u32> = offsets[..n].to_vec();
        let mut dst = vec![0u32; edges.len()];
        let mut w = vec![0.0f32; edges.len()];

        for &(u, v, p) in edges {
            let at = cursor[u as usize] as usize;
            dst[at] = v;
            w[at] = p;
            cursor[u as usize] += 1;
        }

        CsrGraph { offsets, dst, w }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_edges_builds_csr() {
        let g = CsrGraph::from_edges(
            3,
            &[(0, 1, 0.5), (0, 2, 0.25), (2, 0, 1.0)],
        );
        assert_eq!(g.n(), 3);
        assert_eq!(g.m(), 3);
        assert_eq!(g.neighbors(0), &[1, 2]);
        assert_eq!(g.neighbors(1), &[] as &[u32]);
        assert_eq!(g.neighbors(2), &[0]);
        assert_eq!(&g.w[g.edge_range(0)], &[0.5, 0.25]);
        assert_eq!(g.sentinel(), 3);
    }
}

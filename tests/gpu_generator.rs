// Device-path tests. They need a CUDA device and are therefore ignored by
// default; run with:
//   cargo test --features cuda -- --ignored

#![cfg(feature = "cuda")]

use std::collections::BTreeSet;

use rrr_stream::stream::mapping::SlotKind;
use rrr_stream::{parse_gpu_mapping, CsrGraph, DiffusionModel, SplitRng, StreamingRrrGenerator};

fn mesh_graph(n: u32) -> CsrGraph {
    let mut edges = Vec::new();
    for u in 0..n {
        edges.push((u, (u * 7 + 3) % n, 0.3f32));
        edges.push((u, (u * 13 + 5) % n, 0.5f32));
        edges.push((u, (u + 1) % n, 0.2f32));
    }
    CsrGraph::from_edges(n as usize, &edges)
}

#[test]
#[ignore = "requires a CUDA device"]
fn mixed_pool_fills_every_slot() {
    let g = mesh_graph(1000);
    let mut gen = StreamingRrrGenerator::new(
        &g,
        SplitRng::new(42),
        2,
        2,
        &BTreeSet::new(),
        DiffusionModel::LinearThreshold,
    )
    .unwrap();

    let theta = 10_000;
    let sets = gen.generate(theta);
    assert_eq!(sets.len(), theta);

    let n = g.n() as u32;
    for s in &sets {
        assert!(!s.is_empty());
        assert!(s.windows(2).all(|p| p[0] < p[1]));
        assert!(s.iter().all(|&v| v < n));
    }
}

#[test]
#[ignore = "requires a CUDA device"]
fn explicit_mapping_places_gpu_slots() {
    let g = mesh_graph(100);
    let mapping = parse_gpu_mapping("0,3", 4, 2).unwrap();
    let gen = StreamingRrrGenerator::new(
        &g,
        SplitRng::new(1),
        2,
        2,
        &mapping,
        DiffusionModel::LinearThreshold,
    )
    .unwrap();

    assert_eq!(
        gen.slot_kinds(),
        vec![SlotKind::Gpu, SlotKind::Cpu, SlotKind::Cpu, SlotKind::Gpu]
    );
}

#[test]
#[ignore = "requires a CUDA device"]
fn long_path_forces_host_fallback() {
    // A 32-deep path with weight 1.0 makes every walk outgrow the 8-word
    // device slot (except walks rooted near the end), so exceedances must
    // show up and every slot must still be completed by the host redo.
    let n = 32u32;
    let edges: Vec<(u32, u32, f32)> = (0..n - 1).map(|u| (u, u + 1, 1.0f32)).collect();
    let g = CsrGraph::from_edges(n as usize, &edges);

    let mut gen = StreamingRrrGenerator::new(
        &g,
        SplitRng::new(7),
        0,
        1,
        &BTreeSet::new(),
        DiffusionModel::LinearThreshold,
    )
    .unwrap();

    let theta = 40_000;
    let sets = gen.generate(theta);
    assert_eq!(sets.len(), theta);
    assert!(gen.num_exceedings() > 0);

    for s in &sets {
        // every walk is a suffix interval of the path, device- or host-made
        assert_eq!(*s.last().unwrap(), n - 1);
        let expect: Vec<u32> = (s[0]..n).collect();
        assert_eq!(*s, expect);
    }
}

#[test]
#[ignore = "requires a CUDA device"]
fn ic_device_sets_include_roots() {
    let g = mesh_graph(500);
    let mut gen = StreamingRrrGenerator::new(
        &g,
        SplitRng::new(3),
        0,
        1,
        &BTreeSet::new(),
        DiffusionModel::IndependentCascade,
    )
    .unwrap();

    let sets = gen.generate(256);
    assert_eq!(sets.len(), 256);
    for s in &sets {
        assert!(!s.is_empty());
        assert!(s.windows(2).all(|p| p[0] < p[1]));
    }
}

#[test]
#[ignore = "requires a CUDA device"]
fn device_and_host_lt_sizes_agree() {
    // No walk on this graph can reach 8 vertices, so the device never
    // overflows and the two paths sample the same distribution.
    let g = CsrGraph::from_edges(
        6,
        &[(0, 1, 0.5), (1, 2, 0.5), (2, 3, 0.5), (3, 4, 0.5), (4, 5, 0.5)],
    );
    let empty = BTreeSet::new();
    let theta = 50_000;

    let mut cpu_gen = StreamingRrrGenerator::new(
        &g,
        SplitRng::new(11),
        1,
        0,
        &empty,
        DiffusionModel::LinearThreshold,
    )
    .unwrap();
    let cpu_sets = cpu_gen.generate(theta);

    let mut gpu_gen = StreamingRrrGenerator::new(
        &g,
        SplitRng::new(11),
        0,
        1,
        &empty,
        DiffusionModel::LinearThreshold,
    )
    .unwrap();
    let gpu_sets = gpu_gen.generate(theta);
    assert_eq!(gpu_gen.num_exceedings(), 0);

    let hist = |sets: &[Vec<u32>]| {
        let mut h = [0usize; 7];
        for s in sets {
            h[s.len().min(6)] += 1;
        }
        h
    };
    let hc = hist(&cpu_sets);
    let hg = hist(&gpu_sets);

    // crude chi-square check at ~5 dof; 30 is far beyond the 1% quantile
    let mut chi2 = 0.0f64;
    for b in 0..7 {
        if hc[b] >= 5 {
            let e = hc[b] as f64;
            let o = hg[b] as f64;
            chi2 += (o - e) * (o - e) / e;
        }
    }
    assert!(chi2 < 30.0, "size distributions diverge: chi2={chi2}");
}

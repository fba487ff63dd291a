// Compare CPU-only and GPU-only LT generation on the same graph: sizes of
// the produced sets should follow the same distribution when the overflow
// rate is zero.

use std::path::PathBuf;

use rrr_stream::graph::io_bin::load_csr_from_dir;
use rrr_stream::graph::stats::validate_csr;
use rrr_stream::{DiffusionModel, SplitRng, StreamingRrrGenerator};

use std::collections::BTreeSet;

fn usage_and_exit() -> ! {
    eprintln!(
        r#"Usage:
  cargo run --release --features cuda --bin compare_lt -- <csr_dir> [theta] [seed]
"#
    );
    std::process::exit(2);
}

fn size_histogram(sets: &[Vec<u32>], buckets: usize) -> Vec<usize> {
    let mut h = vec![0usize; buckets];
    for s in sets {
        let b = s.len().min(buckets - 1);
        h[b] += 1;
    }
    h
}

fn main() {
    let mut args = std::env::args().skip(1);

    let csr_dir = args.next().map(PathBuf::from).unwrap_or_else(|| usage_and_exit());
    let theta: usize = args.next().as_deref().unwrap_or("100000").parse().unwrap_or_else(|_| usage_and_exit());
    let seed: u64 = args.next().as_deref().unwrap_or("0").parse().unwrap_or_else(|_| usage_and_exit());

    let g = load_csr_from_dir(&csr_dir).unwrap_or_else(|e| {
        eprintln!("Load CSR failed: {e}");
        std::process::exit(1);
    });
    validate_csr(&g).unwrap_or_else(|e| {
        eprintln!("CSR validation failed: {e}");
        std::process::exit(1);
    });

    let empty = BTreeSet::new();
    let model = DiffusionModel::LinearThreshold;

    let mut cpu_gen = StreamingRrrGenerator::new(&g, SplitRng::new(seed), 1, 0, &empty, model)
        .unwrap_or_else(|e| {
            eprintln!("CPU generator failed: {e}");
            std::process::exit(1);
        });
    let cpu_sets = cpu_gen.generate(theta);

    let mut gpu_gen = StreamingRrrGenerator::new(&g, SplitRng::new(seed), 0, 1, &empty, model)
        .unwrap_or_else(|e| {
            eprintln!("GPU generator failed: {e}");
            std::process::exit(1);
        });
    let gpu_sets = gpu_gen.generate(theta);

    println!(
        "[CMP] n-sets: cpu={} gpu={} exceedings={}",
        cpu_sets.len(),
        gpu_sets.len(),
        gpu_gen.num_exceedings()
    );

    const BUCKETS: usize = 9;
    let hc = size_histogram(&cpu_sets, BUCKETS);
    let hg = size_histogram(&gpu_sets, BUCKETS);

    // Pearson chi-square of GPU counts against CPU-derived expectations.
    let mut chi2 = 0.0f64;
    let mut dof = 0usize;
    for b in 0..BUCKETS {
        let expect = hc[b] as f64;
        let got = hg[b] as f64;
        println!("[CMP] size={}{} cpu={} gpu={}", b, if b == BUCKETS - 1 { "+" } else { "" }, hc[b], hg[b]);
        if expect >= 5.0 {
            chi2 += (got - expect) * (got - expect) / expect;
            dof += 1;
        }
    }

    println!("[CMP] chi2={:.3} over {} buckets", chi2, dof);
    if gpu_gen.num_exceedings() > 0 {
        println!("[CMP] overflow fallbacks present; distributions may differ by design");
    }
}

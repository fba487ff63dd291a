use std::path::PathBuf;
use std::time::Instant;

use rrr_stream::graph::io_bin::load_csr_from_dir;
use rrr_stream::graph::stats::{degree_summary, validate_csr};
use rrr_stream::{parse_gpu_mapping, DiffusionModel, SplitRng, StreamingRrrGenerator};

fn usage_and_exit() -> ! {
    eprintln!(
        r#"Usage:
  cargo run --release --bin rrr_gen -- <csr_dir> <lt|ic> <theta> [num_cpu] [num_gpu] [gpu_mapping] [seed]

Notes:
  - <csr_dir> must contain csr_offsets_u32.bin, csr_dst_u32.bin, csr_weights_f32.bin
    (the transpose of the influence graph, weights in [0,1]).
  - gpu_mapping is a comma-separated list of GPU worker slots, "-" for default.

Examples:
  cargo run --release --bin rrr_gen -- /data/csr/web-Google lt 100000 4 0
  cargo run --release --features cuda --bin rrr_gen -- /data/csr/web-Google lt 100000 2 2 0,3 42
"#
    );
    std::process::exit(2);
}

fn main() {
    let mut args = std::env::args().skip(1);

    let csr_dir = args.next().map(PathBuf::from).unwrap_or_else(|| usage_and_exit());
    let model = args
        .next()
        .as_deref()
        .and_then(DiffusionModel::parse)
        .unwrap_or_else(|| usage_and_exit());
    let theta: usize = args
        .next()
        .as_deref()
        .unwrap_or_else(|| usage_and_exit())
        .parse()
        .unwrap_or_else(|_| usage_and_exit());

    let num_cpu: usize = args.next().as_deref().unwrap_or("1").parse().unwrap_or_else(|_| usage_and_exit());
    let num_gpu: usize = args.next().as_deref().unwrap_or("0").parse().unwrap_or_else(|_| usage_and_exit());
    let mapping_str = args.next().unwrap_or_else(|| "-".to_string());
    let seed: u64 = args.next().as_deref().unwrap_or("0").parse().unwrap_or_else(|_| usage_and_exit());

    let mapping_str = if mapping_str == "-" { String::new() } else { mapping_str };

    let g = load_csr_from_dir(&csr_dir).unwrap_or_else(|e| {
        eprintln!("Load CSR failed: {e}");
        std::process::exit(1);
    });
    validate_csr(&g).unwrap_or_else(|e| {
        eprintln!("CSR validation failed: {e}");
        std::process::exit(1);
    });

    let (min_d, max_d, avg_d) = degree_summary(&g);
    println!("[CFG] n={} m={} deg(min/max/avg)={}/{}/{:.2}", g.n(), g.m(), min_d, max_d, avg_d);
    println!("[CFG] model={model:?} theta={theta} num_cpu={num_cpu} num_gpu={num_gpu} seed={seed}");

    let mapping = parse_gpu_mapping(&mapping_str, num_cpu + num_gpu, num_gpu).unwrap_or_else(|e| {
        eprintln!("Invalid GPU mapping: {e}");
        std::process::exit(1);
    });

    let mut gen = StreamingRrrGenerator::new(&g, SplitRng::new(seed), num_cpu, num_gpu, &mapping, model)
        .unwrap_or_else(|e| {
            eprintln!("Generator construction failed: {e}");
            std::process::exit(1);
        });

    let t0 = Instant::now();
    let sets = gen.generate(theta);
    let ms = t0.elapsed().as_secs_f64() * 1000.0;

    let total_verts: usize = sets.iter().map(|s| s.len()).sum();
    let avg_size = if sets.is_empty() { 0.0 } else { total_verts as f64 / sets.len() as f64 };

    println!(
        "[DONE] n-sets={} avg-size={:.2} exceedings={} time={:.3} ms throughput={:.0} sets/s",
        sets.len(),
        avg_size,
        gen.num_exceedings(),
        ms,
        sets.len() as f64 * 1000.0 / ms.max(1e-3)
    );

    gen.log_profile();
}

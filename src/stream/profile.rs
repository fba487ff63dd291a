/// Counters for one `generate` call, per worker.
#[derive(Debug, Default, Clone)]
pub struct IterProfile {
    pub n_sets: usize,
    pub num_exceedings: usize,
    pub walk_ns: u64,
    pub d2h_ns: u64,
    pub build_ns: u64,
    pub total_ns: u64,
}

/// Per-worker profile: one entry per generation iteration.
#[derive(Debug, Default, Clone)]
pub struct WorkerProfile {
    iters: Vec<IterProfile>,
}

impl WorkerProfile {
    pub fn begin_iter(&mut self) {
        self.iters.push(IterProfile::default());
    }

    pub fn cur(&mut self) -> &mut IterProfile {
        if self.iters.is_empty() {
            self.iters.push(IterProfile::default());
        }
        self.iters.last_mut().unwrap()
    }

    pub fn iters(&self) -> &[IterProfile] {
        &self.iters
    }

    pub fn n_sets(&self) -> usize {
        self.iters.iter().map(|p| p.n_sets).sum()
    }

    pub fn num_exceedings(&self) -> usize {
        self.iters.iter().map(|p| p.num_exceedings).sum()
    }

    pub fn log_iter(&self, slot: usize, kind: &str, iter: usize) {
        match self.iters.get(iter) {
            Some(p) if p.n_sets > 0 => {
                let ms = (p.total_ns / 1_000_000).max(1);
                println!(
                    "[PROFILE] slot={slot} {kind} n-sets={} n-exc={} walk-ns={} d2h-ns={} build-ns={} throughput={:.0} sets/s",
                    p.n_sets,
                    p.num_exceedings,
                    p.walk_ns,
                    p.d2h_ns,
                    p.build_ns,
                    p.n_sets as f64 * 1e3 / ms as f64
                );
            }
            _ => println!("[PROFILE] slot={slot} {kind} > idle worker"),
        }
    }
}

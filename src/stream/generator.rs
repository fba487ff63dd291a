use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::alg::diffusion::{DiffusionModel, RrrSet, RrrSets};
use crate::graph::csr::CsrGraph;
use crate::rng::SplitRng;
use crate::stream::mapping::{layout_slots, SlotKind};
use crate::stream::worker::{CpuWalkWorker, OutputSlots, Worker};

#[cfg(feature = "cuda")]
use std::sync::Arc;

#[cfg(feature = "cuda")]
use crate::gpu::graph_device::DeviceGraph;
#[cfg(feature = "cuda")]
use crate::gpu::ic_worker::{GpuIcWalkWorker, IcConfig};
#[cfg(feature = "cuda")]
use crate::gpu::lt_worker::{GpuLtWalkWorker, LT_NUM_THREADS};

#[derive(Debug, Clone)]
struct GenIterProfile {
    n: usize,
    elapsed: Duration,
}

/// Heterogeneous pool of CPU and GPU workers cooperatively draining one
/// output vector through a single atomic cursor.
///
/// Workers, their buffers and the device graph mirror live exactly as long
/// as the generator. One generator never mixes diffusion models.
pub struct StreamingRrrGenerator<'g> {
    g: &'g CsrGraph,
    model: DiffusionModel,
    num_cpu_workers: usize,
    num_gpu_workers: usize,
    workers: Vec<Worker>,
    head: AtomicUsize,
    iters: Vec<GenIterProfile>,
    #[cfg(feature = "cuda")]
    #[allow(dead_code)]
    device_graph: Option<Arc<DeviceGraph>>,
}

#[cfg(feature = "cuda")]
struct GpuSetup {
    device_graph: Arc<DeviceGraph>,
    ic_conf: Option<IcConfig>,
    threads_per_worker: usize,
}

#[cfg(feature = "cuda")]
fn gpu_setup(
    g: &CsrGraph,
    model: DiffusionModel,
    num_gpu_workers: usize,
) -> Result<Option<GpuSetup>, String> {
    if num_gpu_workers == 0 {
        return Ok(None);
    }

    let device_graph = Arc::new(
        DeviceGraph::upload(g).map_err(|e| format!("device graph upload failed: {e}"))?,
    );

    let (ic_conf, threads_per_worker) = match model {
        DiffusionModel::LinearThreshold => (None, LT_NUM_THREADS),
        DiffusionModel::IndependentCascade => {
            let conf = IcConfig::new(num_gpu_workers)
                .map_err(|e| format!("IC traversal config failed: {e}"))?;
            let threads = conf.num_gpu_threads();
            (Some(conf), threads)
        }
    };

    Ok(Some(GpuSetup {
        device_graph,
        ic_conf,
        threads_per_worker,
    }))
}

#[cfg(feature = "cuda")]
fn build_gpu_workers(
    setup: &GpuSetup,
    master_rng: &SplitRng,
    model: DiffusionModel,
    num_streams: usize,
    num_cpu_workers: usize,
    num_gpu_workers: usize,
) -> Result<Vec<Worker>, String> {
    let gpu_seq_offset = num_cpu_workers + num_gpu_workers;
    let mut workers = Vec::with_capacity(num_gpu_workers);

    for i in 0..num_gpu_workers {
        let host_rng = master_rng.split(num_streams, num_cpu_workers + i);
        let first_seq = gpu_seq_offset + i * setup.threads_per_worker;

        let w = match model {
            DiffusionModel::LinearThreshold => {
                let mut w = GpuLtWalkWorker::new(setup.device_graph.clone(), host_rng)
                    .map_err(|e| format!("GPU LT worker {i}: {e}"))?;
                w.rng_setup(master_rng, num_streams, first_seq)
                    .map_err(|e| format!("GPU LT worker {i} rng setup: {e}"))?;
                Worker::GpuLt(w)
            }
            DiffusionModel::IndependentCascade => {
                let conf = setup.ic_conf.clone().expect("IC config present for IC model");
                let mut w = GpuIcWalkWorker::new(setup.device_graph.clone(), conf, host_rng)
                    .map_err(|e| format!("GPU IC worker {i}: {e}"))?;
                w.rng_setup(master_rng, num_streams, first_seq)
                    .map_err(|e| format!("GPU IC worker {i} rng setup: {e}"))?;
                Worker::GpuIc(w)
            }
        };
        workers.push(w);
    }

    Ok(workers)
}

impl<'g> StreamingRrrGenerator<'g> {
    /// Build the worker pool. `gpu_mapping` comes validated from
    /// `parse_gpu_mapping`; empty means CPU workers occupy the low slots.
    pub fn new(
        g: &'g CsrGraph,
        master_rng: SplitRng,
        num_cpu_workers: usize,
        num_gpu_workers: usize,
        gpu_mapping: &BTreeSet<usize>,
        model: DiffusionModel,
    ) -> Result<Self, String> {
        let total_workers = num_cpu_workers + num_gpu_workers;
        if total_workers == 0 {
            return Err("at least one worker is required".into());
        }
        if g.n() == 0 {
            return Err("graph must have at least one vertex".into());
        }
        if !gpu_mapping.is_empty() && gpu_mapping.len() != num_gpu_workers {
            return Err(format!(
                "GPU mapping names {} slots, expected {num_gpu_workers}",
                gpu_mapping.len()
            ));
        }
        if let Some(&max) = gpu_mapping.iter().next_back() {
            if max >= total_workers {
                return Err(format!(
                    "GPU mapping slot {max} out of range (total workers {total_workers})"
                ));
            }
        }

        #[cfg(not(feature = "cuda"))]
        if num_gpu_workers > 0 {
            return Err("built without the `cuda` feature; GPU workers are unavailable".into());
        }

        #[cfg(feature = "cuda")]
        let gpu = gpu_setup(g, model, num_gpu_workers)?;

        #[cfg(feature = "cuda")]
        let threads_per_gpu_worker = gpu.as_ref().map_or(0, |s| s.threads_per_worker);
        #[cfg(not(feature = "cuda"))]
        let threads_per_gpu_worker = 0usize;

        // One stream per CPU worker, one host-side stream per GPU worker,
        // then one per GPU device thread, all from the same master.
        let num_streams = num_cpu_workers + num_gpu_workers * (threads_per_gpu_worker + 1);

        let mut cpu_workers: Vec<Worker> = (0..num_cpu_workers)
            .map(|i| Worker::Cpu(CpuWalkWorker::new(model, master_rng.split(num_streams, i))))
            .collect();

        #[cfg(feature = "cuda")]
        let mut gpu_workers: Vec<Worker> = match &gpu {
            Some(setup) => build_gpu_workers(
                setup,
                &master_rng,
                model,
                num_streams,
                num_cpu_workers,
                num_gpu_workers,
            )?,
            None => Vec::new(),
        };
        #[cfg(not(feature = "cuda"))]
        let mut gpu_workers: Vec<Worker> = Vec::new();

        let kinds = layout_slots(num_cpu_workers, num_gpu_workers, gpu_mapping);
        let mut workers = Vec::with_capacity(total_workers);
        for (slot, kind) in kinds.iter().enumerate() {
            let w = match kind {
                SlotKind::Cpu => cpu_workers.remove(0),
                SlotKind::Gpu => gpu_workers.remove(0),
            };
            println!("[MAP] slot={slot} -> {}", w.kind());
            workers.push(w);
        }
        debug_assert!(cpu_workers.is_empty() && gpu_workers.is_empty());

        Ok(Self {
            g,
            model,
            num_cpu_workers,
            num_gpu_workers,
            workers,
            head: AtomicUsize::new(0),
            iters: Vec::new(),
            #[cfg(feature = "cuda")]
            device_graph: gpu.map(|s| s.device_graph),
        })
    }

    /// Produce exactly `theta` RRR sets. One OS thread per worker slot;
    /// the cursor is the only coordination between them.
    pub fn generate(&mut self, theta: usize) -> RrrSets {
        let start = Instant::now();
        for w in self.workers.iter_mut() {
            w.begin_prof_iter();
        }

        let mut res: RrrSets = vec![RrrSet::new(); theta];
        self.head.store(0, Ordering::Relaxed);

        {
            let slots = OutputSlots::new(&mut res);
            let head = &self.head;
            let g = self.g;
            std::thread::scope(|s| {
                for w in self.workers.iter_mut() {
                    let slots = &slots;
                    s.spawn(move || w.svc_loop(g, head, slots));
                }
            });
        }

        self.iters.push(GenIterProfile {
            n: theta,
            elapsed: start.elapsed(),
        });
        res
    }

    pub fn model(&self) -> DiffusionModel {
        self.model
    }

    pub fn num_cpu_workers(&self) -> usize {
        self.num_cpu_workers
    }

    pub fn num_gpu_workers(&self) -> usize {
        self.num_gpu_workers
    }

    /// Slot table actually in effect, for callers that want to echo it.
    pub fn slot_kinds(&self) -> Vec<SlotKind> {
        self.workers
            .iter()
            .map(|w| if w.is_gpu() { SlotKind::Gpu } else { SlotKind::Cpu })
            .collect()
    }

    /// Total GPU-LT walks redone on the host because they outgrew the
    /// device mask buffer.
    pub fn num_exceedings(&self) -> usize {
        self.workers
            .iter()
            .map(|w| w.profile().num_exceedings())
            .sum()
    }

    pub fn log_profile(&self) {
        println!("[PROFILE] *** streaming generator ***");
        for (it, ip) in self.iters.iter().enumerate() {
            println!("[PROFILE] +++ iter {it}");
            for (slot, w) in self.workers.iter().enumerate() {
                w.profile().log_iter(slot, w.kind(), it);
            }
            let ms = ip.elapsed.as_millis().max(1);
            println!(
                "[PROFILE] n-sets={} elapsed-ms={} throughput={:.0} sets/s",
                ip.n,
                ms,
                ip.n as f64 * 1e3 / ms as f64
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_graph() -> CsrGraph {
        CsrGraph::from_edges(5, &[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (3, 4, 1.0)])
    }

    #[test]
    fn rejects_zero_workers() {
        let g = chain_graph();
        let r = StreamingRrrGenerator::new(
            &g,
            SplitRng::new(1),
            0,
            0,
            &BTreeSet::new(),
            DiffusionModel::LinearThreshold,
        );
        assert!(r.is_err());
    }

    #[test]
    fn rejects_mapping_count_mismatch() {
        let g = chain_graph();
        let mut mapping = BTreeSet::new();
        mapping.insert(0);
        let r = StreamingRrrGenerator::new(
            &g,
            SplitRng::new(1),
            2,
            0,
            &mapping,
            DiffusionModel::LinearThreshold,
        );
        assert!(r.is_err());
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn rejects_gpu_workers_without_cuda() {
        let g = chain_graph();
        let r = StreamingRrrGenerator::new(
            &g,
            SplitRng::new(1),
            1,
            1,
            &BTreeSet::new(),
            DiffusionModel::LinearThreshold,
        );
        assert!(r.is_err());
    }

    #[test]
    fn generate_fills_every_slot() {
        let g = chain_graph();
        let mut gen = StreamingRrrGenerator::new(
            &g,
            SplitRng::new(11),
            3,
            0,
            &BTreeSet::new(),
            DiffusionModel::LinearThreshold,
        )
        .unwrap();

        let res = gen.generate(1000);
        assert_eq!(res.len(), 1000);
        assert!(res.iter().all(|s| !s.is_empty()));
        assert_eq!(gen.num_exceedings(), 0);
    }

    #[test]
    fn generate_zero_theta() {
        let g = chain_graph();
        let mut gen = StreamingRrrGenerator::new(
            &g,
            SplitRng::new(11),
            2,
            0,
            &BTreeSet::new(),
            DiffusionModel::IndependentCascade,
        )
        .unwrap();
        assert!(gen.generate(0).is_empty());
    }
}

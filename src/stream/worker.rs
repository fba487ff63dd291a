use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rand::Rng;

use crate::alg::diffusion::{add_rrr_set, DiffusionModel, RrrSet};
use crate::graph::csr::CsrGraph;
use crate::rng::SplitRng;
use crate::stream::profile::WorkerProfile;

/// Slots a CPU worker claims per fetch-add.
pub const CPU_BATCH_SIZE: usize = 32;

/// Shared view of the output vector during one `generate` call.
///
/// The cursor apportions disjoint index ranges to workers; a worker may
/// only touch slots inside a range it claimed, which is what makes the
/// unsynchronized writes sound. Nothing reads a slot until all workers
/// have joined.
pub struct OutputSlots {
    ptr: *mut RrrSet,
    len: usize,
}

unsafe impl Send for OutputSlots {}
unsafe impl Sync for OutputSlots {}

impl OutputSlots {
    pub fn new(res: &mut [RrrSet]) -> Self {
        Self {
            ptr: res.as_mut_ptr(),
            len: res.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Safety: `i` must lie in a range the caller claimed from the cursor,
    /// and no other reference to that slot may exist.
    pub unsafe fn slot_mut(&self, i: usize) -> &mut RrrSet {
        debug_assert!(i < self.len);
        &mut *self.ptr.add(i)
    }
}

/// Worker that drains output slots with host walks.
pub struct CpuWalkWorker {
    model: DiffusionModel,
    rng: SplitRng,
    pub prof: WorkerProfile,
}

impl CpuWalkWorker {
    pub fn new(model: DiffusionModel, rng: SplitRng) -> Self {
        Self {
            model,
            rng,
            prof: WorkerProfile::default(),
        }
    }

    pub fn svc_loop(&mut self, g: &CsrGraph, head: &AtomicUsize, res: &OutputSlots) {
        loop {
            let offset = head.fetch_add(CPU_BATCH_SIZE, Ordering::Relaxed);
            if offset >= res.len() {
                break;
            }
            let last = (offset + CPU_BATCH_SIZE).min(res.len());
            self.batch(g, res, offset, last);
        }
    }

    fn batch(&mut self, g: &CsrGraph, res: &OutputSlots, first: usize, last: usize) {
        let t0 = Instant::now();
        let n = g.n() as u32;

        for i in first..last {
            let root = self.rng.gen_range(0..n);
            let set = unsafe { res.slot_mut(i) };
            add_rrr_set(g, root, &mut self.rng, set, self.model);
        }

        let elapsed = t0.elapsed().as_nanos() as u64;
        let p = self.prof.cur();
        p.n_sets += last - first;
        p.walk_ns += elapsed;
        p.total_ns += elapsed;
    }
}

/// The two worker shapes behind one dispatch point. Workers are
/// interchangeable at the slot table; the service loop is the whole
/// contract.
pub enum Worker {
    Cpu(CpuWalkWorker),
    #[cfg(feature = "cuda")]
    GpuLt(crate::gpu::lt_worker::GpuLtWalkWorker),
    #[cfg(feature = "cuda")]
    GpuIc(crate::gpu::ic_worker::GpuIcWalkWorker),
}

impl Worker {
    pub fn svc_loop(&mut self, g: &CsrGraph, head: &AtomicUsize, res: &OutputSlots) {
        match self {
            Worker::Cpu(w) => w.svc_loop(g, head, res),
            #[cfg(feature = "cuda")]
            Worker::GpuLt(w) => w.svc_loop(g, head, res),
            #[cfg(feature = "cuda")]
            Worker::GpuIc(w) => w.svc_loop(g, head, res),
        }
    }

    pub fn profile(&self) -> &WorkerProfile {
        match self {
            Worker::Cpu(w) => &w.prof,
            #[cfg(feature = "cuda")]
            Worker::GpuLt(w) => &w.prof,
            #[cfg(feature = "cuda")]
            Worker::GpuIc(w) => &w.prof,
        }
    }

    pub fn begin_prof_iter(&mut self) {
        match self {
            Worker::Cpu(w) => w.prof.begin_iter(),
            #[cfg(feature = "cuda")]
            Worker::GpuLt(w) => w.prof.begin_iter(),
            #[cfg(feature = "cuda")]
            Worker::GpuIc(w) => w.prof.begin_iter(),
        }
    }

    pub fn is_gpu(&self) -> bool {
        !matches!(self, Worker::Cpu(_))
    }

    pub fn kind(&self) -> &'static str {
        if self.is_gpu() {
            "GPU-worker"
        } else {
            "CPU-worker"
        }
    }
}

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use cust::error::CudaResult;
use cust::launch;
use cust::memory::DeviceBuffer;
use cust::module::Module;
use cust::stream::{Stream, StreamFlags};
use rand::{Rng, RngCore};

use crate::gpu::graph_device::DeviceGraph;
use crate::gpu::runtime::{max_resident_blocks, IC_FRONTIER_PTX};
use crate::graph::csr::CsrGraph;
use crate::rng::SplitRng;
use crate::stream::profile::WorkerProfile;
use crate::stream::worker::OutputSlots;

/// Walks are not fused on device, so the claim stays host-sized.
pub const IC_BATCH_SIZE: usize = 32;
pub const IC_BLOCK_SIZE: usize = 256;

/// Per-worker traversal shape: an equal slice of the device's resident
/// blocks, so all IC workers can coexist.
#[derive(Debug, Clone)]
pub struct IcConfig {
    pub max_blocks: usize,
    pub block_size: usize,
}

impl IcConfig {
    pub fn new(num_gpu_workers: usize) -> CudaResult<Self> {
        let total = max_resident_blocks(IC_BLOCK_SIZE)?;
        let max_blocks = (total / num_gpu_workers).max(1);
        Ok(Self {
            max_blocks,
            block_size: IC_BLOCK_SIZE,
        })
    }

    pub fn num_gpu_threads(&self) -> usize {
        self.max_blocks * self.block_size
    }
}

/// Worker that drains output slots one reverse-BFS traversal per walk.
pub struct GpuIcWalkWorker {
    dev: Arc<DeviceGraph>,
    conf: IcConfig,
    stream: Stream,
    module: Module,
    rng: SplitRng, // host-side stream, draws the roots
    pred_h: Vec<i32>,
    d_pred: DeviceBuffer<i32>,
    frontier_seed: Vec<u32>,
    d_frontier_a: DeviceBuffer<u32>,
    d_frontier_b: DeviceBuffer<u32>,
    d_next_len: DeviceBuffer<u32>,
    d_rng_state: DeviceBuffer<u64>,
    pub prof: WorkerProfile,
}

impl GpuIcWalkWorker {
    pub fn new(dev: Arc<DeviceGraph>, conf: IcConfig, rng: SplitRng) -> CudaResult<Self> {
        let stream = Stream::new(StreamFlags::NON_BLOCKING, None)?;
        let module = Module::from_ptx(IC_FRONTIER_PTX, &[])?;

        let n = dev.n;
        let pred_h = vec![-1i32; n];
        let d_pred = DeviceBuffer::from_slice(&pred_h)?;
        let frontier_seed = vec![0u32; n];
        let d_frontier_a = DeviceBuffer::zeroed(n)?;
        let d_frontier_b = DeviceBuffer::zeroed(n)?;
        let d_next_len = DeviceBuffer::from_slice(&[0u32])?;
        let d_rng_state = DeviceBuffer::zeroed(conf.num_gpu_threads())?;

        Ok(Self {
            dev,
            conf,
            stream,
            module,
            rng,
            pred_h,
            d_pred,
            frontier_seed,
            d_frontier_a,
            d_frontier_b,
            d_next_len,
            d_rng_state,
            prof: WorkerProfile::default(),
        })
    }

    /// Seed the device streams: device thread `t` draws from the master
    /// sub-stream `(num_seqs, first_seq + t)`.
    pub fn rng_setup(
        &mut self,
        master_rng: &SplitRng,
        num_seqs: usize,
        first_seq: usize,
    ) -> CudaResult<()> {
        let states: Vec<u64> = (0..self.conf.num_gpu_threads())
            .map(|t| master_rng.split(num_seqs, first_seq + t).next_u64())
            .collect();
        self.d_rng_state.copy_from(&states)
    }

    pub fn svc_loop(&mut self, g: &CsrGraph, head: &AtomicUsize, res: &OutputSlots) {
        self.dev
            .make_current()
            .expect("binding CUDA context to GPU IC worker thread failed");

        loop {
            let offset = head.fetch_add(IC_BATCH_SIZE, Ordering::Relaxed);
            if offset >= res.len() {
                break;
            }
            let last = (offset + IC_BATCH_SIZE).min(res.len());
            self.batch(g, res, offset, last)
                .expect("GPU IC batch failed");
        }
    }

    fn batch(
        &mut self,
        g: &CsrGraph,
        res: &OutputSlots,
        first: usize,
        last: usize,
    ) -> CudaResult<()> {
        let n = g.n() as u32;

        for i in first..last {
            let t0 = Instant::now();
            let root = self.rng.gen_range(0..n);
            self.traverse(root, n)?;
            let t1 = Instant::now();

            self.d_pred.copy_to(&mut self.pred_h)?;
            let t2 = Instant::now();

            self.pred_h[root as usize] = root as i32;

            let set = unsafe { res.slot_mut(i) };
            set.clear();
            for (v, &p) in self.pred_h.iter().enumerate() {
                if p != -1 {
                    set.push(v as u32);
                }
            }
            let t3 = Instant::now();

            let p = self.prof.cur();
            p.n_sets += 1;
            p.walk_ns += (t1 - t0).as_nanos() as u64;
            p.d2h_ns += (t2 - t1).as_nanos() as u64;
            p.build_ns += (t3 - t2).as_nanos() as u64;
            p.total_ns += (t3 - t0).as_nanos() as u64;
        }
        Ok(())
    }

    /// One full reverse BFS from `root`, leaving reachability in `d_pred`.
    /// The frontier double-buffer stays device-side; only its length comes
    /// back per level.
    fn traverse(&mut self, root: u32, n: u32) -> CudaResult<()> {
        self.pred_h.fill(-1);
        // pre-claim the root so a cycle back into it cannot re-expand it
        self.pred_h[root as usize] = root as i32;
        self.d_pred.copy_from(&self.pred_h)?;

        self.frontier_seed[0] = root;
        self.d_frontier_a.copy_from(&self.frontier_seed)?;

        let mut frontier_len: u32 = 1;
        while frontier_len > 0 {
            self.d_next_len.copy_from(&[0u32])?;

            let grid = self.conf.max_blocks as u32;
            let block = self.conf.block_size as u32;
            let module = &self.module;
            let stream = &self.stream;
            unsafe {
                launch!(
                    module.ic_frontier_expand<<<grid, block, 0, stream>>>(
                        self.dev.offsets_d.as_device_ptr(),
                        self.dev.dst_d.as_device_ptr(),
                        self.dev.w_d.as_device_ptr(),
                        n,
                        self.d_frontier_a.as_device_ptr(),
                        frontier_len,
                        self.d_pred.as_device_ptr(),
                        self.d_frontier_b.as_device_ptr(),
                        self.d_next_len.as_device_ptr(),
                        n,
                        self.d_rng_state.as_device_ptr()
                    )
                )?;
            }
            self.stream.synchronize()?;

            let mut h_len = [0u32];
            self.d_next_len.copy_to(&mut h_len)?;
            frontier_len = h_len[0].min(n);

            std::mem::swap(&mut self.d_frontier_a, &mut self.d_frontier_b);
        }

        Ok(())
    }
}

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use cust::error::CudaResult;
use cust::launch;
use cust::memory::DeviceBuffer;
use cust::module::Module;
use cust::stream::{Stream, StreamFlags};
use rand::RngCore;

use crate::alg::diffusion::lt_walk;
use crate::gpu::graph_device::DeviceGraph;
use crate::gpu::runtime::LT_WALK_PTX;
use crate::graph::csr::CsrGraph;
use crate::rng::SplitRng;
use crate::stream::profile::WorkerProfile;
use crate::stream::worker::OutputSlots;

pub const LT_BLOCK_SIZE: usize = 256;
/// Concurrent walks per kernel launch; also the worker's claim size.
pub const LT_NUM_THREADS: usize = 1 << 15;
/// Fixed per-walk slot width in the packed mask buffer. A walk that would
/// visit more vertices is redone on the host.
pub const LT_MASK_WORDS: usize = 8;
pub const LT_MAX_BLOCKS: usize = LT_NUM_THREADS / LT_BLOCK_SIZE;

/// Worker that drains output slots with batched device LT walks.
pub struct GpuLtWalkWorker {
    dev: Arc<DeviceGraph>,
    stream: Stream,
    module: Module,
    rng: SplitRng, // host-side stream, used only for overflow redo
    res_mask: Vec<u32>,
    d_res_mask: DeviceBuffer<u32>,
    d_rng_state: DeviceBuffer<u64>,
    pub prof: WorkerProfile,
}

impl GpuLtWalkWorker {
    pub fn new(dev: Arc<DeviceGraph>, rng: SplitRng) -> CudaResult<Self> {
        let stream = Stream::new(StreamFlags::NON_BLOCKING, None)?;
        let module = Module::from_ptx(LT_WALK_PTX, &[])?;

        let words = LT_NUM_THREADS * LT_MASK_WORDS;
        let res_mask = vec![0u32; words];
        let d_res_mask = DeviceBuffer::zeroed(words)?;
        let d_rng_state = DeviceBuffer::zeroed(LT_NUM_THREADS)?;

        Ok(Self {
            dev,
            stream,
            module,
            rng,
            res_mask,
            d_res_mask,
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
        let states: Vec<u64> = (0..LT_NUM_THREADS)
            .map(|t| master_rng.split(num_seqs, first_seq + t).next_u64())
            .collect();
        self.d_rng_state.copy_from(&states)
    }

    pub fn svc_loop(&mut self, g: &CsrGraph, head: &AtomicUsize, res: &OutputSlots) {
        self.dev
            .make_current()
            .expect("binding CUDA context to GPU LT worker thread failed");

        loop {
            let offset = head.fetch_add(LT_NUM_THREADS, Ordering::Relaxed);
            if offset >= res.len() {
                break;
            }
            let last = (offset + LT_NUM_THREADS).min(res.len());
            self.batch(g, res, offset, last)
                .expect("GPU LT batch failed");
        }
    }

    fn batch(
        &mut self,
        g: &CsrGraph,
        res: &OutputSlots,
        first: usize,
        last: usize,
    ) -> CudaResult<()> {
        let size = last - first;
        let t0 = Instant::now();

        let grid = ((size + LT_BLOCK_SIZE - 1) / LT_BLOCK_SIZE) as u32;
        let block = LT_BLOCK_SIZE as u32;
        let n = g.n() as u32;
        let batch = size as u32;
        let mask_words = LT_MASK_WORDS as u32;
        let module = &self.module;
        let stream = &self.stream;
        unsafe {
            launch!(
                module.lt_walk_kernel<<<grid, block, 0, stream>>>(
                    self.dev.offsets_d.as_device_ptr(),
                    self.dev.dst_d.as_device_ptr(),
                    self.dev.w_d.as_device_ptr(),
                    n,
                    batch,
                    self.d_rng_state.as_device_ptr(),
                    self.d_res_mask.as_device_ptr(),
                    mask_words
                )
            )?;
        }
        self.stream.synchronize()?;
        let t1 = Instant::now();

        let words = size * LT_MASK_WORDS;
        self.d_res_mask
            .index(..words)
            .copy_to(&mut self.res_mask[..words])?;
        let t2 = Instant::now();

        self.build(g, res, first, size);
        let t3 = Instant::now();

        let p = self.prof.cur();
        p.n_sets += size;
        p.walk_ns += (t1 - t0).as_nanos() as u64;
        p.d2h_ns += (t2 - t1).as_nanos() as u64;
        p.build_ns += (t3 - t2).as_nanos() as u64;
        p.total_ns += (t3 - t0).as_nanos() as u64;
        Ok(())
    }

    fn build(&mut self, g: &CsrGraph, res: &OutputSlots, first: usize, size: usize) {
        let sentinel = g.sentinel();

        for i in 0..size {
            let set = unsafe { res.slot_mut(first + i) };
            let mask = &self.res_mask[i * LT_MASK_WORDS..(i + 1) * LT_MASK_WORDS];

            if mask[0] != sentinel {
                set.clear();
                set.reserve(LT_MASK_WORDS);
                for &v in mask {
                    if v == sentinel {
                        break;
                    }
                    set.push(v);
                }
                set.sort_unstable();
            } else {
                // walk outgrew the device slot; the kernel left the root in
                // word 1 so the host can redo it
                self.prof.cur().num_exceedings += 1;
                let root = mask[1];
                lt_walk(g, root, &mut self.rng, set);
            }
        }
    }
}

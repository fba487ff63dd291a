use cust::context::{Context, CurrentContext};
use cust::error::CudaResult;
use cust::memory::DeviceBuffer;

use crate::graph::csr::CsrGraph;

/// Device-resident CSR mirror, built once per generation session when any
/// GPU worker exists. Read-only after upload; torn down with the generator.
pub struct DeviceGraph {
    pub offsets_d: DeviceBuffer<u32>,
    pub dst_d: DeviceBuffer<u32>,
    pub w_d: DeviceBuffer<f32>,
    pub n: usize,
    pub m: usize,
    ctx: Context,
}

impl DeviceGraph {
    pub fn upload(g: &CsrGraph) -> CudaResult<Self> {
        let ctx = cust::quick_init()?;

        let offsets_d = DeviceBuffer::from_slice(&g.offsets)?;
        let dst_d = DeviceBuffer::from_slice(&g.dst)?;
        let w_d = DeviceBuffer::from_slice(&g.w)?;

        Ok(Self {
            offsets_d,
            dst_d,
            w_d,
            n: g.n(),
            m: g.m(),
            ctx,
        })
    }

    /// Bind the owning CUDA context to the calling thread. Worker service
    /// loops run on their own OS threads and must call this first.
    pub fn make_current(&self) -> CudaResult<()> {
        CurrentContext::set_current(&self.ctx)
    }
}

pub mod alg;
pub mod graph;
pub mod rng;
pub mod stream;

#[cfg(feature = "cuda")]
pub mod gpu;

pub use alg::diffusion::{DiffusionModel, RrrSet, RrrSets, MAX_SET_SIZE};
pub use graph::csr::CsrGraph;
pub use rng::SplitRng;
pub use stream::generator::StreamingRrrGenerator;
pub use stream::mapping::parse_gpu_mapping;

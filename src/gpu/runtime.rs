use cust::device::{Device, DeviceAttribute};
use cust::error::CudaResult;

pub const LT_WALK_PTX: &str = include_str!(concat!(env!("OUT_DIR"), "/lt_walk.ptx"));
pub const IC_FRONTIER_PTX: &str = include_str!(concat!(env!("OUT_DIR"), "/ic_frontier.ptx"));

/// Upper bound on simultaneously resident blocks of `block_size` threads
/// on device 0.
pub fn max_resident_blocks(block_size: usize) -> CudaResult<usize> {
    let dev = Device::get_device(0)?;
    let sms = dev.get_attribute(DeviceAttribute::MultiprocessorCount)? as usize;
    let threads_per_sm =
        dev.get_attribute(DeviceAttribute::MaxThreadsPerMultiprocessor)? as usize;
    Ok(sms * (threads_per_sm / block_size))
}

pub mod graph_device;
pub mod ic_worker;
pub mod lt_worker;
pub mod runtime;

//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain)
//! - implementing the frame presenter's backend on top of wgpu

mod backend;
mod gpu;
mod init;
mod surface;

pub use backend::{GpuAttachment, GpuCommands, GpuDrawable};
pub use gpu::Gpu;
pub use init::GpuInit;

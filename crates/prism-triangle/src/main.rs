use anyhow::Result;
use winit::dpi::LogicalSize;

use prism_engine::device::GpuInit;
use prism_engine::logging::{LoggingConfig, init_logging};
use prism_engine::present::{AttachmentLayout, PresenterConfig, ShaderSource};
use prism_engine::window::{Runtime, RuntimeConfig};

const TRIANGLE_WGSL: &str = include_str!("triangle.wgsl");

#[cfg(feature = "multiple-color-attachments")]
const COLOR_SLOTS: usize = 4;
#[cfg(not(feature = "multiple-color-attachments"))]
const COLOR_SLOTS: usize = 1;

/// The browser build renders through WebGL2.
fn gpu_init() -> GpuInit {
    if cfg!(target_arch = "wasm32") {
        GpuInit {
            backends: wgpu::Backends::GL,
            ..GpuInit::default()
        }
    } else {
        GpuInit::default()
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let runtime = RuntimeConfig {
        title: "prism triangle".to_string(),
        initial_size: LogicalSize::new(800.0, 600.0),
    };

    let presenter = PresenterConfig::new(ShaderSource::new("triangle.wgsl", TRIANGLE_WGSL))
        .with_layout(AttachmentLayout::sparse(COLOR_SLOTS));
    log::info!("color slots: {COLOR_SLOTS}");

    Runtime::run(runtime, gpu_init(), presenter)
}

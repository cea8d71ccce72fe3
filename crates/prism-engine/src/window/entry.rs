use anyhow::{Context, Result};
use ouroboros::self_referencing;
use winit::window::{Window, WindowAttributes};

use super::runtime::attach_presenter;
use crate::device::{Gpu, GpuInit};
use crate::present::{FramePresenter, FrameReport, PresentError, PresenterConfig, SurfaceSize};

/// A window and the presenter drawing into it.
///
/// The presenter's surface borrows the window and is dropped before it.
#[self_referencing]
pub(super) struct WindowEntry {
    /// Latest drawable size reported by winit.
    surface_size: SurfaceSize,

    window: Window,

    #[borrows(window)]
    #[not_covariant]
    presenter: FramePresenter<Gpu<'this>>,
}

impl WindowEntry {
    pub(super) fn attributes(attrs: WindowAttributes) -> WindowAttributes {
        attrs
    }

    /// Creates the GPU context for `window` and a presenter on top of it.
    pub(super) fn create(
        window: Window,
        gpu_init: GpuInit,
        presenter_config: PresenterConfig<wgpu::TextureFormat>,
    ) -> Result<Self> {
        let surface_size = SurfaceSize::from(window.inner_size());

        WindowEntryTryBuilder {
            surface_size,
            window,
            presenter_builder: |w| {
                pollster::block_on(Gpu::new(w, gpu_init))
                    .context("GPU initialization failed for window")
                    .and_then(|gpu| attach_presenter(gpu, presenter_config))
            },
        }
        .try_build()
    }

    /// The GPU is created synchronously on native targets.
    pub(super) fn poll_gpu(&mut self) -> Result<bool> {
        Ok(true)
    }

    pub(super) fn surface_size(&self) -> SurfaceSize {
        self.with_surface_size(|size| *size)
    }

    pub(super) fn set_surface_size(&mut self, size: SurfaceSize) {
        self.with_surface_size_mut(|current| *current = size);
    }

    pub(super) fn request_redraw(&self) {
        self.with_window(|w| w.request_redraw());
    }

    pub(super) fn present_frame(&mut self) -> Result<FrameReport, PresentError> {
        self.with_mut(|fields| fields.presenter.present_frame(*fields.surface_size))
    }
}

//! Browser entry: the window is attached to a page canvas and the GPU is
//! created asynchronously.

use anyhow::{Context, Result, anyhow};
use futures::channel::oneshot;
use wasm_bindgen::JsCast;
use winit::platform::web::WindowAttributesExtWebSys;
use winit::window::{Window, WindowAttributes};

use super::runtime::attach_presenter;
use crate::device::{Gpu, GpuInit};
use crate::present::{
    AcquireError, FramePresenter, FrameReport, PresentError, PresenterConfig, SurfaceSize,
};

/// Id of the page canvas the window renders into.
const CANVAS_ID: &str = "canvas";

type PendingPresenter = oneshot::Receiver<Result<FramePresenter<Gpu<'static>>>>;

pub(super) struct WindowEntry {
    surface_size: SurfaceSize,
    presenter: Option<FramePresenter<Gpu<'static>>>,
    pending: Option<PendingPresenter>,
    window: &'static Window,
}

impl WindowEntry {
    /// Renders into the page's `#canvas`, or appends a canvas to the body
    /// when the page has none.
    pub(super) fn attributes(attrs: WindowAttributes) -> WindowAttributes {
        let canvas = web_sys::window()
            .and_then(|win| win.document())
            .and_then(|doc| doc.get_element_by_id(CANVAS_ID))
            .and_then(|el| el.dyn_into::<web_sys::HtmlCanvasElement>().ok());

        match canvas {
            Some(canvas) => attrs.with_canvas(Some(canvas)),
            None => {
                log::warn!("no #{CANVAS_ID} element on the page, appending one");
                attrs.with_append(true)
            }
        }
    }

    /// Starts GPU initialization; the presenter becomes available through
    /// [`poll_gpu`](Self::poll_gpu).
    pub(super) fn create(
        window: Window,
        gpu_init: GpuInit,
        presenter_config: PresenterConfig<wgpu::TextureFormat>,
    ) -> Result<Self> {
        let surface_size = SurfaceSize::from(window.inner_size());

        // The surface needs a `'static` window; it lives as long as the page.
        let window: &'static Window = Box::leak(Box::new(window));

        let (sender, receiver) = oneshot::channel();
        wasm_bindgen_futures::spawn_local(async move {
            let presenter = Gpu::new(window, gpu_init)
                .await
                .context("GPU initialization failed for window")
                .and_then(|gpu| attach_presenter(gpu, presenter_config));

            if sender.send(presenter).is_err() {
                log::debug!("window closed before the GPU was ready");
            }
        });

        Ok(Self {
            surface_size,
            presenter: None,
            pending: Some(receiver),
            window,
        })
    }

    /// Returns whether the presenter is ready, picking it up once the
    /// initialization task finishes.
    pub(super) fn poll_gpu(&mut self) -> Result<bool> {
        if self.presenter.is_some() {
            return Ok(true);
        }

        let Some(pending) = self.pending.as_mut() else {
            return Err(anyhow!("GPU initialization did not complete"));
        };

        match pending.try_recv() {
            Ok(Some(presenter)) => {
                self.pending = None;
                self.presenter = Some(presenter?);
                log::info!("GPU ready");
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(oneshot::Canceled) => {
                self.pending = None;
                Err(anyhow!("GPU initialization task was dropped"))
            }
        }
    }

    pub(super) fn surface_size(&self) -> SurfaceSize {
        self.surface_size
    }

    pub(super) fn set_surface_size(&mut self, size: SurfaceSize) {
        self.surface_size = size;
    }

    pub(super) fn request_redraw(&self) {
        self.window.request_redraw();
    }

    pub(super) fn present_frame(&mut self) -> Result<FrameReport, PresentError> {
        match self.presenter.as_mut() {
            Some(presenter) => presenter.present_frame(self.surface_size),
            None => Err(AcquireError::Other("GPU is still initializing".to_string()).into()),
        }
    }
}

use anyhow::{Context, Result};

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use super::WindowEntry;
use crate::device::{Gpu, GpuInit};
use crate::present::{
    AcquireError, FramePresenter, PresentError, PresenterConfig, SurfaceErrorAction, SurfaceSize,
};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "prism".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window and presents frames until it closes.
    ///
    /// Returns an error if the window or GPU could not be set up, or if a frame
    /// failed in a way that cannot be retried.
    ///
    /// In the browser the event loop is handed to the page and this returns
    /// immediately; fatal errors are logged to the console instead.
    pub fn run(
        initial: RuntimeConfig,
        gpu_init: GpuInit,
        presenter: PresenterConfig<wgpu::TextureFormat>,
    ) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let state = AppState::new(initial, gpu_init, presenter);

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::EventLoopExtWebSys;

            event_loop.spawn_app(state);
            Ok(())
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let mut state = state;
            event_loop
                .run_app(&mut state)
                .context("winit event loop terminated with error")?;

            match state.fatal.take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }
}

/// Wraps a fresh GPU context in a presenter, checking the attachment layout
/// against the device first.
pub(super) fn attach_presenter<'w>(
    gpu: Gpu<'w>,
    config: PresenterConfig<wgpu::TextureFormat>,
) -> Result<FramePresenter<Gpu<'w>>> {
    gpu.check_layout(&config.layout)
        .context("attachment layout does not fit the device")?;
    Ok(FramePresenter::new(gpu, config))
}

/// Logs a failed frame and returns the error if the loop must stop.
fn frame_failure(err: PresentError) -> Option<anyhow::Error> {
    match err.action() {
        SurfaceErrorAction::Reconfigured => {
            log::debug!("{err}; retrying next frame");
            None
        }
        SurfaceErrorAction::SkipFrame => {
            if matches!(
                err,
                PresentError::SurfaceAcquisitionFailed(AcquireError::ZeroSized)
            ) {
                log::trace!("window has zero area; frame skipped");
            } else {
                log::warn!("frame skipped: {err}");
            }
            None
        }
        SurfaceErrorAction::Fatal => {
            log::error!("fatal presenter error: {err}");
            Some(anyhow::Error::new(err).context("frame presentation failed"))
        }
    }
}

/// Final drawable size carried by `event`.
///
/// Only `Resized` qualifies; during `ScaleFactorChanged` the window still
/// reports its previous size.
fn reported_size(event: &WindowEvent) -> Option<SurfaceSize> {
    match event {
        WindowEvent::Resized(size) => Some(SurfaceSize::from(*size)),
        _ => None,
    }
}

struct AppState {
    initial: RuntimeConfig,
    gpu_init: GpuInit,
    presenter_config: PresenterConfig<wgpu::TextureFormat>,

    entry: Option<WindowEntry>,
    exit_requested: bool,
    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    fatal: Option<anyhow::Error>,
}

impl AppState {
    fn new(
        initial: RuntimeConfig,
        gpu_init: GpuInit,
        presenter_config: PresenterConfig<wgpu::TextureFormat>,
    ) -> Self {
        Self {
            initial,
            gpu_init,
            presenter_config,
            entry: None,
            exit_requested: false,
            fatal: None,
        }
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        event_loop.exit();
    }

    /// Records `err`, tears the window down and leaves the event loop.
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.fatal = Some(err);
        self.destroy_window_entry();
        self.request_exit(event_loop);
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = WindowEntry::attributes(
            Window::default_attributes()
                .with_title(self.initial.title.clone())
                .with_inner_size(self.initial.initial_size),
        );

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let entry = WindowEntry::create(
            window,
            self.gpu_init.clone(),
            self.presenter_config.clone(),
        )?;

        log::info!("window created at {}", entry.surface_size());
        self.entry = Some(entry);
        Ok(())
    }

    /// Drops the presenter (targets, pipeline, device) and then the window.
    fn destroy_window_entry(&mut self) {
        if self.entry.take().is_some() {
            log::info!("window closed");
        }
    }

    fn set_surface_size(&mut self, size: SurfaceSize) {
        if let Some(entry) = self.entry.as_mut() {
            entry.set_surface_size(size);
            entry.request_redraw();
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        match entry.poll_gpu() {
            Ok(true) => {}
            Ok(false) => return,
            Err(err) => {
                self.fail(event_loop, err);
                return;
            }
        }

        if let Err(err) = entry.present_frame() {
            if let Some(fatal) = frame_failure(err) {
                self.fail(event_loop, fatal);
            }
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop) {
            self.fail(event_loop, e.context("failed to create initial window"));
            return;
        }

        if let Some(entry) = self.entry.as_ref() {
            entry.request_redraw();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw: one presented frame per loop iteration.
        if let Some(entry) = self.entry.as_ref() {
            entry.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        if let Some(size) = reported_size(&event) {
            log::info!("window resized: width={}, height={}", size.width, size.height);
            self.set_surface_size(size);
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.destroy_window_entry();
                self.request_exit(event_loop);
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                self.destroy_window_entry();
                self.request_exit(event_loop);
            }

            // The new physical size arrives with the `Resized` that follows.
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                log::debug!("scale factor changed to {scale_factor}");
                if let Some(entry) = self.entry.as_ref() {
                    entry.request_redraw();
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }
}

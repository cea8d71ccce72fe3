use super::backend::{Backend, Drawable, RenderCommands, RenderPassDesc};
use super::error::{AcquireError, PresentError};
use super::pipeline::{PipelineDesc, PipelineState, ShaderSource};
use super::targets::{AttachmentLayout, RenderTargetSet};
use super::types::{ClearColor, PrimitiveTopology, ScissorRect, SurfaceSize, Viewport};

/// Vertex count of the triangle; positions live in the shader.
pub const TRIANGLE_VERTEX_COUNT: u32 = 3;

const DEBUG_GROUP: &str = "Render Triangle";
const PIPELINE_LABEL: &str = "prism triangle pipeline";

/// Presenter configuration.
#[derive(Debug, Clone)]
pub struct PresenterConfig<F> {
    pub layout: AttachmentLayout<F>,
    pub clear_color: ClearColor,
    pub shader: ShaderSource,
}

impl<F> PresenterConfig<F> {
    /// Single color attachment cleared to white.
    pub fn new(shader: ShaderSource) -> Self {
        Self {
            layout: AttachmentLayout::single(),
            clear_color: ClearColor::WHITE,
            shader,
        }
    }

    pub fn with_layout(mut self, layout: AttachmentLayout<F>) -> Self {
        self.layout = layout;
        self
    }
}

/// Summary of one submitted frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub extent: SurfaceSize,
    pub targets_rebuilt: bool,
    pub pipeline_built: bool,
}

/// Produces one displayed frame per call, keeping render targets in step with
/// the surface size.
///
/// Owns the render target set, the pipeline and the backend. Fields drop in
/// declaration order, so attachments and the pipeline are released before the
/// device that created them.
pub struct FramePresenter<B: Backend> {
    targets: Option<RenderTargetSet<B::Texture, B::Format>>,
    pipeline: Option<PipelineState<B::Pipeline, B::Format>>,
    config: PresenterConfig<B::Format>,
    pass: RenderPassDesc,
    frames_presented: u64,
    backend: B,
}

impl<B: Backend> FramePresenter<B> {
    pub fn new(backend: B, config: PresenterConfig<B::Format>) -> Self {
        let pass = RenderPassDesc {
            clear_color: config.clear_color,
            ..RenderPassDesc::default()
        };

        Self {
            targets: None,
            pipeline: None,
            config,
            pass,
            frames_presented: 0,
            backend,
        }
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn targets(&self) -> Option<&RenderTargetSet<B::Texture, B::Format>> {
        self.targets.as_ref()
    }

    pub fn has_pipeline(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Acquires, reconciles, encodes and submits one frame at `surface_size`.
    ///
    /// Nothing is submitted when an error is returned. A zero-area size is
    /// reported as [`AcquireError::ZeroSized`] without touching the backend.
    pub fn present_frame(&mut self, surface_size: SurfaceSize) -> Result<FrameReport, PresentError> {
        if surface_size.is_empty() {
            return Err(AcquireError::ZeroSized.into());
        }

        let drawable = self.backend.acquire_drawable(surface_size)?;
        let extent = drawable.extent();
        if extent != surface_size {
            log::debug!("surface image is {extent}, requested {surface_size}");
        }

        let encoded = self.encode_frame(&drawable);

        // The surface image belongs to the presentation engine from here on.
        if let Some(targets) = self.targets.as_mut() {
            targets.release_primary();
        }

        let (targets_rebuilt, pipeline_built, commands) = encoded?;
        self.backend.submit(commands, drawable);

        let report = FrameReport {
            frame_index: self.frames_presented,
            extent,
            targets_rebuilt,
            pipeline_built,
        };
        self.frames_presented += 1;

        log::trace!("presented frame {} at {}", report.frame_index, report.extent);
        Ok(report)
    }

    /// Builds the pipeline for the current target formats unless a compatible
    /// one already exists. Returns whether a pipeline was built.
    pub fn ensure_pipeline(&mut self) -> Result<bool, PresentError> {
        let Some(targets) = self.targets.as_ref() else {
            return Err(PresentError::pipeline_unavailable(
                "render target formats are not known yet",
            ));
        };

        if self
            .pipeline
            .as_ref()
            .is_some_and(|state| state.is_compatible(targets.formats()))
        {
            return Ok(false);
        }

        let formats = targets.formats().clone();
        if self.pipeline.take().is_some() {
            log::info!("target formats changed, rebuilding pipeline");
        }

        let desc = PipelineDesc {
            label: PIPELINE_LABEL,
            shader: &self.config.shader,
            targets: &formats,
            topology: PrimitiveTopology::TriangleList,
        };
        let pipeline = self
            .backend
            .create_pipeline(&desc)
            .map_err(|err| PresentError::pipeline_unavailable(err.to_string()))?;

        log::info!("built render pipeline for {:?}", formats.colors);
        self.pipeline = Some(PipelineState::new(formats, pipeline));
        Ok(true)
    }

    fn encode_frame(
        &mut self,
        drawable: &B::Drawable,
    ) -> Result<(bool, bool, B::CommandBuffer), PresentError> {
        let targets_rebuilt = self.reconcile_targets(drawable)?;
        let pipeline_built = self.ensure_pipeline()?;

        let Some(targets) = self.targets.as_ref() else {
            return Err(PresentError::pipeline_unavailable("no render targets to draw into"));
        };
        let pipeline = self.pipeline.as_ref().map(PipelineState::pipeline);
        let commands = encode_triangle(&mut self.backend, targets, pipeline, &self.pass)?;

        Ok((targets_rebuilt, pipeline_built, commands))
    }

    /// Rebuilds the target set when the surface image no longer matches it,
    /// otherwise swaps the new image into the primary slot.
    fn reconcile_targets(&mut self, drawable: &B::Drawable) -> Result<bool, PresentError> {
        let extent = drawable.extent();
        let format = drawable.format();

        let reusable = self.targets.as_ref().is_some_and(|targets| {
            targets.extent() == extent && targets.primary_format() == Some(format)
        });

        if reusable {
            if let Some(targets) = self.targets.as_mut() {
                targets.attach_primary(drawable.image());
            }
            return Ok(false);
        }

        // Stale attachments go before replacements are allocated.
        if let Some(stale) = self.targets.take() {
            log::debug!("surface changed from {} to {extent}, rebuilding targets", stale.extent());
        }

        let backend = &mut self.backend;
        let targets = RenderTargetSet::build(
            &self.config.layout,
            drawable.image(),
            extent,
            format,
            |desc| backend.create_attachment(desc),
        )?;

        log::debug!("render targets built at {extent} ({format:?})");
        self.targets = Some(targets);
        Ok(true)
    }
}

impl<B: Backend> Drop for FramePresenter<B> {
    fn drop(&mut self) {
        self.targets = None;
        self.pipeline = None;
        log::debug!("frame presenter released after {} frames", self.frames_presented);
    }
}

/// Records the fixed triangle draw into `targets`.
fn encode_triangle<B: Backend>(
    backend: &mut B,
    targets: &RenderTargetSet<B::Texture, B::Format>,
    pipeline: Option<&B::Pipeline>,
    pass: &RenderPassDesc,
) -> Result<B::CommandBuffer, PresentError> {
    let extent = targets.extent();

    backend.record(targets, pass, |commands| {
        let pipeline = pipeline.ok_or_else(|| {
            PresentError::pipeline_unavailable("encode attempted before the pipeline was built")
        })?;

        commands.bind_pipeline(pipeline);
        commands.set_viewport(Viewport::covering(extent));
        commands.set_scissor(ScissorRect::covering(extent));
        commands.push_debug_group(DEBUG_GROUP);
        commands.draw(0..TRIANGLE_VERTEX_COUNT, 0..1);
        commands.pop_debug_group();
        Ok(())
    })
}

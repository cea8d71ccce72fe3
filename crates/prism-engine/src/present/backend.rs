use std::fmt;
use std::ops::Range;

use super::error::{AcquireError, BackendError, PresentError};
use super::pipeline::PipelineDesc;
use super::targets::{AttachmentDesc, RenderTargetSet};
use super::types::{ClearColor, ScissorRect, SurfaceSize, Viewport};

/// Per-frame handle to the image that will be shown on screen.
pub trait Drawable {
    type Format;
    type Texture;

    /// Pixel dimensions reported by the surface image.
    fn extent(&self) -> SurfaceSize;

    fn format(&self) -> Self::Format;

    /// Handle to the surface image for use as the primary color attachment.
    fn image(&self) -> Self::Texture;
}

/// Commands accepted by a recording context.
pub trait RenderCommands {
    type Pipeline;

    fn bind_pipeline(&mut self, pipeline: &Self::Pipeline);
    fn set_viewport(&mut self, viewport: Viewport);
    fn set_scissor(&mut self, scissor: ScissorRect);
    fn push_debug_group(&mut self, label: &str);
    fn pop_debug_group(&mut self);
    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>);
}

/// Load/store configuration of the single render pass a frame records.
///
/// Color attachments are cleared and stored; depth is cleared and discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDesc {
    pub label: &'static str,
    pub clear_color: ClearColor,
    pub clear_depth: f32,
}

impl Default for RenderPassDesc {
    fn default() -> Self {
        Self {
            label: "prism frame pass",
            clear_color: ClearColor::WHITE,
            clear_depth: 1.0,
        }
    }
}

/// Graphics device, queue and swapchain as seen by the frame presenter.
pub trait Backend {
    type Format: Copy + Eq + fmt::Debug;
    type Texture;
    type Drawable: Drawable<Format = Self::Format, Texture = Self::Texture>;
    type Pipeline;
    type Commands: RenderCommands<Pipeline = Self::Pipeline>;
    type CommandBuffer;

    /// Obtains the next presentable surface at `size`.
    ///
    /// Implementations reconfigure their swapchain when `size` differs from the
    /// current configuration.
    fn acquire_drawable(&mut self, size: SurfaceSize) -> Result<Self::Drawable, AcquireError>;

    fn create_attachment(
        &mut self,
        desc: &AttachmentDesc<Self::Format>,
    ) -> Result<Self::Texture, BackendError>;

    fn create_pipeline(
        &mut self,
        desc: &PipelineDesc<'_, Self::Format>,
    ) -> Result<Self::Pipeline, BackendError>;

    /// Opens a recording context over `targets`, runs `record` inside it and
    /// closes it.
    ///
    /// The context is released whether or not `record` succeeds; on failure no
    /// command buffer is returned.
    fn record<R>(
        &mut self,
        targets: &RenderTargetSet<Self::Texture, Self::Format>,
        pass: &RenderPassDesc,
        record: R,
    ) -> Result<Self::CommandBuffer, PresentError>
    where
        R: FnOnce(&mut Self::Commands) -> Result<(), PresentError>;

    /// Submits recorded commands and hands `drawable` over for presentation.
    fn submit(&mut self, commands: Self::CommandBuffer, drawable: Self::Drawable);
}

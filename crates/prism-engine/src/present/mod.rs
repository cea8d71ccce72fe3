//! Frame presentation core.
//!
//! Each tick the [`FramePresenter`] walks
//! idle → acquire drawable → reconcile render targets → encode → present.
//! It is generic over a [`Backend`] so the reconciliation logic runs the same
//! against wgpu and against the recording backend used in tests.

mod backend;
mod error;
mod pipeline;
mod presenter;
mod targets;
mod types;

#[cfg(test)]
mod mock;

pub use backend::{Backend, Drawable, RenderCommands, RenderPassDesc};
pub use error::{AcquireError, BackendError, PresentError, SurfaceErrorAction};
pub use pipeline::{PipelineDesc, PipelineState, ShaderSource};
pub use presenter::{FramePresenter, FrameReport, PresenterConfig, TRIANGLE_VERTEX_COUNT};
pub use targets::{
    AttachmentDesc, AttachmentLayout, AttachmentSlot, AttachmentUsage, RenderTargetSet,
    TargetFormats,
};
pub use types::{ClearColor, PrimitiveTopology, ScissorRect, SurfaceSize, Viewport};

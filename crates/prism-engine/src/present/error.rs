use thiserror::Error;

use super::targets::AttachmentSlot;
use super::types::SurfaceSize;

/// High-level response after a presenter error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

/// Why the backend could not hand out a presentable surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquireError {
    #[error("timed out waiting for the next surface image")]
    Timeout,
    #[error("surface is outdated")]
    Outdated,
    #[error("surface was lost")]
    Lost,
    #[error("out of memory while acquiring a surface image")]
    OutOfMemory,
    #[error("surface has zero area")]
    ZeroSized,
    #[error("{0}")]
    Other(String),
}

/// Resource creation failure reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors surfaced by [`FramePresenter::present_frame`](super::FramePresenter::present_frame).
///
/// No variant ever leaves a partially submitted frame behind.
#[derive(Debug, Error)]
pub enum PresentError {
    #[error("surface acquisition failed: {0}")]
    SurfaceAcquisitionFailed(#[from] AcquireError),

    #[error("failed to rebuild render target {slot} at {extent}")]
    TargetRebuildFailed {
        slot: AttachmentSlot,
        extent: SurfaceSize,
        #[source]
        source: BackendError,
    },

    #[error("render pipeline unavailable: {reason}")]
    PipelineUnavailable { reason: String },
}

impl PresentError {
    pub(crate) fn pipeline_unavailable(reason: impl Into<String>) -> Self {
        Self::PipelineUnavailable {
            reason: reason.into(),
        }
    }

    /// Maps the error onto the retry/abort policy used by the runtime.
    pub fn action(&self) -> SurfaceErrorAction {
        match self {
            Self::SurfaceAcquisitionFailed(err) => match err {
                AcquireError::Lost | AcquireError::Outdated => SurfaceErrorAction::Reconfigured,
                AcquireError::OutOfMemory => SurfaceErrorAction::Fatal,
                AcquireError::Timeout | AcquireError::ZeroSized | AcquireError::Other(_) => {
                    SurfaceErrorAction::SkipFrame
                }
            },
            Self::TargetRebuildFailed { .. } => SurfaceErrorAction::Fatal,
            Self::PipelineUnavailable { .. } => SurfaceErrorAction::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acquire(err: AcquireError) -> SurfaceErrorAction {
        PresentError::from(err).action()
    }

    #[test]
    fn lost_and_outdated_resume_after_reconfigure() {
        assert_eq!(acquire(AcquireError::Lost), SurfaceErrorAction::Reconfigured);
        assert_eq!(acquire(AcquireError::Outdated), SurfaceErrorAction::Reconfigured);
    }

    #[test]
    fn transient_acquire_failures_skip_the_frame() {
        assert_eq!(acquire(AcquireError::Timeout), SurfaceErrorAction::SkipFrame);
        assert_eq!(acquire(AcquireError::ZeroSized), SurfaceErrorAction::SkipFrame);
        assert_eq!(
            acquire(AcquireError::Other("driver hiccup".into())),
            SurfaceErrorAction::SkipFrame
        );
    }

    #[test]
    fn out_of_memory_is_fatal() {
        assert_eq!(acquire(AcquireError::OutOfMemory), SurfaceErrorAction::Fatal);
    }

    #[test]
    fn rebuild_and_pipeline_failures_are_fatal() {
        let rebuild = PresentError::TargetRebuildFailed {
            slot: AttachmentSlot::Color(2),
            extent: SurfaceSize::new(1024, 768),
            source: BackendError::new("allocation refused"),
        };
        assert_eq!(rebuild.action(), SurfaceErrorAction::Fatal);
        assert_eq!(
            rebuild.to_string(),
            "failed to rebuild render target color slot 2 at 1024x768"
        );

        let pipeline = PresentError::pipeline_unavailable("not built");
        assert_eq!(pipeline.action(), SurfaceErrorAction::Fatal);
    }
}

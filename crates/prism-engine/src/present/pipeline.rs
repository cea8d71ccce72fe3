use std::borrow::Cow;

use super::targets::TargetFormats;
use super::types::PrimitiveTopology;

/// Shader module text plus its stage entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub label: Cow<'static, str>,
    pub code: Cow<'static, str>,
    pub vertex_entry: Cow<'static, str>,
    pub fragment_entry: Cow<'static, str>,
}

impl ShaderSource {
    /// WGSL-style module with `vs_main` / `fs_main` entry points.
    pub fn new(label: impl Into<Cow<'static, str>>, code: impl Into<Cow<'static, str>>) -> Self {
        Self {
            label: label.into(),
            code: code.into(),
            vertex_entry: Cow::Borrowed("vs_main"),
            fragment_entry: Cow::Borrowed("fs_main"),
        }
    }

    pub fn with_entry_points(
        mut self,
        vertex: impl Into<Cow<'static, str>>,
        fragment: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.vertex_entry = vertex.into();
        self.fragment_entry = fragment.into();
        self
    }
}

/// Everything a backend needs to build a render pipeline.
///
/// Vertex data lives in the shader; pipelines take no vertex buffers.
#[derive(Debug, Clone)]
pub struct PipelineDesc<'a, F> {
    pub label: &'a str,
    pub shader: &'a ShaderSource,
    pub targets: &'a TargetFormats<F>,
    pub topology: PrimitiveTopology,
}

/// A built pipeline together with the target formats it was built for.
pub struct PipelineState<P, F> {
    formats: TargetFormats<F>,
    pipeline: P,
}

impl<P, F: PartialEq> PipelineState<P, F> {
    pub fn new(formats: TargetFormats<F>, pipeline: P) -> Self {
        Self { formats, pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn formats(&self) -> &TargetFormats<F> {
        &self.formats
    }

    /// True if this pipeline can render into targets with `formats`.
    pub fn is_compatible(&self, formats: &TargetFormats<F>) -> bool {
        &self.formats == formats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_entry_points() {
        let src = ShaderSource::new("tri", "// code");
        assert_eq!(src.vertex_entry, "vs_main");
        assert_eq!(src.fragment_entry, "fs_main");

        let src = src.with_entry_points("vs", "fs");
        assert_eq!(src.vertex_entry, "vs");
        assert_eq!(src.fragment_entry, "fs");
    }

    #[test]
    fn compatibility_follows_formats() {
        let formats = TargetFormats {
            colors: vec![Some(1u8), None, Some(1u8)],
            depth: None,
        };
        let state = PipelineState::new(formats.clone(), "pipeline");

        assert!(state.is_compatible(&formats));
        assert!(!state.is_compatible(&TargetFormats {
            colors: vec![Some(2u8)],
            depth: None,
        }));
        assert_eq!(*state.pipeline(), "pipeline");
    }
}

use std::fmt;

use super::error::{BackendError, PresentError};
use super::types::SurfaceSize;

/// Identifies one attachment of a [`RenderTargetSet`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AttachmentSlot {
    Color(usize),
    Depth,
}

impl fmt::Display for AttachmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color(slot) => write!(f, "color slot {slot}"),
            Self::Depth => f.write_str("depth attachment"),
        }
    }
}

/// How an allocated attachment will be used.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AttachmentUsage {
    /// Render attachment that may also be sampled later.
    Color,
    Depth,
}

/// Allocation request for one auxiliary attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentDesc<F> {
    pub label: String,
    pub extent: SurfaceSize,
    pub format: F,
    pub usage: AttachmentUsage,
}

/// Which color slots a target set populates, plus an optional depth format.
///
/// Slot 0 is always populated: it is backed by the presentable surface image.
/// Other populated slots get offscreen attachments of the same size and format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentLayout<F> {
    color_slots: Vec<bool>,
    depth_format: Option<F>,
}

impl<F> AttachmentLayout<F> {
    /// One color attachment (the surface image), no depth.
    pub fn single() -> Self {
        Self {
            color_slots: vec![true],
            depth_format: None,
        }
    }

    /// `slot_count` color slots with every odd slot left empty.
    pub fn sparse(slot_count: usize) -> Self {
        Self {
            color_slots: (0..slot_count.max(1)).map(|slot| slot % 2 == 0).collect(),
            depth_format: None,
        }
    }

    pub fn with_depth(mut self, format: F) -> Self {
        self.depth_format = Some(format);
        self
    }

    pub fn slot_count(&self) -> usize {
        self.color_slots.len()
    }

    pub fn is_populated(&self, slot: usize) -> bool {
        self.color_slots.get(slot).copied().unwrap_or(false)
    }

    /// Populated color slots other than the primary.
    pub fn auxiliary_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.color_slots
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(slot, populated)| populated.then_some(slot))
    }

    pub fn depth_format(&self) -> Option<&F> {
        self.depth_format.as_ref()
    }
}

impl<F> Default for AttachmentLayout<F> {
    fn default() -> Self {
        Self::single()
    }
}

/// Attachment formats a pipeline must be compatible with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFormats<F> {
    pub colors: Vec<Option<F>>,
    pub depth: Option<F>,
}

/// Attachments a frame renders into, all sharing one extent.
///
/// Color slots form a sparse mapping: `colors[i]` is `None` for unpopulated
/// slots. The primary slot only holds an image between [`attach_primary`] and
/// [`release_primary`], i.e. for the duration of one frame.
///
/// [`attach_primary`]: RenderTargetSet::attach_primary
/// [`release_primary`]: RenderTargetSet::release_primary
pub struct RenderTargetSet<T, F> {
    extent: SurfaceSize,
    formats: TargetFormats<F>,
    colors: Vec<Option<T>>,
    depth: Option<T>,
}

impl<T, F: Copy> RenderTargetSet<T, F> {
    /// Builds a set around `primary`, allocating every auxiliary attachment at
    /// `extent` through `allocate`.
    ///
    /// Attachments allocated before a failure are dropped with the partial set.
    pub fn build<A>(
        layout: &AttachmentLayout<F>,
        primary: T,
        extent: SurfaceSize,
        format: F,
        mut allocate: A,
    ) -> Result<Self, PresentError>
    where
        A: FnMut(&AttachmentDesc<F>) -> Result<T, BackendError>,
    {
        let mut colors: Vec<Option<T>> = Vec::with_capacity(layout.slot_count());
        colors.push(Some(primary));
        colors.resize_with(layout.slot_count(), || None);

        let mut color_formats = vec![None; layout.slot_count()];
        color_formats[0] = Some(format);

        for slot in layout.auxiliary_slots() {
            let desc = AttachmentDesc {
                label: format!("prism color attachment {slot}"),
                extent,
                format,
                usage: AttachmentUsage::Color,
            };
            let texture = allocate(&desc).map_err(|source| PresentError::TargetRebuildFailed {
                slot: AttachmentSlot::Color(slot),
                extent,
                source,
            })?;
            colors[slot] = Some(texture);
            color_formats[slot] = Some(format);
        }

        let depth_format = layout.depth_format().copied();
        let depth = match depth_format {
            Some(depth_format) => {
                let desc = AttachmentDesc {
                    label: "prism depth attachment".to_string(),
                    extent,
                    format: depth_format,
                    usage: AttachmentUsage::Depth,
                };
                let texture =
                    allocate(&desc).map_err(|source| PresentError::TargetRebuildFailed {
                        slot: AttachmentSlot::Depth,
                        extent,
                        source,
                    })?;
                Some(texture)
            }
            None => None,
        };

        Ok(Self {
            extent,
            formats: TargetFormats {
                colors: color_formats,
                depth: depth_format,
            },
            colors,
            depth,
        })
    }

    pub fn primary_format(&self) -> Option<F> {
        self.formats.colors.first().copied().flatten()
    }
}

impl<T, F> RenderTargetSet<T, F> {
    pub fn extent(&self) -> SurfaceSize {
        self.extent
    }

    pub fn formats(&self) -> &TargetFormats<F> {
        &self.formats
    }

    /// Surface image for the frame being encoded, if one is attached.
    pub fn primary(&self) -> Option<&T> {
        self.color(0)
    }

    pub fn color(&self, slot: usize) -> Option<&T> {
        self.colors.get(slot).and_then(Option::as_ref)
    }

    /// All color slots in index order, `None` for unpopulated slots.
    pub fn color_slots(&self) -> &[Option<T>] {
        &self.colors
    }

    pub fn depth(&self) -> Option<&T> {
        self.depth.as_ref()
    }

    /// Swaps in this frame's surface image, keeping auxiliary attachments.
    pub fn attach_primary(&mut self, image: T) {
        if let Some(primary) = self.colors.first_mut() {
            *primary = Some(image);
        }
    }

    /// Drops the reference to the presented surface image.
    pub fn release_primary(&mut self) -> Option<T> {
        self.colors.first_mut().and_then(Option::take)
    }
}

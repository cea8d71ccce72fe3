//! Recording backend for presenter tests.

use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;

use super::backend::{Backend, Drawable, RenderCommands, RenderPassDesc};
use super::error::{AcquireError, BackendError, PresentError};
use super::pipeline::PipelineDesc;
use super::targets::{AttachmentDesc, RenderTargetSet, TargetFormats};
use super::types::{PrimitiveTopology, ScissorRect, SurfaceSize, Viewport};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MockFormat {
    Bgra8,
    Rgba8,
    Depth32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Acquired { drawable: u32, extent: SurfaceSize },
    AttachmentCreated { id: u32, label: String, extent: SurfaceSize },
    AttachmentReleased { id: u32 },
    PipelineCreated { id: u32, targets: TargetFormats<MockFormat> },
    RecordOpened { extent: SurfaceSize, primary: Option<u32>, colors: Vec<Option<u32>> },
    RecordClosed,
    BindPipeline { id: u32 },
    SetViewport(Viewport),
    SetScissor(ScissorRect),
    PushDebugGroup(String),
    PopDebugGroup,
    Draw { topology: Option<PrimitiveTopology>, vertices: Range<u32>, instances: Range<u32> },
    Submitted { drawable: u32 },
    BackendDropped,
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

/// Texture handle: either a surface image or an allocated attachment.
///
/// Only allocated attachments report their release.
#[derive(Debug)]
pub struct MockTexture {
    pub id: u32,
    pub extent: SurfaceSize,
    log: Option<EventLog>,
}

impl Drop for MockTexture {
    fn drop(&mut self) {
        if let Some(log) = &self.log {
            log.borrow_mut().push(Event::AttachmentReleased { id: self.id });
        }
    }
}

#[derive(Debug)]
pub struct MockDrawable {
    pub id: u32,
    extent: SurfaceSize,
    format: MockFormat,
}

impl Drawable for MockDrawable {
    type Format = MockFormat;
    type Texture = MockTexture;

    fn extent(&self) -> SurfaceSize {
        self.extent
    }

    fn format(&self) -> MockFormat {
        self.format
    }

    fn image(&self) -> MockTexture {
        MockTexture {
            id: self.id,
            extent: self.extent,
            log: None,
        }
    }
}

#[derive(Debug)]
pub struct MockPipeline {
    pub id: u32,
    topology: PrimitiveTopology,
}

pub struct MockCommands {
    log: EventLog,
    bound: Option<PrimitiveTopology>,
}

impl MockCommands {
    fn push(&self, event: Event) {
        self.log.borrow_mut().push(event);
    }
}

impl RenderCommands for MockCommands {
    type Pipeline = MockPipeline;

    fn bind_pipeline(&mut self, pipeline: &MockPipeline) {
        self.bound = Some(pipeline.topology);
        self.push(Event::BindPipeline { id: pipeline.id });
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.push(Event::SetViewport(viewport));
    }

    fn set_scissor(&mut self, scissor: ScissorRect) {
        self.push(Event::SetScissor(scissor));
    }

    fn push_debug_group(&mut self, label: &str) {
        self.push(Event::PushDebugGroup(label.to_string()));
    }

    fn pop_debug_group(&mut self) {
        self.push(Event::PopDebugGroup);
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.push(Event::Draw {
            topology: self.bound,
            vertices,
            instances,
        });
    }
}

pub struct MockCommandBuffer;

/// Backend double that logs every call into a shared [`EventLog`].
pub struct MockBackend {
    log: EventLog,
    next_id: u32,
    pub format: MockFormat,
    /// Returned (once) by the next acquire instead of a drawable.
    pub acquire_failure: Option<AcquireError>,
    /// Extent reported by drawables instead of the requested size.
    pub extent_override: Option<SurfaceSize>,
    /// Attachment allocations fail while this is set.
    pub attachment_failure: Option<BackendError>,
    pub pipeline_failure: Option<BackendError>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            log: EventLog::default(),
            next_id: 1,
            format: MockFormat::Bgra8,
            acquire_failure: None,
            extent_override: None,
            attachment_failure: None,
            pipeline_failure: None,
        }
    }

    pub fn log(&self) -> EventLog {
        Rc::clone(&self.log)
    }

    fn push(&self, event: Event) {
        self.log.borrow_mut().push(event);
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.push(Event::BackendDropped);
    }
}

impl Backend for MockBackend {
    type Format = MockFormat;
    type Texture = MockTexture;
    type Drawable = MockDrawable;
    type Pipeline = MockPipeline;
    type Commands = MockCommands;
    type CommandBuffer = MockCommandBuffer;

    fn acquire_drawable(&mut self, size: SurfaceSize) -> Result<MockDrawable, AcquireError> {
        if let Some(err) = self.acquire_failure.take() {
            return Err(err);
        }

        let drawable = MockDrawable {
            id: self.next_id(),
            extent: self.extent_override.unwrap_or(size),
            format: self.format,
        };
        self.push(Event::Acquired {
            drawable: drawable.id,
            extent: drawable.extent,
        });
        Ok(drawable)
    }

    fn create_attachment(
        &mut self,
        desc: &AttachmentDesc<MockFormat>,
    ) -> Result<MockTexture, BackendError> {
        if let Some(err) = self.attachment_failure.clone() {
            return Err(err);
        }

        let id = self.next_id();
        self.push(Event::AttachmentCreated {
            id,
            label: desc.label.clone(),
            extent: desc.extent,
        });
        Ok(MockTexture {
            id,
            extent: desc.extent,
            log: Some(self.log()),
        })
    }

    fn create_pipeline(
        &mut self,
        desc: &PipelineDesc<'_, MockFormat>,
    ) -> Result<MockPipeline, BackendError> {
        if let Some(err) = self.pipeline_failure.clone() {
            return Err(err);
        }

        let id = self.next_id();
        self.push(Event::PipelineCreated {
            id,
            targets: desc.targets.clone(),
        });
        Ok(MockPipeline {
            id,
            topology: desc.topology,
        })
    }

    fn record<R>(
        &mut self,
        targets: &RenderTargetSet<MockTexture, MockFormat>,
        _pass: &RenderPassDesc,
        record: R,
    ) -> Result<MockCommandBuffer, PresentError>
    where
        R: FnOnce(&mut MockCommands) -> Result<(), PresentError>,
    {
        self.push(Event::RecordOpened {
            extent: targets.extent(),
            primary: targets.primary().map(|t| t.id),
            colors: targets
                .color_slots()
                .iter()
                .map(|slot| slot.as_ref().map(|t| t.id))
                .collect(),
        });

        let mut commands = MockCommands {
            log: self.log(),
            bound: None,
        };
        let result = record(&mut commands);

        self.push(Event::RecordClosed);
        result.map(|()| MockCommandBuffer)
    }

    fn submit(&mut self, _commands: MockCommandBuffer, drawable: MockDrawable) {
        self.push(Event::Submitted {
            drawable: drawable.id,
        });
    }
}

//! wgpu implementation of the presenter backend.

use std::ops::Range;

use super::{Gpu, surface};
use crate::present::{
    AcquireError, AttachmentDesc, AttachmentLayout, AttachmentUsage, Backend, BackendError,
    Drawable, PipelineDesc, PresentError, PrimitiveTopology, RenderCommands, RenderPassDesc,
    RenderTargetSet, ScissorRect, SurfaceSize, Viewport,
};

/// A texture together with the view render passes bind.
#[derive(Debug, Clone)]
pub struct GpuAttachment {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// One acquired swapchain image.
///
/// Presenting consumes it; dropping it unpresented discards the image.
pub struct GpuDrawable {
    frame: wgpu::SurfaceTexture,
    image: GpuAttachment,
}

impl Drawable for GpuDrawable {
    type Format = wgpu::TextureFormat;
    type Texture = GpuAttachment;

    fn extent(&self) -> SurfaceSize {
        SurfaceSize::new(self.frame.texture.width(), self.frame.texture.height())
    }

    fn format(&self) -> wgpu::TextureFormat {
        self.frame.texture.format()
    }

    fn image(&self) -> GpuAttachment {
        self.image.clone()
    }
}

/// Recording context over a single render pass.
pub struct GpuCommands {
    pass: wgpu::RenderPass<'static>,
}

impl RenderCommands for GpuCommands {
    type Pipeline = wgpu::RenderPipeline;

    fn bind_pipeline(&mut self, pipeline: &wgpu::RenderPipeline) {
        self.pass.set_pipeline(pipeline);
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.pass.set_viewport(
            viewport.x,
            viewport.y,
            viewport.width,
            viewport.height,
            viewport.min_depth,
            viewport.max_depth,
        );
    }

    fn set_scissor(&mut self, scissor: ScissorRect) {
        self.pass
            .set_scissor_rect(scissor.x, scissor.y, scissor.width, scissor.height);
    }

    fn push_debug_group(&mut self, label: &str) {
        self.pass.push_debug_group(label);
    }

    fn pop_debug_group(&mut self) {
        self.pass.pop_debug_group();
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.pass.draw(vertices, instances);
    }
}

impl<'w> Backend for Gpu<'w> {
    type Format = wgpu::TextureFormat;
    type Texture = GpuAttachment;
    type Drawable = GpuDrawable;
    type Pipeline = wgpu::RenderPipeline;
    type Commands = GpuCommands;
    type CommandBuffer = wgpu::CommandBuffer;

    fn acquire_drawable(&mut self, size: SurfaceSize) -> Result<GpuDrawable, AcquireError> {
        if let Some(new_size) = surface::reconfigure_size(size, self.size()) {
            self.resize(new_size);
        }

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(err) => return Err(self.handle_surface_error(err)),
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let image = GpuAttachment {
            texture: frame.texture.clone(),
            view,
        };

        Ok(GpuDrawable { frame, image })
    }

    fn create_attachment(
        &mut self,
        desc: &AttachmentDesc<wgpu::TextureFormat>,
    ) -> Result<GpuAttachment, BackendError> {
        create_attachment(&self.device, desc)
    }

    fn create_pipeline(
        &mut self,
        desc: &PipelineDesc<'_, wgpu::TextureFormat>,
    ) -> Result<wgpu::RenderPipeline, BackendError> {
        create_pipeline(&self.device, desc)
    }

    fn record<R>(
        &mut self,
        targets: &RenderTargetSet<GpuAttachment, wgpu::TextureFormat>,
        pass: &RenderPassDesc,
        record: R,
    ) -> Result<wgpu::CommandBuffer, PresentError>
    where
        R: FnOnce(&mut GpuCommands) -> Result<(), PresentError>,
    {
        let clear = pass.clear_color;
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment<'_>>> = targets
            .color_slots()
            .iter()
            .map(|slot| {
                slot.as_ref().map(|attachment| wgpu::RenderPassColorAttachment {
                    view: &attachment.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear.r,
                            g: clear.g,
                            b: clear.b,
                            a: clear.a,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })
            })
            .collect();

        let depth_stencil_attachment =
            targets
                .depth()
                .map(|attachment| wgpu::RenderPassDepthStencilAttachment {
                    view: &attachment.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(pass.clear_depth),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("prism frame encoder"),
            });

        // The pass ends when `commands` drops, before the encoder is finished.
        let recorded = {
            let render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some(pass.label),
                    color_attachments: &color_attachments,
                    depth_stencil_attachment,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                })
                .forget_lifetime();

            let mut commands = GpuCommands { pass: render_pass };
            record(&mut commands)
        };

        let buffer = encoder.finish();
        recorded.map(|()| buffer)
    }

    fn submit(&mut self, commands: wgpu::CommandBuffer, drawable: GpuDrawable) {
        self.queue.submit(std::iter::once(commands));

        let GpuDrawable { frame, image } = drawable;
        drop(image);

        self.window.pre_present_notify();
        frame.present();
    }
}

impl Gpu<'_> {
    /// Rejects layouts with more color slots than the device can bind.
    pub fn check_layout(
        &self,
        layout: &AttachmentLayout<wgpu::TextureFormat>,
    ) -> Result<(), BackendError> {
        check_color_slots(layout.slot_count(), &self.device.limits())
    }
}

/// Runs `create` inside out-of-memory, internal and validation error scopes.
///
/// Errors caught by the scopes come back as a [`BackendError`] instead of
/// reaching the device's uncaptured-error handler.
pub(crate) fn capture_errors<T>(
    device: &wgpu::Device,
    what: &str,
    create: impl FnOnce() -> T,
) -> Result<T, BackendError> {
    let out_of_memory = device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    let internal = device.push_error_scope(wgpu::ErrorFilter::Internal);
    let validation = device.push_error_scope(wgpu::ErrorFilter::Validation);

    let value = create();

    // Scopes pop innermost first.
    let validation = pop_scope(validation);
    let internal = pop_scope(internal);
    let out_of_memory = pop_scope(out_of_memory);

    match validation.or(internal).or(out_of_memory) {
        Some(err) => Err(BackendError::new(format!("{what}: {err}"))),
        None => Ok(value),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn pop_scope(scope: wgpu::ErrorScopeGuard) -> Option<wgpu::Error> {
    pollster::block_on(scope.pop())
}

/// The browser main thread cannot block. WebGL scopes resolve immediately;
/// a WebGPU scope that is still pending is reported as clean.
#[cfg(target_arch = "wasm32")]
fn pop_scope(scope: wgpu::ErrorScopeGuard) -> Option<wgpu::Error> {
    use std::future::Future;
    use std::task::{Context, Poll, Waker};

    let mut popped = std::pin::pin!(scope.pop());
    match popped.as_mut().poll(&mut Context::from_waker(Waker::noop())) {
        Poll::Ready(err) => err,
        Poll::Pending => None,
    }
}

pub(crate) fn check_attachment_extent(
    desc: &AttachmentDesc<wgpu::TextureFormat>,
    limits: &wgpu::Limits,
) -> Result<(), BackendError> {
    let max = limits.max_texture_dimension_2d;
    if desc.extent.is_empty() || desc.extent.width > max || desc.extent.height > max {
        return Err(BackendError::new(format!(
            "{} cannot be {} (device limit {max})",
            desc.label, desc.extent
        )));
    }
    Ok(())
}

pub(crate) fn check_color_slots(count: usize, limits: &wgpu::Limits) -> Result<(), BackendError> {
    let max = limits.max_color_attachments as usize;
    if count > max {
        return Err(BackendError::new(format!(
            "{count} color slots requested, device supports {max}"
        )));
    }
    Ok(())
}

fn create_attachment(
    device: &wgpu::Device,
    desc: &AttachmentDesc<wgpu::TextureFormat>,
) -> Result<GpuAttachment, BackendError> {
    check_attachment_extent(desc, &device.limits())?;

    let usage = match desc.usage {
        AttachmentUsage::Color => {
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING
        }
        AttachmentUsage::Depth => wgpu::TextureUsages::RENDER_ATTACHMENT,
    };

    let texture = capture_errors(device, &desc.label, || {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label.as_str()),
            size: wgpu::Extent3d {
                width: desc.extent.width,
                height: desc.extent.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage,
            view_formats: &[],
        })
    })?;
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    Ok(GpuAttachment { texture, view })
}

fn create_pipeline(
    device: &wgpu::Device,
    desc: &PipelineDesc<'_, wgpu::TextureFormat>,
) -> Result<wgpu::RenderPipeline, BackendError> {
    if desc.targets.colors.iter().all(Option::is_none) {
        return Err(BackendError::new("pipeline has no color targets"));
    }
    check_color_slots(desc.targets.colors.len(), &device.limits())?;

    // The fragment stage only writes location 0; auxiliary slots are
    // cleared by the pass and left untouched by the draw.
    let color_targets: Vec<Option<wgpu::ColorTargetState>> = desc
        .targets
        .colors
        .iter()
        .enumerate()
        .map(|(slot, format)| {
            format.map(|format| wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: if slot == 0 {
                    wgpu::ColorWrites::ALL
                } else {
                    wgpu::ColorWrites::empty()
                },
            })
        })
        .collect();

    let depth_stencil = desc.targets.depth.map(|format| wgpu::DepthStencilState {
        format,
        depth_write_enabled: false,
        depth_compare: wgpu::CompareFunction::Always,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    });

    capture_errors(device, desc.label, || {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&*desc.shader.label),
            source: wgpu::ShaderSource::Wgsl(desc.shader.code.clone()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.label),
            bind_group_layouts: &[],
            immediate_size: 0,
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: Some(&layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some(&*desc.shader.vertex_entry),
                compilation_options: Default::default(),
                buffers: &[],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some(&*desc.shader.fragment_entry),
                compilation_options: Default::default(),
                targets: &color_targets,
            }),

            primitive: wgpu::PrimitiveState {
                topology: map_topology(desc.topology),
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    })
}

fn map_topology(topology: PrimitiveTopology) -> wgpu::PrimitiveTopology {
    match topology {
        PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::present::{ShaderSource, TargetFormats};

    const TRIANGLE_WGSL: &str = r#"
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    let x = f32(i32(index) - 1) * 0.6;
    return vec4<f32>(x, 0.0, 0.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.0, 0.0, 1.0);
}
"#;

    fn noop_device() -> wgpu::Device {
        let (device, _queue) = wgpu::Device::noop(&wgpu::DeviceDescriptor::default());
        device
    }

    fn color_desc(width: u32, height: u32) -> AttachmentDesc<wgpu::TextureFormat> {
        AttachmentDesc {
            label: "prism color attachment 2".to_string(),
            extent: SurfaceSize::new(width, height),
            format: wgpu::TextureFormat::Bgra8UnormSrgb,
            usage: AttachmentUsage::Color,
        }
    }

    #[test]
    fn topology_maps_onto_wgpu() {
        assert_eq!(
            map_topology(PrimitiveTopology::TriangleList),
            wgpu::PrimitiveTopology::TriangleList
        );
    }

    #[test]
    fn attachment_extent_respects_device_limit() {
        let limits = wgpu::Limits::default();
        let max = limits.max_texture_dimension_2d;

        assert!(check_attachment_extent(&color_desc(800, 600), &limits).is_ok());
        assert!(check_attachment_extent(&color_desc(max, max), &limits).is_ok());

        let err = check_attachment_extent(&color_desc(max + 1, 600), &limits).unwrap_err();
        assert!(err.to_string().contains("prism color attachment 2"));
        assert!(check_attachment_extent(&color_desc(0, 600), &limits).is_err());
    }

    #[test]
    fn color_slots_respect_device_limit() {
        let limits = wgpu::Limits::default();
        let max = limits.max_color_attachments as usize;

        assert!(check_color_slots(4, &limits).is_ok());
        assert!(check_color_slots(max, &limits).is_ok());
        assert!(check_color_slots(max + 1, &limits).is_err());
    }

    #[test]
    fn valid_work_passes_through_error_scopes() {
        let device = noop_device();

        let module = capture_errors(&device, "triangle shader", || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("triangle"),
                source: wgpu::ShaderSource::Wgsl(TRIANGLE_WGSL.into()),
            })
        });
        assert!(module.is_ok());
    }

    #[test]
    fn invalid_texture_is_reported_instead_of_panicking() {
        let device = noop_device();

        let result = capture_errors(&device, "empty texture", || {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("empty texture"),
                size: wgpu::Extent3d {
                    width: 0,
                    height: 0,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
        });

        let err = result.unwrap_err();
        assert!(err.to_string().starts_with("empty texture: "));
    }

    #[test]
    fn broken_shader_fails_pipeline_creation() {
        let device = noop_device();
        let shader = ShaderSource::new("broken", "this is not wgsl");
        let targets = TargetFormats {
            colors: vec![Some(wgpu::TextureFormat::Bgra8UnormSrgb)],
            depth: None,
        };
        let desc = PipelineDesc {
            label: "prism triangle pipeline",
            shader: &shader,
            targets: &targets,
            topology: PrimitiveTopology::TriangleList,
        };

        let err = create_pipeline(&device, &desc).unwrap_err();
        assert!(err.to_string().starts_with("prism triangle pipeline: "));
    }

    #[test]
    fn too_many_color_slots_fail_before_touching_the_device() {
        let device = noop_device();
        let shader = ShaderSource::new("triangle", TRIANGLE_WGSL);
        let slots = device.limits().max_color_attachments as usize + 1;
        let targets = TargetFormats {
            colors: vec![Some(wgpu::TextureFormat::Bgra8UnormSrgb); slots],
            depth: None,
        };
        let desc = PipelineDesc {
            label: "prism triangle pipeline",
            shader: &shader,
            targets: &targets,
            topology: PrimitiveTopology::TriangleList,
        };

        let err = create_pipeline(&device, &desc).unwrap_err();
        assert!(err.to_string().contains("color slots"));
    }
}

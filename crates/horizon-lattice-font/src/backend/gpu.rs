//! wgpu rendering backend.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use parking_lot::Mutex;
use tracing::{debug, info};
use wgpu::util::DeviceExt;

use super::{
    BufferPairId, ProgramKind, RenderBackend, RenderTarget, TargetId, TextDrawCall, TextureId,
};
use crate::error::{FontError, FontResult};
use crate::layout::TextVertex;

/// Configuration for creating a standalone graphics device.
#[derive(Debug, Clone)]
pub struct GraphicsConfig {
    /// Preferred GPU backends to use.
    pub backends: wgpu::Backends,
    /// Power preference for adapter selection.
    pub power_preference: wgpu::PowerPreference,
    /// Enable debug validation layers.
    pub debug_validation: bool,
    /// Format of offscreen render targets.
    pub target_format: wgpu::TextureFormat,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::PRIMARY,
            power_preference: wgpu::PowerPreference::HighPerformance,
            debug_validation: cfg!(debug_assertions),
            target_format: wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// Uniforms shared by both text programs.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct TextUniforms {
    matrix: [[f32; 4]; 4],
    color: [f32; 4],
    scale: f32,
    _padding: [f32; 3],
}

const VERTEX_ATTRIBS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
    0 => Float32x2, // position
    1 => Float32x2, // uv
];

fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: TextVertex::STRIDE as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBS,
    }
}

struct AtlasTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

struct GeometryBufferPair {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
}

struct OffscreenTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

#[derive(Default)]
struct Resources {
    next_id: u64,
    textures: HashMap<TextureId, AtlasTexture>,
    buffers: HashMap<BufferPairId, GeometryBufferPair>,
    targets: HashMap<TargetId, OffscreenTarget>,
}

impl Resources {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Renders text with wgpu.
///
/// Atlas textures are single-channel (`R8Unorm`) and sampled with linear
/// filtering. Each draw is submitted immediately and loads the existing
/// contents of the target.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target_format: wgpu::TextureFormat,
    textured_pipeline: wgpu::RenderPipeline,
    distance_field_pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    atlas_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    resources: Mutex<Resources>,
}

impl WgpuBackend {
    /// Build the text pipelines on an existing device.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        target_format: wgpu::TextureFormat,
    ) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("font_uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let atlas_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("font_atlas_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("font_pipeline_layout"),
            bind_group_layouts: &[&uniform_layout, &atlas_layout],
            push_constant_ranges: &[],
        });

        let textured_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            target_format,
            "font_textured",
            include_str!("../shaders/text.wgsl"),
        );
        let distance_field_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            target_format,
            "font_distance_field",
            include_str!("../shaders/text_sdf.wgsl"),
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("font_atlas_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        debug!(
            target: "horizon_lattice_font::wgpu",
            format = ?target_format,
            "created text pipelines"
        );

        Self {
            device,
            queue,
            target_format,
            textured_pipeline,
            distance_field_pipeline,
            uniform_layout,
            atlas_layout,
            sampler,
            resources: Mutex::new(Resources::default()),
        }
    }

    /// Create a device of its own and build the pipelines on it.
    ///
    /// Intended for offscreen rendering and tools; applications with a
    /// window pass their device to [`new`](Self::new) instead.
    pub fn headless(config: &GraphicsConfig) -> FontResult<Self> {
        let flags = if config.debug_validation {
            wgpu::InstanceFlags::debugging()
        } else {
            wgpu::InstanceFlags::empty()
        };

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: config.backends,
            flags,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: config.power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(FontError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        info!(
            target: "horizon_lattice_font::wgpu",
            name = adapter_info.name,
            backend = ?adapter_info.backend,
            "selected graphics adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("horizon-lattice-font-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))?;

        Ok(Self::new(device, queue, config.target_format))
    }

    /// The logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Format of render targets this backend draws into.
    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }

    /// Register an existing texture view as a render target.
    ///
    /// The view must have the backend's target format.
    pub fn register_target(
        &self,
        texture: wgpu::Texture,
        view: wgpu::TextureView,
    ) -> RenderTarget {
        let size = texture.size();
        let mut resources = self.resources.lock();
        let id = TargetId(resources.next_id());
        resources.targets.insert(
            id,
            OffscreenTarget {
                _texture: texture,
                view,
            },
        );
        RenderTarget::new(id, size.width, size.height)
    }

    /// Forget a render target.
    pub fn delete_target(&self, target: &RenderTarget) {
        self.resources.lock().targets.remove(&target.id);
    }

    /// Block until submitted work has finished.
    pub fn wait_idle(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    label: &str,
    source: &str,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[vertex_buffer_layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

impl RenderBackend for WgpuBackend {
    fn create_atlas_texture(&self, width: u32, height: u32, data: &[u8]) -> FontResult<TextureId> {
        if (width as usize).checked_mul(height as usize) != Some(data.len()) {
            return Err(FontError::Backend(format!(
                "atlas data is {} bytes, expected {}x{}",
                data.len(),
                width,
                height
            )));
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("font_atlas"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("font_atlas_bind_group"),
            layout: &self.atlas_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let mut resources = self.resources.lock();
        let id = TextureId(resources.next_id());
        resources.textures.insert(
            id,
            AtlasTexture {
                _texture: texture,
                bind_group,
            },
        );
        Ok(id)
    }

    fn delete_texture(&self, texture: TextureId) {
        // Dropping the wgpu handles releases the GPU memory
        self.resources.lock().textures.remove(&texture);
    }

    fn create_geometry_buffers(&self, vertices: &[u8], indices: &[u8]) -> FontResult<BufferPairId> {
        if vertices.is_empty() || indices.is_empty() {
            return Err(FontError::Backend("empty geometry upload".into()));
        }

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("font_text_vertices"),
                contents: vertices,
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("font_text_indices"),
                contents: indices,
                usage: wgpu::BufferUsages::INDEX,
            });

        let mut resources = self.resources.lock();
        let id = BufferPairId(resources.next_id());
        resources.buffers.insert(
            id,
            GeometryBufferPair {
                vertices: vertex_buffer,
                indices: index_buffer,
            },
        );
        Ok(id)
    }

    fn delete_geometry_buffers(&self, buffers: BufferPairId) {
        if let Some(pair) = self.resources.lock().buffers.remove(&buffers) {
            pair.vertices.destroy();
            pair.indices.destroy();
        }
    }

    fn create_target(&self, width: u32, height: u32) -> FontResult<RenderTarget> {
        if width == 0 || height == 0 {
            return Err(FontError::Backend(format!(
                "invalid target size {width}x{height}"
            )));
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("font_offscreen_target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.target_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(self.register_target(texture, view))
    }

    fn draw_text(&self, target: &RenderTarget, call: &TextDrawCall) -> FontResult<()> {
        let resources = self.resources.lock();
        let offscreen = resources
            .targets
            .get(&target.id)
            .ok_or(FontError::UnknownTarget)?;
        let atlas = resources
            .textures
            .get(&call.texture)
            .ok_or_else(|| FontError::Backend(format!("unknown texture {:?}", call.texture)))?;
        let geometry = resources
            .buffers
            .get(&call.buffers)
            .ok_or_else(|| FontError::Backend(format!("unknown buffers {:?}", call.buffers)))?;

        let uniforms = TextUniforms {
            matrix: call.matrix.to_cols_array_2d(),
            color: call.color.to_array(),
            scale: call.scale,
            _padding: [0.0; 3],
        };
        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("font_uniforms"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let uniform_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("font_uniform_bind_group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline = match call.program {
            ProgramKind::Textured => &self.textured_pipeline,
            ProgramKind::DistanceField => &self.distance_field_pipeline,
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("font_text_encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("font_text_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &offscreen.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_viewport(
                0.0,
                0.0,
                target.width as f32,
                target.height as f32,
                0.0,
                1.0,
            );
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &uniform_bind_group, &[]);
            render_pass.set_bind_group(1, &atlas.bind_group, &[]);
            render_pass.set_vertex_buffer(0, geometry.vertices.slice(..));
            render_pass.set_index_buffer(geometry.indices.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..call.index_count, 0, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let resources = self.resources.lock();
        f.debug_struct("WgpuBackend")
            .field("target_format", &self.target_format)
            .field("textures", &resources.textures.len())
            .field("buffers", &resources.buffers.len())
            .field("targets", &resources.targets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use glam::Mat4;

    use super::*;
    use crate::types::Color;

    #[test]
    fn test_uniform_layout_size() {
        // WGSL rounds the uniform struct up to a multiple of 16
        assert_eq!(std::mem::size_of::<TextUniforms>(), 96);
    }

    #[test]
    #[ignore = "requires GPU"]
    fn test_draw_into_offscreen_target() {
        let backend = WgpuBackend::headless(&GraphicsConfig::default()).unwrap();
        let target = backend.create_target(64, 32).unwrap();
        let texture = backend.create_atlas_texture(2, 2, &[255; 4]).unwrap();

        let vertices = [
            TextVertex { position: [0.0, 0.0], uv: [0.0, 0.0] },
            TextVertex { position: [8.0, 0.0], uv: [1.0, 0.0] },
            TextVertex { position: [0.0, 8.0], uv: [0.0, 1.0] },
            TextVertex { position: [8.0, 8.0], uv: [1.0, 1.0] },
        ];
        let indices: [u32; 6] = [0, 1, 2, 1, 3, 2];
        let buffers = backend
            .create_geometry_buffers(
                bytemuck::cast_slice(&vertices),
                bytemuck::cast_slice(&indices),
            )
            .unwrap();

        for program in [ProgramKind::Textured, ProgramKind::DistanceField] {
            let call = TextDrawCall {
                program,
                texture,
                buffers,
                index_count: 6,
                matrix: target.text_matrix(4.0, 4.0, 1.0),
                scale: 1.0,
                color: Color::WHITE,
            };
            backend.draw_text(&target, &call).unwrap();
        }
        backend.wait_idle();

        backend.delete_geometry_buffers(buffers);
        backend.delete_texture(texture);
        backend.delete_target(&target);
    }

    #[test]
    #[ignore = "requires GPU"]
    fn test_unknown_target_is_rejected() {
        let backend = WgpuBackend::headless(&GraphicsConfig::default()).unwrap();
        let call = TextDrawCall {
            program: ProgramKind::Textured,
            texture: TextureId(1),
            buffers: BufferPairId(2),
            index_count: 6,
            matrix: Mat4::IDENTITY,
            scale: 1.0,
            color: Color::BLACK,
        };
        let stranger = RenderTarget::new(TargetId(42), 8, 8);
        assert!(matches!(
            backend.draw_text(&stranger, &call),
            Err(FontError::UnknownTarget)
        ));
    }
}

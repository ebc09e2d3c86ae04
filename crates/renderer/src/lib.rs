//! Renderer: wgpu init + depth + textured/lit mesh instances.
//! wgpu = 26.x, winit = 0.30.x

use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use asset::{IndexedMeshData, MeshData, MeshVertex, TextureData};
use bytemuck::{Pod, Zeroable};
use corelib::frame::FrameParams;
use glam::{Mat4, Vec3};
use wgpu::{
    BindGroup, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType,
    BlendState, Buffer, BufferBindingType, BufferUsages, ColorTargetState, ColorWrites,
    CommandEncoderDescriptor, DepthBiasState, DepthStencilState, Device, DeviceDescriptor,
    Extent3d, Features, FragmentState, Instance, InstanceDescriptor, Limits, LoadOp, Operations,
    PipelineLayoutDescriptor, PowerPreference, PresentMode, Queue, RenderPassColorAttachment,
    RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor, Sampler, ShaderModuleDescriptor,
    ShaderSource, ShaderStages, StoreOp, Surface, SurfaceConfiguration, SurfaceError,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor, VertexBufferLayout, VertexState, VertexStepMode, util::DeviceExt,
};
use winit::{dpi::PhysicalSize, window::Window};

pub const LIGHT_POS: Vec3 = Vec3::new(1.2, 1.0, 2.0);
pub const LIGHT_COLOR: Vec3 = Vec3::ONE;
pub const SHININESS: f32 = 32.0;
pub const AMBIENT: f32 = 0.1;

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
const CLEAR_COLOR: wgpu::Color = wgpu::Color::WHITE;

const MESH_ATTRIBUTES: [wgpu::VertexAttribute; 4] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2, 3 => Float32x3];

/// Layout of [`MeshVertex`]: position, color, uv, normal.
pub const MESH_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: std::mem::size_of::<MeshVertex>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &MESH_ATTRIBUTES,
};

/// Which shading paths the fragment shader takes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderSettings {
    pub textured: bool,
    pub lit: bool,
}

/// Geometry handed to the GPU, either face-corner expanded or indexed.
#[derive(Clone, Debug)]
pub enum MeshUpload {
    Expanded(MeshData),
    Indexed(IndexedMeshData),
}

impl MeshUpload {
    pub fn vertex_count(&self) -> usize {
        match self {
            MeshUpload::Expanded(mesh) => mesh.vertex_count(),
            MeshUpload::Indexed(mesh) => mesh.vertices.len(),
        }
    }

    /// Number of vertices the draw call walks.
    pub fn draw_count(&self) -> usize {
        match self {
            MeshUpload::Expanded(mesh) => mesh.vertex_count(),
            MeshUpload::Indexed(mesh) => mesh.indices.len(),
        }
    }
}

/// CPU-side inputs for [`GpuState::new`].
#[derive(Clone, Debug)]
pub struct SceneAssets {
    pub mesh: MeshUpload,
    pub texture: TextureData,
    pub shader_source: String,
}

/// Per-instance scene UBO, mirrors `Scene` in scene.wgsl (16-byte aligned).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct SceneUniform {
    model: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    light_pos: [f32; 3],
    shininess: f32,
    view_pos: [f32; 3],
    ambient: f32,
    light_color: [f32; 3],
    _pad: f32,
    flags: [u32; 4],
}

impl SceneUniform {
    fn new(frame: &FrameParams, model: Mat4, settings: RenderSettings) -> Self {
        let normal_matrix = if model.determinant().abs() > f32::EPSILON {
            model.inverse().transpose()
        } else {
            Mat4::IDENTITY
        };
        Self {
            model: model.to_cols_array_2d(),
            view: frame.view.to_cols_array_2d(),
            projection: frame.projection.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            light_pos: LIGHT_POS.to_array(),
            shininess: SHININESS,
            view_pos: frame.view_pos.to_array(),
            ambient: AMBIENT,
            light_color: LIGHT_COLOR.to_array(),
            _pad: 0.0,
            flags: [settings.textured as u32, settings.lit as u32, 0, 0],
        }
    }
}

enum Geometry {
    Empty,
    Vertices { buffer: Buffer, count: u32 },
    Indexed { vertices: Buffer, indices: Buffer, count: u32 },
}

struct InstanceSlot {
    buffer: Buffer,
    bind_group: BindGroup,
}

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Pipeline & geometry
    pipeline: RenderPipeline,
    geometry: Geometry,
    settings: RenderSettings,

    // Per-instance uniforms + texture
    scene_bgl: BindGroupLayout,
    texture_view: TextureView,
    sampler: Sampler,
    instances: Vec<InstanceSlot>,

    // Depth
    depth_view: TextureView,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>.
    ///
    /// Fails if no adapter/device is available, the texture exceeds device
    /// limits, or the shader does not validate.
    pub async fn new(
        window: Arc<Window>,
        backends: wgpu::Backends,
        assets: &SceneAssets,
        settings: RenderSettings,
    ) -> Result<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(&InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window.clone())
            .context("create_surface failed")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;
        let info = adapter.get_info();
        log::info!("Using adapter '{}' ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Cubeview Device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_defaults().using_resolution(adapter.limits()),
                ..Default::default()
            })
            .await
            .context("request_device failed")?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("Surface reports no supported formats")?;

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, &surface_config);

        // ==== Texture + sampler ====
        let texture_view = upload_texture(&device, &queue, &assets.texture)?;
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Scene Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        // ==== Scene BGL ====
        let scene_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Scene BGL"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<SceneUniform>() as u64,
                        ),
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        // ==== Shader + pipeline, validated ====
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Scene WGSL"),
            source: ShaderSource::Wgsl(assets.shader_source.as_str().into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Scene PipelineLayout"),
            bind_group_layouts: &[&scene_bgl],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[MESH_LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            // OBJ winding is not guaranteed, so nothing is culled.
            primitive: wgpu::PrimitiveState {
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        if let Some(err) = device.pop_error_scope().await {
            anyhow::bail!("Shader or pipeline failed validation: {err}");
        }

        let geometry = upload_geometry(&device, &assets.mesh)?;

        log::info!(
            "GPU ready: {}x{}, format {:?}, {} vertices, textured={}, lit={}",
            width,
            height,
            surface_format,
            assets.mesh.vertex_count(),
            settings.textured,
            settings.lit
        );

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            pipeline,
            geometry,
            settings,
            scene_bgl,
            texture_view,
            sampler,
            instances: Vec::new(),
            depth_view,
            width,
            height,
        })
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Render one frame: one draw per model matrix in `frame`.
    pub fn render(&mut self, frame: &FrameParams) -> Result<(), SurfaceError> {
        self.ensure_instances(frame.models.len());
        for (slot, model) in self.instances.iter().zip(&frame.models) {
            let uniform = SceneUniform::new(frame, *model, self.settings);
            self.queue
                .write_buffer(&slot.buffer, 0, bytemuck::bytes_of(&uniform));
        }

        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(CLEAR_COLOR),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            rpass.set_pipeline(&self.pipeline);
            let slots = &self.instances[..frame.models.len()];
            match &self.geometry {
                Geometry::Empty => {}
                Geometry::Vertices { buffer, count } => {
                    rpass.set_vertex_buffer(0, buffer.slice(..));
                    for slot in slots {
                        rpass.set_bind_group(0, &slot.bind_group, &[]);
                        rpass.draw(0..*count, 0..1);
                    }
                }
                Geometry::Indexed {
                    vertices,
                    indices,
                    count,
                } => {
                    rpass.set_vertex_buffer(0, vertices.slice(..));
                    rpass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                    for slot in slots {
                        rpass.set_bind_group(0, &slot.bind_group, &[]);
                        rpass.draw_indexed(0..*count, 0, 0..1);
                    }
                }
            }
        }

        self.queue.submit(Some(encoder.finish()));
        output.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }

    fn ensure_instances(&mut self, count: usize) {
        while self.instances.len() < count {
            let index = self.instances.len();
            let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("Scene UBO {index}")),
                size: std::mem::size_of::<SceneUniform>() as u64,
                usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("Scene BG {index}")),
                layout: &self.scene_bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&self.texture_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            });
            log::debug!("Created instance slot {index}");
            self.instances.push(InstanceSlot { buffer, bind_group });
        }
    }
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}

/// Upload as sRGB RGBA8; RGB sources are widened first.
fn upload_texture(device: &Device, queue: &Queue, data: &TextureData) -> Result<TextureView> {
    ensure!(data.is_valid(), "Texture data does not match its dimensions");
    let max = device.limits().max_texture_dimension_2d;
    ensure!(
        data.width <= max && data.height <= max,
        "Texture {}x{} exceeds device limit {max}",
        data.width,
        data.height
    );

    let size = Extent3d {
        width: data.width,
        height: data.height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&TextureDescriptor {
        label: Some("Scene Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: TextureFormat::Rgba8UnormSrgb,
        usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &data.rgba8_pixels(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * data.width),
            rows_per_image: Some(data.height),
        },
        size,
    );
    Ok(texture.create_view(&TextureViewDescriptor::default()))
}

fn upload_geometry(device: &Device, mesh: &MeshUpload) -> Result<Geometry> {
    let count = u32::try_from(mesh.draw_count()).context("Mesh too large for a single draw")?;
    if count == 0 {
        log::warn!("Mesh is empty; nothing will be drawn");
        return Ok(Geometry::Empty);
    }

    let geometry = match mesh {
        MeshUpload::Expanded(data) => Geometry::Vertices {
            buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh VB"),
                contents: bytemuck::cast_slice(&data.vertices),
                usage: BufferUsages::VERTEX,
            }),
            count,
        },
        MeshUpload::Indexed(data) => Geometry::Indexed {
            vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh VB"),
                contents: bytemuck::cast_slice(&data.vertices),
                usage: BufferUsages::VERTEX,
            }),
            indices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh IB"),
                contents: bytemuck::cast_slice(&data.indices),
                usage: BufferUsages::INDEX,
            }),
            count,
        },
    };
    Ok(geometry)
}

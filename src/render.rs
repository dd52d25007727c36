use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytemuck::{bytes_of, Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3, Vec4};
use log::{debug, error};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use crate::lighting::MAX_LIGHTS;
use crate::mesh::{MeshData, VERTEX_STRIDE};
use crate::shading::{AssetStore, MeshHandle, ShaderStage, TextureId};

/// Per-frame uniform block: camera matrices plus the packed light arrays.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct FrameUniforms {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    light_ambient: [[f32; 4]; MAX_LIGHTS],
    light_position: [[f32; 4]; MAX_LIGHTS],
    light_color: [[f32; 4]; MAX_LIGHTS],
    attenuation: [f32; 4],
    eye: [f32; 4],
}

/// Per-draw uniform block: model transform, its normal matrix and the
/// material fields.  `params.x` is the specular exponent, `params.y` is 1
/// when a texture is bound for the draw.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ObjectUniforms {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 3],
    mat_ambient: [f32; 4],
    mat_diffuse: [f32; 4],
    mat_specular: [f32; 4],
    params: [f32; 4],
}

#[derive(Clone, Copy)]
struct DrawCall {
    object: ObjectUniforms,
    mesh: MeshHandle,
    texture: Option<TextureId>,
}

/// CPU-side stage implementation that maps the named uniform contract onto
/// the two GPU uniform blocks and collects draw calls for one frame.  The
/// renderer consumes the finished encoder in [`Renderer::submit`].
pub struct FrameEncoder {
    frame: FrameUniforms,
    object: ObjectUniforms,
    draws: Vec<DrawCall>,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self {
            frame: FrameUniforms::zeroed(),
            object: ObjectUniforms::zeroed(),
            draws: Vec::new(),
        }
    }

    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderStage for FrameEncoder {
    fn set_mat4(&mut self, name: &str, value: Mat4) {
        match name {
            "view" => self.frame.view = value.to_cols_array_2d(),
            "projection" => self.frame.projection = value.to_cols_array_2d(),
            "model" => {
                self.object.model = value.to_cols_array_2d();
                let normal = Mat3::from_mat4(value).inverse().transpose();
                self.object.normal = mat3_to_3x4(normal);
            }
            other => debug!("ignoring unknown mat4 uniform {other}"),
        }
    }

    fn set_vec3(&mut self, name: &str, value: Vec3) {
        match name {
            "lightAttenuation" => self.frame.attenuation = value.extend(0.0).into(),
            "eyePos" => self.frame.eye = value.extend(1.0).into(),
            other => debug!("ignoring unknown vec3 uniform {other}"),
        }
    }

    fn set_vec4(&mut self, name: &str, value: Vec4) {
        match name {
            "matAmbient" => self.object.mat_ambient = value.into(),
            "matDiffuse" => self.object.mat_diffuse = value.into(),
            "matSpecularColour" => self.object.mat_specular = value.into(),
            other => debug!("ignoring unknown vec4 uniform {other}"),
        }
    }

    fn set_vec4_array(&mut self, name: &str, values: &[Vec4]) {
        let slot = match name {
            "lightAmbArray" => &mut self.frame.light_ambient,
            "lightPosArray" => &mut self.frame.light_position,
            "lightColArray" => &mut self.frame.light_color,
            other => {
                debug!("ignoring unknown vec4 array uniform {other}");
                return;
            }
        };
        for (dst, src) in slot.iter_mut().zip(values) {
            *dst = (*src).into();
        }
    }

    fn set_f32(&mut self, name: &str, value: f32) {
        match name {
            "matSpecularExponent" => self.object.params[0] = value,
            other => debug!("ignoring unknown f32 uniform {other}"),
        }
    }

    fn draw_mesh(&mut self, mesh: MeshHandle, texture: Option<TextureId>) {
        let mut object = self.object;
        object.params[1] = if texture.is_some() { 1.0 } else { 0.0 };
        self.draws.push(DrawCall {
            object,
            mesh,
            texture,
        });
    }
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

/// GPU renderer backed by wgpu.  Owns the window surface, the pipeline and
/// all uploaded assets; draws whatever a [`FrameEncoder`] collected.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth: DepthBuffer,
    pipeline: wgpu::RenderPipeline,
    global_buffer: wgpu::Buffer,
    global_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    meshes: Vec<MeshBuffers>,
    textures: Vec<wgpu::BindGroup>,
    default_texture: wgpu::BindGroup,
}

impl Renderer {
    /// Initializes the GPU renderer for the provided window.
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("renderer-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .iter()
                .copied()
                .find(|mode| {
                    matches!(
                        mode,
                        wgpu::PresentMode::Mailbox | wgpu::PresentMode::Immediate
                    )
                })
                .unwrap_or(wgpu::PresentMode::Fifo),
            desired_maximum_frame_latency: 2,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, config.width, config.height);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("renderer-shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let global_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("global-bind-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: Some(
                        std::num::NonZeroU64::new(std::mem::size_of::<FrameUniforms>() as u64)
                            .unwrap(),
                    ),
                },
                count: None,
            }],
        });

        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object-bind-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: Some(
                        std::num::NonZeroU64::new(std::mem::size_of::<ObjectUniforms>() as u64)
                            .unwrap(),
                    ),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
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
            label: Some("renderer-pipeline-layout"),
            bind_group_layouts: &[&global_layout, &object_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let global_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("global-uniform"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let global_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("global-bind-group"),
            layout: &global_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: global_buffer.as_entire_binding(),
            }],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("renderer-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: (VERTEX_STRIDE * std::mem::size_of::<f32>()) as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x3,
                            offset: 0,
                            shader_location: 0,
                        },
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x3,
                            offset: (3 * std::mem::size_of::<f32>()) as u64,
                            shader_location: 1,
                        },
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: (6 * std::mem::size_of::<f32>()) as u64,
                            shader_location: 2,
                        },
                    ],
                }],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthBuffer::FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("diffuse-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        // 1x1 white fallback so untextured draws can share the pipeline.
        let default_texture = create_texture_bind_group(
            &device,
            &queue,
            &texture_layout,
            &sampler,
            &[255, 255, 255, 255],
            1,
            1,
            "default-white",
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            depth,
            pipeline,
            global_buffer,
            global_bind_group,
            object_layout,
            texture_layout,
            sampler,
            meshes: Vec::new(),
            textures: Vec::new(),
            default_texture,
        })
    }

    /// Returns the identifier of the window owned by the renderer.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    /// Exposes the inner window for event handling.
    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Resizes the swap chain to match the new dimensions.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, new_size.width, new_size.height);
    }

    /// Draws one frame's worth of collected calls.
    pub fn submit(&mut self, frame: &FrameEncoder) -> Result<(), wgpu::SurfaceError> {
        self.queue
            .write_buffer(&self.global_buffer, 0, bytes_of(&frame.frame));

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("renderer-encoder"),
            });

        // Per-draw uniform buffers are created up front; the pass below only
        // borrows them.
        let mut object_groups = Vec::with_capacity(frame.draws.len());
        for draw in &frame.draws {
            let object_buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("object-uniform"),
                    contents: bytes_of(&draw.object),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
            let object_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &self.object_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: object_buffer.as_entire_binding(),
                }],
                label: Some("object-bind-group"),
            });
            object_groups.push(object_bind_group);
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("main-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 0.03,
                        g: 0.03,
                        b: 0.05,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.global_bind_group, &[]);

        for (draw, object_group) in frame.draws.iter().zip(object_groups.iter()) {
            let Some(mesh) = self.meshes.get(draw.mesh.0 as usize) else {
                error!("draw references unknown mesh handle {}", draw.mesh.0);
                continue;
            };
            let texture_group = draw
                .texture
                .and_then(|id| self.textures.get(id.0 as usize))
                .unwrap_or(&self.default_texture);
            pass.set_bind_group(1, object_group, &[]);
            pass.set_bind_group(2, texture_group, &[]);
            pass.set_vertex_buffer(0, mesh.vertex.slice(..));
            pass.set_index_buffer(mesh.index.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }

        drop(pass); // explicit to satisfy lifetimes on some backends
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl AssetStore for Renderer {
    fn upload_mesh(&mut self, mesh: &MeshData) -> MeshHandle {
        let handle = MeshHandle(self.meshes.len() as u32);
        self.meshes.push(MeshBuffers::from_mesh(
            &self.device,
            mesh,
            &format!("mesh-{}", handle.0),
        ));
        handle
    }

    fn load_texture(&mut self, path: &Path) -> Result<TextureId> {
        let decoded = image::open(path)
            .with_context(|| format!("failed to decode texture {}", path.display()))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        let bind_group = create_texture_bind_group(
            &self.device,
            &self.queue,
            &self.texture_layout,
            &self.sampler,
            decoded.as_raw(),
            width,
            height,
            &path.display().to_string(),
        );
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(bind_group);
        Ok(id)
    }
}

#[allow(clippy::too_many_arguments)]
fn create_texture_bind_group(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    rgba: &[u8],
    width: u32,
    height: u32,
    label: &str,
) -> wgpu::BindGroup {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    fn from_mesh(device: &wgpu::Device, mesh: &MeshData, label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        }
    }
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

const SHADER: &str = r#"
struct FrameUniforms {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    light_ambient: array<vec4<f32>, 3>,
    light_position: array<vec4<f32>, 3>,
    light_color: array<vec4<f32>, 3>,
    attenuation: vec4<f32>,
    eye: vec4<f32>,
}

struct ObjectUniforms {
    model: mat4x4<f32>,
    normal: array<vec4<f32>, 3>,
    mat_ambient: vec4<f32>,
    mat_diffuse: vec4<f32>,
    mat_specular: vec4<f32>,
    params: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> frame: FrameUniforms;

@group(1) @binding(0)
var<uniform> object: ObjectUniforms;

@group(2) @binding(0)
var diffuse_texture: texture_2d<f32>;
@group(2) @binding(1)
var diffuse_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_position = object.model * vec4<f32>(input.position, 1.0);
    out.position = frame.projection * frame.view * world_position;
    out.world_pos = world_position.xyz;

    let world_normal = mat3x3<f32>(
        object.normal[0].xyz,
        object.normal[1].xyz,
        object.normal[2].xyz
    ) * input.normal;
    out.normal = normalize(world_normal);
    out.uv = input.uv;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let sampled = textureSample(diffuse_texture, diffuse_sampler, input.uv);
    let tex_color = mix(vec4<f32>(1.0), sampled, object.params.y);
    let base = object.mat_diffuse.rgb * tex_color.rgb;

    let n = normalize(input.normal);
    let view_dir = normalize(frame.eye.xyz - input.world_pos);

    var color = vec3<f32>(0.0);
    for (var i = 0; i < 3; i++) {
        let light_pos = frame.light_position[i];
        var light_dir: vec3<f32>;
        var falloff = 1.0;
        if (light_pos.w > 0.5) {
            let to_light = light_pos.xyz - input.world_pos;
            let dist = length(to_light);
            light_dir = to_light / max(dist, 1e-4);
            falloff = 1.0 / (frame.attenuation.x
                + frame.attenuation.y * dist
                + frame.attenuation.z * dist * dist);
        } else {
            light_dir = normalize(-light_pos.xyz);
        }

        let ambient = frame.light_ambient[i].rgb * object.mat_ambient.rgb;
        let diffuse = max(dot(n, light_dir), 0.0) * frame.light_color[i].rgb * base;
        let half_dir = normalize(light_dir + view_dir);
        let specular = pow(max(dot(n, half_dir), 0.0), object.params.x)
            * frame.light_color[i].rgb
            * object.mat_specular.rgb;

        color += ambient + falloff * (diffuse + specular);
    }

    return vec4<f32>(color, object.mat_diffuse.a * tex_color.a);
}
"#;

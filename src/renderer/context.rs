//! wgpu renderer
//!
//! Implements [`FrameBackend`]. Each frame slot remembers the submission that
//! last used it; waiting for the slot polls the device until that submission
//! has completed, which stands in for a per-slot fence.

use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

use super::camera::CameraUniform;
use super::frame::{AcquireStatus, FrameBackend, FrameError, FrameGlobals, PresentStatus};
use super::instances::{DrawBatch, InstancedData};
use super::lights::LightStorage;
use super::material::{Material, MaterialGpu, MaterialLibrary};
use super::mesh::{Mesh, MeshBuffers, MeshLibrary, Vertex};
use super::texture::{Texture, TextureImage};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Command stream of the frame being recorded
struct Recording {
    output: wgpu::SurfaceTexture,
    encoder: wgpu::CommandEncoder,
    pass: Option<wgpu::RenderPass<'static>>,
}

/// Main renderer
pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: (u32, u32),
    render_pipeline: wgpu::RenderPipeline,
    depth_view: wgpu::TextureView,
    camera_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
    global_bind_group: wgpu::BindGroup,
    material_bind_group_layout: wgpu::BindGroupLayout,
    white_texture: Texture,
    /// Last submission per frame slot
    submissions: Vec<Option<wgpu::SubmissionIndex>>,
    acquired: Option<wgpu::SurfaceTexture>,
    recording: Option<Recording>,
    /// Clear color
    pub clear_color: wgpu::Color,
}

impl Renderer {
    /// Bring up the device, surface and pipeline.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal: no surface, adapter or device.
    pub async fn new(
        window: Arc<Window>,
        vsync: bool,
        frames_in_flight: usize,
    ) -> Result<Self, FrameError> {
        let size = window.inner_size();
        let size = (size.width.max(1), size.height.max(1));

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(FrameError::NoAdapter)?;

        log::info!("Using GPU: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Brickyard Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(FrameError::NoAdapter)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.0,
            height: size.1,
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: frames_in_flight.max(1) as u32,
        };
        surface.configure(&device, &config);

        let depth_view = Self::create_depth_view(&device, size.0, size.1);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Buffer"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let light_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Light Buffer"),
            size: std::mem::size_of::<LightStorage>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let global_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Global Bind Group Layout"),
                entries: &[
                    uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                    uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
                ],
            });

        let global_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Global Bind Group"),
            layout: &global_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: light_buffer.as_entire_binding(),
                },
            ],
        });

        let material_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Material Bind Group Layout"),
                entries: &[
                    uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let white_texture = Texture::upload(
            &device,
            &queue,
            &TextureImage::solid([255; 4]),
            Some("White Texture"),
        );

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&global_bind_group_layout, &material_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Instanced Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::layout(), InstancedData::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            render_pipeline,
            depth_view,
            camera_buffer,
            light_buffer,
            global_bind_group,
            material_bind_group_layout,
            white_texture,
            submissions: vec![None; frames_in_flight.max(1)],
            acquired: None,
            recording: None,
            clear_color: wgpu::Color {
                r: 0.1,
                g: 0.1,
                b: 0.1,
                a: 1.0,
            },
        })
    }

    fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Depth Texture"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Resize the surface and depth buffer
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.size = (width, height);
        self.recreate_swapchain();
    }

    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Create GPU resources for every mesh and material that has none yet
    pub fn sync_resources(&self, meshes: &mut MeshLibrary, materials: &mut MaterialLibrary) {
        for (_, mesh) in meshes.iter_mut().filter(|(_, mesh)| !mesh.is_uploaded()) {
            self.upload_mesh(mesh);
        }
        for (_, material) in materials
            .iter_mut()
            .filter(|(_, material)| !material.is_uploaded())
        {
            self.upload_material(material);
        }
    }

    /// Create vertex, index and per-slot instance buffers for a mesh
    pub fn upload_mesh(&self, mesh: &mut Mesh) {
        if mesh.data.is_empty() {
            log::warn!("mesh '{}' has no geometry, not uploaded", mesh.name);
            return;
        }

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents: bytemuck::cast_slice(&mesh.data.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: bytemuck::cast_slice(&mesh.data.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        let instance_bytes =
            (mesh.instances.max_instances().max(1) * std::mem::size_of::<InstancedData>()) as u64;
        let instance_buffers = (0..self.submissions.len())
            .map(|_| {
                self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Instance Buffer"),
                    size: instance_bytes,
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        log::debug!(
            "uploaded mesh '{}' ({} vertices, {} instance bytes per slot)",
            mesh.name,
            mesh.data.vertices.len(),
            instance_bytes
        );
        mesh.gpu = Some(MeshBuffers {
            vertex_buffer,
            index_buffer,
            instance_buffers,
        });
    }

    /// Create the uniform buffer and per-slot bind groups for a material.
    ///
    /// Untextured materials sample plain white.
    pub fn upload_material(&self, material: &mut Material) {
        let uploaded = material
            .texture
            .as_ref()
            .map(|image| Texture::upload(&self.device, &self.queue, image, Some(&material.name)));
        let texture = uploaded.as_ref().unwrap_or(&self.white_texture);

        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Material Buffer"),
                contents: bytemuck::cast_slice(&[material.to_uniform()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        let bind_groups = (0..self.submissions.len())
            .map(|_| {
                self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Material Bind Group"),
                    layout: &self.material_bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: uniform_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&texture.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(&texture.sampler),
                        },
                    ],
                })
            })
            .collect();

        material.gpu = Some(MaterialGpu {
            uniform_buffer,
            bind_groups,
        });
    }

    fn check_slot(&self, slot: usize) -> Result<(), FrameError> {
        if slot < self.submissions.len() {
            Ok(())
        } else {
            Err(FrameError::BadSlot {
                slot,
                frames_in_flight: self.submissions.len(),
            })
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

impl FrameBackend for Renderer {
    fn wait_for_slot(&mut self, slot: usize) -> Result<(), FrameError> {
        self.check_slot(slot)?;
        if let Some(index) = self.submissions[slot].take() {
            self.device
                .poll(wgpu::Maintain::WaitForSubmissionIndex(index));
        }
        Ok(())
    }

    fn acquire_image(&mut self) -> Result<AcquireStatus, FrameError> {
        match self.surface.get_current_texture() {
            Ok(output) if output.suboptimal => Ok(AcquireStatus::Suboptimal),
            Ok(output) => {
                self.acquired = Some(output);
                Ok(AcquireStatus::Ready)
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                Ok(AcquireStatus::OutOfDate)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("timed out acquiring surface image");
                Ok(AcquireStatus::OutOfDate)
            }
            Err(err) => Err(FrameError::Surface(err)),
        }
    }

    fn recreate_swapchain(&mut self) {
        self.acquired = None;
        self.config.width = self.size.0;
        self.config.height = self.size.1;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = Self::create_depth_view(&self.device, self.size.0, self.size.1);
        log::debug!("swapchain recreated at {}x{}", self.size.0, self.size.1);
    }

    fn begin_recording(&mut self, slot: usize, globals: &FrameGlobals) -> Result<(), FrameError> {
        self.check_slot(slot)?;
        let output = self
            .acquired
            .take()
            .ok_or(FrameError::NotRecording("begin_recording"))?;

        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&globals.camera));
        self.queue
            .write_buffer(&self.light_buffer, 0, bytemuck::bytes_of(&globals.lights));

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let mut pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            })
            .forget_lifetime();

        pass.set_pipeline(&self.render_pipeline);
        pass.set_bind_group(0, &self.global_bind_group, &[]);

        self.recording = Some(Recording {
            output,
            encoder,
            pass: Some(pass),
        });
        Ok(())
    }

    fn upload_instances(&mut self, slot: usize, mesh: &Mesh, instances: &[InstancedData]) {
        let Some(buffer) = mesh
            .gpu
            .as_ref()
            .and_then(|gpu| gpu.instance_buffers.get(slot))
        else {
            log::warn!("mesh '{}' has no instance buffer for slot {slot}", mesh.name);
            return;
        };
        self.queue
            .write_buffer(buffer, 0, bytemuck::cast_slice(instances));
    }

    fn draw(&mut self, slot: usize, mesh: &Mesh, material: &Material, batch: DrawBatch) {
        let Some(pass) = self
            .recording
            .as_mut()
            .and_then(|recording| recording.pass.as_mut())
        else {
            return;
        };
        let (Some(gpu), Some(bind_group)) = (mesh.gpu.as_ref(), material.bind_group(slot)) else {
            log::trace!("'{}' / '{}' not uploaded yet", mesh.name, material.name);
            return;
        };
        let Some(instance_buffer) = gpu.instance_buffers.get(slot) else {
            return;
        };

        pass.set_bind_group(1, bind_group, &[]);
        pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
        pass.set_vertex_buffer(1, instance_buffer.slice(..));
        pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        let first = batch.first_instance;
        pass.draw_indexed(0..mesh.index_count(), 0, first..first + batch.instance_count);
    }

    fn submit_and_present(&mut self, slot: usize) -> Result<PresentStatus, FrameError> {
        self.check_slot(slot)?;
        let Recording {
            output,
            encoder,
            pass,
        } = self
            .recording
            .take()
            .ok_or(FrameError::NotRecording("submit_and_present"))?;
        drop(pass);

        let index = self.queue.submit(std::iter::once(encoder.finish()));
        self.submissions[slot] = Some(index);
        output.present();
        Ok(PresentStatus::Presented)
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

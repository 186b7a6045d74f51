use std::rc::Rc;
use std::sync::Arc;

use vulkano_util::context::{VulkanoConfig, VulkanoContext};
use winit::window::Window;

use crate::engine::graphics::mesh::CpuMesh;
use crate::engine::graphics::primitives::{MeshHandle, TextureHandle};
use crate::engine::graphics::renderer::{BackendFactory, BackendResult, RenderBackend};
use crate::engine::graphics::visual_world::VisualWorld;
use crate::engine::mount::Mount;
use crate::engine::{EngineError, EngineResult};

mod vulkano_backend {
    use std::collections::HashMap;
    use std::mem::size_of;
    use std::rc::Rc;
    use std::sync::Arc;

    use crate::engine::graphics::mesh::{CpuMesh, CpuVertex};
    use crate::engine::graphics::pipeline_descriptor_set_layouts::PipelineDescriptorSetLayouts;
    use crate::engine::graphics::primitives::{Material, MeshHandle, Shading, Side, TextureHandle};
    use crate::engine::graphics::visual_world::VisualWorld;
    use vulkano::DeviceSize;
    use vulkano::buffer::{Buffer, BufferContents, BufferCreateInfo, BufferUsage, Subbuffer};
    use vulkano::command_buffer::{
        AutoCommandBufferBuilder, CommandBufferUsage, CopyBufferInfo, CopyBufferToImageInfo,
        PrimaryCommandBufferAbstract, RenderPassBeginInfo, SubpassBeginInfo, SubpassEndInfo,
        allocator::StandardCommandBufferAllocator,
    };
    use vulkano::descriptor_set::allocator::StandardDescriptorSetAllocator;
    use vulkano::descriptor_set::{DescriptorSet, WriteDescriptorSet};
    use vulkano::format::{ClearValue, Format};
    use vulkano::image::sampler::{Sampler, SamplerCreateInfo};
    use vulkano::image::view::ImageView;
    use vulkano::image::{Image, ImageCreateInfo, ImageType, ImageUsage};
    use vulkano::memory::allocator::{AllocationCreateInfo, MemoryTypeFilter};
    use vulkano::pipeline::graphics::GraphicsPipelineCreateInfo;
    use vulkano::pipeline::graphics::color_blend::{
        AttachmentBlend, BlendFactor, BlendOp, ColorBlendAttachmentState, ColorBlendState,
        ColorComponents,
    };
    use vulkano::pipeline::graphics::depth_stencil::{CompareOp, DepthState, DepthStencilState};
    use vulkano::pipeline::graphics::input_assembly::InputAssemblyState;
    use vulkano::pipeline::graphics::multisample::MultisampleState;
    use vulkano::pipeline::graphics::rasterization::{CullMode, FrontFace, RasterizationState};
    use vulkano::pipeline::graphics::subpass::PipelineSubpassType;
    use vulkano::pipeline::graphics::vertex_input::{
        VertexInputAttributeDescription, VertexInputBindingDescription, VertexInputRate,
        VertexInputState,
    };
    use vulkano::pipeline::graphics::viewport::{Scissor, Viewport, ViewportState};
    use vulkano::pipeline::layout::{PipelineLayout, PipelineLayoutCreateInfo};
    use vulkano::pipeline::{
        DynamicState, GraphicsPipeline, Pipeline, PipelineBindPoint, PipelineShaderStageCreateInfo,
    };
    use vulkano::render_pass::{Framebuffer, FramebufferCreateInfo, RenderPass, Subpass};
    use vulkano::shader::ShaderModule;
    use vulkano::swapchain::{self, Surface, Swapchain, SwapchainCreateInfo, SwapchainPresentInfo};
    use vulkano::sync::{self, GpuFuture};
    use vulkano::{Validated, VulkanError};
    use vulkano_util::context::VulkanoContext;
    use winit::window::Window;

    type BoxError = Box<dyn std::error::Error>;

    mod scene_mesh_vs {
        vulkano_shaders::shader! {
            ty: "vertex",
            path: "assets/shaders/scene-mesh.vert",
        }
    }

    mod scene_mesh_fs {
        vulkano_shaders::shader! {
            ty: "fragment",
            path: "assets/shaders/scene-mesh.frag",
        }
    }

    const DEPTH_FORMAT: Format = Format::D16_UNORM;
    const MAX_DIRECTIONAL_LIGHTS: usize = 4;

    #[derive(BufferContents, Clone, Copy, Debug, Default)]
    #[repr(C, align(16))]
    struct GlobalsUBO {
        view: [[f32; 4]; 4],
        proj: [[f32; 4]; 4],
        camera_pos: [f32; 4],
        // rgb colour, w density (0 = off)
        fog: [f32; 4],
        ambient: [f32; 4],
    }

    #[derive(BufferContents, Clone, Copy, Debug, Default)]
    #[repr(C, align(16))]
    struct LightsUBO {
        count: [u32; 4],
        direction: [[f32; 4]; MAX_DIRECTIONAL_LIGHTS],
        color: [[f32; 4]; MAX_DIRECTIONAL_LIGHTS],
    }

    #[derive(BufferContents, Clone, Copy, Debug, Default)]
    #[repr(C, align(16))]
    struct MaterialUBO {
        base_color: [f32; 4],
        // x: lit, y: roughness, z: metalness
        params: [f32; 4],
    }

    impl MaterialUBO {
        fn from_material(m: &Material) -> Self {
            let lit = match m.shading {
                Shading::Unlit => 0.0,
                Shading::Standard => 1.0,
            };
            Self {
                base_color: [m.color[0], m.color[1], m.color[2], m.opacity],
                params: [lit, m.roughness, m.metalness, 0.0],
            }
        }
    }

    #[derive(BufferContents, Clone, Copy, Debug, Default)]
    #[repr(C)]
    struct InstanceData {
        model_c0: [f32; 4],
        model_c1: [f32; 4],
        model_c2: [f32; 4],
        model_c3: [f32; 4],
    }

    /// Fixed-function state that varies between materials.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    struct PipelineKey {
        blended: bool,
        depth_write: bool,
        double_sided: bool,
    }

    impl PipelineKey {
        fn of(m: &Material) -> Self {
            Self {
                blended: m.is_blended(),
                depth_write: m.depth_write,
                double_sided: m.side == Side::Double,
            }
        }
    }

    struct GpuMesh {
        vertices: Subbuffer<[CpuVertex]>,
        indices: Subbuffer<[u32]>,
        index_count: u32,
    }

    pub struct VulkanoState {
        context: Rc<VulkanoContext>,
        window: Arc<Window>,
        swapchain: Arc<Swapchain>,
        render_pass: Arc<RenderPass>,
        framebuffers: Vec<Arc<Framebuffer>>,

        command_buffer_allocator: Arc<StandardCommandBufferAllocator>,
        descriptor_set_allocator: Arc<StandardDescriptorSetAllocator>,
        set_layouts: PipelineDescriptorSetLayouts,
        pipeline_layout: Arc<PipelineLayout>,
        vs: Arc<ShaderModule>,
        fs: Arc<ShaderModule>,
        pipelines: HashMap<PipelineKey, Arc<GraphicsPipeline>>,

        meshes: HashMap<MeshHandle, GpuMesh>,
        textures: HashMap<TextureHandle, Arc<ImageView>>,
        sampler: Arc<Sampler>,
        pub default_white_texture: TextureHandle,

        pub window_resized: bool,
        recreate_swapchain: bool,
        previous_frame_end: Option<Box<dyn GpuFuture>>,
    }

    fn host_upload() -> AllocationCreateInfo {
        AllocationCreateInfo {
            memory_type_filter: MemoryTypeFilter::PREFER_HOST
                | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
            ..Default::default()
        }
    }

    fn device_local() -> AllocationCreateInfo {
        AllocationCreateInfo {
            memory_type_filter: MemoryTypeFilter::PREFER_DEVICE,
            ..Default::default()
        }
    }

    impl VulkanoState {
        pub fn new(context: Rc<VulkanoContext>, window: Arc<Window>) -> Result<Self, BoxError> {
            let device = context.device().clone();

            let surface = Surface::from_window(device.instance().clone(), window.clone())?;
            let caps = device
                .physical_device()
                .surface_capabilities(&surface, Default::default())?;
            let image_format = device
                .physical_device()
                .surface_formats(&surface, Default::default())?
                .first()
                .ok_or("no supported surface formats")?
                .0;

            let mut min_image_count = 2u32.max(caps.min_image_count);
            if let Some(max_image_count) = caps.max_image_count {
                min_image_count = min_image_count.min(max_image_count);
            }

            let (swapchain, images) = Swapchain::new(
                device.clone(),
                surface,
                SwapchainCreateInfo {
                    min_image_count,
                    image_format,
                    image_extent: window.inner_size().into(),
                    image_usage: ImageUsage::COLOR_ATTACHMENT,
                    composite_alpha: caps
                        .supported_composite_alpha
                        .into_iter()
                        .next()
                        .ok_or("no supported composite alpha")?,
                    ..Default::default()
                },
            )?;

            let render_pass = vulkano::single_pass_renderpass!(
                device.clone(),
                attachments: {
                    color: {
                        format: swapchain.image_format(),
                        samples: 1,
                        load_op: Clear,
                        store_op: Store,
                    },
                    depth: {
                        format: DEPTH_FORMAT,
                        samples: 1,
                        load_op: Clear,
                        store_op: DontCare,
                    },
                },
                pass: {
                    color: [color],
                    depth_stencil: {depth},
                }
            )?;

            let set_layouts = PipelineDescriptorSetLayouts::new(device.clone())?;
            let pipeline_layout = PipelineLayout::new(
                device.clone(),
                PipelineLayoutCreateInfo {
                    set_layouts: vec![set_layouts.global.clone(), set_layouts.material.clone()],
                    ..Default::default()
                },
            )?;

            let vs = scene_mesh_vs::load(device.clone())?;
            let fs = scene_mesh_fs::load(device.clone())?;

            let command_buffer_allocator = Arc::new(StandardCommandBufferAllocator::new(
                device.clone(),
                Default::default(),
            ));
            let descriptor_set_allocator = Arc::new(StandardDescriptorSetAllocator::new(
                device.clone(),
                Default::default(),
            ));
            let sampler = Sampler::new(device.clone(), SamplerCreateInfo::simple_repeat_linear())?;

            let framebuffers = Self::build_framebuffers(&context, &render_pass, images)?;

            let mut state = Self {
                context,
                window,
                swapchain,
                render_pass,
                framebuffers,
                command_buffer_allocator,
                descriptor_set_allocator,
                set_layouts,
                pipeline_layout,
                vs,
                fs,
                pipelines: HashMap::new(),
                meshes: HashMap::new(),
                textures: HashMap::new(),
                sampler,
                default_white_texture: TextureHandle(0),
                window_resized: false,
                recreate_swapchain: false,
                previous_frame_end: Some(sync::now(device).boxed()),
            };

            // 1x1 white so untextured materials can still bind a sampler.
            state.upload_texture_rgba8(TextureHandle(0), &[255, 255, 255, 255], 1, 1, false)?;

            Ok(state)
        }

        fn build_framebuffers(
            context: &VulkanoContext,
            render_pass: &Arc<RenderPass>,
            images: Vec<Arc<Image>>,
        ) -> Result<Vec<Arc<Framebuffer>>, BoxError> {
            let Some(first) = images.first() else {
                return Ok(Vec::new());
            };
            let extent = first.extent();

            let depth = ImageView::new_default(Image::new(
                context.memory_allocator().clone(),
                ImageCreateInfo {
                    image_type: ImageType::Dim2d,
                    format: DEPTH_FORMAT,
                    extent: [extent[0], extent[1], 1],
                    usage: ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::TRANSIENT_ATTACHMENT,
                    ..Default::default()
                },
                AllocationCreateInfo::default(),
            )?)?;

            images
                .into_iter()
                .map(|image| -> Result<Arc<Framebuffer>, BoxError> {
                    let view = ImageView::new_default(image)?;
                    let fb = Framebuffer::new(
                        render_pass.clone(),
                        FramebufferCreateInfo {
                            attachments: vec![view, depth.clone()],
                            ..Default::default()
                        },
                    )?;
                    Ok(fb)
                })
                .collect()
        }

        fn pipeline_for(&mut self, key: PipelineKey) -> Result<Arc<GraphicsPipeline>, BoxError> {
            if let Some(p) = self.pipelines.get(&key) {
                return Ok(p.clone());
            }

            let device = self.context.device().clone();
            let stages = vec![
                PipelineShaderStageCreateInfo::new(
                    self.vs
                        .entry_point("main")
                        .ok_or("missing scene-mesh.vert entry point")?,
                ),
                PipelineShaderStageCreateInfo::new(
                    self.fs
                        .entry_point("main")
                        .ok_or("missing scene-mesh.frag entry point")?,
                ),
            ];

            // Binding 0: CpuVertex (pos, normal, uv). Binding 1: per-instance model matrix.
            let mut vertex_input_state = VertexInputState::new()
                .binding(
                    0,
                    VertexInputBindingDescription {
                        stride: size_of::<CpuVertex>() as u32,
                        input_rate: VertexInputRate::Vertex,
                        ..Default::default()
                    },
                )
                .binding(
                    1,
                    VertexInputBindingDescription {
                        stride: size_of::<InstanceData>() as u32,
                        input_rate: VertexInputRate::Instance { divisor: 1 },
                        ..Default::default()
                    },
                );
            let vertex_attrs = [
                (0, Format::R32G32B32_SFLOAT, 0),
                (1, Format::R32G32B32_SFLOAT, 12),
                (2, Format::R32G32_SFLOAT, 24),
            ];
            for (location, format, offset) in vertex_attrs {
                vertex_input_state = vertex_input_state.attribute(
                    location,
                    VertexInputAttributeDescription {
                        binding: 0,
                        format,
                        offset,
                        ..Default::default()
                    },
                );
            }
            for column in 0..4u32 {
                vertex_input_state = vertex_input_state.attribute(
                    3 + column,
                    VertexInputAttributeDescription {
                        binding: 1,
                        format: Format::R32G32B32A32_SFLOAT,
                        offset: column * 16,
                        ..Default::default()
                    },
                );
            }

            let blend = key.blended.then_some(AttachmentBlend {
                src_color_blend_factor: BlendFactor::SrcAlpha,
                dst_color_blend_factor: BlendFactor::OneMinusSrcAlpha,
                color_blend_op: BlendOp::Add,
                src_alpha_blend_factor: BlendFactor::One,
                dst_alpha_blend_factor: BlendFactor::OneMinusSrcAlpha,
                alpha_blend_op: BlendOp::Add,
            });

            let subpass =
                Subpass::from(self.render_pass.clone(), 0).ok_or("missing subpass 0")?;
            let mut pipeline_ci = GraphicsPipelineCreateInfo::layout(self.pipeline_layout.clone());
            pipeline_ci.stages = stages.into();
            pipeline_ci.vertex_input_state = Some(vertex_input_state);
            pipeline_ci.input_assembly_state = Some(InputAssemblyState::default());
            pipeline_ci.viewport_state = Some(ViewportState::default());
            // The vertex shader flips Y, which mirrors winding on screen.
            pipeline_ci.rasterization_state = Some(RasterizationState {
                cull_mode: if key.double_sided {
                    CullMode::None
                } else {
                    CullMode::Back
                },
                front_face: FrontFace::Clockwise,
                ..Default::default()
            });
            pipeline_ci.multisample_state = Some(MultisampleState::default());
            pipeline_ci.depth_stencil_state = Some(DepthStencilState {
                depth: Some(DepthState {
                    write_enable: key.depth_write,
                    compare_op: CompareOp::LessOrEqual,
                }),
                ..Default::default()
            });
            pipeline_ci.color_blend_state = Some(ColorBlendState::with_attachment_states(
                1,
                ColorBlendAttachmentState {
                    blend,
                    color_write_enable: true,
                    color_write_mask: ColorComponents::all(),
                },
            ));
            pipeline_ci.dynamic_state = [DynamicState::Viewport, DynamicState::Scissor]
                .into_iter()
                .collect();
            pipeline_ci.subpass = Some(PipelineSubpassType::BeginRenderPass(subpass));

            let pipeline = GraphicsPipeline::new(device, None, pipeline_ci)?;
            tracing::debug!(?key, "created graphics pipeline");
            self.pipelines.insert(key, pipeline.clone());
            Ok(pipeline)
        }

        fn recreate_swapchain_if_needed(&mut self) -> Result<(), BoxError> {
            if !(self.window_resized || self.recreate_swapchain) {
                return Ok(());
            }

            self.recreate_swapchain = false;
            let new_dimensions = self.window.inner_size();
            if new_dimensions.width == 0 || new_dimensions.height == 0 {
                return Ok(());
            }

            let (new_swapchain, new_images) = match self.swapchain.recreate(SwapchainCreateInfo {
                image_extent: new_dimensions.into(),
                ..self.swapchain.create_info()
            }) {
                Ok(r) => r,
                Err(e) => {
                    self.recreate_swapchain = true;
                    tracing::warn!(error = %Validated::unwrap(e), "failed to recreate swapchain");
                    return Ok(());
                }
            };

            self.swapchain = new_swapchain;
            self.framebuffers =
                Self::build_framebuffers(&self.context, &self.render_pass, new_images)?;
            self.window_resized = false;
            Ok(())
        }

        fn uniform<T: BufferContents>(&self, data: T) -> Result<Subbuffer<T>, BoxError> {
            Ok(Buffer::from_data(
                self.context.memory_allocator().clone(),
                BufferCreateInfo {
                    usage: BufferUsage::UNIFORM_BUFFER,
                    ..Default::default()
                },
                host_upload(),
                data,
            )?)
        }

        pub fn render_visual_world(&mut self, visual_world: &VisualWorld) -> Result<(), BoxError> {
            self.recreate_swapchain_if_needed()?;

            let device = self.context.device().clone();
            let queue = self.context.graphics_queue().clone();

            if let Some(previous_frame_end) = self.previous_frame_end.as_mut() {
                previous_frame_end.cleanup_finished();
            }

            let (image_i, suboptimal, acquire_future) =
                match swapchain::acquire_next_image(self.swapchain.clone(), None)
                    .map_err(Validated::unwrap)
                {
                    Ok(r) => r,
                    Err(VulkanError::OutOfDate) => {
                        self.recreate_swapchain = true;
                        return Ok(());
                    }
                    Err(e) => return Err(Box::new(e)),
                };
            if suboptimal {
                self.recreate_swapchain = true;
            }

            let draw_list = visual_world.draw_list();

            let instance_buffer: Option<Subbuffer<[InstanceData]>> = if draw_list.is_empty() {
                None
            } else {
                Some(Buffer::from_iter(
                    self.context.memory_allocator().clone(),
                    BufferCreateInfo {
                        usage: BufferUsage::VERTEX_BUFFER,
                        ..Default::default()
                    },
                    host_upload(),
                    draw_list.iter().map(|(_, inst)| InstanceData {
                        model_c0: inst.model[0],
                        model_c1: inst.model[1],
                        model_c2: inst.model[2],
                        model_c3: inst.model[3],
                    }),
                )?)
            };

            let camera = visual_world.camera();
            let fog = visual_world
                .fog()
                .map(|f| [f.color[0], f.color[1], f.color[2], f.density])
                .unwrap_or([0.0; 4]);
            let ambient = visual_world.ambient();
            let globals_buffer = self.uniform(GlobalsUBO {
                view: camera.view,
                proj: camera.proj,
                camera_pos: [camera.position[0], camera.position[1], camera.position[2], 1.0],
                fog,
                ambient: [ambient[0], ambient[1], ambient[2], 0.0],
            })?;

            let mut lights = LightsUBO::default();
            let directional = visual_world.directional_lights();
            if directional.len() > MAX_DIRECTIONAL_LIGHTS {
                tracing::warn!(
                    count = directional.len(),
                    max = MAX_DIRECTIONAL_LIGHTS,
                    "too many directional lights, extra lights ignored"
                );
            }
            let count = directional.len().min(MAX_DIRECTIONAL_LIGHTS);
            lights.count[0] = count as u32;
            for (i, l) in directional.iter().take(count).enumerate() {
                lights.direction[i] = [l.direction[0], l.direction[1], l.direction[2], 0.0];
                lights.color[i] = [
                    l.color[0] * l.intensity,
                    l.color[1] * l.intensity,
                    l.color[2] * l.intensity,
                    1.0,
                ];
            }
            let lights_buffer = self.uniform(lights)?;

            let global_set = DescriptorSet::new(
                self.descriptor_set_allocator.clone(),
                self.set_layouts.global.clone(),
                [
                    WriteDescriptorSet::buffer(0, globals_buffer),
                    WriteDescriptorSet::buffer(1, lights_buffer),
                ],
                [],
            )?;

            let clear = match visual_world.clear_color() {
                Some([r, g, b]) => [r, g, b, 1.0],
                None => [0.0, 0.0, 0.0, 0.0],
            };
            let framebuffer = self.framebuffers[image_i as usize].clone();
            let mut render_pass_begin = RenderPassBeginInfo::framebuffer(framebuffer);
            render_pass_begin.clear_values =
                vec![Some(ClearValue::from(clear)), Some(ClearValue::Depth(1.0))];

            let extent = self.swapchain.image_extent();
            let viewport = Viewport {
                offset: [0.0, 0.0],
                extent: [extent[0] as f32, extent[1] as f32],
                depth_range: 0.0..=1.0,
                ..Default::default()
            };

            let mut cbb = AutoCommandBufferBuilder::primary(
                self.command_buffer_allocator.clone(),
                queue.queue_family_index(),
                CommandBufferUsage::OneTimeSubmit,
            )?;
            cbb.begin_render_pass(render_pass_begin, SubpassBeginInfo::default())?;
            cbb.set_viewport(0, vec![viewport].into())?;
            cbb.set_scissor(
                0,
                vec![Scissor {
                    offset: [0, 0],
                    extent: [extent[0], extent[1]],
                    ..Default::default()
                }]
                .into(),
            )?;

            let mut bound_pipeline: Option<PipelineKey> = None;
            for (slot, (_, inst)) in draw_list.iter().enumerate() {
                let Some(mesh) = self.meshes.get(&inst.mesh) else {
                    continue;
                };
                let (vertices, indices, index_count) =
                    (mesh.vertices.clone(), mesh.indices.clone(), mesh.index_count);
                let Some(instances) = instance_buffer.as_ref() else {
                    continue;
                };

                let key = PipelineKey::of(&inst.material);
                let pipeline = self.pipeline_for(key)?;
                if bound_pipeline != Some(key) {
                    cbb.bind_pipeline_graphics(pipeline.clone())?;
                    bound_pipeline = Some(key);
                }

                let texture = inst
                    .texture
                    .and_then(|t| self.textures.get(&t))
                    .or_else(|| self.textures.get(&self.default_white_texture))
                    .ok_or("default texture missing")?
                    .clone();

                let material_set = DescriptorSet::new(
                    self.descriptor_set_allocator.clone(),
                    self.set_layouts.material.clone(),
                    [
                        WriteDescriptorSet::buffer(
                            0,
                            self.uniform(MaterialUBO::from_material(&inst.material))?,
                        ),
                        WriteDescriptorSet::image_view_sampler(1, texture, self.sampler.clone()),
                    ],
                    [],
                )?;

                cbb.bind_descriptor_sets(
                    PipelineBindPoint::Graphics,
                    pipeline.layout().clone(),
                    0,
                    (global_set.clone(), material_set),
                )?;
                cbb.bind_vertex_buffers(0, (vertices, instances.clone()))?;
                cbb.bind_index_buffer(indices)?;

                unsafe {
                    cbb.draw_indexed(index_count, 1, 0, 0, slot as u32)?;
                }
            }

            cbb.end_render_pass(SubpassEndInfo::default())?;
            let cb = cbb.build()?;

            let start_future: Box<dyn GpuFuture> = self
                .previous_frame_end
                .take()
                .unwrap_or_else(|| sync::now(device.clone()).boxed());

            let execution = start_future
                .join(acquire_future)
                .then_execute(queue.clone(), cb)?
                .then_swapchain_present(
                    queue,
                    SwapchainPresentInfo::swapchain_image_index(self.swapchain.clone(), image_i),
                )
                .then_signal_fence_and_flush();

            match execution.map_err(Validated::unwrap) {
                Ok(future) => {
                    self.previous_frame_end = Some(future.boxed());
                }
                Err(VulkanError::OutOfDate) => {
                    self.recreate_swapchain = true;
                    self.previous_frame_end = Some(sync::now(device).boxed());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to flush frame");
                    self.previous_frame_end = Some(sync::now(device).boxed());
                }
            }

            Ok(())
        }

        /// Copy `bytes` into a new device-local sampled image.
        fn upload_image(
            &mut self,
            handle: TextureHandle,
            bytes: &[u8],
            format: Format,
            width: u32,
            height: u32,
        ) -> Result<(), BoxError> {
            let memory_allocator = self.context.memory_allocator().clone();
            let queue = self.context.graphics_queue().clone();

            let staging = Buffer::from_iter(
                memory_allocator.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::TRANSFER_SRC,
                    ..Default::default()
                },
                host_upload(),
                bytes.iter().copied(),
            )?;

            let image = Image::new(
                memory_allocator,
                ImageCreateInfo {
                    image_type: ImageType::Dim2d,
                    format,
                    extent: [width, height, 1],
                    usage: ImageUsage::TRANSFER_DST | ImageUsage::SAMPLED,
                    ..Default::default()
                },
                device_local(),
            )?;

            let mut cbb = AutoCommandBufferBuilder::primary(
                self.command_buffer_allocator.clone(),
                queue.queue_family_index(),
                CommandBufferUsage::OneTimeSubmit,
            )?;
            cbb.copy_buffer_to_image(CopyBufferToImageInfo::buffer_image(staging, image.clone()))?;
            cbb.build()?
                .execute(queue)?
                .then_signal_fence_and_flush()?
                .wait(None)?;

            self.textures.insert(handle, ImageView::new_default(image)?);
            Ok(())
        }

        pub fn upload_texture_rgba8(
            &mut self,
            handle: TextureHandle,
            rgba: &[u8],
            width: u32,
            height: u32,
            srgb: bool,
        ) -> Result<(), BoxError> {
            if width == 0 || height == 0 {
                return Err("texture has zero size".into());
            }
            let expected_len = width as usize * height as usize * 4;
            if rgba.len() != expected_len {
                return Err(format!(
                    "texture rgba length mismatch: got={}, expected={expected_len}",
                    rgba.len()
                )
                .into());
            }

            let format = if srgb {
                Format::R8G8B8A8_SRGB
            } else {
                Format::R8G8B8A8_UNORM
            };
            self.upload_image(handle, rgba, format, width, height)
        }

        pub fn upload_texture_bc7(
            &mut self,
            handle: TextureHandle,
            bc7_blocks: &[u8],
            width: u32,
            height: u32,
            srgb: bool,
        ) -> Result<(), BoxError> {
            if width == 0 || height == 0 {
                return Err("texture has zero size".into());
            }
            let expected_len = width.div_ceil(4) as usize * height.div_ceil(4) as usize * 16;
            if bc7_blocks.len() < expected_len {
                return Err(format!(
                    "texture bc7 length mismatch: got={}, expected={expected_len}",
                    bc7_blocks.len()
                )
                .into());
            }

            let format = if srgb {
                Format::BC7_SRGB_BLOCK
            } else {
                Format::BC7_UNORM_BLOCK
            };
            self.upload_image(handle, &bc7_blocks[..expected_len], format, width, height)
        }

        pub fn release_texture(&mut self, handle: TextureHandle) {
            if handle != self.default_white_texture {
                self.textures.remove(&handle);
            }
        }

        pub fn upload_mesh(&mut self, handle: MeshHandle, mesh: &CpuMesh) -> Result<(), BoxError> {
            if mesh.vertices.is_empty() {
                return Err("mesh has no vertices".into());
            }
            if mesh.indices_u32.is_empty() {
                return Err("mesh has no indices".into());
            }

            let memory_allocator = self.context.memory_allocator().clone();
            let queue = self.context.graphics_queue().clone();

            let vertices_src = Buffer::from_iter(
                memory_allocator.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::TRANSFER_SRC,
                    ..Default::default()
                },
                host_upload(),
                mesh.vertices.iter().copied(),
            )?;
            let indices_src = Buffer::from_iter(
                memory_allocator.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::TRANSFER_SRC,
                    ..Default::default()
                },
                host_upload(),
                mesh.indices_u32.iter().copied(),
            )?;

            let vertices_dst = Buffer::new_slice::<CpuVertex>(
                memory_allocator.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::VERTEX_BUFFER | BufferUsage::TRANSFER_DST,
                    ..Default::default()
                },
                device_local(),
                mesh.vertices.len() as DeviceSize,
            )?;
            let indices_dst = Buffer::new_slice::<u32>(
                memory_allocator,
                BufferCreateInfo {
                    usage: BufferUsage::INDEX_BUFFER | BufferUsage::TRANSFER_DST,
                    ..Default::default()
                },
                device_local(),
                mesh.indices_u32.len() as DeviceSize,
            )?;

            let mut cbb = AutoCommandBufferBuilder::primary(
                self.command_buffer_allocator.clone(),
                queue.queue_family_index(),
                CommandBufferUsage::OneTimeSubmit,
            )?;
            cbb.copy_buffer(CopyBufferInfo::buffers(vertices_src, vertices_dst.clone()))?;
            cbb.copy_buffer(CopyBufferInfo::buffers(indices_src, indices_dst.clone()))?;
            cbb.build()?
                .execute(queue)?
                .then_signal_fence_and_flush()?
                .wait(None)?;

            self.meshes.insert(
                handle,
                GpuMesh {
                    vertices: vertices_dst,
                    indices: indices_dst,
                    index_count: mesh.index_count(),
                },
            );
            Ok(())
        }

        pub fn release_mesh(&mut self, handle: MeshHandle) {
            self.meshes.remove(&handle);
        }

        /// Wait for in-flight work, then drop every GPU resource this state owns.
        pub fn release_all(&mut self) {
            if let Some(mut f) = self.previous_frame_end.take() {
                f.cleanup_finished();
                // Dropping a fence future blocks until the GPU is done with it.
                drop(f);
            }
            self.meshes.clear();
            self.textures.clear();
            self.pipelines.clear();
            self.framebuffers.clear();
        }
    }
}

/// Vulkan backend drawing into one window's swapchain.
pub struct VulkanoRenderer {
    vulkano: Option<vulkano_backend::VulkanoState>,
    next_mesh_handle: u32,
    next_texture_handle: u32,
}

impl VulkanoRenderer {
    pub fn new(
        context: Rc<VulkanoContext>,
        window: &Arc<Window>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let state = vulkano_backend::VulkanoState::new(context, window.clone())?;
        tracing::info!("vulkano swapchain and render pass initialized");
        Ok(Self {
            vulkano: Some(state),
            next_mesh_handle: 0,
            // Handle 0 is the default white texture.
            next_texture_handle: 1,
        })
    }

    fn state(&mut self) -> BackendResult<&mut vulkano_backend::VulkanoState> {
        self.vulkano
            .as_mut()
            .ok_or_else(|| "VulkanoRenderer used after dispose".into())
    }

    fn next_texture(&mut self) -> TextureHandle {
        let handle = TextureHandle(self.next_texture_handle);
        self.next_texture_handle = self.next_texture_handle.wrapping_add(1).max(1);
        handle
    }
}

impl RenderBackend for VulkanoRenderer {
    fn upload_mesh(&mut self, mesh: &CpuMesh) -> BackendResult<MeshHandle> {
        let handle = MeshHandle(self.next_mesh_handle);
        self.state()?.upload_mesh(handle, mesh)?;
        self.next_mesh_handle = self.next_mesh_handle.wrapping_add(1);
        Ok(handle)
    }

    fn release_mesh(&mut self, mesh: MeshHandle) {
        if let Some(v) = self.vulkano.as_mut() {
            v.release_mesh(mesh);
        }
    }

    fn upload_texture_rgba8(
        &mut self,
        rgba: &[u8],
        width: u32,
        height: u32,
        srgb: bool,
    ) -> BackendResult<TextureHandle> {
        let handle = self.next_texture();
        self.state()?
            .upload_texture_rgba8(handle, rgba, width, height, srgb)?;
        Ok(handle)
    }

    fn upload_texture_bc7(
        &mut self,
        bc7_blocks: &[u8],
        width: u32,
        height: u32,
        srgb: bool,
    ) -> BackendResult<TextureHandle> {
        let handle = self.next_texture();
        self.state()?
            .upload_texture_bc7(handle, bc7_blocks, width, height, srgb)?;
        Ok(handle)
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        if let Some(v) = self.vulkano.as_mut() {
            v.release_texture(texture);
        }
    }

    fn resize(&mut self, _width: u32, _height: u32) {
        // The swapchain is rebuilt from the window's own size on the next frame.
        if let Some(v) = self.vulkano.as_mut() {
            v.window_resized = true;
        }
    }

    fn render(&mut self, visuals: &VisualWorld) -> BackendResult<()> {
        self.state()?.render_visual_world(visuals)
    }

    fn dispose(&mut self) {
        if let Some(mut v) = self.vulkano.take() {
            v.release_all();
            tracing::info!("vulkano renderer disposed");
        }
    }
}

/// Shares one Vulkan context across every backend it creates.
#[derive(Default)]
pub struct VulkanoBackendFactory {
    context: Option<Rc<VulkanoContext>>,
}

impl VulkanoBackendFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackendFactory for VulkanoBackendFactory {
    fn create_backend(&mut self, mount: &dyn Mount) -> EngineResult<Box<dyn RenderBackend>> {
        let window = mount.window().ok_or(EngineError::MissingMount)?;
        let context = self
            .context
            .get_or_insert_with(|| Rc::new(VulkanoContext::new(VulkanoConfig::default())))
            .clone();
        let renderer = VulkanoRenderer::new(context, window)?;
        Ok(Box::new(renderer))
    }
}

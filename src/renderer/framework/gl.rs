// Copyright (c) 2019-present Dmitry Stepanov and Fyrox Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! OpenGL 3.3+ graphics server built on `glow`. The server does not create contexts, it wraps
//! a context made current by the host application (winit + glutin, SDL, an editor viewport,
//! etc.) and keeps a shadow copy of the pipeline state to skip redundant GL calls.

use crate::{
    core::{color::Color, math::Rect},
    err,
    info,
    renderer::framework::{
        error::FrameworkError,
        framebuffer::{
            Attachment, AttachmentKind, FrameBufferHandle, FrameBufferStatus, FrameTarget,
        },
        geometry_buffer::{DrawCallStatistics, GeometryBufferDescriptor, GeometryBufferHandle},
        gpu_program::{ProgramHandle, UniformValue},
        gpu_texture::{
            GpuTextureDescriptor, GpuTextureKind, MagnificationFilter, MinificationFilter,
            PixelKind, SamplerKind, TextureHandle, WrapMode,
        },
        server::GraphicsServer,
        BlendFactor, BlendFunc, BufferMask, CompareFunc, CullFace, WindingOrder,
    },
};
use fxhash::FxHashMap;
use glow::HasContext;
use std::{cell::RefCell, rc::Rc};

trait ToGlConstant {
    fn into_gl(self) -> u32;
}

impl ToGlConstant for CompareFunc {
    fn into_gl(self) -> u32 {
        match self {
            Self::Never => glow::NEVER,
            Self::Less => glow::LESS,
            Self::Equal => glow::EQUAL,
            Self::LessOrEqual => glow::LEQUAL,
            Self::Greater => glow::GREATER,
            Self::NotEqual => glow::NOTEQUAL,
            Self::GreaterOrEqual => glow::GEQUAL,
            Self::Always => glow::ALWAYS,
        }
    }
}

impl ToGlConstant for BlendFactor {
    fn into_gl(self) -> u32 {
        match self {
            Self::Zero => glow::ZERO,
            Self::One => glow::ONE,
            Self::SrcColor => glow::SRC_COLOR,
            Self::OneMinusSrcColor => glow::ONE_MINUS_SRC_COLOR,
            Self::DstColor => glow::DST_COLOR,
            Self::OneMinusDstColor => glow::ONE_MINUS_DST_COLOR,
            Self::SrcAlpha => glow::SRC_ALPHA,
            Self::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
            Self::DstAlpha => glow::DST_ALPHA,
            Self::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
        }
    }
}

impl ToGlConstant for CullFace {
    fn into_gl(self) -> u32 {
        match self {
            Self::Back => glow::BACK,
            Self::Front => glow::FRONT,
        }
    }
}

impl ToGlConstant for WindingOrder {
    fn into_gl(self) -> u32 {
        match self {
            Self::CounterClockwise => glow::CCW,
            Self::Clockwise => glow::CW,
        }
    }
}

impl ToGlConstant for MinificationFilter {
    fn into_gl(self) -> u32 {
        match self {
            Self::Nearest => glow::NEAREST,
            Self::Linear => glow::LINEAR,
        }
    }
}

impl ToGlConstant for MagnificationFilter {
    fn into_gl(self) -> u32 {
        match self {
            Self::Nearest => glow::NEAREST,
            Self::Linear => glow::LINEAR,
        }
    }
}

impl ToGlConstant for WrapMode {
    fn into_gl(self) -> u32 {
        match self {
            Self::Repeat => glow::REPEAT,
            Self::ClampToEdge => glow::CLAMP_TO_EDGE,
        }
    }
}

impl ToGlConstant for SamplerKind {
    fn into_gl(self) -> u32 {
        match self {
            Self::Texture2D => glow::TEXTURE_2D,
            Self::CubeMap => glow::TEXTURE_CUBE_MAP,
        }
    }
}

impl ToGlConstant for BufferMask {
    fn into_gl(self) -> u32 {
        let mut mask = 0;
        if self.contains(BufferMask::COLOR) {
            mask |= glow::COLOR_BUFFER_BIT;
        }
        if self.contains(BufferMask::DEPTH) {
            mask |= glow::DEPTH_BUFFER_BIT;
        }
        if self.contains(BufferMask::STENCIL) {
            mask |= glow::STENCIL_BUFFER_BIT;
        }
        mask
    }
}

struct PixelDescriptor {
    internal_format: u32,
    format: u32,
    data_type: u32,
}

fn pixel_descriptor(kind: PixelKind) -> PixelDescriptor {
    let (internal_format, format, data_type) = match kind {
        PixelKind::R32F => (glow::R32F, glow::RED, glow::FLOAT),
        PixelKind::RGB8 => (glow::RGB8, glow::RGB, glow::UNSIGNED_BYTE),
        PixelKind::RGBA8 => (glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE),
        PixelKind::RGB16F => (glow::RGB16F, glow::RGB, glow::HALF_FLOAT),
        PixelKind::RGBA16F => (glow::RGBA16F, glow::RGBA, glow::HALF_FLOAT),
        PixelKind::D32F => (glow::DEPTH_COMPONENT32F, glow::DEPTH_COMPONENT, glow::FLOAT),
        PixelKind::D24S8 => (
            glow::DEPTH24_STENCIL8,
            glow::DEPTH_STENCIL,
            glow::UNSIGNED_INT_24_8,
        ),
    };
    PixelDescriptor {
        internal_format,
        format,
        data_type,
    }
}

struct GlTexture {
    id: glow::Texture,
    kind: GpuTextureKind,
}

struct GlProgram {
    id: glow::Program,
    name: String,
    locations: FxHashMap<String, Option<glow::UniformLocation>>,
}

struct GlGeometryBuffer {
    vertex_array: glow::VertexArray,
    vertex_buffer: glow::Buffer,
    element_buffer: glow::Buffer,
    triangle_count: usize,
}

struct GlState {
    next_id: u32,
    textures: FxHashMap<TextureHandle, GlTexture>,
    frame_buffers: FxHashMap<FrameBufferHandle, glow::Framebuffer>,
    programs: FxHashMap<ProgramHandle, GlProgram>,
    geometry_buffers: FxHashMap<GeometryBufferHandle, GlGeometryBuffer>,
    bound_target: FrameTarget,
    viewport: Rect<i32>,
    program: Option<ProgramHandle>,
    geometry: Option<GeometryBufferHandle>,
    cull_face: Option<CullFace>,
    winding_order: WindingOrder,
    depth_func: Option<CompareFunc>,
    blend: Option<BlendFunc>,
}

impl GlState {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn gl_frame_buffer(&self, target: FrameTarget) -> Option<glow::Framebuffer> {
        match target {
            FrameTarget::BackBuffer => None,
            FrameTarget::FrameBuffer(handle) => self.frame_buffers.get(&handle).copied(),
        }
    }
}

/// See module docs.
pub struct GlGraphicsServer {
    /// Raw context, use it for things the [`GraphicsServer`] trait does not cover.
    pub gl: glow::Context,
    state: RefCell<GlState>,
}

impl GlGraphicsServer {
    /// Wraps a context that is current on this thread. `frame_size` is the size of the default
    /// frame buffer and becomes the initial viewport.
    pub fn new(gl: glow::Context, frame_size: (u32, u32)) -> Rc<Self> {
        let viewport = Rect::new(0, 0, frame_size.0 as i32, frame_size.1 as i32);

        unsafe {
            gl.viewport(0, 0, viewport.w(), viewport.h());
            gl.depth_mask(true);
            gl.front_face(glow::CCW);
            gl.disable(glow::CULL_FACE);
            gl.disable(glow::DEPTH_TEST);
            gl.disable(glow::BLEND);
        }

        info!(
            "OpenGL graphics server created. Frame size: {}x{}",
            frame_size.0, frame_size.1
        );

        Rc::new(Self {
            gl,
            state: RefCell::new(GlState {
                next_id: 0,
                textures: Default::default(),
                frame_buffers: Default::default(),
                programs: Default::default(),
                geometry_buffers: Default::default(),
                bound_target: FrameTarget::BackBuffer,
                viewport,
                program: None,
                geometry: None,
                cull_face: None,
                winding_order: WindingOrder::CounterClockwise,
                depth_func: None,
                blend: None,
            }),
        })
    }

    fn create_shader(
        &self,
        name: String,
        shader_type: u32,
        source: &str,
    ) -> Result<glow::Shader, FrameworkError> {
        unsafe {
            let shader = self.gl.create_shader(shader_type)?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);

            if self.gl.get_shader_compile_status(shader) {
                info!("Shader {name} compiled!");
                Ok(shader)
            } else {
                let error_message = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                err!("Failed to compile {name} shader: {error_message}");
                Err(FrameworkError::ShaderCompilationFailed {
                    shader_name: name,
                    error_message,
                })
            }
        }
    }

    fn uniform_location(&self, name: &str) -> Option<glow::UniformLocation> {
        let mut state = self.state.borrow_mut();
        let handle = state.program?;
        let program = state.programs.get_mut(&handle)?;
        if let Some(location) = program.locations.get(name) {
            return location.clone();
        }
        let location = unsafe { self.gl.get_uniform_location(program.id, name) };
        program.locations.insert(name.to_owned(), location.clone());
        location
    }

    fn set_capability(&self, capability: u32, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(capability);
            } else {
                self.gl.disable(capability);
            }
        }
    }
}

unsafe fn set_attachment(gl: &glow::Context, gl_attachment_kind: u32, texture: &GlTexture) {
    let texture_target = match texture.kind {
        GpuTextureKind::Rectangle { .. } => glow::TEXTURE_2D,
        GpuTextureKind::Cube { .. } => glow::TEXTURE_CUBE_MAP_POSITIVE_X,
    };
    gl.framebuffer_texture_2d(
        glow::FRAMEBUFFER,
        gl_attachment_kind,
        texture_target,
        Some(texture.id),
        0,
    );
}

impl GraphicsServer for GlGraphicsServer {
    fn create_texture(&self, desc: &GpuTextureDescriptor) -> Result<TextureHandle, FrameworkError> {
        let pixel = pixel_descriptor(desc.pixel_kind);
        let (width, height) = (desc.kind.width() as i32, desc.kind.height() as i32);
        let target = desc.kind.sampler_kind().into_gl();

        let id = unsafe {
            let id = self.gl.create_texture()?;
            self.gl.bind_texture(target, Some(id));

            match desc.kind {
                GpuTextureKind::Rectangle { .. } => {
                    self.gl.tex_image_2d(
                        glow::TEXTURE_2D,
                        0,
                        pixel.internal_format as i32,
                        width,
                        height,
                        0,
                        pixel.format,
                        pixel.data_type,
                        desc.data,
                    );
                }
                GpuTextureKind::Cube { .. } => {
                    let face_size = desc.kind.width()
                        * desc.kind.height()
                        * desc.pixel_kind.size_in_bytes();
                    for face in 0..6 {
                        let face_data = desc
                            .data
                            .map(|data| &data[face * face_size..(face + 1) * face_size]);
                        self.gl.tex_image_2d(
                            glow::TEXTURE_CUBE_MAP_POSITIVE_X + face as u32,
                            0,
                            pixel.internal_format as i32,
                            width,
                            height,
                            0,
                            pixel.format,
                            pixel.data_type,
                            face_data,
                        );
                    }
                    self.gl.tex_parameter_i32(
                        target,
                        glow::TEXTURE_WRAP_R,
                        desc.wrap_mode.into_gl() as i32,
                    );
                }
            }

            self.gl.tex_parameter_i32(
                target,
                glow::TEXTURE_MIN_FILTER,
                desc.min_filter.into_gl() as i32,
            );
            self.gl.tex_parameter_i32(
                target,
                glow::TEXTURE_MAG_FILTER,
                desc.mag_filter.into_gl() as i32,
            );
            self.gl
                .tex_parameter_i32(target, glow::TEXTURE_WRAP_S, desc.wrap_mode.into_gl() as i32);
            self.gl
                .tex_parameter_i32(target, glow::TEXTURE_WRAP_T, desc.wrap_mode.into_gl() as i32);
            self.gl.bind_texture(target, None);
            id
        };

        let mut state = self.state.borrow_mut();
        let handle = TextureHandle(state.next_id());
        state.textures.insert(
            handle,
            GlTexture {
                id,
                kind: desc.kind,
            },
        );
        Ok(handle)
    }

    fn delete_texture(&self, texture: TextureHandle) {
        if let Some(entry) = self.state.borrow_mut().textures.remove(&texture) {
            unsafe { self.gl.delete_texture(entry.id) }
        }
    }

    fn create_frame_buffer(
        &self,
        depth_attachment: Option<&Attachment>,
        color_attachments: &[Attachment],
    ) -> Result<FrameBufferHandle, FrameworkError> {
        let mut state = self.state.borrow_mut();

        let fbo = unsafe {
            let fbo = self.gl.create_framebuffer()?;
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));

            if let Some(depth_attachment) = depth_attachment {
                let kind = match depth_attachment.kind {
                    AttachmentKind::DepthStencil => glow::DEPTH_STENCIL_ATTACHMENT,
                    _ => glow::DEPTH_ATTACHMENT,
                };
                let handle = depth_attachment.texture.handle();
                let texture = state.textures.get(&handle).ok_or(FrameworkError::UnknownHandle {
                    kind: "Texture",
                    id: handle.0,
                })?;
                set_attachment(&self.gl, kind, texture);
            }

            let mut color_buffers = Vec::with_capacity(color_attachments.len());
            for (i, attachment) in color_attachments.iter().enumerate() {
                let kind = glow::COLOR_ATTACHMENT0 + i as u32;
                let handle = attachment.texture.handle();
                let texture = state.textures.get(&handle).ok_or(FrameworkError::UnknownHandle {
                    kind: "Texture",
                    id: handle.0,
                })?;
                set_attachment(&self.gl, kind, texture);
                color_buffers.push(kind);
            }

            if color_buffers.is_empty() {
                self.gl.draw_buffers(&[glow::NONE]);
                self.gl.read_buffer(glow::NONE);
            } else {
                self.gl.draw_buffers(&color_buffers);
            }

            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, state.gl_frame_buffer(state.bound_target));
            fbo
        };

        let handle = FrameBufferHandle(state.next_id());
        state.frame_buffers.insert(handle, fbo);
        Ok(handle)
    }

    fn frame_buffer_status(&self, frame_buffer: FrameBufferHandle) -> FrameBufferStatus {
        let state = self.state.borrow();
        let Some(fbo) = state.frame_buffers.get(&frame_buffer).copied() else {
            return FrameBufferStatus::Incomplete(format!("unknown frame buffer {frame_buffer:?}"));
        };

        let status = unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
            let status = self.gl.check_framebuffer_status(glow::FRAMEBUFFER);
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, state.gl_frame_buffer(state.bound_target));
            status
        };

        match status {
            glow::FRAMEBUFFER_COMPLETE => FrameBufferStatus::Complete,
            glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => {
                FrameBufferStatus::Incomplete("incomplete attachment".to_owned())
            }
            glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => {
                FrameBufferStatus::Incomplete("missing attachment".to_owned())
            }
            glow::FRAMEBUFFER_UNSUPPORTED => {
                FrameBufferStatus::Incomplete("unsupported attachment combination".to_owned())
            }
            other => FrameBufferStatus::Incomplete(format!("status 0x{other:X}")),
        }
    }

    fn delete_frame_buffer(&self, frame_buffer: FrameBufferHandle) {
        let mut state = self.state.borrow_mut();
        if let Some(fbo) = state.frame_buffers.remove(&frame_buffer) {
            if state.bound_target == FrameTarget::FrameBuffer(frame_buffer) {
                state.bound_target = FrameTarget::BackBuffer;
                unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, None) }
            }
            unsafe { self.gl.delete_framebuffer(fbo) }
        }
    }

    fn create_program(
        &self,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramHandle, FrameworkError> {
        let vertex_shader =
            self.create_shader(format!("{name}_VertexShader"), glow::VERTEX_SHADER, vertex_source)?;
        let fragment_shader = match self.create_shader(
            format!("{name}_FragmentShader"),
            glow::FRAGMENT_SHADER,
            fragment_source,
        ) {
            Ok(shader) => shader,
            Err(e) => {
                unsafe { self.gl.delete_shader(vertex_shader) };
                return Err(e);
            }
        };

        let id = unsafe {
            let program = self.gl.create_program()?;
            self.gl.attach_shader(program, vertex_shader);
            self.gl.attach_shader(program, fragment_shader);
            self.gl.link_program(program);
            self.gl.detach_shader(program, vertex_shader);
            self.gl.detach_shader(program, fragment_shader);
            self.gl.delete_shader(vertex_shader);
            self.gl.delete_shader(fragment_shader);

            if !self.gl.get_program_link_status(program) {
                let error_message = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                err!("Failed to link {name} shader: {error_message}");
                return Err(FrameworkError::ShaderLinkingFailed {
                    shader_name: name.to_owned(),
                    error_message,
                });
            }
            program
        };

        info!("Shader {name} linked!");

        let mut state = self.state.borrow_mut();
        let handle = ProgramHandle(state.next_id());
        state.programs.insert(
            handle,
            GlProgram {
                id,
                name: name.to_owned(),
                locations: Default::default(),
            },
        );
        Ok(handle)
    }

    fn delete_program(&self, program: ProgramHandle) {
        let mut state = self.state.borrow_mut();
        if let Some(entry) = state.programs.remove(&program) {
            if state.program == Some(program) {
                state.program = None;
                unsafe { self.gl.use_program(None) }
            }
            info!("Shader {} deleted.", entry.name);
            unsafe { self.gl.delete_program(entry.id) }
        }
    }

    fn create_geometry_buffer(
        &self,
        desc: &GeometryBufferDescriptor,
    ) -> Result<GeometryBufferHandle, FrameworkError> {
        let stride = desc.stride();

        let buffer = unsafe {
            let vertex_array = self.gl.create_vertex_array()?;
            self.gl.bind_vertex_array(Some(vertex_array));

            let vertex_buffer = self.gl.create_buffer()?;
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(vertex_buffer));
            self.gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(desc.vertices),
                glow::STATIC_DRAW,
            );

            let element_buffer = self.gl.create_buffer()?;
            self.gl
                .bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(element_buffer));
            self.gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(desc.triangles),
                glow::STATIC_DRAW,
            );

            let mut offset = 0;
            for attribute in desc.layout {
                self.gl.vertex_attrib_pointer_f32(
                    attribute.location,
                    attribute.components as i32,
                    glow::FLOAT,
                    false,
                    (stride * std::mem::size_of::<f32>()) as i32,
                    (offset * std::mem::size_of::<f32>()) as i32,
                );
                self.gl.enable_vertex_attrib_array(attribute.location);
                offset += attribute.components;
            }

            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);

            GlGeometryBuffer {
                vertex_array,
                vertex_buffer,
                element_buffer,
                triangle_count: desc.triangles.len(),
            }
        };

        let mut state = self.state.borrow_mut();
        state.geometry = None;
        let handle = GeometryBufferHandle(state.next_id());
        state.geometry_buffers.insert(handle, buffer);
        Ok(handle)
    }

    fn delete_geometry_buffer(&self, buffer: GeometryBufferHandle) {
        let mut state = self.state.borrow_mut();
        if let Some(entry) = state.geometry_buffers.remove(&buffer) {
            if state.geometry == Some(buffer) {
                state.geometry = None;
            }
            unsafe {
                self.gl.delete_vertex_array(entry.vertex_array);
                self.gl.delete_buffer(entry.vertex_buffer);
                self.gl.delete_buffer(entry.element_buffer);
            }
        }
    }

    fn bind_frame_buffer(&self, target: FrameTarget) {
        let mut state = self.state.borrow_mut();
        if state.bound_target == target {
            return;
        }
        if let FrameTarget::FrameBuffer(handle) = target {
            if !state.frame_buffers.contains_key(&handle) {
                err!("Attempt to bind unknown frame buffer {handle:?}");
                return;
            }
        }
        state.bound_target = target;
        unsafe {
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, state.gl_frame_buffer(target))
        }
    }

    fn bound_frame_buffer(&self) -> FrameTarget {
        self.state.borrow().bound_target
    }

    fn blit_frame_buffer(
        &self,
        source: FrameTarget,
        dest: FrameTarget,
        source_rect: Rect<i32>,
        dest_rect: Rect<i32>,
        mask: BufferMask,
    ) {
        let state = self.state.borrow();
        unsafe {
            self.gl
                .bind_framebuffer(glow::READ_FRAMEBUFFER, state.gl_frame_buffer(source));
            self.gl
                .bind_framebuffer(glow::DRAW_FRAMEBUFFER, state.gl_frame_buffer(dest));
            self.gl.blit_framebuffer(
                source_rect.x(),
                source_rect.y(),
                source_rect.right(),
                source_rect.bottom(),
                dest_rect.x(),
                dest_rect.y(),
                dest_rect.right(),
                dest_rect.bottom(),
                mask.into_gl(),
                glow::NEAREST,
            );
            self.gl.bind_framebuffer(
                glow::FRAMEBUFFER,
                state.gl_frame_buffer(state.bound_target),
            );
        }
    }

    fn set_viewport(&self, viewport: Rect<i32>) {
        let mut state = self.state.borrow_mut();
        if state.viewport != viewport {
            state.viewport = viewport;
            unsafe {
                self.gl
                    .viewport(viewport.x(), viewport.y(), viewport.w(), viewport.h());
            }
        }
    }

    fn viewport(&self) -> Rect<i32> {
        self.state.borrow().viewport
    }

    fn clear(&self, color: Option<Color>, depth: Option<f32>, stencil: Option<i32>) {
        let mut mask = 0;
        unsafe {
            if let Some(color) = color {
                let rgba = color.as_frgba();
                self.gl.clear_color(rgba.x, rgba.y, rgba.z, rgba.w);
                mask |= glow::COLOR_BUFFER_BIT;
            }
            if let Some(depth) = depth {
                self.gl.depth_mask(true);
                self.gl.clear_depth_f32(depth);
                mask |= glow::DEPTH_BUFFER_BIT;
            }
            if let Some(stencil) = stencil {
                self.gl.clear_stencil(stencil);
                mask |= glow::STENCIL_BUFFER_BIT;
            }
            if mask != 0 {
                self.gl.clear(mask);
            }
        }
    }

    fn set_cull_face(&self, cull_face: Option<CullFace>) {
        let mut state = self.state.borrow_mut();
        if state.cull_face != cull_face {
            state.cull_face = cull_face;
            self.set_capability(glow::CULL_FACE, cull_face.is_some());
            if let Some(cull_face) = cull_face {
                unsafe { self.gl.cull_face(cull_face.into_gl()) }
            }
        }
    }

    fn set_winding_order(&self, winding_order: WindingOrder) {
        let mut state = self.state.borrow_mut();
        if state.winding_order != winding_order {
            state.winding_order = winding_order;
            unsafe { self.gl.front_face(winding_order.into_gl()) }
        }
    }

    fn set_depth_func(&self, func: Option<CompareFunc>) {
        let mut state = self.state.borrow_mut();
        if state.depth_func != func {
            state.depth_func = func;
            self.set_capability(glow::DEPTH_TEST, func.is_some());
            if let Some(func) = func {
                unsafe { self.gl.depth_func(func.into_gl()) }
            }
        }
    }

    fn set_blend_func(&self, func: Option<BlendFunc>) {
        let mut state = self.state.borrow_mut();
        if state.blend != func {
            state.blend = func;
            self.set_capability(glow::BLEND, func.is_some());
            if let Some(func) = func {
                unsafe {
                    self.gl
                        .blend_func(func.sfactor.into_gl(), func.dfactor.into_gl())
                }
            }
        }
    }

    fn set_program(&self, program: ProgramHandle) {
        let mut state = self.state.borrow_mut();
        if state.program == Some(program) {
            return;
        }
        let Some(id) = state.programs.get(&program).map(|p| p.id) else {
            err!("Attempt to bind unknown program {program:?}");
            return;
        };
        state.program = Some(program);
        unsafe { self.gl.use_program(Some(id)) }
    }

    fn set_uniform(&self, name: &str, value: UniformValue) {
        let Some(location) = self.uniform_location(name) else {
            return;
        };
        let location = Some(&location);
        unsafe {
            match value {
                UniformValue::Bool(v) => self.gl.uniform_1_i32(location, v as i32),
                UniformValue::Integer(v) => self.gl.uniform_1_i32(location, v),
                UniformValue::UnsignedInteger(v) => self.gl.uniform_1_u32(location, v),
                UniformValue::Float(v) => self.gl.uniform_1_f32(location, v),
                UniformValue::Vector2(v) => self.gl.uniform_2_f32(location, v.x, v.y),
                UniformValue::Vector3(v) => self.gl.uniform_3_f32(location, v.x, v.y, v.z),
                UniformValue::Vector4(v) => {
                    self.gl.uniform_4_f32(location, v.x, v.y, v.z, v.w)
                }
                UniformValue::Matrix4(v) => {
                    self.gl
                        .uniform_matrix_4_f32_slice(location, false, v.as_slice())
                }
            }
        }
    }

    fn set_texture(&self, name: &str, unit: u32, kind: SamplerKind, texture: Option<TextureHandle>) {
        let id = match texture {
            Some(handle) => match self.state.borrow().textures.get(&handle) {
                Some(entry) => Some(entry.id),
                None => {
                    err!("Attempt to bind unknown texture {handle:?}");
                    return;
                }
            },
            None => None,
        };

        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(kind.into_gl(), id);
        }

        if id.is_some() {
            self.set_uniform(name, UniformValue::Integer(unit as i32));
        }
    }

    fn set_geometry_buffer(&self, buffer: GeometryBufferHandle) {
        let mut state = self.state.borrow_mut();
        if state.geometry == Some(buffer) {
            return;
        }
        let Some(vertex_array) = state.geometry_buffers.get(&buffer).map(|b| b.vertex_array)
        else {
            err!("Attempt to bind unknown geometry buffer {buffer:?}");
            return;
        };
        state.geometry = Some(buffer);
        unsafe { self.gl.bind_vertex_array(Some(vertex_array)) }
    }

    fn draw_elements(
        &self,
        instance_count: Option<usize>,
    ) -> Result<DrawCallStatistics, FrameworkError> {
        let state = self.state.borrow();
        let handle = state.geometry.ok_or(FrameworkError::NoGeometryBound)?;
        let buffer = state
            .geometry_buffers
            .get(&handle)
            .ok_or(FrameworkError::UnknownHandle {
                kind: "GeometryBuffer",
                id: handle.0,
            })?;

        let index_count = (buffer.triangle_count * 3) as i32;
        unsafe {
            match instance_count {
                Some(instances) => self.gl.draw_elements_instanced(
                    glow::TRIANGLES,
                    index_count,
                    glow::UNSIGNED_INT,
                    0,
                    instances as i32,
                ),
                None => self
                    .gl
                    .draw_elements(glow::TRIANGLES, index_count, glow::UNSIGNED_INT, 0),
            }
        }

        Ok(DrawCallStatistics {
            triangles: buffer.triangle_count * instance_count.unwrap_or(1),
        })
    }
}

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

//! In-memory graphics server. It allocates handles, tracks live resources, simulates the bound
//! target and pipeline state, and records every command it receives. It renders nothing, which
//! makes it suitable for validating pass ordering, resource hand-off and lifetime without a GPU.

use crate::{
    core::{color::Color, math::Rect},
    err,
    renderer::framework::{
        error::FrameworkError,
        framebuffer::{Attachment, FrameBufferHandle, FrameBufferStatus, FrameTarget},
        geometry_buffer::{DrawCallStatistics, GeometryBufferDescriptor, GeometryBufferHandle},
        gpu_program::{ProgramHandle, UniformValue},
        gpu_texture::{GpuTextureDescriptor, GpuTextureKind, PixelKind, SamplerKind, TextureHandle},
        server::GraphicsServer,
        BlendFunc, BufferMask, CompareFunc, CullFace, WindingOrder,
    },
};
use fxhash::FxHashMap;
use std::cell::RefCell;

/// Snapshot of the pipeline at the moment of a draw call.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub struct DrawRecord {
    pub target: FrameTarget,
    pub viewport: Rect<i32>,
    pub program: Option<ProgramHandle>,
    pub geometry: GeometryBufferHandle,
    pub triangles: usize,
    pub instance_count: Option<usize>,
    pub blend: Option<BlendFunc>,
    pub cull_face: Option<CullFace>,
    pub depth_func: Option<CompareFunc>,
    /// Texture units with a texture bound, sorted by unit.
    pub textures: Vec<(u32, TextureHandle)>,
}

impl DrawRecord {
    /// Returns `true` if the texture was bound to any unit during the draw.
    pub fn samples(&self, texture: TextureHandle) -> bool {
        self.textures.iter().any(|(_, t)| *t == texture)
    }
}

#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    CreateTexture(TextureHandle),
    DeleteTexture(TextureHandle),
    CreateFrameBuffer(FrameBufferHandle),
    DeleteFrameBuffer(FrameBufferHandle),
    CreateProgram(ProgramHandle),
    DeleteProgram(ProgramHandle),
    CreateGeometryBuffer(GeometryBufferHandle),
    DeleteGeometryBuffer(GeometryBufferHandle),
    BindFrameBuffer(FrameTarget),
    Blit {
        source: FrameTarget,
        dest: FrameTarget,
        source_rect: Rect<i32>,
        dest_rect: Rect<i32>,
        mask: BufferMask,
    },
    SetViewport(Rect<i32>),
    Clear {
        target: FrameTarget,
        color: Option<Color>,
        depth: Option<f32>,
        stencil: Option<i32>,
    },
    SetCullFace(Option<CullFace>),
    SetWindingOrder(WindingOrder),
    SetDepthFunc(Option<CompareFunc>),
    SetBlendFunc(Option<BlendFunc>),
    SetProgram(ProgramHandle),
    SetUniform {
        program: Option<ProgramHandle>,
        name: String,
        value: UniformValue,
    },
    SetTexture {
        program: Option<ProgramHandle>,
        name: String,
        unit: u32,
        kind: SamplerKind,
        texture: Option<TextureHandle>,
    },
    SetGeometryBuffer(GeometryBufferHandle),
    Draw(DrawRecord),
}

#[derive(Copy, Clone, Debug)]
struct TextureEntry {
    kind: GpuTextureKind,
    pixel_kind: PixelKind,
}

#[derive(Clone, Debug)]
struct FrameBufferEntry {
    depth: Option<TextureHandle>,
    colors: Vec<TextureHandle>,
}

#[derive(Default)]
struct HeadlessState {
    next_id: u32,
    back_buffer_size: (usize, usize),
    force_incomplete: bool,
    rejected_pixel_kind: Option<PixelKind>,
    textures: FxHashMap<TextureHandle, TextureEntry>,
    texture_deletions: FxHashMap<TextureHandle, usize>,
    frame_buffers: FxHashMap<FrameBufferHandle, FrameBufferEntry>,
    frame_buffer_deletions: FxHashMap<FrameBufferHandle, usize>,
    programs: FxHashMap<ProgramHandle, String>,
    geometry_buffers: FxHashMap<GeometryBufferHandle, usize>,
    invalid_deletions: usize,
    bound_target: FrameTarget,
    viewport: Rect<i32>,
    program: Option<ProgramHandle>,
    geometry: Option<GeometryBufferHandle>,
    cull_face: Option<CullFace>,
    winding_order: WindingOrder,
    depth_func: Option<CompareFunc>,
    blend: Option<BlendFunc>,
    texture_units: FxHashMap<u32, TextureHandle>,
    uniforms: FxHashMap<(ProgramHandle, String), UniformValue>,
    commands: Vec<Command>,
}

impl HeadlessState {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn attachment_size(&self, texture: TextureHandle) -> Option<(usize, usize)> {
        self.textures
            .get(&texture)
            .map(|e| (e.kind.width(), e.kind.height()))
    }
}

/// See module docs.
pub struct HeadlessServer {
    state: RefCell<HeadlessState>,
}

impl HeadlessServer {
    /// Creates a server whose back buffer has the given size. The initial viewport covers the
    /// whole back buffer.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            state: RefCell::new(HeadlessState {
                back_buffer_size: (width, height),
                viewport: Rect::new(0, 0, width as i32, height as i32),
                ..Default::default()
            }),
        }
    }

    /// Size of the simulated back buffer.
    pub fn back_buffer_size(&self) -> (usize, usize) {
        self.state.borrow().back_buffer_size
    }

    /// Makes every frame buffer report itself as incomplete, which simulates a driver rejecting
    /// an attachment combination.
    pub fn set_force_incomplete(&self, incomplete: bool) {
        self.state.borrow_mut().force_incomplete = incomplete;
    }

    /// Makes creation of textures of the given pixel kind fail, which simulates a driver that
    /// does not support the format or is out of memory.
    pub fn set_rejected_pixel_kind(&self, pixel_kind: Option<PixelKind>) {
        self.state.borrow_mut().rejected_pixel_kind = pixel_kind;
    }

    /// Returns a copy of every recorded command.
    pub fn commands(&self) -> Vec<Command> {
        self.state.borrow().commands.clone()
    }

    /// Returns and forgets every recorded command. Useful to inspect a single frame.
    pub fn take_commands(&self) -> Vec<Command> {
        std::mem::take(&mut self.state.borrow_mut().commands)
    }

    /// Returns every recorded draw call.
    pub fn draws(&self) -> Vec<DrawRecord> {
        self.state
            .borrow()
            .commands
            .iter()
            .filter_map(|c| match c {
                Command::Draw(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the last value uploaded to a uniform of the program.
    pub fn uniform(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        self.state
            .borrow()
            .uniforms
            .get(&(program, name.to_owned()))
            .copied()
    }

    #[allow(missing_docs)]
    pub fn is_texture_alive(&self, texture: TextureHandle) -> bool {
        self.state.borrow().textures.contains_key(&texture)
    }

    #[allow(missing_docs)]
    pub fn live_texture_count(&self) -> usize {
        self.state.borrow().textures.len()
    }

    #[allow(missing_docs)]
    pub fn live_frame_buffer_count(&self) -> usize {
        self.state.borrow().frame_buffers.len()
    }

    #[allow(missing_docs)]
    pub fn live_program_count(&self) -> usize {
        self.state.borrow().programs.len()
    }

    /// How many times the texture was released.
    pub fn deletion_count(&self, texture: TextureHandle) -> usize {
        self.state
            .borrow()
            .texture_deletions
            .get(&texture)
            .copied()
            .unwrap_or_default()
    }

    /// How many times the frame buffer was released.
    pub fn frame_buffer_deletion_count(&self, frame_buffer: FrameBufferHandle) -> usize {
        self.state
            .borrow()
            .frame_buffer_deletions
            .get(&frame_buffer)
            .copied()
            .unwrap_or_default()
    }

    /// Amount of `delete_*` calls with a handle that was not alive (double release or garbage).
    pub fn invalid_deletions(&self) -> usize {
        self.state.borrow().invalid_deletions
    }

    /// Size of a live texture.
    pub fn texture_size(&self, texture: TextureHandle) -> Option<(usize, usize)> {
        self.state.borrow().attachment_size(texture)
    }

    /// Pixel format of a live texture.
    pub fn texture_pixel_kind(&self, texture: TextureHandle) -> Option<PixelKind> {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .map(|e| e.pixel_kind)
    }

    /// Textures attached to a live frame buffer, color attachments first.
    pub fn frame_buffer_textures(&self, frame_buffer: FrameBufferHandle) -> Vec<TextureHandle> {
        self.state
            .borrow()
            .frame_buffers
            .get(&frame_buffer)
            .map(|fb| fb.colors.iter().copied().chain(fb.depth).collect())
            .unwrap_or_default()
    }

    fn record(&self, command: Command) {
        self.state.borrow_mut().commands.push(command);
    }
}

impl GraphicsServer for HeadlessServer {
    fn create_texture(&self, desc: &GpuTextureDescriptor) -> Result<TextureHandle, FrameworkError> {
        let mut state = self.state.borrow_mut();
        if state.rejected_pixel_kind == Some(desc.pixel_kind) {
            return Err(FrameworkError::Custom(format!(
                "{:?} textures are not supported",
                desc.pixel_kind
            )));
        }
        let handle = TextureHandle(state.next_id());
        state.textures.insert(
            handle,
            TextureEntry {
                kind: desc.kind,
                pixel_kind: desc.pixel_kind,
            },
        );
        state.commands.push(Command::CreateTexture(handle));
        Ok(handle)
    }

    fn delete_texture(&self, texture: TextureHandle) {
        let mut state = self.state.borrow_mut();
        if state.textures.remove(&texture).is_some() {
            *state.texture_deletions.entry(texture).or_default() += 1;
            state.texture_units.retain(|_, t| *t != texture);
            state.commands.push(Command::DeleteTexture(texture));
        } else {
            state.invalid_deletions += 1;
            err!("Attempt to delete unknown texture {texture:?}");
        }
    }

    fn create_frame_buffer(
        &self,
        depth_attachment: Option<&Attachment>,
        color_attachments: &[Attachment],
    ) -> Result<FrameBufferHandle, FrameworkError> {
        let mut state = self.state.borrow_mut();

        for attachment in depth_attachment.into_iter().chain(color_attachments) {
            let texture = attachment.texture.handle();
            if !state.textures.contains_key(&texture) {
                return Err(FrameworkError::UnknownHandle {
                    kind: "Texture",
                    id: texture.0,
                });
            }
        }

        let handle = FrameBufferHandle(state.next_id());
        state.frame_buffers.insert(
            handle,
            FrameBufferEntry {
                depth: depth_attachment.map(|a| a.texture.handle()),
                colors: color_attachments
                    .iter()
                    .map(|a| a.texture.handle())
                    .collect(),
            },
        );
        state.commands.push(Command::CreateFrameBuffer(handle));
        Ok(handle)
    }

    fn frame_buffer_status(&self, frame_buffer: FrameBufferHandle) -> FrameBufferStatus {
        let state = self.state.borrow();

        let Some(entry) = state.frame_buffers.get(&frame_buffer) else {
            return FrameBufferStatus::Incomplete(format!("unknown frame buffer {frame_buffer:?}"));
        };

        if state.force_incomplete {
            return FrameBufferStatus::Incomplete("incomplete attachment".to_owned());
        }

        let mut sizes = entry
            .colors
            .iter()
            .chain(entry.depth.iter())
            .map(|t| state.attachment_size(*t));

        match sizes.next() {
            None => FrameBufferStatus::Incomplete("missing attachment".to_owned()),
            Some(None) => FrameBufferStatus::Incomplete("attachment was released".to_owned()),
            Some(first) => {
                if sizes.all(|s| s == first) {
                    FrameBufferStatus::Complete
                } else {
                    FrameBufferStatus::Incomplete("attachment size mismatch".to_owned())
                }
            }
        }
    }

    fn delete_frame_buffer(&self, frame_buffer: FrameBufferHandle) {
        let mut state = self.state.borrow_mut();
        if state.frame_buffers.remove(&frame_buffer).is_some() {
            *state.frame_buffer_deletions.entry(frame_buffer).or_default() += 1;
            if state.bound_target == FrameTarget::FrameBuffer(frame_buffer) {
                state.bound_target = FrameTarget::BackBuffer;
            }
            state.commands.push(Command::DeleteFrameBuffer(frame_buffer));
        } else {
            state.invalid_deletions += 1;
            err!(
                "Attempt to delete unknown frame buffer {frame_buffer:?}"
            );
        }
    }

    fn create_program(
        &self,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramHandle, FrameworkError> {
        for (stage, source) in [("VertexShader", vertex_source), ("FragmentShader", fragment_source)]
        {
            if source.trim().is_empty() {
                return Err(FrameworkError::ShaderCompilationFailed {
                    shader_name: format!("{name}_{stage}"),
                    error_message: "empty shader source".to_owned(),
                });
            }
        }

        let mut state = self.state.borrow_mut();
        let handle = ProgramHandle(state.next_id());
        state.programs.insert(handle, name.to_owned());
        state.commands.push(Command::CreateProgram(handle));
        Ok(handle)
    }

    fn delete_program(&self, program: ProgramHandle) {
        let mut state = self.state.borrow_mut();
        if state.programs.remove(&program).is_some() {
            if state.program == Some(program) {
                state.program = None;
            }
            state.commands.push(Command::DeleteProgram(program));
        } else {
            state.invalid_deletions += 1;
            err!("Attempt to delete unknown program {program:?}");
        }
    }

    fn create_geometry_buffer(
        &self,
        desc: &GeometryBufferDescriptor,
    ) -> Result<GeometryBufferHandle, FrameworkError> {
        let mut state = self.state.borrow_mut();
        let handle = GeometryBufferHandle(state.next_id());
        state.geometry_buffers.insert(handle, desc.triangles.len());
        state.commands.push(Command::CreateGeometryBuffer(handle));
        Ok(handle)
    }

    fn delete_geometry_buffer(&self, buffer: GeometryBufferHandle) {
        let mut state = self.state.borrow_mut();
        if state.geometry_buffers.remove(&buffer).is_some() {
            if state.geometry == Some(buffer) {
                state.geometry = None;
            }
            state.commands.push(Command::DeleteGeometryBuffer(buffer));
        } else {
            state.invalid_deletions += 1;
            err!("Attempt to delete unknown geometry buffer {buffer:?}");
        }
    }

    fn bind_frame_buffer(&self, target: FrameTarget) {
        let mut state = self.state.borrow_mut();
        if let FrameTarget::FrameBuffer(handle) = target {
            if !state.frame_buffers.contains_key(&handle) {
                err!("Attempt to bind unknown frame buffer {handle:?}");
                return;
            }
        }
        state.bound_target = target;
        state.commands.push(Command::BindFrameBuffer(target));
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
        self.record(Command::Blit {
            source,
            dest,
            source_rect,
            dest_rect,
            mask,
        });
    }

    fn set_viewport(&self, viewport: Rect<i32>) {
        let mut state = self.state.borrow_mut();
        state.viewport = viewport;
        state.commands.push(Command::SetViewport(viewport));
    }

    fn viewport(&self) -> Rect<i32> {
        self.state.borrow().viewport
    }

    fn clear(&self, color: Option<Color>, depth: Option<f32>, stencil: Option<i32>) {
        let target = self.state.borrow().bound_target;
        self.record(Command::Clear {
            target,
            color,
            depth,
            stencil,
        });
    }

    fn set_cull_face(&self, cull_face: Option<CullFace>) {
        let mut state = self.state.borrow_mut();
        state.cull_face = cull_face;
        state.commands.push(Command::SetCullFace(cull_face));
    }

    fn set_winding_order(&self, winding_order: WindingOrder) {
        let mut state = self.state.borrow_mut();
        state.winding_order = winding_order;
        state.commands.push(Command::SetWindingOrder(winding_order));
    }

    fn set_depth_func(&self, func: Option<CompareFunc>) {
        let mut state = self.state.borrow_mut();
        state.depth_func = func;
        state.commands.push(Command::SetDepthFunc(func));
    }

    fn set_blend_func(&self, func: Option<BlendFunc>) {
        let mut state = self.state.borrow_mut();
        state.blend = func;
        state.commands.push(Command::SetBlendFunc(func));
    }

    fn set_program(&self, program: ProgramHandle) {
        let mut state = self.state.borrow_mut();
        if !state.programs.contains_key(&program) {
            err!("Attempt to bind unknown program {program:?}");
            return;
        }
        state.program = Some(program);
        state.commands.push(Command::SetProgram(program));
    }

    fn set_uniform(&self, name: &str, value: UniformValue) {
        let mut state = self.state.borrow_mut();
        let program = state.program;
        if let Some(program) = program {
            state.uniforms.insert((program, name.to_owned()), value);
        }
        state.commands.push(Command::SetUniform {
            program,
            name: name.to_owned(),
            value,
        });
    }

    fn set_texture(&self, name: &str, unit: u32, kind: SamplerKind, texture: Option<TextureHandle>) {
        let mut state = self.state.borrow_mut();
        match texture {
            Some(texture) => {
                if !state.textures.contains_key(&texture) {
                    err!("Attempt to bind unknown texture {texture:?}");
                    return;
                }
                state.texture_units.insert(unit, texture);
            }
            None => {
                state.texture_units.remove(&unit);
            }
        }
        let program = state.program;
        state.commands.push(Command::SetTexture {
            program,
            name: name.to_owned(),
            unit,
            kind,
            texture,
        });
    }

    fn set_geometry_buffer(&self, buffer: GeometryBufferHandle) {
        let mut state = self.state.borrow_mut();
        if !state.geometry_buffers.contains_key(&buffer) {
            err!("Attempt to bind unknown geometry buffer {buffer:?}");
            return;
        }
        state.geometry = Some(buffer);
        state.commands.push(Command::SetGeometryBuffer(buffer));
    }

    fn draw_elements(
        &self,
        instance_count: Option<usize>,
    ) -> Result<DrawCallStatistics, FrameworkError> {
        let mut state = self.state.borrow_mut();

        let geometry = state.geometry.ok_or(FrameworkError::NoGeometryBound)?;
        let triangles = state
            .geometry_buffers
            .get(&geometry)
            .copied()
            .ok_or(FrameworkError::UnknownHandle {
                kind: "GeometryBuffer",
                id: geometry.0,
            })?
            * instance_count.unwrap_or(1);

        let mut textures = state
            .texture_units
            .iter()
            .map(|(unit, texture)| (*unit, *texture))
            .collect::<Vec<_>>();
        textures.sort_unstable();

        let record = DrawRecord {
            target: state.bound_target,
            viewport: state.viewport,
            program: state.program,
            geometry,
            triangles,
            instance_count,
            blend: state.blend,
            cull_face: state.cull_face,
            depth_func: state.depth_func,
            textures,
        };
        state.commands.push(Command::Draw(record));

        Ok(DrawCallStatistics { triangles })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::renderer::framework::{
        framebuffer::{AttachmentKind, GpuFrameBuffer},
        gpu_texture::GpuTexture,
        server::SharedGraphicsServer,
    };
    use std::rc::Rc;

    fn render_target(server: &SharedGraphicsServer, w: usize, h: usize) -> Rc<GpuTexture> {
        Rc::new(
            GpuTexture::new(
                server,
                GpuTextureDescriptor {
                    kind: GpuTextureKind::Rectangle {
                        width: w,
                        height: h,
                    },
                    ..Default::default()
                },
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_mismatched_attachments_are_incomplete() {
        let headless = Rc::new(HeadlessServer::new(8, 8));
        let server: SharedGraphicsServer = headless.clone();
        let frame_buffer = GpuFrameBuffer::new(
            &server,
            None,
            vec![
                Attachment {
                    kind: AttachmentKind::Color,
                    texture: render_target(&server, 8, 8),
                },
                Attachment {
                    kind: AttachmentKind::Color,
                    texture: render_target(&server, 4, 8),
                },
            ],
        )
        .unwrap();
        assert_eq!(
            frame_buffer.status(&*server),
            FrameBufferStatus::Incomplete("attachment size mismatch".to_owned())
        );
    }

    #[test]
    fn test_frame_buffer_releases_attachments_once() {
        let headless = Rc::new(HeadlessServer::new(8, 8));
        let server: SharedGraphicsServer = headless.clone();
        let texture = render_target(&server, 8, 8);
        let handle = texture.handle();
        let frame_buffer = GpuFrameBuffer::new(
            &server,
            None,
            vec![Attachment {
                kind: AttachmentKind::Color,
                texture,
            }],
        )
        .unwrap();
        assert!(frame_buffer.status(&*server).is_complete());

        let fb_handle = frame_buffer.handle();
        drop(frame_buffer);
        assert_eq!(headless.deletion_count(handle), 1);
        assert_eq!(headless.frame_buffer_deletion_count(fb_handle), 1);
        assert_eq!(headless.live_texture_count(), 0);
        assert_eq!(headless.invalid_deletions(), 0);
    }

    #[test]
    fn test_draw_without_geometry_fails() {
        let server = HeadlessServer::new(8, 8);
        assert!(matches!(
            server.draw_elements(None),
            Err(FrameworkError::NoGeometryBound)
        ));
    }
}

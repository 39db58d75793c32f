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

//! Graphics server is an abstraction layer over the graphics API the renderer runs on. The
//! renderer only issues commands through [`GraphicsServer`], so a pass sequence can run on
//! OpenGL or on the recording [`super::headless::HeadlessServer`] without changes.

use crate::{
    core::{color::Color, math::Rect},
    renderer::framework::{
        error::FrameworkError,
        framebuffer::{Attachment, FrameBufferHandle, FrameBufferStatus, FrameTarget},
        geometry_buffer::{DrawCallStatistics, GeometryBufferDescriptor, GeometryBufferHandle},
        gpu_program::{ProgramHandle, UniformValue},
        gpu_texture::{GpuTextureDescriptor, SamplerKind, TextureHandle},
        BlendFunc, BufferMask, CompareFunc, CullFace, WindingOrder,
    },
};
use std::rc::Rc;

/// A shared reference to a graphics server.
pub type SharedGraphicsServer = Rc<dyn GraphicsServer>;

/// GPU command surface used by every render pass. All methods take `&self`; implementations
/// keep their mutable state behind interior mutability and are not thread-safe.
///
/// Resource lifetime is managed by the wrappers in [`super`] (`GpuTexture`, `GpuFrameBuffer`,
/// `GpuProgram`, `GpuGeometryBuffer`), which call the `delete_*` methods exactly once on drop.
pub trait GraphicsServer {
    /// Allocates a new texture. The descriptor is already validated by the caller.
    fn create_texture(&self, desc: &GpuTextureDescriptor) -> Result<TextureHandle, FrameworkError>;

    /// Releases a texture.
    fn delete_texture(&self, texture: TextureHandle);

    /// Creates a frame buffer with the given attachments. An incomplete frame buffer is still
    /// created, its state can be queried with [`Self::frame_buffer_status`].
    fn create_frame_buffer(
        &self,
        depth_attachment: Option<&Attachment>,
        color_attachments: &[Attachment],
    ) -> Result<FrameBufferHandle, FrameworkError>;

    /// Checks completeness of a frame buffer.
    fn frame_buffer_status(&self, frame_buffer: FrameBufferHandle) -> FrameBufferStatus;

    /// Releases a frame buffer. Attached textures are not affected.
    fn delete_frame_buffer(&self, frame_buffer: FrameBufferHandle);

    /// Compiles and links a program from a pair of vertex and fragment shaders. The name is
    /// used for diagnostics only.
    fn create_program(
        &self,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramHandle, FrameworkError>;

    /// Releases a program.
    fn delete_program(&self, program: ProgramHandle);

    /// Uploads indexed triangle geometry.
    fn create_geometry_buffer(
        &self,
        desc: &GeometryBufferDescriptor,
    ) -> Result<GeometryBufferHandle, FrameworkError>;

    /// Releases a geometry buffer.
    fn delete_geometry_buffer(&self, buffer: GeometryBufferHandle);

    /// Directs all further draw and clear commands to the given target.
    fn bind_frame_buffer(&self, target: FrameTarget);

    /// Returns the target draw commands currently go to.
    fn bound_frame_buffer(&self) -> FrameTarget;

    /// Copies a region of `source` into `dest`. The bound target is left unchanged.
    fn blit_frame_buffer(
        &self,
        source: FrameTarget,
        dest: FrameTarget,
        source_rect: Rect<i32>,
        dest_rect: Rect<i32>,
        mask: BufferMask,
    );

    /// Sets the rectangle draw commands are mapped to.
    fn set_viewport(&self, viewport: Rect<i32>);

    /// Returns the current viewport.
    fn viewport(&self) -> Rect<i32>;

    /// Clears planes of the bound target, `None` leaves a plane untouched.
    fn clear(&self, color: Option<Color>, depth: Option<f32>, stencil: Option<i32>);

    /// Enables culling of the given faces, `None` disables culling.
    fn set_cull_face(&self, cull_face: Option<CullFace>);

    /// Sets vertex winding of front-facing triangles.
    fn set_winding_order(&self, winding_order: WindingOrder);

    /// Enables depth test with the given function, `None` disables depth test.
    fn set_depth_func(&self, func: Option<CompareFunc>);

    /// Enables blending with the given function, `None` disables blending.
    fn set_blend_func(&self, func: Option<BlendFunc>);

    /// Makes the program current. Uniform and texture commands apply to it.
    fn set_program(&self, program: ProgramHandle);

    /// Uploads a uniform of the current program. Unknown names are ignored, shaders are free to
    /// optimize unused inputs out.
    fn set_uniform(&self, name: &str, value: UniformValue);

    /// Binds a texture (or nothing) to the texture unit and points sampler `name` of the current
    /// program at that unit.
    fn set_texture(&self, name: &str, unit: u32, kind: SamplerKind, texture: Option<TextureHandle>);

    /// Makes the geometry buffer current.
    fn set_geometry_buffer(&self, buffer: GeometryBufferHandle);

    /// Draws every triangle of the current geometry buffer, `Some(n)` draws `n` instances.
    fn draw_elements(
        &self,
        instance_count: Option<usize>,
    ) -> Result<DrawCallStatistics, FrameworkError>;
}

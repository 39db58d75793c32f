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

//! Geometry buffer of the deferred path. Holds per-pixel world position, normal, albedo with
//! shininess and depth. Lighting composite samples these attachments at fixed texture units:
//!
//! | Sampler                   | Unit | Format  |
//! |---------------------------|------|---------|
//! | `Texture_Position`        | 0    | RGBA16F |
//! | `Texture_Normal`          | 1    | RGBA16F |
//! | `Texture_AlbedoShininess` | 2    | RGBA8   |
//! | `Texture_Depth`           | 3    | D32F    |

#![allow(missing_docs)]

use crate::{
    core::{color::Color, math::Rect},
    renderer::framework::{
        error::FrameworkError,
        framebuffer::{Attachment, AttachmentKind, FrameTarget, GpuFrameBuffer},
        gpu_program::GpuProgramBinding,
        gpu_texture::{GpuTexture, GpuTextureDescriptor, PixelKind, SamplerKind, TextureHandle},
        server::{GraphicsServer, SharedGraphicsServer},
        BufferMask,
    },
    warn,
    warn_once,
};
use std::rc::Rc;

pub const POSITION_TEXTURE_UNIT: u32 = 0;
pub const NORMAL_TEXTURE_UNIT: u32 = 1;
pub const ALBEDO_SHININESS_TEXTURE_UNIT: u32 = 2;
pub const DEPTH_TEXTURE_UNIT: u32 = 3;

pub struct GBuffer {
    framebuffer: GpuFrameBuffer,
    depth: Rc<GpuTexture>,
    width: usize,
    height: usize,
    // Target that was bound before `bind`.
    saved_target: Option<FrameTarget>,
    // Index of the frame that last wrote the attachments.
    filled_frame: Option<u64>,
}

fn make_framebuffer(
    server: &SharedGraphicsServer,
    width: usize,
    height: usize,
) -> Result<(GpuFrameBuffer, Rc<GpuTexture>), FrameworkError> {
    let attachment = |kind, pixel_kind| -> Result<Attachment, FrameworkError> {
        Ok(Attachment {
            kind,
            texture: Rc::new(GpuTexture::new(
                server,
                GpuTextureDescriptor::render_target(width, height, pixel_kind),
            )?),
        })
    };

    let depth = attachment(AttachmentKind::Depth, PixelKind::D32F)?;
    let depth_texture = depth.texture.clone();

    let framebuffer = GpuFrameBuffer::new(
        server,
        Some(depth),
        vec![
            attachment(AttachmentKind::Color, PixelKind::RGBA16F)?,
            attachment(AttachmentKind::Color, PixelKind::RGBA16F)?,
            attachment(AttachmentKind::Color, PixelKind::RGBA8)?,
        ],
    )?;

    framebuffer.verify_completeness(&**server, "GBuffer");

    Ok((framebuffer, depth_texture))
}

impl GBuffer {
    pub fn new(
        server: &SharedGraphicsServer,
        width: usize,
        height: usize,
    ) -> Result<Self, FrameworkError> {
        let (framebuffer, depth) = make_framebuffer(server, width, height)?;
        Ok(Self {
            framebuffer,
            depth,
            width,
            height,
            saved_target: None,
            filled_frame: None,
        })
    }

    /// Recreates every attachment with the new size. Sizes of 2 pixels or less in either
    /// dimension are ignored, minimized windows report such sizes.
    pub fn resize(
        &mut self,
        server: &SharedGraphicsServer,
        width: usize,
        height: usize,
    ) -> Result<(), FrameworkError> {
        if width <= 2 || height <= 2 {
            return Ok(());
        }

        if width == self.width && height == self.height {
            return Ok(());
        }

        // Old attachments are released when the previous frame buffer is dropped here.
        let (framebuffer, depth) = make_framebuffer(server, width, height)?;
        self.framebuffer = framebuffer;
        self.depth = depth;
        self.width = width;
        self.height = height;
        self.filled_frame = None;

        Ok(())
    }

    /// Directs draws into the attachments, sets viewport to the buffer size and clears color
    /// and depth. `frame` is remembered to detect stale reads.
    pub fn bind(&mut self, server: &dyn GraphicsServer, frame: u64) {
        self.saved_target = Some(server.bound_frame_buffer());
        server.bind_frame_buffer(self.framebuffer.target());
        server.set_viewport(self.viewport());
        server.clear(Some(Color::TRANSPARENT), Some(1.0), None);
        self.filled_frame = Some(frame);
    }

    /// Restores the target that was bound before [`Self::bind`].
    pub fn unbind(&mut self, server: &dyn GraphicsServer) {
        match self.saved_target.take() {
            Some(target) => server.bind_frame_buffer(target),
            None => {
                warn!("GBuffer was unbound without being bound first.");
                server.bind_frame_buffer(FrameTarget::BackBuffer);
            }
        }
    }

    /// Copies depth of the buffer into `target`, so forward-rendered geometry is depth tested
    /// against deferred geometry.
    pub fn write_depth(&self, server: &dyn GraphicsServer, target: FrameTarget) {
        let rect = self.viewport();
        server.blit_frame_buffer(self.framebuffer.target(), target, rect, rect, BufferMask::DEPTH);
    }

    /// Binds the attachments as inputs of the program. Attachments written in another frame
    /// are still bound but reported once.
    pub fn populate_shader(&self, program: &mut GpuProgramBinding, frame: u64) {
        if self.filled_frame != Some(frame) {
            warn_once!(
                self as *const _ as usize,
                "GBuffer is sampled but it was not filled this frame!",
            );
        }

        program
            .set_texture(
                "Texture_Position",
                POSITION_TEXTURE_UNIT,
                self.position_texture(),
            )
            .set_texture("Texture_Normal", NORMAL_TEXTURE_UNIT, self.normal_texture())
            .set_texture(
                "Texture_AlbedoShininess",
                ALBEDO_SHININESS_TEXTURE_UNIT,
                self.albedo_shininess_texture(),
            )
            .set_texture("Texture_Depth", DEPTH_TEXTURE_UNIT, self.depth_texture());
    }

    /// Detaches the attachments from the units [`Self::populate_shader`] bound them to.
    pub fn unbind_textures(&self, program: &mut GpuProgramBinding) {
        program
            .unset_texture("Texture_Position", POSITION_TEXTURE_UNIT, SamplerKind::Texture2D)
            .unset_texture("Texture_Normal", NORMAL_TEXTURE_UNIT, SamplerKind::Texture2D)
            .unset_texture(
                "Texture_AlbedoShininess",
                ALBEDO_SHININESS_TEXTURE_UNIT,
                SamplerKind::Texture2D,
            )
            .unset_texture("Texture_Depth", DEPTH_TEXTURE_UNIT, SamplerKind::Texture2D);
    }

    pub fn viewport(&self) -> Rect<i32> {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn framebuffer(&self) -> &GpuFrameBuffer {
        &self.framebuffer
    }

    pub fn filled_frame(&self) -> Option<u64> {
        self.filled_frame
    }

    pub fn position_texture(&self) -> &GpuTexture {
        &self.framebuffer.color_attachments()[0].texture
    }

    pub fn normal_texture(&self) -> &GpuTexture {
        &self.framebuffer.color_attachments()[1].texture
    }

    pub fn albedo_shininess_texture(&self) -> &GpuTexture {
        &self.framebuffer.color_attachments()[2].texture
    }

    pub fn depth_texture(&self) -> &GpuTexture {
        &self.depth
    }

    /// Handles of every attachment texture.
    pub fn textures(&self) -> Vec<TextureHandle> {
        self.framebuffer
            .color_attachments()
            .iter()
            .chain(self.framebuffer.depth_attachment())
            .map(|a| a.texture.handle())
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::renderer::framework::{gpu_program::GpuProgram, headless::HeadlessServer};

    fn make() -> (Rc<HeadlessServer>, SharedGraphicsServer) {
        let headless = Rc::new(HeadlessServer::new(320, 240));
        let server: SharedGraphicsServer = headless.clone();
        (headless, server)
    }

    #[test]
    fn test_attachment_formats() {
        let (headless, server) = make();
        let gbuffer = GBuffer::new(&server, 320, 240).unwrap();
        let kinds = gbuffer
            .textures()
            .into_iter()
            .map(|t| headless.texture_pixel_kind(t).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                PixelKind::RGBA16F,
                PixelKind::RGBA16F,
                PixelKind::RGBA8,
                PixelKind::D32F
            ]
        );
        assert!(gbuffer.framebuffer().status(&*server).is_complete());
    }

    #[test]
    fn test_resize_releases_old_attachments_once() {
        let (headless, server) = make();
        let mut gbuffer = GBuffer::new(&server, 320, 240).unwrap();
        let old = gbuffer.textures();
        let old_fb = gbuffer.framebuffer().handle();

        gbuffer.resize(&server, 1024, 768).unwrap();

        for texture in gbuffer.textures() {
            assert_eq!(headless.texture_size(texture), Some((1024, 768)));
        }
        for texture in old {
            assert!(!headless.is_texture_alive(texture));
            assert_eq!(headless.deletion_count(texture), 1);
        }
        assert_eq!(headless.frame_buffer_deletion_count(old_fb), 1);
        assert_eq!(headless.invalid_deletions(), 0);
    }

    #[test]
    fn test_tiny_resize_is_ignored() {
        let (_, server) = make();
        let mut gbuffer = GBuffer::new(&server, 320, 240).unwrap();
        let fb = gbuffer.framebuffer().handle();
        gbuffer.resize(&server, 2, 600).unwrap();
        gbuffer.resize(&server, 800, 1).unwrap();
        assert_eq!(gbuffer.size(), (320, 240));
        assert_eq!(gbuffer.framebuffer().handle(), fb);
    }

    #[test]
    fn test_bind_unbind_restores_target() {
        let (_, server) = make();
        let mut gbuffer = GBuffer::new(&server, 320, 240).unwrap();
        gbuffer.bind(&*server, 7);
        assert_eq!(server.bound_frame_buffer(), gbuffer.framebuffer().target());
        gbuffer.unbind(&*server);
        assert_eq!(server.bound_frame_buffer(), FrameTarget::BackBuffer);
        assert_eq!(gbuffer.filled_frame(), Some(7));
    }

    #[test]
    fn test_populate_shader_uses_unit_contract() {
        let (headless, server) = make();
        let mut gbuffer = GBuffer::new(&server, 320, 240).unwrap();
        let program = GpuProgram::from_source(&server, "Lighting", "vs", "fs").unwrap();
        gbuffer.bind(&*server, 0);
        gbuffer.unbind(&*server);

        headless.take_commands();
        gbuffer.populate_shader(&mut program.bind(&*server), 0);

        let bound = headless
            .take_commands()
            .into_iter()
            .filter_map(|c| match c {
                crate::renderer::framework::headless::Command::SetTexture {
                    name,
                    unit,
                    texture,
                    ..
                } => Some((name, unit, texture)),
                _ => None,
            })
            .collect::<Vec<_>>();

        assert_eq!(
            bound,
            vec![
                (
                    "Texture_Position".to_owned(),
                    0,
                    Some(gbuffer.position_texture().handle())
                ),
                (
                    "Texture_Normal".to_owned(),
                    1,
                    Some(gbuffer.normal_texture().handle())
                ),
                (
                    "Texture_AlbedoShininess".to_owned(),
                    2,
                    Some(gbuffer.albedo_shininess_texture().handle())
                ),
                (
                    "Texture_Depth".to_owned(),
                    3,
                    Some(gbuffer.depth_texture().handle())
                ),
            ]
        );
    }
}

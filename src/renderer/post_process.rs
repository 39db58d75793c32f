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

//! Off-screen target of the forward path. The whole scene is shaded into it, then a
//! post-process program samples its color attachment as `Texture0` while drawing into the
//! presentation target.

#![allow(missing_docs)]

use crate::{
    core::{color::Color, math::Rect},
    renderer::framework::{
        error::FrameworkError,
        framebuffer::{Attachment, AttachmentKind, FrameTarget, GpuFrameBuffer},
        gpu_program::GpuProgramBinding,
        gpu_texture::{GpuTexture, GpuTextureDescriptor, PixelKind, SamplerKind},
        server::{GraphicsServer, SharedGraphicsServer},
    },
    warn,
    warn_once,
};
use std::rc::Rc;

/// Texture unit of the color attachment in the post-process program.
pub const COLOR_TEXTURE_UNIT: u32 = 0;

pub struct PostProcessTarget {
    framebuffer: GpuFrameBuffer,
    width: usize,
    height: usize,
    saved_target: Option<FrameTarget>,
    filled_frame: Option<u64>,
}

fn make_framebuffer(
    server: &SharedGraphicsServer,
    width: usize,
    height: usize,
) -> Result<GpuFrameBuffer, FrameworkError> {
    let color = Rc::new(GpuTexture::new(
        server,
        GpuTextureDescriptor::render_target(width, height, PixelKind::RGBA8),
    )?);
    let depth_stencil = Rc::new(GpuTexture::new(
        server,
        GpuTextureDescriptor::render_target(width, height, PixelKind::D24S8),
    )?);

    let framebuffer = GpuFrameBuffer::new(
        server,
        Some(Attachment {
            kind: AttachmentKind::DepthStencil,
            texture: depth_stencil,
        }),
        vec![Attachment {
            kind: AttachmentKind::Color,
            texture: color,
        }],
    )?;

    framebuffer.verify_completeness(&**server, "Post-process target");

    Ok(framebuffer)
}

impl PostProcessTarget {
    pub fn new(
        server: &SharedGraphicsServer,
        width: usize,
        height: usize,
    ) -> Result<Self, FrameworkError> {
        Ok(Self {
            framebuffer: make_framebuffer(server, width, height)?,
            width,
            height,
            saved_target: None,
            filled_frame: None,
        })
    }

    /// Same rules as [`crate::renderer::gbuffer::GBuffer::resize`].
    pub fn resize(
        &mut self,
        server: &SharedGraphicsServer,
        width: usize,
        height: usize,
    ) -> Result<(), FrameworkError> {
        if width <= 2 || height <= 2 || (width == self.width && height == self.height) {
            return Ok(());
        }

        self.framebuffer = make_framebuffer(server, width, height)?;
        self.width = width;
        self.height = height;
        self.filled_frame = None;

        Ok(())
    }

    /// Directs draws into the target and clears color, depth and stencil.
    pub fn bind(&mut self, server: &dyn GraphicsServer, clear_color: Color, frame: u64) {
        self.saved_target = Some(server.bound_frame_buffer());
        server.bind_frame_buffer(self.framebuffer.target());
        server.set_viewport(self.viewport());
        server.clear(Some(clear_color), Some(1.0), Some(0));
        self.filled_frame = Some(frame);
    }

    pub fn unbind(&mut self, server: &dyn GraphicsServer) {
        match self.saved_target.take() {
            Some(target) => server.bind_frame_buffer(target),
            None => {
                warn!("Post-process target was unbound without being bound first.");
                server.bind_frame_buffer(FrameTarget::BackBuffer);
            }
        }
    }

    /// Binds the color attachment as `Texture0`.
    pub fn populate_shader(&self, program: &mut GpuProgramBinding, frame: u64) {
        if self.filled_frame != Some(frame) {
            warn_once!(
                self as *const _ as usize,
                "Post-process target is sampled but it was not filled this frame!",
            );
        }

        program.set_texture("Texture0", COLOR_TEXTURE_UNIT, self.color_texture());
    }

    pub fn unbind_textures(&self, program: &mut GpuProgramBinding) {
        program.unset_texture("Texture0", COLOR_TEXTURE_UNIT, SamplerKind::Texture2D);
    }

    pub fn color_texture(&self) -> &GpuTexture {
        &self.framebuffer.color_attachments()[0].texture
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
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::renderer::framework::headless::HeadlessServer;

    #[test]
    fn test_attachments() {
        let headless = Rc::new(HeadlessServer::new(100, 100));
        let server: SharedGraphicsServer = headless.clone();
        let target = PostProcessTarget::new(&server, 100, 50).unwrap();
        let textures = headless.frame_buffer_textures(target.framebuffer().handle());
        assert_eq!(textures.len(), 2);
        assert_eq!(
            headless.texture_pixel_kind(target.color_texture().handle()),
            Some(PixelKind::RGBA8)
        );
        assert!(textures
            .iter()
            .any(|t| headless.texture_pixel_kind(*t) == Some(PixelKind::D24S8)));
    }

    #[test]
    fn test_resize_recreates_attachments() {
        let headless = Rc::new(HeadlessServer::new(100, 100));
        let server: SharedGraphicsServer = headless.clone();
        let mut target = PostProcessTarget::new(&server, 100, 100).unwrap();
        let old = target.color_texture().handle();

        target.resize(&server, 1, 1).unwrap();
        assert_eq!(target.color_texture().handle(), old);

        target.resize(&server, 200, 150).unwrap();
        assert_eq!(
            headless.texture_size(target.color_texture().handle()),
            Some((200, 150))
        );
        assert_eq!(headless.deletion_count(old), 1);
        assert_eq!(headless.live_texture_count(), 2);
    }
}

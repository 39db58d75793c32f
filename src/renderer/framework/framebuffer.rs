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

#![allow(missing_docs)]

use crate::{
    err,
    renderer::framework::{
        error::FrameworkError,
        gpu_texture::GpuTexture,
        server::{GraphicsServer, SharedGraphicsServer},
    },
};
use std::rc::{Rc, Weak};

/// Opaque identifier of a frame buffer inside a graphics server.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameBufferHandle(pub u32);

/// Destination of draw commands.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FrameTarget {
    /// Default frame buffer of the window.
    #[default]
    BackBuffer,
    /// Off-screen frame buffer.
    FrameBuffer(FrameBufferHandle),
}

#[derive(Copy, Clone, PartialOrd, PartialEq, Eq, Hash, Debug)]
pub enum AttachmentKind {
    Color,
    DepthStencil,
    Depth,
}

impl AttachmentKind {
    fn name(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::DepthStencil => "depth-stencil",
            Self::Depth => "depth",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub texture: Rc<GpuTexture>,
}

/// Result of a frame buffer completeness check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameBufferStatus {
    Complete,
    Incomplete(String),
}

impl FrameBufferStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Off-screen render target with a set of texture attachments. Attachments are shared, the
/// textures are released when the last frame buffer (or user) referencing them is dropped.
pub struct GpuFrameBuffer {
    handle: FrameBufferHandle,
    depth_attachment: Option<Attachment>,
    color_attachments: Vec<Attachment>,
    server: Weak<dyn GraphicsServer>,
}

impl GpuFrameBuffer {
    pub fn new(
        server: &SharedGraphicsServer,
        depth_attachment: Option<Attachment>,
        color_attachments: Vec<Attachment>,
    ) -> Result<Self, FrameworkError> {
        if let Some(depth_attachment) = depth_attachment.as_ref() {
            if depth_attachment.kind == AttachmentKind::Color {
                return Err(FrameworkError::InvalidAttachment {
                    expected: "depth",
                    actual: depth_attachment.kind.name(),
                });
            }
        }

        if let Some(attachment) = color_attachments
            .iter()
            .find(|a| a.kind != AttachmentKind::Color)
        {
            return Err(FrameworkError::InvalidAttachment {
                expected: "color",
                actual: attachment.kind.name(),
            });
        }

        let handle = server.create_frame_buffer(depth_attachment.as_ref(), &color_attachments)?;

        Ok(Self {
            handle,
            depth_attachment,
            color_attachments,
            server: Rc::downgrade(server),
        })
    }

    pub fn handle(&self) -> FrameBufferHandle {
        self.handle
    }

    pub fn target(&self) -> FrameTarget {
        FrameTarget::FrameBuffer(self.handle)
    }

    pub fn color_attachments(&self) -> &[Attachment] {
        &self.color_attachments
    }

    pub fn depth_attachment(&self) -> Option<&Attachment> {
        self.depth_attachment.as_ref()
    }

    pub fn status(&self, server: &dyn GraphicsServer) -> FrameBufferStatus {
        server.frame_buffer_status(self.handle)
    }

    /// Checks completeness and writes an error into the log if the frame buffer cannot be
    /// rendered to. Rendering into an incomplete target is allowed, the output is just undefined.
    pub fn verify_completeness(&self, server: &dyn GraphicsServer, name: &str) -> bool {
        match self.status(server) {
            FrameBufferStatus::Complete => true,
            FrameBufferStatus::Incomplete(reason) => {
                err!("{name} frame buffer is incomplete: {reason}");
                false
            }
        }
    }
}

impl Drop for GpuFrameBuffer {
    fn drop(&mut self) {
        if let Some(server) = self.server.upgrade() {
            server.delete_frame_buffer(self.handle);
        }
    }
}

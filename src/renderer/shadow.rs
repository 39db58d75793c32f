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

//! Depth-only render targets for directional light shadows.

use crate::{
    core::math::Rect,
    err,
    renderer::{
        framework::{
            error::FrameworkError,
            framebuffer::{Attachment, AttachmentKind, FrameTarget, GpuFrameBuffer},
            gpu_texture::{GpuTexture, GpuTextureDescriptor, PixelKind},
            server::{GraphicsServer, SharedGraphicsServer},
        },
        light::MAX_DIRECTIONAL_LIGHTS,
    },
    warn,
};
use arrayvec::ArrayVec;
use std::rc::Rc;

/// Resolution of a shadow map if nothing else is configured.
pub const DEFAULT_SHADOW_MAP_SIZE: usize = 4096;

/// Square depth-only target. Its resolution is fixed at creation and does not follow the
/// window size.
pub struct ShadowMap {
    frame_buffer: GpuFrameBuffer,
    depth: Rc<GpuTexture>,
    size: usize,
    // Target and viewport that were active before `bind`.
    saved_state: Option<(FrameTarget, Rect<i32>)>,
}

impl ShadowMap {
    pub fn new(server: &SharedGraphicsServer, size: usize) -> Result<Self, FrameworkError> {
        let depth = Rc::new(GpuTexture::new(
            server,
            GpuTextureDescriptor::render_target(size, size, PixelKind::D32F),
        )?);

        let frame_buffer = GpuFrameBuffer::new(
            server,
            Some(Attachment {
                kind: AttachmentKind::Depth,
                texture: depth.clone(),
            }),
            Vec::new(),
        )?;

        frame_buffer.verify_completeness(&**server, "Shadow map");

        Ok(Self {
            frame_buffer,
            depth,
            size,
            saved_state: None,
        })
    }

    /// Directs draws into the map: remembers the current target and viewport, binds the map,
    /// sets the viewport to the map resolution and clears depth.
    pub fn bind(&mut self, server: &dyn GraphicsServer) {
        self.saved_state = Some((server.bound_frame_buffer(), server.viewport()));
        server.bind_frame_buffer(self.frame_buffer.target());
        server.set_viewport(Rect::new(0, 0, self.size as i32, self.size as i32));
        server.clear(None, Some(1.0), None);
    }

    /// Restores the target and viewport that were active before [`Self::bind`].
    pub fn unbind(&mut self, server: &dyn GraphicsServer) {
        match self.saved_state.take() {
            Some((target, viewport)) => {
                server.bind_frame_buffer(target);
                server.set_viewport(viewport);
            }
            None => {
                warn!("Shadow map was unbound without being bound first.");
                server.bind_frame_buffer(FrameTarget::BackBuffer);
            }
        }
    }

    pub fn depth_texture(&self) -> &Rc<GpuTexture> {
        &self.depth
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn frame_buffer(&self) -> &GpuFrameBuffer {
        &self.frame_buffer
    }
}

/// One shadow map per directional light slot.
pub struct ShadowMapSet {
    maps: ArrayVec<ShadowMap, MAX_DIRECTIONAL_LIGHTS>,
    size: usize,
}

impl ShadowMapSet {
    /// Creates a map for every directional light slot.
    pub fn new(server: &SharedGraphicsServer, size: usize) -> Result<Self, FrameworkError> {
        let mut maps = ArrayVec::new();
        for _ in 0..MAX_DIRECTIONAL_LIGHTS {
            maps.push(ShadowMap::new(server, size)?);
        }
        Ok(Self { maps, size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ShadowMap> {
        self.maps.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ShadowMap> {
        self.maps.get_mut(index)
    }

    /// Replaces the map of a slot. The map must have the resolution of the set, otherwise it is
    /// handed back untouched.
    pub fn set(&mut self, index: usize, map: ShadowMap) -> Result<ShadowMap, ShadowMap> {
        if map.size != self.size {
            err!(
                "Shadow map of size {} cannot replace a map of size {}.",
                map.size, self.size
            );
            return Err(map);
        }

        match self.maps.get_mut(index) {
            Some(slot) => Ok(std::mem::replace(slot, map)),
            None => {
                err!("Shadow map index {index} is out of bounds.");
                Err(map)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::renderer::framework::headless::{Command, HeadlessServer};

    #[test]
    fn test_bind_restores_previous_target_and_viewport() {
        let headless = Rc::new(HeadlessServer::new(800, 600));
        let server: SharedGraphicsServer = headless.clone();
        let mut map = ShadowMap::new(&server, 256).unwrap();
        let viewport = Rect::new(0, 0, 800, 600);

        headless.take_commands();
        map.bind(&*server);
        assert_eq!(server.viewport(), Rect::new(0, 0, 256, 256));
        assert_eq!(server.bound_frame_buffer(), map.frame_buffer().target());
        map.unbind(&*server);
        assert_eq!(server.viewport(), viewport);
        assert_eq!(server.bound_frame_buffer(), FrameTarget::BackBuffer);

        assert!(headless.take_commands().contains(&Command::Clear {
            target: map.frame_buffer().target(),
            color: None,
            depth: Some(1.0),
            stencil: None,
        }));
    }

    #[test]
    fn test_set_rejects_other_resolution() {
        let server: SharedGraphicsServer = Rc::new(HeadlessServer::new(800, 600));
        let mut set = ShadowMapSet::new(&server, 128).unwrap();
        assert_eq!(set.len(), MAX_DIRECTIONAL_LIGHTS);

        let other = ShadowMap::new(&server, 64).unwrap();
        assert!(set.set(0, other).is_err());

        let same = ShadowMap::new(&server, 128).unwrap();
        let handle = same.depth_texture().handle();
        assert!(set.set(1, same).is_ok());
        assert_eq!(set.get(1).unwrap().depth_texture().handle(), handle);
    }
}

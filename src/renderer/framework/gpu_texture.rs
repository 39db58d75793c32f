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

//! GPU textures. [`GpuTexture`] owns a server-side texture and deletes it on drop.

use crate::renderer::framework::{
    error::FrameworkError,
    server::{GraphicsServer, SharedGraphicsServer},
};
use serde::{Deserialize, Serialize};
use std::rc::{Rc, Weak};
use strum_macros::{AsRefStr, EnumString, VariantNames};

/// Opaque identifier of a texture inside a graphics server.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GpuTextureKind {
    Rectangle { width: usize, height: usize },
    Cube { width: usize, height: usize },
}

impl GpuTextureKind {
    /// Width of the texture (of a single face for cube maps).
    pub fn width(&self) -> usize {
        match *self {
            Self::Rectangle { width, .. } | Self::Cube { width, .. } => width,
        }
    }

    /// Height of the texture (of a single face for cube maps).
    pub fn height(&self) -> usize {
        match *self {
            Self::Rectangle { height, .. } | Self::Cube { height, .. } => height,
        }
    }

    /// Sampler type a shader must use to read the texture.
    pub fn sampler_kind(&self) -> SamplerKind {
        match self {
            Self::Rectangle { .. } => SamplerKind::Texture2D,
            Self::Cube { .. } => SamplerKind::CubeMap,
        }
    }

    fn face_count(&self) -> usize {
        match self {
            Self::Rectangle { .. } => 1,
            Self::Cube { .. } => 6,
        }
    }
}

/// Sampler target a texture is bound to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    /// `sampler2D`
    Texture2D,
    /// `samplerCube`
    CubeMap,
}

/// Pixel storage format.
#[allow(missing_docs)]
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    EnumString,
    VariantNames,
)]
pub enum PixelKind {
    R32F,
    RGB8,
    RGBA8,
    RGB16F,
    RGBA16F,
    D32F,
    D24S8,
}

impl PixelKind {
    /// Returns `true` if the format stores depth (and maybe stencil).
    pub fn is_depth(self) -> bool {
        matches!(self, Self::D32F | Self::D24S8)
    }

    /// Returns `true` if the format has a stencil channel.
    pub fn has_stencil(self) -> bool {
        matches!(self, Self::D24S8)
    }

    /// Size of a single pixel in bytes.
    pub fn size_in_bytes(self) -> usize {
        match self {
            Self::R32F | Self::RGBA8 | Self::D32F | Self::D24S8 => 4,
            Self::RGB8 => 3,
            Self::RGB16F => 6,
            Self::RGBA16F => 8,
        }
    }
}

#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum MinificationFilter {
    Nearest,
    #[default]
    Linear,
}

#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum MagnificationFilter {
    Nearest,
    #[default]
    Linear,
}

#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum WrapMode {
    #[default]
    Repeat,
    ClampToEdge,
}

/// Everything a graphics server needs to allocate a texture. Cube map data is expected to be
/// six tightly packed faces in +X, -X, +Y, -Y, +Z, -Z order.
#[derive(Copy, Clone, Debug)]
pub struct GpuTextureDescriptor<'a> {
    pub kind: GpuTextureKind,
    pub pixel_kind: PixelKind,
    pub min_filter: MinificationFilter,
    pub mag_filter: MagnificationFilter,
    pub wrap_mode: WrapMode,
    pub data: Option<&'a [u8]>,
}

impl Default for GpuTextureDescriptor<'_> {
    fn default() -> Self {
        Self {
            kind: GpuTextureKind::Rectangle {
                width: 1,
                height: 1,
            },
            pixel_kind: PixelKind::RGBA8,
            min_filter: Default::default(),
            mag_filter: Default::default(),
            wrap_mode: Default::default(),
            data: None,
        }
    }
}

impl GpuTextureDescriptor<'_> {
    /// Descriptor of a render target attachment: no data, nearest filtering, clamped edges.
    pub fn render_target(width: usize, height: usize, pixel_kind: PixelKind) -> Self {
        Self {
            kind: GpuTextureKind::Rectangle { width, height },
            pixel_kind,
            min_filter: MinificationFilter::Nearest,
            mag_filter: MagnificationFilter::Nearest,
            wrap_mode: WrapMode::ClampToEdge,
            data: None,
        }
    }

    fn validate(&self) -> Result<(), FrameworkError> {
        let (width, height) = (self.kind.width(), self.kind.height());
        if width == 0 || height == 0 {
            return Err(FrameworkError::InvalidTextureSize { width, height });
        }

        if let Some(data) = self.data {
            let expected_data_size =
                width * height * self.kind.face_count() * self.pixel_kind.size_in_bytes();
            if data.len() < expected_data_size {
                return Err(FrameworkError::InvalidTextureData {
                    expected_data_size,
                    actual_data_size: data.len(),
                });
            }
        }

        Ok(())
    }
}

/// Texture that lives on a graphics server.
pub struct GpuTexture {
    handle: TextureHandle,
    kind: GpuTextureKind,
    pixel_kind: PixelKind,
    server: Weak<dyn GraphicsServer>,
}

impl std::fmt::Debug for GpuTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuTexture")
            .field("handle", &self.handle)
            .field("kind", &self.kind)
            .field("pixel_kind", &self.pixel_kind)
            .finish()
    }
}

impl GpuTexture {
    /// Validates the descriptor and allocates a new texture.
    pub fn new(
        server: &SharedGraphicsServer,
        desc: GpuTextureDescriptor,
    ) -> Result<Self, FrameworkError> {
        desc.validate()?;
        let handle = server.create_texture(&desc)?;
        Ok(Self {
            handle,
            kind: desc.kind,
            pixel_kind: desc.pixel_kind,
            server: Rc::downgrade(server),
        })
    }

    #[allow(missing_docs)]
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    #[allow(missing_docs)]
    pub fn kind(&self) -> GpuTextureKind {
        self.kind
    }

    #[allow(missing_docs)]
    pub fn pixel_kind(&self) -> PixelKind {
        self.pixel_kind
    }
}

impl Drop for GpuTexture {
    fn drop(&mut self) {
        if let Some(server) = self.server.upgrade() {
            server.delete_texture(self.handle);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::renderer::framework::headless::HeadlessServer;

    #[test]
    fn test_texture_data_size_is_validated() {
        let server: SharedGraphicsServer = Rc::new(HeadlessServer::new(4, 4));
        let data = [0u8; 7];
        let result = GpuTexture::new(
            &server,
            GpuTextureDescriptor {
                kind: GpuTextureKind::Rectangle {
                    width: 2,
                    height: 1,
                },
                data: Some(&data),
                ..Default::default()
            },
        );
        assert!(matches!(
            result,
            Err(FrameworkError::InvalidTextureData {
                expected_data_size: 8,
                actual_data_size: 7
            })
        ));
    }

    #[test]
    fn test_texture_is_deleted_on_drop() {
        let headless = Rc::new(HeadlessServer::new(4, 4));
        let server: SharedGraphicsServer = headless.clone();
        let texture = GpuTexture::new(
            &server,
            GpuTextureDescriptor::render_target(16, 16, PixelKind::D32F),
        )
        .unwrap();
        let handle = texture.handle();
        assert!(headless.is_texture_alive(handle));
        drop(texture);
        assert!(!headless.is_texture_alive(handle));
        assert_eq!(headless.deletion_count(handle), 1);
    }
}

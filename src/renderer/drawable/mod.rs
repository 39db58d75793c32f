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

//! Anything the renderer can draw. The scene graph implements [`Drawable`] for its renderable
//! objects and hands them to the renderer every frame in a [`DrawableCollection`].

#![allow(missing_docs)]

use crate::{
    core::algebra::Matrix4,
    renderer::{
        framework::{error::FrameworkError, gpu_texture::GpuTexture, server::GraphicsServer},
        light::LightManager,
        stats::RenderPassStatistics,
        uniform::UniformData,
        RenderPath,
    },
};

pub mod mesh;
pub mod skybox;

pub use mesh::{MeshDrawable, MeshPrograms};
pub use skybox::SkyboxDrawable;

/// Everything a drawable may need while issuing its draw calls.
pub struct DrawContext<'a> {
    pub server: &'a dyn GraphicsServer,
    pub lights: &'a LightManager,
    /// Cube map of the skybox, if there is one. Reflective surfaces sample it.
    pub environment_map: Option<&'a GpuTexture>,
}

/// Directional light a shadow map is being rendered for.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShadowPassContext {
    pub light_index: usize,
    pub light_space_matrix: Matrix4<f32>,
}

/// A renderable object. Each hook binds its own program, sets its own pipeline state and issues
/// its own draw calls.
pub trait Drawable {
    /// Opacity in `[0; 1]`.
    fn alpha(&self) -> f32;

    /// Whether the drawable is rendered into shadow maps.
    fn casts_shadows(&self) -> bool {
        true
    }

    /// Opaque drawables are rendered into the GBuffer, everything else goes through the
    /// transparency pass with blending. Only full alpha counts as opaque.
    fn is_opaque(&self) -> bool {
        self.alpha() == 1.0
    }

    /// Writes position, normal and albedo with shininess into the bound GBuffer.
    fn geometry_pass(
        &self,
        ctx: &DrawContext,
        uniforms: &UniformData,
    ) -> Result<RenderPassStatistics, FrameworkError>;

    /// Writes depth into the bound shadow map.
    fn shadow_pass(
        &self,
        ctx: &DrawContext,
        shadow: &ShadowPassContext,
    ) -> Result<RenderPassStatistics, FrameworkError>;

    /// Shades the drawable directly. Called with [`RenderPath::Forward`] by both paths for
    /// the actual forward shading; [`RenderPath::Deferred`] means the caller wants GBuffer
    /// output.
    fn forward_pass(
        &self,
        ctx: &DrawContext,
        uniforms: &UniformData,
        render_path: RenderPath,
    ) -> Result<RenderPassStatistics, FrameworkError>;
}

/// Drawables of a single frame.
#[derive(Default)]
pub struct DrawableCollection<'a> {
    pub drawables: Vec<&'a dyn Drawable>,
    pub skybox: Option<&'a SkyboxDrawable>,
}

impl<'a> DrawableCollection<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drawable(mut self, drawable: &'a dyn Drawable) -> Self {
        self.drawables.push(drawable);
        self
    }

    pub fn with_skybox(mut self, skybox: &'a SkyboxDrawable) -> Self {
        self.skybox = Some(skybox);
        self
    }

    pub fn opaque(&self) -> impl Iterator<Item = &'a dyn Drawable> + '_ {
        self.drawables.iter().copied().filter(|d| d.is_opaque())
    }

    pub fn transparent(&self) -> impl Iterator<Item = &'a dyn Drawable> + '_ {
        self.drawables.iter().copied().filter(|d| !d.is_opaque())
    }

    /// Opaque drawables that cast shadows. Transparent drawables never cast shadows.
    pub fn shadow_casters(&self) -> impl Iterator<Item = &'a dyn Drawable> + '_ {
        self.opaque().filter(|d| d.casts_shadows())
    }

    /// Cube map of the skybox, if any.
    pub fn environment_map(&self) -> Option<&'a GpuTexture> {
        self.skybox.and_then(|s| s.cube_map())
    }
}

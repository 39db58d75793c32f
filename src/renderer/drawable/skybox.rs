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

//! Skybox: a unit cube around the camera textured with a cube map. Drawn with a view matrix
//! stripped of translation so it never gets closer, and with front faces culled since the
//! camera is inside the cube.

#![allow(missing_docs)]

use crate::renderer::{
    drawable::{DrawContext, Drawable, ShadowPassContext},
    framework::{
        error::FrameworkError,
        geometry_buffer::{GeometryBufferDescriptor, GpuGeometryBuffer, VertexAttribute},
        gpu_program::GpuProgram,
        gpu_texture::{GpuTexture, SamplerKind},
        server::SharedGraphicsServer,
        CompareFunc, CullFace,
    },
    stats::RenderPassStatistics,
    uniform::UniformData,
    RenderPath,
};
use std::rc::Rc;

pub const SKYBOX_TEXTURE_UNIT: u32 = 0;

#[rustfmt::skip]
const CUBE_VERTICES: [f32; 24] = [
    -1.0, -1.0, -1.0,
     1.0, -1.0, -1.0,
     1.0,  1.0, -1.0,
    -1.0,  1.0, -1.0,
    -1.0, -1.0,  1.0,
     1.0, -1.0,  1.0,
     1.0,  1.0,  1.0,
    -1.0,  1.0,  1.0,
];

// Counter-clockwise when looked at from outside.
#[rustfmt::skip]
const CUBE_TRIANGLES: [[u32; 3]; 12] = [
    [0, 2, 1], [0, 3, 2], // -Z
    [4, 5, 6], [4, 6, 7], // +Z
    [0, 4, 7], [0, 7, 3], // -X
    [1, 2, 6], [1, 6, 5], // +X
    [0, 1, 5], [0, 5, 4], // -Y
    [3, 7, 6], [3, 6, 2], // +Y
];

pub struct SkyboxDrawable {
    cube: GpuGeometryBuffer,
    program: Rc<GpuProgram>,
    geometry_program: Option<Rc<GpuProgram>>,
    cube_map: Option<Rc<GpuTexture>>,
}

impl SkyboxDrawable {
    /// Creates a skybox drawn by `program` in forward shading. The cube map may be set later.
    pub fn new(
        server: &SharedGraphicsServer,
        program: Rc<GpuProgram>,
        cube_map: Option<Rc<GpuTexture>>,
    ) -> Result<Self, FrameworkError> {
        let cube = GpuGeometryBuffer::new(
            server,
            GeometryBufferDescriptor {
                vertices: &CUBE_VERTICES,
                layout: &[VertexAttribute {
                    location: 0,
                    components: 3,
                }],
                triangles: &CUBE_TRIANGLES,
            },
        )?;

        Ok(Self {
            cube,
            program,
            geometry_program: None,
            cube_map,
        })
    }

    /// Program that writes the skybox into the GBuffer. Without it the skybox is skipped by
    /// the geometry pass of the deferred path.
    pub fn with_geometry_program(mut self, program: Rc<GpuProgram>) -> Self {
        self.geometry_program = Some(program);
        self
    }

    pub fn set_cube_map(&mut self, cube_map: Option<Rc<GpuTexture>>) {
        self.cube_map = cube_map;
    }

    pub fn cube_map(&self) -> Option<&GpuTexture> {
        self.cube_map.as_deref()
    }

    pub fn program(&self) -> &Rc<GpuProgram> {
        &self.program
    }

    fn draw_with(
        &self,
        ctx: &DrawContext,
        program: &GpuProgram,
        uniforms: &UniformData,
    ) -> Result<RenderPassStatistics, FrameworkError> {
        ctx.server.set_cull_face(Some(CullFace::Front));
        ctx.server.set_depth_func(Some(CompareFunc::LessOrEqual));

        let mut binding = program.bind(ctx.server);
        binding.set_matrix4("VPMatrix", &uniforms.rotation_only_view_projection_matrix());
        if let Some(cube_map) = self.cube_map.as_ref() {
            binding.set_texture("Texture_Skybox", SKYBOX_TEXTURE_UNIT, cube_map);
        }

        let mut stats = RenderPassStatistics::default();
        let result = self.cube.draw(ctx.server, 0);

        binding.unset_texture("Texture_Skybox", SKYBOX_TEXTURE_UNIT, SamplerKind::CubeMap);

        stats += result?;
        Ok(stats)
    }
}

impl Drawable for SkyboxDrawable {
    fn alpha(&self) -> f32 {
        1.0
    }

    fn casts_shadows(&self) -> bool {
        false
    }

    fn geometry_pass(
        &self,
        ctx: &DrawContext,
        uniforms: &UniformData,
    ) -> Result<RenderPassStatistics, FrameworkError> {
        match self.geometry_program.as_ref() {
            Some(program) => self.draw_with(ctx, program, uniforms),
            None => Ok(Default::default()),
        }
    }

    fn shadow_pass(
        &self,
        _ctx: &DrawContext,
        _shadow: &ShadowPassContext,
    ) -> Result<RenderPassStatistics, FrameworkError> {
        Ok(Default::default())
    }

    fn forward_pass(
        &self,
        ctx: &DrawContext,
        uniforms: &UniformData,
        render_path: RenderPath,
    ) -> Result<RenderPassStatistics, FrameworkError> {
        match render_path {
            RenderPath::Deferred => self.geometry_pass(ctx, uniforms),
            RenderPath::Forward => self.draw_with(ctx, &self.program, uniforms),
        }
    }
}

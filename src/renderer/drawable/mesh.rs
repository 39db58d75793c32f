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

//! Triangle mesh with a simple material: either a texture or a flat color, shininess, opacity
//! and an optional reflection map.

#![allow(missing_docs)]

use crate::{
    core::{algebra::Matrix4, color::Color},
    renderer::{
        drawable::{DrawContext, Drawable, ShadowPassContext},
        framework::{
            error::FrameworkError,
            geometry_buffer::GpuGeometryBuffer,
            gpu_program::{GpuProgram, GpuProgramBinding},
            gpu_texture::{GpuTexture, SamplerKind},
            CompareFunc, CullFace, WindingOrder,
        },
        light::{MAX_DIRECTIONAL_LIGHTS, SHADOW_MAP_TEXTURE_UNIT},
        stats::RenderPassStatistics,
        uniform::UniformData,
        RenderPath,
    },
};
use std::rc::Rc;

pub const DIFFUSE_TEXTURE_UNIT: u32 = 0;
pub const REFLECTION_MAP_TEXTURE_UNIT: u32 = 1;
/// Goes right after the shadow map units.
pub const ENVIRONMENT_MAP_TEXTURE_UNIT: u32 =
    SHADOW_MAP_TEXTURE_UNIT + MAX_DIRECTIONAL_LIGHTS as u32;

/// Programs a mesh is drawn with, usually shared by many meshes.
#[derive(Clone)]
pub struct MeshPrograms {
    /// Writes GBuffer attachments.
    pub geometry: Rc<GpuProgram>,
    /// Fully shades the mesh with lights and shadows.
    pub forward: Rc<GpuProgram>,
    /// Writes depth from the point of view of a directional light.
    pub shadow: Rc<GpuProgram>,
}

pub struct MeshDrawable {
    geometry: Rc<GpuGeometryBuffer>,
    programs: MeshPrograms,
    transform: Matrix4<f32>,
    texture: Option<Rc<GpuTexture>>,
    reflection_map: Option<Rc<GpuTexture>>,
    color: Color,
    shininess: f32,
    alpha: f32,
    instance_count: usize,
    cast_shadows: bool,
}

impl MeshDrawable {
    pub fn new(geometry: Rc<GpuGeometryBuffer>, programs: MeshPrograms) -> Self {
        Self {
            geometry,
            programs,
            transform: Matrix4::identity(),
            texture: None,
            reflection_map: None,
            color: Color::WHITE,
            shininess: 32.0,
            alpha: 1.0,
            instance_count: 0,
            cast_shadows: true,
        }
    }

    pub fn with_transform(mut self, transform: Matrix4<f32>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_texture(mut self, texture: Rc<GpuTexture>) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_reflection_map(mut self, reflection_map: Rc<GpuTexture>) -> Self {
        self.reflection_map = Some(reflection_map);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.set_alpha(alpha);
        self
    }

    pub fn with_instance_count(mut self, instance_count: usize) -> Self {
        self.instance_count = instance_count;
        self
    }

    pub fn with_cast_shadows(mut self, cast_shadows: bool) -> Self {
        self.cast_shadows = cast_shadows;
        self
    }

    pub fn set_transform(&mut self, transform: Matrix4<f32>) {
        self.transform = transform;
    }

    pub fn transform(&self) -> &Matrix4<f32> {
        &self.transform
    }

    /// Alpha is clamped to `[0; 1]`.
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn set_texture(&mut self, texture: Option<Rc<GpuTexture>>) {
        self.texture = texture;
    }

    pub fn set_instance_count(&mut self, instance_count: usize) {
        self.instance_count = instance_count;
    }

    pub fn instance_count(&self) -> usize {
        self.instance_count
    }

    pub fn programs(&self) -> &MeshPrograms {
        &self.programs
    }

    fn set_surface(&self, program: &mut GpuProgramBinding) {
        program.set_f32("ObjectShininess", self.shininess);

        match self.texture.as_ref() {
            Some(texture) => {
                program
                    .set_texture("Texture0", DIFFUSE_TEXTURE_UNIT, texture)
                    .set_bool("useTexture", true);
            }
            None => {
                program
                    .set_vector3("uColor", &self.color.as_frgb())
                    .set_bool("useTexture", false);
            }
        }

        if let Some(reflection_map) = self.reflection_map.as_ref() {
            program.set_texture("ReflectionMap", REFLECTION_MAP_TEXTURE_UNIT, reflection_map);
        }
    }

    fn draw(&self, ctx: &DrawContext) -> Result<RenderPassStatistics, FrameworkError> {
        let mut stats = RenderPassStatistics::default();
        stats += self.geometry.draw(ctx.server, self.instance_count)?;
        Ok(stats)
    }

    fn set_pipeline_state(ctx: &DrawContext, depth_func: CompareFunc) {
        ctx.server.set_cull_face(Some(CullFace::Back));
        ctx.server.set_winding_order(WindingOrder::CounterClockwise);
        ctx.server.set_depth_func(Some(depth_func));
    }
}

impl Drawable for MeshDrawable {
    fn alpha(&self) -> f32 {
        self.alpha
    }

    fn casts_shadows(&self) -> bool {
        self.cast_shadows
    }

    fn geometry_pass(
        &self,
        ctx: &DrawContext,
        uniforms: &UniformData,
    ) -> Result<RenderPassStatistics, FrameworkError> {
        Self::set_pipeline_state(ctx, CompareFunc::LessOrEqual);

        let mut program = self.programs.geometry.bind(ctx.server);
        program
            .set_matrix4("VPMatrix", &uniforms.view_projection_matrix())
            .set_matrix4("modelMatrix", &self.transform);
        self.set_surface(&mut program);

        self.draw(ctx)
    }

    fn shadow_pass(
        &self,
        ctx: &DrawContext,
        shadow: &ShadowPassContext,
    ) -> Result<RenderPassStatistics, FrameworkError> {
        Self::set_pipeline_state(ctx, CompareFunc::Less);

        self.programs
            .shadow
            .bind(ctx.server)
            .set_matrix4("VPLight", &shadow.light_space_matrix)
            .set_matrix4("modelMatrix", &self.transform);

        self.draw(ctx)
    }

    fn forward_pass(
        &self,
        ctx: &DrawContext,
        uniforms: &UniformData,
        render_path: RenderPath,
    ) -> Result<RenderPassStatistics, FrameworkError> {
        if render_path == RenderPath::Deferred {
            return self.geometry_pass(ctx, uniforms);
        }

        Self::set_pipeline_state(ctx, CompareFunc::LessOrEqual);

        let mut program = self.programs.forward.bind(ctx.server);
        program
            .set_matrix4("VPMatrix", &uniforms.view_projection_matrix())
            .set_matrix4("modelMatrix", &self.transform)
            .set_vector3("CameraPos", &uniforms.camera_position)
            .set_f32("alpha", self.alpha);
        ctx.lights.apply_lighting(&mut program);
        self.set_surface(&mut program);
        if let Some(environment_map) = ctx.environment_map {
            program.set_texture(
                "Texture_Skybox",
                ENVIRONMENT_MAP_TEXTURE_UNIT,
                environment_map,
            );
        }
        ctx.lights.apply_shadows(&mut program);

        let result = self.draw(ctx);

        ctx.lights.unbind_shadow_textures(&mut program);
        program
            .unset_texture("Texture0", DIFFUSE_TEXTURE_UNIT, SamplerKind::Texture2D)
            .unset_texture(
                "Texture_Skybox",
                ENVIRONMENT_MAP_TEXTURE_UNIT,
                SamplerKind::CubeMap,
            )
            .unset_texture(
                "ReflectionMap",
                REFLECTION_MAP_TEXTURE_UNIT,
                SamplerKind::Texture2D,
            );

        result
    }
}

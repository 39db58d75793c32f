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

//! Renderer is a "workhorse" of the crate, it draws a set of drawables as seen by a camera, lit
//! by a set of lights, into a presentation target. Two pass sequences are available and can
//! be switched between frames:
//!
//! - [`RenderPath::Deferred`] - opaque geometry is written into a [`gbuffer::GBuffer`] and lit
//!   once per pixel by a screen-space lighting program, then transparent geometry is shaded
//!   directly on top of the lit image.
//! - [`RenderPath::Forward`] - every drawable is shaded directly into an off-screen
//!   [`post_process::PostProcessTarget`], which is then drawn into the presentation target by
//!   a post-process program.
//!
//! Both paths render directional shadow maps first. The renderer works with any
//! [`framework::server::GraphicsServer`], it never creates a graphics context on its own.

#![deny(unsafe_code)]

pub mod camera;
pub mod drawable;
// Framework is unsafe internally due to FFI calls.
#[allow(unsafe_code)]
pub mod framework;
pub mod gbuffer;
pub mod light;
pub mod post_process;
pub mod screen_quad;
pub mod shadow;
pub mod stats;
pub mod uniform;

use crate::{
    core::math::Rect,
    err,
    err_once,
    log::Log,
    renderer::{
        camera::{CameraKind, CameraSource, CameraView},
        drawable::{DrawContext, Drawable, DrawableCollection, ShadowPassContext},
        framework::{
            error::FrameworkError,
            framebuffer::FrameTarget,
            gpu_program::GpuProgram,
            server::{GraphicsServer, SharedGraphicsServer},
            BlendFunc,
        },
        gbuffer::GBuffer,
        light::LightManager,
        post_process::PostProcessTarget,
        screen_quad::ScreenQuadExecutor,
        stats::{FrameStatistics, RenderPassStatistics},
        uniform::UniformData,
    },
    settings::RendererSettings,
};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString, VariantNames};

/// Pass sequence used to draw a frame.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    EnumString,
    VariantNames,
)]
pub enum RenderPath {
    /// Opaque geometry goes through the GBuffer and screen-space lighting, transparent
    /// geometry is shaded directly on top.
    #[default]
    Deferred,
    /// Everything is shaded directly into an off-screen target followed by a post-process.
    Forward,
}

/// Screen-space programs owned by the renderer. Drawables bring their own programs.
pub struct RendererPrograms {
    /// Deferred lighting composite. Samples the GBuffer (see [`gbuffer`]), lights and shadow
    /// maps (see [`light`]).
    pub lighting: GpuProgram,
    /// Forward path post-process. Samples the shaded frame as `Texture0`.
    pub post_process: GpuProgram,
}

/// Everything a pass needs, threaded through the passes of a single frame.
#[allow(missing_docs)]
pub struct RenderContext<'a> {
    pub server: &'a dyn GraphicsServer,
    pub gbuffer: &'a mut GBuffer,
    pub post_process_target: &'a mut PostProcessTarget,
    pub lights: &'a mut LightManager,
    pub screen_quad: &'a ScreenQuadExecutor,
    pub programs: &'a RendererPrograms,
    pub settings: &'a RendererSettings,
    pub uniforms: &'a UniformData,
    pub presentation_target: FrameTarget,
    pub viewport: Rect<i32>,
    pub frame_index: u64,
}

fn accumulate(
    stats: &mut RenderPassStatistics,
    result: Result<RenderPassStatistics, FrameworkError>,
    pass: &str,
) {
    match result {
        Ok(pass_stats) => *stats += pass_stats,
        Err(e) => err!("{pass} pass failed to render a drawable. Reason: {e}"),
    }
}

fn render_shadows(
    ctx: &mut RenderContext,
    drawables: &DrawableCollection,
    stats: &mut FrameStatistics,
) {
    if !ctx.lights.directional_light_status() {
        return;
    }

    let light_count = ctx
        .lights
        .directional_light_count()
        .min(ctx.lights.shadow_maps().len());
    let caster_count = light_count.min(ctx.settings.max_shadow_casters);

    for index in 0..light_count {
        if !ctx.lights.bind_shadow_map(ctx.server, index) {
            continue;
        }

        // Lights above the limit still get their map cleared, so no shadows are sampled from
        // depth of previous frames.
        if index < caster_count {
            let shadow = ShadowPassContext {
                light_index: index,
                light_space_matrix: ctx.lights.light_space_matrix(index),
            };
            let draw_ctx = DrawContext {
                server: ctx.server,
                lights: &*ctx.lights,
                environment_map: None,
            };
            for drawable in drawables.shadow_casters() {
                accumulate(
                    &mut stats.shadow,
                    drawable.shadow_pass(&draw_ctx, &shadow),
                    "Shadow",
                );
            }
            stats.lights.shadow_maps_rendered += 1;
        }

        ctx.lights.unbind_shadow_map(ctx.server, index);
    }

    ctx.server.set_viewport(ctx.viewport);
}

fn bind_presentation_target(ctx: &RenderContext) {
    ctx.server.bind_frame_buffer(ctx.presentation_target);
    ctx.server.set_viewport(ctx.viewport);
    ctx.server.clear(Some(ctx.settings.clear_color), Some(1.0), Some(0));
}

fn render_deferred(
    ctx: &mut RenderContext,
    drawables: &DrawableCollection,
    stats: &mut FrameStatistics,
) {
    let server = ctx.server;
    let environment_map = drawables.environment_map();

    ctx.gbuffer.bind(server, ctx.frame_index);
    {
        let draw_ctx = DrawContext {
            server,
            lights: &*ctx.lights,
            environment_map,
        };
        for drawable in drawables.opaque() {
            accumulate(
                &mut stats.geometry,
                drawable.geometry_pass(&draw_ctx, ctx.uniforms),
                "Geometry",
            );
        }
        if let Some(skybox) = drawables.skybox {
            accumulate(
                &mut stats.geometry,
                skybox.geometry_pass(&draw_ctx, ctx.uniforms),
                "Geometry",
            );
        }
    }
    ctx.gbuffer.unbind(server);

    render_shadows(ctx, drawables, stats);

    bind_presentation_target(ctx);
    {
        let mut program = ctx.programs.lighting.bind(server);
        program.set_vector3("CameraPos", &ctx.uniforms.camera_position);
        ctx.gbuffer.populate_shader(&mut program, ctx.frame_index);
        let light_stats = ctx.lights.apply_lighting(&mut program);
        ctx.lights.apply_shadows(&mut program);
        stats.lights.point_lights = light_stats.point_lights;
        stats.lights.spot_lights = light_stats.spot_lights;
        stats.lights.directional_lights = light_stats.directional_lights;

        accumulate(
            &mut stats.lighting,
            ctx.screen_quad.execute(server),
            "Lighting",
        );

        ctx.gbuffer.unbind_textures(&mut program);
        ctx.lights.unbind_shadow_textures(&mut program);
    }

    ctx.gbuffer.write_depth(server, ctx.presentation_target);

    let draw_ctx = DrawContext {
        server,
        lights: &*ctx.lights,
        environment_map,
    };
    server.set_blend_func(Some(BlendFunc::alpha_blend()));
    for drawable in drawables.transparent() {
        accumulate(
            &mut stats.transparency,
            drawable.forward_pass(&draw_ctx, ctx.uniforms, RenderPath::Forward),
            "Transparency",
        );
    }
    server.set_blend_func(None);

    if let Some(skybox) = drawables.skybox {
        accumulate(
            &mut stats.transparency,
            skybox.forward_pass(&draw_ctx, ctx.uniforms, RenderPath::Forward),
            "Skybox",
        );
    }
}

fn render_forward(
    ctx: &mut RenderContext,
    drawables: &DrawableCollection,
    stats: &mut FrameStatistics,
) {
    let server = ctx.server;

    render_shadows(ctx, drawables, stats);

    ctx.post_process_target
        .bind(server, ctx.settings.clear_color, ctx.frame_index);
    {
        let draw_ctx = DrawContext {
            server,
            lights: &*ctx.lights,
            environment_map: drawables.environment_map(),
        };
        for drawable in drawables.opaque() {
            accumulate(
                &mut stats.forward,
                drawable.forward_pass(&draw_ctx, ctx.uniforms, RenderPath::Forward),
                "Forward",
            );
        }

        server.set_blend_func(Some(BlendFunc::alpha_blend()));
        for drawable in drawables.transparent() {
            accumulate(
                &mut stats.forward,
                drawable.forward_pass(&draw_ctx, ctx.uniforms, RenderPath::Forward),
                "Forward",
            );
        }
        server.set_blend_func(None);

        if let Some(skybox) = drawables.skybox {
            accumulate(
                &mut stats.forward,
                skybox.forward_pass(&draw_ctx, ctx.uniforms, RenderPath::Forward),
                "Skybox",
            );
        }
    }
    ctx.post_process_target.unbind(server);

    let light_stats = ctx.lights.lighting_statistics();
    stats.lights.point_lights = light_stats.point_lights;
    stats.lights.spot_lights = light_stats.spot_lights;
    stats.lights.directional_lights = light_stats.directional_lights;

    bind_presentation_target(ctx);
    let mut program = ctx.programs.post_process.bind(server);
    ctx.post_process_target
        .populate_shader(&mut program, ctx.frame_index);
    accumulate(
        &mut stats.post_process,
        ctx.screen_quad.execute(server),
        "Post-process",
    );
    ctx.post_process_target.unbind_textures(&mut program);
}

/// See module docs.
pub struct Renderer {
    gbuffer: GBuffer,
    post_process_target: PostProcessTarget,
    lights: LightManager,
    screen_quad: ScreenQuadExecutor,
    programs: RendererPrograms,
    settings: RendererSettings,
    render_path: RenderPath,
    frame_size: (usize, usize),
    // Applied at the beginning of the next frame.
    pending_frame_size: Option<(usize, usize)>,
    presentation_target: FrameTarget,
    frame_index: u64,
    statistics: FrameStatistics,
    // Must be last, every resource above holds a weak reference to the server and releases
    // itself through it on drop.
    server: SharedGraphicsServer,
}

#[allow(missing_docs)]
impl Renderer {
    /// Creates every render target for the given frame size. The frame is presented to the
    /// back buffer unless [`Self::set_presentation_target`] says otherwise.
    pub fn new(
        server: SharedGraphicsServer,
        frame_size: (usize, usize),
        settings: RendererSettings,
        programs: RendererPrograms,
    ) -> Result<Self, FrameworkError> {
        let (width, height) = (frame_size.0.max(1), frame_size.1.max(1));

        Ok(Self {
            gbuffer: GBuffer::new(&server, width, height)?,
            post_process_target: PostProcessTarget::new(&server, width, height)?,
            lights: LightManager::new(&server, &settings)?,
            screen_quad: ScreenQuadExecutor::new(&server)?,
            programs,
            render_path: settings.render_path,
            settings,
            frame_size: (width, height),
            pending_frame_size: None,
            presentation_target: FrameTarget::BackBuffer,
            frame_index: 0,
            statistics: Default::default(),
            server,
        })
    }

    /// Draws a frame. Per-drawable failures are logged and skipped, the frame is always
    /// completed.
    pub fn render_frame(
        &mut self,
        cameras: &dyn CameraSource,
        drawables: &DrawableCollection,
        current_time: f32,
    ) -> FrameStatistics {
        self.apply_pending_frame_size();

        let uniforms = self.collect_uniforms(cameras, current_time);
        let mut stats = FrameStatistics::default();

        let mut ctx = RenderContext {
            server: &*self.server,
            gbuffer: &mut self.gbuffer,
            post_process_target: &mut self.post_process_target,
            lights: &mut self.lights,
            screen_quad: &self.screen_quad,
            programs: &self.programs,
            settings: &self.settings,
            uniforms: &uniforms,
            presentation_target: self.presentation_target,
            viewport: Rect::new(0, 0, self.frame_size.0 as i32, self.frame_size.1 as i32),
            frame_index: self.frame_index,
        };

        match self.render_path {
            RenderPath::Deferred => render_deferred(&mut ctx, drawables, &mut stats),
            RenderPath::Forward => render_forward(&mut ctx, drawables, &mut stats),
        }

        self.frame_index += 1;
        self.statistics = stats;
        stats
    }

    fn collect_uniforms(&mut self, cameras: &dyn CameraSource, current_time: f32) -> UniformData {
        let mut uniforms = UniformData {
            current_time,
            ..Default::default()
        };
        let mut perspective_found = false;

        cameras.visit_cameras(&mut |camera: &dyn CameraView| match camera.kind() {
            CameraKind::Perspective => {
                if perspective_found {
                    return;
                }
                perspective_found = true;
                uniforms.view_matrix = camera.view_matrix();
                uniforms.projection_matrix = camera.projection_matrix();
                uniforms.camera_position = camera.position();
                self.lights.set_spotlight_position(camera.position());
                self.lights.set_spotlight_direction(camera.forward());
            }
            CameraKind::Orthogonal => {
                uniforms.ui_view_matrix = camera.view_matrix();
                uniforms.ui_projection_matrix = camera.projection_matrix();
            }
        });

        if !perspective_found {
            err_once!(
                self as *const _ as usize,
                "There is no perspective camera, the frame is rendered with default matrices!",
            );
        }

        uniforms
    }

    fn apply_pending_frame_size(&mut self) {
        let Some((width, height)) = self.pending_frame_size.take() else {
            return;
        };

        if width <= 2 || height <= 2 {
            return;
        }

        Log::verify_message(
            self.gbuffer.resize(&self.server, width, height),
            "Unable to resize GBuffer",
        );
        Log::verify_message(
            self.post_process_target.resize(&self.server, width, height),
            "Unable to resize post-process target",
        );

        let gbuffer_size = self.gbuffer.size();
        let post_process_size = self.post_process_target.size();
        if gbuffer_size != post_process_size {
            err!(
                "Render targets have different sizes after resize: GBuffer is {}x{}, \
                post-process target is {}x{}. Frame is clamped to the smaller one.",
                gbuffer_size.0,
                gbuffer_size.1,
                post_process_size.0,
                post_process_size.1
            );
        }

        // Viewport must fit into the targets of both paths.
        self.frame_size = (
            gbuffer_size.0.min(post_process_size.0),
            gbuffer_size.1.min(post_process_size.1),
        );
    }

    /// Requests new frame size. Render targets are resized at the beginning of the next
    /// frame, sizes of 2 pixels or less in either dimension are ignored.
    pub fn set_frame_size(&mut self, width: usize, height: usize) {
        self.pending_frame_size = Some((width, height));
    }

    /// Returns size of the frame as of the last rendered frame.
    pub fn frame_size(&self) -> (usize, usize) {
        self.frame_size
    }

    /// Switches pass sequence. Takes effect at the next frame.
    pub fn set_render_path(&mut self, render_path: RenderPath) {
        self.render_path = render_path;
    }

    pub fn render_path(&self) -> RenderPath {
        self.render_path
    }

    /// Sets the target the final image is drawn into, for example an editor viewport frame
    /// buffer. Must be of the frame size.
    pub fn set_presentation_target(&mut self, target: FrameTarget) {
        self.presentation_target = target;
    }

    pub fn presentation_target(&self) -> FrameTarget {
        self.presentation_target
    }

    pub fn lights(&self) -> &LightManager {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut LightManager {
        &mut self.lights
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    /// Statistics of the last rendered frame.
    pub fn statistics(&self) -> FrameStatistics {
        self.statistics
    }

    /// Amount of frames rendered so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn gbuffer(&self) -> &GBuffer {
        &self.gbuffer
    }

    pub fn post_process_target(&self) -> &PostProcessTarget {
        &self.post_process_target
    }

    pub fn programs(&self) -> &RendererPrograms {
        &self.programs
    }

    pub fn server(&self) -> &SharedGraphicsServer {
        &self.server
    }
}

#[cfg(test)]
mod test {
    use super::RenderPath;
    use std::str::FromStr;
    use strum::VariantNames;

    #[test]
    fn test_render_path_names() {
        assert_eq!(RenderPath::VARIANTS, &["Deferred", "Forward"]);
        assert_eq!(RenderPath::from_str("Forward"), Ok(RenderPath::Forward));
        assert!(RenderPath::from_str("Raytraced").is_err());
        assert_eq!(RenderPath::default(), RenderPath::Deferred);
    }
}

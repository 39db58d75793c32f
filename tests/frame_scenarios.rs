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

//! Whole-frame scenarios driven through the headless graphics server.

use shadepath::{
    algebra::{Matrix4, Vector3},
    log::{Log, LogMessage, MessageKind},
    renderer::{
        camera::SceneCamera,
        drawable::{DrawableCollection, MeshDrawable, MeshPrograms},
        framework::{
            framebuffer::{Attachment, AttachmentKind, FrameTarget, GpuFrameBuffer},
            geometry_buffer::{GeometryBufferDescriptor, GpuGeometryBuffer, VertexAttribute},
            gpu_program::{GpuProgram, UniformValue},
            gpu_texture::{GpuTexture, GpuTextureDescriptor, PixelKind},
            headless::{Command, DrawRecord, HeadlessServer},
            server::SharedGraphicsServer,
            BlendFunc, BufferMask,
        },
        light::{DirectionalLight, PointLight, MAX_POINT_LIGHTS},
        RendererPrograms,
    },
    RenderPath, Renderer, RendererSettings,
};
use std::{
    rc::Rc,
    sync::mpsc::{channel, Receiver},
};

const WIDTH: usize = 800;
const HEIGHT: usize = 600;
const SHADOW_MAP_SIZE: usize = 64;

struct Fixture {
    headless: Rc<HeadlessServer>,
    server: SharedGraphicsServer,
    renderer: Renderer,
    programs: MeshPrograms,
    cameras: Vec<SceneCamera>,
}

fn program(server: &SharedGraphicsServer, name: &str) -> GpuProgram {
    GpuProgram::from_source(server, name, "void main() {}", "void main() {}").unwrap()
}

fn triangle(server: &SharedGraphicsServer) -> Rc<GpuGeometryBuffer> {
    Rc::new(
        GpuGeometryBuffer::new(
            server,
            GeometryBufferDescriptor {
                vertices: &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                layout: &[VertexAttribute {
                    location: 0,
                    components: 3,
                }],
                triangles: &[[0, 1, 2]],
            },
        )
        .unwrap(),
    )
}

fn fixture_with(settings: RendererSettings) -> Fixture {
    let headless = Rc::new(HeadlessServer::new(WIDTH, HEIGHT));
    let server: SharedGraphicsServer = headless.clone();
    let renderer = Renderer::new(
        server.clone(),
        (WIDTH, HEIGHT),
        RendererSettings {
            shadow_map_size: SHADOW_MAP_SIZE,
            ..settings
        },
        RendererPrograms {
            lighting: program(&server, "Lighting"),
            post_process: program(&server, "PostProcess"),
        },
    )
    .unwrap();
    let programs = MeshPrograms {
        geometry: Rc::new(program(&server, "MeshGeometry")),
        forward: Rc::new(program(&server, "MeshForward")),
        shadow: Rc::new(program(&server, "MeshShadow")),
    };
    let cameras = vec![SceneCamera::perspective(
        Vector3::new(0.0, 5.0, 10.0),
        Vector3::zeros(),
        WIDTH as f32 / HEIGHT as f32,
        60.0f32.to_radians(),
        0.1,
        1000.0,
    )];
    Fixture {
        headless,
        server,
        renderer,
        programs,
        cameras,
    }
}

fn errors(receiver: &Receiver<LogMessage>) -> Vec<String> {
    receiver
        .try_iter()
        .filter(|m| m.kind == MessageKind::Error)
        .map(|m| m.content)
        .collect()
}

fn fixture() -> Fixture {
    fixture_with(Default::default())
}

impl Fixture {
    fn mesh(&self) -> MeshDrawable {
        MeshDrawable::new(triangle(&self.server), self.programs.clone())
    }

    fn lighting_program(&self) -> shadepath::renderer::framework::gpu_program::ProgramHandle {
        self.renderer.programs().lighting.handle()
    }

    fn frame_draws(&self) -> Vec<DrawRecord> {
        self.headless
            .take_commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::Draw(record) => Some(record),
                _ => None,
            })
            .collect()
    }
}

#[test]
fn test_light_update_is_visible_within_the_same_frame() {
    let mut f = fixture();
    let id = f
        .renderer
        .lights_mut()
        .create_point_light(PointLight::default())
        .unwrap();

    f.renderer
        .render_frame(&f.cameras, &DrawableCollection::new(), 0.0);

    let position = Vector3::new(4.0, 2.0, -1.0);
    f.renderer
        .lights_mut()
        .update_point_light_position(id, position);
    f.renderer
        .render_frame(&f.cameras, &DrawableCollection::new(), 0.016);

    assert_eq!(
        f.headless
            .uniform(f.lighting_program(), "PointLightArray[0].Position"),
        Some(UniformValue::Vector3(position))
    );

    // Forward path picks the update up the same way.
    let mesh = f.mesh();
    f.renderer.set_render_path(RenderPath::Forward);
    f.renderer.lights_mut().update_point_light_radius(id, 42.0);
    f.renderer.render_frame(
        &f.cameras,
        &DrawableCollection::new().with_drawable(&mesh),
        0.032,
    );
    assert_eq!(
        f.headless
            .uniform(f.programs.forward.handle(), "PointLightArray[0].Radius"),
        Some(UniformValue::Float(42.0))
    );
}

#[test]
fn test_capacity_overflow_returns_sentinel() {
    let mut f = fixture();
    let lights = f.renderer.lights_mut();
    for i in 0..MAX_POINT_LIGHTS {
        assert_eq!(lights.create_point_light(PointLight::default()), Some(i));
    }
    assert_eq!(lights.create_point_light(PointLight::default()), None);
    assert_eq!(lights.point_light_count(), MAX_POINT_LIGHTS);

    let stats = f
        .renderer
        .render_frame(&f.cameras, &DrawableCollection::new(), 0.0);

    assert_eq!(stats.lights.point_lights, MAX_POINT_LIGHTS);
    assert_eq!(
        f.headless.uniform(f.lighting_program(), "PointLightCount"),
        Some(UniformValue::UnsignedInteger(MAX_POINT_LIGHTS as u32))
    );
}

#[test]
fn test_light_space_matrix_of_missing_light_is_identity() {
    let mut f = fixture();
    assert_eq!(f.renderer.lights().light_space_matrix(0), Matrix4::identity());

    f.renderer
        .lights_mut()
        .create_directional_light(DirectionalLight {
            direction: Vector3::new(0.3, -1.0, 0.2),
            ..Default::default()
        });

    assert_ne!(f.renderer.lights().light_space_matrix(0), Matrix4::identity());
    assert_eq!(f.renderer.lights().light_space_matrix(1), Matrix4::identity());
    assert_eq!(
        f.renderer.lights().light_space_matrix(usize::MAX),
        Matrix4::identity()
    );
}

#[test]
fn test_resize_is_deferred_and_releases_old_targets_once() {
    let mut f = fixture();
    f.renderer
        .render_frame(&f.cameras, &DrawableCollection::new(), 0.0);

    let old_textures = f.renderer.gbuffer().textures();
    let old_color = f.renderer.post_process_target().color_texture().handle();

    f.renderer.set_frame_size(1024, 768);
    assert_eq!(f.renderer.frame_size(), (WIDTH, HEIGHT));
    assert_eq!(f.renderer.gbuffer().size(), (WIDTH, HEIGHT));

    f.headless.take_commands();
    f.renderer
        .render_frame(&f.cameras, &DrawableCollection::new(), 0.016);

    assert_eq!(f.renderer.frame_size(), (1024, 768));
    for texture in f.renderer.gbuffer().textures() {
        assert_eq!(f.headless.texture_size(texture), Some((1024, 768)));
    }
    for texture in old_textures.into_iter().chain([old_color]) {
        assert!(!f.headless.is_texture_alive(texture));
        assert_eq!(f.headless.deletion_count(texture), 1);
    }
    assert_eq!(f.headless.invalid_deletions(), 0);

    let draws = f.frame_draws();
    let lighting = draws
        .iter()
        .find(|d| d.program == Some(f.lighting_program()))
        .unwrap();
    assert_eq!(lighting.viewport.w(), 1024);
    assert_eq!(lighting.viewport.h(), 768);

    // Degenerate sizes (minimized window) are ignored.
    let textures = f.renderer.gbuffer().textures();
    f.renderer.set_frame_size(0, 0);
    f.renderer
        .render_frame(&f.cameras, &DrawableCollection::new(), 0.032);
    assert_eq!(f.renderer.frame_size(), (1024, 768));
    assert_eq!(f.renderer.gbuffer().textures(), textures);
}

#[test]
fn test_targets_are_released_exactly_once_on_drop() {
    let f = fixture();
    let textures = f.renderer.gbuffer().textures();
    let Fixture {
        headless,
        renderer,
        programs,
        ..
    } = f;
    drop(programs);
    drop(renderer);

    for texture in textures {
        assert_eq!(headless.deletion_count(texture), 1);
    }
    assert_eq!(headless.live_texture_count(), 0);
    assert_eq!(headless.live_frame_buffer_count(), 0);
    assert_eq!(headless.live_program_count(), 0);
    assert_eq!(headless.invalid_deletions(), 0);
}

#[test]
fn test_switching_path_never_samples_other_path_targets() {
    let mut f = fixture();
    f.renderer
        .lights_mut()
        .create_directional_light(Default::default());
    let opaque = f.mesh();
    let transparent = f.mesh().with_alpha(0.5);
    let drawables = DrawableCollection::new()
        .with_drawable(&opaque)
        .with_drawable(&transparent);

    f.renderer.render_frame(&f.cameras, &drawables, 0.0);
    let deferred = f.frame_draws();
    let post_color = f.renderer.post_process_target().color_texture().handle();
    assert!(deferred.iter().all(|d| !d.samples(post_color)));

    f.renderer.set_render_path(RenderPath::Forward);
    f.renderer.render_frame(&f.cameras, &drawables, 0.016);
    let forward = f.frame_draws();
    assert!(!forward.is_empty());
    for texture in f.renderer.gbuffer().textures() {
        assert!(forward.iter().all(|d| !d.samples(texture)));
    }
    assert!(forward
        .iter()
        .all(|d| d.target != f.renderer.gbuffer().framebuffer().target()));

    f.renderer.set_render_path(RenderPath::Deferred);
    f.renderer.render_frame(&f.cameras, &drawables, 0.032);
    let deferred = f.frame_draws();
    assert!(deferred.iter().all(|d| !d.samples(post_color)));
    assert!(deferred
        .iter()
        .all(|d| d.target != f.renderer.post_process_target().framebuffer().target()));
}

#[test]
fn test_deferred_frame_splits_opaque_and_transparent() {
    let mut f = fixture();
    let opaque = f.mesh();
    let almost_opaque = f.mesh().with_alpha(0.999);
    let transparent = f.mesh().with_alpha(0.25);
    let drawables = DrawableCollection::new()
        .with_drawable(&transparent)
        .with_drawable(&opaque)
        .with_drawable(&almost_opaque);

    f.headless.take_commands();
    let stats = f.renderer.render_frame(&f.cameras, &drawables, 0.0);
    let commands = f.headless.take_commands();

    assert_eq!(stats.geometry.draw_calls, 1);
    assert_eq!(stats.lighting.draw_calls, 1);
    assert_eq!(stats.transparency.draw_calls, 2);
    assert_eq!(stats.forward.draw_calls, 0);
    assert_eq!(stats.post_process.draw_calls, 0);

    let gbuffer_target = f.renderer.gbuffer().framebuffer().target();
    let draw_index = |pred: &dyn Fn(&DrawRecord) -> bool| {
        commands
            .iter()
            .position(|c| matches!(c, Command::Draw(d) if pred(d)))
            .unwrap()
    };

    let geometry = draw_index(&|d: &DrawRecord| d.target == gbuffer_target);
    let lighting = draw_index(&|d: &DrawRecord| d.program == Some(f.renderer.programs().lighting.handle()));
    let depth_blit = commands
        .iter()
        .position(|c| {
            matches!(c, Command::Blit { source, dest, mask, .. }
                if *source == gbuffer_target
                    && *dest == FrameTarget::BackBuffer
                    && *mask == BufferMask::DEPTH)
        })
        .unwrap();
    let first_transparent =
        draw_index(&|d: &DrawRecord| d.program == Some(f.programs.forward.handle()));

    assert!(geometry < lighting);
    assert!(lighting < depth_blit);
    assert!(depth_blit < first_transparent);

    let draws = commands
        .iter()
        .filter_map(|c| match c {
            Command::Draw(d) => Some(d),
            _ => None,
        })
        .collect::<Vec<_>>();
    let geometry_draws = draws
        .iter()
        .filter(|d| d.target == gbuffer_target)
        .collect::<Vec<_>>();
    assert_eq!(geometry_draws.len(), 1);
    assert_eq!(
        geometry_draws[0].program,
        Some(f.programs.geometry.handle())
    );

    let transparent_draws = draws
        .iter()
        .filter(|d| d.program == Some(f.programs.forward.handle()))
        .collect::<Vec<_>>();
    assert_eq!(transparent_draws.len(), 2);
    for draw in transparent_draws {
        assert_eq!(draw.target, FrameTarget::BackBuffer);
        assert_eq!(draw.blend, Some(BlendFunc::alpha_blend()));
    }

    let lighting_draw = draws
        .iter()
        .find(|d| d.program == Some(f.renderer.programs().lighting.handle()))
        .unwrap();
    for texture in f.renderer.gbuffer().textures() {
        assert!(lighting_draw.samples(texture));
    }
    assert_eq!(lighting_draw.blend, None);
}

#[test]
fn test_forward_frame_goes_through_post_process() {
    let mut f = fixture_with(RendererSettings {
        render_path: RenderPath::Forward,
        ..Default::default()
    });
    assert_eq!(f.renderer.render_path(), RenderPath::Forward);

    let opaque = f.mesh();
    let transparent = f.mesh().with_alpha(0.5);
    let drawables = DrawableCollection::new()
        .with_drawable(&transparent)
        .with_drawable(&opaque);

    f.headless.take_commands();
    let stats = f.renderer.render_frame(&f.cameras, &drawables, 0.0);
    let draws = f.frame_draws();

    assert_eq!(stats.forward.draw_calls, 2);
    assert_eq!(stats.post_process.draw_calls, 1);
    assert_eq!(stats.geometry.draw_calls, 0);

    let post_target = f.renderer.post_process_target().framebuffer().target();
    assert_eq!(draws.len(), 3);
    assert_eq!(draws[0].target, post_target);
    assert_eq!(draws[0].blend, None);
    assert_eq!(draws[1].target, post_target);
    assert_eq!(draws[1].blend, Some(BlendFunc::alpha_blend()));
    assert_eq!(draws[2].target, FrameTarget::BackBuffer);
    assert_eq!(
        draws[2].program,
        Some(f.renderer.programs().post_process.handle())
    );
    assert!(draws[2].samples(f.renderer.post_process_target().color_texture().handle()));
}

#[test]
fn test_clear_and_reset_restore_initial_light_state() {
    let mut f = fixture();
    {
        let lights = f.renderer.lights_mut();
        lights.create_point_light(PointLight::default());
        lights.create_directional_light(DirectionalLight::default());
        lights.create_spot_light(Default::default());
        lights.set_point_light_status(false);
        lights.set_directional_light_status(false);
        lights.set_spot_light_status(false);
        lights.reset();
    }

    let stats = f
        .renderer
        .render_frame(&f.cameras, &DrawableCollection::new(), 0.0);

    let lights = f.renderer.lights();
    assert!(lights.point_light_status());
    assert!(lights.directional_light_status());
    assert!(lights.spot_light_status());
    assert_eq!(stats.lights.point_lights, 0);
    assert_eq!(stats.lights.directional_lights, 0);
    assert_eq!(stats.lights.spot_lights, 0);
    for name in ["PointLightCount", "DirectionalLightCount", "SpotLightCount"] {
        assert_eq!(
            f.headless.uniform(f.lighting_program(), name),
            Some(UniformValue::UnsignedInteger(0))
        );
    }

    assert_eq!(
        f.renderer
            .lights_mut()
            .create_point_light(PointLight::default()),
        Some(0)
    );
}

#[test]
fn test_zero_directional_lights_render_no_shadows() {
    let mut f = fixture();
    let caster = f.mesh();
    let drawables = DrawableCollection::new().with_drawable(&caster);

    f.headless.take_commands();
    let stats = f.renderer.render_frame(&f.cameras, &drawables, 0.0);
    let draws = f.frame_draws();

    assert_eq!(stats.shadow.draw_calls, 0);
    assert_eq!(stats.lights.shadow_maps_rendered, 0);
    assert_eq!(
        f.headless
            .uniform(f.lighting_program(), "DirectionalLightCount"),
        Some(UniformValue::UnsignedInteger(0))
    );

    let shadow_maps = f.renderer.lights().shadow_maps();
    for i in 0..shadow_maps.len() {
        let map = shadow_maps.get(i).unwrap();
        assert!(draws.iter().all(|d| d.target != map.frame_buffer().target()));
        assert!(draws.iter().all(|d| !d.samples(map.depth_texture().handle())));
    }

    // The frame itself is still complete.
    assert_eq!(stats.geometry.draw_calls, 1);
    assert_eq!(stats.lighting.draw_calls, 1);
}

#[test]
fn test_shadow_pass_renders_casters_into_each_map() {
    let mut f = fixture_with(RendererSettings {
        max_shadow_casters: 1,
        ..Default::default()
    });
    f.renderer
        .lights_mut()
        .create_directional_light(Default::default());
    f.renderer
        .lights_mut()
        .create_directional_light(DirectionalLight {
            direction: Vector3::new(1.0, -1.0, 0.0),
            ..Default::default()
        });
    let caster = f.mesh();
    let receiver = f.mesh().with_cast_shadows(false);
    let drawables = DrawableCollection::new()
        .with_drawable(&caster)
        .with_drawable(&receiver);

    f.headless.take_commands();
    let stats = f.renderer.render_frame(&f.cameras, &drawables, 0.0);
    let commands = f.headless.take_commands();

    assert_eq!(stats.shadow.draw_calls, 1);
    assert_eq!(stats.lights.shadow_maps_rendered, 1);

    let shadow_maps = f.renderer.lights().shadow_maps();
    let first = shadow_maps.get(0).unwrap();
    let second = shadow_maps.get(1).unwrap();

    let shadow_draw = commands
        .iter()
        .find_map(|c| match c {
            Command::Draw(d) if d.target == first.frame_buffer().target() => Some(d),
            _ => None,
        })
        .unwrap();
    assert_eq!(shadow_draw.program, Some(f.programs.shadow.handle()));
    assert_eq!(shadow_draw.viewport.w(), SHADOW_MAP_SIZE as i32);
    assert_eq!(
        f.headless.uniform(f.programs.shadow.handle(), "VPLight"),
        Some(UniformValue::Matrix4(
            f.renderer.lights().light_space_matrix(0)
        ))
    );

    // Over the limit: cleared, never drawn into.
    assert!(commands.contains(&Command::Clear {
        target: second.frame_buffer().target(),
        color: None,
        depth: Some(1.0),
        stencil: None,
    }));
    assert!(!commands
        .iter()
        .any(|c| matches!(c, Command::Draw(d) if d.target == second.frame_buffer().target())));

    let lighting = commands
        .iter()
        .find_map(|c| match c {
            Command::Draw(d) if d.program == Some(f.renderer.programs().lighting.handle()) => {
                Some(d)
            }
            _ => None,
        })
        .unwrap();
    assert!(lighting.samples(first.depth_texture().handle()));
    assert!(lighting.samples(second.depth_texture().handle()));
    assert_eq!(lighting.viewport.w(), WIDTH as i32);
}

#[test]
fn test_missing_camera_still_renders_frame() {
    let mut f = fixture();
    let mesh = f.mesh();
    let no_cameras: Vec<SceneCamera> = Vec::new();

    let stats = f.renderer.render_frame(
        &no_cameras,
        &DrawableCollection::new().with_drawable(&mesh),
        0.0,
    );

    assert_eq!(stats.geometry.draw_calls, 1);
    assert_eq!(stats.lighting.draw_calls, 1);
    assert_eq!(
        f.headless.uniform(f.programs.geometry.handle(), "VPMatrix"),
        Some(UniformValue::Matrix4(Matrix4::identity()))
    );
}

#[test]
fn test_frame_is_presented_into_custom_target() {
    let mut f = fixture();
    let color = Rc::new(
        GpuTexture::new(
            &f.server,
            GpuTextureDescriptor::render_target(WIDTH, HEIGHT, PixelKind::RGBA8),
        )
        .unwrap(),
    );
    let depth = Rc::new(
        GpuTexture::new(
            &f.server,
            GpuTextureDescriptor::render_target(WIDTH, HEIGHT, PixelKind::D24S8),
        )
        .unwrap(),
    );
    let viewport = GpuFrameBuffer::new(
        &f.server,
        Some(Attachment {
            kind: AttachmentKind::DepthStencil,
            texture: depth,
        }),
        vec![Attachment {
            kind: AttachmentKind::Color,
            texture: color,
        }],
    )
    .unwrap();
    f.renderer.set_presentation_target(viewport.target());

    f.headless.take_commands();
    f.renderer
        .render_frame(&f.cameras, &DrawableCollection::new(), 0.0);
    let commands = f.headless.take_commands();

    assert!(commands.iter().any(|c| matches!(c,
        Command::Blit { dest, .. } if *dest == viewport.target())));
    let lighting = commands
        .iter()
        .find_map(|c| match c {
            Command::Draw(d) => Some(d),
            _ => None,
        })
        .unwrap();
    assert_eq!(lighting.target, viewport.target());
}

#[test]
fn test_deferred_frame_with_mixed_lights_and_opacity() {
    let mut f = fixture();
    {
        let lights = f.renderer.lights_mut();
        lights.create_directional_light(Default::default());
        lights.create_directional_light(DirectionalLight {
            direction: Vector3::new(1.0, -1.0, 0.0),
            ..Default::default()
        });
        for i in 0..3 {
            lights.create_point_light(PointLight {
                position: Vector3::new(i as f32, 1.0, 0.0),
                ..Default::default()
            });
        }
        lights.set_spot_light_status(false);
    }
    let geometry_a = triangle(&f.server);
    let geometry_b = triangle(&f.server);
    let a = MeshDrawable::new(geometry_a.clone(), f.programs.clone());
    let b = MeshDrawable::new(geometry_b.clone(), f.programs.clone()).with_alpha(0.5);
    let drawables = DrawableCollection::new()
        .with_drawable(&a)
        .with_drawable(&b);

    f.headless.take_commands();
    let stats = f.renderer.render_frame(&f.cameras, &drawables, 0.0);
    let draws = f.frame_draws();

    let gbuffer_target = f.renderer.gbuffer().framebuffer().target();
    let shadow_maps = f.renderer.lights().shadow_maps();
    let shadow_targets = (0..2)
        .map(|i| shadow_maps.get(i).unwrap().frame_buffer().target())
        .collect::<Vec<_>>();

    // A: written into the GBuffer and into both shadow maps, never blended.
    let a_draws = draws
        .iter()
        .filter(|d| d.geometry == geometry_a.handle())
        .collect::<Vec<_>>();
    assert_eq!(
        a_draws.iter().filter(|d| d.target == gbuffer_target).count(),
        1
    );
    assert_eq!(
        a_draws
            .iter()
            .filter(|d| shadow_targets.contains(&d.target))
            .count(),
        2
    );
    assert_eq!(a_draws.len(), 3);
    assert!(a_draws.iter().all(|d| d.blend.is_none()));

    // B: only in the blended transparency pass.
    let b_draws = draws
        .iter()
        .filter(|d| d.geometry == geometry_b.handle())
        .collect::<Vec<_>>();
    assert_eq!(b_draws.len(), 1);
    assert_eq!(b_draws[0].target, FrameTarget::BackBuffer);
    assert_eq!(b_draws[0].program, Some(f.programs.forward.handle()));
    assert_eq!(b_draws[0].blend, Some(BlendFunc::alpha_blend()));

    let lighting = f.lighting_program();
    assert_eq!(
        f.headless.uniform(lighting, "DirectionalLightCount"),
        Some(UniformValue::UnsignedInteger(2))
    );
    assert_eq!(
        f.headless.uniform(lighting, "PointLightCount"),
        Some(UniformValue::UnsignedInteger(3))
    );
    assert_eq!(
        f.headless.uniform(lighting, "SpotLightCount"),
        Some(UniformValue::UnsignedInteger(0))
    );
    assert_eq!(
        f.headless.uniform(lighting, "CameraSpotLightEnabled"),
        Some(UniformValue::Bool(false))
    );

    assert_eq!(stats.lights.shadow_maps_rendered, 2);
    assert_eq!(stats.shadow.draw_calls, 2);
    assert_eq!(stats.geometry.draw_calls, 1);
    assert_eq!(stats.transparency.draw_calls, 1);
}

#[test]
fn test_disabled_directional_lights_do_not_expose_old_shadow_maps() {
    let mut f = fixture();
    f.renderer
        .lights_mut()
        .create_directional_light(Default::default());
    let caster = f.mesh();
    let drawables = DrawableCollection::new().with_drawable(&caster);

    f.renderer.render_frame(&f.cameras, &drawables, 0.0);

    let shadow_map = f.renderer.lights().shadow_maps().get(0).unwrap();
    let shadow_texture = shadow_map.depth_texture().handle();
    let shadow_target = shadow_map.frame_buffer().target();

    f.renderer
        .lights_mut()
        .set_directional_light_status(false);

    for (i, path) in [RenderPath::Deferred, RenderPath::Forward]
        .into_iter()
        .enumerate()
    {
        f.renderer.set_render_path(path);
        f.headless.take_commands();
        let stats = f
            .renderer
            .render_frame(&f.cameras, &drawables, 0.016 * (i + 1) as f32);
        let commands = f.headless.take_commands();

        assert_eq!(stats.lights.shadow_maps_rendered, 0);
        // The map is not refreshed this frame...
        assert!(!commands
            .iter()
            .any(|c| matches!(c, Command::Clear { target, .. } if *target == shadow_target)));
        // ...so nothing may sample it.
        assert!(!commands
            .iter()
            .any(|c| matches!(c, Command::Draw(d) if d.samples(shadow_texture))));
        assert!(!commands.iter().any(|c| matches!(c,
            Command::SetTexture { texture: Some(t), .. } if *t == shadow_texture)));
    }
}

#[test]
fn test_incomplete_targets_are_logged_and_frame_completes() {
    let mut f = fixture();
    let (sender, receiver) = channel();
    Log::add_listener(sender);

    let opaque = f.mesh();
    let transparent = f.mesh().with_alpha(0.5);
    let drawables = DrawableCollection::new()
        .with_drawable(&opaque)
        .with_drawable(&transparent);

    f.headless.set_force_incomplete(true);
    f.renderer.set_frame_size(1024, 768);
    let deferred = f.renderer.render_frame(&f.cameras, &drawables, 0.0);
    f.renderer.set_render_path(RenderPath::Forward);
    let forward = f.renderer.render_frame(&f.cameras, &drawables, 0.016);
    f.headless.set_force_incomplete(false);

    let errors = errors(&receiver);
    assert!(errors
        .iter()
        .any(|e| e.starts_with("GBuffer frame buffer is incomplete")));
    assert!(errors
        .iter()
        .any(|e| e.starts_with("Post-process target frame buffer is incomplete")));

    // Targets are still recreated and every pass still draws.
    assert_eq!(f.renderer.frame_size(), (1024, 768));
    assert_eq!(deferred.geometry.draw_calls, 1);
    assert_eq!(deferred.lighting.draw_calls, 1);
    assert_eq!(deferred.transparency.draw_calls, 1);
    assert_eq!(forward.forward.draw_calls, 2);
    assert_eq!(forward.post_process.draw_calls, 1);
}

#[test]
fn test_failed_resize_keeps_frame_inside_both_targets() {
    let mut f = fixture();
    let (sender, receiver) = channel();
    Log::add_listener(sender);

    // Post-process depth-stencil can not be created, GBuffer uses other formats.
    f.headless.set_rejected_pixel_kind(Some(PixelKind::D24S8));
    f.renderer.set_frame_size(1024, 768);
    let stats = f
        .renderer
        .render_frame(&f.cameras, &DrawableCollection::new(), 0.0);
    f.headless.set_rejected_pixel_kind(None);

    assert_eq!(f.renderer.gbuffer().size(), (1024, 768));
    assert_eq!(f.renderer.post_process_target().size(), (WIDTH, HEIGHT));
    assert_eq!(f.renderer.frame_size(), (WIDTH, HEIGHT));
    assert_eq!(stats.lighting.draw_calls, 1);

    let errors = errors(&receiver);
    assert!(errors
        .iter()
        .any(|e| e.starts_with("Unable to resize post-process target")));
    assert!(errors
        .iter()
        .any(|e| e.starts_with("Render targets have different sizes after resize")));

    // Next request brings both targets to the same size again.
    f.renderer.set_frame_size(1024, 768);
    f.renderer
        .render_frame(&f.cameras, &DrawableCollection::new(), 0.016);
    assert_eq!(f.renderer.post_process_target().size(), (1024, 768));
    assert_eq!(f.renderer.frame_size(), (1024, 768));
    assert_eq!(f.headless.invalid_deletions(), 0);
}

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

//! Light registry. Lights live in fixed-capacity arrays, one per category, and are addressed by
//! their index in that array. Lights are never removed individually, only cleared in bulk, so
//! an index stays valid until the next [`LightManager::clear_lights`].
//!
//! The manager also owns the directional shadow maps and knows how to feed lights and shadows
//! into a shader. Uniform layout expected by shaders:
//!
//! - `AmbientStrength`, `AmbientColor`
//! - `PointLightArray[i].{Base.Color, Base.SpecularStrength, Position, AttenuationConstant,
//!   AttenuationLinear, AttenuationExponent, Radius}`, `PointLightCount`
//! - `DirLightArray[i].{Base.Color, Base.SpecularStrength, Direction}`, `DirectionalLightCount`
//! - `SpotLightArray[i].{Base.Color, Base.SpecularStrength, Position, Direction, CutOff,
//!   OuterCutOff, AttenuationConstant, AttenuationLinear, AttenuationExponent}`, `SpotLightCount`
//! - `CameraSpotLight.*` (same fields as a spot light) and `CameraSpotLightEnabled`
//! - `Texture_ShadowMap[i]` at texture unit `5 + i`, `VPLight[i]`

#![allow(missing_docs)]

use crate::{
    core::algebra::{Matrix4, Point3, Vector3},
    err,
    renderer::{
        framework::{
            error::FrameworkError,
            gpu_program::GpuProgramBinding,
            gpu_texture::SamplerKind,
            server::{GraphicsServer, SharedGraphicsServer},
        },
        shadow::{ShadowMap, ShadowMapSet},
        stats::LightingStatistics,
    },
    settings::{LightSpaceSettings, RendererSettings},
    warn,
};
use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString, VariantNames};

/// Maximum amount of point lights.
pub const MAX_POINT_LIGHTS: usize = 25;
/// Maximum amount of directional lights, also the amount of shadow maps.
pub const MAX_DIRECTIONAL_LIGHTS: usize = 2;
/// Maximum amount of spot lights.
pub const MAX_SPOT_LIGHTS: usize = 10;
/// First texture unit used by shadow maps. Slot `i` uses unit `SHADOW_MAP_TEXTURE_UNIT + i`.
pub const SHADOW_MAP_TEXTURE_UNIT: u32 = 5;

/// Omnidirectional light with distance attenuation.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub position: Vector3<f32>,
    pub color: Vector3<f32>,
    pub specular_strength: f32,
    pub attenuation_constant: f32,
    pub attenuation_linear: f32,
    pub attenuation_exponent: f32,
    pub radius: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            color: Vector3::new(1.0, 1.0, 1.0),
            specular_strength: 1.0,
            attenuation_constant: 1.0,
            attenuation_linear: 0.022,
            attenuation_exponent: 0.0019,
            radius: 100.0,
        }
    }
}

/// Infinitely distant light, casts shadows.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    pub direction: Vector3<f32>,
    pub color: Vector3<f32>,
    pub specular_strength: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vector3::new(0.0, -1.0, 0.0),
            color: Vector3::new(1.0, 1.0, 1.0),
            specular_strength: 1.0,
        }
    }
}

/// Cone light. Cut-off values are cosines of the inner and outer cone half-angles.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpotLight {
    pub position: Vector3<f32>,
    pub direction: Vector3<f32>,
    pub color: Vector3<f32>,
    pub specular_strength: f32,
    pub cut_off: f32,
    pub outer_cut_off: f32,
    pub attenuation_constant: f32,
    pub attenuation_linear: f32,
    pub attenuation_exponent: f32,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            direction: Vector3::new(0.0, 0.0, -1.0),
            color: Vector3::new(1.0, 1.0, 1.0),
            specular_strength: 1.0,
            cut_off: 25.0f32.to_radians().cos(),
            outer_cut_off: 35.0f32.to_radians().cos(),
            attenuation_constant: 1.0,
            attenuation_linear: 0.014,
            attenuation_exponent: 0.0007,
        }
    }
}

/// A light of any category.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Light {
    Point(PointLight),
    Directional(DirectionalLight),
    Spot(SpotLight),
}

#[allow(missing_docs)]
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString, VariantNames,
)]
pub enum LightKind {
    Point,
    Directional,
    Spot,
}

impl Light {
    /// Category of the light.
    pub fn kind(&self) -> LightKind {
        match self {
            Light::Point(_) => LightKind::Point,
            Light::Directional(_) => LightKind::Directional,
            Light::Spot(_) => LightKind::Spot,
        }
    }
}

/// Category plus index of a light inside its category.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LightHandle {
    pub kind: LightKind,
    pub index: usize,
}

/// See module docs.
pub struct LightManager {
    ambient_strength: f32,
    ambient_color: Vector3<f32>,
    point_lights: ArrayVec<PointLight, MAX_POINT_LIGHTS>,
    directional_lights: ArrayVec<DirectionalLight, MAX_DIRECTIONAL_LIGHTS>,
    spot_lights: ArrayVec<SpotLight, MAX_SPOT_LIGHTS>,
    camera_spot_light: SpotLight,
    point_lights_enabled: bool,
    directional_lights_enabled: bool,
    spot_lights_enabled: bool,
    light_space: LightSpaceSettings,
    shadow_maps: ShadowMapSet,
}

fn push_light<T, const N: usize>(lights: &mut ArrayVec<T, N>, light: T, kind: &str) -> Option<usize> {
    match lights.try_push(light) {
        Ok(()) => Some(lights.len() - 1),
        Err(_) => {
            warn!("Maximum number of {kind} lights ({N}) reached!");
            None
        }
    }
}

fn light_mut<'a, T, const N: usize>(
    lights: &'a mut ArrayVec<T, N>,
    id: usize,
    kind: &str,
) -> Option<&'a mut T> {
    let count = lights.len();
    let light = lights.get_mut(id);
    if light.is_none() {
        err!(
            "Invalid {kind} light id {id}, there are {count} {kind} lights."
        );
    }
    light
}

impl LightManager {
    /// Creates an empty registry and a shadow map for every directional light slot.
    pub fn new(
        server: &SharedGraphicsServer,
        settings: &RendererSettings,
    ) -> Result<Self, FrameworkError> {
        Ok(Self {
            ambient_strength: settings.ambient_strength,
            ambient_color: settings.ambient_color,
            point_lights: Default::default(),
            directional_lights: Default::default(),
            spot_lights: Default::default(),
            camera_spot_light: Default::default(),
            point_lights_enabled: true,
            directional_lights_enabled: true,
            spot_lights_enabled: true,
            light_space: settings.light_space,
            shadow_maps: ShadowMapSet::new(server, settings.shadow_map_size)?,
        })
    }

    /// Adds a point light. Returns its id, or `None` if all slots are taken.
    pub fn create_point_light(&mut self, light: PointLight) -> Option<usize> {
        push_light(&mut self.point_lights, light, "point")
    }

    /// Adds a directional light. Returns its id, or `None` if all slots are taken.
    pub fn create_directional_light(&mut self, light: DirectionalLight) -> Option<usize> {
        push_light(&mut self.directional_lights, light, "directional")
    }

    /// Adds a spot light. Returns its id, or `None` if all slots are taken.
    pub fn create_spot_light(&mut self, light: SpotLight) -> Option<usize> {
        push_light(&mut self.spot_lights, light, "spot")
    }

    /// Adds a light of any category.
    pub fn create(&mut self, light: Light) -> Option<LightHandle> {
        let kind = light.kind();
        let index = match light {
            Light::Point(light) => self.create_point_light(light),
            Light::Directional(light) => self.create_directional_light(light),
            Light::Spot(light) => self.create_spot_light(light),
        }?;
        Some(LightHandle { kind, index })
    }

    /// Replaces a light of any category. The light must match the category of the handle.
    pub fn update(&mut self, handle: LightHandle, light: Light) {
        match (handle.kind, light) {
            (LightKind::Point, Light::Point(light)) => {
                if let Some(l) = light_mut(&mut self.point_lights, handle.index, "point") {
                    *l = light;
                }
            }
            (LightKind::Directional, Light::Directional(light)) => {
                if let Some(l) =
                    light_mut(&mut self.directional_lights, handle.index, "directional")
                {
                    *l = light;
                }
            }
            (LightKind::Spot, Light::Spot(light)) => {
                if let Some(l) = light_mut(&mut self.spot_lights, handle.index, "spot") {
                    *l = light;
                }
            }
            (kind, light) => err!(
                "Cannot update {} light {} with a {} light.",
                kind.as_ref(),
                handle.index,
                light.kind().as_ref()
            ),
        }
    }

    pub fn update_point_light_specular_strength(&mut self, id: usize, specular_strength: f32) {
        if let Some(light) = light_mut(&mut self.point_lights, id, "point") {
            light.specular_strength = specular_strength;
        }
    }

    pub fn update_point_light_position(&mut self, id: usize, position: Vector3<f32>) {
        if let Some(light) = light_mut(&mut self.point_lights, id, "point") {
            light.position = position;
        }
    }

    pub fn update_point_light_color(&mut self, id: usize, color: Vector3<f32>) {
        if let Some(light) = light_mut(&mut self.point_lights, id, "point") {
            light.color = color;
        }
    }

    pub fn update_point_light_radius(&mut self, id: usize, radius: f32) {
        if let Some(light) = light_mut(&mut self.point_lights, id, "point") {
            light.radius = radius;
        }
    }

    pub fn update_directional_light_direction(&mut self, id: usize, direction: Vector3<f32>) {
        if let Some(light) = light_mut(&mut self.directional_lights, id, "directional") {
            light.direction = direction;
        }
    }

    pub fn update_directional_light_specular_strength(&mut self, id: usize, value: f32) {
        if let Some(light) = light_mut(&mut self.directional_lights, id, "directional") {
            light.specular_strength = value;
        }
    }

    pub fn update_directional_light_color(&mut self, id: usize, color: Vector3<f32>) {
        if let Some(light) = light_mut(&mut self.directional_lights, id, "directional") {
            light.color = color;
        }
    }

    pub fn update_spot_light_specular_strength(&mut self, id: usize, specular_strength: f32) {
        if let Some(light) = light_mut(&mut self.spot_lights, id, "spot") {
            light.specular_strength = specular_strength;
        }
    }

    pub fn update_spot_light_position(&mut self, id: usize, position: Vector3<f32>) {
        if let Some(light) = light_mut(&mut self.spot_lights, id, "spot") {
            light.position = position;
        }
    }

    pub fn update_spot_light_direction(&mut self, id: usize, direction: Vector3<f32>) {
        if let Some(light) = light_mut(&mut self.spot_lights, id, "spot") {
            light.direction = direction;
        }
    }

    pub fn update_spot_light_color(&mut self, id: usize, color: Vector3<f32>) {
        if let Some(light) = light_mut(&mut self.spot_lights, id, "spot") {
            light.color = color;
        }
    }

    /// `cut_off` is the cosine of the inner cone half-angle.
    pub fn update_spot_light_cut_off(&mut self, id: usize, cut_off: f32) {
        if let Some(light) = light_mut(&mut self.spot_lights, id, "spot") {
            light.cut_off = cut_off;
        }
    }

    /// `outer_cut_off` is the cosine of the outer cone half-angle.
    pub fn update_spot_light_outer_cut_off(&mut self, id: usize, outer_cut_off: f32) {
        if let Some(light) = light_mut(&mut self.spot_lights, id, "spot") {
            light.outer_cut_off = outer_cut_off;
        }
    }

    pub fn point_lights(&self) -> &[PointLight] {
        &self.point_lights
    }

    pub fn directional_lights(&self) -> &[DirectionalLight] {
        &self.directional_lights
    }

    pub fn spot_lights(&self) -> &[SpotLight] {
        &self.spot_lights
    }

    pub fn point_light_count(&self) -> usize {
        self.point_lights.len()
    }

    pub fn directional_light_count(&self) -> usize {
        self.directional_lights.len()
    }

    pub fn spot_light_count(&self) -> usize {
        self.spot_lights.len()
    }

    pub fn set_point_light_status(&mut self, enabled: bool) {
        self.point_lights_enabled = enabled;
    }

    pub fn point_light_status(&self) -> bool {
        self.point_lights_enabled
    }

    pub fn set_directional_light_status(&mut self, enabled: bool) {
        self.directional_lights_enabled = enabled;
    }

    pub fn directional_light_status(&self) -> bool {
        self.directional_lights_enabled
    }

    pub fn set_spot_light_status(&mut self, enabled: bool) {
        self.spot_lights_enabled = enabled;
    }

    pub fn spot_light_status(&self) -> bool {
        self.spot_lights_enabled
    }

    /// Moves the camera-attached spot light ("flashlight"). Called every frame by the renderer
    /// with the perspective camera position.
    pub fn set_spotlight_position(&mut self, position: Vector3<f32>) {
        self.camera_spot_light.position = position;
    }

    /// Turns the camera-attached spot light. Called every frame by the renderer with the
    /// perspective camera look direction.
    pub fn set_spotlight_direction(&mut self, direction: Vector3<f32>) {
        self.camera_spot_light.direction = direction;
    }

    pub fn camera_spot_light(&self) -> &SpotLight {
        &self.camera_spot_light
    }

    pub fn set_ambient_strength(&mut self, strength: f32) {
        self.ambient_strength = strength;
    }

    pub fn ambient_strength(&self) -> f32 {
        self.ambient_strength
    }

    pub fn set_ambient_color(&mut self, color: Vector3<f32>) {
        self.ambient_color = color;
    }

    pub fn ambient_color(&self) -> Vector3<f32> {
        self.ambient_color
    }

    pub fn light_space_settings(&self) -> &LightSpaceSettings {
        &self.light_space
    }

    /// Projection-view matrix of the directional light `index`, used both to render its
    /// shadow map and to sample it. Returns identity if there is no such light or directional
    /// lighting is disabled.
    pub fn light_space_matrix(&self, index: usize) -> Matrix4<f32> {
        if !self.directional_lights_enabled {
            return Matrix4::identity();
        }

        let Some(light) = self.directional_lights.get(index) else {
            return Matrix4::identity();
        };

        let Some(direction) = light.direction.try_normalize(f32::EPSILON) else {
            err!(
                "Directional light {index} has zero-length direction, shadows are disabled for it."
            );
            return Matrix4::identity();
        };

        let LightSpaceSettings {
            extent,
            z_near,
            z_far,
            standoff,
        } = self.light_space;

        let projection = Matrix4::new_orthographic(-extent, extent, -extent, extent, z_near, z_far);

        // Looking straight up or down makes +Y a degenerate up vector.
        let up = if direction.y.abs() > 0.999 {
            Vector3::z()
        } else {
            Vector3::y()
        };
        let eye = Point3::from(-direction * standoff);
        let view = Matrix4::look_at_rh(&eye, &Point3::origin(), &up);

        projection * view
    }

    /// Amount of lights of each category that reach shaders, disabled categories count as
    /// empty.
    pub fn lighting_statistics(&self) -> LightingStatistics {
        let count = |enabled: bool, len: usize| if enabled { len } else { 0 };
        LightingStatistics {
            point_lights: count(self.point_lights_enabled, self.point_lights.len()),
            spot_lights: count(self.spot_lights_enabled, self.spot_lights.len()),
            directional_lights: count(
                self.directional_lights_enabled,
                self.directional_lights.len(),
            ),
            shadow_maps_rendered: 0,
        }
    }

    /// Uploads ambient light and every light category into the bound program. A disabled
    /// category uploads a zero count.
    pub fn apply_lighting(&self, program: &mut GpuProgramBinding) -> LightingStatistics {
        let stats = self.lighting_statistics();

        program
            .set_f32("AmbientStrength", self.ambient_strength)
            .set_vector3("AmbientColor", &self.ambient_color);

        if self.point_lights_enabled {
            for (i, light) in self.point_lights.iter().enumerate() {
                program
                    .set_vector3(&format!("PointLightArray[{i}].Base.Color"), &light.color)
                    .set_f32(
                        &format!("PointLightArray[{i}].Base.SpecularStrength"),
                        light.specular_strength,
                    )
                    .set_vector3(&format!("PointLightArray[{i}].Position"), &light.position)
                    .set_f32(
                        &format!("PointLightArray[{i}].AttenuationConstant"),
                        light.attenuation_constant,
                    )
                    .set_f32(
                        &format!("PointLightArray[{i}].AttenuationLinear"),
                        light.attenuation_linear,
                    )
                    .set_f32(
                        &format!("PointLightArray[{i}].AttenuationExponent"),
                        light.attenuation_exponent,
                    )
                    .set_f32(&format!("PointLightArray[{i}].Radius"), light.radius);
            }
        }
        program.set_u32("PointLightCount", stats.point_lights as u32);

        if self.directional_lights_enabled {
            for (i, light) in self.directional_lights.iter().enumerate() {
                program
                    .set_vector3(&format!("DirLightArray[{i}].Base.Color"), &light.color)
                    .set_f32(
                        &format!("DirLightArray[{i}].Base.SpecularStrength"),
                        light.specular_strength,
                    )
                    .set_vector3(&format!("DirLightArray[{i}].Direction"), &light.direction);
            }
        }
        program.set_u32("DirectionalLightCount", stats.directional_lights as u32);

        if self.spot_lights_enabled {
            for (i, light) in self.spot_lights.iter().enumerate() {
                upload_spot_light(program, &format!("SpotLightArray[{i}]"), light);
            }
            upload_spot_light(program, "CameraSpotLight", &self.camera_spot_light);
        }
        program
            .set_u32("SpotLightCount", stats.spot_lights as u32)
            .set_bool("CameraSpotLightEnabled", self.spot_lights_enabled);

        stats
    }

    /// Binds the shadow map of every live directional light at units starting from
    /// [`SHADOW_MAP_TEXTURE_UNIT`] and uploads its light-space matrix. Nothing is bound while
    /// directional lighting is disabled, since the shadow pass does not refresh the maps then.
    pub fn apply_shadows(&self, program: &mut GpuProgramBinding) {
        if !self.directional_lights_enabled {
            return;
        }

        for i in 0..self.directional_lights.len() {
            let Some(shadow_map) = self.shadow_maps.get(i) else {
                err!("There is no shadow map for directional light {i}.");
                continue;
            };
            program
                .set_texture(
                    &format!("Texture_ShadowMap[{i}]"),
                    SHADOW_MAP_TEXTURE_UNIT + i as u32,
                    shadow_map.depth_texture(),
                )
                .set_matrix4(&format!("VPLight[{i}]"), &self.light_space_matrix(i));
        }
    }

    /// Detaches shadow maps bound by [`Self::apply_shadows`].
    pub fn unbind_shadow_textures(&self, program: &mut GpuProgramBinding) {
        for i in 0..self.directional_lights.len() {
            program.unset_texture(
                &format!("Texture_ShadowMap[{i}]"),
                SHADOW_MAP_TEXTURE_UNIT + i as u32,
                SamplerKind::Texture2D,
            );
        }
    }

    /// Directs draws into the shadow map of the slot. Returns `false` if there is no such slot.
    pub fn bind_shadow_map(&mut self, server: &dyn GraphicsServer, index: usize) -> bool {
        match self.shadow_maps.get_mut(index) {
            Some(shadow_map) => {
                shadow_map.bind(server);
                true
            }
            None => {
                err!("Shadow map index {index} is out of bounds.");
                false
            }
        }
    }

    /// Restores the target and viewport that were active before [`Self::bind_shadow_map`].
    pub fn unbind_shadow_map(&mut self, server: &dyn GraphicsServer, index: usize) {
        match self.shadow_maps.get_mut(index) {
            Some(shadow_map) => shadow_map.unbind(server),
            None => err!("Shadow map index {index} is out of bounds."),
        }
    }

    /// Replaces the shadow map of a slot, see [`ShadowMapSet::set`].
    pub fn set_shadow_map(&mut self, index: usize, map: ShadowMap) -> Result<ShadowMap, ShadowMap> {
        self.shadow_maps.set(index, map)
    }

    pub fn shadow_maps(&self) -> &ShadowMapSet {
        &self.shadow_maps
    }

    /// Removes every light. Enable flags and ambient settings are left as is.
    pub fn clear_lights(&mut self) {
        self.point_lights.clear();
        self.directional_lights.clear();
        self.spot_lights.clear();
    }

    /// Enables every light category and removes every light.
    pub fn reset(&mut self) {
        self.point_lights_enabled = true;
        self.directional_lights_enabled = true;
        self.spot_lights_enabled = true;
        self.clear_lights();
    }
}

fn upload_spot_light(program: &mut GpuProgramBinding, prefix: &str, light: &SpotLight) {
    program
        .set_vector3(&format!("{prefix}.Base.Color"), &light.color)
        .set_f32(
            &format!("{prefix}.Base.SpecularStrength"),
            light.specular_strength,
        )
        .set_vector3(&format!("{prefix}.Position"), &light.position)
        .set_vector3(&format!("{prefix}.Direction"), &light.direction)
        .set_f32(&format!("{prefix}.CutOff"), light.cut_off)
        .set_f32(&format!("{prefix}.OuterCutOff"), light.outer_cut_off)
        .set_f32(
            &format!("{prefix}.AttenuationConstant"),
            light.attenuation_constant,
        )
        .set_f32(
            &format!("{prefix}.AttenuationLinear"),
            light.attenuation_linear,
        )
        .set_f32(
            &format!("{prefix}.AttenuationExponent"),
            light.attenuation_exponent,
        );
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::renderer::framework::{
        gpu_program::{GpuProgram, UniformValue},
        headless::HeadlessServer,
    };
    use approx::assert_relative_eq;
    use std::rc::Rc;

    fn make_manager() -> (Rc<HeadlessServer>, SharedGraphicsServer, LightManager) {
        let headless = Rc::new(HeadlessServer::new(640, 480));
        let server: SharedGraphicsServer = headless.clone();
        let settings = RendererSettings {
            shadow_map_size: 64,
            ..Default::default()
        };
        let manager = LightManager::new(&server, &settings).unwrap();
        (headless, server, manager)
    }

    #[test]
    fn test_capacity_is_enforced() {
        let (_, _, mut manager) = make_manager();
        for i in 0..MAX_POINT_LIGHTS {
            assert_eq!(manager.create_point_light(PointLight::default()), Some(i));
        }
        assert_eq!(manager.create_point_light(PointLight::default()), None);
        assert_eq!(manager.point_light_count(), MAX_POINT_LIGHTS);

        for _ in 0..MAX_DIRECTIONAL_LIGHTS {
            assert!(manager.create_directional_light(Default::default()).is_some());
        }
        assert_eq!(
            manager.create(Light::Directional(Default::default())),
            None
        );
        assert_eq!(manager.directional_light_count(), MAX_DIRECTIONAL_LIGHTS);

        for _ in 0..MAX_SPOT_LIGHTS {
            assert!(manager.create_spot_light(Default::default()).is_some());
        }
        assert_eq!(manager.create_spot_light(Default::default()), None);
    }

    #[test]
    fn test_invalid_update_is_a_no_op() {
        let (_, _, mut manager) = make_manager();
        let id = manager.create_point_light(PointLight::default()).unwrap();
        manager.update_point_light_radius(id + 1, 5.0);
        manager.update_spot_light_cut_off(0, 0.5);
        assert_eq!(manager.point_lights(), &[PointLight::default()]);
        assert!(manager.spot_lights().is_empty());

        manager.update_point_light_radius(id, 5.0);
        assert_eq!(manager.point_lights()[id].radius, 5.0);
    }

    #[test]
    fn test_update_with_mismatched_kind_is_ignored() {
        let (_, _, mut manager) = make_manager();
        let handle = manager.create(Light::Point(PointLight::default())).unwrap();
        manager.update(handle, Light::Spot(SpotLight::default()));
        assert_eq!(manager.point_lights()[0], PointLight::default());
    }

    #[test]
    fn test_light_space_matrix_is_identity_when_unavailable() {
        let (_, _, mut manager) = make_manager();
        assert_eq!(manager.light_space_matrix(0), Matrix4::identity());

        manager.create_directional_light(DirectionalLight {
            direction: Vector3::new(-1.0, -1.0, 0.0),
            ..Default::default()
        });
        assert_ne!(manager.light_space_matrix(0), Matrix4::identity());
        assert_eq!(manager.light_space_matrix(1), Matrix4::identity());
        assert_eq!(
            manager.light_space_matrix(MAX_DIRECTIONAL_LIGHTS + 3),
            Matrix4::identity()
        );

        manager.set_directional_light_status(false);
        assert_eq!(manager.light_space_matrix(0), Matrix4::identity());
    }

    #[test]
    fn test_light_space_matrix_projects_origin_to_standoff_depth() {
        let (_, _, mut manager) = make_manager();
        manager.create_directional_light(DirectionalLight {
            direction: Vector3::new(0.0, -1.0, 0.0),
            ..Default::default()
        });
        let m = manager.light_space_matrix(0);
        let origin = m.transform_point(&Point3::origin());
        let settings = LightSpaceSettings::default();
        // Orthographic depth maps [near; far] to [-1; 1].
        let expected = (2.0 * settings.standoff - settings.z_far - settings.z_near)
            / (settings.z_far - settings.z_near);
        assert_relative_eq!(origin.x, 0.0, epsilon = 1.0e-5);
        assert_relative_eq!(origin.y, 0.0, epsilon = 1.0e-5);
        assert_relative_eq!(origin.z, expected, epsilon = 1.0e-5);
    }

    #[test]
    fn test_apply_lighting_uploads_counts_and_fields() {
        let (headless, server, mut manager) = make_manager();
        let program = GpuProgram::from_source(&server, "Lighting", "vs", "fs").unwrap();

        manager.create_point_light(PointLight::default());
        let spot = manager.create_spot_light(SpotLight::default()).unwrap();
        manager.update_spot_light_outer_cut_off(spot, 0.25);
        manager.set_point_light_status(false);

        let mut binding = program.bind(&*server);
        let stats = manager.apply_lighting(&mut binding);

        let uniform = |name: &str| headless.uniform(program.handle(), name);
        assert_eq!(stats.point_lights, 0);
        assert_eq!(stats.spot_lights, 1);
        assert_eq!(
            uniform("PointLightCount"),
            Some(UniformValue::UnsignedInteger(0))
        );
        assert_eq!(
            uniform("SpotLightCount"),
            Some(UniformValue::UnsignedInteger(1))
        );
        assert_eq!(
            uniform("DirectionalLightCount"),
            Some(UniformValue::UnsignedInteger(0))
        );
        assert_eq!(
            uniform("SpotLightArray[0].OuterCutOff"),
            Some(UniformValue::Float(0.25))
        );
        assert_eq!(
            uniform("AmbientStrength"),
            Some(UniformValue::Float(0.2))
        );
        assert_eq!(uniform("PointLightArray[0].Radius"), None);
    }

    #[test]
    fn test_update_is_visible_to_next_upload() {
        let (headless, server, mut manager) = make_manager();
        let program = GpuProgram::from_source(&server, "Forward", "vs", "fs").unwrap();
        let id = manager.create_point_light(PointLight::default()).unwrap();

        manager.update_point_light_position(id, Vector3::new(1.0, 2.0, 3.0));
        manager.apply_lighting(&mut program.bind(&*server));

        assert_eq!(
            headless.uniform(program.handle(), "PointLightArray[0].Position"),
            Some(UniformValue::Vector3(Vector3::new(1.0, 2.0, 3.0)))
        );
    }

    #[test]
    fn test_apply_shadows_binds_reserved_units() {
        let (headless, server, mut manager) = make_manager();
        let program = GpuProgram::from_source(&server, "Forward", "vs", "fs").unwrap();
        manager.create_directional_light(Default::default());
        manager.create_directional_light(DirectionalLight {
            direction: Vector3::new(1.0, -1.0, 0.0),
            ..Default::default()
        });

        headless.take_commands();
        manager.apply_shadows(&mut program.bind(&*server));

        let units = headless
            .take_commands()
            .into_iter()
            .filter_map(|c| match c {
                crate::renderer::framework::headless::Command::SetTexture {
                    name,
                    unit,
                    texture: Some(texture),
                    ..
                } => Some((name, unit, texture)),
                _ => None,
            })
            .collect::<Vec<_>>();

        assert_eq!(
            units,
            vec![
                (
                    "Texture_ShadowMap[0]".to_owned(),
                    SHADOW_MAP_TEXTURE_UNIT,
                    manager.shadow_maps().get(0).unwrap().depth_texture().handle()
                ),
                (
                    "Texture_ShadowMap[1]".to_owned(),
                    SHADOW_MAP_TEXTURE_UNIT + 1,
                    manager.shadow_maps().get(1).unwrap().depth_texture().handle()
                ),
            ]
        );
        assert_eq!(
            headless.uniform(program.handle(), "VPLight[1]"),
            Some(UniformValue::Matrix4(manager.light_space_matrix(1)))
        );
    }

    #[test]
    fn test_apply_shadows_binds_nothing_when_directional_lights_are_disabled() {
        let (headless, server, mut manager) = make_manager();
        let program = GpuProgram::from_source(&server, "Forward", "vs", "fs").unwrap();
        manager.create_directional_light(Default::default());
        manager.set_directional_light_status(false);

        headless.take_commands();
        manager.apply_shadows(&mut program.bind(&*server));

        assert!(!headless.take_commands().iter().any(|c| matches!(
            c,
            crate::renderer::framework::headless::Command::SetTexture {
                texture: Some(_),
                ..
            }
        )));
        assert_eq!(headless.uniform(program.handle(), "VPLight[0]"), None);
    }

    #[test]
    fn test_reset_restores_flags_and_clears() {
        let (_, _, mut manager) = make_manager();
        manager.create_point_light(Default::default());
        manager.create_spot_light(Default::default());
        manager.create_directional_light(Default::default());
        manager.set_point_light_status(false);
        manager.set_spot_light_status(false);
        manager.set_directional_light_status(false);

        manager.reset();

        assert!(manager.point_light_status());
        assert!(manager.spot_light_status());
        assert!(manager.directional_light_status());
        assert_eq!(manager.point_light_count(), 0);
        assert_eq!(manager.spot_light_count(), 0);
        assert_eq!(manager.directional_light_count(), 0);
        assert_eq!(manager.create_point_light(Default::default()), Some(0));
    }
}

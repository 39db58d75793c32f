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

//! Renderer settings. Settings are plain data, they can be stored in a RON file and loaded back
//! at startup.

use crate::{
    core::{algebra::Vector3, color::Color},
    renderer::{shadow::DEFAULT_SHADOW_MAP_SIZE, RenderPath},
};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path};

/// An error that may occur when loading or saving settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// File system error.
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed settings file.
    #[error("Unable to parse settings: {0}")]
    Ron(#[from] ron::error::SpannedError),
    /// Settings could not be serialized.
    #[error("Unable to serialize settings: {0}")]
    Serialize(#[from] ron::Error),
}

/// Parameters of the orthographic projection used to render directional shadow maps. The
/// light "camera" sits at `-direction * standoff` and looks at the world origin.
#[derive(Deserialize, Serialize, PartialEq, Clone, Copy, Debug)]
#[serde(default)]
pub struct LightSpaceSettings {
    /// Half-size of the square covered by the projection.
    pub extent: f32,
    /// Near clipping plane.
    pub z_near: f32,
    /// Far clipping plane.
    pub z_far: f32,
    /// Distance from the origin to the light "camera".
    pub standoff: f32,
}

impl Default for LightSpaceSettings {
    fn default() -> Self {
        Self {
            extent: 1500.0,
            z_near: 0.1,
            z_far: 2000.0,
            standoff: 450.0,
        }
    }
}

/// See module docs.
#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
#[serde(default)]
pub struct RendererSettings {
    /// Pass sequence used for the first frame.
    pub render_path: RenderPath,
    /// Color the presentation target is cleared with.
    pub clear_color: Color,
    /// Ambient light strength.
    pub ambient_strength: f32,
    /// Ambient light color.
    pub ambient_color: Vector3<f32>,
    /// Resolution of every directional shadow map. Does not depend on the window size.
    pub shadow_map_size: usize,
    /// How many directional lights render a shadow map per frame.
    pub max_shadow_casters: usize,
    /// Directional shadow projection.
    pub light_space: LightSpaceSettings,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            render_path: RenderPath::Deferred,
            clear_color: Color::opaque(0, 0, 0),
            ambient_strength: 0.2,
            ambient_color: Vector3::new(1.0, 1.0, 1.0),
            shadow_map_size: DEFAULT_SHADOW_MAP_SIZE,
            max_shadow_casters: crate::renderer::light::MAX_DIRECTIONAL_LIGHTS,
            light_space: Default::default(),
        }
    }
}

impl RendererSettings {
    /// Loads settings from a RON file. Missing fields take default values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let file = File::open(path)?;
        Ok(ron::de::from_reader(file)?)
    }

    /// Writes settings into a RON file in human-readable form.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let file = File::create(path)?;
        ron::ser::to_writer_pretty(file, self, PrettyConfig::default())?;
        Ok(())
    }
}

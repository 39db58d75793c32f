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

//! Per-pass and per-frame rendering statistics.

use crate::renderer::framework::geometry_buffer::DrawCallStatistics;
use std::{
    fmt::{Display, Formatter},
    ops::AddAssign,
};

/// GPU statistics of a single pass.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RenderPassStatistics {
    /// Amount of draw calls - lower the better.
    pub draw_calls: usize,
    /// Amount of triangles.
    pub triangles_rendered: usize,
}

impl Display for RenderPassStatistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Draw Calls: {}\n\
            Triangles Rendered: {}",
            self.draw_calls, self.triangles_rendered
        )
    }
}

impl AddAssign for RenderPassStatistics {
    fn add_assign(&mut self, rhs: Self) {
        self.draw_calls += rhs.draw_calls;
        self.triangles_rendered += rhs.triangles_rendered;
    }
}

impl AddAssign<DrawCallStatistics> for RenderPassStatistics {
    fn add_assign(&mut self, rhs: DrawCallStatistics) {
        self.draw_calls += 1;
        self.triangles_rendered += rhs.triangles;
    }
}

/// Lighting statistics.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct LightingStatistics {
    /// How many point lights were uploaded.
    pub point_lights: usize,
    /// How many spot lights were uploaded.
    pub spot_lights: usize,
    /// How many directional lights were uploaded.
    pub directional_lights: usize,
    /// How many shadow maps were rendered.
    pub shadow_maps_rendered: usize,
}

impl AddAssign for LightingStatistics {
    fn add_assign(&mut self, rhs: Self) {
        self.point_lights += rhs.point_lights;
        self.spot_lights += rhs.spot_lights;
        self.directional_lights += rhs.directional_lights;
        self.shadow_maps_rendered += rhs.shadow_maps_rendered;
    }
}

impl Display for LightingStatistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Lighting Statistics:\n\
            \tPoint Lights: {}\n\
            \tSpot Lights: {}\n\
            \tDirectional Lights: {}\n\
            \tShadow Maps: {}",
            self.point_lights, self.spot_lights, self.directional_lights, self.shadow_maps_rendered
        )
    }
}

/// Statistics of a whole frame, split by pass.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameStatistics {
    /// Geometry pass of the deferred path.
    pub geometry: RenderPassStatistics,
    /// Shadow pass, both paths.
    pub shadow: RenderPassStatistics,
    /// Screen-space lighting composite of the deferred path.
    pub lighting: RenderPassStatistics,
    /// Transparency pass of the deferred path.
    pub transparency: RenderPassStatistics,
    /// Forward shading pass of the forward path.
    pub forward: RenderPassStatistics,
    /// Post-process pass of the forward path.
    pub post_process: RenderPassStatistics,
    /// Light counters.
    pub lights: LightingStatistics,
}

impl FrameStatistics {
    /// Sum of all passes.
    pub fn total(&self) -> RenderPassStatistics {
        let mut total = self.geometry;
        total += self.shadow;
        total += self.lighting;
        total += self.transparency;
        total += self.forward;
        total += self.post_process;
        total
    }
}

impl Display for FrameStatistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let total = self.total();
        write!(
            f,
            "Frame Statistics:\n\
            \tGeometry: {} draw calls\n\
            \tShadows: {} draw calls\n\
            \tLighting: {} draw calls\n\
            \tTransparency: {} draw calls\n\
            \tForward: {} draw calls\n\
            \tPost Process: {} draw calls\n\
            {}\n\
            {}",
            self.geometry.draw_calls,
            self.shadow.draw_calls,
            self.lighting.draw_calls,
            self.transparency.draw_calls,
            self.forward.draw_calls,
            self.post_process.draw_calls,
            total,
            self.lights
        )
    }
}

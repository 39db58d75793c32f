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

//! Per-frame camera snapshot shared by every pass.

use crate::core::algebra::{Matrix3, Matrix4, Vector3};

/// Camera state gathered once at the start of a frame. Passes receive it by shared reference
/// and never modify it.
#[derive(Clone, Debug, PartialEq)]
pub struct UniformData {
    /// View matrix of the perspective (main) camera.
    pub view_matrix: Matrix4<f32>,
    /// Projection matrix of the perspective (main) camera.
    pub projection_matrix: Matrix4<f32>,
    /// View matrix of the orthogonal (UI) camera.
    pub ui_view_matrix: Matrix4<f32>,
    /// Projection matrix of the orthogonal (UI) camera.
    pub ui_projection_matrix: Matrix4<f32>,
    /// Time in seconds passed by the caller.
    pub current_time: f32,
    /// World position of the perspective camera.
    pub camera_position: Vector3<f32>,
}

impl Default for UniformData {
    fn default() -> Self {
        Self {
            view_matrix: Matrix4::identity(),
            projection_matrix: Matrix4::identity(),
            ui_view_matrix: Matrix4::identity(),
            ui_projection_matrix: Matrix4::identity(),
            current_time: 0.0,
            camera_position: Vector3::zeros(),
        }
    }
}

impl UniformData {
    /// `projection * view` of the main camera.
    pub fn view_projection_matrix(&self) -> Matrix4<f32> {
        self.projection_matrix * self.view_matrix
    }

    /// `projection * view` with the translation part of the view stripped, so geometry stays
    /// centered on the camera. Used for sky rendering.
    pub fn rotation_only_view_projection_matrix(&self) -> Matrix4<f32> {
        let rotation: Matrix3<f32> = self.view_matrix.fixed_view::<3, 3>(0, 0).into_owned();
        self.projection_matrix * rotation.to_homogeneous()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::algebra::Point3;
    use approx::assert_relative_eq;

    #[test]
    fn test_rotation_only_view_drops_translation() {
        let data = UniformData {
            view_matrix: Matrix4::look_at_rh(
                &Point3::new(10.0, 5.0, -3.0),
                &Point3::new(10.0, 5.0, -4.0),
                &Vector3::y(),
            ),
            ..Default::default()
        };
        let m = data.rotation_only_view_projection_matrix();
        assert_relative_eq!(m.column(3).xyz(), Vector3::zeros());
        assert_relative_eq!(m[(3, 3)], 1.0);
    }
}

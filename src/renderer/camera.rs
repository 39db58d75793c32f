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

//! Camera interface the renderer reads at the start of every frame.

use crate::core::algebra::{Matrix4, Point3, Vector3};

/// Camera projection kind. The perspective camera drives the 3D passes, the orthogonal one
/// only feeds the UI slots of [`super::uniform::UniformData`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CameraKind {
    /// Main 3D camera.
    Perspective,
    /// UI camera.
    Orthogonal,
}

/// Read-only view of a camera.
pub trait CameraView {
    /// Projection kind.
    fn kind(&self) -> CameraKind;
    /// World to view transform.
    fn view_matrix(&self) -> Matrix4<f32>;
    /// View to clip transform.
    fn projection_matrix(&self) -> Matrix4<f32>;
    /// World position.
    fn position(&self) -> Vector3<f32>;
    /// Normalized look direction in world space.
    fn forward(&self) -> Vector3<f32>;
}

/// Anything that can enumerate the active cameras of a scene.
pub trait CameraSource {
    /// Calls `visitor` for every active camera.
    fn visit_cameras(&self, visitor: &mut dyn FnMut(&dyn CameraView));
}

impl<T: CameraView> CameraSource for [T] {
    fn visit_cameras(&self, visitor: &mut dyn FnMut(&dyn CameraView)) {
        for camera in self {
            visitor(camera)
        }
    }
}

impl<T: CameraView> CameraSource for Vec<T> {
    fn visit_cameras(&self, visitor: &mut dyn FnMut(&dyn CameraView)) {
        self.as_slice().visit_cameras(visitor)
    }
}

/// Plain camera description, for hosts that do not have their own camera type.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub struct SceneCamera {
    pub kind: CameraKind,
    pub view_matrix: Matrix4<f32>,
    pub projection_matrix: Matrix4<f32>,
    pub position: Vector3<f32>,
    pub forward: Vector3<f32>,
}

impl SceneCamera {
    /// Perspective camera at `position` looking at `target`, +Y is up.
    pub fn perspective(
        position: Vector3<f32>,
        target: Vector3<f32>,
        aspect: f32,
        fov_y: f32,
        z_near: f32,
        z_far: f32,
    ) -> Self {
        let forward = (target - position)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| -Vector3::z());
        Self {
            kind: CameraKind::Perspective,
            view_matrix: Matrix4::look_at_rh(
                &Point3::from(position),
                &Point3::from(target),
                &Vector3::y(),
            ),
            projection_matrix: Matrix4::new_perspective(aspect, fov_y, z_near, z_far),
            position,
            forward,
        }
    }

    /// Orthogonal UI camera covering `width` x `height` pixels with the origin in the top-left.
    pub fn orthogonal(width: f32, height: f32) -> Self {
        Self {
            kind: CameraKind::Orthogonal,
            view_matrix: Matrix4::identity(),
            projection_matrix: Matrix4::new_orthographic(0.0, width, height, 0.0, -1.0, 1.0),
            position: Vector3::zeros(),
            forward: -Vector3::z(),
        }
    }
}

impl CameraView for SceneCamera {
    fn kind(&self) -> CameraKind {
        self.kind
    }

    fn view_matrix(&self) -> Matrix4<f32> {
        self.view_matrix
    }

    fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection_matrix
    }

    fn position(&self) -> Vector3<f32> {
        self.position
    }

    fn forward(&self) -> Vector3<f32> {
        self.forward
    }
}

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

//! Indexed triangle geometry stored on a graphics server.

#![allow(missing_docs)]

use crate::renderer::framework::{
    error::FrameworkError,
    server::{GraphicsServer, SharedGraphicsServer},
};
use std::rc::{Rc, Weak};

/// Opaque identifier of a geometry buffer inside a graphics server.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryBufferHandle(pub u32);

/// Single float vertex attribute. Attributes are tightly packed in the order they're listed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader location of the attribute.
    pub location: u32,
    /// Amount of `f32` components, 1..=4.
    pub components: usize,
}

/// Interleaved vertices plus triangle list.
#[derive(Copy, Clone, Debug)]
pub struct GeometryBufferDescriptor<'a> {
    pub vertices: &'a [f32],
    pub layout: &'a [VertexAttribute],
    pub triangles: &'a [[u32; 3]],
}

impl GeometryBufferDescriptor<'_> {
    /// Amount of floats per vertex.
    pub fn stride(&self) -> usize {
        self.layout.iter().map(|a| a.components).sum()
    }

    /// Amount of vertices described by the data.
    pub fn vertex_count(&self) -> usize {
        match self.stride() {
            0 => 0,
            stride => self.vertices.len() / stride,
        }
    }

    fn validate(&self) -> Result<(), FrameworkError> {
        let stride = self.stride();
        if stride == 0
            || self.vertices.len() % stride != 0
            || self.layout.iter().any(|a| !(1..=4).contains(&a.components))
        {
            return Err(FrameworkError::InvalidAttributeDescriptor);
        }

        let vertex_count = self.vertex_count();
        if let Some(&index) = self
            .triangles
            .iter()
            .flatten()
            .find(|&&i| i as usize >= vertex_count)
        {
            return Err(FrameworkError::InvalidElementRange {
                index,
                vertex_count,
            });
        }

        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DrawCallStatistics {
    pub triangles: usize,
}

pub struct GpuGeometryBuffer {
    handle: GeometryBufferHandle,
    triangle_count: usize,
    server: Weak<dyn GraphicsServer>,
}

impl GpuGeometryBuffer {
    pub fn new(
        server: &SharedGraphicsServer,
        desc: GeometryBufferDescriptor,
    ) -> Result<Self, FrameworkError> {
        desc.validate()?;
        let handle = server.create_geometry_buffer(&desc)?;
        Ok(Self {
            handle,
            triangle_count: desc.triangles.len(),
            server: Rc::downgrade(server),
        })
    }

    pub fn handle(&self) -> GeometryBufferHandle {
        self.handle
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    /// Binds the buffer and draws all of its triangles, `instance_count > 0` issues an
    /// instanced draw.
    pub fn draw(
        &self,
        server: &dyn GraphicsServer,
        instance_count: usize,
    ) -> Result<DrawCallStatistics, FrameworkError> {
        server.set_geometry_buffer(self.handle);
        server.draw_elements((instance_count > 0).then_some(instance_count))
    }
}

impl Drop for GpuGeometryBuffer {
    fn drop(&mut self) {
        if let Some(server) = self.server.upgrade() {
            server.delete_geometry_buffer(self.handle);
        }
    }
}

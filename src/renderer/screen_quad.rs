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

//! Full-viewport quad used to run screen-space programs (lighting composite, post-processing).

use crate::renderer::{
    framework::{
        error::FrameworkError,
        geometry_buffer::{GeometryBufferDescriptor, GpuGeometryBuffer, VertexAttribute},
        server::{GraphicsServer, SharedGraphicsServer},
    },
    stats::RenderPassStatistics,
};

/// Two triangles covering normalized device coordinates. Vertex layout is `location 0`:
/// position (2 floats), `location 1`: texture coordinates (2 floats).
pub struct ScreenQuadExecutor {
    quad: GpuGeometryBuffer,
}

#[rustfmt::skip]
const VERTICES: [f32; 16] = [
    // position   // uv
    -1.0, -1.0,   0.0, 0.0,
     1.0, -1.0,   1.0, 0.0,
     1.0,  1.0,   1.0, 1.0,
    -1.0,  1.0,   0.0, 1.0,
];

const LAYOUT: [VertexAttribute; 2] = [
    VertexAttribute {
        location: 0,
        components: 2,
    },
    VertexAttribute {
        location: 1,
        components: 2,
    },
];

const TRIANGLES: [[u32; 3]; 2] = [[0, 1, 2], [0, 2, 3]];

impl ScreenQuadExecutor {
    pub fn new(server: &SharedGraphicsServer) -> Result<Self, FrameworkError> {
        Ok(Self {
            quad: GpuGeometryBuffer::new(
                server,
                GeometryBufferDescriptor {
                    vertices: &VERTICES,
                    layout: &LAYOUT,
                    triangles: &TRIANGLES,
                },
            )?,
        })
    }

    /// Draws the quad with whatever program is bound. Culling, depth test and blending are
    /// disabled, inputs must be uploaded by the caller beforehand. Issues exactly one draw call.
    pub fn execute(
        &self,
        server: &dyn GraphicsServer,
    ) -> Result<RenderPassStatistics, FrameworkError> {
        server.set_cull_face(None);
        server.set_depth_func(None);
        server.set_blend_func(None);

        let mut stats = RenderPassStatistics::default();
        stats += self.quad.draw(server, 0)?;
        Ok(stats)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::renderer::framework::{gpu_program::GpuProgram, headless::HeadlessServer};
    use std::rc::Rc;

    #[test]
    fn test_single_draw_call() {
        let headless = Rc::new(HeadlessServer::new(64, 64));
        let server: SharedGraphicsServer = headless.clone();
        let quad = ScreenQuadExecutor::new(&server).unwrap();
        let program = GpuProgram::from_source(&server, "Quad", "vs", "fs").unwrap();
        program.bind(&*server);

        let stats = quad.execute(&*server).unwrap();

        assert_eq!(
            stats,
            RenderPassStatistics {
                draw_calls: 1,
                triangles_rendered: 2
            }
        );
        let draws = headless.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].program, Some(program.handle()));
        assert_eq!(draws[0].depth_func, None);
        assert_eq!(draws[0].blend, None);
        assert_eq!(draws[0].cull_face, None);
    }
}

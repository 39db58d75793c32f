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

//! Shader programs and a binding helper used to fill their inputs.

use crate::{
    core::algebra::{Matrix4, Vector2, Vector3, Vector4},
    renderer::framework::{
        error::FrameworkError,
        gpu_texture::{GpuTexture, SamplerKind},
        server::{GraphicsServer, SharedGraphicsServer},
    },
};
use std::rc::{Rc, Weak};

/// Opaque identifier of a shader program inside a graphics server.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u32);

#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Integer(i32),
    UnsignedInteger(u32),
    Float(f32),
    Vector2(Vector2<f32>),
    Vector3(Vector3<f32>),
    Vector4(Vector4<f32>),
    Matrix4(Matrix4<f32>),
}

/// Linked vertex + fragment program.
pub struct GpuProgram {
    handle: ProgramHandle,
    name: String,
    server: Weak<dyn GraphicsServer>,
}

impl GpuProgram {
    /// Compiles and links a program from the given sources.
    pub fn from_source(
        server: &SharedGraphicsServer,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, FrameworkError> {
        let handle = server.create_program(name, vertex_source, fragment_source)?;
        Ok(Self {
            handle,
            name: name.to_owned(),
            server: Rc::downgrade(server),
        })
    }

    #[allow(missing_docs)]
    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    #[allow(missing_docs)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Makes the program current and returns a binding that uploads its inputs.
    pub fn bind<'a>(&self, server: &'a dyn GraphicsServer) -> GpuProgramBinding<'a> {
        server.set_program(self.handle);
        GpuProgramBinding {
            server,
            program: self.handle,
        }
    }
}

impl Drop for GpuProgram {
    fn drop(&mut self) {
        if let Some(server) = self.server.upgrade() {
            server.delete_program(self.handle);
        }
    }
}

/// Currently bound program. Every setter forwards to the graphics server, so the binding is
/// only valid until another program is bound.
pub struct GpuProgramBinding<'a> {
    server: &'a dyn GraphicsServer,
    program: ProgramHandle,
}

#[allow(missing_docs)]
impl<'a> GpuProgramBinding<'a> {
    pub fn server(&self) -> &'a dyn GraphicsServer {
        self.server
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    #[inline(always)]
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) -> &mut Self {
        self.server.set_uniform(name, value);
        self
    }

    #[inline(always)]
    pub fn set_bool(&mut self, name: &str, value: bool) -> &mut Self {
        self.set_uniform(name, UniformValue::Bool(value))
    }

    #[inline(always)]
    pub fn set_i32(&mut self, name: &str, value: i32) -> &mut Self {
        self.set_uniform(name, UniformValue::Integer(value))
    }

    #[inline(always)]
    pub fn set_u32(&mut self, name: &str, value: u32) -> &mut Self {
        self.set_uniform(name, UniformValue::UnsignedInteger(value))
    }

    #[inline(always)]
    pub fn set_f32(&mut self, name: &str, value: f32) -> &mut Self {
        self.set_uniform(name, UniformValue::Float(value))
    }

    #[inline(always)]
    pub fn set_vector3(&mut self, name: &str, value: &Vector3<f32>) -> &mut Self {
        self.set_uniform(name, UniformValue::Vector3(*value))
    }

    #[inline(always)]
    pub fn set_vector4(&mut self, name: &str, value: &Vector4<f32>) -> &mut Self {
        self.set_uniform(name, UniformValue::Vector4(*value))
    }

    #[inline(always)]
    pub fn set_matrix4(&mut self, name: &str, value: &Matrix4<f32>) -> &mut Self {
        self.set_uniform(name, UniformValue::Matrix4(*value))
    }

    /// Binds the texture to the given unit and points the sampler `name` at it.
    #[inline(always)]
    pub fn set_texture(&mut self, name: &str, unit: u32, texture: &GpuTexture) -> &mut Self {
        self.server.set_texture(
            name,
            unit,
            texture.kind().sampler_kind(),
            Some(texture.handle()),
        );
        self
    }

    /// Detaches whatever texture is bound to the given unit.
    #[inline(always)]
    pub fn unset_texture(&mut self, name: &str, unit: u32, kind: SamplerKind) -> &mut Self {
        self.server.set_texture(name, unit, kind, None);
        self
    }
}

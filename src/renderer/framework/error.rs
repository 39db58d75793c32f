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

//! Contains all possible errors that may occur during creation of GPU resources or while
//! talking to a graphics server.

/// Set of possible graphics framework errors.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    /// Compilation of a shader has failed.
    #[error(
        "Compilation of \"{}\" shader has failed: {}",
        shader_name,
        error_message
    )]
    ShaderCompilationFailed {
        /// Name of shader.
        shader_name: String,
        /// Compilation error message.
        error_message: String,
    },
    /// Means that shader link stage failed, exact reason is inside `error_message`
    #[error("Linking shader \"{}\" failed: {}", shader_name, error_message)]
    ShaderLinkingFailed {
        /// Name of shader.
        shader_name: String,
        /// Linking error message.
        error_message: String,
    },
    /// Texture has invalid data - insufficient size.
    #[error(
        "Texture has invalid data (insufficent size): expected {}, actual: {}",
        expected_data_size,
        actual_data_size
    )]
    InvalidTextureData {
        /// Expected data size in bytes.
        expected_data_size: usize,
        /// Actual data size in bytes.
        actual_data_size: usize,
    },
    /// Texture with zero width or height was requested.
    #[error("Texture size must be non-zero, got {}x{}", width, height)]
    InvalidTextureSize {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
    },
    /// Geometry buffer references a vertex that does not exist.
    #[error(
        "Triangle index {} is out of bounds, vertex count is {}",
        index,
        vertex_count
    )]
    InvalidElementRange {
        /// Offending index.
        index: u32,
        /// Total amount of vertices.
        vertex_count: usize,
    },
    /// Vertex layout does not match the vertex data.
    #[error("Vertex layout does not match the vertex data.")]
    InvalidAttributeDescriptor,
    /// An attachment of a wrong kind was passed to a frame buffer.
    #[error("Attempt to use {} attachment as {} attachment!", actual, expected)]
    InvalidAttachment {
        /// Kind of the attachment slot.
        expected: &'static str,
        /// Kind of the passed attachment.
        actual: &'static str,
    },
    /// A handle that is not known to the graphics server was used.
    #[error("{} handle {} is unknown to the graphics server", kind, id)]
    UnknownHandle {
        /// Kind of the resource.
        kind: &'static str,
        /// Raw handle value.
        id: u32,
    },
    /// A draw call was issued without a bound geometry buffer.
    #[error("No geometry buffer is bound")]
    NoGeometryBound,
    /// Graphics server failed to construct frame buffer.
    #[error("Graphics server failed to construct frame buffer.")]
    FailedToConstructFBO,
    /// Custom error. Usually used for internal errors.
    #[error("Custom error: {0}")]
    Custom(String),
}

impl From<String> for FrameworkError {
    fn from(v: String) -> Self {
        Self::Custom(v)
    }
}

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

//! Graphics API abstraction. The renderer never talks to a particular API directly, it only
//! issues commands through [`server::GraphicsServer`]. Resource wrappers in this module own
//! server-side objects and release them when dropped.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString, VariantNames};

pub mod error;
pub mod framebuffer;
pub mod geometry_buffer;
#[cfg(feature = "opengl")]
pub mod gl;
pub mod gpu_program;
pub mod gpu_texture;
pub mod headless;
pub mod server;

/// Depth comparison function.
#[derive(
    Copy,
    Clone,
    PartialOrd,
    PartialEq,
    Eq,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Debug,
    Default,
    AsRefStr,
    EnumString,
    VariantNames,
)]
pub enum CompareFunc {
    /// Never passes.
    Never,

    /// Passes if the incoming value is less than the stored value.
    Less,

    /// Passes if the incoming value is equal to the stored value.
    Equal,

    /// Passes if the incoming value is less than or equal to the stored value.
    #[default]
    LessOrEqual,

    /// Passes if the incoming value is greater than the stored value.
    Greater,

    /// Passes if the incoming value is not equal to the stored value.
    NotEqual,

    /// Passes if the incoming value is greater than or equal to the stored value.
    GreaterOrEqual,

    /// Always passes.
    Always,
}

#[allow(missing_docs)]
#[derive(
    Copy,
    Clone,
    Hash,
    PartialOrd,
    PartialEq,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Debug,
    Default,
    AsRefStr,
    EnumString,
    VariantNames,
)]
pub enum BlendFactor {
    #[default]
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

/// Source and destination factors of the blending equation `src * sfactor + dst * dfactor`.
#[derive(Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct BlendFunc {
    /// Factor applied to the incoming fragment.
    pub sfactor: BlendFactor,
    /// Factor applied to the value already stored in the target.
    pub dfactor: BlendFactor,
}

impl BlendFunc {
    /// Creates blending function from the given factors.
    pub fn new(sfactor: BlendFactor, dfactor: BlendFactor) -> Self {
        Self { sfactor, dfactor }
    }

    /// Classic "over" blending used for transparent surfaces.
    pub fn alpha_blend() -> Self {
        Self::new(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha)
    }
}

impl Default for BlendFunc {
    fn default() -> Self {
        Self::new(BlendFactor::One, BlendFactor::Zero)
    }
}

/// Which faces should be culled.
#[derive(
    Copy,
    Clone,
    PartialOrd,
    PartialEq,
    Hash,
    Debug,
    Default,
    Serialize,
    Deserialize,
    Eq,
    AsRefStr,
    EnumString,
    VariantNames,
)]
pub enum CullFace {
    /// Back-facing triangles are culled.
    #[default]
    Back,
    /// Front-facing triangles are culled.
    Front,
}

/// Vertex winding that defines front-facing triangles.
#[derive(
    Copy,
    Clone,
    PartialOrd,
    PartialEq,
    Hash,
    Debug,
    Default,
    Serialize,
    Deserialize,
    Eq,
    AsRefStr,
    EnumString,
    VariantNames,
)]
pub enum WindingOrder {
    /// Counter-clockwise triangles are front-facing.
    #[default]
    CounterClockwise,
    /// Clockwise triangles are front-facing.
    Clockwise,
}

bitflags! {
    /// Set of frame buffer planes for blit operations.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct BufferMask: u32 {
        /// Color plane.
        const COLOR = 1;
        /// Depth plane.
        const DEPTH = 1 << 1;
        /// Stencil plane.
        const STENCIL = 1 << 2;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_state_enums_round_trip_names() {
        assert_eq!(CompareFunc::LessOrEqual.as_ref(), "LessOrEqual");
        assert_eq!(CullFace::from_str("Front"), Ok(CullFace::Front));
        assert_eq!(CompareFunc::default(), CompareFunc::LessOrEqual);
        assert_eq!(
            BlendFunc::alpha_blend(),
            BlendFunc::new(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha)
        );
    }
}

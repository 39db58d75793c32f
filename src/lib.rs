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

//! Dual-path real-time frame renderer.
//!
//! The renderer turns a set of [`renderer::drawable::Drawable`]s, a light registry and
//! a set of cameras into a shaded image, using either deferred shading (geometry buffer
//! plus a screen-space lighting composite) or forward shading (per-object lighting into an
//! off-screen target followed by a post-process pass). The strategy can be switched between
//! frames with [`renderer::Renderer::set_render_path`].
//!
//! All GPU work goes through the [`renderer::framework::server::GraphicsServer`] trait.
//! The crate ships two implementations: an OpenGL server built on `glow` (feature `opengl`,
//! enabled by default) and an in-memory [`renderer::framework::headless::HeadlessServer`]
//! that records every command and is used to validate pass ordering without a GPU.

#![warn(missing_docs)]
#![allow(clippy::too_many_arguments)]

pub mod core;
pub mod log;
pub mod renderer;
pub mod settings;

pub use crate::core::algebra;
pub use renderer::{RenderPath, Renderer};
pub use settings::RendererSettings;

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

//! Rectangle type used for viewports and blit regions.

use crate::core::algebra::{Scalar, Vector2};
use serde::{Deserialize, Serialize};
use std::ops::Add;

/// Axis-aligned rectangle defined by its top-left corner and size.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect<T: Scalar> {
    /// Position of the rectangle.
    pub position: Vector2<T>,
    /// Size of the rectangle, `x` is width and `y` is height.
    pub size: Vector2<T>,
}

impl<T> Rect<T>
where
    T: Scalar + Copy + Add<Output = T>,
{
    /// Creates a new rectangle from its position and size.
    pub fn new(x: T, y: T, w: T, h: T) -> Self {
        Self {
            position: Vector2::new(x, y),
            size: Vector2::new(w, h),
        }
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn x(&self) -> T {
        self.position.x
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn y(&self) -> T {
        self.position.y
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn w(&self) -> T {
        self.size.x
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn h(&self) -> T {
        self.size.y
    }

    /// Right edge of the rectangle (`x + w`).
    #[inline]
    pub fn right(&self) -> T {
        self.position.x + self.size.x
    }

    /// Bottom edge of the rectangle (`y + h`).
    #[inline]
    pub fn bottom(&self) -> T {
        self.position.y + self.size.y
    }
}

#[cfg(test)]
mod test {
    use super::Rect;

    #[test]
    fn test_rect_edges() {
        let rect = Rect::new(10, 20, 30, 40);
        assert_eq!(rect.right(), 40);
        assert_eq!(rect.bottom(), 60);
        assert_eq!(rect.w(), 30);
        assert_eq!(rect.h(), 40);
    }
}

use std::cell::UnsafeCell;

use cast::usize;
use itertools::Itertools;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub fn to_px(self) -> bmp::Pixel {
        bmp::Pixel {
            r: self.0,
            g: self.1,
            b: self.2,
        }
    }

    /// Quantizes an RGB triple from `[0, 1]`, saturating out-of-range values.
    pub fn from_unit(r: f32, g: f32, b: f32) -> Color {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Color(q(r), q(g), q(b))
    }
}

/// Pixel buffer shared across dispatcher threads.
///
/// [`Frame::set`] writes through a shared reference; the contract, matching
/// the tile dispatcher's, is that concurrent writers touch distinct pixels.
/// Reads go through `&mut self` and therefore cannot race with writers.
pub struct Frame<T> {
    width: u32,
    height: u32,
    buffer: Box<[UnsafeCell<T>]>,
}

unsafe impl<T: Send> Sync for Frame<T> {}

impl<T: Copy> Frame<T> {
    pub fn new(width: u32, height: u32, fill: T) -> Frame<T> {
        let buffer = (0..usize(width) * usize(height))
            .map(|_| UnsafeCell::new(fill))
            .collect();
        Frame {
            width,
            height,
            buffer,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        usize(y) * usize(self.width) + usize(x)
    }

    /// Stores one pixel. Distinct pixels may be written from distinct
    /// threads concurrently; writing one pixel from two threads is a data
    /// race and forbidden by the dispatcher contract.
    pub fn set(&self, x: u32, y: u32, value: T) {
        let cell = &self.buffer[self.index(x, y)];
        unsafe { *cell.get() = value }
    }

    pub fn get(&mut self, x: u32, y: u32) -> T {
        let i = self.index(x, y);
        *self.buffer[i].get_mut()
    }

    /// Row-major sweep over `((x, y), value)` pairs.
    fn pixels(&mut self) -> impl Iterator<Item = ((u32, u32), T)> + '_ {
        let (w, h) = (self.width, self.height);
        (0..h)
            .cartesian_product(0..w)
            .zip(self.buffer.iter_mut())
            .map(|((y, x), cell)| ((x, y), *cell.get_mut()))
    }
}

pub trait ToBmp {
    fn to_bmp(&mut self) -> bmp::Image;
}

impl ToBmp for Frame<Color> {
    fn to_bmp(&mut self) -> bmp::Image {
        let mut img = bmp::Image::new(self.width, self.height);
        for ((x, y), color) in self.pixels() {
            img.set_pixel(x, y, color.to_px());
        }
        img
    }
}

/// Depth render: nearer is brighter, misses (infinite depth) stay black.
pub struct Depthmap(pub Frame<f32>);

impl ToBmp for Depthmap {
    fn to_bmp(&mut self) -> bmp::Image {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for (_, depth) in self.0.pixels() {
            if depth.is_finite() {
                min = min.min(depth);
                max = max.max(depth);
            }
        }
        let mut img = bmp::Image::new(self.0.width, self.0.height);
        for ((x, y), depth) in self.0.pixels() {
            let intensity = if !depth.is_finite() {
                0.0
            } else if max > min {
                1.0 - (depth - min) / (max - min)
            } else {
                1.0
            };
            img.set_pixel(x, y, Color::from_unit(intensity, intensity, intensity).to_px());
        }
        img
    }
}

/// Heat render of per-pixel traversal step counts, normalized to the
/// frame's observed range and mapped onto the red channel.
pub struct Heatmap(pub Frame<u32>);

impl ToBmp for Heatmap {
    fn to_bmp(&mut self) -> bmp::Image {
        let mut min = u32::MAX;
        let mut max = 0;
        for (_, heat) in self.0.pixels() {
            min = min.min(heat);
            max = max.max(heat);
        }
        let mut img = bmp::Image::new(self.0.width, self.0.height);
        for ((x, y), heat) in self.0.pixels() {
            let intensity = if max > min {
                (heat - min) as f32 / (max - min) as f32
            } else {
                0.0
            };
            img.set_pixel(x, y, Color::from_unit(intensity, 0.0, 0.0).to_px());
        }
        img
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_round_trip() {
        let mut frame = Frame::new(4, 3, 0u32);
        frame.set(0, 0, 1);
        frame.set(3, 2, 99);
        assert_eq!(frame.get(0, 0), 1);
        assert_eq!(frame.get(3, 2), 99);
        assert_eq!(frame.get(1, 1), 0);
    }

    #[test]
    fn pixels_sweep_row_major() {
        let mut frame = Frame::new(2, 2, Color(0, 0, 0));
        frame.set(1, 0, Color(1, 0, 0));
        frame.set(0, 1, Color(2, 0, 0));
        let order: Vec<_> = frame.pixels().collect();
        assert_eq!(order[0], ((0, 0), Color(0, 0, 0)));
        assert_eq!(order[1], ((1, 0), Color(1, 0, 0)));
        assert_eq!(order[2], ((0, 1), Color(2, 0, 0)));
        assert_eq!(order[3], ((1, 1), Color(0, 0, 0)));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn out_of_bounds_write_panics() {
        let frame = Frame::new(2, 2, 0u32);
        frame.set(2, 0, 1);
    }
}

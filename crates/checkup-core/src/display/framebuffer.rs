//! Packed monochrome framebuffer with dirty-region tracking.
//!
//! Rendering targets this RAM buffer instead of the panel. On commit only the
//! bounding rectangle of pixels that changed since the previous flush is sent
//! to the panel, in a single `fill_contiguous` call.

use core::convert::Infallible;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::trace;

pub const WIDTH: usize = 128;
pub const HEIGHT: usize = 128;

/// One bit per pixel, rows packed MSB first.
const BYTES: usize = WIDTH * HEIGHT / 8;

/// Bounding box of pixels that have changed since the last flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DirtyRect {
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

impl DirtyRect {
    fn from_point(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn expand(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn area(&self) -> Rectangle {
        Rectangle::new(
            Point::new(self.min_x as i32, self.min_y as i32),
            Size::new(
                (self.max_x - self.min_x + 1) as u32,
                (self.max_y - self.min_y + 1) as u32,
            ),
        )
    }
}

/// 128x128 1-bit framebuffer implementing `DrawTarget<Color = BinaryColor>`.
pub struct FrameBuffer {
    bits: [u8; BYTES],
    dirty: Option<DirtyRect>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// All pixels off, nothing dirty.
    pub const fn new() -> Self {
        Self {
            bits: [0; BYTES],
            dirty: None,
        }
    }

    #[inline]
    fn locate(x: usize, y: usize) -> (usize, u8) {
        let index = y * WIDTH + x;
        (index / 8, 0x80 >> (index % 8))
    }

    /// Color of a pixel; off-screen coordinates read as `Off`.
    pub fn pixel(&self, point: Point) -> BinaryColor {
        if point.x < 0 || point.y < 0 || point.x as usize >= WIDTH || point.y as usize >= HEIGHT {
            return BinaryColor::Off;
        }
        let (byte, mask) = Self::locate(point.x as usize, point.y as usize);
        BinaryColor::from(self.bits[byte] & mask != 0)
    }

    /// Whether anything changed since the last flush.
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, color: BinaryColor) {
        let (byte, mask) = Self::locate(x, y);
        let old = self.bits[byte];
        let new = if color.is_on() { old | mask } else { old & !mask };
        if new != old {
            self.bits[byte] = new;
            match &mut self.dirty {
                Some(rect) => rect.expand(x, y),
                None => self.dirty = Some(DirtyRect::from_point(x, y)),
            }
        }
    }

    /// Flush the dirty region to the panel, then reset the dirty state.
    ///
    /// If nothing changed this is a no-op. On failure the region stays dirty
    /// so the next flush retries it.
    pub fn flush<D>(&mut self, panel: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let Some(rect) = self.dirty else {
            return Ok(());
        };

        let area = rect.area();
        trace!(
            "Flushing {}x{} region at ({}, {})",
            area.size.width, area.size.height, rect.min_x, rect.min_y
        );

        let bits = &self.bits;
        let colors = area.points().map(|p| {
            let index = p.y as usize * WIDTH + p.x as usize;
            BinaryColor::from(bits[index / 8] & (0x80 >> (index % 8)) != 0)
        });
        panel.fill_contiguous(&area, colors)?;

        self.dirty = None;
        Ok(())
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(WIDTH as u32, HEIGHT as u32)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            if coord.x >= 0
                && coord.y >= 0
                && (coord.x as usize) < WIDTH
                && (coord.y as usize) < HEIGHT
            {
                self.set_pixel(coord.x as usize, coord.y as usize, color);
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else {
            return Ok(());
        };

        for y in area.top_left.y..=bottom_right.y {
            for x in area.top_left.x..=bottom_right.x {
                self.set_pixel(x as usize, y as usize, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    /// Panel recording every flushed area and its pixels.
    #[derive(Default)]
    struct Capture {
        areas: Vec<Rectangle>,
        lit: usize,
    }

    impl OriginDimensions for Capture {
        fn size(&self) -> Size {
            Size::new(WIDTH as u32, HEIGHT as u32)
        }
    }

    impl DrawTarget for Capture {
        type Color = BinaryColor;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            self.lit += pixels.into_iter().filter(|p| p.1.is_on()).count();
            Ok(())
        }

        fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Self::Color>,
        {
            self.areas.push(*area);
            self.lit += colors.into_iter().filter(|c| c.is_on()).count();
            Ok(())
        }
    }

    #[test]
    fn test_untouched_buffer_flushes_nothing() {
        let mut frame = FrameBuffer::new();
        let mut panel = Capture::default();

        frame.flush(&mut panel).unwrap();

        assert!(panel.areas.is_empty());
    }

    #[test]
    fn test_flush_sends_only_dirty_bounding_box() {
        let mut frame = FrameBuffer::new();
        let mut panel = Capture::default();

        Pixel(Point::new(10, 20), BinaryColor::On).draw(&mut frame).unwrap();
        Pixel(Point::new(13, 22), BinaryColor::On).draw(&mut frame).unwrap();
        frame.flush(&mut panel).unwrap();

        assert_eq!(
            panel.areas,
            [Rectangle::new(Point::new(10, 20), Size::new(4, 3))]
        );
        assert_eq!(panel.lit, 2);
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_redrawing_same_color_is_not_dirty() {
        let mut frame = FrameBuffer::new();

        Pixel(Point::new(5, 5), BinaryColor::Off).draw(&mut frame).unwrap();

        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_pixels_pack_one_bit_each() {
        let mut frame = FrameBuffer::new();

        let straddle = Rectangle::new(Point::new(7, 0), Size::new(2, 1));
        frame.fill_solid(&straddle, BinaryColor::On).unwrap();

        assert_eq!(frame.bits[0], 0x01);
        assert_eq!(frame.bits[1], 0x80);
        assert_eq!(frame.pixel(Point::new(8, 0)), BinaryColor::On);
        assert_eq!(frame.pixel(Point::new(9, 0)), BinaryColor::Off);
    }

    #[test]
    fn test_drawing_off_screen_is_clipped() {
        let mut frame = FrameBuffer::new();

        Pixel(Point::new(-1, 3), BinaryColor::On).draw(&mut frame).unwrap();
        Pixel(Point::new(128, 3), BinaryColor::On).draw(&mut frame).unwrap();
        let overhang = Rectangle::new(Point::new(120, 120), Size::new(20, 20));
        frame.fill_solid(&overhang, BinaryColor::On).unwrap();

        assert_eq!(
            frame.dirty.map(|r| r.area()),
            Some(Rectangle::new(Point::new(120, 120), Size::new(8, 8)))
        );
    }
}

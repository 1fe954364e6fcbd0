//! Display sink
//!
//! [`DisplaySink`] is the small set of text primitives the render task needs.
//! [`LcdSink`] implements it for any monochrome `embedded-graphics` panel by
//! drawing into a [`FrameBuffer`] and flushing the changed region on commit.

mod framebuffer;

pub use framebuffer::{FrameBuffer, HEIGHT, WIDTH};

use core::fmt::Write as _;
use embedded_graphics::mono_font::ascii::{FONT_6X12, FONT_10X20};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use heapless::String;
use log::error;
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    #[error("Panel is not ready")]
    NotReady,
    #[error("Panel flush failed")]
    Flush,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Font {
    #[default]
    Regular,
    Large,
}

impl Font {
    pub fn mono(self) -> &'static MonoFont<'static> {
        match self {
            Font::Regular => &FONT_6X12,
            Font::Large => &FONT_10X20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFormat {
    /// Fixed-point with the given number of decimals.
    Fixed(u8),
}

/// Longest formatted number; longer output is truncated.
pub const NUMBER_CAPACITY: usize = 16;

/// Format `value` for display. Non-finite values print as `nan`, `inf` and
/// `-inf`, the way C's `printf` does.
pub fn format_number(format: NumberFormat, value: f32) -> String<NUMBER_CAPACITY> {
    let mut text = String::new();
    let NumberFormat::Fixed(decimals) = format;
    // Overflow only truncates the text.
    if value.is_nan() {
        let _ = text.push_str("nan");
    } else if value.is_infinite() {
        let _ = text.push_str(if value > 0.0 { "inf" } else { "-inf" });
    } else {
        let _ = write!(text, "{:.*}", decimals as usize, value);
    }
    text
}

/// Text rendering surface used by the render task.
pub trait DisplaySink {
    /// Whether the panel can accept a new frame.
    fn is_ready(&self) -> bool;

    fn clear(&mut self);

    fn set_font(&mut self, font: Font);

    /// Draw `text` with its top-left corner at `(x, y)` in the current font.
    fn draw_text(&mut self, x: i32, y: i32, text: &str);

    fn draw_formatted_number(&mut self, x: i32, y: i32, format: NumberFormat, value: f32) {
        let text = format_number(format, value);
        self.draw_text(x, y, &text);
    }

    /// Push the frame to the panel.
    fn commit(&mut self) -> Result<(), DisplayError>;
}

/// A monochrome panel the framebuffer can be flushed to.
pub trait Panel: DrawTarget<Color = BinaryColor> {
    /// `false` while a previous transfer is still in flight.
    fn is_ready(&self) -> bool {
        true
    }
}

/// [`DisplaySink`] over a packed framebuffer and a [`Panel`].
pub struct LcdSink<P: Panel> {
    panel: P,
    frame: FrameBuffer,
    font: Font,
}

impl<P: Panel> LcdSink<P> {
    pub fn new(panel: P) -> Self {
        Self {
            panel,
            frame: FrameBuffer::new(),
            font: Font::Regular,
        }
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut P {
        &mut self.panel
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }
}

impl<P: Panel> DisplaySink for LcdSink<P> {
    fn is_ready(&self) -> bool {
        self.panel.is_ready()
    }

    fn clear(&mut self) {
        let Ok(()) = self.frame.clear(BinaryColor::Off);
    }

    fn set_font(&mut self, font: Font) {
        self.font = font;
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str) {
        let style = MonoTextStyle::new(self.font.mono(), BinaryColor::On);
        let Ok(_) = Text::with_baseline(text, Point::new(x, y), style, Baseline::Top)
            .draw(&mut self.frame);
    }

    fn commit(&mut self) -> Result<(), DisplayError> {
        if !self.panel.is_ready() {
            return Err(DisplayError::NotReady);
        }

        self.frame.flush(&mut self.panel).map_err(|_| {
            error!("Panel rejected frame flush");
            DisplayError::Flush
        })
    }
}

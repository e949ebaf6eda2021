//! PNG rendering of evidence with an embedded 8x8 bitmap font.
//!
//! The image is a title band above a bordered, light-grey body band holding
//! the payload text. Error evidence is drawn in red.

use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use unicode_width::UnicodeWidthChar;

use super::{BackendError, RenderBackend};

const WIDTH: u32 = 900;
const MARGIN: u32 = 20;
const GLYPH: u32 = 8;

const TITLE_SCALE: u32 = 2;
const TITLE_LINE: u32 = GLYPH * TITLE_SCALE + 4;
const TITLE_MAX_HEIGHT: u32 = 80;
const TITLE_GAP: u32 = 20;

const BODY_SCALE: u32 = 1;
const BODY_LINE: u32 = GLYPH * BODY_SCALE + 4;
const BODY_PADDING: u32 = 10;
const BODY_MAX_HEIGHT: u32 = 1024;
const TAB_WIDTH: usize = 4;

type Rgb = [u8; 3];

const WHITE: Rgb = [0xFF, 0xFF, 0xFF];
const BLACK: Rgb = [0x00, 0x00, 0x00];
const RED: Rgb = [0xFF, 0x00, 0x00];
const BODY_BACKGROUND: Rgb = [0xF0, 0xF0, 0xF0];

#[derive(Debug, Default, Clone, Copy)]
pub struct BitmapRenderer;

impl RenderBackend for BitmapRenderer {
    fn render(&self, title: &str, body: &str, is_error: bool) -> Result<Vec<u8>, BackendError> {
        let ink = if is_error { RED } else { BLACK };
        let inner_width = WIDTH - 2 * MARGIN;

        let title_cols = (inner_width / (GLYPH * TITLE_SCALE)) as usize;
        let mut title_lines = wrap(title, title_cols);
        title_lines.truncate((TITLE_MAX_HEIGHT / TITLE_LINE).max(1) as usize);

        let body_cols = ((inner_width - 2 * BODY_PADDING - 2) / (GLYPH * BODY_SCALE)) as usize;
        let mut body_lines = wrap(body, body_cols);
        let max_body_lines = ((BODY_MAX_HEIGHT - 2 * BODY_PADDING) / BODY_LINE) as usize;
        if body_lines.len() > max_body_lines {
            body_lines.truncate(max_body_lines - 1);
            body_lines.push("...".to_string());
        }

        let title_height = title_lines.len() as u32 * TITLE_LINE;
        let body_height = body_lines.len().max(1) as u32 * BODY_LINE + 2 * BODY_PADDING;
        let height = MARGIN + title_height + TITLE_GAP + body_height + MARGIN;

        let mut canvas = Canvas::new(WIDTH, height, WHITE);

        let mut y = MARGIN;
        for line in &title_lines {
            canvas.draw_text(MARGIN, y, line, TITLE_SCALE, ink);
            y += TITLE_LINE;
        }
        y += TITLE_GAP;

        canvas.fill_rect(MARGIN, y, inner_width, body_height, BLACK);
        canvas.fill_rect(MARGIN + 1, y + 1, inner_width - 2, body_height - 2, BODY_BACKGROUND);
        let mut line_y = y + BODY_PADDING;
        for line in &body_lines {
            canvas.draw_text(MARGIN + 1 + BODY_PADDING, line_y, line, BODY_SCALE, ink);
            line_y += BODY_LINE;
        }

        canvas.encode_png()
    }
}

/// Splits `text` into lines of at most `cols` glyphs. Tabs are expanded and
/// control or zero-width characters dropped.
fn wrap(text: &str, cols: usize) -> Vec<String> {
    let cols = cols.max(1);
    let mut out = Vec::new();
    for raw in text.lines() {
        let mut line = String::new();
        let mut len = 0;
        for c in raw.chars() {
            let (c, repeat) = if c == '\t' { (' ', TAB_WIDTH) } else { (c, 1) };
            for c in std::iter::repeat(c).take(repeat) {
                if c.is_control() || c.width().unwrap_or(0) == 0 {
                    continue;
                }
                if len == cols {
                    out.push(std::mem::take(&mut line));
                    len = 0;
                }
                line.push(c);
                len += 1;
            }
        }
        out.push(line);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    fn new(width: u32, height: u32, background: Rgb) -> Self {
        let pixels = background
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    fn put(&mut self, x: u32, y: u32, color: Rgb) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        self.pixels[idx..idx + 3].copy_from_slice(&color);
    }

    fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgb) {
        for yy in y..y + h {
            for xx in x..x + w {
                self.put(xx, yy, color);
            }
        }
    }

    fn draw_text(&mut self, x: u32, y: u32, text: &str, scale: u32, color: Rgb) {
        for (i, c) in text.chars().enumerate() {
            let gx = x + i as u32 * GLYPH * scale;
            for (row, bits) in glyph(c).iter().enumerate() {
                for col in 0..GLYPH {
                    if bits & (1u8 << col) != 0 {
                        self.fill_rect(
                            gx + col * scale,
                            y + row as u32 * scale,
                            scale,
                            scale,
                            color,
                        );
                    }
                }
            }
        }
    }

    fn encode_png(&self) -> Result<Vec<u8>, BackendError> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_compression(png::Compression::Best);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.pixels)?;
            writer.finish()?;
        }
        Ok(out)
    }
}

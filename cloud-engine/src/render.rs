//! Drawing a laid-out cloud onto a template image.

use crate::fonts::FontSet;
use crate::layout::{Orientation, PlacedWord};
use dogecloud_core::{CoreError, RenderError};
use std::fmt::Write as _;
use std::path::Path;
use tiny_skia::{ColorU8, Pixmap};
use tracing::debug;

/// Saturation and value of every word's fill colour; the hue is random.
const FILL_SATURATION: f32 = 0.9;
const FILL_VALUE: f32 = 0.9;

pub struct Renderer<'f> {
    fonts: &'f FontSet,
    /// Outline width as a fraction of the font size.
    stroke_ratio: f32,
}

impl<'f> Renderer<'f> {
    pub fn new(fonts: &'f FontSet, stroke_ratio: f32) -> Self {
        Self {
            fonts,
            stroke_ratio,
        }
    }

    /// Decode a template into a premultiplied pixmap.
    pub fn load_template(path: &Path) -> Result<Pixmap, RenderError> {
        let decoded = image::open(path).map_err(|e| RenderError::TemplateLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        let mut pixmap = Pixmap::new(width, height)
            .ok_or(RenderError::CanvasAlloc { width, height })?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
        }
        Ok(pixmap)
    }

    /// One SVG document holding every word, in placement order.
    pub fn compose_svg(
        &self,
        width: u32,
        height: u32,
        words: &[PlacedWord],
        rng: &mut fastrand::Rng,
    ) -> String {
        let family = self.fonts.family_attribute();
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = width,
            h = height,
        );

        for word in words {
            let t = word.text_transform();
            let (r, g, b) = hsv_to_rgb(rng.f32(), FILL_SATURATION, FILL_VALUE);
            let rotate = match word.orientation {
                Orientation::Horizontal => String::new(),
                Orientation::Vertical => format!(" rotate({})", t.rotate_degrees),
            };
            let _ = write!(
                svg,
                r##"<text transform="translate({tx} {ty}){rotate}" x="0" y="0" font-size="{size}" font-family="{family}" fill="#{r:02x}{g:02x}{b:02x}" stroke="#000000" stroke-width="{stroke}" stroke-linejoin="round">{text}</text>"##,
                tx = t.translate_x,
                ty = t.translate_y,
                size = word.font_size,
                stroke = word.font_size * self.stroke_ratio,
                text = htmlize::escape_text(word.display_text.as_str()),
            );
        }
        svg.push_str("</svg>");
        svg
    }

    /// Draw `words` over `canvas`. The canvas keeps its dimensions.
    pub fn render(
        &self,
        mut canvas: Pixmap,
        words: &[PlacedWord],
        rng: &mut fastrand::Rng,
    ) -> Result<Pixmap, RenderError> {
        let svg = self.compose_svg(canvas.width(), canvas.height(), words, rng);
        let tree = usvg::Tree::from_str(&svg, &self.fonts.svg_options()).map_err(|e| {
            RenderError::SvgParse {
                reason: e.to_string(),
            }
        })?;
        resvg::render(&tree, tiny_skia::Transform::identity(), &mut canvas.as_mut());
        debug!("Rendered {} words onto {}x{}", words.len(), canvas.width(), canvas.height());
        Ok(canvas)
    }

    /// Render onto the template at `template` and write a PNG to `output`.
    pub fn render_to_file(
        &self,
        template: &Path,
        words: &[PlacedWord],
        rng: &mut fastrand::Rng,
        output: &Path,
    ) -> Result<(), CoreError> {
        let canvas = Self::load_template(template)?;
        let canvas = self.render(canvas, words, rng)?;
        let png = canvas.encode_png().map_err(|e| RenderError::PngEncode {
            reason: e.to_string(),
        })?;
        std::fs::write(output, png)?;
        Ok(())
    }
}

/// HSV in `[0, 1]` to 8-bit RGB.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let to_u8 = |x: f32| (x.clamp(0.0, 1.0) * 255.0).round() as u8;
    if s <= 0.0 {
        return (to_u8(v), to_u8(v), to_u8(v));
    }
    let h6 = (h.rem_euclid(1.0)) * 6.0;
    let sector = h6.floor();
    let f = h6 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match sector as u32 % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    (to_u8(r), to_u8(g), to_u8(b))
}

//! Turns comment text into a captioned word-cloud image.
//!
//! The stages are independent and run in this order: [`sanitize`] the comment
//! markup, [`keywords`] ranks terms, [`transform`] restyles them, [`layout`]
//! places them on the canvas, and [`render`] draws the result over a template.

pub mod fonts;
pub mod keywords;
pub mod layout;
pub mod mask;
pub mod render;
pub mod sanitize;
pub mod transform;

pub use fonts::{FontSet, SvgGlyphMeasure};
pub use keywords::{extract_keywords, ExtractionOptions, StopwordSet};
pub use layout::{
    GlyphBox, GlyphMeasure, Layout, LayoutEngine, LayoutOptions, Orientation, PlacedWord,
};
pub use mask::{OccupancyMask, Region};
pub use render::Renderer;
pub use sanitize::{clean_comment, strip_markup, CommentText, MarkupVisitor};
pub use transform::Dogeifier;

use dogecloud_core::CloudSettings;

pub fn extraction_options(settings: &CloudSettings) -> ExtractionOptions {
    ExtractionOptions {
        max_words: settings.max_words,
        min_word_length: settings.min_word_length,
        ..Default::default()
    }
}

/// Layout parameters for a `width` x `height` template.
pub fn layout_options(settings: &CloudSettings, width: u32, height: u32, seed: u64) -> LayoutOptions {
    LayoutOptions {
        prefer_horizontal: settings.prefer_horizontal,
        relative_scaling: settings.relative_scaling,
        min_font_size: settings.min_font_size,
        stroke_ratio: settings.font_stroke,
        seed,
        ..LayoutOptions::for_canvas(width, height, settings.initial_font_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_options_follow_settings() {
        let settings = CloudSettings::default();
        let options = layout_options(&settings, 1000, 500, 9);
        assert_eq!(options.initial_font_size, 75.0);
        assert_eq!(options.prefer_horizontal, settings.prefer_horizontal);
        assert_eq!(options.stroke_ratio, settings.font_stroke);
        assert_eq!(options.seed, 9);
        assert_eq!((options.width, options.height), (1000, 500));
    }
}

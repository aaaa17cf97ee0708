//! Font discovery and text measurement through usvg.

use crate::layout::{GlyphBox, GlyphMeasure};
use dogecloud_core::RenderError;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// The font database used both to measure and to draw words.
#[derive(Clone)]
pub struct FontSet {
    db: Arc<usvg::fontdb::Database>,
    family: String,
}

impl FontSet {
    /// System fonts plus `font_path`, if given. A configured font that fails to load is an error.
    pub fn load(family: &str, font_path: Option<&Path>) -> Result<Self, RenderError> {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();

        if let Some(path) = font_path {
            db.load_font_file(path).map_err(|e| RenderError::FontLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        }

        let faces = db.faces().count();
        if faces == 0 {
            warn!("No font faces available; words will have no size and be omitted");
        } else {
            info!("Font database ready with {} faces, family '{}'", faces, family);
        }

        Ok(Self::from_database(db, family))
    }

    pub fn from_database(db: usvg::fontdb::Database, family: &str) -> Self {
        Self {
            db: Arc::new(db),
            family: family.to_string(),
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn is_empty(&self) -> bool {
        self.db.faces().next().is_none()
    }

    /// Value for an SVG `font-family` attribute, already attribute-escaped.
    pub(crate) fn family_attribute(&self) -> String {
        let family = format!("'{}', sans-serif", self.family.replace('\'', ""));
        htmlize::escape_attribute(family.as_str()).into_owned()
    }

    pub(crate) fn svg_options(&self) -> usvg::Options<'static> {
        usvg::Options {
            fontdb: self.db.clone(),
            font_family: self.family.clone(),
            font_resolver: fallback_font_resolver(),
            ..Default::default()
        }
    }

    pub fn measure(&self) -> SvgGlyphMeasure<'_> {
        SvgGlyphMeasure { fonts: self }
    }
}

/// Resolves the requested family, then generic families, then any face at all.
fn fallback_font_resolver() -> usvg::FontResolver<'static> {
    use usvg::FontResolver;

    FontResolver {
        select_font: Box::new(|font, fontdb| {
            let mut families = Vec::<usvg::fontdb::Family<'_>>::new();
            for family in font.families() {
                families.push(match family {
                    usvg::FontFamily::Serif => usvg::fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => usvg::fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => usvg::fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => usvg::fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => usvg::fontdb::Family::Monospace,
                    usvg::FontFamily::Named(s) => usvg::fontdb::Family::Name(s),
                });
            }
            families.push(usvg::fontdb::Family::SansSerif);
            families.push(usvg::fontdb::Family::Serif);

            let style = match font.style() {
                usvg::FontStyle::Normal => usvg::fontdb::Style::Normal,
                usvg::FontStyle::Italic => usvg::fontdb::Style::Italic,
                usvg::FontStyle::Oblique => usvg::fontdb::Style::Oblique,
            };

            let query = usvg::fontdb::Query {
                families: &families,
                weight: usvg::fontdb::Weight(font.weight()),
                stretch: usvg::fontdb::Stretch::Normal,
                style,
            };

            fontdb
                .query(&query)
                .or_else(|| fontdb.faces().next().map(|f| f.id))
        }),
        select_fallback: FontResolver::default_fallback_selector(),
    }
}

/// Measures text by laying it out as a one-element SVG document.
pub struct SvgGlyphMeasure<'f> {
    fonts: &'f FontSet,
}

impl GlyphMeasure for SvgGlyphMeasure<'_> {
    fn measure(&self, text: &str, font_size: f32) -> Option<GlyphBox> {
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="1" height="1"><text x="0" y="0" font-size="{}" font-family="{}">{}</text></svg>"#,
            font_size,
            self.fonts.family_attribute(),
            htmlize::escape_text(text),
        );
        let tree = usvg::Tree::from_str(&svg, &self.fonts.svg_options()).ok()?;
        if !tree.root().has_children() {
            return None;
        }

        let bbox = tree.root().bounding_box();
        if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            return None;
        }
        Some(GlyphBox {
            left: bbox.x(),
            top: bbox.y(),
            width: bbox.width(),
            height: bbox.height(),
        })
    }
}

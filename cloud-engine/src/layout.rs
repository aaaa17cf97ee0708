//! Word placement on a fixed-size canvas.
//!
//! Words are taken in rank order. Each one gets a starting font size derived
//! from its weight relative to the previous word, then the engine looks for a
//! free spot: spiralling out from the canvas centre, then random samples. If no
//! spot exists in either orientation the font shrinks and the search repeats,
//! down to the minimum size, after which the word is omitted. Font sizes never
//! grow along the sequence and placed words never overlap.

use crate::mask::{OccupancyMask, Region};
use dogecloud_core::StyledKeyword;
use std::f32::consts::TAU;
use tracing::debug;

/// Ink bounds of a horizontally set string, relative to its pen origin on the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Text measurement the layout engine depends on.
pub trait GlyphMeasure {
    /// `None` when the text has no visible ink at this size.
    fn measure(&self, text: &str, font_size: f32) -> Option<GlyphBox>;
}

impl<M: GlyphMeasure + ?Sized> GlyphMeasure for &M {
    fn measure(&self, text: &str, font_size: f32) -> Option<GlyphBox> {
        (**self).measure(text, font_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    /// Rotated 90 degrees counter-clockwise, read bottom to top.
    Vertical,
}

impl Orientation {
    pub fn other(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

/// Where to draw a word: translate the pen origin, then rotate about it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextTransform {
    pub translate_x: f32,
    pub translate_y: f32,
    pub rotate_degrees: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedWord {
    pub display_text: String,
    pub weight: u32,
    pub font_size: f32,
    pub orientation: Orientation,
    /// Area reserved on the canvas, padding included.
    pub region: Region,
    pub padding: u32,
    pub glyph: GlyphBox,
}

impl PlacedWord {
    /// Top-left corner of the reserved area.
    pub fn anchor(&self) -> (u32, u32) {
        (self.region.x, self.region.y)
    }

    pub fn text_transform(&self) -> TextTransform {
        let ax = (self.region.x + self.padding) as f32;
        let ay = (self.region.y + self.padding) as f32;
        match self.orientation {
            Orientation::Horizontal => TextTransform {
                translate_x: ax - self.glyph.left,
                translate_y: ay - self.glyph.top,
                rotate_degrees: 0.0,
            },
            Orientation::Vertical => TextTransform {
                translate_x: ax - self.glyph.top,
                translate_y: ay + self.glyph.left + self.glyph.width,
                rotate_degrees: -90.0,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutOptions {
    pub width: u32,
    pub height: u32,
    /// Font size of the first word, in pixels.
    pub initial_font_size: f32,
    /// Probability of trying horizontal first. 0.0 and 1.0 pin the orientation.
    pub prefer_horizontal: f32,
    /// How strongly weight differences show in font sizes, in `[0, 1]`.
    pub relative_scaling: f32,
    pub min_font_size: f32,
    pub shrink_factor: f32,
    pub max_shrink_steps: u32,
    /// Spiral samples per size and orientation.
    pub max_position_samples: u32,
    /// Random samples after the spiral gives up.
    pub random_samples: u32,
    pub margin: u32,
    /// Extra padding per word as a fraction of its font size, to fit an outline.
    pub stroke_ratio: f32,
    pub seed: u64,
}

impl LayoutOptions {
    /// Defaults for a canvas, with the first word at `initial_ratio` of its height.
    pub fn for_canvas(width: u32, height: u32, initial_ratio: f32) -> Self {
        Self {
            width,
            height,
            initial_font_size: (height as f32 * initial_ratio).floor().max(1.0),
            prefer_horizontal: 0.9,
            relative_scaling: 0.5,
            min_font_size: 4.0,
            shrink_factor: 0.9,
            max_shrink_steps: 60,
            max_position_samples: 20_000,
            random_samples: 500,
            margin: 2,
            stroke_ratio: 0.0,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub words: Vec<PlacedWord>,
    pub omitted: Vec<StyledKeyword>,
}

pub struct LayoutEngine<M> {
    measure: M,
    options: LayoutOptions,
}

impl<M: GlyphMeasure> LayoutEngine<M> {
    pub fn new(measure: M, options: LayoutOptions) -> Self {
        Self { measure, options }
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Place `words`, which must be ranked by weight, highest first.
    pub fn layout(&self, words: &[StyledKeyword]) -> Layout {
        let opts = &self.options;
        let mut rng = fastrand::Rng::with_seed(opts.seed);
        let mut mask = OccupancyMask::new(opts.width, opts.height);
        let mut layout = Layout::default();
        let mut last_size = opts.initial_font_size;
        let mut last_weight: Option<u32> = None;

        for word in words {
            let start = match last_weight {
                None => opts.initial_font_size,
                Some(previous) => {
                    let ratio = if previous == 0 {
                        1.0
                    } else {
                        (word.weight as f32 / previous as f32).min(1.0)
                    };
                    let rs = opts.relative_scaling.clamp(0.0, 1.0);
                    ((rs * ratio + (1.0 - rs)) * last_size)
                        .round()
                        .min(last_size)
                }
            };
            last_weight = Some(word.weight);

            match self.place(word, start, &mut mask, &mut rng) {
                Some(placed) => {
                    last_size = placed.font_size;
                    layout.words.push(placed);
                }
                None => {
                    debug!("No room for '{}', omitting it", word.display_text);
                    layout.omitted.push(word.clone());
                }
            }
        }

        debug!(
            "Placed {} words, omitted {}",
            layout.words.len(),
            layout.omitted.len()
        );
        layout
    }

    fn place(
        &self,
        word: &StyledKeyword,
        start_size: f32,
        mask: &mut OccupancyMask,
        rng: &mut fastrand::Rng,
    ) -> Option<PlacedWord> {
        let opts = &self.options;
        let mut size = start_size;

        for _ in 0..opts.max_shrink_steps {
            if size < opts.min_font_size {
                break;
            }

            let first = if rng.f32() < opts.prefer_horizontal {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            let pinned = opts.prefer_horizontal <= 0.0 || opts.prefer_horizontal >= 1.0;
            let candidates: &[Orientation] = if pinned {
                &[first]
            } else {
                &[first, first.other()]
            };

            for &orientation in candidates {
                if let Some(placed) = self.try_place(word, size, orientation, mask, rng) {
                    mask.occupy(placed.region);
                    return Some(placed);
                }
            }

            size = shrink(size, opts.shrink_factor);
        }
        None
    }

    fn try_place(
        &self,
        word: &StyledKeyword,
        size: f32,
        orientation: Orientation,
        mask: &OccupancyMask,
        rng: &mut fastrand::Rng,
    ) -> Option<PlacedWord> {
        let opts = &self.options;
        let glyph = self.measure.measure(&word.display_text, size)?;
        if !(glyph.width > 0.0 && glyph.height > 0.0) {
            return None;
        }

        let padding = opts.margin + (size * opts.stroke_ratio).ceil().max(0.0) as u32;
        let (w, h) = match orientation {
            Orientation::Horizontal => (glyph.width, glyph.height),
            Orientation::Vertical => (glyph.height, glyph.width),
        };
        let width = w.ceil() as u32 + 2 * padding;
        let height = h.ceil() as u32 + 2 * padding;
        if width > opts.width || height > opts.height {
            return None;
        }

        let (x, y) = find_position(mask, width, height, opts, rng)?;
        Some(PlacedWord {
            display_text: word.display_text.clone(),
            weight: word.weight,
            font_size: size,
            orientation,
            region: Region {
                x,
                y,
                width,
                height,
            },
            padding,
            glyph,
        })
    }
}

fn shrink(size: f32, factor: f32) -> f32 {
    let next = (size * factor).floor();
    if next >= size {
        size - 1.0
    } else {
        next
    }
}

/// Archimedean spiral from the centre with a random starting direction, then
/// uniform random samples.
fn find_position(
    mask: &OccupancyMask,
    width: u32,
    height: u32,
    opts: &LayoutOptions,
    rng: &mut fastrand::Rng,
) -> Option<(u32, u32)> {
    let max_x = opts.width - width;
    let max_y = opts.height - height;
    let cx = max_x as f32 / 2.0;
    let cy = max_y as f32 / 2.0;
    let reach = (cx * cx + cy * cy).sqrt();
    let spacing = (width.min(height) as f32 / 4.0).max(1.0);

    let mut theta = rng.f32() * TAU;
    let mut radius = 0.0f32;
    let mut samples = 0;
    while radius <= reach + spacing && samples < opts.max_position_samples {
        let x = cx + radius * theta.cos();
        let y = cy + radius * theta.sin();
        if x >= 0.0 && y >= 0.0 && x <= max_x as f32 && y <= max_y as f32 {
            let region = Region {
                x: x.round() as u32,
                y: y.round() as u32,
                width,
                height,
            };
            if mask.is_free(region) {
                return Some((region.x, region.y));
            }
        }
        samples += 1;

        let step = spacing / radius.max(spacing);
        theta += step;
        radius += spacing * step / TAU;
    }

    for _ in 0..opts.random_samples {
        let region = Region {
            x: rng.u32(0..=max_x),
            y: rng.u32(0..=max_y),
            width,
            height,
        };
        if mask.is_free(region) {
            return Some((region.x, region.y));
        }
    }
    None
}

use dogecloud_core::{CoreError, RenderError};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A background picture and its PNG twin, which is what actually gets drawn on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub source: PathBuf,
    pub png: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<Template>,
}

impl TemplateCatalog {
    /// Give every image in `images_dir` a PNG twin in `png_dir`.
    ///
    /// Twins that already exist are reused as they are. Files that do not
    /// decode are skipped; an empty catalog is an error.
    pub fn prepare(images_dir: &Path, png_dir: &Path) -> Result<Self, CoreError> {
        std::fs::create_dir_all(png_dir)?;

        let mut sources: Vec<PathBuf> = std::fs::read_dir(images_dir)
            .map_err(|e| {
                warn!("Cannot read template directory {}: {}", images_dir.display(), e);
                e
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        sources.sort();

        let mut templates = Vec::with_capacity(sources.len());
        for source in sources {
            let Some(stem) = source.file_stem() else {
                continue;
            };
            let png = png_dir.join(format!("{}.png", stem.to_string_lossy()));

            if !png.exists() {
                if let Err(e) = convert_to_png(&source, &png) {
                    warn!("Skipping template {}: {}", source.display(), e);
                    continue;
                }
                debug!("Converted {} to {}", source.display(), png.display());
            }
            templates.push(Template { source, png });
        }

        if templates.is_empty() {
            return Err(RenderError::TemplateLoad {
                path: images_dir.display().to_string(),
                reason: "no usable template images".to_string(),
            }
            .into());
        }

        info!("Loaded {} template images", templates.len());
        Ok(Self { templates })
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Pick a template uniformly at random.
    pub fn choose(&self, rng: &mut fastrand::Rng) -> Option<&Template> {
        if self.templates.is_empty() {
            return None;
        }
        Some(&self.templates[rng.usize(..self.templates.len())])
    }
}

impl From<Vec<Template>> for TemplateCatalog {
    fn from(templates: Vec<Template>) -> Self {
        Self { templates }
    }
}

fn convert_to_png(source: &Path, target: &Path) -> Result<(), RenderError> {
    let decoded = image::open(source).map_err(|e| RenderError::TemplateLoad {
        path: source.display().to_string(),
        reason: e.to_string(),
    })?;
    decoded
        .save_with_format(target, ImageFormat::Png)
        .map_err(|e| RenderError::PngEncode {
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_prepare_converts_once() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        let pngs = dir.path().join("images-png");
        std::fs::create_dir_all(&images).unwrap();

        RgbImage::from_pixel(8, 6, Rgb([200, 180, 40]))
            .save_with_format(images.join("shiba.jpg"), ImageFormat::Jpeg)
            .unwrap();
        std::fs::write(images.join("notes.txt"), "not an image").unwrap();

        let catalog = TemplateCatalog::prepare(&images, &pngs).unwrap();
        assert_eq!(catalog.len(), 1);
        let template = &catalog.templates()[0];
        assert_eq!(template.png, pngs.join("shiba.png"));
        assert_eq!(image::open(&template.png).unwrap().width(), 8);

        // An existing twin is left alone.
        std::fs::write(&template.png, b"cached").unwrap();
        let again = TemplateCatalog::prepare(&images, &pngs).unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(std::fs::read(&template.png).unwrap(), b"cached");
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = TemplateCatalog::prepare(dir.path(), &dir.path().join("png"));
        assert!(matches!(
            result,
            Err(CoreError::Render(RenderError::TemplateLoad { .. }))
        ));
    }

    #[test]
    fn test_choose_is_seeded() {
        let catalog = TemplateCatalog::from(
            (0..5)
                .map(|i| Template {
                    source: PathBuf::from(format!("{}.jpg", i)),
                    png: PathBuf::from(format!("{}.png", i)),
                })
                .collect::<Vec<_>>(),
        );
        let a = catalog.choose(&mut fastrand::Rng::with_seed(3)).cloned();
        let b = catalog.choose(&mut fastrand::Rng::with_seed(3)).cloned();
        assert_eq!(a, b);
        assert!(TemplateCatalog::from(Vec::new())
            .choose(&mut fastrand::Rng::with_seed(3))
            .is_none());
    }
}

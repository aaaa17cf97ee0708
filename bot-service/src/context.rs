use crate::artifacts::ArtifactStore;
use crate::catalog::TemplateCatalog;
use crate::responded::RespondedLog;
use cloud_engine::{FontSet, StopwordSet};
use dogecloud_core::{AppConfig, BotSettings, CloudSettings, CoreError};
use tracing::info;

/// Everything a submission needs besides the two remote services.
///
/// Built once at startup; any failure here is fatal.
pub struct PipelineContext {
    pub bot: BotSettings,
    pub cloud: CloudSettings,
    pub stopwords: StopwordSet,
    pub fonts: FontSet,
    pub templates: TemplateCatalog,
    pub artifacts: ArtifactStore,
    pub responded: RespondedLog,
    pub rng: fastrand::Rng,
}

impl PipelineContext {
    pub fn bootstrap(config: &AppConfig) -> Result<Self, CoreError> {
        let paths = &config.paths;

        let stopwords = StopwordSet::load(&paths.stopwords, config.cloud.case_insensitive_stopwords)?;
        let fonts = FontSet::load(&config.cloud.font_name, config.cloud.font_path.as_deref())?;
        let templates = TemplateCatalog::prepare(&paths.images_dir, &paths.images_png_dir)?;
        let artifacts = ArtifactStore::open(&paths.done_dir)?;
        artifacts.audit()?;
        let responded = RespondedLog::open(&paths.responded)?;

        let rng = match config.cloud.seed {
            Some(seed) => {
                info!("Using fixed seed {}", seed);
                fastrand::Rng::with_seed(seed)
            }
            None => fastrand::Rng::new(),
        };

        Ok(Self {
            bot: config.bot.clone(),
            cloud: config.cloud.clone(),
            stopwords,
            fonts,
            templates,
            artifacts,
            responded,
            rng,
        })
    }
}

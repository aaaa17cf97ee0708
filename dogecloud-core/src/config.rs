use crate::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Placeholder the reply template must contain; replaced by the hosted image link.
pub const IMAGE_URL_PLACEHOLDER: &str = "{image_url}";

pub const ENV_REDDIT_PASSWORD: &str = "DOGECLOUD_REDDIT_PASSWORD";
pub const ENV_REDDIT_CLIENT_SECRET: &str = "DOGECLOUD_REDDIT_CLIENT_SECRET";
pub const ENV_IMGUR_CLIENT_ID: &str = "DOGECLOUD_IMGUR_CLIENT_ID";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub reddit: RedditSettings,
    pub bot: BotSettings,
    #[serde(default)]
    pub cloud: CloudSettings,
    #[serde(default)]
    pub imgur: ImgurSettings,
    #[serde(default)]
    pub paths: PathSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditSettings {
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub user_agent: String,
    #[serde(default = "default_subreddit")]
    pub subreddit: String,
    #[serde(default = "default_listing_limit")]
    pub listing_limit: u32,
    #[serde(default = "default_reddit_api_base")]
    pub api_base: String,
    #[serde(default = "default_reddit_auth_url")]
    pub auth_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotSettings {
    #[serde(default = "default_pause_time_secs")]
    pub pause_time_secs: u64,
    #[serde(default = "default_min_comments")]
    pub min_comments: u32,
    pub reply_template: String,
}

impl BotSettings {
    pub fn pause_time(&self) -> Duration {
        Duration::from_secs(self.pause_time_secs)
    }

    /// The reply body with the hosted image link filled in.
    pub fn reply_text(&self, image_url: &str) -> String {
        self.reply_template.replace(IMAGE_URL_PLACEHOLDER, image_url)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CloudSettings {
    pub max_words: usize,
    pub min_word_length: usize,
    pub case_insensitive_stopwords: bool,
    pub font_name: String,
    pub font_path: Option<PathBuf>,
    /// Outline width as a fraction of the font size.
    pub font_stroke: f32,
    /// Largest font size as a fraction of the canvas height.
    pub initial_font_size: f32,
    pub prefer_horizontal: f32,
    pub relative_scaling: f32,
    pub min_font_size: f32,
    pub intensifiers: Vec<String>,
    pub seed: Option<u64>,
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            max_words: 200,
            min_word_length: 2,
            case_insensitive_stopwords: true,
            font_name: "DejaVu Sans".to_string(),
            font_path: None,
            font_stroke: 0.03,
            initial_font_size: 0.15,
            prefer_horizontal: 1.0,
            relative_scaling: 0.5,
            min_font_size: 4.0,
            intensifiers: ["so", "such", "very", "wow", "much"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImgurSettings {
    pub client_id: String,
    pub api_base: String,
}

impl Default for ImgurSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            api_base: "https://api.imgur.com/3".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub images_dir: PathBuf,
    pub images_png_dir: PathBuf,
    pub done_dir: PathBuf,
    pub stopwords: PathBuf,
    pub responded: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("images"),
            images_png_dir: PathBuf::from("images-png"),
            done_dir: PathBuf::from("done"),
            stopwords: PathBuf::from("stopwords.txt"),
            responded: PathBuf::from("responded-list.txt"),
        }
    }
}

fn default_subreddit() -> String {
    "all".to_string()
}

fn default_listing_limit() -> u32 {
    100
}

fn default_reddit_api_base() -> String {
    "https://oauth.reddit.com".to_string()
}

fn default_reddit_auth_url() -> String {
    "https://www.reddit.com/api/v1/access_token".to_string()
}

fn default_pause_time_secs() -> u64 {
    60
}

fn default_min_comments() -> u32 {
    10
}

impl AppConfig {
    /// Read, override from the environment, resolve paths and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                ConfigError::ResourceUnreadable {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut config = Self::parse(&raw)?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.resolve_paths(&base_dir);
        config.validate()?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Secrets may live in the environment instead of the file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(password) = lookup(ENV_REDDIT_PASSWORD) {
            debug!("Using Reddit password from {}", ENV_REDDIT_PASSWORD);
            self.reddit.password = password;
        }
        if let Some(secret) = lookup(ENV_REDDIT_CLIENT_SECRET) {
            debug!("Using Reddit client secret from {}", ENV_REDDIT_CLIENT_SECRET);
            self.reddit.client_secret = secret;
        }
        if let Some(client_id) = lookup(ENV_IMGUR_CLIENT_ID) {
            debug!("Using Imgur client id from {}", ENV_IMGUR_CLIENT_ID);
            self.imgur.client_id = client_id;
        }
    }

    pub fn resolve_paths(&mut self, base_dir: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base_dir.join(&*p);
            }
        };
        resolve(&mut self.paths.images_dir);
        resolve(&mut self.paths.images_png_dir);
        resolve(&mut self.paths.done_dir);
        resolve(&mut self.paths.stopwords);
        resolve(&mut self.paths.responded);
        if let Some(font_path) = self.cloud.font_path.as_mut() {
            resolve(font_path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("reddit.username", &self.reddit.username)?;
        require_non_empty("reddit.password", &self.reddit.password)?;
        require_non_empty("reddit.client_id", &self.reddit.client_id)?;
        require_non_empty("reddit.user_agent", &self.reddit.user_agent)?;
        require_non_empty("imgur.client_id", &self.imgur.client_id)?;

        if !self.bot.reply_template.contains(IMAGE_URL_PLACEHOLDER) {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "bot.reply_template must contain the {} placeholder",
                    IMAGE_URL_PLACEHOLDER
                ),
            });
        }

        let cloud = &self.cloud;
        if cloud.max_words == 0 {
            return Err(invalid("cloud.max_words", cloud.max_words));
        }
        if !(cloud.initial_font_size > 0.0 && cloud.initial_font_size <= 1.0) {
            return Err(invalid("cloud.initial_font_size", cloud.initial_font_size));
        }
        if !(0.0..=1.0).contains(&cloud.prefer_horizontal) {
            return Err(invalid("cloud.prefer_horizontal", cloud.prefer_horizontal));
        }
        if !(0.0..=1.0).contains(&cloud.relative_scaling) {
            return Err(invalid("cloud.relative_scaling", cloud.relative_scaling));
        }
        if !(cloud.font_stroke >= 0.0 && cloud.font_stroke < 1.0) {
            return Err(invalid("cloud.font_stroke", cloud.font_stroke));
        }
        if !(cloud.min_font_size >= 1.0) {
            return Err(invalid("cloud.min_font_size", cloud.min_font_size));
        }
        if cloud.intensifiers.iter().all(|w| w.trim().is_empty()) {
            return Err(ConfigError::MissingField {
                field: "cloud.intensifiers".to_string(),
            });
        }
        Ok(())
    }

    pub fn pause_time(&self) -> Duration {
        self.bot.pause_time()
    }

    pub fn reply_text(&self, image_url: &str) -> String {
        self.bot.reply_text(image_url)
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::MissingField {
            field: field.to_string(),
        })
    } else {
        Ok(())
    }
}

fn invalid(field: &str, value: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

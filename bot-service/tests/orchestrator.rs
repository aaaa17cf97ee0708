use bot_service::{
    ArtifactName, ArtifactStage, ArtifactStore, Orchestrator, PipelineContext, RespondedLog,
    SubmissionOutcome, SubmissionStage, Template, TemplateCatalog,
};
use cloud_engine::{FontSet, StopwordSet};
use dogecloud_core::{
    BotSettings, CloudSettings, CoreError, ErrorRecovery, HostedImage, ImageHostError,
    SubmissionSummary,
};
use image::{Rgb, RgbImage};
use image_host::ImageHost;
use reddit_client::DiscussionPlatform;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

const PAUSE_SECS: u64 = 5;

#[derive(Default)]
struct FakePlatform {
    listing: Vec<SubmissionSummary>,
    rate_limited: HashSet<String>,
    reply_rate_limited: HashSet<String>,
    fetched: Mutex<Vec<String>>,
    replies: Mutex<Vec<(String, String)>>,
}

impl FakePlatform {
    fn with_listing(listing: Vec<SubmissionSummary>) -> Self {
        Self {
            listing,
            ..Default::default()
        }
    }
}

impl DiscussionPlatform for FakePlatform {
    async fn hot_submissions(&self) -> Result<Vec<SubmissionSummary>, CoreError> {
        Ok(self.listing.clone())
    }

    async fn comment_bodies(&self, submission_id: &str) -> Result<Vec<String>, CoreError> {
        self.fetched.lock().unwrap().push(submission_id.to_string());
        if self.rate_limited.contains(submission_id) {
            return Err(ErrorRecovery::rate_limited(60));
        }
        Ok(vec![
            "&lt;div class=\"md\"&gt;&lt;p&gt;Rust is a crab&lt;/p&gt;&lt;/div&gt;".to_string(),
            "&lt;p&gt;rust &lt;a href=\"https://x.io\"&gt;https://x.io&lt;/a&gt; crab&lt;/p&gt;"
                .to_string(),
        ])
    }

    async fn reply(&self, submission_id: &str, text: &str) -> Result<String, CoreError> {
        if self.reply_rate_limited.contains(submission_id) {
            return Err(ErrorRecovery::rate_limited(60));
        }
        let mut replies = self.replies.lock().unwrap();
        replies.push((submission_id.to_string(), text.to_string()));
        Ok(format!("reply{}", replies.len()))
    }
}

#[derive(Default)]
struct FakeHost {
    uploads: Mutex<Vec<PathBuf>>,
    fail: bool,
}

impl ImageHost for FakeHost {
    async fn upload(&self, path: &Path) -> Result<HostedImage, CoreError> {
        if self.fail {
            return Err(ImageHostError::UploadFailed {
                status_code: 500,
                reason: "over capacity".to_string(),
            }
            .into());
        }
        assert!(path.exists(), "uploaded artifact must exist on disk");
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(path.to_path_buf());
        let id = format!("img{}", uploads.len());
        Ok(HostedImage {
            link: format!("https://i.imgur.com/{}.png", id),
            id,
        })
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("bot_service=debug")
        .with_test_writer()
        .try_init();
}

fn submission(id: &str, num_comments: u32) -> SubmissionSummary {
    SubmissionSummary {
        id: id.to_string(),
        title: format!("Thread {}", id),
        num_comments,
    }
}

/// A context over `dir`. With `broken_template` the only template is not an image.
fn context(dir: &TempDir, broken_template: bool) -> PipelineContext {
    let png_dir = dir.path().join("images-png");
    std::fs::create_dir_all(&png_dir).unwrap();
    let png = png_dir.join("doge.png");
    if broken_template {
        std::fs::write(&png, b"definitely not a png").unwrap();
    } else {
        RgbImage::from_pixel(64, 48, Rgb([230, 190, 90]))
            .save(&png)
            .unwrap();
    }

    PipelineContext {
        bot: BotSettings {
            pause_time_secs: PAUSE_SECS,
            min_comments: 10,
            reply_template: "wow such cloud: {image_url}".to_string(),
        },
        cloud: CloudSettings {
            seed: Some(7),
            ..Default::default()
        },
        stopwords: StopwordSet::from_lines("is\na\nthe", true),
        fonts: FontSet::from_database(usvg::fontdb::Database::new(), "DejaVu Sans"),
        templates: TemplateCatalog::from(vec![Template {
            source: dir.path().join("images").join("doge.jpg"),
            png,
        }]),
        artifacts: ArtifactStore::open(&dir.path().join("done")).unwrap(),
        responded: RespondedLog::open(&dir.path().join("responded-list.txt")).unwrap(),
        rng: fastrand::Rng::with_seed(7),
    }
}

fn done_files(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path().join("done"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_candidate_selection() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(&dir, false);
    ctx.responded.claim("seen01").unwrap();

    let orchestrator = Orchestrator::new(FakePlatform::default(), FakeHost::default(), ctx);
    let selected = orchestrator.select_candidates(vec![
        submission("abc123", 50),
        submission("quiet1", 3),
        submission("seen01", 400),
        submission("edge10", 10),
    ]);

    let ids: Vec<_> = selected.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["abc123", "edge10"]);
}

#[tokio::test(start_paused = true)]
async fn test_full_pass_replies_and_tags_artifact() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let platform = FakePlatform::with_listing(vec![submission("abc123", 50)]);
    let mut orchestrator = Orchestrator::new(platform, FakeHost::default(), context(&dir, false));

    let started = Instant::now();
    let summary = orchestrator.run_once().await.unwrap();
    assert_eq!(summary.candidates, 1);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.abandoned, 0);
    assert_eq!(started.elapsed(), Duration::from_secs(PAUSE_SECS));

    let replies = orchestrator.platform().replies.lock().unwrap().clone();
    assert_eq!(
        replies,
        vec![(
            "abc123".to_string(),
            "wow such cloud: https://i.imgur.com/img1.png".to_string()
        )]
    );

    let files = done_files(&dir);
    assert_eq!(files.len(), 1);
    let name = ArtifactName::parse(&files[0]).unwrap();
    assert_eq!(name.submission_id, "abc123");
    assert_eq!(name.upload_id.as_deref(), Some("img1"));
    assert_eq!(name.reply_id.as_deref(), Some("reply1"));
    assert_eq!(name.stage(), ArtifactStage::Replied);

    let recorded = std::fs::read_to_string(dir.path().join("responded-list.txt")).unwrap();
    assert_eq!(recorded, "abc123\n");
}

#[tokio::test(start_paused = true)]
async fn test_render_failure_stays_claimed() {
    let dir = tempfile::tempdir().unwrap();
    let platform = FakePlatform::with_listing(vec![submission("abc123", 50)]);
    let mut orchestrator = Orchestrator::new(platform, FakeHost::default(), context(&dir, true));

    let outcome = orchestrator.process_submission(&submission("abc123", 50)).await;
    match outcome {
        SubmissionOutcome::Abandoned(abandoned) => {
            assert_eq!(abandoned.reached, SubmissionStage::TextExtracted);
            assert_eq!(
                ErrorRecovery::classify(&abandoned.error),
                dogecloud_core::FailureClass::RenderOrUpload
            );
        }
        other => panic!("expected abandonment, got {:?}", other),
    }

    assert!(orchestrator.context().responded.contains("abc123"));
    assert!(orchestrator.host().uploads.lock().unwrap().is_empty());
    assert!(orchestrator.platform().replies.lock().unwrap().is_empty());

    // Never picked up again, not even by a later pass.
    let summary = orchestrator.run_once().await.unwrap();
    assert_eq!(summary.candidates, 0);
    assert_eq!(orchestrator.platform().fetched.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_upload_failure_leaves_rendered_marker() {
    let dir = tempfile::tempdir().unwrap();
    let platform = FakePlatform::with_listing(vec![submission("abc123", 50)]);
    let host = FakeHost {
        fail: true,
        ..Default::default()
    };
    let mut orchestrator = Orchestrator::new(platform, host, context(&dir, false));

    let started = Instant::now();
    let summary = orchestrator.run_once().await.unwrap();
    assert_eq!(summary.abandoned, 1);
    assert_eq!(summary.rate_limited, 0);
    assert_eq!(started.elapsed(), Duration::from_secs(PAUSE_SECS));

    let incomplete = orchestrator.context().artifacts.audit().unwrap();
    assert_eq!(incomplete.len(), 1);
    assert_eq!(incomplete[0].submission_id, "abc123");
    assert_eq!(incomplete[0].stage(), ArtifactStage::Rendered);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_waits_then_moves_on() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut platform =
        FakePlatform::with_listing(vec![submission("slow01", 80), submission("next02", 80)]);
    platform.rate_limited.insert("slow01".to_string());
    let mut orchestrator = Orchestrator::new(platform, FakeHost::default(), context(&dir, false));

    let started = Instant::now();
    let summary = orchestrator.run_once().await.unwrap();

    assert_eq!(summary.candidates, 2);
    assert_eq!(summary.rate_limited, 1);
    assert_eq!(summary.completed, 1);
    assert_eq!(
        started.elapsed(),
        Duration::from_secs(60) + Duration::from_secs(PAUSE_SECS)
    );

    let fetched = orchestrator.platform().fetched.lock().unwrap().clone();
    assert_eq!(fetched, vec!["slow01", "next02"]);
    let replies = orchestrator.platform().replies.lock().unwrap().clone();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].0, "next02");

    // The rate-limited submission is not retried.
    assert!(orchestrator.context().responded.contains("slow01"));
    let again = orchestrator.run_once().await.unwrap();
    assert_eq!(again.candidates, 0);
}

#[tokio::test(start_paused = true)]
async fn test_reply_rate_limit_keeps_uploaded_marker() {
    let dir = tempfile::tempdir().unwrap();
    let mut platform =
        FakePlatform::with_listing(vec![submission("busy01", 80), submission("next02", 80)]);
    platform.reply_rate_limited.insert("busy01".to_string());
    let mut orchestrator = Orchestrator::new(platform, FakeHost::default(), context(&dir, false));

    let started = Instant::now();
    let summary = orchestrator.run_once().await.unwrap();

    assert_eq!(summary.rate_limited, 1);
    assert_eq!(summary.completed, 1);
    assert_eq!(
        started.elapsed(),
        Duration::from_secs(60) + Duration::from_secs(PAUSE_SECS)
    );

    // Both were uploaded, only the second got a reply.
    assert_eq!(orchestrator.host().uploads.lock().unwrap().len(), 2);
    let replies = orchestrator.platform().replies.lock().unwrap().clone();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].0, "next02");

    let incomplete = orchestrator.context().artifacts.audit().unwrap();
    assert_eq!(incomplete.len(), 1);
    assert_eq!(incomplete[0].submission_id, "busy01");
    assert_eq!(incomplete[0].upload_id.as_deref(), Some("img1"));
    assert_eq!(incomplete[0].stage(), ArtifactStage::Uploaded);
    assert!(orchestrator.context().responded.contains("busy01"));
}

#[tokio::test(start_paused = true)]
async fn test_replied_artifact_shows_the_cloud() {
    let fonts = FontSet::load("DejaVu Sans", None).unwrap();
    if fonts.is_empty() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(&dir, false);
    let background = Rgb([230u8, 190, 90]);
    RgbImage::from_pixel(320, 240, background)
        .save(dir.path().join("images-png").join("doge.png"))
        .unwrap();
    ctx.fonts = fonts;

    let platform = FakePlatform::with_listing(vec![submission("abc123", 50)]);
    let mut orchestrator = Orchestrator::new(platform, FakeHost::default(), ctx);
    let summary = orchestrator.run_once().await.unwrap();
    assert_eq!(summary.completed, 1);

    let files = done_files(&dir);
    assert_eq!(files.len(), 1);
    let rendered = image::open(dir.path().join("done").join(&files[0]))
        .unwrap()
        .to_rgb8();
    assert_eq!(rendered.dimensions(), (320, 240));
    assert!(rendered.pixels().any(|p| p != &background));
}

//! Drives one submission at a time from the hot listing to a posted reply.

use crate::context::PipelineContext;
use chrono::Local;
use cloud_engine::{
    clean_comment, extract_keywords, extraction_options, layout_options, Dogeifier, Layout,
    LayoutEngine, Renderer,
};
use dogecloud_core::{
    CoreError, ErrorExt, ErrorRecovery, FailureClass, Keyword, RecoveryAction, RenderError,
    SubmissionSummary,
};
use image_host::ImageHost;
use reddit_client::DiscussionPlatform;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How far a submission got. `Abandoned` is terminal and never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStage {
    Candidate,
    Claimed,
    TextExtracted,
    Laidout,
    Rendered,
    Uploaded,
    Replied,
    Done,
    Abandoned,
}

impl fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A submission that made it all the way through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed {
    pub submission_id: String,
    pub image_link: String,
    pub reply_id: String,
    pub artifact: PathBuf,
}

/// A submission that stopped early. It stays claimed.
#[derive(Debug)]
pub struct Abandoned {
    pub submission_id: String,
    /// The last stage that completed.
    pub reached: SubmissionStage,
    pub error: CoreError,
}

#[derive(Debug)]
pub enum SubmissionOutcome {
    Done(Completed),
    /// Someone claimed it earlier, in this run or a previous one.
    AlreadyClaimed,
    Abandoned(Abandoned),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub candidates: usize,
    pub completed: usize,
    pub abandoned: usize,
    pub rate_limited: usize,
}

pub struct Orchestrator<P, H> {
    platform: P,
    host: H,
    context: PipelineContext,
}

impl<P: DiscussionPlatform, H: ImageHost> Orchestrator<P, H> {
    pub fn new(platform: P, host: H, context: PipelineContext) -> Self {
        Self {
            platform,
            host,
            context,
        }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    fn pause(&self) -> Duration {
        self.context.bot.pause_time()
    }

    /// Unclaimed submissions with enough comments, in listing order.
    pub fn select_candidates(&self, listing: Vec<SubmissionSummary>) -> Vec<SubmissionSummary> {
        let min_comments = self.context.bot.min_comments;
        listing
            .into_iter()
            .filter(|s| !self.context.responded.contains(&s.id) && s.num_comments >= min_comments)
            .collect()
    }

    /// Run `submission` through every stage. Errors never escape; they come back as
    /// [`SubmissionOutcome::Abandoned`] with the stage that was reached.
    pub async fn process_submission(&mut self, submission: &SubmissionSummary) -> SubmissionOutcome {
        let mut stage = SubmissionStage::Candidate;
        match self.advance(submission, &mut stage).await {
            Ok(Some(completed)) => SubmissionOutcome::Done(completed),
            Ok(None) => SubmissionOutcome::AlreadyClaimed,
            Err(error) => {
                let reached = stage;
                warn!("Abandoning {} after stage {}", submission.id, reached);
                enter(&mut stage, SubmissionStage::Abandoned, &submission.id);
                SubmissionOutcome::Abandoned(Abandoned {
                    submission_id: submission.id.clone(),
                    reached,
                    error,
                })
            }
        }
    }

    async fn advance(
        &mut self,
        submission: &SubmissionSummary,
        stage: &mut SubmissionStage,
    ) -> Result<Option<Completed>, CoreError> {
        let id = submission.id.as_str();

        // Claim first: a crash after this point loses the work instead of double-posting.
        if !self.context.responded.claim(id)? {
            debug!("Submission {} already claimed, skipping", id);
            return Ok(None);
        }
        enter(stage, SubmissionStage::Claimed, id);

        let bodies = self.platform.comment_bodies(id).await?;
        let keywords = self.extract(&bodies);
        info!(
            "Got {} keywords from {} comments on {}",
            keywords.len(),
            bodies.len(),
            id
        );
        enter(stage, SubmissionStage::TextExtracted, id);

        let (template, layout) = self.lay_out(&keywords)?;
        enter(stage, SubmissionStage::Laidout, id);

        let artifact = self.render(id, &template, &layout)?;
        enter(stage, SubmissionStage::Rendered, id);

        let image = self.host.upload(&artifact).await?;
        let artifact = self.context.artifacts.tag(&artifact, &image.id)?;
        enter(stage, SubmissionStage::Uploaded, id);

        let text = self.context.bot.reply_text(&image.link);
        let reply_id = self.platform.reply(id, &text).await?;
        enter(stage, SubmissionStage::Replied, id);

        let artifact = self.context.artifacts.tag(&artifact, &reply_id)?;
        enter(stage, SubmissionStage::Done, id);

        Ok(Some(Completed {
            submission_id: id.to_string(),
            image_link: image.link,
            reply_id,
            artifact,
        }))
    }

    fn extract(&self, bodies: &[String]) -> Vec<Keyword> {
        let mut text = String::new();
        for body in bodies {
            text.push_str(&clean_comment(body));
            text.push('\n');
        }
        extract_keywords(
            &text,
            &self.context.stopwords,
            &extraction_options(&self.context.cloud),
        )
    }

    fn lay_out(&mut self, keywords: &[Keyword]) -> Result<(PathBuf, Layout), CoreError> {
        let ctx = &mut self.context;
        let template = ctx
            .templates
            .choose(&mut ctx.rng)
            .ok_or_else(|| CoreError::Internal {
                message: "template catalog is empty".to_string(),
            })?
            .png
            .clone();
        let (width, height) =
            image::image_dimensions(&template).map_err(|e| RenderError::TemplateLoad {
                path: template.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut dogeifier = Dogeifier::new(
            &ctx.cloud.intensifiers,
            fastrand::Rng::with_seed(ctx.rng.u64(..)),
        );
        let styled = dogeifier.style_all(keywords);

        let options = layout_options(&ctx.cloud, width, height, ctx.rng.u64(..));
        let layout = LayoutEngine::new(ctx.fonts.measure(), options).layout(&styled);
        if !layout.omitted.is_empty() {
            debug!(
                "{} of {} words did not fit on {}x{}",
                layout.omitted.len(),
                styled.len(),
                width,
                height
            );
        }
        Ok((template, layout))
    }

    fn render(
        &mut self,
        submission_id: &str,
        template: &Path,
        layout: &Layout,
    ) -> Result<PathBuf, CoreError> {
        let ctx = &mut self.context;
        let output = ctx.artifacts.render_path(submission_id, Local::now());
        let mut rng = fastrand::Rng::with_seed(ctx.rng.u64(..));
        Renderer::new(&ctx.fonts, ctx.cloud.font_stroke).render_to_file(
            template,
            &layout.words,
            &mut rng,
            &output,
        )?;
        info!(
            "Rendered {} words for {} to {}",
            layout.words.len(),
            submission_id,
            output.display()
        );
        Ok(output)
    }

    /// How long to wait after `error` before touching the next candidate.
    fn recovery_delay(&self, error: &CoreError) -> Duration {
        match ErrorRecovery::determine_action(error) {
            RecoveryAction::WaitOut(delay) => delay,
            RecoveryAction::Pace => self.pause(),
        }
    }

    /// One pass over the hot listing.
    ///
    /// Only a failure to fetch the listing is returned; per-submission errors are
    /// logged and paced here.
    pub async fn run_once(&mut self) -> Result<PassSummary, CoreError> {
        let listing = self.platform.hot_submissions().await?;
        let candidates = self.select_candidates(listing);
        let mut summary = PassSummary {
            candidates: candidates.len(),
            ..Default::default()
        };
        info!("{} candidate submissions", candidates.len());

        for submission in &candidates {
            let delay = match self.process_submission(submission).await {
                SubmissionOutcome::Done(done) => {
                    summary.completed += 1;
                    info!(
                        "Replied to {} with {} ({})",
                        done.submission_id, done.reply_id, done.image_link
                    );
                    self.pause()
                }
                SubmissionOutcome::AlreadyClaimed => continue,
                SubmissionOutcome::Abandoned(abandoned) => {
                    summary.abandoned += 1;
                    let error = &abandoned.error;
                    if ErrorRecovery::classify(error) == FailureClass::RateLimited {
                        summary.rate_limited += 1;
                    }
                    error.log_error();
                    let delay = self.recovery_delay(error);
                    if error.is_rate_limited() {
                        info!("Sleeping for {:?} because of rate limiting", delay);
                    }
                    delay
                }
            };
            tokio::time::sleep(delay).await;
        }
        Ok(summary)
    }

    /// Poll forever. Never returns; listing failures are logged and waited out.
    pub async fn run_forever(&mut self) {
        loop {
            let delay = match self.run_once().await {
                Ok(summary) => {
                    info!(
                        "Pass finished: {} completed, {} abandoned of {} candidates",
                        summary.completed, summary.abandoned, summary.candidates
                    );
                    self.pause()
                }
                Err(error) => {
                    error.log_error();
                    self.recovery_delay(&error)
                }
            };
            tokio::time::sleep(delay).await;
        }
    }
}

fn enter(stage: &mut SubmissionStage, next: SubmissionStage, submission_id: &str) {
    info!("Submission {}: {} -> {}", submission_id, stage, next);
    *stage = next;
}

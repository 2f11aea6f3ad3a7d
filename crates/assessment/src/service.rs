//! Assessment flow: capture, score, persist, follow up

use std::sync::Arc;

use camera_capture::Camera;
use emotion_sampler::{EmotionEstimate, EmotionSampler, ModelLoader, SamplerHandle, SharedModel};
use rand::Rng;
use risk_engine::{ActivitySession, AssessmentResult, Question, QuestionBank, ResponseSet, RiskAggregator};
use storage::{AssessmentRecord, AssessmentRepository, KeyValueStore};
use tokio::time;
use tracing::{debug, info, warn};

use crate::{AppConfig, AssessmentError};

pub struct AssessmentService<L: ModelLoader, S: KeyValueStore> {
    config: AppConfig,
    camera: Camera,
    models: Arc<SharedModel<L>>,
    bank: QuestionBank,
    aggregator: RiskAggregator,
    repository: AssessmentRepository<S>,
}

impl<L: ModelLoader + 'static, S: KeyValueStore> AssessmentService<L, S> {
    pub fn new(config: AppConfig, camera: Camera, loader: L, store: S) -> Self {
        let models = Arc::new(SharedModel::new(loader, config.models.clone()));
        let aggregator = RiskAggregator::new(config.risk.clone());
        Self {
            config,
            camera,
            models,
            bank: QuestionBank::standard(),
            aggregator,
            repository: AssessmentRepository::new(store),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn repository(&self) -> &AssessmentRepository<S> {
        &self.repository
    }

    /// Random question subset for one round
    pub fn draw_round<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Question> {
        self.bank.draw(self.config.questionnaire.round_size, rng)
    }

    /// Acquire the camera and start sampling on a background task
    pub fn start_capture(&self) -> Result<SamplerHandle, AssessmentError> {
        let session = self.camera.acquire(&self.config.camera)?;
        info!("Camera acquired at {}", session.resolution());
        let sampler = EmotionSampler::new(self.config.sampler.clone(), Arc::clone(&self.models));
        Ok(sampler.spawn(session))
    }

    /// Run one emotion capture to completion.
    ///
    /// Retries the analysis when too few frames were accepted, up to the
    /// configured number of attempts. The camera is released on return.
    pub async fn capture_emotion(&self) -> Result<EmotionEstimate, AssessmentError> {
        let handle = self.start_capture()?;
        let outcome = self.drive_capture(&handle).await;

        if outcome.is_err() {
            handle.cancel();
        }
        let joined = handle.join().await;
        debug!("Sampler finished: {:?}", joined.as_ref().map(|e| e.primary));

        outcome
    }

    async fn drive_capture(&self, handle: &SamplerHandle) -> Result<EmotionEstimate, AssessmentError> {
        let attempts = self.config.capture.attempts.max(1);
        let mut attempt = 0;

        // the face wait covers only the time a face is being looked for
        handle.wait_until_started().await?;

        loop {
            attempt += 1;

            let status = time::timeout(self.config.capture.face_wait(), handle.wait_for_face())
                .await
                .map_err(|_| AssessmentError::FaceTimeout(self.config.capture.face_wait_ms))??;
            debug!("Face ready (confidence {:.2}), starting analysis", status.confidence);

            match handle.start_analysis().await {
                Ok(estimate) => return Ok(estimate),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!("Capture attempt {}/{} failed: {}", attempt, attempts, e);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Score a round and save it
    pub fn assess(
        &self,
        user_id: &str,
        questions: &[Question],
        responses: &ResponseSet,
        emotion: Option<&EmotionEstimate>,
    ) -> Result<(AssessmentResult, AssessmentRecord), AssessmentError> {
        let result = self.aggregator.assess(questions, responses, emotion)?;
        self.persist(user_id, responses, result)
    }

    /// Score the post-activity round against `baseline_score` and save it
    pub fn reassess(
        &self,
        user_id: &str,
        questions: &[Question],
        responses: &ResponseSet,
        emotion: Option<&EmotionEstimate>,
        baseline_score: f64,
        activities: &ActivitySession,
    ) -> Result<(AssessmentResult, AssessmentRecord), AssessmentError> {
        if !activities.is_finished() {
            return Err(AssessmentError::ActivitiesIncomplete {
                remaining: activities.remaining(),
            });
        }

        let result = self.aggregator.reassess(
            questions,
            responses,
            emotion,
            baseline_score,
            &activities.names(),
        )?;
        self.persist(user_id, responses, result)
    }

    /// A user's saved assessments, newest first
    pub fn history(&self, user_id: &str) -> Result<Vec<AssessmentRecord>, AssessmentError> {
        Ok(self.repository.list_for_user(user_id)?)
    }

    fn persist(
        &self,
        user_id: &str,
        responses: &ResponseSet,
        result: AssessmentResult,
    ) -> Result<(AssessmentResult, AssessmentRecord), AssessmentError> {
        let record = AssessmentRecord::from_result(user_id, responses, &result);
        self.repository.save(&record)?;
        info!(
            "Assessment {} saved for {}: {} risk ({:.2})",
            record.id, user_id, result.risk_level, result.risk_score
        );
        Ok((result, record))
    }
}

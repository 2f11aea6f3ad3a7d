//! Polling state machine
//!
//! One task owns the capture session and the model. Every poll awaits its
//! inference before the next tick is taken, so at most one detection is in
//! flight. The caller drives the session through a [`SamplerHandle`].

use std::sync::Arc;
use std::time::Duration;

use camera_capture::CaptureSession;
use metrics::counter;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::aggregate::{EmotionEstimate, FrameAggregator};
use crate::config::SamplerConfig;
use crate::detector::{ExpressionModel, ModelLoader, SharedModel};
use crate::emotion::FrameDetection;
use crate::state::{SamplerPhase, SamplerStatus};
use crate::{DetectionError, SamplerError};

type Reply = oneshot::Sender<Result<EmotionEstimate, SamplerError>>;

/// Caller requests
#[derive(Debug)]
pub enum SamplerCommand {
    /// Begin calibration + analysis; answered when the window closes
    StartAnalysis(Reply),
}

/// Mutable loop state between two polls
struct Progress {
    phase: SamplerPhase,
    started_at: Option<Instant>,
    aggregator: FrameAggregator,
    last_confidence: f32,
    consecutive_failures: u32,
    last_error: Option<SamplerError>,
    pending: Option<Reply>,
}

impl Progress {
    fn new() -> Self {
        Self {
            phase: SamplerPhase::Starting,
            started_at: None,
            aggregator: FrameAggregator::new(),
            last_confidence: 0.0,
            consecutive_failures: 0,
            last_error: None,
            pending: None,
        }
    }

    fn deadline(&self, config: &SamplerConfig) -> Option<Instant> {
        let started = self.started_at?;
        match self.phase {
            SamplerPhase::Calibrating => Some(started + config.calibration()),
            SamplerPhase::Analyzing => Some(started + config.total_window()),
            _ => None,
        }
    }

    fn abandon_analysis(&mut self) {
        self.aggregator.reset();
        self.started_at = None;
        self.phase = SamplerPhase::WaitingForFace;
    }
}

/// Emotion sampler bound to a shared face/expression model
pub struct EmotionSampler<L: ModelLoader> {
    config: SamplerConfig,
    models: Arc<SharedModel<L>>,
}

impl<L: ModelLoader + 'static> EmotionSampler<L> {
    pub fn new(config: SamplerConfig, models: Arc<SharedModel<L>>) -> Self {
        Self { config, models }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Run the sampler on its own task
    pub fn spawn(self, session: CaptureSession) -> SamplerHandle {
        let (command_tx, command_rx) = mpsc::channel(4);
        let (status_tx, status_rx) = watch::channel(SamplerStatus::default());
        let cancel = CancellationToken::new();
        let start_threshold = self.config.start_threshold;

        let task = tokio::spawn(self.run(session, command_rx, status_tx, cancel.clone()));

        SamplerHandle {
            commands: command_tx,
            status: status_rx,
            cancel,
            start_threshold,
            task,
        }
    }

    /// Drive one sampling session to completion.
    ///
    /// The capture session is released before this returns, whatever the outcome.
    pub async fn run(
        self,
        mut session: CaptureSession,
        mut commands: mpsc::Receiver<SamplerCommand>,
        status: watch::Sender<SamplerStatus>,
        cancel: CancellationToken,
    ) -> Result<EmotionEstimate, SamplerError> {
        let mut progress = Progress::new();

        let outcome = self
            .drive(&mut session, &mut commands, &status, &cancel, &mut progress)
            .await;

        session.release();

        let phase = match &outcome {
            Ok(estimate) => {
                info!(
                    "Emotion estimate: {} ({:.2}), secondary {}, {} frames, confidence {:.2}",
                    estimate.primary, estimate.score, estimate.secondary, estimate.frames, estimate.confidence
                );
                SamplerPhase::Finalizing
            }
            Err(SamplerError::Cancelled) => {
                info!("Emotion sampling cancelled");
                SamplerPhase::Failed
            }
            Err(e) => {
                error!("Emotion sampling failed: {}", e);
                SamplerPhase::Failed
            }
        };

        if let Some(reply) = progress.pending.take() {
            let _ = reply.send(outcome.clone());
        }
        status.send_modify(|s| {
            s.phase = phase;
            s.last_error = outcome.as_ref().err().cloned();
        });

        outcome
    }

    async fn drive(
        &self,
        session: &mut CaptureSession,
        commands: &mut mpsc::Receiver<SamplerCommand>,
        status: &watch::Sender<SamplerStatus>,
        cancel: &CancellationToken,
        progress: &mut Progress,
    ) -> Result<EmotionEstimate, SamplerError> {
        let model = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SamplerError::Cancelled),
            model = self.models.get() => model?,
        };

        self.wait_for_video(session, cancel).await?;

        progress.phase = SamplerPhase::WaitingForFace;
        status.send_modify(|s| s.phase = SamplerPhase::WaitingForFace);
        info!("Emotion sampler waiting for face");

        let mut ticker = time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let deadline = progress.deadline(&self.config);
            let window = time::sleep_until(
                deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600)),
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SamplerError::Cancelled),
                _ = window, if deadline.is_some() => {
                    if let Some(estimate) = self.advance_phase(progress)? {
                        return Ok(estimate);
                    }
                }
                command = commands.recv() => match command {
                    Some(SamplerCommand::StartAnalysis(reply)) => self.start_analysis(progress, reply),
                    None => {
                        debug!("Sampler handle dropped");
                        return Err(SamplerError::Cancelled);
                    }
                },
                _ = ticker.tick() => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(SamplerError::Cancelled),
                        polled = self.poll_once(session, model.as_ref(), progress) => polled?,
                    }
                }
            }

            status.send_modify(|s| {
                s.phase = progress.phase;
                s.face_detected = progress.last_confidence >= self.config.display_threshold;
                s.confidence = progress.last_confidence;
                s.accepted_frames = progress.aggregator.frames();
                s.last_error = progress.last_error.clone();
            });
        }
    }

    /// Wait for the video surface to report real dimensions
    async fn wait_for_video(
        &self,
        session: &mut CaptureSession,
        cancel: &CancellationToken,
    ) -> Result<(), SamplerError> {
        let retries = self.config.video_ready_retries;

        for attempt in 0..=retries {
            if let Some(frame) = session.frame()? {
                if frame.has_dimensions() {
                    info!("Video ready at {}x{}", frame.width, frame.height);
                    return Ok(());
                }
            }
            if attempt == retries {
                break;
            }
            debug!("Waiting for video ({}/{})", attempt + 1, retries);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SamplerError::Cancelled),
                _ = time::sleep(self.config.video_ready_interval()) => {}
            }
        }

        error!("Video dimensions still invalid after {} retries", retries);
        Err(SamplerError::VideoNotReady)
    }

    fn start_analysis(&self, progress: &mut Progress, reply: Reply) {
        if progress.phase != SamplerPhase::WaitingForFace {
            let _ = reply.send(Err(SamplerError::AnalysisInProgress));
            return;
        }
        if progress.last_confidence < self.config.start_threshold {
            debug!(
                "Analysis refused: confidence {:.2} < {:.2}",
                progress.last_confidence, self.config.start_threshold
            );
            let _ = reply.send(Err(SamplerError::FaceNotReady {
                confidence: progress.last_confidence,
            }));
            return;
        }

        progress.aggregator.reset();
        progress.started_at = Some(Instant::now());
        progress.phase = SamplerPhase::Calibrating;
        progress.pending = Some(reply);
        info!("Analysis started, calibrating for {}ms", self.config.calibration_ms);
    }

    /// Handle an elapsed phase deadline. Returns the estimate once finalized.
    fn advance_phase(&self, progress: &mut Progress) -> Result<Option<EmotionEstimate>, SamplerError> {
        match progress.phase {
            SamplerPhase::Calibrating => {
                progress.phase = SamplerPhase::Analyzing;
                info!(
                    "Calibration complete ({} frames), analyzing for {}ms",
                    progress.aggregator.frames(),
                    self.config.analysis_ms
                );
                Ok(None)
            }
            SamplerPhase::Analyzing => match progress.aggregator.finish(self.config.min_frames) {
                Ok(estimate) => Ok(Some(estimate)),
                Err(e) => {
                    warn!("Analysis window closed without an estimate: {}", e);
                    if let Some(reply) = progress.pending.take() {
                        let _ = reply.send(Err(e.clone()));
                    }
                    progress.last_error = Some(e);
                    progress.abandon_analysis();
                    Ok(None)
                }
            },
            _ => Ok(None),
        }
    }

    /// Run one detection on the latest frame
    async fn poll_once(
        &self,
        session: &mut CaptureSession,
        model: &L::Model,
        progress: &mut Progress,
    ) -> Result<(), SamplerError> {
        let frame = match session.frame()? {
            Some(frame) if frame.has_dimensions() => frame,
            _ => {
                debug!("Video surface not ready, skipping poll");
                return Ok(());
            }
        };

        counter!("emotion_sampler_polls_total").increment(1);

        let detection = model
            .detect(&frame)
            .await
            .and_then(|raw| raw.map(FrameDetection::try_from).transpose());

        match detection {
            Ok(Some(detection)) => {
                progress.consecutive_failures = 0;
                progress.last_confidence = detection.confidence as f32;

                if progress.phase.is_collecting() {
                    if detection.confidence >= f64::from(self.config.acceptance_threshold) {
                        progress.aggregator.push(&detection);
                        counter!("emotion_sampler_frames_accepted_total").increment(1);
                    } else {
                        counter!("emotion_sampler_frames_rejected_total").increment(1);
                    }
                }
            }
            Ok(None) => {
                progress.consecutive_failures = 0;
                progress.last_confidence = 0.0;
            }
            Err(DetectionError::ModelUnusable(msg)) => {
                error!("Face model became unusable: {}", msg);
                return Err(SamplerError::ModelUnavailable(msg));
            }
            Err(DetectionError::InvalidOutput(msg)) => {
                warn!("Discarding frame {}: {}", frame.sequence, msg);
                counter!("emotion_sampler_frames_invalid_total").increment(1);
            }
            Err(DetectionError::Inference(msg)) => {
                progress.consecutive_failures += 1;
                counter!("emotion_sampler_detection_errors_total").increment(1);
                warn!(
                    "Detection error on frame {} ({}/{}): {}",
                    frame.sequence, progress.consecutive_failures, self.config.max_consecutive_failures, msg
                );
                if progress.consecutive_failures >= self.config.max_consecutive_failures {
                    return Err(SamplerError::Detection(msg));
                }
            }
        }

        Ok(())
    }
}

/// Caller side of a running sampler
pub struct SamplerHandle {
    commands: mpsc::Sender<SamplerCommand>,
    status: watch::Receiver<SamplerStatus>,
    cancel: CancellationToken,
    start_threshold: f32,
    task: JoinHandle<Result<EmotionEstimate, SamplerError>>,
}

impl SamplerHandle {
    /// Subscribe to status updates
    pub fn status(&self) -> watch::Receiver<SamplerStatus> {
        self.status.clone()
    }

    /// Latest status snapshot
    pub fn current(&self) -> SamplerStatus {
        self.status.borrow().clone()
    }

    /// Wait until the model is loaded and the video surface is ready
    pub async fn wait_until_started(&self) -> Result<(), SamplerError> {
        let mut status = self.status.clone();
        let snapshot = status
            .wait_for(|s| s.phase != SamplerPhase::Starting)
            .await
            .map(|s| s.clone())
            .map_err(|_| SamplerError::Cancelled)?;

        if snapshot.phase.is_terminal() {
            return Err(snapshot.last_error.unwrap_or(SamplerError::Cancelled));
        }
        Ok(())
    }

    /// Wait until a face is visible enough to start the analysis
    pub async fn wait_for_face(&self) -> Result<SamplerStatus, SamplerError> {
        let mut status = self.status.clone();
        let threshold = self.start_threshold;
        let snapshot = status
            .wait_for(|s| {
                s.phase.is_terminal() || (s.phase == SamplerPhase::WaitingForFace && s.confidence >= threshold)
            })
            .await
            .map(|s| s.clone())
            .map_err(|_| SamplerError::Cancelled)?;

        if snapshot.phase.is_terminal() {
            return Err(snapshot.last_error.unwrap_or(SamplerError::Cancelled));
        }
        Ok(snapshot)
    }

    /// Start calibration and analysis; resolves when the window closes.
    ///
    /// `FaceNotReady` and `InsufficientSamples` leave the sampler running.
    pub async fn start_analysis(&self) -> Result<EmotionEstimate, SamplerError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(SamplerCommand::StartAnalysis(reply))
            .await
            .map_err(|_| SamplerError::Cancelled)?;
        response.await.unwrap_or(Err(SamplerError::Cancelled))
    }

    /// Stop sampling and release the camera
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the sampler task to finish
    pub async fn join(self) -> Result<EmotionEstimate, SamplerError> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Sampler task aborted: {}", e);
                Err(SamplerError::Cancelled)
            }
        }
    }
}

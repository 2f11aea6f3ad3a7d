//! Assessment runner - command-line entry point

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use assessment::{init_logging, AppConfig, AssessmentService};
use camera_capture::{Camera, SyntheticCamera};
use clap::{Parser, Subcommand};
use emotion_sampler::{Emotion, EmotionEstimate, ModelLoader, SimulatedLoader, SimulatedModel};
use rand::rngs::StdRng;
use rand::SeedableRng;
use risk_engine::{catalog, ActivityKind, ActivitySession, Question, ResponseSet};
use serde::Serialize;
use storage::JsonFileStore;
use tracing::info;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "assessment-runner", version, about = "Emotion-aware self-assessment runner")]
struct Cli {
    /// Configuration file (toml, yaml or json)
    #[arg(short, long)]
    config: Option<String>,

    /// Assessment store, overrides the configured path
    #[arg(long)]
    store: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Draw a round of questions
    Questions {
        #[arg(short = 'n', long)]
        count: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Score a response file and save the assessment
    Assess {
        #[arg(short, long)]
        user: String,
        /// JSON object of question id to answer (1-5)
        #[arg(short, long)]
        responses: PathBuf,
        #[command(flatten)]
        capture: CaptureArgs,
        /// Follow-up to this saved assessment
        #[arg(long, requires = "activities")]
        baseline: Option<Uuid>,
        /// Completed activity ids, comma separated
        #[arg(long, value_delimiter = ',')]
        activities: Vec<String>,
    },
    /// Show saved assessments for a user
    History {
        #[arg(short, long)]
        user: String,
    },
    /// List wellness activities
    Activities,
}

#[derive(clap::Args, Debug)]
struct CaptureArgs {
    /// Run an emotion capture before scoring
    #[arg(long)]
    capture: bool,
    /// Expression reported by the simulated model
    #[arg(long, default_value = "neutral")]
    simulated_emotion: Emotion,
    /// Use the ONNX face models from the configured asset path
    #[cfg(feature = "onnx")]
    #[arg(long)]
    onnx: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(store) = cli.store {
        config.storage.path = store;
    }

    info!("=== Assessment runner v{} ===", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Questions { count, seed } => {
            let count = count.unwrap_or(config.questionnaire.round_size);
            let questions = risk_engine::QuestionBank::standard().draw(count, &mut rng(seed));
            print_json(&questions)
        }
        Command::Activities => print_json(catalog()),
        Command::History { user } => {
            let svc = build(config, SimulatedLoader::default())?;
            print_json(&svc.history(&user)?)
        }
        Command::Assess {
            user,
            responses,
            capture,
            baseline,
            activities,
        } => {
            #[cfg(feature = "onnx")]
            if capture.onnx {
                let svc = build(config, emotion_sampler::OnnxLoader)?;
                return assess(&svc, &user, &responses, capture.capture, baseline, &activities).await;
            }

            let loader = SimulatedLoader::new(SimulatedModel::new(capture.simulated_emotion, 0.9));
            let svc = build(config, loader)?;
            assess(&svc, &user, &responses, capture.capture, baseline, &activities).await
        }
    }
}

fn build<L: ModelLoader + 'static>(config: AppConfig, loader: L) -> Result<AssessmentService<L, JsonFileStore>> {
    let store = JsonFileStore::open(&config.storage.path)
        .with_context(|| format!("opening store {}", config.storage.path.display()))?;
    let camera = Camera::new(SyntheticCamera::default());
    Ok(AssessmentService::new(config, camera, loader, store))
}

async fn assess<L: ModelLoader + 'static>(
    svc: &AssessmentService<L, JsonFileStore>,
    user: &str,
    responses_path: &Path,
    capture: bool,
    baseline: Option<Uuid>,
    activity_ids: &[String],
) -> Result<()> {
    let raw = std::fs::read_to_string(responses_path)
        .with_context(|| format!("reading {}", responses_path.display()))?;
    let responses: ResponseSet = serde_json::from_str(&raw).context("parsing responses")?;
    let ids: Vec<&str> = responses.iter().map(|(id, _)| id).collect();
    let questions: Vec<Question> = svc.bank().select(&ids)?;

    let emotion: Option<EmotionEstimate> = if capture {
        Some(svc.capture_emotion().await?)
    } else {
        None
    };

    let (result, record) = match baseline {
        Some(id) => {
            let previous = svc.repository().require(&id)?;
            let mut session = ActivitySession::new();
            for activity in activity_ids {
                session.complete(activity.parse::<ActivityKind>()?);
            }
            svc.reassess(
                user,
                &questions,
                &responses,
                emotion.as_ref(),
                previous.overall_score(),
                &session,
            )?
        }
        None => {
            if !activity_ids.is_empty() {
                bail!("--activities requires --baseline");
            }
            svc.assess(user, &questions, &responses, emotion.as_ref())?
        }
    };

    let mut output = BTreeMap::new();
    output.insert("id", serde_json::to_value(record.id)?);
    output.insert("result", serde_json::to_value(&result)?);
    print_json(&output)
}

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

//! Thin CLI over the rendering pipeline.
//!
//! Loads the job configuration, fixtures, plan and beat grid, runs the
//! pipeline, and writes the XSQ plus optional artifact sidecars. Exit code 0
//! on success, 1 on any configuration, validation or emission failure.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lumiseq::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "lumiseq", version, about = "Compile choreography plans to xLights XSQ files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile a plan against an audio analysis and fixture rig.
    Run {
        /// Audio file recorded in the sequence head.
        #[arg(long)]
        audio: Option<PathBuf>,
        /// Template XSQ whose head and timing tracks are merged.
        #[arg(long)]
        xsq: Option<PathBuf>,
        /// Job configuration (JSON).
        #[arg(long)]
        config: PathBuf,
        /// Optional application configuration (JSON).
        #[arg(long)]
        app_config: Option<PathBuf>,
        /// Output directory (defaults to the current directory).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Constant-tempo description, used when no analyzed beat grid is supplied.
#[derive(Debug, serde::Deserialize)]
struct TempoConfig {
    bpm: f64,
    #[serde(default = "default_beats_per_bar")]
    beats_per_bar: u32,
    duration_ms: i64,
}

fn default_beats_per_bar() -> u32 {
    4
}

/// One compilation job: where everything lives.
#[derive(Debug, serde::Deserialize)]
struct JobConfig {
    #[serde(default)]
    song: String,
    #[serde(default)]
    artist: String,
    /// Fixture configuration file.
    fixtures: PathBuf,
    /// Named groups over the fixtures; a single all-fixture group when absent.
    #[serde(default)]
    groups: Vec<FixtureGroup>,
    /// Choreography plan file.
    plan: PathBuf,
    /// Analyzed beat grid (JSON), produced by the audio collaborator.
    beat_grid: Option<PathBuf>,
    /// Constant-tempo fallback when no analyzed grid exists.
    tempo: Option<TempoConfig>,
    /// Macro plan file, optional.
    macro_plan: Option<PathBuf>,
    /// Extra template directory loaded over the builtins.
    templates_dir: Option<PathBuf>,
    /// Output file name (defaults to `<song>.xsq`).
    out_name: Option<String>,
}

/// Optional application-level tunables.
#[derive(Debug, Default, serde::Deserialize)]
struct AppConfig {
    #[serde(default)]
    large_gap_threshold_ms: Option<i64>,
    #[serde(default)]
    n_samples: Option<usize>,
    #[serde(default)]
    soft_home_pan_deg: Option<f64>,
    #[serde(default)]
    soft_home_tilt_deg: Option<f64>,
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ValidationError> {
    let text = std::fs::read_to_string(path).map_err(|e| ValidationError::ConfigRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| ValidationError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn run(
    audio: Option<PathBuf>,
    template_xsq: Option<PathBuf>,
    config: PathBuf,
    app_config: Option<PathBuf>,
    out: Option<PathBuf>,
) -> Result<(), CoreError> {
    let job: JobConfig = load_json(&config).map_err(CoreError::Validation)?;
    let app: AppConfig = match &app_config {
        Some(path) => load_json(path).map_err(CoreError::Validation)?,
        None => AppConfig::default(),
    };

    let fixtures = load_fixture_file(&job.fixtures).map_err(CoreError::Validation)?;
    let groups = if job.groups.is_empty() {
        vec![FixtureGroup {
            group_id: "moving_heads".to_owned(),
            fixture_ids: fixtures.iter().map(|f| f.fixture_id.clone()).collect(),
            chase_order: ChaseOrder::LeftToRight,
            tags: Vec::new(),
        }]
    } else {
        job.groups
    };
    let rig = RigProfile::new(fixtures, groups).map_err(CoreError::Validation)?;

    let beat_grid = match (&job.beat_grid, &job.tempo) {
        (Some(path), _) => load_json::<BeatGrid>(path).map_err(CoreError::Validation)?,
        (None, Some(tempo)) => {
            BeatGrid::from_constant_bpm(tempo.bpm, tempo.beats_per_bar, tempo.duration_ms)
                .map_err(CoreError::Grid)?
        }
        (None, None) => {
            return Err(CoreError::Validation(ValidationError::ConfigParse {
                path: config.clone(),
                message: "either 'beat_grid' or 'tempo' must be set".to_owned(),
            }));
        }
    };

    let plan = ChoreographyPlan::load(&job.plan).map_err(CoreError::Validation)?;
    let macro_plan = match &job.macro_plan {
        Some(path) => Some(MacroPlan::load(path).map_err(CoreError::Validation)?),
        None => None,
    };

    let mut registries = Registries::builtins();
    if let Some(dir) = &job.templates_dir {
        let loaded = registries
            .templates
            .load_dir(
                dir,
                &BTreeMap::new(),
                &registries.movements,
                &registries.dimmers,
                &registries.geometry,
            )
            .map_err(CoreError::Template)?;
        info!(loaded, dir = %dir.display(), "loaded template directory");
    }

    let template = match &template_xsq {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                CoreError::Validation(ValidationError::ConfigRead {
                    path: path.clone(),
                    message: e.to_string(),
                })
            })?;
            Some(parse_xsq(&text).map_err(CoreError::Parse)?)
        }
        None => None,
    };

    let mut transition = TransitionConfig::default();
    if let Some(threshold) = app.large_gap_threshold_ms {
        transition.large_gap_threshold_ms = threshold;
    }
    if app.soft_home_pan_deg.is_some() || app.soft_home_tilt_deg.is_some() {
        transition.soft_home = Pose::new(
            app.soft_home_pan_deg.unwrap_or(0.0),
            app.soft_home_tilt_deg.unwrap_or(0.0),
        );
    }

    let options = PipelineOptions {
        n_samples: app.n_samples,
        transition,
        macro_plan,
        template_xsq: template,
        role_strategy: RoleStrategy::default(),
        media_file: audio
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        song: job.song.clone(),
        artist: job.artist.clone(),
    };

    let out_dir = out.unwrap_or_else(|| PathBuf::from("."));
    let out_name = job.out_name.clone().unwrap_or_else(|| {
        if job.song.is_empty() {
            "sequence.xsq".to_owned()
        } else {
            format!("{}.xsq", job.song)
        }
    });
    let out_path = out_dir.join(out_name);

    let pipeline = RenderingPipeline::new(plan, beat_grid, rig, &registries, options);
    let output = pipeline.render_to_file(&out_path)?;
    pipeline.write_artifacts(&output, &out_dir)?;

    for warning in &output.warnings {
        info!(%warning, "render warning");
    }
    info!(
        path = %out_path.display(),
        effects = output.segments.len(),
        "done"
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            audio,
            xsq,
            config,
            app_config,
            out,
        } => match run(audio, xsq, config, app_config, out) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{e}");
                ExitCode::FAILURE
            }
        },
    }
}

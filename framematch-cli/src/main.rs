use clap::Parser;
use framematch::debug::Scoped;
use framematch::{
    load_frame, ConfirmMethod, ConsecutiveFrames, DebugSink, DiskSink, Frame, FrameMatchError,
    FrameSource, Harness, IterSource, Mask, MatchMethod, MatchParameters, MatchResult, Matcher,
    MotionParameters, MotionResult, Paced, Region, Template,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "framematch CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum Mode {
    #[default]
    Match,
    MatchAll,
    WaitForMatch,
    WaitForMotion,
}

impl Mode {
    fn as_str(self) -> &'static str {
        match self {
            Mode::Match => "match",
            Mode::MatchAll => "match-all",
            Mode::WaitForMatch => "wait-for-match",
            Mode::WaitForMotion => "wait-for-motion",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum MatchMethodConfig {
    SqdiffNormed,
    CcorrNormed,
    CcoeffNormed,
}

impl From<MatchMethodConfig> for MatchMethod {
    fn from(value: MatchMethodConfig) -> Self {
        match value {
            MatchMethodConfig::SqdiffNormed => MatchMethod::SqdiffNormed,
            MatchMethodConfig::CcorrNormed => MatchMethod::CcorrNormed,
            MatchMethodConfig::CcoeffNormed => MatchMethod::CcoeffNormed,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ConfirmMethodConfig {
    None,
    Absdiff,
    NormedAbsdiff,
}

impl From<ConfirmMethodConfig> for ConfirmMethod {
    fn from(value: ConfirmMethodConfig) -> Self {
        match value {
            ConfirmMethodConfig::None => ConfirmMethod::None,
            ConfirmMethodConfig::Absdiff => ConfirmMethod::Absdiff,
            ConfirmMethodConfig::NormedAbsdiff => ConfirmMethod::NormedAbsdiff,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MatchConfigJson {
    match_method: MatchMethodConfig,
    match_threshold: f32,
    confirm_method: ConfirmMethodConfig,
    confirm_threshold: f32,
    erode_passes: u32,
    pyramid_levels: usize,
}

impl Default for MatchConfigJson {
    fn default() -> Self {
        let params = MatchParameters::default();
        Self {
            match_method: MatchMethodConfig::SqdiffNormed,
            match_threshold: params.match_threshold,
            confirm_method: ConfirmMethodConfig::Absdiff,
            confirm_threshold: params.confirm_threshold,
            erode_passes: params.erode_passes,
            pyramid_levels: params.pyramid_levels,
        }
    }
}

impl From<MatchConfigJson> for MatchParameters {
    fn from(value: MatchConfigJson) -> Self {
        Self {
            match_method: value.match_method.into(),
            match_threshold: value.match_threshold,
            confirm_method: value.confirm_method.into(),
            confirm_threshold: value.confirm_threshold,
            erode_passes: value.erode_passes,
            pyramid_levels: value.pyramid_levels,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MotionConfigJson {
    mask_path: Option<String>,
    noise_threshold: f32,
    /// `"N"` or `"M/N"`.
    consecutive_frames: String,
}

impl Default for MotionConfigJson {
    fn default() -> Self {
        let params = MotionParameters::default();
        Self {
            mask_path: None,
            noise_threshold: params.noise_threshold,
            consecutive_frames: params.consecutive_frames.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
struct RegionJson {
    x: i64,
    y: i64,
    width: u32,
    height: u32,
}

impl RegionJson {
    fn to_region(self) -> Result<Region, Box<dyn std::error::Error>> {
        Region::new(self.x, self.y, self.width, self.height)
            .ok_or_else(|| "region width and height must be non-zero".into())
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    mode: Mode,
    template_path: String,
    frame_paths: Vec<String>,
    /// Frame rate used for timestamps and, with `realtime`, for pacing.
    fps: f64,
    realtime: bool,
    timeout_secs: f64,
    region: Option<RegionJson>,
    consecutive_matches: usize,
    debug_dir: Option<String>,
    output_path: Option<String>,
    #[serde(rename = "match")]
    match_cfg: MatchConfigJson,
    motion: MotionConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            template_path: String::new(),
            frame_paths: Vec::new(),
            fps: 25.0,
            realtime: false,
            timeout_secs: 10.0,
            region: None,
            consecutive_matches: 1,
            debug_dir: None,
            output_path: None,
            match_cfg: MatchConfigJson::default(),
            motion: MotionConfigJson::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RegionRecord {
    x: i64,
    y: i64,
    width: i64,
    height: i64,
}

impl From<Region> for RegionRecord {
    fn from(value: Region) -> Self {
        Self {
            x: value.x(),
            y: value.y(),
            width: value.width(),
            height: value.height(),
        }
    }
}

#[derive(Debug, Serialize)]
struct MatchRecord {
    matched: bool,
    region: RegionRecord,
    certainty: f32,
    timestamp: f64,
    template: String,
}

impl From<MatchResult> for MatchRecord {
    fn from(value: MatchResult) -> Self {
        Self {
            matched: value.matched,
            region: value.region.into(),
            certainty: value.first_pass_certainty,
            timestamp: value.timestamp,
            template: value.template,
        }
    }
}

#[derive(Debug, Serialize)]
struct MotionRecord {
    motion: bool,
    region: Option<RegionRecord>,
    timestamp: f64,
}

impl From<MotionResult> for MotionRecord {
    fn from(value: MotionResult) -> Self {
        Self {
            motion: value.motion,
            region: value.region.map(RegionRecord::from),
            timestamp: value.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
struct Failure {
    kind: &'static str,
    message: String,
    last_frame_timestamp: f64,
}

impl Failure {
    /// Describes a timeout; any other error is not a test verdict.
    fn from_error(err: &FrameMatchError) -> Option<Self> {
        let (kind, screenshot) = match err {
            FrameMatchError::MatchTimeout(t) => ("match-timeout", &t.screenshot),
            FrameMatchError::MotionTimeout(t) => ("motion-timeout", &t.screenshot),
            FrameMatchError::WaitTimeout(t) => ("wait-timeout", &t.screenshot),
            _ => return None,
        };
        Some(Self {
            kind,
            message: err.to_string(),
            last_frame_timestamp: screenshot.timestamp(),
        })
    }
}

#[derive(Debug, Serialize)]
struct Output {
    mode: &'static str,
    passed: bool,
    matches: Vec<MatchRecord>,
    motion: Option<MotionRecord>,
    failure: Option<Failure>,
}

impl Output {
    fn new(mode: Mode) -> Self {
        Self {
            mode: mode.as_str(),
            passed: false,
            matches: Vec::new(),
            motion: None,
            failure: None,
        }
    }

    fn fail(mut self, err: FrameMatchError) -> Result<Self, Box<dyn std::error::Error>> {
        match Failure::from_error(&err) {
            Some(failure) => {
                self.failure = Some(failure);
                Ok(self)
            }
            None => Err(err.into()),
        }
    }
}

fn load_frames(config: &Config) -> Result<Vec<Frame>, Box<dyn std::error::Error>> {
    if !config.fps.is_finite() || config.fps <= 0.0 {
        return Err("fps must be a positive number".into());
    }
    let mut frames = Vec::with_capacity(config.frame_paths.len());
    for (i, path) in config.frame_paths.iter().enumerate() {
        frames.push(load_frame(path)?.with_timestamp(i as f64 / config.fps));
    }
    Ok(frames)
}

fn load_template(config: &Config) -> Result<Template, Box<dyn std::error::Error>> {
    if config.template_path.is_empty() {
        return Err(format!("template_path must be set for mode {}", config.mode.as_str()).into());
    }
    Ok(Template::load(&config.template_path)?)
}

fn run(config: Config) -> Result<Output, Box<dyn std::error::Error>> {
    let frames = load_frames(&config)?;
    tracing::info!(frames = frames.len(), mode = config.mode.as_str(), "loaded frames");

    let region = match config.region {
        Some(region) => region.to_region()?,
        None => Region::ALL,
    };
    let sink: Option<Arc<dyn DebugSink>> = config
        .debug_dir
        .as_ref()
        .map(|dir| Arc::new(DiskSink::new(dir)) as Arc<dyn DebugSink>);
    let mut output = Output::new(config.mode);

    match config.mode {
        Mode::Match | Mode::MatchAll => {
            let template = load_template(&config)?;
            let matcher = Matcher::new(&template, config.match_cfg.into())?;
            for (i, frame) in frames.iter().enumerate() {
                let scoped = sink
                    .as_deref()
                    .map(|s| Scoped::new(s, format!("frame{i:05}")));
                let scoped = scoped.as_ref().map(|s| s as &dyn DebugSink);
                if matches!(config.mode, Mode::Match) {
                    let result = matcher.match_frame_with(frame, &region, scoped)?;
                    output.passed |= result.matched;
                    output.matches.push(result.into());
                } else {
                    let found = matcher.match_all_with(frame, &region, scoped)?;
                    output.passed |= !found.is_empty();
                    output.matches.extend(found.into_iter().map(MatchRecord::from));
                }
            }
            Ok(output)
        }
        Mode::WaitForMatch => {
            let template = load_template(&config)?;
            let params: MatchParameters = config.match_cfg.into();
            let mut harness = harness(frames, config.realtime, config.fps, sink)?;
            match harness.wait_for_match_in(
                &template,
                config.timeout_secs,
                &params,
                &region,
                config.consecutive_matches,
            ) {
                Ok(result) => {
                    output.passed = true;
                    output.matches.push(result.into());
                    Ok(output)
                }
                Err(err) => output.fail(err),
            }
        }
        Mode::WaitForMotion => {
            let params = MotionParameters {
                noise_threshold: config.motion.noise_threshold,
                consecutive_frames: config.motion.consecutive_frames.parse::<ConsecutiveFrames>()?,
            };
            let mask = config.motion.mask_path.as_ref().map(Mask::load).transpose()?;
            let mut harness = harness(frames, config.realtime, config.fps, sink)?;
            match harness.wait_for_motion_in(mask.as_ref(), config.timeout_secs, &params, &region) {
                Ok(result) => {
                    output.passed = true;
                    output.motion = Some(result.into());
                    Ok(output)
                }
                Err(err) => output.fail(err),
            }
        }
    }
}

/// Replays `frames` as a stream, optionally at their real frame rate.
fn harness(
    frames: Vec<Frame>,
    realtime: bool,
    fps: f64,
    sink: Option<Arc<dyn DebugSink>>,
) -> Result<Harness<Box<dyn FrameSource>>, Box<dyn std::error::Error>> {
    let replay = IterSource::new(frames);
    let source: Box<dyn FrameSource> = if realtime {
        Box::new(Paced::with_fps(replay, fps)?)
    } else {
        Box::new(replay)
    };
    let harness = Harness::new(source);
    Ok(match sink {
        Some(sink) => harness.with_debug_sink(sink),
        None => harness,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("framematch=info".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.frame_paths.is_empty() {
        return Err("frame_paths must list at least one frame".into());
    }
    let output_path = config.output_path.clone();

    let output = run(config)?;
    let passed = output.passed;
    let json = serde_json::to_string_pretty(&output)?;
    match output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}

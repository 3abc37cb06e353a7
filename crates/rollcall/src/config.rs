use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory of enrolled face images (default: ./dataset).
    pub dataset_dir: PathBuf,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Maximum (exclusive) embedding distance for a match.
    pub tolerance: f32,
    /// Minimum time between two greetings for the same person.
    pub cooldown: Duration,
    /// Period of the capture/process/render tick.
    pub tick_interval: Duration,
    /// Camera indices tried in order when starting capture.
    pub camera_indices: Vec<u32>,
    /// Whether frames are flipped horizontally before processing.
    pub mirror: bool,
    /// Speech program; `None` disables spoken announcements.
    pub tts_program: Option<String>,
    /// Arguments placed before the text to speak.
    pub tts_args: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("dataset"),
            model_dir: rollcall_core::default_model_dir(),
            tolerance: rollcall_core::DEFAULT_TOLERANCE,
            cooldown: crate::policy::DEFAULT_COOLDOWN,
            tick_interval: Duration::from_millis(15),
            camera_indices: vec![0, 1],
            mirror: true,
            tts_program: Some("espeak-ng".to_string()),
            tts_args: vec!["-s".to_string(), "150".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup; unset or unparseable keys keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let lookup = &lookup;

        Self {
            dataset_dir: lookup("ROLLCALL_DATASET_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.dataset_dir),
            model_dir: lookup("ROLLCALL_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            tolerance: parsed(lookup, "ROLLCALL_TOLERANCE").unwrap_or(defaults.tolerance),
            cooldown: parsed(lookup, "ROLLCALL_COOLDOWN_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cooldown),
            tick_interval: parsed(lookup, "ROLLCALL_TICK_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_interval),
            camera_indices: lookup("ROLLCALL_CAMERA_INDICES")
                .and_then(|v| parse_indices(&v))
                .unwrap_or(defaults.camera_indices),
            mirror: lookup("ROLLCALL_MIRROR")
                .map(|v| v.trim() != "0")
                .unwrap_or(defaults.mirror),
            tts_program: match lookup("ROLLCALL_TTS_PROGRAM") {
                Some(p) if p.trim().is_empty() || p.trim().eq_ignore_ascii_case("none") => None,
                Some(p) => Some(p.trim().to_string()),
                None => defaults.tts_program,
            },
            tts_args: lookup("ROLLCALL_TTS_ARGS")
                .map(|v| v.split_whitespace().map(str::to_string).collect())
                .unwrap_or(defaults.tts_args),
        }
    }

    /// Path to the SCRFD detection model.
    pub fn scrfd_model_path(&self) -> String {
        self.model_dir
            .join(rollcall_core::SCRFD_MODEL_FILE)
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the ArcFace recognition model.
    pub fn arcface_model_path(&self) -> String {
        self.model_dir
            .join(rollcall_core::ARCFACE_MODEL_FILE)
            .to_string_lossy()
            .into_owned()
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

/// Parse `"0,1"` into `[0, 1]`; `None` if any entry is invalid or the list is empty.
fn parse_indices(value: &str) -> Option<Vec<u32>> {
    let indices: Vec<u32> = value
        .split(',')
        .map(|part| part.trim().parse().ok())
        .collect::<Option<_>>()?;
    (!indices.is_empty()).then_some(indices)
}

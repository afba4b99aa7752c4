use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub pose: PoseConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Signal pipeline tuning. Thresholds are in pixels of the decoded frame.
#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Analyse every Nth decoded frame
    #[serde(default = "default_stride")]
    pub stride: usize,
    /// Used when the container reports no usable frame rate
    #[serde(default = "default_fallback_fps")]
    pub fallback_fps: f64,
    /// Below this many valid frames the result is all zeros
    #[serde(default = "default_min_frames")]
    pub min_frames: usize,
    /// Half-width of the local-minimum window, in samples
    #[serde(default = "default_peak_window")]
    pub peak_window: usize,
    /// Mean wrist speed (px/sample) a minimum needs to count as a jump
    #[serde(default = "default_wrist_speed_gate")]
    pub wrist_speed_gate: f64,
    /// Minimum real-time separation between counted jumps
    #[serde(default = "default_min_gap_seconds")]
    pub min_gap_seconds: f64,
    /// Percentile of each ankle track taken as ground level
    #[serde(default = "default_ground_percentile")]
    pub ground_percentile: f64,
    /// Uncalibrated pixel -> centimetre factor
    #[serde(default = "default_cm_per_px")]
    pub cm_per_px: f64,
    /// Mean wrist speed under which counted jumps are suspected misses
    #[serde(default = "default_miss_speed_threshold")]
    pub miss_speed_threshold: f64,
    /// Wall-clock budget for one analysis; no limit when absent
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_stride() -> usize { 3 }
fn default_fallback_fps() -> f64 { 30.0 }
fn default_min_frames() -> usize { 10 }
fn default_peak_window() -> usize { 3 }
fn default_wrist_speed_gate() -> f64 { 2.0 }
fn default_min_gap_seconds() -> f64 { 0.3 }
fn default_ground_percentile() -> f64 { 90.0 }
fn default_cm_per_px() -> f64 { 0.1 }
fn default_miss_speed_threshold() -> f64 { 1.0 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            stride: default_stride(),
            fallback_fps: default_fallback_fps(),
            min_frames: default_min_frames(),
            peak_window: default_peak_window(),
            wrist_speed_gate: default_wrist_speed_gate(),
            min_gap_seconds: default_min_gap_seconds(),
            ground_percentile: default_ground_percentile(),
            cm_per_px: default_cm_per_px(),
            miss_speed_threshold: default_miss_speed_threshold(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PoseConfig {
    /// YOLOv8-pose ONNX model
    #[serde(default = "default_model_path")]
    pub model_path: String,
    /// Square model input edge (px)
    #[serde(default = "default_input_size")]
    pub input_size: i32,
    /// Minimum person score for a detection
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
    /// Landmarks under this visibility are zeroed
    #[serde(default = "default_keypoint_threshold")]
    pub keypoint_threshold: f32,
}

fn default_model_path() -> String { "models/yolov8n-pose.onnx".to_string() }
fn default_input_size() -> i32 { 640 }
fn default_score_threshold() -> f32 { 0.25 }
fn default_keypoint_threshold() -> f32 { 0.5 }

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            input_size: default_input_size(),
            score_threshold: default_score_threshold(),
            keypoint_threshold: default_keypoint_threshold(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// HTTP bind address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// JSON file holding accounts and stats
    #[serde(default = "default_store_path")]
    pub store_path: String,
    /// CORS origins allowed with credentials
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Directory for server_<timestamp>.log
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    /// Largest accepted upload
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_listen_addr() -> String { "0.0.0.0:8000".to_string() }
fn default_store_path() -> String { "data.json".to_string() }
fn default_allowed_origins() -> Vec<String> { vec!["http://localhost:3000".to_string()] }
fn default_log_dir() -> String { "logs".to_string() }
fn default_max_upload_bytes() -> usize { 200 * 1024 * 1024 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            store_path: default_store_path(),
            allowed_origins: default_allowed_origins(),
            log_dir: default_log_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing or broken file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{e:#}; using default configuration");
                Self::default()
            }
        }
    }
}

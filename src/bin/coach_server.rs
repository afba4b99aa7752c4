//! HTTP front end: video upload analysis, per-user stats and accounts.
//!
//! Thin layer over `skipcount::Coach`; wire format matches the web client.

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use skipcount::config::{Config, ServerConfig};
use skipcount::ledger::SessionRecord;
use skipcount::pose::YoloPoseDetector;
use skipcount::video::OpenCvVideo;
use skipcount::{AnalysisResult, Analyzer, Coach, CoachError, JsonStore, LedgerError, UserBucket};

const CONFIG_PATH: &str = "coach_server.toml";
const USER_HEADER: &str = "x-user-id";
const DEFAULT_USER: &str = "default";

type AppCoach = Coach<YoloPoseDetector, JsonStore>;

// ===========================================================================
// Logging
// ===========================================================================

/// stderr plus `<log_dir>/server_<timestamp>.log`. Returns the log file path.
fn init_logging(log_dir: &str) -> Result<String> {
    std::fs::create_dir_all(log_dir)?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = format!("{}/server_{}.log", log_dir, ts);
    let file = std::fs::File::create(&path).with_context(|| format!("failed to create {path}"))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .init();

    Ok(path)
}

// ===========================================================================
// Errors
// ===========================================================================

struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn analyze(e: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: format!("Analyze failed: {e}"),
        }
    }
}

impl From<CoachError> for ApiError {
    fn from(e: CoachError) -> Self {
        match e {
            CoachError::Ledger(e) => e.into(),
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: other.to_string(),
            },
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::AuthenticationFailed => Self {
                status: StatusCode::UNAUTHORIZED,
                detail: "用户不存在或密码错误".to_string(),
            },
            LedgerError::UsernameTaken(_) => Self {
                status: StatusCode::BAD_REQUEST,
                detail: "用户名已存在".to_string(),
            },
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: other.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{}", self.detail);
        } else {
            tracing::warn!("{}", self.detail);
        }
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}

// ===========================================================================
// Request / response bodies
// ===========================================================================

#[derive(Debug, Serialize, PartialEq)]
struct StatsResponse {
    total_count: u64,
    achievements: Vec<String>,
    sessions: Vec<SessionRecord>,
}

impl From<UserBucket> for StatsResponse {
    fn from(bucket: UserBucket) -> Self {
        Self {
            total_count: bucket.total_count,
            achievements: bucket.achievements.into_iter().collect(),
            sessions: bucket.sessions,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    user_id: String,
}

fn user_id(headers: &HeaderMap) -> String {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_USER)
        .to_string()
}

/// Keep the upload's extension so the decoder can sniff the container.
fn upload_suffix(file_name: Option<&str>) -> String {
    file_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default()
}

/// Write `bytes` to a temp file and hand its path to `f`.
/// The file is removed when this returns, on success or error.
fn spool_and_run<T>(suffix: &str, bytes: &[u8], f: impl FnOnce(&Path) -> Result<T>) -> Result<T> {
    let mut tmp = tempfile::Builder::new()
        .prefix("skipcount_")
        .suffix(suffix)
        .tempfile()
        .context("failed to create upload spool file")?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    f(tmp.path())
}

// ===========================================================================
// Handlers
// ===========================================================================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

async fn analyze(
    State(coach): State<Arc<AppCoach>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResult>, ApiError> {
    let user = user_id(&headers);

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(ApiError::analyze)? {
        if field.name() == Some("file") {
            let suffix = upload_suffix(field.file_name());
            let bytes = field.bytes().await.map_err(ApiError::analyze)?;
            upload = Some((suffix, bytes));
            break;
        }
    }
    let (suffix, bytes) = upload.ok_or_else(|| ApiError::analyze("missing multipart field `file`"))?;
    tracing::info!("[analyze] user={} upload={} bytes", user, bytes.len());

    let outcome = tokio::task::spawn_blocking(move || {
        spool_and_run(&suffix, &bytes, |path| {
            let video = OpenCvVideo::open(path)?;
            Ok(coach.analyze_and_record(&user, video)?)
        })
    })
    .await
    .map_err(ApiError::analyze)?
    .map_err(ApiError::analyze)?;

    Ok(Json(outcome.result))
}

async fn stats(
    State(coach): State<Arc<AppCoach>>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, ApiError> {
    let bucket = coach.stats(&user_id(&headers))?;
    Ok(Json(bucket.into()))
}

async fn reset_stats(
    State(coach): State<Arc<AppCoach>>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, ApiError> {
    let user = user_id(&headers);
    let bucket = coach.reset(&user)?;
    tracing::info!("[stats] reset for {}", user);
    Ok(Json(bucket.into()))
}

async fn login(
    State(coach): State<Arc<AppCoach>>,
    Json(req): Json<Credentials>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user_id = coach.ledger().login(&req.username, &req.password)?;
    Ok(Json(LoginResponse { user_id }))
}

async fn register(
    State(coach): State<Arc<AppCoach>>,
    Json(req): Json<Credentials>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user_id = coach.ledger().register(&req.username, &req.password)?;
    tracing::info!("[accounts] registered {}", user_id);
    Ok(Json(LoginResponse { user_id }))
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

fn router(coach: Arc<AppCoach>, server: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/analyze", post(analyze))
        .route("/stats", get(stats))
        .route("/stats/reset", post(reset_stats))
        .route("/login", post(login))
        .route("/register", post(register))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(cors_layer(server))
        .with_state(coach)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_PATH.to_string());
    let (config, config_error) = match Config::load(&config_path) {
        Ok(c) => (c, None),
        Err(e) => (Config::default(), Some(e)),
    };
    let log_path = init_logging(&config.server.log_dir)?;

    tracing::info!("Coach Server ({})", env!("GIT_VERSION"));
    tracing::info!("Log: {}", log_path);
    if let Some(e) = config_error {
        tracing::warn!("{e:#}; using default configuration");
    }
    tracing::info!("Stride: {} | Model: {}", config.analysis.stride, config.pose.model_path);

    let detector = YoloPoseDetector::from_config(&config.pose)?;
    tracing::info!("Pose model loaded");

    let store = JsonStore::open(&config.server.store_path)
        .with_context(|| format!("failed to open store {}", config.server.store_path))?;
    tracing::info!("Store: {}", store.path().display());

    let coach = Arc::new(Coach::new(
        Analyzer::new(config.analysis.clone()),
        detector,
        store,
    ));
    let app = router(coach, &config.server);

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen_addr))?;
    tracing::info!("Listening on {}", config.server.listen_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_header_defaults() {
        let mut headers = HeaderMap::new();
        assert_eq!(user_id(&headers), "default");

        headers.insert(USER_HEADER, HeaderValue::from_static("  "));
        assert_eq!(user_id(&headers), "default");

        headers.insert(USER_HEADER, HeaderValue::from_static("alice"));
        assert_eq!(user_id(&headers), "alice");
    }

    #[test]
    fn test_upload_suffix() {
        assert_eq!(upload_suffix(Some("clip.mp4")), ".mp4");
        assert_eq!(upload_suffix(Some("clip")), "");
        assert_eq!(upload_suffix(None), "");
    }

    #[test]
    fn test_ledger_errors_map_to_status() {
        let auth: ApiError = LedgerError::AuthenticationFailed.into();
        assert_eq!(auth.status, StatusCode::UNAUTHORIZED);

        let taken: ApiError = LedgerError::UsernameTaken("alice".into()).into();
        assert_eq!(taken.status, StatusCode::BAD_REQUEST);

        let analyze = ApiError::analyze("cannot open video x.mp4");
        assert_eq!(analyze.status, StatusCode::BAD_REQUEST);
        assert_eq!(analyze.detail, "Analyze failed: cannot open video x.mp4");
    }

    #[test]
    fn test_spooled_upload_removed_on_error() {
        let mut seen = None;
        let err = spool_and_run::<()>(".mp4", b"not a video", |path| {
            assert_eq!(std::fs::read(path).unwrap(), b"not a video");
            assert!(path.to_string_lossy().ends_with(".mp4"));
            seen = Some(path.to_path_buf());
            anyhow::bail!("cannot open video {}", path.display())
        })
        .unwrap_err();

        let path = seen.unwrap();
        assert!(!path.exists());

        let api = ApiError::analyze(format!("{err:#}"));
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert!(api.detail.starts_with("Analyze failed: cannot open video"));
    }

    #[test]
    fn test_spooled_upload_removed_on_success() {
        let mut seen = None;
        let len = spool_and_run("", b"abc", |path| {
            seen = Some(path.to_path_buf());
            Ok(std::fs::metadata(path)?.len())
        })
        .unwrap();

        assert_eq!(len, 3);
        assert!(!seen.unwrap().exists());
    }

    #[test]
    fn test_stats_response_from_bucket() {
        let mut bucket = UserBucket::default();
        bucket.total_count = 7;
        bucket.achievements.insert("初级跳绳达人".to_string());
        let resp: StatsResponse = bucket.into();
        assert_eq!(resp.total_count, 7);
        assert_eq!(resp.achievements, vec!["初级跳绳达人".to_string()]);
        assert!(resp.sessions.is_empty());
    }
}

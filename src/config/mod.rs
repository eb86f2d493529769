use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Face swapper models FaceFusion ships with.
pub const DEFAULT_ALLOWED_MODELS: &[&str] = &[
    "blendswap_256",
    "ghost_1_256",
    "ghost_2_256",
    "ghost_3_256",
    "hififace_unofficial_256",
    "hyperswap_1a_256",
    "hyperswap_1b_256",
    "hyperswap_1c_256",
    "inswapper_128",
    "inswapper_128_fp16",
    "simswap_256",
    "simswap_unofficial_512",
    "uniface_256",
];

/// Selector modes understood by FaceFusion's face selector.
pub const FACE_SELECTOR_MODES: &[&str] = &["many", "one", "reference"];

/// Which invocation strategy backs `/swap-face`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapBackend {
    /// Spawn the FaceFusion CLI per request.
    Process,
    /// Call FaceFusion's Python API in-process.
    Library,
}

impl SwapBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "process" | "cli" | "subprocess" => Some(Self::Process),
            "library" | "lib" | "python" => Some(Self::Library),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::Library => "library",
        }
    }
    /// Model used when neither the request nor FACE_SWAPPER_MODEL picks one.
    /// The in-process engine runs the half-precision weights.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Process => "inswapper_128",
            Self::Library => "inswapper_128_fp16",
        }
    }
}

/// Runtime configuration for the face swap service
#[derive(Debug, Clone)]
pub struct SwapConfig {
    /// Invocation strategy (default: process)
    pub backend: SwapBackend,

    /// Scratch directory for staged uploads and results (default: "uploads")
    pub upload_dir: PathBuf,

    /// Program plus leading arguments used to launch FaceFusion
    /// (default: "python3 facefusion.py")
    pub facefusion_command: Vec<String>,

    /// Working directory for the FaceFusion process and Python import root (default: ".")
    pub facefusion_dir: PathBuf,

    /// Model used when a request does not pick one
    /// (default: "inswapper_128", "inswapper_128_fp16" for the library backend)
    pub default_model: String,

    /// Selector mode used when a request does not pick one (default: "one")
    pub default_selector_mode: String,

    /// Models a request may ask for
    pub allowed_models: Vec<String>,

    /// Upper bound on a single FaceFusion process run (default: 300s)
    pub process_timeout: Duration,

    /// Maximum request body in bytes (default: 64 MB)
    pub max_body_size: usize,

    /// HTML page served at `/` (default: "static/index.html")
    pub static_index: PathBuf,

    /// Scratch files older than this are removed by the sweeper (default: 1h)
    pub scratch_max_age: Duration,

    /// How often the sweeper runs (default: 10m)
    pub scratch_sweep_interval: Duration,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            backend: SwapBackend::Process,
            upload_dir: PathBuf::from("uploads"),
            facefusion_command: vec!["python3".to_string(), "facefusion.py".to_string()],
            facefusion_dir: PathBuf::from("."),
            default_model: SwapBackend::Process.default_model().to_string(),
            default_selector_mode: "one".to_string(),
            allowed_models: DEFAULT_ALLOWED_MODELS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            process_timeout: Duration::from_secs(300),
            max_body_size: 64 * 1024 * 1024, // 64 MB
            static_index: PathBuf::from("static/index.html"),
            scratch_max_age: Duration::from_secs(3600),
            scratch_sweep_interval: Duration::from_secs(600),
        }
    }
}

impl SwapConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();
        let backend = env::var("SWAP_BACKEND")
            .ok()
            .and_then(|v| SwapBackend::parse(&v))
            .unwrap_or(default.backend);

        Self {
            backend,

            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            facefusion_command: env::var("FACEFUSION_COMMAND")
                .ok()
                .map(|v| split_command(&v))
                .filter(|c| !c.is_empty())
                .unwrap_or(default.facefusion_command),

            facefusion_dir: env::var("FACEFUSION_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.facefusion_dir),

            default_model: env::var("FACE_SWAPPER_MODEL")
                .unwrap_or_else(|_| backend.default_model().to_string()),

            default_selector_mode: env::var("FACE_SELECTOR_MODE")
                .unwrap_or(default.default_selector_mode),

            allowed_models: env::var("ALLOWED_MODELS")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<_>>()
                })
                .filter(|m| !m.is_empty())
                .unwrap_or(default.allowed_models),

            process_timeout: env::var("PROCESS_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.process_timeout),

            max_body_size: env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_body_size),

            static_index: env::var("STATIC_INDEX")
                .map(PathBuf::from)
                .unwrap_or(default.static_index),

            scratch_max_age: env::var("SCRATCH_MAX_AGE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.scratch_max_age),

            scratch_sweep_interval: env::var("SCRATCH_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.scratch_sweep_interval),
        }
    }

    /// Switches backend. A default model that was not set explicitly follows
    /// the new backend's default.
    pub fn set_backend(&mut self, backend: SwapBackend) {
        if self.default_model == self.backend.default_model() {
            self.default_model = backend.default_model().to_string();
        }
        self.backend = backend;
    }

    /// Whether a request may select this model.
    pub fn is_allowed_model(&self, model: &str) -> bool {
        self.allowed_models.iter().any(|m| m == model)
    }
}

/// Splits a command line on whitespace. Quoting is not supported.
pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(|s| s.to_string()).collect()
}

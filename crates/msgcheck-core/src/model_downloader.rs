//! ML model and runtime downloader.
//!
//! Fetches the ONNX Runtime shared library and the toxicity and sentiment
//! model bundles into the platform data directory.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;

use crate::classifier::ModelPaths;

/// Download progress callback type (uses Arc for Clone support).
pub type ProgressCallback = Arc<dyn Fn(DownloadProgress) + Send + Sync>;

/// Download progress information.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    /// Current step description.
    pub step: String,
    /// Bytes downloaded so far.
    pub downloaded: u64,
    /// Total bytes to download (if known).
    pub total: Option<u64>,
    /// Whether the step is complete.
    pub complete: bool,
}

impl DownloadProgress {
    /// Creates a new progress update.
    pub fn new(step: &str, downloaded: u64, total: Option<u64>) -> Self {
        Self {
            step: step.to_string(),
            downloaded,
            total,
            complete: false,
        }
    }

    /// Creates a completion progress.
    pub fn complete(step: &str) -> Self {
        Self {
            step: step.to_string(),
            downloaded: 0,
            total: None,
            complete: true,
        }
    }

    /// Returns progress as a percentage (0-100).
    pub fn percentage(&self) -> Option<u8> {
        self.total.map(|t| {
            if t == 0 {
                100
            } else {
                ((self.downloaded as f64 / t as f64) * 100.0).min(100.0) as u8
            }
        })
    }
}

/// Error types for model downloading.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive extraction error: {0}")]
    Archive(String),

    #[error("Not available: {0}")]
    NotFound(String),
}

/// ONNX Runtime download URL for Windows x64.
#[cfg(all(target_os = "windows", target_arch = "x86_64"))]
const ONNX_RUNTIME_URL: &str = "https://github.com/microsoft/onnxruntime/releases/download/v1.23.2/onnxruntime-win-x64-1.23.2.zip";

/// ONNX Runtime download URL for Linux x64.
#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
const ONNX_RUNTIME_URL: &str = "https://github.com/microsoft/onnxruntime/releases/download/v1.23.2/onnxruntime-linux-x64-1.23.2.tgz";

/// ONNX Runtime download URL for macOS ARM64.
#[cfg(all(target_os = "macos", target_arch = "aarch64"))]
const ONNX_RUNTIME_URL: &str = "https://github.com/microsoft/onnxruntime/releases/download/v1.23.2/onnxruntime-osx-arm64-1.23.2.tgz";

#[cfg(not(any(
    all(target_os = "windows", target_arch = "x86_64"),
    all(target_os = "linux", target_arch = "x86_64"),
    all(target_os = "macos", target_arch = "aarch64"),
)))]
const ONNX_RUNTIME_URL: &str = "";

/// Hugging Face repository with an ONNX export of `unitary/toxic-bert`.
pub const TOXICITY_REPO: &str = "Xenova/toxic-bert";

/// Hugging Face repository with an ONNX export of the Twitter RoBERTa sentiment model.
pub const SENTIMENT_REPO: &str = "Xenova/twitter-roberta-base-sentiment-latest";

/// Which model bundle to operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Toxicity,
    Sentiment,
}

impl ModelKind {
    /// Directory name under the models directory.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ModelKind::Toxicity => "toxicity",
            ModelKind::Sentiment => "sentiment",
        }
    }

    /// Source repository on Hugging Face.
    pub fn repo(&self) -> &'static str {
        match self {
            ModelKind::Toxicity => TOXICITY_REPO,
            ModelKind::Sentiment => SENTIMENT_REPO,
        }
    }
}

/// Remote file name within a repo, paired with its local file name.
const BUNDLE_FILES: &[(&str, &str)] = &[
    ("onnx/model.onnx", "model.onnx"),
    ("tokenizer.json", "tokenizer.json"),
    ("config.json", "config.json"),
];

/// Builds the download URL for a file in a Hugging Face repo.
pub fn hf_file_url(repo: &str, file: &str) -> String {
    format!("https://huggingface.co/{}/resolve/main/{}", repo, file)
}

/// Model downloader for ONNX Runtime and the classifier models.
pub struct ModelDownloader {
    /// Directory for models.
    models_dir: PathBuf,
    /// Directory for runtime libraries.
    lib_dir: PathBuf,
}

impl ModelDownloader {
    /// Creates a downloader rooted at the platform data directory.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "msgcheck", "MsgCheck")?;
        Some(Self::with_data_dir(project_dirs.data_dir()))
    }

    /// Creates a downloader rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            models_dir: data_dir.join("models"),
            lib_dir: data_dir.join("lib"),
        }
    }

    /// Overrides the models directory.
    pub fn with_models_dir(mut self, models_dir: impl Into<PathBuf>) -> Self {
        self.models_dir = models_dir.into();
        self
    }

    /// Returns the models directory path.
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Returns the lib directory path.
    pub fn lib_dir(&self) -> &Path {
        &self.lib_dir
    }

    /// Returns the path to the ONNX Runtime library.
    #[cfg(target_os = "windows")]
    pub fn onnx_runtime_path(&self) -> PathBuf {
        self.lib_dir.join("onnxruntime.dll")
    }

    #[cfg(target_os = "linux")]
    pub fn onnx_runtime_path(&self) -> PathBuf {
        self.lib_dir.join("libonnxruntime.so")
    }

    #[cfg(target_os = "macos")]
    pub fn onnx_runtime_path(&self) -> PathBuf {
        self.lib_dir.join("libonnxruntime.dylib")
    }

    /// Returns the bundle paths for a model.
    pub fn model_paths(&self, kind: ModelKind) -> ModelPaths {
        ModelPaths::in_dir(self.models_dir.join(kind.dir_name()))
    }

    /// Checks if ONNX Runtime is installed.
    pub fn is_onnx_runtime_installed(&self) -> bool {
        self.onnx_runtime_path().exists()
    }

    /// Checks if a model bundle is installed.
    pub fn is_model_installed(&self, kind: ModelKind) -> bool {
        self.model_paths(kind).is_complete()
    }

    /// Reports which dependencies are present.
    pub fn status(&self) -> MlStatus {
        let has_runtime = self.is_onnx_runtime_installed();
        let has_models = self.is_model_installed(ModelKind::Toxicity)
            && self.is_model_installed(ModelKind::Sentiment);

        match (has_runtime, has_models) {
            (true, true) => MlStatus::Ready,
            (false, true) => MlStatus::MissingRuntime,
            (true, false) => MlStatus::MissingModels,
            (false, false) => MlStatus::MissingAll,
        }
    }

    /// Downloads ONNX Runtime if not already installed.
    pub async fn ensure_onnx_runtime(
        &self,
        progress: Option<ProgressCallback>,
    ) -> Result<PathBuf, DownloadError> {
        if self.is_onnx_runtime_installed() {
            if let Some(ref cb) = progress {
                cb(DownloadProgress::complete("ONNX Runtime already installed"));
            }
            return Ok(self.onnx_runtime_path());
        }

        self.download_onnx_runtime(progress).await
    }

    /// Downloads a model bundle if not already installed.
    pub async fn ensure_model(
        &self,
        kind: ModelKind,
        progress: Option<ProgressCallback>,
    ) -> Result<ModelPaths, DownloadError> {
        let paths = self.model_paths(kind);
        if paths.is_complete() {
            if let Some(ref cb) = progress {
                cb(DownloadProgress::complete(&format!(
                    "{} model already installed",
                    kind.dir_name()
                )));
            }
            return Ok(paths);
        }

        self.download_model(kind, progress).await
    }

    /// Ensures the runtime and both models are installed.
    pub async fn ensure_all(&self, progress: Option<ProgressCallback>) -> Result<(), DownloadError> {
        self.ensure_onnx_runtime(progress.clone()).await?;
        self.ensure_model(ModelKind::Toxicity, progress.clone())
            .await?;
        self.ensure_model(ModelKind::Sentiment, progress).await?;
        Ok(())
    }

    async fn fetch(url: &str) -> Result<(Vec<u8>, Option<u64>), DownloadError> {
        let response = reqwest::get(url)
            .await
            .map_err(|e| DownloadError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DownloadError::Network(format!(
                "HTTP error {} for {}",
                response.status(),
                url
            )));
        }

        let total_size = response.content_length();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DownloadError::Network(e.to_string()))?;

        Ok((bytes.to_vec(), total_size))
    }

    /// Downloads ONNX Runtime.
    async fn download_onnx_runtime(
        &self,
        progress: Option<ProgressCallback>,
    ) -> Result<PathBuf, DownloadError> {
        if ONNX_RUNTIME_URL.is_empty() {
            return Err(DownloadError::NotFound(
                "ONNX Runtime not available for this platform".to_string(),
            ));
        }

        fs::create_dir_all(&self.lib_dir)?;

        if let Some(ref cb) = progress {
            cb(DownloadProgress::new("Downloading ONNX Runtime...", 0, None));
        }

        let (bytes, total_size) = Self::fetch(ONNX_RUNTIME_URL).await?;

        if let Some(ref cb) = progress {
            cb(DownloadProgress::new(
                "Extracting ONNX Runtime...",
                bytes.len() as u64,
                total_size,
            ));
        }

        #[cfg(target_os = "windows")]
        {
            self.extract_zip(&bytes, "onnxruntime.dll")?;
        }

        #[cfg(not(target_os = "windows"))]
        {
            self.extract_tgz(&bytes)?;
        }

        if let Some(ref cb) = progress {
            cb(DownloadProgress::complete("ONNX Runtime installed"));
        }

        Ok(self.onnx_runtime_path())
    }

    /// Downloads every missing file of a model bundle.
    async fn download_model(
        &self,
        kind: ModelKind,
        progress: Option<ProgressCallback>,
    ) -> Result<ModelPaths, DownloadError> {
        let dir = self.models_dir.join(kind.dir_name());
        fs::create_dir_all(&dir)?;

        for (remote, local) in BUNDLE_FILES {
            let dest = dir.join(local);
            if dest.exists() {
                continue;
            }

            let url = hf_file_url(kind.repo(), remote);
            let step = format!("Downloading {} {}...", kind.dir_name(), local);
            if let Some(ref cb) = progress {
                cb(DownloadProgress::new(&step, 0, None));
            }
            tracing::info!("Fetching {}", url);

            let (bytes, total_size) = Self::fetch(&url).await?;

            // Write to a temporary name so a partial download never looks complete
            let partial = dir.join(format!("{}.part", local));
            let mut file = File::create(&partial)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            fs::rename(&partial, &dest)?;

            if let Some(ref cb) = progress {
                cb(DownloadProgress::new(&step, bytes.len() as u64, total_size));
            }
        }

        if let Some(ref cb) = progress {
            cb(DownloadProgress::complete(&format!(
                "{} model installed",
                kind.dir_name()
            )));
        }

        Ok(self.model_paths(kind))
    }

    /// Extracts a DLL from a ZIP archive (Windows).
    #[cfg(target_os = "windows")]
    fn extract_zip(&self, data: &[u8], dll_name: &str) -> Result<(), DownloadError> {
        use std::io::{Cursor, Read};
        use zip::ZipArchive;

        let cursor = Cursor::new(data);
        let mut archive =
            ZipArchive::new(cursor).map_err(|e| DownloadError::Archive(e.to_string()))?;

        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| DownloadError::Archive(e.to_string()))?;

            if file.name().ends_with(dll_name) {
                let dest_path = self.lib_dir.join(dll_name);
                let mut buffer = Vec::new();
                file.read_to_end(&mut buffer)?;
                File::create(&dest_path)?.write_all(&buffer)?;
                return Ok(());
            }
        }

        Err(DownloadError::Archive(format!(
            "{} not found in archive",
            dll_name
        )))
    }

    /// Extracts the runtime library from a tar.gz archive (Linux/macOS).
    #[cfg(not(target_os = "windows"))]
    fn extract_tgz(&self, data: &[u8]) -> Result<(), DownloadError> {
        let lib_name = self
            .onnx_runtime_path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        extract_library_from_tgz(data, &lib_name, &self.lib_dir)
    }

    /// Gets the environment variable name for ONNX Runtime library path.
    pub fn onnx_lib_env_var() -> &'static str {
        "ORT_DYLIB_PATH"
    }

    /// Points ONNX Runtime at the downloaded library, if present.
    pub fn setup_environment(&self) -> bool {
        if self.is_onnx_runtime_installed() {
            let lib_path = self.onnx_runtime_path();
            std::env::set_var(Self::onnx_lib_env_var(), &lib_path);
            tracing::info!("Set {} to {:?}", Self::onnx_lib_env_var(), lib_path);
            true
        } else {
            false
        }
    }
}

/// Copies the first entry whose file name starts with `lib_name` into `dest_dir`.
///
/// Release archives ship versioned names (`libonnxruntime.so.1.23.2`); the
/// copy is stored under the plain `lib_name`.
#[cfg(not(target_os = "windows"))]
fn extract_library_from_tgz(data: &[u8], lib_name: &str, dest_dir: &Path) -> Result<(), DownloadError> {
    use flate2::read::GzDecoder;
    use std::io::Cursor;
    use tar::Archive;

    let mut archive = Archive::new(GzDecoder::new(Cursor::new(data)));

    for entry in archive
        .entries()
        .map_err(|e| DownloadError::Archive(e.to_string()))?
    {
        let mut entry = entry.map_err(|e| DownloadError::Archive(e.to_string()))?;
        if entry.header().entry_type().is_symlink() {
            continue;
        }
        let path = entry
            .path()
            .map_err(|e| DownloadError::Archive(e.to_string()))?;

        if path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with(lib_name))
            .unwrap_or(false)
        {
            let mut dest_file = File::create(dest_dir.join(lib_name))?;
            io::copy(&mut entry, &mut dest_file)?;
            return Ok(());
        }
    }

    Err(DownloadError::Archive(format!(
        "{} not found in archive",
        lib_name
    )))
}

/// Status of ML dependencies.
#[derive(Debug, Clone, PartialEq)]
pub enum MlStatus {
    /// All dependencies are installed and ready.
    Ready,
    /// ONNX Runtime is missing.
    MissingRuntime,
    /// At least one model bundle is missing.
    MissingModels,
    /// Runtime and models are missing.
    MissingAll,
}

impl MlStatus {
    /// Returns true if ML is ready to use.
    pub fn is_ready(&self) -> bool {
        matches!(self, MlStatus::Ready)
    }

    /// Returns a human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            MlStatus::Ready => "Models ready",
            MlStatus::MissingRuntime => "ONNX Runtime not installed",
            MlStatus::MissingModels => "Model bundles not installed",
            MlStatus::MissingAll => "ML dependencies not installed",
        }
    }
}

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::constants::APP_DIR_NAME;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
    #[error("model {0} not found and no download URL is known")]
    NotFound(String),
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Find a model file on disk without touching the network.
///
/// Checks the user cache directory first, then `model_dir` (a configured
/// or bundled directory). Used by backend probing, which must stay cheap.
pub fn locate(name: &str, model_dir: Option<&Path>) -> Option<PathBuf> {
    let cache_dir = model_cache_dir().ok();
    locate_in(cache_dir.as_deref(), model_dir, name)
}

fn locate_in(cache_dir: Option<&Path>, model_dir: Option<&Path>, name: &str) -> Option<PathBuf> {
    [cache_dir, model_dir]
        .into_iter()
        .flatten()
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
}

/// Resolve a model file by name, downloading it into the cache if it is
/// not already present locally.
///
/// Resolution order:
/// 1. User cache directory (platform-specific)
/// 2. `model_dir`
/// 3. Download from `url` to cache
pub fn resolve(
    name: &str,
    url: Option<&str>,
    model_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = locate(name, model_dir) {
        return Ok(path);
    }

    let url = url.ok_or_else(|| ModelResolveError::NotFound(name.to_string()))?;
    let cache_dir = model_cache_dir()?;
    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    let cached_path = cache_dir.join(name);
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/MoodMirror/models/`
/// - Linux: `$XDG_CACHE_HOME/MoodMirror/models/` or `~/.cache/MoodMirror/models/`
/// - Windows: `%LOCALAPPDATA%/MoodMirror/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let download_err = |source| ModelResolveError::Download {
        url: url.to_string(),
        source,
    };
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(download_err)?;

    let total = response.content_length().unwrap_or(0);
    let bytes = response.bytes().map_err(download_err)?;

    // Write to a temp file first, then rename for atomicity
    let temp_path = dest.with_extension("part");
    let write_err = |source| ModelResolveError::Write {
        path: temp_path.clone(),
        source,
    };
    let mut file = fs::File::create(&temp_path).map_err(write_err)?;

    let chunk_size = 1024 * 1024;
    let mut downloaded: u64 = 0;
    for chunk in bytes.chunks(chunk_size) {
        if let Err(e) = file.write_all(chunk) {
            let _ = fs::remove_file(&temp_path);
            return Err(write_err(e));
        }
        downloaded += chunk.len() as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(&temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

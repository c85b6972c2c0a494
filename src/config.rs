// Run configuration. The API key, endpoint, prompt and directories are
// resolved once by `Config::resolve` and handed to each step explicitly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};

use crate::error::{EditError, Result};

pub const API_KEY_VAR: &str = "DASHSCOPE_API_KEY";
pub const BASE_URL_VAR: &str = "DASHSCOPE_BASE_URL";
pub const DEFAULT_BASE_URL: &str =
    "https://dashscope-intl.aliyuncs.com/api/v1/services/aigc/multimodal-generation/generation";

pub const ENV_FILE_NAME: &str = ".env";
pub const PROMPT_FILE_NAME: &str = "Prompt.txt";
pub const INPUT_DIR_NAME: &str = "input";
pub const OUTPUT_DIR_NAME: &str = "output";

/// Image generation is slow; the download of the finished file is not.
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(300);
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

pub const DEFAULT_PROMPT: &str = "Create a MAXIMUM photorealistic image based on the 3D image. \
Add a natural feel to the photograph. Time of day should be sunny. Do not change the shape of the \
furniture or add other furniture or furniture details. High contrast. No blown-out highlights. \
Medium brightness. Natural color correction. Be sure to add soft shadows to objects.

There should be no artificial 3D effect; the photo should be as photorealistic as possible.

Leave everything else as is; do not change anything.

Tags: photorealistic, photo, photorealistic interior, 85mm lens, soft natural lighting, high detail, 4K.";

/// Everything a single edit run needs, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub prompt: String,
    pub workdir: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Explicit input image; skips the directory search when set.
    pub image: Option<PathBuf>,
    pub generation_timeout: Duration,
    pub download_timeout: Duration,
}

impl Config {
    /// Configuration with default endpoint, prompt and directories under
    /// `workdir`.
    pub fn new(workdir: impl Into<PathBuf>, api_key: impl Into<String>) -> Self {
        let workdir = workdir.into();
        Config {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            input_dir: workdir.join(INPUT_DIR_NAME),
            output_dir: workdir.join(OUTPUT_DIR_NAME),
            workdir,
            image: None,
            generation_timeout: GENERATION_TIMEOUT,
            download_timeout: DOWNLOAD_TIMEOUT,
        }
    }

    /// Resolve the credential, endpoint and prompt for `workdir`.
    ///
    /// `env` looks up process environment variables; the binary passes
    /// `std::env::var`, tests pass a fixed map. Fails only when no
    /// credential can be found.
    pub fn resolve<F>(workdir: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_file = read_env_file(&workdir.join(ENV_FILE_NAME));
        let api_key =
            resolve_credential(env_file.as_ref(), &env).ok_or(EditError::MissingCredential)?;

        let mut config = Config::new(workdir, api_key);
        config.base_url = resolve_base_url(env_file.as_ref(), &env);
        config.prompt = resolve_prompt(workdir);
        Ok(config)
    }
}

/// Parse the key/value pairs of a `.env` file. `None` when the file is
/// absent or cannot be opened; malformed lines are skipped.
pub fn read_env_file(path: &Path) -> Option<HashMap<String, String>> {
    if !path.is_file() {
        return None;
    }
    match dotenvy::from_path_iter(path) {
        Ok(iter) => Some(
            iter.filter_map(|item| match item {
                Ok(pair) => Some(pair),
                Err(err) => {
                    warn!("Skipping malformed line in {}: {}", path.display(), err);
                    None
                }
            })
            .collect(),
        ),
        Err(err) => {
            warn!("Could not read {}: {}", path.display(), err);
            None
        }
    }
}

/// The `.env` file wins over the process environment. Empty values count
/// as absent.
pub fn resolve_credential<F>(env_file: Option<&HashMap<String, String>>, env: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let from_file = env_file
        .and_then(|vars| vars.get(API_KEY_VAR))
        .filter(|key| !key.is_empty());
    if let Some(key) = from_file {
        info!("Using {API_KEY_VAR} from {ENV_FILE_NAME} file.");
        return Some(key.clone());
    }
    env(API_KEY_VAR).filter(|key| !key.is_empty())
}

/// Process environment, then `.env`, then the public endpoint.
pub fn resolve_base_url<F>(env_file: Option<&HashMap<String, String>>, env: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    env(BASE_URL_VAR)
        .filter(|url| !url.is_empty())
        .or_else(|| {
            env_file
                .and_then(|vars| vars.get(BASE_URL_VAR))
                .filter(|url| !url.is_empty())
                .cloned()
        })
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

/// Trimmed contents of `Prompt.txt`, or the built-in default when the
/// file is missing, unreadable or blank. Never fails.
pub fn resolve_prompt(workdir: &Path) -> String {
    let path = workdir.join(PROMPT_FILE_NAME);
    let mut prompt = String::new();
    if path.exists() {
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                prompt = text.trim().to_string();
                if !prompt.is_empty() {
                    info!("Loaded prompt from {PROMPT_FILE_NAME}");
                }
            }
            Err(err) => warn!("Error reading {PROMPT_FILE_NAME}, using default prompt: {err}"),
        }
    }

    if prompt.is_empty() {
        DEFAULT_PROMPT.to_string()
    } else {
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn env_with(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn env_file_key_beats_process_environment() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env"), "DASHSCOPE_API_KEY=\"sk-file\"\n").unwrap();

        let config =
            Config::resolve(dir.path(), env_with(&[(API_KEY_VAR, "sk-process")])).unwrap();
        assert_eq!(config.api_key, "sk-file");
    }

    #[test]
    fn falls_back_to_environment_when_file_lacks_key() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env"), "OTHER=1\nDASHSCOPE_API_KEY=\n").unwrap();

        let config =
            Config::resolve(dir.path(), env_with(&[(API_KEY_VAR, "sk-process")])).unwrap();
        assert_eq!(config.api_key, "sk-process");
    }

    #[test]
    fn falls_back_to_environment_without_env_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::resolve(dir.path(), env_with(&[(API_KEY_VAR, "sk-env")])).unwrap();
        assert_eq!(config.api_key, "sk-env");
    }

    #[test]
    fn missing_credential_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::resolve(dir.path(), env_with(&[(API_KEY_VAR, "")])).unwrap_err();
        assert!(matches!(err, EditError::MissingCredential));
    }

    #[test]
    fn base_url_prefers_environment_then_file() {
        let file: HashMap<String, String> =
            [(BASE_URL_VAR.to_string(), "http://from-file".to_string())].into();

        assert_eq!(
            resolve_base_url(Some(&file), env_with(&[(BASE_URL_VAR, "http://from-env")])),
            "http://from-env"
        );
        assert_eq!(resolve_base_url(Some(&file), no_env), "http://from-file");
        assert_eq!(resolve_base_url(None, no_env), DEFAULT_BASE_URL);
    }

    #[test]
    fn prompt_file_is_trimmed() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PROMPT_FILE_NAME), "  Edit nicely.  ").unwrap();
        assert_eq!(resolve_prompt(dir.path()), "Edit nicely.");
    }

    #[test]
    fn blank_or_missing_prompt_uses_default() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_prompt(dir.path()), DEFAULT_PROMPT);

        fs::write(dir.path().join(PROMPT_FILE_NAME), " \n\t ").unwrap();
        assert_eq!(resolve_prompt(dir.path()), DEFAULT_PROMPT);
    }

    #[test]
    fn unreadable_prompt_uses_default() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(PROMPT_FILE_NAME)).unwrap();
        assert_eq!(resolve_prompt(dir.path()), DEFAULT_PROMPT);
    }

    #[test]
    fn new_places_directories_under_workdir() {
        let config = Config::new("/work", "sk");
        assert_eq!(config.input_dir, PathBuf::from("/work/input"));
        assert_eq!(config.output_dir, PathBuf::from("/work/output"));
        assert_eq!(config.generation_timeout, GENERATION_TIMEOUT);
    }
}

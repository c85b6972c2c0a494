// Error taxonomy for a single edit run. Every variant is fatal for the
// run; decode problems never show up here because the persister falls
// back to a text dump instead.

use std::path::PathBuf;

use crate::locate::IMAGE_EXTENSIONS;

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// No credential in `.env` or the process environment.
    #[error("DASHSCOPE_API_KEY is not set (neither in .env nor in environment variables)")]
    MissingCredential,

    /// Neither the input directory nor the working directory holds an image.
    #[error(
        "no image found in {} or its input folder. Supported extensions: {}",
        .dir.display(),
        supported_extensions()
    )]
    NoInputImage { dir: PathBuf },

    /// An explicitly requested input image does not exist.
    #[error("input image {} does not exist", .0.display())]
    InputNotFound(PathBuf),

    /// The generation call failed before any HTTP response arrived.
    #[error("request error: {0}")]
    Request(#[source] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("request failed: HTTP {status}. Response saved to {}", .response_log.display())]
    Http { status: u16, response_log: PathBuf },

    #[error("no image found in response. See saved response: {}", .response_log.display())]
    NoImageInResponse { response_log: PathBuf },

    /// Fetching a generated image by URL failed.
    #[error("failed to download {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EditError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EditError::Io {
            path: path.into(),
            source,
        }
    }
}

fn supported_extensions() -> String {
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, EditError>;

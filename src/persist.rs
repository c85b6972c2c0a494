// Output directory for one run: the request log, the response log and
// the decoded image, all sharing the same timestamp.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::api::{ApiClient, EditRequest};
use crate::encode::{decode_base64, DataUri, MimeTable, DEFAULT_EXTENSION};
use crate::error::{EditError, Result};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Local time as `YYYYMMDD_HHMMSS`.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// The three forms a generated image can take in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageField<'a> {
    DataUri(&'a str),
    Url(&'a str),
    /// Anything else; presumed to be bare base64.
    Raw(&'a str),
}

impl<'a> ImageField<'a> {
    pub fn classify(value: &'a str) -> Self {
        if value.starts_with("data:") {
            ImageField::DataUri(value)
        } else if value.starts_with("http://") || value.starts_with("https://") {
            ImageField::Url(value)
        } else {
            ImageField::Raw(value)
        }
    }
}

pub struct OutputDir {
    dir: PathBuf,
    stamp: String,
}

impl OutputDir {
    /// Create `dir` (and parents) if missing.
    pub fn create(dir: &Path, stamp: impl Into<String>) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| EditError::io(dir, e))?;
        Ok(OutputDir {
            dir: dir.to_path_buf(),
            stamp: stamp.into(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn request_log_path(&self) -> PathBuf {
        self.dir.join(format!("request_{}.req.json", self.stamp))
    }

    pub fn response_log_path(&self) -> PathBuf {
        self.dir.join(format!("response_{}.resp.json", self.stamp))
    }

    fn generated_path(&self, ext: &str) -> PathBuf {
        self.dir.join(format!("generated_{}.{}", self.stamp, ext))
    }

    pub fn write_request_log(&self, req: &EditRequest) -> Result<PathBuf> {
        let path = self.request_log_path();
        write_json(&path, &serde_json::to_value(req)?)?;
        Ok(path)
    }

    pub fn write_response_log(&self, body: &Value) -> Result<PathBuf> {
        let path = self.response_log_path();
        write_json(&path, body)?;
        Ok(path)
    }

    /// Decode `value` and write it next to the logs. Returns the path of
    /// the written file.
    pub fn save_image(
        &self,
        value: &str,
        client: &ApiClient,
        table: &dyn MimeTable,
    ) -> Result<PathBuf> {
        match ImageField::classify(value) {
            ImageField::DataUri(uri) => self.save_data_uri(uri, table),
            ImageField::Url(url) => self.save_download(url, client, table),
            ImageField::Raw(raw) => self.save_raw(raw),
        }
    }

    /// Extension from the declared MIME type. An undecodable payload is
    /// dumped as text instead.
    pub fn save_data_uri(&self, uri: &str, table: &dyn MimeTable) -> Result<PathBuf> {
        let Some(parsed) = DataUri::parse(uri) else {
            return self.save_text(uri);
        };
        let bytes = match parsed.decode() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("data URI payload is not valid base64 ({err}), saving as text");
                return self.save_text(uri);
            }
        };
        let ext = table
            .extension_for_mime(parsed.mime)
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
        self.write_bytes(&ext, &bytes)
    }

    /// Stream `url` to disk. The extension comes from the URL path, then
    /// the response content type, then the default.
    pub fn save_download(
        &self,
        url: &str,
        client: &ApiClient,
        table: &dyn MimeTable,
    ) -> Result<PathBuf> {
        let mut res = client.download(url)?;
        let ext = extension_from_url(url)
            .or_else(|| {
                res.headers()
                    .get(CONTENT_TYPE)
                    .and_then(|ct| ct.to_str().ok())
                    .and_then(|ct| extension_from_content_type(ct, table))
            })
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        let path = self.generated_path(&ext);
        let mut file = File::create(&path).map_err(|e| EditError::io(&path, e))?;
        let written = std::io::copy(&mut res, &mut file).map_err(|e| EditError::io(&path, e))?;
        debug!("downloaded {written} bytes from {url}");
        Ok(path)
    }

    /// Bare base64: PNG if the decoded bytes carry the PNG signature,
    /// opaque `.bin` otherwise, or the original string as `.txt` when it
    /// does not decode at all.
    pub fn save_raw(&self, raw: &str) -> Result<PathBuf> {
        match decode_base64(raw) {
            Ok(bytes) => {
                let ext = if bytes.starts_with(&PNG_SIGNATURE) {
                    "png"
                } else {
                    "bin"
                };
                self.write_bytes(ext, &bytes)
            }
            Err(err) => {
                warn!("image value is not base64 ({err}), saving as text");
                self.save_text(raw)
            }
        }
    }

    fn save_text(&self, text: &str) -> Result<PathBuf> {
        self.write_bytes("txt", text.as_bytes())
    }

    fn write_bytes(&self, ext: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.generated_path(ext);
        fs::write(&path, bytes).map_err(|e| EditError::io(&path, e))?;
        Ok(path)
    }
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).map_err(|e| EditError::io(path, e))
}

/// Extension of the last path segment of `url`, if it has one.
pub fn extension_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    Path::new(parsed.path())
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_string)
}

/// Extension for a `Content-Type` header value; parameters are ignored
/// and an unmapped type falls back to its subtype.
pub fn extension_from_content_type(content_type: &str, table: &dyn MimeTable) -> Option<String> {
    let essence = content_type.split(';').next()?.trim();
    table.extension_for_mime(essence).or_else(|| {
        essence
            .split_once('/')
            .map(|(_, subtype)| subtype.trim())
            .filter(|subtype| !subtype.is_empty())
            .map(str::to_string)
    })
}

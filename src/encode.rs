// Data URI encoding of the input image, plus the MIME <-> extension
// lookups shared with the persister.

use std::fs;
use std::path::Path;

use base64::alphabet;
use base64::engine::general_purpose::{
    GeneralPurpose, GeneralPurposeConfig, STANDARD as BASE64_ENGINE,
};
use base64::engine::DecodePaddingMode;
use base64::Engine;

use crate::error::{EditError, Result};

/// MIME type used when the input's extension maps to nothing.
pub const DEFAULT_MIME: &str = "image/png";
/// Extension used when a MIME type maps to nothing.
pub const DEFAULT_EXTENSION: &str = "png";

/// Standard alphabet, padding optional. Service payloads are not always
/// padded.
const LENIENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode base64 that may be unpadded or wrapped across lines.
pub fn decode_base64(text: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    LENIENT_ENGINE.decode(compact)
}

/// Lookup table between file extensions and MIME types.
pub trait MimeTable {
    fn mime_for_path(&self, path: &Path) -> Option<String>;

    /// Extension (without the dot) for a MIME type such as `image/jpeg`.
    fn extension_for_mime(&self, mime: &str) -> Option<String>;
}

/// [`MimeTable`] backed by `mime_guess`, with the common image types
/// pinned to their usual extensions.
#[derive(Debug, Default, Clone, Copy)]
pub struct GuessTable;

impl MimeTable for GuessTable {
    fn mime_for_path(&self, path: &Path) -> Option<String> {
        mime_guess::from_path(path).first_raw().map(str::to_string)
    }

    fn extension_for_mime(&self, mime: &str) -> Option<String> {
        let mime = mime.trim().to_ascii_lowercase();
        let pinned = match mime.as_str() {
            "image/png" => Some("png"),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
            "image/webp" => Some("webp"),
            "image/gif" => Some("gif"),
            "image/bmp" => Some("bmp"),
            "image/tiff" => Some("tiff"),
            _ => None,
        };
        pinned
            .or_else(|| {
                mime_guess::get_mime_extensions_str(&mime).and_then(|exts| exts.first().copied())
            })
            .map(str::to_string)
    }
}

/// Read `path` and return it as `data:<mime>;base64,<payload>`.
pub fn encode_data_uri(path: &Path, table: &dyn MimeTable) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| EditError::io(path, e))?;
    let mime = table
        .mime_for_path(path)
        .unwrap_or_else(|| DEFAULT_MIME.to_string());
    Ok(format!("data:{};base64,{}", mime, BASE64_ENGINE.encode(bytes)))
}

/// The two halves of a `data:` URI.
#[derive(Debug, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub mime: &'a str,
    pub payload: &'a str,
}

impl<'a> DataUri<'a> {
    /// Split `data:<mime>[;params],<payload>`. A header without a MIME
    /// type yields [`DEFAULT_MIME`]. `None` if `uri` is not a data URI.
    pub fn parse(uri: &'a str) -> Option<Self> {
        let rest = uri.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',').unwrap_or((rest, ""));
        let mime = header.split(';').next().unwrap_or("").trim();
        let mime = if mime.is_empty() { DEFAULT_MIME } else { mime };
        Some(DataUri { mime, payload })
    }

    pub fn decode(&self) -> std::result::Result<Vec<u8>, base64::DecodeError> {
        decode_base64(self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    /// Stub that knows nothing, to exercise the defaults.
    struct EmptyTable;

    impl MimeTable for EmptyTable {
        fn mime_for_path(&self, _: &Path) -> Option<String> {
            None
        }
        fn extension_for_mime(&self, _: &str) -> Option<String> {
            None
        }
    }

    #[test]
    fn one_byte_png_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.png");
        fs::write(&path, [0x7f]).unwrap();

        let uri = encode_data_uri(&path, &GuessTable).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));

        let parsed = DataUri::parse(&uri).unwrap();
        assert_eq!(parsed.decode().unwrap(), vec![0x7f]);
    }

    #[test]
    fn unknown_extension_defaults_to_png_mime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.tif");
        fs::write(&path, b"II*\0").unwrap();

        let uri = encode_data_uri(&path, &EmptyTable).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = encode_data_uri(Path::new("/nonexistent/x.png"), &GuessTable).unwrap_err();
        assert!(matches!(err, EditError::Io { .. }));
    }

    #[test]
    fn guess_table_lookups() {
        assert_eq!(
            GuessTable.mime_for_path(Path::new("a.jpg")).as_deref(),
            Some("image/jpeg")
        );
        assert_eq!(
            GuessTable.mime_for_path(Path::new("a.webp")).as_deref(),
            Some("image/webp")
        );
        assert_eq!(GuessTable.extension_for_mime("image/jpeg").as_deref(), Some("jpg"));
        assert_eq!(GuessTable.extension_for_mime("IMAGE/PNG").as_deref(), Some("png"));
        assert_eq!(GuessTable.extension_for_mime("image/x-unheard-of"), None);
    }

    #[test]
    fn decode_accepts_unpadded_and_wrapped_payloads() {
        assert_eq!(decode_base64("Zm9vYg").unwrap(), b"foob");
        assert_eq!(decode_base64("Zm9vYg==").unwrap(), b"foob");
        assert_eq!(decode_base64("Zm9v\r\nYmFy\n").unwrap(), b"foobar");
        assert!(decode_base64("@@not base64@@").is_err());
    }

    #[test]
    fn parse_data_uri_parts() {
        assert_eq!(
            DataUri::parse("data:image/jpeg;base64,Zm9v"),
            Some(DataUri {
                mime: "image/jpeg",
                payload: "Zm9v"
            })
        );
        assert_eq!(DataUri::parse("data:;base64,AA").unwrap().mime, DEFAULT_MIME);
        assert_eq!(DataUri::parse("https://x/y.png"), None);
    }
}

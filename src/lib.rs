// Library root
// -----------
// One run of the image-edit tool: find a local image, send it with a
// prompt to the image-edit API and store the result under `output/`.
// The binary (`main.rs`) only parses arguments and reports the outcome.
//
// Module responsibilities:
// - `config`: API key, endpoint and prompt resolution.
// - `locate`: picks the input image.
// - `encode`: data URI encoding and MIME lookups.
// - `api`: request payload and the blocking HTTP client.
// - `extract`: finds the image in an arbitrarily shaped response.
// - `persist`: request/response logs and the decoded image.
// - `ui`: drives the flow and prints progress.
pub mod api;
pub mod config;
pub mod encode;
pub mod error;
pub mod extract;
pub mod locate;
pub mod persist;
pub mod ui;

pub use config::Config;
pub use error::{EditError, Result};

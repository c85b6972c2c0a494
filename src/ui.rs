// UI layer: runs the edit flow step by step and reports progress on the
// terminal. A spinner covers the slow network calls.

use crate::api::{ApiClient, EditRequest};
use crate::config::Config;
use crate::encode::{encode_data_uri, MimeTable};
use crate::error::{EditError, Result};
use crate::extract::extract_image;
use crate::locate::find_input_image;
use crate::persist::{timestamp, OutputDir};
use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

/// Files touched by a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub input_image: PathBuf,
    pub generated_image: PathBuf,
    pub request_log: PathBuf,
    pub response_log: PathBuf,
}

/// One complete edit: locate the input, send it with the prompt, log
/// both sides of the exchange and save the returned image.
///
/// The request log is written before the call. The response log is
/// written whenever an HTTP response arrives, error statuses included.
pub fn run_edit(config: &Config, table: &dyn MimeTable) -> Result<Outcome> {
    let input_image = pick_input(config)?;
    let output = OutputDir::create(&config.output_dir, timestamp())?;

    let request = EditRequest::new(encode_data_uri(&input_image, table)?, config.prompt.clone());
    let request_log = output.write_request_log(&request)?;

    let client = ApiClient::new(config)?;
    info(&format!("Sending request to {} ...", client.base_url()));
    let waiting = spinner("Waiting for the edited image...");
    let reply = client.generate(&request);
    waiting.finish_and_clear();
    let reply = reply?;

    let response_log = output.write_response_log(&reply.body)?;
    if !reply.status.is_success() {
        return Err(EditError::Http {
            status: reply.status.as_u16(),
            response_log,
        });
    }

    let Some(field) = extract_image(&reply.body) else {
        return Err(EditError::NoImageInResponse { response_log });
    };

    let saving = spinner("Saving generated image...");
    let generated_image = output.save_image(field, &client, table);
    saving.finish_and_clear();

    Ok(Outcome {
        input_image,
        generated_image: generated_image?,
        request_log,
        response_log,
    })
}

fn pick_input(config: &Config) -> Result<PathBuf> {
    if let Some(path) = &config.image {
        if !path.is_file() {
            return Err(EditError::InputNotFound(path.clone()));
        }
        info(&format!("Using input image: {}", path.display()));
        return Ok(path.clone());
    }

    match find_input_image(&config.workdir, &config.input_dir)? {
        Some(path) => {
            let name = path.file_name().unwrap_or(path.as_os_str());
            if path.starts_with(&config.input_dir) {
                info(&format!("Found newest image in input/: {}", name.to_string_lossy()));
            } else {
                info(&format!("Found image in current directory: {}", name.to_string_lossy()));
            }
            Ok(path)
        }
        None => Err(EditError::NoInputImage {
            dir: config.workdir.clone(),
        }),
    }
}

/// Print the closing summary of a successful run.
pub fn print_summary(outcome: &Outcome) {
    println!("{}", "Done.".green().bold());
    println!("Input image: {}", outcome.input_image.display());
    println!("Saved generated image to: {}", outcome.generated_image.display());
    println!("Saved request log to: {}", outcome.request_log.display());
    println!("Saved response log to: {}", outcome.response_log.display());
}

pub fn info(msg: &str) {
    println!("{} {}", "::".cyan(), msg);
}

pub fn error(msg: &str) {
    eprintln!("{} {}", "error:".red().bold(), msg);
}

fn spinner(msg: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(msg);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

//! `validate`: the upload gate on a file from disk.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use pose_safety::SafetyEngine;
use serde_json::json;

/// Exit code for a rejected upload.
const EXIT_REJECTED: u8 = 2;

/// Check one file and print the result.
pub fn run(engine: &SafetyEngine, file: &Path, size: Option<u64>) -> Result<ExitCode> {
    let size = match size {
        Some(size) => size,
        None => std::fs::metadata(file)
            .with_context(|| format!("failed to stat {}", file.display()))?
            .len(),
    };
    let name = file.to_string_lossy();
    let result = engine.validate_file_name(size, &name);

    let output = match engine.rejection(&result) {
        Some(rejection) => json!({ "accepted": false, "rejection": rejection }),
        None => json!({ "accepted": true }),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(if result.accepted {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_REJECTED)
    })
}

//! `analyze`: keypoints JSON in, safety report JSON out.

use std::io::Read;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use pose_safety::{PoseStatus, SafetyEngine};
use pose_types::KeypointSet;
use tracing::{debug, info};

/// Exit code for an `unsafe` verdict, so scripts can branch on it.
const EXIT_UNSAFE: u8 = 3;

/// Analyze one detection and print the report.
pub fn run(engine: &SafetyEngine, input: Option<&Path>, compact: bool) -> Result<ExitCode> {
    let raw = read_input(input)?;
    let detection = parse_detection(&raw)?;
    debug!(
        keypoints = detection.as_ref().map_or(0, KeypointSet::len),
        "Parsed detection"
    );

    let analysis = engine.analyze_detection(detection.as_ref());
    let report = engine.report(&analysis);
    info!(
        status = report.status.as_str(),
        flagged = report.flagged.len(),
        skipped = report.skipped.len(),
        "Pose analyzed"
    );

    let json = if compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{json}");

    Ok(match report.status {
        PoseStatus::Unsafe => ExitCode::from(EXIT_UNSAFE),
        PoseStatus::Safe | PoseStatus::Caution | PoseStatus::Indeterminate => ExitCode::SUCCESS,
    })
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read keypoints from {}", path.display())),
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read keypoints from stdin")?;
            Ok(raw)
        }
    }
}

/// `null` or an empty document means the detector found nobody.
fn parse_detection(raw: &str) -> Result<Option<KeypointSet>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(raw).context("keypoints must be a JSON array of {name, position, confidence}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detection() {
        let raw = r#"[
            {"name": "left_hip", "position": [0.0, 0.0, 0.0], "confidence": 0.9},
            {"name": "left_knee", "position": [0.0, 1.0, 0.0]}
        ]"#;
        let set = parse_detection(raw).unwrap().unwrap();
        assert_eq!(set.len(), 2);
        assert!((set.get("left_knee").unwrap().confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn null_and_blank_are_no_pose() {
        assert!(parse_detection("null").unwrap().is_none());
        assert!(parse_detection("  \n").unwrap().is_none());
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(parse_detection("{\"name\": 3}").is_err());
    }
}

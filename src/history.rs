use crate::error::{Error, Result};
use crate::runner::RunResult;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MAX_SUFFIX: u32 = 1000;

/// `run-<timestamp>-<depth>.json`, unique per run at millisecond resolution.
pub fn artifact_name(result: &RunResult) -> String {
    format!(
        "run-{}-{}.json",
        result.timestamp.format("%Y%m%dT%H%M%S%.3fZ"),
        result.depth
    )
}

/// Write the run under `dir`. Never overwrites an existing artifact: a
/// colliding name gets a numeric suffix.
pub fn save(result: &RunResult, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let json = serde_json::to_string_pretty(result)
        .map_err(|e| Error::malformed("run result", e))?;

    let name = artifact_name(result);
    let stem = name.trim_end_matches(".json");
    for attempt in 0..MAX_SUFFIX {
        let path = if attempt == 0 {
            dir.join(&name)
        } else {
            dir.join(format!("{stem}-{attempt}.json"))
        };
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(json.as_bytes())?;
                debug!(path = %path.display(), "run result saved");
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(Error::Io(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free artifact name for {name} in {}", dir.display()),
    )))
}

/// All persisted runs under `dir`, oldest first. Unreadable artifacts are
/// skipped with a warning; a missing directory is an empty history.
pub fn load(dir: &Path) -> Result<Vec<RunResult>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut runs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_artifact = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("run-") && n.ends_with(".json"));
        if !is_artifact {
            continue;
        }
        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::from_str::<RunResult>(&s).map_err(|e| e.to_string()));
        match parsed {
            Ok(run) => runs.push(run),
            Err(error) => warn!(path = %path.display(), %error, "skipping unreadable run artifact"),
        }
    }
    runs.sort_by_key(|run| run.timestamp);
    Ok(runs)
}

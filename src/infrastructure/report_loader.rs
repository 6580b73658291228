use crate::api::dto::AnalysisReportDto;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Loads parser reports from disk for CLI batch ingestion.
///
/// A report file holds one `AnalysisReportDto` (the analyzed file's path
/// plus its parse output). Unreadable or undecodable reports are skipped
/// and recorded, never fatal: bad data is isolated per file.
pub struct ReportLoader;

/// What a load pass produced.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub reports: Vec<AnalysisReportDto>,
    pub skipped: Vec<(PathBuf, String)>,
}

impl ReportLoader {
    /// Load explicit report files plus every `.json` under the given
    /// directories (recursive).
    pub fn load(files: &[PathBuf], dirs: &[PathBuf]) -> Result<LoadOutcome> {
        let mut outcome = LoadOutcome::default();

        for file in files {
            Self::load_one(file, &mut outcome);
        }

        for dir in dirs {
            let mut found = Vec::new();
            Self::collect_json_recursive(dir, &mut found)
                .with_context(|| format!("Failed to scan report directory {}", dir.display()))?;
            found.sort();
            for file in found {
                Self::load_one(&file, &mut outcome);
            }
        }

        for (path, reason) in &outcome.skipped {
            tracing::warn!(path = %path.display(), reason, "skipped report file");
        }

        Ok(outcome)
    }

    fn load_one(path: &Path, outcome: &mut LoadOutcome) {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                outcome.skipped.push((path.to_path_buf(), e.to_string()));
                return;
            }
        };
        match serde_json::from_str::<AnalysisReportDto>(&raw) {
            Ok(report) => outcome.reports.push(report),
            Err(e) => outcome.skipped.push((path.to_path_buf(), e.to_string())),
        }
    }

    fn collect_json_recursive(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        if dir.ends_with("target") || dir.ends_with(".git") {
            return Ok(());
        }
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                Self::collect_json_recursive(&path, out)?;
            } else if path.extension().is_some_and(|ext| ext == "json") {
                out.push(path);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_loads_valid_and_skips_broken_reports() {
        let dir = tempdir().unwrap();

        fs::write(
            dir.path().join("auth.json"),
            r#"{
                "filename": "src/auth.py",
                "data": {
                    "definitions": [{"type": "function", "name": "login", "line": 4}],
                    "calls": [],
                    "imports": []
                }
            }"#,
        )
        .unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let outcome = ReportLoader::load(&[], &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(outcome.reports[0].filename, "src/auth.py");
        assert_eq!(outcome.skipped.len(), 1);
    }

    #[test]
    fn test_recurses_into_subdirectories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("workers").join("python");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            nested.join("api.json"),
            r#"{"filename": "src/api.py", "data": {}}"#,
        )
        .unwrap();

        let outcome = ReportLoader::load(&[], &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(outcome.reports.len(), 1);
    }

    #[test]
    fn test_missing_directory_is_empty_not_error() {
        let outcome =
            ReportLoader::load(&[], &[PathBuf::from("/definitely/not/here")]).unwrap();
        assert!(outcome.reports.is_empty());
    }
}

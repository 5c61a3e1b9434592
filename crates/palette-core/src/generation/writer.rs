//! Writing generated files to disk

use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::feature_plan::GeneratedCode;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Report what would be written without touching the filesystem
    pub dry_run: bool,
    /// Replace files that already exist
    pub overwrite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteAction {
    Created,
    Overwritten,
    SkippedExisting,
    DryRun,
}

impl std::fmt::Display for WriteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Overwritten => write!(f, "overwritten"),
            Self::SkippedExisting => write!(f, "skipped (exists)"),
            Self::DryRun => write!(f, "dry run"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub action: WriteAction,
}

/// Resolve a generated relative path below `root`
fn resolve(root: &Path, relative: &str) -> Result<PathBuf> {
    let path = Path::new(relative);
    if relative.trim().is_empty() || path.is_absolute() {
        return Err(Error::InvalidInput(format!(
            "generated file path '{}' must be relative",
            relative
        )));
    }
    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_) | Component::RootDir))
    {
        return Err(Error::InvalidInput(format!(
            "generated file path '{}' must stay inside the output directory",
            relative
        )));
    }
    Ok(root.join(path))
}

/// Write generated files below `root`, creating parent directories
///
/// Every path is checked before anything is written.
pub fn write_files(files: &[GeneratedCode], root: &Path, options: WriteOptions) -> Result<Vec<WrittenFile>> {
    let targets = files
        .iter()
        .map(|file| resolve(root, &file.file_path).map(|path| (path, file)))
        .collect::<Result<Vec<_>>>()?;

    let mut written = Vec::with_capacity(targets.len());
    for (path, file) in targets {
        let exists = path.exists();
        let action = if options.dry_run {
            WriteAction::DryRun
        } else if exists && !options.overwrite {
            WriteAction::SkippedExisting
        } else {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            let mut content = file.code.clone();
            if !content.ends_with('\n') {
                content.push('\n');
            }
            std::fs::write(&path, content)?;
            if exists {
                WriteAction::Overwritten
            } else {
                WriteAction::Created
            }
        };

        match action {
            WriteAction::Created | WriteAction::Overwritten => {
                info!(path = %path.display(), action = %action, "Wrote generated file")
            }
            _ => debug!(path = %path.display(), action = %action, "Did not write generated file"),
        }
        written.push(WrittenFile { path, action });
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file(path: &str, code: &str) -> GeneratedCode {
        GeneratedCode {
            file_path: path.to_string(),
            language: "tsx".to_string(),
            code: code.to_string(),
            model: "m".to_string(),
            tokens_used: 0,
        }
    }

    #[test]
    fn test_writes_nested_files() {
        let dir = TempDir::new().unwrap();
        let written = write_files(
            &[file("src/components/auth/LoginForm.tsx", "export {}")],
            dir.path(),
            WriteOptions::default(),
        )
        .unwrap();

        assert_eq!(written[0].action, WriteAction::Created);
        let content =
            std::fs::read_to_string(dir.path().join("src/components/auth/LoginForm.tsx")).unwrap();
        assert_eq!(content, "export {}\n");
    }

    #[test]
    fn test_existing_files_need_overwrite() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Card.tsx"), "old").unwrap();
        let files = [file("Card.tsx", "new")];

        let skipped = write_files(&files, dir.path(), WriteOptions::default()).unwrap();
        assert_eq!(skipped[0].action, WriteAction::SkippedExisting);
        assert_eq!(std::fs::read_to_string(dir.path().join("Card.tsx")).unwrap(), "old");

        let replaced = write_files(
            &files,
            dir.path(),
            WriteOptions {
                overwrite: true,
                ..WriteOptions::default()
            },
        )
        .unwrap();
        assert_eq!(replaced[0].action, WriteAction::Overwritten);
        assert_eq!(std::fs::read_to_string(dir.path().join("Card.tsx")).unwrap(), "new\n");
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let written = write_files(
            &[file("src/hooks/useAuth.ts", "export {}")],
            dir.path(),
            WriteOptions {
                dry_run: true,
                overwrite: false,
            },
        )
        .unwrap();

        assert_eq!(written[0].action, WriteAction::DryRun);
        assert!(!dir.path().join("src").exists());
    }

    #[test]
    fn test_escaping_paths_are_rejected_before_writing() {
        let dir = TempDir::new().unwrap();
        let files = [file("ok.tsx", "x"), file("../evil.tsx", "x")];

        let err = write_files(&files, dir.path(), WriteOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(!dir.path().join("ok.tsx").exists());

        assert!(write_files(&[file("/etc/passwd", "x")], dir.path(), WriteOptions::default()).is_err());
    }
}

//! Persist generated artifacts under an output directory.

use std::fs::{OpenOptions, create_dir_all};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use entigen_generate::Artifact;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::CliError;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
}

/// Write every artifact below `root`, skipping files whose bytes already match.
pub fn write_artifacts(root: &Path, artifacts: &[Artifact]) -> Result<WriteSummary, CliError> {
    let mut summary = WriteSummary::default();
    for artifact in artifacts {
        let path = resolve(root, &artifact.path)?;
        if std::fs::read(&path).is_ok_and(|existing| existing == artifact.content.as_bytes()) {
            debug!(path = %path.display(), "artifact unchanged");
            summary.unchanged.push(path);
            continue;
        }
        write_bytes_atomic(&path, artifact.content.as_bytes())?;
        debug!(path = %path.display(), bytes = artifact.content.len(), "artifact written");
        summary.written.push(path);
    }
    Ok(summary)
}

/// Join a relative artifact path onto `root`, refusing anything that escapes it.
pub fn resolve(root: &Path, relative: &str) -> Result<PathBuf, CliError> {
    let relative = Path::new(relative);
    let escapes = relative
        .components()
        .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
    if escapes || relative.as_os_str().is_empty() {
        return Err(CliError::InvalidConfig(format!(
            "artifact path '{}' must stay inside the output directory",
            relative.display()
        )));
    }
    Ok(root.join(relative))
}

/// Replace `path` with `data` through a temp file staged in the same directory.
pub fn write_bytes_atomic(path: &Path, data: &[u8]) -> Result<(), CliError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    create_dir_all(dir)?;

    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(data)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|err| err.error)?;
    sync_dir(dir)?;
    Ok(())
}

#[cfg(unix)]
fn sync_dir(path: &Path) -> io::Result<()> {
    OpenOptions::new().read(true).open(path)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use entigen_generate::ArtifactKind;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("entigen-writer-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn writes_then_skips_unchanged() {
        let root = scratch("unchanged");
        let artifacts = vec![
            Artifact::new("types/user.ts", "export {};\n", ArtifactKind::Types),
            Artifact::new("schema.prisma", "model User {}\n", ArtifactKind::Schema),
        ];

        let first = write_artifacts(&root, &artifacts).expect("first write");
        assert_eq!(first.written.len(), 2);
        assert_eq!(
            std::fs::read_to_string(root.join("types/user.ts")).expect("read back"),
            "export {};\n"
        );

        let second = write_artifacts(&root, &artifacts).expect("second write");
        assert!(second.written.is_empty());
        assert_eq!(second.unchanged.len(), 2);

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn atomic_write_replaces_without_leftovers() {
        let root = scratch("atomic");
        let path = root.join("report.json");
        write_bytes_atomic(&path, b"{}").expect("first write");
        write_bytes_atomic(&path, b"{\"ok\":true}").expect("overwrite");

        assert_eq!(std::fs::read(&path).expect("read back"), b"{\"ok\":true}");
        let entries: Vec<PathBuf> = std::fs::read_dir(&root)
            .expect("list dir")
            .map(|entry| entry.expect("entry").path())
            .collect();
        assert_eq!(entries, vec![path]);

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn rejects_paths_outside_root() {
        let root = Path::new("out");
        assert!(resolve(root, "../etc/passwd").is_err());
        assert!(resolve(root, "/abs").is_err());
        assert!(resolve(root, "").is_err());
        assert_eq!(
            resolve(root, "mocks/user.json").expect("relative path"),
            root.join("mocks/user.json")
        );
    }
}

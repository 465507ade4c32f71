//! Filesystem tasks: cleaning the output tree and copying static assets.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::core::task::{Task, TaskError};
use crate::watch::PathFilter;

/// Removes the build output directory.
///
/// A missing target is success: cleaning an unbuilt tree is a no-op.
pub struct CleanTask {
    name: String,
    target: PathBuf,
}

impl CleanTask {
    /// Create a clean task for the given directory.
    pub fn new(name: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
        }
    }
}

#[async_trait]
impl Task for CleanTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<(), TaskError> {
        match tokio::fs::remove_dir_all(&self.target).await {
            Ok(()) => {
                debug!(task = %self.name, target = %self.target.display(), "removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Copies files matching a set of filters into a destination directory.
///
/// With `flatten`, the source directory structure is dropped and every file
/// lands directly in the destination; otherwise the path relative to the
/// filter root is preserved.
pub struct CopyTask {
    name: String,
    sources: Vec<PathFilter>,
    dest: PathBuf,
    flatten: bool,
}

impl CopyTask {
    /// Create a structure-preserving copy task.
    pub fn new(
        name: impl Into<String>,
        sources: Vec<PathFilter>,
        dest: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            sources,
            dest: dest.into(),
            flatten: false,
        }
    }

    /// Drop directory structure when copying.
    pub fn flatten(mut self) -> Self {
        self.flatten = true;
        self
    }
}

#[async_trait]
impl Task for CopyTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<(), TaskError> {
        let sources = self.sources.clone();
        let dest = self.dest.clone();
        let flatten = self.flatten;

        let copied = tokio::task::spawn_blocking(move || copy_tree(&sources, &dest, flatten))
            .await
            .map_err(|e| TaskError::ExecutionFailed(format!("copy worker failed: {e}")))??;

        debug!(task = %self.name, copied, dest = %self.dest.display(), "copied files");
        Ok(())
    }
}

fn copy_tree(sources: &[PathFilter], dest: &Path, flatten: bool) -> std::io::Result<usize> {
    let mut copied = 0;
    for filter in sources {
        // Absent source directories are fine: a site without videos still
        // has a video copy task.
        if !filter.root().exists() {
            continue;
        }
        for file in filter.scan() {
            let target = if flatten {
                match file.file_name() {
                    Some(file_name) => dest.join(file_name),
                    None => continue,
                }
            } else {
                match file.strip_prefix(filter.root()) {
                    Ok(relative) => dest.join(relative),
                    Err(_) => continue,
                }
            };
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&file, &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"x").unwrap();
    }

    #[tokio::test]
    async fn test_clean_removes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dist");
        touch(&out.join("css/main.css"));

        let task = CleanTask::new("clean", &out);
        task.run().await.unwrap();

        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_clean_missing_target_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let task = CleanTask::new("clean", dir.path().join("nope"));
        assert!(task.run().await.is_ok());
    }

    #[tokio::test]
    async fn test_copy_preserves_structure() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("fonts");
        touch(&src.join("regular/body.woff2"));
        touch(&src.join("display.woff"));
        touch(&src.join("notes.txt"));

        let dest = dir.path().join("dist/fonts");
        let task = CopyTask::new(
            "copy:fonts",
            vec![PathFilter::new(&src, ["woff", "woff2"])],
            &dest,
        );
        task.run().await.unwrap();

        assert!(dest.join("regular/body.woff2").is_file());
        assert!(dest.join("display.woff").is_file());
        assert!(!dest.join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_copy_flatten_drops_structure() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("components");
        touch(&src.join("header/svg/logo.svg"));
        touch(&src.join("footer/svg/wave.svg"));

        let dest = dir.path().join("dist/img");
        let task = CopyTask::new("svg:copy", vec![PathFilter::new(&src, ["svg"])], &dest)
            .flatten();
        task.run().await.unwrap();

        assert!(dest.join("logo.svg").is_file());
        assert!(dest.join("wave.svg").is_file());
        assert!(!dest.join("header").exists());
    }

    #[tokio::test]
    async fn test_copy_missing_source_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let task = CopyTask::new(
            "copy:video",
            vec![PathFilter::new(dir.path().join("video"), ["mp4"])],
            dir.path().join("dist/video"),
        );

        assert!(task.run().await.is_ok());
        assert!(!dir.path().join("dist/video").exists());
    }

    #[tokio::test]
    async fn test_copy_from_multiple_sources() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("global/svg/icon.svg"));
        touch(&dir.path().join("components/card/svg/badge.svg"));

        let dest = dir.path().join("dist/img");
        let task = CopyTask::new(
            "svg:copy",
            vec![
                PathFilter::new(dir.path().join("global/svg"), ["svg"]),
                PathFilter::new(dir.path().join("components"), ["svg"]),
            ],
            &dest,
        )
        .flatten();
        task.run().await.unwrap();

        assert!(dest.join("icon.svg").is_file());
        assert!(dest.join("badge.svg").is_file());
    }
}

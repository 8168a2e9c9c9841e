//! Project folder discovery.
//!
//! ```text
//! <folder>/
//!     Audio/    exactly one reference track
//!     Videos/   one file per take
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use multitake_core::models::{ProjectSpec, TakeSource};

pub const AUDIO_DIR: &str = "Audio";
pub const VIDEO_DIR: &str = "Videos";

/// Build the project from `folder`, naming the run after the folder.
pub fn discover(folder: &Path) -> Result<ProjectSpec> {
    if !folder.is_dir() {
        bail!("{} is not a directory", folder.display());
    }

    let audio = list_files(&folder.join(AUDIO_DIR))?;
    let reference = match audio.as_slice() {
        [single] => single.clone(),
        [] => bail!("no reference audio in {}", folder.join(AUDIO_DIR).display()),
        many => bail!(
            "expected exactly one reference file in {}, found {}",
            folder.join(AUDIO_DIR).display(),
            many.len()
        ),
    };

    let videos = list_files(&folder.join(VIDEO_DIR))?;
    if videos.is_empty() {
        bail!("no takes in {}", folder.join(VIDEO_DIR).display());
    }

    let name = folder
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "multitake".to_string());

    let project = videos
        .into_iter()
        .fold(ProjectSpec::new(name, reference), |project, path| {
            project.with_take(TakeSource::from_path(path))
        });
    project.validate().map_err(anyhow::Error::msg)?;

    tracing::debug!(
        "[Discovery] {} takes, reference {}",
        project.takes.len(),
        project.reference.display()
    );
    Ok(project)
}

/// Regular, non-hidden files in `dir`, sorted by name.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("cannot read {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'));
        if path.is_file() && !hidden {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

//! Request path confinement
//!
//! Paths arriving over HTTP are resolved inside a configured root. Relative
//! paths may only use plain components; absolute paths are accepted when they
//! already point inside the root.

use std::path::{Component, Path, PathBuf};

use crate::errors::{PipelineError, PipelineResult};

/// Resolve `requested` inside `root`, rejecting anything that could leave it
pub fn confine_path(root: &Path, requested: &Path) -> PipelineResult<PathBuf> {
    if requested.as_os_str().is_empty() {
        return Err(PipelineError::Validation("Path must not be empty".to_string()));
    }
    let root = std::path::absolute(root)?;
    let escapes = || {
        PipelineError::Validation(format!(
            "Path '{}' is outside the data root",
            requested.display()
        ))
    };

    if requested
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(escapes());
    }

    if requested.is_absolute() {
        return if requested.starts_with(&root) {
            Ok(requested.to_path_buf())
        } else {
            Err(escapes())
        };
    }

    // drive prefixes and root markers only show up on absolute paths
    if requested
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(escapes());
    }
    Ok(root.join(requested))
}

//! Shader sources are plain data files read at startup.

use std::path::Path;

use anyhow::{Context, Result, ensure};

/// Read a WGSL source file. Empty files are rejected.
pub fn load_shader_source(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read shader source {}", path.display()))?;
    ensure!(
        !source.trim().is_empty(),
        "Shader source {} is empty",
        path.display()
    );
    log::info!("Loaded shader {} ({} bytes)", path.display(), source.len());
    Ok(source)
}

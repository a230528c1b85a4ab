//! Snapshot lock files: derive from a template, load, save (atomic).
//!
//! A lock records what was last synthesized, not what is deployed. It is the
//! baseline the planner diffs the next synthesis against.

use super::error::{StackError, StackResult};
use super::hasher::hash_json;
use super::resolver::resource_order;
use super::types::{ResourceLock, StackLock, Template, TemplateResource};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

pub const LOCK_SCHEMA: &str = "1.0";

/// Derive the lock file path for a stack within the state directory.
pub fn lock_file_path(state_dir: &Path, stack: &str) -> PathBuf {
    state_dir.join(stack).join("stack.lock.yaml")
}

/// Load the lock file for a stack. Returns None if the file doesn't exist.
pub fn load_lock(state_dir: &Path, stack: &str) -> StackResult<Option<StackLock>> {
    let path = lock_file_path(state_dir, stack);
    if !path.exists() {
        debug!(path = %path.display(), "no snapshot");
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)
        .map_err(|e| StackError::io(format!("cannot read {}", path.display()), e))?;
    let lock: StackLock = serde_yaml_ng::from_str(&content).map_err(|e| StackError::Lock {
        path: path.clone(),
        message: e.to_string(),
    })?;
    if lock.stack != stack {
        return Err(StackError::Lock {
            path,
            message: format!("records stack '{}', expected '{}'", lock.stack, stack),
        });
    }
    Ok(Some(lock))
}

/// Save a lock file atomically (write to temp, then rename).
pub fn save_lock(state_dir: &Path, lock: &StackLock) -> StackResult<PathBuf> {
    let path = lock_file_path(state_dir, &lock.stack);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| StackError::io(format!("cannot create dir {}", parent.display()), e))?;
    }

    let yaml =
        serde_yaml_ng::to_string(lock).map_err(|e| StackError::Serialize(e.to_string()))?;

    let tmp_path = path.with_extension("yaml.tmp");
    std::fs::write(&tmp_path, &yaml)
        .map_err(|e| StackError::io(format!("cannot write {}", tmp_path.display()), e))?;
    std::fs::rename(&tmp_path, &path).map_err(|e| {
        StackError::io(
            format!("cannot rename {} to {}", tmp_path.display(), path.display()),
            e,
        )
    })?;

    info!(path = %path.display(), resources = lock.resources.len(), "snapshot saved");
    Ok(path)
}

/// BLAKE3 of a whole resource body: type, properties and `DependsOn`.
pub fn resource_hash(resource: &TemplateResource) -> StackResult<String> {
    let body = serde_json::to_value(resource).map_err(|e| StackError::Serialize(e.to_string()))?;
    Ok(hash_json(&body))
}

/// Snapshot a synthesized template. Entries are stored in dependency order
/// so a later destroy can walk them backwards.
pub fn snapshot(template: &Template, stack: &str) -> StackResult<StackLock> {
    let mut resources = IndexMap::new();
    for id in resource_order(template)? {
        let Some(resource) = template.resources.get(&id) else {
            continue;
        };
        let hash = resource_hash(resource)?;
        let properties = resource
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), hash_json(v)))
            .collect();
        resources.insert(
            id,
            ResourceLock {
                resource_type: resource.resource_type.clone(),
                hash,
                properties,
            },
        );
    }

    Ok(StackLock {
        schema: LOCK_SCHEMA.to_string(),
        stack: stack.to_string(),
        generated_at: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs()),
        generator: format!("stackform {}", env!("CARGO_PKG_VERSION")),
        resources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::StackConfig;
    use crate::core::descriptor::sample_asg_alb_stack;
    use crate::core::keys::StaticKeyProvider;
    use crate::core::synth::synthesize;

    fn template() -> Template {
        let stack =
            sample_asg_alb_stack(&StackConfig::default(), &StaticKeyProvider("k".into())).unwrap();
        synthesize(&stack).unwrap()
    }

    #[test]
    fn test_state_lock_file_path() {
        let p = lock_file_path(Path::new("/state"), "SampleAsgAlbStack");
        assert_eq!(p, PathBuf::from("/state/SampleAsgAlbStack/stack.lock.yaml"));
    }

    #[test]
    fn test_state_snapshot_covers_every_resource() {
        let t = template();
        let lock = snapshot(&t, "SampleAsgAlbStack").unwrap();
        assert_eq!(lock.resources.len(), t.resources.len());
        let kp = &lock.resources["KeyPair"];
        assert_eq!(kp.resource_type, "AWS::EC2::KeyPair");
        assert!(kp.hash.starts_with("blake3:"));
        assert_eq!(kp.properties.len(), 2);
        assert!(lock.generator.starts_with("stackform "));
    }

    #[test]
    fn test_state_snapshot_hash_stable() {
        let a = snapshot(&template(), "s").unwrap();
        let b = snapshot(&template(), "s").unwrap();
        for (id, r) in &a.resources {
            assert_eq!(r.hash, b.resources[id].hash, "{id}");
        }
    }

    #[test]
    fn test_state_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let lock = snapshot(&template(), "SampleAsgAlbStack").unwrap();
        let path = save_lock(dir.path(), &lock).unwrap();
        assert!(path.exists());

        let loaded = load_lock(dir.path(), "SampleAsgAlbStack").unwrap().unwrap();
        assert_eq!(loaded.resources.len(), lock.resources.len());
        assert_eq!(loaded.resources["KeyPair"].hash, lock.resources["KeyPair"].hash);
        let ids: Vec<_> = loaded.resources.keys().collect();
        let original: Vec<_> = lock.resources.keys().collect();
        assert_eq!(ids, original);
    }

    #[test]
    fn test_state_snapshot_in_dependency_order() {
        let t = template();
        let lock = snapshot(&t, "s").unwrap();
        let ids: Vec<_> = lock.resources.keys().cloned().collect();
        assert_eq!(ids, resource_order(&t).unwrap());
    }

    #[test]
    fn test_state_load_nonexistent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_lock(dir.path(), "ghost").unwrap().is_none());
    }

    #[test]
    fn test_state_atomic_write_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let lock = snapshot(&template(), "s").unwrap();
        save_lock(dir.path(), &lock).unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("s"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["stack.lock.yaml"]);
    }

    #[test]
    fn test_state_corrupt_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_file_path(dir.path(), "s");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "resources: [not, a, map").unwrap();
        let err = load_lock(dir.path(), "s").unwrap_err();
        assert!(matches!(err, StackError::Lock { .. }));
    }

    #[test]
    fn test_state_lock_for_other_stack() {
        let dir = tempfile::tempdir().unwrap();
        let lock = snapshot(&template(), "a").unwrap();
        save_lock(dir.path(), &lock).unwrap();
        std::fs::rename(dir.path().join("a"), dir.path().join("b")).unwrap();
        let err = load_lock(dir.path(), "b").unwrap_err();
        assert!(err.to_string().contains("records stack 'a'"));
    }
}

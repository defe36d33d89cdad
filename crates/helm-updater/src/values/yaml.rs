//! In-process YAML key engine built on `serde_yaml`.
//!
//! Values are written as YAML strings and missing intermediate mappings are
//! created. Block-style documents are edited in place so comments and layout
//! survive; documents the text patcher does not understand (flow collections,
//! anchors, block scalars) are re-serialized, which drops their comments.

use std::path::Path;

use serde_yaml::{Mapping, Value};

use super::error::{EngineError, Result};
use super::patch::patch_scalar;
use super::path::{KeyPath, Segment};
use super::KeyEngine;

/// Reads and patches values documents in process.
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlEngine;

impl YamlEngine {
    pub fn new() -> Self {
        Self
    }

    fn read(&self, file: &Path) -> Result<String> {
        std::fs::read_to_string(file).map_err(|e| EngineError::ReadFile {
            path: file.to_path_buf(),
            source: e,
        })
    }

    fn parse(&self, file: &Path, content: &str) -> Result<Value> {
        if content.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_yaml::from_str(content).map_err(|e| EngineError::ParseYaml {
            path: file.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn write(&self, file: &Path, content: &str) -> Result<()> {
        std::fs::write(file, content).map_err(|e| EngineError::WriteFile {
            path: file.to_path_buf(),
            source: e,
        })
    }

    fn store(&self, file: &Path, document: &Value) -> Result<()> {
        let content =
            serde_yaml::to_string(document).map_err(|e| EngineError::SerializeYaml(e.to_string()))?;
        self.write(file, &content)
    }
}

impl KeyEngine for YamlEngine {
    fn read_key(&self, file: &Path, key: &KeyPath) -> Result<String> {
        let document = self.parse(file, &self.read(file)?)?;
        let value = lookup(&document, key)?;
        scalar_to_string(value).ok_or_else(|| EngineError::NotScalar(key.to_string()))
    }

    fn set_key(&self, file: &Path, key: &KeyPath, value: &str) -> Result<()> {
        let content = self.read(file)?;
        let mut document = self.parse(file, &content)?;
        *lookup_mut(&mut document, key)? = Value::String(value.to_string());

        // the text edit is kept only if it parses to the expected document
        let patched = patch_scalar(&content, key, value).filter(|text| {
            serde_yaml::from_str::<Value>(text).is_ok_and(|parsed| parsed == document)
        });

        match patched {
            Some(text) => self.write(file, &text),
            None => {
                log::debug!(
                    "key {} cannot be patched in place, rewriting {}",
                    key,
                    file.display()
                );
                self.store(file, &document)
            }
        }
    }
}

fn untag(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untag(&tagged.value),
        other => other,
    }
}

fn lookup<'a>(document: &'a Value, key: &KeyPath) -> Result<&'a Value> {
    let mut current = document;

    for segment in key.segments() {
        let found = match (segment, untag(current)) {
            (Segment::Key(name), Value::Mapping(mapping)) => mapping.get(name.as_str()),
            (Segment::Index(index), Value::Sequence(items)) => items.get(*index),
            _ => None,
        };
        current = found.ok_or_else(|| EngineError::KeyNotFound(key.to_string()))?;
    }

    // yq cannot tell an explicit null from an absent key either
    if untag(current).is_null() {
        return Err(EngineError::KeyNotFound(key.to_string()));
    }
    Ok(current)
}

fn lookup_mut<'a>(document: &'a mut Value, key: &KeyPath) -> Result<&'a mut Value> {
    let mut current = document;

    for segment in key.segments() {
        current = match segment {
            Segment::Key(name) => {
                if current.is_null() {
                    *current = Value::Mapping(Mapping::new());
                }
                match current {
                    Value::Mapping(mapping) => mapping
                        .entry(Value::String(name.clone()))
                        .or_insert(Value::Null),
                    _ => {
                        return Err(EngineError::NotAContainer {
                            key: key.to_string(),
                            segment: segment.to_string(),
                            expected: "mapping",
                        })
                    }
                }
            }
            Segment::Index(index) => match current {
                Value::Sequence(items) if *index < items.len() => &mut items[*index],
                _ => {
                    return Err(EngineError::NotAContainer {
                        key: key.to_string(),
                        segment: segment.to_string(),
                        expected: "sequence with that index",
                    })
                }
            },
        };
    }

    Ok(current)
}

/// Renders a scalar the way `yq` prints it.
fn scalar_to_string(value: &Value) -> Option<String> {
    match untag(value) {
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::NamedTempFile;

    const VALUES: &str = r#"image:
  repository: nginx
  tag: 1.0.0
replicas: 3
debug: false
containers:
  - name: app
    image: app:1.0
"#;

    fn values_file() -> NamedTempFile {
        let file = NamedTempFile::new("values.yaml").unwrap();
        file.write_str(VALUES).unwrap();
        file
    }

    fn key(raw: &str) -> KeyPath {
        KeyPath::parse(raw).unwrap()
    }

    #[test]
    fn test_read_scalars() {
        let file = values_file();
        let engine = YamlEngine::new();

        assert_eq!(engine.read_key(file.path(), &key(".image.tag")).unwrap(), "1.0.0");
        assert_eq!(engine.read_key(file.path(), &key(".replicas")).unwrap(), "3");
        assert_eq!(engine.read_key(file.path(), &key(".debug")).unwrap(), "false");
        assert_eq!(
            engine
                .read_key(file.path(), &key(".containers[0].image"))
                .unwrap(),
            "app:1.0"
        );
    }

    #[test]
    fn test_read_missing_key() {
        let file = values_file();
        let err = YamlEngine::new()
            .read_key(file.path(), &key(".image.digest"))
            .unwrap_err();
        assert!(matches!(err, EngineError::KeyNotFound(_)));
    }

    #[test]
    fn test_read_non_scalar() {
        let file = values_file();
        let err = YamlEngine::new()
            .read_key(file.path(), &key(".image"))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotScalar(_)));
    }

    #[test]
    fn test_set_then_read() {
        let file = values_file();
        let engine = YamlEngine::new();

        engine.set_key(file.path(), &key(".image.tag"), "1.1.0").unwrap();
        engine
            .set_key(file.path(), &key(".containers[0].image"), "app:2.0")
            .unwrap();

        assert_eq!(engine.read_key(file.path(), &key(".image.tag")).unwrap(), "1.1.0");
        assert_eq!(
            engine
                .read_key(file.path(), &key(".image.repository"))
                .unwrap(),
            "nginx"
        );
        assert_eq!(
            engine
                .read_key(file.path(), &key(".containers[0].image"))
                .unwrap(),
            "app:2.0"
        );
    }

    #[test]
    fn test_set_writes_strings() {
        let file = values_file();
        let engine = YamlEngine::new();

        engine.set_key(file.path(), &key(".replicas"), "5").unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("replicas: '5'"), "{content}");
    }

    #[test]
    fn test_set_keeps_comments_and_layout() {
        let file = NamedTempFile::new("values.yaml").unwrap();
        file.write_str("# chart values\nimage:\n  # pinned by CI\n  tag: 1.0.0 # current\nreplicas: 3\n")
            .unwrap();
        let engine = YamlEngine::new();

        engine.set_key(file.path(), &key(".image.tag"), "1.1.0").unwrap();

        file.assert("# chart values\nimage:\n  # pinned by CI\n  tag: 1.1.0 # current\nreplicas: 3\n");
    }

    #[test]
    fn test_set_falls_back_to_rewrite_for_flow_style() {
        let file = NamedTempFile::new("values.yaml").unwrap();
        file.write_str("image: {repository: nginx, tag: 1.0.0}\n").unwrap();
        let engine = YamlEngine::new();

        engine.set_key(file.path(), &key(".image.tag"), "1.1.0").unwrap();

        assert_eq!(engine.read_key(file.path(), &key(".image.tag")).unwrap(), "1.1.0");
        assert_eq!(
            engine.read_key(file.path(), &key(".image.repository")).unwrap(),
            "nginx"
        );
    }

    #[test]
    fn test_explicit_null_reads_as_missing() {
        let file = NamedTempFile::new("values.yaml").unwrap();
        file.write_str("image:\n  tag: null\n  digest: ~\n  pullPolicy:\n").unwrap();
        let engine = YamlEngine::new();

        for raw in [".image.tag", ".image.digest", ".image.pullPolicy"] {
            let err = engine.read_key(file.path(), &key(raw)).unwrap_err();
            assert!(matches!(err, EngineError::KeyNotFound(_)), "{raw}: {err}");
        }
    }

    #[test]
    fn test_set_creates_missing_mappings() {
        let file = values_file();
        let engine = YamlEngine::new();

        engine
            .set_key(file.path(), &key(".ingress.annotations.owner"), "team-a")
            .unwrap();
        assert_eq!(
            engine
                .read_key(file.path(), &key(".ingress.annotations.owner"))
                .unwrap(),
            "team-a"
        );
    }

    #[test]
    fn test_set_through_scalar_fails() {
        let file = values_file();
        let err = YamlEngine::new()
            .set_key(file.path(), &key(".image.tag.major"), "1")
            .unwrap_err();
        assert!(matches!(err, EngineError::NotAContainer { .. }));
    }

    #[test]
    fn test_set_out_of_range_index_fails() {
        let file = values_file();
        let err = YamlEngine::new()
            .set_key(file.path(), &key(".containers[3].image"), "x")
            .unwrap_err();
        assert!(matches!(err, EngineError::NotAContainer { .. }));
    }

    #[test]
    fn test_invalid_yaml() {
        let file = NamedTempFile::new("values.yaml").unwrap();
        file.write_str("image: [unclosed").unwrap();
        let err = YamlEngine::new()
            .read_key(file.path(), &key(".image"))
            .unwrap_err();
        assert!(matches!(err, EngineError::ParseYaml { .. }));
    }
}

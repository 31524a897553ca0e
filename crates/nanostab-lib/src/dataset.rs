use log::debug;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Field map of a single test record.
pub type Record = Map<String, Value>;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("dataset is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("malformed dataset at {path}: expected {expected}")]
    Shape { path: String, expected: &'static str },
}

/// Immutable batch -> week -> buffer -> test document.
///
/// Only the top level is checked at load time. Every lookup is a plain
/// descent that yields `None` on a missing key or a node of the wrong kind.
#[derive(Debug, Clone)]
pub struct Dataset {
    root: Value,
}

impl Dataset {
    /// Read and validate the document at `path`. No partial loads.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::from_reader(BufReader::new(file))?;
        debug!(
            "loaded dataset from {} ({} batches)",
            path.display(),
            dataset.keys_at(&[]).len()
        );
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let root: Value = serde_json::from_reader(reader)?;
        Self::from_value(root)
    }

    pub fn from_json_str(text: &str) -> Result<Self, LoadError> {
        let root: Value = serde_json::from_str(text)?;
        Self::from_value(root)
    }

    pub fn from_value(root: Value) -> Result<Self, LoadError> {
        check_root(&root)?;
        Ok(Self { root })
    }

    /// Walk `path` from the root, one object key per segment.
    pub fn descend(&self, path: &[&str]) -> Option<&Value> {
        path.iter()
            .try_fold(&self.root, |node, key| node.as_object()?.get(*key))
    }

    /// Keys of the object found at `path`; empty when the path is absent
    /// or does not lead to an object.
    pub fn keys_at(&self, path: &[&str]) -> Vec<String> {
        self.descend(path)
            .and_then(Value::as_object)
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }
}

// Only the root has to be an object. Anything malformed further down is a
// missing segment to the lookups and reads as no data.
fn check_root(root: &Value) -> Result<(), LoadError> {
    if root.is_object() {
        Ok(())
    } else {
        Err(LoadError::Shape {
            path: "<root>".to_string(),
            expected: "an object of batches",
        })
    }
}

/// Ascending numeric order for numeric-like keys ("2" before "10").
/// Keys that are not numbers sort after every numeric key, lexicographically.
pub fn numeric_key_order(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

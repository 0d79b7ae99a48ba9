//! File contract of the topic-model trainer.
//!
//! A resource directory holds `model.json`, `topic_weights.jsonl` (one JSON
//! array of `[topic, weight]` pairs per document) and `ids.json` (catalog ids
//! in the same order as the weight lines).

use crate::error::{RecError, Result};
use crate::{DocTopics, DocumentId};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub name: String,
    pub num_topics: usize,
    #[serde(default)]
    pub version: Option<String>,
}

pub struct ResourcePaths {
    pub root: PathBuf,
}

impl ResourcePaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn manifest(&self) -> PathBuf { self.root.join("model.json") }
    pub fn topic_weights(&self) -> PathBuf { self.root.join("topic_weights.jsonl") }
    pub fn ids(&self) -> PathBuf { self.root.join("ids.json") }
}

/// Everything the recommender needs from the trainer, in row order.
#[derive(Debug, Clone)]
pub struct Resources {
    pub manifest: ModelManifest,
    pub topic_weights: Vec<DocTopics>,
    pub ids: Vec<DocumentId>,
}

pub fn save_manifest(paths: &ResourcePaths, manifest: &ModelManifest) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.manifest())?;
    let json = serde_json::to_string_pretty(manifest)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_manifest(paths: &ResourcePaths) -> Result<ModelManifest> {
    let mut f = File::open(paths.manifest())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let manifest: ModelManifest = serde_json::from_str(&buf)?;
    Ok(manifest)
}

pub fn save_topic_weights(paths: &ResourcePaths, weights: &[DocTopics]) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut out = BufWriter::new(File::create(paths.topic_weights())?);
    for doc in weights {
        serde_json::to_writer(&mut out, doc)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

pub fn load_topic_weights(paths: &ResourcePaths) -> Result<Vec<DocTopics>> {
    let reader = BufReader::new(File::open(paths.topic_weights())?);
    let mut weights = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: DocTopics = serde_json::from_str(&line)?;
        weights.push(doc);
    }
    Ok(weights)
}

pub fn save_ids(paths: &ResourcePaths, ids: &[DocumentId]) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.ids())?;
    let json = serde_json::to_string(ids)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_ids(paths: &ResourcePaths) -> Result<Vec<DocumentId>> {
    let mut f = File::open(paths.ids())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let ids = serde_json::from_str(&buf)?;
    Ok(ids)
}

pub fn save_resources(paths: &ResourcePaths, resources: &Resources) -> Result<()> {
    save_manifest(paths, &resources.manifest)?;
    save_topic_weights(paths, &resources.topic_weights)?;
    save_ids(paths, &resources.ids)?;
    Ok(())
}

/// Load all three artifacts; the id list must be parallel to the weight lines.
pub fn load_resources(paths: &ResourcePaths) -> Result<Resources> {
    let manifest = load_manifest(paths)?;
    let topic_weights = load_topic_weights(paths)?;
    let ids = load_ids(paths)?;
    if ids.len() != topic_weights.len() {
        return Err(RecError::ShapeMismatch(format!(
            "{} ids for {} topic weight rows",
            ids.len(),
            topic_weights.len()
        )));
    }
    tracing::info!(model = %manifest.name, docs = ids.len(), topics = manifest.num_topics, "loaded resources");
    Ok(Resources { manifest, topic_weights, ids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Resources {
        Resources {
            manifest: ModelManifest { name: "lda_2_topics".into(), num_topics: 2, version: None },
            topic_weights: vec![vec![(0, 0.25), (1, 0.75)], vec![(1, 1.0)]],
            ids: vec![84, 1342],
        }
    }

    #[test]
    fn saved_resources_load_back() {
        let dir = tempdir().unwrap();
        let paths = ResourcePaths::new(dir.path());
        save_resources(&paths, &sample()).unwrap();
        let loaded = load_resources(&paths).unwrap();
        assert_eq!(loaded.manifest, sample().manifest);
        assert_eq!(loaded.topic_weights, sample().topic_weights);
        assert_eq!(loaded.ids, vec![84, 1342]);
    }

    #[test]
    fn weights_file_skips_blank_lines() {
        let dir = tempdir().unwrap();
        let paths = ResourcePaths::new(dir.path());
        std::fs::write(paths.topic_weights(), "[[0, 0.5], [1, 0.5]]\n\n[[1, 1.0]]\n").unwrap();
        let w = load_topic_weights(&paths).unwrap();
        assert_eq!(w.len(), 2);
        assert_eq!(w[1], vec![(1, 1.0)]);
    }

    #[test]
    fn id_count_must_match_rows() {
        let dir = tempdir().unwrap();
        let paths = ResourcePaths::new(dir.path());
        let mut r = sample();
        r.ids.push(2701);
        save_resources(&paths, &r).unwrap();
        assert!(matches!(load_resources(&paths), Err(RecError::ShapeMismatch(_))));
    }

    #[test]
    fn manifest_version_is_optional() {
        let dir = tempdir().unwrap();
        let paths = ResourcePaths::new(dir.path());
        std::fs::write(paths.manifest(), r#"{"name": "lda_30_topics", "num_topics": 30}"#).unwrap();
        let m = load_manifest(&paths).unwrap();
        assert_eq!(m.num_topics, 30);
        assert!(m.version.is_none());
    }
}

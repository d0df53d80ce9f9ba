//! In-memory frame source
//!
//! Backs tests and the CLI's JSON container format. The container holds
//! named frame datasets (row per sample), a target matrix, split index
//! lists, and an optional list of polarity-tagged keys whose frames store
//! the two DVS polarity channels side by side.

use super::source::{ChannelPolicy, FrameSource, Split};
use crate::error::{Error, Result};
use ndarray::Array2;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// An in-memory recording.
pub struct MemorySource {
    id: String,
    datasets: HashMap<String, Array2<f32>>,
    polarity_keys: HashSet<String>,
    targets: Array2<f32>,
    train_idxs: Vec<usize>,
    test_idxs: Vec<usize>,
}

/// On-disk JSON shape of a recording.
#[derive(Deserialize)]
struct Container {
    #[serde(default)]
    id: Option<String>,
    datasets: HashMap<String, Vec<Vec<f32>>>,
    #[serde(default)]
    polarity_keys: Vec<String>,
    targets: Vec<Vec<f32>>,
    train_idxs: Vec<usize>,
    test_idxs: Vec<usize>,
}

fn rows_to_array(what: &str, rows: &[Vec<f32>]) -> Result<Array2<f32>> {
    let ncols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != ncols) {
        return Err(Error::Shape(format!("'{what}' has ragged rows")));
    }
    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), ncols), flat)
        .map_err(|e| Error::Shape(format!("'{what}': {e}")))
}

impl MemorySource {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            datasets: HashMap::new(),
            polarity_keys: HashSet::new(),
            targets: Array2::zeros((0, 0)),
            train_idxs: Vec::new(),
            test_idxs: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_dataset(mut self, key: impl Into<String>, frames: Array2<f32>) -> Self {
        self.datasets.insert(key.into(), frames);
        self
    }

    /// Tag a dataset key as carrying two side-by-side polarity channels.
    #[must_use]
    pub fn with_polarity_key(mut self, key: impl Into<String>) -> Self {
        self.polarity_keys.insert(key.into());
        self
    }

    #[must_use]
    pub fn with_targets(mut self, targets: Array2<f32>) -> Self {
        self.targets = targets;
        self
    }

    #[must_use]
    pub fn with_splits(mut self, train_idxs: Vec<usize>, test_idxs: Vec<usize>) -> Self {
        self.train_idxs = train_idxs;
        self.test_idxs = test_idxs;
        self
    }

    /// Load a recording from its JSON container.
    pub fn from_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read data file {}: {e}", path.display()))
        })?;
        let container: Container = serde_json::from_str(&content)
            .map_err(|e| Error::Serialization(format!("{}: {e}", path.display())))?;

        let id = container.id.unwrap_or_else(|| {
            path.file_stem().and_then(|s| s.to_str()).unwrap_or("recording").to_string()
        });
        let mut source = MemorySource::new(id)
            .with_targets(rows_to_array("targets", &container.targets)?)
            .with_splits(container.train_idxs, container.test_idxs);
        for (key, rows) in &container.datasets {
            source = source.with_dataset(key.clone(), rows_to_array(key, rows)?);
        }
        source.polarity_keys = container.polarity_keys.into_iter().collect();
        Ok(source)
    }

    fn dataset(&self, key: &str) -> Result<&Array2<f32>> {
        self.datasets
            .get(key)
            .ok_or_else(|| Error::Shape(format!("source '{}' has no dataset '{key}'", self.id)))
    }

    fn gather(&self, what: &str, data: &Array2<f32>, idxs: &[usize]) -> Result<Array2<f32>> {
        let mut out = Array2::zeros((idxs.len(), data.ncols()));
        for (row, &idx) in idxs.iter().enumerate() {
            if idx >= data.nrows() {
                return Err(Error::Shape(format!(
                    "index {idx} out of bounds for '{what}' with {} samples",
                    data.nrows()
                )));
            }
            out.row_mut(row).assign(&data.row(idx));
        }
        Ok(out)
    }

    /// Fold the two side-by-side polarity channels into one frame.
    fn merge_polarities(&self, key: &str, frames: Array2<f32>) -> Result<Array2<f32>> {
        let ncols = frames.ncols();
        if ncols % 2 != 0 {
            return Err(Error::Shape(format!(
                "polarity dataset '{key}' has odd frame length {ncols}"
            )));
        }
        let half = ncols / 2;
        let (on, off) = frames.view().split_at(ndarray::Axis(1), half);
        Ok(&on + &off)
    }
}

impl FrameSource for MemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn has_key(&self, key: &str) -> bool {
        self.datasets.contains_key(key)
    }

    fn split_indices(&self, split: Split) -> &[usize] {
        match split {
            Split::Train => &self.train_idxs,
            Split::Test => &self.test_idxs,
        }
    }

    fn frame_len(&self, key: &str, policy: ChannelPolicy) -> Result<usize> {
        let ncols = self.dataset(key)?.ncols();
        if self.polarity_keys.contains(key) && policy == ChannelPolicy::Merged {
            Ok(ncols / 2)
        } else {
            Ok(ncols)
        }
    }

    fn read_frames(
        &self,
        key: &str,
        idxs: &[usize],
        policy: ChannelPolicy,
    ) -> Result<Array2<f32>> {
        let frames = self.gather(key, self.dataset(key)?, idxs)?;
        if self.polarity_keys.contains(key) && policy == ChannelPolicy::Merged {
            self.merge_polarities(key, frames)
        } else {
            Ok(frames)
        }
    }

    fn read_targets(&self, idxs: &[usize]) -> Result<Array2<f32>> {
        self.gather("targets", &self.targets, idxs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr2;

    fn dvs_source() -> MemorySource {
        MemorySource::new("rec1")
            .with_dataset("dvs_frame", arr2(&[[1.0, 2.0, 10.0, 20.0], [3.0, 4.0, 30.0, 40.0]]))
            .with_polarity_key("dvs_frame")
            .with_targets(arr2(&[[0.5], [0.7]]))
            .with_splits(vec![0], vec![1])
    }

    #[test]
    fn test_read_frames_separate_polarity() {
        let src = dvs_source();
        let frames =
            src.read_frames("dvs_frame", &[1], ChannelPolicy::SeparatePolarity).unwrap();
        assert_eq!(frames.dim(), (1, 4));
        assert_eq!(src.frame_len("dvs_frame", ChannelPolicy::SeparatePolarity).unwrap(), 4);
    }

    #[test]
    fn test_read_frames_merged_folds_channels() {
        let src = dvs_source();
        let frames = src.read_frames("dvs_frame", &[0], ChannelPolicy::Merged).unwrap();
        assert_eq!(frames.dim(), (1, 2));
        assert_relative_eq!(frames[[0, 0]], 11.0);
        assert_relative_eq!(frames[[0, 1]], 22.0);
        assert_eq!(src.frame_len("dvs_frame", ChannelPolicy::Merged).unwrap(), 2);
    }

    #[test]
    fn test_policy_ignored_for_untagged_keys() {
        let src = MemorySource::new("rec")
            .with_dataset("aps_frame", arr2(&[[1.0, 2.0]]))
            .with_targets(arr2(&[[0.0]]))
            .with_splits(vec![0], vec![]);
        let frames = src.read_frames("aps_frame", &[0], ChannelPolicy::Merged).unwrap();
        assert_eq!(frames.dim(), (1, 2));
    }

    #[test]
    fn test_out_of_bounds_index() {
        let src = dvs_source();
        assert!(src.read_targets(&[7]).is_err());
    }

    #[test]
    fn test_from_json_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rec1.json");
        std::fs::write(
            &path,
            r#"{
                "datasets": {"aps_frame_48x64": [[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]},
                "targets": [[0.1], [0.2], [0.3]],
                "train_idxs": [0, 1],
                "test_idxs": [2]
            }"#,
        )
        .unwrap();

        let src = MemorySource::from_json(&path).unwrap();
        assert_eq!(src.id(), "rec1");
        assert!(src.has_key("aps_frame_48x64"));
        assert_eq!(src.split_indices(Split::Train), &[0, 1]);
        assert_eq!(src.split_indices(Split::Test), &[2]);
        let t = src.read_targets(&[2]).unwrap();
        assert_relative_eq!(t[[0, 0]], 0.3);
    }

    #[test]
    fn test_from_json_rejects_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(
            &path,
            r#"{
                "datasets": {"k": [[1.0, 2.0], [3.0]]},
                "targets": [[0.1], [0.2]],
                "train_idxs": [0],
                "test_idxs": [1]
            }"#,
        )
        .unwrap();
        assert!(MemorySource::from_json(&path).is_err());
    }
}

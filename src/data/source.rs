//! Frame source abstraction
//!
//! A `FrameSource` is one opened recording: named frame datasets, a target
//! vector per sample, and train/test split indices. The HDF5-backed reader
//! lives outside this crate; everything here is written against the trait.

use crate::error::{Error, Result};
use ndarray::Array2;

/// Which split of a source to iterate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    /// Index-list name inside the source, matching the recording layout.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Split::Train => "train_idxs",
            Split::Test => "test_idxs",
        }
    }
}

/// How DVS polarity channels are delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelPolicy {
    /// Fold the two polarity channels into one frame
    Merged,
    /// Keep both polarity channels
    SeparatePolarity,
}

/// One opened recording.
pub trait FrameSource {
    fn id(&self) -> &str;

    fn has_key(&self, key: &str) -> bool;

    fn split_indices(&self, split: Split) -> &[usize];

    /// Flattened frame length the given key delivers under the policy.
    fn frame_len(&self, key: &str, policy: ChannelPolicy) -> Result<usize>;

    /// Read the frames at `idxs` as a `(len(idxs), frame_len)` matrix.
    fn read_frames(&self, key: &str, idxs: &[usize], policy: ChannelPolicy)
        -> Result<Array2<f32>>;

    /// Read the prediction targets at `idxs` as a `(len(idxs), t)` matrix.
    fn read_targets(&self, idxs: &[usize]) -> Result<Array2<f32>>;
}

/// Drop sources that do not carry their configured dataset key.
///
/// A recording with a missing key is treated as corrupted and skipped before
/// training begins; the run only fails if nothing valid remains.
pub fn filter_valid_sources<S: FrameSource>(
    sources: Vec<S>,
    keys: Vec<String>,
) -> Result<(Vec<S>, Vec<String>)> {
    let mut kept_sources = Vec::new();
    let mut kept_keys = Vec::new();
    for (source, key) in sources.into_iter().zip(keys) {
        if source.has_key(&key) {
            kept_sources.push(source);
            kept_keys.push(key);
        } else {
            println!("Skipping source '{}': missing dataset key '{key}'", source.id());
        }
    }
    if kept_sources.is_empty() {
        return Err(Error::NoValidSources);
    }
    Ok((kept_sources, kept_keys))
}

/// Paired variant for the encoder-decoder arrangement: an APS/DVS recording
/// pair is kept only if both sides carry their key, and dropped as a unit
/// otherwise.
#[allow(clippy::type_complexity)]
pub fn filter_valid_pairs<S: FrameSource>(
    aps_sources: Vec<S>,
    aps_keys: Vec<String>,
    dvs_sources: Vec<S>,
    dvs_keys: Vec<String>,
) -> Result<(Vec<S>, Vec<String>, Vec<S>, Vec<String>)> {
    let mut kept = (Vec::new(), Vec::new(), Vec::new(), Vec::new());
    for (((aps, aps_key), dvs), dvs_key) in
        aps_sources.into_iter().zip(aps_keys).zip(dvs_sources).zip(dvs_keys)
    {
        if aps.has_key(&aps_key) && dvs.has_key(&dvs_key) {
            kept.0.push(aps);
            kept.1.push(aps_key);
            kept.2.push(dvs);
            kept.3.push(dvs_key);
        } else {
            println!(
                "Skipping pair ('{}', '{}'): missing dataset key",
                aps.id(),
                dvs.id()
            );
        }
    }
    if kept.0.is_empty() {
        return Err(Error::NoValidSources);
    }
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemorySource;
    use ndarray::arr2;

    fn source(id: &str, key: &str) -> MemorySource {
        MemorySource::new(id)
            .with_dataset(key, arr2(&[[1.0, 2.0], [3.0, 4.0]]))
            .with_targets(arr2(&[[0.1], [0.2]]))
            .with_splits(vec![0], vec![1])
    }

    #[test]
    fn test_split_keys() {
        assert_eq!(Split::Train.key(), "train_idxs");
        assert_eq!(Split::Test.key(), "test_idxs");
    }

    #[test]
    fn test_filter_keeps_valid_sources() {
        let sources = vec![source("a", "aps"), source("b", "dvs"), source("c", "aps")];
        let keys = vec!["aps".to_string(), "aps".to_string(), "aps".to_string()];
        let (kept, kept_keys) = filter_valid_sources(sources, keys).unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept_keys.len(), 2);
        assert_eq!(kept[0].id(), "a");
        assert_eq!(kept[1].id(), "c");
    }

    #[test]
    fn test_filter_errors_when_nothing_remains() {
        let sources = vec![source("a", "dvs")];
        let keys = vec!["aps".to_string()];
        assert!(matches!(filter_valid_sources(sources, keys), Err(Error::NoValidSources)));
    }

    #[test]
    fn test_pair_filter_drops_as_unit() {
        let aps = vec![source("a1", "aps"), source("a2", "aps")];
        let dvs = vec![source("d1", "dvs"), source("d2", "other")];
        let (kept_aps, _, kept_dvs, _) = filter_valid_pairs(
            aps,
            vec!["aps".into(), "aps".into()],
            dvs,
            vec!["dvs".into(), "dvs".into()],
        )
        .unwrap();
        assert_eq!(kept_aps.len(), 1);
        assert_eq!(kept_dvs.len(), 1);
        assert_eq!(kept_aps[0].id(), "a1");
    }
}

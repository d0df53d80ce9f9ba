//! Multi-source batch flow
//!
//! A `BatchFlow` is one pass over a split: a lazily-assembled sequence of
//! `(input, target)` batches drawn from every valid source. Construct a new
//! flow per epoch; shuffling, when enabled, is re-randomized from the
//! caller's RNG on every construction. The trailing partial batch is yielded
//! like any other — whether to use it is the consumer's policy.

use super::source::{ChannelPolicy, FrameSource, Split};
use crate::error::{Error, Result};
use crate::train::Batch;
use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::Rng;

/// Where a batch's targets come from.
enum TargetSide<'a, S> {
    /// The targets stored alongside the frames (steering labels)
    Stored,
    /// Frames of an aligned source list (encoder-decoder reconstruction)
    Frames { sources: &'a [S], keys: &'a [String] },
}

/// One restartable pass of `(input, target)` batches over a split.
pub struct BatchFlow<'a, S: FrameSource> {
    sources: &'a [S],
    keys: &'a [String],
    targets: TargetSide<'a, S>,
    policy: ChannelPolicy,
    batch_size: usize,
    /// (source index, sample row), pre-shuffled for the whole pass
    order: Vec<(usize, usize)>,
    cursor: usize,
}

fn build_order<S: FrameSource, R: Rng + ?Sized>(
    sources: &[S],
    split: Split,
    shuffle: bool,
    rng: &mut R,
) -> Vec<(usize, usize)> {
    let mut order: Vec<(usize, usize)> = sources
        .iter()
        .enumerate()
        .flat_map(|(i, s)| s.split_indices(split).iter().map(move |&row| (i, row)))
        .collect();
    if shuffle {
        order.shuffle(rng);
    }
    order
}

impl<'a, S: FrameSource> BatchFlow<'a, S> {
    /// Flow with inputs from `sources[keys]` and stored targets.
    pub fn direct<R: Rng + ?Sized>(
        sources: &'a [S],
        keys: &'a [String],
        split: Split,
        batch_size: usize,
        shuffle: bool,
        policy: ChannelPolicy,
        rng: &mut R,
    ) -> Self {
        let order = build_order(sources, split, shuffle, rng);
        Self {
            sources,
            keys,
            targets: TargetSide::Stored,
            policy,
            batch_size,
            order,
            cursor: 0,
        }
    }

    /// Encoder-decoder flow: inputs from the DVS sources, targets from the
    /// aligned APS sources. Source lists must be pair-aligned.
    #[allow(clippy::too_many_arguments)]
    pub fn paired<R: Rng + ?Sized>(
        aps_sources: &'a [S],
        aps_keys: &'a [String],
        dvs_sources: &'a [S],
        dvs_keys: &'a [String],
        split: Split,
        batch_size: usize,
        shuffle: bool,
        policy: ChannelPolicy,
        rng: &mut R,
    ) -> Self {
        let order = build_order(dvs_sources, split, shuffle, rng);
        Self {
            sources: dvs_sources,
            keys: dvs_keys,
            targets: TargetSide::Frames { sources: aps_sources, keys: aps_keys },
            policy,
            batch_size,
            order,
            cursor: 0,
        }
    }

    /// Total number of samples in this pass.
    #[must_use]
    pub fn num_samples(&self) -> usize {
        self.order.len()
    }

    /// Gather one matrix for `chunk`, reading each source once.
    fn gather<F>(&self, chunk: &[(usize, usize)], read: F) -> Result<Array2<f32>>
    where
        F: Fn(usize, &[usize]) -> Result<Array2<f32>>,
    {
        // Group the chunk rows by source, remembering each row's position in
        // the batch so per-source reads scatter back in order.
        let mut per_source: Vec<(Vec<usize>, Vec<usize>)> =
            vec![(Vec::new(), Vec::new()); self.sources.len()];
        for (pos, &(src, row)) in chunk.iter().enumerate() {
            per_source[src].0.push(row);
            per_source[src].1.push(pos);
        }

        let mut out: Option<Array2<f32>> = None;
        for (src, (rows, positions)) in per_source.iter().enumerate() {
            if rows.is_empty() {
                continue;
            }
            let frames = read(src, rows)?;
            let ncols = frames.ncols();
            let out = out.get_or_insert_with(|| Array2::zeros((chunk.len(), ncols)));
            if out.ncols() != ncols {
                return Err(Error::Shape(format!(
                    "source '{}' delivers frames of length {ncols}, expected {}",
                    self.sources[src].id(),
                    out.ncols()
                )));
            }
            for (batch_row, frame) in positions.iter().zip(frames.rows()) {
                out.row_mut(*batch_row).assign(&frame);
            }
        }
        out.ok_or_else(|| Error::Shape("empty batch chunk".into()))
    }

    fn assemble(&self, chunk: &[(usize, usize)]) -> Result<Batch> {
        let inputs = self.gather(chunk, |src, rows| {
            self.sources[src].read_frames(&self.keys[src], rows, self.policy)
        })?;
        let targets = match &self.targets {
            TargetSide::Stored => {
                self.gather(chunk, |src, rows| self.sources[src].read_targets(rows))?
            }
            TargetSide::Frames { sources, keys } => self.gather(chunk, |src, rows| {
                sources[src].read_frames(&keys[src], rows, ChannelPolicy::Merged)
            })?,
        };
        Ok(Batch::new(inputs, targets))
    }
}

/// The filtered, validated sources of one run, in either arrangement.
pub enum SourceSet<S: FrameSource> {
    Direct {
        sources: Vec<S>,
        keys: Vec<String>,
    },
    Paired {
        aps_sources: Vec<S>,
        aps_keys: Vec<String>,
        dvs_sources: Vec<S>,
        dvs_keys: Vec<String>,
    },
}

impl<S: FrameSource> SourceSet<S> {
    /// Start one pass of batches over `split`.
    pub fn flow<'a, R: Rng + ?Sized>(
        &'a self,
        split: Split,
        batch_size: usize,
        shuffle: bool,
        policy: ChannelPolicy,
        rng: &mut R,
    ) -> BatchFlow<'a, S> {
        match self {
            SourceSet::Direct { sources, keys } => {
                BatchFlow::direct(sources, keys, split, batch_size, shuffle, policy, rng)
            }
            SourceSet::Paired { aps_sources, aps_keys, dvs_sources, dvs_keys } => {
                BatchFlow::paired(
                    aps_sources, aps_keys, dvs_sources, dvs_keys, split, batch_size, shuffle,
                    policy, rng,
                )
            }
        }
    }

    /// Flattened input frame length under `policy`.
    ///
    /// Every source in the set must deliver the same width; a mismatch
    /// surfaces here, before any pass starts.
    pub fn input_len(&self, policy: ChannelPolicy) -> Result<usize> {
        match self {
            SourceSet::Direct { sources, keys } => consistent_frame_len(sources, keys, policy),
            SourceSet::Paired { dvs_sources, dvs_keys, .. } => {
                consistent_frame_len(dvs_sources, dvs_keys, policy)
            }
        }
    }

    /// Width of the target rows: stored targets for the direct arrangement,
    /// the merged APS frame length for reconstruction.
    pub fn target_len(&self) -> Result<usize> {
        match self {
            SourceSet::Direct { sources, .. } => {
                let source = sources.first().ok_or(Error::NoValidSources)?;
                let idx = source
                    .split_indices(Split::Train)
                    .first()
                    .or_else(|| source.split_indices(Split::Test).first())
                    .copied()
                    .unwrap_or(0);
                Ok(source.read_targets(&[idx])?.ncols())
            }
            SourceSet::Paired { aps_sources, aps_keys, .. } => {
                consistent_frame_len(aps_sources, aps_keys, ChannelPolicy::Merged)
            }
        }
    }
}

/// Frame length shared by every source in a list, or the first disagreement
/// as a shape error.
fn consistent_frame_len<S: FrameSource>(
    sources: &[S],
    keys: &[String],
    policy: ChannelPolicy,
) -> Result<usize> {
    let first = sources.first().ok_or(Error::NoValidSources)?;
    let len = first.frame_len(&keys[0], policy)?;
    for (source, key) in sources.iter().zip(keys).skip(1) {
        let other = source.frame_len(key, policy)?;
        if other != len {
            return Err(Error::Shape(format!(
                "source '{}' delivers frames of length {other}, expected {len}",
                source.id()
            )));
        }
    }
    Ok(len)
}

impl<S: FrameSource> Iterator for BatchFlow<'_, S> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let chunk = self.order[self.cursor..end].to_vec();
        self.cursor = end;
        Some(self.assemble(&chunk))
    }
}

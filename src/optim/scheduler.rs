//! Learning-rate decay schedule

use super::Optimizer;

/// Fixed milestone decay: divide the learning rate by `factor` when a
/// milestone epoch finishes.
///
/// The driving schedule places milestones at 50/60/70/80/90% of the total
/// epoch count, each index truncated toward zero. Duplicate milestones (small
/// epoch counts) collapse, so a given epoch decays at most once.
pub struct MilestoneDecay {
    milestones: Vec<usize>,
    factor: f32,
}

impl MilestoneDecay {
    #[must_use]
    pub fn new(milestones: &[usize], factor: f32) -> Self {
        let mut milestones = milestones.to_vec();
        milestones.sort_unstable();
        milestones.dedup();
        Self { milestones, factor }
    }

    /// The schedule used for driving runs: `{⌊0.5E⌋,⌊0.6E⌋,⌊0.7E⌋,⌊0.8E⌋,⌊0.9E⌋}`,
    /// dividing by 5 at each.
    #[must_use]
    pub fn driving_schedule(num_epochs: usize) -> Self {
        let milestones: Vec<usize> = [5usize, 6, 7, 8, 9]
            .iter()
            .map(|k| num_epochs * k / 10)
            .collect();
        Self::new(&milestones, 5.0)
    }

    #[must_use]
    pub fn milestones(&self) -> &[usize] {
        &self.milestones
    }

    #[must_use]
    pub fn is_milestone(&self, epoch: usize) -> bool {
        self.milestones.binary_search(&epoch).is_ok()
    }

    /// Apply the decay for `epoch` to the optimizer, if it is a milestone.
    pub fn apply(&self, optimizer: &mut dyn Optimizer, epoch: usize) {
        if self.is_milestone(epoch) {
            let lr = optimizer.lr() / self.factor;
            optimizer.set_lr(lr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::Sgd;
    use approx::assert_relative_eq;

    #[test]
    fn test_driving_milestones_for_30_epochs() {
        let decay = MilestoneDecay::driving_schedule(30);
        assert_eq!(decay.milestones(), &[15, 18, 21, 24, 27]);
    }

    #[test]
    fn test_small_epoch_counts_dedupe() {
        let decay = MilestoneDecay::driving_schedule(3);
        // ⌊1.5⌋=1, ⌊1.8⌋=1, ⌊2.1⌋=2, ⌊2.4⌋=2, ⌊2.7⌋=2
        assert_eq!(decay.milestones(), &[1, 2]);
    }

    #[test]
    fn test_apply_divides_by_factor_only_at_milestones() {
        let decay = MilestoneDecay::driving_schedule(10);
        let mut opt = Sgd::new(1.0, 0.0, 0.0);

        decay.apply(&mut opt, 4);
        assert_relative_eq!(opt.lr(), 1.0);
        decay.apply(&mut opt, 5);
        assert_relative_eq!(opt.lr(), 0.2);
        decay.apply(&mut opt, 6);
        assert_relative_eq!(opt.lr(), 0.04);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::optim::{Optimizer, Sgd};
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    proptest! {
        /// The milestone set is exactly {⌊0.5E⌋,⌊0.6E⌋,⌊0.7E⌋,⌊0.8E⌋,⌊0.9E⌋}.
        #[test]
        fn milestones_match_definition(num_epochs in 1usize..10_000) {
            let decay = MilestoneDecay::driving_schedule(num_epochs);
            let expected: BTreeSet<usize> =
                [5usize, 6, 7, 8, 9].iter().map(|k| num_epochs * k / 10).collect();
            let actual: BTreeSet<usize> = decay.milestones().iter().copied().collect();
            prop_assert_eq!(actual, expected);
        }

        /// Across a full run, the lr is prior/5 at each milestone epoch and
        /// unchanged at every other epoch.
        #[test]
        fn decay_applies_exactly_at_milestones(num_epochs in 1usize..200) {
            let decay = MilestoneDecay::driving_schedule(num_epochs);
            let mut opt = Sgd::new(1.0, 0.0, 0.0);

            for epoch in 0..num_epochs {
                let before = opt.lr();
                decay.apply(&mut opt, epoch);
                if decay.is_milestone(epoch) {
                    prop_assert!((opt.lr() - before / 5.0).abs() <= f32::EPSILON * before);
                } else {
                    prop_assert_eq!(opt.lr(), before);
                }
            }
        }
    }
}

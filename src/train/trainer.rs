//! Epoch loop controller
//!
//! One `Trainer` owns a run: the model and optimizer built from the
//! configuration, the checkpoint store keyed by the combined filename, and
//! the RNG every shuffle and noise draw flows through. The epoch sequence is
//! fixed: train pass, latest snapshot, eval pass, best-checkpoint check,
//! learning-rate decay.

use crate::config::RunConfig;
use crate::data::{ChannelPolicy, FrameSource, SourceSet, Split};
use crate::error::{Error, Result};
use crate::model::{build_model, ActivitySummary, Model};
use crate::optim::{build_optimizer, MilestoneDecay, Optimizer};
use crate::train::checkpoint::CheckpointStore;
use crate::train::loss::{LossFn, MseLoss};
use crate::train::metrics::{EpochRecord, ErrorAccum};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// What a completed training run produced.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    /// Per-epoch records, in execution order
    pub history: Vec<EpochRecord>,
    /// Lowest test error seen, including any resumed-from bundle
    pub best_test_error: f32,
    /// Epoch the run started at (non-zero after a resume)
    pub start_epoch: usize,
}

/// Drives one run over a fixed source set.
pub struct Trainer<'a, S: FrameSource> {
    config: &'a RunConfig,
    data: &'a SourceSet<S>,
    store: CheckpointStore,
    schedule: MilestoneDecay,
    model: Box<dyn Model>,
    encoder: Option<Box<dyn Model>>,
    optimizer: Box<dyn Optimizer>,
    policy: ChannelPolicy,
    rng: StdRng,
}

impl<S: FrameSource> std::fmt::Debug for Trainer<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trainer").finish_non_exhaustive()
    }
}

impl<'a, S: FrameSource> Trainer<'a, S> {
    /// Build the controller for a validated configuration.
    ///
    /// `encoder`, when given, is a frozen pretrained model applied to every
    /// input batch before the main network; the main network's input width
    /// is then the encoder's output width.
    pub fn new(
        config: &'a RunConfig,
        data: &'a SourceSet<S>,
        encoder: Option<Box<dyn Model>>,
    ) -> Result<Self> {
        config.validate()?;
        let policy = if config.arch.separate_dvs_channels {
            ChannelPolicy::SeparatePolarity
        } else {
            ChannelPolicy::Merged
        };
        let frame_len = data.input_len(policy)?;
        let input_dim = match &encoder {
            Some(enc) => {
                if enc.input_dim() != frame_len {
                    return Err(Error::Config(format!(
                        "encoder expects inputs of length {} but the data delivers \
                         frames of length {frame_len}",
                        enc.input_dim()
                    )));
                }
                enc.forward(&Array2::zeros((1, frame_len))).ncols()
            }
            None => frame_len,
        };
        let output_dim = data.target_len()?;
        let model = build_model(&config.arch, input_dim, output_dim);
        let optimizer = build_optimizer(config.optimizer, config.lr);
        let store = CheckpointStore::new(
            config.checkpoint_dir.clone(),
            config.result_dir.clone(),
            config.combined_filename(),
        );
        let schedule = MilestoneDecay::driving_schedule(config.num_epochs);
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            data,
            store,
            schedule,
            model,
            encoder,
            optimizer,
            policy,
            rng,
        })
    }

    /// The checkpoint store this run persists through.
    #[must_use]
    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    fn encode(&self, inputs: Array2<f32>) -> Array2<f32> {
        match &self.encoder {
            Some(enc) => enc.forward(&inputs),
            None => inputs,
        }
    }

    /// Run the remaining epochs, resuming from the best bundle when one
    /// exists.
    pub fn train(&mut self) -> Result<TrainOutcome> {
        let (start_epoch, mut best) =
            match self.store.resume(self.model.as_mut(), self.optimizer.as_mut()) {
                Ok(resumed) => {
                    println!(
                        "Found checkpoint. Resuming training at epoch {}.",
                        resumed.start_epoch
                    );
                    (resumed.start_epoch, resumed.best_test_error)
                }
                Err(Error::CheckpointNotFound { .. }) => {
                    println!("Checkpoint not found. Training from scratch.");
                    (0, f32::INFINITY)
                }
                Err(e) => return Err(e),
            };

        let mut history = Vec::new();
        for epoch in start_epoch..self.config.num_epochs {
            let train_error = self.train_pass()?;
            self.store.save_latest(&self.model.state())?;
            let test_error = self.eval_pass()?;
            println!(
                "Epoch: {epoch}, Train Avg RMSE: {train_error:.6}, Test Avg RMSE: {test_error:.6}"
            );
            let record = EpochRecord { epoch, train_error, test_error };
            best = self.store.maybe_save_best(
                record,
                self.model.state(),
                self.optimizer.state(),
                best,
            )?;
            self.schedule.apply(self.optimizer.as_mut(), epoch);
            history.push(record);
        }
        Ok(TrainOutcome { history, best_test_error: best, start_epoch })
    }

    /// One optimization pass over the train split.
    ///
    /// Trailing partial batches are dropped, matching the semantics the
    /// recorded error curves were produced under.
    fn train_pass(&mut self) -> Result<f32> {
        let data = self.data;
        let flow = data.flow(
            Split::Train,
            self.config.batch_size,
            true,
            self.policy,
            &mut self.rng,
        );
        let mut acc = ErrorAccum::new();
        for batch in flow {
            let batch = batch?;
            if batch.size() < self.config.batch_size {
                continue;
            }
            let size = batch.size();
            let inputs = self.encode(batch.inputs);
            let predictions = self.model.forward(&inputs);
            let loss = MseLoss.forward(&predictions, &batch.targets);
            let grad = MseLoss.grad(&predictions, &batch.targets);
            self.optimizer.zero_grad(self.model.params_mut());
            self.model.backward(&inputs, &grad);
            self.optimizer.step(self.model.params_mut());
            acc.add(loss, size);
        }
        Ok(acc.finish())
    }

    /// One forward-only pass over the test split, with optional additive
    /// Gaussian input noise.
    fn eval_pass(&mut self) -> Result<f32> {
        let data = self.data;
        let flow = data.flow(
            Split::Test,
            self.config.batch_size,
            true,
            self.policy,
            &mut self.rng,
        );
        let noise = if self.config.noise > 0.0 {
            let normal = Normal::new(0.0, self.config.noise)
                .map_err(|e| Error::Config(format!("bad noise std: {e}")))?;
            Some(normal)
        } else {
            None
        };
        let mut acc = ErrorAccum::new();
        for batch in flow {
            let batch = batch?;
            if batch.size() < self.config.batch_size {
                continue;
            }
            let size = batch.size();
            let mut inputs = batch.inputs;
            if let Some(normal) = noise {
                let rng = &mut self.rng;
                inputs.mapv_inplace(|v| v + normal.sample(rng));
            }
            let inputs = self.encode(inputs);
            let predictions = self.model.forward(&inputs);
            acc.add(MseLoss.forward(&predictions, &batch.targets), size);
        }
        Ok(acc.finish())
    }

    /// Evaluation-only mode: load the latest snapshot and report its test
    /// error without touching any checkpoint.
    pub fn evaluate(&mut self) -> Result<f32> {
        let state = self.store.load_latest()?;
        self.model.load_state(&state)?;
        let error = self.eval_pass()?;
        println!("Test Avg RMSE: {error:.6}");
        Ok(error)
    }

    /// Activity-introspection mode: one pass over the test split averaging
    /// the per-layer activity summaries.
    pub fn activity(&mut self) -> Result<ActivitySummary> {
        let state = self.store.load_latest()?;
        self.model.load_state(&state)?;

        let data = self.data;
        let flow = data.flow(
            Split::Test,
            self.config.batch_size,
            true,
            self.policy,
            &mut self.rng,
        );
        let mut summary = ActivitySummary::default();
        let mut batches = 0usize;
        for batch in flow {
            let batch = batch?;
            if batch.size() < self.config.batch_size {
                continue;
            }
            let inputs = self.encode(batch.inputs);
            let (_, activity) = self.model.forward_with_activity(&inputs);
            summary.accumulate(&activity)?;
            batches += 1;
        }
        if batches > 0 {
            summary.scale(1.0 / batches as f32);
        }
        println!("Average layer activity: {summary}");
        Ok(summary)
    }
}

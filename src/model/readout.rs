//! Concrete catalog members
//!
//! Two minimal networks with analytic gradients: a dense linear readout and
//! a spike-rate readout whose forward pass quantizes membrane potentials
//! into firing rates over a fixed number of timesteps, trained through a
//! boxcar surrogate gradient.

use super::{ActivitySummary, Model, Param};
use ndarray::{Array1, Array2, Axis};

/// Linear readout: `y = X·W + b`.
///
/// One output unit for steering regression; `output_dim` equal to the frame
/// length when used as a reconstruction decoder. The weight matrix is stored
/// flat so it checkpoints like any other named parameter.
pub struct DenseReadout {
    params: Vec<Param>,
    input_dim: usize,
    output_dim: usize,
}

impl DenseReadout {
    #[must_use]
    pub fn new(input_dim: usize, output_dim: usize) -> Self {
        Self {
            params: vec![
                Param::new("weight", Array1::zeros(input_dim * output_dim)),
                Param::new("bias", Array1::zeros(output_dim)),
            ],
            input_dim,
            output_dim,
        }
    }

    /// Rebuild a readout from a latest-snapshot state. The dimensions are
    /// implied by the snapshot itself: `output_dim` is the bias length.
    pub fn from_state(state: &crate::model::ModelState) -> crate::error::Result<Self> {
        let bias_len = state
            .iter()
            .find(|(name, _)| name == "bias")
            .map(|(_, v)| v.len())
            .ok_or_else(|| {
                crate::error::Error::Serialization("snapshot has no 'bias' parameter".into())
            })?;
        let weight_len = state
            .iter()
            .find(|(name, _)| name == "weight")
            .map(|(_, v)| v.len())
            .ok_or_else(|| {
                crate::error::Error::Serialization("snapshot has no 'weight' parameter".into())
            })?;
        if bias_len == 0 || weight_len % bias_len != 0 {
            return Err(crate::error::Error::Serialization(format!(
                "snapshot weight length {weight_len} does not divide into {bias_len} outputs"
            )));
        }
        let mut model = Self::new(weight_len / bias_len, bias_len);
        model.load_state(state)?;
        Ok(model)
    }

    fn weight_matrix(&self) -> Array2<f32> {
        self.params[0]
            .value
            .clone()
            .into_shape_with_order((self.input_dim, self.output_dim))
            .unwrap_or_else(|_| Array2::zeros((self.input_dim, self.output_dim)))
    }
}

impl Model for DenseReadout {
    fn name(&self) -> &'static str {
        "dense_readout"
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn forward(&self, input: &Array2<f32>) -> Array2<f32> {
        input.dot(&self.weight_matrix()) + &self.params[1].value
    }

    fn backward(&mut self, input: &Array2<f32>, grad_output: &Array2<f32>) {
        let dw = input.t().dot(grad_output);
        let dw = Array1::from_iter(dw.iter().copied());
        let db = grad_output.sum_axis(Axis(0));
        self.params[0].accumulate_grad(dw);
        self.params[1].accumulate_grad(db);
    }

    fn params(&self) -> &[Param] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [Param] {
        &mut self.params
    }
}

/// Spike-rate readout.
///
/// Membrane potential `m = X·w + b` is converted into a firing rate by
/// counting the timesteps in which the membrane clears the threshold ramp:
/// `rate = floor(clamp(m/θ, 0, 1)·T)/T`. The backward pass uses a boxcar
/// surrogate, `d rate/d m = 1/θ` inside the ramp and 0 outside.
pub struct SpikeRateReadout {
    params: Vec<Param>,
    timesteps: usize,
    threshold: f32,
}

impl SpikeRateReadout {
    #[must_use]
    pub fn new(input_dim: usize, timesteps: usize) -> Self {
        Self {
            params: vec![
                Param::new("weight", Array1::zeros(input_dim)),
                Param::new("bias", Array1::zeros(1)),
            ],
            timesteps,
            threshold: 1.0,
        }
    }

    fn membrane(&self, input: &Array2<f32>) -> Array1<f32> {
        input.dot(&self.params[0].value) + self.params[1].value[0]
    }

    fn rate(&self, m: f32) -> f32 {
        let t = self.timesteps as f32;
        ((m / self.threshold).clamp(0.0, 1.0) * t).floor() / t
    }
}

impl Model for SpikeRateReadout {
    fn name(&self) -> &'static str {
        "spike_rate_readout"
    }

    fn input_dim(&self) -> usize {
        self.params[0].value.len()
    }

    fn forward(&self, input: &Array2<f32>) -> Array2<f32> {
        let rates = self.membrane(input).mapv(|m| self.rate(m));
        let n = rates.len();
        rates.into_shape_with_order((n, 1)).expect("column reshape of a 1-d array")
    }

    fn backward(&mut self, input: &Array2<f32>, grad_output: &Array2<f32>) {
        let m = self.membrane(input);
        let g = grad_output.index_axis(Axis(1), 0).to_owned();
        // Surrogate: gradient flows only where the membrane sits on the ramp.
        let surrogate = m.mapv(|v| {
            if v > 0.0 && v < self.threshold {
                1.0 / self.threshold
            } else {
                0.0
            }
        });
        let dm = &g * &surrogate;
        let dw = input.t().dot(&dm);
        let db = Array1::from_elem(1, dm.sum());
        self.params[0].accumulate_grad(dw);
        self.params[1].accumulate_grad(db);
    }

    fn forward_with_activity(&self, input: &Array2<f32>) -> (Array2<f32>, ActivitySummary) {
        let m = self.membrane(input);
        let n = m.len() as f32;
        let active = m.iter().filter(|v| **v > 0.0).count() as f32 / n.max(1.0);
        let rates = m.mapv(|v| self.rate(v));
        let mean_rate = rates.sum() / n.max(1.0);
        let len = rates.len();
        let out = rates.into_shape_with_order((len, 1)).expect("column reshape of a 1-d array");
        (out, ActivitySummary { layer_rates: vec![active, mean_rate] })
    }

    fn params(&self) -> &[Param] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [Param] {
        &mut self.params
    }
}

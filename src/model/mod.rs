//! Model abstraction
//!
//! The driver treats networks as opaque parameterized functions: `forward`
//! maps an input batch to predictions, `backward` fills parameter gradients
//! analytically (there is no autograd engine here), and the named-parameter
//! state round-trips through checkpoints. Spiking members additionally report
//! a per-layer activity summary.

mod arch;
mod readout;

pub use arch::{build_model, ArchDescriptor, ArchVariant, Modality};
pub use readout::{DenseReadout, SpikeRateReadout};

use crate::error::{Error, Result};
use ndarray::{Array1, Array2};
use std::fmt;

/// A named model parameter with an optional accumulated gradient.
#[derive(Clone, Debug)]
pub struct Param {
    pub name: String,
    pub value: Array1<f32>,
    grad: Option<Array1<f32>>,
}

impl Param {
    pub fn new(name: impl Into<String>, value: Array1<f32>) -> Self {
        Self { name: name.into(), value, grad: None }
    }

    pub fn grad(&self) -> Option<&Array1<f32>> {
        self.grad.as_ref()
    }

    /// Add a gradient contribution, initializing the buffer on first use.
    pub fn accumulate_grad(&mut self, g: Array1<f32>) {
        match self.grad.as_mut() {
            Some(existing) => *existing += &g,
            None => self.grad = Some(g),
        }
    }

    pub fn zero_grad(&mut self) {
        self.grad = None;
    }
}

/// Serializable named-parameter state, the payload of both checkpoint
/// artifacts.
pub type ModelState = Vec<(String, Vec<f32>)>;

/// Fixed-size per-layer activity statistics reported by spiking models.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActivitySummary {
    pub layer_rates: Vec<f32>,
}

impl ActivitySummary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layer_rates.is_empty()
    }

    /// Element-wise accumulation; adopts the shape on first use.
    pub fn accumulate(&mut self, other: &ActivitySummary) -> Result<()> {
        if self.layer_rates.is_empty() {
            self.layer_rates = other.layer_rates.clone();
            return Ok(());
        }
        if self.layer_rates.len() != other.layer_rates.len() {
            return Err(Error::Shape(format!(
                "activity summary has {} layers, expected {}",
                other.layer_rates.len(),
                self.layer_rates.len()
            )));
        }
        for (a, b) in self.layer_rates.iter_mut().zip(&other.layer_rates) {
            *a += b;
        }
        Ok(())
    }

    pub fn scale(&mut self, factor: f32) {
        for r in &mut self.layer_rates {
            *r *= factor;
        }
    }
}

impl fmt::Display for ActivitySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, r) in self.layer_rates.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{r:.4}")?;
        }
        write!(f, "]")
    }
}

/// A parameterized function from input batch to output batch.
///
/// Inputs and outputs are `(batch, features)` matrices. Gradients are the
/// model's own responsibility; the driver only hands it `dL/d(output)`.
pub trait Model {
    fn name(&self) -> &'static str;

    /// Number of input features a forward batch must have.
    fn input_dim(&self) -> usize;

    fn forward(&self, input: &Array2<f32>) -> Array2<f32>;

    /// Accumulate parameter gradients for `dL/d(output) = grad_output`.
    fn backward(&mut self, input: &Array2<f32>, grad_output: &Array2<f32>);

    fn params(&self) -> &[Param];

    fn params_mut(&mut self) -> &mut [Param];

    /// Forward pass that also reports per-layer activity. Non-spiking models
    /// return an empty summary.
    fn forward_with_activity(&self, input: &Array2<f32>) -> (Array2<f32>, ActivitySummary) {
        (self.forward(input), ActivitySummary::default())
    }

    /// Snapshot of all named parameters.
    fn state(&self) -> ModelState {
        self.params().iter().map(|p| (p.name.clone(), p.value.to_vec())).collect()
    }

    /// Install a parameter snapshot. Names, order, and shapes must match.
    fn load_state(&mut self, state: &ModelState) -> Result<()> {
        let params = self.params_mut();
        if state.len() != params.len() {
            return Err(Error::Serialization(format!(
                "state has {} parameters, model has {}",
                state.len(),
                params.len()
            )));
        }
        for (param, (name, data)) in params.iter_mut().zip(state) {
            if &param.name != name {
                return Err(Error::Serialization(format!(
                    "parameter name mismatch: state has '{name}', model expects '{}'",
                    param.name
                )));
            }
            if param.value.len() != data.len() {
                return Err(Error::Serialization(format!(
                    "parameter '{name}' has {} values in state, model expects {}",
                    data.len(),
                    param.value.len()
                )));
            }
            param.value = Array1::from_vec(data.clone());
        }
        Ok(())
    }
}

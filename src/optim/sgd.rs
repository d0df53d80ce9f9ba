//! Stochastic Gradient Descent optimizer

use super::optimizer::{check_kind, Optimizer, OptimizerSlot, OptimizerState};
use crate::error::Result;
use crate::model::Param;
use ndarray::Array1;

/// SGD with momentum and L2 weight decay.
///
/// Update rule: `g' = g + wd·θ`, `v = momentum·v - lr·g'`, `θ += v`.
pub struct Sgd {
    lr: f32,
    momentum: f32,
    weight_decay: f32,
    velocities: Vec<Option<Array1<f32>>>,
}

impl Sgd {
    #[must_use]
    pub fn new(lr: f32, momentum: f32, weight_decay: f32) -> Self {
        Self { lr, momentum, weight_decay, velocities: Vec::new() }
    }

    fn ensure_velocities(&mut self, params: &[Param]) {
        if self.velocities.is_empty() {
            self.velocities = params.iter().map(|_| None).collect();
        }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: &mut [Param]) {
        self.ensure_velocities(params);

        for (i, param) in params.iter_mut().enumerate() {
            let Some(grad) = param.grad() else { continue };
            let grad = grad + &(&param.value * self.weight_decay);

            if self.momentum > 0.0 {
                let velocity = match &self.velocities[i] {
                    Some(v) => v * self.momentum - &grad * self.lr,
                    None => &grad * (-self.lr),
                };
                param.value += &velocity;
                self.velocities[i] = Some(velocity);
            } else {
                param.value -= &(&grad * self.lr);
            }
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn state(&self) -> OptimizerState {
        OptimizerState {
            kind: "SGD".into(),
            lr: self.lr,
            step_count: 0,
            slots: self
                .velocities
                .iter()
                .map(|v| OptimizerSlot { first: v.as_ref().map(|a| a.to_vec()), second: None })
                .collect(),
        }
    }

    fn load_state(&mut self, state: &OptimizerState) -> Result<()> {
        check_kind("SGD", state)?;
        self.lr = state.lr;
        self.velocities = state
            .slots
            .iter()
            .map(|s| s.first.as_ref().map(|v| Array1::from_vec(v.clone())))
            .collect();
        Ok(())
    }
}

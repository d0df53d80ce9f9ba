//! Architecture selection
//!
//! Network choice is a tree of boolean flags from the CLI. The combination
//! is an `ArchDescriptor` resolved once, at startup, into a single
//! `ArchVariant`, and the factory hands back one polymorphic model handle. Real layer graphs (VGG/ResNet/SNN zoos) live
//! outside this crate; the catalog members below are the minimal runnable
//! stand-ins.

use super::readout::{DenseReadout, SpikeRateReadout};
use super::Model;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Input sensor modality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modality {
    /// Conventional active-pixel-sensor frames
    Aps,
    /// Event-based dynamic-vision-sensor frames
    Dvs,
}

/// Architecture-selection flags, fixed for the duration of a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchDescriptor {
    pub spiking: bool,
    /// Batch-norm-through-time variant (spiking only)
    pub bntt: bool,
    /// Hybrid SNN+ANN variant (spiking BNTT only)
    pub hybrid: bool,
    /// Encoder-decoder arrangement: reconstruct APS frames from DVS input
    pub encoder_decoder: bool,
    /// Run inputs through a frozen pretrained encoder before the main network
    pub use_encoder: bool,
    /// Keep DVS polarity channels separate instead of merging them
    pub separate_dvs_channels: bool,
    pub modality: Modality,
    /// Timesteps a spiking forward pass integrates over
    pub timesteps: usize,
}

/// Resolved architecture variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchVariant {
    Dense,
    DenseWithEncoder,
    SpikingSurrogate,
    SpikingBnttFull,
    SpikingBnttHybrid,
}

impl ArchDescriptor {
    /// Plain non-spiking descriptor, the most common configuration.
    #[must_use]
    pub fn dense(modality: Modality) -> Self {
        Self {
            spiking: false,
            bntt: false,
            hybrid: false,
            encoder_decoder: false,
            use_encoder: false,
            separate_dvs_channels: false,
            modality,
            timesteps: 10,
        }
    }

    /// Resolve the flag combination into a single variant.
    #[must_use]
    pub fn variant(&self) -> ArchVariant {
        if self.spiking {
            if self.bntt {
                if self.hybrid {
                    ArchVariant::SpikingBnttHybrid
                } else {
                    ArchVariant::SpikingBnttFull
                }
            } else {
                ArchVariant::SpikingSurrogate
            }
        } else if self.use_encoder {
            ArchVariant::DenseWithEncoder
        } else {
            ArchVariant::Dense
        }
    }

    /// Input channel count after the channel policy is applied.
    #[must_use]
    pub fn input_channels(&self) -> usize {
        if self.separate_dvs_channels && !self.use_encoder {
            2
        } else {
            1
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bntt && !self.spiking {
            return Err(Error::Config("bntt requires a spiking network".into()));
        }
        if self.hybrid && !(self.spiking && self.bntt) {
            return Err(Error::Config("hybrid requires a spiking bntt network".into()));
        }
        if self.use_encoder && self.spiking {
            return Err(Error::Config(
                "a pretrained encoder feeds the non-spiking network only".into(),
            ));
        }
        if self.encoder_decoder && self.spiking {
            return Err(Error::Config(
                "frame reconstruction trains the non-spiking decoder only".into(),
            ));
        }
        if self.spiking && self.timesteps == 0 {
            return Err(Error::Config("timesteps must be positive for spiking networks".into()));
        }
        if self.separate_dvs_channels && self.modality != Modality::Dvs {
            return Err(Error::Config("separate polarity channels only apply to DVS data".into()));
        }
        Ok(())
    }
}

/// Build the model for a resolved descriptor.
///
/// `input_dim` is the flattened frame length the data layer will deliver
/// (channel policy already applied); `output_dim` is 1 for steering
/// regression and the target frame length for reconstruction.
pub fn build_model(desc: &ArchDescriptor, input_dim: usize, output_dim: usize) -> Box<dyn Model> {
    match desc.variant() {
        ArchVariant::Dense | ArchVariant::DenseWithEncoder => {
            Box::new(DenseReadout::new(input_dim, output_dim))
        }
        ArchVariant::SpikingSurrogate
        | ArchVariant::SpikingBnttFull
        | ArchVariant::SpikingBnttHybrid => {
            Box::new(SpikeRateReadout::new(input_dim, desc.timesteps))
        }
    }
}

use std::{collections::VecDeque, f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{AnalyzerConfig, PlayerError, Result};

mod spectrum;

pub use spectrum::{SpectrumBars, SpectrumVisualizer, TeardownReason};

const MIN_FFT_SIZE: usize = 32;
const MAX_FFT_SIZE: usize = 32_768;

/// Frequency tap attached to the audio output.
///
/// Keeps the most recent `fft_size` time-domain samples and, on demand,
/// turns them into a smoothed byte spectrum of `fft_size / 2` bins: Blackman
/// window, magnitude smoothing across calls, then decibels mapped linearly
/// from `[min_decibels, max_decibels]` onto `0..=255`.
pub struct AnalyserNode {
    fft_size: usize,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    samples: VecDeque<f32>,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    fft: FftResources,
}

impl AnalyserNode {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        let size = config.fft_size;
        if !size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&size) {
            return Err(PlayerError::InvalidInput(
                "fft size must be a power of two between 32 and 32768",
            ));
        }
        if !(0.0..=1.0).contains(&config.smoothing_time_constant) {
            return Err(PlayerError::InvalidInput(
                "smoothing time constant must lie in [0, 1]",
            ));
        }
        if config.min_decibels >= config.max_decibels {
            return Err(PlayerError::InvalidInput(
                "min decibels must be below max decibels",
            ));
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);
        let fft = FftResources {
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        };

        Ok(Self {
            fft_size: size,
            smoothing: config.smoothing_time_constant,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
            samples: VecDeque::from(vec![0.0; size]),
            window: (0..size).map(|i| blackman_value(i, size)).collect(),
            smoothed: vec![0.0; size / 2],
            fft,
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Appends samples, discarding the oldest beyond one transform length.
    pub fn push_samples(&mut self, samples: &[f32]) {
        let keep = samples.len().min(self.fft_size);
        let overflow = (self.samples.len() + keep).saturating_sub(self.fft_size);
        self.samples.drain(..overflow);
        self.samples.extend(&samples[samples.len() - keep..]);
    }

    /// Writes up to `frequency_bin_count()` bytes into `out`.
    pub fn byte_frequency_data(&mut self, out: &mut [u8]) -> Result<()> {
        self.transform()?;

        let range = self.max_decibels - self.min_decibels;
        for (byte, magnitude) in out.iter_mut().zip(&self.smoothed) {
            let db = if *magnitude > 0.0 {
                20.0 * magnitude.log10()
            } else {
                f32::NEG_INFINITY
            };
            let scaled = 255.0 / range * (db - self.min_decibels);
            *byte = scaled.floor().clamp(0.0, 255.0) as u8;
        }
        Ok(())
    }

    fn transform(&mut self) -> Result<()> {
        for ((slot, sample), weight) in self
            .fft
            .input
            .iter_mut()
            .zip(&self.samples)
            .zip(&self.window)
        {
            *slot = sample * weight;
        }

        self.fft
            .plan
            .process_with_scratch(&mut self.fft.input, &mut self.fft.spectrum, &mut self.fft.scratch)
            .map_err(|err| PlayerError::msg(format!("spectrum transform failed: {err}")))?;

        let norm = self.fft_size as f32;
        let tau = self.smoothing;
        for (smoothed, bin) in self.smoothed.iter_mut().zip(&self.fft.spectrum) {
            let magnitude = bin.norm() / norm;
            let next = tau * *smoothed + (1.0 - tau) * magnitude;
            *smoothed = if next.is_finite() { next } else { 0.0 };
        }
        Ok(())
    }
}

struct FftResources {
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl fmt::Debug for AnalyserNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyserNode")
            .field("fft_size", &self.fft_size)
            .field("smoothing", &self.smoothing)
            .field("min_decibels", &self.min_decibels)
            .field("max_decibels", &self.max_decibels)
            .finish()
    }
}

fn blackman_value(index: usize, len: usize) -> f32 {
    const ALPHA: f32 = 0.16;
    let a0 = 0.5 * (1.0 - ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * ALPHA;
    let phase = 2.0 * PI * index as f32 / len as f32;
    a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
}

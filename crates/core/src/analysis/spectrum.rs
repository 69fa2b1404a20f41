use std::sync::Arc;

use crate::{AnalyzerConfig, AudioService};

/// Smoothed bar heights in `[0, 1]`, one per visualised band.
#[derive(Debug, Clone)]
pub struct SpectrumBars {
    heights: Vec<f32>,
    smoothing: f32,
    decay: f32,
    min_height: f32,
    max_height_ratio: f32,
}

impl SpectrumBars {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            heights: vec![0.0; config.bar_count],
            smoothing: config.bar_smoothing.clamp(0.0, 1.0),
            decay: config.idle_decay.clamp(0.0, 1.0),
            min_height: config.min_bar_height.max(0.0),
            max_height_ratio: config.max_height_ratio.max(0.0),
        }
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Folds a byte spectrum into the bars, sampling every
    /// `data.len() / bars` bins.
    pub fn update_with(&mut self, data: &[u8]) {
        let bars = self.heights.len();
        if bars == 0 {
            return;
        }

        let step = data.len() / bars;
        let keep = self.smoothing;
        for (i, height) in self.heights.iter_mut().enumerate() {
            let value = data.get(i * step).copied().unwrap_or(0) as f32 / u8::MAX as f32;
            *height = *height * keep + value * (1.0 - keep);
        }
    }

    /// Fades every bar toward zero.
    pub fn decay(&mut self) {
        for height in &mut self.heights {
            *height *= self.decay;
        }
    }

    /// Largest bar height for a viewport of the given height.
    pub fn max_bar_height_for(&self, viewport_height: f32) -> f32 {
        viewport_height.max(0.0) * self.max_height_ratio
    }

    /// Pixel heights, floored so idle bars stay visible and capped at
    /// `max_bar_height`.
    pub fn rendered_heights(&self, max_bar_height: f32) -> Vec<f32> {
        let max = max_bar_height.max(0.0);
        self.heights
            .iter()
            .map(|height| (height * max).max(self.min_height).min(max))
            .collect()
    }
}

/// Why a visualiser view is going away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    /// The user moved to another view; audio keeps running.
    Navigation,
    /// The application is exiting.
    Shutdown,
}

/// Per-view driver that turns the shared analysis tap into bar frames.
///
/// If the tap cannot be attached (audio still locked, unsupported platform)
/// it keeps retrying on each tick and renders the idle decay meanwhile.
#[derive(Debug)]
pub struct SpectrumVisualizer {
    service: Arc<AudioService>,
    config: AnalyzerConfig,
    bars: SpectrumBars,
    buffer: Vec<u8>,
    connected: bool,
    reported_unavailable: bool,
}

impl SpectrumVisualizer {
    pub fn new(service: Arc<AudioService>, config: AnalyzerConfig) -> Self {
        let bars = SpectrumBars::new(&config);
        Self {
            service,
            config,
            bars,
            buffer: Vec::new(),
            connected: false,
            reported_unavailable: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn bars(&self) -> &SpectrumBars {
        &self.bars
    }

    /// Advances one animation frame.
    pub fn tick(&mut self, playing: bool) -> &SpectrumBars {
        if !self.connected {
            self.try_connect();
        }

        if playing && self.connected && self.read_spectrum() {
            self.bars.update_with(&self.buffer);
        } else {
            self.bars.decay();
        }
        &self.bars
    }

    /// Rendered bar heights for a viewport of the given pixel height.
    pub fn frame(&self, viewport_height: f32) -> Vec<f32> {
        self.bars
            .rendered_heights(self.bars.max_bar_height_for(viewport_height))
    }

    /// Releases the analysis graph only when the whole application exits.
    pub fn teardown(self, reason: TeardownReason) {
        match reason {
            TeardownReason::Navigation => {
                tracing::debug!("visualiser detached, analysis graph kept alive");
            }
            TeardownReason::Shutdown => {
                if let Err(err) = self.service.release_analyser() {
                    tracing::warn!(error = %err, "failed to release analysis graph");
                }
            }
        }
    }

    fn try_connect(&mut self) {
        match self.service.connect_analyser(&self.config) {
            Ok(()) => {
                self.connected = true;
                self.reported_unavailable = false;
            }
            Err(err) => {
                if !self.reported_unavailable {
                    tracing::debug!(error = %err, "analysis graph not available yet");
                    self.reported_unavailable = true;
                }
            }
        }
    }

    fn read_spectrum(&mut self) -> bool {
        let bins = match self.service.frequency_bin_count() {
            Ok(Some(bins)) => bins,
            Ok(None) => {
                self.connected = false;
                return false;
            }
            Err(err) => {
                tracing::warn!(error = %err, "analysis graph unreadable");
                return false;
            }
        };

        self.buffer.resize(bins, 0);
        match self.service.byte_frequency_data(&mut self.buffer) {
            Ok(true) => true,
            Ok(false) => {
                self.connected = false;
                false
            }
            Err(err) => {
                tracing::warn!(error = %err, "spectrum read failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulatedOutput;

    fn bars() -> SpectrumBars {
        SpectrumBars::new(&AnalyzerConfig::default())
    }

    #[test]
    fn smooths_toward_the_sampled_bins() {
        let mut bars = bars();
        let data = [255u8; 128];
        bars.update_with(&data);
        assert!((bars.heights()[0] - 0.3).abs() < 1e-6);
        bars.update_with(&data);
        assert!((bars.heights()[0] - 0.51).abs() < 1e-6);
    }

    #[test]
    fn samples_one_bin_per_step() {
        let mut bars = bars();
        let mut data = [0u8; 128];
        // step = 128 / 80 = 1, so bar 79 reads bin 79 and bin 100 is unused
        data[79] = 255;
        data[100] = 255;
        bars.update_with(&data);
        assert!(bars.heights()[79] > 0.0);
        assert_eq!(bars.heights()[78], 0.0);
    }

    #[test]
    fn idle_decay_strictly_decreases_to_floor() {
        let mut bars = bars();
        bars.update_with(&[255u8; 128]);
        let max = 400.0;

        let mut previous = bars.rendered_heights(max);
        for _ in 0..200 {
            bars.decay();
            let current = bars.rendered_heights(max);
            for (now, before) in current.iter().zip(&previous) {
                assert!(now < before || (*now == 4.0 && *before == 4.0));
            }
            previous = current;
        }
        assert!(previous.iter().all(|h| *h == 4.0));
    }

    #[test]
    fn rendered_heights_stay_within_bounds() {
        let mut bars = bars();
        for _ in 0..50 {
            bars.update_with(&[255u8; 128]);
        }
        let heights = bars.rendered_heights(100.0);
        assert!(heights.iter().all(|h| *h >= 0.0 && *h <= 100.0));

        let tiny = bars.rendered_heights(2.0);
        assert!(tiny.iter().all(|h| *h <= 2.0));
    }

    #[test]
    fn max_height_is_a_share_of_the_viewport() {
        assert_eq!(bars().max_bar_height_for(1000.0), 400.0);
    }

    #[test]
    fn decays_while_the_graph_is_unavailable() {
        let output = SimulatedOutput::new();
        output.set_capture_ready(false);
        let service = Arc::new(AudioService::new(output.clone()));
        let mut visualizer = SpectrumVisualizer::new(service, AnalyzerConfig::default());

        for _ in 0..3 {
            visualizer.tick(true);
        }
        assert!(!visualizer.is_connected());
        assert!(visualizer.bars().heights().iter().all(|h| *h == 0.0));

        output.unlock();
        visualizer.tick(true);
        assert!(visualizer.is_connected());
    }

    #[test]
    fn navigation_teardown_keeps_the_graph() {
        let service = Arc::new(AudioService::new(SimulatedOutput::new()));
        let mut first = SpectrumVisualizer::new(Arc::clone(&service), AnalyzerConfig::default());
        first.tick(false);
        first.teardown(TeardownReason::Navigation);
        assert!(service.has_analyser().unwrap());

        let second = SpectrumVisualizer::new(Arc::clone(&service), AnalyzerConfig::default());
        second.teardown(TeardownReason::Shutdown);
        assert!(!service.has_analyser().unwrap());
    }

    #[test]
    fn playing_audio_raises_bars() {
        let output = SimulatedOutput::new();
        let service = Arc::new(AudioService::new(output.clone()));
        let mut visualizer = SpectrumVisualizer::new(Arc::clone(&service), AnalyzerConfig::default());
        visualizer.tick(false);

        let block: Vec<f32> = (0..256)
            .map(|i| (2.0 * std::f32::consts::PI * 4.0 * i as f32 / 256.0).sin())
            .collect();
        service.push_samples(&block).unwrap();
        for _ in 0..5 {
            visualizer.tick(true);
        }
        assert!(visualizer.bars().heights()[4] > 0.5);
    }
}

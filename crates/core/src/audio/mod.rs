use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};

use crate::{AnalyserNode, AnalyzerConfig, OutputError, PlayerError, Result};

mod simulated;

pub use simulated::{AutoplayPolicy, SimulatedOutput};

/// The single platform audio output.
///
/// Implementations report the real hardware state; callers treat anything
/// they cache as a projection of what this trait returns.
pub trait AudioOutput {
    /// Locator of the stream currently attached, if any.
    fn source(&self) -> Option<String>;

    /// Points the output at a new stream. Position resets to the start.
    fn set_source(&mut self, locator: &str);

    /// Starts or resumes playback.
    fn play(&mut self) -> std::result::Result<(), OutputError>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    fn has_ended(&self) -> bool;

    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, seconds: f64);

    /// Duration of the attached stream once known. Never NaN or infinite.
    fn duration(&self) -> Option<f64>;

    /// Whether an analysis tap may be connected. Platforms that lock audio
    /// until a user gesture report `false` until then.
    fn capture_ready(&self) -> bool {
        true
    }
}

/// Notifications raised by the output on its own, outside any call into it.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputEvent {
    Playing,
    Paused,
    Ended,
    TimeUpdate(f64),
    DurationChanged(Option<f64>),
    /// A `play()` that was accepted was later rejected by the platform.
    PlayRejected { source: String, error: OutputError },
}

type SharedOutput = Box<dyn AudioOutput + Send>;

/// Process-wide owner of the audio output and its analysis tap.
///
/// Created once per application run and shared by `Arc`; views attach to
/// it through a [`ServiceSlot`] instead of constructing their own.
pub struct AudioService {
    output: Mutex<SharedOutput>,
    analyser: Mutex<Option<AnalyserNode>>,
    shut_down: AtomicBool,
}

impl AudioService {
    pub fn new(output: impl AudioOutput + Send + 'static) -> Self {
        Self {
            output: Mutex::new(Box::new(output)),
            analyser: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Runs `f` against the output while holding its lock.
    pub fn with_output<R>(&self, f: impl FnOnce(&mut dyn AudioOutput) -> R) -> Result<R> {
        let mut output = self.lock_output()?;
        Ok(f(output.as_mut()))
    }

    /// Connects the analysis tap, reusing an existing one.
    ///
    /// Fails with [`PlayerError::GraphUnavailable`] while the output is not
    /// ready for capture or after shutdown; callers may simply try again.
    pub fn connect_analyser(&self, config: &AnalyzerConfig) -> Result<()> {
        if self.is_shut_down() {
            return Err(PlayerError::GraphUnavailable);
        }

        let mut slot = self.lock_analyser()?;
        if slot.is_some() {
            return Ok(());
        }

        if !self.with_output(|output| output.capture_ready())? {
            return Err(PlayerError::GraphUnavailable);
        }

        *slot = Some(AnalyserNode::new(config)?);
        tracing::info!(fft_size = config.fft_size, "audio analysis graph connected");
        Ok(())
    }

    pub fn has_analyser(&self) -> Result<bool> {
        Ok(self.lock_analyser()?.is_some())
    }

    /// Feeds decoded time-domain samples into the analysis tap, if connected.
    pub fn push_samples(&self, samples: &[f32]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        if let Some(analyser) = self.lock_analyser()?.as_mut() {
            analyser.push_samples(samples);
        }
        Ok(())
    }

    /// Fills `out` with the current byte spectrum. Returns `false` when no
    /// tap is connected.
    pub fn byte_frequency_data(&self, out: &mut [u8]) -> Result<bool> {
        match self.lock_analyser()?.as_mut() {
            Some(analyser) => {
                analyser.byte_frequency_data(out)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn frequency_bin_count(&self) -> Result<Option<usize>> {
        Ok(self
            .lock_analyser()?
            .as_ref()
            .map(AnalyserNode::frequency_bin_count))
    }

    /// Drops the analysis tap. Only application shutdown should call this.
    pub fn release_analyser(&self) -> Result<()> {
        if self.lock_analyser()?.take().is_some() {
            tracing::info!("audio analysis graph released");
        }
        Ok(())
    }

    /// Final teardown: releases the tap and silences the output.
    pub fn shutdown(&self) -> Result<()> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.release_analyser()?;
        self.with_output(|output| output.pause())?;
        tracing::info!("audio service shut down");
        Ok(())
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn lock_output(&self) -> Result<MutexGuard<'_, SharedOutput>> {
        self.output
            .lock()
            .map_err(|_| PlayerError::Poisoned("audio output"))
    }

    fn lock_analyser(&self) -> Result<MutexGuard<'_, Option<AnalyserNode>>> {
        self.analyser
            .lock()
            .map_err(|_| PlayerError::Poisoned("analysis graph"))
    }
}

impl std::fmt::Debug for AudioService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioService")
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// Presence-checked home of the one [`AudioService`].
#[derive(Debug, Default)]
pub struct ServiceSlot {
    service: Mutex<Option<Arc<AudioService>>>,
}

impl ServiceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live service, constructing it with `create` only when the
    /// slot is empty.
    pub fn attach_or_create<F>(&self, create: F) -> Result<Arc<AudioService>>
    where
        F: FnOnce() -> AudioService,
    {
        let mut slot = self.lock()?;
        if let Some(service) = slot.as_ref() {
            tracing::debug!("attaching to existing audio service");
            return Ok(Arc::clone(service));
        }

        let service = Arc::new(create());
        *slot = Some(Arc::clone(&service));
        tracing::info!("audio service created");
        Ok(service)
    }

    pub fn attach(&self) -> Result<Option<Arc<AudioService>>> {
        Ok(self.lock()?.clone())
    }

    /// Shuts the service down and empties the slot.
    pub fn shutdown(&self) -> Result<()> {
        let service = self.lock()?.take();
        match service {
            Some(service) => service.shutdown(),
            None => Ok(()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Arc<AudioService>>>> {
        self.service
            .lock()
            .map_err(|_| PlayerError::Poisoned("audio service slot"))
    }
}

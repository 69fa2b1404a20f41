use std::{
    collections::{HashMap, HashSet},
    f32::consts::PI,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::{AudioOutput, OutputEvent};
use crate::OutputError;

/// How the simulated platform treats `play()` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoplayPolicy {
    Allow,
    /// Reject the next `n` calls, as a browser does before the first gesture.
    BlockNext(u32),
    BlockAll,
}

#[derive(Debug)]
struct SimState {
    source: Option<String>,
    paused: bool,
    ended: bool,
    position: f64,
    durations: HashMap<String, f64>,
    failing: HashSet<String>,
    policy: AutoplayPolicy,
    capture_ready: bool,
    loads: usize,
    play_calls: usize,
}

/// Deterministic in-memory [`AudioOutput`].
///
/// Clones share the same state so a host (or a test) can keep a handle after
/// moving the output into an [`AudioService`](crate::AudioService).
#[derive(Debug, Clone)]
pub struct SimulatedOutput {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedOutput {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                source: None,
                paused: true,
                ended: false,
                position: 0.0,
                durations: HashMap::new(),
                failing: HashSet::new(),
                policy: AutoplayPolicy::Allow,
                capture_ready: true,
                loads: 0,
                play_calls: 0,
            })),
        }
    }

    pub fn set_policy(&self, policy: AutoplayPolicy) {
        self.lock().policy = policy;
    }

    pub fn set_capture_ready(&self, ready: bool) {
        self.lock().capture_ready = ready;
    }

    /// Registers the real length of a stream, reported once it is attached.
    pub fn set_duration(&self, locator: impl Into<String>, seconds: f64) {
        self.lock().durations.insert(locator.into(), seconds);
    }

    /// Makes every `play()` of this stream fail with a network error.
    pub fn fail_source(&self, locator: impl Into<String>) {
        self.lock().failing.insert(locator.into());
    }

    /// Lets a stream registered with [`fail_source`](Self::fail_source) play again.
    pub fn recover_source(&self, locator: &str) {
        self.lock().failing.remove(locator);
    }

    /// Number of times a stream has been attached.
    pub fn loads(&self) -> usize {
        self.lock().loads
    }

    pub fn play_calls(&self) -> usize {
        self.lock().play_calls
    }

    /// Models a user gesture unlocking audio: autoplay and capture allowed.
    pub fn unlock(&self) {
        let mut state = self.lock();
        state.policy = AutoplayPolicy::Allow;
        state.capture_ready = true;
    }

    /// Moves the playback clock forward and reports what the platform would
    /// emit, including end of stream.
    pub fn advance(&self, seconds: f64) -> Vec<OutputEvent> {
        let mut state = self.lock();
        if state.paused || state.source.is_none() {
            return Vec::new();
        }

        state.position += seconds.max(0.0);
        let duration = state
            .source
            .as_ref()
            .and_then(|source| state.durations.get(source))
            .copied();

        match duration {
            Some(duration) if state.position >= duration => {
                state.position = duration;
                state.ended = true;
                state.paused = true;
                vec![
                    OutputEvent::TimeUpdate(duration),
                    OutputEvent::Paused,
                    OutputEvent::Ended,
                ]
            }
            _ => vec![OutputEvent::TimeUpdate(state.position)],
        }
    }

    /// Mono block of a two-partial test tone at the current position, or
    /// silence while paused.
    pub fn render_block(&self, sample_rate: u32, len: usize) -> Vec<f32> {
        let state = self.lock();
        if state.paused {
            return vec![0.0; len];
        }

        let rate = sample_rate.max(1) as f32;
        let start = state.position as f32;
        (0..len)
            .map(|i| {
                let t = start + i as f32 / rate;
                0.6 * (2.0 * PI * 220.0 * t).sin() + 0.3 * (2.0 * PI * 1760.0 * t).sin()
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AudioOutput for SimulatedOutput {
    fn source(&self) -> Option<String> {
        self.lock().source.clone()
    }

    fn set_source(&mut self, locator: &str) {
        let mut state = self.lock();
        state.source = Some(locator.to_string());
        state.position = 0.0;
        state.paused = true;
        state.ended = false;
        state.loads += 1;
    }

    fn play(&mut self) -> Result<(), OutputError> {
        let mut state = self.lock();
        state.play_calls += 1;

        let Some(source) = state.source.clone() else {
            return Err(OutputError::Unsupported("no stream attached".into()));
        };
        if state.failing.contains(&source) {
            state.paused = true;
            return Err(OutputError::Network(format!("cannot fetch {source}")));
        }

        let policy = state.policy;
        match policy {
            AutoplayPolicy::BlockAll => return Err(OutputError::Blocked),
            AutoplayPolicy::BlockNext(remaining) if remaining > 0 => {
                state.policy = if remaining == 1 {
                    AutoplayPolicy::Allow
                } else {
                    AutoplayPolicy::BlockNext(remaining - 1)
                };
                return Err(OutputError::Blocked);
            }
            _ => {}
        }

        if state.ended {
            state.position = 0.0;
            state.ended = false;
        }
        state.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.lock().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.lock().paused
    }

    fn has_ended(&self) -> bool {
        self.lock().ended
    }

    fn current_time(&self) -> f64 {
        self.lock().position
    }

    fn set_current_time(&mut self, seconds: f64) {
        let mut state = self.lock();
        state.position = seconds.max(0.0);
        state.ended = false;
    }

    fn duration(&self) -> Option<f64> {
        let state = self.lock();
        state
            .source
            .as_ref()
            .and_then(|source| state.durations.get(source))
            .copied()
            .filter(|d| d.is_finite() && *d > 0.0)
    }

    fn capture_ready(&self) -> bool {
        self.lock().capture_ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_the_requested_number_of_plays() {
        let mut output = SimulatedOutput::new();
        output.set_source("a");
        output.set_policy(AutoplayPolicy::BlockNext(2));

        assert_eq!(output.play(), Err(OutputError::Blocked));
        assert_eq!(output.play(), Err(OutputError::Blocked));
        assert!(output.play().is_ok());
        assert!(!output.is_paused());
    }

    #[test]
    fn reports_end_of_stream() {
        let mut output = SimulatedOutput::new();
        output.set_duration("a", 2.0);
        output.set_source("a");
        output.play().unwrap();

        assert_eq!(output.advance(1.0), vec![OutputEvent::TimeUpdate(1.0)]);
        let events = output.advance(5.0);
        assert_eq!(events.last(), Some(&OutputEvent::Ended));
        assert!(output.has_ended());
        assert_eq!(output.current_time(), 2.0);
    }

    #[test]
    fn clones_share_state() {
        let handle = SimulatedOutput::new();
        let mut moved = handle.clone();
        moved.set_source("x");
        assert_eq!(handle.source().as_deref(), Some("x"));
        assert_eq!(handle.loads(), 1);
    }
}

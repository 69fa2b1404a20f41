//! Swipe and trackpad gesture recognition for view navigation.
//!
//! [`SwipeRecognizer`] only observes input. It decides that a navigation
//! should happen and calls the handler it was given; how the view changes is
//! up to the caller.

use std::{fmt, time::Duration};

use crate::GestureConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

/// Element an input event originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputTarget {
    #[default]
    Element,
    TextInput,
    TextArea,
    ContentEditable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    TouchStart {
        x: f32,
        y: f32,
        target: InputTarget,
    },
    TouchEnd {
        x: f32,
        y: f32,
    },
    TouchCancel,
    PointerDown {
        x: f32,
        y: f32,
        kind: PointerKind,
        /// 0 is the primary button.
        button: u8,
        target: InputTarget,
    },
    PointerUp {
        x: f32,
        y: f32,
    },
    Wheel {
        delta_x: f32,
        delta_y: f32,
        ctrl: bool,
        target: InputTarget,
        /// Event timestamp on a monotonic clock.
        at: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TouchPhase {
    Idle,
    Tracking { start_x: f32, start_y: f32 },
}

#[derive(Debug, Default, Clone, Copy)]
struct WheelAccumulator {
    delta: f32,
    last_event: Option<Duration>,
}

impl WheelAccumulator {
    fn reset(&mut self) {
        self.delta = 0.0;
        self.last_event = None;
    }

    fn expired(&self, now: Duration, quiet: Duration) -> bool {
        self.last_event
            .map(|last| now.saturating_sub(last) > quiet)
            .unwrap_or(false)
    }
}

type SwipeHandler = Box<dyn FnMut()>;

pub struct SwipeRecognizer {
    config: GestureConfig,
    on_left: Option<SwipeHandler>,
    on_right: Option<SwipeHandler>,
    phase: TouchPhase,
    wheel: WheelAccumulator,
}

impl SwipeRecognizer {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            on_left: None,
            on_right: None,
            phase: TouchPhase::Idle,
            wheel: WheelAccumulator::default(),
        }
    }

    pub fn on_left(mut self, handler: impl FnMut() + 'static) -> Self {
        self.on_left = Some(Box::new(handler));
        self
    }

    pub fn on_right(mut self, handler: impl FnMut() + 'static) -> Self {
        self.on_right = Some(Box::new(handler));
        self
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.phase, TouchPhase::Tracking { .. })
    }

    /// Horizontal wheel motion accumulated in the current run.
    pub fn wheel_delta(&self) -> f32 {
        self.wheel.delta
    }

    /// Feeds one input event. Returns the direction that fired, if any.
    pub fn handle(&mut self, event: GestureEvent) -> Option<SwipeDirection> {
        if self.on_left.is_none() && self.on_right.is_none() {
            return None;
        }

        match event {
            GestureEvent::TouchStart { x, y, target } => {
                self.start(x, y, target);
                None
            }
            GestureEvent::PointerDown {
                x,
                y,
                kind,
                button,
                target,
            } => {
                if kind == PointerKind::Mouse && button != 0 {
                    return None;
                }
                self.start(x, y, target);
                None
            }
            GestureEvent::TouchEnd { x, y } | GestureEvent::PointerUp { x, y } => self.end(x, y),
            GestureEvent::TouchCancel => {
                self.phase = TouchPhase::Idle;
                None
            }
            GestureEvent::Wheel {
                delta_x,
                delta_y,
                ctrl,
                target,
                at,
            } => self.wheel(delta_x, delta_y, ctrl, target, at),
        }
    }

    /// Drops an abandoned wheel run once the quiet period has elapsed.
    pub fn poll(&mut self, now: Duration) {
        if self.wheel.expired(now, self.config.reset_delay) {
            tracing::trace!(delta = self.wheel.delta, "wheel gesture abandoned");
            self.wheel.reset();
        }
    }

    /// Returns to idle, forgetting any gesture in progress.
    pub fn reset(&mut self) {
        self.phase = TouchPhase::Idle;
        self.wheel.reset();
    }

    fn ignores(&self, target: InputTarget) -> bool {
        self.config.ignore_inputs && target != InputTarget::Element
    }

    fn start(&mut self, x: f32, y: f32, target: InputTarget) {
        if self.ignores(target) {
            return;
        }
        self.phase = TouchPhase::Tracking {
            start_x: x,
            start_y: y,
        };
    }

    fn end(&mut self, x: f32, y: f32) -> Option<SwipeDirection> {
        let TouchPhase::Tracking { start_x, start_y } = self.phase else {
            return None;
        };
        self.phase = TouchPhase::Idle;

        let delta_x = start_x - x;
        let delta_y = (start_y - y).abs();
        if delta_y > self.config.vertical_tolerance {
            return None;
        }

        if delta_x > self.config.threshold {
            self.fire(SwipeDirection::Left)
        } else if -delta_x > self.config.threshold {
            self.fire(SwipeDirection::Right)
        } else {
            None
        }
    }

    fn wheel(
        &mut self,
        delta_x: f32,
        delta_y: f32,
        ctrl: bool,
        target: InputTarget,
        at: Duration,
    ) -> Option<SwipeDirection> {
        if ctrl || self.ignores(target) {
            return None;
        }
        if delta_y.abs() > delta_x.abs() * self.config.wheel_dominance {
            return None;
        }

        if self.wheel.expired(at, self.config.reset_delay) {
            self.wheel.reset();
        }
        self.wheel.delta += delta_x;
        self.wheel.last_event = Some(at);

        let threshold = self.config.wheel_threshold;
        if self.on_left.is_some() && self.wheel.delta < -threshold {
            self.wheel.reset();
            return self.fire(SwipeDirection::Left);
        }
        if self.on_right.is_some() && self.wheel.delta > threshold {
            self.wheel.reset();
            return self.fire(SwipeDirection::Right);
        }
        None
    }

    fn fire(&mut self, direction: SwipeDirection) -> Option<SwipeDirection> {
        let handler = match direction {
            SwipeDirection::Left => self.on_left.as_mut(),
            SwipeDirection::Right => self.on_right.as_mut(),
        }?;
        tracing::debug!(?direction, "swipe navigation");
        handler();
        Some(direction)
    }
}

impl fmt::Debug for SwipeRecognizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwipeRecognizer")
            .field("config", &self.config)
            .field("phase", &self.phase)
            .field("wheel", &self.wheel)
            .field("on_left", &self.on_left.is_some())
            .field("on_right", &self.on_right.is_some())
            .finish()
    }
}

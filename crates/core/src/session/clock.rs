/// Position/duration projection of the audio output.
///
/// Position always lies in `[0, duration]` once the duration is known. A
/// seek preview, when active, is what the UI shows while a drag is in
/// progress; the committed position keeps following the output.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlaybackClock {
    position: f64,
    duration: Option<f64>,
    preview: Option<f64>,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.position = 0.0;
        self.duration = None;
        self.preview = None;
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Clamps `seconds` into the playable range. NaN maps to the start.
    pub fn clamp(&self, seconds: f64) -> f64 {
        if seconds.is_nan() {
            return 0.0;
        }
        let lower = seconds.max(0.0);
        match self.duration {
            Some(duration) => lower.min(duration),
            None => lower,
        }
    }

    pub fn set_position(&mut self, seconds: f64) -> f64 {
        self.position = self.clamp(seconds);
        self.position
    }

    /// Accepts only finite, positive durations and re-clamps the position.
    pub fn set_duration(&mut self, duration: Option<f64>) {
        self.duration = duration.filter(|d| d.is_finite() && *d > 0.0);
        self.position = self.clamp(self.position);
        if let Some(preview) = self.preview {
            self.preview = Some(self.clamp(preview));
        }
    }

    pub fn begin_preview(&mut self) {
        self.preview = Some(self.position);
    }

    pub fn update_preview(&mut self, seconds: f64) -> f64 {
        let clamped = self.clamp(seconds);
        self.preview = Some(clamped);
        clamped
    }

    pub fn take_preview(&mut self) -> Option<f64> {
        self.preview.take()
    }

    pub fn cancel_preview(&mut self) {
        self.preview = None;
    }

    pub fn is_previewing(&self) -> bool {
        self.preview.is_some()
    }

    /// What the UI should show: the preview while dragging, else the
    /// committed position.
    pub fn display_position(&self) -> f64 {
        self.preview.unwrap_or(self.position)
    }

    /// Fraction of the track elapsed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        match self.duration {
            Some(duration) => (self.display_position() / duration).clamp(0.0, 1.0),
            None => 0.0,
        }
    }
}

/// Formats seconds as `m:ss`; anything non-finite or negative shows `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_into_known_duration() {
        let mut clock = PlaybackClock::default();
        clock.set_duration(Some(200.0));

        assert_eq!(clock.set_position(-5.0), 0.0);
        assert_eq!(clock.set_position(500.0), 200.0);
        assert_eq!(clock.set_position(f64::NAN), 0.0);
        assert_eq!(clock.set_position(42.5), 42.5);
    }

    #[test]
    fn shrinking_duration_pulls_position_in() {
        let mut clock = PlaybackClock::default();
        clock.set_position(150.0);
        clock.set_duration(Some(100.0));
        assert_eq!(clock.position(), 100.0);
    }

    #[test]
    fn ignores_non_finite_durations() {
        let mut clock = PlaybackClock::default();
        clock.set_duration(Some(f64::INFINITY));
        assert_eq!(clock.duration(), None);
    }

    #[test]
    fn preview_is_shown_instead_of_position() {
        let mut clock = PlaybackClock::default();
        clock.set_duration(Some(100.0));
        clock.set_position(10.0);

        clock.begin_preview();
        clock.update_preview(70.0);
        assert_eq!(clock.display_position(), 70.0);
        assert_eq!(clock.position(), 10.0);
        assert_eq!(clock.progress(), 0.7);

        clock.cancel_preview();
        assert_eq!(clock.display_position(), 10.0);
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(3600.0), "60:00");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(-1.0), "0:00");
    }
}

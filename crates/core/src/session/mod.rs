//! Playback session: the one owner of playback state.
//!
//! [`SessionManager`] drives the shared [`AudioService`] output, keeps a
//! [`PlaybackState`] projection of it and writes a [`SessionSnapshot`] after
//! every change so a manager activated later (another view, a reload) can
//! pick playback up where it was left.

use std::sync::Arc;

use crate::{
    AppConfig, AudioService, OutputError, OutputEvent, Playlist, Result, SessionConfig, Track,
};

mod clock;
mod store;

pub use clock::{format_time, PlaybackClock};
pub use store::{JsonFileStore, MemoryStore, SessionSnapshot, SnapshotStore};

/// Transport intents shared by keyboard shortcuts and platform controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportCommand {
    Play,
    Pause,
    TogglePlayPause,
    Next,
    Previous,
}

/// Where playback stands after a transport operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Playing,
    Paused,
    /// The platform blocked playback; it resumes on the next interaction.
    Deferred,
}

/// Observable changes for collaborators such as the media-session bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    TrackChanged,
    PlayingChanged,
}

/// Canonical playback state, mirrored from the audio output.
#[derive(Debug, Default, Clone)]
pub struct PlaybackState {
    track: Option<Track>,
    playing: bool,
    clock: PlaybackClock,
}

impl PlaybackState {
    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position(&self) -> f64 {
        self.clock.position()
    }

    pub fn duration(&self) -> Option<f64> {
        self.clock.duration()
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }
}

/// Sole mutator of [`PlaybackState`] and sole writer of the snapshot.
pub struct SessionManager {
    service: Arc<AudioService>,
    store: Arc<dyn SnapshotStore>,
    api_base: String,
    config: SessionConfig,
    state: PlaybackState,
    playlist: Playlist,
    pending_resume: Option<u32>,
    /// The loaded stream failed to start; reselecting it retries.
    failed: bool,
    changes: Vec<SessionChange>,
}

impl SessionManager {
    /// Attaches to the shared output and restores continuity.
    ///
    /// An output that is already playing is adopted as is. Otherwise the
    /// stored snapshot is reapplied: the stream is only re-pointed when it
    /// differs, the position is restored and playback resumes if it was
    /// playing before.
    pub fn activate(
        service: Arc<AudioService>,
        store: Arc<dyn SnapshotStore>,
        config: &AppConfig,
    ) -> Result<Self> {
        let mut manager = Self {
            service,
            store,
            api_base: config.api.base_url.clone(),
            config: config.session.clone(),
            state: PlaybackState::default(),
            playlist: Playlist::default(),
            pending_resume: None,
            failed: false,
            changes: Vec::new(),
        };

        let snapshot = match SessionSnapshot::load(manager.store.as_ref()) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable session snapshot");
                None
            }
        };

        let (source, active, position, duration) = manager.service.with_output(|output| {
            (
                output.source(),
                !output.is_paused() && !output.has_ended(),
                output.current_time(),
                output.duration(),
            )
        })?;

        if let (Some(source), true) = (source.as_deref(), active) {
            manager.resync_from_output(snapshot, source, position, duration)?;
        } else if let Some(snapshot) = snapshot {
            manager.restore(snapshot, source.as_deref())?;
        }

        Ok(manager)
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn service(&self) -> &Arc<AudioService> {
        &self.service
    }

    pub fn transport(&self) -> Transport {
        if self.state.playing {
            Transport::Playing
        } else if self.pending_resume.is_some() {
            Transport::Deferred
        } else {
            Transport::Paused
        }
    }

    pub fn has_pending_resume(&self) -> bool {
        self.pending_resume.is_some()
    }

    /// Drains the changes recorded since the last call.
    pub fn take_changes(&mut self) -> Vec<SessionChange> {
        std::mem::take(&mut self.changes)
    }

    /// Replaces the traversal list without touching playback.
    pub fn set_playlist(&mut self, tracks: impl Into<Playlist>) {
        self.playlist = tracks.into();
        tracing::debug!(len = self.playlist.len(), "playlist replaced");
    }

    /// Points the output at `track` and starts it.
    ///
    /// Reselecting the track that is already loaded leaves the output alone.
    /// Stream failures are returned; a policy block yields
    /// [`Transport::Deferred`].
    pub fn load_track(&mut self, track: Track) -> Result<Transport> {
        let locator = track.stream_locator(&self.api_base);
        let loaded = self.service.with_output(|output| output.source())?;
        let same_track = self.state.track.as_ref().map(|t| t.id) == Some(track.id);
        if same_track && loaded.as_deref() == Some(locator.as_str()) {
            if !self.failed {
                tracing::debug!(id = track.id, "track already loaded");
                return Ok(self.transport());
            }
            tracing::info!(id = track.id, "retrying failed stream");
            let outcome = self.start_playback();
            self.persist();
            return outcome;
        }

        tracing::info!(id = track.id, title = %track.title, "loading track");
        let fallback = track.duration_seconds();
        self.state.clock.reset();
        self.state.track = Some(track);
        self.set_playing(false);
        self.pending_resume = None;
        self.failed = false;
        self.changes.push(SessionChange::TrackChanged);

        let reported = self.service.with_output(|output| {
            output.set_source(&locator);
            output.duration()
        })?;
        self.state.clock.set_duration(reported.or(Some(fallback)));

        let outcome = self.start_playback();
        self.persist();
        outcome
    }

    /// Pauses or resumes according to what the output is really doing.
    pub fn toggle_play_pause(&mut self) -> Result<Transport> {
        if self.state.track.is_none() {
            return Ok(Transport::Paused);
        }

        let paused = self.service.with_output(|output| output.is_paused())?;
        let outcome = if paused {
            self.start_playback()
        } else {
            self.pause_output()
        };
        self.persist();
        outcome
    }

    /// Moves the output to `target` seconds, clamped to the track.
    pub fn seek(&mut self, target: f64) -> Result<f64> {
        if self.state.track.is_none() {
            return Ok(0.0);
        }
        let position = self.state.clock.set_position(target);
        self.service
            .with_output(|output| output.set_current_time(position))?;
        self.persist();
        Ok(position)
    }

    /// Starts a drag on the progress bar.
    pub fn begin_seek_preview(&mut self) {
        if self.state.track.is_some() {
            self.state.clock.begin_preview();
        }
    }

    /// Shows `target` while dragging and moves the output right away.
    pub fn update_seek_preview(&mut self, target: f64) -> Result<f64> {
        if self.state.track.is_none() {
            return Ok(0.0);
        }
        if !self.state.clock.is_previewing() {
            self.state.clock.begin_preview();
        }
        let position = self.state.clock.update_preview(target);
        self.service
            .with_output(|output| output.set_current_time(position))?;
        Ok(position)
    }

    /// Ends a drag, committing the previewed position.
    pub fn end_seek_preview(&mut self) -> Result<Option<f64>> {
        match self.state.clock.take_preview() {
            Some(position) => self.seek(position).map(Some),
            None => Ok(None),
        }
    }

    /// Position the UI should display, preview included.
    pub fn display_position(&self) -> f64 {
        self.state.clock.display_position()
    }

    /// Advances through the playlist, wrapping at the end.
    pub fn next(&mut self) -> Result<Transport> {
        let target = self.playlist.next_from(self.state.track.as_ref()).cloned();
        self.change_track(target, "next")
    }

    /// Steps back through the playlist, wrapping at the start.
    pub fn previous(&mut self) -> Result<Transport> {
        let target = self.playlist.previous_from(self.state.track.as_ref()).cloned();
        self.change_track(target, "previous")
    }

    /// Natural end of stream: forward-only auto-advance, never wraps.
    pub fn on_track_ended(&mut self) -> Result<Transport> {
        let successor = match self.state.track.as_ref() {
            Some(current) if self.playlist.len() > 1 => {
                self.playlist.successor_of(current).cloned()
            }
            _ => None,
        };

        if let Some(track) = successor {
            tracing::debug!(id = track.id, "auto-advancing");
            return self.load_track(track);
        }

        tracing::debug!("end of playlist reached");
        self.state.clock.cancel_preview();
        self.state.clock.set_position(0.0);
        self.set_playing(false);
        self.service.with_output(|output| {
            output.pause();
            output.set_current_time(0.0);
        })?;
        self.persist();
        Ok(Transport::Paused)
    }

    /// Routes an output notification through the session.
    pub fn handle_output_event(&mut self, event: OutputEvent) -> Result<()> {
        match event {
            OutputEvent::Playing | OutputEvent::Paused => {
                let paused = self.service.with_output(|output| output.is_paused())?;
                if !paused {
                    self.pending_resume = None;
                }
                self.set_playing(!paused && self.state.track.is_some());
            }
            OutputEvent::TimeUpdate(seconds) => {
                if self.state.track.is_some() {
                    self.state.clock.set_position(seconds);
                }
            }
            OutputEvent::DurationChanged(duration) => {
                let fallback = self.state.track.as_ref().map(Track::duration_seconds);
                self.state.clock.set_duration(duration.or(fallback));
            }
            OutputEvent::Ended => {
                self.on_track_ended()?;
                return Ok(());
            }
            OutputEvent::PlayRejected { source, error } => {
                let current = self.service.with_output(|output| output.source())?;
                if current.as_deref() != Some(source.as_str()) {
                    tracing::debug!(%source, "ignoring rejection from a superseded load");
                    return Ok(());
                }
                self.on_play_failed(&error);
            }
        }
        self.persist();
        Ok(())
    }

    /// Pointer-down or key-down anywhere in the application.
    pub fn on_user_interaction(&mut self) -> Result<()> {
        self.retry_resume("interaction")
    }

    pub fn on_visibility_change(&mut self, visible: bool) -> Result<()> {
        if !visible {
            return Ok(());
        }
        self.retry_resume("visibility")
    }

    /// Single entry point for keyboard and platform media controls.
    pub fn dispatch(&mut self, command: TransportCommand) -> Result<Transport> {
        tracing::debug!(?command, "transport command");
        match command {
            TransportCommand::TogglePlayPause => self.toggle_play_pause(),
            TransportCommand::Next => self.next(),
            TransportCommand::Previous => self.previous(),
            TransportCommand::Play => {
                let paused = self.service.with_output(|output| output.is_paused())?;
                if paused && self.state.track.is_some() {
                    self.toggle_play_pause()
                } else {
                    Ok(self.transport())
                }
            }
            TransportCommand::Pause => {
                let paused = self.service.with_output(|output| output.is_paused())?;
                if paused {
                    Ok(self.transport())
                } else {
                    self.toggle_play_pause()
                }
            }
        }
    }

    /// Explicit stop: silences the output and forgets the session.
    pub fn stop(&mut self) -> Result<()> {
        self.service.with_output(|output| output.pause())?;
        if self.state.track.take().is_some() {
            self.changes.push(SessionChange::TrackChanged);
        }
        self.state.clock.reset();
        self.set_playing(false);
        self.pending_resume = None;
        self.failed = false;
        if let Err(err) = SessionSnapshot::clear(self.store.as_ref()) {
            tracing::warn!(error = %err, "failed to clear session snapshot");
        }
        Ok(())
    }

    fn change_track(&mut self, target: Option<Track>, direction: &'static str) -> Result<Transport> {
        if self.state.track.is_none() {
            tracing::debug!(direction, "nothing loaded, ignoring traversal");
            return Ok(self.transport());
        }
        let Some(target) = target else {
            tracing::debug!(direction, "playlist empty, nothing to select");
            return Ok(self.transport());
        };
        self.state.clock.cancel_preview();
        tracing::debug!(direction, id = target.id, "changing track");
        self.load_track(target)
    }

    fn resync_from_output(
        &mut self,
        snapshot: Option<SessionSnapshot>,
        source: &str,
        position: f64,
        duration: Option<f64>,
    ) -> Result<()> {
        let snapshot = snapshot.filter(|snapshot| {
            snapshot.track.stream_locator(&self.api_base) == source
        });
        let Some(snapshot) = snapshot else {
            tracing::warn!(%source, "output playing an unknown stream, pausing it");
            self.service.with_output(|output| output.pause())?;
            return Ok(());
        };

        tracing::info!(id = snapshot.track.id, position, "attached to running playback");
        let fallback = snapshot.track.duration_seconds();
        self.state.track = Some(snapshot.track);
        self.state.clock.set_duration(duration.or(Some(fallback)));
        self.state.clock.set_position(position);
        self.set_playing(true);
        self.changes.push(SessionChange::TrackChanged);
        self.persist();
        Ok(())
    }

    fn restore(&mut self, snapshot: SessionSnapshot, current_source: Option<&str>) -> Result<()> {
        let locator = snapshot.track.stream_locator(&self.api_base);
        let repoint = current_source != Some(locator.as_str());
        let fallback = snapshot.track.duration_seconds();
        tracing::info!(
            id = snapshot.track.id,
            position = snapshot.position,
            playing = snapshot.playing,
            repoint,
            "restoring session snapshot"
        );

        self.state.track = Some(snapshot.track);
        self.changes.push(SessionChange::TrackChanged);

        let reported = self.service.with_output(|output| {
            if repoint {
                output.set_source(&locator);
            }
            output.duration()
        })?;
        self.state.clock.set_duration(reported.or(Some(fallback)));
        let position = self.state.clock.set_position(snapshot.position);
        self.service
            .with_output(|output| output.set_current_time(position))?;

        if snapshot.playing {
            if let Err(err) = self.start_playback() {
                tracing::warn!(error = %err, "could not resume restored track");
            }
        }
        self.persist();
        Ok(())
    }

    fn start_playback(&mut self) -> Result<Transport> {
        match self.service.with_output(|output| output.play())? {
            Ok(()) => {
                self.pending_resume = None;
                self.failed = false;
                self.set_playing(true);
                Ok(Transport::Playing)
            }
            Err(err) => {
                self.on_play_failed(&err);
                if err.is_policy() {
                    Ok(self.transport())
                } else {
                    Err(err.into())
                }
            }
        }
    }

    fn pause_output(&mut self) -> Result<Transport> {
        self.service.with_output(|output| output.pause())?;
        self.pending_resume = None;
        self.set_playing(false);
        Ok(Transport::Paused)
    }

    fn on_play_failed(&mut self, err: &OutputError) {
        self.set_playing(false);
        self.failed = !err.is_policy();
        if err.is_policy() {
            self.pending_resume = (self.config.max_resume_retries > 0)
                .then_some(self.config.max_resume_retries);
            tracing::debug!(retries = ?self.pending_resume, "playback blocked, waiting for interaction");
        } else {
            self.pending_resume = None;
            tracing::warn!(error = %err, "playback failed");
        }
    }

    fn retry_resume(&mut self, trigger: &'static str) -> Result<()> {
        let Some(remaining) = self.pending_resume else {
            return Ok(());
        };

        let paused = self.service.with_output(|output| output.is_paused())?;
        if !paused {
            self.pending_resume = None;
            self.set_playing(true);
            self.persist();
            return Ok(());
        }

        match self.service.with_output(|output| output.play())? {
            Ok(()) => {
                tracing::info!(trigger, "deferred playback resumed");
                self.pending_resume = None;
                self.set_playing(true);
            }
            Err(err) if err.is_policy() && remaining > 1 => {
                tracing::debug!(trigger, remaining = remaining - 1, "resume still blocked");
                self.pending_resume = Some(remaining - 1);
            }
            Err(err) => {
                tracing::debug!(trigger, error = %err, "abandoning deferred resume");
                self.pending_resume = None;
            }
        }
        self.persist();
        Ok(())
    }

    fn set_playing(&mut self, playing: bool) {
        if self.state.playing != playing {
            self.state.playing = playing;
            self.changes.push(SessionChange::PlayingChanged);
        }
    }

    fn persist(&self) {
        let Some(track) = self.state.track.clone() else {
            return;
        };
        let snapshot = SessionSnapshot {
            track,
            position: self.state.clock.position(),
            playing: self.state.playing || self.pending_resume.is_some(),
        };
        if let Err(err) = snapshot.save(self.store.as_ref()) {
            tracing::warn!(error = %err, "failed to write session snapshot");
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state)
            .field("playlist", &self.playlist.len())
            .field("pending_resume", &self.pending_resume)
            .field("failed", &self.failed)
            .finish()
    }
}

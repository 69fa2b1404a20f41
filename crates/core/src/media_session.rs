//! Now-playing metadata and transport buttons of the host platform.

use std::collections::BTreeMap;

use crate::{Artwork, PlaybackState, SessionChange, TransportCommand};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMetadata {
    pub title: String,
    pub artist: String,
    pub artwork: Vec<Artwork>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaPlaybackState {
    #[default]
    None,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MediaAction {
    Play,
    Pause,
    NextTrack,
    PreviousTrack,
}

impl MediaAction {
    pub const ALL: [MediaAction; 4] = [
        MediaAction::Play,
        MediaAction::Pause,
        MediaAction::NextTrack,
        MediaAction::PreviousTrack,
    ];
}

/// Platform now-playing surface (lock screen, media overlay, ...).
pub trait NowPlayingSurface {
    fn set_metadata(&mut self, metadata: Option<MediaMetadata>);
    fn set_playback_state(&mut self, state: MediaPlaybackState);
    /// Enables or disables the platform control for `action`.
    fn set_action_handler(&mut self, action: MediaAction, enabled: bool);
}

/// Surface for hosts without platform media controls.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl NowPlayingSurface for NullSurface {
    fn set_metadata(&mut self, _metadata: Option<MediaMetadata>) {}
    fn set_playback_state(&mut self, _state: MediaPlaybackState) {}
    fn set_action_handler(&mut self, _action: MediaAction, _enabled: bool) {}
}

/// Surface that keeps whatever was last published.
#[derive(Debug, Default, Clone)]
pub struct RecordingSurface {
    pub metadata: Option<MediaMetadata>,
    pub playback_state: MediaPlaybackState,
    pub enabled: BTreeMap<MediaAction, bool>,
    pub metadata_updates: usize,
    pub state_updates: usize,
}

impl NowPlayingSurface for RecordingSurface {
    fn set_metadata(&mut self, metadata: Option<MediaMetadata>) {
        self.metadata = metadata;
        self.metadata_updates += 1;
    }

    fn set_playback_state(&mut self, state: MediaPlaybackState) {
        self.playback_state = state;
        self.state_updates += 1;
    }

    fn set_action_handler(&mut self, action: MediaAction, enabled: bool) {
        self.enabled.insert(action, enabled);
    }
}

/// Mirrors the session onto a [`NowPlayingSurface`] and translates platform
/// button presses back into [`TransportCommand`]s.
#[derive(Debug, Default)]
pub struct MediaSessionBridge {
    handlers: BTreeMap<MediaAction, TransportCommand>,
}

impl MediaSessionBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs handlers for every action. Registering again replaces the
    /// previous set.
    pub fn register(&mut self, surface: &mut dyn NowPlayingSurface) {
        for action in MediaAction::ALL {
            self.handlers.insert(action, command_for_action(action));
            surface.set_action_handler(action, true);
        }
    }

    pub fn unregister(&mut self, surface: &mut dyn NowPlayingSurface) {
        for action in std::mem::take(&mut self.handlers).into_keys() {
            surface.set_action_handler(action, false);
        }
    }

    pub fn is_registered(&self) -> bool {
        !self.handlers.is_empty()
    }

    /// Command to dispatch for a platform button press, if registered.
    pub fn command_for(&self, action: MediaAction) -> Option<TransportCommand> {
        self.handlers.get(&action).copied()
    }

    /// Publishes whatever `changes` touched.
    pub fn publish(
        &self,
        changes: &[SessionChange],
        state: &PlaybackState,
        surface: &mut dyn NowPlayingSurface,
    ) {
        if changes.contains(&SessionChange::TrackChanged) {
            surface.set_metadata(metadata_for(state));
        }
        if changes.contains(&SessionChange::PlayingChanged) {
            surface.set_playback_state(playback_state_for(state));
        }
    }

    /// Publishes metadata and playback state unconditionally.
    pub fn sync(&self, state: &PlaybackState, surface: &mut dyn NowPlayingSurface) {
        surface.set_metadata(metadata_for(state));
        surface.set_playback_state(playback_state_for(state));
    }
}

fn command_for_action(action: MediaAction) -> TransportCommand {
    match action {
        MediaAction::Play => TransportCommand::Play,
        MediaAction::Pause => TransportCommand::Pause,
        MediaAction::NextTrack => TransportCommand::Next,
        MediaAction::PreviousTrack => TransportCommand::Previous,
    }
}

fn metadata_for(state: &PlaybackState) -> Option<MediaMetadata> {
    state.track().map(|track| MediaMetadata {
        title: track.title.clone(),
        artist: track.artist.clone(),
        artwork: track.artwork_variants(),
    })
}

fn playback_state_for(state: &PlaybackState) -> MediaPlaybackState {
    match (state.track(), state.is_playing()) {
        (None, _) => MediaPlaybackState::None,
        (Some(_), true) => MediaPlaybackState::Playing,
        (Some(_), false) => MediaPlaybackState::Paused,
    }
}

//! Core library for the Stream Player client.
//!
//! The crate owns the parts of the player with real state: the playback
//! session that drives the one audio output and keeps it across views, the
//! spectrum pipeline fed from that output, and the gesture recognizer used
//! for swipe navigation. Platform specifics (the actual output, the
//! now-playing surface, durable storage) sit behind small traits so hosts can
//! plug in their own.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod gesture;
pub mod keyboard;
pub mod library;
pub mod media_session;
pub mod session;
pub mod track;

pub use analysis::{AnalyserNode, SpectrumBars, SpectrumVisualizer, TeardownReason};
pub use audio::{
    AudioOutput, AudioService, AutoplayPolicy, OutputEvent, ServiceSlot, SimulatedOutput,
};
pub use config::{AnalyzerConfig, ApiConfig, AppConfig, GestureConfig, SessionConfig};
pub use error::{OutputError, PlayerError, Result};
pub use gesture::{GestureEvent, InputTarget, PointerKind, SwipeDirection, SwipeRecognizer};
pub use keyboard::{shortcut_for, FocusTarget, KeyCode, KeyPress, KeyboardShortcuts};
pub use library::{search_locator, LikedTracks, SearchResponse};
pub use media_session::{
    MediaAction, MediaMetadata, MediaPlaybackState, MediaSessionBridge, NowPlayingSurface,
    NullSurface, RecordingSurface,
};
pub use session::{
    format_time, JsonFileStore, MemoryStore, PlaybackClock, PlaybackState, SessionChange,
    SessionManager, SessionSnapshot, SnapshotStore, Transport, TransportCommand,
};
pub use track::{Artwork, Playlist, Track};

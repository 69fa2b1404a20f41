//! Boundary with the remote search and like services.
//!
//! The core never talks to these services itself; it only builds their
//! locators and keeps the liked set that feeds a displayed playlist.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{PlayerError, Playlist, Result, SnapshotStore, Track};

const LIKED_KEY: &str = "liked_tracks";

/// Body of `GET /search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub tracks: Vec<Track>,
}

impl SearchResponse {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn into_playlist(self) -> Playlist {
        Playlist::new(self.tracks)
    }
}

/// `GET /search?q=<query>&limit=<n>` for a non-blank query.
pub fn search_locator(api_base: &str, query: &str, limit: usize) -> Result<String> {
    let query = query.trim();
    if query.is_empty() {
        return Err(PlayerError::InvalidInput("search query must not be empty"));
    }
    Ok(format!(
        "{}/search?q={}&limit={}",
        api_base.trim_end_matches('/'),
        urlencoding::encode(query),
        limit
    ))
}

/// Locally mirrored liked tracks, in the order they were liked.
pub struct LikedTracks {
    store: Arc<dyn SnapshotStore>,
    tracks: Vec<Track>,
}

impl LikedTracks {
    /// Loads the local copy. Unreadable data starts an empty set.
    pub fn load(store: Arc<dyn SnapshotStore>) -> Self {
        let tracks = match store.get(LIKED_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "ignoring corrupt liked tracks");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(error = %err, "liked tracks unavailable");
                Vec::new()
            }
        };
        Self { store, tracks }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn is_liked(&self, id: u64) -> bool {
        self.tracks.iter().any(|track| track.id == id)
    }

    /// Likes or unlikes `track`. Returns whether it is liked afterwards.
    pub fn toggle(&mut self, track: &Track) -> Result<bool> {
        let liked = match self.tracks.iter().position(|t| t.id == track.id) {
            Some(index) => {
                self.tracks.remove(index);
                false
            }
            None => {
                self.tracks.push(track.clone());
                true
            }
        };
        self.save()?;
        Ok(liked)
    }

    /// Adopts the server copy wholesale.
    pub fn replace(&mut self, tracks: Vec<Track>) -> Result<()> {
        self.tracks = tracks;
        self.save()
    }

    pub fn to_playlist(&self) -> Playlist {
        Playlist::new(self.tracks.clone())
    }

    fn save(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.tracks)?;
        self.store.set(LIKED_KEY, &raw)
    }
}

impl std::fmt::Debug for LikedTracks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LikedTracks")
            .field("tracks", &self.tracks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{track::tests::track, MemoryStore};

    #[test]
    fn builds_search_locator() {
        assert_eq!(
            search_locator("http://localhost:8000", " lo fi ", 20).unwrap(),
            "http://localhost:8000/search?q=lo%20fi&limit=20"
        );
        assert!(search_locator("http://localhost:8000", "   ", 20).is_err());
    }

    #[test]
    fn parses_search_results_into_a_playlist() {
        let raw = r#"{"tracks":[
            {"url":"a","artist":"x","title":"one","duration":1000,"id":1},
            {"url":"b","artist":"y","title":"two","duration":2000,"id":2,"artwork_url":null}
        ]}"#;
        let playlist = SearchResponse::from_json(raw).unwrap().into_playlist();
        assert_eq!(playlist.len(), 2);
        assert_eq!(playlist.position_of(2), Some(1));
    }

    #[test]
    fn toggling_persists_the_liked_set() {
        let store: Arc<dyn SnapshotStore> = Arc::new(MemoryStore::new());
        let mut liked = LikedTracks::load(Arc::clone(&store));

        assert!(liked.toggle(&track(1)).unwrap());
        assert!(liked.toggle(&track(2)).unwrap());
        assert!(!liked.toggle(&track(1)).unwrap());

        let reloaded = LikedTracks::load(store);
        assert!(reloaded.is_liked(2));
        assert!(!reloaded.is_liked(1));
        assert_eq!(reloaded.to_playlist().len(), 1);
    }

    #[test]
    fn corrupt_local_copy_starts_empty() {
        let store: Arc<dyn SnapshotStore> = Arc::new(MemoryStore::new());
        store.set(LIKED_KEY, "{not json").unwrap();
        assert!(LikedTracks::load(store).tracks().is_empty());
    }
}

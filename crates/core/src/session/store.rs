use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use crate::{PlayerError, Result, Track};

const TRACK_KEY: &str = "player.current_track";
const POSITION_KEY: &str = "player.current_time";
const PLAYING_KEY: &str = "player.is_playing";

/// String key/value storage that outlives a single view.
pub trait SnapshotStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Session-scoped store; gone when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| PlayerError::Poisoned("memory store"))
    }
}

impl SnapshotStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Opens `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| PlayerError::Poisoned("file store"))
    }
}

impl SnapshotStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.lock()?;
        if entries.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        entries.insert(key.to_string(), value.to_string());
        self.write(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.lock()?;
        if entries.remove(key).is_some() {
            self.write(&entries)?;
        }
        Ok(())
    }
}

/// Durable projection of playback intent, read once on activation.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub track: Track,
    pub position: f64,
    pub playing: bool,
}

impl SessionSnapshot {
    /// Reads the three snapshot entries. `None` when no track was stored.
    pub fn load(store: &dyn SnapshotStore) -> Result<Option<Self>> {
        let Some(raw) = store.get(TRACK_KEY)? else {
            return Ok(None);
        };
        let track: Track = serde_json::from_str(&raw)?;

        let position = store
            .get(POSITION_KEY)?
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|value| value.is_finite() && *value >= 0.0)
            .unwrap_or(0.0);
        let playing = store
            .get(PLAYING_KEY)?
            .map(|value| value == "true")
            .unwrap_or(false);

        Ok(Some(Self {
            track,
            position,
            playing,
        }))
    }

    pub fn save(&self, store: &dyn SnapshotStore) -> Result<()> {
        store.set(TRACK_KEY, &serde_json::to_string(&self.track)?)?;
        store.set(POSITION_KEY, &self.position.to_string())?;
        store.set(PLAYING_KEY, if self.playing { "true" } else { "false" })
    }

    pub fn clear(store: &dyn SnapshotStore) -> Result<()> {
        store.remove(TRACK_KEY)?;
        store.remove(POSITION_KEY)?;
        store.remove(PLAYING_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::tests::track;

    #[test]
    fn snapshot_uses_three_string_entries() {
        let store = MemoryStore::new();
        let snapshot = SessionSnapshot {
            track: track(4),
            position: 12.5,
            playing: true,
        };
        snapshot.save(&store).unwrap();

        assert_eq!(store.get(POSITION_KEY).unwrap().as_deref(), Some("12.5"));
        assert_eq!(store.get(PLAYING_KEY).unwrap().as_deref(), Some("true"));
        assert_eq!(SessionSnapshot::load(&store).unwrap(), Some(snapshot));
    }

    #[test]
    fn missing_track_means_no_snapshot() {
        let store = MemoryStore::new();
        store.set(POSITION_KEY, "30").unwrap();
        assert!(SessionSnapshot::load(&store).unwrap().is_none());
    }

    #[test]
    fn garbage_position_falls_back_to_start() {
        let store = MemoryStore::new();
        store
            .set(TRACK_KEY, &serde_json::to_string(&track(1)).unwrap())
            .unwrap();
        store.set(POSITION_KEY, "soon").unwrap();

        let snapshot = SessionSnapshot::load(&store).unwrap().unwrap();
        assert_eq!(snapshot.position, 0.0);
        assert!(!snapshot.playing);
    }

    #[test]
    fn clear_removes_every_entry() {
        let store = MemoryStore::new();
        SessionSnapshot {
            track: track(1),
            position: 1.0,
            playing: false,
        }
        .save(&store)
        .unwrap();

        SessionSnapshot::clear(&store).unwrap();
        assert!(store.get(TRACK_KEY).unwrap().is_none());
        assert!(store.get(PLAYING_KEY).unwrap().is_none());
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.set("volume", "0.8").unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("volume").unwrap().as_deref(), Some("0.8"));
        reopened.remove("volume").unwrap();
        assert!(JsonFileStore::open(&path).unwrap().get("volume").unwrap().is_none());
    }
}

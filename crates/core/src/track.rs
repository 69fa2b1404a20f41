use serde::{Deserialize, Serialize};

/// Artwork entry published to platform media controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    pub src: String,
    pub sizes: String,
    pub mime: String,
}

/// A single playable item as returned by the search and like services.
///
/// Identity is the numeric `id`; two tracks with the same id compare equal
/// even if their metadata differs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub url: String,
    pub artist: String,
    pub title: String,
    /// Length in milliseconds as reported upstream.
    pub duration: u64,
    #[serde(default)]
    pub artwork_url: Option<String>,
    pub id: u64,
    #[serde(default)]
    pub playback_count: Option<u64>,
    #[serde(default)]
    pub likes_count: Option<u64>,
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}

impl Track {
    /// Streaming endpoint the audio output is pointed at.
    pub fn stream_locator(&self, api_base: &str) -> String {
        format!(
            "{}/stream?url={}",
            api_base.trim_end_matches('/'),
            urlencoding::encode(&self.url)
        )
    }

    pub fn download_locator(&self, api_base: &str) -> String {
        format!(
            "{}/download?url={}",
            api_base.trim_end_matches('/'),
            urlencoding::encode(&self.url)
        )
    }

    pub fn download_file_name(&self) -> String {
        format!("{} - {}.mp3", self.artist, self.title)
    }

    /// Fallback duration used until the output reports its own.
    pub fn duration_seconds(&self) -> f64 {
        self.duration as f64 / 1000.0
    }

    /// Large and medium artwork derived from the `-large` upstream image.
    pub fn artwork_variants(&self) -> Vec<Artwork> {
        let Some(url) = self.artwork_url.as_deref() else {
            return Vec::new();
        };

        [("-t500x500", "500x500"), ("-t300x300", "300x300")]
            .into_iter()
            .map(|(suffix, sizes)| Artwork {
                src: url.replace("-large", suffix),
                sizes: sizes.to_string(),
                mime: "image/jpeg".to_string(),
            })
            .collect()
    }
}

/// Ordered candidate set for next/previous traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    tracks: Vec<Track>,
}

impl Playlist {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Track> {
        self.tracks.iter()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn first(&self) -> Option<&Track> {
        self.tracks.first()
    }

    pub fn last(&self) -> Option<&Track> {
        self.tracks.last()
    }

    pub fn position_of(&self, id: u64) -> Option<usize> {
        self.tracks.iter().position(|track| track.id == id)
    }

    /// Track after `current`, wrapping to the start. A current track that is
    /// not part of the list falls back to the first entry.
    pub fn next_from(&self, current: Option<&Track>) -> Option<&Track> {
        match current.and_then(|track| self.position_of(track.id)) {
            Some(index) => self.tracks.get((index + 1) % self.tracks.len()),
            None => self.first(),
        }
    }

    /// Track before `current`, wrapping to the end. A current track that is
    /// not part of the list falls back to the last entry.
    pub fn previous_from(&self, current: Option<&Track>) -> Option<&Track> {
        match current.and_then(|track| self.position_of(track.id)) {
            Some(0) => self.last(),
            Some(index) => self.tracks.get(index - 1),
            None => self.last(),
        }
    }

    /// Forward-only successor used on natural end of stream.
    pub fn successor_of(&self, current: &Track) -> Option<&Track> {
        let index = self.position_of(current.id)?;
        self.tracks.get(index + 1)
    }
}

impl From<Vec<Track>> for Playlist {
    fn from(tracks: Vec<Track>) -> Self {
        Self::new(tracks)
    }
}

impl<'a> IntoIterator for &'a Playlist {
    type Item = &'a Track;
    type IntoIter = std::slice::Iter<'a, Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}

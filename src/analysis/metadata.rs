//! Tag and stream-property reading
//!
//! Uses lofty to read ID3v2 (MP3), Vorbis comments (FLAC/OGG), MP4 atoms and
//! AIFF/WAV chunks. Reading is best-effort: the engine falls back to values
//! derived from the file name when tags are missing or unreadable.

use crate::error::{EngineError, Result};
use crate::types::TrackTags;
use lofty::{Accessor, AudioFile, Probe, TaggedFileExt};
use std::path::Path;
use tracing::debug;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_GENRE: &str = "Unknown";

/// Reads tags and stream properties from a file
pub trait TagReader: Send + Sync {
    /// Every field is optional; an error means the file could not be probed
    fn read_tags(&self, path: &Path) -> Result<TrackTags>;

    /// Get the name of this reader (for logging)
    fn name(&self) -> &'static str;
}

/// lofty-backed tag reader
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagReader;

impl LoftyTagReader {
    pub fn new() -> Self {
        Self
    }
}

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> Result<TrackTags> {
        let tagged_file = Probe::open(path)
            .and_then(|probe| probe.read())
            .map_err(|e| EngineError::decode_error(path, format!("Tag probe failed: {}", e)))?;

        let properties = tagged_file.properties();
        let duration = properties.duration().as_secs_f64();

        let mut tags = TrackTags {
            duration_seconds: (duration > 0.0).then_some(duration),
            sample_rate: properties.sample_rate(),
            bit_depth: properties.bit_depth().map(u32::from),
            channels: properties.channels().map(u32::from),
            codec: Some(format!("{:?}", tagged_file.file_type()).to_lowercase()),
            ..TrackTags::default()
        };

        match tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
            Some(tag) => {
                tags.title = non_empty(tag.title().as_deref());
                tags.artist = non_empty(tag.artist().as_deref());
                tags.album = non_empty(tag.album().as_deref());
                tags.genre = non_empty(tag.genre().as_deref());
                tags.year = tag.year().map(|y| y as i32);
            }
            None => debug!("No tags found in {}", path.display()),
        }

        Ok(tags)
    }

    fn name(&self) -> &'static str {
        "lofty"
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Display fields after applying file-name and "Unknown" fallbacks
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
}

/// Fill missing tag fields
///
/// A file stem shaped like `Artist - Title` supplies both fields when the tags
/// don't; otherwise the whole stem becomes the title.
pub fn resolve_display(path: &Path, tags: &TrackTags) -> DisplayMetadata {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (stem_artist, stem_title) = match stem.split_once(" - ") {
        Some((artist, title)) if !artist.trim().is_empty() && !title.trim().is_empty() => {
            (Some(artist.trim().to_string()), title.trim().to_string())
        }
        _ => (None, stem.clone()),
    };

    DisplayMetadata {
        title: tags.title.clone().unwrap_or(stem_title),
        artist: tags
            .artist
            .clone()
            .or(stem_artist)
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        album: tags
            .album
            .clone()
            .unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
        genre: tags
            .genre
            .clone()
            .unwrap_or_else(|| UNKNOWN_GENRE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_split_when_untagged() {
        let display = resolve_display(
            Path::new("/music/Daft Punk - One More Time.mp3"),
            &TrackTags::default(),
        );
        assert_eq!(display.artist, "Daft Punk");
        assert_eq!(display.title, "One More Time");
        assert_eq!(display.album, UNKNOWN_ALBUM);
        assert_eq!(display.genre, UNKNOWN_GENRE);
    }

    #[test]
    fn test_plain_stem_becomes_title() {
        let display = resolve_display(Path::new("track01.wav"), &TrackTags::default());
        assert_eq!(display.title, "track01");
        assert_eq!(display.artist, UNKNOWN_ARTIST);
    }

    #[test]
    fn test_tags_win_over_filename() {
        let tags = TrackTags {
            title: Some("Real Title".into()),
            genre: Some("House".into()),
            ..TrackTags::default()
        };
        let display = resolve_display(Path::new("Someone - Other.flac"), &tags);
        assert_eq!(display.title, "Real Title");
        assert_eq!(display.artist, "Someone");
        assert_eq!(display.genre, "House");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let reader = LoftyTagReader::new();
        assert!(reader.read_tags(Path::new("/no/such/file.mp3")).is_err());
    }

    #[test]
    fn test_non_empty_trims() {
        assert_eq!(non_empty(Some("  ")), None);
        assert_eq!(non_empty(Some(" x ")), Some("x".to_string()));
    }
}

//! SQLite-backed result store

use super::schema::migrate_if_needed;
use super::ResultStore;
use crate::error::Result;
use crate::types::{AnalysisResult, HotCue};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Column list shared by every SELECT, in [`row_to_result`] order
const COLUMNS: &str = "file_path, file_hash, analysis_version, title, artist, album, year, genre,
    duration_s, sample_rate, bit_depth, channels, codec, bpm, bpm_confidence, musical_key,
    key_confidence, camelot_key, energy_level, dynamic_range, peak_db, loudness_lufs,
    loudness_range, intro_end_s, outro_start_s, first_beat_s, last_beat_s, hot_cues,
    danceability, valence, instrumentalness, speechiness, overall_confidence, last_analyzed";

/// Upsert keyed on file_path. `last_analyzed` timestamps are fixed-width
/// RFC 3339 text, so MAX() compares them chronologically.
const UPSERT_SQL: &str = "INSERT INTO analysis_results (
        file_path, file_hash, analysis_version, title, artist, album, year, genre,
        duration_s, sample_rate, bit_depth, channels, codec, bpm, bpm_confidence, musical_key,
        key_confidence, camelot_key, energy_level, dynamic_range, peak_db, loudness_lufs,
        loudness_range, intro_end_s, outro_start_s, first_beat_s, last_beat_s, hot_cues,
        danceability, valence, instrumentalness, speechiness, overall_confidence, last_analyzed)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
        ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31, ?32, ?33, ?34)
    ON CONFLICT(file_path) DO UPDATE SET
        file_hash = excluded.file_hash,
        analysis_version = excluded.analysis_version,
        title = excluded.title,
        artist = excluded.artist,
        album = excluded.album,
        year = excluded.year,
        genre = excluded.genre,
        duration_s = excluded.duration_s,
        sample_rate = excluded.sample_rate,
        bit_depth = excluded.bit_depth,
        channels = excluded.channels,
        codec = excluded.codec,
        bpm = excluded.bpm,
        bpm_confidence = excluded.bpm_confidence,
        musical_key = excluded.musical_key,
        key_confidence = excluded.key_confidence,
        camelot_key = excluded.camelot_key,
        energy_level = excluded.energy_level,
        dynamic_range = excluded.dynamic_range,
        peak_db = excluded.peak_db,
        loudness_lufs = excluded.loudness_lufs,
        loudness_range = excluded.loudness_range,
        intro_end_s = excluded.intro_end_s,
        outro_start_s = excluded.outro_start_s,
        first_beat_s = excluded.first_beat_s,
        last_beat_s = excluded.last_beat_s,
        hot_cues = excluded.hot_cues,
        danceability = excluded.danceability,
        valence = excluded.valence,
        instrumentalness = excluded.instrumentalness,
        speechiness = excluded.speechiness,
        overall_confidence = excluded.overall_confidence,
        last_analyzed = MAX(excluded.last_analyzed, analysis_results.last_analyzed)";

/// Result store on a single SQLite connection; writes are serialized by its mutex
#[derive(Clone)]
pub struct SqliteResultStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteResultStore {
    /// Open (or create) the database file and migrate it to the latest schema
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let mut conn = Connection::open(db_path.as_ref())?;
        migrate_if_needed(&mut conn)?;

        let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |r| r.get(0))?;
        debug!("Result store journal mode: {}", mode);

        let store = Self::from_connection(conn);
        info!(
            "Result store ready at {}: {} tracks analyzed",
            db_path.as_ref().display(),
            store.count()?
        );
        Ok(store)
    }

    /// Private in-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migrate_if_needed(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// A panic while holding the lock cannot leave SQLite itself inconsistent
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn query_results<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<AnalysisResult>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params, row_to_result)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

/// Fixed-width UTC timestamp text
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn conversion_error(
    index: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

fn row_to_result(row: &Row<'_>) -> rusqlite::Result<AnalysisResult> {
    let hot_cues_json: String = row.get(27)?;
    let hot_cues: Vec<HotCue> =
        serde_json::from_str(&hot_cues_json).map_err(|e| conversion_error(27, e))?;

    let last_analyzed: String = row.get(33)?;
    let last_analyzed = DateTime::parse_from_rfc3339(&last_analyzed)
        .map_err(|e| conversion_error(33, e))?
        .with_timezone(&Utc);

    Ok(AnalysisResult {
        file_path: row.get(0)?,
        file_hash: row.get(1)?,
        analysis_version: row.get(2)?,
        title: row.get(3)?,
        artist: row.get(4)?,
        album: row.get(5)?,
        year: row.get(6)?,
        genre: row.get(7)?,
        duration_s: row.get(8)?,
        sample_rate: row.get(9)?,
        bit_depth: row.get(10)?,
        channels: row.get(11)?,
        codec: row.get(12)?,
        bpm: row.get(13)?,
        bpm_confidence: row.get(14)?,
        musical_key: row.get(15)?,
        key_confidence: row.get(16)?,
        camelot_key: row.get(17)?,
        energy_level: row.get(18)?,
        dynamic_range: row.get(19)?,
        peak_db: row.get(20)?,
        loudness_lufs: row.get(21)?,
        loudness_range: row.get(22)?,
        intro_end_s: row.get(23)?,
        outro_start_s: row.get(24)?,
        first_beat_s: row.get(25)?,
        last_beat_s: row.get(26)?,
        hot_cues,
        danceability: row.get(28)?,
        valence: row.get(29)?,
        instrumentalness: row.get(30)?,
        speechiness: row.get(31)?,
        overall_confidence: row.get(32)?,
        last_analyzed,
    })
}

impl ResultStore for SqliteResultStore {
    fn save(&self, r: &AnalysisResult) -> Result<()> {
        let hot_cues = serde_json::to_string(&r.hot_cues)?;
        let last_analyzed = format_timestamp(&r.last_analyzed);

        let conn = self.lock();
        conn.execute(
            UPSERT_SQL,
            params![
                r.file_path,
                r.file_hash,
                r.analysis_version,
                r.title,
                r.artist,
                r.album,
                r.year,
                r.genre,
                r.duration_s,
                r.sample_rate,
                r.bit_depth,
                r.channels,
                r.codec,
                r.bpm,
                r.bpm_confidence,
                r.musical_key,
                r.key_confidence,
                r.camelot_key,
                r.energy_level,
                r.dynamic_range,
                r.peak_db,
                r.loudness_lufs,
                r.loudness_range,
                r.intro_end_s,
                r.outro_start_s,
                r.first_beat_s,
                r.last_beat_s,
                hot_cues,
                r.danceability,
                r.valence,
                r.instrumentalness,
                r.speechiness,
                r.overall_confidence,
                last_analyzed,
            ],
        )?;
        debug!("Saved analysis for {}", r.file_path);
        Ok(())
    }

    fn get(&self, file_path: &str) -> Result<Option<AnalysisResult>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM analysis_results WHERE file_path = ?1",
            COLUMNS
        ))?;
        let result = stmt.query_row(params![file_path], row_to_result).optional()?;
        Ok(result)
    }

    fn find_by_bpm_range(&self, min: f64, max: f64) -> Result<Vec<AnalysisResult>> {
        self.query_results(
            &format!(
                "SELECT {} FROM analysis_results WHERE bpm BETWEEN ?1 AND ?2 ORDER BY bpm, file_path",
                COLUMNS
            ),
            params![min, max],
        )
    }

    fn find_by_camelot_keys(&self, keys: &[String]) -> Result<Vec<AnalysisResult>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; keys.len()].join(", ");
        self.query_results(
            &format!(
                "SELECT {} FROM analysis_results WHERE camelot_key IN ({}) ORDER BY file_path",
                COLUMNS, placeholders
            ),
            params_from_iter(keys.iter()),
        )
    }

    fn all(&self) -> Result<Vec<AnalysisResult>> {
        self.query_results(
            &format!("SELECT {} FROM analysis_results ORDER BY file_path", COLUMNS),
            [],
        )
    }

    fn count(&self) -> Result<usize> {
        let conn = self.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM analysis_results", [], |r| r.get(0))?;
        Ok(count as usize)
    }
}

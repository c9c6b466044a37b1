//! SQLite schema for the result store
//!
//! The schema version lives in `PRAGMA user_version`. A fresh database is
//! created at the latest version; older databases are walked forward one
//! migration at a time.

use rusqlite::Connection;
use tracing::info;

pub struct Table {
    pub name: &'static str,
    pub schema: &'static str,
    pub indices: &'static [&'static str],
}

pub struct VersionedSchema {
    pub version: u32,
    pub tables: &'static [Table],
    /// Upgrades a database at `version - 1` to this version
    pub migration: Option<fn(&Connection) -> rusqlite::Result<()>>,
}

impl VersionedSchema {
    /// Create every table and index of this version on an empty database
    pub fn create(&self, conn: &Connection) -> rusqlite::Result<()> {
        for table in self.tables {
            conn.execute_batch(table.schema)?;
            for index in table.indices {
                conn.execute_batch(index)?;
            }
        }
        conn.pragma_update(None, "user_version", self.version)?;
        Ok(())
    }
}

const ANALYSIS_RESULTS_TABLE_V_1: Table = Table {
    name: "analysis_results",
    schema: "CREATE TABLE analysis_results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        file_path TEXT NOT NULL UNIQUE,
        file_hash TEXT,
        analysis_version TEXT NOT NULL,
        title TEXT NOT NULL,
        artist TEXT NOT NULL,
        album TEXT NOT NULL,
        year INTEGER,
        genre TEXT NOT NULL,
        duration_s REAL NOT NULL,
        sample_rate INTEGER NOT NULL,
        bit_depth INTEGER,
        channels INTEGER,
        codec TEXT,
        bpm REAL,
        bpm_confidence REAL NOT NULL,
        musical_key TEXT,
        key_confidence REAL NOT NULL,
        camelot_key TEXT,
        energy_level REAL NOT NULL,
        dynamic_range REAL NOT NULL,
        peak_db REAL NOT NULL,
        loudness_lufs REAL NOT NULL,
        loudness_range REAL NOT NULL,
        intro_end_s REAL NOT NULL,
        outro_start_s REAL NOT NULL,
        first_beat_s REAL NOT NULL,
        last_beat_s REAL NOT NULL,
        hot_cues TEXT NOT NULL DEFAULT '[]',
        danceability REAL NOT NULL,
        valence REAL NOT NULL,
        instrumentalness REAL NOT NULL,
        speechiness REAL NOT NULL,
        overall_confidence REAL NOT NULL,
        last_analyzed TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );",
    indices: &[
        "CREATE INDEX idx_analysis_file_path ON analysis_results (file_path);",
        "CREATE INDEX idx_analysis_bpm ON analysis_results (bpm);",
        "CREATE INDEX idx_analysis_musical_key ON analysis_results (musical_key);",
        "CREATE INDEX idx_analysis_energy ON analysis_results (energy_level);",
        "CREATE INDEX idx_analysis_last_analyzed ON analysis_results (last_analyzed);",
    ],
};

const CAMELOT_INDEX_V_2: &str =
    "CREATE INDEX idx_analysis_camelot_key ON analysis_results (camelot_key);";

fn migrate_v1_to_v2(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CAMELOT_INDEX_V_2)
}

const ANALYSIS_RESULTS_TABLE_V_2: Table = Table {
    indices: &[
        "CREATE INDEX idx_analysis_file_path ON analysis_results (file_path);",
        "CREATE INDEX idx_analysis_bpm ON analysis_results (bpm);",
        "CREATE INDEX idx_analysis_musical_key ON analysis_results (musical_key);",
        "CREATE INDEX idx_analysis_energy ON analysis_results (energy_level);",
        "CREATE INDEX idx_analysis_last_analyzed ON analysis_results (last_analyzed);",
        CAMELOT_INDEX_V_2,
    ],
    ..ANALYSIS_RESULTS_TABLE_V_1
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[ANALYSIS_RESULTS_TABLE_V_1],
        migration: None,
    },
    VersionedSchema {
        version: 2,
        tables: &[ANALYSIS_RESULTS_TABLE_V_2],
        migration: Some(migrate_v1_to_v2),
    },
];

/// Bring `conn` to the latest schema version
pub fn migrate_if_needed(conn: &mut Connection) -> rusqlite::Result<()> {
    let db_version: u32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    let latest = &VERSIONED_SCHEMAS[VERSIONED_SCHEMAS.len() - 1];

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;

    if table_count == 0 {
        info!("Creating result store schema at version {}", latest.version);
        let tx = conn.transaction()?;
        latest.create(&tx)?;
        return tx.commit();
    }

    if db_version >= latest.version {
        return Ok(());
    }

    let tx = conn.transaction()?;
    let mut current = db_version;
    for schema in VERSIONED_SCHEMAS.iter().filter(|s| s.version > db_version) {
        if let Some(migration) = schema.migration {
            info!("Migrating result store from version {} to {}", current, schema.version);
            migration(&tx)?;
        }
        current = schema.version;
    }
    tx.pragma_update(None, "user_version", current)?;
    tx.commit()
}

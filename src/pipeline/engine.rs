//! The analysis orchestrator
//!
//! One [`AnalyzerEngine`] owns the analyzer configuration, its adapters, the
//! result store and two bounded rayon pools: one for the six passes of a
//! single file, one for fanning a batch out over files.

use super::events::{AnalysisEvent, EventBus};
use super::AnalysisStage;
use crate::analysis::metadata::{resolve_display, LoftyTagReader, TagReader};
use crate::analysis::{
    descriptors, dynamics, key, loudness, onset, structure, tempo, PassOutput,
};
use crate::audio::{PcmSource, SymphoniaSource};
use crate::config::AnalysisConfig;
use crate::discovery::{FileHasher, Sha256Hasher};
use crate::error::{EngineError, Result};
use crate::store::ResultStore;
use crate::types::{
    AnalysisResult, AudioBuffer, Descriptors, DynamicsResult, KeyResult, LoudnessResult,
    StructureResult, TempoResult, TrackTags, ANALYSIS_VERSION,
};
use chrono::Utc;
use crossbeam_channel::Receiver;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Outputs of all passes for one buffer
#[derive(Debug, Clone, PartialEq)]
pub struct PassResults {
    pub onsets: Vec<f64>,
    pub tempo: TempoResult,
    pub key: KeyResult,
    pub dynamics: DynamicsResult,
    pub loudness: LoudnessResult,
    pub structure: StructureResult,
    pub descriptors: Descriptors,
}

/// Stable string key for a path, as stored in the result store
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Analysis orchestrator
pub struct AnalyzerEngine {
    config: AnalysisConfig,
    store: Arc<dyn ResultStore>,
    source: Arc<dyn PcmSource>,
    tags: Arc<dyn TagReader>,
    hasher: Arc<dyn FileHasher>,
    pass_pool: ThreadPool,
    pub(super) batch_pool: ThreadPool,
    events: EventBus,
    stages: Mutex<HashMap<String, AnalysisStage>>,
}

/// Builder for [`AnalyzerEngine`]
///
/// Adapters default to symphonia, lofty and SHA-256.
pub struct EngineBuilder {
    config: AnalysisConfig,
    store: Arc<dyn ResultStore>,
    source: Option<Arc<dyn PcmSource>>,
    tags: Option<Arc<dyn TagReader>>,
    hasher: Option<Arc<dyn FileHasher>>,
    pass_threads: usize,
    batch_workers: usize,
}

impl EngineBuilder {
    pub fn pcm_source(mut self, source: Arc<dyn PcmSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn tag_reader(mut self, tags: Arc<dyn TagReader>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn hasher(mut self, hasher: Arc<dyn FileHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Threads for the per-file passes (at least 1)
    pub fn pass_threads(mut self, threads: usize) -> Self {
        self.pass_threads = threads.max(1);
        self
    }

    /// Files analyzed concurrently by the batch runner (at least 1)
    pub fn batch_workers(mut self, workers: usize) -> Self {
        self.batch_workers = workers.max(1);
        self
    }

    pub fn build(self) -> Result<AnalyzerEngine> {
        self.config.validate()?;

        let source = self
            .source
            .unwrap_or_else(|| Arc::new(SymphoniaSource::new(self.config.sample_rate)));

        Ok(AnalyzerEngine {
            pass_pool: build_pool("djtagger-pass", self.pass_threads)?,
            batch_pool: build_pool("djtagger-batch", self.batch_workers)?,
            config: self.config,
            store: self.store,
            source,
            tags: self.tags.unwrap_or_else(|| Arc::new(LoftyTagReader::new())),
            hasher: self.hasher.unwrap_or_else(|| Arc::new(Sha256Hasher)),
            events: EventBus::new(),
            stages: Mutex::new(HashMap::new()),
        })
    }
}

fn build_pool(prefix: &'static str, threads: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(move |i| format!("{}-{}", prefix, i))
        .build()
        .map_err(|e| EngineError::ConfigError(format!("Failed to build {} pool: {}", prefix, e)))
}

/// Validate a pass output, substituting `fallback` on failure
fn settle<T: PassOutput>(file: &str, output: T, fallback: impl FnOnce() -> T) -> T {
    match output.checked() {
        Ok(value) => value,
        Err(e) => {
            warn!("{}: {}, using defaults", file, e);
            fallback()
        }
    }
}

impl AnalyzerEngine {
    pub fn builder(config: AnalysisConfig, store: Arc<dyn ResultStore>) -> EngineBuilder {
        EngineBuilder {
            config,
            store,
            source: None,
            tags: None,
            hasher: None,
            pass_threads: num_cpus::get().clamp(1, 6),
            batch_workers: num_cpus::get().saturating_sub(1).max(1),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ResultStore> {
        &self.store
    }

    /// Receive lifecycle events for every file this engine touches from now on
    pub fn subscribe(&self) -> Receiver<AnalysisEvent> {
        let rx = self.events.subscribe();
        debug!("{} event subscriber(s)", self.events.subscriber_count());
        rx
    }

    /// Decode, analyze and persist one file
    ///
    /// Decode failures abort the file before anything is written. Tag and
    /// hash problems only degrade the result.
    pub fn analyze(&self, path: &Path) -> Result<AnalysisResult> {
        let file_path = path_key(path);
        self.events.publish(AnalysisEvent::Started {
            file_path: file_path.clone(),
        });

        match self.decode_analyze_persist(path) {
            Ok(result) => {
                self.set_stage(&file_path, AnalysisStage::Done);
                info!(
                    "Analyzed {}: BPM={:?}, key={:?}, confidence={:.2}",
                    file_path, result.bpm, result.camelot_key, result.overall_confidence
                );
                self.events.publish(AnalysisEvent::Completed {
                    result: Box::new(result.clone()),
                });
                Ok(result)
            }
            Err(e) => {
                self.set_stage(&file_path, AnalysisStage::Failed);
                self.events.publish(AnalysisEvent::Error {
                    file_path,
                    stage: e.stage(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Only in-flight files are tracked; a terminal stage clears the entry.
    fn set_stage(&self, file_path: &str, stage: AnalysisStage) {
        debug!("{}: {}", stage, file_path);
        let mut stages = self.stages.lock().unwrap_or_else(PoisonError::into_inner);
        if stage.is_terminal() {
            stages.remove(file_path);
        } else {
            stages.insert(file_path.to_string(), stage);
        }
    }

    /// Stage `path` is currently in, `Idle` when no analysis of it is running
    pub fn stage(&self, path: &Path) -> AnalysisStage {
        self.stages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&path_key(path))
            .copied()
            .unwrap_or(AnalysisStage::Idle)
    }

    fn decode_analyze_persist(&self, path: &Path) -> Result<AnalysisResult> {
        let file_path = path_key(path);

        self.set_stage(&file_path, AnalysisStage::Decoding);
        let buffer = self.source.decode(path)?;

        self.set_stage(&file_path, AnalysisStage::Analyzing);
        let tags = self.tags.read_tags(path).unwrap_or_else(|e| {
            warn!("Failed to read tags from {}: {}", file_path, e);
            TrackTags::default()
        });
        let file_hash = match self.hasher.hash_file(path) {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!("Failed to hash {}: {}", file_path, e);
                None
            }
        };
        let result = self.assemble(path, &buffer, &tags, file_hash);

        self.set_stage(&file_path, AnalysisStage::Persisting);
        self.store.save(&result)?;

        Ok(result)
    }

    /// Analyze an already decoded buffer without touching the filesystem
    ///
    /// Metadata comes from the file name only and the hash is left empty.
    pub fn analyze_buffer(&self, path: &Path, buffer: &AudioBuffer) -> AnalysisResult {
        self.assemble(path, buffer, &TrackTags::default(), None)
    }

    /// Run every pass over `buffer` on the pass pool
    pub fn run_passes(&self, file: &str, buffer: &AudioBuffer) -> PassResults {
        let cfg = &self.config;
        let samples = buffer.samples.as_slice();
        let rate = buffer.sample_rate;
        let duration = buffer.duration;

        let mut key_out = KeyResult::default();
        let mut dynamics_out = DynamicsResult::default();
        let mut loudness_out = LoudnessResult::default();
        let mut descriptors_out = Descriptors::default();
        let mut onsets = Vec::new();
        let mut tempo_out = TempoResult::default();
        let mut structure_out = StructureResult::fallback(duration);

        self.pass_pool.install(|| {
            rayon::scope(|s| {
                s.spawn(|_| {
                    key_out = settle(file, key::detect_key(samples), KeyResult::default);
                });
                s.spawn(|_| {
                    dynamics_out = settle(
                        file,
                        dynamics::analyze_dynamics(samples, cfg.energy_window_size),
                        DynamicsResult::default,
                    );
                });
                s.spawn(|_| {
                    loudness_out = settle(
                        file,
                        loudness::analyze_loudness(samples, rate),
                        LoudnessResult::default,
                    );
                });
                s.spawn(|_| {
                    descriptors_out = settle(
                        file,
                        descriptors::synthesize(samples, rate),
                        Descriptors::default,
                    );
                });

                // Tempo and structure both depend on the onsets
                onsets =
                    onset::detect_onsets(samples, rate, cfg.analysis_window_size, cfg.hop_size);
                tempo_out = settle(
                    file,
                    tempo::estimate_tempo(&onsets, cfg.min_bpm, cfg.max_bpm),
                    TempoResult::default,
                );
                structure_out = settle(
                    file,
                    structure::analyze_structure(samples, rate, &onsets, duration),
                    || StructureResult::fallback(duration),
                );
            });
        });

        debug!(
            "{}: {} onsets, bpm={:?}, key={:?}, peak={:.1}dB, lufs={:.1}, {} hot cues",
            file,
            onsets.len(),
            tempo_out.bpm,
            key_out.key,
            dynamics_out.peak_db,
            loudness_out.lufs,
            structure_out.hot_cues.len()
        );

        if key_out.key.is_some() && key_out.confidence < cfg.key_confidence_threshold {
            debug!(
                "{}: low-confidence key {:?} ({:.2} < {:.2})",
                file, key_out.camelot, key_out.confidence, cfg.key_confidence_threshold
            );
        }

        PassResults {
            onsets,
            tempo: tempo_out,
            key: key_out,
            dynamics: dynamics_out,
            loudness: loudness_out,
            structure: structure_out,
            descriptors: descriptors_out,
        }
    }

    fn assemble(
        &self,
        path: &Path,
        buffer: &AudioBuffer,
        tags: &TrackTags,
        file_hash: Option<String>,
    ) -> AnalysisResult {
        let file_path = path_key(path);
        let passes = self.run_passes(&file_path, buffer);
        let display = resolve_display(path, tags);

        let PassResults {
            tempo,
            key,
            dynamics,
            loudness,
            structure,
            descriptors,
            ..
        } = passes;

        AnalysisResult {
            file_path,
            file_hash,
            analysis_version: ANALYSIS_VERSION.to_string(),
            title: display.title,
            artist: display.artist,
            album: display.album,
            year: tags.year,
            genre: display.genre,
            duration_s: tags
                .duration_seconds
                .filter(|d| *d > 0.0)
                .unwrap_or(buffer.duration),
            sample_rate: tags.sample_rate.unwrap_or(buffer.sample_rate),
            bit_depth: tags.bit_depth,
            channels: tags.channels,
            codec: tags.codec.clone(),
            bpm: tempo.bpm,
            bpm_confidence: tempo.confidence,
            musical_key: key.key.map(|p| p.to_standard_notation().to_string()),
            key_confidence: key.confidence,
            camelot_key: key.camelot,
            energy_level: dynamics.avg_energy,
            dynamic_range: dynamics.dynamic_range,
            peak_db: dynamics.peak_db,
            loudness_lufs: loudness.lufs,
            loudness_range: loudness.range,
            intro_end_s: structure.intro_end_s,
            outro_start_s: structure.outro_start_s,
            first_beat_s: structure.first_beat_s,
            last_beat_s: structure.last_beat_s,
            hot_cues: structure.hot_cues,
            danceability: descriptors.danceability,
            valence: descriptors.valence,
            instrumentalness: descriptors.instrumentalness,
            speechiness: descriptors.speechiness,
            overall_confidence: (tempo.confidence + key.confidence) / 2.0,
            last_analyzed: Utc::now(),
        }
    }

    /// Stored result for `path`, if any
    pub fn get_result(&self, path: &Path) -> Result<Option<AnalysisResult>> {
        self.store.get(&path_key(path))
    }

    /// The stored row if it is still valid for the file on disk
    ///
    /// A row is stale when its analysis version differs from the current one,
    /// or when the file's content hash differs from (or cannot be compared
    /// with) the stored hash.
    pub fn fresh_result(&self, path: &Path) -> Result<Option<AnalysisResult>> {
        let Some(row) = self.store.get(&path_key(path))? else {
            return Ok(None);
        };
        if row.analysis_version != ANALYSIS_VERSION {
            debug!(
                "{}: stored version {} is outdated",
                row.file_path, row.analysis_version
            );
            return Ok(None);
        }
        let Some(stored_hash) = row.file_hash.as_deref() else {
            return Ok(None);
        };
        match self.hasher.hash_file(path) {
            Ok(current) if current == stored_hash => Ok(Some(row)),
            Ok(_) => {
                debug!("{}: content changed since last analysis", row.file_path);
                Ok(None)
            }
            Err(e) => {
                debug!("{}: cannot hash for staleness check: {}", row.file_path, e);
                Ok(None)
            }
        }
    }

    /// True when `path` needs (re-)analysis
    pub fn is_stale(&self, path: &Path) -> Result<bool> {
        Ok(self.fresh_result(path)?.is_none())
    }

    /// Return the stored row when fresh, otherwise analyze the file
    pub fn analyze_if_stale(&self, path: &Path) -> Result<AnalysisResult> {
        match self.fresh_result(path)? {
            Some(row) => {
                debug!("{}: up to date, using stored result", row.file_path);
                self.events.publish(AnalysisEvent::Cached {
                    file_path: row.file_path.clone(),
                });
                Ok(row)
            }
            None => self.analyze(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteResultStore;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves a fixed buffer for any path, or fails like a missing file
    struct FixedSource {
        buffer: Option<AudioBuffer>,
        calls: AtomicUsize,
    }

    impl PcmSource for FixedSource {
        fn decode(&self, path: &Path) -> Result<AudioBuffer> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.buffer
                .clone()
                .ok_or_else(|| EngineError::FileNotFound(path.to_path_buf()))
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct FailingTags;

    impl TagReader for FailingTags {
        fn read_tags(&self, path: &Path) -> Result<TrackTags> {
            Err(EngineError::decode_error(path, "no tags"))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    struct ConstHasher(&'static str);

    impl FileHasher for ConstHasher {
        fn hash_file(&self, _path: &Path) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn tone(seconds: usize) -> AudioBuffer {
        let samples = (0..44100 * seconds)
            .map(|i| (i as f32 * 0.0627).sin() * 0.5)
            .collect();
        AudioBuffer::new(samples, 44100)
    }

    fn engine_with(buffer: Option<AudioBuffer>) -> (AnalyzerEngine, Arc<SqliteResultStore>) {
        let store = Arc::new(SqliteResultStore::open_in_memory().unwrap());
        let engine = AnalyzerEngine::builder(AnalysisConfig::default(), store.clone())
            .pcm_source(Arc::new(FixedSource {
                buffer,
                calls: AtomicUsize::new(0),
            }))
            .tag_reader(Arc::new(FailingTags))
            .hasher(Arc::new(ConstHasher("h1")))
            .pass_threads(2)
            .batch_workers(2)
            .build()
            .unwrap();
        (engine, store)
    }

    #[test]
    fn test_analyze_persists_and_uses_filename_fallback() {
        let (engine, store) = engine_with(Some(tone(3)));
        let path = PathBuf::from("/music/Artist Name - Song Title.wav");

        let result = engine.analyze(&path).unwrap();
        assert_eq!(result.artist, "Artist Name");
        assert_eq!(result.title, "Song Title");
        assert_eq!(result.album, "Unknown Album");
        assert_eq!(result.genre, "Unknown");
        assert_eq!(result.file_hash.as_deref(), Some("h1"));
        assert_eq!(result.analysis_version, ANALYSIS_VERSION);
        assert!((result.duration_s - 3.0).abs() < 1e-9);

        let stored = store.get(&path_key(&path)).unwrap().unwrap();
        assert_eq!(stored, result);
        assert_eq!(engine.stage(&path), AnalysisStage::Idle);
        assert!(engine.stages.lock().unwrap().is_empty());
    }

    #[test]
    fn test_decode_failure_writes_nothing() {
        let (engine, store) = engine_with(None);
        let events = engine.subscribe();

        assert_eq!(engine.stage(Path::new("/missing.wav")), AnalysisStage::Idle);
        let err = engine.analyze(Path::new("/missing.wav")).unwrap_err();
        assert!(matches!(err, EngineError::FileNotFound(_)));
        assert_eq!(engine.stage(Path::new("/missing.wav")), AnalysisStage::Idle);
        assert!(engine.stages.lock().unwrap().is_empty());
        assert_eq!(store.count().unwrap(), 0);

        assert!(matches!(events.try_recv(), Ok(AnalysisEvent::Started { .. })));
        match events.try_recv() {
            Ok(AnalysisEvent::Error { stage, .. }) => assert_eq!(stage, AnalysisStage::Decoding),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_confidences_and_ranges() {
        let (engine, _) = engine_with(None);
        let result = engine.analyze_buffer(Path::new("/t.wav"), &tone(12));

        for c in [
            result.bpm_confidence,
            result.key_confidence,
            result.overall_confidence,
            result.danceability,
            result.valence,
            result.instrumentalness,
            result.speechiness,
        ] {
            assert!((0.0..=1.0).contains(&c), "{} out of range", c);
        }
        if let Some(bpm) = result.bpm {
            assert!((60.0..=200.0).contains(&bpm));
        }
        assert!(result.hot_cues.len() <= 8);
        assert!(
            (result.overall_confidence - (result.bpm_confidence + result.key_confidence) / 2.0)
                .abs()
                < 1e-12
        );
    }

    #[test]
    fn test_hot_cues_survive_the_store_exactly() {
        // 45 s with block levels 0.2, 0.7, 0.3, 0.9, 0.25: peaks at 10 s and 30 s
        let levels = [0.2f32, 0.7, 0.3, 0.9, 0.25];
        let mut samples = Vec::new();
        for (block, &level) in levels.iter().enumerate() {
            let len = if block == 4 { 44100 * 5 } else { 44100 * 10 };
            samples.extend((0..len).map(|i| (i as f32 * 0.0391).sin() * level));
        }
        let buffer = AudioBuffer::new(samples, 44100);

        let (engine, store) = engine_with(None);
        let result = engine.analyze_buffer(Path::new("/peaks.wav"), &buffer);
        let times: Vec<f64> = result.hot_cues.iter().map(|c| c.time_s).collect();
        assert_eq!(times, vec![10.0, 30.0]);

        store.save(&result).unwrap();
        let loaded = store.get("/peaks.wav").unwrap().unwrap();
        assert_eq!(loaded.hot_cues, result.hot_cues);
        assert_eq!(loaded, result);
    }

    #[test]
    fn test_empty_buffer_uses_defaults() {
        let (engine, _) = engine_with(None);
        let result = engine.analyze_buffer(Path::new("/empty.wav"), &AudioBuffer::new(vec![], 44100));
        assert_eq!(result.energy_level, 0.0);
        assert_eq!(result.dynamic_range, 0.0);
        assert_eq!(result.peak_db, -96.0);
        assert_eq!(result.bpm, None);
        assert_eq!(result.musical_key, None);
        assert_eq!(result.outro_start_s, 0.0);
    }

    #[test]
    fn test_fresh_row_is_served_from_cache() {
        let (engine, _) = engine_with(Some(tone(2)));
        let path = Path::new("/cached.wav");

        assert!(engine.is_stale(path).unwrap());
        let first = engine.analyze(path).unwrap();
        assert!(!engine.is_stale(path).unwrap());

        let events = engine.subscribe();
        let again = engine.analyze_if_stale(path).unwrap();
        assert_eq!(again, first);
        assert!(matches!(events.try_recv(), Ok(AnalysisEvent::Cached { .. })));
    }

    #[test]
    fn test_outdated_version_is_stale() {
        let (engine, store) = engine_with(Some(tone(2)));
        let path = Path::new("/old.wav");
        let mut result = engine.analyze(path).unwrap();
        result.analysis_version = "1.0.0".into();
        store.save(&result).unwrap();
        assert!(engine.is_stale(path).unwrap());
    }

    #[test]
    fn test_reanalysis_is_idempotent() {
        let (engine, _) = engine_with(Some(tone(4)));
        let path = Path::new("/same.wav");
        let mut first = engine.analyze(path).unwrap();
        let second = engine.analyze(path).unwrap();
        assert!(second.last_analyzed >= first.last_analyzed);
        first.last_analyzed = second.last_analyzed;
        assert_eq!(first, second);
    }
}

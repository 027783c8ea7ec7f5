//! Durable storage for engine configurations, KeyZone events and reversal records.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[cfg(debug_assertions)]
use crate::config::DEBUG_FLAGS;
use crate::config::PERSISTENCE;
use crate::models::{KeyZoneEvent, ReversalCoinsStates, ReversalRecord, ReversalState};

/// Storage used by the engines. Configurations travel as JSON text so the trait
/// stays object safe.
pub trait Store: Send + Sync {
    fn load_config(&self, engine: &str) -> Result<Option<String>>;
    fn save_config(&self, engine: &str, json: &str) -> Result<()>;

    /// Appends one event. Events are keyed by `triggered_at`.
    fn save_keyzone_event(&self, event: &KeyZoneEvent) -> Result<()>;
    /// Events triggered within `[start, end]`, oldest first.
    fn list_keyzone_events(&self, start: i64, end: i64) -> Result<Vec<KeyZoneEvent>>;

    /// Writes the state and the coin snapshots of an episode. Either both land or neither.
    fn save_reversal_record(&self, record: &ReversalRecord) -> Result<()>;
    fn get_reversal_record(&self, id: i64) -> Result<Option<ReversalRecord>>;
}

/// Loads a configuration record, or persists the default when none is stored yet.
pub fn load_or_init_config<T>(store: &dyn Store, engine: &str) -> Result<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    match store.load_config(engine)? {
        Some(json) => serde_json::from_str(&json)
            .context(format!("Failed to parse stored {} configuration", engine)),
        None => {
            let config = T::default();
            save_config(store, engine, &config)?;
            log::info!("No stored {} configuration, persisted defaults", engine);
            Ok(config)
        }
    }
}

pub fn save_config<T: Serialize>(store: &dyn Store, engine: &str, config: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(config)
        .context(format!("Failed to serialize {} configuration", engine))?;
    store.save_config(engine, &json)
}

/// Versioned wrapper around every binary record on disk.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct RecordFile<T> {
    version: u32,
    saved_at_ms: i64,
    data: T,
}

impl<T: Serialize + DeserializeOwned> RecordFile<T> {
    fn new(data: T) -> Self {
        Self {
            version: PERSISTENCE.record_version,
            saved_at_ms: Utc::now().timestamp_millis(),
            data,
        }
    }

    fn load_from_path(path: &Path) -> Result<T> {
        let file = File::open(path).context(format!("Failed to open record: {:?}", path))?;
        let mut reader = BufReader::new(file);
        let record: RecordFile<T> = bincode::deserialize_from(&mut reader)
            .context(format!("Failed to deserialize record: {:?}", path))?;
        if record.version != PERSISTENCE.record_version {
            log::warn!(
                "Record {:?} has version {} (current: {})",
                path,
                record.version,
                PERSISTENCE.record_version
            );
        }
        Ok(record.data)
    }

    fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create directory: {}", parent.display()))?;
        }
        let file = File::create(path).context(format!("Failed to create file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, self)
            .context(format!("Failed to serialize record to: {}", path.display()))?;
        writer
            .flush()
            .context(format!("Failed to flush record to: {}", path.display()))
    }
}

/// File backed [`Store`]: JSON configs plus one bincode file per record.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .context(format!("Failed to create store root: {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn config_path(&self, engine: &str) -> PathBuf {
        self.root
            .join(PERSISTENCE.store.config_dir)
            .join(format!("{}.json", engine))
    }

    fn event_path(&self, triggered_at: i64) -> PathBuf {
        self.root
            .join(PERSISTENCE.store.keyzone_events_dir)
            .join(format!("{}.bin", triggered_at))
    }

    fn reversal_state_path(&self, id: i64) -> PathBuf {
        self.root
            .join(PERSISTENCE.store.reversal_states_dir)
            .join(format!("{}.bin", id))
    }

    fn reversal_coins_path(&self, id: i64) -> PathBuf {
        self.root
            .join(PERSISTENCE.store.reversal_coins_dir)
            .join(format!("{}.bin", id))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    path.with_extension("bin.tmp")
}

impl Store for FileStore {
    fn load_config(&self, engine: &str) -> Result<Option<String>> {
        let path = self.config_path(engine);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .context(format!("Failed to read config: {}", path.display()))?;
        Ok(Some(json))
    }

    fn save_config(&self, engine: &str, json: &str) -> Result<()> {
        let path = self.config_path(engine);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create directory: {}", parent.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).context(format!("Failed to write config: {}", tmp.display()))?;
        fs::rename(&tmp, &path).context(format!("Failed to replace config: {}", path.display()))
    }

    fn save_keyzone_event(&self, event: &KeyZoneEvent) -> Result<()> {
        let path = self.event_path(event.triggered_at);
        RecordFile::new(event.clone()).save_to_path(&path)?;
        #[cfg(debug_assertions)]
        if DEBUG_FLAGS.print_store_events {
            log::info!("Stored KeyZone event {}", path.display());
        }
        Ok(())
    }

    fn list_keyzone_events(&self, start: i64, end: i64) -> Result<Vec<KeyZoneEvent>> {
        let dir = self.root.join(PERSISTENCE.store.keyzone_events_dir);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut stamps: Vec<i64> = Vec::new();
        for entry in fs::read_dir(&dir).context(format!("Failed to list {}", dir.display()))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("bin") {
                continue;
            }
            if let Some(ts) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<i64>().ok())
                && ts >= start
                && ts <= end
            {
                stamps.push(ts);
            }
        }
        stamps.sort_unstable();
        stamps
            .into_iter()
            .map(|ts| RecordFile::<KeyZoneEvent>::load_from_path(&self.event_path(ts)))
            .collect()
    }

    fn save_reversal_record(&self, record: &ReversalRecord) -> Result<()> {
        let id = record.state.id;
        let targets = [self.reversal_state_path(id), self.reversal_coins_path(id)];
        let temps = [temp_path(&targets[0]), temp_path(&targets[1])];

        let staged = RecordFile::new(record.state.clone())
            .save_to_path(&temps[0])
            .and_then(|_| RecordFile::new(record.coins.clone()).save_to_path(&temps[1]));
        if let Err(e) = staged {
            for tmp in &temps {
                let _ = fs::remove_file(tmp);
            }
            return Err(e.context(format!("Failed to stage reversal record {}", id)));
        }

        for (i, (tmp, target)) in temps.iter().zip(&targets).enumerate() {
            if let Err(e) = fs::rename(tmp, target) {
                // Undo whatever already landed so no half record stays behind.
                for done in &targets[..i] {
                    let _ = fs::remove_file(done);
                }
                for tmp in &temps {
                    let _ = fs::remove_file(tmp);
                }
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to commit reversal record {}", id)));
            }
        }

        #[cfg(debug_assertions)]
        if DEBUG_FLAGS.print_store_events {
            log::info!("Stored reversal record {}", id);
        }
        Ok(())
    }

    fn get_reversal_record(&self, id: i64) -> Result<Option<ReversalRecord>> {
        let state_path = self.reversal_state_path(id);
        let coins_path = self.reversal_coins_path(id);
        if !state_path.exists() || !coins_path.exists() {
            return Ok(None);
        }
        let state = RecordFile::<ReversalState>::load_from_path(&state_path)?;
        let coins = RecordFile::<ReversalCoinsStates>::load_from_path(&coins_path)?;
        Ok(Some(ReversalRecord { state, coins }))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::reversal_scoring::test_support::coins;
    use crate::config::LiquidityConfig;
    use crate::domain::StateType;
    use crate::models::{
        KeyZone, KeyZoneKind, KeyZoneReversal, ReversalKind, ReversalScores, ReversalSignal,
    };

    fn event(triggered_at: i64) -> KeyZoneEvent {
        let zone = KeyZone::new(
            KeyZoneReversal {
                id: 7,
                kind: KeyZoneKind::Support,
                volume: 3.0,
            },
            100.0,
            100.5,
        );
        KeyZoneEvent {
            kind: KeyZoneKind::Support,
            zone: zone.minify(12.5, 6.1),
            triggered_at,
            expires_at: triggered_at + 1_000,
            price_limit: 99.5,
        }
    }

    fn record(id: i64) -> ReversalRecord {
        let mut scores = ReversalScores::default();
        scores.push(11.25, 45.0, 20.0, 76.25);
        ReversalRecord {
            state: ReversalState {
                id,
                kind: ReversalKind::Support,
                event: event(id),
                scores,
                signal: Some(ReversalSignal {
                    timestamp: id + 5,
                    symbols: vec!["ETHUSDT".to_string()],
                }),
                ended_at: Some(id + 10),
            },
            coins: ReversalCoinsStates {
                initial: coins(&[
                    ("ETHUSDT", StateType::Stateless, 0.0),
                    ("SOLUSDT", StateType::Decreasing, -0.4),
                ]),
                event: Some(coins(&[
                    ("ETHUSDT", StateType::Increasing, 0.8),
                    ("SOLUSDT", StateType::Stateless, 0.1),
                ])),
                last: Some(coins(&[
                    ("ETHUSDT", StateType::IncreasingStrongly, 2.5),
                    ("SOLUSDT", StateType::Increasing, 0.6),
                ])),
            },
        }
    }

    #[test]
    fn config_defaults_are_persisted_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        assert!(store.load_config("liquidity").unwrap().is_none());

        let config: LiquidityConfig = load_or_init_config(&store, "liquidity").unwrap();
        assert_eq!(config, LiquidityConfig::default());
        assert!(store.load_config("liquidity").unwrap().is_some());

        let mut changed = config.clone();
        changed.max_peak_distance = 2.5;
        save_config(&store, "liquidity", &changed).unwrap();
        let reloaded: LiquidityConfig = load_or_init_config(&store, "liquidity").unwrap();
        assert_eq!(reloaded.max_peak_distance, 2.5);
    }

    #[test]
    fn events_listed_by_range() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        for ts in [3_000, 1_000, 2_000, 9_000] {
            store.save_keyzone_event(&event(ts)).unwrap();
        }
        let listed = store.list_keyzone_events(1_000, 3_000).unwrap();
        let stamps: Vec<i64> = listed.iter().map(|e| e.triggered_at).collect();
        assert_eq!(stamps, vec![1_000, 2_000, 3_000]);
        assert_eq!(listed[0], event(1_000));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn write_errors_surface_on_flush() {
        // Small records sit in the buffer until flushed; /dev/full rejects the flush.
        let record = RecordFile::new(event(1_000));
        assert!(record.save_to_path(Path::new("/dev/full")).is_err());
    }

    #[test]
    fn reversal_record_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let original = record(1_700_000_000_000);
        store.save_reversal_record(&original).unwrap();
        let loaded = store.get_reversal_record(original.state.id).unwrap().unwrap();
        assert_eq!(loaded.coins.initial.by_symbol.len(), 2);
        assert_eq!(loaded.coins.last, original.coins.last);
        assert_eq!(loaded, original);
        assert!(store.get_reversal_record(42).unwrap().is_none());
    }

    #[test]
    fn failed_record_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        // A plain file where the coins directory should be makes the second write fail.
        fs::write(dir.path().join(PERSISTENCE.store.reversal_coins_dir), b"blocked").unwrap();

        let rec = record(55);
        assert!(store.save_reversal_record(&rec).is_err());
        assert!(!store.reversal_state_path(55).exists());
        assert!(!temp_path(&store.reversal_state_path(55)).exists());
        assert!(store.get_reversal_record(55).unwrap().is_none());
    }
}

//! File persistence and serialization configuration

pub struct StoreLayout {
    /// Default root directory of the durable store
    pub default_root: &'static str,
    /// Sub-directory holding one JSON record per engine configuration
    pub config_dir: &'static str,
    /// Sub-directory of append-only KeyZone events
    pub keyzone_events_dir: &'static str,
    /// Sub-directory of closed reversal states
    pub reversal_states_dir: &'static str,
    /// Sub-directory of the coin snapshots attached to each reversal
    pub reversal_coins_dir: &'static str,
}

pub struct PersistenceConfig {
    pub store: StoreLayout,
    /// Current version of the binary record format
    pub record_version: u32,
}

pub const PERSISTENCE: PersistenceConfig = PersistenceConfig {
    store: StoreLayout {
        default_root: "zone_radar_data",
        config_dir: "config",
        keyzone_events_dir: "keyzone_events",
        reversal_states_dir: "reversal_states",
        reversal_coins_dir: "reversal_coins",
    },
    record_version: 1,
};

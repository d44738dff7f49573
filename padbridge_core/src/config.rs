//! In-memory config model (spec.md §3): global options, one `out_cfg` per
//! wired port, one `in_cfg` per source device. File-backed persistence is
//! an explicit Non-goal; [`ConfigStore`] is the trait boundary an external
//! collaborator implements instead. Grounded on
//! `nxzr_core::controller::protocol::shared::Shared`'s `Mutex<State>` +
//! closure-mutation pattern, with a `tokio::sync::watch` replacing its
//! bespoke setters for change notification.
use crate::encode::n64::AccessoryMode;
use crate::error::{ConfigError, ConfigResult};
use crate::mapping::MappingRule;
use std::sync::Mutex;
use tokio::sync::watch;

pub const MAX_WIRED_PORTS: usize = 7;
pub const MAX_SOURCE_SLOTS: usize = 7;
pub const MAX_RULES_PER_SOURCE: usize = 256;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GlobalConfig {
    pub banksel: u8,
    pub multitap: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OutCfg {
    pub device_mode: u8,
    pub accessory_mode: AccessoryMode,
}

impl Default for OutCfg {
    fn default() -> Self {
        Self {
            device_mode: 0,
            accessory_mode: AccessoryMode::MemPak,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct InCfg {
    pub rules: Vec<MappingRule>,
}

impl InCfg {
    pub fn push_rule(&mut self, rule: MappingRule) -> ConfigResult<()> {
        if self.rules.len() >= MAX_RULES_PER_SOURCE {
            return Err(ConfigError::RuleListFull {
                max: MAX_RULES_PER_SOURCE,
            });
        }
        self.rules.push(rule);
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct ConfigState {
    pub global: GlobalConfig,
    pub out_cfg: Vec<OutCfg>,
    pub in_cfg: Vec<InCfg>,
}

impl Default for ConfigState {
    fn default() -> Self {
        Self {
            global: GlobalConfig::default(),
            out_cfg: vec![OutCfg::default(); MAX_WIRED_PORTS],
            in_cfg: (0..MAX_SOURCE_SLOTS).map(|_| InCfg::default()).collect(),
        }
    }
}

/// External persistence collaborator. `padbridge_core` never performs file
/// I/O itself; this trait is the seam a host-side implementation plugs
/// into (spec.md's "configuration file I/O" Non-goal only excludes the
/// parser, not the notion of persistence).
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> ConfigResult<ConfigState>;
    fn save(&self, state: &ConfigState) -> ConfigResult<()>;
}

/// The live, in-memory config, with change notification via a
/// `tokio::sync::watch` channel (one per process, not per-field, unlike
/// the teacher's per-setter approach).
#[derive(Debug)]
pub struct Config {
    state: Mutex<ConfigState>,
    changed_tx: watch::Sender<()>,
    changed_rx: watch::Receiver<()>,
}

impl Config {
    pub fn new() -> Self {
        let (changed_tx, changed_rx) = watch::channel(());
        Self {
            state: Mutex::new(ConfigState::default()),
            changed_tx,
            changed_rx,
        }
    }

    pub fn get(&self) -> ConfigState {
        self.state.lock().unwrap().clone()
    }

    pub fn set(&self, f: impl FnOnce(&mut ConfigState)) {
        {
            let mut state = self.state.lock().unwrap();
            f(&mut state);
        }
        let _ = self.changed_tx.send(());
    }

    pub fn subscribe(&self) -> watch::Receiver<()> {
        self.changed_rx.clone()
    }

    pub fn add_rule(&self, source: usize, rule: MappingRule) -> ConfigResult<()> {
        if source >= MAX_SOURCE_SLOTS {
            return Err(ConfigError::SourceOutOfRange(source));
        }
        let mut result = Ok(());
        self.set(|state| {
            result = state.in_cfg[source].push_rule(rule);
        });
        result
    }

    pub fn out_cfg(&self, port: usize) -> ConfigResult<OutCfg> {
        self.get()
            .out_cfg
            .get(port)
            .copied()
            .ok_or(ConfigError::PortOutOfRange(port))
    }

    /// Loads from `store`; on a magic mismatch, writes defaults back in
    /// place rather than failing (spec.md §7).
    pub fn load_from(&self, store: &dyn ConfigStore) -> ConfigResult<()> {
        match store.load() {
            Ok(loaded) => {
                self.set(|state| *state = loaded);
                Ok(())
            }
            Err(ConfigError::MagicMismatch) => {
                self.set(|state| *state = ConfigState::default());
                store.save(&self.get())?;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MapAlgo;

    fn dummy_rule() -> MappingRule {
        MappingRule {
            src_index: 0,
            dst_index: 0,
            dst_id: 0,
            turbo: None,
            algo: MapAlgo::Direct,
            perc_max: 100,
            perc_threshold: 0,
            perc_deadzone: 0,
        }
    }

    #[test]
    fn add_rule_rejects_out_of_range_source() {
        let config = Config::new();
        let err = config.add_rule(MAX_SOURCE_SLOTS, dummy_rule()).unwrap_err();
        assert_eq!(err, ConfigError::SourceOutOfRange(MAX_SOURCE_SLOTS));
    }

    #[test]
    fn rule_list_full_is_rejected() {
        let config = Config::new();
        for _ in 0..MAX_RULES_PER_SOURCE {
            config.add_rule(0, dummy_rule()).unwrap();
        }
        let err = config.add_rule(0, dummy_rule()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::RuleListFull {
                max: MAX_RULES_PER_SOURCE
            }
        );
    }

    #[test]
    fn set_notifies_subscribers() {
        let config = Config::new();
        let mut rx = config.subscribe();
        config.set(|state| state.global.banksel = 2);
        assert!(rx.has_changed().unwrap());
        assert_eq!(config.get().global.banksel, 2);
    }
}

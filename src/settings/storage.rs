//! # Settings Storage
//!
//! The storage collaborator the transmitter loads its settings from, and a
//! TOML-file implementation of it.
//!
//! ## File Layout
//!
//! ```toml
//! [globals]
//! throttle_security = 100
//! battery_threshold = 350
//! explicit_dataset = 1
//! switch_dataset = 2
//!
//! [[datasets]]
//! index = 1
//! model = { throttle_channel = 3 }
//! channels = [
//!     { control_type = "analog", control_number = 1 },
//!     { control_type = "analog", control_number = 2, expo = 25 },
//!     { control_type = "analog", control_number = 3 },
//!     { control_type = "mixer", control_number = 1, reverse = true },
//!     { control_type = "digital", control_number = 1 },
//!     {},
//! ]
//! ```
//!
//! Every listed dataset must provide all channel entries; mixers default to
//! unused.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

use super::{
    ChannelVariables, Dataset, GlobalVariables, MixerVariables, ModelVariables, CHANNELS,
    NDATASETS, NMIXERS,
};
use crate::error::{Result, TxError};

/// Storage collaborator holding the persistent settings.
///
/// Implementations must be synchronous and idempotent: loading the same
/// dataset twice yields the same values as long as the medium is unchanged.
pub trait SettingsStorage: Send {
    /// Integrity check of the whole medium.
    fn check_valid(&mut self) -> bool;

    /// Load the global variables.
    fn load_globals(&mut self) -> Result<GlobalVariables>;

    /// Load the dataset stored at `index`.
    fn load_dataset(&mut self, index: u8) -> Result<Dataset>;
}

/// One `[[datasets]]` entry of the settings file.
#[derive(Debug, Clone, Deserialize)]
struct StoredDataset {
    index: u8,
    #[serde(default)]
    model: ModelVariables,
    #[serde(default)]
    mixers: [MixerVariables; NMIXERS],
    channels: [ChannelVariables; CHANNELS],
}

impl From<StoredDataset> for Dataset {
    fn from(stored: StoredDataset) -> Self {
        Self {
            model: stored.model,
            mixers: stored.mixers,
            channels: stored.channels,
        }
    }
}

/// Whole settings file.
#[derive(Debug, Clone, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    globals: GlobalVariables,
    #[serde(default)]
    datasets: Vec<StoredDataset>,
}

impl SettingsFile {
    fn validate(&self) -> Result<()> {
        self.globals.validate()?;

        let mut seen = [false; NDATASETS as usize];
        for stored in &self.datasets {
            if stored.index >= NDATASETS {
                return Err(TxError::InvalidSettings(format!(
                    "dataset index {} must be below {}",
                    stored.index, NDATASETS
                )));
            }
            if seen[stored.index as usize] {
                return Err(TxError::InvalidSettings(format!(
                    "dataset {} is defined more than once",
                    stored.index
                )));
            }
            seen[stored.index as usize] = true;

            Dataset::from(stored.clone()).validate().map_err(|e| {
                TxError::InvalidSettings(format!("dataset {}: {}", stored.index, e))
            })?;
        }

        Ok(())
    }
}

/// Settings stored in a TOML file.
///
/// The file is re-read on every load so that edits committed while the
/// transmitter runs are picked up by the next reload.
#[derive(Debug, Clone)]
pub struct TomlStorage {
    path: PathBuf,
}

impl TomlStorage {
    /// Creates a storage backed by the file at `path`.
    ///
    /// The file is not touched until the first check or load.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<SettingsFile> {
        let contents = fs::read_to_string(&self.path)?;
        let file: SettingsFile = toml::from_str(&contents)?;
        Ok(file)
    }
}

impl SettingsStorage for TomlStorage {
    fn check_valid(&mut self) -> bool {
        match self.read().and_then(|file| file.validate()) {
            Ok(()) => true,
            Err(e) => {
                error!("Settings file {} failed integrity check: {}", self.path.display(), e);
                false
            }
        }
    }

    fn load_globals(&mut self) -> Result<GlobalVariables> {
        let file = self.read()?;
        debug!("Loaded global variables from {}", self.path.display());
        Ok(file.globals)
    }

    fn load_dataset(&mut self, index: u8) -> Result<Dataset> {
        let file = self.read()?;
        let stored = file
            .datasets
            .into_iter()
            .find(|d| d.index == index)
            .ok_or_else(|| {
                TxError::Storage(format!(
                    "dataset {} not found in {}",
                    index,
                    self.path.display()
                ))
            })?;
        debug!("Loaded dataset {} from {}", index, self.path.display());
        Ok(stored.into())
    }
}

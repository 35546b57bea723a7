use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use api::{GPSBounds, TravelMode};
use model::write_atomically;

use crate::map::BaseLayer;

/// View settings that survive a restart. Read at startup, written on quit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Savestate {
    pub base: BaseLayer,
    pub mode: TravelMode,
    pub viewport: GPSBounds,
    /// None until categories were loaded once
    #[serde(default)]
    pub selected_categories: Option<Vec<String>>,
}

impl Savestate {
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join("savestate.json")
    }

    /// A missing or unreadable file just means defaults.
    pub fn load(data_dir: &Path) -> Option<Self> {
        let path = Self::path(data_dir);
        if !path.exists() {
            return None;
        }
        match fs_err::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|raw| Ok(serde_json::from_str::<Savestate>(&raw)?))
        {
            Ok(ss) => Some(ss),
            Err(err) => {
                warn!("Ignoring {}: {err:#}", path.display());
                None
            }
        }
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        write_atomically(&Self::path(data_dir), &serde_json::to_string_pretty(self)?)
    }
}

use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::Path,
};

use crate::{error::NetforgeError, resolve::DefaultsTable};

/// Engine configuration, consumed at construction and TOML round-trippable.
///
/// Changing the configuration of a live engine requires a full rebuild
/// afterwards, since qualification and relevance both depend on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// Lines whose classification hierarchy exceeds this are excluded.
    pub hierarchy_cutoff: i32,
    /// Keep every intermediate point of a qualifying line as a node, instead
    /// of only endpoints, junctions and stop positions.
    pub keep_paths: bool,
    /// Derive stop areas, routes and transit lines from tagged groups.
    pub transit_support: bool,
    /// Leave route link sequences empty; a downstream collaborator
    /// synthesizes connectivity instead.
    pub pseudo_network: bool,
    pub defaults: DefaultsTable,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        ForgeConfig {
            hierarchy_cutoff: 6,
            keep_paths: false,
            transit_support: true,
            pseudo_network: false,
            defaults: DefaultsTable::builtin(),
        }
    }
}

impl ForgeConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NetforgeError> {
        tracing::debug!("Reading engine config from: {:?}", path.as_ref());
        let content = read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), NetforgeError> {
        tracing::debug!("Writing engine config to: {:?}", path.as_ref());
        let toml_string = toml::to_string(self)?;
        write(path, toml_string)?;
        Ok(())
    }
}

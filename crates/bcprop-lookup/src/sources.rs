use std::collections::HashSet;
use std::path::Path;

use bcprop_arcgis::SpatialQueryConfig;
use bcprop_core::{ConfigError, SpatialReference};
use serde::{Deserialize, Serialize};

const BUILTIN_SOURCES: &str = include_str!("../config/zoning_sources.yaml");

/// Attribute aliases that usually hold a zoning code.
pub const DEFAULT_CODE_FIELDS: &[&str] = &[
    "ZONE",
    "ZONING",
    "ZONECODE",
    "ZoneCode",
    "ZONING_CODE",
    "ZONINGCODE",
    "ZONING_",
];

/// Attribute aliases that usually hold a zoning description.
pub const DEFAULT_NAME_FIELDS: &[&str] = &[
    "ZONE_DESC",
    "ZONE_NAME",
    "ZONEDESC",
    "ZoningName",
    "CD_ZONE",
    "DESCRIPTION",
    "ZONE_DESCRIPTION",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoningEndpoint {
    pub service_url: String,
    pub layer_id: u32,
    #[serde(default)]
    pub out_fields: Vec<String>,
    #[serde(default)]
    pub return_geometry: bool,
}

impl ZoningEndpoint {
    #[must_use]
    pub fn query_config(&self) -> SpatialQueryConfig {
        SpatialQueryConfig::new(self.service_url.clone(), self.layer_id)
            .with_out_fields(self.out_fields.iter().cloned())
            .with_geometry(self.return_geometry)
    }
}

/// One municipality's zoning configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoningSource {
    pub name: String,
    /// EPSG code tried before WGS84, e.g. `"26910"`.
    #[serde(default)]
    pub preferred_sr: Option<String>,
    pub endpoints: Vec<ZoningEndpoint>,
    #[serde(default)]
    pub code_fields: Vec<String>,
    #[serde(default)]
    pub name_fields: Vec<String>,
}

impl ZoningSource {
    #[must_use]
    pub fn preferred_reference(&self) -> Option<SpatialReference> {
        self.preferred_sr
            .as_deref()
            .and_then(SpatialReference::from_epsg)
    }

    #[must_use]
    pub fn code_aliases(&self) -> Vec<&str> {
        aliases_or_default(&self.code_fields, DEFAULT_CODE_FIELDS)
    }

    #[must_use]
    pub fn name_aliases(&self) -> Vec<&str> {
        aliases_or_default(&self.name_fields, DEFAULT_NAME_FIELDS)
    }
}

fn aliases_or_default<'a>(configured: &'a [String], default: &[&'static str]) -> Vec<&'a str> {
    if configured.is_empty() {
        default.to_vec()
    } else {
        configured.iter().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ZoningSourcesFile {
    sources: Vec<ZoningSource>,
}

/// The closed set of municipalities with a zoning configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoningSourceTable {
    sources: Vec<ZoningSource>,
}

impl ZoningSourceTable {
    /// The table shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the embedded YAML fails to parse or validate.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_yaml_str(BUILTIN_SOURCES)
    }

    /// Load and validate a table from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate a table from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the text fails to parse or validate.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ZoningSourcesFile = serde_yaml::from_str(content)?;
        Self::new(file.sources)
    }

    /// Build a table from already-constructed entries.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the entries are inconsistent.
    pub fn new(sources: Vec<ZoningSource>) -> Result<Self, ConfigError> {
        validate_sources(&sources)?;
        Ok(Self { sources })
    }

    #[must_use]
    pub fn sources(&self) -> &[ZoningSource] {
        &self.sources
    }

    /// Pick the configuration for a municipality name.
    ///
    /// Case-insensitive exact match first, then the longest configured
    /// name contained in `municipality`.
    #[must_use]
    pub fn select(&self, municipality: &str) -> Option<&ZoningSource> {
        let wanted = municipality.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        if let Some(exact) = self
            .sources
            .iter()
            .find(|s| s.name.to_lowercase() == wanted)
        {
            return Some(exact);
        }
        self.sources
            .iter()
            .filter(|s| wanted.contains(&s.name.to_lowercase()))
            .max_by_key(|s| s.name.len())
    }
}

fn validate_sources(sources: &[ZoningSource]) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();

    for source in sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "zoning source name must be non-empty".to_string(),
            ));
        }

        if !seen_names.insert(source.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate zoning source: '{}'",
                source.name
            )));
        }

        if source.endpoints.is_empty() {
            return Err(ConfigError::Validation(format!(
                "zoning source '{}' has no endpoints",
                source.name
            )));
        }

        for endpoint in &source.endpoints {
            let url = endpoint.service_url.as_str();
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::Validation(format!(
                    "zoning source '{}' has non-http service URL '{url}'",
                    source.name
                )));
            }
        }

        if let Some(code) = &source.preferred_sr {
            if SpatialReference::from_epsg(code).is_none() {
                return Err(ConfigError::Validation(format!(
                    "zoning source '{}' has unsupported preferred_sr '{code}'",
                    source.name
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "sources_test.rs"]
mod tests;

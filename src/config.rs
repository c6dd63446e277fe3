use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ReportError;

pub const DEFAULT_CONFIG_FILE: &str = "obis-charts.json";
pub const DEFAULT_TAXONOMY_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";
pub const DEFAULT_GITHUB_URL: &str = "https://api.github.com";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub openbis_url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub space_blacklist: Vec<String>,
    #[serde(default)]
    pub taxonomy_url: Option<String>,
    #[serde(default)]
    pub organism: OrganismSettings,
    #[serde(default)]
    pub sample_types: SampleTypeSettings,
    #[serde(default = "default_technologies")]
    pub technologies: BTreeMap<String, String>,
    #[serde(default)]
    pub pipelines: Option<PipelineSettings>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openbis_url: None,
            username: None,
            password: None,
            output: None,
            space_blacklist: Vec::new(),
            taxonomy_url: None,
            organism: OrganismSettings::default(),
            sample_types: SampleTypeSettings::default(),
            technologies: default_technologies(),
            pipelines: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrganismSettings {
    #[serde(default = "default_bio_entity_type")]
    pub sample_type: String,
    #[serde(default = "default_organism_property")]
    pub property: String,
    #[serde(default = "default_organism_vocabulary")]
    pub vocabulary: Option<String>,
}

impl Default for OrganismSettings {
    fn default() -> Self {
        Self {
            sample_type: default_bio_entity_type(),
            property: default_organism_property(),
            vocabulary: default_organism_vocabulary(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SampleTypeSettings {
    #[serde(default = "default_test_sample_type")]
    pub sample_type: String,
    #[serde(default = "default_sample_kind_property")]
    pub property: String,
}

impl Default for SampleTypeSettings {
    fn default() -> Self {
        Self {
            sample_type: default_test_sample_type(),
            property: default_sample_kind_property(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PipelineSettings {
    pub organization: String,
    #[serde(default = "default_pipeline_topics")]
    pub topics: Vec<String>,
    #[serde(default)]
    pub api_url: Option<String>,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub openbis_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub output: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub credentials: Credentials,
    pub output: Utf8PathBuf,
    pub space_blacklist: BTreeSet<String>,
    pub taxonomy_url: String,
    pub organism: OrganismSettings,
    pub sample_types: SampleTypeSettings,
    pub technologies: BTreeMap<String, String>,
    pub pipelines: Option<PipelineSettings>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or the default config file when none is given, then applies `overrides`.
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, ReportError> {
        let config = match path {
            Some(path) => Self::read(PathBuf::from(path))?,
            None => match Self::default_location() {
                Some(location) => Self::read(location)?,
                // all settings may still come from flags
                None if overrides.is_complete() => Config::default(),
                None => return Err(ReportError::MissingConfig),
            },
        };
        Self::resolve_config(config, overrides)
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, ReportError> {
        let url = required("openbis_url", overrides.openbis_url.or(config.openbis_url))?;
        let username = required("username", overrides.username.or(config.username))?;
        let password = required("password", overrides.password.or(config.password))?;
        let output = required("output", overrides.output.or(config.output))?;

        if let Some(pipelines) = &config.pipelines {
            if pipelines.organization.trim().is_empty() {
                return Err(ReportError::InvalidConfig(
                    "pipelines.organization must not be empty".to_string(),
                ));
            }
        }

        Ok(ResolvedConfig {
            credentials: Credentials {
                url: url.trim_end_matches('/').to_string(),
                username,
                password,
            },
            output: Utf8PathBuf::from(output),
            space_blacklist: config
                .space_blacklist
                .into_iter()
                .map(|space| space.trim().to_string())
                .collect(),
            taxonomy_url: config
                .taxonomy_url
                .unwrap_or_else(|| DEFAULT_TAXONOMY_URL.to_string()),
            organism: config.organism,
            sample_types: config.sample_types,
            technologies: config.technologies,
            pipelines: config.pipelines,
        })
    }

    fn read(path: PathBuf) -> Result<Config, ReportError> {
        let content = fs::read_to_string(&path).map_err(|_| ReportError::ConfigRead(path))?;
        serde_json::from_str(&content).map_err(|err| ReportError::ConfigParse(err.to_string()))
    }

    fn default_location() -> Option<PathBuf> {
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        ProjectDirs::from("", "", "obis-charts")
            .map(|dirs| dirs.config_dir().join(DEFAULT_CONFIG_FILE))
            .filter(|path| path.exists())
    }
}

impl ConfigOverrides {
    fn is_complete(&self) -> bool {
        self.openbis_url.is_some()
            && self.username.is_some()
            && self.password.is_some()
            && self.output.is_some()
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, ReportError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ReportError::InvalidConfig(format!("{field} is required"))),
    }
}

fn default_bio_entity_type() -> String {
    "Q_BIOLOGICAL_ENTITY".to_string()
}

fn default_organism_property() -> String {
    "Q_NCBI_ORGANISM".to_string()
}

fn default_organism_vocabulary() -> Option<String> {
    Some("Q_NCBI_TAXONOMY".to_string())
}

fn default_test_sample_type() -> String {
    "Q_TEST_SAMPLE".to_string()
}

fn default_sample_kind_property() -> String {
    "Q_SAMPLE_TYPE".to_string()
}

pub fn default_technologies() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("Q_NGS_SINGLE_SAMPLE_RUN".to_string(), "NGS".to_string()),
        ("Q_MS_RUN".to_string(), "Mass Spectrometry".to_string()),
        ("Q_MICROARRAY_RUN".to_string(), "Microarray".to_string()),
        ("Q_MHC_LIGAND_EXTRACT".to_string(), "Ligandomics".to_string()),
    ])
}

pub fn default_pipeline_topics() -> Vec<String> {
    vec![
        "nextflow".to_string(),
        "snakemake".to_string(),
        "cwl".to_string(),
    ]
}

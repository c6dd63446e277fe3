#![allow(dead_code)]

pub mod http;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::sync::Mutex;

use openbis_chart_stats::config::{Config, ConfigLoader, ConfigOverrides, ResolvedConfig};
use openbis_chart_stats::domain::{OrganismId, Sample, VocabularyTerm};
use openbis_chart_stats::error::ReportError;
use openbis_chart_stats::github::{PipelineCatalog, Repository};
use openbis_chart_stats::openbis::{DataSource, SampleQuery};
use openbis_chart_stats::taxonomy::TaxonomyClient;

pub const TOKEN: &str = "user-260101120000000x0123456789ABCDEF";

pub fn sample(code: &str, space: &str, organism: Option<&str>) -> Sample {
    let mut properties = BTreeMap::new();
    if let Some(organism) = organism {
        properties.insert("Q_NCBI_ORGANISM".to_string(), organism.to_string());
    }
    Sample {
        code: code.to_string(),
        space: space.to_string(),
        project: Some(code.chars().take(5).collect()),
        type_code: "Q_BIOLOGICAL_ENTITY".to_string(),
        properties,
    }
}

pub fn term(code: &str, label: &str) -> VocabularyTerm {
    VocabularyTerm {
        code: code.to_string(),
        label: label.to_string(),
    }
}

pub fn config_with(json: &str) -> ResolvedConfig {
    let config: Config = serde_json::from_str(json).unwrap();
    ConfigLoader::resolve_config(config, ConfigOverrides::default()).unwrap()
}

pub fn config(output: &str, blacklist: &[&str]) -> ResolvedConfig {
    let config = Config {
        openbis_url: Some("https://openbis.example.org/openbis/openbis".to_string()),
        username: Some("reporter".to_string()),
        password: Some("secret".to_string()),
        output: Some(output.to_string()),
        space_blacklist: blacklist.iter().map(|s| s.to_string()).collect(),
        ..Config::default()
    };
    ConfigLoader::resolve_config(config, ConfigOverrides::default()).unwrap()
}

#[derive(Default)]
pub struct MockOpenBis {
    pub samples: HashMap<String, Vec<Sample>>,
    pub terms: Vec<VocabularyTerm>,
    pub failing_types: Vec<String>,
    pub fail_vocabulary: bool,
    pub reject_login: bool,
    pub calls: Mutex<Vec<String>>,
}

impl MockOpenBis {
    pub fn with_samples(type_code: &str, samples: Vec<Sample>) -> Self {
        let mut mock = Self::default();
        mock.samples.insert(type_code.to_string(), samples);
        mock
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn logout_count(&self) -> usize {
        self.calls().iter().filter(|c| c.as_str() == "logout").count()
    }
}

impl DataSource for MockOpenBis {
    fn login(&self, username: &str, _password: &str) -> Result<String, ReportError> {
        self.calls.lock().unwrap().push("login".to_string());
        if self.reject_login {
            return Err(ReportError::OpenBisAuth(username.to_string()));
        }
        Ok(TOKEN.to_string())
    }

    fn search_samples(
        &self,
        token: &str,
        query: &SampleQuery,
    ) -> Result<Vec<Sample>, ReportError> {
        assert_eq!(token, TOKEN);
        self.calls
            .lock()
            .unwrap()
            .push(format!("searchSamples:{}", query.type_code));
        if self.failing_types.contains(&query.type_code) {
            return Err(ReportError::OpenBisRpc {
                method: "searchSamples".to_string(),
                message: "boom".to_string(),
            });
        }
        Ok(self
            .samples
            .get(&query.type_code)
            .cloned()
            .unwrap_or_default())
    }

    fn search_vocabulary_terms(
        &self,
        token: &str,
        _vocabulary: Option<&str>,
    ) -> Result<Vec<VocabularyTerm>, ReportError> {
        assert_eq!(token, TOKEN);
        self.calls
            .lock()
            .unwrap()
            .push("searchVocabularyTerms".to_string());
        if self.fail_vocabulary {
            return Err(ReportError::OpenBisHttp("connection reset".to_string()));
        }
        Ok(self.terms.clone())
    }

    fn logout(&self, token: &str) -> Result<(), ReportError> {
        assert_eq!(token, TOKEN);
        self.calls.lock().unwrap().push("logout".to_string());
        Ok(())
    }
}

/// Serves taxonomy documents from `tests/fixtures`; unknown ids fail like a dropped connection.
#[derive(Default)]
pub struct FixtureTaxonomy {
    pub documents: HashMap<String, String>,
    pub lookups: Mutex<Vec<String>>,
}

impl FixtureTaxonomy {
    pub fn with(entries: &[(&str, &str)]) -> Self {
        let documents = entries
            .iter()
            .map(|(id, fixture)| (id.to_string(), fixture_text(fixture)))
            .collect();
        Self {
            documents,
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

impl TaxonomyClient for FixtureTaxonomy {
    fn fetch_taxon(&self, id: &OrganismId) -> Result<String, ReportError> {
        self.lookups.lock().unwrap().push(id.to_string());
        self.documents
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| ReportError::TaxonomyHttp(format!("no route to host for {id}")))
    }
}

#[derive(Default)]
pub struct MockCatalog {
    pub repositories: Vec<Repository>,
}

impl PipelineCatalog for MockCatalog {
    fn list_repositories(&self, _organization: &str) -> Result<Vec<Repository>, ReportError> {
        Ok(self.repositories.clone())
    }
}

pub fn fixture_text(name: &str) -> String {
    fs::read_to_string(format!("tests/fixtures/{name}")).unwrap()
}

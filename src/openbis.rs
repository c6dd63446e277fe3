//! openBIS V3 application server access over JSON-RPC.
//!
//! Only the handful of calls the report needs are modelled. Search results
//! use Jackson object identity: the first occurrence of a DTO carries an
//! `@id`, later occurrences are the bare integer. Those back-references are
//! resolved while the samples are read out of the response.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::Credentials;
use crate::domain::{Sample, VocabularyTerm};
use crate::error::ReportError;

const SERVICE_PATH: &str = "/rmi-application-server-v3.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleQuery {
    pub type_code: String,
}

impl SampleQuery {
    pub fn of_type(type_code: impl Into<String>) -> Self {
        Self {
            type_code: type_code.into(),
        }
    }
}

pub trait DataSource: Send + Sync {
    fn login(&self, username: &str, password: &str) -> Result<String, ReportError>;
    /// Samples of the queried type with type, space, project and properties loaded.
    fn search_samples(&self, token: &str, query: &SampleQuery)
    -> Result<Vec<Sample>, ReportError>;
    /// Terms of `vocabulary`, or of every vocabulary when `None`.
    fn search_vocabulary_terms(
        &self,
        token: &str,
        vocabulary: Option<&str>,
    ) -> Result<Vec<VocabularyTerm>, ReportError>;
    fn logout(&self, token: &str) -> Result<(), ReportError>;
}

impl<T: DataSource + ?Sized> DataSource for &T {
    fn login(&self, username: &str, password: &str) -> Result<String, ReportError> {
        (**self).login(username, password)
    }

    fn search_samples(
        &self,
        token: &str,
        query: &SampleQuery,
    ) -> Result<Vec<Sample>, ReportError> {
        (**self).search_samples(token, query)
    }

    fn search_vocabulary_terms(
        &self,
        token: &str,
        vocabulary: Option<&str>,
    ) -> Result<Vec<VocabularyTerm>, ReportError> {
        (**self).search_vocabulary_terms(token, vocabulary)
    }

    fn logout(&self, token: &str) -> Result<(), ReportError> {
        (**self).logout(token)
    }
}

/// Authenticated openBIS session. Logs out exactly once, on `close` or on drop.
pub struct Session<'a> {
    source: &'a dyn DataSource,
    token: Option<String>,
}

impl<'a> Session<'a> {
    pub fn open(
        source: &'a dyn DataSource,
        credentials: &Credentials,
    ) -> Result<Self, ReportError> {
        let token = source.login(&credentials.username, &credentials.password)?;
        Ok(Self {
            source,
            token: Some(token),
        })
    }

    pub fn token(&self) -> &str {
        self.token.as_deref().unwrap_or_default()
    }

    pub fn source(&self) -> &'a dyn DataSource {
        self.source
    }

    pub fn close(mut self) -> Result<(), ReportError> {
        match self.token.take() {
            Some(token) => self.source.logout(&token),
            None => Ok(()),
        }
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            if let Err(err) = self.source.logout(&token) {
                warn!("openBIS logout failed: {err}");
            }
        }
    }
}

pub struct OpenBisHttpClient {
    client: Client,
    endpoint: String,
    request_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    message: Option<String>,
}

impl OpenBisHttpClient {
    pub fn new(base_url: &str) -> Result<Self, ReportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("obis-charts/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ReportError::OpenBisHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| ReportError::OpenBisHttp(err.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}{SERVICE_PATH}", base_url.trim_end_matches('/')),
            request_id: AtomicU64::new(1),
        })
    }

    fn call(&self, method: &str, params: Value) -> Result<Value, ReportError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "id": id.to_string(),
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        debug!("openBIS call {method} -> {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|err| ReportError::OpenBisHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "openBIS request failed".to_string());
            return Err(ReportError::OpenBisStatus { status, message });
        }

        let rpc: RpcResponse = response
            .json()
            .map_err(|err| ReportError::OpenBisResponse(err.to_string()))?;
        if let Some(error) = rpc.error {
            return Err(ReportError::OpenBisRpc {
                method: method.to_string(),
                message: error.message.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(rpc.result.unwrap_or(Value::Null))
    }
}

impl DataSource for OpenBisHttpClient {
    fn login(&self, username: &str, password: &str) -> Result<String, ReportError> {
        let result = self.call("login", json!([username, password]))?;
        result
            .as_str()
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ReportError::OpenBisAuth(username.to_string()))
    }

    fn search_samples(
        &self,
        token: &str,
        query: &SampleQuery,
    ) -> Result<Vec<Sample>, ReportError> {
        let result = self.call(
            "searchSamples",
            json!([token, sample_criteria(query), sample_fetch_options()]),
        )?;
        parse_samples(&result)
    }

    fn search_vocabulary_terms(
        &self,
        token: &str,
        vocabulary: Option<&str>,
    ) -> Result<Vec<VocabularyTerm>, ReportError> {
        let result = self.call(
            "searchVocabularyTerms",
            json!([
                token,
                vocabulary_term_criteria(vocabulary),
                vocabulary_term_fetch_options()
            ]),
        )?;
        parse_vocabulary_terms(&result)
    }

    fn logout(&self, token: &str) -> Result<(), ReportError> {
        self.call("logout", json!([token]))?;
        Ok(())
    }
}

fn code_equals(code: &str) -> Value {
    json!({
        "@type": "as.dto.common.search.CodeSearchCriteria",
        "fieldValue": {
            "@type": "as.dto.common.search.StringEqualToValue",
            "value": code,
        },
    })
}

fn sample_criteria(query: &SampleQuery) -> Value {
    json!({
        "@type": "as.dto.sample.search.SampleSearchCriteria",
        "operator": "AND",
        "criteria": [{
            "@type": "as.dto.sample.search.SampleTypeSearchCriteria",
            "operator": "AND",
            "criteria": [code_equals(&query.type_code)],
        }],
    })
}

fn sample_fetch_options() -> Value {
    json!({
        "@type": "as.dto.sample.fetchoptions.SampleFetchOptions",
        "type": {"@type": "as.dto.sample.fetchoptions.SampleTypeFetchOptions"},
        "space": {"@type": "as.dto.space.fetchoptions.SpaceFetchOptions"},
        "project": {"@type": "as.dto.project.fetchoptions.ProjectFetchOptions"},
        "properties": {"@type": "as.dto.property.fetchoptions.PropertyFetchOptions"},
    })
}

fn vocabulary_term_criteria(vocabulary: Option<&str>) -> Value {
    let criteria = match vocabulary {
        Some(code) => vec![json!({
            "@type": "as.dto.vocabulary.search.VocabularySearchCriteria",
            "operator": "AND",
            "criteria": [code_equals(code)],
        })],
        None => Vec::new(),
    };
    json!({
        "@type": "as.dto.vocabulary.search.VocabularyTermSearchCriteria",
        "operator": "AND",
        "criteria": criteria,
    })
}

fn vocabulary_term_fetch_options() -> Value {
    json!({
        "@type": "as.dto.vocabulary.fetchoptions.VocabularyTermFetchOptions",
    })
}

type References<'v> = HashMap<u64, &'v Value>;

fn collect_references<'v>(value: &'v Value, refs: &mut References<'v>) {
    match value {
        Value::Object(map) => {
            if let Some(id) = map.get("@id").and_then(Value::as_u64) {
                refs.entry(id).or_insert(value);
            }
            for child in map.values() {
                collect_references(child, refs);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, refs);
            }
        }
        _ => {}
    }
}

fn resolve<'v>(value: &'v Value, refs: &References<'v>) -> &'v Value {
    match value.as_u64().and_then(|id| refs.get(&id)) {
        Some(target) => target,
        None => value,
    }
}

fn related_code<'v>(object: &'v Value, field: &str, refs: &References<'v>) -> Option<&'v str> {
    let related = object.get(field)?;
    resolve(related, refs).get("code").and_then(Value::as_str)
}

fn search_objects(result: &Value) -> Result<&Vec<Value>, ReportError> {
    result
        .get("objects")
        .and_then(Value::as_array)
        .ok_or_else(|| ReportError::OpenBisResponse("search result without objects".to_string()))
}

pub fn parse_samples(result: &Value) -> Result<Vec<Sample>, ReportError> {
    let mut refs = References::new();
    collect_references(result, &mut refs);

    search_objects(result)?
        .iter()
        .map(|object| sample_from_value(resolve(object, &refs), &refs))
        .collect()
}

fn sample_from_value<'v>(object: &'v Value, refs: &References<'v>) -> Result<Sample, ReportError> {
    let code = object
        .get("code")
        .and_then(Value::as_str)
        .ok_or_else(|| ReportError::OpenBisResponse("sample without code".to_string()))?;

    let properties = object
        .get("properties")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(key, value)| {
                    let value = match value {
                        Value::String(text) => text.clone(),
                        Value::Null => return None,
                        other => other.to_string(),
                    };
                    Some((key.clone(), value))
                })
                .collect::<BTreeMap<_, _>>()
        })
        .unwrap_or_default();

    Ok(Sample {
        code: code.to_string(),
        // shared samples have no space
        space: related_code(object, "space", refs)
            .unwrap_or_default()
            .to_string(),
        project: related_code(object, "project", refs).map(str::to_string),
        type_code: related_code(object, "type", refs)
            .unwrap_or_default()
            .to_string(),
        properties,
    })
}

pub fn parse_vocabulary_terms(result: &Value) -> Result<Vec<VocabularyTerm>, ReportError> {
    let mut refs = References::new();
    collect_references(result, &mut refs);

    search_objects(result)?
        .iter()
        .map(|object| {
            let object = resolve(object, &refs);
            let code = object
                .get("code")
                .and_then(Value::as_str)
                .ok_or_else(|| ReportError::OpenBisResponse("term without code".to_string()))?;
            let label = object
                .get("label")
                .and_then(Value::as_str)
                .filter(|label| !label.trim().is_empty())
                .unwrap_or(code);
            Ok(VocabularyTerm {
                code: code.to_string(),
                label: label.to_string(),
            })
        })
        .collect()
}

//! NCBI taxonomy lookups.
//!
//! `efetch` returns one `<Taxon>` with its full `<LineageEx>`. Every leaf
//! element sits on its own line there, and a rank is attributed to the
//! `<ScientificName>` leaf directly before the `<Rank>` leaf. The parser
//! below walks the document as a stream of leaves and applies that rule, so
//! a taxon whose `Rank` follows some other element (the top-level taxon has
//! `ParentTaxId` in between) never contributes a name.

use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::domain::{Classification, Domain, OrganismId};
use crate::error::ReportError;

const UNCLASSIFIED_LINEAGE: &str = "unclassified sequences";

pub trait TaxonomyClient: Send + Sync {
    /// Raw taxonomy XML for one organism id.
    fn fetch_taxon(&self, id: &OrganismId) -> Result<String, ReportError>;

    fn classify(&self, id: &OrganismId) -> Result<Classification, ReportError> {
        let document = self.fetch_taxon(id)?;
        parse_classification(&document)
    }
}

impl<T: TaxonomyClient + ?Sized> TaxonomyClient for &T {
    fn fetch_taxon(&self, id: &OrganismId) -> Result<String, ReportError> {
        (**self).fetch_taxon(id)
    }

    fn classify(&self, id: &OrganismId) -> Result<Classification, ReportError> {
        (**self).classify(id)
    }
}

#[derive(Clone)]
pub struct NcbiTaxonomyHttpClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl NcbiTaxonomyHttpClient {
    pub fn new(base_url: &str) -> Result<Self, ReportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("obis-charts/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ReportError::TaxonomyHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| ReportError::TaxonomyHttp(err.to_string()))?;

        let api_key = std::env::var("NCBI_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key,
        })
    }

    /// Replaces the key taken from `NCBI_API_KEY`.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        self
    }
}

impl TaxonomyClient for NcbiTaxonomyHttpClient {
    fn fetch_taxon(&self, id: &OrganismId) -> Result<String, ReportError> {
        debug!("taxonomy lookup for {id}");
        let mut request = self.client.get(&self.base_url).query(&[
            ("db", "taxonomy"),
            ("id", id.as_str()),
            ("retmode", "xml"),
        ]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key.as_str())]);
        }
        let response = request
            .send()
            .map_err(|err| ReportError::TaxonomyHttp(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "taxonomy request failed".to_string());
            return Err(ReportError::TaxonomyStatus { status, message });
        }
        response
            .text()
            .map_err(|err| ReportError::TaxonomyHttp(err.to_string()))
    }
}

struct Frame {
    name: String,
    text: String,
    has_children: bool,
}

#[derive(Default)]
struct Scan {
    superkingdom: Option<String>,
    fallback_domain: Option<String>,
    genus: Option<String>,
    unclassified: bool,
}

impl Scan {
    fn leaf(&mut self, name: &str, text: &str, previous_name: Option<&str>) {
        match name {
            "Rank" => {
                let Some(scientific_name) = previous_name else {
                    return;
                };
                let slot = match text {
                    "superkingdom" => &mut self.superkingdom,
                    "genus" => &mut self.genus,
                    // newer taxonomy dumps replaced superkingdom with these ranks
                    "domain" | "acellular root" => &mut self.fallback_domain,
                    _ => return,
                };
                if slot.is_none() {
                    *slot = Some(scientific_name.to_string());
                }
            }
            "Lineage" if text == UNCLASSIFIED_LINEAGE => self.unclassified = true,
            _ => {}
        }
    }

    fn finish(self) -> Classification {
        let domain = if self.unclassified {
            Some(Domain::Unclassified)
        } else {
            self.superkingdom
                .or(self.fallback_domain)
                .map(|name| Domain::from_scientific_name(&name))
        };
        Classification {
            domain,
            genus: self.genus,
        }
    }
}

/// Extracts domain and genus from an `efetch` taxonomy document.
pub fn parse_classification(document: &str) -> Result<Classification, ReportError> {
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    // scientific name carried by the leaf right before the current one
    let mut previous_scientific_name: Option<String> = None;
    let mut scan = Scan::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                if let Some(parent) = stack.last_mut() {
                    if !parent.has_children {
                        parent.has_children = true;
                        previous_scientific_name = None;
                    }
                }
                stack.push(Frame {
                    name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
                    text: String::new(),
                    has_children: false,
                });
            }
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|err| ReportError::TaxonomyXml(err.to_string()))?;
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Ok(Event::End(_)) => {
                let Some(frame) = stack.pop() else {
                    return Err(ReportError::TaxonomyXml("unbalanced end tag".to_string()));
                };
                if frame.has_children {
                    previous_scientific_name = None;
                    continue;
                }
                let text = frame.text.trim();
                scan.leaf(&frame.name, text, previous_scientific_name.as_deref());
                previous_scientific_name =
                    (frame.name == "ScientificName").then(|| text.to_string());
            }
            Ok(Event::Empty(_)) => {
                if let Some(parent) = stack.last_mut() {
                    parent.has_children = true;
                }
                previous_scientific_name = None;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(ReportError::TaxonomyXml(err.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(ReportError::TaxonomyXml("unexpected end of document".to_string()));
    }
    Ok(scan.finish())
}

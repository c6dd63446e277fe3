use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Organism id counted for samples that carry no organism property.
pub const SENTINEL_ORGANISM: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub code: String,
    pub space: String,
    pub project: Option<String>,
    pub type_code: String,
    pub properties: BTreeMap<String, String>,
}

impl Sample {
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyTerm {
    pub code: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrganismId(String);

impl OrganismId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn sentinel() -> Self {
        Self(SENTINEL_ORGANISM.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_sentinel(&self) -> bool {
        self.0 == SENTINEL_ORGANISM
    }
}

impl fmt::Display for OrganismId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Domain {
    Bacteria,
    Eukaryota,
    Viruses,
    Archaea,
    Other,
    Unclassified,
}

impl Domain {
    /// Domains that get their own genus and species charts.
    pub fn charted() -> [Domain; 3] {
        [Domain::Bacteria, Domain::Eukaryota, Domain::Viruses]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Bacteria => "Bacteria",
            Domain::Eukaryota => "Eukaryota",
            Domain::Viruses => "Viruses",
            Domain::Archaea => "Archaea",
            Domain::Other => "Other",
            Domain::Unclassified => "unclassified sequences",
        }
    }

    pub fn is_charted(&self) -> bool {
        Self::charted().contains(self)
    }

    /// Maps a superkingdom scientific name onto a domain; unknown names are `Other`.
    pub fn from_scientific_name(name: &str) -> Self {
        name.parse().unwrap_or(Domain::Other)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Bacteria" => Ok(Domain::Bacteria),
            "Eukaryota" => Ok(Domain::Eukaryota),
            "Viruses" => Ok(Domain::Viruses),
            "Archaea" => Ok(Domain::Archaea),
            "Other" => Ok(Domain::Other),
            "unclassified sequences" => Ok(Domain::Unclassified),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub domain: Option<Domain>,
    pub genus: Option<String>,
}

impl Classification {
    pub fn other() -> Self {
        Self {
            domain: Some(Domain::Other),
            genus: None,
        }
    }
}

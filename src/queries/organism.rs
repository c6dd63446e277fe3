//! Sample counts by taxonomic domain, genus and species.
//!
//! Every biological-entity sample outside the blacklisted spaces is counted
//! once under its organism id. Each distinct id is classified through the
//! taxonomy service, and the counts are folded into one domain chart plus a
//! genus and a species chart for each of Bacteria, Eukaryota and Viruses.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use crate::chart::{ChartSet, generate_chart_config};
use crate::domain::{Classification, Domain, OrganismId, Sample, VocabularyTerm};
use crate::error::ReportError;
use crate::openbis::SampleQuery;
use crate::queries::{Query, QueryContext};
use crate::taxonomy::TaxonomyClient;

pub const DOMAIN_CHART: &str = "Domain";
const DOMAIN_TITLE: &str = "Sample Count by Domain";

pub fn genus_chart_name(domain: Domain) -> String {
    format!("{domain}_Genus")
}

pub fn species_chart_name(domain: Domain) -> String {
    format!("{domain}_Species")
}

pub struct OrganismCountQuery;

impl Query for OrganismCountQuery {
    fn name(&self) -> &'static str {
        "OrganismCounts"
    }

    fn run(&self, ctx: &QueryContext<'_>) -> Result<ChartSet, ReportError> {
        let settings = &ctx.config.organism;
        let source = ctx.session.source();
        let token = ctx.session.token();

        let samples =
            source.search_samples(token, &SampleQuery::of_type(settings.sample_type.as_str()))?;
        let counts = count_organisms(&samples, &settings.property, &ctx.config.space_blacklist);
        info!(
            "counted {} samples over {} organisms",
            counts.values().sum::<u64>(),
            counts.len()
        );

        let classifications = classify_organisms(&counts, ctx.taxonomy);

        let vocabulary = match source.search_vocabulary_terms(token, settings.vocabulary.as_deref())
        {
            Ok(terms) => vocabulary_labels(terms),
            Err(err) => {
                warn!("vocabulary lookup failed, species charts use raw organism ids: {err}");
                BTreeMap::new()
            }
        };

        Ok(OrganismCounts::aggregate(&counts, &classifications, &vocabulary).into_chart_set())
    }
}

/// Sample count per organism id, skipping blacklisted spaces.
pub fn count_organisms(
    samples: &[Sample],
    property: &str,
    blacklist: &BTreeSet<String>,
) -> BTreeMap<OrganismId, u64> {
    let mut counts = BTreeMap::new();
    for sample in samples {
        if blacklist.contains(&sample.space) {
            continue;
        }
        let organism = sample
            .property(property)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(OrganismId::new)
            .unwrap_or_else(OrganismId::sentinel);
        *counts.entry(organism).or_insert(0) += 1;
    }
    counts
}

/// Resolves every counted organism. Lookup failures leave that organism unclassified.
pub fn classify_organisms(
    counts: &BTreeMap<OrganismId, u64>,
    taxonomy: &dyn TaxonomyClient,
) -> BTreeMap<OrganismId, Classification> {
    counts
        .keys()
        .map(|organism| {
            // the sentinel cannot be looked up
            if organism.is_sentinel() {
                return (organism.clone(), Classification::other());
            }
            let classification = taxonomy.classify(organism).unwrap_or_else(|err| {
                warn!("taxonomy lookup for organism {organism} failed: {err}");
                Classification::default()
            });
            (organism.clone(), classification)
        })
        .collect()
}

/// Vocabulary code to label; a repeated code keeps its last label.
pub fn vocabulary_labels(terms: Vec<VocabularyTerm>) -> BTreeMap<String, String> {
    terms
        .into_iter()
        .map(|term| (term.code, term.label))
        .collect()
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OrganismCounts {
    pub domain: BTreeMap<String, u64>,
    pub genus: BTreeMap<Domain, BTreeMap<String, u64>>,
    pub species: BTreeMap<Domain, BTreeMap<String, u64>>,
}

impl OrganismCounts {
    pub fn aggregate(
        counts: &BTreeMap<OrganismId, u64>,
        classifications: &BTreeMap<OrganismId, Classification>,
        vocabulary: &BTreeMap<String, String>,
    ) -> Self {
        let mut result = OrganismCounts::default();
        for domain in Domain::charted() {
            result.genus.insert(domain, BTreeMap::new());
            result.species.insert(domain, BTreeMap::new());
        }

        for (organism, count) in counts {
            let classification = classifications.get(organism);
            let domain = classification.and_then(|c| c.domain);

            // unresolved organisms still count, under Other
            let bucket = domain.unwrap_or(Domain::Other);
            *result.domain.entry(bucket.to_string()).or_insert(0) += count;

            let Some(domain) = domain.filter(Domain::is_charted) else {
                continue;
            };

            if let Some(genus) = classification.and_then(|c| c.genus.as_ref()) {
                if let Some(genus_counts) = result.genus.get_mut(&domain) {
                    *genus_counts.entry(genus.clone()).or_insert(0) += count;
                }
            }

            let label = vocabulary
                .get(organism.as_str())
                .cloned()
                .unwrap_or_else(|| organism.to_string());
            if let Some(species_counts) = result.species.get_mut(&domain) {
                // labels shared by several organisms keep the last count
                species_counts.insert(label, *count);
            }
        }

        result
    }

    pub fn into_chart_set(self) -> ChartSet {
        let mut charts = ChartSet::new();
        charts.insert(
            DOMAIN_CHART.to_string(),
            generate_chart_config(&self.domain, DOMAIN_CHART, DOMAIN_TITLE),
        );
        for (domain, counts) in &self.genus {
            charts.insert(
                genus_chart_name(*domain),
                generate_chart_config(counts, domain.as_str(), &format!("Sample Count {domain}")),
            );
        }
        for (domain, counts) in &self.species {
            charts.insert(
                species_chart_name(*domain),
                generate_chart_config(counts, domain.as_str(), ""),
            );
        }
        charts
    }
}

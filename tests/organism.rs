mod common;

use std::collections::{BTreeMap, BTreeSet};

use openbis_chart_stats::chart::ChartSet;
use openbis_chart_stats::domain::{Classification, Domain, OrganismId};
use openbis_chart_stats::openbis::Session;
use openbis_chart_stats::queries::organism::{
    DOMAIN_CHART, OrganismCounts, count_organisms, genus_chart_name, species_chart_name,
};
use openbis_chart_stats::queries::{OrganismCountQuery, Query, QueryContext};

use common::{FixtureTaxonomy, MockCatalog, MockOpenBis, config, sample, term};

fn run_query(source: &MockOpenBis, taxonomy: &FixtureTaxonomy, blacklist: &[&str]) -> ChartSet {
    let config = config("unused.yaml", blacklist);
    let catalog = MockCatalog::default();
    let session = Session::open(source, &config.credentials).unwrap();
    let ctx = QueryContext {
        session: &session,
        taxonomy,
        catalog: &catalog,
        config: &config,
    };
    OrganismCountQuery.run(&ctx).unwrap()
}

fn ids(entries: &[(&str, u64)]) -> BTreeMap<OrganismId, u64> {
    entries
        .iter()
        .map(|(id, count)| (OrganismId::new(*id), *count))
        .collect()
}

#[test]
fn escherichia_and_other_scenario() {
    let source = MockOpenBis::with_samples(
        "Q_BIOLOGICAL_ENTITY",
        vec![
            sample("QAAAA001", "A", Some("562")),
            sample("QAAAA002", "A", Some("562")),
            sample("QBBBB001", "B", Some("0")),
        ],
    );
    let taxonomy = FixtureTaxonomy::with(&[("562", "taxonomy_562.xml")]);

    let charts = run_query(&source, &taxonomy, &[]);

    let domain = &charts[DOMAIN_CHART];
    assert_eq!(domain.settings.x_categories, vec!["Bacteria", "Other"]);
    assert_eq!(domain.series("Domain"), Some(&[2, 1][..]));

    let genus = &charts[&genus_chart_name(Domain::Bacteria)];
    assert_eq!(genus.settings.x_categories, vec!["Escherichia"]);
    assert_eq!(genus.series("Bacteria"), Some(&[2][..]));
    assert_eq!(genus.settings.title, "Sample Count Bacteria");

    // the sentinel is never looked up
    assert_eq!(taxonomy.lookups(), vec!["562"]);
    assert_eq!(charts.len(), 7);
    assert!(charts.values().all(|chart| chart.is_well_formed()));
}

#[test]
fn blacklisted_space_excluded_everywhere() {
    let mut source = MockOpenBis::with_samples(
        "Q_BIOLOGICAL_ENTITY",
        vec![
            sample("QAAAA001", "A", Some("562")),
            sample("QHIDE001", "HIDDEN", Some("9606")),
            sample("QHIDE002", "HIDDEN", None),
        ],
    );
    source.terms = vec![term("562", "Escherichia coli"), term("9606", "Homo sapiens")];
    let taxonomy = FixtureTaxonomy::with(&[
        ("562", "taxonomy_562.xml"),
        ("9606", "taxonomy_9606.xml"),
    ]);

    let charts = run_query(&source, &taxonomy, &["HIDDEN"]);

    assert_eq!(charts[DOMAIN_CHART].settings.x_categories, vec!["Bacteria"]);
    assert!(charts[&genus_chart_name(Domain::Eukaryota)].settings.x_categories.is_empty());
    assert!(charts[&species_chart_name(Domain::Eukaryota)].settings.x_categories.is_empty());
    assert_eq!(
        charts[&species_chart_name(Domain::Bacteria)].settings.x_categories,
        vec!["Escherichia coli"]
    );
    assert_eq!(taxonomy.lookups(), vec!["562"]);
}

#[test]
fn missing_property_counts_under_sentinel() {
    let samples = vec![
        sample("QAAAA001", "A", None),
        sample("QAAAA002", "A", Some("")),
        sample("QAAAA003", "A", Some("562")),
    ];
    let counts = count_organisms(&samples, "Q_NCBI_ORGANISM", &BTreeSet::new());
    assert_eq!(counts, ids(&[("0", 2), ("562", 1)]));
}

#[test]
fn organism_values_are_trimmed_before_counting() {
    let samples = vec![
        sample("QAAAA001", "A", Some(" 562")),
        sample("QAAAA002", "A", Some("562\t")),
        sample("QAAAA003", "A", Some("   ")),
    ];
    let counts = count_organisms(&samples, "Q_NCBI_ORGANISM", &BTreeSet::new());
    assert_eq!(counts, ids(&[("0", 1), ("562", 2)]));
}

#[test]
fn domain_sum_matches_counted_samples() {
    let samples = vec![
        sample("QAAAA001", "A", Some("562")),
        sample("QAAAA002", "A", Some("9606")),
        sample("QAAAA003", "B", Some("12345")),
        sample("QAAAA004", "B", None),
        sample("QAAAA005", "SKIP", Some("562")),
    ];
    let blacklist = BTreeSet::from(["SKIP".to_string()]);
    let counts = count_organisms(&samples, "Q_NCBI_ORGANISM", &blacklist);

    let classifications = BTreeMap::from([
        (OrganismId::new("562"), Classification {
            domain: Some(Domain::Bacteria),
            genus: Some("Escherichia".to_string()),
        }),
        (OrganismId::new("9606"), Classification {
            domain: Some(Domain::Eukaryota),
            genus: Some("Homo".to_string()),
        }),
        // 12345 failed its lookup
        (OrganismId::new("12345"), Classification::default()),
        (OrganismId::sentinel(), Classification::other()),
    ]);
    let result = OrganismCounts::aggregate(&counts, &classifications, &BTreeMap::new());

    assert_eq!(result.domain.values().sum::<u64>(), 4);
    assert_eq!(result.domain.get("Other"), Some(&2));
    assert_eq!(counts.len(), 4);
}

#[test]
fn domain_without_genus_stays_out_of_genus_chart() {
    let source = MockOpenBis::with_samples(
        "Q_BIOLOGICAL_ENTITY",
        vec![
            sample("QAAAA001", "A", Some("543")),
            sample("QAAAA002", "A", Some("543")),
            sample("QAAAA003", "A", Some("562")),
        ],
    );
    let taxonomy = FixtureTaxonomy::with(&[
        ("543", "taxonomy_no_genus.xml"),
        ("562", "taxonomy_562.xml"),
    ]);

    let charts = run_query(&source, &taxonomy, &[]);

    assert_eq!(charts[DOMAIN_CHART].value("Domain", "Bacteria"), Some(3));
    let genus = &charts[&genus_chart_name(Domain::Bacteria)];
    assert_eq!(genus.settings.x_categories, vec!["Escherichia"]);
    assert_eq!(genus.value("Bacteria", "Escherichia"), Some(1));
    // still listed per species
    let species = &charts[&species_chart_name(Domain::Bacteria)];
    assert_eq!(species.value("Bacteria", "543"), Some(2));
}

#[test]
fn unclassified_organisms_get_no_genus_or_species_chart() {
    let source = MockOpenBis::with_samples(
        "Q_BIOLOGICAL_ENTITY",
        vec![sample("QAAAA001", "A", Some("32644"))],
    );
    let taxonomy = FixtureTaxonomy::with(&[("32644", "taxonomy_unclassified.xml")]);

    let charts = run_query(&source, &taxonomy, &[]);

    assert_eq!(
        charts[DOMAIN_CHART].settings.x_categories,
        vec!["unclassified sequences"]
    );
    for domain in Domain::charted() {
        assert!(charts[&genus_chart_name(domain)].settings.x_categories.is_empty());
        assert!(charts[&species_chart_name(domain)].settings.x_categories.is_empty());
    }
}

#[test]
fn failed_lookup_leaves_organism_unclassified() {
    let source = MockOpenBis::with_samples(
        "Q_BIOLOGICAL_ENTITY",
        vec![
            sample("QAAAA001", "A", Some("562")),
            sample("QAAAA002", "A", Some("99999")),
        ],
    );
    // 99999 has no fixture, so its lookup errors
    let taxonomy = FixtureTaxonomy::with(&[("562", "taxonomy_562.xml")]);

    let charts = run_query(&source, &taxonomy, &[]);

    assert_eq!(charts[DOMAIN_CHART].value("Domain", "Bacteria"), Some(1));
    assert_eq!(charts[DOMAIN_CHART].value("Domain", "Other"), Some(1));
    assert_eq!(taxonomy.lookups(), vec!["562", "99999"]);
}

#[test]
fn shared_species_label_keeps_last_organism() {
    let counts = ids(&[("511145", 3), ("562", 5)]);
    let bacteria = Classification {
        domain: Some(Domain::Bacteria),
        genus: Some("Escherichia".to_string()),
    };
    let classifications = BTreeMap::from([
        (OrganismId::new("511145"), bacteria.clone()),
        (OrganismId::new("562"), bacteria),
    ]);
    let vocabulary = BTreeMap::from([
        ("511145".to_string(), "Escherichia coli".to_string()),
        ("562".to_string(), "Escherichia coli".to_string()),
    ]);

    let result = OrganismCounts::aggregate(&counts, &classifications, &vocabulary);

    // ids are visited in ascending order: "562" sorts after "511145"
    assert_eq!(
        result.species[&Domain::Bacteria],
        BTreeMap::from([("Escherichia coli".to_string(), 5)])
    );
    // genus counts add up instead
    assert_eq!(result.genus[&Domain::Bacteria]["Escherichia"], 8);
}

#[test]
fn vocabulary_failure_still_yields_domain_charts() {
    let mut source = MockOpenBis::with_samples(
        "Q_BIOLOGICAL_ENTITY",
        vec![sample("QAAAA001", "A", Some("9606"))],
    );
    source.fail_vocabulary = true;
    let taxonomy = FixtureTaxonomy::with(&[("9606", "taxonomy_9606.xml")]);

    let charts = run_query(&source, &taxonomy, &[]);

    assert_eq!(charts[DOMAIN_CHART].value("Domain", "Eukaryota"), Some(1));
    assert_eq!(
        charts[&species_chart_name(Domain::Eukaryota)].value("Eukaryota", "9606"),
        Some(1)
    );
}

#[test]
fn chart_names_and_titles() {
    let charts = OrganismCounts::aggregate(&BTreeMap::new(), &BTreeMap::new(), &BTreeMap::new())
        .into_chart_set();
    let names = charts.keys().map(String::as_str).collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![
            "Bacteria_Genus",
            "Bacteria_Species",
            "Domain",
            "Eukaryota_Genus",
            "Eukaryota_Species",
            "Viruses_Genus",
            "Viruses_Species",
        ]
    );
    assert_eq!(charts["Domain"].settings.title, "Sample Count by Domain");
    assert_eq!(charts["Viruses_Genus"].settings.title, "Sample Count Viruses");
    assert_eq!(charts["Viruses_Species"].settings.title, "");
    assert!(charts["Viruses_Species"].series("Viruses").is_some());
}

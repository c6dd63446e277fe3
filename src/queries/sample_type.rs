use std::collections::{BTreeMap, BTreeSet};

use crate::chart::{ChartSet, generate_chart_config};
use crate::domain::Sample;
use crate::error::ReportError;
use crate::openbis::SampleQuery;
use crate::queries::{Query, QueryContext};

pub const SAMPLE_TYPE_CHART: &str = "SampleTypes";
const UNSPECIFIED_KIND: &str = "Other";

pub struct SampleTypeQuery;

impl Query for SampleTypeQuery {
    fn name(&self) -> &'static str {
        "SampleType"
    }

    fn run(&self, ctx: &QueryContext<'_>) -> Result<ChartSet, ReportError> {
        let settings = &ctx.config.sample_types;
        let samples = ctx.session.source().search_samples(
            ctx.session.token(),
            &SampleQuery::of_type(settings.sample_type.as_str()),
        )?;
        let counts = count_by_property(&samples, &settings.property, &ctx.config.space_blacklist);

        let mut charts = ChartSet::new();
        charts.insert(
            SAMPLE_TYPE_CHART.to_string(),
            generate_chart_config(&counts, SAMPLE_TYPE_CHART, "Sample Count by Type"),
        );
        Ok(charts)
    }
}

pub fn count_by_property(
    samples: &[Sample],
    property: &str,
    blacklist: &BTreeSet<String>,
) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for sample in samples.iter().filter(|s| !blacklist.contains(&s.space)) {
        let kind = sample
            .property(property)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(UNSPECIFIED_KIND);
        *counts.entry(kind.to_string()).or_insert(0) += 1;
    }
    counts
}

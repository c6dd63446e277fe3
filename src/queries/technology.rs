use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::chart::{ChartSet, generate_chart_config};
use crate::domain::Sample;
use crate::error::ReportError;
use crate::openbis::SampleQuery;
use crate::queries::{Query, QueryContext};

pub const TECHNOLOGY_CHART: &str = "ProjectsTechnologies";
const TECHNOLOGY_SERIES: &str = "Projects";

/// Distinct projects per technology, a technology being the type of its measurement samples.
pub struct ProjectTechnologyQuery;

impl Query for ProjectTechnologyQuery {
    fn name(&self) -> &'static str {
        "ProjectTech"
    }

    fn run(&self, ctx: &QueryContext<'_>) -> Result<ChartSet, ReportError> {
        let mut projects: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for (type_code, technology) in &ctx.config.technologies {
            let samples = ctx
                .session
                .source()
                .search_samples(ctx.session.token(), &SampleQuery::of_type(type_code.as_str()))?;
            debug!("{} samples of type {type_code}", samples.len());
            projects
                .entry(technology.clone())
                .or_default()
                .extend(project_keys(&samples, &ctx.config.space_blacklist));
        }

        let counts = projects
            .into_iter()
            .map(|(technology, keys)| (technology, keys.len() as u64))
            .collect::<BTreeMap<_, _>>();

        let mut charts = ChartSet::new();
        charts.insert(
            TECHNOLOGY_CHART.to_string(),
            generate_chart_config(&counts, TECHNOLOGY_SERIES, "Projects by Technology"),
        );
        Ok(charts)
    }
}

/// `SPACE/PROJECT` keys of the samples outside blacklisted spaces.
pub fn project_keys(samples: &[Sample], blacklist: &BTreeSet<String>) -> BTreeSet<String> {
    samples
        .iter()
        .filter(|sample| !blacklist.contains(&sample.space))
        .filter_map(|sample| {
            sample
                .project
                .as_ref()
                .map(|project| format!("{}/{project}", sample.space))
        })
        .collect()
}

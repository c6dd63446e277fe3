use std::collections::BTreeMap;

use tracing::info;

use crate::chart::{ChartSet, generate_chart_config};
use crate::error::ReportError;
use crate::github::Repository;
use crate::queries::{Query, QueryContext};

pub const PIPELINE_CHART: &str = "AvailablePipelines";

pub struct AvailablePipelinesQuery;

impl Query for AvailablePipelinesQuery {
    fn name(&self) -> &'static str {
        "AvailablePipelines"
    }

    fn run(&self, ctx: &QueryContext<'_>) -> Result<ChartSet, ReportError> {
        let mut charts = ChartSet::new();
        let Some(settings) = &ctx.config.pipelines else {
            return Ok(charts);
        };

        let repositories = ctx.catalog.list_repositories(&settings.organization)?;
        info!(
            "{} repositories in {}",
            repositories.len(),
            settings.organization
        );
        let counts = count_by_topic(&repositories, &settings.topics);
        charts.insert(
            PIPELINE_CHART.to_string(),
            generate_chart_config(&counts, "Pipelines", "Available Pipelines"),
        );
        Ok(charts)
    }
}

/// Non-archived repositories per workflow topic. A repository counts once,
/// under the first of `topics` it carries.
pub fn count_by_topic(repositories: &[Repository], topics: &[String]) -> BTreeMap<String, u64> {
    let mut counts = topics
        .iter()
        .map(|topic| (topic.clone(), 0))
        .collect::<BTreeMap<_, _>>();

    for repository in repositories.iter().filter(|repo| !repo.archived) {
        let matched = topics
            .iter()
            .find(|topic| repository.topics.iter().any(|t| t.eq_ignore_ascii_case(topic)));
        if let Some(topic) = matched {
            *counts.entry(topic.clone()).or_insert(0) += 1;
        }
    }
    counts
}

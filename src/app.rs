use serde::Serialize;
use tracing::{error, info, warn};

use crate::chart::{ChartSet, merge_charts};
use crate::config::ResolvedConfig;
use crate::error::ReportError;
use crate::github::PipelineCatalog;
use crate::openbis::{DataSource, Session};
use crate::queries::{
    AvailablePipelinesQuery, OrganismCountQuery, ProjectTechnologyQuery, Query, QueryContext,
    SampleTypeQuery,
};
use crate::taxonomy::TaxonomyClient;
use crate::writer::YamlWriter;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub output: String,
    pub charts: Vec<String>,
    pub failed_queries: Vec<String>,
}

pub struct App<D: DataSource, T: TaxonomyClient, G: PipelineCatalog> {
    config: ResolvedConfig,
    source: D,
    taxonomy: T,
    catalog: G,
}

impl<D: DataSource, T: TaxonomyClient, G: PipelineCatalog> App<D, T, G> {
    pub fn new(config: ResolvedConfig, source: D, taxonomy: T, catalog: G) -> Self {
        Self {
            config,
            source,
            taxonomy,
            catalog,
        }
    }

    /// Queries in execution order. Charts of later queries replace same-named earlier ones.
    pub fn queries(&self) -> Vec<Box<dyn Query>> {
        let mut queries: Vec<Box<dyn Query>> = vec![Box::new(OrganismCountQuery)];
        if self.config.pipelines.is_some() {
            queries.push(Box::new(AvailablePipelinesQuery));
        }
        queries.push(Box::new(ProjectTechnologyQuery));
        queries.push(Box::new(SampleTypeQuery));
        queries
    }

    pub fn run(&self) -> Result<RunReport, ReportError> {
        info!("Establish access to openBIS at {}", self.config.credentials.url);
        let session = Session::open(&self.source, &self.config.credentials)?;

        info!("Start queries");
        let (charts, failed_queries) = self.query(&session);

        info!("Write results to {}", self.config.output);
        // on failure the session guard still logs out
        YamlWriter::write_to_file(&self.config.output, &charts)?;

        info!("Log out of openBIS");
        if let Err(err) = session.close() {
            warn!("openBIS logout failed: {err}");
        }

        Ok(RunReport {
            output: self.config.output.to_string(),
            charts: charts.into_keys().collect(),
            failed_queries,
        })
    }

    /// Runs every query against `session`. A failed query is logged and contributes nothing.
    pub fn query(&self, session: &Session<'_>) -> (ChartSet, Vec<String>) {
        let ctx = QueryContext {
            session,
            taxonomy: &self.taxonomy,
            catalog: &self.catalog,
            config: &self.config,
        };

        let mut charts = ChartSet::new();
        let mut failed = Vec::new();
        for query in self.queries() {
            info!("Run {} query", query.name());
            match query.run(&ctx) {
                Ok(result) => merge_charts(&mut charts, result),
                Err(err) => {
                    error!("{} query failed with: {err}", query.name());
                    failed.push(query.name().to_string());
                }
            }
        }
        (charts, failed)
    }
}

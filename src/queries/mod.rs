use crate::chart::ChartSet;
use crate::config::ResolvedConfig;
use crate::error::ReportError;
use crate::github::PipelineCatalog;
use crate::openbis::Session;
use crate::taxonomy::TaxonomyClient;

pub mod organism;
pub mod pipelines;
pub mod sample_type;
pub mod technology;

pub use organism::OrganismCountQuery;
pub use pipelines::AvailablePipelinesQuery;
pub use sample_type::SampleTypeQuery;
pub use technology::ProjectTechnologyQuery;

/// Everything a query may talk to during one run.
pub struct QueryContext<'a> {
    pub session: &'a Session<'a>,
    pub taxonomy: &'a dyn TaxonomyClient,
    pub catalog: &'a dyn PipelineCatalog,
    pub config: &'a ResolvedConfig,
}

pub trait Query {
    fn name(&self) -> &'static str;
    fn run(&self, ctx: &QueryContext<'_>) -> Result<ChartSet, ReportError>;
}

use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use openbis_chart_stats::app::App;
use openbis_chart_stats::config::{ConfigLoader, ConfigOverrides, DEFAULT_GITHUB_URL};
use openbis_chart_stats::error::ReportError;
use openbis_chart_stats::github::GithubHttpClient;
use openbis_chart_stats::openbis::OpenBisHttpClient;
use openbis_chart_stats::output::{JsonOutput, OutputMode, print_summary};
use openbis_chart_stats::taxonomy::NcbiTaxonomyHttpClient;

#[derive(Parser)]
#[command(name = "obis-charts")]
#[command(about = "Aggregate openBIS sample statistics into a chart configuration file")]
#[command(version, author)]
struct Cli {
    /// JSON file with credentials and query settings
    #[arg(short, long)]
    config: Option<String>,

    /// openBIS application server URL, e.g. https://host/openbis/openbis
    #[arg(long)]
    url: Option<String>,

    #[arg(short, long)]
    user: Option<String>,

    #[arg(short, long)]
    password: Option<String>,

    /// Destination of the YAML chart configuration
    #[arg(short, long)]
    output: Option<String>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<ReportError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ReportError) -> u8 {
    match error {
        ReportError::MissingConfig
        | ReportError::ConfigRead(_)
        | ReportError::ConfigParse(_)
        | ReportError::InvalidConfig(_) => 2,
        ReportError::OpenBisHttp(_)
        | ReportError::OpenBisStatus { .. }
        | ReportError::OpenBisRpc { .. }
        | ReportError::OpenBisAuth(_)
        | ReportError::OpenBisResponse(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let overrides = ConfigOverrides {
        openbis_url: cli.url,
        username: cli.user,
        password: cli.password,
        output: cli.output,
    };
    let config = ConfigLoader::resolve(cli.config.as_deref(), overrides)?;

    let source = OpenBisHttpClient::new(&config.credentials.url)?;
    let taxonomy = NcbiTaxonomyHttpClient::new(&config.taxonomy_url)?;
    let github_url = config
        .pipelines
        .as_ref()
        .and_then(|pipelines| pipelines.api_url.clone())
        .unwrap_or_else(|| DEFAULT_GITHUB_URL.to_string());
    let catalog = GithubHttpClient::new(&github_url)?;

    let app = App::new(config, source, taxonomy, catalog);
    let result = app.run()?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_run(&result).into_diagnostic()?,
        OutputMode::Human => print_summary(&result),
    }
    Ok(())
}

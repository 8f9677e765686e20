use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::info;

use querybench::api::BenchApi;
use querybench::backend::BackendRegistry;
use querybench::conf::Config;
use querybench::core::{CliArgs, setup_logging};
use querybench::model::QueryCatalog;
use querybench::report::ScriptRenderer;
use querybench::service::BenchmarkService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logging();
    let args = CliArgs::parse();
    info!(args = args; "Querybench started.");

    let config = Config::load(args.config.as_deref()).context("loading config")?;
    let catalog = match &config.benchmark.catalog_path {
        Some(path) => QueryCatalog::from_file(path)
            .with_context(|| format!("loading query catalog {}", path.display()))?,
        None => QueryCatalog::embedded().context("loading embedded query catalog")?,
    };
    info!("Loaded {} catalog queries", catalog.len());

    let registry = BackendRegistry::from_config(&config).context("building backends")?;
    let service = BenchmarkService::new(registry, catalog);
    let renderer = Arc::new(ScriptRenderer::new(&config.report));

    BenchApi::new(service, renderer)
        .serve(&config.server.addr())
        .await
        .context("running HTTP server")?;
    Ok(())
}

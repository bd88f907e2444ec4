use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bulkfeed::app::AppContext;
use bulkfeed::cli::commands::{self, RunOptions};
use bulkfeed::cli::{shell, Cli, Commands};
use bulkfeed::config::Config;
use bulkfeed::session::Session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Commands::Validate { domain } = &cli.command {
        if !commands::validate(domain) {
            std::process::exit(1);
        }
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let mut session = Session::new(&config)?;
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Validate { .. } => {}
        Commands::Run {
            domain,
            batch_size,
            offset,
            pages,
            skip_images,
            skip_rewrite,
            image_policy,
            eligibility,
            columns,
            output,
        } => {
            let domain = domain
                .or_else(|| ctx.config.source.domain.clone())
                .context("No domain given; pass --domain or set source.domain in the config")?;
            let output = commands::output_dir(output, &ctx.config.export.output_dir);

            let opts = RunOptions {
                domain,
                batch_size,
                offset,
                pages,
                skip_images,
                skip_rewrite,
                image_policy,
                eligibility,
                columns,
                output,
            };
            commands::run_pipeline(&ctx, &mut session, opts).await?;
        }
        Commands::Shell { domain } => {
            shell::run(&ctx, &mut session, domain).await?;
        }
    }

    Ok(())
}

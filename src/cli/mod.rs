pub mod commands;
pub mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::checker::ImageCheckPolicy;
use crate::rewriter::RewriteEligibility;

#[derive(Parser)]
#[command(name = "bulkfeed")]
#[command(about = "Turn a WordPress post feed into a Canva Bulk Create CSV", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/bulkfeed/config.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check whether a domain is well formed
    Validate {
        /// Domain, with or without http(s)://
        domain: String,
    },
    /// Fetch, check, rewrite and export in one go
    Run {
        /// Site to pull posts from (defaults to source.domain in config)
        #[arg(short, long)]
        domain: Option<String>,

        /// Posts per page (1-100)
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Offset of the first page
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Number of pages to fetch; stops early on an empty page
        #[arg(short, long, default_value_t = 1)]
        pages: usize,

        /// Skip the image check
        #[arg(long)]
        skip_images: bool,

        /// Skip title rewriting
        #[arg(long)]
        skip_rewrite: bool,

        /// existence, content-type or canva-fetch
        #[arg(long)]
        image_policy: Option<ImageCheckPolicy>,

        /// has-image or valid-image
        #[arg(long)]
        eligibility: Option<RewriteEligibility>,

        /// Comma-separated export columns
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,

        /// Directory for the CSV (defaults to export.output_dir in config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Interactive session: trigger each stage by hand
    Shell {
        /// Site to start with
        #[arg(short, long)]
        domain: Option<String>,
    },
}

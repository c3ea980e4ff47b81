use std::path::PathBuf;

use asmgraph::{AsmgraphOptions, DisplayOptions, FilterOptions, output, parse_view_type, run_main};
use asmgraph_core::ViewType;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "asmgraph",
    about = "asmgraph: collapsible dependency diagrams for reflected assemblies",
    version
)]
pub struct Cli {
    /// Reflection document produced by the analysis backend
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    input: PathBuf,

    /// View to build: references, methods, apis or custom
    #[arg(long, value_name = "VIEW", default_value = "references", value_parser = parse_view_type)]
    view: ViewType,

    /// Layer graph (JSON list of nodes) for the custom view
    #[arg(long, value_name = "FILE")]
    custom: Option<PathBuf>,

    #[command(flatten)]
    display: DisplayOptions,

    #[command(flatten)]
    filter: FilterOptions,

    /// Write the element id to class/tooltip table as JSON
    #[arg(long = "side-table", value_name = "FILE")]
    side_table: Option<PathBuf>,

    /// Output file path (writes to file instead of stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,
}

pub fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    let opts = AsmgraphOptions {
        input: args.input,
        custom: args.custom,
        view: args.view,
        display: args.display,
        filter: args.filter,
        side_table: args.side_table,
    };

    match run_main(&opts) {
        Ok(text) => output::write_output(args.output.as_deref(), &text)?,
        Err(e) => {
            tracing::error!(error = %e, "execution failed");
            return Err(e.into());
        }
    }
    Ok(())
}

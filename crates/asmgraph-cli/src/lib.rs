//! asmgraph command-line interface.

pub mod options;
pub mod output;

use std::path::{Path, PathBuf};
use std::time::Instant;

use asmgraph_core::{GraphFilter, ViewType};
use asmgraph_error::{Error, Result};
use asmgraph_view::{CustomNode, DataLoader, MemoryStore, ViewAssembler, ViewData};
use tracing::info;

pub use options::{DisplayOptions, FilterOptions, parse_view_type};

/// Options for running asmgraph.
#[derive(Debug, Clone)]
pub struct AsmgraphOptions {
    /// Reflection document to read.
    pub input: PathBuf,
    /// Layer graph for the custom view.
    pub custom: Option<PathBuf>,
    pub view: ViewType,
    pub display: DisplayOptions,
    pub filter: FilterOptions,
    /// Where to write the side table as JSON.
    pub side_table: Option<PathBuf>,
}

impl AsmgraphOptions {
    pub fn new(input: impl Into<PathBuf>, view: ViewType) -> Self {
        Self {
            input: input.into(),
            custom: None,
            view,
            display: DisplayOptions::default(),
            filter: FilterOptions::default(),
            side_table: None,
        }
    }
}

/// Build the requested view. Returns its diagram text, or the message shown
/// in its place.
pub fn run_main(opts: &AsmgraphOptions) -> Result<String> {
    let started = Instant::now();
    let data = load_data(opts)?;

    let options = opts
        .display
        .to_view_options(opts.view, opts.filter.parent_edges);
    let assembler = ViewAssembler::new();
    let source = assembler.prepare(&data, &options)?;
    let mut filter = GraphFilter::all_visible(&source.built.tree);
    opts.filter.apply(&mut filter)?;
    let view = assembler.assemble(&source, &filter, &options)?;

    if let Some(path) = &opts.side_table {
        output::write_side_table(path, &view)?;
    }
    info!(
        view = opts.view.as_str(),
        secs = started.elapsed().as_secs_f64(),
        "view complete"
    );
    Ok(output::diagram_or_message(&view))
}

fn load_data(opts: &AsmgraphOptions) -> Result<ViewData> {
    let store = MemoryStore::new();
    let input = opts.input.clone();
    let backend = move || read_text(&input);
    let reflected = DataLoader::new(opts.input.display().to_string()).load(&store, &backend)?;

    let custom = match &opts.custom {
        Some(path) => {
            let text = read_text(path)?;
            serde_json::from_str::<Vec<CustomNode>>(&text).map_err(|e| {
                Error::deserialization_failed("custom graph is not a list of nodes")
                    .with_operation("cli::load_custom")
                    .with_context("path", path.display().to_string())
                    .set_source(e)
            })?
        }
        None => Vec::new(),
    };
    Ok(ViewData { reflected, custom })
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| Error::from(e).with_context("path", path.display().to_string()))
}


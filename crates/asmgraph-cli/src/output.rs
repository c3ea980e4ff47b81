//! Output generation (DOT text and side tables).

use std::path::Path;

use asmgraph_error::{Error, Result};
use asmgraph_view::{DiagramContent, ViewDescription};
use tracing::info;

/// DOT text for diagrams, the message otherwise.
pub fn diagram_or_message(view: &ViewDescription) -> String {
    match &view.content {
        DiagramContent::Diagram { diagram_text, .. } => diagram_text.clone(),
        DiagramContent::Message(message) => message.clone(),
    }
}

/// Write the view's side table as pretty JSON. Message views write `{}`.
pub fn write_side_table(path: &Path, view: &ViewDescription) -> Result<()> {
    let text = match view.side_table() {
        Some(side_table) => serde_json::to_string_pretty(side_table),
        None => serde_json::to_string_pretty(&serde_json::Map::new()),
    }
    .map_err(|e| {
        Error::serialization_failed("cannot write side table")
            .with_operation("output::write_side_table")
            .set_source(e)
    })?;
    std::fs::write(path, text)
        .map_err(|e| Error::from(e).with_context("path", path.display().to_string()))?;
    info!(path = %path.display(), "side table written");
    Ok(())
}

/// Write to `path`, or print to stdout when no path is given.
pub fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, text)
                .map_err(|e| Error::from(e).with_context("path", path.display().to_string()))?;
            info!(path = %path.display(), "output written");
        }
        None => println!("{text}"),
    }
    Ok(())
}

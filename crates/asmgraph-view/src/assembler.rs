//! Runs hierarchy, visibility, projection and rendering for one view.

use std::time::Instant;

use asmgraph_core::{GraphFilter, ViewOptions, ViewType, apply_filter};
use asmgraph_dot::{
    Area, ImageData, Projection, SideTable, StyleOverrides, parse_image_map, project, write_dot,
};
use asmgraph_error::{Error, ErrorKind, Result};
use tracing::info;

use crate::model::ViewData;
use crate::render::{DiagramRenderer, RenderFormat, RenderOutput};
use crate::views::{GraphSource, build_source};

pub const STAGE_HIERARCHY: &str = "view::hierarchy";
pub const STAGE_VISIBILITY: &str = "view::visibility";
pub const STAGE_PROJECTION: &str = "view::projection";
pub const STAGE_RENDER: &str = "view::render";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramContent {
    Diagram {
        diagram_text: String,
        side_table: SideTable,
        image: ImageData,
    },
    /// Shown instead of a diagram, e.g. when the graph is too large.
    Message(String),
}

/// A built view together with the filter and options that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewDescription {
    pub view_type: ViewType,
    pub content: DiagramContent,
    pub filter: GraphFilter,
    pub options: ViewOptions,
}

impl ViewDescription {
    pub fn diagram_text(&self) -> Option<&str> {
        match &self.content {
            DiagramContent::Diagram { diagram_text, .. } => Some(diagram_text),
            DiagramContent::Message(_) => None,
        }
    }

    pub fn image(&self) -> Option<&ImageData> {
        match &self.content {
            DiagramContent::Diagram { image, .. } => Some(image),
            DiagramContent::Message(_) => None,
        }
    }

    pub fn side_table(&self) -> Option<&SideTable> {
        match &self.content {
            DiagramContent::Diagram { side_table, .. } => Some(side_table),
            DiagramContent::Message(_) => None,
        }
    }
}

/// Renderer output for a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedView {
    pub svg: String,
    pub areas: Vec<Area>,
}

fn in_stage(stage: &'static str, view_type: ViewType) -> impl Fn(Error) -> Error {
    move |e| e.with_operation(stage).with_context("view", view_type.as_str())
}

#[derive(Debug, Clone, Default)]
pub struct ViewAssembler {
    styles: StyleOverrides,
}

impl ViewAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_styles(styles: StyleOverrides) -> Self {
        Self { styles }
    }

    /// Build the unfiltered tree and edges for the options' view type.
    pub fn prepare(&self, data: &ViewData, options: &ViewOptions) -> Result<GraphSource> {
        build_source(options.view_type, data, options.hierarchy())
            .map_err(in_stage(STAGE_HIERARCHY, options.view_type))
    }

    /// Filter, project and describe a prepared view.
    pub fn assemble(
        &self,
        source: &GraphSource,
        filter: &GraphFilter,
        options: &ViewOptions,
    ) -> Result<ViewDescription> {
        let view_type = options.view_type;
        let graph = apply_filter(&source.built.tree, &source.edges, filter)
            .map_err(in_stage(STAGE_VISIBILITY, view_type))?;
        let content = match project(&graph, options, &self.styles)
            .map_err(in_stage(STAGE_PROJECTION, view_type))?
        {
            Projection::Image { image, side_table } => DiagramContent::Diagram {
                diagram_text: write_dot(&image, options),
                side_table,
                image,
            },
            Projection::TooLarge(message) => DiagramContent::Message(message),
        };
        Ok(ViewDescription {
            view_type,
            content,
            filter: filter.clone(),
            options: options.clone(),
        })
    }

    /// Build a view from loaded data in one go.
    pub fn build_view(
        &self,
        view_type: ViewType,
        data: &ViewData,
        filter: &GraphFilter,
        options: &ViewOptions,
    ) -> Result<ViewDescription> {
        if options.view_type != view_type {
            return Err(Error::new(
                ErrorKind::ConfigInvalid,
                format!("options are for the {} view", options.view_type),
            )
            .with_operation("view::build")
            .with_context("view", view_type.as_str()));
        }
        let started = Instant::now();
        let source = self.prepare(data, options)?;
        let view = self.assemble(&source, filter, options)?;
        info!(
            view = view_type.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            diagram = view.diagram_text().is_some(),
            "view built"
        );
        Ok(view)
    }

    /// Ask the renderer for both output formats of a view.
    ///
    /// Views that carry a message have nothing to render.
    pub fn run_renderer<R: DiagramRenderer + ?Sized>(
        &self,
        view: &ViewDescription,
        renderer: &R,
    ) -> Result<Option<RenderOutput>> {
        let Some(diagram_text) = view.diagram_text() else {
            return Ok(None);
        };
        let to_stage = in_stage(STAGE_RENDER, view.view_type);
        let svg = renderer.render(diagram_text, RenderFormat::Svg).map_err(&to_stage)?;
        let map = renderer
            .render(diagram_text, RenderFormat::Cmapx)
            .map_err(&to_stage)?;
        Ok(Some(RenderOutput { svg, map }))
    }

    /// Join renderer output with the view's side table.
    pub fn attach_render(
        &self,
        view: &ViewDescription,
        output: RenderOutput,
    ) -> Result<Option<RenderedView>> {
        let Some(side_table) = view.side_table() else {
            return Ok(None);
        };
        let areas = parse_image_map(&output.map, side_table)
            .map_err(in_stage(STAGE_RENDER, view.view_type))?;
        Ok(Some(RenderedView {
            svg: output.svg,
            areas,
        }))
    }

    /// Render a view's diagram text to SVG plus clickable areas.
    pub fn render<R: DiagramRenderer + ?Sized>(
        &self,
        view: &ViewDescription,
        renderer: &R,
    ) -> Result<Option<RenderedView>> {
        match self.run_renderer(view, renderer)? {
            Some(output) => self.attach_render(view, output),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssemblyInfo, Reflected};
    use asmgraph_core::NodeId;
    use pretty_assertions::assert_eq;

    fn chain() -> ViewData {
        let mut reflected = Reflected::new();
        for (name, refs) in [("A", vec!["B"]), ("B", vec!["C"])] {
            reflected.assemblies.insert(
                name.to_string(),
                AssemblyInfo {
                    referenced_assemblies: refs.into_iter().map(str::to_string).collect(),
                    types: Vec::new(),
                },
            );
        }
        ViewData {
            reflected,
            custom: Vec::new(),
        }
    }

    #[test]
    fn test_build_view_checks_options() {
        let assembler = ViewAssembler::new();
        let err = assembler
            .build_view(
                ViewType::Methods,
                &chain(),
                &GraphFilter::default(),
                &ViewOptions::new(ViewType::References),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_stage_errors_carry_view() {
        let assembler = ViewAssembler::new();
        let options = ViewOptions::new(ViewType::References);
        let source = assembler.prepare(&chain(), &options).unwrap();
        let mut filter = GraphFilter::all_visible(&source.built.tree);
        filter.set_leaf_visible(NodeId::assembly("Ghost").unwrap(), true);

        let mut edges = source.edges.clone();
        edges.add_or_update(
            NodeId::assembly("A").unwrap(),
            NodeId::assembly("Ghost").unwrap(),
            Vec::<String>::new(),
            true,
        );
        let broken = GraphSource {
            built: source.built.clone(),
            edges,
        };
        let err = assembler.assemble(&broken, &filter, &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.operation(), STAGE_VISIBILITY);
        assert_eq!(err.context_value("view"), Some("references"));
    }

    #[test]
    fn test_render_passes_failures_through() {
        let assembler = ViewAssembler::new();
        let options = ViewOptions::new(ViewType::References);
        let source = assembler.prepare(&chain(), &options).unwrap();
        let filter = GraphFilter::all_visible(&source.built.tree);
        let view = assembler.assemble(&source, &filter, &options).unwrap();

        let failing =
            |_: &str, _: RenderFormat| -> Result<String> { Err(Error::render_failed("dot crashed")) };
        let err = assembler.render(&view, &failing).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RenderFailed);
        assert_eq!(err.message(), "dot crashed");
        assert_eq!(err.operation(), STAGE_RENDER);
    }

    #[test]
    fn test_message_views_are_not_rendered() {
        let assembler = ViewAssembler::new();
        let options = ViewOptions::new(ViewType::References).with_limits(1, 1);
        let source = assembler.prepare(&chain(), &options).unwrap();
        let filter = GraphFilter::all_visible(&source.built.tree);
        let view = assembler.assemble(&source, &filter, &options).unwrap();
        assert!(matches!(view.content, DiagramContent::Message(_)));

        let renderer = |_: &str, _: RenderFormat| -> Result<String> { panic!("must not render") };
        assert_eq!(assembler.render(&view, &renderer).unwrap(), None);
    }
}

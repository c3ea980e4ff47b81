//! A display session: loaded data, persisted state and the renderer.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use asmgraph_core::{GraphFilter, ViewOptions, ViewType};
use asmgraph_error::{Error, Result};
use tracing::debug;

use crate::assembler::{RenderedView, ViewAssembler, ViewDescription};
use crate::model::ViewData;
use crate::render::{DiagramRenderer, RenderOutput, RenderTicket, RenderTracker};
use crate::store::{FilterRepository, TableStore};
use crate::views::GraphSource;

/// A view as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownView {
    pub view: ViewDescription,
    /// `None` for message views and for renders that were superseded.
    pub rendered: Option<RenderedView>,
}

/// A view whose render was requested but whose output is not applied yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRender {
    pub ticket: RenderTicket,
    pub view: ViewDescription,
}

pub struct ViewSession<S, R> {
    data: ViewData,
    store: S,
    renderer: R,
    assembler: ViewAssembler,
    tracker: RenderTracker,
    /// Built trees keyed by view type and grouping, valid until `reload`.
    sources: HashMap<(ViewType, String), GraphSource>,
    /// Last applied render per view.
    shown: HashMap<ViewType, ShownView>,
}

impl<S: TableStore, R: DiagramRenderer> ViewSession<S, R> {
    pub fn new(data: ViewData, store: S, renderer: R) -> Self {
        Self::with_assembler(data, store, renderer, ViewAssembler::new())
    }

    pub fn with_assembler(data: ViewData, store: S, renderer: R, assembler: ViewAssembler) -> Self {
        Self {
            data,
            store,
            renderer,
            assembler,
            tracker: RenderTracker::new(),
            sources: HashMap::new(),
            shown: HashMap::new(),
        }
    }

    /// Replace the loaded data; every built tree is dropped.
    pub fn reload(&mut self, data: ViewData) {
        debug!(cached = self.sources.len(), "reloading view data");
        self.data = data;
        self.sources.clear();
    }

    pub fn tracker(&self) -> &RenderTracker {
        &self.tracker
    }

    pub fn shown(&self, view_type: ViewType) -> Option<&ShownView> {
        self.shown.get(&view_type)
    }

    fn repository(&self) -> FilterRepository<'_> {
        FilterRepository::new(&self.store)
    }

    pub fn options(&self, view_type: ViewType) -> Result<ViewOptions> {
        self.repository().load_options(view_type)
    }

    pub fn set_options(&self, options: &ViewOptions) -> Result<()> {
        self.repository().save_options(options)
    }

    /// The stored filter, or everything visible when none was stored.
    pub fn filter(&mut self, view_type: ViewType) -> Result<GraphFilter> {
        let options = self.options(view_type)?;
        if let Some(filter) = self.repository().load_filter(&options)? {
            return Ok(filter);
        }
        let source = cached_source(&mut self.sources, &self.assembler, &self.data, &options)?;
        let mut filter = GraphFilter::all_visible(&source.built.tree);
        filter.is_check_model_all = options.has_parent_edges;
        Ok(filter)
    }

    pub fn update_filter(&self, view_type: ViewType, filter: &GraphFilter) -> Result<()> {
        let options = self.options(view_type)?;
        self.repository().save_filter(&options, filter)
    }

    /// Build a view with its stored options and filter and start its render.
    ///
    /// A render begun earlier for the same view is superseded.
    pub fn begin_render(&mut self, view_type: ViewType) -> Result<PendingRender> {
        let options = self.options(view_type)?;
        let filter = self.filter(view_type)?;
        let source = cached_source(&mut self.sources, &self.assembler, &self.data, &options)?;
        let view = self.assembler.assemble(source, &filter, &options)?;
        let ticket = self.tracker.begin(view_type);
        Ok(PendingRender { ticket, view })
    }

    /// Apply renderer output to the pending view.
    ///
    /// Returns `None` and leaves the shown view untouched when the render
    /// was superseded or cancelled.
    pub fn complete_render(
        &mut self,
        pending: PendingRender,
        output: RenderOutput,
    ) -> Result<Option<&ShownView>> {
        let view_type = pending.ticket.view();
        if !self.tracker.finish(pending.ticket) {
            return Ok(None);
        }
        let rendered = self.assembler.attach_render(&pending.view, output)?;
        self.shown.insert(
            view_type,
            ShownView {
                view: pending.view,
                rendered,
            },
        );
        Ok(self.shown.get(&view_type))
    }

    /// Build and render a view with the session's own renderer.
    pub fn show(&mut self, view_type: ViewType) -> Result<ShownView> {
        let pending = self.begin_render(view_type)?;
        let output = match self.assembler.run_renderer(&pending.view, &self.renderer) {
            Ok(output) => output.unwrap_or_default(),
            Err(err) => {
                self.tracker.cancel(view_type);
                return Err(err);
            }
        };
        self.complete_render(pending, output)?
            .cloned()
            .ok_or_else(|| Error::unexpected("render superseded while shown synchronously"))
    }
}

fn cached_source<'a>(
    sources: &'a mut HashMap<(ViewType, String), GraphSource>,
    assembler: &ViewAssembler,
    data: &ViewData,
    options: &ViewOptions,
) -> Result<&'a GraphSource> {
    let source: &GraphSource = match sources.entry((options.view_type, options.cluster_by())) {
        Entry::Occupied(entry) => entry.into_mut(),
        Entry::Vacant(entry) => entry.insert(assembler.prepare(data, options)?),
    };
    Ok(source)
}

//! The external render collaborator and per-view render bookkeeping.

use std::collections::HashMap;

use asmgraph_core::ViewType;
use asmgraph_error::Result;
use parking_lot::Mutex;
use strum_macros::{Display, EnumString, IntoStaticStr};
use tracing::debug;

/// Output formats requested from the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum RenderFormat {
    Svg,
    /// Client-side image map.
    Cmapx,
}

/// Turns diagram text into an output document. Failures are passed through
/// unchanged and never retried.
pub trait DiagramRenderer {
    fn render(&self, diagram_text: &str, format: RenderFormat) -> Result<String>;
}

impl<F> DiagramRenderer for F
where
    F: Fn(&str, RenderFormat) -> Result<String>,
{
    fn render(&self, diagram_text: &str, format: RenderFormat) -> Result<String> {
        self(diagram_text, format)
    }
}

/// What the renderer produced for one diagram.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutput {
    pub svg: String,
    /// Client-side image map markup.
    pub map: String,
}

/// Handle for one render request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTicket {
    view: ViewType,
    generation: u64,
}

impl RenderTicket {
    pub fn view(&self) -> ViewType {
        self.view
    }
}

#[derive(Debug, Default)]
struct RenderSlot {
    generation: u64,
    pending: bool,
}

/// At most one render in flight per view; a newer request supersedes the
/// older one, whose result is then dropped.
#[derive(Debug, Default)]
pub struct RenderTracker {
    slots: Mutex<HashMap<ViewType, RenderSlot>>,
}

impl RenderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, view: ViewType) -> RenderTicket {
        let mut slots = self.slots.lock();
        let slot = slots.entry(view).or_default();
        if slot.pending {
            debug!(view = view.as_str(), "superseding pending render");
        }
        slot.generation += 1;
        slot.pending = true;
        RenderTicket {
            view,
            generation: slot.generation,
        }
    }

    /// Returns `false` when the ticket was superseded or cancelled.
    pub fn finish(&self, ticket: RenderTicket) -> bool {
        let mut slots = self.slots.lock();
        match slots.get_mut(&ticket.view) {
            Some(slot) if slot.pending && slot.generation == ticket.generation => {
                slot.pending = false;
                true
            }
            _ => {
                debug!(view = ticket.view.as_str(), "dropping stale render result");
                false
            }
        }
    }

    pub fn is_pending(&self, view: ViewType) -> bool {
        self.slots.lock().get(&view).is_some_and(|slot| slot.pending)
    }

    pub fn cancel(&self, view: ViewType) {
        if let Some(slot) = self.slots.lock().get_mut(&view) {
            slot.generation += 1;
            slot.pending = false;
        }
    }
}

//! Builds the references, methods, apis and custom views from loaded data
//! and drives them through filtering, projection and rendering.

pub mod assembler;
pub mod model;
pub mod render;
pub mod session;
pub mod store;
pub mod views;

pub use assembler::{DiagramContent, RenderedView, ViewAssembler, ViewDescription};
pub use model::{
    AssemblyInfo, CustomNode, DATA_VERSION, MethodInfo, MethodRef, Parsed, Reflected, TypeInfo,
    ViewData,
};
pub use render::{DiagramRenderer, RenderFormat, RenderOutput, RenderTicket, RenderTracker};
pub use session::{PendingRender, ShownView, ViewSession};
pub use store::{DataLoader, FilterRepository, MemoryStore, ReflectionBackend, TableStore};
pub use views::{GraphSource, build_source};

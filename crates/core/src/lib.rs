//! Core domain types, layout decisions, image slot planning and the
//! immutable template/pedagogy registries shared by the deck renderers.

pub mod error;
pub mod layout;
pub mod outline;
pub mod pedagogy;
pub mod registry;
pub mod slots;
pub mod style;
pub mod types;

pub use error::{Error, Result};
pub use layout::{LayoutEngine, LayoutFamily, LayoutId, LayoutInfo, RenderBranch};
pub use outline::{outline_to_pages, OutlinePage};
pub use pedagogy::{PedagogyDefinition, PedagogyPhase, PedagogyRegistry, DEFAULT_PEDAGOGY_ID};
pub use registry::{
    Scene, TemplateDefinition, TemplateRegistry, DEFAULT_TEMPLATE_ID, RENDER_TEMPLATE_ID,
};
pub use slots::{SlotGeometry, SlotPlanner};
pub use style::{StyleCategory, StyleConfig};
pub use types::{
    check_page_order, renumber_pages, ElementContent, ElementType, ImageSlotRequest, Rect,
    RenderResult, SlideElement, SlidePage, SlideType, VisualStyle,
};

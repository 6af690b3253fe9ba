//! Label canvas documents, placeholder substitution, print planning and GS1
//! identifiers.

pub mod canvas;
pub mod gs1;
pub mod print;
pub mod render;

pub use canvas::{CanvasDesign, Element, ElementType, CANVAS_VERSION};
pub use print::{impose, plan_label_counts, Imposition, LevelLabelCount, PaperSize};
pub use render::{placeholders, render, substitute, RenderedElement, RenderedLabel, PX_PER_MM};

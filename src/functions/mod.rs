pub mod color;
pub mod geometry;
pub mod morphology;
pub mod registry;
pub mod scale;
pub mod traits;

pub use registry::PrimitiveRegistry;
pub use traits::{Direction, GridPrimitive, ParamKind, ParamSpec};

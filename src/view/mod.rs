pub mod adapter;
pub mod memory;
pub mod surface;

pub use adapter::{CachedNode, ViewAction, ViewAdapter};
pub use memory::MemorySurface;
pub use surface::{RenderSurface, SurfaceEvent};

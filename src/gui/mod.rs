pub mod frontend;
pub mod surface;

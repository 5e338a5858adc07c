pub mod gradient;
pub mod groups;
pub mod resolver;

pub use resolver::{resolve, restyle, StyleFlags, StyledNode};

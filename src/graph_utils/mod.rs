pub mod builder;
pub mod entity;
pub mod graph;
pub mod payload;
pub mod scores;

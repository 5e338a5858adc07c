pub mod error;
pub mod graph_utils;
pub mod gui;
pub mod persistence;
pub mod remote;
pub mod selection;
pub mod session;
pub mod style;
pub mod view;

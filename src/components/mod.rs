//! Ratatui widgets for the workspace panes and overlays.

pub mod dialog;
pub mod source_control;
pub mod status_bar;
pub mod tab_strip;
pub mod terminal;
pub mod tree;

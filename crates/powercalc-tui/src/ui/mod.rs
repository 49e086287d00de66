//! Terminal UI module using ratatui.
//!
//! - `render`: Frame layout, the calculator form and overlays
//! - `input`: Keyboard event handling
//! - `styles`: Color scheme and text styling

pub mod input;
pub mod render;
pub mod styles;

// Presentation layer - HTTP surface for the host evaluation driver
pub mod app_state;
pub mod handlers;

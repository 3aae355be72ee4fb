pub mod app;
pub mod printer;
pub mod theme;
pub mod tui;

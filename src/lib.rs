//! Stack-based navigation for on-screen-display setting menus.
//!
//! Menus are static tables of entries held in a [`menu::MenuTable`]. The
//! [`nav::Engine`] keeps a bounded stack of open menus, turns gestures into
//! cursor moves and edits, and reaches settings only through a
//! [`binding::Binding`] over a [`settings::SettingsStore`].

pub mod binding;
pub mod check;
pub mod config;
pub mod error;
pub mod menu;
pub mod nav;
pub mod render;
pub mod settings;
pub mod topology;

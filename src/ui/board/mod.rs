//! Interactive terminal board: search bar, collapsible status sections and a
//! stats footer, driven by a [`crate::store::TaskStore`] subscription.

pub mod app;
pub mod model;
pub mod view;

pub use app::run;

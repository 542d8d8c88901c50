pub mod actions;
pub mod config;
pub mod few_shot;
pub mod modes;
pub mod prompt;
pub mod reducer;
pub mod state;
pub mod submission;
pub mod templates;

pub use actions::*;
pub use reducer::*;
pub use state::*;

pub mod adapters;
pub mod contracts;
pub mod executor;
pub mod runtime;

pub use adapters::*;
pub use contracts::*;
pub use executor::*;
pub use runtime::ConsoleRuntime;

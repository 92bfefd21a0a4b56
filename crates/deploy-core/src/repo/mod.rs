pub mod types;

pub use types::{InMemoryRunRepository, RunInstance, RunRepository, UnitSlot};

//! Secuenciador de despliegues: núcleo, builder y contexto de run.

pub mod builder;
pub mod core;
pub mod run_ctx;

pub use builder::SequencerBuilderInit;
pub use self::core::{RunSummary, Sequencer};
pub use run_ctx::RunCtx;

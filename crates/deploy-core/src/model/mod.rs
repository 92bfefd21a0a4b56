//! Modelos neutrales (CompiledArtifact, DeploymentRecord).

pub mod artifact;
pub mod record;

pub use artifact::CompiledArtifact;
pub use record::DeploymentRecord;

//! Core types for the generation pipeline
//!
//! This module contains the request, response and artifact types shared by
//! the prompt builder, provider clients, orchestrator and extractor.

mod infra;
mod request;
mod artifact;
mod cancellation;

pub use infra::{InfraType, UnknownInfraType};
pub use request::{CloudContext, GenerationOptions, GenerationRequest, Revision};
pub use artifact::{GeneratedArtifact, ProviderResponse};
pub use cancellation::CancellationToken;

//! Referral fraud risk engine. Gathers independent evidence signals about
//! a candidate referral signup, combines them into a calibrated risk
//! score, and emits an actionable decision.

pub mod detectors;
pub mod email;
pub mod engine;
pub mod error;
pub mod graph;
pub mod memory;
pub mod policy;
pub mod reference;
pub mod repository;
pub mod scorer;

pub use engine::RiskEngine;
pub use error::{EngineError, Result};
pub use memory::MemoryEvidenceRepository;
pub use reference::ReferenceData;
pub use repository::{DeviceMatch, EvidenceRepository};

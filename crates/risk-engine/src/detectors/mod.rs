//! Independent signal detectors, one module per category. Each is a pure
//! read of (context, repository snapshot) producing zero or more signals;
//! persistence happens once, centrally, in the assembler.

pub mod account;
pub mod behavioral;
pub mod device;
pub mod network;
pub mod pattern;

use chrono::{DateTime, Utc};
use common_models::{DeviceFingerprint, SignupRequest};

/// Immutable per-assessment inputs shared by every detector.
pub struct DetectorContext<'a> {
    pub request: &'a SignupRequest,
    pub fingerprint: &'a DeviceFingerprint,
    /// Captured once by the assembler so all detectors agree on "now".
    pub now: DateTime<Utc>,
}

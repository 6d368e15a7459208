// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod calibration;
pub mod fingerprint;
pub mod secrets;
pub mod waf;

pub use calibration::{
    matches_signature, perform_calibration, CalibrationCache, ResponseSignature,
};
pub use fingerprint::{detect_tech_names, detect_technologies, TechCategory, TechMatch};
pub use secrets::{
    detect_secrets, detect_secrets_detailed, redact_secret, shannon_entropy, SecretMatch, Severity,
};
pub use waf::{detect_waf, detect_waf_from_body};

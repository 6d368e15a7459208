// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod html;
pub mod json;

pub use html::generate_html;
pub use json::{
    count_by_status, generate_run_id, hash_targets, save_json, save_json_report, sort_results,
    ScanMetadata, ScanReport, StatusCounts,
};

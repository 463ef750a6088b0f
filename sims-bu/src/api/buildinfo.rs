//! GET /api/buildinfo

use axum::response::Json;
use serde::Serialize;

/// Identification of the running binary, captured by `build.rs`
#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub module: &'static str,
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
    pub build_profile: &'static str,
}

impl BuildInfo {
    pub const CURRENT: BuildInfo = BuildInfo {
        module: "sims-bu",
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("GIT_HASH"),
        build_timestamp: env!("BUILD_TIMESTAMP"),
        build_profile: env!("BUILD_PROFILE"),
    };
}

pub async fn get_build_info() -> Json<BuildInfo> {
    Json(BuildInfo::CURRENT)
}

//! Build metadata for the startup banner.

/// Package version, commit and build time in one banner-ready line.
pub fn startup_metadata_line() -> String {
    format!(
        "v{} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("REPLBOX_BUILD_GIT_HASH"),
        env!("REPLBOX_BUILD_TIMESTAMP")
    )
}

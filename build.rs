//! Embeds the commit hash and build time for the startup banner. Falls
//! back to "unknown" when git is unavailable.

use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rustc-env=REPLBOX_BUILD_GIT_HASH={}", git_short_hash());
    println!(
        "cargo:rustc-env=REPLBOX_BUILD_TIMESTAMP={}",
        build_timestamp()
    );
}

fn git_short_hash() -> String {
    Command::new("git")
        .args(["rev-parse", "--short=12", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .filter(|hash| !hash.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn build_timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => format!("unix:{}", duration.as_secs()),
        Err(_) => "unknown".to_string(),
    }
}

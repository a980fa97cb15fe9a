use std::env;
use std::process::Command;

fn main() {
    // Packaged builds have no .git; let them pass the revision in.
    println!("cargo:rerun-if-env-changed=NVSMI_GIT_SHA");
    let revision = env::var("NVSMI_GIT_SHA")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(git_revision)
        .unwrap_or_else(|| "unknown".into());

    println!("cargo:rustc-env=NVSMI_GIT_SHA={}", revision.trim());
    println!("cargo:rerun-if-changed=../../.git/HEAD");
}

fn git_revision() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=8"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

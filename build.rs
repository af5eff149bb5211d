use std::process::Command;

/// Short commit hash reported by the health endpoint, `-dirty` when the
/// work tree has local changes, `unknown` outside a git checkout.
fn git_hash() -> String {
    let head = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success());

    let Some(head) = head else {
        return "unknown".to_string();
    };
    let hash = String::from_utf8_lossy(&head.stdout).trim().to_string();

    let dirty = Command::new("git")
        .args(["diff", "--quiet"])
        .output()
        .map(|o| !o.status.success())
        .unwrap_or(false);

    if dirty { format!("{hash}-dirty") } else { hash }
}

fn main() {
    println!("cargo:rustc-env=GIT_HASH={}", git_hash());
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
}

use std::process::Command;

fn capture(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn main() {
    let git_hash = capture("git", &["rev-parse", "--short", "HEAD"]);
    let tagged = capture("git", &["describe", "--exact-match", "--tags", "HEAD"]).is_some();

    // Untagged builds carry the commit so bug reports identify the binary
    let suffix = match (&git_hash, tagged) {
        (_, true) => String::new(),
        (Some(hash), false) => format!("-dev.{}", hash),
        (None, false) => "-dev".to_string(),
    };

    println!("cargo:rustc-env=ECOSPATIAL_VERSION_SUFFIX={}", suffix);
    println!(
        "cargo:rustc-env=ECOSPATIAL_GIT_HASH={}",
        git_hash.as_deref().unwrap_or("unknown")
    );

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
}

// Shared build script helper that turns a crate's README.md into its
// crate-level rustdoc. Include it with: include!("../build_common.rs");
//
// The including build.rs must import std::env, std::fs and std::path::Path.

/// Write `README_GENERATED.md` into `OUT_DIR` for `#![doc = include_str!(...)]`.
///
/// Link rewrites:
/// 1. `](src/foo.rs)` becomes `](foo)` so rustdoc resolves the module
/// 2. `](../../README.md` becomes the workspace repository URL
///
/// A crate without a README gets its package description instead, so the
/// `include_str!` in `lib.rs` always has a file to read.
fn process_readme_for_rustdoc(crate_dir: &str) {
    println!("cargo:rerun-if-changed=README.md");
    println!("cargo:rerun-if-changed=../../Cargo.toml");

    let readme_path = Path::new(crate_dir).join("README.md");
    let rustdoc_content = match fs::read_to_string(&readme_path) {
        Ok(content) => rewrite_readme_links(&content, get_workspace_repo_url(crate_dir).as_deref()),
        Err(_) => env::var("CARGO_PKG_DESCRIPTION").unwrap_or_default(),
    };

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    let dest_path = Path::new(&out_dir).join("README_GENERATED.md");
    fs::write(dest_path, rustdoc_content).expect("failed to write README_GENERATED.md");
}

fn rewrite_readme_links(content: &str, repo_url: Option<&str>) -> String {
    let rewritten = content.replace("](src/", "](").replace(".rs)", ")");
    match repo_url {
        Some(url) => rewritten.replace("](../../README.md", &format!("]({url}")),
        None => rewritten,
    }
}

/// Read `repository = "..."` from the workspace Cargo.toml.
fn get_workspace_repo_url(crate_dir: &str) -> Option<String> {
    let workspace_toml = Path::new(crate_dir)
        .parent()? // crates/
        .parent()? // workspace root
        .join("Cargo.toml");

    let content = fs::read_to_string(workspace_toml).ok()?;
    content.lines().map(str::trim).find_map(|line| {
        let value = line.strip_prefix("repository")?.trim_start().strip_prefix('=')?;
        let value = value.trim().strip_prefix('"')?;
        let end = value.find('"')?;
        Some(value[..end].to_string())
    })
}

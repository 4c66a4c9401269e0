//! Keeps the crate-root doc URL and README-quoted version in lockstep with `Cargo.toml`.

#[test]
fn html_root_url_matches_cargo_toml() {
    version_sync::assert_html_root_url_updated!("src/lib.rs");
}

#[test]
fn readme_deps_match_cargo_toml() {
    version_sync::assert_markdown_deps_updated!("README.md");
}

use std::fs;
use std::path::{Path, PathBuf};

/// Every `.rs` file under `src/`, as (path relative to `src/`, contents)
fn crate_sources() -> Vec<(String, String)> {
    let src_root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src");
    let mut sources = Vec::new();
    walk(&src_root, &src_root, &mut sources);
    sources.sort();
    sources
}

fn walk(root: &Path, dir: &Path, sources: &mut Vec<(String, String)>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|entry| entry.path()) {
        if path.is_dir() {
            walk(root, &path, sources);
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("rs") {
            continue;
        }
        if let (Ok(relative), Ok(contents)) = (path.strip_prefix(root), fs::read_to_string(&path)) {
            let relative = relative.to_string_lossy().replace('\\', "/");
            sources.push((relative, contents));
        }
    }
}

/// Files outside `allowed` that mention any of `needles`
fn offenders(allowed: &[&str], needles: &[&str]) -> Vec<String> {
    crate_sources()
        .into_iter()
        .filter(|(path, _)| !allowed.contains(&path.as_str()))
        .filter(|(_, contents)| needles.iter().any(|needle| contents.contains(needle)))
        .map(|(path, _)| path)
        .collect()
}

#[test]
fn only_feed_cache_touches_cache_backends() {
    let offenders = offenders(
        &["cache.rs"],
        &["backend.get(", "backend.set(", "backend.remove(", "redis::cmd("],
    );
    assert!(
        offenders.is_empty(),
        "Cache state must only be read or written through FeedCache. Offenders: {:?}",
        offenders
    );
}

#[test]
fn write_paths_never_invalidate_feed_cache() {
    let offenders = offenders(
        &["cache.rs", "services/feed.rs", "bin/feed_cache_admin.rs"],
        &[".invalidate("],
    );
    assert!(
        offenders.is_empty(),
        "Global feed staleness is TTL-bounded; write paths must not invalidate. Offenders: {:?}",
        offenders
    );
}

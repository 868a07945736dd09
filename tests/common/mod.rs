// tests/common/mod.rs

//! Shared test fixtures for integration tests.

use relic::{ArtifactRegistry, Index, Platform, RuleStore};
use std::collections::BTreeSet;
use std::fs;
use tempfile::TempDir;

/// A complete porting-project snapshot: index, rules, artifacts, platform.
///
/// Keep the TempDir alive for the duration of the test.
pub struct Fixture {
    pub index: Index,
    pub rules: RuleStore,
    pub artifacts: ArtifactRegistry,
    pub platform: Platform,
    pub _dir: TempDir,
}

/// Build a small but representative project around target `httpd`:
///
/// - `apr`, `libxml2`, `python3`, `sqlite` need rules
/// - `python3` and `sqlite` form a build cycle
/// - `pcre2` has authored rules, not built yet
/// - `zlib-ng` is built and smoke-tested, `openssl` built unverified
/// - `vendor-jdk` comes from a non-standard origin
/// - `gtk3` is excluded by the "desktop" roadmap category
/// - systemd requirements are dropped by the built-in heuristics
/// - `/usr/bin/sh` and `glibc-devel` come from the sysroot
pub fn porting_project() -> Fixture {
    let index = Index::open_in_memory().unwrap();

    for req in [
        "apr-devel",
        "pcre2-devel",
        "zlib-devel",
        "openssl-devel",
        "systemd-devel",
        "(pkgconfig(libxml-2.0) >= 2.9 if libxml2-devel)",
        "/usr/bin/sh",
        "glibc-devel",
        "mystery-devel",
        "python3-devel",
        "gtk3-devel",
        "java-sdk",
    ] {
        index.add_buildrequires("httpd", req).unwrap();
    }

    index.add_provides("apr-devel", "apr", "base").unwrap();
    index.add_provides("pcre2-devel", "pcre2", "base").unwrap();
    index.add_provides("zlib-devel", "zlib-ng", "updates").unwrap();
    index.add_provides("openssl-devel", "openssl", "base").unwrap();
    index
        .add_provides("pkgconfig(libxml-2.0)", "libxml2", "base")
        .unwrap();
    index.add_provides("python3-devel", "python3", "base").unwrap();
    index.add_provides("sqlite-devel", "sqlite", "base").unwrap();
    index.add_provides("gtk3-devel", "gtk3", "base").unwrap();
    index.add_provides("java-sdk", "vendor-jdk", "base").unwrap();
    index.add_provides("readline-devel", "readline", "base").unwrap();

    index.add_buildrequires("apr", "autoconf").unwrap();
    index.add_buildrequires("libxml2", "zlib-devel").unwrap();
    index.add_buildrequires("python3", "sqlite-devel").unwrap();
    index.add_buildrequires("sqlite", "python3-devel").unwrap();
    index.add_buildrequires("pcre2", "readline-devel").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let rules_dir = dir.path().join("rules");
    fs::create_dir_all(rules_dir.join("packages")).unwrap();
    fs::write(
        rules_dir.join("generic.toml"),
        "drop_buildrequires = [\"*-doc\", \"rpmlint\"]\n",
    )
    .unwrap();
    fs::write(rules_dir.join("packages/pcre2.toml"), "").unwrap();
    fs::write(
        rules_dir.join("packages/zlib-ng.toml"),
        "smoke_test = true\n",
    )
    .unwrap();
    let rules = RuleStore::load(&rules_dir).unwrap();

    let built: BTreeSet<String> = ["zlib-ng".to_string(), "openssl".to_string()]
        .into_iter()
        .collect();
    let artifacts = ArtifactRegistry::from_built(built, &rules);

    let platform_path = dir.path().join("platform.toml");
    fs::write(
        &platform_path,
        r#"
[sysroot]
capabilities = ["glibc-devel"]
files = ["/usr/bin/sh"]
libraries = ["libc.so.6"]

[nonfedora]
vendor-jdk = "vendor SDK drop"

[[roadmap_drop]]
name = "desktop"
patterns = ["gtk*", "gnome-*"]
"#,
    )
    .unwrap();
    let platform = Platform::load(&platform_path).unwrap();

    Fixture {
        index,
        rules,
        artifacts,
        platform,
        _dir: dir,
    }
}

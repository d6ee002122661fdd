//! Registry of logical file names and their expected hashes.
//!
//! The on-disk format is one `<name> <hash>` pair per line. Blank lines
//! and lines starting with `#` are ignored. A load either merges every
//! entry of the file or none of them.

use crate::checksum::{self, Algorithm};
use crate::error::{Error, Result};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Component, Path};
use walkdir::WalkDir;

/// Mapping from file name to expected hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    entries: BTreeMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash registered for `name`, or [`Error::UnknownFile`].
    pub fn lookup(&self, name: &str) -> Result<&str> {
        self.entries
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownFile {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Add or replace an entry. Hashes are stored lowercase.
    pub fn insert(&mut self, name: impl Into<String>, hash: impl AsRef<str>) {
        self.entries
            .insert(name.into(), hash.as_ref().to_ascii_lowercase());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.entries.iter()
    }

    /// Merge the entries of a registry file into this registry.
    ///
    /// The file is parsed completely before anything is merged, so a
    /// malformed line leaves the registry untouched.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path)?;
        let parsed = parse_registry(&text, path)?;
        tracing::debug!(path = %path.display(), entries = parsed.len(), "loaded registry file");
        self.entries.extend(parsed);
        Ok(())
    }

    /// Read a registry file into a new registry.
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut registry = Self::new();
        registry.load(path)?;
        Ok(registry)
    }
}

impl<K: Into<String>, V: AsRef<str>> FromIterator<(K, V)> for Registry {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut registry = Registry::new();
        for (name, hash) in iter {
            registry.insert(name, hash);
        }
        registry
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Check that `name` is a `/`-separated relative path that stays inside
/// the store: no empty, `.`, `..` or root parts.
pub fn validate_name(name: &str) -> Result<()> {
    let inside = !name.is_empty()
        && name.split('/').all(|part| {
            let mut components = Path::new(part).components();
            matches!(
                (components.next(), components.next()),
                (Some(Component::Normal(c)), None) if c == part
            )
        });
    if inside {
        Ok(())
    } else {
        Err(Error::InvalidName {
            name: name.to_string(),
        })
    }
}

fn parse_registry(text: &str, path: &Path) -> Result<BTreeMap<String, String>> {
    let mut parsed = BTreeMap::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 2 {
            return Err(Error::MalformedRegistry {
                path: path.to_path_buf(),
                line: index + 1,
                tokens: tokens.len(),
            });
        }
        let (name, hash) = (tokens[0], tokens[1]);
        validate_name(name)?;
        if parsed
            .insert(name.to_string(), hash.to_ascii_lowercase())
            .is_some()
        {
            tracing::warn!(name, line = index + 1, "duplicate registry entry, keeping the later one");
        }
    }
    Ok(parsed)
}

/// Write a registry file covering every file in `dir`.
///
/// Names are relative to `dir`, use `/` as separator and are sorted.
/// Subdirectories are only descended when `recursive` is set.
pub fn make_registry(dir: &Path, output: &Path, recursive: bool) -> Result<Registry> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut registry = Registry::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(max_depth) {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(std::io::Error::other)?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let hash = checksum::hash_of(entry.path(), Algorithm::Sha256)?;
        registry.insert(name, hash);
    }

    let mut out = fs::File::create(output)?;
    for (name, hash) in &registry {
        writeln!(out, "{} {}", name, hash)?;
    }
    out.flush()?;
    tracing::info!(
        dir = %dir.display(),
        output = %output.display(),
        entries = registry.len(),
        "wrote registry"
    );
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY_HASH: &str = "baee0894dba14b12085eacb204284b97e362f4f3e5a5807693cc90ef415c1b2d";

    fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let p = dir.join(name);
        fs::write(&p, contents).unwrap();
        p
    }

    #[test]
    fn lookup_unknown_name_fails() {
        let registry: Registry = [("tiny-data.txt", TINY_HASH)].into_iter().collect();
        assert_eq!(registry.lookup("tiny-data.txt").unwrap(), TINY_HASH);
        match registry.lookup("this-file-does-not-exist.csv") {
            Err(Error::UnknownFile { name }) => assert_eq!(name, "this-file-does-not-exist.csv"),
            other => panic!("expected UnknownFile, got {:?}", other),
        }
    }

    #[test]
    fn load_well_formed_file_equals_literal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "registry.txt",
            &format!(
                "# comment line\n\ntiny-data.txt {}\n  subdir/tiny-data.txt\t{}  \n",
                TINY_HASH,
                TINY_HASH.to_uppercase()
            ),
        );
        let registry = Registry::from_file(&path).unwrap();
        let expected: Registry = [
            ("tiny-data.txt", TINY_HASH),
            ("subdir/tiny-data.txt", TINY_HASH),
        ]
        .into_iter()
        .collect();
        assert_eq!(registry, expected);
    }

    #[test]
    fn load_rejects_line_with_wrong_token_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "registry-invalid.txt",
            &format!("tiny-data.txt {}\nstore.zip\n", TINY_HASH),
        );
        let mut registry: Registry = [("existing.txt", "00")].into_iter().collect();
        let before = registry.clone();
        match registry.load(&path) {
            Err(Error::MalformedRegistry { line, tokens, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(tokens, 1);
            }
            other => panic!("expected MalformedRegistry, got {:?}", other),
        }
        assert_eq!(registry, before);
    }

    #[test]
    fn load_rejects_three_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "r.txt", "a.txt 00 extra\n");
        assert!(matches!(
            Registry::from_file(&path),
            Err(Error::MalformedRegistry { tokens: 3, .. })
        ));
    }

    #[test]
    fn load_rejects_names_leaving_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "r.txt", "a.txt 11\n../x.txt 22\n");
        let mut registry: Registry = [("existing.txt", "00")].into_iter().collect();
        let before = registry.clone();
        assert!(matches!(
            registry.load(&path),
            Err(Error::InvalidName { ref name }) if name == "../x.txt"
        ));
        assert_eq!(registry, before);
    }

    #[test]
    fn validate_name_accepts_only_relative_parts() {
        for ok in ["a.txt", "sub/dir/file.bin", "..hidden", "a.b/c"] {
            assert!(validate_name(ok).is_ok(), "{ok}");
        }
        for bad in ["", "..", "../a", "/etc/passwd", "a/../b", "./a", "a/", "a//b", "a/."] {
            assert!(matches!(validate_name(bad), Err(Error::InvalidName { .. })), "{bad}");
        }
    }

    #[test]
    fn load_merges_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "r.txt", "a.txt 11\nb.txt 22\n");
        let mut registry: Registry = [("a.txt", "00"), ("c.txt", "33")].into_iter().collect();
        registry.load(&path).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.lookup("a.txt").unwrap(), "11");
        assert_eq!(registry.lookup("c.txt").unwrap(), "33");
    }

    #[test]
    fn make_registry_round_trips() {
        let data = tempfile::tempdir().unwrap();
        write(data.path(), "tiny-data.txt", "# A tiny data file for test purposes only\n1  2  3  4  5  6\n");
        fs::create_dir(data.path().join("subdir")).unwrap();
        write(&data.path().join("subdir"), "other.txt", "other");

        let out = tempfile::tempdir().unwrap();
        let flat = out.path().join("flat.txt");
        let made = make_registry(data.path(), &flat, false).unwrap();
        assert_eq!(made.len(), 1);
        assert!(made.contains("tiny-data.txt"));

        let deep = out.path().join("deep.txt");
        let made = make_registry(data.path(), &deep, true).unwrap();
        assert_eq!(made.len(), 2);
        assert!(made.contains("subdir/other.txt"));
        assert_eq!(Registry::from_file(&deep).unwrap(), made);

        let text = fs::read_to_string(&deep).unwrap();
        let first = text.lines().next().unwrap();
        assert!(first.starts_with("subdir/other.txt "));
    }
}

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Error, Result};

/// How a target filename is derived from a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingPolicy {
    /// Keep the original base name; disambiguate collisions with a
    /// numbered variant, skip when the identical file is already there
    Preserve,

    /// Like `Preserve`, but rewrite the extension and never compare
    /// contents: an occupied name is always a collision
    ChangeExtension(String),

    /// `{secondary_id}.{md5-of-content}.{ext}`; an occupied name is
    /// treated as already copied and skipped without comparison
    Composite(String),
}

/// Outcome of target name resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingDecision {
    /// Nothing to do, the destination already holds this file
    Skip,

    /// Write to this path
    Use(PathBuf),
}

/// Compute a collision-safe destination filename for `source` in `dest_dir`.
///
/// Never returns a name occupied by different content, except for the
/// `Composite` policy's skip-without-verification shortcut. Decisions are
/// computed fresh on every call; nothing here is cached, which is what
/// makes interrupted runs safe to repeat.
pub fn resolve(
    source: &Path,
    dest_dir: &Path,
    policy: &NamingPolicy,
    config: &Config,
) -> Result<NamingDecision> {
    if !dest_dir.is_dir() {
        return Err(Error::InvalidDestination(dest_dir.to_path_buf()));
    }

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let source_ext = source
        .extension()
        .map(|e| e.to_string_lossy().into_owned());

    match policy {
        NamingPolicy::Preserve => {
            let mut candidate = match source.file_name() {
                Some(name) => dest_dir.join(name),
                None => return Err(Error::InvalidDestination(source.to_path_buf())),
            };
            let mut n = config.collision_start;
            while candidate.exists() {
                if identical(source, &candidate)? {
                    return Ok(NamingDecision::Skip);
                }
                candidate = numbered_variant(dest_dir, &stem, source_ext.as_deref(), n);
                n = n
                    .checked_add(1)
                    .ok_or_else(|| Error::CollisionUnresolvable(candidate.clone()))?;
            }
            Ok(NamingDecision::Use(candidate))
        }
        NamingPolicy::ChangeExtension(new_ext) => {
            let mut candidate = dest_dir.join(format!("{}.{}", stem, new_ext));
            let mut n = config.collision_start;
            while candidate.exists() {
                candidate = numbered_variant(dest_dir, &stem, Some(new_ext), n);
                n = n
                    .checked_add(1)
                    .ok_or_else(|| Error::CollisionUnresolvable(candidate.clone()))?;
            }
            Ok(NamingDecision::Use(candidate))
        }
        NamingPolicy::Composite(secondary_id) => {
            let ext = source_ext.as_deref().unwrap_or("tif");
            let hash = content_md5(source)?;
            let candidate = dest_dir.join(format!("{}.{}.{}", secondary_id, hash, ext));
            if candidate.exists() {
                return Ok(NamingDecision::Skip);
            }
            Ok(NamingDecision::Use(candidate))
        }
    }
}

/// `dest_dir/stem (n).ext`
fn numbered_variant(dest_dir: &Path, stem: &str, ext: Option<&str>, n: u32) -> PathBuf {
    match ext {
        Some(ext) => dest_dir.join(format!("{} ({}).{}", stem, n, ext)),
        None => dest_dir.join(format!("{} ({})", stem, n)),
    }
}

/// Full byte-for-byte comparison of two files.
///
/// A size mismatch short-circuits, but equal sizes still read both files
/// to the end; size or mtime alone never decides identity.
pub fn identical(a: &Path, b: &Path) -> Result<bool> {
    let meta_a = std::fs::metadata(a)?;
    let meta_b = std::fs::metadata(b)?;
    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }

    let mut reader_a = BufReader::new(File::open(a)?);
    let mut reader_b = BufReader::new(File::open(b)?);
    let mut buf_a = [0u8; 8192];
    let mut buf_b = [0u8; 8192];
    loop {
        let read_a = reader_a.read(&mut buf_a)?;
        let read_b = reader_b.read(&mut buf_b)?;
        if read_a != read_b || buf_a[..read_a] != buf_b[..read_b] {
            return Ok(false);
        }
        if read_a == 0 {
            return Ok(true);
        }
    }
}

/// Streaming MD5 of the full file content, as lowercase hex
pub fn content_md5(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut context = md5::Context::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        context.consume(&buffer[..bytes_read]);
    }
    Ok(format!("{:x}", context.compute()))
}

// -- Tests --

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_preserve_empty_destination() {
        let src_dir = tempdir().unwrap();
        let dest_dir = tempdir().unwrap();
        let source = write_file(src_dir.path(), "foo.tif", b"one");

        let decision =
            resolve(&source, dest_dir.path(), &NamingPolicy::Preserve, &Config::default())
                .unwrap();
        assert_eq!(
            decision,
            NamingDecision::Use(dest_dir.path().join("foo.tif"))
        );
    }

    #[test]
    fn test_preserve_identical_skips() {
        let src_dir = tempdir().unwrap();
        let dest_dir = tempdir().unwrap();
        let source = write_file(src_dir.path(), "foo.tif", b"one");
        write_file(dest_dir.path(), "foo.tif", b"one");

        let decision =
            resolve(&source, dest_dir.path(), &NamingPolicy::Preserve, &Config::default())
                .unwrap();
        assert_eq!(decision, NamingDecision::Skip);
    }

    #[test]
    fn test_preserve_collision_numbers_from_two() {
        let src_dir = tempdir().unwrap();
        let dest_dir = tempdir().unwrap();
        let source = write_file(src_dir.path(), "foo.tif", b"changed");
        write_file(dest_dir.path(), "foo.tif", b"original");

        let decision =
            resolve(&source, dest_dir.path(), &NamingPolicy::Preserve, &Config::default())
                .unwrap();
        // "(1)" is never produced with the default start of 2
        assert_eq!(
            decision,
            NamingDecision::Use(dest_dir.path().join("foo (2).tif"))
        );
    }

    #[test]
    fn test_preserve_probes_past_occupied_variants() {
        let src_dir = tempdir().unwrap();
        let dest_dir = tempdir().unwrap();
        let source = write_file(src_dir.path(), "foo.tif", b"third");
        write_file(dest_dir.path(), "foo.tif", b"first");
        write_file(dest_dir.path(), "foo (2).tif", b"second");

        let decision =
            resolve(&source, dest_dir.path(), &NamingPolicy::Preserve, &Config::default())
                .unwrap();
        assert_eq!(
            decision,
            NamingDecision::Use(dest_dir.path().join("foo (3).tif"))
        );
    }

    #[test]
    fn test_preserve_identical_variant_skips() {
        let src_dir = tempdir().unwrap();
        let dest_dir = tempdir().unwrap();
        let source = write_file(src_dir.path(), "foo.tif", b"second");
        write_file(dest_dir.path(), "foo.tif", b"first");
        write_file(dest_dir.path(), "foo (2).tif", b"second");

        let decision =
            resolve(&source, dest_dir.path(), &NamingPolicy::Preserve, &Config::default())
                .unwrap();
        assert_eq!(decision, NamingDecision::Skip);
    }

    #[test]
    fn test_collision_start_is_configurable() {
        let src_dir = tempdir().unwrap();
        let dest_dir = tempdir().unwrap();
        let source = write_file(src_dir.path(), "foo.tif", b"changed");
        write_file(dest_dir.path(), "foo.tif", b"original");

        let mut config = Config::default();
        config.collision_start = 1;
        let decision =
            resolve(&source, dest_dir.path(), &NamingPolicy::Preserve, &config).unwrap();
        assert_eq!(
            decision,
            NamingDecision::Use(dest_dir.path().join("foo (1).tif"))
        );
    }

    #[test]
    fn test_change_extension_rewrites_and_collides() {
        let src_dir = tempdir().unwrap();
        let dest_dir = tempdir().unwrap();
        let source = write_file(src_dir.path(), "foo.tif", b"content");

        let policy = NamingPolicy::ChangeExtension("jpg".to_string());
        let decision = resolve(&source, dest_dir.path(), &policy, &Config::default()).unwrap();
        assert_eq!(
            decision,
            NamingDecision::Use(dest_dir.path().join("foo.jpg"))
        );

        // an occupied name is always a collision, even with identical bytes
        write_file(dest_dir.path(), "foo.jpg", b"content");
        let decision = resolve(&source, dest_dir.path(), &policy, &Config::default()).unwrap();
        assert_eq!(
            decision,
            NamingDecision::Use(dest_dir.path().join("foo (2).jpg"))
        );
    }

    #[test]
    fn test_composite_name_embeds_hash() {
        let src_dir = tempdir().unwrap();
        let dest_dir = tempdir().unwrap();
        let source = write_file(src_dir.path(), "whatever.tif", b"bytes");
        let hash = content_md5(&source).unwrap();

        let policy = NamingPolicy::Composite("Obj123".to_string());
        let decision = resolve(&source, dest_dir.path(), &policy, &Config::default()).unwrap();
        assert_eq!(
            decision,
            NamingDecision::Use(dest_dir.path().join(format!("Obj123.{}.tif", hash)))
        );
    }

    #[test]
    fn test_composite_existing_name_skips() {
        let src_dir = tempdir().unwrap();
        let dest_dir = tempdir().unwrap();
        let source = write_file(src_dir.path(), "whatever.tif", b"bytes");
        let hash = content_md5(&source).unwrap();
        write_file(dest_dir.path(), &format!("Obj123.{}.tif", hash), b"anything");

        let policy = NamingPolicy::Composite("Obj123".to_string());
        let decision = resolve(&source, dest_dir.path(), &policy, &Config::default()).unwrap();
        assert_eq!(decision, NamingDecision::Skip);
    }

    #[test]
    fn test_destination_must_be_a_directory() {
        let src_dir = tempdir().unwrap();
        let source = write_file(src_dir.path(), "foo.tif", b"x");
        let not_a_dir = write_file(src_dir.path(), "file.txt", b"y");

        let result = resolve(&source, &not_a_dir, &NamingPolicy::Preserve, &Config::default());
        assert!(matches!(result, Err(Error::InvalidDestination(_))));
    }

    #[test]
    fn test_identical_compares_bytes_not_size() {
        let dir = tempdir().unwrap();
        let a = write_file(dir.path(), "a", b"same length!");
        let b = write_file(dir.path(), "b", b"same length?");
        let c = write_file(dir.path(), "c", b"same length!");

        assert!(!identical(&a, &b).unwrap());
        assert!(identical(&a, &c).unwrap());
        assert!(identical(&a, &a).unwrap());
    }

    #[test]
    fn test_content_md5_known_value() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "f", b"abc");
        assert_eq!(
            content_md5(&path).unwrap(),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }
}

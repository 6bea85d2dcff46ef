// SPDX-License-Identifier: Apache-2.0

//! Parser for the sparse `[index] value` dump format shared by the
//! simulation output files (`RF.out` / `DM.out`) and the golden reference
//! files (`RF.golden` / `DM.golden`).
//!
//! The format is line oriented: blank lines and `//` comment lines are
//! ignored, every other line is expected to look like `[<index>] <value>`.
//! Absence of an index means "not recorded", not zero, so images are kept
//! sparse. Values are compared case-insensitively downstream, which we get
//! by normalizing to lowercase at parse time.

use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

/// Sparse mapping from dump index to lowercase hex value token.
///
/// A `BTreeMap` so that iteration is in ascending index order, which the
/// comparator relies on for deterministic mismatch reports.
pub type MemImage = BTreeMap<u64, String>;

static DUMP_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d+)\]\s*(\S+)$").expect("dump line regex should be valid"));

/// Reads and parses a dump file.
///
/// Returns `None` if the file does not exist (distinct from `Some` of an
/// empty image for a readable file with no data lines). Malformed data
/// lines are warned about and skipped; they never abort the parse. When the
/// same index appears more than once the last occurrence wins.
pub fn parse_dump(path: &Path) -> Option<MemImage> {
    // The dumps come out of tools that are not strict about encodings, so
    // read raw bytes and decode lossily rather than demanding UTF-8.
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            log::warn!("could not read {}: {}; treating as absent", path.display(), e);
            return None;
        }
    };
    let text = String::from_utf8_lossy(&bytes);

    let mut image = MemImage::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        match DUMP_LINE.captures(line) {
            Some(caps) => {
                let index: u64 = match caps[1].parse() {
                    Ok(index) => index,
                    Err(_) => {
                        log::warn!(
                            "could not parse line '{}' in {}",
                            line,
                            path.display()
                        );
                        continue;
                    }
                };
                image.insert(index, caps[2].to_lowercase());
            }
            None => {
                log::warn!("could not parse line '{}' in {}", line, path.display());
            }
        }
    }
    Some(image)
}

#[cfg(test)]
mod tests {
    use super::parse_dump;
    use std::path::PathBuf;
    use test_case::test_case;

    fn write_dump(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("RF.out");
        std::fs::write(&path, contents).expect("write dump");
        (dir, path)
    }

    #[test]
    fn parses_indices_and_lowercases_values() {
        let (_dir, path) = write_dump("[0] 0000000A\n[5] dEadBeEf\n");
        let image = parse_dump(&path).expect("file exists");
        assert_eq!(image.len(), 2);
        assert_eq!(image[&0], "0000000a");
        assert_eq!(image[&5], "deadbeef");
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let (_dir, path) = write_dump("// header\n\n  \n[1] ff\n// trailing\n");
        let image = parse_dump(&path).expect("file exists");
        assert_eq!(image.len(), 1);
        assert_eq!(image[&1], "ff");
    }

    #[test_case("[not-a-number] bb" ; "non integer index")]
    #[test_case("[2" ; "missing closing bracket")]
    #[test_case("[4]" ; "missing value")]
    #[test_case("no brackets here" ; "not a data line")]
    fn malformed_line_is_skipped_not_fatal(line: &str) {
        let (_dir, path) = write_dump(&format!("[0] aa\n{}\n[3] cc\n", line));
        let image = parse_dump(&path).expect("file exists");
        assert_eq!(image.len(), 2);
        assert_eq!(image[&0], "aa");
        assert_eq!(image[&3], "cc");
    }

    #[test]
    fn duplicate_index_last_occurrence_wins() {
        let (_dir, path) = write_dump("[7] 11\n[7] 22\n");
        let image = parse_dump(&path).expect("file exists");
        assert_eq!(image.len(), 1);
        assert_eq!(image[&7], "22");
    }

    #[test]
    fn missing_file_is_none_but_empty_file_is_some() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(parse_dump(&dir.path().join("absent.out")).is_none());

        let empty = dir.path().join("empty.out");
        std::fs::write(&empty, "").expect("write empty");
        let image = parse_dump(&empty).expect("empty file parses");
        assert!(image.is_empty());
    }

    #[test]
    fn tolerates_non_utf8_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("latin1.out");
        // Latin-1 comment byte sequence followed by a valid data line.
        std::fs::write(&path, b"// caf\xe9\n[0] ab\n").expect("write bytes");
        let image = parse_dump(&path).expect("file exists");
        assert_eq!(image[&0], "ab");
    }

    #[test]
    fn parsing_is_idempotent() {
        let (_dir, path) = write_dump("[2] 0F\n[0] 1\n[1] 2\n");
        let first = parse_dump(&path).expect("file exists");
        let second = parse_dump(&path).expect("file exists");
        assert_eq!(first, second);
    }
}

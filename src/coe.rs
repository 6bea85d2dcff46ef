// SPDX-License-Identifier: Apache-2.0

//! Conversion of a plain hex-word memory file (`IM.dat`) into the Vivado
//! COE block-memory initialization format (`IM.coe`).
//!
//! Statically linked into the driver with a fixed contract: read the input,
//! write the artifact, or fail with an error. One hex word per input line;
//! blank lines and `//` comments are allowed and ignored.

use std::path::Path;

use anyhow::{bail, Context};

/// Converts `input` to COE format at `output`, returning the number of
/// memory words written. An input with no data words is an error: an empty
/// initialization vector is not valid COE and would fail much later inside
/// the simulator with a far worse diagnostic.
pub fn dat_to_coe(input: &Path, output: &Path) -> anyhow::Result<usize> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("could not read {}", input.display()))?;

    let mut words = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let word = line.split_whitespace().next().expect("non-empty line has a token");
        if !word.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!(
                "{}:{}: '{}' is not a hex word",
                input.display(),
                lineno + 1,
                word
            );
        }
        words.push(word.to_lowercase());
    }

    if words.is_empty() {
        bail!("{} contains no memory words", input.display());
    }

    let mut coe = String::from("memory_initialization_radix=16;\nmemory_initialization_vector=\n");
    coe.push_str(&words.join(",\n"));
    coe.push_str(";\n");

    std::fs::write(output, coe)
        .with_context(|| format!("could not write {}", output.display()))?;
    log::info!(
        "dat_to_coe: wrote {} words to {}",
        words.len(),
        output.display()
    );
    Ok(words.len())
}

#[cfg(test)]
mod tests {
    use super::dat_to_coe;
    use pretty_assertions::assert_eq;

    #[test]
    fn converts_hex_words_to_coe() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dat = dir.path().join("IM.dat");
        let coe = dir.path().join("IM.coe");
        std::fs::write(&dat, "// boot\n00000013\nFFC10113\n\n00A00533\n").expect("write dat");

        let count = dat_to_coe(&dat, &coe).expect("conversion succeeds");
        assert_eq!(count, 3);

        let written = std::fs::read_to_string(&coe).expect("read coe");
        assert_eq!(
            written,
            "memory_initialization_radix=16;\n\
             memory_initialization_vector=\n\
             00000013,\n\
             ffc10113,\n\
             00a00533;\n"
        );
    }

    #[test]
    fn rejects_non_hex_words() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dat = dir.path().join("IM.dat");
        std::fs::write(&dat, "00000013\nnothex!\n").expect("write dat");

        let err = dat_to_coe(&dat, &dir.path().join("IM.coe")).expect_err("must fail");
        assert!(err.to_string().contains("not a hex word"), "{}", err);
    }

    #[test]
    fn rejects_empty_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dat = dir.path().join("IM.dat");
        std::fs::write(&dat, "// only comments\n\n").expect("write dat");

        let err = dat_to_coe(&dat, &dir.path().join("IM.coe")).expect_err("must fail");
        assert!(err.to_string().contains("no memory words"), "{}", err);
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = dat_to_coe(&dir.path().join("absent.dat"), &dir.path().join("IM.coe"))
            .expect_err("must fail");
        assert!(err.to_string().contains("could not read"), "{}", err);
    }
}

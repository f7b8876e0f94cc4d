/*
 * Test utilities for Segtherm
 *
 * Shared fixtures for unit tests, mainly fake sysfs hwmon trees built
 * inside a tempdir.
 */

use std::fs;
use std::path::{Path, PathBuf};

/// Creates a fake hwmon chip directory under `root` and returns it.
///
/// `tag` is the directory name (e.g. "hwmon0"), `name` is written to the
/// chip's `name` file, and each `(file, contents)` pair becomes a sysfs
/// attribute file.
pub fn fake_hwmon_chip(root: &Path, tag: &str, name: &str, files: &[(&str, &str)]) -> PathBuf {
    let chip = root.join(tag);
    fs::create_dir_all(&chip).unwrap();
    fs::write(chip.join("name"), format!("{}\n", name)).unwrap();
    for (file, contents) in files {
        fs::write(chip.join(file), contents).unwrap();
    }
    chip
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fake_chip_layout() {
        let dir = TempDir::new().unwrap();
        let chip = fake_hwmon_chip(
            dir.path(),
            "hwmon3",
            "k10temp",
            &[("temp1_input", "45500\n")],
        );
        assert_eq!(
            fs::read_to_string(chip.join("name")).unwrap().trim(),
            "k10temp"
        );
        assert_eq!(
            fs::read_to_string(chip.join("temp1_input")).unwrap().trim(),
            "45500"
        );
    }
}

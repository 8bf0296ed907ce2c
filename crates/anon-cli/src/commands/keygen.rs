//! `anonymize keygen` command implementation
//!
//! Writes a random tokenization key into an env file. Other lines in the
//! file are preserved.

use anon_common::{AnonError, Result};
use anon_pipeline::config::TOKENIZATION_KEY_VAR;
use colored::Colorize;
use rand::Rng;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

/// Random bytes per key (hex-encoded to 32 characters)
pub const KEY_BYTES: usize = 16;

pub fn run(env_file: &Path, force: bool) -> Result<()> {
    let key = generate_key();
    let replaced = write_key(env_file, &key, force)?;

    info!(path = %env_file.display(), replaced, "Stored tokenization key");
    println!(
        "{} {} saved to {}",
        "✓".green(),
        TOKENIZATION_KEY_VAR,
        env_file.display()
    );
    if replaced {
        println!(
            "{}",
            "Tokens produced with the previous key will no longer match.".yellow()
        );
    }
    Ok(())
}

/// Fresh random key as lowercase hex
pub fn generate_key() -> String {
    let mut bytes = [0u8; KEY_BYTES];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Set the key line in `env_file`, creating the file if needed
///
/// Returns whether an existing key was replaced. Replacing requires `force`.
pub fn write_key(env_file: &Path, key: &str, force: bool) -> Result<bool> {
    let existing = match fs::read_to_string(env_file) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let assignment = format!("{}={}", TOKENIZATION_KEY_VAR, key);
    let mut lines = Vec::new();
    let mut replaced = false;

    for line in existing.lines() {
        if !assigns_key(line) {
            lines.push(line.to_string());
            continue;
        }
        if !force {
            return Err(AnonError::config(format!(
                "{} already defines {}; pass --force to replace it",
                env_file.display(),
                TOKENIZATION_KEY_VAR
            )));
        }
        // Collapse duplicate definitions into one
        if !replaced {
            lines.push(assignment.clone());
            replaced = true;
        }
    }

    if !replaced {
        lines.push(assignment);
    }

    if let Some(parent) = env_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut contents = lines.join("\n");
    contents.push('\n');
    fs::write(env_file, contents)?;
    Ok(replaced)
}

fn assigns_key(line: &str) -> bool {
    let line = line.trim_start();
    let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
    line.strip_prefix(TOKENIZATION_KEY_VAR)
        .is_some_and(|rest| rest.trim_start().starts_with('='))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_are_hex_and_distinct() {
        let a = generate_key();
        let b = generate_key();
        assert_eq!(a.len(), KEY_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");

        assert!(!write_key(&env_file, "abc123", false).unwrap());
        assert_eq!(
            fs::read_to_string(&env_file).unwrap(),
            "TOKENIZATION_KEY=abc123\n"
        );
    }

    #[test]
    fn test_keeps_other_lines() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        fs::write(&env_file, "# settings\nLOG_LEVEL=debug\n").unwrap();

        write_key(&env_file, "abc123", false).unwrap();

        assert_eq!(
            fs::read_to_string(&env_file).unwrap(),
            "# settings\nLOG_LEVEL=debug\nTOKENIZATION_KEY=abc123\n"
        );
    }

    #[test]
    fn test_existing_key_needs_force() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        fs::write(&env_file, "A=1\nexport TOKENIZATION_KEY = old\nB=2\n").unwrap();

        let err = write_key(&env_file, "new", false).unwrap_err();
        assert!(matches!(err, AnonError::Config(_)));
        assert!(fs::read_to_string(&env_file).unwrap().contains("old"));

        assert!(write_key(&env_file, "new", true).unwrap());
        assert_eq!(
            fs::read_to_string(&env_file).unwrap(),
            "A=1\nTOKENIZATION_KEY=new\nB=2\n"
        );
    }

    #[test]
    fn test_similar_names_are_not_the_key() {
        assert!(assigns_key("TOKENIZATION_KEY=x"));
        assert!(!assigns_key("TOKENIZATION_KEY_OLD=x"));
        assert!(!assigns_key("# TOKENIZATION_KEY=x"));
    }
}

//! `yamline completions` - Generate shell completions
//!
//! Supports bash, zsh, fish, PowerShell and elvish.

use anyhow::{Context, Result};
use clap_complete::Shell;
use std::fs;
use std::path::Path;

pub fn generate_completions(shell: Shell) -> Result<String> {
    use clap_complete::generate;

    let mut cmd = super::build_cli();
    let mut buf = Vec::new();
    generate(shell, &mut cmd, "yamline", &mut buf);

    String::from_utf8(buf).context("Failed to generate completions")
}

pub fn save_completions(completions: &str, output_path: &Path) -> Result<()> {
    fs::write(output_path, completions)
        .with_context(|| format!("Failed to write completions to: {}", output_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case(Shell::Bash)]
    #[case(Shell::Zsh)]
    #[case(Shell::Fish)]
    #[case(Shell::PowerShell)]
    fn test_generate_completions(#[case] shell: Shell) {
        let completions = generate_completions(shell).unwrap();
        assert!(!completions.is_empty());
        assert!(completions.contains("yamline"));
    }

    #[test]
    fn test_bash_completions_list_subcommands() {
        let completions = generate_completions(Shell::Bash).unwrap();
        for command in ["check", "convert", "directives"] {
            assert!(completions.contains(command), "missing {command}");
        }
    }

    #[test]
    fn test_save_completions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("yamline.bash");
        save_completions("complete -F _yamline yamline", &path).unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "complete -F _yamline yamline"
        );
    }
}

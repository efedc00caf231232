use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

/// First line a tool prints when spawned, whatever its exit status.
/// Fails only when the program cannot be started.
pub fn probe_tool(dir: &Path, program: &str, args: &[&str]) -> Result<String> {
    let out = Command::new(program)
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("{program} not found on PATH"))?;
    let text = if out.stdout.is_empty() { out.stderr } else { out.stdout };
    Ok(String::from_utf8_lossy(&text).lines().next().unwrap_or_default().trim().to_string())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reports_first_line_even_on_failure() {
        let dir = tempdir().unwrap();
        let line = probe_tool(dir.path(), "sh", &["-c", "echo one >&2; echo two >&2; exit 1"]).unwrap();
        assert_eq!(line, "one");
    }

    #[test]
    fn missing_program_names_the_tool() {
        let dir = tempdir().unwrap();
        let err = probe_tool(dir.path(), "proctor-no-such-tool", &[]).unwrap_err();
        assert_eq!(err.to_string(), "proctor-no-such-tool not found on PATH");
    }
}

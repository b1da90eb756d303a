use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellType {
    /// Programs are executed directly.
    Direct,
    /// Programs go through `cmd /C` so `.cmd` shims like `npm` resolve.
    Cmd,
}

impl ShellType {
    pub fn detect() -> Self {
        if cfg!(windows) {
            ShellType::Cmd
        } else {
            ShellType::Direct
        }
    }

    /// Program and argument list to spawn for `program args...`.
    pub fn wrap(&self, program: &str, args: &[&str]) -> (String, Vec<String>) {
        match self {
            ShellType::Direct => (
                program.to_string(),
                args.iter().map(|a| a.to_string()).collect(),
            ),
            ShellType::Cmd => {
                let mut wrapped = vec!["/C".to_string(), program.to_string()];
                wrapped.extend(args.iter().map(|a| a.to_string()));
                ("cmd".to_string(), wrapped)
            }
        }
    }
}

#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

/// Run `program args...` in `cwd`, capturing output.
pub async fn execute_command(program: &str, args: &[&str], cwd: &Path) -> Result<CommandOutput> {
    let (program, args) = ShellType::detect().wrap(program, args);
    tracing::debug!(%program, ?args, cwd = %cwd.display(), "running command");

    let output = Command::new(&program)
        .args(&args)
        .current_dir(cwd)
        .output()
        .await
        .with_context(|| format!("failed to start {program}"))?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        success: output.status.success(),
    })
}

/// Like [`execute_command`], but a non-zero exit is an error carrying stderr.
pub async fn run_checked(program: &str, args: &[&str], cwd: &Path) -> Result<CommandOutput> {
    let output = execute_command(program, args, cwd).await?;
    if !output.success {
        return Err(anyhow!(
            "{} {} exited with an error: {}",
            program,
            args.join(" "),
            output.stderr
        ));
    }
    Ok(output)
}

// zz: The build system and package manager for the zz language.
// Copyright (C) 2024 International Digital Economy Academy
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//
// For inquiries, you can contact us via e-mail at jichuruanjian@idea.edu.cn.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, bail};

/// Locate a tool, honoring an environment override (`CC`, `AR`, ...).
pub fn tool(env_name: &str, default: &str) -> anyhow::Result<PathBuf> {
    let name = std::env::var(env_name).unwrap_or_else(|_| default.to_string());
    which::which(&name).with_context(|| format!("`{name}` not found on PATH"))
}

/// Render a command the way a shell would accept it; informational only.
pub fn render(cmd: &Command) -> String {
    let mut out = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        let arg = arg.to_string_lossy();
        out.push(' ');
        if arg.contains(' ') {
            out.push('"');
            out.push_str(&arg);
            out.push('"');
        } else {
            out.push_str(&arg);
        }
    }
    out
}

/// Run a tool with inherited stdio, failing on a non-zero exit.
pub fn run_command(cmd: &mut Command, quiet: bool) -> anyhow::Result<()> {
    let rendered = render(cmd);
    if !quiet {
        println!("{rendered}");
    }
    log::debug!("running {rendered}");
    let status = cmd
        .status()
        .with_context(|| format!("failed to spawn `{rendered}`"))?;
    if !status.success() {
        bail!("command `{rendered}` failed with status: {status}");
    }
    Ok(())
}

/// Run a tool capturing its output, failing on a non-zero exit with the
/// captured stderr embedded in the error.
pub fn run_command_captured(cmd: &mut Command) -> anyhow::Result<String> {
    let rendered = render(cmd);
    log::debug!("running {rendered}");
    let output = cmd
        .output()
        .with_context(|| format!("failed to spawn `{rendered}`"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "command `{rendered}` failed with status: {}\nstderr: {stderr}",
            output.status
        );
    }
    String::from_utf8(output.stdout)
        .with_context(|| format!("output of `{rendered}` is not valid UTF-8"))
}

/// Working-directory guard: restores the previous directory on every exit
/// path, including error propagation.
pub struct ScopedCwd {
    prev: PathBuf,
}

impl ScopedCwd {
    pub fn enter(dir: &Path) -> anyhow::Result<ScopedCwd> {
        let prev = std::env::current_dir().context("failed to get current directory")?;
        std::env::set_current_dir(dir)
            .with_context(|| format!("failed to change directory to `{}`", dir.display()))?;
        Ok(ScopedCwd { prev })
    }
}

impl Drop for ScopedCwd {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.prev) {
            log::warn!(
                "failed to restore working directory `{}`: {e}",
                self.prev.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_quotes_spaces() {
        let mut cmd = Command::new("cc");
        cmd.arg("-o").arg("a b.o").arg("main.c");
        assert_eq!(render(&cmd), "cc -o \"a b.o\" main.c");
    }

    #[test]
    fn failed_command_is_reported() {
        let mut cmd = Command::new("false");
        let err = run_command(&mut cmd, true).unwrap_err();
        assert!(err.to_string().contains("failed with status"));
    }
}

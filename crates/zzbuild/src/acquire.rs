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

//! Source acquisition: `init`, `checkout` and `get` lay package source
//! trees out under `$WORKSPACE/src/<identifier>` with the `git` command
//! line client. Only the on-disk layout matters to the build engine.

use std::collections::HashSet;
use std::process::Command;

use anyhow::{Context, bail};

use zzutil::common::PACKAGE_LUA;
use zzutil::package::PackageDescriptor;
use zzutil::pkgid::PackageId;
use zzutil::process::{run_command, run_command_captured};

use crate::context::Engine;

/// Create a fresh package skeleton and a git repository for it.
pub fn init(engine: &Engine, pkg: &str) -> anyhow::Result<()> {
    let id: PackageId = pkg.parse()?;
    let dir = engine.workspace().src_dir(id.identifier());
    if dir.join(PACKAGE_LUA).exists() {
        bail!(
            "package `{}` already exists at `{}`",
            id.identifier(),
            dir.display()
        );
    }
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create `{}`", dir.display()))?;
    std::fs::write(dir.join(PACKAGE_LUA), descriptor_skeleton(id.identifier()))
        .with_context(|| format!("failed to write `{}`", dir.join(PACKAGE_LUA).display()))?;
    let mut cmd = Command::new("git");
    cmd.arg("init").arg(&dir);
    run_command_captured(&mut cmd)?;
    if !engine.quiet() {
        println!("initialized {}", dir.display());
    }
    Ok(())
}

fn descriptor_skeleton(identifier: &str) -> String {
    format!(
        "return {{\n   package = \"{identifier}\",\n   exports = {{}},\n   apps = {{}},\n}}\n"
    )
}

/// Clone (or update) a package source tree; returns the identifier the
/// tree is laid out under.
pub fn checkout(
    engine: &Engine,
    pkg: &str,
    update: bool,
    reference: Option<&str>,
) -> anyhow::Result<String> {
    let id: PackageId = pkg.parse()?;
    let dir = engine.workspace().src_dir(id.identifier());
    if !dir.join(".git").exists() {
        if let Some(parent) = dir.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create `{}`", parent.display()))?;
        }
        let mut cmd = Command::new("git");
        cmd.arg("clone").arg(id.url()).arg(&dir);
        run_command(&mut cmd, engine.quiet())
            .with_context(|| format!("failed to clone `{}`", id.url()))?;
    } else if update {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&dir).arg("pull");
        run_command(&mut cmd, engine.quiet())
            .with_context(|| format!("failed to update `{}`", id.identifier()))?;
    }
    if let Some(reference) = reference {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&dir).arg("checkout").arg(reference);
        run_command(&mut cmd, engine.quiet())
            .with_context(|| format!("failed to check out `{reference}`"))?;
    }
    Ok(id.identifier().to_string())
}

/// Checkout a package and, transitively, every import that is not
/// already present in the workspace.
pub fn get(engine: &Engine, pkg: &str, update: bool) -> anyhow::Result<()> {
    let mut visited = HashSet::new();
    get_inner(engine, pkg, update, &mut visited)
}

fn get_inner(
    engine: &Engine,
    pkg: &str,
    update: bool,
    visited: &mut HashSet<String>,
) -> anyhow::Result<()> {
    let id: PackageId = pkg.parse()?;
    if !visited.insert(id.identifier().to_string()) {
        return Ok(());
    }
    checkout(engine, pkg, update, None)?;
    let descriptor_path = engine.workspace().src_dir(id.identifier()).join(PACKAGE_LUA);
    let desc = PackageDescriptor::load(&descriptor_path)?;
    for import in &desc.imports {
        if !import.contains('/') {
            // local package, nothing to fetch
            log::debug!("skipping non-remote import `{import}`");
            continue;
        }
        let present = engine
            .workspace()
            .src_dir(import)
            .join(PACKAGE_LUA)
            .exists();
        if present && !update {
            continue;
        }
        get_inner(engine, import, update, visited)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::scratch_workspace;

    #[test]
    fn init_writes_a_loadable_skeleton() {
        let skeleton = descriptor_skeleton("example.org/demo");
        let desc = PackageDescriptor::parse(&skeleton).unwrap();
        assert_eq!(desc.package, "example.org/demo");
        assert_eq!(desc.exports, vec!["package".to_string()]);
        assert!(desc.apps.is_empty());
    }

    #[test]
    fn init_refuses_to_clobber_an_existing_package() {
        let (_tmp, engine) = scratch_workspace(&[(
            "example.org/demo",
            "return { package = \"example.org/demo\" }\n",
        )]);
        let err = init(&engine, "example.org/demo").unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}

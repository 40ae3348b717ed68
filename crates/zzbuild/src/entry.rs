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

//! Top-level driver actions. Each one selects target groups on a context
//! and drives `make`; native factories may use relative paths, so every
//! build step runs with the working directory set to the package source
//! tree.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::rc::Rc;

use anyhow::{Context, bail};
use walkdir::WalkDir;

use zzutil::process::ScopedCwd;

use crate::bootstrap::BootstrapFlavor;
use crate::context::{BuildContext, Engine};

/// Build a package: native prerequisites, then the library archive, then
/// (optionally) every application. With `recursive`, imports are driven
/// first, depth-first, each package once.
pub fn build(engine: &Engine, pkg: &str, recursive: bool, apps: bool) -> anyhow::Result<()> {
    let mut visited = HashSet::new();
    build_inner(engine, pkg, recursive, apps, &mut visited)
}

fn build_inner(
    engine: &Engine,
    pkg: &str,
    recursive: bool,
    apps: bool,
    visited: &mut HashSet<String>,
) -> anyhow::Result<()> {
    if !visited.insert(pkg.to_string()) {
        return Ok(());
    }
    let ctx = engine.context(pkg)?;
    if recursive {
        for import in ctx.descriptor().imports.clone() {
            build_inner(engine, &import, recursive, false, visited)?;
        }
    }
    log::info!("building package `{pkg}`");
    let _cwd = ScopedCwd::enter(&ctx.dirs().src)?;
    for native in ctx.native_targets()? {
        native.make(engine, false)?;
    }
    ctx.library_target(engine)?.make(engine, false)?;
    if apps {
        for app in ctx.app_targets(engine)? {
            app.make(engine, false)?;
        }
    }
    Ok(())
}

/// Build everything and symlink the descriptor's `install` apps into the
/// global bin directory.
pub fn install(engine: &Engine, pkg: &str) -> anyhow::Result<()> {
    build(engine, pkg, true, true)?;
    let ctx = engine.context(pkg)?;
    let global_bin = engine.workspace().global_bin_dir();
    std::fs::create_dir_all(&global_bin)
        .with_context(|| format!("failed to create `{}`", global_bin.display()))?;
    for app in &ctx.descriptor().install {
        let link = global_bin.join(app);
        let dest = ctx.dirs().bin.join(app);
        if link.is_symlink() || link.exists() {
            std::fs::remove_file(&link)
                .with_context(|| format!("failed to replace `{}`", link.display()))?;
        }
        symlink(&dest, &link)?;
        if !engine.quiet() {
            println!("installed {}", link.display());
        }
    }
    Ok(())
}

#[cfg(unix)]
fn symlink(dest: &Path, link: &Path) -> anyhow::Result<()> {
    std::os::unix::fs::symlink(dest, link)
        .with_context(|| format!("failed to link `{}`", link.display()))
}

#[cfg(not(unix))]
fn symlink(_dest: &Path, _link: &Path) -> anyhow::Result<()> {
    bail!("install is only supported on unix hosts");
}

/// Build a script-runner executable and run the given script with it.
/// The script must live under the package source tree.
pub fn run(engine: &Engine, pkg: &str, script: &Path, args: &[String]) -> anyhow::Result<i32> {
    build(engine, pkg, true, false)?;
    let ctx = engine.context(pkg)?;
    let script = dunce::canonicalize(script)
        .with_context(|| format!("failed to resolve `{}`", script.display()))?;
    if !script.starts_with(&ctx.dirs().src) {
        bail!(
            "script `{}` is outside the package source tree `{}`",
            script.display(),
            ctx.dirs().src.display()
        );
    }
    let runner = runner_target(engine, &ctx, &BootstrapFlavor::Run)?;
    let mut cmd = Command::new(runner);
    cmd.arg(&script).args(args);
    exec_status(&mut cmd)
}

/// Build a test-runner executable and run it over the resolved test
/// scripts. Without names, every `*_test.*` under the source tree runs.
pub fn test(engine: &Engine, pkg: &str, names: &[String]) -> anyhow::Result<i32> {
    build(engine, pkg, true, false)?;
    let ctx = engine.context(pkg)?;
    let tests = resolve_test_paths(&ctx, names)?;
    if tests.is_empty() {
        if !engine.quiet() {
            println!("no tests found in `{pkg}`");
        }
        return Ok(0);
    }
    let runner = runner_target(engine, &ctx, &BootstrapFlavor::Test)?;
    let mut cmd = Command::new(runner);
    cmd.args(&tests);
    exec_status(&mut cmd)
}

fn runner_target(
    engine: &Engine,
    ctx: &Rc<BuildContext>,
    flavor: &BootstrapFlavor,
) -> anyhow::Result<PathBuf> {
    let _cwd = ScopedCwd::enter(&ctx.dirs().src)?;
    let name = match flavor {
        BootstrapFlavor::Test => "_test",
        _ => "_run",
    };
    let bootstrap = ctx.bootstrap_targets(engine, flavor)?;
    let runner = ctx.executable_target(engine, ctx.dirs().tmp.clone(), name, bootstrap, vec![])?;
    runner.make(engine, false)?;
    Ok(runner.path().expect("runner has a path"))
}

fn exec_status(cmd: &mut Command) -> anyhow::Result<i32> {
    let status = cmd
        .status()
        .with_context(|| format!("failed to spawn `{}`", zzutil::process::render(cmd)))?;
    Ok(status.code().unwrap_or(1))
}

fn resolve_test_paths(ctx: &Rc<BuildContext>, names: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let src = &ctx.dirs().src;
    if names.is_empty() {
        let mut found = Vec::new();
        for entry in WalkDir::new(src).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() || entry.path().starts_with(&ctx.dirs().native) {
                continue;
            }
            let path = entry.path();
            let is_test = path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s.ends_with("_test"))
                && path.extension().is_some();
            if is_test {
                found.push(path.to_path_buf());
            }
        }
        return Ok(found);
    }
    names
        .iter()
        .map(|name| {
            let name = if name.ends_with("_test") {
                name.clone()
            } else {
                format!("{name}_test")
            };
            let path = src.join(format!("{name}.lua"));
            if !path.exists() {
                bail!("no such test `{name}` in package `{}`", ctx.name());
            }
            Ok(path)
        })
        .collect()
}

/// Remove the package's derived trees: objects, libraries, generated
/// bootstrap sources.
pub fn clean(engine: &Engine, pkg: &str) -> anyhow::Result<()> {
    let dirs = engine.workspace().package_dirs(pkg);
    for dir in [&dirs.obj, &dirs.lib, &dirs.tmp] {
        remove_dir_if_exists(dir)?;
    }
    Ok(())
}

/// `clean` plus executables, the native staging tree and any global bin
/// symlinks pointing into this package.
pub fn distclean(engine: &Engine, pkg: &str) -> anyhow::Result<()> {
    clean(engine, pkg)?;
    let dirs = engine.workspace().package_dirs(pkg);
    remove_dir_if_exists(&dirs.bin)?;
    remove_dir_if_exists(&dirs.native)?;

    let global_bin = engine.workspace().global_bin_dir();
    if global_bin.is_dir() {
        for entry in std::fs::read_dir(&global_bin)? {
            let path = entry?.path();
            if !path.is_symlink() {
                continue;
            }
            if let Ok(dest) = std::fs::read_link(&path) {
                if dest.starts_with(&dirs.bin) {
                    std::fs::remove_file(&path)
                        .with_context(|| format!("failed to remove `{}`", path.display()))?;
                }
            }
        }
    }
    Ok(())
}

fn remove_dir_if_exists(dir: &Path) -> anyhow::Result<()> {
    if dir.is_dir() {
        std::fs::remove_dir_all(dir)
            .with_context(|| format!("failed to remove `{}`", dir.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::scratch_workspace;

    #[test]
    fn clean_on_a_never_built_package_is_a_noop() {
        let (_tmp, engine) = scratch_workspace(&[("demo", "return { package = \"demo\" }\n")]);
        clean(&engine, "demo").unwrap();
        distclean(&engine, "demo").unwrap();
    }

    #[test]
    fn clean_removes_derived_trees_only() {
        let (_tmp, engine) = scratch_workspace(&[("demo", "return { package = \"demo\" }\n")]);
        let dirs = engine.workspace().package_dirs("demo");
        for dir in [&dirs.obj, &dirs.lib, &dirs.tmp, &dirs.bin] {
            std::fs::create_dir_all(dir).unwrap();
            std::fs::write(dir.join("marker"), "x").unwrap();
        }
        clean(&engine, "demo").unwrap();
        assert!(!dirs.obj.exists());
        assert!(!dirs.lib.exists());
        assert!(!dirs.tmp.exists());
        assert!(dirs.bin.exists());
        assert!(dirs.src.exists());
    }

    #[cfg(unix)]
    #[test]
    fn distclean_removes_only_this_packages_symlinks() {
        let (_tmp, engine) = scratch_workspace(&[(
            "example.org/demo",
            "return { package = \"example.org/demo\" }\n",
        )]);
        let dirs = engine.workspace().package_dirs("example.org/demo");
        let global_bin = engine.workspace().global_bin_dir();
        std::fs::create_dir_all(&dirs.bin).unwrap();
        std::fs::write(dirs.bin.join("demo"), "exe").unwrap();
        std::os::unix::fs::symlink(dirs.bin.join("demo"), global_bin.join("demo")).unwrap();
        std::os::unix::fs::symlink("/usr/bin/true", global_bin.join("other")).unwrap();

        distclean(&engine, "example.org/demo").unwrap();
        assert!(!dirs.bin.exists());
        assert!(!global_bin.join("demo").is_symlink());
        assert!(global_bin.join("other").is_symlink());
    }

    #[test]
    fn test_discovery_matches_test_scripts() {
        let (_tmp, engine) = scratch_workspace(&[("demo", "return { package = \"demo\" }\n")]);
        let ctx = engine.context("demo").unwrap();
        let src = &ctx.dirs().src;
        std::fs::write(src.join("util.lua"), "").unwrap();
        std::fs::write(src.join("util_test.lua"), "").unwrap();
        std::fs::create_dir_all(src.join("codec")).unwrap();
        std::fs::write(src.join("codec/codec_test.lua"), "").unwrap();

        let found = resolve_test_paths(&ctx, &[]).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(src).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["codec/codec_test.lua", "util_test.lua"]);
    }

    #[test]
    fn test_names_get_the_suffix_appended() {
        let (_tmp, engine) = scratch_workspace(&[("demo", "return { package = \"demo\" }\n")]);
        let ctx = engine.context("demo").unwrap();
        std::fs::write(ctx.dirs().src.join("util_test.lua"), "").unwrap();

        let resolved = resolve_test_paths(&ctx, &["util".to_string()]).unwrap();
        assert_eq!(resolved, vec![ctx.dirs().src.join("util_test.lua")]);
        let err = resolve_test_paths(&ctx, &["ghost".to_string()]).unwrap_err();
        assert!(err.to_string().contains("no such test"));
    }
}

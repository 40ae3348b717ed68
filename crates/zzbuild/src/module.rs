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

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::rc::Rc;

use anyhow::{Context, bail};

use zzutil::hash::mangle;
use zzutil::process::{run_command, tool};

use crate::context::{BuildContext, Engine};
use crate::target::Target;

impl BuildContext {
    /// The target pair of one module: the script object `<M>.lo`, plus
    /// the C object `<M>.o` when `src/<M>.c` exists. Memoized per name.
    pub fn module_targets(
        self: &Rc<Self>,
        engine: &Engine,
        name: &str,
    ) -> anyhow::Result<Vec<Rc<Target>>> {
        if let Some(targets) = self.modules.borrow().get(name) {
            return Ok(targets.clone());
        }

        let src_lua = self.dirs().src.join(format!("{name}.lua"));
        if !src_lua.exists() {
            bail!(
                "missing source `{}` for module `{name}` of package `{}`",
                src_lua.display(),
                self.name()
            );
        }
        let (obj_dir, stem) = self.object_location(name);
        let symbol = mangle(self.name(), name);

        let script_object = {
            let src = src_lua.clone();
            Target::builder(self)
                .output(obj_dir.clone(), format!("{stem}.lo"))
                .dep(&Target::file(self, &src_lua))
                .build(move |engine, t, _changed| {
                    let out = t.path().expect("script object has a path");
                    compile_script(engine, &src, &out, &symbol)
                })
                .finish()
        };
        let mut targets = vec![script_object];

        let src_c = self.dirs().src.join(format!("{name}.c"));
        if src_c.exists() {
            // the header is a soft dependency: tracked when present,
            // ignored when not
            let header = self.dirs().src.join(format!("{name}.h"));
            let mut builder = Target::builder(self)
                .output(obj_dir, format!("{stem}.o"))
                .dep(&Target::file(self, &src_c))
                .dep(&Target::file(self, &header));
            for target_ref in self.descriptor().depends.get(name).into_iter().flatten() {
                builder = builder.dep_ref(target_ref.clone());
            }
            let c_object = builder
                .build(move |engine, t, _changed| {
                    let out = t.path().expect("C object has a path");
                    let flags = collect_cflags(engine, t)?;
                    compile_object(engine, &src_c, &out, &flags)
                })
                .finish();
            targets.push(c_object);
        }

        self.modules
            .borrow_mut()
            .insert(name.to_string(), targets.clone());
        Ok(targets)
    }

    /// Targets of every exported module, in export order.
    pub fn exported_targets(
        self: &Rc<Self>,
        engine: &Engine,
    ) -> anyhow::Result<Vec<Rc<Target>>> {
        self.exported
            .get_or_try_init(|| {
                let mut all = Vec::new();
                for module in self.descriptor().exports.clone() {
                    all.extend(self.module_targets(engine, &module)?);
                }
                Ok(all)
            })
            .cloned()
    }

    /// Object directory and file stem of a module; the directory part of
    /// a slash-separated name maps to subdirectories of the object root.
    pub(crate) fn object_location(&self, name: &str) -> (PathBuf, String) {
        match name.rsplit_once('/') {
            Some((dir, stem)) => (self.dirs().obj.join(dir), stem.to_string()),
            None => (self.dirs().obj.clone(), name.to_string()),
        }
    }
}

/// Compile flags of a C translation unit: one include path per build
/// context reachable through the target's dependency graph, plus every
/// reachable target's own flags. Explicit DFS; identity-keyed visited
/// sets keep the walk linear and the include list deduplicated.
pub(crate) fn collect_cflags(engine: &Engine, root: &Target) -> anyhow::Result<Vec<String>> {
    fn visit(
        engine: &Engine,
        target: &Target,
        flags: &mut Vec<String>,
        seen_targets: &mut HashSet<*const Target>,
        seen_contexts: &mut HashSet<*const BuildContext>,
    ) -> anyhow::Result<()> {
        if !seen_targets.insert(target as *const Target) {
            return Ok(());
        }
        if let Some(ctx) = target.context() {
            if seen_contexts.insert(Rc::as_ptr(&ctx)) {
                flags.push("-I".to_string());
                flags.push(ctx.dirs().src.display().to_string());
            }
        }
        flags.extend(target.cflags().iter().cloned());
        for dep in target.resolved_depends(engine)? {
            visit(engine, &dep, flags, seen_targets, seen_contexts)?;
        }
        Ok(())
    }

    let mut flags = Vec::new();
    let mut seen_targets = HashSet::new();
    let mut seen_contexts = HashSet::new();
    visit(engine, root, &mut flags, &mut seen_targets, &mut seen_contexts)?;
    Ok(flags)
}

/// Compile a script source to a bytecode object registered under the
/// given loader symbol.
pub(crate) fn compile_script(
    engine: &Engine,
    src: &Path,
    out: &Path,
    symbol: &str,
) -> anyhow::Result<()> {
    let luajit = tool("LUAJIT", "luajit")?;
    let mut cmd = Command::new(luajit);
    cmd.arg("-b")
        .arg("-n")
        .arg(symbol)
        .arg("-t")
        .arg("o")
        .arg(src)
        .arg(out);
    run_command(&mut cmd, engine.quiet())
        .with_context(|| format!("failed to compile `{}`", src.display()))
}

/// Compile a C source to an object file.
pub(crate) fn compile_object(
    engine: &Engine,
    src: &Path,
    out: &Path,
    cflags: &[String],
) -> anyhow::Result<()> {
    let cc = tool("CC", "cc")?;
    let mut cmd = Command::new(cc);
    cmd.arg("-c").arg(src).arg("-o").arg(out);
    for flag in cflags {
        cmd.arg(flag);
    }
    run_command(&mut cmd, engine.quiet())
        .with_context(|| format!("failed to compile `{}`", src.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::scratch_workspace;

    fn demo_workspace() -> (tempfile::TempDir, Engine) {
        let (tmp, engine) = scratch_workspace(&[
            (
                "demo",
                r#"
return {
  package = "demo",
  exports = { "util", "codec" },
  depends = { codec = { "libz.a" } },
}
"#,
            ),
            ("core", "return { package = \"core\" }\n"),
        ]);
        let src = engine.workspace().src_dir("demo");
        std::fs::write(src.join("util.lua"), "return {}\n").unwrap();
        std::fs::write(src.join("codec.lua"), "return {}\n").unwrap();
        std::fs::write(src.join("codec.c"), "int codec;\n").unwrap();
        (tmp, engine)
    }

    #[test]
    fn script_only_module_has_a_single_target() {
        let (_tmp, engine) = demo_workspace();
        let ctx = engine.context("demo").unwrap();
        let targets = ctx.module_targets(&engine, "util").unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].basename(), Some("util.lo"));
    }

    #[test]
    fn mixed_module_has_both_targets() {
        let (_tmp, engine) = demo_workspace();
        let ctx = engine.context("demo").unwrap();
        let targets = ctx.module_targets(&engine, "codec").unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].basename(), Some("codec.lo"));
        assert_eq!(targets[1].basename(), Some("codec.o"));
    }

    #[test]
    fn module_targets_are_memoized() {
        let (_tmp, engine) = demo_workspace();
        let ctx = engine.context("demo").unwrap();
        let first = ctx.module_targets(&engine, "util").unwrap();
        let second = ctx.module_targets(&engine, "util").unwrap();
        assert!(Rc::ptr_eq(&first[0], &second[0]));
    }

    #[test]
    fn missing_module_source_is_fatal() {
        let (_tmp, engine) = demo_workspace();
        let ctx = engine.context("demo").unwrap();
        let err = ctx.module_targets(&engine, "ghost").unwrap_err();
        assert!(err.to_string().contains("missing source"));
    }

    #[test]
    fn nested_module_objects_land_in_subdirectories() {
        let (_tmp, engine) = demo_workspace();
        let ctx = engine.context("demo").unwrap();
        let (dir, stem) = ctx.object_location("codec/huffman");
        assert_eq!(dir, ctx.dirs().obj.join("codec"));
        assert_eq!(stem, "huffman");
    }

    #[test]
    fn cflags_walk_deduplicates_contexts_and_collects_flags() {
        let (_tmp, engine) = demo_workspace();
        let ctx = engine.context("demo").unwrap();
        // register the native prerequisite codec.o refers to
        let libz = Target::builder(&ctx)
            .cflags(["-iquote/zlib/include".to_string()])
            .finish();
        ctx.set_target("libz.a", &libz).unwrap();

        let targets = ctx.module_targets(&engine, "codec").unwrap();
        let flags = collect_cflags(&engine, &targets[1]).unwrap();
        let src_include = ctx.dirs().src.display().to_string();
        assert_eq!(
            flags,
            vec![
                "-I".to_string(),
                src_include,
                "-iquote/zlib/include".to_string()
            ]
        );
    }
}

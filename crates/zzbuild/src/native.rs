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

use std::process::Command;
use std::rc::Rc;

use anyhow::{Context, bail};

use zzutil::package::NativeRecipe;
use zzutil::process::run_command;

use crate::context::BuildContext;
use crate::target::Target;

impl BuildContext {
    /// One target per native prerequisite, each registered under the
    /// archive name `libL.a` it produces.
    pub fn native_targets(self: &Rc<Self>) -> anyhow::Result<Vec<Rc<Target>>> {
        self.natives
            .get_or_try_init(|| {
                let mut tops = Vec::new();
                for (libname, recipe) in self.descriptor().native.clone() {
                    let top = self.native_target(&libname, &recipe)?;
                    self.set_target(
                        top.basename().expect("native target has a basename"),
                        &top,
                    )?;
                    tops.push(top);
                }
                Ok(tops)
            })
            .cloned()
    }

    fn native_target(
        self: &Rc<Self>,
        libname: &str,
        recipe: &NativeRecipe,
    ) -> anyhow::Result<Rc<Target>> {
        let archive = format!("lib{libname}.a");
        let staging = self.dirs().native.clone();
        let build_dir = match &recipe.dir {
            Some(dir) => staging.join(dir),
            None => staging.clone(),
        };
        let artifact = build_dir.join(recipe.artifact.as_deref().unwrap_or(&archive));

        let mut builder = Target::builder(self)
            .output(self.dirs().lib.clone(), archive.clone())
            .cflags(self.expand_flags(&recipe.cflags))
            .ldflags(self.expand_flags(&recipe.ldflags));

        let mut fetched = None;
        if let Some(url) = &recipe.fetch {
            let Some(filename) = url.rsplit('/').next().filter(|f| !f.is_empty()) else {
                bail!("native `{libname}`: malformed fetch URL `{url}`");
            };
            let fetch = {
                let url = url.clone();
                Target::builder(self)
                    .output(staging.clone(), filename)
                    .build(move |engine, t, _changed| {
                        let out = t.path().expect("fetched archive has a path");
                        let mut cmd = Command::new("curl");
                        cmd.arg("-L").arg("-o").arg(&out).arg(&url);
                        run_command(&mut cmd, engine.quiet())
                            .with_context(|| format!("failed to fetch `{url}`"))
                    })
                    .finish()
            };
            fetched = Some(fetch.path().expect("fetched archive has a path"));
            builder = builder.dep(&fetch);
        }

        let commands: Vec<String> = recipe
            .build
            .iter()
            .map(|c| self.expand(c))
            .collect();
        let libname = libname.to_string();
        let top = builder
            .build(move |engine, t, changed| {
                if let Some(fetched) = &fetched {
                    if !changed.is_empty() || !build_dir.exists() {
                        std::fs::create_dir_all(&staging)?;
                        let mut cmd = Command::new("tar");
                        cmd.arg("xf").arg(fetched).arg("-C").arg(&staging);
                        run_command(&mut cmd, engine.quiet()).with_context(|| {
                            format!("failed to unpack `{}`", fetched.display())
                        })?;
                    }
                }
                if !build_dir.exists() {
                    bail!(
                        "native `{libname}`: build directory `{}` does not exist",
                        build_dir.display()
                    );
                }
                for command in &commands {
                    let mut cmd = Command::new("sh");
                    cmd.arg("-c").arg(command).current_dir(&build_dir);
                    run_command(&mut cmd, engine.quiet())
                        .with_context(|| format!("native `{libname}`: `{command}` failed"))?;
                }
                let out = t.path().expect("native archive has a path");
                std::fs::copy(&artifact, &out).with_context(|| {
                    format!(
                        "native `{libname}`: missing artifact `{}`",
                        artifact.display()
                    )
                })?;
                Ok(())
            })
            .finish();
        Ok(top)
    }

    /// Substitute `${native}` and `${src}` in recipe text.
    fn expand(&self, text: &str) -> String {
        text.replace("${native}", &self.dirs().native.display().to_string())
            .replace("${src}", &self.dirs().src.display().to_string())
    }

    fn expand_flags(&self, flags: &[String]) -> Vec<String> {
        flags.iter().map(|f| self.expand(f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Engine;
    use crate::context::test_support::scratch_workspace;

    fn native_workspace() -> (tempfile::TempDir, Engine) {
        scratch_workspace(&[
            (
                "demo",
                r#"
return {
  package = "demo",
  native = {
    z = {
      build = { "make libz.a" },
      cflags = { "-I${native}" },
      ldflags = { "-lpthread" },
    },
  },
}
"#,
            ),
            ("core", "return { package = \"core\" }\n"),
        ])
    }

    #[test]
    fn native_targets_are_registered_by_archive_name() {
        let (_tmp, engine) = native_workspace();
        let ctx = engine.context("demo").unwrap();
        let tops = ctx.native_targets().unwrap();
        assert_eq!(tops.len(), 1);
        assert_eq!(tops[0].basename(), Some("libz.a"));
        let registered = ctx.get_target("libz.a").unwrap();
        assert!(Rc::ptr_eq(&registered, &tops[0]));
    }

    #[test]
    fn native_targets_are_memoized() {
        let (_tmp, engine) = native_workspace();
        let ctx = engine.context("demo").unwrap();
        let first = ctx.native_targets().unwrap();
        let second = ctx.native_targets().unwrap();
        assert!(Rc::ptr_eq(&first[0], &second[0]));
    }

    #[test]
    fn recipe_flags_are_expanded_and_attached() {
        let (_tmp, engine) = native_workspace();
        let ctx = engine.context("demo").unwrap();
        let tops = ctx.native_targets().unwrap();
        let native_dir = ctx.dirs().native.display().to_string();
        assert_eq!(tops[0].cflags(), [format!("-I{native_dir}")]);
        assert_eq!(tops[0].ldflags(), ["-lpthread".to_string()]);
    }
}

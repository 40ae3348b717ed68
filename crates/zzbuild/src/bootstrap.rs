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

//! Generation of the bootstrap pair: a verbatim copy of the runtime's C
//! template and a synthesized launcher script. The templates are opaque
//! payloads; the engine only prepends a header and appends a trailer.

use std::path::Path;
use std::rc::Rc;

use anyhow::Context;

use zzutil::common::{
    CORE_PACKAGE_GLOBAL, MAIN_SYMBOL, MAIN_TPL_C, MAIN_TPL_LUA, PACKAGE_GLOBAL, core_package,
};
use zzutil::hash::mangle;
use zzutil::package::PackageDescriptor;

use crate::context::{BuildContext, Engine};
use crate::module::{collect_cflags, compile_object, compile_script};
use crate::target::Target;

/// What the generated launcher does after the runtime is up.
pub enum BootstrapFlavor {
    /// Run one application module.
    App(String),
    /// Run the script path passed as the first runtime argument.
    Run,
    /// Run every test argument.
    Test,
}

impl BootstrapFlavor {
    /// Stem of the generated file pair under the tmp directory. Apps get
    /// their own pair so two apps never race on one generated file.
    fn stem(&self) -> String {
        match self {
            BootstrapFlavor::App(name) => format!("{name}_main"),
            BootstrapFlavor::Run => "_run".to_string(),
            BootstrapFlavor::Test => "_test".to_string(),
        }
    }
}

impl BuildContext {
    /// The compiled bootstrap pair for one output flavor: the script
    /// object (under the `_main` symbol) and the C object embedding the
    /// runtime. The generated sources rebuild unconditionally; their
    /// logical inputs include context state no file mtime reflects.
    pub fn bootstrap_targets(
        self: &Rc<Self>,
        engine: &Engine,
        flavor: &BootstrapFlavor,
    ) -> anyhow::Result<Vec<Rc<Target>>> {
        let core_ctx = if self.descriptor().is_core() {
            Rc::clone(self)
        } else {
            engine.context(&core_package())?
        };
        let tpl_c = core_ctx.dirs().src.join(MAIN_TPL_C);
        let tpl_lua = core_ctx.dirs().src.join(MAIN_TPL_LUA);
        let stem = flavor.stem();

        let generated_c = {
            let tpl_c = tpl_c.clone();
            Target::builder(self)
                .output(self.dirs().tmp.clone(), format!("{stem}.c"))
                .dep(&Target::file(&core_ctx, &tpl_c))
                .always()
                .build(move |_engine, t, _changed| {
                    let out = t.path().expect("generated source has a path");
                    std::fs::copy(&tpl_c, &out).with_context(|| {
                        format!("missing runtime template `{}`", tpl_c.display())
                    })?;
                    Ok(())
                })
                .finish()
        };

        let generated_lua = {
            let tpl_lua = tpl_lua.clone();
            let header = bootstrap_header(self.name());
            let trailer = bootstrap_fragment(self.descriptor(), &self.dirs().src, flavor);
            Target::builder(self)
                .output(self.dirs().tmp.clone(), format!("{stem}.lua"))
                .dep(&Target::file(&core_ctx, &tpl_lua))
                .always()
                .build(move |_engine, t, _changed| {
                    let template = std::fs::read_to_string(&tpl_lua).with_context(|| {
                        format!("missing runtime template `{}`", tpl_lua.display())
                    })?;
                    let out = t.path().expect("generated source has a path");
                    std::fs::write(&out, format!("{header}{template}{trailer}"))
                        .with_context(|| format!("failed to write `{}`", out.display()))?;
                    Ok(())
                })
                .finish()
        };

        let script_object = {
            let src = generated_lua.path().expect("generated source has a path");
            Target::builder(self)
                .output(self.dirs().obj.clone(), format!("{stem}.lo"))
                .dep(&generated_lua)
                .build(move |engine, t, _changed| {
                    let out = t.path().expect("script object has a path");
                    compile_script(engine, &src, &out, MAIN_SYMBOL)
                })
                .finish()
        };
        let c_object = {
            let src = generated_c.path().expect("generated source has a path");
            Target::builder(self)
                .output(self.dirs().obj.clone(), format!("{stem}.o"))
                .dep(&generated_c)
                .build(move |engine, t, _changed| {
                    let out = t.path().expect("C object has a path");
                    let flags = collect_cflags(engine, t)?;
                    compile_object(engine, &src, &out, &flags)
                })
                .finish()
        };

        Ok(vec![script_object, c_object])
    }
}

/// The two literal assignments every launcher script starts with.
pub fn bootstrap_header(pkg: &str) -> String {
    format!(
        "{PACKAGE_GLOBAL} = \"{pkg}\"\n{CORE_PACKAGE_GLOBAL} = \"{}\"\n",
        core_package()
    )
}

/// Flavor-specific trailer: virtual-filesystem mounts (real paths
/// prefixed with the package source directory), then the launch call.
fn bootstrap_fragment(desc: &PackageDescriptor, srcdir: &Path, flavor: &BootstrapFlavor) -> String {
    let mut fragment = String::new();
    for (vpath, real) in &desc.mounts {
        fragment.push_str(&format!(
            "vfs.mount(\"{}\", \"{vpath}\")\n",
            srcdir.join(real).display()
        ));
    }
    match flavor {
        BootstrapFlavor::App(name) => {
            fragment.push_str(&format!("run_module(\"{}\")\n", mangle(&desc.package, name)));
        }
        BootstrapFlavor::Run => {
            fragment.push_str("run_script(unpack(arg))\n");
        }
        BootstrapFlavor::Test => {
            fragment.push_str("run_tests(unpack(arg))\n");
        }
    }
    fragment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::scratch_workspace;

    fn bootstrap_workspace() -> (tempfile::TempDir, Engine) {
        let (tmp, engine) = scratch_workspace(&[
            (
                "demo",
                r#"
return {
  package = "demo",
  mounts = { ["www"] = "static" },
  apps = { "demo" },
}
"#,
            ),
            ("core", "return { package = \"core\" }\n"),
        ]);
        let core_src = engine.workspace().src_dir("core");
        std::fs::write(core_src.join(MAIN_TPL_C), "/* runtime */\n").unwrap();
        std::fs::write(core_src.join(MAIN_TPL_LUA), "-- loader\n").unwrap();
        (tmp, engine)
    }

    #[test]
    fn header_binds_both_package_globals() {
        expect_test::expect![[r#"
            ZZ_PACKAGE = "demo"
            ZZ_CORE_PACKAGE = "core"
        "#]]
        .assert_eq(&bootstrap_header("demo"));
    }

    #[test]
    fn app_fragment_mounts_then_runs_the_mangled_module() {
        let (_tmp, engine) = bootstrap_workspace();
        let ctx = engine.context("demo").unwrap();
        let fragment = bootstrap_fragment(
            ctx.descriptor(),
            Path::new("/ws/src/demo"),
            &BootstrapFlavor::App("demo".to_string()),
        );
        let expected = format!(
            "vfs.mount(\"/ws/src/demo/static\", \"www\")\nrun_module(\"{}\")\n",
            mangle("demo", "demo")
        );
        assert_eq!(fragment, expected);
    }

    #[test]
    fn run_and_test_fragments_forward_arguments() {
        let (_tmp, engine) = bootstrap_workspace();
        let ctx = engine.context("core").unwrap();
        let run = bootstrap_fragment(ctx.descriptor(), Path::new("/s"), &BootstrapFlavor::Run);
        assert_eq!(run, "run_script(unpack(arg))\n");
        let test = bootstrap_fragment(ctx.descriptor(), Path::new("/s"), &BootstrapFlavor::Test);
        assert_eq!(test, "run_tests(unpack(arg))\n");
    }

    #[test]
    fn generated_pair_is_script_object_then_c_object() {
        let (_tmp, engine) = bootstrap_workspace();
        let ctx = engine.context("demo").unwrap();
        let pair = ctx
            .bootstrap_targets(&engine, &BootstrapFlavor::App("demo".to_string()))
            .unwrap();
        assert_eq!(pair.len(), 2);
        assert_eq!(pair[0].basename(), Some("demo_main.lo"));
        assert_eq!(pair[1].basename(), Some("demo_main.o"));
    }

    #[test]
    fn generated_sources_are_rebuilt_and_composed() {
        let (_tmp, engine) = bootstrap_workspace();
        let ctx = engine.context("core").unwrap();
        // drive only the generation step of the pair's dependencies
        let pair = ctx
            .bootstrap_targets(&engine, &BootstrapFlavor::Run)
            .unwrap();
        let generated = pair[0].resolved_depends(&engine).unwrap();
        generated[0].make(&engine, false).unwrap();
        let text = std::fs::read_to_string(ctx.dirs().tmp.join("_run.lua")).unwrap();
        expect_test::expect![[r#"
            ZZ_PACKAGE = "core"
            ZZ_CORE_PACKAGE = "core"
            -- loader
            run_script(unpack(arg))
        "#]]
        .assert_eq(&text);
    }
}

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

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, bail};
use indexmap::IndexMap;
use once_cell::unsync::OnceCell;

use zzutil::common::PACKAGE_LUA;
use zzutil::dirs::{PackageDirs, Workspace};
use zzutil::package::PackageDescriptor;

use crate::target::Target;

/// Process-wide build state: the workspace layout, the quiet flag and the
/// per-package context cache. Created once at startup and threaded by
/// reference through every build step.
pub struct Engine {
    workspace: Workspace,
    quiet: bool,
    contexts: RefCell<IndexMap<String, Rc<BuildContext>>>,
}

impl Engine {
    pub fn new(workspace: Workspace, quiet: bool) -> Engine {
        Engine {
            workspace,
            quiet,
            contexts: RefCell::new(IndexMap::new()),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    /// The context of a package, created on first reference and cached
    /// for the whole invocation.
    pub fn context(&self, pkg: &str) -> anyhow::Result<Rc<BuildContext>> {
        if let Some(ctx) = self.contexts.borrow().get(pkg) {
            return Ok(Rc::clone(ctx));
        }
        let ctx = BuildContext::load(self, pkg)?;
        self.contexts
            .borrow_mut()
            .insert(pkg.to_string(), Rc::clone(&ctx));
        Ok(ctx)
    }
}

/// Per-package build state: the descriptor, the derived directories, the
/// named-target registry and the memoized target groups.
#[derive(Debug)]
pub struct BuildContext {
    desc: PackageDescriptor,
    dirs: PackageDirs,
    registry: RefCell<IndexMap<String, Rc<Target>>>,
    pub(crate) natives: OnceCell<Vec<Rc<Target>>>,
    pub(crate) exported: OnceCell<Vec<Rc<Target>>>,
    pub(crate) library: OnceCell<Rc<Target>>,
    pub(crate) link_set: OnceCell<Vec<Rc<Target>>>,
    pub(crate) apps: OnceCell<Vec<Rc<Target>>>,
    pub(crate) modules: RefCell<IndexMap<String, Vec<Rc<Target>>>>,
}

impl BuildContext {
    fn load(engine: &Engine, pkg: &str) -> anyhow::Result<Rc<BuildContext>> {
        let dirs = engine.workspace().package_dirs(pkg);
        let desc = PackageDescriptor::load(&dirs.src.join(PACKAGE_LUA))
            .with_context(|| format!("failed to load package `{pkg}`"))?;
        if desc.package != pkg {
            bail!(
                "descriptor at `{}` declares package `{}`, expected `{pkg}`",
                dirs.src.display(),
                desc.package
            );
        }
        Ok(Rc::new(BuildContext {
            desc,
            dirs,
            registry: RefCell::new(IndexMap::new()),
            natives: OnceCell::new(),
            exported: OnceCell::new(),
            library: OnceCell::new(),
            link_set: OnceCell::new(),
            apps: OnceCell::new(),
            modules: RefCell::new(IndexMap::new()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.desc.package
    }

    pub fn descriptor(&self) -> &PackageDescriptor {
        &self.desc
    }

    pub fn dirs(&self) -> &PackageDirs {
        &self.dirs
    }

    /// Register a named target. Names are write-once: a second
    /// registration is a logic error in a target factory.
    pub fn set_target(&self, name: &str, target: &Rc<Target>) -> anyhow::Result<()> {
        let mut registry = self.registry.borrow_mut();
        if registry.contains_key(name) {
            bail!(
                "target `{name}` registered twice in package `{}`",
                self.name()
            );
        }
        registry.insert(name.to_string(), Rc::clone(target));
        Ok(())
    }

    pub fn get_target(&self, name: &str) -> Option<Rc<Target>> {
        self.registry.borrow().get(name).map(Rc::clone)
    }

    /// Resolve a target reference: this context's registry first, then
    /// the registry of each direct import, loading imported contexts (and
    /// their named targets) on the way.
    pub fn resolve(self: &Rc<Self>, engine: &Engine, name: &str) -> anyhow::Result<Rc<Target>> {
        self.native_targets()?;
        if let Some(t) = self.get_target(name) {
            return Ok(t);
        }
        for import in &self.desc.imports {
            let ctx = engine.context(import)?;
            ctx.native_targets()?;
            if let Some(t) = ctx.get_target(name) {
                return Ok(t);
            }
        }
        bail!(
            "unresolved target reference `{name}` in package `{}`",
            self.name()
        );
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use tempfile::TempDir;

    /// A workspace populated with the given `(package, descriptor)`
    /// pairs, each written to `src/<package>/package.lua`.
    pub fn scratch_workspace(packages: &[(&str, &str)]) -> (TempDir, Engine) {
        let tmp = TempDir::new().unwrap();
        let workspace = Workspace::new(tmp.path());
        for (pkg, descriptor) in packages {
            let src = workspace.src_dir(pkg);
            std::fs::create_dir_all(&src).unwrap();
            std::fs::write(src.join(PACKAGE_LUA), descriptor).unwrap();
        }
        (tmp, Engine::new(workspace, true))
    }

    pub fn scratch_context() -> (TempDir, Engine, Rc<BuildContext>) {
        let (tmp, engine) = scratch_workspace(&[(
            "scratch",
            "return { package = \"scratch\", exports = { \"util\" } }\n",
        )]);
        let ctx = engine.context("scratch").unwrap();
        (tmp, engine, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn contexts_are_cached_by_identifier() {
        let (_tmp, engine, ctx) = {
            let (tmp, engine) = scratch_workspace(&[(
                "scratch",
                "return { package = \"scratch\" }\n",
            )]);
            let ctx = engine.context("scratch").unwrap();
            (tmp, engine, ctx)
        };
        let again = engine.context("scratch").unwrap();
        assert!(Rc::ptr_eq(&ctx, &again));
    }

    #[test]
    fn registry_is_write_once() {
        let (_tmp, _engine, ctx) = scratch_context();
        let t = Target::builder(&ctx).finish();
        ctx.set_target("libz.a", &t).unwrap();
        assert!(Rc::ptr_eq(&ctx.get_target("libz.a").unwrap(), &t));
        let err = ctx.set_target("libz.a", &t).unwrap_err();
        assert!(err.to_string().contains("registered twice"));
    }

    #[test]
    fn resolve_falls_back_to_imports() {
        let (_tmp, engine) = scratch_workspace(&[
            (
                "app",
                "return { package = \"app\", imports = { \"dep\" } }\n",
            ),
            ("dep", "return { package = \"dep\" }\n"),
            ("core", "return { package = \"core\" }\n"),
        ]);
        let app = engine.context("app").unwrap();
        let dep = engine.context("dep").unwrap();
        let t = Target::builder(&dep).finish();
        dep.set_target("libdep.a", &t).unwrap();
        let resolved = app.resolve(&engine, "libdep.a").unwrap();
        assert!(Rc::ptr_eq(&resolved, &t));
    }

    #[test]
    fn resolve_failure_is_fatal() {
        let (_tmp, engine) = scratch_workspace(&[
            ("solo", "return { package = \"solo\" }\n"),
            ("core", "return { package = \"core\" }\n"),
        ]);
        let ctx = engine.context("solo").unwrap();
        let err = ctx.resolve(&engine, "libmissing.a").unwrap_err();
        assert!(err.to_string().contains("unresolved target reference"));
    }

    #[test]
    fn mismatched_descriptor_is_rejected() {
        let (_tmp, engine) = scratch_workspace(&[(
            "lies",
            "return { package = \"something/else\" }\n",
        )]);
        let err = engine.context("lies").unwrap_err();
        assert!(format!("{err:?}").contains("declares package"));
    }
}

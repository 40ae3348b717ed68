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
use std::rc::{Rc, Weak};
use std::time::SystemTime;

use anyhow::Context;
use filetime::FileTime;

use crate::context::{BuildContext, Engine};

/// Build recipe of a target: receives the engine, the target itself and
/// the dependencies whose outputs are newer than the target's output.
pub type BuildFn = Box<dyn Fn(&Engine, &Target, &[Rc<Target>]) -> anyhow::Result<()>>;

/// A dependency edge: either a target node, or a symbolic name resolved
/// against the owning context when `make` runs.
pub enum Dep {
    Node(Rc<Target>),
    Ref(String),
}

/// A node of the build graph. The output location, the dependency list
/// and the build recipe are all optional: a source file has a location
/// but no recipe, a driver root has neither.
pub struct Target {
    ctx: Weak<BuildContext>,
    dirname: Option<PathBuf>,
    basename: Option<String>,
    depends: Vec<Dep>,
    build: Option<BuildFn>,
    cflags: Vec<String>,
    ldflags: Vec<String>,
    /// Rebuild on every make, regardless of timestamps.
    always: bool,
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("dirname", &self.dirname)
            .field("basename", &self.basename)
            .field("cflags", &self.cflags)
            .field("ldflags", &self.ldflags)
            .field("always", &self.always)
            .finish()
    }
}

impl Target {
    pub fn builder(ctx: &Rc<BuildContext>) -> TargetBuilder {
        TargetBuilder {
            ctx: Rc::downgrade(ctx),
            dirname: None,
            basename: None,
            depends: Vec::new(),
            build: None,
            cflags: Vec::new(),
            ldflags: Vec::new(),
            always: false,
        }
    }

    /// A plain input file; `make` recurses into it but never builds it.
    pub fn file(ctx: &Rc<BuildContext>, path: &Path) -> Rc<Target> {
        let dirname = path.parent().map(|p| p.to_path_buf());
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        let mut b = Target::builder(ctx);
        if let (Some(dir), Some(base)) = (dirname, basename) {
            b = b.output(dir, base);
        }
        b.finish()
    }

    pub fn context(&self) -> Option<Rc<BuildContext>> {
        self.ctx.upgrade()
    }

    pub fn path(&self) -> Option<PathBuf> {
        match (&self.dirname, &self.basename) {
            (Some(dir), Some(base)) => Some(dir.join(base)),
            _ => None,
        }
    }

    pub fn basename(&self) -> Option<&str> {
        self.basename.as_deref()
    }

    pub fn cflags(&self) -> &[String] {
        &self.cflags
    }

    pub fn ldflags(&self) -> &[String] {
        &self.ldflags
    }

    /// Modification time of the output; `None` when there is no output
    /// yet (or none at all), which orders before every real timestamp.
    pub fn mtime(&self) -> Option<SystemTime> {
        let path = self.path()?;
        let meta = std::fs::metadata(path).ok()?;
        meta.modified().ok()
    }

    pub(crate) fn resolved_depends(&self, engine: &Engine) -> anyhow::Result<Vec<Rc<Target>>> {
        let mut out = Vec::with_capacity(self.depends.len());
        for dep in &self.depends {
            match dep {
                Dep::Node(t) => out.push(Rc::clone(t)),
                Dep::Ref(name) => {
                    let ctx = self
                        .context()
                        .with_context(|| format!("target reference `{name}` outlived its context"))?;
                    out.push(ctx.resolve(engine, name)?);
                }
            }
        }
        Ok(out)
    }

    /// Post-order walk: make every dependency, then run the build recipe
    /// if the output is missing, older than the newest dependency, or
    /// forced. Dependencies newer than the output are handed to the
    /// recipe so composite builders can work incrementally.
    pub fn make(&self, engine: &Engine, force: bool) -> anyhow::Result<()> {
        let mine = self.mtime();
        let mut newest: Option<SystemTime> = None;
        let mut changed: Vec<Rc<Target>> = Vec::new();
        for dep in self.resolved_depends(engine)? {
            dep.make(engine, force)?;
            if let Some(dep_mtime) = dep.mtime() {
                if mine.is_none_or(|m| dep_mtime > m) {
                    changed.push(Rc::clone(&dep));
                }
                if newest.is_none_or(|n| dep_mtime > n) {
                    newest = Some(dep_mtime);
                }
            }
        }
        let stale = match mine {
            None => true,
            Some(m) => newest.is_some_and(|n| m < n),
        };
        if let Some(build) = &self.build {
            if stale || force || self.always {
                if let Some(dir) = &self.dirname {
                    std::fs::create_dir_all(dir).with_context(|| {
                        format!("failed to create directory `{}`", dir.display())
                    })?;
                }
                build(engine, self, &changed)?;
                if let Some(path) = self.path() {
                    // normalize outputs whose producers leave skewed mtimes
                    filetime::set_file_mtime(&path, FileTime::now()).with_context(|| {
                        format!("failed to touch `{}`", path.display())
                    })?;
                }
            }
        }
        Ok(())
    }

    pub fn force_make(&self, engine: &Engine) -> anyhow::Result<()> {
        self.make(engine, true)
    }
}

pub struct TargetBuilder {
    ctx: Weak<BuildContext>,
    dirname: Option<PathBuf>,
    basename: Option<String>,
    depends: Vec<Dep>,
    build: Option<BuildFn>,
    cflags: Vec<String>,
    ldflags: Vec<String>,
    always: bool,
}

impl TargetBuilder {
    pub fn output(mut self, dirname: impl Into<PathBuf>, basename: impl Into<String>) -> Self {
        self.dirname = Some(dirname.into());
        self.basename = Some(basename.into());
        self
    }

    pub fn dep(mut self, target: &Rc<Target>) -> Self {
        self.depends.push(Dep::Node(Rc::clone(target)));
        self
    }

    pub fn deps<'a>(mut self, targets: impl IntoIterator<Item = &'a Rc<Target>>) -> Self {
        for t in targets {
            self.depends.push(Dep::Node(Rc::clone(t)));
        }
        self
    }

    pub fn dep_ref(mut self, name: impl Into<String>) -> Self {
        self.depends.push(Dep::Ref(name.into()));
        self
    }

    pub fn cflags(mut self, flags: impl IntoIterator<Item = String>) -> Self {
        self.cflags.extend(flags);
        self
    }

    pub fn ldflags(mut self, flags: impl IntoIterator<Item = String>) -> Self {
        self.ldflags.extend(flags);
        self
    }

    pub fn always(mut self) -> Self {
        self.always = true;
        self
    }

    pub fn build(
        mut self,
        f: impl Fn(&Engine, &Target, &[Rc<Target>]) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.build = Some(Box::new(f));
        self
    }

    pub fn finish(self) -> Rc<Target> {
        Rc::new(Target {
            ctx: self.ctx,
            dirname: self.dirname,
            basename: self.basename,
            depends: self.depends,
            build: self.build,
            cflags: self.cflags,
            ldflags: self.ldflags,
            always: self.always,
        })
    }
}

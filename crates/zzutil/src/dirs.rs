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

use thiserror::Error;

use crate::common::{PACKAGE_LUA, WORKSPACE_ENV};

#[derive(Debug, Error)]
pub enum PackageDirsError {
    #[error("not in a zz package (no {PACKAGE_LUA} found starting from {0} or its ancestors)")]
    NotInPackage(PathBuf),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// The workspace root holding the `src/obj/lib/bin/tmp` subtrees.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Workspace {
        Workspace { root: root.into() }
    }

    /// Workspace selected by the `WORKSPACE` environment variable,
    /// defaulting to `$HOME/zz`.
    pub fn from_env() -> Workspace {
        if let Ok(ws) = std::env::var(WORKSPACE_ENV) {
            return Workspace::new(ws);
        }
        let h = home::home_dir();
        if h.is_none() {
            eprintln!("Failed to get home directory");
            std::process::exit(1);
        }
        Workspace::new(h.unwrap().join("zz"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn src_dir(&self, pkg: &str) -> PathBuf {
        self.root.join("src").join(pkg)
    }

    pub fn obj_dir(&self, pkg: &str) -> PathBuf {
        self.root.join("obj").join(pkg)
    }

    pub fn lib_dir(&self, pkg: &str) -> PathBuf {
        self.root.join("lib").join(pkg)
    }

    pub fn bin_dir(&self, pkg: &str) -> PathBuf {
        self.root.join("bin").join(pkg)
    }

    pub fn tmp_dir(&self, pkg: &str) -> PathBuf {
        self.root.join("tmp").join(pkg)
    }

    /// Global executables (symlinks into per-package bin directories).
    pub fn global_bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn package_dirs(&self, pkg: &str) -> PackageDirs {
        PackageDirs {
            src: self.src_dir(pkg),
            obj: self.obj_dir(pkg),
            lib: self.lib_dir(pkg),
            bin: self.bin_dir(pkg),
            tmp: self.tmp_dir(pkg),
            native: self.src_dir(pkg).join("native"),
        }
    }
}

/// Canonical directory roots of one package.
#[derive(Debug, Clone)]
pub struct PackageDirs {
    pub src: PathBuf,
    pub obj: PathBuf,
    pub lib: PathBuf,
    pub bin: PathBuf,
    pub tmp: PathBuf,
    pub native: PathBuf,
}

pub fn check_descriptor_exists(dir: &Path) -> bool {
    dir.join(PACKAGE_LUA).exists()
}

/// Walk upward from `start` until a directory containing `package.lua` is
/// found.
pub fn find_ancestor_with_descriptor(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| check_descriptor_exists(dir))
        .map(|p| p.to_path_buf())
}

/// Locate the package the current directory belongs to.
pub fn find_package_root() -> Result<PathBuf, PackageDirsError> {
    let cwd = std::env::current_dir().map_err(|e| PackageDirsError::Other(e.into()))?;
    find_ancestor_with_descriptor(&cwd).ok_or(PackageDirsError::NotInPackage(cwd))
}

#[test]
fn test_workspace_layout() {
    use expect_test::expect;

    let ws = Workspace::new("/ws");
    let dirs = ws.package_dirs("example.org/demo");
    let dirs = [
        dirs.src,
        dirs.obj,
        dirs.lib,
        dirs.bin,
        dirs.tmp,
        dirs.native,
        ws.global_bin_dir(),
    ];
    let dirs = dirs
        .iter()
        .map(|p| {
            p.strip_prefix(ws.root())
                .unwrap()
                .to_str()
                .unwrap()
                .replace(['\\', '/'], "|")
        })
        .collect::<Vec<_>>();
    expect![[r#"
        [
            "src|example.org|demo",
            "obj|example.org|demo",
            "lib|example.org|demo",
            "bin|example.org|demo",
            "tmp|example.org|demo",
            "src|example.org|demo|native",
            "bin",
        ]
    "#]]
    .assert_debug_eq(&dirs);
}

#[test]
fn test_find_ancestor_with_descriptor() {
    let tmp = tempfile::tempdir().unwrap();
    let pkg = tmp.path().join("src").join("demo");
    let nested = pkg.join("a").join("b");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(pkg.join(PACKAGE_LUA), "return { package = \"demo\" }\n").unwrap();

    let found = find_ancestor_with_descriptor(&nested).unwrap();
    assert_eq!(found, pkg);
    assert!(find_ancestor_with_descriptor(std::path::Path::new("/nonexistent/xyz")).is_none());
}

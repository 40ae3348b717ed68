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

use std::path::Path;

use anyhow::{Context, bail};
use indexmap::IndexMap;

use crate::common::core_package;
use crate::pkg_lua::{Table, Value, parse_descriptor_text};

/// A package declaration, read from `src/<package>/package.lua`.
#[derive(Debug, Clone)]
pub struct PackageDescriptor {
    pub package: String,
    /// Short name of the archive, `lib<libname>.a`.
    pub libname: String,
    pub imports: Vec<String>,
    pub native: IndexMap<String, NativeRecipe>,
    /// Modules linked into the package archive.
    pub exports: Vec<String>,
    /// Compile-time target references of a module's C half.
    pub depends: IndexMap<String, Vec<String>>,
    /// Virtual-filesystem mounts, emitted as text into the bootstrap.
    pub mounts: IndexMap<String, String>,
    pub apps: Vec<String>,
    /// Apps symlinked into the global bin directory by `install`.
    pub install: Vec<String>,
    /// Raw link-time flags contributed to every importing executable.
    pub ldflags: Vec<String>,
}

/// Recipe for one native prerequisite library `libL.a`.
#[derive(Debug, Clone, Default)]
pub struct NativeRecipe {
    /// Source archive URL, fetched into the native staging directory.
    pub fetch: Option<String>,
    /// Unpack/build subdirectory relative to the staging directory.
    pub dir: Option<String>,
    /// Shell commands run inside the build directory.
    pub build: Vec<String>,
    /// Produced archive relative to the build directory; `libL.a` if unset.
    pub artifact: Option<String>,
    /// Compile flags inherited by dependents.
    pub cflags: Vec<String>,
    /// Link flags inherited by importing executables.
    pub ldflags: Vec<String>,
}

impl PackageDescriptor {
    pub fn load(path: &Path) -> anyhow::Result<PackageDescriptor> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?;
        Self::parse(&text).with_context(|| format!("failed to load `{}`", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<PackageDescriptor> {
        let value = parse_descriptor_text(text)?;
        let Value::Table(table) = value else {
            bail!("descriptor must be a table, got {}", value.type_name());
        };
        descriptor_from_table(table)
    }

    /// `true` when this package is the distinguished core package.
    pub fn is_core(&self) -> bool {
        self.package == core_package()
    }
}

fn descriptor_from_table(table: Table) -> anyhow::Result<PackageDescriptor> {
    let mut fields = table.map;
    let package = match fields.shift_remove("package") {
        Some(Value::Str(s)) if !s.is_empty() => s,
        Some(v) => bail!("`package` must be a non-empty string, got {}", v.type_name()),
        None => bail!("descriptor is missing the `package` field"),
    };

    let libname = match fields.shift_remove("libname") {
        Some(Value::Str(s)) => s,
        Some(v) => bail!("`libname` must be a string, got {}", v.type_name()),
        None => package
            .rsplit('/')
            .next()
            .expect("rsplit yields at least one component")
            .to_string(),
    };

    let mut imports = string_list(&mut fields, "imports")?;
    if imports.iter().any(|i| *i == package) {
        bail!("package `{package}` imports itself");
    }
    let core = core_package();
    if package != core && !imports.iter().any(|i| *i == core) {
        imports.push(core);
    }

    let mut exports = string_list(&mut fields, "exports")?;
    if !exports.iter().any(|e| e == "package") {
        exports.push("package".to_string());
    }

    let native = match fields.shift_remove("native") {
        None => IndexMap::new(),
        Some(Value::Table(t)) => {
            if !t.array.is_empty() {
                bail!("`native` entries must be keyed by library name");
            }
            let mut recipes = IndexMap::new();
            for (name, v) in t.map {
                let Value::Table(t) = v else {
                    bail!("native `{name}` must be a table, got {}", v.type_name());
                };
                recipes.insert(name.clone(), recipe_from_table(&name, t)?);
            }
            recipes
        }
        Some(v) => bail!("`native` must be a table, got {}", v.type_name()),
    };

    let depends = match fields.shift_remove("depends") {
        None => IndexMap::new(),
        Some(Value::Table(t)) => {
            let mut depends = IndexMap::new();
            for (module, v) in t.map {
                let Value::Table(refs) = v else {
                    bail!(
                        "depends of `{module}` must be a list, got {}",
                        v.type_name()
                    );
                };
                depends.insert(module, strings_of(&refs.array, "depends")?);
            }
            depends
        }
        Some(v) => bail!("`depends` must be a table, got {}", v.type_name()),
    };

    let mounts = match fields.shift_remove("mounts") {
        None => IndexMap::new(),
        Some(Value::Table(t)) => {
            let mut mounts = IndexMap::new();
            for (vpath, v) in t.map {
                let Value::Str(real) = v else {
                    bail!("mount `{vpath}` must be a string, got {}", v.type_name());
                };
                mounts.insert(vpath, real);
            }
            mounts
        }
        Some(v) => bail!("`mounts` must be a table, got {}", v.type_name()),
    };

    let apps = string_list(&mut fields, "apps")?;
    let install = string_list(&mut fields, "install")?;
    for app in &install {
        if !apps.iter().any(|a| a == app) {
            bail!("`install` names unknown app `{app}`");
        }
    }
    let ldflags = string_list(&mut fields, "ldflags")?;

    if let Some(unknown) = fields.keys().next() {
        log::warn!("ignoring unknown descriptor field `{unknown}`");
    }

    Ok(PackageDescriptor {
        package,
        libname,
        imports,
        native,
        exports,
        depends,
        mounts,
        apps,
        install,
        ldflags,
    })
}

fn recipe_from_table(name: &str, table: Table) -> anyhow::Result<NativeRecipe> {
    let mut fields = table.map;
    let mut opt_string = |key: &str| -> anyhow::Result<Option<String>> {
        match fields.shift_remove(key) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s)),
            Some(v) => bail!(
                "native `{name}`: `{key}` must be a string, got {}",
                v.type_name()
            ),
        }
    };
    let fetch = opt_string("fetch")?;
    let dir = opt_string("dir")?;
    let artifact = opt_string("artifact")?;
    let build = string_list(&mut fields, "build")?;
    let cflags = string_list(&mut fields, "cflags")?;
    let ldflags = string_list(&mut fields, "ldflags")?;
    Ok(NativeRecipe {
        fetch,
        dir,
        build,
        artifact,
        cflags,
        ldflags,
    })
}

fn string_list(fields: &mut IndexMap<String, Value>, key: &str) -> anyhow::Result<Vec<String>> {
    match fields.shift_remove(key) {
        None => Ok(vec![]),
        Some(Value::Table(t)) => {
            if !t.map.is_empty() {
                bail!("`{key}` must be a plain list of strings");
            }
            strings_of(&t.array, key)
        }
        Some(v) => bail!("`{key}` must be a list, got {}", v.type_name()),
    }
}

fn strings_of(values: &[Value], key: &str) -> anyhow::Result<Vec<String>> {
    values
        .iter()
        .map(|v| match v {
            Value::Str(s) => Ok(s.clone()),
            other => bail!("`{key}` entries must be strings, got {}", other.type_name()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let desc = PackageDescriptor::parse(
            r#"
return {
  package = "example.org/demo",
  exports = { "util" },
}
"#,
        )
        .unwrap();
        assert_eq!(desc.package, "example.org/demo");
        assert_eq!(desc.libname, "demo");
        // the implicit core import and the implicit "package" export
        assert_eq!(desc.imports, vec!["core".to_string()]);
        assert_eq!(
            desc.exports,
            vec!["util".to_string(), "package".to_string()]
        );
        assert!(desc.apps.is_empty());
        assert!(desc.ldflags.is_empty());
    }

    #[test]
    fn core_gets_no_implicit_import() {
        let desc = PackageDescriptor::parse(
            r#"
return {
  package = "core",
  exports = { "util" },
}
"#,
        )
        .unwrap();
        assert!(desc.imports.is_empty());
        assert_eq!(desc.libname, "core");
    }

    #[test]
    fn explicit_core_import_is_not_duplicated() {
        let desc = PackageDescriptor::parse(
            r#"
return {
  package = "example.org/demo",
  imports = { "core", "example.org/other" },
}
"#,
        )
        .unwrap();
        assert_eq!(
            desc.imports,
            vec!["core".to_string(), "example.org/other".to_string()]
        );
    }

    #[test]
    fn full_descriptor() {
        let desc = PackageDescriptor::parse(
            r#"
return {
  package = "example.org/demo",
  libname = "demolib",
  imports = { "example.org/other" },
  exports = { "util", "codec", "package" },
  native = {
    z = {
      fetch = "https://example.org/zlib-1.3.tar.gz",
      dir = "zlib-1.3",
      build = { "./configure --static", "make libz.a" },
      cflags = { "-I${native}/zlib-1.3" },
      ldflags = {},
    },
  },
  depends = { codec = { "libz.a" } },
  mounts = { ["www"] = "static" },
  apps = { "demo" },
  install = { "demo" },
  ldflags = { "-lm" },
}
"#,
        )
        .unwrap();
        assert_eq!(desc.libname, "demolib");
        assert_eq!(
            desc.imports,
            vec!["example.org/other".to_string(), "core".to_string()]
        );
        assert_eq!(desc.exports.len(), 3);
        let z = &desc.native["z"];
        assert_eq!(z.dir.as_deref(), Some("zlib-1.3"));
        assert_eq!(z.build.len(), 2);
        assert_eq!(desc.depends["codec"], vec!["libz.a".to_string()]);
        assert_eq!(desc.mounts["www"], "static");
        assert_eq!(desc.install, vec!["demo".to_string()]);
        assert_eq!(desc.ldflags, vec!["-lm".to_string()]);
    }

    #[test]
    fn missing_package_is_fatal() {
        let err = PackageDescriptor::parse("return { exports = {} }").unwrap_err();
        assert!(err.to_string().contains("missing the `package` field"));
    }

    #[test]
    fn self_import_is_rejected() {
        let err = PackageDescriptor::parse(
            r#"return { package = "a/b", imports = { "a/b" } }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("imports itself"));
    }

    #[test]
    fn install_must_name_an_app() {
        let err = PackageDescriptor::parse(
            r#"return { package = "a/b", install = { "ghost" } }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown app"));
    }
}

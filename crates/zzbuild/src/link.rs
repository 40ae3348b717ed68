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

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;
use std::rc::Rc;

use anyhow::{Context, bail};
use petgraph::graph::DiGraph;

use zzutil::process::{run_command, tool};

use crate::bootstrap::BootstrapFlavor;
use crate::context::{BuildContext, Engine};
use crate::graph::get_example_cycle;
use crate::target::Target;

impl BuildContext {
    /// Every context reachable through imports, this one first, imports
    /// in declaration order (pre-order, each context visited once).
    /// Import cycles are rejected here.
    pub fn reachable_contexts(
        self: &Rc<Self>,
        engine: &Engine,
    ) -> anyhow::Result<Vec<Rc<BuildContext>>> {
        fn visit(
            engine: &Engine,
            ctx: &Rc<BuildContext>,
            out: &mut Vec<Rc<BuildContext>>,
            graph: &mut DiGraph<String, usize>,
            nodes: &mut HashMap<String, petgraph::graph::NodeIndex>,
        ) -> anyhow::Result<()> {
            let node = *nodes
                .entry(ctx.name().to_string())
                .or_insert_with(|| graph.add_node(ctx.name().to_string()));
            if out.iter().any(|c| Rc::ptr_eq(c, ctx)) {
                return Ok(());
            }
            out.push(Rc::clone(ctx));
            for import in &ctx.descriptor().imports {
                let imported = engine.context(import)?;
                let dep_node = *nodes
                    .entry(imported.name().to_string())
                    .or_insert_with(|| graph.add_node(imported.name().to_string()));
                graph.add_edge(node, dep_node, 0);
                visit(engine, &imported, out, graph, nodes)?;
            }
            Ok(())
        }

        let mut out = Vec::new();
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        visit(engine, self, &mut out, &mut graph, &mut nodes)?;

        if let Err(cycle) = petgraph::algo::toposort(&graph, None) {
            let cycle = get_example_cycle(&graph, cycle.node_id());
            let cycle = cycle
                .into_iter()
                .map(|n| graph[n].clone())
                .collect::<Vec<_>>();
            bail!("cyclic imports detected: {:?}", cycle);
        }
        Ok(out)
    }

    /// The archive of every exported module, `lib<libname>.a`.
    pub fn library_target(self: &Rc<Self>, engine: &Engine) -> anyhow::Result<Rc<Target>> {
        self.library
            .get_or_try_init(|| {
                let exported = self.exported_targets(engine)?;
                let archive = format!("lib{}.a", self.descriptor().libname);
                let target = Target::builder(self)
                    .output(self.dirs().lib.clone(), archive)
                    .deps(&exported)
                    .build(|engine, t, changed| {
                        // `ar r` replaces just the members handed to it,
                        // so only the moved objects are re-ingested
                        if changed.is_empty() {
                            return Ok(());
                        }
                        let ar = tool("AR", "ar")?;
                        let mut cmd = Command::new(ar);
                        cmd.arg("rsc")
                            .arg(t.path().expect("archive has a path"));
                        for member in changed {
                            cmd.arg(
                                member
                                    .path()
                                    .context("archive member has no output path")?,
                            );
                        }
                        run_command(&mut cmd, engine.quiet())
                    })
                    .finish();
                Ok(target)
            })
            .cloned()
    }

    /// Libraries an executable of this package links against: for each
    /// reachable context, its archive followed by its native
    /// prerequisites. Each library appears exactly once.
    pub fn link_targets(self: &Rc<Self>, engine: &Engine) -> anyhow::Result<Vec<Rc<Target>>> {
        self.link_set
            .get_or_try_init(|| {
                let mut set = Vec::new();
                for ctx in self.reachable_contexts(engine)? {
                    set.push(ctx.library_target(engine)?);
                    set.extend(ctx.native_targets()?);
                }
                Ok(set)
            })
            .cloned()
    }

    /// Raw link flags, in the same visitation order as the link set:
    /// declared package flags first, then native-recipe flags.
    pub fn link_flags(self: &Rc<Self>, engine: &Engine) -> anyhow::Result<Vec<String>> {
        let mut flags = Vec::new();
        for ctx in self.reachable_contexts(engine)? {
            flags.extend(ctx.descriptor().ldflags.iter().cloned());
            for native in ctx.native_targets()? {
                flags.extend(native.ldflags().iter().cloned());
            }
        }
        Ok(flags)
    }

    /// One executable target per declared application.
    pub fn app_targets(self: &Rc<Self>, engine: &Engine) -> anyhow::Result<Vec<Rc<Target>>> {
        self.apps
            .get_or_try_init(|| {
                let mut apps = Vec::new();
                for app in self.descriptor().apps.clone() {
                    apps.push(self.app_target(engine, &app)?);
                }
                Ok(apps)
            })
            .cloned()
    }

    fn app_target(self: &Rc<Self>, engine: &Engine, name: &str) -> anyhow::Result<Rc<Target>> {
        let mut objects = Vec::new();
        // apps that are also exported ride in through the archive
        if !self.descriptor().exports.iter().any(|e| e == name) {
            objects.extend(self.module_targets(engine, name)?);
        }
        let bootstrap = self.bootstrap_targets(engine, &BootstrapFlavor::App(name.to_string()))?;
        self.executable_target(engine, self.dirs().bin.clone(), name, bootstrap, objects)
    }

    /// Link an executable from the bootstrap pair, any extra objects and
    /// the full link set. Static archives are bracketed so every member
    /// lands in the image; the loader resolves them by name at runtime.
    pub(crate) fn executable_target(
        self: &Rc<Self>,
        engine: &Engine,
        dir: PathBuf,
        name: &str,
        bootstrap: Vec<Rc<Target>>,
        extra_objects: Vec<Rc<Target>>,
    ) -> anyhow::Result<Rc<Target>> {
        let archives = self.link_targets(engine)?;
        let ldflags = self.link_flags(engine)?;
        let mut objects = bootstrap;
        objects.extend(extra_objects);

        let builder = Target::builder(self)
            .output(dir, name)
            .deps(&objects)
            .deps(&archives);
        let target = builder
            .build(move |engine, t, _changed| {
                let cc = tool("CC", "cc")?;
                let mut cmd = Command::new(cc);
                cmd.arg("-o").arg(t.path().expect("executable has a path"));
                for object in &objects {
                    cmd.arg(object.path().context("object has no output path")?);
                }
                cmd.arg("-rdynamic").arg("-Wl,--whole-archive");
                for archive in &archives {
                    cmd.arg(archive.path().context("archive has no output path")?);
                }
                cmd.arg("-Wl,--no-whole-archive");
                for flag in &ldflags {
                    cmd.arg(flag);
                }
                run_command(&mut cmd, engine.quiet())
            })
            .finish();
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::scratch_workspace;

    fn diamond_workspace() -> (tempfile::TempDir, Engine) {
        // app imports lib1 and lib2, both of which import base
        scratch_workspace(&[
            (
                "app",
                "return { package = \"app\", imports = { \"lib1\", \"lib2\" } }\n",
            ),
            (
                "lib1",
                "return { package = \"lib1\", imports = { \"base\" } }\n",
            ),
            (
                "lib2",
                "return { package = \"lib2\", imports = { \"base\" } }\n",
            ),
            ("base", "return { package = \"base\" }\n"),
            ("core", "return { package = \"core\" }\n"),
        ])
    }

    #[test]
    fn reachable_contexts_visit_each_context_once() {
        let (_tmp, engine) = diamond_workspace();
        let app = engine.context("app").unwrap();
        let reachable = app.reachable_contexts(&engine).unwrap();
        let names: Vec<&str> = reachable.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["app", "lib1", "base", "core", "lib2"]);
    }

    #[test]
    fn link_set_lists_each_library_once() {
        let (_tmp, engine) = diamond_workspace();
        let app = engine.context("app").unwrap();
        let set = app.link_targets(&engine).unwrap();
        let names: Vec<&str> = set.iter().filter_map(|t| t.basename()).collect();
        assert_eq!(
            names,
            vec!["libapp.a", "liblib1.a", "libbase.a", "libcore.a", "liblib2.a"]
        );
    }

    #[test]
    fn link_flags_concatenate_in_walk_order() {
        let (_tmp, engine) = scratch_workspace(&[
            (
                "app",
                "return { package = \"app\", imports = { \"dep\" }, ldflags = { \"-La\" } }\n",
            ),
            (
                "dep",
                "return { package = \"dep\", ldflags = { \"-Ld\", \"-lz\" } }\n",
            ),
            ("core", "return { package = \"core\", ldflags = { \"-lm\" } }\n"),
        ]);
        let app = engine.context("app").unwrap();
        let flags = app.link_flags(&engine).unwrap();
        assert_eq!(flags, vec!["-La", "-Ld", "-lz", "-lm"]);
    }

    #[test]
    fn import_cycles_are_rejected() {
        let (_tmp, engine) = scratch_workspace(&[
            (
                "ping",
                "return { package = \"ping\", imports = { \"pong\" } }\n",
            ),
            (
                "pong",
                "return { package = \"pong\", imports = { \"ping\" } }\n",
            ),
            ("core", "return { package = \"core\" }\n"),
        ]);
        let ping = engine.context("ping").unwrap();
        let err = ping.reachable_contexts(&engine).unwrap_err();
        assert!(err.to_string().contains("cyclic imports"));
    }

    #[test]
    fn library_target_is_memoized() {
        let (_tmp, engine) = scratch_workspace(&[
            ("solo", "return { package = \"solo\" }\n"),
            ("core", "return { package = \"core\" }\n"),
        ]);
        let ctx = engine.context("solo").unwrap();
        let first = ctx.library_target(&engine).unwrap();
        let second = ctx.library_target(&engine).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.basename(), Some("libsolo.a"));
    }
}

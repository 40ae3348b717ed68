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

pub mod acquire;
pub mod build;
pub mod clean;
pub mod run;
pub mod test;
pub mod version;

pub use acquire::*;
pub use build::*;
pub use clean::*;
pub use run::*;
pub use test::*;
pub use version::*;

use zzbuild::context::Engine;
use zzutil::cli::UniversalFlags;
use zzutil::common::PACKAGE_LUA;
use zzutil::dirs::{Workspace, find_package_root};
use zzutil::package::PackageDescriptor;
use zzutil::pkgid::PackageId;

#[derive(Debug, clap::Parser)]
#[clap(
    name = "zz",
    about = "The build system and package manager for the zz language."
)]
pub struct ZzCli {
    #[clap(subcommand)]
    pub subcommand: ZzSubcommands,

    #[clap(flatten)]
    pub flags: UniversalFlags,
}

#[derive(Debug, clap::Parser)]
pub enum ZzSubcommands {
    // Source acquisition
    Init(InitSubcommand),
    Checkout(CheckoutSubcommand),
    Get(GetSubcommand),

    // Build system
    Build(BuildSubcommand),
    Install(InstallSubcommand),
    Run(RunSubcommand),
    Test(TestSubcommand),
    Clean(CleanSubcommand),
    Distclean(DistcleanSubcommand),

    Version(VersionSubcommand),
}

pub(crate) fn make_engine(flags: &UniversalFlags) -> Engine {
    Engine::new(Workspace::from_env(), flags.quiet)
}

/// The package an action applies to: the given identifier (VCS forms
/// accepted), or the package the current directory belongs to.
pub(crate) fn target_package(pkg: Option<&String>) -> anyhow::Result<String> {
    match pkg {
        Some(pkg) => Ok(pkg
            .parse::<PackageId>()
            .map(|id| id.identifier().to_string())
            .unwrap_or_else(|_| pkg.clone())),
        None => {
            let root = find_package_root()?;
            let desc = PackageDescriptor::load(&root.join(PACKAGE_LUA))?;
            Ok(desc.package)
        }
    }
}

// Copyright 2024 International Digital Economy Academy
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
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use zzbuild::entry;
use zzutil::cli::UniversalFlags;

use super::{make_engine, target_package};

/// Build a package's library and applications
#[derive(Debug, clap::Parser)]
pub struct BuildSubcommand {
    /// The package to build; defaults to the current one
    pub package: Option<String>,

    /// Build imported packages first, recursively
    #[clap(long, short = 'r')]
    pub recursive: bool,
}

pub fn run_build(cli: &UniversalFlags, cmd: &BuildSubcommand) -> anyhow::Result<i32> {
    let engine = make_engine(cli);
    let pkg = target_package(cmd.package.as_ref())?;
    entry::build(&engine, &pkg, cmd.recursive, true)?;
    Ok(0)
}

/// Build recursively and symlink installed apps into the global bin
/// directory
#[derive(Debug, clap::Parser)]
pub struct InstallSubcommand {
    /// The package to install; defaults to the current one
    pub package: Option<String>,
}

pub fn run_install(cli: &UniversalFlags, cmd: &InstallSubcommand) -> anyhow::Result<i32> {
    let engine = make_engine(cli);
    let pkg = target_package(cmd.package.as_ref())?;
    entry::install(&engine, &pkg)?;
    Ok(0)
}

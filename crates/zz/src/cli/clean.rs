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

/// Remove a package's object, library and tmp trees
#[derive(Debug, clap::Parser)]
pub struct CleanSubcommand {
    /// The package to clean; defaults to the current one
    pub package: Option<String>,
}

pub fn run_clean(cli: &UniversalFlags, cmd: &CleanSubcommand) -> anyhow::Result<i32> {
    let engine = make_engine(cli);
    let pkg = target_package(cmd.package.as_ref())?;
    entry::clean(&engine, &pkg)?;
    Ok(0)
}

/// Clean plus executables, native staging and global symlinks
#[derive(Debug, clap::Parser)]
pub struct DistcleanSubcommand {
    /// The package to clean; defaults to the current one
    pub package: Option<String>,
}

pub fn run_distclean(cli: &UniversalFlags, cmd: &DistcleanSubcommand) -> anyhow::Result<i32> {
    let engine = make_engine(cli);
    let pkg = target_package(cmd.package.as_ref())?;
    entry::distclean(&engine, &pkg)?;
    Ok(0)
}

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

use std::path::PathBuf;

use zzbuild::entry;
use zzutil::cli::UniversalFlags;

use super::{make_engine, target_package};

/// Run a script inside the current package
#[derive(Debug, clap::Parser)]
pub struct RunSubcommand {
    /// The script to run; must live under the package source tree
    pub script: PathBuf,

    /// Arguments forwarded to the script
    pub args: Vec<String>,
}

pub fn run_run(cli: &UniversalFlags, cmd: RunSubcommand) -> anyhow::Result<i32> {
    let engine = make_engine(cli);
    let pkg = target_package(None)?;
    entry::run(&engine, &pkg, &cmd.script, &cmd.args)
}

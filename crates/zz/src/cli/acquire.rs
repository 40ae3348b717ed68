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

use zzbuild::acquire;
use zzutil::cli::UniversalFlags;

use super::make_engine;

/// Create a new package in the workspace
#[derive(Debug, clap::Parser)]
pub struct InitSubcommand {
    /// The package identifier, e.g. `example.org/demo`
    pub package: String,
}

pub fn run_init(cli: &UniversalFlags, cmd: &InitSubcommand) -> anyhow::Result<i32> {
    let engine = make_engine(cli);
    acquire::init(&engine, &cmd.package)?;
    Ok(0)
}

/// Clone (or update) a package source tree
#[derive(Debug, clap::Parser)]
pub struct CheckoutSubcommand {
    /// The package identifier or remote URL
    pub package: String,

    /// Pull the latest changes when the tree already exists
    #[clap(long, short = 'u')]
    pub update: bool,

    /// Check out a specific ref after cloning
    #[clap(long, short = 'r', value_name = "REF")]
    pub reference: Option<String>,
}

pub fn run_checkout(cli: &UniversalFlags, cmd: &CheckoutSubcommand) -> anyhow::Result<i32> {
    let engine = make_engine(cli);
    acquire::checkout(
        &engine,
        &cmd.package,
        cmd.update,
        cmd.reference.as_deref(),
    )?;
    Ok(0)
}

/// Checkout a package and, transitively, its imports
#[derive(Debug, clap::Parser)]
pub struct GetSubcommand {
    /// The package identifier or remote URL
    pub package: String,

    /// Update trees that are already present
    #[clap(long, short = 'u')]
    pub update: bool,
}

pub fn run_get(cli: &UniversalFlags, cmd: &GetSubcommand) -> anyhow::Result<i32> {
    let engine = make_engine(cli);
    acquire::get(&engine, &cmd.package, cmd.update)?;
    Ok(0)
}

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

#![warn(clippy::clone_on_ref_ptr)]

use clap::Parser;
use cli::ZzSubcommands;

mod cli;

use colored::*;

fn init_log() {
    use std::io::Write;
    // usage example: only show debug logs for the zzbuild::target module
    // env RUST_LOG=zzbuild::target=debug zz build

    // log level: error > warn > info > debug > trace
    env_logger::Builder::from_env(env_logger::Env::default())
        .target(env_logger::Target::Stdout)
        .format(|buf, record| {
            let level_style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "{} [{}] [{}:{}] {}",
                level_style.value(record.level()),
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();
}

pub fn main() {
    init_log();
    match main1() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {:?}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn main1() -> anyhow::Result<i32> {
    let cli = cli::ZzCli::parse();
    let flags = cli.flags;
    use ZzSubcommands::*;
    match cli.subcommand {
        Init(c) => cli::run_init(&flags, &c),
        Checkout(c) => cli::run_checkout(&flags, &c),
        Get(c) => cli::run_get(&flags, &c),
        Build(c) => cli::run_build(&flags, &c),
        Install(c) => cli::run_install(&flags, &c),
        Run(c) => cli::run_run(&flags, c),
        Test(c) => cli::run_test(&flags, c),
        Clean(c) => cli::run_clean(&flags, &c),
        Distclean(c) => cli::run_distclean(&flags, &c),
        Version(c) => cli::run_version(&c),
    }
}

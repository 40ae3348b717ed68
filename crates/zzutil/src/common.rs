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

pub const PACKAGE_LUA: &str = "package.lua";

pub const WORKSPACE_ENV: &str = "WORKSPACE";
pub const CORE_PACKAGE_ENV: &str = "ZZ_CORE_PACKAGE";
pub const DEFAULT_CORE_PACKAGE: &str = "core";

/// Runtime loader templates, looked up in the core package's source tree.
pub const MAIN_TPL_C: &str = "_main.tpl.c";
pub const MAIN_TPL_LUA: &str = "_main.tpl.lua";

/// The symbol the loader entry point expects the bootstrap script under.
pub const MAIN_SYMBOL: &str = "_main";

/// Globals bound at the top of every generated bootstrap script.
pub const PACKAGE_GLOBAL: &str = "ZZ_PACKAGE";
pub const CORE_PACKAGE_GLOBAL: &str = "ZZ_CORE_PACKAGE";

/// The package every non-core package implicitly imports.
pub fn core_package() -> String {
    std::env::var(CORE_PACKAGE_ENV).unwrap_or_else(|_| DEFAULT_CORE_PACKAGE.to_string())
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

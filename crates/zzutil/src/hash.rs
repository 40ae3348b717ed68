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

use std::fmt::Write;

use sha2::{Digest, Sha256};

/// The loader symbol a module is registered under inside an executable:
/// `zz_` followed by 160 bits of the SHA-256 of `<package>/<module>`.
pub fn mangle(pkg: &str, module: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pkg.as_bytes());
    hasher.update(b"/");
    hasher.update(module.as_bytes());
    let digest = hasher.finalize();
    let mut sym = String::with_capacity(43);
    sym.push_str("zz_");
    for b in &digest[..20] {
        write!(sym, "{b:02x}").unwrap();
    }
    sym
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mangle_is_stable() {
        use expect_test::expect;

        expect![[r#"
            [
                "zz_b1038a5dcce27c5cc8058be8af6c5873a7e43330",
                "zz_0b9c257d4492e16fe4bb3ba598b234813ebb11a2",
                "zz_da6885daabf96ce483a919cd92f63456ba83ea55",
            ]
        "#]]
        .assert_debug_eq(&vec![
            mangle("core", "util"),
            mangle("example.org/demo", "codec"),
            mangle("example.org/demo", "codec/huffman"),
        ]);
    }

    #[test]
    fn mangle_shape() {
        let sym = mangle("a", "b");
        assert!(sym.starts_with("zz_"));
        assert_eq!(sym.len(), 3 + 40);
        assert_ne!(mangle("a", "b"), mangle("a", "c"));
    }
}

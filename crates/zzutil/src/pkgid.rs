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

use std::fmt::{self, Display};
use std::str::FromStr;

use anyhow::bail;

/// A parsed package identifier: the workspace-relative identifier
/// (`host/path`) together with the remote URL it is fetched from.
///
/// Accepted input forms:
/// - `user@host:path[.git]` (scp-like), remote URL as given
/// - `https://host/path[.git]`, remote URL as given
/// - `host/path`, remote URL `https://host/path`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageId {
    identifier: String,
    url: String,
}

impl PackageId {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn strip_git_suffix(s: &str) -> &str {
    s.strip_suffix(".git").unwrap_or(s)
}

impl FromStr for PackageId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<PackageId> {
        if s.is_empty() {
            bail!("empty package identifier");
        }
        if let Some(rest) = s.strip_prefix("https://").or_else(|| s.strip_prefix("http://")) {
            let identifier = strip_git_suffix(rest).to_string();
            if !identifier.contains('/') {
                bail!("malformed package identifier `{s}`");
            }
            return Ok(PackageId {
                identifier,
                url: s.to_string(),
            });
        }
        // scp-like: user@host:path
        if let Some(at) = s.find('@') {
            let Some(colon) = s[at..].find(':') else {
                bail!("malformed package identifier `{s}` (expected `user@host:path`)");
            };
            let host = &s[at + 1..at + colon];
            let path = strip_git_suffix(&s[at + colon + 1..]);
            if host.is_empty() || path.is_empty() {
                bail!("malformed package identifier `{s}` (expected `user@host:path`)");
            }
            return Ok(PackageId {
                identifier: format!("{host}/{path}"),
                url: s.to_string(),
            });
        }
        if !s.contains('/') {
            bail!("malformed package identifier `{s}` (expected `host/path`)");
        }
        Ok(PackageId {
            identifier: s.to_string(),
            url: format!("https://{s}"),
        })
    }
}

impl Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> (String, String) {
        let id: PackageId = s.parse().unwrap();
        (id.identifier().to_string(), id.url().to_string())
    }

    #[test]
    fn parse_scp_like() {
        assert_eq!(
            parse("git@example.org:demo/pkg.git"),
            (
                "example.org/demo/pkg".to_string(),
                "git@example.org:demo/pkg.git".to_string()
            )
        );
        assert_eq!(
            parse("git@example.org:demo/pkg"),
            (
                "example.org/demo/pkg".to_string(),
                "git@example.org:demo/pkg".to_string()
            )
        );
    }

    #[test]
    fn parse_https() {
        assert_eq!(
            parse("https://example.org/demo/pkg.git"),
            (
                "example.org/demo/pkg".to_string(),
                "https://example.org/demo/pkg.git".to_string()
            )
        );
    }

    #[test]
    fn parse_plain() {
        assert_eq!(
            parse("example.org/demo/pkg"),
            (
                "example.org/demo/pkg".to_string(),
                "https://example.org/demo/pkg".to_string()
            )
        );
    }

    #[test]
    fn parse_round_trips() {
        for s in [
            "git@example.org:demo/pkg.git",
            "https://example.org/demo/pkg",
            "example.org/demo/pkg",
        ] {
            let first: PackageId = s.parse().unwrap();
            let again: PackageId = s.parse().unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!("".parse::<PackageId>().is_err());
        assert!("plainname".parse::<PackageId>().is_err());
        assert!("user@host".parse::<PackageId>().is_err());
        assert!("https://host".parse::<PackageId>().is_err());
    }
}

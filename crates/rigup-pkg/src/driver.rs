//! Package driver abstraction.
//!
//! The plan generator and CLI consume only an installed-reference set
//! and per-reference install results; how those are obtained is behind
//! the [`PackageDriver`] trait so tests can substitute a fake and the
//! subprocess implementation stays swappable per platform.

use std::collections::BTreeSet;

use camino::Utf8Path;

use crate::error::Result;

/// A package manager the tool can drive.
pub trait PackageDriver {
    /// Driver name as used in manifest `refs` keys (`winget`, `brew`, ...).
    fn name(&self) -> &str;

    /// References of currently installed packages.
    fn list_installed(&self) -> impl std::future::Future<Output = Result<BTreeSet<String>>> + Send;

    /// Install one package by reference.
    fn install(&self, reference: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Write a machine-readable export of the installed set to a file.
    fn export(&self, output: &Utf8Path) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// The package managers rigup knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    Winget,
    Brew,
    Apt,
}

impl DriverKind {
    pub fn for_name(name: &str) -> Option<Self> {
        match name {
            "winget" => Some(Self::Winget),
            "brew" => Some(Self::Brew),
            "apt" => Some(Self::Apt),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Winget => "winget",
            Self::Brew => "brew",
            Self::Apt => "apt",
        }
    }

    /// Binary used to query the installed set. For apt the query goes
    /// through dpkg, which needs no elevated rights.
    pub fn query_binary(&self) -> &'static str {
        match self {
            Self::Winget => "winget",
            Self::Brew => "brew",
            Self::Apt => "dpkg-query",
        }
    }

    pub fn install_binary(&self) -> &'static str {
        match self {
            Self::Winget => "winget",
            Self::Brew => "brew",
            Self::Apt => "apt-get",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_names_round_trip() {
        for kind in [DriverKind::Winget, DriverKind::Brew, DriverKind::Apt] {
            assert_eq!(DriverKind::for_name(kind.name()), Some(kind));
        }
        assert_eq!(DriverKind::for_name("chocolatey"), None);
    }

    #[test]
    fn apt_queries_through_dpkg() {
        assert_eq!(DriverKind::Apt.query_binary(), "dpkg-query");
        assert_eq!(DriverKind::Apt.install_binary(), "apt-get");
    }
}

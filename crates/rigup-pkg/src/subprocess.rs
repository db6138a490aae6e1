//! Subprocess-backed package driver.
//!
//! Every invocation has a bounded wait: a package manager that hangs on
//! a prompt or a stuck download is killed at the timeout and reported
//! as a driver failure rather than wedging the whole run.

use std::collections::BTreeSet;
use std::time::Duration;

use camino::Utf8Path;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use crate::driver::{DriverKind, PackageDriver};
use crate::error::{Error, Result};

/// Bounded wait for any single driver invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// A [`PackageDriver`] that shells out to the platform package manager.
pub struct SubprocessDriver {
    kind: DriverKind,
    timeout: Duration,
}

impl SubprocessDriver {
    /// Create a driver after verifying its query binary is on PATH.
    pub fn detect(kind: DriverKind) -> Result<Self> {
        which::which(kind.query_binary())
            .map_err(|_| Error::driver_not_found(kind.query_binary()))?;
        Ok(Self {
            kind,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, binary: &str, args: &[&str]) -> Result<String> {
        debug!(binary, ?args, "Running package driver");
        let mut command = Command::new(binary);
        command.args(args).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| Error::Timeout {
                binary: binary.to_string(),
                seconds: self.timeout.as_secs(),
            })??;

        if !output.status.success() {
            return Err(Error::command_failed(
                binary,
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn winget_installed(&self) -> Result<BTreeSet<String>> {
        // winget's list output is a human-aligned table; its export
        // format is stable JSON, so the installed set goes through a
        // temporary export file instead.
        let tmp = std::env::temp_dir().join(format!("rigup-winget-{}.json", std::process::id()));
        let tmp_str = tmp.to_string_lossy().into_owned();

        let result = self
            .run(
                "winget",
                &[
                    "export",
                    "-o",
                    &tmp_str,
                    "--accept-source-agreements",
                    "--disable-interactivity",
                ],
            )
            .await;
        let refs = match result {
            Ok(_) => {
                let content = std::fs::read_to_string(&tmp)?;
                parse_winget_export(&content)
            }
            Err(e) => Err(e),
        };
        let _ = std::fs::remove_file(&tmp);
        refs
    }
}

impl PackageDriver for SubprocessDriver {
    fn name(&self) -> &str {
        self.kind.name()
    }

    async fn list_installed(&self) -> Result<BTreeSet<String>> {
        let installed = match self.kind {
            DriverKind::Winget => self.winget_installed().await?,
            DriverKind::Brew => {
                let out = self.run("brew", &["list", "-1", "--formula"]).await?;
                parse_plain_lines(&out)
            }
            DriverKind::Apt => {
                let out = self
                    .run("dpkg-query", &["-W", "-f", "${Package}\\n"])
                    .await?;
                parse_plain_lines(&out)
            }
        };
        debug!(driver = self.kind.name(), count = installed.len(), "Installed set loaded");
        Ok(installed)
    }

    async fn install(&self, reference: &str) -> Result<()> {
        match self.kind {
            DriverKind::Winget => {
                self.run(
                    "winget",
                    &[
                        "install",
                        "--id",
                        reference,
                        "--exact",
                        "--silent",
                        "--accept-package-agreements",
                        "--accept-source-agreements",
                    ],
                )
                .await?;
            }
            DriverKind::Brew => {
                self.run("brew", &["install", reference]).await?;
            }
            DriverKind::Apt => {
                self.run("apt-get", &["install", "-y", reference]).await?;
            }
        }
        info!(driver = self.kind.name(), reference, "Installed");
        Ok(())
    }

    async fn export(&self, output: &Utf8Path) -> Result<()> {
        match self.kind {
            DriverKind::Winget => {
                self.run(
                    "winget",
                    &["export", "-o", output.as_str(), "--accept-source-agreements"],
                )
                .await?;
            }
            _ => {
                let installed = self.list_installed().await?;
                let mut content = installed.into_iter().collect::<Vec<_>>().join("\n");
                content.push('\n');
                std::fs::write(output, content)?;
            }
        }
        Ok(())
    }
}

/// One reference per line, blanks ignored.
pub fn parse_plain_lines(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
        .collect()
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WingetExport {
    #[serde(default)]
    sources: Vec<WingetSource>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WingetSource {
    #[serde(default)]
    packages: Vec<WingetPackage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WingetPackage {
    package_identifier: String,
}

/// Package identifiers from a `winget export` JSON document.
pub fn parse_winget_export(content: &str) -> Result<BTreeSet<String>> {
    let export: WingetExport = serde_json::from_str(content)
        .map_err(|e| Error::bad_output("winget", e.to_string()))?;
    Ok(export
        .sources
        .into_iter()
        .flat_map(|s| s.packages)
        .map(|p| p.package_identifier)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_parse_trims_and_drops_blanks() {
        let installed = parse_plain_lines("git\n\n  ripgrep  \njq\n");
        assert_eq!(
            installed.into_iter().collect::<Vec<_>>(),
            vec!["git", "jq", "ripgrep"]
        );
    }

    #[test]
    fn winget_export_parse_collects_identifiers_across_sources() {
        let content = r#"{
            "$schema": "https://aka.ms/winget-packages.schema.2.0.json",
            "Sources": [
                {
                    "Packages": [
                        { "PackageIdentifier": "Git.Git" },
                        { "PackageIdentifier": "Microsoft.VisualStudioCode" }
                    ],
                    "SourceDetails": { "Name": "winget" }
                },
                {
                    "Packages": [ { "PackageIdentifier": "Mozilla.Firefox" } ],
                    "SourceDetails": { "Name": "msstore" }
                }
            ]
        }"#;

        let installed = parse_winget_export(content).unwrap();
        assert_eq!(installed.len(), 3);
        assert!(installed.contains("Git.Git"));
        assert!(installed.contains("Mozilla.Firefox"));
    }

    #[test]
    fn malformed_winget_export_is_bad_output() {
        let err = parse_winget_export("not json").unwrap_err();
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }
}

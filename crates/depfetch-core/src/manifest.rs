//! Download manifest (`depfetch.toml`): named target folders plus the list
//! of files to fetch into them.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::job::FetchJob;

/// Manifest file name looked up in the working directory.
pub const DEFAULT_MANIFEST: &str = "depfetch.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadEntry {
    /// Provider identifier of the file.
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Name on disk; when absent it is learned from the response headers.
    #[serde(default)]
    pub filename: Option<String>,
    /// Key into `[targets]`.
    pub target: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub targets: BTreeMap<String, PathBuf>,
    #[serde(default, rename = "download")]
    pub downloads: Vec<DownloadEntry>,
    /// Directory relative target paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        let mut manifest = Self::parse(&data)
            .with_context(|| format!("failed to parse manifest {}", path.display()))?;
        let base = path.parent().unwrap_or(Path::new("."));
        manifest.base_dir = std::path::absolute(base)
            .with_context(|| format!("failed to resolve {}", base.display()))?;
        Ok(manifest)
    }

    /// Parse manifest text; relative targets resolve against the working directory.
    pub fn parse(data: &str) -> Result<Self> {
        let mut manifest: Manifest = toml::from_str(data)?;
        manifest.base_dir = PathBuf::from(".");
        Ok(manifest)
    }

    /// Target folder for `name`, with `overrides` taking precedence over `[targets]`.
    pub fn target_dir(&self, name: &str, overrides: &[(String, PathBuf)]) -> Result<PathBuf> {
        if let Some((_, dir)) = overrides.iter().rev().find(|(n, _)| n == name) {
            return Ok(dir.clone());
        }
        match self.targets.get(name) {
            Some(dir) => Ok(self.base_dir.join(dir)),
            None => bail!("unknown target {name:?}"),
        }
    }

    /// Enabled entries as jobs, in manifest order.
    pub fn to_jobs(&self, overrides: &[(String, PathBuf)]) -> Result<Vec<FetchJob>> {
        for (name, _) in overrides {
            if !self.targets.contains_key(name) {
                bail!("override for unknown target {name:?}");
            }
        }
        self.downloads
            .iter()
            .filter(|d| d.enabled)
            .map(|d| {
                let dir = self
                    .target_dir(&d.target, overrides)
                    .with_context(|| format!("download {}", d.id))?;
                let job = FetchJob::new(d.id.clone(), d.filename.clone(), &dir)
                    .with_context(|| format!("download {}", d.id))?;
                Ok(match &d.description {
                    Some(desc) => job.with_description(desc.clone()),
                    None => job,
                })
            })
            .collect()
    }
}

/// Parse a `NAME=DIR` target override.
pub fn parse_target_override(s: &str) -> Result<(String, PathBuf)> {
    match s.split_once('=') {
        Some((name, dir)) if !name.trim().is_empty() && !dir.trim().is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(dir.trim())))
        }
        _ => bail!("expected NAME=DIR, got {s:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[targets]
lib = "../lib"
root = ".."

[[download]]
id = "1aln-VGIvA5tFn1jDJ9m598MhuHKln30h"
description = "Common headers and sources"
filename = "libs-headers-sources.zip"
target = "lib"

[[download]]
id = "1PLqBn2pm2YhbRO9Vc4vvlhYQ2nGUR2GI"
target = "root"

[[download]]
id = "disabled"
target = "root"
enabled = false
"#;

    #[test]
    fn load_resolves_against_manifest_dir() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("project");
        fs::create_dir(&project).unwrap();
        let path = project.join(DEFAULT_MANIFEST);
        fs::write(&path, SAMPLE).unwrap();

        let manifest = Manifest::load(&path).unwrap();
        let jobs = manifest.to_jobs(&[]).unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].identifier(), "1aln-VGIvA5tFn1jDJ9m598MhuHKln30h");
        assert_eq!(jobs[0].description(), "Common headers and sources");
        assert_eq!(jobs[0].filename(), Some("libs-headers-sources.zip"));
        assert_eq!(jobs[0].destination_dir(), project.join("../lib"));
        assert_eq!(jobs[1].filename(), None);
        assert_eq!(jobs[1].description(), "1PLqBn2pm2YhbRO9Vc4vvlhYQ2nGUR2GI");
        assert_eq!(jobs[1].destination_dir(), project.join(".."));
    }

    #[test]
    fn overrides_replace_target_dirs() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        let jobs = manifest
            .to_jobs(&[("lib".into(), PathBuf::from("/opt/lib"))])
            .unwrap();
        assert_eq!(jobs[0].destination_dir(), Path::new("/opt/lib"));
    }

    #[test]
    fn unknown_target_is_an_error() {
        let manifest = Manifest::parse(
            r#"
[[download]]
id = "x"
target = "nowhere"
"#,
        )
        .unwrap();
        let err = manifest.to_jobs(&[]).unwrap_err();
        assert!(format!("{err:#}").contains("unknown target \"nowhere\""));

        let manifest = Manifest::parse(SAMPLE).unwrap();
        assert!(manifest
            .to_jobs(&[("docs".into(), PathBuf::from("/tmp"))])
            .is_err());
    }

    #[test]
    fn filename_must_stay_in_target() {
        let manifest = Manifest::parse(
            r#"
[targets]
lib = "lib"

[[download]]
id = "x"
filename = "../outside.zip"
target = "lib"
"#,
        )
        .unwrap();
        let err = manifest.to_jobs(&[]).unwrap_err();
        assert!(format!("{err:#}").contains("plain file name"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Manifest::parse("[[download]]\nid = \"x\"\ntarget = \"t\"\nurl = \"y\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn target_override_syntax() {
        assert_eq!(
            parse_target_override("lib=/opt/lib").unwrap(),
            ("lib".to_string(), PathBuf::from("/opt/lib"))
        );
        assert!(parse_target_override("lib").is_err());
        assert!(parse_target_override("=dir").is_err());
        assert!(parse_target_override("lib=").is_err());
    }
}

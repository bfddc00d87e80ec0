// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [IosAppBundle]: the `Payload/*.app` directory of an extracted IPA,
//! classified into the frameworks/plugins/main-executable groups C3 needs to
//! sign in the mandated order.

use crate::DirectoryBundle;
use anyhow::{anyhow, Result};
use ipasign_identity::AppInfo;
use std::path::{Path, PathBuf};

/// A nested binary that needs its own code signature: a `.framework`
/// bundle, a bare `.dylib`, or an `.appex` plug-in.
#[derive(Clone, Debug)]
pub struct NestedBinary {
    /// Path to the binary itself (for a framework, its main executable; for
    /// a bare `.dylib`, the file; for a plug-in, its main executable).
    pub executable_path: PathBuf,
    /// Root directory of the nested bundle, if this isn't a bare `.dylib`.
    pub bundle_root: Option<PathBuf>,
}

/// The `.app` directory extracted from an IPA's `Payload/`, plus everything
/// C3 needs to know about it: parsed `Info.plist`, and the frameworks/
/// plugins that must be signed before the main executable.
pub struct IosAppBundle {
    bundle: DirectoryBundle,
    info: AppInfo,
}

impl IosAppBundle {
    /// Open the `.app` directory at `path`.
    pub fn new_from_path(path: &Path) -> Result<Self> {
        let bundle = DirectoryBundle::new_from_path(path)?;
        let info = AppInfo::from_plist_dict(bundle.info_plist())
            .ok_or_else(|| anyhow!("Info.plist missing CFBundleIdentifier or CFBundleExecutable"))?;

        Ok(Self { bundle, info })
    }

    pub fn root_dir(&self) -> &Path {
        self.bundle.root_dir()
    }

    pub fn info(&self) -> &AppInfo {
        &self.info
    }

    pub fn info_plist_path(&self) -> PathBuf {
        self.bundle.info_plist_path()
    }

    pub fn info_plist(&self) -> &plist::Dictionary {
        self.bundle.info_plist()
    }

    pub fn main_executable_path(&self) -> PathBuf {
        self.bundle.resolve_path(&self.info.executable_name)
    }

    pub fn entitlements_path(&self) -> PathBuf {
        self.bundle
            .resolve_path("archived-expanded-entitlements.xcent")
    }

    pub fn embedded_profile_path(&self) -> PathBuf {
        self.bundle.resolve_path("embedded.mobileprovision")
    }

    /// Every `.framework` bundle and bare `.dylib` directly under
    /// `Frameworks/`.
    pub fn frameworks(&self) -> Result<Vec<NestedBinary>> {
        let dir = self.bundle.resolve_path("Frameworks");
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        let mut entries: Vec<_> = std::fs::read_dir(&dir)?.collect::<std::io::Result<_>>()?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();

            if name.ends_with(".framework") {
                let nested = DirectoryBundle::new_from_path(&path)?;
                let executable = nested
                    .main_executable()?
                    .ok_or_else(|| anyhow!("{} has no CFBundleExecutable", path.display()))?;
                out.push(NestedBinary {
                    executable_path: path.join(executable),
                    bundle_root: Some(path),
                });
            } else if path.is_file() && name.ends_with(".dylib") {
                out.push(NestedBinary {
                    executable_path: path,
                    bundle_root: None,
                });
            }
        }

        Ok(out)
    }

    /// Every `.appex` bundle directly under `PlugIns/`.
    pub fn plugins(&self) -> Result<Vec<NestedBinary>> {
        let dir = self.bundle.resolve_path("PlugIns");
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        let mut entries: Vec<_> = std::fs::read_dir(&dir)?.collect::<std::io::Result<_>>()?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();

            if name.ends_with(".appex") {
                let nested = DirectoryBundle::new_from_path(&path)?;
                let executable = nested
                    .main_executable()?
                    .ok_or_else(|| anyhow!("{} has no CFBundleExecutable", path.display()))?;
                out.push(NestedBinary {
                    executable_path: path.join(executable),
                    bundle_root: Some(path),
                });
            }
        }

        Ok(out)
    }
}

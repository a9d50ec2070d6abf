//! Archive import: descriptor, license, and asset extraction.
//!
//! Turns a downloaded addon archive into on-disk files in the addon's
//! public directory. The archive layout is a single top-level directory
//! named after the addon identifier:
//!
//! ```text
//! <id>/addon.xml        required descriptor
//! <id>/LICENSE.txt      optional license
//! <id>/resources/...    asset files referenced by the descriptor
//! ```
//!
//! Existing destination files are never overwritten; a file already being
//! present is a skip signal, not an error.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path};

use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{SyncError, SyncResult};
use crate::metadata::AddonMetadata;

/// Descriptor filename inside the archive and in the addon directory.
pub const DESCRIPTOR_FILENAME: &str = "addon.xml";

/// License filename inside the archive and in the addon directory.
pub const LICENSE_FILENAME: &str = "LICENSE.txt";

/// Subdirectory created for extracted assets.
pub const RESOURCES_DIR: &str = "resources";

/// Import a downloaded archive into `target_dir`.
///
/// Extracts the descriptor (fatal if missing), the declared assets, and
/// the license (silently skipped if absent), then returns the parsed
/// descriptor for merging into the manifest.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened, the descriptor entry
/// is missing or unparseable, a declared asset entry is missing, or a
/// filesystem write fails.
pub fn import_archive(
    archive_path: &Path,
    addon_id: &str,
    target_dir: &Path,
) -> SyncResult<AddonMetadata> {
    let file = File::open(archive_path).map_err(|e| SyncError::ReadFailed {
        path: archive_path.to_path_buf(),
        source: e,
    })?;

    let mut archive = ZipArchive::new(file).map_err(|e| SyncError::ArchiveFailed {
        path: archive_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    fs::create_dir_all(target_dir).map_err(|e| SyncError::CreateDirFailed {
        path: target_dir.to_path_buf(),
        source: e,
    })?;

    let metadata = extract_descriptor(&mut archive, archive_path, addon_id, target_dir)?;
    extract_assets(&mut archive, archive_path, addon_id, target_dir, &metadata)?;
    extract_license(&mut archive, archive_path, addon_id, target_dir)?;

    Ok(metadata)
}

/// Read the descriptor entry, write it verbatim, and parse it.
fn extract_descriptor(
    archive: &mut ZipArchive<File>,
    archive_path: &Path,
    addon_id: &str,
    target_dir: &Path,
) -> SyncResult<AddonMetadata> {
    let entry_name = format!("{}/{}", addon_id, DESCRIPTOR_FILENAME);
    let data = read_entry(archive, archive_path, &entry_name)?.ok_or_else(|| {
        SyncError::EntryMissing {
            archive: archive_path.to_path_buf(),
            entry: entry_name.clone(),
        }
    })?;

    let text = String::from_utf8(data).map_err(|e| SyncError::InvalidDescriptor {
        reason: format!("descriptor is not valid UTF-8: {}", e),
    })?;

    let dest = target_dir.join(DESCRIPTOR_FILENAME);
    fs::write(&dest, &text).map_err(|e| SyncError::WriteFailed {
        path: dest,
        source: e,
    })?;

    AddonMetadata::parse(&text)
}

/// Copy declared asset entries into the addon directory.
///
/// A `resources/` subdirectory is created when any assets are declared.
/// A declared asset whose archive entry is missing is fatal; an asset
/// whose destination file already exists is skipped.
fn extract_assets(
    archive: &mut ZipArchive<File>,
    archive_path: &Path,
    addon_id: &str,
    target_dir: &Path,
    metadata: &AddonMetadata,
) -> SyncResult<()> {
    if metadata.assets.is_empty() {
        return Ok(());
    }

    let resources_dir = target_dir.join(RESOURCES_DIR);
    fs::create_dir_all(&resources_dir).map_err(|e| SyncError::CreateDirFailed {
        path: resources_dir,
        source: e,
    })?;

    for asset in &metadata.assets {
        // Asset paths are addon-relative; reject anything that could
        // resolve outside the addon directory.
        if !is_addon_relative(asset) {
            return Err(SyncError::InvalidDescriptor {
                reason: format!("asset path escapes the addon directory: {}", asset),
            });
        }

        let dest = target_dir.join(asset);
        if dest.exists() {
            debug!(%asset, "asset already present, not overwriting");
            continue;
        }

        let entry_name = format!("{}/{}", addon_id, asset);
        let data = read_entry(archive, archive_path, &entry_name)?.ok_or_else(|| {
            SyncError::EntryMissing {
                archive: archive_path.to_path_buf(),
                entry: entry_name.clone(),
            }
        })?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        fs::write(&dest, data).map_err(|e| SyncError::WriteFailed {
            path: dest,
            source: e,
        })?;
    }

    Ok(())
}

/// Copy the license entry if the archive has one and none exists on disk.
fn extract_license(
    archive: &mut ZipArchive<File>,
    archive_path: &Path,
    addon_id: &str,
    target_dir: &Path,
) -> SyncResult<()> {
    let entry_name = format!("{}/{}", addon_id, LICENSE_FILENAME);
    let data = match read_entry(archive, archive_path, &entry_name)? {
        Some(data) => data,
        None => {
            debug!(addon_id, "archive has no license entry");
            return Ok(());
        }
    };

    let dest = target_dir.join(LICENSE_FILENAME);
    if dest.exists() {
        debug!(addon_id, "license already present, not overwriting");
        return Ok(());
    }

    fs::write(&dest, data).map_err(|e| SyncError::WriteFailed {
        path: dest,
        source: e,
    })
}

fn is_addon_relative(path: &str) -> bool {
    Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

/// Read a named archive entry, returning `None` if it does not exist.
fn read_entry(
    archive: &mut ZipArchive<File>,
    archive_path: &Path,
    name: &str,
) -> SyncResult<Option<Vec<u8>>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(SyncError::ArchiveFailed {
                path: archive_path.to_path_buf(),
                reason: format!("entry {}: {}", name, e),
            })
        }
    };

    let mut data = Vec::new();
    entry
        .read_to_end(&mut data)
        .map_err(|e| SyncError::ArchiveFailed {
            path: archive_path.to_path_buf(),
            reason: format!("entry {}: {}", name, e),
        })?;

    Ok(Some(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const DESCRIPTOR: &str = r#"<addon id="bar" version="2.0" name="Bar">
    <extension point="xbmc.addon.metadata">
        <assets>
            <icon>resources/icon.png</icon>
        </assets>
    </extension>
</addon>"#;

    const PLAIN_DESCRIPTOR: &str = r#"<addon id="bar" version="2.0" name="Bar"/>"#;

    fn build_archive(dir: &Path, entries: &[(&str, &[u8])]) -> std::path::PathBuf {
        let path = dir.join("bar-2.0.zip");
        let file = File::create(&path).unwrap();
        let mut writer = ZipWriter::new(file);
        for (name, content) in entries {
            writer
                .start_file(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn test_import_writes_descriptor() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(temp.path(), &[("bar/addon.xml", PLAIN_DESCRIPTOR.as_bytes())]);
        let target = temp.path().join("bar");

        let metadata = import_archive(&archive, "bar", &target).unwrap();

        assert_eq!(metadata.id, "bar");
        assert_eq!(metadata.version, "2.0");
        let written = fs::read_to_string(target.join(DESCRIPTOR_FILENAME)).unwrap();
        assert_eq!(written, PLAIN_DESCRIPTOR);
    }

    #[test]
    fn test_import_missing_descriptor_is_fatal() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(temp.path(), &[("bar/LICENSE.txt", b"MIT")]);
        let target = temp.path().join("bar");

        let result = import_archive(&archive, "bar", &target);
        assert!(matches!(result, Err(SyncError::EntryMissing { .. })));
    }

    #[test]
    fn test_import_extracts_assets() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(
            temp.path(),
            &[
                ("bar/addon.xml", DESCRIPTOR.as_bytes()),
                ("bar/resources/icon.png", b"png bytes"),
            ],
        );
        let target = temp.path().join("bar");

        import_archive(&archive, "bar", &target).unwrap();

        assert!(target.join(RESOURCES_DIR).is_dir());
        assert_eq!(
            fs::read(target.join("resources/icon.png")).unwrap(),
            b"png bytes"
        );
    }

    #[test]
    fn test_import_never_overwrites_existing_asset() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(
            temp.path(),
            &[
                ("bar/addon.xml", DESCRIPTOR.as_bytes()),
                ("bar/resources/icon.png", b"new bytes"),
            ],
        );
        let target = temp.path().join("bar");
        fs::create_dir_all(target.join(RESOURCES_DIR)).unwrap();
        fs::write(target.join("resources/icon.png"), b"old bytes").unwrap();

        import_archive(&archive, "bar", &target).unwrap();

        assert_eq!(
            fs::read(target.join("resources/icon.png")).unwrap(),
            b"old bytes"
        );
    }

    #[test]
    fn test_import_rejects_escaping_asset_path() {
        let temp = TempDir::new().unwrap();
        let descriptor = r#"<addon id="bar" version="2.0" name="Bar">
    <extension point="xbmc.addon.metadata">
        <assets>
            <icon>../outside.png</icon>
        </assets>
    </extension>
</addon>"#;
        let archive = build_archive(temp.path(), &[("bar/addon.xml", descriptor.as_bytes())]);
        let target = temp.path().join("bar");

        let result = import_archive(&archive, "bar", &target);
        assert!(matches!(result, Err(SyncError::InvalidDescriptor { .. })));
        assert!(!temp.path().join("outside.png").exists());
    }

    #[test]
    fn test_import_rejects_absolute_asset_path() {
        let temp = TempDir::new().unwrap();
        let descriptor = r#"<addon id="bar" version="2.0" name="Bar">
    <extension point="xbmc.addon.metadata">
        <assets>
            <icon>/etc/outside.png</icon>
        </assets>
    </extension>
</addon>"#;
        let archive = build_archive(temp.path(), &[("bar/addon.xml", descriptor.as_bytes())]);
        let target = temp.path().join("bar");

        let result = import_archive(&archive, "bar", &target);
        assert!(matches!(result, Err(SyncError::InvalidDescriptor { .. })));
    }

    #[test]
    fn test_import_missing_declared_asset_is_fatal() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(temp.path(), &[("bar/addon.xml", DESCRIPTOR.as_bytes())]);
        let target = temp.path().join("bar");

        let result = import_archive(&archive, "bar", &target);
        assert!(matches!(result, Err(SyncError::EntryMissing { .. })));
    }

    #[test]
    fn test_import_extracts_license() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(
            temp.path(),
            &[
                ("bar/addon.xml", PLAIN_DESCRIPTOR.as_bytes()),
                ("bar/LICENSE.txt", b"MIT License"),
            ],
        );
        let target = temp.path().join("bar");

        import_archive(&archive, "bar", &target).unwrap();

        assert_eq!(
            fs::read(target.join(LICENSE_FILENAME)).unwrap(),
            b"MIT License"
        );
    }

    #[test]
    fn test_import_missing_license_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(temp.path(), &[("bar/addon.xml", PLAIN_DESCRIPTOR.as_bytes())]);
        let target = temp.path().join("bar");

        import_archive(&archive, "bar", &target).unwrap();
        assert!(!target.join(LICENSE_FILENAME).exists());
    }

    #[test]
    fn test_import_never_overwrites_existing_license() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(
            temp.path(),
            &[
                ("bar/addon.xml", PLAIN_DESCRIPTOR.as_bytes()),
                ("bar/LICENSE.txt", b"GPL"),
            ],
        );
        let target = temp.path().join("bar");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join(LICENSE_FILENAME), b"MIT").unwrap();

        import_archive(&archive, "bar", &target).unwrap();

        assert_eq!(fs::read(target.join(LICENSE_FILENAME)).unwrap(), b"MIT");
    }

    #[test]
    fn test_import_invalid_zip() {
        let temp = TempDir::new().unwrap();
        let bogus = temp.path().join("bogus.zip");
        fs::write(&bogus, b"not a zip").unwrap();

        let result = import_archive(&bogus, "bar", &temp.path().join("bar"));
        assert!(matches!(result, Err(SyncError::ArchiveFailed { .. })));
    }
}

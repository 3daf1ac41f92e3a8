//! # Archive Extractor
//!
//! Pulls exactly one named executable out of a downloaded bundle.
//!
//! The format is chosen from the suffix of the remote filename:
//!
//! | Suffix             | Handling                          |
//! |--------------------|-----------------------------------|
//! | `.tar.gz`, `.tgz`  | gzip + tar, entries streamed      |
//! | `.zip`             | zip, file index walked            |
//! | anything else      | already the binary, used as-is    |
//!
//! Members are matched on their base name only, so `docker/docker` matches `docker`. The
//! first match wins; no match is an error naming both the member and the archive.

use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use zip::ZipArchive;

use crate::libs::errors::InstallError;
use crate::libs::utilities::binary::write_executable;
use crate::schemas::artifact::DownloadedBundle;
use crate::log_debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
    Raw,
}

impl ArchiveFormat {
    pub fn from_filename(filename: &str) -> Self {
        let lower = filename.to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            ArchiveFormat::TarGz
        } else if lower.ends_with(".zip") {
            ArchiveFormat::Zip
        } else {
            ArchiveFormat::Raw
        }
    }
}

/// Returns the path of the binary to install.
///
/// Archives have `target` extracted to `<dest_dir>/<target>` with mode 0755; raw bundles are
/// returned unchanged.
pub fn extract_binary(bundle: &DownloadedBundle, target: &str, dest_dir: &Path) -> Result<PathBuf, InstallError> {
    let format = ArchiveFormat::from_filename(&bundle.remote_filename);
    log_debug!(
        "Bundle {} ({}) handled as {:?}",
        bundle.local_path.display(),
        bundle.remote_filename,
        format
    );
    let dest = dest_dir.join(target);
    match format {
        ArchiveFormat::TarGz => extract_from_tar_gz(&bundle.local_path, target, &dest)?,
        ArchiveFormat::Zip => extract_from_zip(&bundle.local_path, target, &dest)?,
        ArchiveFormat::Raw => return Ok(bundle.local_path.clone()),
    }
    Ok(dest)
}

/// Streams the tarball and copies the first regular file named `target` to `dest`.
pub fn extract_from_tar_gz(archive_path: &Path, target: &str, dest: &Path) -> Result<(), InstallError> {
    let unreadable = |e: std::io::Error| InstallError::Archive {
        archive: archive_path.to_path_buf(),
        message: e.to_string(),
    };

    let file = File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));

    for entry in archive.entries().map_err(unreadable)? {
        let mut entry = entry.map_err(unreadable)?;
        let entry_type = entry.header().entry_type();
        let path = entry.path().map_err(unreadable)?.into_owned();

        if entry_type.is_dir() {
            continue;
        }
        if !entry_type.is_file() {
            log_debug!("Skipping {} (entry type {:?})", path.display(), entry_type);
            continue;
        }
        log_debug!("Found {} file", path.display());
        if path.file_name().is_some_and(|name| name == target) {
            write_executable(&mut entry, dest)?;
            return Ok(());
        }
    }

    Err(InstallError::MemberNotFound {
        member: target.to_string(),
        archive: archive_path.to_path_buf(),
    })
}

/// Walks the zip index and copies the first file named `target` to `dest`.
pub fn extract_from_zip(archive_path: &Path, target: &str, dest: &Path) -> Result<(), InstallError> {
    let unreadable = |e: zip::result::ZipError| InstallError::Archive {
        archive: archive_path.to_path_buf(),
        message: e.to_string(),
    };

    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(unreadable)?;

    for index in 0..archive.len() {
        let mut member = archive.by_index(index).map_err(unreadable)?;
        if member.is_dir() {
            continue;
        }
        let name = member.name().to_string();
        log_debug!("Found {} file", name);
        if Path::new(&name).file_name().is_some_and(|base| base == target) {
            write_executable(&mut member, dest)?;
            return Ok(());
        }
    }

    Err(InstallError::MemberNotFound {
        member: target.to_string(),
        archive: archive_path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    const TOOL_BYTES: &[u8] = b"#!/bin/sh\necho tool version 2.0.0\n";

    fn tarball(path: &Path) {
        let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let mut dir = tar::Header::new_gnu();
        dir.set_entry_type(tar::EntryType::Directory);
        dir.set_mode(0o755);
        dir.set_size(0);
        dir.set_cksum();
        builder.append_data(&mut dir, "dir/", &[][..]).unwrap();

        for (name, data) in [("dir/tool", TOOL_BYTES), ("dir/other", &b"other"[..])] {
            let mut header = tar::Header::new_gnu();
            header.set_mode(0o644);
            header.set_size(data.len() as u64);
            header.set_cksum();
            builder.append_data(&mut header, name, data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn zipfile(path: &Path) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        let options = zip::write::FileOptions::default();
        writer.add_directory("rancher-v0.4.1/", options).unwrap();
        writer.start_file("rancher-v0.4.1/rancher.exe", options).unwrap();
        writer.write_all(TOOL_BYTES).unwrap();
        writer.start_file("rancher-v0.4.1/README", options).unwrap();
        writer.write_all(b"readme").unwrap();
        writer.finish().unwrap();
    }

    fn bundle(local_path: PathBuf, remote_filename: &str) -> DownloadedBundle {
        DownloadedBundle {
            local_path,
            source_url: format!("http://mirror.local/{}", remote_filename),
            remote_filename: remote_filename.to_string(),
        }
    }

    #[test]
    fn test_format_from_suffix() {
        assert_eq!(ArchiveFormat::from_filename("tool-2.0.0.tar.gz"), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::from_filename("docker-1.12.3.tgz"), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::from_filename("rancher-windows-amd64-v0.4.1.ZIP"), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::from_filename("docker-machine-Darwin-x86_64"), ArchiveFormat::Raw);
        assert_eq!(ArchiveFormat::from_filename("docker-machine.exe"), ArchiveFormat::Raw);
    }

    #[test]
    fn test_tarball_member_is_extracted_byte_identical() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("tool-2.0.0");
        tarball(&archive);

        let extracted = extract_binary(&bundle(archive, "tool-2.0.0.tar.gz"), "tool", temp.path()).unwrap();

        assert_eq!(extracted, temp.path().join("tool"));
        assert_eq!(std::fs::read(&extracted).unwrap(), TOOL_BYTES);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&extracted).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn test_tarball_missing_member_names_it() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("tool-2.0.0");
        tarball(&archive);

        let err = extract_binary(&bundle(archive.clone(), "tool-2.0.0.tgz"), "missing", temp.path()).unwrap_err();

        match &err {
            InstallError::MemberNotFound { member, archive: path } => {
                assert_eq!(member, "missing");
                assert_eq!(path, &archive);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("missing"));
        assert!(!temp.path().join("missing").exists());
    }

    #[test]
    fn test_directory_names_do_not_match() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("bundle");
        tarball(&archive);

        let err = extract_from_tar_gz(&archive, "dir", &temp.path().join("dir-out")).unwrap_err();
        assert!(matches!(err, InstallError::MemberNotFound { .. }));
    }

    #[test]
    fn test_zip_member_is_extracted() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("rancher.exe-v0.4.1");
        zipfile(&archive);

        let extracted = extract_binary(
            &bundle(archive, "rancher-windows-amd64-v0.4.1.zip"),
            "rancher.exe",
            temp.path(),
        )
        .unwrap();
        assert_eq!(std::fs::read(extracted).unwrap(), TOOL_BYTES);
    }

    #[test]
    fn test_zip_missing_member() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("bundle");
        zipfile(&archive);

        let err = extract_from_zip(&archive, "docker.exe", &temp.path().join("docker.exe")).unwrap_err();
        assert!(err.to_string().contains("docker.exe"));
    }

    #[test]
    fn test_raw_bundle_is_used_as_is() {
        let temp = tempfile::tempdir().unwrap();
        let raw = temp.path().join("docker-machine-v0.8.2");
        std::fs::write(&raw, TOOL_BYTES).unwrap();

        let path = extract_binary(
            &bundle(raw.clone(), "docker-machine-Darwin-x86_64"),
            "docker-machine",
            temp.path(),
        )
        .unwrap();
        assert_eq!(path, raw);
    }

    #[test]
    fn test_corrupt_archive_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("bundle");
        std::fs::write(&archive, b"<html>not found</html>").unwrap();

        let err = extract_from_zip(&archive, "tool", &temp.path().join("tool")).unwrap_err();
        assert!(matches!(err, InstallError::Archive { .. }));
    }
}

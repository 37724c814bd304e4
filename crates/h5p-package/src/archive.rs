//! # Archive Access
//!
//! The validator never touches the zip format directly. It sees a
//! [`PackageArchive`]: a flat list of [`ArchiveEntry`] records plus a way
//! to stream one entry's bytes. [`ZipPackage`] is the production adapter.

use std::io::{self, Read, Seek};

use zip::result::ZipError;
use zip::ZipArchive;

/// One entry of a package archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the archive, `/`-separated.
    pub path: String,
    /// Whether the entry is a directory record.
    pub is_directory: bool,
    /// Declared uncompressed size in bytes.
    pub uncompressed_size: u64,
}

impl ArchiveEntry {
    /// Create a file entry.
    pub fn file(path: impl Into<String>, uncompressed_size: u64) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
            uncompressed_size,
        }
    }

    /// Last path segment.
    pub fn base_name(&self) -> &str {
        let trimmed = self.path.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }

    /// Lowercased extension of the base name, `None` if there is none.
    pub fn extension(&self) -> Option<String> {
        let base = self.base_name();
        match base.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
                Some(ext.to_ascii_lowercase())
            }
            _ => None,
        }
    }

    /// First path segment when the entry lives inside a directory.
    pub fn top_level_dir(&self) -> Option<&str> {
        self.path.split_once('/').map(|(dir, _)| dir)
    }

    /// Hidden entries (`.name`) and private entries (`_name`) are skipped
    /// by every check after the size limits.
    pub fn is_ignored(&self) -> bool {
        self.is_directory || self.base_name().starts_with(['.', '_'])
    }
}

/// Read access to an uploaded package.
pub trait PackageArchive {
    /// Every entry, in archive order.
    fn entries(&self) -> &[ArchiveEntry];

    /// Stream the bytes of one entry.
    fn open_entry(&mut self, path: &str) -> io::Result<Box<dyn Read + '_>>;

    /// Read one entry fully into memory.
    fn read_entry(&mut self, path: &str) -> io::Result<Vec<u8>> {
        let mut reader = self.open_entry(path)?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// A zip-backed package.
pub struct ZipPackage<R> {
    archive: ZipArchive<R>,
    entries: Vec<ArchiveEntry>,
}

impl<R: Read + Seek> ZipPackage<R> {
    /// Parse the central directory. Entry data is not read here.
    pub fn new(reader: R) -> Result<Self, ZipError> {
        let mut archive = ZipArchive::new(reader)?;
        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let file = archive.by_index_raw(index)?;
            entries.push(ArchiveEntry {
                path: file.name().to_string(),
                is_directory: file.is_dir(),
                uncompressed_size: file.size(),
            });
        }
        Ok(Self { archive, entries })
    }
}

impl<R: Read + Seek> PackageArchive for ZipPackage<R> {
    fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    fn open_entry(&mut self, path: &str) -> io::Result<Box<dyn Read + '_>> {
        let file = self.archive.by_name(path).map_err(zip_to_io)?;
        Ok(Box::new(file))
    }
}

impl<R> std::fmt::Debug for ZipPackage<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipPackage")
            .field("entries", &self.entries.len())
            .finish()
    }
}

fn zip_to_io(err: ZipError) -> io::Error {
    match err {
        ZipError::Io(e) => e,
        ZipError::FileNotFound => io::Error::new(io::ErrorKind::NotFound, "entry not found"),
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in files {
            if name.ends_with('/') {
                writer.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn entry_helpers() {
        let entry = ArchiveEntry::file("H5P.Example-1.0/scripts/Example.JS", 10);
        assert_eq!(entry.base_name(), "Example.JS");
        assert_eq!(entry.extension().as_deref(), Some("js"));
        assert_eq!(entry.top_level_dir(), Some("H5P.Example-1.0"));
        assert!(!entry.is_ignored());
    }

    #[test]
    fn extensionless_and_hidden_entries() {
        assert_eq!(ArchiveEntry::file("content/README", 1).extension(), None);
        assert_eq!(ArchiveEntry::file("content/trailing.", 1).extension(), None);
        assert!(ArchiveEntry::file("content/.DS_Store", 1).is_ignored());
        assert!(ArchiveEntry::file("lib/_private.js", 1).is_ignored());
        assert_eq!(ArchiveEntry::file("h5p.json", 1).top_level_dir(), None);
    }

    #[test]
    fn zip_package_lists_entries_and_reads_data() {
        let bytes = zip_bytes(&[
            ("h5p.json", b"{}"),
            ("content/", b""),
            ("content/content.json", b"{\"a\":1}"),
        ]);
        let mut pkg = ZipPackage::new(Cursor::new(bytes)).unwrap();
        let paths: Vec<&str> = pkg.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["h5p.json", "content/", "content/content.json"]);
        assert!(pkg.entries()[1].is_directory);
        assert_eq!(pkg.entries()[2].uncompressed_size, 7);
        assert_eq!(pkg.read_entry("content/content.json").unwrap(), b"{\"a\":1}");
    }

    #[test]
    fn missing_entry_is_not_found() {
        let bytes = zip_bytes(&[("h5p.json", b"{}")]);
        let mut pkg = ZipPackage::new(Cursor::new(bytes)).unwrap();
        let err = pkg.read_entry("nope.json").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn garbage_is_not_a_zip() {
        assert!(ZipPackage::new(Cursor::new(b"definitely not a zip archive".to_vec())).is_err());
    }

    proptest! {
        #[test]
        fn extension_is_lowercased_suffix(
            dir in "[A-Za-z0-9.]{1,12}",
            stem in "[A-Za-z0-9-]{1,12}",
            ext in "[A-Za-z0-9]{1,6}"
        ) {
            let entry = ArchiveEntry::file(format!("{dir}/{stem}.{ext}"), 0);
            prop_assert_eq!(entry.extension(), Some(ext.to_ascii_lowercase()));
            prop_assert_eq!(entry.top_level_dir(), Some(dir.as_str()));
            prop_assert!(!entry.is_ignored());
        }
    }
}

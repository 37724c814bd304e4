//! Shared fixtures: packages assembled in memory with `zip::ZipWriter`.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use h5p_core::CoreApiVersion;
use h5p_package::{ArchiveValidator, ValidatorConfig};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Helper: a package under construction, file order preserved.
#[derive(Debug, Clone, Default)]
pub struct PackageBuilder {
    files: Vec<(String, Vec<u8>)>,
    stored: bool,
}

impl PackageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A complete, valid package: manifest, content, and one library.
    pub fn valid() -> Self {
        Self::new()
            .file("h5p.json", manifest_json("H5P.Greeting", 1, 0))
            .file("content/content.json", r#"{"greeting": "Hello <b>world</b>"}"#)
            .file("content/images/photo.png", [0x89u8, b'P', b'N', b'G'])
            .library("H5P.Greeting", 1, 0)
    }

    /// Add a library directory with metadata, one script, one stylesheet,
    /// semantics and a language file.
    pub fn library(self, machine_name: &str, major: u32, minor: u32) -> Self {
        let dir = format!("{machine_name}-{major}.{minor}");
        self.file(
            &format!("{dir}/library.json"),
            library_json(machine_name, major, minor, CoreApiVersion::new(1, 19)),
        )
        .file(&format!("{dir}/greeting.js"), "H5P.Greeting = function () {};")
        .file(&format!("{dir}/greeting.css"), ".h5p-greeting { color: red; }")
        .file(&format!("{dir}/semantics.json"), r#"[{"name": "greeting", "type": "text"}]"#)
        .file(&format!("{dir}/language/nb.json"), r#"{"semantics": []}"#)
    }

    /// Add or replace a file.
    pub fn file(mut self, path: &str, data: impl AsRef<[u8]>) -> Self {
        self.files.retain(|(existing, _)| existing != path);
        self.files.push((path.to_string(), data.as_ref().to_vec()));
        self
    }

    /// Remove a file.
    pub fn without(mut self, path: &str) -> Self {
        self.files.retain(|(existing, _)| existing != path);
        self
    }

    /// Store entries uncompressed so tests can tamper with their bytes.
    pub fn stored(mut self) -> Self {
        self.stored = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let method = if self.stored {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        let options = SimpleFileOptions::default().compression_method(method);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (path, data) in &self.files {
            writer.start_file(path.as_str(), options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    pub fn cursor(&self) -> Cursor<Vec<u8>> {
        Cursor::new(self.build())
    }
}

/// Helper: a schema-valid manifest whose main library is `name major.minor`.
pub fn manifest_json(name: &str, major: u32, minor: u32) -> String {
    format!(
        r#"{{
            "title": "Greeting card",
            "mainLibrary": "{name}",
            "language": "en",
            "embedTypes": ["div"],
            "license": "U",
            "preloadedDependencies": [
                {{"machineName": "{name}", "majorVersion": {major}, "minorVersion": {minor}}}
            ]
        }}"#
    )
}

/// Helper: schema-valid library metadata requiring `core_api`.
pub fn library_json(name: &str, major: u32, minor: u32, core_api: CoreApiVersion) -> String {
    let CoreApiVersion {
        major: core_major,
        minor: core_minor,
    } = core_api;
    format!(
        r#"{{
            "title": "{name}",
            "machineName": "{name}",
            "majorVersion": {major},
            "minorVersion": {minor},
            "patchVersion": 4,
            "runnable": 1,
            "coreApi": {{"major": {core_major}, "minor": {core_minor}}},
            "preloadedJs": [{{"path": "greeting.js"}}],
            "preloadedCss": [{{"path": "greeting.css"}}]
        }}"#
    )
}

/// Helper: validator with default configuration.
pub fn validator() -> ArchiveValidator {
    ArchiveValidator::new(ValidatorConfig::default()).unwrap()
}

/// Helper: validator with a modified configuration.
pub fn validator_with(edit: impl FnOnce(&mut ValidatorConfig)) -> ArchiveValidator {
    let mut config = ValidatorConfig::default();
    edit(&mut config);
    ArchiveValidator::new(config).unwrap()
}

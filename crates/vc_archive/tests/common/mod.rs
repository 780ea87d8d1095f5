#![allow(dead_code, reason = "not every test file uses every helper")]

use vc_archive::format::{Endian, PortableOptions};
use vc_archive::{InputArchive, OutputArchive, Registry, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Binary,
    Portable,
    PortableBig,
    Json,
    Xml,
}

pub const ALL: [Format; 5] = [
    Format::Binary,
    Format::Portable,
    Format::PortableBig,
    Format::Json,
    Format::Xml,
];

pub const TEXT: [Format; 2] = [Format::Json, Format::Xml];

pub fn output<'a>(format: Format, out: &'a mut Vec<u8>) -> OutputArchive<'a> {
    match format {
        Format::Binary => OutputArchive::binary(out),
        Format::Portable => OutputArchive::portable(out).unwrap(),
        Format::PortableBig => {
            OutputArchive::portable_with(out, PortableOptions::default().endian(Endian::Big))
                .unwrap()
        }
        Format::Json => OutputArchive::json(out),
        Format::Xml => OutputArchive::xml(out),
    }
}

pub fn input(format: Format, bytes: &[u8]) -> InputArchive<'_> {
    match format {
        Format::Binary => InputArchive::binary(bytes),
        Format::Portable | Format::PortableBig => InputArchive::portable(bytes).unwrap(),
        Format::Json => InputArchive::json(bytes).unwrap(),
        Format::Xml => InputArchive::xml(bytes).unwrap(),
    }
}

/// Saves with `save`, then loads the bytes back with `load`.
pub fn round_trip<R>(
    format: Format,
    registry: Option<&Registry>,
    save: impl FnOnce(&mut OutputArchive<'_>) -> Result<()>,
    load: impl FnOnce(&mut InputArchive<'_>) -> Result<R>,
) -> R {
    let mut bytes = Vec::new();
    let mut ar = output(format, &mut bytes);
    if let Some(registry) = registry {
        ar = ar.with_registry(registry);
    }
    save(&mut ar).unwrap_or_else(|e| panic!("{format:?} save: {e}"));
    ar.finish().unwrap_or_else(|e| panic!("{format:?} finish: {e}"));

    let mut ar = input(format, &bytes);
    if let Some(registry) = registry {
        ar = ar.with_registry(registry);
    }
    let value = load(&mut ar).unwrap_or_else(|e| panic!("{format:?} load: {e}"));
    ar.finish().unwrap_or_else(|e| panic!("{format:?} finish: {e}"));
    value
}

//! Windows Installer package reader built on the `msi` crate.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Seek};

/// Compound File Binary signature shared by MSI, MSP and MST files.
pub const CFB_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Properties read into metadata.
const INTERESTING_PROPERTIES: &[&str] = &[
    "ProductName",
    "ProductVersion",
    "Manufacturer",
    "ProductCode",
    "UpgradeCode",
];

pub fn is_compound_document(data: &[u8]) -> bool {
    data.starts_with(&CFB_MAGIC)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsiPackageKind {
    Installer,
    Patch,
    Transform,
}

/// Summary information plus the `Property` table of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsiInfo {
    pub kind: MsiPackageKind,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    /// Platform part of the template, e.g. `x64`
    pub arch: Option<String>,
    /// Summary UUID, braced and upper-cased like product codes
    pub package_code: Option<String>,
    /// Selected rows of the `Property` table, or why they could not be read
    pub properties: Result<BTreeMap<String, String>, String>,
}

impl MsiInfo {
    pub fn is_installer(&self) -> bool {
        self.kind == MsiPackageKind::Installer
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .as_ref()
            .ok()
            .and_then(|p| p.get(name))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

/// Open an in-memory compound document and read its summary and
/// properties.
///
/// Fails only when the container itself cannot be opened; a missing or
/// unreadable `Property` table is reported inside `properties`.
pub fn read_package(data: &[u8]) -> io::Result<MsiInfo> {
    read_package_from(Cursor::new(data))
}

/// Same as `read_package`, reading sectors from `reader` on demand so the
/// package does not have to fit in memory.
pub fn read_package_from<R: Read + Seek>(reader: R) -> io::Result<MsiInfo> {
    let mut package = msi::Package::open(reader)?;

    let kind = match package.package_type() {
        msi::PackageType::Installer => MsiPackageKind::Installer,
        msi::PackageType::Patch => MsiPackageKind::Patch,
        msi::PackageType::Transform => MsiPackageKind::Transform,
    };

    let summary = package.summary_info();
    let owned = |s: Option<&str>| s.map(str::to_owned).filter(|s| !s.is_empty());
    let title = owned(summary.title());
    let subject = owned(summary.subject());
    let author = owned(summary.author());
    let arch = owned(summary.arch());
    let package_code = summary
        .uuid()
        .map(|uuid| format!("{{{}}}", uuid.to_string().to_uppercase()));

    let properties = read_properties(&mut package).map_err(|e| e.to_string());

    Ok(MsiInfo {
        kind,
        title,
        subject,
        author,
        arch,
        package_code,
        properties,
    })
}

fn read_properties<F: io::Read + io::Seek>(
    package: &mut msi::Package<F>,
) -> io::Result<BTreeMap<String, String>> {
    if !package.has_table("Property") {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "package has no Property table",
        ));
    }
    let mut out = BTreeMap::new();
    for row in package.select_rows(msi::Select::table("Property"))? {
        let (Some(name), Some(value)) = (row["Property"].as_str(), row["Value"].as_str()) else {
            continue;
        };
        if INTERESTING_PROPERTIES.contains(&name) {
            out.insert(name.to_owned(), value.to_owned());
        }
    }
    Ok(out)
}

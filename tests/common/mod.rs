//! Common test utilities and helpers.
//!
//! Synthetic installers are built in memory so the suite needs no sample
//! corpus: a PE builder with an optional version resource, extra sections
//! and overlay, and an MSI builder on top of the `msi` crate.

#![allow(dead_code)]

pub mod test_utils;

use std::io::Cursor;

const FILE_ALIGN: usize = 0x200;
const SECTION_ALIGN: u32 = 0x1000;
const HEADERS_SIZE: usize = 0x400;
const E_LFANEW: usize = 0x40;
const OPT_HEADER_SIZE: u16 = 224;

fn put_u16(buf: &mut [u8], at: usize, v: u16) {
    buf[at..at + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, v: u32) {
    buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

fn align(n: usize, to: usize) -> usize {
    n.div_ceil(to) * to
}

fn pad4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

/// One `VS_VERSIONINFO` node.
fn version_node(key: &str, value: &[u8], value_len: u16, text: bool, children: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![0u8; 6];
    out[2..4].copy_from_slice(&value_len.to_le_bytes());
    out[4..6].copy_from_slice(&(text as u16).to_le_bytes());
    for u in key.encode_utf16().chain(std::iter::once(0)) {
        out.extend_from_slice(&u.to_le_bytes());
    }
    pad4(&mut out);
    out.extend_from_slice(value);
    for child in children {
        pad4(&mut out);
        out.extend_from_slice(child);
    }
    let len = out.len() as u16;
    out[0..2].copy_from_slice(&len.to_le_bytes());
    out
}

fn version_blob(strings: &[(String, String)], product_version: [u16; 4]) -> Vec<u8> {
    let entries: Vec<Vec<u8>> = strings
        .iter()
        .map(|(k, v)| {
            let mut bytes: Vec<u8> = v.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
            bytes.extend_from_slice(&[0, 0]);
            version_node(k, &bytes, (bytes.len() / 2) as u16, true, &[])
        })
        .collect();
    let table = version_node("040904b0", &[], 0, true, &entries);
    let sfi = version_node("StringFileInfo", &[], 0, true, &[table]);

    let mut fixed = vec![0u8; 52];
    put_u32(&mut fixed, 0, 0xFEEF_04BD);
    let [a, b, c, d] = product_version;
    let ms = ((a as u32) << 16) | b as u32;
    let ls = ((c as u32) << 16) | d as u32;
    put_u32(&mut fixed, 8, ms);
    put_u32(&mut fixed, 12, ls);
    put_u32(&mut fixed, 16, ms);
    put_u32(&mut fixed, 20, ls);
    version_node("VS_VERSION_INFO", &fixed, 52, false, &[sfi])
}

/// `.rsrc` contents for a section mapped at `va`: three one-entry
/// directories (type, name, language), a data entry, then the blob.
fn resource_section(va: u32, blob: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; 88];
    put_u16(&mut buf, 14, 1);
    put_u32(&mut buf, 16, 16); // RT_VERSION
    put_u32(&mut buf, 20, 0x8000_0000 | 24);
    put_u16(&mut buf, 24 + 14, 1);
    put_u32(&mut buf, 24 + 16, 1);
    put_u32(&mut buf, 24 + 20, 0x8000_0000 | 48);
    put_u16(&mut buf, 48 + 14, 1);
    put_u32(&mut buf, 48 + 16, 1033);
    put_u32(&mut buf, 48 + 20, 72);
    put_u32(&mut buf, 72, va + 88);
    put_u32(&mut buf, 76, blob.len() as u32);
    buf.extend_from_slice(blob);
    buf
}

/// Builds small but well-formed PE32 images.
#[derive(Debug, Clone)]
pub struct PeBuilder {
    machine: u16,
    body: Vec<u8>,
    version: Vec<(String, String)>,
    product_version: [u16; 4],
    extra_sections: Vec<String>,
    overlay: Vec<u8>,
}

impl Default for PeBuilder {
    fn default() -> Self {
        Self {
            machine: 0x14c,
            body: b"\x55\x8b\xec\x90\x90\xc3".to_vec(),
            version: Vec::new(),
            product_version: [1, 0, 0, 0],
            extra_sections: Vec::new(),
            overlay: Vec::new(),
        }
    }
}

impl PeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    /// Bytes placed in `.text`, e.g. branding strings.
    pub fn body(mut self, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(bytes);
        self
    }

    pub fn version_string(mut self, key: &str, value: &str) -> Self {
        self.version.push((key.to_string(), value.to_string()));
        self
    }

    pub fn product_version(mut self, v: [u16; 4]) -> Self {
        self.product_version = v;
        self
    }

    pub fn section(mut self, name: &str) -> Self {
        self.extra_sections.push(name.to_string());
        self
    }

    /// Data appended after the last section.
    pub fn overlay(mut self, bytes: &[u8]) -> Self {
        self.overlay.extend_from_slice(bytes);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut named: Vec<(String, Vec<u8>)> = vec![(".text".into(), self.body.clone())];
        let has_rsrc = !self.version.is_empty();
        if has_rsrc {
            named.push((".rsrc".into(), Vec::new()));
        }
        for name in &self.extra_sections {
            named.push((name.clone(), vec![0xCC; 16]));
        }

        let mut file = vec![0u8; HEADERS_SIZE];
        file[0..2].copy_from_slice(b"MZ");
        put_u32(&mut file, 0x3C, E_LFANEW as u32);
        file[E_LFANEW..E_LFANEW + 4].copy_from_slice(b"PE\0\0");
        let coff = E_LFANEW + 4;
        put_u16(&mut file, coff, self.machine);
        put_u16(&mut file, coff + 2, named.len() as u16);
        put_u16(&mut file, coff + 16, OPT_HEADER_SIZE);
        let opt = coff + 20;
        put_u16(&mut file, opt, 0x10b);
        put_u32(&mut file, opt + 92, 16);
        let table = opt + OPT_HEADER_SIZE as usize;

        let mut va = SECTION_ALIGN;
        for (i, (name, data)) in named.iter_mut().enumerate() {
            if name == ".rsrc" {
                *data = resource_section(va, &version_blob(&self.version, self.product_version));
                let dir = opt + 96 + 2 * 8;
                put_u32(&mut file, dir, va);
                put_u32(&mut file, dir + 4, data.len() as u32);
            }
            let raw_offset = file.len();
            let raw_size = align(data.len().max(1), FILE_ALIGN);

            let hdr = table + i * 40;
            let mut name_bytes = [0u8; 8];
            let n = name.len().min(8);
            name_bytes[..n].copy_from_slice(&name.as_bytes()[..n]);
            file[hdr..hdr + 8].copy_from_slice(&name_bytes);
            put_u32(&mut file, hdr + 8, data.len() as u32);
            put_u32(&mut file, hdr + 12, va);
            put_u32(&mut file, hdr + 16, raw_size as u32);
            put_u32(&mut file, hdr + 20, raw_offset as u32);

            file.extend_from_slice(data);
            file.resize(raw_offset + raw_size, 0);
            va += align(raw_size, SECTION_ALIGN as usize) as u32;
        }

        file.extend_from_slice(&self.overlay);
        file
    }
}

/// Builds MSI packages through the `msi` crate.
#[derive(Debug, Clone)]
pub struct MsiBuilder {
    properties: Vec<(String, String)>,
    arch: &'static str,
    subject: Option<String>,
}

impl Default for MsiBuilder {
    fn default() -> Self {
        Self {
            properties: vec![
                ("ProductName".into(), "Contoso Agent".into()),
                ("ProductVersion".into(), "4.2.1".into()),
                ("Manufacturer".into(), "Contoso Ltd".into()),
                ("ProductCode".into(), PRODUCT_CODE.into()),
                ("UpgradeCode".into(), "{11111111-2222-3333-4444-555555555555}".into()),
            ],
            arch: "x64",
            subject: None,
        }
    }
}

pub const PRODUCT_CODE: &str = "{0F1E2D3C-4B5A-6978-8796-A5B4C3D2E1F0}";

impl MsiBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_properties() -> Self {
        Self {
            properties: Vec::new(),
            ..Self::default()
        }
    }

    pub fn property(mut self, name: &str, value: &str) -> Self {
        self.properties.retain(|(k, _)| k != name);
        self.properties.push((name.to_string(), value.to_string()));
        self
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut package =
            msi::Package::create(msi::PackageType::Installer, Cursor::new(Vec::new()))
                .expect("create package");
        {
            let summary = package.summary_info_mut();
            summary.set_title("Installation Database");
            summary.set_author("Contoso Ltd");
            summary.set_arch(self.arch);
            summary.set_uuid(uuid::Uuid::new_v4());
            if let Some(subject) = &self.subject {
                summary.set_subject(subject.clone());
            }
        }
        let columns = vec![
            msi::Column::build("Property").primary_key().id_string(72),
            msi::Column::build("Value").nullable().formatted_string(255),
        ];
        package.create_table("Property", columns).expect("create Property");
        if !self.properties.is_empty() {
            let rows = self
                .properties
                .iter()
                .map(|(k, v)| vec![msi::Value::from(k.as_str()), msi::Value::from(v.as_str())])
                .collect();
            package
                .insert_rows(msi::Insert::into("Property").rows(rows))
                .expect("insert properties");
        }
        package.into_inner().expect("finish package").into_inner()
    }
}

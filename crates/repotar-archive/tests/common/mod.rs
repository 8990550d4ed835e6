//! Shared tarball builders for archive integration tests.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tar::{Archive, Builder, EntryType, Header};

/// One decoded output entry.
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub name: String,
    pub kind: EntryType,
    pub mode: u32,
    pub link: Option<String>,
    pub data: Vec<u8>,
}

/// Builds an in-memory `.tar.gz` the way a code host lays one out.
#[allow(dead_code)]
pub struct HostedTarball {
    builder: Builder<Vec<u8>>,
}

#[allow(dead_code)]
impl HostedTarball {
    pub fn new() -> Self {
        Self {
            builder: Builder::new(Vec::new()),
        }
    }

    /// Pax global header carrying a `comment` record, as `git archive` writes.
    pub fn pax_global(mut self, comment: &str) -> Self {
        let record = pax_record("comment", comment);
        let mut header = Header::new_ustar();
        header.set_entry_type(EntryType::XGlobalHeader);
        header.set_size(record.len() as u64);
        header.set_mode(0o644);
        self.builder
            .append_data(&mut header, "pax_global_header", record.as_slice())
            .unwrap();
        self
    }

    pub fn dir(mut self, path: &str) -> Self {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Directory);
        header.set_size(0);
        header.set_mode(0o755);
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    pub fn file(self, path: &str, data: &[u8]) -> Self {
        self.file_with_mode(path, data, 0o644)
    }

    pub fn file_with_mode(mut self, path: &str, data: &[u8], mode: u32) -> Self {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(mode);
        self.builder.append_data(&mut header, path, data).unwrap();
        self
    }

    pub fn ustar_file(mut self, path: &str, data: &[u8]) -> Self {
        let mut header = Header::new_ustar();
        header.set_entry_type(EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        self.builder.append_data(&mut header, path, data).unwrap();
        self
    }

    pub fn symlink(mut self, path: &str, target: &str) -> Self {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Symlink);
        header.set_size(0);
        header.set_mode(0o777);
        self.builder.append_link(&mut header, path, target).unwrap();
        self
    }

    pub fn hardlink(mut self, path: &str, target: &str) -> Self {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Link);
        header.set_size(0);
        header.set_mode(0o644);
        self.builder.append_link(&mut header, path, target).unwrap();
        self
    }

    /// Write a name verbatim into the header, bypassing the builder's
    /// path validation.
    pub fn raw_file(mut self, raw_name: &[u8], data: &[u8]) -> Self {
        let mut header = Header::new_gnu();
        header.as_old_mut().name[..raw_name.len()].copy_from_slice(raw_name);
        header.set_entry_type(EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        self.builder.append(&header, data).unwrap();
        self
    }

    pub fn finish(self) -> Vec<u8> {
        gzip(&self.builder.into_inner().unwrap())
    }
}

/// Encode a single pax `key=value` record with its length prefix.
#[allow(clippy::arithmetic_side_effects)]
pub fn pax_record(key: &str, value: &str) -> Vec<u8> {
    let body = format!(" {key}={value}\n");
    let mut len = body.len();
    loop {
        let total = len.to_string().len() + body.len();
        if total == len {
            break;
        }
        len = total;
    }
    format!("{len}{body}").into_bytes()
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Decode a complete `.tar.gz`, panicking on any malformation.
#[allow(dead_code)]
pub fn decode(tgz: &[u8]) -> Vec<Decoded> {
    let mut archive = Archive::new(GzDecoder::new(tgz));
    archive
        .entries()
        .unwrap()
        .map(|entry| {
            let mut entry = entry.unwrap();
            let name = String::from_utf8(entry.path_bytes().into_owned()).unwrap();
            let link = entry
                .link_name_bytes()
                .map(|l| String::from_utf8(l.into_owned()).unwrap());
            let kind = entry.header().entry_type();
            let mode = entry.header().mode().unwrap();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            Decoded {
                name,
                kind,
                mode,
                link,
                data,
            }
        })
        .collect()
}

#[allow(dead_code)]
pub fn names(tgz: &[u8]) -> Vec<String> {
    decode(tgz).into_iter().map(|d| d.name).collect()
}

/// Deterministic, poorly compressible filler.
#[allow(dead_code, clippy::arithmetic_side_effects)]
pub fn noise(len: usize) -> Vec<u8> {
    let mut state: u32 = 0x9E37_79B9;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state.to_le_bytes()[0]
        })
        .collect()
}

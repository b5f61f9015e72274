//! Binary shell link (`.lnk`) reader and writer.
//!
//! Only the parts needed to recreate a Start Menu shortcut are interpreted:
//! the header flags, the LinkInfo local path, the StringData fields and the
//! environment-variable target block. Everything else is skipped on read and
//! left out on write.

use super::{MetadataReader, ShortcutWriter};
use crate::error::Error;
use crate::model::ItemMetadata;
use std::fs;
use std::path::Path;

const HEADER_SIZE: u32 = 0x4C;
const LINK_CLSID: [u8; 16] = [
    0x01, 0x14, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46,
];

const HAS_LINK_TARGET_ID_LIST: u32 = 1 << 0;
const HAS_LINK_INFO: u32 = 1 << 1;
const HAS_NAME: u32 = 1 << 2;
const HAS_RELATIVE_PATH: u32 = 1 << 3;
const HAS_WORKING_DIR: u32 = 1 << 4;
const HAS_ARGUMENTS: u32 = 1 << 5;
const HAS_ICON_LOCATION: u32 = 1 << 6;
const IS_UNICODE: u32 = 1 << 7;
const HAS_EXP_STRING: u32 = 1 << 9;

const LINK_INFO_VOLUME_ID_AND_LOCAL_BASE_PATH: u32 = 1;
const LINK_INFO_HEADER_SIZE: u32 = 0x24;
const VOLUME_ID_SIZE: u32 = 0x11;
const DRIVE_FIXED: u32 = 3;

const ENVIRONMENT_BLOCK_SIGNATURE: u32 = 0xA000_0001;
const ENVIRONMENT_BLOCK_SIZE: u32 = 0x314;
const ENVIRONMENT_ANSI_LEN: usize = 260;
const ENVIRONMENT_UNICODE_LEN: usize = 520;

const FILE_ATTRIBUTE_NORMAL: u32 = 0x80;
const SW_SHOWNORMAL: u32 = 1;

/// Shell link codec usable on every platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellLinkFormat;

impl MetadataReader for ShellLinkFormat {
    fn read(&self, path: &Path) -> Result<ItemMetadata, Error> {
        let bytes = fs::read(path).map_err(|e| Error::metadata(path, e.to_string()))?;
        decode(&bytes).map_err(|reason| Error::metadata(path, reason))
    }
}

impl ShortcutWriter for ShellLinkFormat {
    fn write(&self, path: &Path, metadata: &ItemMetadata) -> Result<(), Error> {
        fs::write(path, encode(metadata))?;
        Ok(())
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], String> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| format!("truncated at offset {}", self.pos))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16, String> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, String> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn string_data(&mut self, unicode: bool) -> Result<String, String> {
        let count = self.u16()? as usize;
        if unicode {
            Ok(utf16_lossy(self.take(count * 2)?))
        } else {
            Ok(String::from_utf8_lossy(self.take(count)?).into_owned())
        }
    }
}

fn read_u32_at(data: &[u8], offset: usize) -> Result<u32, String> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| format!("LinkInfo field at {} out of range", offset))
}

fn utf16_lossy(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

fn ansi_z(data: &[u8], offset: usize) -> Result<String, String> {
    let tail = data
        .get(offset..)
        .ok_or_else(|| format!("string offset {} out of range", offset))?;
    let end = tail.iter().position(|b| *b == 0).unwrap_or(tail.len());
    Ok(String::from_utf8_lossy(&tail[..end]).into_owned())
}

fn utf16_z(data: &[u8], offset: usize) -> Result<String, String> {
    let tail = data
        .get(offset..)
        .ok_or_else(|| format!("string offset {} out of range", offset))?;
    let mut end = 0;
    while end + 1 < tail.len() && (tail[end] != 0 || tail[end + 1] != 0) {
        end += 2;
    }
    Ok(utf16_lossy(&tail[..end]))
}

fn parse_link_info(info: &[u8]) -> Result<Option<String>, String> {
    let header_size = read_u32_at(info, 4)?;
    let flags = read_u32_at(info, 8)?;
    if flags & LINK_INFO_VOLUME_ID_AND_LOCAL_BASE_PATH == 0 {
        // Network-only targets are not interpreted.
        return Ok(None);
    }

    let unicode = header_size >= LINK_INFO_HEADER_SIZE;
    let base = match (unicode, unicode.then(|| read_u32_at(info, 28)).transpose()?) {
        (true, Some(offset)) if offset != 0 => utf16_z(info, offset as usize)?,
        _ => ansi_z(info, read_u32_at(info, 16)? as usize)?,
    };
    let suffix = match (unicode, unicode.then(|| read_u32_at(info, 32)).transpose()?) {
        (true, Some(offset)) if offset != 0 => utf16_z(info, offset as usize)?,
        _ => match read_u32_at(info, 24)? {
            0 => String::new(),
            offset => ansi_z(info, offset as usize)?,
        },
    };

    if base.is_empty() {
        return Ok(None);
    }
    if suffix.is_empty() {
        Ok(Some(base))
    } else if base.ends_with('\\') {
        Ok(Some(format!("{}{}", base, suffix)))
    } else {
        Ok(Some(format!("{}\\{}", base, suffix)))
    }
}

fn parse_environment_target(block: &[u8]) -> Option<String> {
    // `block` starts after the size field: signature, ANSI target, Unicode target.
    let unicode = block.get(4 + ENVIRONMENT_ANSI_LEN..4 + ENVIRONMENT_ANSI_LEN + ENVIRONMENT_UNICODE_LEN)?;
    let target = utf16_z(unicode, 0).ok()?;
    if !target.is_empty() {
        return Some(target);
    }
    let ansi = ansi_z(block.get(4..4 + ENVIRONMENT_ANSI_LEN)?, 0).ok()?;
    (!ansi.is_empty()).then_some(ansi)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Decode the metadata of a shell link.
pub fn decode(bytes: &[u8]) -> Result<ItemMetadata, String> {
    let mut r = Reader::new(bytes);

    if r.u32()? != HEADER_SIZE {
        return Err("unexpected header size".to_string());
    }
    if r.take(16)? != LINK_CLSID {
        return Err("not a shell link".to_string());
    }
    let flags = r.u32()?;
    r.take(HEADER_SIZE as usize - 24)?;

    if flags & HAS_LINK_TARGET_ID_LIST != 0 {
        let len = r.u16()? as usize;
        r.take(len)?;
    }

    let mut link_info_target = None;
    if flags & HAS_LINK_INFO != 0 {
        let start = r.pos;
        let size = r.u32()? as usize;
        if size < 4 {
            return Err("invalid LinkInfo size".to_string());
        }
        r.pos = start;
        let info = r.take(size)?;
        link_info_target = parse_link_info(info)?;
    }

    let unicode = flags & IS_UNICODE != 0;
    let mut field = |flag: u32| -> Result<Option<String>, String> {
        if flags & flag != 0 {
            r.string_data(unicode).map(Some)
        } else {
            Ok(None)
        }
    };
    let description = field(HAS_NAME)?;
    let relative_path = field(HAS_RELATIVE_PATH)?;
    let working_directory = field(HAS_WORKING_DIR)?;
    let arguments = field(HAS_ARGUMENTS)?;
    let icon_location = field(HAS_ICON_LOCATION)?;

    let mut environment_target = None;
    while r.remaining() >= 4 {
        let size = r.u32()? as usize;
        if size < 4 {
            break;
        }
        let block = r.take(size - 4)?;
        let signature = read_u32_at(block, 0)?;
        if signature == ENVIRONMENT_BLOCK_SIGNATURE {
            environment_target = parse_environment_target(block);
        }
    }

    let target_path = if flags & HAS_EXP_STRING != 0 && environment_target.is_some() {
        environment_target
    } else {
        link_info_target.or(environment_target).or(relative_path)
    };

    Ok(ItemMetadata {
        arguments: non_empty(arguments),
        description: non_empty(description),
        icon_location: non_empty(icon_location),
        target_path: non_empty(target_path),
        working_directory: non_empty(working_directory),
    })
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn to_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

fn push_string_data(out: &mut Vec<u8>, text: &str) {
    let units: Vec<u16> = text.encode_utf16().take(u16::MAX as usize).collect();
    push_u16(out, units.len() as u16);
    for unit in units {
        push_u16(out, unit);
    }
}

fn encode_link_info(target: &str) -> Vec<u8> {
    let mut ansi = to_ansi(target);
    ansi.push(0);
    let mut unicode: Vec<u8> = target.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    unicode.extend_from_slice(&[0, 0]);

    let volume_offset = LINK_INFO_HEADER_SIZE;
    let local_offset = volume_offset + VOLUME_ID_SIZE;
    let suffix_offset = local_offset + ansi.len() as u32;
    let local_unicode_offset = suffix_offset + 1;
    let suffix_unicode_offset = local_unicode_offset + unicode.len() as u32;
    let total = suffix_unicode_offset + 2;

    let mut out = Vec::with_capacity(total as usize);
    push_u32(&mut out, total);
    push_u32(&mut out, LINK_INFO_HEADER_SIZE);
    push_u32(&mut out, LINK_INFO_VOLUME_ID_AND_LOCAL_BASE_PATH);
    push_u32(&mut out, volume_offset);
    push_u32(&mut out, local_offset);
    push_u32(&mut out, 0);
    push_u32(&mut out, suffix_offset);
    push_u32(&mut out, local_unicode_offset);
    push_u32(&mut out, suffix_unicode_offset);

    push_u32(&mut out, VOLUME_ID_SIZE);
    push_u32(&mut out, DRIVE_FIXED);
    push_u32(&mut out, 0);
    push_u32(&mut out, 0x10);
    out.push(0);

    out.extend_from_slice(&ansi);
    out.push(0);
    out.extend_from_slice(&unicode);
    out.extend_from_slice(&[0, 0]);
    out
}

fn encode_environment_block(target: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(ENVIRONMENT_BLOCK_SIZE as usize);
    push_u32(&mut out, ENVIRONMENT_BLOCK_SIZE);
    push_u32(&mut out, ENVIRONMENT_BLOCK_SIGNATURE);

    let mut ansi = to_ansi(target);
    ansi.truncate(ENVIRONMENT_ANSI_LEN - 1);
    ansi.resize(ENVIRONMENT_ANSI_LEN, 0);
    out.extend_from_slice(&ansi);

    let mut unicode: Vec<u8> = target
        .encode_utf16()
        .take(ENVIRONMENT_UNICODE_LEN / 2 - 1)
        .flat_map(|u| u.to_le_bytes())
        .collect();
    unicode.resize(ENVIRONMENT_UNICODE_LEN, 0);
    out.extend_from_slice(&unicode);
    out
}

/// Encode metadata as a shell link. Targets containing `%VAR%` references are
/// stored in the environment block; other targets as a LinkInfo local path.
pub fn encode(metadata: &ItemMetadata) -> Vec<u8> {
    let target = metadata.target_path.as_deref().filter(|t| !t.is_empty());
    let environment_target = target.filter(|t| t.contains('%'));

    let mut flags = IS_UNICODE;
    if environment_target.is_some() {
        flags |= HAS_EXP_STRING;
    } else if target.is_some() {
        flags |= HAS_LINK_INFO;
    }
    let strings = [
        (HAS_NAME, metadata.description.as_deref()),
        (HAS_WORKING_DIR, metadata.working_directory.as_deref()),
        (HAS_ARGUMENTS, metadata.arguments.as_deref()),
        (HAS_ICON_LOCATION, metadata.icon_location.as_deref()),
    ];
    for (flag, value) in &strings {
        if value.is_some_and(|v| !v.is_empty()) {
            flags |= flag;
        }
    }

    let mut out = Vec::new();
    push_u32(&mut out, HEADER_SIZE);
    out.extend_from_slice(&LINK_CLSID);
    push_u32(&mut out, flags);
    push_u32(&mut out, FILE_ATTRIBUTE_NORMAL);
    out.extend_from_slice(&[0u8; 24]); // creation, access, write times
    push_u32(&mut out, 0); // file size
    push_u32(&mut out, 0); // icon index
    push_u32(&mut out, SW_SHOWNORMAL);
    push_u16(&mut out, 0); // hotkey
    out.extend_from_slice(&[0u8; 10]);

    if flags & HAS_LINK_INFO != 0 {
        if let Some(target) = target {
            out.extend_from_slice(&encode_link_info(target));
        }
    }

    for (flag, value) in &strings {
        if flags & flag != 0 {
            if let Some(value) = value {
                push_string_data(&mut out, value);
            }
        }
    }

    if let Some(target) = environment_target {
        out.extend_from_slice(&encode_environment_block(target));
    }
    push_u32(&mut out, 0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ItemMetadata {
        ItemMetadata {
            arguments: Some("--profile-directory=Default".into()),
            description: Some("Access the Internet".into()),
            icon_location: Some("C:\\Program Files\\Google\\Chrome\\chrome.exe,0".into()),
            target_path: Some("C:\\Program Files\\Google\\Chrome\\chrome.exe".into()),
            working_directory: Some("C:\\Program Files\\Google\\Chrome".into()),
        }
    }

    #[test]
    fn test_encoded_link_decodes_to_same_metadata() {
        let bytes = encode(&sample());
        assert_eq!(&bytes[0..4], &HEADER_SIZE.to_le_bytes());
        assert_eq!(decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_environment_target_uses_expansion_block() {
        let metadata = ItemMetadata {
            target_path: Some("%windir%\\system32\\notepad.exe".into()),
            ..Default::default()
        };
        let bytes = encode(&metadata);
        let flags = u32::from_le_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
        assert!(flags & HAS_EXP_STRING != 0);
        assert!(flags & HAS_LINK_INFO == 0);
        assert_eq!(decode(&bytes).unwrap(), metadata);
    }

    #[test]
    fn test_decodes_ansi_string_data() {
        let mut bytes = Vec::new();
        push_u32(&mut bytes, HEADER_SIZE);
        bytes.extend_from_slice(&LINK_CLSID);
        push_u32(&mut bytes, HAS_RELATIVE_PATH | HAS_ARGUMENTS);
        bytes.extend_from_slice(&[0u8; (HEADER_SIZE as usize) - 24]);
        push_u16(&mut bytes, 10);
        bytes.extend_from_slice(b"..\\app.exe");
        push_u16(&mut bytes, 3);
        bytes.extend_from_slice(b"-v ");
        push_u32(&mut bytes, 0);

        let metadata = decode(&bytes).unwrap();
        assert_eq!(metadata.target_path.as_deref(), Some("..\\app.exe"));
        assert_eq!(metadata.arguments.as_deref(), Some("-v "));
        assert_eq!(metadata.description, None);
    }

    #[test]
    fn test_rejects_non_links_and_truncated_data() {
        assert!(decode(b"hello world").is_err());
        let bytes = encode(&sample());
        assert!(decode(&bytes[..bytes.len() / 2]).is_err());
        let mut wrong_clsid = bytes.clone();
        wrong_clsid[4] ^= 0xFF;
        assert_eq!(decode(&wrong_clsid).unwrap_err(), "not a shell link");
    }

    #[test]
    fn test_read_reports_metadata_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.lnk");
        fs::write(&path, b"garbage").unwrap();
        let err = ShellLinkFormat.read(&path).unwrap_err();
        assert!(matches!(err, Error::MetadataRead { .. }));
    }
}

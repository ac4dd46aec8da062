//! Text Encodings for XML Files
//!
//! Decoding honours a byte order mark when one is present and otherwise
//! falls back to the configured encoding. Encoding writes a BOM for UTF-16.

use std::fmt;

/// Byte order marks
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Encoding used to read and write a document's bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileEncoding {
    /// UTF-16 little endian, written with a BOM
    #[default]
    Utf16,
    Utf8,
    /// 7-bit ASCII; other characters are rejected
    Ascii,
}

impl FileEncoding {
    /// Name used in the XML declaration
    pub fn label(self) -> &'static str {
        match self {
            FileEncoding::Utf16 => "UTF-16",
            FileEncoding::Utf8 => "UTF-8",
            FileEncoding::Ascii => "US-ASCII",
        }
    }
}

impl fmt::Display for FileEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Byte layout actually found in an input buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Ascii,
}

impl DetectedEncoding {
    /// Detect from byte order mark, falling back to `configured`
    pub fn detect(input: &[u8], configured: FileEncoding) -> Self {
        if input.starts_with(&UTF8_BOM) {
            return DetectedEncoding::Utf8;
        }
        if input.starts_with(&UTF16_LE_BOM) {
            return DetectedEncoding::Utf16Le;
        }
        if input.starts_with(&UTF16_BE_BOM) {
            return DetectedEncoding::Utf16Be;
        }
        match (input.first(), input.get(1), configured) {
            // No BOM but a NUL in the high byte of '<'
            (Some(0x00), Some(b'<'), _) => DetectedEncoding::Utf16Be,
            (Some(b'<'), Some(0x00), _) => DetectedEncoding::Utf16Le,
            (_, _, FileEncoding::Utf16) => DetectedEncoding::Utf16Le,
            (_, _, FileEncoding::Utf8) => DetectedEncoding::Utf8,
            (_, _, FileEncoding::Ascii) => DetectedEncoding::Ascii,
        }
    }
}

/// Decode raw file bytes into text
pub fn decode(input: &[u8], configured: FileEncoding) -> Result<String, String> {
    match DetectedEncoding::detect(input, configured) {
        DetectedEncoding::Utf8 => {
            let body = input.strip_prefix(&UTF8_BOM).unwrap_or(input);
            String::from_utf8(body.to_vec()).map_err(|e| format!("Invalid UTF-8: {}", e))
        }
        DetectedEncoding::Ascii => {
            if let Some(pos) = input.iter().position(|b| !b.is_ascii()) {
                return Err(format!("Invalid ASCII: byte 0x{:02X} at offset {}", input[pos], pos));
            }
            // All bytes are ASCII, hence valid UTF-8
            String::from_utf8(input.to_vec()).map_err(|e| format!("Invalid ASCII: {}", e))
        }
        DetectedEncoding::Utf16Le => decode_utf16(input, &UTF16_LE_BOM, u16::from_le_bytes, "LE"),
        DetectedEncoding::Utf16Be => decode_utf16(input, &UTF16_BE_BOM, u16::from_be_bytes, "BE"),
    }
}

fn decode_utf16(
    input: &[u8],
    bom: &[u8; 2],
    unit: fn([u8; 2]) -> u16,
    order: &str,
) -> Result<String, String> {
    let bytes = input.strip_prefix(bom).unwrap_or(input);

    if bytes.len() % 2 != 0 {
        return Err(format!("Invalid UTF-16 {}: odd number of bytes", order));
    }

    let code_units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| unit([chunk[0], chunk[1]]))
        .collect();

    String::from_utf16(&code_units).map_err(|e| format!("Invalid UTF-16 {}: {}", order, e))
}

/// Encode text into file bytes
pub fn encode(text: &str, encoding: FileEncoding) -> Result<Vec<u8>, String> {
    match encoding {
        FileEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
        FileEncoding::Ascii => {
            if let Some((pos, c)) = text.char_indices().find(|(_, c)| !c.is_ascii()) {
                return Err(format!("Character {:?} at offset {} is not ASCII", c, pos));
            }
            Ok(text.as_bytes().to_vec())
        }
        FileEncoding::Utf16 => {
            let mut out = Vec::with_capacity(2 + text.len() * 2);
            out.extend_from_slice(&UTF16_LE_BOM);
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_le_bytes());
            }
            Ok(out)
        }
    }
}

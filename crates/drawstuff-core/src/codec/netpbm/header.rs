//! Header grammar shared by all six Netpbm variants.
//!
//! ```text
//! P<n> <ws> width <ws> height [<ws> maxval] <single ws byte> [binary pixels]
//! ```
//!
//! Any run of whitespace separates tokens and `#` starts a comment that runs
//! to the end of the line. ASCII variants keep using [`Scanner`] for the pixel
//! tokens.

use crate::codec::{CodecError, ImageFormat, NetpbmFamily};

/// Largest maxval the format allows.
pub const MAX_MAXVAL: u32 = 65535;

/// Samples wider than this need two bytes in binary variants.
pub const ONE_BYTE_MAXVAL: u32 = 255;

/// Longest line written by the ASCII encoders.
pub const MAX_LINE_LEN: usize = 70;

/// Parsed Netpbm header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// Always 1 for bitmaps.
    pub maxval: u32,
    pub comments: Vec<String>,
}

/// Byte cursor over a Netpbm payload.
pub struct Scanner<'a> {
    data: &'a [u8],
    pos: usize,
    comments: Vec<String>,
}

impl<'a> Scanner<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            comments: Vec::new(),
        }
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn take_comments(&mut self) -> Vec<String> {
        std::mem::take(&mut self.comments)
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Consume a comment starting at `#`, up to but not including the newline.
    fn skip_comment(&mut self) {
        let start = self.pos + 1;
        let end = self.data[start..]
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
            .map_or(self.data.len(), |i| start + i);
        let text = String::from_utf8_lossy(&self.data[start..end]);
        self.comments.push(text.trim().to_string());
        self.pos = end;
    }

    /// Skip whitespace and comments. Returns `false` at end of input.
    pub fn skip_separators(&mut self) -> bool {
        while let Some(b) = self.peek() {
            match b {
                b'#' => self.skip_comment(),
                b if b.is_ascii_whitespace() => self.pos += 1,
                _ => return true,
            }
        }
        false
    }

    /// Read the next decimal token. `Ok(None)` at end of input.
    ///
    /// A token that starts with a non-digit is reported through `malformed`.
    pub fn next_number(
        &mut self,
        malformed: impl Fn(String) -> CodecError,
    ) -> Result<Option<u32>, CodecError> {
        if !self.skip_separators() {
            return Ok(None);
        }

        let start = self.pos;
        let mut value: u32 = 0;
        while let Some(b) = self.peek().filter(u8::is_ascii_digit) {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u32::from(b - b'0')))
                .ok_or_else(|| malformed("number does not fit in 32 bits".to_string()))?;
            self.pos += 1;
        }

        if self.pos == start {
            let found = self.data[start];
            return Err(malformed(format!("unexpected byte {found:#04x}")));
        }
        Ok(Some(value))
    }

    /// Read the next non-separator byte, used for run-together P1 digits.
    pub fn next_byte(&mut self) -> Option<u8> {
        if !self.skip_separators() {
            return None;
        }
        let b = self.data[self.pos];
        self.pos += 1;
        Some(b)
    }

    /// Consume the single whitespace byte that ends a binary header.
    ///
    /// A comment right after the last token is also accepted; its newline
    /// acts as the separator.
    fn end_binary_header(&mut self) -> Result<(), CodecError> {
        match self.peek() {
            None => Ok(()),
            Some(b'#') => {
                self.skip_comment();
                // The comment runs to the newline, which is the separator
                if self.peek() == Some(b'\r') {
                    self.pos += 1;
                }
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
                Ok(())
            }
            Some(b) if b.is_ascii_whitespace() => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(CodecError::MalformedHeader(format!(
                "expected whitespace before pixel data, found byte {b:#04x}"
            ))),
        }
    }
}

fn header_field(scanner: &mut Scanner<'_>, field: &'static str) -> Result<u32, CodecError> {
    scanner
        .next_number(|reason| CodecError::MalformedHeader(format!("{field}: {reason}")))?
        .ok_or(CodecError::TruncatedHeader)
}

/// Parse the header and leave `scanner` at the first pixel byte or token.
pub fn parse_header(scanner: &mut Scanner<'_>) -> Result<Header, CodecError> {
    let data = scanner.remaining();
    if data.len() < 2 {
        return Err(if data.is_empty() || data[0] == b'P' {
            CodecError::TruncatedHeader
        } else {
            CodecError::BadMagic(String::from_utf8_lossy(data).into_owned())
        });
    }

    let format = match data[0] {
        b'P' => ImageFormat::from_magic(data[1]),
        _ => None,
    }
    .ok_or_else(|| CodecError::BadMagic(String::from_utf8_lossy(&data[..2]).into_owned()))?;
    scanner.pos += 2;

    match scanner.peek() {
        None => return Err(CodecError::TruncatedHeader),
        Some(b) if b != b'#' && !b.is_ascii_whitespace() => {
            return Err(CodecError::BadMagic(
                String::from_utf8_lossy(&data[..3]).into_owned(),
            ));
        }
        _ => {}
    }

    let width = header_field(scanner, "width")?;
    let height = header_field(scanner, "height")?;
    let maxval = match format.family() {
        Some(NetpbmFamily::Bitmap) => 1,
        _ => header_field(scanner, "maxval")?,
    };

    if width == 0 || height == 0 {
        return Err(CodecError::InvalidDimensions { width, height });
    }
    if maxval == 0 || maxval > MAX_MAXVAL {
        return Err(CodecError::InvalidMaxval(maxval));
    }

    if !format.is_plain() {
        scanner.end_binary_header()?;
    }

    Ok(Header {
        format,
        width,
        height,
        maxval,
        comments: scanner.take_comments(),
    })
}

/// Write `P<n>\n`, one `# comment` line per comment line, then the
/// dimensions and (for graymaps and pixmaps) the maxval.
pub fn write_header(
    out: &mut Vec<u8>,
    format: ImageFormat,
    width: u32,
    height: u32,
    maxval: Option<u32>,
    comments: &[String],
) {
    if let Some(magic) = format.magic() {
        out.extend_from_slice(magic);
        out.push(b'\n');
    }
    for line in comments.iter().flat_map(|c| c.lines()) {
        out.extend_from_slice(b"# ");
        out.extend_from_slice(line.as_bytes());
        out.push(b'\n');
    }
    out.extend_from_slice(format!("{width} {height}\n").as_bytes());
    if let Some(maxval) = maxval {
        out.extend_from_slice(format!("{maxval}\n").as_bytes());
    }
}

/// Appends space-separated tokens, starting a new line before one would
/// push the current line past [`MAX_LINE_LEN`].
pub struct TokenWriter<'a> {
    out: &'a mut Vec<u8>,
    line_len: usize,
}

impl<'a> TokenWriter<'a> {
    pub fn new(out: &'a mut Vec<u8>) -> Self {
        Self { out, line_len: 0 }
    }

    pub fn push(&mut self, token: &str) {
        if self.line_len > 0 {
            if self.line_len + 1 + token.len() > MAX_LINE_LEN {
                self.out.push(b'\n');
                self.line_len = 0;
            } else {
                self.out.push(b' ');
                self.line_len += 1;
            }
        }
        self.out.extend_from_slice(token.as_bytes());
        self.line_len += token.len();
    }

    /// Terminate the last line.
    pub fn finish(self) {
        if self.line_len > 0 {
            self.out.push(b'\n');
        }
    }
}

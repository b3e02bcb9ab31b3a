//! `multipart/x-mixed-replace` framing.
//!
//! Decoding is incremental: feed raw body chunks with
//! [`MultipartDecoder::push`] and drain events with
//! [`MultipartDecoder::next_event`]. Chunk boundaries may fall anywhere,
//! including inside a delimiter or a header line.

use bytes::{Buf, Bytes, BytesMut};

use crate::error_handling::types::MultipartError;

/// Boundary token used upstream and downstream.
pub const BOUNDARY: &str = "frame";

/// Bytes closing every emitted section.
pub const SECTION_TRAILER: &[u8] = b"\r\n";

const MAX_HEADER_BYTES: usize = 8 * 1024;

/// `Content-Type` of the downstream response.
pub fn stream_content_type() -> String {
    format!("multipart/x-mixed-replace; boundary={}", BOUNDARY)
}

/// Delimiter line and part headers preceding a JPEG of `len` bytes.
pub fn section_header(len: usize) -> Bytes {
    Bytes::from(format!(
        "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        BOUNDARY, len
    ))
}

#[derive(Debug, PartialEq, Eq)]
pub enum DecodeEvent {
    /// A complete section body.
    Frame(Bytes),
    /// A section was dropped; decoding continues at the next delimiter.
    Skipped(MultipartError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Boundary,
    Headers,
    Body {
        content_length: Option<usize>,
        scanned: usize,
    },
}

enum HeaderBlock {
    Incomplete,
    Complete { content_length: Option<usize> },
}

pub struct MultipartDecoder {
    delimiter: Vec<u8>,
    body_delimiter: Vec<u8>,
    buffer: BytesMut,
    state: DecodeState,
    max_section: usize,
}

impl MultipartDecoder {
    pub fn new(boundary: &str, max_section: usize) -> Self {
        let delimiter = format!("--{}", boundary).into_bytes();
        let mut body_delimiter = b"\n".to_vec();
        body_delimiter.extend_from_slice(&delimiter);

        Self {
            delimiter,
            body_delimiter,
            buffer: BytesMut::new(),
            state: DecodeState::Boundary,
            max_section,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Bytes currently held back waiting for more input.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the next decoded event, or `None` when more input is needed.
    pub fn next_event(&mut self) -> Option<DecodeEvent> {
        loop {
            match self.state {
                DecodeState::Boundary => {
                    if !self.seek_boundary() {
                        return None;
                    }
                    self.state = DecodeState::Headers;
                }
                DecodeState::Headers => match self.take_headers() {
                    Ok(HeaderBlock::Incomplete) => return None,
                    Ok(HeaderBlock::Complete { content_length }) => {
                        if let Some(len) = content_length {
                            if len > self.max_section {
                                self.state = DecodeState::Boundary;
                                return Some(DecodeEvent::Skipped(
                                    MultipartError::SectionTooLarge(len),
                                ));
                            }
                        }
                        self.state = DecodeState::Body {
                            content_length,
                            scanned: 0,
                        };
                    }
                    Err(e) => {
                        self.state = DecodeState::Boundary;
                        return Some(DecodeEvent::Skipped(e));
                    }
                },
                DecodeState::Body {
                    content_length: Some(len),
                    ..
                } => {
                    if self.buffer.len() < len {
                        return None;
                    }
                    let body = self.buffer.split_to(len).freeze();
                    self.state = DecodeState::Boundary;
                    return Some(DecodeEvent::Frame(body));
                }
                DecodeState::Body {
                    content_length: None,
                    scanned,
                } => match find_from(&self.buffer, &self.body_delimiter, scanned) {
                    Some(end) => {
                        let end = if end > 0 && self.buffer[end - 1] == b'\r' {
                            end - 1
                        } else {
                            end
                        };
                        let body = self.buffer.split_to(end).freeze();
                        self.state = DecodeState::Boundary;
                        return Some(DecodeEvent::Frame(body));
                    }
                    None => {
                        let buffered = self.buffer.len();
                        if buffered > self.max_section {
                            self.buffer.clear();
                            self.state = DecodeState::Boundary;
                            return Some(DecodeEvent::Skipped(MultipartError::SectionTooLarge(
                                buffered,
                            )));
                        }
                        self.state = DecodeState::Body {
                            content_length: None,
                            scanned: buffered.saturating_sub(self.body_delimiter.len() - 1),
                        };
                        return None;
                    }
                },
            }
        }
    }

    /// Consumes input up to and including the next delimiter line.
    fn seek_boundary(&mut self) -> bool {
        let mut from = 0;
        loop {
            let Some(pos) = find_from(&self.buffer, &self.delimiter, from) else {
                // keep a tail that may hold the start of a split delimiter
                let keep = self.delimiter.len() - 1;
                if self.buffer.len() > keep {
                    let discard = self.buffer.len() - keep;
                    self.buffer.advance(discard);
                }
                return false;
            };

            let after = pos + self.delimiter.len();
            let rest = &self.buffer[after..];

            if rest.starts_with(b"\r\n") {
                self.buffer.advance(after + 2);
                return true;
            }
            if rest.starts_with(b"\n") {
                self.buffer.advance(after + 1);
                return true;
            }
            if rest.is_empty() || rest == b"\r" || rest == b"-" {
                self.buffer.advance(pos);
                return false;
            }
            // close delimiter (`--frame--`) or a longer token sharing the prefix
            from = after;
        }
    }

    fn take_headers(&mut self) -> Result<HeaderBlock, MultipartError> {
        for empty in [&b"\r\n"[..], &b"\n"[..]] {
            if self.buffer.starts_with(empty) {
                self.buffer.advance(empty.len());
                return Ok(HeaderBlock::Complete {
                    content_length: None,
                });
            }
        }

        // the block ends at the first blank line, CRLF or bare LF
        let crlf = find_from(&self.buffer, b"\r\n\r\n", 0).map(|end| (end, 4));
        let lf = find_from(&self.buffer, b"\n\n", 0).map(|end| (end, 2));
        let terminator = [crlf, lf].into_iter().flatten().min_by_key(|(end, _)| *end);

        let Some((end, terminator_len)) = terminator else {
            if self.buffer.len() > MAX_HEADER_BYTES {
                return Err(MultipartError::MalformedHeader(format!(
                    "header block longer than {} bytes",
                    MAX_HEADER_BYTES
                )));
            }
            return Ok(HeaderBlock::Incomplete);
        };

        let block = self.buffer.split_to(end + terminator_len);
        let text = std::str::from_utf8(&block[..end])
            .map_err(|_| MultipartError::MalformedHeader("header block is not UTF-8".into()))?;

        let mut content_length = None;
        for line in text.lines() {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| MultipartError::MalformedHeader(line.to_string()))?;
            if name.trim().eq_ignore_ascii_case("content-length") {
                let value = value.trim();
                let len = value
                    .parse::<usize>()
                    .map_err(|_| MultipartError::InvalidContentLength(value.to_string()))?;
                content_length = Some(len);
            }
        }

        Ok(HeaderBlock::Complete { content_length })
    }
}

fn find_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() || needle.len() > haystack.len() - from {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 1024 * 1024;

    fn section(body: &[u8]) -> Vec<u8> {
        let mut out = section_header(body.len()).to_vec();
        out.extend_from_slice(body);
        out.extend_from_slice(SECTION_TRAILER);
        out
    }

    fn drain(decoder: &mut MultipartDecoder) -> Vec<DecodeEvent> {
        std::iter::from_fn(|| decoder.next_event()).collect()
    }

    #[test]
    fn test_section_header_layout() {
        assert_eq!(
            section_header(1234).as_ref(),
            b"--frame\r\nContent-Type: image/jpeg\r\nContent-Length: 1234\r\n\r\n"
        );
        assert_eq!(
            stream_content_type(),
            "multipart/x-mixed-replace; boundary=frame"
        );
    }

    #[test]
    fn test_decodes_consecutive_sections() {
        let mut input = section(b"first-jpeg");
        input.extend(section(b"second"));

        let mut decoder = MultipartDecoder::new(BOUNDARY, MAX);
        decoder.push(&input);

        assert_eq!(
            drain(&mut decoder),
            vec![
                DecodeEvent::Frame(Bytes::from_static(b"first-jpeg")),
                DecodeEvent::Frame(Bytes::from_static(b"second")),
            ]
        );
    }

    #[test]
    fn test_byte_by_byte_input_decodes_identically() {
        let mut input = b"preamble garbage\r\n".to_vec();
        input.extend(section(b"\xff\xd8jpeg-one\xff\xd9"));
        input.extend(section(b"\xff\xd8jpeg-two\xff\xd9"));

        let mut decoder = MultipartDecoder::new(BOUNDARY, MAX);
        let mut events = Vec::new();
        for byte in &input {
            decoder.push(std::slice::from_ref(byte));
            events.extend(drain(&mut decoder));
        }

        assert_eq!(
            events,
            vec![
                DecodeEvent::Frame(Bytes::from_static(b"\xff\xd8jpeg-one\xff\xd9")),
                DecodeEvent::Frame(Bytes::from_static(b"\xff\xd8jpeg-two\xff\xd9")),
            ]
        );
    }

    #[test]
    fn test_sections_without_length_end_at_next_delimiter() {
        let input = b"--frame\r\nContent-Type: image/jpeg\r\n\r\nAAAA\r\n--frame\r\nContent-Type: image/jpeg\r\n\r\nBB\r\n--frame\r\n";

        let mut decoder = MultipartDecoder::new(BOUNDARY, MAX);
        decoder.push(input);

        assert_eq!(
            drain(&mut decoder),
            vec![
                DecodeEvent::Frame(Bytes::from_static(b"AAAA")),
                DecodeEvent::Frame(Bytes::from_static(b"BB")),
            ]
        );
    }

    #[test]
    fn test_malformed_section_is_skipped() {
        let mut input = b"--frame\r\nContent-Length: twelve\r\n\r\nxxxxxxxxxxxx\r\n".to_vec();
        input.extend(section(b"good"));

        let mut decoder = MultipartDecoder::new(BOUNDARY, MAX);
        decoder.push(&input);

        assert_eq!(
            drain(&mut decoder),
            vec![
                DecodeEvent::Skipped(MultipartError::InvalidContentLength("twelve".into())),
                DecodeEvent::Frame(Bytes::from_static(b"good")),
            ]
        );
    }

    #[test]
    fn test_oversized_section_is_skipped() {
        let mut input = section(&[0u8; 64]);
        input.extend(section(b"small"));

        let mut decoder = MultipartDecoder::new(BOUNDARY, 16);
        decoder.push(&input);

        assert_eq!(
            drain(&mut decoder),
            vec![
                DecodeEvent::Skipped(MultipartError::SectionTooLarge(64)),
                DecodeEvent::Frame(Bytes::from_static(b"small")),
            ]
        );
    }

    #[test]
    fn test_close_delimiter_and_similar_tokens_are_ignored() {
        let mut input = b"--framework\r\n--frame--\r\n".to_vec();
        input.extend(section(b"ok"));

        let mut decoder = MultipartDecoder::new(BOUNDARY, MAX);
        decoder.push(&input);

        assert_eq!(
            drain(&mut decoder),
            vec![DecodeEvent::Frame(Bytes::from_static(b"ok"))]
        );
    }

    #[test]
    fn test_bare_lf_framing_is_accepted() {
        let input = b"--frame\nContent-Type: image/jpeg\nContent-Length: 4\n\nABCD\n--frame\nContent-Type: image/jpeg\n\nEF\n--frame\n";

        let mut decoder = MultipartDecoder::new(BOUNDARY, MAX);
        let mut events = Vec::new();
        for chunk in input.chunks(3) {
            decoder.push(chunk);
            events.extend(drain(&mut decoder));
        }

        assert_eq!(
            events,
            vec![
                DecodeEvent::Frame(Bytes::from_static(b"ABCD")),
                DecodeEvent::Frame(Bytes::from_static(b"EF")),
            ]
        );
    }

    #[test]
    fn test_preamble_is_not_buffered_forever() {
        let mut decoder = MultipartDecoder::new(BOUNDARY, MAX);
        decoder.push(&[b'x'; 4096]);
        assert!(decoder.next_event().is_none());
        assert!(decoder.buffered() < BOUNDARY.len() + 2);
    }
}

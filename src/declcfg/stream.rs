//! Incremental decoding of a concatenated JSON record stream

use super::DeclarativeRecord;
use crate::error::{CatalogError, CatalogResult};
use serde::de::Error as _;
use serde_json::value::RawValue;

/// Push-based decoder for a stream of concatenated JSON objects.
///
/// Feed chunks as they arrive; each call yields the records completed so
/// far, in arrival order. Only the unparsed tail of the stream is buffered,
/// and each byte is scanned once no matter how the stream is chunked.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
    /// Prefix of `pending` already scanned for record boundaries
    scanned: usize,
    /// Bytes of the stream already decoded and dropped
    consumed: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every record it completes
    pub fn push(&mut self, chunk: &[u8]) -> CatalogResult<Vec<DeclarativeRecord>> {
        self.pending.extend_from_slice(chunk);
        self.drain()
    }

    /// Signal end of stream; fails if a partial record is left over
    pub fn finish(mut self) -> CatalogResult<Vec<DeclarativeRecord>> {
        let records = self.drain()?;
        if !self.pending.is_empty() {
            return Err(CatalogError::MalformedStream {
                offset: self.consumed,
                source: serde_json::Error::custom("stream ended inside a record"),
            });
        }
        Ok(records)
    }

    /// Decode a complete in-memory stream
    pub fn decode_all(bytes: &[u8]) -> CatalogResult<Vec<DeclarativeRecord>> {
        let mut decoder = Self::new();
        let mut records = decoder.push(bytes)?;
        records.extend(decoder.finish()?);
        Ok(records)
    }

    /// Scan the unscanned bytes, decoding each top-level object as soon as
    /// its closing brace arrives. `pending` always starts at a record
    /// boundary or inside the record being assembled.
    fn drain(&mut self) -> CatalogResult<Vec<DeclarativeRecord>> {
        let mut records = Vec::new();
        let mut start = 0;

        for i in self.scanned..self.pending.len() {
            let b = self.pending[i];
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match b {
                b'"' if self.depth > 0 => self.in_string = true,
                b'{' => self.depth += 1,
                b'[' if self.depth > 0 => self.depth += 1,
                b'}' | b']' if self.depth > 0 => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        records.push(self.decode(start, i + 1)?);
                        start = i + 1;
                    }
                }
                b' ' | b'\t' | b'\n' | b'\r' => {
                    if self.depth == 0 {
                        start = i + 1;
                    }
                }
                _ if self.depth == 0 => {
                    return Err(CatalogError::MalformedStream {
                        offset: self.consumed + i,
                        source: serde_json::Error::custom(format!(
                            "expected a JSON object, found {:?}",
                            char::from(b)
                        )),
                    })
                }
                _ => {}
            }
        }

        self.pending.drain(..start);
        self.scanned = self.pending.len();
        self.consumed += start;
        Ok(records)
    }

    /// Validate and decode `pending[start..end]`, one complete object
    fn decode(&self, start: usize, end: usize) -> CatalogResult<DeclarativeRecord> {
        let bytes = &self.pending[start..end];
        let raw: &RawValue =
            serde_json::from_slice(bytes).map_err(|e| CatalogError::MalformedStream {
                offset: self.consumed + start,
                source: e,
            })?;
        DeclarativeRecord::from_slice(raw.get().as_bytes())
    }
}

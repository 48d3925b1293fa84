//! Binary `.map` and text `.hmap` codecs for [`GridGraph`].
//!
//! The binary format exists so a graph can be reloaded without re-deriving it
//! from the source image. Layout: a 12-byte header (`MAP`, big-endian i32
//! width, a space byte, big-endian i32 height) followed by one record per
//! vertex with at least one neighbor, in increasing index order:
//!
//! ```text
//! |index+1|neighbor+1|weight|neighbor+1|weight|...|0|
//! ```
//!
//! Indices are shifted by +1 on the wire so that a plain zero word can
//! terminate a record; decoders undo the shift.

use std::io::{BufRead, Write};

use crate::error::{Error, Result};
use crate::grid::{GridGraph, Vertex};

const HEADER_LEN: usize = 12;

/// The three source schemes a map file can carry, told apart by the leading
/// signature bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MapFormat {
    /// A bitmap image (`BM`), decoded by the image collaborator and run
    /// through the color filter.
    Bitmap,
    /// The line-oriented text map (`HM `).
    TextMap,
    /// The compact binary map (`MAP`).
    BinaryMap,
}

impl MapFormat {
    /// Recognize the scheme from the first bytes of a stream.
    pub fn sniff(header: &[u8]) -> Result<MapFormat> {
        if header.len() >= 2 && &header[..2] == b"BM" {
            return Ok(MapFormat::Bitmap);
        }
        if header.len() >= 3 {
            match &header[..3] {
                b"HM " => return Ok(MapFormat::TextMap),
                b"MAP" => return Ok(MapFormat::BinaryMap),
                _ => {}
            }
        }
        Err(Error::InvalidFormat(
            "leading bytes match none of the known signatures (BM, 'HM ', MAP)".into(),
        ))
    }
}

/// Serialize a graph into the binary map format.
///
/// Vertices are emitted in increasing index order; positions without a vertex
/// and vertices without neighbors produce no record.
pub fn encode_map<W: Write>(graph: &GridGraph, mut out: W) -> Result<()> {
    out.write_all(b"MAP")?;
    out.write_all(&(graph.width() as i32).to_be_bytes())?;
    out.write_all(&[b' '])?;
    out.write_all(&(graph.height() as i32).to_be_bytes())?;

    for (index, vertex) in graph.vertices() {
        if vertex.neighbors.is_empty() {
            continue;
        }
        out.write_all(&(index as i32 + 1).to_be_bytes())?;
        for (&neighbor, &weight) in vertex.neighbors.iter().zip(&vertex.weights) {
            out.write_all(&(neighbor as i32 + 1).to_be_bytes())?;
            out.write_all(&weight.to_be_bytes())?;
        }
        out.write_all(&0i32.to_be_bytes())?;
    }

    out.flush()?;
    Ok(())
}

/// Incremental decoder for the binary map format.
///
/// Feed the stream in chunks of any size; a chunk boundary may fall inside a
/// 4-byte word, between a neighbor and its weight, or before a record's
/// terminator, and the next `feed` picks up exactly where the previous one
/// stopped. The resumption state is the partial word, the vertex currently
/// being filled and whether its last neighbor still awaits a weight.
#[derive(Debug)]
pub struct MapDecoder {
    header: [u8; HEADER_LEN],
    header_len: usize,
    geometry: Option<(usize, usize)>,
    vertices: Vec<Option<Vertex>>,
    word: [u8; 4],
    word_len: usize,
    /// Index of the vertex whose record is being read, if any.
    current: Option<usize>,
    /// The last appended neighbor has no weight yet.
    awaiting_weight: bool,
}

impl MapDecoder {
    pub fn new() -> Self {
        Self {
            header: [0; HEADER_LEN],
            header_len: 0,
            geometry: None,
            vertices: Vec::new(),
            word: [0; 4],
            word_len: 0,
            current: None,
            awaiting_weight: false,
        }
    }

    /// Consume the next chunk of the stream.
    pub fn feed(&mut self, mut chunk: &[u8]) -> Result<()> {
        if self.geometry.is_none() {
            let take = (HEADER_LEN - self.header_len).min(chunk.len());
            self.header[self.header_len..self.header_len + take].copy_from_slice(&chunk[..take]);
            self.header_len += take;
            chunk = &chunk[take..];
            if self.header_len < HEADER_LEN {
                return Ok(());
            }
            self.parse_header()?;
        }

        while !chunk.is_empty() {
            if self.word_len == 0 && chunk.len() >= 4 {
                let word = [chunk[0], chunk[1], chunk[2], chunk[3]];
                chunk = &chunk[4..];
                self.consume_word(word)?;
            } else {
                let take = (4 - self.word_len).min(chunk.len());
                self.word[self.word_len..self.word_len + take].copy_from_slice(&chunk[..take]);
                self.word_len += take;
                chunk = &chunk[take..];
                if self.word_len == 4 {
                    self.word_len = 0;
                    let word = self.word;
                    self.consume_word(word)?;
                }
            }
        }
        Ok(())
    }

    fn parse_header(&mut self) -> Result<()> {
        match MapFormat::sniff(&self.header)? {
            MapFormat::BinaryMap => {}
            other => {
                return Err(Error::InvalidFormat(format!(
                    "expected a binary map stream, found a {:?} signature",
                    other
                )))
            }
        }

        let h = &self.header;
        let width = i32::from_be_bytes([h[3], h[4], h[5], h[6]]);
        if h[7] != b' ' {
            return Err(Error::InvalidFormat(
                "header is missing the space byte between width and height".into(),
            ));
        }
        let height = i32::from_be_bytes([h[8], h[9], h[10], h[11]]);
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidFormat(format!(
                "map dimensions must be positive, got {}x{}",
                width, height
            )));
        }

        let (width, height) = (width as usize, height as usize);
        self.vertices = vec![None; width * height];
        self.geometry = Some((width, height));
        Ok(())
    }

    fn consume_word(&mut self, word: [u8; 4]) -> Result<()> {
        match self.current {
            // between records: the word opens the next vertex
            None => {
                let raw = i32::from_be_bytes(word);
                if raw <= 0 {
                    return Err(Error::InvalidFormat(format!(
                        "vertex index word must be positive, got {}",
                        raw
                    )));
                }
                let index = (raw - 1) as usize;
                if index >= self.vertices.len() {
                    return Err(Error::InvalidFormat(format!(
                        "vertex index {} exceeds the {}-position grid",
                        index,
                        self.vertices.len()
                    )));
                }
                // a repeated index replaces the earlier record
                self.vertices[index] = Some(Vertex::empty());
                self.current = Some(index);
            }

            // inside a record, expecting a neighbor index or the terminator
            Some(index) if !self.awaiting_weight => {
                let raw = i32::from_be_bytes(word);
                if raw == 0 {
                    self.current = None;
                } else if raw < 0 || (raw - 1) as usize >= self.vertices.len() {
                    return Err(Error::InvalidFormat(format!(
                        "neighbor word {} is out of range for the {}-position grid",
                        raw,
                        self.vertices.len()
                    )));
                } else if let Some(vertex) = &mut self.vertices[index] {
                    vertex.neighbors.push((raw - 1) as usize);
                    self.awaiting_weight = true;
                }
            }

            // the previous word was a neighbor; this one is its weight
            Some(index) => {
                if let Some(vertex) = &mut self.vertices[index] {
                    vertex.weights.push(f32::from_be_bytes(word));
                }
                self.awaiting_weight = false;
            }
        }
        Ok(())
    }

    /// True once the stream stopped on a record boundary.
    pub fn is_complete(&self) -> bool {
        self.geometry.is_some() && self.word_len == 0 && self.current.is_none()
    }

    /// Finish decoding, failing with [`Error::Truncated`] when the stream
    /// stopped mid-record.
    pub fn finish(self) -> Result<GridGraph> {
        if !self.is_complete() {
            return Err(Error::Truncated);
        }
        Ok(self.into_graph())
    }

    /// Finish decoding, keeping every fully decoded record and dropping a
    /// record the stream stopped in the middle of. Fails only when not even
    /// the header arrived in full.
    pub fn finish_partial(mut self) -> Result<GridGraph> {
        if self.geometry.is_none() {
            return Err(Error::Truncated);
        }
        if let Some(index) = self.current.take() {
            self.vertices[index] = None;
        }
        Ok(self.into_graph())
    }

    fn into_graph(self) -> GridGraph {
        let (width, height) = self.geometry.unwrap_or((0, 0));
        let graph = GridGraph::from_parts(width, height, self.vertices);
        log::debug!(
            "decoded {}x{} binary map with {} vertices",
            width,
            height,
            graph.vertex_count()
        );
        graph
    }
}

impl Default for MapDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a binary map held in one contiguous buffer.
pub fn decode_map(bytes: &[u8]) -> Result<GridGraph> {
    let mut decoder = MapDecoder::new();
    decoder.feed(bytes)?;
    decoder.finish()
}

/// Serialize a graph into the human-readable text map format: a `HM <width>
/// <height>` header line, then one line per vertex ending in the literal
/// token `n`. Indices are written as-is, without the binary format's offset.
pub fn encode_hmap<W: Write>(graph: &GridGraph, mut out: W) -> Result<()> {
    writeln!(out, "HM {} {}", graph.width(), graph.height())?;

    for (index, vertex) in graph.vertices() {
        if vertex.neighbors.is_empty() {
            continue;
        }
        write!(out, "{}", index)?;
        for (&neighbor, &weight) in vertex.neighbors.iter().zip(&vertex.weights) {
            write!(out, " {} {}", neighbor, weight)?;
        }
        writeln!(out, " n")?;
    }

    out.flush()?;
    Ok(())
}

/// Decode the text map format.
pub fn decode_hmap<R: BufRead>(input: R) -> Result<GridGraph> {
    let mut lines = input.lines();

    let header = lines
        .next()
        .ok_or_else(|| Error::InvalidFormat("text map is empty".into()))??;
    let mut tokens = header.split_whitespace();
    if tokens.next() != Some("HM") {
        return Err(Error::InvalidFormat(
            "text map must start with an 'HM <width> <height>' line".into(),
        ));
    }
    let width: usize = parse_token(tokens.next(), "width", 0)?;
    let height: usize = parse_token(tokens.next(), "height", 0)?;
    if width == 0 || height == 0 {
        return Err(Error::InvalidFormat(format!(
            "map dimensions must be positive, got {}x{}",
            width, height
        )));
    }

    let size = width * height;
    let mut vertices: Vec<Option<Vertex>> = vec![None; size];

    for (row, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let lineno = row + 2;

        let mut tokens = line.split_whitespace();
        let index: usize = parse_token(tokens.next(), "vertex index", lineno)?;
        if index >= size {
            return Err(Error::InvalidFormat(format!(
                "line {}: vertex index {} exceeds the {}-position grid",
                lineno, index, size
            )));
        }

        let mut vertex = Vertex::empty();
        loop {
            match tokens.next() {
                Some("n") => break,
                Some(token) => {
                    let neighbor: usize = token.parse().map_err(|_| {
                        Error::InvalidFormat(format!(
                            "line {}: expected a neighbor index or 'n', got '{}'",
                            lineno, token
                        ))
                    })?;
                    if neighbor >= size {
                        return Err(Error::InvalidFormat(format!(
                            "line {}: neighbor index {} exceeds the {}-position grid",
                            lineno, neighbor, size
                        )));
                    }
                    let weight: f32 = parse_token(tokens.next(), "weight", lineno)?;
                    vertex.neighbors.push(neighbor);
                    vertex.weights.push(weight);
                }
                None => {
                    return Err(Error::InvalidFormat(format!(
                        "line {}: missing the terminating 'n' token",
                        lineno
                    )))
                }
            }
        }

        if !vertex.neighbors.is_empty() {
            vertices[index] = Some(vertex);
        }
    }

    Ok(GridGraph::from_parts(width, height, vertices))
}

fn parse_token<T: std::str::FromStr>(
    token: Option<&str>,
    what: &str,
    lineno: usize,
) -> Result<T> {
    let token = token.ok_or_else(|| {
        Error::InvalidFormat(if lineno == 0 {
            format!("text map header is missing the {}", what)
        } else {
            format!("line {}: missing {}", lineno, what)
        })
    })?;
    token.parse().map_err(|_| {
        Error::InvalidFormat(if lineno == 0 {
            format!("text map header holds an invalid {}: '{}'", what, token)
        } else {
            format!("line {}: invalid {}: '{}'", lineno, what, token)
        })
    })
}

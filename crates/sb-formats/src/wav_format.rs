//! WAV encoding and decoding for 16-bit mono PCM.

use std::borrow::Cow;
use std::io::{Cursor, Seek, Write};

use binrw::{BinRead, BinResult, BinWrite};

use crate::FormatError;

const RIFF_ID: [u8; 4] = *b"RIFF";
const WAVE_ID: [u8; 4] = *b"WAVE";
const FMT_ID: [u8; 4] = *b"fmt ";
const DATA_ID: [u8; 4] = *b"data";

/// Size of the RIFF group header.
const RIFF_HEADER_LEN: usize = 12;
/// Size of a sub-block header.
const CHUNK_HEADER_LEN: usize = 8;
/// Size of a plain PCM `fmt ` body.
const FMT_BODY_LEN: u32 = 16;

const PCM_FORMAT: u16 = 1;

#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
struct RiffHeader {
    id: [u8; 4],
    size: u32,
    form: [u8; 4],
}

#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
struct ChunkHeader {
    id: [u8; 4],
    size: u32,
}

#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
struct FmtChunk {
    audio_format: u16,
    channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
}

impl FmtChunk {
    fn pcm16_mono(sample_rate: u32) -> Self {
        Self {
            audio_format: PCM_FORMAT,
            channels: 1,
            sample_rate,
            byte_rate: sample_rate.wrapping_mul(2),
            block_align: 2,
            bits_per_sample: 16,
        }
    }
}

// --- Writing ---

/// Write raw little-endian PCM16 mono bytes as a WAV container.
pub fn write_wav<W: Write + Seek>(w: &mut W, pcm: &[u8], sample_rate: u32) -> BinResult<()> {
    let data_size = pcm.len() as u32;

    RiffHeader { id: RIFF_ID, size: 36 + data_size, form: WAVE_ID }.write(w)?;
    ChunkHeader { id: FMT_ID, size: FMT_BODY_LEN }.write(w)?;
    FmtChunk::pcm16_mono(sample_rate).write(w)?;
    ChunkHeader { id: DATA_ID, size: data_size }.write(w)?;
    w.write_all(pcm)?;
    Ok(())
}

/// Wrap raw PCM16 mono bytes in a WAV container.
pub fn wrap_pcm16(pcm: &[u8], sample_rate: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::with_capacity(RIFF_HEADER_LEN + 32 + pcm.len()));
    write_wav(&mut buf, pcm, sample_rate).expect("Vec<u8> write cannot fail");
    buf.into_inner()
}

/// Encode PCM16 samples as a mono WAV container.
pub fn samples_to_wav(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    wrap_pcm16(&pcm, sample_rate)
}

// --- Reading ---

/// Format fields and payload of a decoded container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedWav {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Raw payload of the `data` sub-block.
    pub pcm: Vec<u8>,
}

impl DecodedWav {
    /// Interpret the payload as little-endian PCM16. A trailing odd byte is dropped.
    pub fn samples(&self) -> Vec<i16> {
        self.pcm
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pcm.len() < 2
    }
}

/// Decode a WAV container.
///
/// Sub-blocks may appear in any order; unknown ones are skipped by their
/// declared length. Only a missing `RIFF`/`WAVE` header is fatal: without a
/// `fmt ` block the defaults (44100 Hz, mono, 16-bit) stand, without a
/// `data` block the payload is empty, and an overlong `data` block is cut
/// at the end of the input.
pub fn unwrap_wav(data: &[u8]) -> Result<DecodedWav, FormatError> {
    if data.len() < RIFF_HEADER_LEN {
        return Err(FormatError::UnexpectedEof);
    }
    let mut reader = Cursor::new(data);
    let riff = RiffHeader::read(&mut reader)?;
    if riff.id != RIFF_ID || riff.form != WAVE_ID {
        return Err(FormatError::InvalidHeader);
    }

    let mut decoded = DecodedWav {
        sample_rate: 44_100,
        channels: 1,
        bits_per_sample: 16,
        pcm: Vec::new(),
    };

    let mut pos = RIFF_HEADER_LEN;
    while pos + CHUNK_HEADER_LEN <= data.len() {
        reader.set_position(pos as u64);
        let chunk = ChunkHeader::read(&mut reader)?;
        let body = pos + CHUNK_HEADER_LEN;
        let size = chunk.size as usize;

        if chunk.id == FMT_ID && chunk.size >= FMT_BODY_LEN && body + FMT_BODY_LEN as usize <= data.len() {
            let fmt = FmtChunk::read(&mut reader)?;
            decoded.sample_rate = fmt.sample_rate;
            decoded.channels = fmt.channels;
            decoded.bits_per_sample = fmt.bits_per_sample;
        } else if chunk.id == DATA_ID {
            let end = body.saturating_add(size).min(data.len());
            decoded.pcm = data[body..end].to_vec();
        }

        pos = body.saturating_add(size);
        if size % 2 != 0 {
            pos = pos.saturating_add(1);
        }
    }

    Ok(decoded)
}

/// Re-step a container's samples by `ratio` with nearest-neighbour stepping.
///
/// The result holds `len * ratio` samples at the input sample rate, so
/// pitch and duration change together. Input that does not decode, or
/// carries no samples, comes back unchanged.
pub fn resample_wav(data: &[u8], ratio: f64) -> Cow<'_, [u8]> {
    let decoded = match unwrap_wav(data) {
        Ok(decoded) => decoded,
        Err(e) => {
            log::debug!("resample_wav: passing through undecodable buffer: {}", e);
            return Cow::Borrowed(data);
        }
    };
    if decoded.is_empty() {
        return Cow::Borrowed(data);
    }

    let stepped = sb_engine::resample_nearest(&decoded.samples(), ratio);
    Cow::Owned(samples_to_wav(&stepped, decoded.sample_rate))
}

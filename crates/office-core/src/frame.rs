//! Packet framing for the broker byte stream
//!
//! TCP hands over bytes in arbitrary chunks. [`PacketFramer`] collects them
//! into whole MQTT control packets, so the client always decodes exactly one
//! packet per read. A packet too large for the buffer is skipped byte by byte
//! and the stream stays in step with the next packet.

use core::fmt;

/// One type byte plus at most four remaining-length bytes
const MAX_HEADER_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Remaining length did not end within four bytes
    MalformedLength,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::MalformedLength => write!(f, "Malformed remaining length"),
        }
    }
}

pub struct PacketFramer<const N: usize> {
    buf: [u8; N],
    /// Bytes of the current packet collected so far
    len: usize,
    /// Size of the current packet, known once its fixed header is complete
    total: Option<usize>,
    /// Bytes of an oversized packet still to drop
    skip: usize,
}

impl<const N: usize> PacketFramer<N> {
    pub const fn new() -> Self {
        const { assert!(N >= MAX_HEADER_LEN, "framer buffer must hold a fixed header") };
        Self {
            buf: [0; N],
            len: 0,
            total: None,
            skip: 0,
        }
    }

    /// Forget any partial packet, e.g. when the link is reopened
    pub fn reset(&mut self) {
        self.len = 0;
        self.total = None;
        self.skip = 0;
    }

    /// `true` when a whole packet is waiting in [`take`](Self::take)
    pub fn is_ready(&self) -> bool {
        self.total == Some(self.len)
    }

    /// Consume bytes from `input`, stopping at the end of a packet.
    ///
    /// Returns how many bytes were used. Bytes after a completed packet are
    /// left for the next call, which only makes progress once the packet is
    /// taken.
    pub fn feed(&mut self, input: &[u8]) -> Result<usize, FrameError> {
        let mut used = 0;
        while used < input.len() && !self.is_ready() {
            let rest = &input[used..];
            if self.skip > 0 {
                let n = self.skip.min(rest.len());
                self.skip -= n;
                used += n;
                continue;
            }

            let Some(total) = self.total else {
                self.buf[self.len] = rest[0];
                self.len += 1;
                used += 1;
                self.total = self.header_total()?;
                if let Some(total) = self.total.filter(|&total| total > N) {
                    log::warn!("mqtt: dropping {} byte packet", total);
                    self.skip = total - self.len;
                    self.len = 0;
                    self.total = None;
                }
                continue;
            };

            let n = (total - self.len).min(rest.len());
            self.buf[self.len..self.len + n].copy_from_slice(&rest[..n]);
            self.len += n;
            used += n;
        }
        Ok(used)
    }

    /// Hand out the completed packet and start collecting the next one
    pub fn take(&mut self) -> Option<&[u8]> {
        if !self.is_ready() {
            return None;
        }
        let len = self.len;
        self.len = 0;
        self.total = None;
        Some(&self.buf[..len])
    }

    fn header_total(&self) -> Result<Option<usize>, FrameError> {
        if self.len < 2 {
            return Ok(None);
        }
        if self.buf[self.len - 1] & 0x80 != 0 {
            if self.len == MAX_HEADER_LEN {
                return Err(FrameError::MalformedLength);
            }
            return Ok(None);
        }
        let remaining = self.buf[1..self.len]
            .iter()
            .enumerate()
            .fold(0, |acc, (i, byte)| acc | usize::from(byte & 0x7F) << (7 * i));
        Ok(Some(self.len + remaining))
    }
}

impl<const N: usize> Default for PacketFramer<N> {
    fn default() -> Self {
        Self::new()
    }
}

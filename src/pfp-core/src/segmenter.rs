//! Content-defined phrase segmentation shared by the reference parse (C4) and the sample
//! parser (C5): slide a [`RollingHash`](crate::rolling_hash::RollingHash) across a byte stream
//! and cut a new phrase every time the trailing `W` bytes hash to a multiple of the trigger
//! modulus `p` (SPEC_FULL.md §3, §4.5).

use crate::rolling_hash::RollingHash;

/// Feeds bytes one at a time and reports phrase boundaries. A phrase is "closed" either by a
/// natural trigger ([`Segmenter::push_byte`] returning `Some`) or by a caller-requested
/// [`Segmenter::force_cut`] (contig/sample boundaries, end of stream).
pub struct Segmenter {
    w: usize,
    p: u64,
    hash: RollingHash,
    phrase: Vec<u8>,
    hash_initialized: bool,
}

impl Segmenter {
    #[must_use]
    pub fn new(w: usize, p: u64) -> Self {
        Self { w, p, hash: RollingHash::new(w), phrase: Vec::new(), hash_initialized: false }
    }

    #[must_use]
    pub fn window(&self) -> usize {
        self.w
    }

    /// Bytes accumulated since the last cut.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.phrase
    }

    /// Feeds one byte. Returns the closed phrase's bytes if this byte completed a trigger
    /// string (the next phrase begins already primed with the `W`-byte overlap).
    pub fn push_byte(&mut self, byte: u8) -> Option<Vec<u8>> {
        self.phrase.push(byte);
        if self.phrase.len() < self.w {
            return None;
        }
        if self.hash_initialized {
            let out_index = self.phrase.len() - 1 - self.w;
            self.hash.update(self.phrase[out_index], byte);
        } else {
            let start = self.phrase.len() - self.w;
            self.hash.initialize(&self.phrase[start..]);
            self.hash_initialized = true;
        }
        self.hash.is_trigger(self.p).then(|| self.cut())
    }

    fn cut(&mut self) -> Vec<u8> {
        let trigger_start = self.phrase.len() - self.w;
        let closed = std::mem::take(&mut self.phrase);
        self.phrase = closed[trigger_start..].to_vec();
        closed
    }

    /// Closes whatever has accumulated, regardless of whether it currently forms a trigger
    /// string. Used at contig/sample boundaries and at end of stream. Returns `None` if
    /// nothing has accumulated since the last cut.
    pub fn force_cut(&mut self) -> Option<Vec<u8>> {
        if self.phrase.is_empty() {
            return None;
        }
        self.hash_initialized = false;
        Some(std::mem::take(&mut self.phrase))
    }

    /// Discards whatever has accumulated since the last cut without returning it. Used when a
    /// caller has independently accounted for those bytes (sample-parser acceleration copies
    /// reference phrase ids directly instead of replaying them through the segmenter).
    pub fn reset(&mut self) {
        self.phrase.clear();
        self.hash_initialized = false;
    }
}

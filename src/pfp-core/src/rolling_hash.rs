//! Karp–Rabin rolling hash (C1): a fixed-window polynomial hash with O(1) slide.
//!
//! `H(s) = sum_i s[i] * C^(W-1-i) mod P`, computed left-to-right by Horner's method. `P` is
//! the fixed internal modulus `2^31 - 1`; it bounds the arithmetic and is never user-tunable.
//! Whether a window is a *trigger string* is a separate question answered by the caller
//! (C4/C5) reducing [`RollingHash::get_hash`] modulo a small, user-configured trigger modulus
//! `p` — see SPEC_FULL.md §3 for why these two moduli must never be conflated.

/// Default multiplier, matching the reference implementation's byte-alphabet hash.
pub const DEFAULT_C: u64 = 256;
/// Fixed internal modulus. A Mersenne prime chosen so partial products stay within 64 bits
/// during the multiply-then-reduce steps below.
pub const DEFAULT_P: u64 = (1u64 << 31) - 1;

#[derive(Debug, Clone)]
pub struct RollingHash {
    c: u64,
    p: u64,
    window: usize,
    /// `C^window mod P`, precomputed once so `update` is O(1).
    c_pow_window: u64,
    hash: u64,
}

impl RollingHash {
    /// Builds a hash over windows of `window` bytes, using the default `C` and `P`.
    ///
    /// # Panics
    /// If `window` is zero.
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self::with_params(window, DEFAULT_C, DEFAULT_P)
    }

    /// As [`Self::new`], but with an explicit multiplier/modulus. Exposed for testing and for
    /// advanced callers; production code should stick to the defaults.
    ///
    /// # Panics
    /// If `window` is zero.
    #[must_use]
    pub fn with_params(window: usize, c: u64, p: u64) -> Self {
        assert!(window > 0, "rolling hash window must be non-zero");
        let c_pow_window = mod_pow(c, window as u64, p);
        Self { c, p, window, c_pow_window, hash: 0 }
    }

    #[must_use]
    pub fn window(&self) -> usize {
        self.window
    }

    /// Computes the hash of `window_bytes` from scratch (O(W)) and adopts it as the current
    /// state.
    ///
    /// # Panics
    /// If `window_bytes.len() != self.window()`.
    pub fn initialize(&mut self, window_bytes: &[u8]) {
        assert_eq!(window_bytes.len(), self.window, "initialize() requires exactly W bytes");
        self.hash = Self::string_hash_with_params(window_bytes, self.c, self.p);
    }

    /// Slides the window forward by one byte: drops `out_byte`, appends `in_byte`. O(1).
    pub fn update(&mut self, out_byte: u8, in_byte: u8) {
        let out = u64::from(out_byte) % self.p;
        let in_ = u64::from(in_byte) % self.p;
        let shifted = mul_mod(self.hash, self.c, self.p);
        let dropped = mul_mod(out, self.c_pow_window, self.p);
        // mod_add/mod_sub keep every intermediate within [0, P) to avoid relying on wrapping
        // semantics for the subtraction.
        self.hash = mod_add(mod_sub(shifted, dropped, self.p), in_, self.p);
    }

    #[must_use]
    pub fn get_hash(&self) -> u64 {
        self.hash
    }

    /// True iff the current window is a trigger string under modulus `trigger_modulus`.
    #[must_use]
    pub fn is_trigger(&self, trigger_modulus: u64) -> bool {
        self.hash % trigger_modulus == 0
    }

    /// One-shot hash of an arbitrary-length byte string using this instance's `C`/`P`.
    #[must_use]
    pub fn string_hash(&self, bytes: &[u8]) -> u64 {
        Self::string_hash_with_params(bytes, self.c, self.p)
    }

    fn string_hash_with_params(bytes: &[u8], c: u64, p: u64) -> u64 {
        bytes.iter().fold(0u64, |h, &b| mod_add(mul_mod(h, c, p), u64::from(b) % p, p))
    }
}

fn mod_add(a: u64, b: u64, p: u64) -> u64 {
    (a + b) % p
}

fn mod_sub(a: u64, b: u64, p: u64) -> u64 {
    (a + p - (b % p)) % p
}

fn mul_mod(a: u64, b: u64, p: u64) -> u64 {
    (u128::from(a) * u128::from(b) % u128::from(p)) as u64
}

fn mod_pow(mut base: u64, mut exp: u64, p: u64) -> u64 {
    let mut result = 1u64 % p;
    base %= p;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, base, p);
        }
        base = mul_mod(base, base, p);
        exp >>= 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_matches_string_hash() {
        let mut h = RollingHash::new(5);
        h.initialize(b"12345");
        assert_eq!(h.get_hash(), 842_216_599);
        assert_eq!(h.string_hash(b"12345"), h.get_hash());
    }

    #[test]
    fn update_matches_reference_fixtures() {
        let mut h = RollingHash::new(5);
        h.initialize(b"12345");
        h.update(b'1', b'6');
        assert_eq!(h.get_hash(), 859_059_610);
        assert_eq!(h.get_hash(), h.string_hash(b"23456"));
        h.update(b'2', b'7');
        assert_eq!(h.get_hash(), 875_902_621);
        assert_eq!(h.get_hash(), h.string_hash(b"34567"));
    }

    #[test]
    fn periodic_window_is_invariant_under_update() {
        let mut h = RollingHash::new(5);
        h.initialize(b"11111");
        assert_eq!(h.get_hash(), 825_307_539);
        h.update(b'1', b'1');
        assert_eq!(h.get_hash(), 825_307_539);
    }

    #[test]
    fn periodic_window_of_n_bases_is_invariant() {
        let window = vec![b'N'; 20];
        let mut h = RollingHash::new(20);
        h.initialize(&window);
        assert_eq!(h.get_hash(), 2_071_690_116);
        h.update(b'N', b'N');
        assert_eq!(h.get_hash(), 2_071_690_116);
    }

    #[test]
    fn sliding_over_sentinel_bytes_does_not_panic() {
        let mut h = RollingHash::new(4);
        h.initialize(&[0, 1, 2, 3]);
        h.update(0, 4);
        h.update(1, 0);
        // Only requirement here is that arithmetic stays in range; no particular value.
        assert!(h.get_hash() < DEFAULT_P);
    }

    #[test]
    fn is_trigger_checks_small_modulus() {
        let mut h = RollingHash::new(5);
        h.initialize(b"12345");
        let hash = h.get_hash();
        assert_eq!(h.is_trigger(hash), true);
        assert_eq!(h.is_trigger(hash + 1), hash % (hash + 1) == 0);
    }
}

#![forbid(unsafe_code)]
//! QR code encoding functionality.
//!
//! This module holds the whole symbol construction for the single symbol this crate produces:
//! version 6 (41×41 modules) at error correction level Medium, byte mode only. It covers the
//! GF(256) arithmetic and Reed-Solomon parity, payload bit packing, block interleaving, the fixed
//! function patterns, zigzag data placement, the eight masks with their penalty scoring, and the
//! format information.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, trace};
use thiserror::Error;

/*---- Symbol parameters ----*/

/// The only QR Code version produced by this crate.
pub const VERSION: u8 = 6;

/// Width and height of the symbol in modules (version * 4 + 17).
pub const SIZE: usize = VERSION as usize * 4 + 17;

/// Light border around the symbol, in modules.
pub const QUIET_ZONE: usize = 4;

/// Number of Reed-Solomon blocks the data is split into.
pub const NUM_BLOCKS: usize = 4;

/// Data codewords in each block.
pub const DATA_CODEWORDS_PER_BLOCK: usize = 27;

/// Parity codewords appended to each block.
pub const ECC_CODEWORDS_PER_BLOCK: usize = 16;

/// Data codewords in the whole symbol.
pub const DATA_CODEWORDS: usize = NUM_BLOCKS * DATA_CODEWORDS_PER_BLOCK;

/// Data plus parity codewords in the whole symbol.
pub const TOTAL_CODEWORDS: usize = DATA_CODEWORDS + NUM_BLOCKS * ECC_CODEWORDS_PER_BLOCK;

/// Number of bits the packed payload is padded to.
pub const DATA_CAPACITY_BITS: usize = DATA_CODEWORDS * 8;

const MODE_INDICATOR_BITS: u8 = 4;
const BYTE_MODE: u32 = 0b0100;
const CHAR_COUNT_BITS: u8 = 8;

/// Largest payload, in bytes, that fits behind the mode and count header.
pub const MAX_PAYLOAD_LEN: usize =
    (DATA_CAPACITY_BITS - MODE_INDICATOR_BITS as usize - CHAR_COUNT_BITS as usize) / 8;

const PAD_BYTES: [u8; 2] = [0xec, 0x11];

const ALIGNMENT_PATTERN_POSITIONS: [usize; 2] = [6, SIZE - 7];

// Level M is encoded as 00 in the format information.
const ECL_FORMAT_BITS: u32 = 0b00;
const FORMAT_GENERATOR: u32 = 0b101_0011_0111;
const FORMAT_XOR_MASK: u32 = 0b101_0100_0001_0010;

/// (row, col) of format bits 0 to 14 around the top-left finder.
const FORMAT_COORDS_TOP_LEFT: [(usize, usize); 15] = [
    (0, 8),
    (1, 8),
    (2, 8),
    (3, 8),
    (4, 8),
    (5, 8),
    (7, 8),
    (8, 8),
    (8, 7),
    (8, 5),
    (8, 4),
    (8, 3),
    (8, 2),
    (8, 1),
    (8, 0),
];

/// (row, col) of format bits 0 to 14 split between the top-right and bottom-left finders.
const FORMAT_COORDS_SPLIT: [(usize, usize); 15] = [
    (8, SIZE - 1),
    (8, SIZE - 2),
    (8, SIZE - 3),
    (8, SIZE - 4),
    (8, SIZE - 5),
    (8, SIZE - 6),
    (8, SIZE - 7),
    (8, SIZE - 8),
    (SIZE - 7, 8),
    (SIZE - 6, 8),
    (SIZE - 5, 8),
    (SIZE - 4, 8),
    (SIZE - 3, 8),
    (SIZE - 2, 8),
    (SIZE - 1, 8),
];

const DARK_MODULE: (usize, usize) = (SIZE - 8, 8);

const PENALTY_N1: u32 = 3;
const PENALTY_N2: u32 = 3;
const PENALTY_N3: u32 = 40;
const PENALTY_N4: u32 = 10;

const FINDER_LIKE_PATTERNS: [[bool; 11]; 2] = [
    [true, false, true, true, true, false, true, false, false, false, false],
    [false, false, false, false, true, false, true, true, true, false, true],
];

/*---- Errors ----*/

/// Reasons a payload cannot be turned into a symbol.
///
/// Encoding is pure, so retrying with the same input always fails the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The text to encode was empty.
    #[error("input text must not be empty")]
    Input,
    /// The header and payload need more bits than the symbol holds.
    #[error("data length = {needed_bits} bits, max capacity = {capacity_bits} bits")]
    Capacity {
        needed_bits: usize,
        capacity_bits: usize,
    },
}

/*---- Encoder ----*/

/// Builds QR Code symbols, keeping a memo of Reed-Solomon generator polynomials between calls.
///
/// The memo is the only state an encoder carries and it is a pure function of its key, so one
/// encoder may be shared freely between threads.
///
/// # Example
///
/// ```rust
/// use qrsvg::qrcode::QrEncoder;
///
/// let encoder = QrEncoder::new();
/// let qr = encoder.encode_text("Hello, World!").unwrap();
/// assert_eq!(qr.size(), 41);
/// ```
#[derive(Debug, Default)]
pub struct QrEncoder {
    generators: GeneratorCache,
}

impl QrEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes the UTF-8 bytes of `text` in byte mode.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::Input`] for empty text and [`EncodeError::Capacity`] when the text
    /// is longer than [`MAX_PAYLOAD_LEN`] bytes.
    pub fn encode_text(&self, text: &str) -> Result<QrCode, EncodeError> {
        self.encode_binary(text.as_bytes())
    }

    /// Encodes arbitrary bytes in byte mode.
    pub fn encode_binary(&self, data: &[u8]) -> Result<QrCode, EncodeError> {
        if data.is_empty() {
            return Err(EncodeError::Input);
        }
        let datacodewords = build_data_codewords(data)?;
        let allcodewords = add_ecc_and_interleave(&datacodewords, &self.generators);
        let skeleton = build_skeleton();

        let best = choose_best(
            Mask::ALL
                .iter()
                .map(|&mask| build_candidate(&skeleton, &allcodewords, mask))
        );
        debug!(
            "encoded {} bytes with mask {} (penalty {})",
            data.len(),
            best.mask.value(),
            best.penalty.total()
        );
        Ok(QrCode {
            grid: best.grid,
            mask: best.mask,
            penalty: best.penalty,
        })
    }

    pub fn generators(&self) -> &GeneratorCache {
        &self.generators
    }
}

/// A finished QR Code symbol. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QrCode {
    grid: Grid,
    mask: Mask,
    penalty: Penalty,
}

impl QrCode {
    /// Always [`VERSION`].
    pub fn version(&self) -> u8 {
        VERSION
    }

    /// Returns this QR Code's size in modules.
    pub fn size(&self) -> i32 {
        SIZE as i32
    }

    /// Returns the mask chosen for this QR Code.
    pub fn mask(&self) -> Mask {
        self.mask
    }

    /// Returns the penalty the chosen mask scored.
    pub fn penalty(&self) -> Penalty {
        self.penalty
    }

    /// Returns the color of the module at the given coordinates.
    ///
    /// Returns `true` for dark modules and `false` for light modules. Coordinates outside the QR
    /// code's bounds return `false`, which lets renderers walk the quiet zone directly.
    ///
    /// # Arguments
    ///
    /// * `x` - X-coordinate (0 is left).
    /// * `y` - Y-coordinate (0 is top).
    pub fn get_module(&self, x: i32, y: i32) -> bool {
        let range = 0..self.size();
        range.contains(&x) && range.contains(&y) && self.grid.is_dark(y as usize, x as usize)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }
}

/*---- Galois field ----*/

const PRIMITIVE_POLYNOMIAL: u16 = 0x11d;

struct Gf256 {
    exp: [u8; 512],
    log: [u8; 256],
}

impl Gf256 {
    const fn new() -> Self {
        let mut exp = [0u8; 512];
        let mut log = [0u8; 256];
        let mut x: u16 = 1;
        let mut i = 0;
        while i < 255 {
            exp[i] = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= PRIMITIVE_POLYNOMIAL;
            }
            i += 1;
        }
        while i < 512 {
            exp[i] = exp[i - 255];
            i += 1;
        }
        Self { exp, log }
    }
}

static GF256: Gf256 = Gf256::new();

/// Multiplies two elements of GF(2^8) modulo x^8 + x^4 + x^3 + x^2 + 1.
pub fn gf_multiply(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let log = usize::from(GF256.log[usize::from(a)]) + usize::from(GF256.log[usize::from(b)]);
    GF256.exp[log % 255]
}

/// Returns alpha^i.
pub fn gf_exp(i: usize) -> u8 {
    GF256.exp[i % 255]
}

/*---- Polynomials and Reed-Solomon ----*/

/// Multiplies two polynomials over GF(256), coefficients ordered from the highest power down.
pub fn poly_multiply(a: &[u8], b: &[u8]) -> Vec<u8> {
    assert!(!a.is_empty() && !b.is_empty(), "Empty polynomial");
    let mut result = vec![0u8; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            result[i + j] ^= gf_multiply(x, y);
        }
    }
    result
}

/// Returns the monic generator polynomial (x - a^0)(x - a^1)...(x - a^(degree-1)).
///
/// The result has `degree + 1` coefficients and starts with 1.
pub fn generator_polynomial(degree: usize) -> Vec<u8> {
    (0..degree).fold(vec![1u8], |poly, i| poly_multiply(&poly, &[1, gf_exp(i)]))
}

/// Memo of generator polynomials keyed by degree.
#[derive(Debug, Default)]
pub struct GeneratorCache {
    polys: Mutex<HashMap<usize, Arc<[u8]>>>,
}

impl GeneratorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the generator polynomial of the given degree, computing it on first use.
    pub fn get(&self, degree: usize) -> Arc<[u8]> {
        // Entries are only ever inserted whole, so a poisoned lock still holds valid data.
        let mut polys = self.polys.lock().unwrap_or_else(PoisonError::into_inner);
        polys
            .entry(degree)
            .or_insert_with(|| {
                trace!("building generator polynomial of degree {}", degree);
                generator_polynomial(degree).into()
            })
            .clone()
    }

    /// Number of memoized polynomials.
    pub fn len(&self) -> usize {
        self.polys.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Computes the Reed-Solomon parity of `data` for the given monic generator.
///
/// The returned remainder has `generator.len() - 1` bytes, so that `data` followed by the
/// remainder is divisible by the generator.
pub fn reed_solomon_remainder(data: &[u8], generator: &[u8]) -> Vec<u8> {
    assert!(generator.len() >= 2, "Degree out of range");
    let divisor = &generator[1..];
    let mut result = vec![0u8; divisor.len()];
    for b in data {
        let factor: u8 = b ^ result[0];
        result.copy_within(1.., 0);
        let last = result.len() - 1;
        result[last] = 0;
        if factor != 0 {
            for (x, &y) in result.iter_mut().zip(divisor.iter()) {
                *x ^= gf_multiply(y, factor);
            }
        }
    }
    result
}

/*---- Bit packing ----*/

/// An appendable sequence of bits, packed MSB-first into bytes.
#[derive(Clone, Debug, Default)]
pub struct BitBuffer {
    data: Vec<u8>,
    length: usize,
}

impl BitBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Appends the low `len` bits of `val`, most significant first.
    pub fn append_bits(&mut self, val: u32, len: u8) {
        assert!(len <= 31 && (val >> len) == 0, "Value out of range");
        for i in (0..len).rev() {
            let shift = 7 - (self.length & 7);
            if shift == 7 {
                self.data.push(0);
            }
            let bit = ((val >> i) & 1) as u8;
            if let Some(last) = self.data.last_mut() {
                *last |= bit << shift;
            }
            self.length += 1;
        }
    }

    /// Returns the packed bytes. A trailing partial byte is zero-filled.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Packs the payload into the [`DATA_CODEWORDS`] data codewords.
///
/// Layout: byte mode indicator, 8-bit byte count, the payload, a terminator of up to four zero
/// bits, zero bits up to a byte boundary, then alternating 0xEC/0x11 pad bytes.
///
/// # Errors
///
/// Returns [`EncodeError::Capacity`] if the header and payload exceed [`DATA_CAPACITY_BITS`].
pub fn build_data_codewords(payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let neededbits = payload
        .len()
        .saturating_mul(8)
        .saturating_add(usize::from(MODE_INDICATOR_BITS + CHAR_COUNT_BITS));
    if neededbits > DATA_CAPACITY_BITS {
        return Err(EncodeError::Capacity {
            needed_bits: neededbits,
            capacity_bits: DATA_CAPACITY_BITS,
        });
    }

    let mut bb = BitBuffer::new();
    bb.append_bits(BYTE_MODE, MODE_INDICATOR_BITS);
    // MAX_PAYLOAD_LEN is below 256, so the count fits its field.
    bb.append_bits(payload.len() as u32, CHAR_COUNT_BITS);
    for &b in payload {
        bb.append_bits(b.into(), 8);
    }
    debug_assert_eq!(bb.len(), neededbits);

    // Add terminator and pad up to a byte if applicable
    let numzerobits = (DATA_CAPACITY_BITS - bb.len()).min(4);
    bb.append_bits(0, numzerobits as u8);
    let numzerobits = bb.len().wrapping_neg() & 7;
    bb.append_bits(0, numzerobits as u8);
    debug_assert_eq!(bb.len() % 8, 0);

    // Pad with alternating bytes until data capacity is reached
    for &padbyte in PAD_BYTES.iter().cycle() {
        if bb.len() >= DATA_CAPACITY_BITS {
            break;
        }
        bb.append_bits(padbyte.into(), 8);
    }
    debug_assert_eq!(bb.len(), DATA_CAPACITY_BITS);
    Ok(bb.into_bytes())
}

/// Splits the data codewords into blocks, appends parity per block and interleaves the result.
///
/// Output order is the first data codeword of every block, then the second of every block and so
/// on, followed by the parity codewords in the same column-wise order.
pub fn add_ecc_and_interleave(data: &[u8], generators: &GeneratorCache) -> Vec<u8> {
    assert_eq!(data.len(), DATA_CODEWORDS, "Illegal argument");
    let generator = generators.get(ECC_CODEWORDS_PER_BLOCK);
    let blocks: Vec<&[u8]> = data.chunks(DATA_CODEWORDS_PER_BLOCK).collect();
    let eccs: Vec<Vec<u8>> = blocks
        .iter()
        .map(|block| reed_solomon_remainder(block, &generator))
        .collect();

    let mut result = Vec::with_capacity(TOTAL_CODEWORDS);
    for i in 0..DATA_CODEWORDS_PER_BLOCK {
        result.extend(blocks.iter().map(|block| block[i]));
    }
    for i in 0..ECC_CODEWORDS_PER_BLOCK {
        result.extend(eccs.iter().map(|ecc| ecc[i]));
    }
    debug_assert_eq!(result.len(), TOTAL_CODEWORDS);
    result
}

/*---- Module grid ----*/

/// State of one module while the symbol is being drawn.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Module {
    Unset,
    Light,
    Dark,
}

/// A [`SIZE`]×[`SIZE`] grid of modules, indexed by (row, col).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Grid {
    modules: Vec<Module>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    /// A grid with every module unset.
    pub fn new() -> Self {
        Self {
            modules: vec![Module::Unset; SIZE * SIZE],
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Module {
        self.modules[row * SIZE + col]
    }

    /// Unset modules read as light.
    pub fn is_dark(&self, row: usize, col: usize) -> bool {
        self.get(row, col) == Module::Dark
    }

    pub fn set(&mut self, row: usize, col: usize, isdark: bool) {
        self.modules[row * SIZE + col] = if isdark { Module::Dark } else { Module::Light };
    }

    fn set_if_unset(&mut self, row: usize, col: usize, isdark: bool) {
        if self.get(row, col) == Module::Unset {
            self.set(row, col, isdark);
        }
    }

    fn set_unbounded(&mut self, row: i32, col: i32, isdark: bool) {
        let range = 0..SIZE as i32;
        if range.contains(&row) && range.contains(&col) {
            self.set(row as usize, col as usize, isdark);
        }
    }

    pub fn count_unset(&self) -> usize {
        self.modules.iter().filter(|&&m| m == Module::Unset).count()
    }

    pub fn count_dark(&self) -> usize {
        self.modules.iter().filter(|&&m| m == Module::Dark).count()
    }

    /// Iterates the modules of one row as dark flags.
    pub fn row(&self, row: usize) -> impl Iterator<Item = bool> + '_ {
        (0..SIZE).map(move |col| self.is_dark(row, col))
    }

    /// Iterates the modules of one column as dark flags.
    pub fn column(&self, col: usize) -> impl Iterator<Item = bool> + '_ {
        (0..SIZE).map(move |row| self.is_dark(row, col))
    }

    // Finder with its one-module separator; `top`/`left` is the finder's corner.
    fn draw_finder_pattern(&mut self, top: i32, left: i32) {
        for dy in -1..=7 {
            for dx in -1..=7 {
                let dist: i32 = (dx - 3i32).abs().max((dy - 3i32).abs());
                self.set_unbounded(top + dy, left + dx, dist != 2 && dist != 4);
            }
        }
    }

    fn draw_timing_patterns(&mut self) {
        for i in 0..SIZE {
            self.set_if_unset(6, i, i % 2 == 0);
            self.set_if_unset(i, 6, i % 2 == 0);
        }
    }

    fn draw_alignment_pattern(&mut self, row: usize, col: usize) {
        for dy in -2i32..=2 {
            for dx in -2i32..=2 {
                let dist = dx.abs().max(dy.abs());
                self.set_unbounded(row as i32 + dy, col as i32 + dx, dist != 1);
            }
        }
    }
}

/// Builds the function patterns shared by every candidate.
///
/// Finders with separators sit in three corners, timing patterns run along row and column 6, the
/// alignment pattern goes at every position pair not covered by a finder, the dark module is set
/// and both format strips are reserved as light. Everything else stays unset for data.
pub fn build_skeleton() -> Grid {
    let mut grid = Grid::new();
    let far = (SIZE - 7) as i32;
    grid.draw_finder_pattern(0, 0);
    grid.draw_finder_pattern(far, 0);
    grid.draw_finder_pattern(0, far);
    grid.draw_timing_patterns();

    let overlaps_finder = |row: usize, col: usize| {
        (row <= 8 && col <= 8) || (row <= 8 && col >= SIZE - 8) || (row >= SIZE - 8 && col <= 8)
    };
    for &row in &ALIGNMENT_PATTERN_POSITIONS {
        for &col in &ALIGNMENT_PATTERN_POSITIONS {
            if !overlaps_finder(row, col) {
                grid.draw_alignment_pattern(row, col);
            }
        }
    }

    grid.set(DARK_MODULE.0, DARK_MODULE.1, true);
    for &(row, col) in FORMAT_COORDS_TOP_LEFT.iter().chain(FORMAT_COORDS_SPLIT.iter()) {
        grid.set_if_unset(row, col, false);
    }
    grid
}

/*---- Data placement ----*/

/// The placement order of data modules: two-column strips from the right edge leftwards,
/// skipping the vertical timing column, alternating upward and downward sweeps.
///
/// Yields `(row, col)` for every module outside column 6, function modules included; callers
/// skip the ones already set.
#[derive(Clone, Debug)]
pub struct Zigzag {
    right: i32,
    step: usize,
    upward: bool,
}

impl Default for Zigzag {
    fn default() -> Self {
        Self::new()
    }
}

impl Zigzag {
    pub fn new() -> Self {
        Self {
            right: SIZE as i32 - 1,
            step: 0,
            upward: true,
        }
    }
}

impl Iterator for Zigzag {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<(usize, usize)> {
        if self.right < 1 {
            return None;
        }
        let vert = self.step / 2;
        let col = (self.right as usize) - (self.step % 2);
        let row = if self.upward { SIZE - 1 - vert } else { vert };
        self.step += 1;
        if self.step == SIZE * 2 {
            self.step = 0;
            self.right -= 2;
            if self.right == 6 {
                self.right = 5;
            }
            self.upward = !self.upward;
        }
        Some((row, col))
    }
}

/// Fills every unset module of `skeleton` with the codeword bits, masked.
///
/// Modules left over once the bits run out (the remainder bits) receive 0 before masking.
pub fn draw_codewords(skeleton: &Grid, codewords: &[u8], mask: Mask) -> Grid {
    let mut grid = skeleton.clone();
    let totalbits = codewords.len() * 8;
    let mut i: usize = 0;
    for (row, col) in Zigzag::new() {
        if grid.get(row, col) != Module::Unset {
            continue;
        }
        let bit = i < totalbits && get_bit(codewords[i >> 3].into(), 7 - ((i & 7) as u8));
        grid.set(row, col, bit ^ mask.applies(row, col));
        i += 1;
    }
    assert_eq!(grid.count_unset(), 0, "Unset module after data placement");
    grid
}

/// A mask pattern (0–7).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct Mask(u8);

impl Mask {
    /// All eight masks in id order.
    pub const ALL: [Mask; 8] = [
        Mask(0),
        Mask(1),
        Mask(2),
        Mask(3),
        Mask(4),
        Mask(5),
        Mask(6),
        Mask(7),
    ];

    /// Creates a mask object from the given number.
    ///
    /// # Panics
    ///
    /// Panics if the number is outside the range [0, 7].
    pub const fn new(mask: u8) -> Self {
        assert!(mask <= 7, "Mask value out of range");
        Self(mask)
    }

    /// Returns the value, which is in the range [0, 7].
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Whether this mask inverts the module at (row, col).
    pub fn applies(self, row: usize, col: usize) -> bool {
        let (i, j) = (row, col);
        match self.0 {
            0 => (i + j) % 2 == 0,
            1 => i % 2 == 0,
            2 => j % 3 == 0,
            3 => (i + j) % 3 == 0,
            4 => (i / 2 + j / 3) % 2 == 0,
            5 => ((i * j) % 2) + ((i * j) % 3) == 0,
            6 => (((i * j) % 2) + ((i * j) % 3)) % 2 == 0,
            7 => (((i + j) % 2) + ((i * j) % 3)) % 2 == 0,
            _ => unreachable!(),
        }
    }
}

/*---- Format information ----*/

/// Returns the 15-bit format information for level M and the given mask, after BCH coding and
/// the fixed XOR mask.
pub fn format_bits(mask: Mask) -> u16 {
    let data: u32 = (ECL_FORMAT_BITS << 3) | u32::from(mask.value());
    let mut rem: u32 = data << 10;
    while rem >= 1 << 10 {
        let shift = (31 - rem.leading_zeros()) - 10;
        rem ^= FORMAT_GENERATOR << shift;
    }
    (((data << 10) | rem) ^ FORMAT_XOR_MASK) as u16
}

/// Writes both copies of the format information into the reserved strips.
pub fn draw_format_bits(grid: &mut Grid, mask: Mask) {
    let bits = u32::from(format_bits(mask));
    for (i, &(row, col)) in FORMAT_COORDS_TOP_LEFT.iter().enumerate() {
        grid.set(row, col, get_bit(bits, i as u8));
    }
    for (i, &(row, col)) in FORMAT_COORDS_SPLIT.iter().enumerate() {
        grid.set(row, col, get_bit(bits, i as u8));
    }
    grid.set(DARK_MODULE.0, DARK_MODULE.1, true);
}

/// Reads the format information back from the top-left strip.
pub fn read_format_bits(grid: &Grid) -> u16 {
    FORMAT_COORDS_TOP_LEFT
        .iter()
        .enumerate()
        .filter(|&(_, &(row, col))| grid.is_dark(row, col))
        .fold(0u16, |acc, (i, _)| acc | (1 << i))
}

/*---- Mask evaluation ----*/

/// Penalty points of one candidate, by rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Penalty {
    /// Runs of five or more same-colored modules in a row or column.
    pub runs: u32,
    /// 2×2 single-color blocks.
    pub blocks: u32,
    /// 1:1:3:1:1 finder-like sequences with four light modules on one side.
    pub finder_like: u32,
    /// Deviation of the dark ratio from 50%.
    pub balance: u32,
}

impl Penalty {
    pub fn total(&self) -> u32 {
        self.runs + self.blocks + self.finder_like + self.balance
    }
}

/// Scores a fully drawn grid with the four penalty rules.
pub fn penalty_score(grid: &Grid) -> Penalty {
    let mut result = Penalty::default();
    let lines = (0..SIZE)
        .map(|i| grid.row(i).collect::<Vec<bool>>())
        .chain((0..SIZE).map(|i| grid.column(i).collect::<Vec<bool>>()));
    for line in lines {
        result.runs += run_penalty(&line);
        result.finder_like += finder_like_count(&line) * PENALTY_N3;
    }

    for row in 0..SIZE - 1 {
        for col in 0..SIZE - 1 {
            let color = grid.is_dark(row, col);
            if color == grid.is_dark(row, col + 1)
                && color == grid.is_dark(row + 1, col)
                && color == grid.is_dark(row + 1, col + 1)
            {
                result.blocks += PENALTY_N2;
            }
        }
    }

    // floor(|dark% / 5 - 10|), kept in integers
    let dark = grid.count_dark() as i64;
    let total = (SIZE * SIZE) as i64;
    let k = (dark * 20 - total * 10).abs() / total;
    result.balance = k as u32 * PENALTY_N4;
    result
}

fn run_penalty(line: &[bool]) -> u32 {
    let mut result = 0;
    let mut start = 0;
    while start < line.len() {
        let color = line[start];
        let runlen = line[start..].iter().take_while(|&&c| c == color).count();
        if runlen >= 5 {
            result += PENALTY_N1 + (runlen as u32 - 5);
        }
        start += runlen;
    }
    result
}

fn finder_like_count(line: &[bool]) -> u32 {
    line.windows(11)
        .map(|window| {
            FINDER_LIKE_PATTERNS
                .iter()
                .filter(|pattern| window == &pattern[..])
                .count() as u32
        })
        .sum()
}

/// One fully drawn symbol for a given mask, with its score.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub mask: Mask,
    pub grid: Grid,
    pub penalty: Penalty,
}

/// Draws the codewords under `mask`, stamps the format information and scores the result.
pub fn build_candidate(skeleton: &Grid, codewords: &[u8], mask: Mask) -> Candidate {
    let mut grid = draw_codewords(skeleton, codewords, mask);
    draw_format_bits(&mut grid, mask);
    let penalty = penalty_score(&grid);
    trace!(
        "mask {}: runs {} blocks {} finder-like {} balance {} total {}",
        mask.value(),
        penalty.runs,
        penalty.blocks,
        penalty.finder_like,
        penalty.balance,
        penalty.total()
    );
    Candidate { mask, grid, penalty }
}

/// Picks the candidate with the strictly lowest total penalty; on ties the first one wins.
///
/// # Panics
///
/// Panics if `candidates` is empty.
pub fn choose_best(candidates: impl IntoIterator<Item = Candidate>) -> Candidate {
    let mut best: Option<Candidate> = None;
    for candidate in candidates {
        let better = match &best {
            Some(current) => candidate.penalty.total() < current.penalty.total(),
            None => true,
        };
        if better {
            best = Some(candidate);
        }
    }
    match best {
        Some(candidate) => candidate,
        None => unreachable!("no mask candidate was scored"),
    }
}

fn get_bit(x: u32, i: u8) -> bool {
    ((x >> i) & 1) != 0
}

use qrsvg::helper::{to_svg_string, RenderOptions};
use qrsvg::qrcode::{
    add_ecc_and_interleave, build_data_codewords, build_skeleton, draw_codewords,
    draw_format_bits, format_bits, penalty_score, GeneratorCache, Grid, MAX_PAYLOAD_LEN, SIZE,
};
use qrsvg::{encode, encode_symbol, encode_with, EncodeError, Mask, QrCode};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Straightforward re-statement of the four penalty rules over a dark/light matrix.
fn independent_score(grid: &Grid) -> u32 {
    let m: Vec<Vec<bool>> = (0..SIZE)
        .map(|r| (0..SIZE).map(|c| grid.is_dark(r, c)).collect())
        .collect();
    let mut lines: Vec<Vec<bool>> = m.clone();
    for c in 0..SIZE {
        lines.push((0..SIZE).map(|r| m[r][c]).collect());
    }

    let p1 = [1, 0, 1, 1, 1, 0, 1, 0, 0, 0, 0];
    let p2 = [0, 0, 0, 0, 1, 0, 1, 1, 1, 0, 1];
    let mut score = 0u32;
    for line in &lines {
        let mut i = 0;
        while i < SIZE {
            let mut j = i;
            while j < SIZE && line[j] == line[i] {
                j += 1;
            }
            if j - i >= 5 {
                score += 3 + (j - i - 5) as u32;
            }
            i = j;
        }
        let bits: Vec<i32> = line.iter().map(|&b| b as i32).collect();
        for s in 0..=SIZE - 11 {
            if bits[s..s + 11] == p1 {
                score += 40;
            }
            if bits[s..s + 11] == p2 {
                score += 40;
            }
        }
    }
    for r in 0..SIZE - 1 {
        for c in 0..SIZE - 1 {
            let v = m[r][c];
            if v == m[r][c + 1] && v == m[r + 1][c] && v == m[r + 1][c + 1] {
                score += 3;
            }
        }
    }
    let dark = m.iter().flatten().filter(|&&d| d).count() as f64;
    let percent = dark * 100.0 / (SIZE * SIZE) as f64;
    score += ((percent / 5.0 - 10.0).abs().floor() as u32) * 10;
    score
}

fn candidate_scores(text: &str) -> Vec<u32> {
    let data = build_data_codewords(text.as_bytes()).unwrap();
    let codewords = add_ecc_and_interleave(&data, &GeneratorCache::new());
    let skeleton = build_skeleton();
    Mask::ALL
        .iter()
        .map(|&mask| {
            let mut grid = draw_codewords(&skeleton, &codewords, mask);
            draw_format_bits(&mut grid, mask);
            let score = independent_score(&grid);
            assert_eq!(penalty_score(&grid).total(), score);
            score
        })
        .collect()
}

fn read_format(qr: &QrCode, coords: &[(i32, i32)]) -> u16 {
    coords
        .iter()
        .enumerate()
        .filter(|&(_, &(row, col))| qr.get_module(col, row))
        .fold(0, |acc, (i, _)| acc | (1 << i))
}

#[test]
fn test_hello_dimensions() {
    init_logger();
    let svg = encode("HELLO", 200).unwrap();
    assert!(svg.contains("viewBox=\"0 0 196 196\" width=\"196\" height=\"196\""));
    assert_eq!(svg.matches("<path").count(), 1);
    assert_eq!(svg.matches("<rect").count(), 1);
}

#[test]
fn test_empty_input() {
    assert_eq!(encode("", 200), Err(EncodeError::Input));
    assert_eq!(encode_symbol(""), Err(EncodeError::Input));
}

#[test]
fn test_capacity_boundary() {
    let fits = "a".repeat(MAX_PAYLOAD_LEN);
    let svg = encode(&fits, 200).unwrap();
    assert_eq!(svg.matches("<path").count(), 1);

    let too_long = "a".repeat(MAX_PAYLOAD_LEN + 1);
    assert_eq!(
        encode(&too_long, 200),
        Err(EncodeError::Capacity {
            needed_bits: 868,
            capacity_bits: 864,
        })
    );
}

#[test]
fn test_capacity_counts_utf8_bytes() {
    // Two bytes per character.
    assert!(encode(&"é".repeat(53), 100).is_ok());
    assert!(matches!(
        encode(&"é".repeat(54), 100),
        Err(EncodeError::Capacity { .. })
    ));
}

#[test]
fn test_every_length_up_to_capacity() {
    for len in 1..=MAX_PAYLOAD_LEN {
        let text: String = (0..len).map(|i| (b'a' + (i % 26) as u8) as char).collect();
        let svg = encode(&text, 100).unwrap();
        assert_eq!(svg.matches("<path").count(), 1, "length {}", len);
    }
}

#[test]
fn test_deterministic() {
    let a = encode("https://example.com/events/42", 256).unwrap();
    let b = encode("https://example.com/events/42", 256).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_small_size_uses_one_pixel_per_module() {
    let svg = encode("HELLO", 10).unwrap();
    assert!(svg.contains("width=\"49\" height=\"49\""));
}

#[test]
fn test_chosen_mask_is_minimal() {
    init_logger();
    for text in ["HELLO", "Hello, World!", "https://example.com/events/42", "0123456789"] {
        let scores = candidate_scores(text);
        let min = *scores.iter().min().unwrap();
        let expected = scores.iter().position(|&s| s == min).unwrap();
        let qr = encode_symbol(text).unwrap();
        assert_eq!(usize::from(qr.mask().value()), expected, "{}", text);
        assert_eq!(qr.penalty().total(), min);
    }
}

#[test]
fn test_known_mask_choices() {
    let qr = encode_symbol("HELLO").unwrap();
    assert_eq!(qr.mask(), Mask::new(2));
    assert_eq!(qr.penalty().total(), 910);

    let qr = encode_symbol("https://example.com/events/42").unwrap();
    assert_eq!(qr.mask(), Mask::new(0));
    assert_eq!(qr.penalty().total(), 1021);
}

#[test]
fn test_hello_codewords() {
    let data = build_data_codewords(b"HELLO").unwrap();
    let codewords = add_ecc_and_interleave(&data, &GeneratorCache::new());
    assert_eq!(codewords.len(), 172);
    assert_eq!(&codewords[..8], &[0x40, 0xec, 0x11, 0xec, 0x54, 0x11, 0xec, 0x11]);
    assert_eq!(&codewords[108..112], &[174, 63, 160, 63]);
}

#[test]
fn test_format_information_both_copies() {
    let qr = encode_symbol("Hello, World!").unwrap();
    let top_left: Vec<(i32, i32)> = vec![
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
    let split: Vec<(i32, i32)> = (0..8)
        .map(|i| (8, 40 - i))
        .chain((8..15).map(|i| (26 + i, 8)))
        .collect();
    let expected = format_bits(qr.mask());
    assert_eq!(read_format(&qr, &top_left), expected);
    assert_eq!(read_format(&qr, &split), expected);
    assert!(qr.get_module(8, 33));
}

#[test]
fn test_custom_colors() {
    let options = RenderOptions {
        size: 98,
        dark: [0x11, 0x22, 0x33],
        light: [0xff, 0xff, 0xf0],
    };
    let svg = encode_with("HELLO", &options).unwrap();
    assert!(svg.contains("width=\"98\""));
    assert!(svg.contains("fill=\"#112233\""));
    assert!(svg.contains("fill=\"#fffff0\""));
    assert_eq!(svg, to_svg_string(&encode_symbol("HELLO").unwrap(), &options));
}

#[test]
fn test_concurrent_encoding() {
    let expected = encode("concurrent", 120).unwrap();
    let handles: Vec<_> = (0..4)
        .map(|_| std::thread::spawn(|| encode("concurrent", 120).unwrap()))
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

//! Visible screen contents agree with an independent terminal emulator.

use proptest::prelude::*;
use scrollcell::{CellString, GangToken, Screen};

fn reference_rows(width: usize, height: usize, input: &str) -> Vec<String> {
    let rows = u16::try_from(height).unwrap();
    let cols = u16::try_from(width).unwrap();
    let mut parser = vt100::Parser::new(rows, cols, 0);
    parser.process(input.as_bytes());
    parser
        .screen()
        .rows(0, cols)
        .map(|row| row.trim_end().to_string())
        .collect()
}

fn our_rows(screen: &Screen) -> Vec<String> {
    screen
        .lines()
        .map(|line| line.string_value().trim_end().to_string())
        .collect()
}

#[test]
fn wrapping_and_scrolling() {
    let input = "first line that is long\r\nsecond\r\n\r\nlast";
    let mut screen = Screen::new(10, 4, 100).unwrap();
    screen.append_string_at_cursor(input);
    assert_eq!(our_rows(&screen), reference_rows(10, 4, input));
}

#[test]
fn double_width_at_right_margin() {
    let input = "abcd日本語\r\nxy";
    let mut screen = Screen::new(5, 3, 0).unwrap();
    screen.append_string_at_cursor(input);
    assert_eq!(our_rows(&screen), reference_rows(5, 3, input));
}

// The reference emulator cannot drive a single-row screen.
proptest! {
    #[test]
    fn general_path_matches_reference(
        width in 2usize..30,
        height in 2usize..8,
        lines in prop::collection::vec("[a-z日本 ]{0,40}", 0..12),
    ) {
        let input = lines.join("\r\n");
        let mut screen = Screen::new(width, height, 50).unwrap();
        screen.append_string_at_cursor(&input);
        prop_assert_eq!(our_rows(&screen), reference_rows(width, height, &input));
    }

    #[test]
    fn gang_path_matches_reference(
        width in 2usize..30,
        height in 2usize..8,
        lines in prop::collection::vec("[A-Za-z0-9 ]{0,60}", 0..12),
    ) {
        let input = lines.join("\r\n");
        let mut screen = Screen::new(width, height, 50).unwrap();
        screen.append_mixed_ascii_gang(&[GangToken::from_ascii(input.clone()).unwrap()]);
        prop_assert_eq!(our_rows(&screen), reference_rows(width, height, &input));
    }
}

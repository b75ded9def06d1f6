//! Encoded lines decode to exactly the substring that was encoded.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use scrollcell::{
    decode_line, BufferError, Cell, CellString, Color, ExternalAttribute, Hyperlink, Rgb, Screen,
    Style,
};

fn pen() -> impl Strategy<Value = Cell> {
    let color = prop_oneof![
        Just(Color::Default),
        any::<u8>().prop_map(Color::Indexed),
        any::<[u8; 3]>().prop_map(|[r, g, b]| Color::Rgb(Rgb::new(r, g, b))),
    ];
    (color.clone(), color, any::<u16>()).prop_map(|(fg, bg, style)| {
        Cell::EMPTY
            .with_fg(fg)
            .with_bg(bg)
            .with_style(Style::from_bits_truncate(style))
    })
}

fn attribute() -> impl Strategy<Value = Option<ExternalAttribute>> {
    prop_oneof![
        3 => Just(None),
        1 => "[a-z]{1,10}".prop_map(|u| Some(ExternalAttribute::with_hyperlink(Hyperlink::new(u)))),
        1 => any::<u8>().prop_map(|i| Some(ExternalAttribute::with_underline_color(Color::Indexed(i)))),
    ]
}

/// Text mixing ASCII, double-width and combining sequences.
fn text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[a-z ]{1,6}".boxed(),
            Just("日本".to_string()).boxed(),
            Just("e\u{301}".to_string()).boxed(),
            Just("👍🏽".to_string()).boxed(),
        ],
        0..6,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn decode_of_encode_is_substring(
        width in 2usize..24,
        writes in prop::collection::vec((pen(), attribute(), text()), 1..5),
        time in 0.0f64..1e9,
        (start, len) in (0usize..24, 0usize..24),
        row in 0usize..3,
    ) {
        let mut screen = Screen::new(width, 3, 0).unwrap();
        screen.set_time(time);
        for (cell, attr, text) in &writes {
            screen.set_pen(*cell);
            screen.set_pen_attribute(attr.clone());
            screen.append_string_at_cursor(text);
        }
        let line = screen.line(row).unwrap();
        let end = (start + len).min(line.cell_count());
        let start = start.min(end);

        let encoded = line.encode(start..end).unwrap();
        let decoded = decode_line(&encoded).unwrap();
        let expected = line.substring(start..end).unwrap();

        prop_assert!(decoded.is_equal(&expected));
        prop_assert_eq!(decoded.metadata(), line.metadata());
        prop_assert_eq!(decoded.eol(), line.eol());
        prop_assert_eq!(decoded.continuation(), line.continuation());
        prop_assert_eq!(decoded.string_value(), expected.string_value());
    }

    #[test]
    fn truncated_streams_are_rejected(cut in 0usize..64) {
        let mut screen = Screen::new(6, 1, 0).unwrap();
        screen.set_pen_attribute(Some(ExternalAttribute::with_hyperlink(Hyperlink::new("u"))));
        screen.append_string_at_cursor("ab日e\u{301}");
        let encoded = screen.line(0).unwrap().encode(0..6).unwrap();
        let cut = cut % encoded.len();
        prop_assert!(matches!(
            decode_line(&encoded[..cut]),
            Err(BufferError::MalformedData(_))
        ));
    }
}

#[test]
fn snapshot_from_scrollback_round_trips() {
    let mut screen = Screen::new(4, 1, 10).unwrap();
    screen.append_string_at_cursor("wrapped text");
    let first = screen.scrollback().get(0).unwrap();
    let encoded = first.encode(first.full_range()).unwrap();
    let decoded = decode_line(&encoded).unwrap();
    assert_eq!(decoded.string_value(), "wrap");
    assert_eq!(decoded.eol(), first.eol());
    assert!(decoded.is_equal(first));
}

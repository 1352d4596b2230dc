//! Round-trip properties of the two body markup converters.
//!
//! Run with: cargo test --test markup_roundtrip

use quill_yw7::xml::Element;
use quill_yw7::{FlowConverter, MarkupFixer, flow_to_shortcode};

fn to_flow(shortcode: &str, languages: &[&str]) -> String {
    let languages = languages.iter().map(|code| code.to_string()).collect();
    FlowConverter::new(None, languages).convert(shortcode)
}

#[test]
fn block_quote_and_language_span_round_trip() {
    let shortcode = "> [lang=de]Guten Tag[/lang=de]\nNext";
    let flow = to_flow(shortcode, &["de"]);
    assert_eq!(
        flow,
        "<p style=\"quotations\"><span xml:lang=\"de\">Guten Tag</span></p><p>Next</p>"
    );
    assert_eq!(flow_to_shortcode(&flow).unwrap(), shortcode);
}

#[test]
fn plain_paragraphs_round_trip_both_ways() {
    let flow = "<p>one</p><p>two</p>";
    let shortcode = flow_to_shortcode(flow).unwrap();
    assert_eq!(shortcode, "one\ntwo");
    assert_eq!(to_flow(&shortcode, &[]), flow);
}

#[test]
fn formatting_round_trips_through_shortcode() {
    let flow = "<p>Hello <em>world</em>, <strong>loud</strong>.</p>";
    let shortcode = flow_to_shortcode(flow).unwrap();
    assert_eq!(shortcode, "Hello [i]world[/i], [b]loud[/b].");
    assert_eq!(to_flow(&shortcode, &[]), flow);
}

#[test]
fn overlapping_formatting_is_repaired_to_well_formed_xml() {
    let flow = to_flow("[b]X[i]Y[/b]Z[/i]", &[]);
    // The raw conversion interleaves the regions; the fixer untangles them.
    let fixed = MarkupFixer::default().fix(&flow).unwrap();
    let parsed = Element::parse(&format!("<Content>{fixed}</Content>")).unwrap();
    assert_eq!(parsed.name, "Content");
    // No <em> region may span a <strong> boundary once fixed.
    assert_eq!(fixed, "<p><strong>X<em>Y</em></strong>Z</p>");
}

#[test]
fn entity_safety_for_reserved_characters() {
    let shortcode = "5 < 7 & \"quotes\" aren't > trouble";
    let flow = to_flow(shortcode, &[]);
    let parsed = Element::parse(&flow).unwrap();
    assert_eq!(parsed.text(), Some(shortcode));
    assert_eq!(flow_to_shortcode(&flow).unwrap(), shortcode);
}

#[test]
fn footnote_and_endnote_citations_number_per_document() {
    let mut converter = FlowConverter::new(Some("Author".to_string()), Vec::new());
    let flow = converter.convert("a /* @fn first */ b /* @fn* starred */ c /* @fn second */");
    assert!(flow.contains("<note id=\"ftn1\" class=\"footnote\"><note-citation>1</note-citation>"));
    assert!(flow.contains("<note id=\"ftn2\" class=\"footnote\"><note-citation>*</note-citation>"));
    assert!(flow.contains("<note id=\"ftn3\" class=\"footnote\"><note-citation>2</note-citation>"));

    // Counters continue across bodies of the same document.
    let next = converter.convert("d /* @en endnote */");
    assert!(next.contains("<note id=\"ftn4\" class=\"endnote\"><note-citation>3</note-citation>"));
}

#[test]
fn notes_round_trip_modulo_wrapping() {
    let mut converter = FlowConverter::new(None, Vec::new());
    let flow = converter.convert("x /* @fn aside */ y");
    let shortcode = flow_to_shortcode(&flow).unwrap();
    assert_eq!(shortcode, "x /*@fn aside  */ y");
}

#[test]
fn raw_code_is_dropped_before_conversion() {
    let flow = to_flow("a<RTFBRK>b <TEX \\noindent /TEX>[h2]head[/h2]", &[]);
    assert_eq!(flow, "<p>ab head</p>");
}

#[test]
fn formatting_spanning_lines_is_closed_per_paragraph() {
    let flow = to_flow("[i]one\ntwo\nthree[/i]", &[]);
    assert_eq!(
        flow,
        "<p><em>one</em></p><p><em>two</em></p><p><em>three</em></p>"
    );
}

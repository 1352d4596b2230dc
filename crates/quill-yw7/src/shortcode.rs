//! Conversion of flow markup to the legacy shortcode body dialect.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};

#[derive(Default)]
struct Converter {
    out: Vec<String>,
    in_paragraph: bool,
    in_comment: bool,
    span_closers: Vec<String>,
}

/// Convert a section body from flow markup to shortcode.
///
/// Paragraphs become newline-separated lines (`> `-prefixed for block
/// quotes), emphasis and strong become `[i]`/`[b]` pairs, language spans
/// become `[lang=…]` pairs, and comments and notes collapse back into
/// `/* … */` regions. Unknown elements are transparent: their tags vanish
/// but their text flows on.
pub fn flow_to_shortcode(content: &str) -> Result<String> {
    let document = format!("<Content>{content}</Content>");
    let mut reader = Reader::from_str(&document);
    reader.config_mut().trim_text_start = false;
    reader.config_mut().trim_text_end = false;

    let mut state = Converter::default();

    loop {
        match reader.read_event().map_err(Error::parse)? {
            Event::Start(e) => {
                let name = tag_name(&e);
                state.start_element(&name, &e)?;
            }
            Event::Empty(e) => {
                let name = tag_name(&e);
                state.start_element(&name, &e)?;
                state.end_element(&name);
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                state.end_element(&name);
            }
            Event::Text(e) => {
                if state.in_paragraph {
                    state
                        .out
                        .push(e.unescape().map_err(Error::parse)?.into_owned());
                }
            }
            Event::CData(e) => {
                if state.in_paragraph {
                    state.out.push(String::from_utf8_lossy(e.as_ref()).into_owned());
                }
            }
            Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    Ok(state.out.concat().trim_end_matches('\n').to_string())
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(Error::parse)?;
        if attr.key.as_ref() == key {
            return Ok(Some(
                attr.unescape_value().map_err(Error::parse)?.into_owned(),
            ));
        }
    }
    Ok(None)
}

impl Converter {
    fn start_element(&mut self, name: &str, e: &BytesStart<'_>) -> Result<()> {
        match name {
            "p" => {
                self.in_paragraph = true;
                if attr_value(e, b"style")?.as_deref() == Some("quotations") {
                    self.out.push("> ".to_string());
                }
            }
            "em" => self.out.push("[i]".to_string()),
            "strong" => self.out.push("[b]".to_string()),
            "span" => {
                if let Some(locale) = attr_value(e, b"xml:lang")? {
                    self.span_closers.push(format!("[/lang={locale}]"));
                    self.out.push(format!("[lang={locale}]"));
                }
            }
            "comment" | "note" => {
                self.in_comment = true;
                self.out.push("/*".to_string());
                if name == "note" {
                    let code = match attr_value(e, b"class")?.as_deref() {
                        Some("endnote") => "@en",
                        _ => "@fn",
                    };
                    self.out.push(format!("{code} "));
                }
            }
            "creator" | "date" | "note-citation" => self.in_paragraph = false,
            _ => {}
        }
        Ok(())
    }

    fn end_element(&mut self, name: &str) {
        match name {
            "p" => {
                while let Some(closer) = self.span_closers.pop() {
                    self.out.push(closer);
                }
                let separator = if self.in_comment { " " } else { "\n" };
                self.out.push(separator.to_string());
                self.in_paragraph = false;
            }
            "em" => self.out.push("[/i]".to_string()),
            "strong" => self.out.push("[/b]".to_string()),
            "span" => {
                if let Some(closer) = self.span_closers.pop() {
                    self.out.push(closer);
                }
            }
            "comment" | "note" => {
                self.in_comment = false;
                self.out.push("*/".to_string());
                // Text after an inline comment still belongs to the
                // enclosing paragraph.
                self.in_paragraph = true;
            }
            "creator" | "date" | "note-citation" => self.in_paragraph = true,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(content: &str) -> String {
        flow_to_shortcode(content).unwrap()
    }

    #[test]
    fn empty_input_is_empty() {
        assert_eq!(convert(""), "");
    }

    #[test]
    fn paragraphs_become_lines() {
        assert_eq!(convert("<p>one</p><p>two</p>"), "one\ntwo");
    }

    #[test]
    fn formatting_tags_are_translated() {
        assert_eq!(
            convert("<p>Hello <em>world</em>, <strong>loud</strong>.</p>"),
            "Hello [i]world[/i], [b]loud[/b]."
        );
    }

    #[test]
    fn quotation_paragraphs_get_a_marker() {
        assert_eq!(
            convert("<p style=\"quotations\">cited</p><p>plain</p>"),
            "> cited\nplain"
        );
    }

    #[test]
    fn language_spans_unwind_in_order() {
        assert_eq!(
            convert("<p><span xml:lang=\"de\">Guten Tag</span></p><p>Next</p>"),
            "[lang=de]Guten Tag[/lang=de]\nNext"
        );
    }

    #[test]
    fn nested_spans_unwind_lifo() {
        assert_eq!(
            convert(
                "<p><span xml:lang=\"de\">a <span xml:lang=\"fr\">b</span> c</span></p>"
            ),
            "[lang=de]a [lang=fr]b[/lang=fr] c[/lang=de]"
        );
    }

    #[test]
    fn comments_collapse_to_slash_star() {
        assert_eq!(
            convert(
                "<p>Hi <comment><creator>me</creator><date>2024-01-01T00:00:00</date>\
                 <p>aside </p></comment>there</p>"
            ),
            "Hi /*aside  */there"
        );
    }

    #[test]
    fn notes_keep_their_class() {
        assert_eq!(
            convert(
                "<p>x<note id=\"ftn1\" class=\"footnote\"><note-citation>1</note-citation>\
                 <p>first </p></note></p>"
            ),
            "x/*@fn first  */"
        );
        assert_eq!(
            convert(
                "<p>x<note id=\"ftn2\" class=\"endnote\"><note-citation>1</note-citation>\
                 <p>later </p></note></p>"
            ),
            "x/*@en later  */"
        );
    }

    #[test]
    fn unknown_elements_are_transparent() {
        assert_eq!(convert("<p>a <kbd>b</kbd> c</p>"), "a b c");
    }

    #[test]
    fn empty_paragraph_still_separates() {
        assert_eq!(convert("<p>a</p><p/><p>b</p>"), "a\n\nb");
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(convert("<p>a &amp; b &lt; c</p>"), "a & b < c");
    }
}

//! Repair of overlapping or unbalanced inline format tags.
//!
//! The legacy shortcode dialect lets emphasis and strong regions overlap
//! freely, so converted bodies can contain XML like
//! `<strong>X<em>Y</strong>Z</em>`. This pass rebalances the configured
//! format tags so the stream parses as XML again, leaving everything else
//! untouched (modulo re-escaping of character data).

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};

/// Rebalances a configurable set of inline format tags.
#[derive(Clone, Debug)]
pub struct MarkupFixer {
    format_tags: Vec<String>,
}

impl MarkupFixer {
    pub fn new<I, S>(format_tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            format_tags: format_tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Return `xml` with the format tags balanced and non-overlapping.
    ///
    /// Duplicate openers of an already open format region are dropped; a
    /// closer that crosses another format region first closes the
    /// intervening regions. Closers without an opener are dropped, openers
    /// without a closer are closed at the end of the stream. No empty
    /// format region survives.
    pub fn fix(&self, xml: &str) -> Result<String> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;
        reader.config_mut().check_end_names = false;
        reader.config_mut().allow_unmatched_ends = true;

        let mut out = String::new();
        let mut open: Vec<String> = Vec::new();

        loop {
            match reader.read_event().map_err(Error::parse)? {
                Event::Start(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if self.is_format_tag(&name) {
                        if open.contains(&name) {
                            continue;
                        }
                        open.push(name.clone());
                    }
                    out.push('<');
                    out.push_str(&name);
                    push_attrs(&mut out, &e)?;
                    out.push('>');
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if self.is_format_tag(&name) {
                        if !open.contains(&name) {
                            continue;
                        }
                        while let Some(last) = open.last() {
                            if *last == name {
                                break;
                            }
                            out.push_str("</");
                            out.push_str(last);
                            out.push('>');
                            open.pop();
                        }
                        open.pop();
                    }
                    out.push_str("</");
                    out.push_str(&name);
                    out.push('>');
                }
                Event::Empty(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if self.is_format_tag(&name) {
                        continue;
                    }
                    out.push('<');
                    out.push_str(&name);
                    push_attrs(&mut out, &e)?;
                    out.push_str(" />");
                }
                Event::Text(e) => {
                    let text = e.unescape().map_err(Error::parse)?;
                    out.push_str(&escape(text.as_ref()));
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    out.push_str(&escape(text.as_str()));
                }
                Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_) => {}
                Event::Eof => break,
            }
        }

        // Regions left open at the end of the stream.
        while let Some(tag) = open.pop() {
            out.push_str("</");
            out.push_str(&tag);
            out.push('>');
        }

        Ok(self.drop_empty_regions(out))
    }

    fn is_format_tag(&self, name: &str) -> bool {
        self.format_tags.iter().any(|tag| tag == name)
    }

    fn drop_empty_regions(&self, mut xml: String) -> String {
        loop {
            let mut changed = false;
            for tag in &self.format_tags {
                let empty = format!("<{tag}></{tag}>");
                if xml.contains(&empty) {
                    xml = xml.replace(&empty, "");
                    changed = true;
                }
            }
            if !changed {
                return xml;
            }
        }
    }
}

impl Default for MarkupFixer {
    fn default() -> Self {
        Self::new(["em", "strong"])
    }
}

fn push_attrs(out: &mut String, e: &BytesStart<'_>) -> Result<()> {
    for attr in e.attributes() {
        let attr = attr.map_err(Error::parse)?;
        out.push(' ');
        out.push_str(&String::from_utf8_lossy(attr.key.as_ref()));
        out.push_str("=\"");
        out.push_str(&escape(
            attr.unescape_value().map_err(Error::parse)?.as_ref(),
        ));
        out.push('"');
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(xml: &str) -> String {
        MarkupFixer::default().fix(xml).unwrap()
    }

    #[test]
    fn well_formed_input_is_unchanged() {
        let xml = "<p>Hello <em>world</em>.</p>";
        assert_eq!(fix(xml), xml);
    }

    #[test]
    fn overlapping_regions_are_rebalanced() {
        assert_eq!(
            fix("<p><strong>X<em>Y</strong>Z</em></p>"),
            "<p><strong>X<em>Y</em></strong>Z</p>"
        );
    }

    #[test]
    fn duplicate_openers_are_dropped() {
        assert_eq!(fix("<em>a<em>b</em>c</em>"), "<em>ab</em>c");
    }

    #[test]
    fn stray_closers_are_dropped() {
        assert_eq!(fix("a</em>b"), "ab");
    }

    #[test]
    fn unclosed_regions_are_closed_at_the_end() {
        assert_eq!(fix("<em>a"), "<em>a</em>");
    }

    #[test]
    fn empty_regions_are_removed() {
        assert_eq!(fix("a<em></em>b<em><strong></strong></em>c"), "abc");
    }

    #[test]
    fn character_data_is_escaped() {
        assert_eq!(fix("<p>a &amp; b</p>"), "<p>a &amp; b</p>");
    }

    #[test]
    fn idempotent() {
        for sample in [
            "<p><strong>X<em>Y</strong>Z</em></p>",
            "<em>a",
            "a</strong>b<em></em>",
            "<p>plain</p>",
        ] {
            let once = fix(sample);
            assert_eq!(fix(&once), once);
        }
    }

    #[test]
    fn non_format_tags_keep_attributes() {
        let xml = "<note id=\"ftn1\" class=\"footnote\"><p>n</p></note>";
        assert_eq!(fix(xml), xml);
    }
}

//! Conversion of legacy shortcode bodies to flow markup.

use chrono::Local;
use once_cell::sync::Lazy;
use quick_xml::escape::escape;
use regex::{Captures, Regex};

static BRACKET_CODES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[/?[hcrsu]\d*\]").unwrap());

// Inline raw-code containers tolerated in legacy bodies; content and all.
static RAW_CODE_SPANS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["HTM", "TEX", "RTF", "epub", "mobi", "rtfimg"]
        .iter()
        .map(|code| Regex::new(&format!("<{code} .+?/{code}>")).unwrap())
        .collect()
});

static NOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\* *@([ef]n\**) (.*?)\*/").unwrap());
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\*(.*?)\*/").unwrap());
static QUOTE_PARAGRAPH: Lazy<Regex> = Lazy::new(|| Regex::new(r"<p>&gt; (.*?)</p>").unwrap());

/// Converts shortcode section bodies into flow markup.
///
/// The note ID counter and the running citation number span a whole
/// document, so one converter is created per read and fed every body in
/// document order.
#[derive(Debug)]
pub struct FlowConverter {
    author: Option<String>,
    languages: Vec<String>,
    note_counter: u32,
    note_number: u32,
}

impl FlowConverter {
    pub fn new(author: Option<String>, languages: Vec<String>) -> Self {
        Self {
            author,
            languages,
            note_counter: 0,
            note_number: 0,
        }
    }

    /// Convert one section body. An empty body converts to an empty string.
    pub fn convert(&mut self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        //--- Remove inline raw code.
        let mut text = text.replace("<RTFBRK>", "");
        text = BRACKET_CODES.replace_all(&text, "").into_owned();
        for span in RAW_CODE_SPANS.iter() {
            text = span.replace_all(&text, "").into_owned();
        }

        //--- Close formatting that reaches across line breaks.
        let tags: Vec<String> = ["i".to_string(), "b".to_string()]
            .into_iter()
            .chain(self.languages.iter().map(|code| format!("lang={code}")))
            .collect();
        let text = close_across_lines(&text, &tags);

        //--- Apply XML entities, then the markup substitutions.
        let mut text = text
            .replace('&', "&amp;")
            .replace('>', "&gt;")
            .replace('<', "&lt;")
            .replace('\'', "&apos;")
            .replace('"', "&quot;")
            .replace('\n', "</p><p>")
            .replace("[i]", "<em>")
            .replace("[/i]", "</em>")
            .replace("[b]", "<strong>")
            .replace("[/b]", "</strong>");
        for code in &self.languages {
            text = text
                .replace(
                    &format!("[lang={code}]"),
                    &format!("<span xml:lang=\"{code}\">"),
                )
                .replace(&format!("[/lang={code}]"), "</span>");
        }

        //--- Convert comments, footnotes, and endnotes.
        if text.contains("/*") {
            text = self.replace_notes(&text);
            text = self.replace_comments(&text);
        }

        //--- Wrap into paragraphs.
        let text = format!("<p>{text}</p>");
        QUOTE_PARAGRAPH
            .replace_all(&text, "<p style=\"quotations\">${1}</p>")
            .into_owned()
    }

    fn replace_notes(&mut self, text: &str) -> String {
        let mut counter = self.note_counter;
        let mut number = self.note_number;
        let replaced = NOTE
            .replace_all(text, |caps: &Captures<'_>| {
                counter += 1;
                number += 1;
                let kind = &caps[1];
                let mut label = number.to_string();
                let class = if kind.starts_with("fn") {
                    if kind.ends_with('*') {
                        // Starred footnotes show a symbol and do not advance
                        // the running number.
                        number -= 1;
                        label = "*".to_string();
                    }
                    "footnote"
                } else {
                    "endnote"
                };
                format!(
                    "<note id=\"ftn{counter}\" class=\"{class}\">\
                     <note-citation>{label}</note-citation><p>{}</p></note>",
                    &caps[2]
                )
            })
            .into_owned();
        self.note_counter = counter;
        self.note_number = number;
        replaced
    }

    fn replace_comments(&mut self, text: &str) -> String {
        let creator = match self.author.as_deref() {
            Some(author) if !author.is_empty() => escape(author).into_owned(),
            _ => "unknown".to_string(),
        };
        let date = Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S");
        COMMENT
            .replace_all(text, |caps: &Captures<'_>| {
                format!(
                    "<comment><creator>{creator}</creator><date>{date}</date>\
                     <p>{}</p></comment>",
                    &caps[1]
                )
            })
            .into_owned()
    }
}

/// Re-balance format and language tags line by line.
///
/// A tag still open at a line start is re-opened (after a `&gt; ` block
/// quote marker if one is there); surplus openers on a line are closed at
/// its end and noted as open; surplus closers get an opener prepended.
/// Immediately adjacent opener/closer pairs cancel out.
fn close_across_lines(text: &str, tags: &[String]) -> String {
    let mut open_at_start = vec![false; tags.len()];
    let mut lines: Vec<String> = Vec::new();

    for line in text.split('\n') {
        let mut line = line.to_string();
        for (idx, tag) in tags.iter().enumerate() {
            let opener = format!("[{tag}]");
            let closer = format!("[/{tag}]");
            if open_at_start[idx] {
                line = match line.strip_prefix("&gt; ") {
                    Some(rest) => format!("&gt; {opener}{rest}"),
                    None => format!("{opener}{line}"),
                };
                open_at_start[idx] = false;
            }
            while line.matches(&opener).count() > line.matches(&closer).count() {
                line.push_str(&closer);
                open_at_start[idx] = true;
            }
            while line.matches(&closer).count() > line.matches(&opener).count() {
                line = format!("{opener}{line}");
            }
            line = line.replace(&format!("{opener}{closer}"), "");
        }
        lines.push(line);
    }

    lines.join("\n").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(text: &str) -> String {
        FlowConverter::new(None, vec!["de".to_string()]).convert(text)
    }

    #[test]
    fn empty_body_converts_to_nothing() {
        assert_eq!(convert(""), "");
    }

    #[test]
    fn plain_text_is_wrapped() {
        assert_eq!(convert("Hello."), "<p>Hello.</p>");
    }

    #[test]
    fn formatting_is_translated() {
        assert_eq!(
            convert("Hello [i]world[/i]."),
            "<p>Hello <em>world</em>.</p>"
        );
    }

    #[test]
    fn reserved_characters_are_escaped_before_markup() {
        assert_eq!(
            convert("a < b & c > d \"e\" 'f'"),
            "<p>a &lt; b &amp; c &gt; d &quot;e&quot; &apos;f&apos;</p>"
        );
    }

    #[test]
    fn block_quote_with_language_span() {
        assert_eq!(
            convert("> [lang=de]Guten Tag[/lang=de]\nNext"),
            "<p style=\"quotations\"><span xml:lang=\"de\">Guten Tag</span></p><p>Next</p>"
        );
    }

    #[test]
    fn unknown_language_tags_stay_literal() {
        assert_eq!(convert("[lang=xx]oops[/lang=xx]"), "<p>[lang=xx]oops[/lang=xx]</p>");
    }

    #[test]
    fn raw_code_is_stripped() {
        assert_eq!(
            convert("a<RTFBRK>b [h1]title[/h1] <HTM <b>x</b> /HTM>c [u]u[/u]"),
            "<p>ab title c u</p>"
        );
    }

    #[test]
    fn markup_across_lines_is_closed_per_line() {
        assert_eq!(
            convert("[i]one\ntwo[/i]"),
            "<p><em>one</em></p><p><em>two</em></p>"
        );
    }

    #[test]
    fn stray_closer_gets_an_opener() {
        assert_eq!(convert("one[/b]"), "<p><strong>one</strong></p>");
    }

    #[test]
    fn footnote_numbering_skips_starred_notes() {
        let mut converter = FlowConverter::new(Some("A. Author".to_string()), Vec::new());
        let flow =
            converter.convert("x /* @fn first */ /* @fn* starred */ /* @fn second */ /* @en end */");
        assert!(flow.contains("<note id=\"ftn1\" class=\"footnote\"><note-citation>1</note-citation><p>first </p></note>"));
        assert!(flow.contains("<note id=\"ftn2\" class=\"footnote\"><note-citation>*</note-citation><p>starred </p></note>"));
        assert!(flow.contains("<note id=\"ftn3\" class=\"footnote\"><note-citation>2</note-citation><p>second </p></note>"));
        assert!(flow.contains("<note id=\"ftn4\" class=\"endnote\"><note-citation>3</note-citation><p>end </p></note>"));
    }

    #[test]
    fn note_counters_span_a_document() {
        let mut converter = FlowConverter::new(None, Vec::new());
        converter.convert("a /* @fn one */");
        let second = converter.convert("b /* @fn two */");
        assert!(second.contains("<note id=\"ftn2\""));
        assert!(second.contains("<note-citation>2</note-citation>"));
    }

    #[test]
    fn comments_carry_creator_and_date() {
        let mut converter = FlowConverter::new(Some("Jo & Co".to_string()), Vec::new());
        let flow = converter.convert("x /* remember this */ y");
        assert!(flow.starts_with("<p>x <comment><creator>Jo &amp; Co</creator><date>"));
        assert!(flow.ends_with("<p> remember this </p></comment> y</p>"));
    }

    #[test]
    fn comment_without_author_uses_unknown() {
        let flow = convert("x /* note to self */");
        assert!(flow.contains("<creator>unknown</creator>"));
    }

    #[test]
    fn comment_at_start_of_body_is_converted() {
        let flow = convert("/* leading */ text");
        assert!(flow.contains("<comment>"));
    }
}

//! HTML fragment → rich text runs for spreadsheet cells
//!
//! Step text from test management tools is stored as small HTML fragments
//! (`<DIV><P>Click <B>Save</B></P></DIV>`). Cells only need inline styling
//! and line breaks, so everything else is dropped.

use crate::error::{ExportError, ExportResult};
use regex::{Captures, Regex};

/// Inline style of a run of text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl SpanStyle {
    pub fn is_plain(&self) -> bool {
        !self.bold && !self.italic && !self.underline
    }
}

/// A run of text sharing one style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

/// Styled cell text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichText {
    spans: Vec<Span>,
}

impl RichText {
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// True when no run carries any styling
    pub fn is_plain(&self) -> bool {
        self.spans.iter().all(|s| s.style.is_plain())
    }

    /// Text with styling removed
    pub fn plain(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    fn append(&mut self, text: &str, style: SpanStyle) {
        if text.is_empty() {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.spans.push(Span {
                text: text.to_string(),
                style,
            }),
        }
    }
}

/// Converts HTML fragments to [`RichText`]
pub struct HtmlRenderer {
    tag: Regex,
    entity: Regex,
}

impl HtmlRenderer {
    pub fn new() -> ExportResult<Self> {
        let tag = Regex::new(r"<(/)?([A-Za-z][A-Za-z0-9]*)\b[^>]*?(/)?>")
            .map_err(|e| ExportError::Export(format!("Regex error: {}", e)))?;
        let entity = Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z]+);")
            .map_err(|e| ExportError::Export(format!("Regex error: {}", e)))?;
        Ok(Self { tag, entity })
    }

    /// Render `input`; text without tags or entities comes back as one plain run.
    ///
    /// Source indentation between block-level tags (whitespace containing a
    /// newline) is layout, not content, and is dropped.
    pub fn render(&self, input: &str) -> RichText {
        let mut state = RenderState::default();
        let mut last = 0;
        // the start of the fragment counts as a line boundary
        let mut after_boundary = true;

        for caps in self.tag.captures_iter(input) {
            let Some(whole) = caps.get(0) else { continue };
            let name = caps[2].to_ascii_lowercase();
            let boundary = breaks_line(&name);

            let chunk = &input[last..whole.start()];
            if !(is_layout_whitespace(chunk) && (after_boundary || boundary)) {
                state.push_text(&self.decode_entities(chunk));
            }
            last = whole.end();

            let closing = caps.get(1).is_some();
            let self_closing = caps.get(3).is_some();
            state.apply_tag(&name, closing, self_closing);
            after_boundary = boundary;
        }

        let tail = &input[last..];
        if !(is_layout_whitespace(tail) && after_boundary) {
            state.push_text(&self.decode_entities(tail));
        }

        state.out
    }

    fn decode_entities(&self, text: &str) -> String {
        if !text.contains('&') {
            return text.to_string();
        }
        self.entity
            .replace_all(text, |caps: &Captures| {
                decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

fn decode_entity(name: &str) -> Option<String> {
    let decoded = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)?
        }
    };
    Some(decoded.to_string())
}

#[derive(Default)]
struct RenderState {
    out: RichText,
    bold: usize,
    italic: usize,
    underline: usize,
    pending_breaks: usize,
}

impl RenderState {
    fn style(&self) -> SpanStyle {
        SpanStyle {
            bold: self.bold > 0,
            italic: self.italic > 0,
            underline: self.underline > 0,
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        // breaks before the first text are dropped, breaks after the last never land
        if !self.out.is_empty() && self.pending_breaks > 0 {
            let breaks = "\n".repeat(self.pending_breaks);
            self.out.append(&breaks, self.style());
        }
        self.pending_breaks = 0;
        self.out.append(text, self.style());
    }

    fn apply_tag(&mut self, name: &str, closing: bool, self_closing: bool) {
        match name {
            "b" | "strong" => adjust(&mut self.bold, closing, self_closing),
            "i" | "em" => adjust(&mut self.italic, closing, self_closing),
            "u" | "ins" => adjust(&mut self.underline, closing, self_closing),
            "br" => self.pending_breaks += 1,
            block if is_block(block) => self.pending_breaks = self.pending_breaks.max(1),
            _ => {}
        }
    }
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "div" | "li" | "tr" | "ul" | "ol" | "table" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
    )
}

fn breaks_line(name: &str) -> bool {
    name == "br" || is_block(name)
}

fn is_layout_whitespace(text: &str) -> bool {
    text.contains('\n') && text.trim().is_empty()
}

fn adjust(depth: &mut usize, closing: bool, self_closing: bool) {
    if self_closing {
        return;
    }
    if closing {
        *depth = depth.saturating_sub(1);
    } else {
        *depth += 1;
    }
}

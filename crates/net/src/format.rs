//! In-band color and style markup used in player names and log lines.
//!
//! Two spellings are accepted and behave identically: the legacy section-sign code
//! (`§c`) and a named token (`{red}`). Both are case-insensitive.

/// Prefix character of legacy codes.
pub const CODE_PREFIX: char = '\u{a7}';

/// One of the sixteen palette colors.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    DarkBlue,
    DarkGreen,
    DarkAqua,
    DarkRed,
    DarkPurple,
    Gold,
    Gray,
    DarkGray,
    Blue,
    Green,
    Aqua,
    Red,
    LightPurple,
    Yellow,
    White,
}

impl Color {
    /// All colors, indexed by their legacy hex digit.
    pub const ALL: [Color; 16] = [
        Color::Black,
        Color::DarkBlue,
        Color::DarkGreen,
        Color::DarkAqua,
        Color::DarkRed,
        Color::DarkPurple,
        Color::Gold,
        Color::Gray,
        Color::DarkGray,
        Color::Blue,
        Color::Green,
        Color::Aqua,
        Color::Red,
        Color::LightPurple,
        Color::Yellow,
        Color::White,
    ];

    /// Token name, as written between braces.
    pub fn name(self) -> &'static str {
        match self {
            Color::Black => "black",
            Color::DarkBlue => "dark_blue",
            Color::DarkGreen => "dark_green",
            Color::DarkAqua => "dark_aqua",
            Color::DarkRed => "dark_red",
            Color::DarkPurple => "dark_purple",
            Color::Gold => "gold",
            Color::Gray => "gray",
            Color::DarkGray => "dark_gray",
            Color::Blue => "blue",
            Color::Green => "green",
            Color::Aqua => "aqua",
            Color::Red => "red",
            Color::LightPurple => "light_purple",
            Color::Yellow => "yellow",
            Color::White => "white",
        }
    }

    /// Short CSS hex form.
    pub fn css(self) -> &'static str {
        match self {
            Color::Black => "#000",
            Color::DarkBlue => "#00A",
            Color::DarkGreen => "#0A0",
            Color::DarkAqua => "#0AA",
            Color::DarkRed => "#A00",
            Color::DarkPurple => "#A0A",
            Color::Gold => "#FA0",
            Color::Gray => "#AAA",
            Color::DarkGray => "#555",
            Color::Blue => "#55F",
            Color::Green => "#5F5",
            Color::Aqua => "#5FF",
            Color::Red => "#F55",
            Color::LightPurple => "#F5F",
            Color::Yellow => "#FF5",
            Color::White => "#FFF",
        }
    }

    /// 24-bit RGB value.
    pub fn rgb(self) -> [u8; 3] {
        let hex = &self.css().as_bytes()[1..];
        let mut out = [0u8; 3];
        for (channel, digit) in out.iter_mut().zip(hex) {
            let nibble = (*digit as char).to_digit(16).unwrap_or(0) as u8;
            *channel = nibble * 17;
        }
        out
    }
}

/// A directive recognized in markup text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    /// Open a colored span.
    Color(Color),
    /// Open a bold span.
    Bold,
    /// Close the innermost open span.
    Reset,
    /// Legacy code with no visible effect; removed from output.
    Ignored,
}

impl Code {
    /// Resolve the character following [`CODE_PREFIX`].
    pub fn from_legacy(c: char) -> Option<Code> {
        let c = c.to_ascii_lowercase();
        if let Some(index) = c.to_digit(16) {
            return Some(Code::Color(Color::ALL[index as usize]));
        }
        match c {
            'l' | 'm' => Some(Code::Bold),
            'r' => Some(Code::Reset),
            'k' | 'n' | 'o' => Some(Code::Ignored),
            _ => None,
        }
    }

    /// Resolve a `{name}` token (without braces).
    pub fn from_token(name: &str) -> Option<Code> {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "bold" => Some(Code::Bold),
            "normal" => Some(Code::Reset),
            _ => Color::ALL
                .iter()
                .find(|color| color.name() == name)
                .map(|color| Code::Color(*color)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece<'a> {
    Text(&'a str),
    Code(Code),
}

/// Longest token name (`light_purple`), bounding the brace lookahead.
const MAX_TOKEN_LEN: usize = 12;

fn match_code(rest: &str) -> Option<(Code, usize)> {
    let mut chars = rest.chars();
    match chars.next()? {
        CODE_PREFIX => {
            let next = chars.next()?;
            let code = Code::from_legacy(next)?;
            Some((code, CODE_PREFIX.len_utf8() + next.len_utf8()))
        }
        '{' => {
            let close = rest
                .char_indices()
                .take(MAX_TOKEN_LEN + 2)
                .find(|(_, c)| *c == '}')
                .map(|(i, _)| i)?;
            let code = Code::from_token(&rest[1..close])?;
            Some((code, close + 1))
        }
        _ => None,
    }
}

fn pieces(text: &str) -> Vec<Piece<'_>> {
    let mut out = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;
    while pos < text.len() {
        let rest = &text[pos..];
        if let Some((code, len)) = match_code(rest) {
            if literal_start < pos {
                out.push(Piece::Text(&text[literal_start..pos]));
            }
            out.push(Piece::Code(code));
            pos += len;
            literal_start = pos;
        } else {
            pos += rest.chars().next().map_or(1, char::len_utf8);
        }
    }
    if literal_start < text.len() {
        out.push(Piece::Text(&text[literal_start..]));
    }
    out
}

fn span_open(code: Code) -> Option<String> {
    match code {
        Code::Color(color) => Some(format!("<span style='color:{}'>", color.css())),
        Code::Bold => Some("<span style='font-weight:bold'>".to_string()),
        Code::Reset | Code::Ignored => None,
    }
}

fn render_with(text: &str, mut literal: impl FnMut(&mut String, &str)) -> String {
    let mut out = String::with_capacity(text.len());
    let mut open = 0usize;
    for piece in pieces(text) {
        match piece {
            Piece::Text(s) => literal(&mut out, s),
            Piece::Code(Code::Reset) => {
                if open > 0 {
                    out.push_str("</span>");
                    open -= 1;
                }
            }
            Piece::Code(code) => {
                if let Some(tag) = span_open(code) {
                    out.push_str(&tag);
                    open += 1;
                }
            }
        }
    }
    for _ in 0..open {
        out.push_str("</span>");
    }
    out
}

/// Translate markup into an HTML fragment of nested `<span>` elements.
///
/// Literal text is copied verbatim. Spans still open at the end are closed.
pub fn render(text: &str) -> String {
    render_with(text, |out, s| out.push_str(s))
}

/// Like [`render`], but HTML-escapes literal text first.
pub fn render_escaped(text: &str) -> String {
    render_with(text, |out, s| {
        for c in s.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#39;"),
                _ => out.push(c),
            }
        }
    })
}

fn strip_once(text: &str) -> String {
    pieces(text)
        .into_iter()
        .filter_map(|piece| match piece {
            Piece::Text(s) => Some(s),
            Piece::Code(_) => None,
        })
        .collect()
}

/// Remove every recognized code, leaving plain text.
///
/// Removal can splice a new code together (`{re{red}d}`), so it repeats until stable.
pub fn strip(text: &str) -> String {
    let mut current = strip_once(text);
    loop {
        let next = strip_once(&current);
        if next.len() == current.len() {
            return current;
        }
        current = next;
    }
}

/// A run of text with its effective style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    /// Literal text.
    pub text: String,
    /// Innermost open color, if any.
    pub color: Option<Color>,
    /// Whether any enclosing span is bold.
    pub bold: bool,
}

/// Resolve markup into flat styled runs, for front-ends that do not speak HTML.
pub fn spans(text: &str) -> Vec<StyledSpan> {
    let mut stack: Vec<Code> = Vec::new();
    let mut out = Vec::new();
    for piece in pieces(text) {
        match piece {
            Piece::Text(s) => {
                let color = stack.iter().rev().find_map(|code| match code {
                    Code::Color(color) => Some(*color),
                    _ => None,
                });
                let bold = stack.contains(&Code::Bold);
                out.push(StyledSpan {
                    text: s.to_string(),
                    color,
                    bold,
                });
            }
            Piece::Code(Code::Reset) => {
                stack.pop();
            }
            Piece::Code(Code::Ignored) => {}
            Piece::Code(code) => stack.push(code),
        }
    }
    out
}

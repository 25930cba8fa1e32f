//! Tokenizer for Slack's inline reference markup.
//!
//! Message text arrives with references escaped as `<...>` spans:
//! `<@U123>` or `<@U123|label>` for users, `<#C123|general>` for channels,
//! `<!here>` for broadcasts, and `<https://...|label>` for links. Literal
//! angle brackets are sent as `&lt;`/`&gt;`, so every `<` opens a reference.

/// One piece of tokenized message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    User { id: &'a str, label: Option<&'a str> },
    Channel { id: &'a str, label: Option<&'a str> },
    /// `here`, `channel`, `everyone`, or a `subteam^...` group reference.
    Broadcast(&'a str),
    Link { url: &'a str, label: Option<&'a str> },
}

/// Iterator over the segments of a message text.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    rest: &'a str,
}

pub fn tokenize(text: &str) -> Tokens<'_> {
    Tokens { rest: text }
}

/// User ids referenced in `text`, in order of appearance (duplicates kept).
pub fn mentions(text: &str) -> impl Iterator<Item = &str> {
    tokenize(text).filter_map(|segment| match segment {
        Segment::User { id, .. } => Some(id),
        _ => None,
    })
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        if self.rest.is_empty() {
            return None;
        }

        let Some(open) = self.rest.find('<') else {
            let text = self.rest;
            self.rest = "";
            return Some(Segment::Text(text));
        };

        if open > 0 {
            let text = &self.rest[..open];
            self.rest = &self.rest[open..];
            return Some(Segment::Text(text));
        }

        // Unterminated reference: the remainder is plain text.
        let Some(close) = self.rest.find('>') else {
            let text = self.rest;
            self.rest = "";
            return Some(Segment::Text(text));
        };

        let raw = &self.rest[..=close];
        let inner = &self.rest[1..close];
        self.rest = &self.rest[close + 1..];

        Some(classify(inner).unwrap_or(Segment::Text(raw)))
    }
}

fn classify(inner: &str) -> Option<Segment<'_>> {
    let (target, label) = match inner.split_once('|') {
        Some((target, label)) => (target, Some(label)),
        None => (inner, None),
    };

    let segment = if let Some(id) = target.strip_prefix('@') {
        Segment::User { id, label }
    } else if let Some(id) = target.strip_prefix('#') {
        Segment::Channel { id, label }
    } else if let Some(kind) = target.strip_prefix('!') {
        Segment::Broadcast(kind)
    } else {
        Segment::Link { url: target, label }
    };

    let empty = match segment {
        Segment::User { id, .. } | Segment::Channel { id, .. } => id.is_empty(),
        Segment::Broadcast(kind) => kind.is_empty(),
        Segment::Link { url, .. } => url.is_empty(),
        Segment::Text(_) => false,
    };
    (!empty).then_some(segment)
}

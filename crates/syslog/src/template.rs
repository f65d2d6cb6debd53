//! Rendering of a syslog line from a small placeholder template.
//!
//! Deliberately hand-rolled rather than built on a templating crate: the
//! field set is fixed and known up front, so a parse-once/substitute-many
//! walk over literal/placeholder segments is both simpler and allocates
//! less than a general template engine.

/// Default template, matching the historical `<PRIVAL>TIMESTAMP GROUP[STREAM]: MSG`
/// framing.
pub const DEFAULT_TEMPLATE: &str = "<{PRIVAL}>{TIMESTAMP} {GROUP}[{STREAM}]: {MSG}";

/// The fields a template placeholder can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Prival,
    Hostname,
    Procid,
    Msgid,
    Group,
    Stream,
    Tag,
    Msg,
    Timestamp,
    Source,
}

impl Field {
    fn parse(name: &str) -> Option<Field> {
        Some(match name {
            "PRIVAL" => Field::Prival,
            "HOSTNAME" => Field::Hostname,
            "PROCID" => Field::Procid,
            "MSGID" => Field::Msgid,
            "GROUP" => Field::Group,
            "STREAM" => Field::Stream,
            "TAG" => Field::Tag,
            "MSG" => Field::Msg,
            "TIMESTAMP" => Field::Timestamp,
            "SOURCE" => Field::Source,
            _ => return None,
        })
    }
}

enum Segment {
    Literal(String),
    Field(Field),
}

/// A parsed template, ready to render many lines without re-parsing.
pub struct Template {
    segments: Vec<Segment>,
}

/// Error returned when a template references an unknown placeholder.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown template placeholder {{{0}}}")]
pub struct TemplateError(pub String);

impl Template {
    /// Parses `format`, where `{NAME}` is a placeholder and any other text
    /// is emitted literally. A trailing newline is appended if absent.
    pub fn parse(format: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = format.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch == '{' {
                let mut name = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == '}' {
                        closed = true;
                        break;
                    }
                    name.push(next);
                }
                if !closed {
                    literal.push('{');
                    literal.push_str(&name);
                    continue;
                }
                let field = Field::parse(&name).ok_or(TemplateError(name))?;
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Field(field));
            } else {
                literal.push(ch);
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        if !matches!(segments.last(), Some(Segment::Literal(s)) if s.ends_with('\n')) {
            segments.push(Segment::Literal("\n".to_string()));
        }

        Ok(Self { segments })
    }

    /// Renders one line for `fields` into `out`, without a trailing
    /// allocation for the whole line.
    pub fn render(&self, out: &mut String, fields: &RenderFields<'_>) {
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Field(Field::Prival) => {
                    out.push_str(&fields.prival.to_string());
                }
                Segment::Field(Field::Hostname) => out.push_str(or_dash(fields.hostname)),
                Segment::Field(Field::Procid) => match fields.procid {
                    0 => out.push('-'),
                    pid => out.push_str(&pid.to_string()),
                },
                Segment::Field(Field::Msgid) => out.push_str(or_dash(fields.msgid)),
                Segment::Field(Field::Group) => out.push_str(fields.group),
                Segment::Field(Field::Stream) => out.push_str(fields.stream),
                Segment::Field(Field::Tag) => out.push_str(fields.tag),
                Segment::Field(Field::Msg) => out.push_str(fields.msg),
                Segment::Field(Field::Timestamp) => out.push_str(fields.timestamp),
                Segment::Field(Field::Source) => out.push_str(fields.source),
            }
        }
    }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

/// The per-message values substituted into a [`Template`].
pub struct RenderFields<'a> {
    pub prival: u8,
    pub hostname: &'a str,
    pub procid: u32,
    pub msgid: &'a str,
    pub group: &'a str,
    pub stream: &'a str,
    pub tag: &'a str,
    pub msg: &'a str,
    pub timestamp: &'a str,
    pub source: &'a str,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_template_renders_expected_framing() {
        let tpl = Template::parse(DEFAULT_TEMPLATE).unwrap();
        let mut out = String::new();
        tpl.render(
            &mut out,
            &RenderFields {
                prival: 14,
                hostname: "",
                procid: 0,
                msgid: "",
                group: "billing",
                stream: "worker-1",
                tag: "",
                msg: "payment processed",
                timestamp: "Jan  2 03:04:05",
                source: "",
            },
        );
        assert_eq!(out, "<14>Jan  2 03:04:05 billing[worker-1]: payment processed\n");
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        assert!(Template::parse("{NOPE}").is_err());
    }

    #[test]
    fn missing_hostname_and_procid_render_as_dash() {
        let tpl = Template::parse("{HOSTNAME} {PROCID} {MSGID}").unwrap();
        let mut out = String::new();
        tpl.render(
            &mut out,
            &RenderFields {
                prival: 0,
                hostname: "",
                procid: 0,
                msgid: "",
                group: "g",
                stream: "s",
                tag: "",
                msg: "",
                timestamp: "",
                source: "",
            },
        );
        assert_eq!(out, "- - -\n");
    }
}

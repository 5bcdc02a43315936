//! Tool directive grammar
//!
//! A directive is embedded in free-form model text as
//! `[TOOL:<NAME>:<argument>]`. NAME is a word (case-insensitive) and the
//! argument runs to the first `]` on the same line. Only the first
//! well-formed directive in a reply is acted on.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static DIRECTIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[TOOL:(\w+):([^\]\n]+)\]").expect("directive pattern is valid")
});

static DIRECTIVE_OPENER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[TOOL:").expect("opener pattern is valid"));

/// The fixed set of side-effecting tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Search,
    ReadFile,
    WriteFile,
    Execute,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::Search,
        ToolKind::ReadFile,
        ToolKind::WriteFile,
        ToolKind::Execute,
    ];

    /// Directive name, as written inside `[TOOL:...]`
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Search => "SEARCH",
            ToolKind::ReadFile => "READFILE",
            ToolKind::WriteFile => "WRITEFILE",
            ToolKind::Execute => "EXECUTE",
        }
    }

    pub fn from_name(name: &str) -> Option<ToolKind> {
        ToolKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A recognized tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub kind: ToolKind,
    pub argument: String,
}

impl ToolCall {
    pub fn new(kind: ToolKind, argument: impl Into<String>) -> Self {
        Self {
            kind,
            argument: argument.into(),
        }
    }
}

impl fmt::Display for ToolCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[TOOL:{}:{}]", self.kind, self.argument)
    }
}

/// Why a directive could not be turned into a [`ToolCall`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Malformed {
    /// Well-formed syntax naming a tool that does not exist
    UnknownTool { name: String },
    /// `[TOOL:` with no parsable name/argument/closing bracket
    InvalidSyntax,
}

/// Outcome of scanning a reply for a directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// No directive syntax in the text
    None,
    Call(ToolCall),
    Malformed(Malformed),
}

impl Directive {
    /// Scan `text` for the first directive.
    ///
    /// The first well-formed `[TOOL:NAME:arg]` wins even if an earlier
    /// fragment is broken; a text with only broken fragments is
    /// [`Directive::Malformed`].
    pub fn parse(text: &str) -> Directive {
        if let Some(caps) = DIRECTIVE_PATTERN.captures(text) {
            let name = &caps[1];
            let argument = &caps[2];
            return match ToolKind::from_name(name) {
                Some(kind) => Directive::Call(ToolCall::new(kind, argument)),
                None => Directive::Malformed(Malformed::UnknownTool {
                    name: name.to_ascii_uppercase(),
                }),
            };
        }
        if DIRECTIVE_OPENER.is_match(text) {
            Directive::Malformed(Malformed::InvalidSyntax)
        } else {
            Directive::None
        }
    }

    /// True when the reply should take the tool path
    pub fn is_present(&self) -> bool {
        !matches!(self, Directive::None)
    }

    /// Short description for logs and the activity panel
    pub fn label(&self) -> String {
        match self {
            Directive::None => "none".to_string(),
            Directive::Call(call) => call.to_string(),
            Directive::Malformed(Malformed::UnknownTool { name }) => format!("[TOOL:{name}:?]"),
            Directive::Malformed(Malformed::InvalidSyntax) => "[TOOL:?]".to_string(),
        }
    }
}

/// Find the first well-formed directive span, for highlighting
pub fn find_span(text: &str) -> Option<std::ops::Range<usize>> {
    DIRECTIVE_PATTERN.find(text).map(|m| m.range())
}

/// Remove every well-formed directive from `text`
pub fn strip(text: &str) -> String {
    DIRECTIVE_PATTERN.replace_all(text, "").into_owned()
}

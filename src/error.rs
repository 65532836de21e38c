//! Configuration errors raised when an element is declared or mounted

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in document source text
pub type Span = std::ops::Range<usize>;

/// A declaration that cannot be laid out.
///
/// These are fatal: the mount that raised one does not register anything.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("element '{element}' does not declare a layout type (expected one of Node, Group, Link)")]
    MissingType { element: String, span: Option<Span> },

    #[error("element '{element}' declares invalid layout type '{found}' (expected one of Node, Group, Link)")]
    InvalidType {
        element: String,
        found: String,
        span: Option<Span>,
    },

    #[error("element '{element}' of type Node must define a positive numeric width, found {}", describe(.found))]
    InvalidWidth {
        element: String,
        found: Option<f64>,
        span: Option<Span>,
    },

    #[error("element '{element}' of type Node must define a positive numeric height, found {}", describe(.found))]
    InvalidHeight {
        element: String,
        found: Option<f64>,
        span: Option<Span>,
    },

    #[error("invalid layout id '{id}': ids must be non-empty and must not contain '.'")]
    InvalidLayoutId { id: String, span: Option<Span> },

    #[error("element '{element}' declares invalid terminal name '{name}': names must be non-empty and must not contain '.'")]
    InvalidTerminalName {
        element: String,
        name: String,
        span: Option<Span>,
    },

    #[error("element '{element}' declares terminal '{name}' more than once")]
    DuplicateTerminal {
        element: String,
        name: String,
        span: Option<Span>,
    },

    #[error("terminal '{terminal}' of element '{element}' has invalid {field}: {value}")]
    InvalidTerminalGeometry {
        element: String,
        terminal: String,
        field: &'static str,
        value: f64,
        span: Option<Span>,
    },

    #[error("element '{element}' is nested under '{parent}', which is not a mounted group")]
    UnknownParent {
        element: String,
        parent: String,
        span: Option<Span>,
    },

    #[error("element '{key}' is declared more than once")]
    DuplicateElement { key: String, span: Option<Span> },

    #[error("invalid document: {message}")]
    Document { message: String, span: Option<Span> },
}

fn describe(value: &Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "nothing".to_string(),
    }
}

impl ConfigError {
    /// Source span of the offending declaration, if known
    pub fn span(&self) -> Option<&Span> {
        match self {
            Self::MissingType { span, .. }
            | Self::InvalidType { span, .. }
            | Self::InvalidWidth { span, .. }
            | Self::InvalidHeight { span, .. }
            | Self::InvalidLayoutId { span, .. }
            | Self::InvalidTerminalName { span, .. }
            | Self::DuplicateTerminal { span, .. }
            | Self::InvalidTerminalGeometry { span, .. }
            | Self::UnknownParent { span, .. }
            | Self::DuplicateElement { span, .. }
            | Self::Document { span, .. } => span.as_ref(),
        }
    }

    /// Attach a source span, keeping an existing one
    pub fn with_span(mut self, at: Span) -> Self {
        let slot = match &mut self {
            Self::MissingType { span, .. }
            | Self::InvalidType { span, .. }
            | Self::InvalidWidth { span, .. }
            | Self::InvalidHeight { span, .. }
            | Self::InvalidLayoutId { span, .. }
            | Self::InvalidTerminalName { span, .. }
            | Self::DuplicateTerminal { span, .. }
            | Self::InvalidTerminalGeometry { span, .. }
            | Self::UnknownParent { span, .. }
            | Self::DuplicateElement { span, .. }
            | Self::Document { span, .. } => span,
        };
        if slot.is_none() {
            *slot = Some(at);
        }
        self
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let message = self.to_string();
        let Some(span) = self.span() else {
            return format!("Error: {}", message);
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(&message)
            .with_label(
                Label::new((filename, span.clone()))
                    .with_message(&message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => format!("Error: {}", message),
        }
    }
}

//! Configuration for SVG rendering

/// Configuration options for SVG output
#[derive(Debug, Clone)]
pub struct SvgConfig {
    /// Padding around the viewBox
    pub viewbox_padding: f64,

    /// Whether to include XML declaration and standalone attributes
    pub standalone: bool,

    /// Whether to format output with indentation
    pub pretty_print: bool,

    /// Prefix for CSS class names (e.g., "df-" for "df-node")
    pub class_prefix: Option<String>,

    /// Stroke colour of links
    pub link_color: String,

    /// Stroke width of links
    pub link_width: f64,

    /// Space between a group's outline and its nodes
    pub group_padding: f64,
}

impl Default for SvgConfig {
    fn default() -> Self {
        Self {
            viewbox_padding: 20.0,
            standalone: true,
            pretty_print: true,
            class_prefix: Some("df-".to_string()),
            link_color: "red".to_string(),
            link_width: 2.0,
            group_padding: 10.0,
        }
    }
}

impl SvgConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the viewBox padding
    pub fn with_viewbox_padding(mut self, padding: f64) -> Self {
        self.viewbox_padding = padding;
        self
    }

    /// Set whether output is standalone
    pub fn with_standalone(mut self, standalone: bool) -> Self {
        self.standalone = standalone;
        self
    }

    /// Set whether to pretty-print output
    pub fn with_pretty_print(mut self, pretty: bool) -> Self {
        self.pretty_print = pretty;
        self
    }

    /// Set the CSS class prefix
    pub fn with_class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_prefix = Some(prefix.into());
        self
    }

    /// Remove the CSS class prefix
    pub fn without_class_prefix(mut self) -> Self {
        self.class_prefix = None;
        self
    }

    /// Set the link stroke
    pub fn with_link_stroke(mut self, color: impl Into<String>, width: f64) -> Self {
        self.link_color = color.into();
        self.link_width = width;
        self
    }
}

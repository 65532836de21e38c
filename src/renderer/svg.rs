//! SVG generation from solved layouts

use crate::layout::{BoundingBox, LayoutSnapshot, Point, SolvedLayout, TerminalRole};

use super::SvgConfig;

/// Build SVG elements incrementally
pub struct SvgBuilder {
    config: SvgConfig,
    groups: Vec<String>,
    elements: Vec<String>,
    links: Vec<String>,
    indent: usize,
}

impl SvgBuilder {
    /// Create a new SVG builder
    pub fn new(config: SvgConfig) -> Self {
        Self {
            config,
            groups: vec![],
            elements: vec![],
            links: vec![],
            indent: 1,
        }
    }

    fn prefix(&self) -> String {
        self.config.class_prefix.clone().unwrap_or_default()
    }

    fn indent_str(&self) -> String {
        if self.config.pretty_print {
            "  ".repeat(self.indent)
        } else {
            String::new()
        }
    }

    fn newline(&self) -> &str {
        if self.config.pretty_print {
            "\n"
        } else {
            ""
        }
    }

    /// Add a rectangle for a node or terminal
    pub fn add_rect(&mut self, id: Option<&str>, bounds: &BoundingBox, class: &str) {
        let prefix = self.prefix();
        let id_attr = id
            .map(|i| format!(r#" id="{}""#, escape_xml(i)))
            .unwrap_or_default();

        self.elements.push(format!(
            r#"{}<rect{} class="{}{}" x="{}" y="{}" width="{}" height="{}"/>"#,
            self.indent_str(),
            id_attr,
            prefix,
            class,
            num(bounds.x),
            num(bounds.y),
            num(bounds.width),
            num(bounds.height),
        ));
    }

    /// Add a label centred on `at`
    pub fn add_label(&mut self, text: &str, at: Point) {
        let prefix = self.prefix();
        self.elements.push(format!(
            r#"{}<text class="{}label" x="{}" y="{}" text-anchor="middle" dominant-baseline="middle">{}</text>"#,
            self.indent_str(),
            prefix,
            num(at.x),
            num(at.y),
            escape_xml(text)
        ));
    }

    /// Add the dashed outline of a group
    pub fn add_group_outline(&mut self, id: &str, bounds: &BoundingBox) {
        let prefix = self.prefix();
        let pad = self.config.group_padding;
        self.groups.push(format!(
            r#"{}<rect id="{}" class="{}group" x="{}" y="{}" width="{}" height="{}" fill="none" stroke="gray" stroke-dasharray="4 2"/>"#,
            self.indent_str(),
            escape_xml(id),
            prefix,
            num(bounds.x - pad),
            num(bounds.y - pad),
            num(bounds.width + 2.0 * pad),
            num(bounds.height + 2.0 * pad),
        ));
    }

    /// Add a link curve between two points
    pub fn add_link(&mut self, from: Point, to: Point) {
        let prefix = self.prefix();
        self.links.push(format!(
            r#"{}<path class="{}link" d="{}" fill="none" stroke="{}" stroke-width="{}"/>"#,
            self.indent_str(),
            prefix,
            link_path(from, to),
            escape_xml(&self.config.link_color),
            num(self.config.link_width),
        ));
    }

    /// Build the final SVG string
    pub fn build(self, viewbox: BoundingBox) -> String {
        let padding = self.config.viewbox_padding;
        let vb_x = viewbox.x - padding;
        let vb_y = viewbox.y - padding;
        let vb_w = viewbox.width + 2.0 * padding;
        let vb_h = viewbox.height + 2.0 * padding;

        let nl = self.newline();

        let mut svg = String::new();

        if self.config.standalone {
            svg.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
            svg.push_str(nl);
        }

        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{} {} {} {}">"#,
            num(vb_x),
            num(vb_y),
            num(vb_w),
            num(vb_h)
        ));
        svg.push_str(nl);

        // Group outlines sit below nodes, links on top
        for line in self.groups.iter().chain(&self.elements).chain(&self.links) {
            svg.push_str(line);
            svg.push_str(nl);
        }

        svg.push_str("</svg>");

        svg
    }
}

/// Cubic Bézier from `from` to `to` that leaves and enters horizontally
pub fn link_path(from: Point, to: Point) -> String {
    let dx = to.x - from.x;
    format!(
        "M {} {} C {} {} {} {} {} {}",
        num(from.x),
        num(from.y),
        num(from.x + dx * 0.25),
        num(to.y),
        num(from.x + dx * 0.85),
        num(to.y),
        num(to.x),
        num(to.y),
    )
}

/// Point where a link attaches to a node: its left edge, half way down
pub fn anchor(bounds: &BoundingBox) -> Point {
    Point::new(bounds.x, bounds.y + bounds.height / 2.0)
}

/// Render a solved layout; `snapshot` is the one the layout was solved from
pub fn render_svg(snapshot: &LayoutSnapshot, solved: &SolvedLayout, config: &SvgConfig) -> String {
    let mut builder = SvgBuilder::new(config.clone());

    for group in &solved.groups {
        builder.add_group_outline(group.key.as_str(), &group.bounds);
    }

    for (node, spec) in solved.nodes.iter().zip(&snapshot.nodes) {
        let class = match spec.terminal {
            None => "node",
            Some(TerminalRole::Inlet) => "inlet",
            Some(TerminalRole::Outlet) => "outlet",
        };
        builder.add_rect(Some(node.key.as_str()), &node.bounds, class);
        builder.add_label(
            node.key.leaf(),
            Point::new(
                node.bounds.x + node.bounds.width / 2.0,
                node.bounds.y + node.bounds.height / 2.0,
            ),
        );
    }

    for link in &solved.links {
        let (Some(source), Some(target)) = (solved.nodes.get(link.source), solved.nodes.get(link.target)) else {
            continue;
        };
        builder.add_link(anchor(&source.bounds), anchor(&target.bounds));
    }

    let mut bounds = solved.bounds().unwrap_or_default();
    for group in &solved.groups {
        let pad = config.group_padding;
        let outline = BoundingBox::new(
            group.bounds.x - pad,
            group.bounds.y - pad,
            group.bounds.width + 2.0 * pad,
            group.bounds.height + 2.0 * pad,
        );
        bounds = bounds.union(&outline);
    }
    builder.build(bounds)
}

/// Format a coordinate with at most two decimals
fn num(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    // avoid printing "-0"
    format!("{}", rounded + 0.0)
}

/// Escape special XML characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

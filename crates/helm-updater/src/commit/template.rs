//! Commit message templates.
//!
//! A template is plain text with `{{name}}` placeholders. The body of a
//! `{{#changes}} ... {{/changes}}` section is repeated once per change and
//! may use the per-change fields `file`, `key`, `old_value` and `new_value`.
//! A section tag directly followed by a newline swallows that newline, so
//! sections can sit on their own lines.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use thiserror::Error;

use crate::values::ChangeEntry;

/// Default template: one line per changed key.
pub const DEFAULT_COMMIT_TEMPLATE: &str = "automatic update of {{app_name}}
{{#changes}}
updates key {{key}} value from '{{old_value}}' to '{{new_value}}'
{{/changes}}
";

const SECTION: &str = "changes";
const BUILTINS: &[&str] = &["app_name", "change_count", "date"];
const CHANGE_FIELDS: &[&str] = &["file", "key", "old_value", "new_value"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder '{{{{{0}}}}}'")]
    UnknownPlaceholder(String),

    #[error("placeholder '{{{{{0}}}}}' is only available inside {{{{#changes}}}}")]
    OutsideSection(String),

    #[error("unknown section '{0}'")]
    UnknownSection(String),

    #[error("sections cannot be nested")]
    NestedSection,

    #[error("unbalanced section tags")]
    UnbalancedSection,
}

pub type Result<T> = std::result::Result<T, TemplateError>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Text(String),
    Builtin(String),
    Field(String),
    Changes(Vec<Node>),
}

/// A parsed commit message template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitTemplate {
    nodes: Vec<Node>,
}

static RE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([#/]?)\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap()
});

impl CommitTemplate {
    /// Parses and validates a template.
    pub fn parse(source: &str) -> Result<Self> {
        let mut nodes = Vec::new();
        // body of the currently open section, if any
        let mut section: Option<Vec<Node>> = None;
        let mut last = 0;

        for caps in RE_TAG.captures_iter(source) {
            let whole = caps.get(0).expect("group 0 always matches");
            let sigil = &caps[1];
            let name = caps[2].to_string();

            let target = section.as_mut().unwrap_or(&mut nodes);
            if whole.start() > last {
                target.push(Node::Text(source[last..whole.start()].to_string()));
            }
            last = whole.end();

            match sigil {
                "#" | "/" => {
                    if name != SECTION {
                        return Err(TemplateError::UnknownSection(name));
                    }
                    if source[last..].starts_with('\n') {
                        last += 1;
                    }
                    if sigil == "#" {
                        if section.is_some() {
                            return Err(TemplateError::NestedSection);
                        }
                        section = Some(Vec::new());
                    } else {
                        let body = section.take().ok_or(TemplateError::UnbalancedSection)?;
                        nodes.push(Node::Changes(body));
                    }
                }
                _ => {
                    let node = if BUILTINS.contains(&name.as_str()) {
                        Node::Builtin(name)
                    } else if CHANGE_FIELDS.contains(&name.as_str()) {
                        if section.is_none() {
                            return Err(TemplateError::OutsideSection(name));
                        }
                        Node::Field(name)
                    } else {
                        return Err(TemplateError::UnknownPlaceholder(name));
                    };
                    section.as_mut().unwrap_or(&mut nodes).push(node);
                }
            }
        }

        if section.is_some() {
            return Err(TemplateError::UnbalancedSection);
        }
        if last < source.len() {
            nodes.push(Node::Text(source[last..].to_string()));
        }

        Ok(Self { nodes })
    }

    /// Renders the template for `app_name` and `changes`, dated now.
    pub fn render(&self, app_name: &str, changes: &[ChangeEntry]) -> String {
        self.render_at(app_name, changes, Utc::now())
    }

    pub fn render_at(&self, app_name: &str, changes: &[ChangeEntry], now: DateTime<Utc>) -> String {
        let builtin = |name: &str| match name {
            "app_name" => app_name.to_string(),
            "change_count" => changes.len().to_string(),
            _ => now.format("%Y-%m-%d").to_string(),
        };

        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Builtin(name) => out.push_str(&builtin(name)),
                // rejected by parse
                Node::Field(_) => {}
                Node::Changes(body) => {
                    for change in changes {
                        for inner in body {
                            match inner {
                                Node::Text(text) => out.push_str(text),
                                Node::Builtin(name) => out.push_str(&builtin(name)),
                                Node::Field(name) => out.push_str(field(change, name)),
                                Node::Changes(_) => {}
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

fn field<'a>(change: &'a ChangeEntry, name: &str) -> &'a str {
    match name {
        "file" => &change.file,
        "key" => &change.key,
        "old_value" => &change.old_value,
        _ => &change.new_value,
    }
}

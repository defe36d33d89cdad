//! Text-level edits of block-style YAML.
//!
//! Only the bytes of the target scalar change (or new lines are inserted for
//! missing mapping keys), so comments, quoting and layout elsewhere in the
//! document stay as they are. Flow collections, anchors, tags, block scalars
//! and multi-line scalars are not handled; `patch_scalar` returns `None` for
//! them and the caller re-serializes the document instead.

use serde_yaml::Value;

use super::path::{KeyPath, Segment};

/// A content line, with the byte column where its content starts.
///
/// The first line of a sequence item's mapping starts after the `- `.
#[derive(Debug, Clone, Copy)]
struct Slot {
    line: usize,
    col: usize,
}

#[derive(Debug)]
enum Edit {
    Replace {
        line: usize,
        start: usize,
        end: usize,
        text: String,
    },
    Insert {
        after: Option<usize>,
        lines: Vec<String>,
    },
}

impl Edit {
    fn apply(self, lines: &[&str]) -> String {
        let mut out: Vec<String> = lines.iter().map(|line| line.to_string()).collect();

        match self {
            Edit::Replace {
                line,
                start,
                end,
                text,
            } => out[line].replace_range(start..end, &text),
            Edit::Insert {
                after: Some(line),
                lines,
            } => {
                out.splice(line + 1..line + 1, lines);
            }
            Edit::Insert { after: None, lines } => {
                // keep the final newline last
                let at = match out.last() {
                    Some(last) if last.is_empty() => out.len() - 1,
                    _ => out.len(),
                };
                out.splice(at..at, lines);
            }
        }

        out.join("\n")
    }
}

/// Returns `content` with `key` set to the string `value`, or `None` when the
/// edit cannot be made in place.
pub(super) fn patch_scalar(content: &str, key: &KeyPath, value: &str) -> Option<String> {
    let rendered = render(value)?;
    let lines: Vec<&str> = content.split('\n').collect();
    let slots: Vec<Slot> = lines
        .iter()
        .enumerate()
        .filter_map(|(line, text)| content_slot(line, text))
        .collect();

    let column = slots.first().map_or(0, |slot| slot.col);
    let edit = locate(&lines, &slots, column, None, key.segments(), &rendered)?;
    Some(edit.apply(&lines))
}

/// Renders a string scalar on a single line, quoted when YAML needs it.
fn render(value: &str) -> Option<String> {
    let rendered = serde_yaml::to_string(&Value::String(value.to_string())).ok()?;
    let rendered = rendered.trim_end_matches('\n');
    if rendered.contains('\n') {
        None
    } else {
        Some(rendered.to_string())
    }
}

fn content_slot(line: usize, text: &str) -> Option<Slot> {
    let col = text.len() - text.trim_start_matches(' ').len();
    let body = text[col..].trim_end();

    let skip = body.is_empty()
        || body.starts_with('#')
        || (col == 0 && (body == "---" || body == "..." || body.starts_with('%')));
    (!skip).then_some(Slot { line, col })
}

fn text_at<'a>(lines: &[&'a str], slot: Slot) -> &'a str {
    &lines[slot.line][slot.col..]
}

fn leading_ws(text: &str) -> usize {
    text.len() - text.trim_start_matches([' ', '\t']).len()
}

fn is_item(text: &str) -> bool {
    text.strip_prefix('-')
        .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t', '\r']))
}

/// True when something other than a comment follows `at`.
fn has_inline_value(text: &str, at: usize) -> bool {
    let rest = text[at..].trim_end();
    !rest.is_empty() && !rest.starts_with('#')
}

/// Splits `key: value`, returning the key and the offset where the value
/// (or comment, or end of line) starts.
fn split_key(text: &str) -> Option<(String, usize)> {
    let first = *text.as_bytes().first()?;
    let (key, colon) = match first {
        b'"' | b'\'' => {
            let quote = first;
            let close = closing_quote(text, quote)?;
            let inner = &text[1..close];
            let key = match quote {
                b'\'' => inner.replace("''", "'"),
                _ if inner.contains('\\') => return None,
                _ => inner.to_string(),
            };
            let colon = close + 1 + leading_ws(&text[close + 1..]);
            if !text[colon..].starts_with(':') {
                return None;
            }
            (key, colon)
        }
        b'?' | b'&' | b'*' | b'!' | b'{' | b'[' | b'|' | b'>' | b'#' => return None,
        _ => {
            let colon = find_separator(text)?;
            (text[..colon].trim_end().to_string(), colon)
        }
    };

    let rest = &text[colon + 1..];
    if !(rest.is_empty() || rest.starts_with([' ', '\t', '\r'])) {
        return None;
    }
    Some((key, colon + 1 + leading_ws(rest)))
}

/// Position of the `:` ending a plain key.
fn find_separator(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    for (i, &byte) in bytes.iter().enumerate() {
        match byte {
            b':' if matches!(bytes.get(i + 1), None | Some(b' ' | b'\t' | b'\r')) => {
                return Some(i)
            }
            b'#' if i > 0 && matches!(bytes[i - 1], b' ' | b'\t') => return None,
            _ => {}
        }
    }
    None
}

/// Index of the quote closing the quoted scalar that starts `text`.
fn closing_quote(text: &str, quote: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if quote == b'"' => i += 2,
            b'\'' if quote == b'\'' && bytes.get(i + 1) == Some(&b'\'') => i += 2,
            byte if byte == quote => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// End of the single-line scalar starting at `start`.
fn scalar_end(text: &str, start: usize) -> Option<usize> {
    let value = &text[start..];
    match *value.as_bytes().first()? {
        quote @ (b'"' | b'\'') => closing_quote(value, quote).map(|close| start + close + 1),
        b'|' | b'>' | b'&' | b'*' | b'!' | b'{' | b'[' | b'%' | b'@' | b'`' => None,
        _ => {
            let end = [value.find(" #"), value.find("\t#")]
                .into_iter()
                .flatten()
                .min()
                .unwrap_or(value.len());
            Some(start + value[..end].trim_end().len())
        }
    }
}

/// Slots after `scope[index]` that belong to it.
fn children<'s>(
    lines: &[&str],
    scope: &'s [Slot],
    index: usize,
    column: usize,
    sequence_at_same_column: bool,
) -> &'s [Slot] {
    let tail = &scope[index + 1..];
    let end = tail
        .iter()
        .position(|slot| {
            slot.col < column
                || (slot.col == column
                    && !(sequence_at_same_column && is_item(text_at(lines, *slot))))
        })
        .unwrap_or(tail.len());
    &tail[..end]
}

fn locate(
    lines: &[&str],
    scope: &[Slot],
    column: usize,
    parent: Option<usize>,
    segments: &[Segment],
    rendered: &str,
) -> Option<Edit> {
    let (segment, rest) = segments.split_first()?;

    match segment {
        Segment::Key(name) => {
            let mut found = None;
            for (index, slot) in scope.iter().enumerate() {
                if slot.col != column {
                    continue;
                }
                let text = text_at(lines, *slot);
                if is_item(text) {
                    return None;
                }
                if let Some((key, value_at)) = split_key(text) {
                    if key == *name {
                        found = Some((index, slot.col + value_at));
                        break;
                    }
                }
            }

            match found {
                Some((index, value_at)) => {
                    let line = scope[index].line;
                    let inline = has_inline_value(lines[line], value_at);
                    let nested = children(lines, scope, index, column, true);
                    descend(lines, line, value_at, inline, nested, column + 2, rest, rendered)
                }
                None => {
                    let after = scope.last().map(|slot| slot.line).or(parent);
                    insert(after, column, segments, rendered)
                }
            }
        }
        Segment::Index(position) => {
            let items: Vec<usize> = (0..scope.len())
                .filter(|&i| scope[i].col == column)
                .collect();
            if items.iter().any(|&i| !is_item(text_at(lines, scope[i]))) {
                return None;
            }

            let index = *items.get(*position)?;
            let slot = scope[index];
            let text = text_at(lines, slot);
            let item_col = slot.col + 1 + leading_ws(&text[1..]);
            let nested = children(lines, scope, index, column, false);

            if !has_inline_value(lines[slot.line], item_col) {
                return descend(lines, slot.line, item_col, false, nested, column + 2, rest, rendered);
            }

            let item_text = &lines[slot.line][item_col..];
            if split_key(item_text).is_some() || is_item(item_text) {
                if rest.is_empty() {
                    return None;
                }
                let mut item_scope = vec![Slot {
                    line: slot.line,
                    col: item_col,
                }];
                item_scope.extend_from_slice(nested);
                return locate(lines, &item_scope, item_col, Some(slot.line), rest, rendered);
            }

            descend(lines, slot.line, item_col, true, nested, column + 2, rest, rendered)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn descend(
    lines: &[&str],
    line: usize,
    value_at: usize,
    inline: bool,
    nested: &[Slot],
    nested_col: usize,
    rest: &[Segment],
    rendered: &str,
) -> Option<Edit> {
    if rest.is_empty() {
        if !nested.is_empty() {
            return None;
        }
        return replace_scalar(lines[line], line, value_at, inline, rendered);
    }
    if inline {
        return None;
    }

    let column = nested.first().map_or(nested_col, |slot| slot.col);
    locate(lines, nested, column, Some(line), rest, rendered)
}

fn replace_scalar(text: &str, line: usize, start: usize, inline: bool, rendered: &str) -> Option<Edit> {
    if inline {
        let end = scalar_end(text, start)?;
        return Some(Edit::Replace {
            line,
            start,
            end,
            text: rendered.to_string(),
        });
    }

    // `key:` or `-` with no value yet, possibly followed by a comment
    let spaced = start > 0 && matches!(text.as_bytes()[start - 1], b' ' | b'\t');
    let commented = !text[start..].trim_end().is_empty();
    let text = format!(
        "{}{}{}",
        if spaced { "" } else { " " },
        rendered,
        if commented { " " } else { "" }
    );
    Some(Edit::Replace {
        line,
        start,
        end: start,
        text,
    })
}

fn insert(after: Option<usize>, column: usize, segments: &[Segment], rendered: &str) -> Option<Edit> {
    let mut lines = Vec::with_capacity(segments.len());

    for (depth, segment) in segments.iter().enumerate() {
        let Segment::Key(name) = segment else {
            return None;
        };
        let indent = " ".repeat(column + depth * 2);
        let key = render(name)?;
        if depth + 1 == segments.len() {
            lines.push(format!("{}{}: {}", indent, key, rendered));
        } else {
            lines.push(format!("{}{}:", indent, key));
        }
    }

    Some(Edit::Insert { after, lines })
}

//! Dependency list editing
//!
//! Removes references to dropped jobs from `needs:` declarations. Both the
//! flow form (`needs: [a, b]` or `needs: a`) and the block form
//!
//! ```yaml
//! needs:
//!   - a
//!   - b
//! ```
//!
//! are handled, as is a flow list spread over several lines. An emptied flow
//! list is left as written (`needs: []`). Trailing comments are not edited.

use std::borrow::Cow;
use std::collections::BTreeSet;

use regex::Regex;

/// Edits dependency declarations in place
#[derive(Debug, Clone)]
pub struct DependencyEditor {
    key: String,
    repeated_commas: Regex,
    leading_comma: Regex,
    trailing_comma: Regex,
}

impl DependencyEditor {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            repeated_commas: Regex::new(r",(\s*,)+").expect("static regex"),
            leading_comma: Regex::new(r"\[\s*,\s*").expect("static regex"),
            trailing_comma: Regex::new(r"\s*,\s*\]").expect("static regex"),
        }
    }

    /// Returns true if the line declares dependencies
    pub fn is_declaration(&self, line: &str) -> bool {
        !self.key.is_empty() && line.contains(self.key.as_str())
    }

    /// Returns true if the declaration's value continues as a block sequence
    /// on the following lines
    pub fn opens_block_list(&self, line: &str) -> bool {
        if !self.is_declaration(line) {
            return false;
        }
        let (value, _) = split_comment(self.value_of(line).1);
        value.trim().is_empty()
    }

    /// Returns true if the declaration opens a flow list (`[`) that is
    /// closed on a later line
    pub fn opens_flow_list(&self, line: &str) -> bool {
        if !self.is_declaration(line) {
            return false;
        }
        let (value, _) = split_comment(self.value_of(line).1);
        bracket_depth(value) > 0
    }

    /// Splits a declaration into the part up to and including the key, and
    /// the value that follows it
    fn value_of<'a>(&self, line: &'a str) -> (&'a str, &'a str) {
        match line.find(self.key.as_str()) {
            Some(pos) => line.split_at(pos + self.key.len()),
            None => (line, ""),
        }
    }

    /// Removes every dropped job name from a flow-form declaration. Trailing
    /// comments are left alone.
    pub fn edit<'a>(&self, line: &'a str, dropped: &BTreeSet<String>) -> Cow<'a, str> {
        if !self.is_declaration(line) || dropped.is_empty() {
            return Cow::Borrowed(line);
        }

        let (head, rest) = self.value_of(line);
        let (value, tail) = split_comment(rest);

        let Some(edited) = remove_all(value, dropped) else {
            return Cow::Borrowed(line);
        };

        let edited = self.repeated_commas.replace_all(&edited, ",");
        let edited = self.leading_comma.replace_all(&edited, "[");
        let edited = self.trailing_comma.replace_all(&edited, "]");

        Cow::Owned(format!("{}{}{}", head, edited, tail))
    }

    /// Removes dropped job names from a flow list spread over several lines.
    ///
    /// `lines[0]` is the declaration that opens the list; the rest are its
    /// continuation lines up to the closing `]`. Returns `None` when no
    /// dropped job is referenced, otherwise one entry per input line: the
    /// replacement text, or `None` for a line left with nothing but
    /// separators.
    pub fn edit_flow_lines(
        &self,
        lines: &[&str],
        dropped: &BTreeSet<String>,
    ) -> Option<Vec<Option<String>>> {
        let mut heads = Vec::with_capacity(lines.len());
        let mut values = Vec::with_capacity(lines.len());
        let mut tails = Vec::with_capacity(lines.len());
        let mut edited = vec![false; lines.len()];

        for (i, line) in lines.iter().enumerate() {
            let (head, rest) = if i == 0 { self.value_of(line) } else { ("", *line) };
            let (value, tail) = split_comment(rest);
            let value = match remove_all(value, dropped) {
                Some(next) => {
                    edited[i] = true;
                    next
                }
                None => value.to_string(),
            };
            heads.push(head);
            values.push(value);
            tails.push(tail);
        }

        if !edited.contains(&true) {
            return None;
        }

        for line in drop_stray_commas(&mut values) {
            edited[line] = true;
        }

        let result = (0..lines.len())
            .map(|i| {
                if !edited[i] {
                    return Some(lines[i].to_string());
                }
                let value = values[i].trim_end();
                if i > 0 && value.trim().is_empty() {
                    return None;
                }
                Some(format!("{}{}{}", heads[i], value, tails[i]))
            })
            .collect();

        Some(result)
    }

    /// Returns true if a block-sequence item names a dropped job
    pub fn item_is_dropped(&self, line: &str, dropped: &BTreeSet<String>) -> bool {
        block_item(line).is_some_and(|name| dropped.contains(name))
    }
}

/// Extracts the job name from a `- name` sequence item
pub fn block_item(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('-')?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = match rest.find(" #") {
        Some(pos) => &rest[..pos],
        None => rest,
    };
    let name = rest.trim();
    let name = strip_quotes(name);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn strip_quotes(s: &str) -> &str {
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// Splits text into its value and the trailing part: a ` # comment` and/or
/// the line terminator
fn split_comment(text: &str) -> (&str, &str) {
    let mut prev_space: Option<usize> = None;
    for (i, c) in text.char_indices() {
        if c == '#' && (i == 0 || prev_space.is_some()) {
            return text.split_at(prev_space.unwrap_or(i));
        }
        prev_space = if c.is_whitespace() { Some(i) } else { None };
    }
    let body = text.trim_end_matches(['\n', '\r']).len();
    text.split_at(body)
}

/// The part of a line before any trailing comment or line terminator
pub fn strip_comment(text: &str) -> &str {
    split_comment(text).0
}

/// Net number of `[` left open by `text`
pub fn bracket_depth(text: &str) -> i32 {
    text.chars().fold(0, |depth, c| match c {
        '[' => depth + 1,
        ']' => depth - 1,
        _ => depth,
    })
}

/// Removes every dropped name from `value`; `None` if nothing matched
fn remove_all(value: &str, dropped: &BTreeSet<String>) -> Option<String> {
    let mut edited: Option<String> = None;
    for name in dropped {
        let current = edited.as_deref().unwrap_or(value);
        if let Some(next) = remove_token(current, name) {
            edited = Some(next);
        }
    }
    edited
}

/// Deletes separators that no longer separate anything across a multi-line
/// list: a comma right after `[` or another comma, and a comma followed only
/// by more commas before `]`. Returns the lines that changed.
fn drop_stray_commas(values: &mut [String]) -> Vec<usize> {
    let significant: Vec<(usize, usize, char)> = values
        .iter()
        .enumerate()
        .flat_map(|(line, value)| {
            value
                .char_indices()
                .filter(|(_, c)| !c.is_whitespace())
                .map(move |(pos, c)| (line, pos, c))
        })
        .collect();

    let mut doomed: Vec<(usize, usize)> = Vec::new();
    let mut prev: Option<char> = None;

    for (k, &(line, pos, c)) in significant.iter().enumerate() {
        if c == ',' {
            let next = significant[k + 1..]
                .iter()
                .map(|&(_, _, c)| c)
                .find(|&c| c != ',');
            if matches!(prev, None | Some(',') | Some('[')) || matches!(next, None | Some(']')) {
                doomed.push((line, pos));
                continue;
            }
        }
        prev = Some(c);
    }

    // remove back to front so earlier byte offsets stay valid
    for &(line, pos) in doomed.iter().rev() {
        values[line].remove(pos);
    }

    doomed.into_iter().map(|(line, _)| line).collect()
}

fn is_boundary(c: Option<char>) -> bool {
    match c {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, ',' | '[' | ']' | '"' | '\''),
    }
}

/// Removes delimited occurrences of `name` from `value`. A token wrapped in a
/// matching pair of quotes loses its quotes too. Returns `None` if nothing
/// was removed.
fn remove_token(value: &str, name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(value.len());
    let mut cursor = 0;
    let mut search_from = 0;
    let mut removed = false;

    while let Some(rel) = value[search_from..].find(name) {
        let start = search_from + rel;
        let end = start + name.len();
        let before = value[..start].chars().next_back();
        let after = value[end..].chars().next();

        if !(is_boundary(before) && is_boundary(after)) {
            // advance past the first char of the match
            let step = value[start..].chars().next().map_or(1, char::len_utf8);
            search_from = start + step;
            continue;
        }

        let (mut cut_start, mut cut_end) = (start, end);
        if let (Some(open), Some(close)) = (before, after) {
            if open == close && matches!(open, '"' | '\'') && start > cursor {
                cut_start -= 1;
                cut_end += 1;
            }
        }

        out.push_str(&value[cursor..cut_start]);
        cursor = cut_end;
        search_from = cut_end;
        removed = true;
    }

    if !removed {
        return None;
    }
    out.push_str(&value[cursor..]);
    Some(out)
}

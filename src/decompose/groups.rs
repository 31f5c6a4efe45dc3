//! Grouping syntax: `{}` extraction (pass 1) and `()` / `[]` flattening (pass 2).

use super::arena::ContextArena;
use crate::store::{tokens, NodeId};
use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;
use std::ops::Range;

static BRACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}]*)\}").expect("brace pattern"));
static PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^()]*)\)").expect("paren pattern"));
static BRACKET: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\[\]()]*)\]").expect("bracket pattern"));

/// Removes whitespace. Whitespace that ends a `\command` before a letter is a
/// boundary: the letter is braced, or the whole call when the letters start a
/// custom function applied to a group (`\pm fib(x)` becomes `\pm{fib(x)}`).
pub(crate) fn strip_whitespace(text: &str, custom_names: &[&str]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        if c.is_whitespace() {
            continue;
        }
        out.push(c);
        if c != '\\' {
            continue;
        }

        let word_start = i;
        while i < chars.len() && chars[i].is_ascii_alphabetic() {
            out.push(chars[i]);
            i += 1;
        }
        let mut next = i;
        while next < chars.len() && chars[next].is_whitespace() {
            next += 1;
        }
        if i > word_start && next > i && chars.get(next).is_some_and(|c| c.is_ascii_alphabetic()) {
            let end = operand_end(&chars, next, custom_names);
            let operand: String = chars[next..end].iter().collect();
            out.push('{');
            out.push_str(&strip_whitespace(&operand, custom_names));
            out.push('}');
            i = end;
        }
    }
    out
}

/// End of the operand starting at the letter `start`: a custom call with its
/// balanced group, otherwise the letter alone.
fn operand_end(chars: &[char], start: usize, custom_names: &[&str]) -> usize {
    custom_names
        .iter()
        .filter(|name| chars[start..].iter().take(name.len()).copied().eq(name.chars()))
        .filter_map(|name| closing_group(chars, start + name.len()))
        .max()
        .map_or(start + 1, |close| close + 1)
}

fn closing_group(chars: &[char], open: usize) -> Option<usize> {
    let (opener, closer) = match chars.get(open)? {
        '(' => ('(', ')'),
        '{' => ('{', '}'),
        _ => return None,
    };
    let mut depth = 0usize;
    for (k, &c) in chars.iter().enumerate().skip(open) {
        if c == opener {
            depth += 1;
        } else if c == closer {
            depth -= 1;
            if depth == 0 {
                return Some(k);
            }
        }
    }
    None
}

/// Strips parenthesis pairs that wrap the whole text, as many as there are.
/// `(a)(b)` is left alone: its outer parentheses close and reopen in between.
pub fn avoid_parentheses(mut text: &str) -> &str {
    while wraps_whole(text) {
        text = &text[1..text.len() - 1];
    }
    text
}

fn wraps_whole(text: &str) -> bool {
    if text.len() < 2 || !text.starts_with('(') || !text.ends_with(')') {
        return false;
    }
    let mut depth = 0i32;
    for c in text[1..text.len() - 1].chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Whole match span and inner text of the first group.
fn first_group(pattern: &Regex, text: &str) -> Option<(Range<usize>, Range<usize>)> {
    let caps = pattern.captures(text)?;
    Some((caps.get(0)?.range(), caps.get(1)?.range()))
}

/// Token for `inner`: the token itself when it already is one, otherwise the
/// interned index. Newly created indices are queued.
fn token_for(arena: &mut ContextArena, inner: &str, queue: Option<&mut VecDeque<NodeId>>) -> String {
    let inner = avoid_parentheses(inner);
    if tokens::single(inner).is_some() {
        return inner.to_string();
    }
    let (id, created) = arena.intern(inner);
    if created {
        trace!("extracted {} = '{}'", id, inner);
        if let Some(queue) = queue {
            queue.push_back(id);
        }
    }
    id.token()
}

/// Pass 1: replaces innermost `{...}` groups by index tokens until none remain;
/// what is left becomes the root.
pub(crate) fn extract_braces(arena: &mut ContextArena, expression: &str) {
    let mut text = expression.to_string();
    while let Some((whole, inner)) = first_group(&BRACE, &text) {
        let token = token_for(arena, &text[inner], None);
        text.replace_range(whole, &token);
    }
    let root = avoid_parentheses(&text).to_string();
    arena.rewrite(NodeId::ROOT, root);
}

/// Pass 2: for every index, extracts innermost `(...)` groups, then `[...]`
/// groups that are not already a single token. Brackets keep their delimiters
/// so radical degrees stay recognizable.
pub(crate) fn flatten_groups(arena: &mut ContextArena) {
    let mut queue: VecDeque<NodeId> = arena.live_ids().into();
    while let Some(id) = queue.pop_front() {
        if !arena.is_live(id) {
            continue;
        }
        let mut text = arena.text(id).to_string();
        let mut changed = false;

        while let Some((whole, inner)) = first_group(&PAREN, &text) {
            let token = token_for(arena, &text[inner], Some(&mut queue));
            text.replace_range(whole, &token);
            changed = true;
        }
        while let Some(inner) = first_open_bracket(&text) {
            let token = token_for(arena, &text[inner.clone()], Some(&mut queue));
            text.replace_range(inner, &token);
            changed = true;
        }

        if changed {
            arena.rewrite(id, text);
        }
    }
}

fn first_open_bracket(text: &str) -> Option<Range<usize>> {
    BRACKET
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .find(|inner| tokens::single(inner.as_str()).is_none())
        .map(|inner| inner.range())
}

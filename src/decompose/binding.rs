//! Pass 4: binds declared variable letters to their own indices.

use super::arena::ContextArena;
use crate::grammar::keywords::COMMAND;
use crate::grammar::statics::EULER_APPROX;
use log::trace;

/// Byte mask of positions that belong to a `\command` or a custom function name.
pub(crate) fn protected_mask<'a>(text: &str, custom_names: impl IntoIterator<Item = &'a str>) -> Vec<bool> {
    let mut mask = vec![false; text.len()];
    for m in COMMAND.find_iter(text) {
        mask[m.range()].iter_mut().for_each(|b| *b = true);
    }
    for name in custom_names {
        for (start, _) in text.match_indices(name) {
            mask[start..start + name.len()].iter_mut().for_each(|b| *b = true);
        }
    }
    mask
}

/// Replaces every unprotected occurrence of `letter` with `token`.
fn substitute(text: &str, letter: char, token: &str, mask: &[bool]) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut changed = false;
    for (i, c) in text.char_indices() {
        if c == letter && !mask[i] {
            out.push_str(token);
            changed = true;
        } else {
            out.push(c);
        }
    }
    changed.then_some(out)
}

pub(crate) fn bind_variables(arena: &mut ContextArena, variables: &[char], custom_names: &[&str]) {
    for &letter in variables {
        let name = letter.to_string();
        let value = if letter == 'e' { EULER_APPROX } else { name.as_str() };

        let id = match arena.lookup(&name) {
            Some(id) => {
                if value != name {
                    arena.rewrite(id, value.to_string());
                }
                arena.resolve(id)
            }
            None => arena.intern(value).0,
        };
        trace!("variable '{}' bound to {}", letter, id);

        let token = id.token();
        for other in arena.live_ids() {
            if other == id || !arena.is_live(other) {
                continue;
            }
            let text = arena.text(other);
            let mask = protected_mask(text, custom_names.iter().copied());
            if let Some(bound) = substitute(text, letter, &token, &mask) {
                arena.rewrite(other, bound);
            }
        }
    }
}

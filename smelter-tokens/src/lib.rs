#![no_std]

/*!
Low-level handling of raw argument vectors. Takes care of exploding
combined short flags, splitting `--option=value` tokens, and cutting the
token stream into *groups* (one trigger plus the value tokens that follow
it, or a leading run of positionals). No type handling happens here.

The central type is [`GroupDeque`]: a double-ended queue of token groups
that is consumed from the front, one group at a time. A consumer that only
partially uses a group hands the unused tail back via
[`requeue`][GroupDeque::requeue], which puts it at the *front* of the
queue so that left-to-right intent is preserved.
*/

extern crate alloc;

use alloc::collections::VecDeque;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// True for any token that opens a new group (`-x`, `--long`, ...).
#[inline]
#[must_use]
pub fn is_trigger(token: &str) -> bool {
    token.starts_with('-')
}

/// Split a `--option=value` token at the first `=`. Tokens that are not
/// long options, or that carry no `=`, pass through untouched.
fn split_value(token: &str) -> Option<(&str, &str)> {
    if !token.starts_with("--") {
        return None;
    }

    memchr::memchr(b'=', token.as_bytes()).map(|i| (&token[..i], &token[i + 1..]))
}

/// Explode a single raw token into the tokens it stands for.
///
/// A single-dash multi-character token is one flag per character (`-vf`
/// becomes `-v`, `-f`), a `--option=value` token becomes the option
/// followed by its value, and everything else is passed through as-is.
fn expand_into(token: &str, out: &mut Vec<String>) {
    if let Some((option, value)) = split_value(token) {
        out.push(option.to_string());
        out.push(value.to_string());
    } else if token.starts_with('-') && !token.starts_with("--") {
        for c in token.chars().skip(1) {
            let mut flag = String::with_capacity(2);
            flag.push('-');
            flag.push(c);
            out.push(flag);
        }
    } else {
        out.push(token.to_string());
    }
}

/**
Split an argument vector into an ordered deque of token groups.

Tokens are first expanded (see above), then a new group is started at
every token beginning with a dash; non-dash tokens attach to the
currently open group. A leading run of non-dash tokens forms a first
group with no leading trigger, which is how positional arguments arrive
before any option was seen.

This is a pure function of its input and keeps no shared state, so a
caller can restart tokenization at any time.
*/
#[must_use]
pub fn split_and_expand<I>(args: I) -> GroupDeque
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut expanded = Vec::new();
    for arg in args {
        expand_into(arg.as_ref(), &mut expanded);
    }

    let mut groups: VecDeque<Vec<String>> = VecDeque::new();

    for token in expanded {
        if is_trigger(&token) || groups.is_empty() {
            groups.push_back(Vec::new());
        }
        if let Some(group) = groups.back_mut() {
            group.push(token);
        }
    }

    GroupDeque { groups }
}

/**
An ordered queue of token groups, consumed from the front.

Unconsumed trailing tokens from a partially-used group must be handed
back through [`requeue`][Self::requeue]; they are placed at the front,
not the back, so the next consumer sees them before any later group.
*/
#[derive(Debug, Clone, Default)]
pub struct GroupDeque {
    groups: VecDeque<Vec<String>>,
}

impl GroupDeque {
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Take the next pending group, front first.
    pub fn next_group(&mut self) -> Option<Vec<String>> {
        self.groups.pop_front()
    }

    /// Put leftover tokens back at the front of the queue. Empty
    /// leftovers are dropped.
    pub fn requeue(&mut self, tokens: Vec<String>) {
        if !tokens.is_empty() {
            self.groups.push_front(tokens);
        }
    }

    /// Flatten every remaining group back into a plain token list.
    #[must_use]
    pub fn into_flat(self) -> Vec<String> {
        self.groups.into_iter().flatten().collect()
    }

    /// Iterate the pending groups without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = &[String]> {
        self.groups.iter().map(|group| group.as_slice())
    }
}

impl FromIterator<Vec<String>> for GroupDeque {
    fn from_iter<T: IntoIterator<Item = Vec<String>>>(iter: T) -> Self {
        Self {
            groups: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn groups(args: &[&str]) -> Vec<Vec<String>> {
        split_and_expand(args).groups.into_iter().collect()
    }

    #[test]
    fn combined_shorts_explode() {
        assert_eq!(
            groups(&["-vvf", "test", "--this", "other"]),
            vec![
                vec!["-v".to_string()],
                vec!["-v".to_string()],
                vec!["-f".to_string(), "test".to_string()],
                vec!["--this".to_string(), "other".to_string()],
            ],
        );
    }

    #[test]
    fn leading_positionals_form_first_group() {
        assert_eq!(
            groups(&["a", "b", "--opt", "x"]),
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["--opt".to_string(), "x".to_string()],
            ],
        );
    }

    #[test]
    fn long_option_with_equals_is_split() {
        assert_eq!(
            groups(&["--path=/a/b", "tail"]),
            vec![vec![
                "--path".to_string(),
                "/a/b".to_string(),
                "tail".to_string(),
            ]],
        );
    }

    #[test]
    fn lone_dash_expands_to_nothing() {
        assert_eq!(groups(&["-"]), Vec::<Vec<String>>::new());
    }

    #[test]
    fn requeue_goes_to_the_front() {
        let mut deque = split_and_expand(["--a", "1", "--b", "2"]);
        let first = deque.next_group().unwrap();
        assert_eq!(first, vec!["--a".to_string(), "1".to_string()]);

        deque.requeue(vec!["1".to_string()]);
        assert_eq!(
            deque.next_group().unwrap(),
            vec!["1".to_string()],
            "requeued tokens must come back before later groups",
        );
    }

    #[test]
    fn into_flat_restores_token_order() {
        let deque = split_and_expand(["--a", "1", "b", "--c"]);
        assert_eq!(
            deque.into_flat(),
            vec![
                "--a".to_string(),
                "1".to_string(),
                "b".to_string(),
                "--c".to_string(),
            ],
        );
    }
}

//! IMAP folder listing and name normalization

use crate::{ImapResult, MailSession};
use tracing::debug;

/// A remote mailbox container, identified by its normalized name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Folder {
    /// Normalized folder name (e.g. "Archive/2020")
    pub name: String,
    /// LIST attributes as sent by the server (e.g. "\HasNoChildren")
    pub attributes: Vec<String>,
}

impl Folder {
    /// Build a folder from one raw LIST line
    pub fn from_list_line(raw: &str) -> Self {
        let (attributes, rest) = split_attributes(raw);
        Self {
            name: normalize_remainder(rest),
            attributes,
        }
    }

    /// Check if this folder can be selected
    pub fn is_selectable(&self) -> bool {
        !self.attributes.iter().any(|a| {
            let lower = a.to_lowercase();
            lower == "\\noselect" || lower == "\\nonexistent"
        })
    }
}

/// Normalize a raw LIST line into a folder name.
///
/// Steps run in a fixed order: the attribute group goes first because it
/// may contain quote characters of its own, then the hierarchy delimiter,
/// then any remaining quotes, then surrounding whitespace.
pub fn normalize_folder_name(raw: &str) -> String {
    let (_, rest) = split_attributes(raw);
    normalize_remainder(rest)
}

/// List the folders of the store, sorted by name
pub async fn list_folders<S>(session: &mut S) -> ImapResult<Vec<Folder>>
where
    S: MailSession + ?Sized,
{
    let raw = session.list_raw().await?;
    debug!("LIST returned {} entries", raw.len());
    Ok(folders_from_listing(&raw))
}

fn folders_from_listing(raw: &[String]) -> Vec<Folder> {
    let mut folders: Vec<Folder> = raw
        .iter()
        .map(|line| Folder::from_list_line(line))
        .filter(|folder| !folder.name.is_empty())
        .collect();

    folders.sort_by(|a, b| a.name.cmp(&b.name));
    folders.dedup_by(|a, b| a.name == b.name);
    folders
}

/// Split the leading `( ... )` attribute group off a LIST line
fn split_attributes(raw: &str) -> (Vec<String>, &str) {
    let trimmed = raw.trim_start();
    if !trimmed.starts_with('(') {
        return (Vec::new(), trimmed);
    }

    let mut depth = 0usize;
    for (idx, ch) in trimmed.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let attributes = trimmed[1..idx]
                        .split_whitespace()
                        .map(str::to_string)
                        .collect();
                    return (attributes, &trimmed[idx + 1..]);
                }
            }
            _ => {}
        }
    }

    // Unbalanced group, nothing to strip
    (Vec::new(), trimmed)
}

fn normalize_remainder(rest: &str) -> String {
    strip_delimiter(rest).replace('"', "").trim().to_string()
}

/// Drop the hierarchy delimiter token (`"/"`, `"\\"` or `NIL`) when it is
/// followed by a mailbox name
fn strip_delimiter(rest: &str) -> &str {
    let rest = rest.trim_start();
    let bytes = rest.as_bytes();

    let token_len = if rest.starts_with("\"\\\\\"") {
        4
    } else if bytes.len() >= 3 && bytes[0] == b'"' && bytes[1] != b'"' && bytes[2] == b'"' {
        3
    } else if rest.get(..3).is_some_and(|t| t.eq_ignore_ascii_case("NIL")) {
        3
    } else {
        return rest;
    };

    let after = &rest[token_len..];
    if after.starts_with(char::is_whitespace) && !after.trim().is_empty() {
        after
    } else {
        rest
    }
}

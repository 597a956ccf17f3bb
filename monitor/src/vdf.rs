//! Minimal readers for Valve's brace-delimited key/value text.
//!
//! Only what the update check needs: pulling a named `{ ... }` block out of a
//! larger dump and finding `"key" "digits"` lines.

/// Returns the first `{ ... }` block (braces included) that follows `"name"`.
///
/// Nesting is tracked so the block ends at its own closing brace, not at the
/// first `}` of a child block.
pub fn extract_named_block<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let quoted = format!("\"{}\"", name);
    let pos = text.find(&quoted)?;
    let start = pos + text[pos..].find('{')?;

    let mut depth = 0usize;
    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Finds the block for `branch` nested inside the top-level `"branches"` block
pub fn extract_branch_block<'a>(text: &'a str, branch: &str) -> Option<&'a str> {
    let branches = extract_named_block(text, "branches")?;
    extract_named_block(branches, branch)
}

/// Splits a line of the form `"key" "value"` (surrounding whitespace allowed)
fn parse_quoted_pair(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim().strip_prefix('"')?;
    let key_end = rest.find('"')?;
    let key = &rest[..key_end];

    let rest = rest[key_end + 1..].trim_start().strip_prefix('"')?;
    let value_end = rest.find('"')?;
    let value = &rest[..value_end];

    if !rest[value_end + 1..].trim().is_empty() {
        return None;
    }
    Some((key, value))
}

/// Value of the first line that is exactly `"key" "<digits>"`
pub fn find_numeric_value<'a>(text: &'a str, key: &str, ignore_case: bool) -> Option<&'a str> {
    text.lines().find_map(|line| {
        let (k, v) = parse_quoted_pair(line)?;
        let key_matches = if ignore_case {
            k.eq_ignore_ascii_case(key)
        } else {
            k == key
        };
        let numeric = !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit());
        (key_matches && numeric).then_some(v)
    })
}

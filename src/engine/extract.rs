//! Locating the JSON object inside chatty model output.
//!
//! The plain scan only looks at `{` and `}`: prose, markdown fences and code
//! around the object are ignored. Of all fully balanced spans the longest
//! wins, since the real answer is usually the biggest structure in the text.
//! A second, string-aware scan covers braces quoted inside string values.

/// Drop markdown fence markers (```` ``` ```` / ```` ```json ````), keeping the
/// rest of each line.
pub fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(strip_fence_markers(line));
    }
    out
}

fn strip_fence_markers(line: &str) -> &str {
    let mut line = line;
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix("```") {
        // Language tag directly after the opening fence.
        line = rest
            .trim_start_matches('`')
            .trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    }
    let trimmed_end = line.trim_end();
    match trimmed_end.strip_suffix("```") {
        Some(rest) => rest.trim_end_matches('`'),
        None => line,
    }
}

struct BraceScan {
    /// Byte range of the longest balanced `{...}` span.
    largest: Option<(usize, usize)>,
    /// Offsets of `{` still open at the end of the text, outermost first.
    unmatched: Vec<usize>,
}

fn scan_braces(text: &str) -> BraceScan {
    let mut stack = Vec::new();
    let mut largest: Option<(usize, usize)> = None;

    for (i, b) in text.bytes().enumerate() {
        match b {
            b'{' => stack.push(i),
            b'}' => {
                if let Some(start) = stack.pop() {
                    let end = i + 1;
                    let longer = largest.map_or(true, |(s, e)| end - start > e - s);
                    if longer {
                        largest = Some((start, end));
                    }
                }
            }
            _ => {}
        }
    }

    BraceScan {
        largest,
        unmatched: stack,
    }
}

/// Longest fully balanced `{...}` span, or `None` if there is none.
pub fn extract_largest_object(text: &str) -> Option<String> {
    let cleaned = strip_code_fences(text);
    let (start, end) = scan_braces(&cleaned).largest?;
    Some(cleaned[start..end].to_string())
}

/// Text from the outermost `{` that never closes up to the end of input.
/// This is the shape a response has when the model ran out of tokens.
pub fn unterminated_tail(text: &str) -> Option<String> {
    let cleaned = strip_code_fences(text);
    let start = *scan_braces(&cleaned).unmatched.first()?;
    let tail = cleaned[start..].trim_end().trim_end_matches('`').trim_end();
    Some(tail.to_string())
}

/// Longest balanced `{...}` span, ignoring braces inside string literals.
/// Valid JSON whose strings hold unbalanced braces (`"var s = '}';"`) is
/// only found whole this way.
pub fn extract_string_aware_object(text: &str) -> Option<String> {
    let cleaned = strip_code_fences(text);
    let mut stack = Vec::new();
    let mut largest: Option<(usize, usize)> = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in cleaned.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' if !stack.is_empty() => in_string = true,
            b'{' => stack.push(i),
            b'}' => {
                if let Some(start) = stack.pop() {
                    let end = i + 1;
                    if largest.map_or(true, |(s, e)| end - start > e - s) {
                        largest = Some((start, end));
                    }
                }
            }
            _ => {}
        }
    }

    let (start, end) = largest?;
    Some(cleaned[start..end].to_string())
}

/// Every candidate worth handing to the repairer, longest first.
pub fn candidates(text: &str) -> Vec<String> {
    let mut found: Vec<String> = [
        extract_string_aware_object(text),
        extract_largest_object(text),
        unterminated_tail(text),
    ]
    .into_iter()
    .flatten()
    .collect();
    found.sort_by(|a, b| b.len().cmp(&a.len()));
    found.dedup();
    found
}

use unicode_normalization::UnicodeNormalization;

pub const UNKNOWN: &str = "unknown";
pub const UNKNOWN_CLIENT: &str = "Unknown_Client";

pub const CLIENT_MAX_LEN: usize = 50;
pub const GENERIC_MAX_LEN: usize = 80;

/// Sanitize a client name into a folder token. On top of the generic rules,
/// path separators are stripped outright and `..` sequences are collapsed, so
/// a malicious or garbled extraction result can never escape the client level.
pub fn sanitize_client(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| *c != '/' && *c != '\\')
        .collect();

    let mut collapsed = stripped;
    while collapsed.contains("..") {
        collapsed = collapsed.replace("..", ".");
    }

    // Defense in depth: if a separator somehow survived, keep only the last
    // path component.
    let tail = collapsed
        .rsplit(|c: char| std::path::is_separator(c))
        .next()
        .unwrap_or("");

    clean(tail, CLIENT_MAX_LEN, UNKNOWN_CLIENT)
}

/// Sanitize an arbitrary extracted string into a filename token.
pub fn sanitize_token(raw: &str) -> String {
    clean(raw, GENERIC_MAX_LEN, UNKNOWN)
}

/// Total, deterministic cleanup: NFKC fold, restrict to `[A-Za-z0-9 _.-]`,
/// collapse separator runs, bound the length, and never return empty.
fn clean(raw: &str, max_len: usize, placeholder: &str) -> String {
    let mapped: String = raw
        .nfkc()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // Runs of underscores, whitespace, and mixed `._` sequences collapse to a
    // single underscore; a lone interior dot is kept as-is.
    let mut out = String::with_capacity(mapped.len());
    let mut run: Vec<char> = Vec::new();
    for c in mapped.chars() {
        if matches!(c, '_' | ' ' | '.') {
            run.push(c);
        } else {
            flush_run(&mut out, &run);
            run.clear();
            out.push(c);
        }
    }
    flush_run(&mut out, &run);

    let trimmed = out.trim_matches(|c| c == '_' || c == '.');

    // Output is pure ASCII at this point, so byte truncation is char-safe.
    let mut bounded = trimmed.to_string();
    if bounded.len() > max_len {
        bounded.truncate(max_len);
    }
    let bounded = bounded.trim_end_matches(|c| c == '_' || c == '.' || c == '-');

    if bounded.is_empty() {
        placeholder.to_string()
    } else {
        bounded.to_string()
    }
}

fn flush_run(out: &mut String, run: &[char]) {
    match run {
        [] => {}
        ['.'] => out.push('.'),
        _ => out.push('_'),
    }
}

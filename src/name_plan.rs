use crate::sanitize::UNKNOWN;

/// Below this many characters an institution fragment is unreadable, so it is
/// dropped rather than truncated.
pub const MIN_INSTITUTION_LEN: usize = 5;

/// Compose the extension-less base filename from sanitized tokens.
///
/// Document type and period are load-bearing identifiers and are never
/// truncated in favor of the institution; the institution segment is the first
/// thing to shrink and the first thing to go when `max_len` is tight.
pub fn compose(doc_type: &str, period: &str, institution: Option<&str>, max_len: usize) -> String {
    let institution = institution
        .map(str::trim)
        .filter(|i| !i.is_empty() && !i.eq_ignore_ascii_case(UNKNOWN));

    let base = match institution {
        Some(inst) => {
            let full = format!("{doc_type}_{inst}_{period}");
            if full.len() <= max_len {
                full
            } else {
                // Two joining underscores surround the institution segment.
                let budget = max_len.saturating_sub(doc_type.len() + period.len() + 2);
                if budget < MIN_INSTITUTION_LEN {
                    format!("{doc_type}_{period}")
                } else {
                    let cut: String = inst.chars().take(budget).collect();
                    format!("{doc_type}_{cut}_{period}")
                }
            }
        }
        None => format!("{doc_type}_{period}"),
    };

    // Safety truncation regardless of branch taken.
    let mut bounded: String = base.chars().take(max_len).collect();
    while bounded.ends_with(['_', '.', '-']) {
        bounded.pop();
    }
    bounded
}

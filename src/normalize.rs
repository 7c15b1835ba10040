//! Verbose extraction output -> short canonical tokens.
//!
//! The pattern tables are ordered and matched case-insensitively by substring;
//! the first hit wins, so table order is load-bearing for reproducibility.

use regex::Regex;
use std::sync::LazyLock;

const WORD_BUDGET: usize = 4;

/// Words worth keeping past the head of a long phrase when no canonical
/// pattern matches.
const STRUCTURAL_WORDS: &[&str] = &[
    "statement",
    "summary",
    "report",
    "tax",
    "year",
    "annual",
    "quarterly",
    "monthly",
];

const DOC_TYPE_TABLE: &[(&str, &str)] = &[
    ("wage and tax statement", "W2"),
    ("w-2", "W2"),
    ("w2", "W2"),
    ("1099-int", "1099INT"),
    ("1099 int", "1099INT"),
    ("interest income", "1099INT"),
    ("1099-div", "1099DIV"),
    ("dividend", "1099DIV"),
    ("1099-r", "1099R"),
    ("retirement distribution", "1099R"),
    ("1099-b", "1099B"),
    ("1099-misc", "1099MISC"),
    ("1099-nec", "1099NEC"),
    ("1098-t", "1098T"),
    ("mortgage interest", "1098"),
    ("1098", "1098"),
    ("schedule k-1", "K1"),
    ("k-1", "K1"),
    ("brokerage statement", "BrokerageStmt"),
    ("investment statement", "InvStmt"),
    ("account summary", "AcctSummary"),
    ("bank statement", "BankStmt"),
    ("property tax", "PropTax"),
    ("charitable", "Donation"),
    ("donation", "Donation"),
    ("pay stub", "Paystub"),
    ("paystub", "Paystub"),
    ("invoice", "Invoice"),
    ("receipt", "Receipt"),
];

const INSTITUTION_TABLE: &[(&str, &str)] = &[
    ("bank of america", "BofA"),
    ("wells fargo", "WellsFargo"),
    ("morgan stanley", "MorganStanley"),
    ("jpmorgan", "Chase"),
    ("jp morgan", "Chase"),
    ("chase", "Chase"),
    ("goldman", "GoldmanSachs"),
    ("charles schwab", "Schwab"),
    ("schwab", "Schwab"),
    ("fidelity", "Fidelity"),
    ("vanguard", "Vanguard"),
    ("merrill", "Merrill"),
    ("td ameritrade", "TDAmeritrade"),
    ("e*trade", "ETrade"),
    ("etrade", "ETrade"),
    ("robinhood", "Robinhood"),
    ("citibank", "Citi"),
    ("citigroup", "Citi"),
    ("citi", "Citi"),
    ("capital one", "CapitalOne"),
    ("american express", "Amex"),
    ("amex", "Amex"),
    ("u.s. bank", "USBank"),
    ("us bank", "USBank"),
    ("truist", "Truist"),
    ("internal revenue", "IRS"),
    ("social security", "SSA"),
];

const QUARTER_TABLE: &[(&str, &str)] = &[
    ("q1", "-Q1"),
    ("first quarter", "-Q1"),
    ("1st quarter", "-Q1"),
    ("q2", "-Q2"),
    ("second quarter", "-Q2"),
    ("2nd quarter", "-Q2"),
    ("q3", "-Q3"),
    ("third quarter", "-Q3"),
    ("3rd quarter", "-Q3"),
    ("q4", "-Q4"),
    ("fourth quarter", "-Q4"),
    ("4th quarter", "-Q4"),
];

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"20\d{2}").expect("year pattern"));

pub fn normalize_doc_type(raw: &str) -> String {
    let lower = raw.to_lowercase();
    for (pattern, canonical) in DOC_TYPE_TABLE {
        if lower.contains(pattern) {
            return (*canonical).to_string();
        }
    }
    limit_words(raw, 3, WORD_BUDGET)
}

pub fn normalize_institution(raw: &str) -> String {
    let lower = raw.to_lowercase();
    for (pattern, canonical) in INSTITUTION_TABLE {
        if lower.contains(pattern) {
            return (*canonical).to_string();
        }
    }
    limit_words(raw, 2, 2)
}

/// Extract a 4-digit year (`20xx`) or infer a quarter suffix; the year part
/// falls back to `fallback_year` when the input has neither.
pub fn normalize_period(raw: &str, fallback_year: &str) -> String {
    let lower = raw.to_lowercase();
    let year = YEAR_RE
        .find(raw)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| fallback_year.to_string());
    let quarter = QUARTER_TABLE
        .iter()
        .find(|(pattern, _)| lower.contains(pattern))
        .map(|(_, suffix)| *suffix);
    match quarter {
        Some(suffix) => format!("{year}{suffix}"),
        None => year,
    }
}

/// Keep the first `head` words, then opportunistically add digit-bearing words
/// and structurally meaningful ones until `budget` words are kept.
fn limit_words(raw: &str, head: usize, budget: usize) -> String {
    let words: Vec<&str> = raw.split_whitespace().collect();
    let mut kept: Vec<&str> = words.iter().take(head).copied().collect();
    for word in words.iter().skip(head) {
        if kept.len() >= budget {
            break;
        }
        let bare = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if word.chars().any(|c| c.is_ascii_digit()) || STRUCTURAL_WORDS.contains(&bare.as_str()) {
            kept.push(word);
        }
    }
    kept.join(" ")
}

use shoebox::normalize::{normalize_doc_type, normalize_institution, normalize_period};

#[test]
fn canonical_doc_types() {
    assert_eq!(normalize_doc_type("Wage and Tax Statement"), "W2");
    assert_eq!(normalize_doc_type("Form W-2 (2023)"), "W2");
    assert_eq!(normalize_doc_type("1099-INT Interest Statement"), "1099INT");
    assert_eq!(normalize_doc_type("Consolidated Brokerage Statement"), "BrokerageStmt");
    assert_eq!(normalize_doc_type("Year-End Account Summary"), "AcctSummary");
}

#[test]
fn doc_type_fallback_keeps_head_plus_meaningful_words() {
    // No table hit: first three words, then the digit-bearing one.
    assert_eq!(
        normalize_doc_type("Annual Escrow Disclosure Letter for 2022"),
        "Annual Escrow Disclosure 2022"
    );
    // Nothing opportunistic to add: just the head.
    assert_eq!(normalize_doc_type("Some Unusual Paper Form"), "Some Unusual Paper");
}

#[test]
fn canonical_institutions() {
    assert_eq!(normalize_institution("Bank of America, N.A."), "BofA");
    assert_eq!(normalize_institution("WELLS FARGO BANK"), "WellsFargo");
    assert_eq!(normalize_institution("Morgan Stanley Wealth Management"), "MorganStanley");
    assert_eq!(normalize_institution("Charles Schwab & Co."), "Schwab");
}

#[test]
fn institution_fallback_limits_to_two_words() {
    assert_eq!(
        normalize_institution("First National Credit Union of Springfield"),
        "First National"
    );
}

#[test]
fn period_extracts_four_digit_year() {
    assert_eq!(normalize_period("for tax year 2023", "2024"), "2023");
    assert_eq!(normalize_period("Statement period: Jan-Dec 2021", "2024"), "2021");
}

#[test]
fn period_infers_quarter_suffix() {
    assert_eq!(normalize_period("Q2 2023 statement", "2024"), "2023-Q2");
    assert_eq!(normalize_period("third quarter", "2024"), "2024-Q3");
}

#[test]
fn period_falls_back_to_configured_year() {
    assert_eq!(normalize_period("no period shown", "2024"), "2024");
    assert_eq!(normalize_period("", "1999"), "1999");
}

use shoebox::config::Config;
use shoebox::extract::RawExtraction;
use shoebox::organize::organize_document;
use std::fs;
use std::path::Path;

fn test_cfg(root: &Path) -> Config {
    let mut cfg = Config::default();
    cfg.paths.source_dir = root.join("source").display().to_string();
    cfg.paths.processed_dir = root.join("processed").display().to_string();
    cfg.paths.data_dir = root.join("data").display().to_string();
    cfg.paths.log_dir = root.join("logs").display().to_string();
    cfg.retry.delay_unit_seconds = 0;
    cfg.batch.delay_seconds = 0;
    cfg.batch.doc_delay_ms_min = 0;
    cfg.batch.doc_delay_ms_max = 0;
    cfg
}

fn source_pdf(root: &Path, name: &str) -> std::path::PathBuf {
    let dir = root.join("source");
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, b"%PDF-1.4\n%%EOF\n").unwrap();
    path
}

fn w2_extraction() -> RawExtraction {
    RawExtraction {
        document_type: "W-2".to_string(),
        client_name: "Jane Q. Public".to_string(),
        period_year: "2023".to_string(),
        institution: "Bank of America".to_string(),
        account_number: "1234".to_string(),
        total_value: "85000".to_string(),
        raw_response: String::new(),
    }
}

#[test]
fn files_document_under_client_folder() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = test_cfg(tmp.path());
    let source = source_pdf(tmp.path(), "scan001.pdf");

    let organized = organize_document(&cfg, &source, &w2_extraction()).unwrap();
    assert_eq!(organized.client, "Jane_Q_Public");
    assert_eq!(
        organized.pdf_path,
        tmp.path().join("processed/Jane_Q_Public/W2_BofA_2023.pdf")
    );
    assert!(organized.pdf_path.exists());
    assert!(organized.sidecar_path.exists());
    // Default config deletes the source after a verified copy.
    assert!(!source.exists());
}

#[test]
fn source_survives_when_deletion_disabled() {
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = test_cfg(tmp.path());
    cfg.global.delete_source = false;
    let source = source_pdf(tmp.path(), "scan001.pdf");

    organize_document(&cfg, &source, &w2_extraction()).unwrap();
    assert!(source.exists());
}

#[test]
fn unusable_client_name_falls_back_to_filename_stem() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = test_cfg(tmp.path());
    let source = source_pdf(tmp.path(), "Smith_W2_2022.pdf");

    let mut raw = w2_extraction();
    raw.client_name = "unknown".to_string();
    let organized = organize_document(&cfg, &source, &raw).unwrap();
    assert_eq!(organized.client, "Smith");
}

#[test]
fn short_filename_stem_lands_in_placeholder_folder() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = test_cfg(tmp.path());
    let source = source_pdf(tmp.path(), "ab.pdf");

    let mut raw = w2_extraction();
    raw.client_name = String::new();
    let organized = organize_document(&cfg, &source, &raw).unwrap();
    assert_eq!(organized.client, "Unknown_Client");
}

#[test]
fn configured_client_overrides_extraction() {
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = test_cfg(tmp.path());
    cfg.global.client_name = "Acme LLC".to_string();
    let source = source_pdf(tmp.path(), "scan001.pdf");

    let organized = organize_document(&cfg, &source, &w2_extraction()).unwrap();
    assert_eq!(organized.client, "Acme_LLC");
}

#[test]
fn sidecar_carries_raw_and_cleaned_fields() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = test_cfg(tmp.path());
    let source = source_pdf(tmp.path(), "scan001.pdf");

    let organized = organize_document(&cfg, &source, &w2_extraction()).unwrap();
    let body = fs::read_to_string(&organized.sidecar_path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&body).unwrap();

    assert_eq!(v["document_type"], "W-2");
    assert_eq!(v["client_name"], "Jane Q. Public");
    assert_eq!(v["cleaned"]["document_type"], "W2");
    assert_eq!(v["cleaned"]["institution"], "BofA");
    assert_eq!(v["processing"]["original_filename"], "scan001.pdf");
    assert_eq!(v["processing"]["client_folder"], "Jane_Q_Public");
    assert_eq!(v["processing"]["filename"], "W2_BofA_2023.pdf");
    assert!(v["processing"]["processed_at"].as_str().unwrap().contains('T'));
}

#[test]
fn duplicate_documents_get_counter_suffix() {
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = test_cfg(tmp.path());
    cfg.global.delete_source = false;
    let source = source_pdf(tmp.path(), "scan001.pdf");

    let first = organize_document(&cfg, &source, &w2_extraction()).unwrap();
    let second = organize_document(&cfg, &source, &w2_extraction()).unwrap();
    assert_eq!(
        first.pdf_path.file_name().unwrap().to_str().unwrap(),
        "W2_BofA_2023.pdf"
    );
    assert_eq!(
        second.pdf_path.file_name().unwrap().to_str().unwrap(),
        "W2_BofA_2023_01.pdf"
    );
    assert!(second.sidecar_path.ends_with("W2_BofA_2023_01.json"));
}

#[test]
fn missing_period_uses_fallback_year() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = test_cfg(tmp.path());
    let source = source_pdf(tmp.path(), "scan001.pdf");

    let mut raw = w2_extraction();
    raw.period_year = "unknown".to_string();
    let organized = organize_document(&cfg, &source, &raw).unwrap();
    assert_eq!(
        organized.pdf_path.file_name().unwrap().to_str().unwrap(),
        "W2_BofA_2024.pdf"
    );
}

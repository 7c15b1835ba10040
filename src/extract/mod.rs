pub mod anthropic;

use crate::render::PageImage;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// The six raw fields the document-understanding service reports, plus its
/// verbatim response for auditing. Values are untrusted free text until the
/// sanitizer and normalizers have been over them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawExtraction {
    pub document_type: String,
    pub client_name: String,
    pub period_year: String,
    pub institution: String,
    pub account_number: String,
    pub total_value: String,
    pub raw_response: String,
}

pub trait Extractor {
    fn extract(&self, image: &PageImage) -> Result<RawExtraction>;
}

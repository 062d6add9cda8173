//! Output types: entities coming back from OCR and the records we return.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The fields every extraction attempts to fill, in schema order.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "employer_name",
    "employee_name",
    "pay_date",
    "start_date",
    "end_date",
    "gross_earnings",
    "net_pay",
];

/// `true` when `name` is one of [`REQUIRED_FIELDS`].
pub fn is_required_field(name: &str) -> bool {
    REQUIRED_FIELDS.contains(&name)
}

/// A typed, confidence-scored text span returned by the document-understanding
/// service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub mention_text: String,
    /// In `[0, 1]`.
    pub confidence: f32,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>, mention_text: impl Into<String>, confidence: f32) -> Self {
        Self {
            entity_type: entity_type.into(),
            mention_text: mention_text.into(),
            confidence,
        }
    }
}

/// A resolved field value with its confidence rendered as a percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub value: String,
    /// e.g. `"91.0%"`.
    pub confidence: String,
}

/// Payslip numbering: the per-page path counts pages; the model may label
/// payslips however it sees fit.
///
/// Deserialises from a non-negative integer, a whole-number float (`1.0`)
/// or a string. Other numbers are kept as their textual label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PayslipNumber {
    Index(u64),
    Label(String),
}

impl<'de> Deserialize<'de> for PayslipNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PayslipNumberVisitor)
    }
}

struct PayslipNumberVisitor;

impl<'de> Visitor<'de> for PayslipNumberVisitor {
    type Value = PayslipNumber;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a payslip number or label")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(PayslipNumber::Index(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(match u64::try_from(v) {
            Ok(n) => PayslipNumber::Index(n),
            Err(_) => PayslipNumber::Label(v.to_string()),
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 {
            Ok(PayslipNumber::Index(v as u64))
        } else {
            Ok(PayslipNumber::Label(v.to_string()))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(PayslipNumber::Label(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(PayslipNumber::Label(v))
    }
}

impl From<usize> for PayslipNumber {
    fn from(n: usize) -> Self {
        PayslipNumber::Index(n as u64)
    }
}

impl fmt::Display for PayslipNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayslipNumber::Index(n) => write!(f, "{n}"),
            PayslipNumber::Label(s) => f.write_str(s),
        }
    }
}

/// One record per page from the per-page pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayslipRecord {
    pub payslip_number: PayslipNumber,
    /// `"{first}-{last}"`, 1-indexed and inclusive.
    pub page_range: String,
    /// Keys are a subset of [`REQUIRED_FIELDS`]; missing fields are absent.
    pub extracted_data: BTreeMap<String, FieldValue>,
}

impl PayslipRecord {
    /// Record for a single page `page_num` (1-based).
    pub fn for_page(page_num: usize, extracted_data: BTreeMap<String, FieldValue>) -> Self {
        Self {
            payslip_number: PayslipNumber::from(page_num),
            page_range: format!("{page_num}-{page_num}"),
            extracted_data,
        }
    }
}

/// One logical payslip identified by the language model. May span pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredPayslip {
    pub payslip_number: PayslipNumber,
    pub page_range: String,
    /// Every required field is present; values may be `null`.
    pub extracted_data: BTreeMap<String, serde_json::Value>,
}

/// Result of the whole-document structuring path.
///
/// On failure `payslips` is empty and `error` describes what went wrong;
/// the structuring path never returns a partial list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredPayslips {
    pub payslips: Vec<StructuredPayslip>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StructuredPayslips {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            payslips: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

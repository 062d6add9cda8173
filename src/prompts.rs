//! Prompts for the whole-document structuring path.
//!
//! Every prompt lives here so the rules can be inspected in tests without a
//! live model.

/// Example of the JSON the model must return. Every field is mandatory;
/// values the model cannot find are `null`.
pub const PAYSLIP_SCHEMA_EXAMPLE: &str = r#"{
  "payslips": [
    {
      "payslip_number": 1,
      "page_range": "1-2",
      "extracted_data": {
        "employer_name": "Acme Ltd",
        "employee_name": "Jane Doe",
        "pay_date": "2024-01-31",
        "start_date": "2024-01-01",
        "end_date": "2024-01-31",
        "gross_earnings": 3500.00,
        "net_pay": 2712.45
      }
    }
  ]
}"#;

/// System prompt for segmenting OCR text into payslips.
pub const STRUCTURING_SYSTEM_PROMPT: &str = r#"You are a payroll document analyst. You receive the OCR text of a PDF that contains one or more payslips. A single payslip may continue over several pages.

Follow these rules precisely:

1. SEGMENTATION
   - A new payslip starts when the pay date or the pay period end date changes
   - A new payslip also starts when the employee name or the employer name changes
   - Consecutive pages that share the same pay date, end date, employee and employer belong to the same payslip

2. MERGING
   - Merge the pages of one payslip into a single record
   - When a financial field (gross earnings, net pay) appears on several pages of the same payslip, use the value from the LATEST page it appears on
   - page_range is "first-last" using 1-based page numbers

3. VALUES
   - Dates as they appear, or ISO 8601 (YYYY-MM-DD) when unambiguous
   - gross_earnings and net_pay as plain numbers without currency symbols or thousands separators
   - payslip_number is the number printed on the payslip; when the text has none, assign a unique, sequential number in the order the payslips appear
   - Use null for any field you cannot find (0.0 is allowed for gross_earnings and net_pay); never invent values

4. OUTPUT FORMAT
   - Output ONLY one JSON object matching the schema below
   - Every field in the schema MUST be present in every payslip, even when its value is null or 0.0
   - Do NOT add commentary, explanations or markdown fences"#;

/// Build the user message: the mandatory schema followed by the document text.
pub fn structuring_user_prompt(document_text: &str) -> String {
    format!(
        "Mandatory JSON schema (all fields required, null allowed):\n\
         {PAYSLIP_SCHEMA_EXAMPLE}\n\n\
         Document text:\n\"\"\"\n{document_text}\n\"\"\""
    )
}

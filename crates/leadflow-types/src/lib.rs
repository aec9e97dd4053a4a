//! Shared domain types for the lead-generation and outreach system

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// An outbound email as it was dispatched. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentEmail {
    pub id: i64,
    pub lead_id: Option<i64>,
    pub html_body: String,
    pub sent_at: DateTime<Utc>,
}

/// Kind of engagement signal recorded by the tracking endpoints
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrackingKind {
    Open,
    Click,
}

/// Append-only tracking record; must reference an existing `SentEmail`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub sent_email_id: i64,
    pub lead_id: Option<i64>,
    pub kind: TrackingKind,
    pub occurred_at: DateTime<Utc>,
    /// Original destination, only present for clicks
    pub url: Option<String>,
}

impl TrackingEvent {
    pub fn open(sent_email_id: i64, lead_id: Option<i64>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            sent_email_id,
            lead_id,
            kind: TrackingKind::Open,
            occurred_at,
            url: None,
        }
    }

    pub fn click(
        sent_email_id: i64,
        lead_id: Option<i64>,
        url: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sent_email_id,
            lead_id,
            kind: TrackingKind::Click,
            occurred_at,
            url: Some(url.into()),
        }
    }
}

/// Derived engagement counters for a date range. Never persisted.
///
/// `engaged` counts emails with at least one open or click, so it can be
/// larger than `opened` when a client blocks images but follows links.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngagementWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub sent: u64,
    pub opened: u64,
    pub clicked: u64,
    pub engaged: u64,
}

/// One UTC day of a trend series
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngagementBucket {
    pub date: NaiveDate,
    pub sent: u64,
    pub opened: u64,
    pub clicked: u64,
}

/// Pipeline stage of a lead
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Negotiating,
    Won,
    Lost,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Negotiating => "negotiating",
            LeadStatus::Won => "won",
            LeadStatus::Lost => "lost",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(LeadStatus::New),
            "contacted" => Ok(LeadStatus::Contacted),
            "qualified" => Ok(LeadStatus::Qualified),
            "negotiating" => Ok(LeadStatus::Negotiating),
            "won" => Ok(LeadStatus::Won),
            "lost" => Ok(LeadStatus::Lost),
            _ => Err(TypesError::UnknownLeadStatus(s.to_string())),
        }
    }
}

/// Where a lead record came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LeadSource {
    Apollo,
    Manual,
    Import,
}

impl LeadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadSource::Apollo => "apollo",
            LeadSource::Manual => "manual",
            LeadSource::Import => "import",
        }
    }
}

impl fmt::Display for LeadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadSource {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "apollo" => Ok(LeadSource::Apollo),
            "manual" => Ok(LeadSource::Manual),
            "import" => Ok(LeadSource::Import),
            _ => Err(TypesError::UnknownLeadSource(s.to_string())),
        }
    }
}

/// Prospective company/contact record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lead {
    /// Identifier assigned by the upstream database, if any
    pub external_id: Option<String>,
    pub company_name: String,
    pub website: Option<String>,
    pub industry: String,
    /// Size bucket such as `"51-200"`
    pub company_size: String,
    pub location: String,
    pub description: String,
    pub contact_name: Option<String>,
    pub contact_title: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_linkedin: Option<String>,
    pub status: LeadStatus,
    pub source: LeadSource,
    pub score: Option<u8>,
}

/// Seller or customer block on an invoice
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InvoiceParty {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address_lines: Vec<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
}

/// Amounts are in minor currency units (cents)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub description: String,
    pub quantity: u32,
    pub unit_amount: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInfo {
    /// e.g. "card", "sepa_debit"
    pub method: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// Flat billing record handed once to the invoice renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceData {
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// e.g. "paid", "open"
    pub status: String,
    pub seller: InvoiceParty,
    pub customer: InvoiceParty,
    pub line_items: Vec<InvoiceLineItem>,
    pub subtotal: i64,
    #[serde(default)]
    pub tax_amount: Option<i64>,
    #[serde(default)]
    pub tax_rate_percent: Option<f64>,
    #[serde(default)]
    pub discount_amount: Option<i64>,
    pub total: i64,
    /// ISO 4217 code, case-insensitive
    pub currency: String,
    #[serde(default)]
    pub payment: Option<PaymentInfo>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Overall result of a workflow run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Succeeded,
    PartiallySucceeded,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub name: String,
    pub status: StepStatus,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Execution record summarized by notification emails
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecutionSummary {
    pub execution_id: String,
    pub workflow_name: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub steps: Vec<StepOutcome>,
    #[serde(default)]
    pub leads_found: u32,
    #[serde(default)]
    pub emails_sent: u32,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl WorkflowExecutionSummary {
    /// Start a new summary with a fresh execution id
    pub fn new(workflow_name: impl Into<String>) -> Self {
        Self {
            execution_id: Uuid::new_v4().to_string(),
            workflow_name: workflow_name.into(),
            status: ExecutionStatus::Succeeded,
            started_at: Utc::now(),
            finished_at: None,
            steps: Vec::new(),
            leads_found: 0,
            emails_sent: 0,
            error_message: None,
        }
    }

    /// Record a step and downgrade the overall status on failure
    pub fn record_step(&mut self, name: impl Into<String>, status: StepStatus, detail: Option<String>) {
        if status == StepStatus::Failed {
            let any_succeeded = self.steps.iter().any(|s| s.status == StepStatus::Succeeded);
            self.status = if any_succeeded {
                ExecutionStatus::PartiallySucceeded
            } else {
                ExecutionStatus::Failed
            };
        }
        self.steps.push(StepOutcome {
            name: name.into(),
            status,
            detail,
        });
    }
}

/// Errors raised while parsing domain values
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    #[error("Unknown lead status: {0}")]
    UnknownLeadStatus(String),

    #[error("Unknown lead source: {0}")]
    UnknownLeadSource(String),
}

pub type Result<T> = std::result::Result<T, TypesError>;

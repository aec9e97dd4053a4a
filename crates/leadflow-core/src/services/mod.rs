//! Service modules for business logic

pub mod currency;
pub mod engagement;
pub mod invoice_pdf;
pub mod keywords;
pub mod notification;
pub mod sanitize;
pub mod tracking;

// Re-export service types
pub use currency::format_minor_units;
pub use engagement::{aggregate_window, daily_trend, EngagementRates};
pub use invoice_pdf::InvoiceRenderer;
pub use keywords::extract_keywords;
pub use notification::{ComposedNotification, NotificationComposer};
pub use sanitize::validate_input;
pub use tracking::{EmailTracker, InstrumentedEmail};

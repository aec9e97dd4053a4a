//! Leadflow Core Library
//!
//! Business logic for the Leadflow sales pipeline: lead search, input
//! screening, email engagement tracking, invoice rendering and workflow
//! notifications.

pub mod clients;
pub mod config;
pub mod constants;
pub mod error;
pub mod services;

// Re-export main types for easy access
pub use config::LeadflowConfig;
pub use error::{LeadflowError, Result};

pub use clients::{ApolloClient, LeadSearchFilters, LeadSearchPage, LeadSearchProvider};

pub use services::{
    ComposedNotification,
    EmailTracker,
    EngagementRates,
    InstrumentedEmail,
    InvoiceRenderer,
    NotificationComposer,
};

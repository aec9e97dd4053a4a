//! Client modules for external services

pub mod apollo;

pub use apollo::{ApolloClient, LeadSearchFilters, LeadSearchPage, LeadSearchProvider};

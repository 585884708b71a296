//! Business layer of the admin service.
//! - Bulk account provisioning: credential generation, transactional writes, spreadsheet export.
//! - One-shot artifact hand-off between the generate and download requests.
//! - User and group administration on top of the `models` entities.

pub mod accounts;
pub mod actor;
pub mod artifacts;
pub mod credentials;
pub mod errors;
pub mod export;
pub mod group_service;
pub mod pagination;
pub mod params;
pub mod provisioning;
#[cfg(test)]
pub mod test_support;
pub mod user_service;

pub use actor::Actor;
pub use errors::ServiceError;
pub use provisioning::ProvisioningService;

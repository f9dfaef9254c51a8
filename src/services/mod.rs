// Accounts and sessions
pub mod users;

// Catalog: products plus the lookup tables they hang off
pub mod catalog;
pub mod products;

// Customer engagement
pub mod favorites;
pub mod reviews;

// Ordering and billing
pub mod invoices;
pub mod orders;
pub mod promotions;

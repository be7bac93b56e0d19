//! Data models for the lending server

pub mod book;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookDetails};
pub use loan::{Loan, MAX_LOANS_PER_USER};
pub use user::{Role, User};

//! Ledger module containing the account registry, journal entry construction,
//! and the posting engine

pub mod account;
pub mod core;
pub mod entry;
pub mod posting;

pub use self::account::*;
pub use self::core::*;
pub use self::entry::*;
pub use self::posting::*;

//! Domain availability adapters.

mod dns_checker;

pub use dns_checker::DnsDomainChecker;

pub mod exchange_rate_archive;
pub mod largest_banks_archive;

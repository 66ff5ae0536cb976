//! rts: Rakuten to Shopify toolkit
//!
//! Converts Rakuten RMS item exports into Shopify product-import CSVs, and
//! splits or merges large CSV files without breaking multi-line records.

pub mod cli;
pub mod core;

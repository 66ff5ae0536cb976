//! Core module - conversion pipeline and CSV plumbing

pub mod config;
pub mod convert;
pub mod encoding;
pub mod html;
pub mod metafield;
pub mod shard;
pub mod shopify;
pub mod source;
pub mod stream;
pub mod variant;

pub use config::{Config, ConfigError};
pub use convert::{convert_file, ConvertError, ConvertOptions, ConvertStats};
pub use metafield::{MappingReport, MetafieldTable};
pub use shard::{merge_files, split_file, ShardError, SplitLimit, SplitReport};
pub use stream::{GroupReader, LogicalRecord, RecordStream, StreamError};
pub use variant::{derive_handle, group_variants, DerivedVariant, VariantKind};

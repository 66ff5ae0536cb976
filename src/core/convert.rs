//! Rakuten export → Shopify import conversion
//!
//! One linear batch transform: decode the file, read marketplace rows,
//! derive handles, group and sort variants, map attributes to metafields and
//! write the grouped rows.

use miette::Diagnostic;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::encoding::{decode_with_fallback, EncodingError};
use crate::core::html::{clean_description, image_url};
use crate::core::metafield::{map_attributes, MappingReport, MetafieldTable};
use crate::core::shopify::{self, ShopifyRow, ShopifyWriter};
use crate::core::source::{SourceError, SourceReader, SourceRecord};
use crate::core::variant::{derive_handle, group_variants, VariantGroup, DEFAULT_OPTION_NAME};

#[derive(Debug, Error, Diagnostic)]
pub enum ConvertError {
    #[error("IO error on {path}: {source}")]
    #[diagnostic(code(rts::convert::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] SourceError),
}

/// Options for a conversion run
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub vendor: String,
    pub image_base: Option<String>,
    pub encodings: Vec<String>,
    /// Drop bad rows instead of aborting
    pub skip_errors: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            vendor: String::new(),
            image_base: None,
            encodings: crate::core::encoding::DEFAULT_ENCODINGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            skip_errors: false,
        }
    }
}

/// Conversion statistics
#[derive(Debug, Default)]
pub struct ConvertStats {
    pub encoding: String,
    pub rows_read: usize,
    pub rows_dropped: usize,
    /// SKU rows folded into an earlier row with the same code
    pub rows_merged: usize,
    pub products: usize,
    pub variants: usize,
    pub image_rows: usize,
    pub mapping: MappingReport,
}

impl ConvertStats {
    pub fn rows_written(&self) -> usize {
        self.variants + self.image_rows
    }
}

/// Normalise a tax rate cell to a percentage label (`0.1` → `10%`)
///
/// Only the standard (10%) and reduced (8%) rates are recognised.
pub fn normalize_tax_rate(raw: &str) -> Option<String> {
    let rate = match raw.trim() {
        "0.1" | "0.10" | "10" | "10%" => "10%",
        "0.08" | "8" | "8%" => "8%",
        _ => return None,
    };
    Some(rate.to_string())
}

/// Fold a repeated row into the first row with the same code
///
/// The repeat is the SKU-level row, so its price and barcode win; anything
/// else only fills gaps.
fn merge_repeated_row(first: &mut SourceRecord, repeat: SourceRecord) {
    if repeat.price.is_some() {
        first.price = repeat.price;
    }
    if !repeat.barcode.is_empty() {
        first.barcode = repeat.barcode;
    }
    if first.images.is_empty() {
        first.images = repeat.images;
    }
    if first.attributes.is_empty() {
        first.attributes = repeat.attributes;
    }
}

/// Split a category path (`酒\日本酒` or `酒>日本酒`) into tags
pub fn category_tags(category: &str) -> String {
    category
        .split(['\\', '>', '/'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the output rows for one handle group
///
/// Order: main row, variant rows, one row per additional product image.
pub fn group_rows(
    group: &VariantGroup<SourceRecord>,
    table: &MetafieldTable,
    opts: &ConvertOptions,
    report: &mut MappingReport,
) -> Vec<ShopifyRow> {
    let mut rows = Vec::with_capacity(group.members.len());
    let Some((_, main)) = group.members.first() else {
        return rows;
    };
    let image_base = opts.image_base.as_deref();

    for (idx, (derived, record)) in group.members.iter().enumerate() {
        let mut row = ShopifyRow::new();

        if idx == 0 {
            row.set(shopify::HANDLE, group.handle.as_str())
                .set(shopify::TITLE, main.name.as_str())
                .set(shopify::BODY_HTML, clean_description(&main.description, image_base))
                .set(shopify::VENDOR, opts.vendor.as_str())
                .set(shopify::TAGS, category_tags(&main.category))
                .set(shopify::PUBLISHED, "TRUE")
                .set(shopify::OPTION1_NAME, group.option_name().unwrap_or(DEFAULT_OPTION_NAME))
                .set(shopify::GIFT_CARD, "FALSE")
                .set(shopify::STATUS, "active");

            if let Some(image) = main.images.first() {
                row.set(shopify::IMAGE_SRC, image_url(&image.path, image_base))
                    .set(shopify::IMAGE_POSITION, "1")
                    .set(shopify::IMAGE_ALT_TEXT, image.alt.as_str());
            }

            for (key, value) in map_attributes(&main.attributes, table, report) {
                if let Some(column) = crate::core::metafield::column(key) {
                    row.set(column.header, value);
                }
            }

            match normalize_tax_rate(&main.tax_rate) {
                Some(rate) => {
                    row.set(tax_rate_header(), rate);
                }
                None if !main.tax_rate.trim().is_empty() => {
                    tracing::warn!(row = main.row, rate = %main.tax_rate, "unreadable tax rate, leaving it empty");
                }
                None => {}
            }
        }

        row.set(shopify::OPTION1_VALUE, group.option_value_for(derived))
            .set(shopify::VARIANT_SKU, derived.code.as_str())
            .set(shopify::VARIANT_INVENTORY_TRACKER, "shopify")
            .set(shopify::VARIANT_INVENTORY_POLICY, "deny")
            .set(shopify::VARIANT_FULFILLMENT_SERVICE, "manual")
            .set(shopify::VARIANT_REQUIRES_SHIPPING, "TRUE")
            .set(shopify::VARIANT_TAXABLE, "TRUE")
            .set(shopify::VARIANT_BARCODE, record.barcode.as_str())
            .set(shopify::VARIANT_WEIGHT_UNIT, "g");

        if let Some(price) = record.price {
            row.set(shopify::VARIANT_PRICE, price.to_string());
        }
        if idx > 0 {
            if let Some(image) = record.images.first() {
                row.set(shopify::VARIANT_IMAGE, image_url(&image.path, image_base));
            }
        }

        rows.push(row);
    }

    for (position, image) in main.images.iter().enumerate().skip(1) {
        let mut row = ShopifyRow::new();
        row.set(shopify::IMAGE_SRC, image_url(&image.path, image_base))
            .set(shopify::IMAGE_POSITION, (position + 1).to_string())
            .set(shopify::IMAGE_ALT_TEXT, image.alt.as_str());
        rows.push(row);
    }

    rows
}

fn tax_rate_header() -> &'static str {
    crate::core::metafield::column("tax_rate").map_or("Tax Rate", |c| c.header)
}

/// Convert decoded export text into Shopify rows
pub fn convert_text(
    text: &str,
    table: &MetafieldTable,
    opts: &ConvertOptions,
) -> Result<(Vec<ShopifyRow>, ConvertStats), ConvertError> {
    let mut stats = ConvertStats::default();
    let reader = SourceReader::from_text(text)?;
    stats.rows_read = reader.len();

    let mut derived = Vec::with_capacity(reader.len());
    for result in reader.read_all() {
        match result {
            Ok(record) => derived.push((derive_handle(&record.code), record)),
            Err(e) if opts.skip_errors && e.is_row_error() => {
                tracing::warn!(error = %e, "dropping row");
                stats.rows_dropped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let mut groups = group_variants(derived);
    let mut rows = Vec::new();
    for group in &mut groups {
        stats.rows_merged += group.dedup_codes(merge_repeated_row);
        let built = group_rows(group, table, opts, &mut stats.mapping);
        stats.products += 1;
        stats.variants += group.members.len();
        stats.image_rows += built.len() - group.members.len();
        rows.extend(built);
    }

    Ok((rows, stats))
}

/// Convert `input` and write the result to `output`; `None` is a dry run
pub fn convert_file(
    input: &Path,
    output: Option<&Path>,
    table: &MetafieldTable,
    opts: &ConvertOptions,
) -> Result<ConvertStats, ConvertError> {
    let bytes = fs::read(input).map_err(|source| ConvertError::Io {
        path: input.to_path_buf(),
        source,
    })?;
    let (text, encoding) = decode_with_fallback(&bytes, &opts.encodings)?;

    let (rows, mut stats) = convert_text(&text, table, opts)?;
    stats.encoding = encoding;

    if let Some(output) = output {
        let io_err = |source| ConvertError::Io {
            path: output.to_path_buf(),
            source,
        };
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = File::create(output).map_err(io_err)?;
        let mut writer = ShopifyWriter::new(BufWriter::new(file)).map_err(io_err)?;
        for row in &rows {
            writer.write_row(row).map_err(io_err)?;
        }
        writer.finish().map_err(io_err)?;
    }

    Ok(stats)
}

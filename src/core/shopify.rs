//! Shopify product-import CSV: header layout, rows and writer
//!
//! Shopify's importer represents a product with several variants as
//! consecutive rows: the first row carries the product fields and the
//! handle, following rows leave the handle empty and only fill variant and
//! image columns.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{self, Write};

use crate::core::metafield::METAFIELD_COLUMNS;

pub const HANDLE: &str = "Handle";
pub const TITLE: &str = "Title";
pub const BODY_HTML: &str = "Body (HTML)";
pub const VENDOR: &str = "Vendor";
pub const PRODUCT_CATEGORY: &str = "Product Category";
pub const TYPE: &str = "Type";
pub const TAGS: &str = "Tags";
pub const PUBLISHED: &str = "Published";
pub const OPTION1_NAME: &str = "Option1 Name";
pub const OPTION1_VALUE: &str = "Option1 Value";
pub const OPTION2_NAME: &str = "Option2 Name";
pub const OPTION2_VALUE: &str = "Option2 Value";
pub const OPTION3_NAME: &str = "Option3 Name";
pub const OPTION3_VALUE: &str = "Option3 Value";
pub const VARIANT_SKU: &str = "Variant SKU";
pub const VARIANT_GRAMS: &str = "Variant Grams";
pub const VARIANT_INVENTORY_TRACKER: &str = "Variant Inventory Tracker";
pub const VARIANT_INVENTORY_QTY: &str = "Variant Inventory Qty";
pub const VARIANT_INVENTORY_POLICY: &str = "Variant Inventory Policy";
pub const VARIANT_FULFILLMENT_SERVICE: &str = "Variant Fulfillment Service";
pub const VARIANT_PRICE: &str = "Variant Price";
pub const VARIANT_COMPARE_AT_PRICE: &str = "Variant Compare At Price";
pub const VARIANT_REQUIRES_SHIPPING: &str = "Variant Requires Shipping";
pub const VARIANT_TAXABLE: &str = "Variant Taxable";
pub const VARIANT_BARCODE: &str = "Variant Barcode";
pub const IMAGE_SRC: &str = "Image Src";
pub const IMAGE_POSITION: &str = "Image Position";
pub const IMAGE_ALT_TEXT: &str = "Image Alt Text";
pub const GIFT_CARD: &str = "Gift Card";
pub const SEO_TITLE: &str = "SEO Title";
pub const SEO_DESCRIPTION: &str = "SEO Description";
pub const VARIANT_IMAGE: &str = "Variant Image";
pub const VARIANT_WEIGHT_UNIT: &str = "Variant Weight Unit";
pub const VARIANT_TAX_CODE: &str = "Variant Tax Code";
pub const COST_PER_ITEM: &str = "Cost per item";
pub const STATUS: &str = "Status";

/// Platform columns, in output order; metafield columns follow
pub const STANDARD_COLUMNS: &[&str] = &[
    HANDLE,
    TITLE,
    BODY_HTML,
    VENDOR,
    PRODUCT_CATEGORY,
    TYPE,
    TAGS,
    PUBLISHED,
    OPTION1_NAME,
    OPTION1_VALUE,
    OPTION2_NAME,
    OPTION2_VALUE,
    OPTION3_NAME,
    OPTION3_VALUE,
    VARIANT_SKU,
    VARIANT_GRAMS,
    VARIANT_INVENTORY_TRACKER,
    VARIANT_INVENTORY_QTY,
    VARIANT_INVENTORY_POLICY,
    VARIANT_FULFILLMENT_SERVICE,
    VARIANT_PRICE,
    VARIANT_COMPARE_AT_PRICE,
    VARIANT_REQUIRES_SHIPPING,
    VARIANT_TAXABLE,
    VARIANT_BARCODE,
    IMAGE_SRC,
    IMAGE_POSITION,
    IMAGE_ALT_TEXT,
    GIFT_CARD,
    SEO_TITLE,
    SEO_DESCRIPTION,
    VARIANT_IMAGE,
    VARIANT_WEIGHT_UNIT,
    VARIANT_TAX_CODE,
    COST_PER_ITEM,
    STATUS,
];

/// Columns the importer wants as a literal `""` when empty
pub const QUOTE_WHEN_EMPTY: &[&str] = &[
    BODY_HTML,
    TAGS,
    VARIANT_BARCODE,
    IMAGE_ALT_TEXT,
    SEO_TITLE,
    SEO_DESCRIPTION,
];

/// Full output header: platform columns followed by metafield columns
pub fn header() -> Vec<&'static str> {
    STANDARD_COLUMNS
        .iter()
        .copied()
        .chain(METAFIELD_COLUMNS.iter().map(|c| c.header))
        .collect()
}

/// One output row; unset columns are written empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShopifyRow {
    fields: HashMap<&'static str, String>,
}

impl ShopifyRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &'static str, value: impl Into<String>) -> &mut Self {
        self.fields.insert(column, value.into());
        self
    }

    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map_or("", String::as_str)
    }

    /// Continuation rows have an empty handle
    pub fn is_continuation(&self) -> bool {
        self.get(HANDLE).is_empty()
    }
}

/// Quote a field for output
///
/// Non-empty values are quoted only when they contain a delimiter, quote or
/// line break. Empty values are written bare unless `quote_empty` is set.
pub fn escape_field(value: &str, quote_empty: bool) -> Cow<'_, str> {
    if value.is_empty() {
        return if quote_empty {
            Cow::Borrowed("\"\"")
        } else {
            Cow::Borrowed("")
        };
    }
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Writes Shopify rows with the importer's quoting rules
pub struct ShopifyWriter<W: Write> {
    inner: W,
    columns: Vec<&'static str>,
    rows_written: usize,
}

impl<W: Write> ShopifyWriter<W> {
    /// Create a writer and emit the header line
    pub fn new(mut inner: W) -> io::Result<Self> {
        let columns = header();
        let line = columns
            .iter()
            .map(|c| escape_field(c, false))
            .collect::<Vec<_>>()
            .join(",");
        inner.write_all(line.as_bytes())?;
        inner.write_all(b"\n")?;

        Ok(Self {
            inner,
            columns,
            rows_written: 0,
        })
    }

    pub fn write_row(&mut self, row: &ShopifyRow) -> io::Result<()> {
        let line = self
            .columns
            .iter()
            .map(|column| escape_field(row.get(column), QUOTE_WHEN_EMPTY.contains(column)))
            .collect::<Vec<_>>()
            .join(",");
        self.inner.write_all(line.as_bytes())?;
        self.inner.write_all(b"\n")?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_has_48_columns() {
        let header = header();
        assert_eq!(header.len(), 48);
        assert_eq!(header[0], "Handle");
        assert_eq!(header[35], "Status");
        assert_eq!(header[47], "Tax Rate (product.metafields.custom.tax_rate)");
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("simple", false), "simple");
        assert_eq!(escape_field("with,comma", false), "\"with,comma\"");
        assert_eq!(escape_field("with\"quote", false), "\"with\"\"quote\"");
        assert_eq!(escape_field("with\nnewline", false), "\"with\nnewline\"");
        assert_eq!(escape_field("", false), "");
        assert_eq!(escape_field("", true), "\"\"");
    }

    #[test]
    fn test_writer_quotes_selected_empty_columns() {
        let mut row = ShopifyRow::new();
        row.set(HANDLE, "abc").set(TITLE, "Apple");

        let mut writer = ShopifyWriter::new(Vec::new()).unwrap();
        writer.write_row(&row).unwrap();
        assert_eq!(writer.rows_written(), 1);
        let out = String::from_utf8(writer.finish().unwrap()).unwrap();

        let line = out.lines().nth(1).unwrap();
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), 48);
        assert_eq!(fields[0], "abc");
        assert_eq!(fields[1], "Apple");
        assert_eq!(fields[2], "\"\"");
        assert_eq!(fields[3], "");
        assert_eq!(fields[6], "\"\"");
    }

    #[test]
    fn test_written_file_parses_back() {
        let mut row = ShopifyRow::new();
        row.set(HANDLE, "abc")
            .set(BODY_HTML, "<p>one,\n\"two\"</p>");

        let mut writer = ShopifyWriter::new(Vec::new()).unwrap();
        writer.write_row(&row).unwrap();
        writer.write_row(ShopifyRow::new().set(VARIANT_SKU, "abc-2s")).unwrap();
        let out = writer.finish().unwrap();

        let mut rdr = csv::Reader::from_reader(out.as_slice());
        let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][2], "<p>one,\n\"two\"</p>");
        assert_eq!(&records[1][0], "");
        assert_eq!(&records[1][14], "abc-2s");
    }

    #[test]
    fn test_continuation_row() {
        let mut row = ShopifyRow::new();
        assert!(row.is_continuation());
        row.set(HANDLE, "abc");
        assert!(!row.is_continuation());
    }
}

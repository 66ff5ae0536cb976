//! Rakuten RMS item export: column layout and row reader
//!
//! The export is a wide CSV with Japanese headers. Attribute and image
//! columns repeat with a numeric suffix; their names are computed once into
//! static slot tables instead of being spelled out 160 times.

use csv::{ReaderBuilder, StringRecord};
use miette::Diagnostic;
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

pub const CODE_COLUMN: &str = "商品管理番号（商品URL）";
pub const SKU_COLUMN: &str = "SKU管理番号";
pub const NAME_COLUMN: &str = "商品名";
pub const DESCRIPTION_COLUMN: &str = "PC用商品説明文";
pub const PRICE_COLUMN: &str = "販売価格";
pub const TAX_RATE_COLUMN: &str = "消費税率";
pub const CATEGORY_COLUMN: &str = "表示先カテゴリ";
pub const BARCODE_COLUMN: &str = "カタログID";

/// Attribute triples per row
pub const ATTRIBUTE_SLOTS: usize = 100;
/// Image slots per row
pub const IMAGE_SLOTS: usize = 20;

/// Column names of one attribute slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSlot {
    pub name: String,
    pub value: String,
    pub unit: String,
}

/// Column names of one image slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSlot {
    pub path: String,
    pub alt: String,
}

/// `商品属性（項目）N` / `商品属性（値）N` / `商品属性（単位）N` for N = 1..=100
pub static ATTRIBUTE_COLUMNS: LazyLock<Vec<AttributeSlot>> = LazyLock::new(|| {
    (1..=ATTRIBUTE_SLOTS)
        .map(|n| AttributeSlot {
            name: format!("商品属性（項目）{}", n),
            value: format!("商品属性（値）{}", n),
            unit: format!("商品属性（単位）{}", n),
        })
        .collect()
});

/// `商品画像パスN` / `商品画像名（ALT）N` for N = 1..=20
pub static IMAGE_COLUMNS: LazyLock<Vec<ImageSlot>> = LazyLock::new(|| {
    (1..=IMAGE_SLOTS)
        .map(|n| ImageSlot {
            path: format!("商品画像パス{}", n),
            alt: format!("商品画像名（ALT）{}", n),
        })
        .collect()
});

#[derive(Debug, Error, Diagnostic)]
pub enum SourceError {
    #[error("Required column '{0}' not found in header")]
    #[diagnostic(
        code(rts::source::missing_column),
        help("Is this a Rakuten RMS item export? Check the file encoding and the header row")
    )]
    MissingColumn(&'static str),

    #[error("Row {row}: CSV parse error: {message}")]
    #[diagnostic(code(rts::source::csv))]
    Csv { row: usize, message: String },

    #[error("Row {row}: missing product code")]
    #[diagnostic(code(rts::source::missing_code))]
    MissingCode { row: usize },
}

impl SourceError {
    /// Row-level errors may be skipped; header errors may not
    pub fn is_row_error(&self) -> bool {
        matches!(self, SourceError::Csv { .. } | SourceError::MissingCode { .. })
    }
}

/// One (item, value, unit) attribute
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeTriple {
    pub name: String,
    pub value: String,
    pub unit: String,
}

/// One product image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub path: String,
    pub alt: String,
}

/// One marketplace row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRecord {
    /// 1-based line number of the row in the file (header is row 1)
    pub row: usize,
    /// Product URL key shared by a product and its SKU rows
    pub product_id: String,
    /// Raw product code: SKU code when present, product key otherwise
    pub code: String,
    pub name: String,
    pub description: String,
    /// Price in yen; `None` when empty or unreadable
    pub price: Option<u64>,
    pub tax_rate: String,
    pub category: String,
    pub barcode: String,
    pub attributes: Vec<AttributeTriple>,
    pub images: Vec<ImageRef>,
}

/// Build a map from header name to column index
pub fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().trim_start_matches('\u{feff}').to_string(), i))
        .collect()
}

/// Get a trimmed field value from a CSV record, empty when absent
pub fn get_field(record: &StringRecord, header_map: &HashMap<String, usize>, field: &str) -> String {
    header_map
        .get(field)
        .and_then(|&idx| record.get(idx))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Parse a yen price such as `1,980` or `1980円`
pub fn parse_price(raw: &str) -> Option<u64> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('円')
        .chars()
        .filter(|c| *c != ',' && *c != '，')
        .collect();
    cleaned.parse().ok()
}

/// Reads [`SourceRecord`]s from decoded export text
pub struct SourceReader {
    header_map: HashMap<String, usize>,
    records: Vec<Result<StringRecord, (usize, String)>>,
    /// First row seen per product key, for SKU rows to inherit from
    products: HashMap<String, SourceRecord>,
}

impl SourceReader {
    pub fn from_text(text: &str) -> Result<Self, SourceError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| SourceError::Csv {
                row: 1,
                message: e.to_string(),
            })?
            .clone();
        let header_map = build_header_map(&headers);
        if !header_map.contains_key(CODE_COLUMN) {
            return Err(SourceError::MissingColumn(CODE_COLUMN));
        }

        let records = rdr
            .records()
            .enumerate()
            .map(|(idx, result)| {
                result.map_err(|e| {
                    let row = e
                        .position()
                        .map_or(idx + 2, |p| usize::try_from(p.line()).unwrap_or(idx + 2));
                    (row, e.to_string())
                })
            })
            .collect();

        Ok(Self {
            header_map,
            records,
            products: HashMap::new(),
        })
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Parse every row, in file order
    pub fn read_all(mut self) -> Vec<Result<SourceRecord, SourceError>> {
        let records = std::mem::take(&mut self.records);
        records
            .into_iter()
            .enumerate()
            .map(|(idx, result)| match result {
                Ok(record) => {
                    let row = record
                        .position()
                        .map_or(idx + 2, |p| usize::try_from(p.line()).unwrap_or(idx + 2));
                    self.parse_record(&record, row)
                }
                Err((row, message)) => Err(SourceError::Csv { row, message }),
            })
            .collect()
    }

    fn field(&self, record: &StringRecord, name: &str) -> String {
        get_field(record, &self.header_map, name)
    }

    fn parse_record(&mut self, record: &StringRecord, row: usize) -> Result<SourceRecord, SourceError> {
        let product_id = self.field(record, CODE_COLUMN);
        let sku = self.field(record, SKU_COLUMN);
        let code = if sku.is_empty() { product_id.clone() } else { sku };
        if code.is_empty() {
            return Err(SourceError::MissingCode { row });
        }

        let raw_price = self.field(record, PRICE_COLUMN);
        let price = if raw_price.is_empty() {
            None
        } else {
            let parsed = parse_price(&raw_price);
            if parsed.is_none() {
                tracing::warn!(row, code = %code, price = %raw_price, "unreadable price, leaving it empty");
            }
            parsed
        };

        let attributes = ATTRIBUTE_COLUMNS
            .iter()
            .map(|slot| AttributeTriple {
                name: self.field(record, &slot.name),
                value: self.field(record, &slot.value),
                unit: self.field(record, &slot.unit),
            })
            .filter(|t| !t.name.is_empty())
            .collect();

        let images = IMAGE_COLUMNS
            .iter()
            .map(|slot| ImageRef {
                path: self.field(record, &slot.path),
                alt: self.field(record, &slot.alt),
            })
            .filter(|img| !img.path.is_empty())
            .collect();

        let mut parsed = SourceRecord {
            row,
            product_id,
            code,
            name: self.field(record, NAME_COLUMN),
            description: self.field(record, DESCRIPTION_COLUMN),
            price,
            tax_rate: self.field(record, TAX_RATE_COLUMN),
            category: self.field(record, CATEGORY_COLUMN),
            barcode: self.field(record, BARCODE_COLUMN),
            attributes,
            images,
        };

        self.inherit_product_fields(&mut parsed);
        Ok(parsed)
    }

    /// SKU rows leave product-level fields empty; fill them from the product row
    fn inherit_product_fields(&mut self, record: &mut SourceRecord) {
        if record.product_id.is_empty() {
            return;
        }

        match self.products.get(&record.product_id) {
            Some(product) => {
                if record.name.is_empty() {
                    record.name.clone_from(&product.name);
                }
                if record.description.is_empty() {
                    record.description.clone_from(&product.description);
                }
                if record.category.is_empty() {
                    record.category.clone_from(&product.category);
                }
                if record.tax_rate.is_empty() {
                    record.tax_rate.clone_from(&product.tax_rate);
                }
                if record.price.is_none() {
                    record.price = product.price;
                }
                if record.images.is_empty() {
                    record.images.clone_from(&product.images);
                }
                if record.attributes.is_empty() {
                    record.attributes.clone_from(&product.attributes);
                }
            }
            None => {
                self.products
                    .insert(record.product_id.clone(), record.clone());
            }
        }
    }
}

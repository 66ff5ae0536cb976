//! Attribute triples → Shopify metafield columns
//!
//! Each marketplace row carries up to 100 free-form (item, value, unit)
//! attribute triples. Recognised item names are routed into metafield
//! columns through a [`MetafieldTable`]; count and size attributes get
//! special numeric handling.

use miette::Diagnostic;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

use crate::core::source::AttributeTriple;

static LEADING_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<num>[0-9]+(?:\.[0-9]+)?)\s*(?P<rest>.*?)\s*$").expect("valid number regex")
});

/// A destination metafield column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetafieldColumn {
    /// Short key used in mapping files
    pub key: &'static str,
    /// Column header in the Shopify import file
    pub header: &'static str,
}

/// Metafield columns appended to the Shopify header, in output order
pub const METAFIELD_COLUMNS: &[MetafieldColumn] = &[
    MetafieldColumn { key: "size", header: "Size (product.metafields.custom.size)" },
    MetafieldColumn { key: "count", header: "Count (product.metafields.custom.count)" },
    MetafieldColumn { key: "origin", header: "Origin (product.metafields.custom.origin)" },
    MetafieldColumn { key: "alcohol", header: "Alcohol (product.metafields.custom.alcohol)" },
    MetafieldColumn { key: "flavor", header: "Flavor (product.metafields.custom.flavor)" },
    MetafieldColumn { key: "ingredients", header: "Ingredients (product.metafields.custom.ingredients)" },
    MetafieldColumn { key: "storage", header: "Storage (product.metafields.custom.storage)" },
    MetafieldColumn { key: "best_before", header: "Best Before (product.metafields.custom.best_before)" },
    MetafieldColumn { key: "container", header: "Container (product.metafields.custom.container)" },
    MetafieldColumn { key: "brand", header: "Brand (product.metafields.custom.brand)" },
    MetafieldColumn { key: "model_number", header: "Model Number (product.metafields.custom.model_number)" },
    MetafieldColumn { key: "tax_rate", header: "Tax Rate (product.metafields.custom.tax_rate)" },
];

/// Look up a metafield column by key
pub fn column(key: &str) -> Option<&'static MetafieldColumn> {
    METAFIELD_COLUMNS.iter().find(|c| c.key == key)
}

#[derive(Debug, Error, Diagnostic)]
pub enum MetafieldError {
    #[error("Failed to read mapping file {path}: {source}")]
    #[diagnostic(code(rts::metafield::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid mapping file {path}: {message}")]
    #[diagnostic(
        code(rts::metafield::parse),
        help("Entries look like `産地: origin`, or a map with `column` and `class` keys")
    )]
    Parse { path: PathBuf, message: String },

    #[error("Mapping for '{attribute}' targets unknown metafield column '{column}' (known: {known})")]
    #[diagnostic(code(rts::metafield::unknown_column))]
    UnknownColumn {
        attribute: String,
        column: String,
        known: String,
    },
}

/// How an attribute's value is interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeClass {
    /// Value passes through as-is
    #[default]
    Plain,
    /// Pure numbers are noise and dropped
    Count,
    /// Volume, bucketed into size categories
    Size,
}

impl AttributeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeClass::Plain => "plain",
            AttributeClass::Count => "count",
            AttributeClass::Size => "size",
        }
    }
}

/// Where one attribute name goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetafieldRule {
    pub column: &'static MetafieldColumn,
    pub class: AttributeClass,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RuleSpec {
    Column(String),
    Full {
        column: String,
        #[serde(default)]
        class: AttributeClass,
    },
}

/// Attribute name → metafield rule
#[derive(Debug, Clone, Default)]
pub struct MetafieldTable {
    rules: BTreeMap<String, MetafieldRule>,
}

impl MetafieldTable {
    /// The built-in table
    pub fn builtin() -> Self {
        const BUILTIN: &[(&str, &str, AttributeClass)] = &[
            ("単品容量", "size", AttributeClass::Size),
            ("内容量", "size", AttributeClass::Size),
            ("容量", "size", AttributeClass::Size),
            ("総本数", "count", AttributeClass::Count),
            ("入数", "count", AttributeClass::Count),
            ("個数", "count", AttributeClass::Count),
            ("内容数", "count", AttributeClass::Count),
            ("原産国／製造国", "origin", AttributeClass::Plain),
            ("産地", "origin", AttributeClass::Plain),
            ("アルコール度数", "alcohol", AttributeClass::Plain),
            ("味・フレーバー", "flavor", AttributeClass::Plain),
            ("原材料名", "ingredients", AttributeClass::Plain),
            ("保存方法", "storage", AttributeClass::Plain),
            ("賞味期限", "best_before", AttributeClass::Plain),
            ("容器の種類", "container", AttributeClass::Plain),
            ("ブランド名", "brand", AttributeClass::Plain),
            ("メーカー型番", "model_number", AttributeClass::Plain),
        ];

        let mut table = Self::default();
        for (name, key, class) in BUILTIN {
            if let Some(column) = column(key) {
                table.rules.insert(
                    (*name).to_string(),
                    MetafieldRule {
                        column,
                        class: *class,
                    },
                );
            }
        }
        table
    }

    /// Add or override entries from a YAML file; returns the number of entries read
    pub fn extend_from_yaml(&mut self, path: &Path) -> Result<usize, MetafieldError> {
        let contents = std::fs::read_to_string(path).map_err(|source| MetafieldError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let specs: HashMap<String, RuleSpec> =
            serde_yml::from_str(&contents).map_err(|e| MetafieldError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let count = specs.len();
        for (attribute, spec) in specs {
            let (key, class) = match spec {
                RuleSpec::Column(key) => (key, AttributeClass::Plain),
                RuleSpec::Full { column, class } => (column, class),
            };
            let target = column(&key).ok_or_else(|| MetafieldError::UnknownColumn {
                attribute: attribute.clone(),
                column: key.clone(),
                known: METAFIELD_COLUMNS
                    .iter()
                    .map(|c| c.key)
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;
            self.rules
                .insert(attribute.trim().to_string(), MetafieldRule { column: target, class });
        }
        Ok(count)
    }

    pub fn get(&self, attribute: &str) -> Option<&MetafieldRule> {
        self.rules.get(attribute)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetafieldRule)> {
        self.rules.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Unmapped attribute names seen during a run, with occurrence counts
#[derive(Debug, Default)]
pub struct MappingReport {
    unmapped: BTreeMap<String, usize>,
}

impl MappingReport {
    /// Record an unmapped name; warns the first time a name is seen
    pub fn record_unmapped(&mut self, name: &str) {
        let count = self.unmapped.entry(name.to_string()).or_insert(0);
        if *count == 0 {
            tracing::warn!(attribute = %name, "attribute has no metafield mapping, dropping it");
        }
        *count += 1;
    }

    pub fn unmapped(&self) -> impl Iterator<Item = (&str, usize)> {
        self.unmapped.iter().map(|(name, n)| (name.as_str(), *n))
    }

    pub fn unmapped_count(&self) -> usize {
        self.unmapped.len()
    }
}

/// Map a row's attribute triples onto metafield columns (keyed by column key)
///
/// Repeated values for the same column are joined with a newline. A mapped
/// attribute whose value is filtered out still yields an (empty) entry.
pub fn map_attributes(
    triples: &[AttributeTriple],
    table: &MetafieldTable,
    report: &mut MappingReport,
) -> BTreeMap<&'static str, String> {
    let mut values: BTreeMap<&'static str, String> = BTreeMap::new();

    for triple in triples {
        let name = triple.name.trim();
        if name.is_empty() {
            continue;
        }

        let Some(rule) = table.get(name) else {
            report.record_unmapped(name);
            continue;
        };

        let value = match rule.class {
            AttributeClass::Plain => triple.value.trim().to_string(),
            AttributeClass::Count => filter_count(&triple.value),
            AttributeClass::Size => match size_category(&triple.value, &triple.unit) {
                Some(category) => category.to_string(),
                None => {
                    if !triple.value.trim().is_empty() {
                        tracing::warn!(
                            attribute = %name,
                            value = %triple.value,
                            unit = %triple.unit,
                            "could not read volume, passing value through"
                        );
                    }
                    triple.value.trim().to_string()
                }
            },
        };

        let slot = values.entry(rule.column.key).or_default();
        if !value.is_empty() {
            if !slot.is_empty() {
                slot.push('\n');
            }
            slot.push_str(&value);
        }
    }

    values
}

/// Count attributes carry noise like "1"; only descriptive values survive
pub fn filter_count(value: &str) -> String {
    let value = value.trim();
    if is_pure_numeric(value) {
        String::new()
    } else {
        value.to_string()
    }
}

fn is_pure_numeric(value: &str) -> bool {
    let normalized = to_ascii_digits(value);
    normalized.chars().any(|c| c.is_ascii_digit())
        && normalized
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == ',')
}

/// Replace full-width digits and punctuation with their ASCII forms
fn to_ascii_digits(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            '．' => '.',
            '，' => ',',
            _ => c,
        })
        .collect()
}

/// Size category buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeCategory {
    SS,
    S,
    M,
    L,
    LL,
}

impl SizeCategory {
    pub fn from_ml(ml: f64) -> Self {
        if ml <= 100.0 {
            SizeCategory::SS
        } else if ml <= 250.0 {
            SizeCategory::S
        } else if ml <= 500.0 {
            SizeCategory::M
        } else if ml < 2000.0 {
            // Anything whose whole-litre part is 1 still counts as a 1L bottle
            SizeCategory::L
        } else {
            SizeCategory::LL
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SizeCategory::SS => "SS（〜100ml）",
            SizeCategory::S => "S（〜250ml）",
            SizeCategory::M => "M（〜500ml）",
            SizeCategory::L => "L（〜1L）",
            SizeCategory::LL => "LL（1L〜）",
        }
    }
}

/// Parse a volume in millilitres from a value and unit cell
///
/// The unit may also trail the number inside the value cell ("720ml").
/// A missing unit is read as millilitres.
pub fn volume_ml(value: &str, unit: &str) -> Option<f64> {
    let normalized = to_ascii_digits(value).replace(',', "");
    let caps = LEADING_NUMBER_RE.captures(&normalized)?;
    let number: f64 = caps.name("num")?.as_str().parse().ok()?;

    let unit = unit.trim();
    let unit = if unit.is_empty() {
        caps.name("rest").map_or("", |m| m.as_str())
    } else {
        unit
    };

    let factor = match unit.to_lowercase().as_str() {
        "" | "ml" | "ｍｌ" | "cc" | "ミリリットル" => 1.0,
        "l" | "ｌ" | "ℓ" | "リットル" => 1000.0,
        _ => return None,
    };
    Some(number * factor)
}

/// Size category label for a volume attribute
pub fn size_category(value: &str, unit: &str) -> Option<&'static str> {
    volume_ml(value, unit).map(|ml| SizeCategory::from_ml(ml).label())
}

//! SKU → handle → variant derivation
//!
//! Marketplace product codes encode pack sizes and trial sizes as suffixes on
//! a base code (`abc-3s`, `abc-ss`, `abc-t`). Stripping the suffix yields the
//! handle that groups all variants of one product.

use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::LazyLock;

static SET_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<base>.+)-(?P<count>[0-9]+)s$").expect("valid set regex"));

/// Sort position for `-ss` variants; they always come last in their group
pub const SS_SORT_POSITION: u32 = 9999;

/// Option axis name used by groups with more than one variant
pub const OPTION_NAME: &str = "セット内容";

/// Platform defaults for products without a variant axis
pub const DEFAULT_OPTION_NAME: &str = "Title";
pub const DEFAULT_OPTION_VALUE: &str = "Default Title";

/// What kind of variant a product code denotes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    /// The base product
    Main,
    /// N-pack set (`-Ns`)
    SetVariant { count: u32 },
    /// `-ss` variant
    SsVariant,
    /// Trial size (`-t`)
    TrialVariant,
}

impl VariantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Main => "main",
            VariantKind::SetVariant { .. } => "set_variant",
            VariantKind::SsVariant => "ss_variant",
            VariantKind::TrialVariant => "trial_variant",
        }
    }

    /// Position within the handle group; lower sorts first
    pub fn sort_position(&self) -> u32 {
        match self {
            VariantKind::Main => 0,
            VariantKind::SetVariant { count } => *count,
            VariantKind::SsVariant => SS_SORT_POSITION,
            VariantKind::TrialVariant => 1,
        }
    }

    /// Option value shown for this variant
    pub fn option_value(&self) -> String {
        match self {
            VariantKind::Main => "単品".to_string(),
            VariantKind::SetVariant { count } => format!("{}個セット", count),
            VariantKind::SsVariant => "SSサイズ".to_string(),
            VariantKind::TrialVariant => "お試し".to_string(),
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One suffix rule: returns the handle and kind when the code matches
pub struct SuffixRule {
    pub name: &'static str,
    matcher: fn(&str) -> Option<(&str, VariantKind)>,
}

impl SuffixRule {
    pub fn apply<'a>(&self, code: &'a str) -> Option<(&'a str, VariantKind)> {
        (self.matcher)(code)
    }
}

fn match_set(code: &str) -> Option<(&str, VariantKind)> {
    let caps = SET_SUFFIX_RE.captures(code)?;
    // a zero-pack is not a set
    let count = caps
        .name("count")?
        .as_str()
        .parse()
        .ok()
        .filter(|&n: &u32| n > 0)?;
    let base = caps.name("base")?;
    Some((&code[..base.end()], VariantKind::SetVariant { count }))
}

fn match_ss(code: &str) -> Option<(&str, VariantKind)> {
    code.strip_suffix("-ss")
        .filter(|base| !base.is_empty())
        .map(|base| (base, VariantKind::SsVariant))
}

fn match_trial(code: &str) -> Option<(&str, VariantKind)> {
    code.strip_suffix("-t")
        .filter(|base| !base.is_empty())
        .map(|base| (base, VariantKind::TrialVariant))
}

/// Suffix rules in precedence order; the first match wins
pub const SUFFIX_RULES: &[SuffixRule] = &[
    SuffixRule {
        name: "set",
        matcher: match_set,
    },
    SuffixRule {
        name: "ss",
        matcher: match_ss,
    },
    SuffixRule {
        name: "trial",
        matcher: match_trial,
    },
];

/// Result of deriving a handle from a raw product code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedVariant {
    /// The raw code, trimmed
    pub code: String,
    pub handle: String,
    pub kind: VariantKind,
    pub sort_position: u32,
    pub option_value: String,
}

/// Derive handle, variant kind, sort position and option value for a code
///
/// Codes that match no suffix rule are treated as main products.
pub fn derive_handle(code: &str) -> DerivedVariant {
    let code = code.trim();

    let (handle, kind) = SUFFIX_RULES
        .iter()
        .find_map(|rule| rule.apply(code))
        .unwrap_or_else(|| {
            if code.contains('-') {
                tracing::debug!(code, "no suffix rule matched, treating as main product");
            }
            (code, VariantKind::Main)
        });

    DerivedVariant {
        code: code.to_string(),
        handle: handle.to_string(),
        kind,
        sort_position: kind.sort_position(),
        option_value: kind.option_value(),
    }
}

/// All rows sharing one handle, in sort order
#[derive(Debug, Clone)]
pub struct VariantGroup<T> {
    pub handle: String,
    pub members: Vec<(DerivedVariant, T)>,
}

impl<T> VariantGroup<T> {
    /// Variant axis name; only groups with more than one row get one
    pub fn option_name(&self) -> Option<&'static str> {
        (self.members.len() > 1).then_some(OPTION_NAME)
    }

    pub fn has_variants(&self) -> bool {
        self.members.len() > 1
    }

    /// Collapse members that repeat an earlier member's code
    ///
    /// Each repeat is handed to `merge` together with the first member
    /// carrying that code, then removed. Returns the number removed.
    pub fn dedup_codes(&mut self, mut merge: impl FnMut(&mut T, T)) -> usize {
        let before = self.members.len();
        let mut kept: Vec<(DerivedVariant, T)> = Vec::with_capacity(before);
        let mut index: HashMap<String, usize> = HashMap::new();

        for (derived, item) in std::mem::take(&mut self.members) {
            match index.get(&derived.code) {
                Some(&at) => {
                    tracing::debug!(handle = %self.handle, code = %derived.code, "merging repeated product code");
                    merge(&mut kept[at].1, item);
                }
                None => {
                    index.insert(derived.code.clone(), kept.len());
                    kept.push((derived, item));
                }
            }
        }

        self.members = kept;
        before - self.members.len()
    }

    /// Option value for a member, honouring the single-variant default
    pub fn option_value_for(&self, derived: &DerivedVariant) -> String {
        if self.has_variants() {
            derived.option_value.clone()
        } else {
            DEFAULT_OPTION_VALUE.to_string()
        }
    }
}

/// Group rows by handle and sort them by `(handle, sort_position)`
///
/// The sort within a group is stable, so rows with equal positions keep
/// their input order.
pub fn group_variants<T>(items: impl IntoIterator<Item = (DerivedVariant, T)>) -> Vec<VariantGroup<T>> {
    let mut by_handle: BTreeMap<String, Vec<(DerivedVariant, T)>> = BTreeMap::new();
    for (derived, item) in items {
        by_handle
            .entry(derived.handle.clone())
            .or_default()
            .push((derived, item));
    }

    by_handle
        .into_iter()
        .map(|(handle, mut members)| {
            members.sort_by_key(|(derived, _)| derived.sort_position);

            if members.len() > 1 && members[0].0.kind != VariantKind::Main {
                tracing::debug!(handle = %handle, "handle group has no main product row");
            }

            VariantGroup { handle, members }
        })
        .collect()
}

//! Integration tests for the rts CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to get an rts command isolated from the user's config
fn rts(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("rts").unwrap();
    cmd.current_dir(tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path().join("xdg"))
        .env("HOME", tmp.path())
        .env_remove("RTS_VENDOR")
        .env_remove("RTS_IMAGE_BASE")
        .env_remove("RTS_SPLIT_BYTES")
        .env_remove("RTS_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

const SHOPIFY_SAMPLE: &str = "Handle,Title,Body (HTML),Variant SKU\n\
abc,Apple,\"<p>crisp\nred</p>\",abc\n\
,,,abc-2s\n\
,,,abc-t\n\
def,Date,plain,def\n\
ghi,Grape,\"<div>\n<b>bold</b>\n</div>\",ghi\n\
,,,ghi-ss\n";

/// A small Rakuten export: one product with two SKUs and one single product
fn rakuten_export() -> String {
    [
        "商品管理番号（商品URL）,SKU管理番号,商品名,PC用商品説明文,販売価格,消費税率,表示先カテゴリ,商品属性（項目）1,商品属性（値）1,商品属性（単位）1,商品属性（項目）2,商品属性（値）2,商品属性（単位）2,商品画像パス1,商品画像名（ALT）1,商品画像パス2,商品画像名（ALT）2",
        "sake,,純米酒,\"<p>辛口,\n旨口</p><script>x()</script>\",1980,0.1,酒\\日本酒,単品容量,720,ml,謎の項目,?,,/img/a.jpg,表,/img/b.jpg,裏",
        "sake,sake-6s,,,10800,,,,,,,,,,,,",
        "umeshu,,梅酒,,1200,0.08,,総本数,1,本,,,,,,,",
    ]
    .join("\n")
        + "\n"
}

fn write_shift_jis(path: &Path, text: &str) {
    let (encoded, _, had_errors) = encoding_rs::SHIFT_JIS.encode(text);
    assert!(!had_errors);
    fs::write(path, &encoded).unwrap();
}

fn read_csv(path: &Path) -> Vec<csv::StringRecord> {
    let content = fs::read_to_string(path).unwrap();
    csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(content.as_bytes())
        .records()
        .map(|r| r.unwrap())
        .collect()
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    rts(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Shopify"))
        .stdout(predicate::str::contains("convert"))
        .stdout(predicate::str::contains("split"));
}

#[test]
fn test_version_displays() {
    let tmp = TempDir::new().unwrap();
    rts(&tmp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rts"));
}

#[test]
fn test_unknown_command_fails() {
    let tmp = TempDir::new().unwrap();
    rts(&tmp)
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    rts(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_rts"));
}

// ============================================================================
// Handle Tests
// ============================================================================

#[test]
fn test_handle_tsv() {
    let tmp = TempDir::new().unwrap();
    let output = rts(&tmp)
        .args(["handle", "abc-12s", "-f", "tsv"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    insta::assert_snapshot!(stdout.trim_end(), @"abc-12s\tabc\tset_variant\t12\t12個セット");
}

#[test]
fn test_handle_all_kinds() {
    let tmp = TempDir::new().unwrap();
    rts(&tmp)
        .args(["handle", "abc", "abc-ss", "abc-t", "abc-x", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("abc\tabc\tmain\t0\t単品"))
        .stdout(predicate::str::contains("abc-ss\tabc\tss_variant\t9999\tSSサイズ"))
        .stdout(predicate::str::contains("abc-t\tabc\ttrial_variant\t1\tお試し"))
        .stdout(predicate::str::contains("abc-x\tabc-x\tmain\t0"));
}

#[test]
fn test_handle_json() {
    let tmp = TempDir::new().unwrap();
    let output = rts(&tmp)
        .args(["handle", "abc-3s", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed[0]["handle"], "abc");
    assert_eq!(parsed[0]["position"], "3");
}

// ============================================================================
// Split / Merge Tests
// ============================================================================

#[test]
fn test_split_and_merge_round_trip() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("products.csv");
    fs::write(&input, SHOPIFY_SAMPLE).unwrap();

    rts(&tmp)
        .args(["split", "products.csv", "--records", "2", "-o", "parts", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("products_001.csv"))
        .stdout(predicate::str::contains("products_003.csv"));

    for idx in 1..=3 {
        let shard = fs::read_to_string(tmp.path().join(format!("parts/products_{:03}.csv", idx))).unwrap();
        assert!(shard.starts_with("Handle,Title,Body (HTML),Variant SKU\n"));
    }
    // the multi-line group stays whole
    let first = fs::read_to_string(tmp.path().join("parts/products_001.csv")).unwrap();
    assert!(first.contains("\"<p>crisp\nred</p>\""));
    assert!(first.contains(",,,abc-t\n"));

    rts(&tmp)
        .args(["merge", "parts", "-o", "merged.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Merged 6 records"));

    let merged = fs::read_to_string(tmp.path().join("merged.csv")).unwrap();
    assert_eq!(merged, SHOPIFY_SAMPLE);
}

#[test]
fn test_split_by_bytes_with_size_suffix() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("products.csv"), SHOPIFY_SAMPLE).unwrap();

    rts(&tmp)
        .args(["split", "products.csv", "--bytes", "1K", "-o", "parts"])
        .assert()
        .success();

    assert!(tmp.path().join("parts/products_001.csv").exists());
    assert!(!tmp.path().join("parts/products_002.csv").exists());
}

#[test]
fn test_split_unbalanced_quotes_fails() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("broken.csv"),
        "Handle,Title\nabc,\"never closed\nmore text\n",
    )
    .unwrap();

    rts(&tmp)
        .args(["split", "broken.csv", "--records", "1", "-o", "parts"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unbalanced quotes"));
}

#[test]
fn test_merge_header_mismatch_fails() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.csv"), "Handle,Title\nabc,Apple\n").unwrap();
    fs::write(tmp.path().join("b.csv"), "Handle,Name\ndef,Date\n").unwrap();

    rts(&tmp)
        .args(["merge", "a.csv", "b.csv", "-o", "merged.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("b.csv"));
}

#[test]
fn test_merge_adds_missing_newline() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.csv"), "Handle,Title\nabc,Apple").unwrap();
    fs::write(tmp.path().join("b.csv"), "Handle,Title\ndef,Date\n").unwrap();

    rts(&tmp)
        .args(["merge", "a.csv", "b.csv", "-o", "merged.csv"])
        .assert()
        .success();

    let merged = fs::read_to_string(tmp.path().join("merged.csv")).unwrap();
    assert_eq!(merged, "Handle,Title\nabc,Apple\ndef,Date\n");
}

// ============================================================================
// Convert Tests
// ============================================================================

#[test]
fn test_convert_shift_jis_export() {
    let tmp = TempDir::new().unwrap();
    write_shift_jis(&tmp.path().join("rakuten.csv"), &rakuten_export());

    rts(&tmp)
        .args([
            "convert",
            "rakuten.csv",
            "-o",
            "shopify.csv",
            "--vendor",
            "酒蔵",
            "--image-base",
            "https://img.test/cabinet",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("cp932"))
        .stdout(predicate::str::contains("謎の項目"));

    let records = read_csv(&tmp.path().join("shopify.csv"));
    let header = &records[0];
    assert_eq!(header.len(), 48);
    assert_eq!(&header[0], "Handle");

    let col = |name: &str| header.iter().position(|h| h == name).unwrap();

    // sake: main row, 6-pack variant row, extra image row; then umeshu
    assert_eq!(records.len(), 5);
    let sake = &records[1];
    assert_eq!(&sake[col("Handle")], "sake");
    assert_eq!(&sake[col("Vendor")], "酒蔵");
    assert_eq!(&sake[col("Body (HTML)")], "<p>辛口,\n旨口</p>");
    assert_eq!(&sake[col("Tags")], "酒, 日本酒");
    assert_eq!(&sake[col("Option1 Name")], "セット内容");
    assert_eq!(&sake[col("Option1 Value")], "単品");
    assert_eq!(&sake[col("Image Src")], "https://img.test/cabinet/img/a.jpg");
    assert_eq!(&sake[col("Size (product.metafields.custom.size)")], "L（〜1L）");
    assert_eq!(&sake[col("Tax Rate (product.metafields.custom.tax_rate)")], "10%");

    let six = &records[2];
    assert_eq!(&six[col("Handle")], "");
    assert_eq!(&six[col("Variant SKU")], "sake-6s");
    assert_eq!(&six[col("Option1 Value")], "6個セット");
    assert_eq!(&six[col("Variant Price")], "10800");

    let image = &records[3];
    assert_eq!(&image[col("Handle")], "");
    assert_eq!(&image[col("Image Position")], "2");

    let umeshu = &records[4];
    assert_eq!(&umeshu[col("Handle")], "umeshu");
    assert_eq!(&umeshu[col("Option1 Name")], "Title");
    assert_eq!(&umeshu[col("Option1 Value")], "Default Title");
    assert_eq!(&umeshu[col("Count (product.metafields.custom.count)")], "");
}

#[test]
fn test_convert_quotes_selected_empty_columns() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("rakuten.csv"),
        "商品管理番号（商品URL）,商品名,販売価格\nplain,Plain,100\n",
    )
    .unwrap();

    rts(&tmp)
        .args(["convert", "rakuten.csv", "-o", "shopify.csv"])
        .assert()
        .success();

    let content = fs::read_to_string(tmp.path().join("shopify.csv")).unwrap();
    let row = content.lines().nth(1).unwrap();
    assert!(row.starts_with("plain,Plain,\"\",,,,\"\",TRUE,Title,Default Title,"));
}

#[test]
fn test_convert_dry_run_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("rakuten.csv"), rakuten_export()).unwrap();

    rts(&tmp)
        .args(["convert", "rakuten.csv", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run complete"));

    assert!(!tmp.path().join("shopify.csv").exists());
}

#[test]
fn test_convert_requires_output_unless_dry_run() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("rakuten.csv"), rakuten_export()).unwrap();

    rts(&tmp)
        .args(["convert", "rakuten.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--output"));
}

#[test]
fn test_convert_missing_code_aborts() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("rakuten.csv"),
        "商品管理番号（商品URL）,商品名\n,名無し\nok,OK\n",
    )
    .unwrap();

    rts(&tmp)
        .args(["convert", "rakuten.csv", "-o", "shopify.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing product code"));

    rts(&tmp)
        .args(["convert", "rakuten.csv", "-o", "shopify.csv", "--skip-errors"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rows dropped"));

    let records = read_csv(&tmp.path().join("shopify.csv"));
    assert_eq!(records.len(), 2);
}

#[test]
fn test_convert_missing_file_fails() {
    let tmp = TempDir::new().unwrap();
    rts(&tmp)
        .args(["convert", "nope.csv", "-o", "out.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_convert_uses_config_vendor() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("rts.yaml"), "vendor: 蔵元\n").unwrap();
    fs::write(
        tmp.path().join("rakuten.csv"),
        "商品管理番号（商品URL）,商品名\nabc,A\n",
    )
    .unwrap();

    rts(&tmp)
        .args(["convert", "rakuten.csv", "-o", "shopify.csv"])
        .assert()
        .success();

    let records = read_csv(&tmp.path().join("shopify.csv"));
    assert_eq!(&records[1][3], "蔵元");
}

// ============================================================================
// Config / Mapping Tests
// ============================================================================

#[test]
fn test_config_show_layers() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("rts.yaml"), "vendor: local\nsplit_bytes: 1000\n").unwrap();
    fs::write(tmp.path().join("extra.yaml"), "vendor: explicit\n").unwrap();

    rts(&tmp)
        .args(["config", "--config", "extra.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vendor: explicit"))
        .stdout(predicate::str::contains("split_bytes: 1000"));

    rts(&tmp)
        .args(["config", "show", "vendor"])
        .env("RTS_VENDOR", "from-env")
        .assert()
        .success()
        .stdout(predicate::str::diff("from-env\n"));
}

#[test]
fn test_config_bad_explicit_file_fails() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("bad.yaml"), "split_bytes: [1, 2]\n").unwrap();

    rts(&tmp)
        .args(["config", "--config", "bad.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad.yaml"));
}

#[test]
fn test_mapping_includes_extra_entries() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("map.yaml"), "度数: alcohol\n").unwrap();
    fs::write(tmp.path().join("rts.yaml"), "metafield_map: map.yaml\n").unwrap();

    rts(&tmp)
        .args(["mapping", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("単品容量\tsize\tsize"))
        .stdout(predicate::str::contains("度数\talcohol\tplain"));
}

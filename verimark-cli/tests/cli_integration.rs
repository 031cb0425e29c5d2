//! CLI integration tests for verimark-cli.
//!
//! These tests run the actual binary against generated images and check
//! outputs, exit codes and file artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the verimark binary.
fn verimark() -> Command {
    Command::cargo_bin("verimark").unwrap()
}

/// Write a mid-tone PNG into `dir` and return its path.
fn write_png(dir: &Path, name: &str, size: u32) -> PathBuf {
    let image = image::RgbaImage::from_fn(size, size, |x, y| {
        image::Rgba([
            (x * 255 / size) as u8,
            (y * 255 / size) as u8,
            70 + ((x * 3 + y * 5) % 110) as u8,
            255,
        ])
    });
    let path = dir.join(name);
    image.save(&path).unwrap();
    path
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    verimark()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Invisible watermarks"))
        .stdout(predicate::str::contains("embed"))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("hide"))
        .stdout(predicate::str::contains("reveal"))
        .stdout(predicate::str::contains("register"))
        .stdout(predicate::str::contains("records"));
}

#[test]
fn test_version_displays_version() {
    verimark()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("verimark"));
}

#[test]
fn test_help_shows_exit_codes() {
    verimark()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("65"))
        .stdout(predicate::str::contains("77"));
}

#[test]
fn test_embed_help_shows_options() {
    verimark()
        .args(["embed", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--algorithm"))
        .stdout(predicate::str::contains("--strength"))
        .stdout(predicate::str::contains("--redundancy"))
        .stdout(predicate::str::contains("--encrypt"));
}

// ============================================================================
// Exit Code Tests
// ============================================================================

#[test]
fn test_missing_file_returns_input_error() {
    // Exit code 66 = EX_NOINPUT
    verimark()
        .args(["verify", "nonexistent_file.png"])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn test_unmarked_image_fails_verification() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "clean.png", 64);

    verimark()
        .args(["verify", arg(&image)])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("No watermark detected"));
}

#[test]
fn test_text_file_is_unsupported() {
    let temp = TempDir::new().unwrap();
    let notes = temp.path().join("notes.txt");
    fs::write(&notes, b"plain text").unwrap();

    verimark()
        .args(["hide", "-m", "hi", arg(&notes)])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Unsupported type"));
}

#[test]
fn test_out_of_range_strength_is_usage_error() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "a.png", 64);

    verimark()
        .args(["embed", "-c", "x", "--strength", "101", arg(&image)])
        .assert()
        .code(64);
}

// ============================================================================
// Watermark Workflow
// ============================================================================

#[test]
fn test_embed_verify_roundtrip() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "photo.png", 128);

    verimark()
        .args([
            "embed",
            "-c",
            "HELLO",
            "--algorithm",
            "dwt",
            "--strength",
            "70",
            arg(&image),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Watermark embedded"));

    let marked = temp.path().join("photo.watermarked.png");
    assert!(marked.exists(), "Output file should exist");

    verimark()
        .args(["verify", arg(&marked)])
        .assert()
        .success()
        .stdout(predicate::str::contains("HELLO"));
}

#[test]
fn test_verify_json_output() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "photo.png", 128);
    let marked = temp.path().join("out.png");

    verimark()
        .args(["embed", "-c", "json me", "-a", "dwt", "-o", arg(&marked), arg(&image)])
        .assert()
        .success();

    let output = verimark()
        .args(["verify", "--json", arg(&marked)])
        .assert()
        .success();
    let json: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(json["isVerified"], true);
    assert_eq!(json["originalWatermark"], "json me");
    assert_eq!(json["contentType"], "text");
}

#[test]
fn test_password_protected_watermark() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "photo.png", 128);
    let marked = temp.path().join("locked.png");

    verimark()
        .args([
            "embed", "-c", "owner", "-a", "dwt", "-p", "pw", "--encrypt", "-o",
            arg(&marked),
            arg(&image),
        ])
        .assert()
        .success();

    // Exit code 77 = EX_NOPERM
    verimark().args(["verify", arg(&marked)]).assert().code(77);
    verimark()
        .args(["verify", "-p", "wrong", arg(&marked)])
        .assert()
        .code(77)
        .stderr(predicate::str::contains("Invalid password"));
    verimark()
        .args(["verify", "-p", "pw", arg(&marked)])
        .assert()
        .success()
        .stdout(predicate::str::contains("owner"));
}

#[test]
fn test_encrypt_requires_password() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "a.png", 64);

    verimark()
        .args(["embed", "-c", "x", "--encrypt", arg(&image)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--password"));
}

// ============================================================================
// Steganography Workflow
// ============================================================================

#[test]
fn test_hide_reveal_roundtrip() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "cover.png", 128);

    for method in ["lsb", "advanced", "dct"] {
        let output = temp.path().join(format!("{method}.png"));
        verimark()
            .args([
                "hide",
                "-m",
                "meet at noon",
                "--method",
                method,
                "-o",
                arg(&output),
                arg(&image),
            ])
            .assert()
            .success();

        verimark()
            .args(["reveal", arg(&output)])
            .assert()
            .success()
            .stdout("meet at noon\n");
    }
}

#[test]
fn test_reveal_encrypted_message() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "cover.png", 64);

    verimark()
        .args(["hide", "-m", "secret", "-p", "hunter2", arg(&image)])
        .assert()
        .success();
    let hidden = temp.path().join("cover.hidden.png");

    verimark()
        .args(["reveal", arg(&hidden)])
        .assert()
        .code(77)
        .stderr(predicate::str::contains("requires a password"));
    verimark()
        .args(["reveal", "-p", "hunter2", arg(&hidden)])
        .assert()
        .success()
        .stdout("secret\n");
}

#[test]
fn test_quiet_reveal_prints_only_the_message() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "cover.png", 64);

    verimark()
        .args(["-q", "hide", "-m", "piped", arg(&image)])
        .assert()
        .success();

    verimark()
        .args(["-q", "reveal", arg(&temp.path().join("cover.hidden.png"))])
        .assert()
        .success()
        .stdout("piped\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_reveal_clean_image() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "clean.png", 64);

    verimark()
        .args(["reveal", arg(&image)])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Could not detect any hidden data"));
}

// ============================================================================
// Registration Workflow
// ============================================================================

#[test]
fn test_register_appends_and_continues_blocks() {
    let temp = TempDir::new().unwrap();
    let records = temp.path().join("records.json");
    let a = temp.path().join("a.txt");
    let b = temp.path().join("b.txt");
    fs::write(&a, b"first").unwrap();
    fs::write(&b, b"second").unwrap();

    verimark()
        .args(["register", "--records", arg(&records), arg(&a)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Registered"));
    verimark()
        .args(["register", "--private", "--records", arg(&records), arg(&b)])
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&records).unwrap()).unwrap();
    let list = json.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["fileName"], "b.txt");
    assert_eq!(list[0]["isPublic"], false);
    assert_eq!(list[1]["fileName"], "a.txt");
    assert_eq!(
        list[0]["blockNumber"].as_u64().unwrap(),
        list[1]["blockNumber"].as_u64().unwrap() + 1
    );
}

#[test]
fn test_same_bytes_register_same_hash() {
    let temp = TempDir::new().unwrap();
    let records = temp.path().join("records.json");
    let a = temp.path().join("a.bin");
    let b = temp.path().join("b.bin");
    fs::write(&a, b"identical").unwrap();
    fs::write(&b, b"identical").unwrap();

    verimark()
        .args(["--quiet", "register", "--records", arg(&records), arg(&a), arg(&b)])
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&records).unwrap()).unwrap();
    assert_eq!(json[0]["hash"], json[1]["hash"]);
}

#[test]
fn test_register_empty_file() {
    let temp = TempDir::new().unwrap();
    let records = temp.path().join("records.json");
    let empty = temp.path().join("empty.txt");
    fs::write(&empty, b"").unwrap();

    verimark()
        .args(["-q", "register", "--records", arg(&records), arg(&empty)])
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&records).unwrap()).unwrap();
    assert_eq!(json[0]["fileName"], "empty.txt");
    assert_eq!(
        json[0]["hash"],
        "0xa7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
    );
}

#[test]
fn test_embed_empty_image_is_input_error() {
    let temp = TempDir::new().unwrap();
    let empty = temp.path().join("blank.png");
    fs::write(&empty, b"").unwrap();

    verimark()
        .args(["embed", "-c", "x", arg(&empty)])
        .assert()
        .code(66);
}

#[test]
fn test_register_after_last_block_is_ledger_error() {
    let temp = TempDir::new().unwrap();
    let records = temp.path().join("records.json");
    fs::write(
        &records,
        r#"[{"id":"r1","fileName":"old.txt","fileType":"text/plain","hash":"0xa7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a","timestamp":"2024-01-01T00:00:00Z","blockNumber":18446744073709551615,"transactionId":"0x00","isPublic":true}]"#,
    )
    .unwrap();
    let file = temp.path().join("new.txt");
    fs::write(&file, b"new").unwrap();

    verimark()
        .args(["register", "--records", arg(&records), arg(&file)])
        .assert()
        .code(69)
        .stderr(predicate::str::contains("highest possible block"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&records).unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[test]
fn test_records_lists_entries() {
    let temp = TempDir::new().unwrap();
    let records = temp.path().join("records.json");
    let file = temp.path().join("report.pdf");
    fs::write(&file, b"%PDF-1.7").unwrap();

    verimark()
        .args(["-q", "register", "--records", arg(&records), arg(&file)])
        .assert()
        .success();

    verimark()
        .args(["records", "--records", arg(&records)])
        .assert()
        .success()
        .stdout(predicate::str::contains("report.pdf"))
        .stdout(predicate::str::contains("public"));
}

#[test]
fn test_records_without_file_is_empty() {
    let temp = TempDir::new().unwrap();
    verimark()
        .args(["records", "--records", arg(&temp.path().join("none.json"))])
        .assert()
        .success()
        .stdout(predicate::str::contains("No records"));
}

// ============================================================================
// Output Mode Tests
// ============================================================================

#[test]
fn test_quiet_mode_minimal_output() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "a.png", 64);

    let output = verimark()
        .args(["--quiet", "embed", "-c", "quiet", "-a", "dwt", arg(&image)])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    assert!(
        stdout.trim().is_empty(),
        "Quiet mode should have no stdout, got: {}",
        stdout
    );
}

#[test]
fn test_color_never_no_ansi() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "a.png", 64);

    let output = verimark()
        .args(["--color=never", "embed", "-c", "plain", "-a", "dwt", arg(&image)])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let stderr = String::from_utf8_lossy(&output.get_output().stderr);
    assert!(!stdout.contains("\x1b["), "stdout should not contain ANSI codes");
    assert!(!stderr.contains("\x1b["), "stderr should not contain ANSI codes");
}

#[test]
fn test_invalid_algorithm_rejected() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "a.png", 64);

    verimark()
        .args(["embed", "-c", "x", "--algorithm", "fft", arg(&image)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid").or(predicate::str::contains("possible values")));
}

#[test]
fn test_conflicting_verbose_quiet_rejected() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "a.png", 64);

    verimark()
        .args(["--verbose", "--quiet", "verify", arg(&image)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

//! End-to-end tests for the `pup` binary.

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use clap::Parser;
use predicates::prelude::*;
use serde_json::Value;
use std::process::Command;

use patchup::cli::{Cli, Commands, DiffFormat};

fn pup_cmd() -> Command {
    Command::cargo_bin("pup").expect("pup binary")
}

#[test]
fn diff_flag_parsing() {
    let argv = vec![
        "pup",
        "diff",
        "old.txt",
        "new.txt",
        "--format",
        "delta",
        "--timeout",
        "0",
        "--edit-cost",
        "6",
    ];

    let cmd = Cli::parse_from(argv);

    match cmd.command {
        Commands::Diff(args) => {
            assert!(matches!(args.format, DiffFormat::Delta));
            assert_eq!(args.timeout, Some(0.0));
            assert_eq!(args.edit_cost, Some(6));
            assert!(!args.no_line_mode);
        }
        _ => panic!("expected Diff command"),
    }
}

#[test]
fn find_flag_parsing() {
    let cmd = Cli::parse_from(["pup", "find", "hay.txt", "needle", "--loc", "42"]);
    match cmd.command {
        Commands::Find(args) => {
            assert_eq!(args.pattern, "needle");
            assert_eq!(args.loc, 42);
            assert_eq!(args.threshold, None);
        }
        _ => panic!("expected Find command"),
    }
}

#[test]
fn diff_delta_output() {
    let temp = assert_fs::TempDir::new().expect("temp dir");
    let old = temp.child("old.txt");
    let new = temp.child("new.txt");
    old.write_str("abc").expect("write old");
    new.write_str("ab123c").expect("write new");

    pup_cmd()
        .current_dir(temp.path())
        .args(["diff", "old.txt", "new.txt", "--format", "delta"])
        .assert()
        .success()
        .stdout("=2\t+123\t=1\n");
}

#[test]
fn diff_html_output() {
    let temp = assert_fs::TempDir::new().expect("temp dir");
    temp.child("old.txt").write_str("abc").expect("write old");
    temp.child("new.txt").write_str("axc").expect("write new");

    pup_cmd()
        .current_dir(temp.path())
        .args(["diff", "old.txt", "new.txt", "--format", "html"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<del style="))
        .stdout(predicate::str::contains("<ins style="));
}

#[test]
fn make_then_apply_round_trip() {
    let temp = assert_fs::TempDir::new().expect("temp dir");
    let old = temp.child("old.txt");
    let new = temp.child("new.txt");
    old.write_str("The quick brown fox jumps over the lazy dog.")
        .expect("write old");
    new.write_str("That quick brown fox jumped over a lazy dog.")
        .expect("write new");

    pup_cmd()
        .current_dir(temp.path())
        .args(["make", "old.txt", "new.txt", "-o", "change.patch"])
        .assert()
        .success();
    temp.child("change.patch")
        .assert(predicate::str::starts_with("@@ "));

    pup_cmd()
        .current_dir(temp.path())
        .args(["apply", "change.patch", "old.txt", "-o", "out.txt"])
        .assert()
        .success();
    temp.child("out.txt")
        .assert("That quick brown fox jumped over a lazy dog.");
}

#[test]
fn apply_on_drifted_text_still_succeeds() {
    let temp = assert_fs::TempDir::new().expect("temp dir");
    temp.child("old.txt")
        .write_str("The quick brown fox jumps over the lazy dog.")
        .expect("write old");
    temp.child("new.txt")
        .write_str("That quick brown fox jumped over a lazy dog.")
        .expect("write new");
    temp.child("drifted.txt")
        .write_str("The quick red rabbit jumps over the tired tiger.")
        .expect("write drifted");

    pup_cmd()
        .current_dir(temp.path())
        .args(["make", "old.txt", "new.txt", "-o", "change.patch"])
        .assert()
        .success();

    let assert = pup_cmd()
        .current_dir(temp.path())
        .args(["apply", "change.patch", "drifted.txt", "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    let v: Value = serde_json::from_str(stdout.trim()).expect("valid json");
    assert_eq!(v["text"], "That quick red rabbit jumped over a tired tiger.");
    assert_eq!(v["applied"], serde_json::json!([true, true]));
}

#[test]
fn apply_reports_failed_hunks() {
    let temp = assert_fs::TempDir::new().expect("temp dir");
    temp.child("old.txt")
        .write_str("The quick brown fox jumps over the lazy dog.")
        .expect("write old");
    temp.child("new.txt")
        .write_str("That quick brown fox jumped over a lazy dog.")
        .expect("write new");
    temp.child("unrelated.txt")
        .write_str("I am the very model of a modern major general.")
        .expect("write unrelated");

    pup_cmd()
        .current_dir(temp.path())
        .args(["make", "old.txt", "new.txt", "-o", "change.patch"])
        .assert()
        .success();

    pup_cmd()
        .current_dir(temp.path())
        .args(["apply", "change.patch", "unrelated.txt", "-o", "out.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("hunks failed"));
    // The text is left untouched when nothing matches.
    temp.child("out.txt")
        .assert("I am the very model of a modern major general.");
}

#[test]
fn apply_rejects_malformed_patch() {
    let temp = assert_fs::TempDir::new().expect("temp dir");
    temp.child("bad.patch").write_str("Bad\nPatch\n").expect("write patch");
    temp.child("file.txt").write_str("text").expect("write file");

    pup_cmd()
        .current_dir(temp.path())
        .args(["apply", "bad.patch", "file.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed patch header"));
}

#[test]
fn find_prints_location() {
    let temp = assert_fs::TempDir::new().expect("temp dir");
    temp.child("hay.txt")
        .write_str("abcdefghijk")
        .expect("write haystack");

    pup_cmd()
        .current_dir(temp.path())
        .args(["find", "hay.txt", "efxhi"])
        .assert()
        .success()
        .stdout("4\n");

    pup_cmd()
        .current_dir(temp.path())
        .args(["find", "hay.txt", "zzzzz"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no acceptable match"));
}

#[test]
fn init_writes_config() {
    let temp = assert_fs::TempDir::new().expect("temp dir");

    pup_cmd()
        .current_dir(temp.path())
        .args(["init"])
        .assert()
        .success();
    temp.child("patchup.toml")
        .assert(predicate::str::contains("[matcher]"));

    // Refuses to clobber without --force.
    pup_cmd()
        .current_dir(temp.path())
        .args(["init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn completions_to_stdout() {
    pup_cmd()
        .args(["completions", "bash", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pup"));
}

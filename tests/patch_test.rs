// bnkpatch
// Copyright (c) 2024 The bnkpatch Authors
//
// SPDX-License-Identifier: MIT

mod common;

use std::fs;

use bnkpatch::batch::patch_bank;
use bnkpatch::index::entries;
use bnkpatch::{locate, BankError, Config, PatchOutcome};
use pretty_assertions::assert_eq;

fn setup(replacements: &[(&str, Vec<u8>)]) -> (tempfile::TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let wems = dir.path().join("wems");
    fs::create_dir_all(dir.path().join("BNK")).unwrap();
    fs::create_dir_all(&wems).unwrap();
    for (name, bytes) in replacements {
        fs::write(wems.join(name), bytes).unwrap();
    }

    let config = Config {
        bank_dir: dir.path().join("BNK"),
        replacement_dir: wems,
        output_dir: dir.path().join("out"),
        ..Config::default()
    };
    (dir, config)
}

#[test]
fn patched_bank_is_written_under_the_same_name() {
    let (_dir, config) = setup(&[("11.wem", vec![0xFF; 60]), ("999.wem", vec![1; 4])]);
    let source = config.bank_dir.join("SFX_Weapons.bnk");
    let original = common::three_entry_bank();
    fs::write(&source, &original).unwrap();

    let report = patch_bank(&source, &config).unwrap();

    let output = config.output_dir.join("SFX_Weapons.bnk");
    assert_eq!(report.output.as_deref(), Some(output.as_path()));
    assert_eq!(report.patched(), 1);
    assert_eq!(report.rejected(), 0);

    let patched = fs::read(&output).unwrap();
    assert_eq!(patched.len(), original.len());

    let layout = locate(&patched).unwrap();
    let data = layout.data_offset;
    assert_eq!(&patched[data + 100..data + 160], &[0xFF; 60][..]);
    assert_eq!(&patched[data + 160..data + 250], &[0u8; 90][..]);
    assert_eq!(&patched[data..data + 100], &original[data..data + 100]);
    assert_eq!(&patched[data + 250..], &original[data + 250..]);

    let table: Vec<_> = entries(&patched, &layout).map(|e| (e.id, e.offset, e.size)).collect();
    assert_eq!(table, vec![(10, 0, 100), (11, 100, 60), (12, 250, 50)]);

    // The source bank is never modified.
    assert_eq!(fs::read(&source).unwrap(), original);
}

#[test]
fn oversized_replacement_is_reported_and_others_applied() {
    let (_dir, config) = setup(&[("10.wem", vec![2; 101]), ("12.WEM", vec![3; 50])]);
    let source = config.bank_dir.join("bank.bnk");
    let original = common::three_entry_bank();
    fs::write(&source, &original).unwrap();

    let report = patch_bank(&source, &config).unwrap();

    let outcomes: Vec<_> = report.records.iter().map(|r| (r.id, r.outcome)).collect();
    assert_eq!(
        outcomes,
        vec![
            (10, PatchOutcome::TooLarge { size: 101, capacity: 100 }),
            (11, PatchOutcome::Skipped),
            (12, PatchOutcome::Patched { old_size: 50, new_size: 50 }),
        ]
    );

    let patched = fs::read(report.output.unwrap()).unwrap();
    let data = locate(&patched).unwrap().data_offset;
    assert_eq!(&patched[..data + 250], &original[..data + 250]);
    assert_eq!(&patched[data + 250..data + 300], &[3u8; 50][..]);
}

#[test]
fn nothing_is_written_without_matches() {
    let (_dir, config) = setup(&[("77.wem", vec![1; 4]), ("notes.txt", b"hi".to_vec())]);
    let source = config.bank_dir.join("bank.bnk");
    fs::write(&source, common::three_entry_bank()).unwrap();

    let report = patch_bank(&source, &config).unwrap();

    assert!(report.output.is_none());
    assert!(!config.output_dir.exists());
}

#[test]
fn non_bank_fails_without_output() {
    let (_dir, config) = setup(&[("10.wem", vec![1; 4])]);
    let source = config.bank_dir.join("readme.bnk");
    fs::write(&source, b"definitely not a soundbank").unwrap();

    let err = patch_bank(&source, &config).unwrap_err();

    assert!(matches!(err, BankError::NotABank));
    assert!(!config.output_dir.exists());
}

#[test]
fn missing_bank_is_an_io_error() {
    let (_dir, config) = setup(&[]);
    let err = patch_bank(&config.bank_dir.join("gone.bnk"), &config).unwrap_err();
    assert!(matches!(err, BankError::Io(_)));
}

#[cfg(unix)]
#[test]
fn patched_bank_keeps_source_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let (_dir, config) = setup(&[("10.wem", vec![7; 20])]);
    let source = config.bank_dir.join("Music.bnk");
    fs::write(&source, common::three_entry_bank()).unwrap();
    fs::set_permissions(&source, fs::Permissions::from_mode(0o644)).unwrap();

    let report = patch_bank(&source, &config).unwrap();

    let output = report.output.unwrap();
    let mode = fs::metadata(&output).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o644);
}

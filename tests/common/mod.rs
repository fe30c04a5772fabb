#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use kcall::genomics::call_vcf;
use kcall::CallerConfig;

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

/// Compare a rendered VCF with a stored one. Meta lines are compared as a
/// block; records are compared line by line so a mismatch names the first
/// differing record.
pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("KCALL_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    let (expected_header, expected_records) = split_vcf(&expected);
    let (actual_header, actual_records) = split_vcf(actual);
    assert_eq!(
        expected_header, actual_header,
        "VCF header differs from {:?}; set KCALL_UPDATE_SNAPSHOTS=1 to regenerate",
        path
    );
    for (i, (want, got)) in expected_records.iter().zip(&actual_records).enumerate() {
        assert_eq!(want, got, "record {} differs from {:?}", i + 1, path);
    }
    assert_eq!(
        expected_records.len(),
        actual_records.len(),
        "record count differs from {:?}",
        path
    );
}

/// Header and record lines, with line endings and trailing blanks stripped.
fn split_vcf(vcf: &str) -> (Vec<&str>, Vec<&str>) {
    vcf.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .partition(|line| line.starts_with('#'))
}

/// Run the full text-in, VCF-out pipeline.
pub fn call_text(input: &str, config: CallerConfig) -> String {
    let mut out = Vec::new();
    call_vcf(input.as_bytes(), &mut out, config).expect("calling succeeds");
    String::from_utf8(out).expect("VCF is UTF-8")
}

/// Data lines of a rendered VCF.
pub fn records(vcf: &str) -> Vec<&str> {
    vcf.lines().filter(|line| !line.starts_with('#')).collect()
}

/// Two overlapping chr1 windows rediscovering one SNV, a third window with
/// an insertion, and two chr2 windows where the second misses a call made
/// near the first one's edge.
pub const OVERLAP_INPUT: &str = "\
QS\tchr1:101-120\t20
QH\t2\t40\t0\t:10*CT:9
QH\t1\t30\t1\t:20
QH\t1\t10\t2\t:3-AG:15
//
QS\tchr1:106-125\t20
QH\t3\t50\t0\t:5*CT:14
QH\t1\t20\t1\t:15*GA:4
//
QS\tchr1:121-140\t20
QH\t2\t30\t0\t:20
QH\t1\t35\t1\t:4+T:16
//
QS\tchr2:1-30\t30
QH\t1\t10\t0\t:30
QH\t2\t20\t0\t:30
QH\t1\t60\t2\t:12*GT:14*AC:2
//
QS\tchr2:6-35\t30
QH\t1\t10\t0\t:30
QH\t2\t20\t0\t:30
QH\t1\t60\t1\t:7*GT:22
//
";

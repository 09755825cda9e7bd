//! Contract tests for core_types
//!
//! These tests pin the values that are part of the binary contract with
//! native libraries.

use core_types::abi::{self, status, version};
use core_types::RefKind;

#[test]
fn contract_ref_kind_codes() {
    assert_eq!(RefKind::Invalid as i32, 0);
    assert_eq!(RefKind::Local as i32, 1);
    assert_eq!(RefKind::Global as i32, 2);
    assert_eq!(RefKind::WeakGlobal as i32, 3);
}

#[test]
fn contract_status_codes() {
    assert_eq!(status::OK, 0);
    assert_eq!(status::ERR, -1);
    assert_eq!(status::DETACHED, -2);
    assert_eq!(status::VERSION, -3);
}

#[test]
fn contract_version_layout() {
    assert_eq!(version::V1_6, 0x0001_0006);
    assert_eq!(version::V1_8, 0x0001_0008);
    assert_eq!(version::major(version::V10), 10);
    assert_eq!(version::minor(version::V10), 0);
}

#[test]
fn contract_release_modes() {
    assert_eq!(abi::COMMIT, 1);
    assert_eq!(abi::ABORT, 2);
    assert_eq!(abi::TRUE, 1);
    assert_eq!(abi::FALSE, 0);
}

// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn lookup_finds_known_profile() {
    let profile = Profile::lookup("h264_1080p").unwrap();
    assert_eq!(profile.width, 1920);
    assert_eq!(profile.height, 1080);
}

#[test]
fn lookup_rejects_unknown_profile() {
    assert!(Profile::lookup("does_not_exist").is_none());
}

#[test]
fn builtin_profile_names_are_unique() {
    let mut names: Vec<&str> = Profile::BUILTIN.iter().map(|p| p.name).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), Profile::BUILTIN.len());
}

#[test]
fn default_builtin_is_a_member_of_builtin() {
    let default = Profile::default_builtin();
    assert!(Profile::BUILTIN.iter().any(|p| p.name == default.name));
}

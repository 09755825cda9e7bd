//! Unit tests for Kind

use core_types::Kind;

#[test]
fn test_every_primitive_has_a_distinct_type_char() {
    let mut chars: Vec<char> = Kind::PRIMITIVES.iter().map(|k| k.type_char()).collect();
    chars.sort();
    chars.dedup();
    assert_eq!(chars.len(), 8);
}

#[test]
fn test_wide_kinds() {
    let wide: Vec<Kind> = Kind::PRIMITIVES.into_iter().filter(|k| k.is_wide()).collect();
    assert_eq!(wide, vec![Kind::Long, Kind::Double]);
}

#[test]
fn test_object_and_void_are_not_primitive() {
    assert!(!Kind::Object.is_primitive());
    assert!(!Kind::Void.is_primitive());
    assert_eq!(Kind::Object.byte_size(), std::mem::size_of::<usize>());
}

#[test]
fn test_display_uses_keywords() {
    assert_eq!(Kind::Boolean.to_string(), "boolean");
    assert_eq!(Kind::Void.to_string(), "void");
}

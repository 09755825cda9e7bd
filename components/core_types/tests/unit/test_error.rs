//! Unit tests for ErrorKind, GuestError and ContractViolation

use core_types::{ContractViolation, ErrorKind, GuestError};

#[cfg(test)]
mod error_kind_tests {
    use super::*;

    #[test]
    fn test_class_names_are_internal_form() {
        for kind in ErrorKind::ALL {
            let name = kind.class_name();
            assert!(name.starts_with("java/lang/"), "{name}");
            assert!(!name.contains('.'), "{name}");
        }
    }

    #[test]
    fn test_error_vs_exception_branch() {
        assert!(ErrorKind::NoSuchField.is_error());
        assert!(ErrorKind::StackOverflow.is_error());
        assert!(!ErrorKind::ArrayIndexOutOfBounds.is_error());
        assert!(!ErrorKind::NullPointer.is_error());
    }
}

#[cfg(test)]
mod guest_error_tests {
    use super::*;

    #[test]
    fn test_guest_error_display() {
        let err = GuestError::new(ErrorKind::ArrayIndexOutOfBounds, "index 5, length 3");
        assert_eq!(
            err.to_string(),
            "java/lang/ArrayIndexOutOfBoundsException: index 5, length 3"
        );
    }

    #[test]
    fn test_guest_error_clone_eq() {
        let a = GuestError::new(ErrorKind::OutOfMemory, "handles");
        assert_eq!(a.clone(), a);
    }
}

#[cfg(test)]
mod contract_violation_tests {
    use super::*;

    #[test]
    fn test_invalid_handle_display() {
        let v = ContractViolation::InvalidHandle {
            handle: 0x2a,
            expected: "global",
        };
        assert_eq!(v.to_string(), "invalid global handle 0x2a");
    }

    #[test]
    fn test_unknown_buffer_display() {
        assert_eq!(
            ContractViolation::UnknownBuffer(0xff).to_string(),
            "release of unknown native buffer at 0xff"
        );
    }
}

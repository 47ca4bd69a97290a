//! Tests for the unified error type.

use crate::error::Error;

#[test]
fn codes_are_stable_and_present_in_messages() {
    let cases: Vec<(Error, &str)> = vec![
        (
            Error::DimensionMismatch {
                expected: 128,
                actual: 64,
            },
            "SVG-001",
        ),
        (Error::invalid_parameter("k", "must be at least 1"), "SVG-002"),
        (
            Error::Format {
                path: "base.fvecs".into(),
                message: "truncated".into(),
            },
            "SVG-003",
        ),
        (Error::IndexCorrupted("bad magic".into()), "SVG-004"),
        (Error::Serialization("eof".into()), "SVG-006"),
        (Error::Config("bad toml".into()), "SVG-007"),
        (Error::Mapping("out of range".into()), "SVG-008"),
        (Error::Index("too large".into()), "SVG-009"),
    ];
    for (err, code) in cases {
        assert_eq!(err.code(), code);
        assert!(err.to_string().contains(code), "{err}");
    }
}

#[test]
fn io_errors_convert() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let err: Error = io.into();
    assert_eq!(err.code(), "SVG-005");
}

#[test]
fn parameter_errors_name_the_parameter() {
    let err = Error::invalid_parameter("nprobe", "must not exceed nlist (16)");
    let msg = err.to_string();
    assert!(msg.contains("nprobe"));
    assert!(msg.contains("nlist"));
}

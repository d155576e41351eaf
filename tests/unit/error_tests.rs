//! Unit tests for the application error type.

use adb_bridge::AppError;

#[test]
fn display_prefixes_identify_the_category() {
    let cases = [
        (AppError::Config("bad".into()), "config: bad"),
        (AppError::Bind("in use".into()), "bind: in use"),
        (AppError::Accept("refused".into()), "accept: refused"),
        (AppError::Protocol("too long".into()), "protocol: too long"),
        (
            AppError::InvalidState("already running".into()),
            "invalid state: already running",
        ),
        (
            AppError::VoiceTest("not initialized".into()),
            "voice test: not initialized",
        ),
        (AppError::Io("broken pipe".into()), "io: broken pipe"),
    ];

    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn implements_std_error() {
    let err: Box<dyn std::error::Error> = Box::new(AppError::Io("eof".into()));
    assert!(err.source().is_none());
}

#[test]
fn io_errors_convert() {
    let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");

    let err = AppError::from(io);

    assert!(matches!(err, AppError::Io(_)));
    assert!(err.to_string().contains("reset by peer"));
}

#[test]
fn toml_errors_convert_to_config() {
    let toml_err = toml::from_str::<toml::Table>("not = = toml").expect_err("must fail");

    let err = AppError::from(toml_err);

    assert!(matches!(err, AppError::Config(_)));
    assert!(err.to_string().starts_with("config: invalid config:"));
}

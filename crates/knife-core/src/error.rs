use thiserror::Error;

/// The error taxonomy used by every fallible operation in the workspace.
///
/// Mirrors the `KNIFE_STATUS` codes of the original implementation so the
/// FFI boundary can round-trip a `KnifeError` back to a single status
/// integer without inventing new failure categories at that layer.
#[derive(Debug, Error)]
pub enum KnifeError {
    #[error("null argument: {0}")]
    Null(String),

    #[error("index out of bounds: {0}")]
    ArrayBound(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("inconsistent state: {0}")]
    Inconsistent(String),

    #[error("allocation failed: {0}")]
    Memory(String),

    #[error("file error: {0}")]
    FileError(String),

    #[error("division by zero: {0}")]
    DivZero(String),

    #[error("not implemented: {0}")]
    Implement(String),

    #[error("failure: {0}")]
    Failure(String),
}

impl KnifeError {
    pub fn status(&self) -> KnifeStatus {
        match self {
            KnifeError::Null(_) => KnifeStatus::Null,
            KnifeError::ArrayBound(_) => KnifeStatus::ArrayBound,
            KnifeError::NotFound(_) => KnifeStatus::NotFound,
            KnifeError::Inconsistent(_) => KnifeStatus::Inconsistent,
            KnifeError::Memory(_) => KnifeStatus::Memory,
            KnifeError::FileError(_) => KnifeStatus::FileError,
            KnifeError::DivZero(_) => KnifeStatus::DivZero,
            KnifeError::Implement(_) => KnifeStatus::Implement,
            KnifeError::Failure(_) => KnifeStatus::Failure,
        }
    }
}

impl From<std::io::Error> for KnifeError {
    fn from(err: std::io::Error) -> Self {
        KnifeError::FileError(err.to_string())
    }
}

/// The integer status code crossed at the `extern "C"` boundary.
///
/// `Success` is `0`, matching the `0 == status` convention used throughout
/// the foreign-callable API in `spec.md` §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum KnifeStatus {
    Success = 0,
    Null = 1,
    ArrayBound = 2,
    NotFound = 3,
    Inconsistent = 4,
    Memory = 5,
    FileError = 6,
    DivZero = 7,
    Implement = 8,
    Failure = 9,
}

impl From<&KnifeError> for KnifeStatus {
    fn from(err: &KnifeError) -> Self {
        err.status()
    }
}

impl<T> From<std::result::Result<T, KnifeError>> for KnifeStatus {
    fn from(result: std::result::Result<T, KnifeError>) -> Self {
        match result {
            Ok(_) => KnifeStatus::Success,
            Err(e) => e.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_success() {
        let ok: std::result::Result<(), KnifeError> = Ok(());
        assert_eq!(KnifeStatus::from(ok), KnifeStatus::Success);
        assert_eq!(KnifeStatus::Success as i32, 0);
    }

    #[test]
    fn status_maps_each_variant() {
        let cases = [
            (KnifeError::Null("x".into()), KnifeStatus::Null),
            (KnifeError::ArrayBound("x".into()), KnifeStatus::ArrayBound),
            (KnifeError::NotFound("x".into()), KnifeStatus::NotFound),
            (
                KnifeError::Inconsistent("x".into()),
                KnifeStatus::Inconsistent,
            ),
            (KnifeError::Memory("x".into()), KnifeStatus::Memory),
            (KnifeError::FileError("x".into()), KnifeStatus::FileError),
            (KnifeError::DivZero("x".into()), KnifeStatus::DivZero),
            (KnifeError::Implement("x".into()), KnifeStatus::Implement),
            (KnifeError::Failure("x".into()), KnifeStatus::Failure),
        ];
        for (err, expect) in cases {
            assert_eq!(err.status(), expect);
        }
    }
}

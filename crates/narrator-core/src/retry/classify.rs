//! Classify synthesis results into retry outcomes.

use super::error::SynthesisError;

/// What went wrong, as far as key handling is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Daily/project quota is gone for this key (HTTP 429 + quota marker).
    QuotaExhausted,
    /// Plain 429.
    RateLimited,
    /// 503 or an "overloaded" message.
    Overloaded,
    /// Empty reply with finish reason `OTHER`; behaves like a rate limit.
    SoftFail,
    /// Anything else; not retried.
    Unknown,
}

/// Result of one attempt after classification.
#[derive(Debug)]
pub enum Outcome {
    Success(Vec<u8>),
    Failure {
        kind: FailureKind,
        error: SynthesisError,
    },
}

/// Classify the raw result of a synthesis call.
pub fn classify(result: Result<Vec<u8>, SynthesisError>) -> Outcome {
    match result {
        Ok(pcm) if !pcm.is_empty() => Outcome::Success(pcm),
        Ok(_) => Outcome::Failure {
            kind: FailureKind::Unknown,
            error: SynthesisError::EmptyAudio,
        },
        Err(error) => Outcome::Failure {
            kind: classify_error(&error),
            error,
        },
    }
}

/// Map a synthesis error to a failure kind.
pub fn classify_error(e: &SynthesisError) -> FailureKind {
    match e {
        SynthesisError::Http { status: 429, message } if mentions_quota(message) => {
            FailureKind::QuotaExhausted
        }
        SynthesisError::Http { status: 429, .. } => FailureKind::RateLimited,
        SynthesisError::Http { status: 503, .. } => FailureKind::Overloaded,
        SynthesisError::Http { message, .. } | SynthesisError::Transport(message)
            if mentions_overloaded(message) =>
        {
            FailureKind::Overloaded
        }
        SynthesisError::NoContent { reason } if reason.contains("OTHER") => FailureKind::SoftFail,
        _ => FailureKind::Unknown,
    }
}

fn mentions_quota(message: &str) -> bool {
    message.to_lowercase().contains("quota") || message.contains("RESOURCE_EXHAUSTED")
}

fn mentions_overloaded(message: &str) -> bool {
    message.to_lowercase().contains("overloaded")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, message: &str) -> SynthesisError {
        SynthesisError::Http {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn quota_429_is_exhausted() {
        assert_eq!(
            classify_error(&http(429, "You exceeded your current quota")),
            FailureKind::QuotaExhausted
        );
        assert_eq!(
            classify_error(&http(429, "status: RESOURCE_EXHAUSTED")),
            FailureKind::QuotaExhausted
        );
    }

    #[test]
    fn plain_429_is_rate_limited() {
        assert_eq!(
            classify_error(&http(429, "Too Many Requests")),
            FailureKind::RateLimited
        );
    }

    #[test]
    fn overloaded_by_status_or_message() {
        assert_eq!(classify_error(&http(503, "")), FailureKind::Overloaded);
        assert_eq!(
            classify_error(&http(500, "The model is overloaded. Try later.")),
            FailureKind::Overloaded
        );
        assert_eq!(
            classify_error(&SynthesisError::Transport("Model Overloaded".into())),
            FailureKind::Overloaded
        );
    }

    #[test]
    fn no_content_other_is_soft_fail() {
        let soft = SynthesisError::NoContent {
            reason: "FinishReason.OTHER".into(),
        };
        let blocked = SynthesisError::NoContent {
            reason: "SAFETY".into(),
        };
        assert_eq!(classify_error(&soft), FailureKind::SoftFail);
        assert_eq!(classify_error(&blocked), FailureKind::Unknown);
    }

    #[test]
    fn empty_audio_and_other_errors_are_unknown() {
        assert!(matches!(
            classify(Ok(Vec::new())),
            Outcome::Failure {
                kind: FailureKind::Unknown,
                error: SynthesisError::EmptyAudio
            }
        ));
        assert_eq!(classify_error(&http(400, "bad request")), FailureKind::Unknown);
        assert!(matches!(classify(Ok(vec![0, 1])), Outcome::Success(_)));
    }
}

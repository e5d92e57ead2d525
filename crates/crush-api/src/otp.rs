use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use tracing::{error, info};

use crate::mailer::{MailError, Mailer};

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("could not deliver the code: {0}")]
    DeliveryFailed(#[source] MailError),
    #[error("no code is pending for this email")]
    NoPendingCode,
    #[error("code does not match")]
    CodeMismatch,
}

/// A code waiting to be confirmed, plus whatever the caller wants back once
/// it is.
#[derive(Debug, Clone)]
pub struct PendingVerification<T> {
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub payload: T,
}

/// Uniformly random six digit code, zero padded.
pub fn random_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}

/// Issues one-time codes per email and checks them.
///
/// Codes never expire; a code is only retired by a successful `verify` or by
/// issuing a new one for the same address.
pub struct CodeVerifier<T> {
    pending: Mutex<HashMap<String, PendingVerification<T>>>,
    mailer: Arc<dyn Mailer>,
    generate: fn() -> String,
}

impl<T: Send> CodeVerifier<T> {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self::with_generator(mailer, random_code)
    }

    pub fn with_generator(mailer: Arc<dyn Mailer>, generate: fn() -> String) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            mailer,
            generate,
        }
    }

    /// Replace any pending code for `email` with a fresh one and mail it.
    ///
    /// If delivery fails the fresh code is withdrawn again, so the address is
    /// left with nothing pending rather than with a code nobody received.
    pub async fn issue(&self, email: &str, name: &str, payload: T) -> Result<String, OtpError> {
        let code = (self.generate)();
        let issued_at = Utc::now();
        self.pending.lock().insert(
            email.to_string(),
            PendingVerification {
                code: code.clone(),
                issued_at,
                payload,
            },
        );

        if let Err(e) = self.mailer.send_code(email, name, &code).await {
            error!("Error sending OTP to {}: {}", email, e);
            let mut pending = self.pending.lock();
            let ours = pending
                .get(email)
                .is_some_and(|p| p.code == code && p.issued_at == issued_at);
            if ours {
                pending.remove(email);
            }
            return Err(OtpError::DeliveryFailed(e));
        }

        info!("OTP issued for {}", email);
        Ok(code)
    }

    /// Consume the pending code for `email` if `code` matches it exactly.
    /// A mismatch leaves the code in place so the user can retry.
    pub fn verify(&self, email: &str, code: &str) -> Result<T, OtpError> {
        let mut pending = self.pending.lock();
        let matches = match pending.get(email) {
            Some(entry) => entry.code == code,
            None => return Err(OtpError::NoPendingCode),
        };
        if !matches {
            return Err(OtpError::CodeMismatch);
        }
        pending
            .remove(email)
            .map(|entry| entry.payload)
            .ok_or(OtpError::NoPendingCode)
    }

    pub fn pending_since(&self, email: &str) -> Option<DateTime<Utc>> {
        self.pending.lock().get(email).map(|p| p.issued_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::MailFuture;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl Mailer for RecordingMailer {
        fn send_code<'a>(&'a self, to: &'a str, _name: &'a str, code: &'a str) -> MailFuture<'a> {
            self.sent.lock().push((to.to_string(), code.to_string()));
            Box::pin(async { Ok(()) })
        }
    }

    struct BrokenMailer;

    impl Mailer for BrokenMailer {
        fn send_code<'a>(&'a self, _to: &'a str, _name: &'a str, _code: &'a str) -> MailFuture<'a> {
            Box::pin(async { Err(MailError::Rejected(reqwest::StatusCode::SERVICE_UNAVAILABLE)) })
        }
    }

    const EMAIL: &str = "rahul.20123456@mnnit.ac.in";

    #[test]
    fn random_codes_are_six_digits() {
        for _ in 0..200 {
            let code = random_code();
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn issued_code_is_mailed_and_verifies_once() {
        let mailer = Arc::new(RecordingMailer::default());
        let codes = CodeVerifier::new(mailer.clone());

        let code = codes.issue(EMAIL, "rahul", "payload").await.unwrap();
        assert_eq!(mailer.sent.lock().as_slice(), [(EMAIL.to_string(), code.clone())]);
        assert!(codes.pending_since(EMAIL).is_some());

        assert_eq!(codes.verify(EMAIL, &code).unwrap(), "payload");
        assert!(matches!(codes.verify(EMAIL, &code), Err(OtpError::NoPendingCode)));
        assert!(codes.pending_since(EMAIL).is_none());
    }

    #[tokio::test]
    async fn mismatch_keeps_code_for_retry() {
        let codes = CodeVerifier::with_generator(Arc::new(RecordingMailer::default()), || "482913".into());
        codes.issue(EMAIL, "rahul", ()).await.unwrap();

        assert!(matches!(codes.verify(EMAIL, "000000"), Err(OtpError::CodeMismatch)));
        assert!(matches!(codes.verify(EMAIL, " 482913"), Err(OtpError::CodeMismatch)));
        assert!(codes.verify(EMAIL, "482913").is_ok());
    }

    #[tokio::test]
    async fn reissue_invalidates_previous_code() {
        let mailer = Arc::new(RecordingMailer::default());
        let codes = CodeVerifier::new(mailer.clone());

        let first = codes.issue(EMAIL, "rahul", 1).await.unwrap();
        let mut second = codes.issue(EMAIL, "rahul", 2).await.unwrap();
        while second == first {
            second = codes.issue(EMAIL, "rahul", 2).await.unwrap();
        }

        assert!(matches!(codes.verify(EMAIL, &first), Err(OtpError::CodeMismatch)));
        assert_eq!(codes.verify(EMAIL, &second).unwrap(), 2);
    }

    #[tokio::test]
    async fn failed_delivery_leaves_nothing_pending() {
        let codes = CodeVerifier::with_generator(Arc::new(BrokenMailer), || "482913".into());

        let err = codes.issue(EMAIL, "rahul", ()).await.unwrap_err();
        assert!(matches!(err, OtpError::DeliveryFailed(_)));
        assert!(codes.pending_since(EMAIL).is_none());
        assert!(matches!(codes.verify(EMAIL, "482913"), Err(OtpError::NoPendingCode)));
    }

    #[test]
    fn verify_without_issue() {
        let codes: CodeVerifier<()> = CodeVerifier::new(Arc::new(RecordingMailer::default()));
        assert!(matches!(codes.verify(EMAIL, "123456"), Err(OtpError::NoPendingCode)));
    }
}

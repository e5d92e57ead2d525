use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use tracing::{info, warn};

pub type MailFuture<'a> = Pin<Box<dyn Future<Output = Result<(), MailError>> + Send + 'a>>;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail relay request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail relay answered {0}")]
    Rejected(reqwest::StatusCode),
}

/// Delivers one-time codes to an inbox.
pub trait Mailer: Send + Sync {
    fn send_code<'a>(&'a self, to: &'a str, name: &'a str, code: &'a str) -> MailFuture<'a>;
}

#[derive(Debug, Serialize)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl OutgoingMail {
    pub fn otp(from: &str, to: &str, name: &str, code: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: "Your OTP for MNNIT Matchmaking Login".to_string(),
            text: format!("Hi {name},\n\nYour OTP is: {code}\n\nRegards,\nMNNIT Matchmaking Team"),
        }
    }
}

/// Sends mail through an HTTP relay (JSON body, basic auth).
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    user: String,
    pass: String,
    from: String,
}

impl HttpMailer {
    pub fn new(endpoint: String, user: String, pass: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            user,
            pass,
            from,
        }
    }
}

impl Mailer for HttpMailer {
    fn send_code<'a>(&'a self, to: &'a str, name: &'a str, code: &'a str) -> MailFuture<'a> {
        Box::pin(async move {
            let mail = OutgoingMail::otp(&self.from, to, name, code);
            let resp = self
                .client
                .post(&self.endpoint)
                .basic_auth(&self.user, Some(&self.pass))
                .json(&mail)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(MailError::Rejected(status));
            }
            info!("OTP mail to {} accepted by relay ({})", to, status);
            Ok(())
        })
    }
}

/// Writes the code to the log instead of sending it. Local development only.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_code<'a>(&'a self, to: &'a str, name: &'a str, code: &'a str) -> MailFuture<'a> {
        Box::pin(async move {
            warn!("No mail relay configured; OTP for {} ({}) is {}", to, name, code);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_mail_body() {
        let mail = OutgoingMail::otp("team@example.com", "rahul.20123456@mnnit.ac.in", "rahul", "004211");
        assert_eq!(mail.subject, "Your OTP for MNNIT Matchmaking Login");
        assert!(mail.text.starts_with("Hi rahul,"));
        assert!(mail.text.contains("Your OTP is: 004211"));
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        LogMailer.send_code("a.20123456@mnnit.ac.in", "a", "123456").await.unwrap();
    }
}

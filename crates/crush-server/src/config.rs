use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use crush_api::mailer::{HttpMailer, LogMailer, Mailer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub api_url: String,
    pub user: String,
    pub pass: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub static_dir: PathBuf,
    /// `None` when no relay is configured; codes are then only logged.
    pub mail: Option<MailConfig>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = var("CRUSH_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("CRUSH_PORT").unwrap_or_else(|| "3000".into()).parse()?;
        let db_path: PathBuf = var("CRUSH_DB_PATH").unwrap_or_else(|| "crush.db".into()).into();
        let static_dir: PathBuf = var("CRUSH_STATIC_DIR").unwrap_or_else(|| "public".into()).into();

        let mail = var("CRUSH_MAIL_API_URL")
            .filter(|url| !url.is_empty())
            .map(|api_url| {
                let user = var("CRUSH_MAIL_USER").unwrap_or_default();
                let from = var("CRUSH_MAIL_FROM").unwrap_or_else(|| user.clone());
                MailConfig {
                    api_url,
                    pass: var("CRUSH_MAIL_PASS").unwrap_or_default(),
                    user,
                    from,
                }
            });

        Ok(Self {
            host,
            port,
            db_path,
            static_dir,
            mail,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn mailer(&self) -> Arc<dyn Mailer> {
        match &self.mail {
            Some(mail) => Arc::new(HttpMailer::new(
                mail.api_url.clone(),
                mail.user.clone(),
                mail.pass.clone(),
                mail.from.clone(),
            )),
            None => {
                warn!("CRUSH_MAIL_API_URL is unset; login codes will only be logged");
                Arc::new(LogMailer)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.addr().unwrap(), "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.db_path, PathBuf::from("crush.db"));
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert_eq!(config.mail, None);
    }

    #[test]
    fn mail_relay_settings() {
        let config = Config::from_lookup(lookup(&[
            ("CRUSH_PORT", "8080"),
            ("CRUSH_MAIL_API_URL", "https://mail.example.com/send"),
            ("CRUSH_MAIL_USER", "team@example.com"),
            ("CRUSH_MAIL_PASS", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.mail,
            Some(MailConfig {
                api_url: "https://mail.example.com/send".into(),
                user: "team@example.com".into(),
                pass: "secret".into(),
                from: "team@example.com".into(),
            })
        );
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(Config::from_lookup(lookup(&[("CRUSH_PORT", "http")])).is_err());
    }
}

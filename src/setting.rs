use crate::{Error, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, path::PathBuf};

/// number of threads config
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Thread {
    /// number of http server threads
    pub http: usize,
}

/// network config
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Network {
    /// server bind host
    pub host: String,
    /// server bind port
    pub port: u16,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// razorpay gateway config
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Razorpay {
    /// api key id, also handed to the checkout page
    pub key_id: String,
    /// api key secret, signs webhook notifications
    pub key_secret: String,
    pub api_url: String,
    /// ISO currency code of every order
    pub currency: String,
    /// order creation timeout in seconds
    pub timeout_secs: u64,
}

impl Default for Razorpay {
    fn default() -> Self {
        Self {
            key_id: String::new(),
            key_secret: String::new(),
            api_url: razorpay_client::client::DEFAULT_API_URL.to_owned(),
            currency: "INR".to_owned(),
            timeout_secs: 10,
        }
    }
}

impl fmt::Debug for Razorpay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Razorpay")
            .field("key_id", &self.key_id)
            .field("api_url", &self.api_url)
            .field("currency", &self.currency)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

/// receipt email config
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Mail {
    /// sender address
    pub from: String,
    /// resend compatible send endpoint
    pub api_url: String,
    /// email delivery is disabled without api key
    pub api_key: Option<String>,
    pub subject: String,
    pub timeout_secs: u64,
}

impl Default for Mail {
    fn default() -> Self {
        Self {
            from: String::new(),
            api_url: crate::mailer::RESEND_API_URL.to_owned(),
            api_key: None,
            subject: "Your donation receipt".to_owned(),
            timeout_secs: 10,
        }
    }
}

impl fmt::Debug for Mail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mail")
            .field("from", &self.from)
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "****"))
            .field("subject", &self.subject)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// document storage config
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Storage {
    /// root dir of the invoices and receipts namespaces
    pub root: PathBuf,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./data"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Receipt {
    /// organization name printed as the receipt title
    pub organization: Option<String>,
}

/// donation form config
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Donation {
    /// donation type used when the form does not choose one
    pub default_type: String,
    /// a pending payment with the same donor, type and amount created within
    /// this window is handed out again instead of creating a new order, 0 disables
    pub pending_reuse_secs: u64,
}

impl Default for Donation {
    fn default() -> Self {
        Self {
            default_type: "General Donation".to_owned(),
            pending_reuse_secs: 15 * 60,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Setting {
    /// database url
    /// https://www.sea-ql.org/SeaORM/docs/install-and-config/connection/
    pub db_url: String,

    pub thread: Thread,
    pub network: Network,

    pub razorpay: Razorpay,
    pub mail: Mail,
    pub storage: Storage,
    pub receipt: Receipt,
    pub donation: Donation,
}

impl Default for Setting {
    fn default() -> Self {
        Self {
            db_url: "sqlite://receiptbox.sqlite?mode=rwc".to_string(),
            thread: Default::default(),
            network: Default::default(),
            razorpay: Default::default(),
            mail: Default::default(),
            storage: Default::default(),
            receipt: Default::default(),
            donation: Default::default(),
        }
    }
}

impl Setting {
    /// read config from file and env
    pub fn read<P: AsRef<Path>>(file: P, env_prefix: Option<String>) -> Result<Self> {
        let file = file
            .as_ref()
            .to_str()
            .ok_or_else(|| Error::InvalidSetting("config path is not utf-8".to_owned()))?;
        let mut config = Config::builder().add_source(File::with_name(file));
        if let Some(prefix) = env_prefix {
            config = config.add_source(Self::env_source(&prefix));
        }

        let config = config.build()?;
        let setting: Setting = config.try_deserialize()?;
        setting.validate()?;
        Ok(setting)
    }

    fn env_source(prefix: &str) -> Environment {
        Environment::with_prefix(prefix)
            .try_parsing(true)
            .prefix_separator("_")
            .separator("__")
    }

    /// read config from env
    pub fn from_env(env_prefix: String) -> Result<Self> {
        let config = Config::builder()
            .add_source(Self::env_source(&env_prefix))
            .build()?;
        let setting: Setting = config.try_deserialize()?;
        setting.validate()?;
        Ok(setting)
    }

    /// config from str
    pub fn from_str(s: &str, format: FileFormat) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(s, format))
            .build()?;
        let setting: Setting = config.try_deserialize()?;
        setting.validate()?;
        Ok(setting)
    }

    /// Gateway credentials and the sender address are required.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("razorpay.key_id", &self.razorpay.key_id),
            ("razorpay.key_secret", &self.razorpay.key_secret),
            ("mail.from", &self.mail.from),
        ];
        let missing = required
            .iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| *k)
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(Error::InvalidSetting(format!(
                "missing {}",
                missing.join(", ")
            )));
        }
        if self.razorpay.currency.trim().len() != 3 {
            return Err(Error::InvalidSetting(
                "razorpay.currency must be an ISO 4217 code".to_owned(),
            ));
        }
        if self.donation.default_type.trim().is_empty() {
            return Err(Error::InvalidSetting(
                "donation.default_type is empty".to_owned(),
            ));
        }
        Ok(())
    }
}

use hudini_shared::pii::Masked;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{PmsError, PmsResult};

/// Vendor platforms we know how to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OracleOhip,
    Opera,
    Fidelio,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OracleOhip => "oracle_ohip",
            ProviderKind::Opera => "opera",
            ProviderKind::Fidelio => "fidelio",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = PmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oracle_ohip" => Ok(ProviderKind::OracleOhip),
            "opera" => Ok(ProviderKind::Opera),
            "fidelio" => Ok(ProviderKind::Fidelio),
            other => Err(PmsError::Configuration(format!(
                "unknown PMS provider type '{}'",
                other
            ))),
        }
    }
}

/// Login material for one provider. Fixed at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub password: Masked<String>,
    pub client_id: String,
    pub client_secret: Masked<String>,
    pub api_key: Masked<String>,
    pub base_url: String,
    pub property_id: String,
    #[serde(default)]
    pub additional: HashMap<String, String>,
}

impl Credentials {
    /// Base URL without a trailing slash, ready for `format!("{}/path", ..)`.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Check the fields the given vendor needs before anything goes over the wire.
    pub fn validate(&self, kind: ProviderKind) -> PmsResult<()> {
        let mut missing = Vec::new();

        if self.base_url.trim().is_empty() {
            missing.push("base_url");
        }
        if self.client_id.trim().is_empty() {
            missing.push("client_id");
        }
        if self.client_secret.is_blank() {
            missing.push("client_secret");
        }
        if kind == ProviderKind::Opera {
            if self.api_key.is_blank() {
                missing.push("api_key");
            }
            if self.property_id.trim().is_empty() {
                missing.push("property_id");
            }
        }

        if !missing.is_empty() {
            return Err(PmsError::Configuration(format!(
                "{} provider is missing required credential fields: {}",
                kind,
                missing.join(", ")
            )));
        }

        let base = self.base_url.trim();
        if !(base.starts_with("https://") || base.starts_with("http://")) {
            return Err(PmsError::Configuration(format!(
                "{} base_url must be an http(s) URL, got '{}'",
                kind, base
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ohip_credentials() -> Credentials {
        Credentials {
            username: "svc".into(),
            password: "pw".into(),
            client_id: "client".into(),
            client_secret: "secret".into(),
            base_url: "https://ohip.example.com/".into(),
            property_id: "HOTEL001".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("oracle_ohip".parse::<ProviderKind>().unwrap(), ProviderKind::OracleOhip);
        assert_eq!("OPERA".parse::<ProviderKind>().unwrap(), ProviderKind::Opera);

        let err = "protel".parse::<ProviderKind>().unwrap_err();
        assert!(matches!(err, PmsError::Configuration(_)));
    }

    #[test]
    fn test_validate_ok_and_trailing_slash() {
        let creds = ohip_credentials();
        creds.validate(ProviderKind::OracleOhip).unwrap();
        assert_eq!(creds.base_url(), "https://ohip.example.com");
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let mut creds = ohip_credentials();
        creds.client_secret = Masked::default();
        creds.base_url.clear();

        let err = creds.validate(ProviderKind::OracleOhip).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("base_url"));
        assert!(message.contains("client_secret"));
    }

    #[test]
    fn test_opera_requires_app_key() {
        let creds = ohip_credentials();
        let err = creds.validate(ProviderKind::Opera).unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn test_secrets_not_in_debug_output() {
        let creds = ohip_credentials();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("secret\""));
        assert!(debug.contains("********"));
    }
}

//! Twilio notifier adapter (SMS + voice call) over the REST API.
//!
//! `POST {api_base}/Accounts/{sid}/Messages.json` and `…/Calls.json`, form
//! encoded, HTTP Basic auth with the account SID and auth token.  Both
//! answer with a JSON resource whose `sid` is the delivery identifier.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::debug;
use serde::Deserialize;

use super::utils::http_agent;
use crate::app::ports::Notifier;
use crate::config::TwilioConfig;
use crate::error::CollaboratorError;

#[derive(Debug, Deserialize)]
struct Resource {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    message: String,
}

pub struct TwilioNotifier {
    config: TwilioConfig,
    agent: ureq::Agent,
}

impl TwilioNotifier {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            config,
            agent: http_agent(Duration::from_secs(5), Duration::from_secs(20)),
        }
    }

    fn authorization(&self) -> Result<String, CollaboratorError> {
        if self.config.account_sid.is_empty() || self.config.auth_token.is_empty() {
            return Err(CollaboratorError::NotConfigured("twilio credentials"));
        }
        let pair = format!("{}:{}", self.config.account_sid, self.config.auth_token);
        Ok(format!("Basic {}", BASE64.encode(pair)))
    }

    fn endpoint(&self, resource: &str) -> String {
        format!(
            "{}/Accounts/{}/{resource}.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    fn create(&self, resource: &str, form: &[(&str, &str)]) -> Result<String, CollaboratorError> {
        let auth = self.authorization()?;
        let url = self.endpoint(resource);
        debug!("TWILIO: POST {}", url);
        let response = self
            .agent
            .post(&url)
            .set("Authorization", &auth)
            .send_form(form);

        match response {
            Ok(resp) => {
                let created: Resource = resp
                    .into_json()
                    .map_err(|e| CollaboratorError::Api(format!("bad response: {e}")))?;
                Ok(created.sid)
            }
            Err(ureq::Error::Status(code, resp)) => {
                let detail = resp
                    .into_json::<ApiError>()
                    .map(|e| match e.code {
                        Some(c) => format!("{code} ({c}): {}", e.message),
                        None => format!("{code}: {}", e.message),
                    })
                    .unwrap_or_else(|_| format!("HTTP {code}"));
                Err(CollaboratorError::Api(detail))
            }
            Err(ureq::Error::Transport(t)) => Err(CollaboratorError::Transport(t.to_string())),
        }
    }
}

impl Notifier for TwilioNotifier {
    fn send_sms(&self, to: &str, body: &str) -> Result<String, CollaboratorError> {
        self.create(
            "Messages",
            &[("To", to), ("From", &self.config.from_number), ("Body", body)],
        )
    }

    fn place_call(&self, to: &str) -> Result<String, CollaboratorError> {
        self.create(
            "Calls",
            &[
                ("To", to),
                ("From", &self.config.from_number),
                ("Url", &self.config.twiml_url),
            ],
        )
    }
}

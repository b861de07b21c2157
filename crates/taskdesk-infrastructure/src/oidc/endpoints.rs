use reqwest::Url;
use taskdesk_core::config::TaskdeskConfig;
use taskdesk_core::error::{Result, TaskdeskError};

/// Protocol endpoints under `{identity}/realms/{realm}/protocol/openid-connect/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcEndpoints {
    base: String,
    client_id: String,
    redirect_uri: String,
}

impl OidcEndpoints {
    pub fn new(
        identity_url: &str,
        realm: &str,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            base: format!(
                "{}/realms/{realm}/protocol/openid-connect",
                identity_url.trim_end_matches('/')
            ),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    pub fn from_config(config: &TaskdeskConfig) -> Self {
        Self::new(
            &config.identity_url,
            &config.realm,
            config.client_id.clone(),
            config.redirect_uri.clone(),
        )
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn token_url(&self) -> String {
        format!("{}/token", self.base)
    }

    /// Authorization-code login page.
    pub fn auth_url(&self) -> Result<Url> {
        self.interactive_url("auth")
    }

    /// Self-registration page.
    pub fn registration_url(&self) -> Result<Url> {
        self.interactive_url("registrations")
    }

    /// End-session page.
    pub fn logout_url(&self, id_token_hint: Option<&str>) -> Result<Url> {
        let mut params = vec![
            ("client_id", self.client_id.as_str()),
            ("post_logout_redirect_uri", self.redirect_uri.as_str()),
        ];
        if let Some(hint) = id_token_hint {
            params.push(("id_token_hint", hint));
        }
        parse_url(&format!("{}/logout", self.base), &params)
    }

    // No `state` parameter: the code is pasted back by the user from their
    // own browser, so no redirect endpoint exists for a forged response to hit.
    fn interactive_url(&self, endpoint: &str) -> Result<Url> {
        parse_url(
            &format!("{}/{endpoint}", self.base),
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", "openid"),
            ],
        )
    }
}

fn parse_url(base: &str, params: &[(&str, &str)]) -> Result<Url> {
    Url::parse_with_params(base, params)
        .map_err(|e| TaskdeskError::config(format!("Invalid identity URL '{base}': {e}")))
}

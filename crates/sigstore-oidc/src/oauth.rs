//! OAuth flow implementation for interactive token acquisition
//!
//! This module implements the OAuth 2.0 authorization code flow with PKCE
//! against a discovered [`Issuer`]:
//!
//! - **Browser mode**: a loopback server receives the provider's redirect.
//!   This is the default.
//! - **Out-of-band mode**: the user opens the authorization URL manually and
//!   pastes the resulting code. Used when the browser can't be launched or
//!   when [`FORCE_OOB_ENV`] is set.

use crate::callback::{AuthorizationResponse, CallbackListener};
use crate::error::{Error, Result};
use crate::issuer::Issuer;
use crate::token::IdentityToken;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use url::Url;

/// Environment variable that forces out-of-band mode when set to any non-empty value
pub const FORCE_OOB_ENV: &str = "SIGSTORE_OAUTH_FORCE_OOB";

/// Redirect URI used for the out-of-band flow
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Client ID registered with Sigstore's Dex instances
pub const DEFAULT_CLIENT_ID: &str = "sigstore";

/// OAuth client configuration
#[derive(Clone)]
pub struct OAuthConfig {
    /// Client ID
    pub client_id: String,
    /// Client secret (empty for public clients)
    pub client_secret: String,
    /// Scopes to request
    pub scopes: Vec<String>,
    /// Skip the browser and use the out-of-band flow
    pub force_oob: bool,
}

impl OAuthConfig {
    /// Configuration for Sigstore's public OAuth provider
    pub fn sigstore() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            client_secret: String::new(),
            scopes: vec!["openid".to_string(), "email".to_string()],
            force_oob: false,
        }
    }

    /// Sigstore defaults, with `force_oob` taken from [`FORCE_OOB_ENV`]
    pub fn from_env() -> Self {
        Self {
            force_oob: force_oob_from_env(),
            ..Self::sigstore()
        }
    }

    /// Set the client credentials
    pub fn with_client(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = client_id.into();
        self.client_secret = client_secret.into();
        self
    }

    /// Force (or stop forcing) the out-of-band flow
    pub fn with_force_oob(mut self, force_oob: bool) -> Self {
        self.force_oob = force_oob;
        self
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self::sigstore()
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scopes", &self.scopes)
            .field("force_oob", &self.force_oob)
            .finish()
    }
}

/// Whether [`FORCE_OOB_ENV`] is set to a non-empty value
pub fn force_oob_from_env() -> bool {
    std::env::var_os(FORCE_OOB_ENV).is_some_and(|v| !v.is_empty())
}

/// A PKCE verifier and its S256 challenge
#[derive(Clone)]
pub struct Pkce {
    verifier: String,
    challenge: String,
}

impl Pkce {
    /// Generate a fresh verifier from 32 random bytes
    pub fn generate() -> Self {
        Self::from_verifier(random_token())
    }

    /// Derive the challenge for a known verifier
    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn challenge(&self) -> &str {
        &self.challenge
    }
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// State for one authorization attempt
pub struct FlowSession {
    client_id: String,
    client_secret: String,
    pkce: Pkce,
    state: String,
    redirect_uri: String,
    auth_endpoint: String,
}

impl FlowSession {
    /// Build a session and its authorization URL
    pub fn new(
        config: &OAuthConfig,
        authorization_endpoint: &str,
        redirect_uri: impl Into<String>,
    ) -> Result<Self> {
        let redirect_uri = redirect_uri.into();
        let pkce = Pkce::generate();
        let state = random_token();

        let mut url = Url::parse(authorization_endpoint).map_err(|e| Error::Discovery {
            url: authorization_endpoint.to_string(),
            message: format!("invalid authorization endpoint: {}", e),
            source: None,
        })?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", &redirect_uri)
            .append_pair("scope", &config.scopes.join(" "))
            .append_pair("code_challenge", pkce.challenge())
            .append_pair("code_challenge_method", "S256")
            .append_pair("state", &state);

        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            pkce,
            state,
            redirect_uri,
            auth_endpoint: url.into(),
        })
    }

    /// The full authorization URL
    pub fn auth_endpoint(&self) -> &str {
        &self.auth_endpoint
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn code_verifier(&self) -> &str {
        self.pkce.verifier()
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// Extract the authorization code from a redirect
    pub fn code_from_callback(&self, response: AuthorizationResponse) -> Result<String> {
        if let Some(error) = response.error {
            let reason = match response.error_description {
                Some(description) => format!("{} ({})", error, description),
                None => error,
            };
            return Err(Error::Authorization(format!(
                "Error response from auth endpoint: {}",
                reason
            )));
        }

        match response.state.as_deref() {
            Some(state) if state == self.state => {}
            Some(_) => {
                return Err(Error::Authorization(
                    "state mismatch - possible CSRF attack".to_string(),
                ))
            }
            None => {
                return Err(Error::Authorization(
                    "missing state parameter".to_string(),
                ))
            }
        }

        response
            .code
            .filter(|code| !code.is_empty())
            .ok_or_else(|| Error::Authorization("missing authorization code".to_string()))
    }
}

/// Future returned by [`InteractivePrompt::read_code`]
pub type PromptFuture<'a> = Pin<Box<dyn Future<Output = std::io::Result<String>> + Send + 'a>>;

/// User interaction during the interactive flow
pub trait InteractivePrompt: Send + Sync {
    /// Try to open `url` in a browser; `false` switches to the out-of-band flow
    fn open_browser(&self, url: &str) -> bool;

    /// Called once the browser is open and the flow is waiting for the redirect
    fn waiting_for_browser(&self);

    /// Show the authorization URL for manual use
    fn show_out_of_band_url(&self, url: &str);

    /// Read the verification code the user copied from the provider
    fn read_code(&self) -> PromptFuture<'_>;
}

/// Default prompt: system browser, stdout and stdin
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl InteractivePrompt for TerminalPrompt {
    fn open_browser(&self, url: &str) -> bool {
        match open::that(url) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("failed to open browser: {}", e);
                false
            }
        }
    }

    fn waiting_for_browser(&self) {
        println!("Waiting for browser interaction...");
    }

    fn show_out_of_band_url(&self, url: &str) {
        println!("Go to the following link in a browser:\n\n\t{}\n", url);
    }

    fn read_code(&self) -> PromptFuture<'_> {
        Box::pin(async {
            use std::io::Write;
            use tokio::io::{AsyncBufReadExt, BufReader};

            print!("Enter verification code: ");
            std::io::stdout().flush()?;
            let mut line = String::new();
            BufReader::new(tokio::io::stdin())
                .read_line(&mut line)
                .await?;
            Ok::<_, std::io::Error>(line.trim().to_string())
        })
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl Issuer {
    /// Obtain an identity token interactively, using the terminal and system browser
    pub async fn identity_token(&self, config: &OAuthConfig) -> Result<IdentityToken> {
        self.identity_token_with_prompt(config, &TerminalPrompt).await
    }

    /// Obtain an identity token interactively through a custom prompt
    pub async fn identity_token_with_prompt(
        &self,
        config: &OAuthConfig,
        prompt: &dyn InteractivePrompt,
    ) -> Result<IdentityToken> {
        let authorized = if config.force_oob {
            None
        } else {
            self.authorize_in_browser(config, prompt).await?
        };

        let (session, code) = match authorized {
            Some(authorized) => authorized,
            None => self.authorize_out_of_band(config, prompt).await?,
        };

        self.exchange_code(&session, &code).await
    }

    /// Browser mode; returns `None` if the browser couldn't be opened
    ///
    /// The callback server only lives for the duration of this call. There is
    /// no timeout; dropping the returned future cancels the wait and shuts the
    /// server down.
    async fn authorize_in_browser(
        &self,
        config: &OAuthConfig,
        prompt: &dyn InteractivePrompt,
    ) -> Result<Option<(FlowSession, String)>> {
        let listener = CallbackListener::bind().await?;
        let session = FlowSession::new(
            config,
            &self.config().authorization_endpoint,
            listener.redirect_uri(),
        )?;
        let mut server = listener.start(session.auth_endpoint().to_string());

        if !prompt.open_browser(&server.base_uri()) {
            return Ok(None);
        }
        prompt.waiting_for_browser();

        let response = server.wait_for_response().await?;
        drop(server);

        let code = session.code_from_callback(response)?;
        Ok(Some((session, code)))
    }

    async fn authorize_out_of_band(
        &self,
        config: &OAuthConfig,
        prompt: &dyn InteractivePrompt,
    ) -> Result<(FlowSession, String)> {
        let session = FlowSession::new(
            config,
            &self.config().authorization_endpoint,
            OOB_REDIRECT_URI,
        )?;
        prompt.show_out_of_band_url(session.auth_endpoint());

        let code = prompt
            .read_code()
            .await
            .map_err(|e| Error::io("reading the verification code", e))?;
        if code.is_empty() {
            return Err(Error::Authorization(
                "no verification code entered".to_string(),
            ));
        }
        Ok((session, code))
    }

    /// Exchange an authorization code for an access token
    async fn exchange_code(&self, session: &FlowSession, code: &str) -> Result<IdentityToken> {
        let token_endpoint = &self.config().token_endpoint;
        let params = [
            ("grant_type", "authorization_code"),
            ("redirect_uri", session.redirect_uri()),
            ("code", code),
            ("code_verifier", session.code_verifier()),
        ];

        tracing::debug!("exchanging authorization code at {}", token_endpoint);
        let response = self
            .client()
            .post(token_endpoint)
            .basic_auth(&session.client_id, Some(&session.client_secret))
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::TokenExchange {
                message: format!("request to {} failed", token_endpoint),
                status: None,
                source: Some(e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TokenExchange {
                message: format!("token endpoint returned {}: {}", status, body),
                status: Some(status.as_u16()),
                source: None,
            });
        }

        let token_response: TokenResponse =
            response.json().await.map_err(|e| Error::TokenExchange {
                message: "failed to parse token response".to_string(),
                status: Some(status.as_u16()),
                source: Some(e),
            })?;

        if let Some(error) = token_response.error {
            let reason = match token_response.error_description {
                Some(description) => format!("{} ({})", error, description),
                None => error,
            };
            return Err(Error::TokenExchange {
                message: format!("Error response from token endpoint: {}", reason),
                status: Some(status.as_u16()),
                source: None,
            });
        }

        token_response
            .access_token
            .map(IdentityToken::new)
            .ok_or_else(|| Error::TokenExchange {
                message: "no access_token in response".to_string(),
                status: Some(status.as_u16()),
                source: None,
            })
    }
}

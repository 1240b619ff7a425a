use std::fmt;
use std::io::{self, BufRead, IsTerminal, Write};

use reqwest::Url;

use super::SyncStatus;

/// Least-privilege scope: only files this app created are visible to it.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";
const CONSENT_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Bearer token held in memory for one session only.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated(AccessToken),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRequest<'a> {
    pub client_id: &'a str,
    pub scope: &'a str,
}

impl TokenRequest<'_> {
    pub fn consent_url(&self, redirect_uri: &str) -> String {
        match Url::parse_with_params(
            CONSENT_ENDPOINT,
            &[
                ("client_id", self.client_id),
                ("scope", self.scope),
                ("response_type", "token"),
                ("prompt", "consent"),
                ("redirect_uri", redirect_uri),
            ],
        ) {
            Ok(url) => url.to_string(),
            Err(_) => CONSENT_ENDPOINT.to_string(),
        }
    }
}

/// Issues bearer tokens after user consent.
pub trait TokenProvider {
    /// `Err(reason)` when the provider cannot prompt yet; callers may retry later.
    fn readiness(&self) -> Result<(), String>;

    /// `Ok(None)` when consent finished without a token.
    fn request_token(&mut self, request: &TokenRequest<'_>) -> io::Result<Option<String>>;
}

/// Token supplied up front, e.g. through the environment.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn readiness(&self) -> Result<(), String> {
        Ok(())
    }

    fn request_token(&mut self, _request: &TokenRequest<'_>) -> io::Result<Option<String>> {
        Ok(self
            .token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string))
    }
}

/// Prints the consent URL and reads the pasted token from the terminal.
#[derive(Debug, Clone)]
pub struct PromptTokenProvider {
    redirect_uri: String,
}

impl PromptTokenProvider {
    pub fn new(redirect_uri: impl Into<String>) -> Self {
        Self {
            redirect_uri: redirect_uri.into(),
        }
    }
}

impl TokenProvider for PromptTokenProvider {
    fn readiness(&self) -> Result<(), String> {
        if io::stdin().is_terminal() {
            Ok(())
        } else {
            Err(
                "Google sign-in is not available without a terminal. Set VISIT_PLANNER_ACCESS_TOKEN and try again."
                    .to_string(),
            )
        }
    }

    fn request_token(&mut self, request: &TokenRequest<'_>) -> io::Result<Option<String>> {
        let mut stderr = io::stderr();
        writeln!(stderr, "Open this URL to authorize Drive backups:")?;
        writeln!(stderr, "  {}", request.consent_url(&self.redirect_uri))?;
        write!(stderr, "Paste the access token: ")?;
        stderr.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        let token = line.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
    }
}

/// Sign-in state for one process. Nothing here is persisted.
#[derive(Debug)]
pub struct AuthSession {
    client_id: String,
    state: AuthState,
    last_status: Option<SyncStatus>,
}

impl AuthSession {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            state: AuthState::Unauthenticated,
            last_status: None,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn last_status(&self) -> Option<&SyncStatus> {
        self.last_status.as_ref()
    }

    pub fn token(&self) -> Option<&AccessToken> {
        match &self.state {
            AuthState::Authenticated(token) => Some(token),
            _ => None,
        }
    }

    pub fn initialize(&mut self, provider: &dyn TokenProvider) -> SyncStatus {
        if let Err(reason) = provider.readiness() {
            tracing::debug!(%reason, "token provider not ready");
            return self.report(SyncStatus::NotReady(reason));
        }
        if self.state == AuthState::Unauthenticated {
            self.state = AuthState::Authenticating;
        }
        self.report(SyncStatus::Ready)
    }

    pub fn request_token(&mut self, provider: &mut dyn TokenProvider) -> SyncStatus {
        if self.state == AuthState::Unauthenticated {
            return self.report(SyncStatus::NotReady("Auth not initialized yet.".to_string()));
        }

        let request = TokenRequest {
            client_id: &self.client_id,
            scope: DRIVE_SCOPE,
        };
        match provider.request_token(&request) {
            Ok(Some(token)) => {
                self.state = AuthState::Authenticated(AccessToken::new(token));
                tracing::info!("signed in for drive backups");
                self.report(SyncStatus::SignedIn)
            }
            Ok(None) => self.report(SyncStatus::Failed(
                "Sign-in did not return an access token.".to_string(),
            )),
            Err(err) => self.report(SyncStatus::Failed(format!("Sign-in failed: {}", err))),
        }
    }

    pub(super) fn report(&mut self, status: SyncStatus) -> SyncStatus {
        self.last_status = Some(status.clone());
        status
    }
}

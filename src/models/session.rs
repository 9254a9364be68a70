use serde::Serialize;

/// Last.fm credentials for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user_name: Option<String>,
    pub auth_token: Option<String>,
    pub auth_key: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user_name.is_some() && self.auth_token.is_some() && self.auth_key.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            authenticated: self.is_authenticated(),
            user_name: self.user_name.clone(),
        }
    }
}

/// What the HTTP surface reports about a session. Never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub user_name: Option<String>,
}

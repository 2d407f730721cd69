use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub api_url: String,
    pub ws_url: Option<String>,
    pub admin_id: Option<String>,
    pub admin_secret: Option<SecretString>,
    pub token: Option<SecretString>,
    pub identity: Option<String>,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(api_url: String) -> Self {
        Self {
            api_url,
            ws_url: None,
            admin_id: None,
            admin_secret: None,
            token: None,
            identity: None,
        }
    }

    pub fn set_token(&mut self, token: SecretString, identity: String) {
        self.token = Some(token);
        self.identity = Some(identity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let mut args = GlobalArgs::new("http://localhost:8080".to_string());
        assert_eq!(args.api_url, "http://localhost:8080");
        assert!(args.token.is_none());

        args.set_token(SecretString::from("tok"), "a@custodia.dev".to_string());
        assert_eq!(args.token.expect("token").expose_secret(), "tok");
        assert_eq!(args.identity.as_deref(), Some("a@custodia.dev"));
    }
}

pub mod run;

use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Login {
        email: String,
        password: SecretString,
        ephemeral: bool,
        otp: Option<String>,
    },
    Sessions,
    Revoke {
        token: String,
    },
    MfaSetup,
    MfaDisable,
    Watch,
    Publish {
        destination: String,
        message: String,
    },
}

use anyhow::{Context, Result};
use custodia::config::AppConfig;
use custodia::core::Core;
use custodia::error::Error;
use custodia::mfa::challenge::{MfaChallenge, MfaChallengeContext};
use custodia::mfa::enrollment::{EnrollmentState, MfaEnrollment};
use custodia::session::SessionScope;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::net::TcpListener;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn core_for(server: &MockServer) -> Result<Arc<Core>> {
    Ok(Arc::new(Core::new(AppConfig::new(
        server.uri(),
        None,
        None,
    ))?))
}

async fn mount_setup(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/auth/mfa/totp/setup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "otp_auth_url": "otpauth://totp/custodia:a@custodia.dev?secret=SECRET",
            "qr_url": "https://api.custodia.dev/qr/abc",
            "secret": "SECRET",
            "message": "scan the code"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn enrollment_walks_the_states() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_setup(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/mfa/totp/verify"))
        .and(body_partial_json(json!({"code": "123456"})))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut enrollment = MfaEnrollment::new(core_for(&server)?, false);
    assert_eq!(enrollment.state(), EnrollmentState::Initial);

    let secret = enrollment.begin().await?;
    assert_eq!(secret.secret, "SECRET");
    assert_eq!(enrollment.state(), EnrollmentState::AwaitingScan);
    assert!(enrollment.secret().is_some());

    // begin is only valid from Initial.
    assert!(matches!(
        enrollment.begin().await,
        Err(Error::FlowState(_))
    ));

    enrollment.proceed_to_verify()?;
    assert_eq!(enrollment.state(), EnrollmentState::AwaitingCode);

    enrollment.submit_code("123456").await?;
    assert_eq!(enrollment.state(), EnrollmentState::Initial);
    assert!(enrollment.is_enabled());
    assert!(enrollment.secret().is_none());
    Ok(())
}

#[tokio::test]
async fn malformed_code_is_rejected_without_a_network_call() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_setup(&server).await;

    let mut enrollment = MfaEnrollment::new(core_for(&server)?, false);
    enrollment.begin().await?;
    enrollment.proceed_to_verify()?;

    for code in ["12a45", "12345", "1234567", ""] {
        assert!(matches!(
            enrollment.submit_code(code).await,
            Err(Error::Validation(_))
        ));
        assert_eq!(enrollment.state(), EnrollmentState::AwaitingCode);
    }

    // Only the setup call reached the server.
    let requests = server
        .received_requests()
        .await
        .context("request recording disabled")?;
    assert_eq!(requests.len(), 1);
    Ok(())
}

#[tokio::test]
async fn rejected_code_keeps_the_flow_open_for_retry() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_setup(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/mfa/totp/verify"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/mfa/totp/verify"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut enrollment = MfaEnrollment::new(core_for(&server)?, false);
    enrollment.begin().await?;
    enrollment.proceed_to_verify()?;

    assert!(matches!(
        enrollment.submit_code("000000").await,
        Err(Error::InvalidCredential)
    ));
    assert_eq!(enrollment.state(), EnrollmentState::AwaitingCode);
    assert!(!enrollment.is_enabled());

    enrollment.submit_code("123456").await?;
    assert!(enrollment.is_enabled());
    Ok(())
}

#[tokio::test]
async fn disable_flips_the_flag_in_place() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/mfa/totp/disable"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let core = core_for(&server)?;
    let mut enrollment = MfaEnrollment::new(core.clone(), true);
    enrollment.disable().await?;
    assert!(!enrollment.is_enabled());

    // Disabling again is a state error, not a network call.
    assert!(matches!(
        enrollment.disable().await,
        Err(Error::FlowState(_))
    ));
    Ok(())
}

#[tokio::test]
async fn challenge_success_installs_the_session() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/mfa/challenge"))
        .and(body_partial_json(json!({
            "email": "a@custodia.dev",
            "otp": "123456",
            "password": "proof"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-2"})))
        .mount(&server)
        .await;

    let core = core_for(&server)?;
    let context = MfaChallengeContext::new(
        "a@custodia.dev".to_string(),
        SecretString::from("proof"),
    );
    let mut challenge = MfaChallenge::new(core.clone(), context, SessionScope::Ephemeral);

    challenge.submit("123456").await?;
    assert!(!challenge.is_active());

    let session = core.store.read().context("session installed")?;
    assert_eq!(session.token().expose_secret(), "tok-2");
    assert_eq!(session.scope(), SessionScope::Ephemeral);
    assert_eq!(session.identity(), "a@custodia.dev");

    // The context was consumed; a second submit is a state error.
    assert!(matches!(
        challenge.submit("123456").await,
        Err(Error::FlowState(_))
    ));
    Ok(())
}

#[tokio::test]
async fn rejected_challenge_retains_the_context() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/mfa/challenge"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/mfa/challenge"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-2"})))
        .mount(&server)
        .await;

    let core = core_for(&server)?;
    let context =
        MfaChallengeContext::new("a@custodia.dev".to_string(), SecretString::from("proof"));
    let mut challenge = MfaChallenge::new(core.clone(), context, SessionScope::Durable);

    assert!(matches!(
        challenge.submit("000000").await,
        Err(Error::InvalidCredential)
    ));
    assert!(challenge.is_active());
    assert!(core.store.read().is_none());

    challenge.submit("123456").await?;
    assert!(core.store.read().is_some());
    Ok(())
}

#[tokio::test]
async fn expired_challenge_context_must_be_restarted() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/mfa/challenge"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let core = core_for(&server)?;
    let context =
        MfaChallengeContext::new("a@custodia.dev".to_string(), SecretString::from("proof"));
    let mut challenge = MfaChallenge::new(core.clone(), context, SessionScope::Durable);

    assert!(matches!(
        challenge.submit("123456").await,
        Err(Error::ContextExpired)
    ));
    assert!(!challenge.is_active());
    assert!(matches!(
        challenge.submit("123456").await,
        Err(Error::FlowState(_))
    ));
    Ok(())
}

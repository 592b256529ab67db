use super::*;
use clap::CommandFactory;

#[test]
fn cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn parses_sign_up_with_full_name() {
    let cli = Cli::try_parse_from([
        "portal-cli",
        "--api-url",
        "http://api.test",
        "sign-up",
        "--email",
        "a@x.com",
        "--password",
        "pw1",
        "--full-name",
        "Ana Souza",
    ])
    .unwrap();

    assert_eq!(cli.api_url.as_deref(), Some("http://api.test"));
    assert!(matches!(
        cli.command,
        Command::SignUp { ref email, ref full_name, .. }
            if email == "a@x.com" && full_name.as_deref() == Some("Ana Souza")
    ));
}

#[test]
fn sign_in_requires_password() {
    assert!(Cli::try_parse_from(["portal-cli", "sign-in", "--email", "a@x.com"]).is_err());
}

#[test]
fn default_token_file_under_home() {
    assert_eq!(
        default_token_file(Some(PathBuf::from("/home/ana"))),
        Some(PathBuf::from("/home/ana/.portal/token"))
    );
    assert_eq!(default_token_file(Some(PathBuf::new())), None);
    assert_eq!(default_token_file(None), None);
}

#[test]
fn status_for_anonymous_session() {
    let session = Session { current_user: None, is_loading: false, resolved: true };
    let value = status_json(&session, &SessionCountdown::at(None, 0, 300));

    assert_eq!(value["phase"], "anonymous");
    assert_eq!(value["email"], Value::Null);
    assert_eq!(value["remaining"], "--:--");
    assert_eq!(value["valid"], false);
}

#[test]
fn status_for_signed_in_session() {
    let session = Session { current_user: Some(Identity::new("u-1", "a@x.com")), is_loading: false, resolved: true };
    let countdown = SessionCountdown { remaining: "04:10".into(), expiring_soon: true, valid: true };
    let value = status_json(&session, &countdown);

    assert_eq!(value["phase"], "authenticated");
    assert_eq!(value["email"], "a@x.com");
    assert_eq!(value["expiring_soon"], true);
}

#[test]
fn auth_errors_carry_code() {
    let err = CliError::from(AuthError::Rejected { status: 401, message: "Email ou senha incorretos".into() });
    assert_eq!(err.to_string(), "[E_AUTH_REJECTED] Email ou senha incorretos");
}

#[test]
fn network_errors_keep_transport_detail() {
    let err = CliError::from(AuthError::Network("connection refused".into()));
    assert_eq!(err.to_string(), "[E_AUTH_NETWORK] network failure: connection refused");
}

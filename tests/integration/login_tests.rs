//! Integration tests for login and cookie persistence

use crate::support::{fast_config, ScriptedEngine};
use tempfile::TempDir;
use timeline_harvest::browser::{
    load_cookies, BrowserSession, Cookie, HOME_INDICATOR, LOGIN_BUTTON, NEXT_BUTTON,
    PASSWORD_INPUT, USERNAME_INPUT,
};
use timeline_harvest::{HarvestError, LoginState};

fn auth_cookie() -> Cookie {
    Cookie {
        name: "auth_token".to_string(),
        value: "0123abcd".to_string(),
        domain: Some(".x.com".to_string()),
        path: Some("/".to_string()),
        secure: Some(true),
        http_only: Some(true),
        expiry: None,
        same_site: None,
    }
}

#[tokio::test]
async fn test_interactive_login_then_cookie_reuse() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(&dir);

    let first = ScriptedEngine::new(5);
    for selector in [USERNAME_INPUT, NEXT_BUTTON, PASSWORD_INPUT, LOGIN_BUTTON] {
        first.show(selector);
    }
    first.set_browser_cookies(vec![auth_cookie()]);

    let mut session = BrowserSession::new(Box::new(first.clone()), &config).unwrap();
    session.initialize().await.unwrap();
    assert_eq!(session.state(), LoginState::Launched);
    session.login().await.unwrap();
    assert_eq!(session.state(), LoginState::LoggedIn);
    assert_eq!(first.fills(), vec![USERNAME_INPUT, PASSWORD_INPUT]);
    session.cleanup().await;

    let saved = load_cookies(dir.path().join("cookies.json").as_path());
    assert_eq!(saved, vec![auth_cookie()]);

    // the next run gets in on the saved cookies alone
    let second = ScriptedEngine::new(5);
    second.show(HOME_INDICATOR);
    let mut session = BrowserSession::new(Box::new(second.clone()), &config).unwrap();
    session.initialize().await.unwrap();
    assert_eq!(session.state(), LoginState::CookiesPresent);
    assert_eq!(second.cookie_names(), vec!["auth_token"]);

    session.login().await.unwrap();
    assert_eq!(session.state(), LoginState::LoggedIn);
    assert!(second.fills().is_empty());
    assert!(second.navigations().contains(&"https://x.com/home".to_string()));
}

#[tokio::test]
async fn test_login_without_form_fails() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(&dir);

    let engine = ScriptedEngine::new(5);
    let mut session = BrowserSession::new(Box::new(engine.clone()), &config).unwrap();
    session.initialize().await.unwrap();

    let result = session.login().await;
    assert!(matches!(result, Err(HarvestError::Authentication(_))));
    assert_eq!(session.state(), LoginState::Failed);
    assert!(engine.fills().is_empty());
}

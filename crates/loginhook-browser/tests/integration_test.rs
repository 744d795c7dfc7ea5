use loginhook_browser::{BrowserActions, BrowserEngine, ElementKind};
use std::time::Duration;

#[tokio::test]
#[ignore = "Requires Chrome/Chromium installed"]
async fn test_browser_engine_creation() {
    let engine = BrowserEngine::new().await;
    assert!(engine.is_ok(), "Failed to create browser engine");
}

#[tokio::test]
#[ignore = "Requires Chrome/Chromium installed"]
async fn test_login_form_listing() {
    let engine = BrowserEngine::new().await.expect("launch browser");

    let page = "data:text/html,<form><input name=user><input type=password name=pw><button type=submit>Go</button></form>";
    engine.navigate(page).await.expect("navigate");
    engine
        .wait_for_settle(Duration::from_secs(5))
        .await
        .expect("settle");

    let elements = engine.interactive_elements().await.expect("list elements");
    let kinds: Vec<_> = elements.iter().map(|e| e.kind()).collect();
    assert_eq!(
        kinds,
        vec![ElementKind::Text, ElementKind::Password, ElementKind::Button]
    );

    engine.close().await.expect("close");
}

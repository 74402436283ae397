// End-to-end handoff pipeline tests across both platforms
use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ride_handoff::handoff::{
    BrowserSessionResult, DedupGuard, HandoffCoordinator, HttpExchangeClient, OutcomeRouter,
    PlatformDispatcher, SignInProgress, WebPage,
};
use ride_handoff::models::SessionToken;
use ride_handoff::session::SessionState;
use ride_handoff::testing::constants::{TEST_NATIVE_REDIRECT, TEST_PROVIDER, TEST_WEB_ORIGIN};
use ride_handoff::testing::{
    FakeWebPage, MockExchanger, RecordingShell, ScriptedBrowserSession, TestFixtures,
};
use ride_handoff::{Destination, Platform};

fn native_callback(token: &str) -> String {
    format!("{TEST_NATIVE_REDIRECT}#session_id={token}")
}

fn web_reentry(token: &str) -> String {
    format!("{TEST_WEB_ORIGIN}/#session_id={token}")
}

fn native_pipeline(
    browser: ScriptedBrowserSession,
    exchanger: &Arc<MockExchanger>,
) -> (HandoffCoordinator, Arc<ScriptedBrowserSession>, Arc<RecordingShell>) {
    let browser = Arc::new(browser);
    let shell = Arc::new(RecordingShell::default());
    let coordinator =
        TestFixtures::native_coordinator(browser.clone(), exchanger.clone(), shell.clone());
    (coordinator, browser, shell)
}

fn web_coordinator_sharing(
    page: &Arc<FakeWebPage>,
    exchanger: &Arc<MockExchanger>,
    shell: &Arc<RecordingShell>,
    guard: &DedupGuard,
) -> HandoffCoordinator {
    let settings = TestFixtures::settings(Platform::Web, "http://localhost:8000");
    HandoffCoordinator::with_guard(
        PlatformDispatcher::web(page.clone(), &settings),
        exchanger.clone(),
        OutcomeRouter::new(shell.clone(), SessionState::new(), TEST_PROVIDER),
        guard.clone(),
    )
}

#[tokio::test]
async fn test_concurrent_callbacks_exchange_once() {
    let (exchanger, gate) = MockExchanger::existing_user(TestFixtures::driver()).gated();
    let exchanger = Arc::new(exchanger);
    let (coordinator, _browser, shell) = native_pipeline(
        ScriptedBrowserSession::new(BrowserSessionResult::Cancel),
        &exchanger,
    );
    let url = native_callback("abc");

    let (first, second) = tokio::join!(coordinator.handle_callback(&url), async {
        // The first invocation is parked inside the exchange at this point
        assert!(coordinator.guard().is_in_flight());
        let second = coordinator.handle_callback(&url).await;
        gate.notify_one();
        second
    });

    assert_eq!(first, Some(Destination::DriverHome));
    assert_eq!(second, None);
    assert_eq!(exchanger.call_count(), 1);
    assert_eq!(shell.destinations(), vec![Destination::DriverHome]);
    assert!(shell.alerts().is_empty());
    assert!(!coordinator.guard().is_in_flight());
}

#[tokio::test]
async fn test_used_token_is_never_exchanged_again() {
    let exchanger = Arc::new(MockExchanger::existing_user(TestFixtures::rider()));
    let (coordinator, _browser, shell) = native_pipeline(
        ScriptedBrowserSession::new(BrowserSessionResult::Cancel),
        &exchanger,
    );

    assert_eq!(
        coordinator.handle_callback(&native_callback("abc")).await,
        Some(Destination::RiderHome)
    );
    assert_eq!(coordinator.handle_callback(&native_callback("abc")).await, None);
    assert_eq!(
        coordinator.handle_callback(&format!("{TEST_NATIVE_REDIRECT}?session_id=abc")).await,
        None
    );

    assert_eq!(exchanger.call_count(), 1);
    assert_eq!(shell.destinations().len(), 1);
    assert!(coordinator.guard().was_processed(&SessionToken::new("abc")));
}

#[tokio::test]
async fn test_failed_exchange_releases_guard() {
    let exchanger = Arc::new(MockExchanger::rejecting());
    let (coordinator, _browser, shell) = native_pipeline(
        ScriptedBrowserSession::new(BrowserSessionResult::Cancel),
        &exchanger,
    );

    assert_eq!(coordinator.handle_callback(&native_callback("t1")).await, None);
    assert!(!coordinator.guard().is_in_flight());

    // A different token is admitted right away
    assert_eq!(coordinator.handle_callback(&native_callback("t2")).await, None);
    assert_eq!(exchanger.tokens(), vec!["t1".to_string(), "t2".to_string()]);

    // The failed token stays consumed
    assert_eq!(coordinator.handle_callback(&native_callback("t1")).await, None);
    assert_eq!(exchanger.call_count(), 2);

    let alerts = shell.alerts();
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|(_, message)| message.contains("Invalid session")));
    assert!(shell.destinations().is_empty());
}

#[tokio::test]
async fn test_timeout_releases_guard_and_alerts() {
    let exchanger = Arc::new(MockExchanger::timing_out());
    let (coordinator, _browser, shell) = native_pipeline(
        ScriptedBrowserSession::new(BrowserSessionResult::Cancel),
        &exchanger,
    );

    assert_eq!(coordinator.handle_callback(&native_callback("slow")).await, None);
    assert!(!coordinator.guard().is_in_flight());
    assert_eq!(shell.alerts().len(), 1);
    assert!(shell.destinations().is_empty());
}

#[tokio::test]
async fn test_native_sign_in_new_user_goes_to_registration() {
    let exchanger = Arc::new(MockExchanger::new_user(TestFixtures::profile()));
    let (coordinator, browser, shell) = native_pipeline(
        ScriptedBrowserSession::success(&native_callback("abc")),
        &exchanger,
    );

    let progress = coordinator.sign_in().await;

    let prefill = match progress {
        SignInProgress::Finished(Some(Destination::Registration(prefill))) => prefill,
        other => panic!("expected registration, got {other:?}"),
    };
    assert_eq!(prefill.email, "a@b.com");
    assert_eq!(prefill.auth_provider, TEST_PROVIDER);
    assert!(!coordinator.router().session().is_authenticated());
    assert!(!coordinator.is_loading());
    assert_eq!(exchanger.tokens(), vec!["abc".to_string()]);
    assert_eq!(shell.destinations().len(), 1);

    let opened = browser.opened();
    assert_eq!(opened.len(), 1);
    assert!(opened[0].0.contains("redirect=ridehail%3A%2F%2Fauth%2Fcallback"));
    assert_eq!(opened[0].1, TEST_NATIVE_REDIRECT);
}

#[tokio::test]
async fn test_native_sign_in_existing_driver_is_authenticated() {
    let exchanger = Arc::new(MockExchanger::existing_user(TestFixtures::driver()));
    let (coordinator, _browser, _shell) = native_pipeline(
        ScriptedBrowserSession::success(&format!("{TEST_NATIVE_REDIRECT}?session_id=abc")),
        &exchanger,
    );

    assert_eq!(
        coordinator.sign_in().await,
        SignInProgress::Finished(Some(Destination::DriverHome))
    );
    let session = coordinator.router().session().current();
    assert_eq!(session.map(|s| s.user.id), Some("u1".to_string()));
}

#[tokio::test]
async fn test_native_cancel_and_dismiss_skip_the_pipeline() {
    for (result, expected) in [
        (BrowserSessionResult::Cancel, SignInProgress::Cancelled),
        (BrowserSessionResult::Dismiss, SignInProgress::Dismissed),
    ] {
        let exchanger = Arc::new(MockExchanger::existing_user(TestFixtures::driver()));
        let (coordinator, _browser, shell) =
            native_pipeline(ScriptedBrowserSession::new(result), &exchanger);

        assert_eq!(coordinator.sign_in().await, expected);
        assert!(!coordinator.is_loading());
        assert_eq!(exchanger.call_count(), 0);
        assert_eq!(coordinator.guard().processed_count(), 0);
        assert!(shell.alerts().is_empty());
        assert!(shell.destinations().is_empty());
    }
}

#[tokio::test]
async fn test_callback_without_token_alerts() {
    let exchanger = Arc::new(MockExchanger::existing_user(TestFixtures::driver()));
    let (coordinator, _browser, shell) = native_pipeline(
        ScriptedBrowserSession::success(&format!("{TEST_NATIVE_REDIRECT}#error=access_denied")),
        &exchanger,
    );

    assert_eq!(coordinator.sign_in().await, SignInProgress::Finished(None));
    assert_eq!(exchanger.call_count(), 0);
    assert_eq!(shell.alerts().len(), 1);
    assert!(shell.destinations().is_empty());
    assert!(!coordinator.is_loading());
}

#[tokio::test]
async fn test_web_sign_in_redirects_and_stays_loading() {
    let page = Arc::new(FakeWebPage::at(&format!("{TEST_WEB_ORIGIN}/")));
    let exchanger = Arc::new(MockExchanger::existing_user(TestFixtures::driver()));
    let shell = Arc::new(RecordingShell::default());
    let coordinator = TestFixtures::web_coordinator(page.clone(), exchanger.clone(), shell);

    assert_eq!(coordinator.platform(), Platform::Web);
    assert_eq!(coordinator.sign_in().await, SignInProgress::Redirected);
    assert!(coordinator.is_loading());
    assert_eq!(
        coordinator.sign_in().await,
        SignInProgress::AlreadyInProgress
    );

    let navigations = page.navigations();
    assert_eq!(navigations.len(), 1);
    assert!(navigations[0].contains("redirect=https%3A%2F%2Fride.example"));
    assert_eq!(exchanger.call_count(), 0);
}

#[tokio::test]
async fn test_web_reentry_strips_fragment_and_exchanges_once() {
    let page = Arc::new(FakeWebPage::at(&web_reentry("abc")));
    let exchanger = Arc::new(MockExchanger::existing_user(TestFixtures::rider()));
    let shell = Arc::new(RecordingShell::default());
    let coordinator =
        TestFixtures::web_coordinator(page.clone(), exchanger.clone(), shell.clone());

    assert_eq!(
        coordinator.resume_web_session().await,
        Some(Destination::RiderHome)
    );
    assert_eq!(page.current_location(), format!("{TEST_WEB_ORIGIN}/"));
    assert_eq!(page.history_rewrites().len(), 1);

    // Re-render of the same root view
    assert_eq!(coordinator.resume_web_session().await, None);
    assert_eq!(exchanger.call_count(), 1);
    assert_eq!(shell.destinations(), vec![Destination::RiderHome]);
}

#[tokio::test]
async fn test_web_reentry_without_token_does_nothing() {
    let page = Arc::new(FakeWebPage::at(&format!("{TEST_WEB_ORIGIN}/?session_id=abc")));
    let exchanger = Arc::new(MockExchanger::existing_user(TestFixtures::rider()));
    let shell = Arc::new(RecordingShell::default());
    let coordinator =
        TestFixtures::web_coordinator(page.clone(), exchanger.clone(), shell.clone());

    // Only a fragment token counts as a provider return on page load
    assert_eq!(coordinator.resume_web_session().await, None);
    assert_eq!(exchanger.call_count(), 0);
    assert!(page.history_rewrites().is_empty());
    assert!(shell.alerts().is_empty());
}

#[tokio::test]
async fn test_remount_before_history_rewrite_lands_exchanges_once() {
    let page = Arc::new(FakeWebPage::at(&web_reentry("abc")));
    page.ignore_history_rewrites();
    let (exchanger, gate) = MockExchanger::existing_user(TestFixtures::driver()).gated();
    let exchanger = Arc::new(exchanger);
    let shell = Arc::new(RecordingShell::default());
    let guard = DedupGuard::new();

    let first_mount = web_coordinator_sharing(&page, &exchanger, &shell, &guard);
    let second_mount = web_coordinator_sharing(&page, &exchanger, &shell, &guard);

    let (first, second) = tokio::join!(first_mount.resume_web_session(), async {
        // The fragment is still visible to the remounted view
        let second = second_mount.resume_web_session().await;
        gate.notify_one();
        second
    });

    assert_eq!(first, Some(Destination::DriverHome));
    assert_eq!(second, None);
    assert_eq!(exchanger.call_count(), 1);
    assert_eq!(page.history_rewrites().len(), 2);

    // A third mount after the exchange finished is refused as well
    let third_mount = web_coordinator_sharing(&page, &exchanger, &shell, &guard);
    assert_eq!(third_mount.resume_web_session().await, None);
    assert_eq!(exchanger.call_count(), 1);
    assert_eq!(shell.destinations(), vec![Destination::DriverHome]);
    assert!(shell.alerts().is_empty());
}

#[tokio::test]
async fn test_concurrent_callbacks_hit_backend_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/google/exchange"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(TestFixtures::existing_user_body("u1", "driver"))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let settings = TestFixtures::settings(Platform::Native, &server.uri());
    let exchanger = HttpExchangeClient::from_settings(&settings).unwrap();
    let shell = Arc::new(RecordingShell::default());
    let coordinator = HandoffCoordinator::new(
        PlatformDispatcher::native(
            Arc::new(ScriptedBrowserSession::new(BrowserSessionResult::Cancel)),
            &settings,
        ),
        Arc::new(exchanger),
        OutcomeRouter::new(shell.clone(), SessionState::new(), TEST_PROVIDER),
    );
    let url = native_callback("abc");

    let (first, second) = tokio::join!(
        coordinator.handle_callback(&url),
        coordinator.handle_callback(&url)
    );

    let mut results = vec![first, second];
    results.sort_by_key(Option::is_none);
    assert_eq!(results, vec![Some(Destination::DriverHome), None]);
    assert_eq!(shell.destinations(), vec![Destination::DriverHome]);
    assert!(shell.alerts().is_empty());
}

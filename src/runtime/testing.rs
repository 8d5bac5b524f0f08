//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use super::{Dispatcher, SessionExecutor, SESSION_IDLE_TIMEOUT};
use crate::blogger::{PublishError, PublishedPost};
use crate::credentials::{Credential, CredentialError};
use crate::oauth::{OAuthFlow, OAuthSettings, TokenError, TokenGrant};
use crate::session::{ChatId, UserId};
use crate::state_machine::PostDraft;
use crate::telegram::TelegramError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock Chat Client
// ============================================================================

/// Records every outbound message
#[derive(Default)]
pub struct MockChatClient {
    sent: Mutex<Vec<(ChatId, String)>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replies(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts sent to one chat, in order
    pub fn replies_to(&self, chat: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == chat)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Wait until at least `count` messages have been sent
    pub async fn wait_for_replies(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.sent.lock().unwrap().len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Wait until at least `count` messages have been sent to `chat`
    pub async fn wait_for_replies_to(&self, chat: ChatId, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.replies_to(chat).len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn send_message(&self, chat: ChatId, text: &str) -> Result<(), TelegramError> {
        self.sent.lock().unwrap().push((chat, text.to_string()));
        Ok(())
    }
}

// ============================================================================
// Mock Publisher
// ============================================================================

/// Returns queued results; succeeds with a numbered post when the queue is empty
#[derive(Default)]
pub struct MockPublisher {
    results: Mutex<VecDeque<Result<PublishedPost, PublishError>>>,
    /// `(access_token, draft)` for every call
    calls: Mutex<Vec<(String, PostDraft)>>,
    held: AtomicBool,
    released: Notify,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_result(&self, result: Result<PublishedPost, PublishError>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<(String, PostDraft)> {
        self.calls.lock().unwrap().clone()
    }

    /// Make every call wait until `release`
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.released.notify_waiters();
    }

    async fn wait_until_released(&self) {
        loop {
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.held.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl BlogPublisher for MockPublisher {
    async fn create_post(
        &self,
        access_token: &str,
        draft: &PostDraft,
    ) -> Result<PublishedPost, PublishError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((access_token.to_string(), draft.clone()));
            calls.len()
        };
        self.wait_until_released().await;
        self.results.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(PublishedPost {
                id: format!("post-{n}"),
                url: None,
            })
        })
    }
}

// ============================================================================
// Mock Token Endpoint
// ============================================================================

/// Token endpoint with queued results
#[derive(Default)]
pub struct MockTokenEndpoint {
    exchanges: Mutex<VecDeque<Result<TokenGrant, TokenError>>>,
    refreshes: Mutex<VecDeque<Result<TokenGrant, TokenError>>>,
    /// `(code, code_verifier)`
    recorded_exchanges: Mutex<Vec<(String, String)>>,
    /// Refresh tokens presented
    recorded_refreshes: Mutex<Vec<String>>,
}

impl MockTokenEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_exchange(&self, result: Result<TokenGrant, TokenError>) {
        self.exchanges.lock().unwrap().push_back(result);
    }

    pub fn queue_refresh(&self, result: Result<TokenGrant, TokenError>) {
        self.refreshes.lock().unwrap().push_back(result);
    }

    pub fn recorded_exchanges(&self) -> Vec<(String, String)> {
        self.recorded_exchanges.lock().unwrap().clone()
    }

    pub fn recorded_refreshes(&self) -> Vec<String> {
        self.recorded_refreshes.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenEndpoint for MockTokenEndpoint {
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenGrant, TokenError> {
        self.recorded_exchanges
            .lock()
            .unwrap()
            .push((code.to_string(), code_verifier.to_string()));
        self.exchanges
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TokenError::network("No mock exchange queued")))
    }

    async fn refresh(&self, credential: &Credential) -> Result<TokenGrant, TokenError> {
        self.recorded_refreshes
            .lock()
            .unwrap()
            .push(credential.refresh_token.clone().unwrap_or_default());
        self.refreshes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TokenError::network("No mock refresh queued")))
    }
}

// ============================================================================
// In-Memory Credential Store
// ============================================================================

#[derive(Default)]
pub struct InMemoryCredentialStore {
    records: Mutex<HashMap<UserId, Credential>>,
    saves: Mutex<usize>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record without counting it as a save
    pub fn insert(&self, user: UserId, credential: Credential) {
        self.records.lock().unwrap().insert(user, credential);
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self, user: UserId) -> Option<Credential> {
        self.records.lock().unwrap().get(&user).cloned()
    }

    async fn save(&self, user: UserId, credential: &Credential) -> Result<(), CredentialError> {
        self.records.lock().unwrap().insert(user, credential.clone());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn test_oauth_settings() -> OAuthSettings {
    OAuthSettings {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        auth_url: "https://accounts.example/auth".parse().unwrap(),
        token_url: "https://oauth.example/token".parse().unwrap(),
        redirect_uri: "http://localhost:5000/callback".parse().unwrap(),
        scopes: vec!["https://www.googleapis.com/auth/blogger".to_string()],
    }
}

pub fn test_credential(token: &str, expiry: Option<DateTime<Utc>>) -> Credential {
    Credential {
        token: token.to_string(),
        refresh_token: Some("refresh-token".to_string()),
        token_uri: "https://oauth.example/token".to_string(),
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        scopes: vec!["https://www.googleapis.com/auth/blogger".to_string()],
        expiry,
    }
}

// ============================================================================
// Test Harness
// ============================================================================

/// Dispatcher wired to mocks
pub struct TestHarness {
    pub dispatcher: Arc<Dispatcher>,
    pub chat: Arc<MockChatClient>,
    pub publisher: Arc<MockPublisher>,
    pub tokens: Arc<MockTokenEndpoint>,
    pub store: Arc<InMemoryCredentialStore>,
    pub oauth: Arc<OAuthFlow>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_idle_timeout(SESSION_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        let chat = Arc::new(MockChatClient::new());
        let publisher = Arc::new(MockPublisher::new());
        let tokens = Arc::new(MockTokenEndpoint::new());
        let store = Arc::new(InMemoryCredentialStore::new());
        let oauth = Arc::new(OAuthFlow::new(
            test_oauth_settings(),
            tokens.clone(),
            store.clone(),
        ));
        let executor = SessionExecutor::new(chat.clone(), oauth.clone(), publisher.clone());

        Self {
            dispatcher: Arc::new(Dispatcher::new(executor, idle_timeout)),
            chat,
            publisher,
            tokens,
            store,
            oauth,
        }
    }

    /// Store a credential that stays valid for an hour
    pub fn log_in(&self, user: UserId, token: &str) {
        self.store.insert(
            user,
            test_credential(token, Some(Utc::now() + chrono::Duration::hours(1))),
        );
    }

    /// Send messages from one user and wait for one reply each
    pub async fn say(&self, user: UserId, chat: ChatId, texts: &[&str]) -> Vec<String> {
        let before = self.chat.replies_to(chat).len();
        let expected = self.chat.replies().len() + texts.len();
        for text in texts {
            self.dispatcher
                .dispatch(crate::session::InboundMessage::new(user, chat, *text))
                .await;
        }
        assert!(
            self.chat.wait_for_replies(expected, Duration::from_secs(2)).await,
            "timed out waiting for replies"
        );
        self.chat.replies_to(chat).split_off(before)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::CallbackQuery;
    use crate::session::InboundMessage;
    use crate::state_machine::ComposeState;
    use crate::state_machine::transition::{
        ASK_CONTENT_TEXT, ASK_TITLE_TEXT, LOGIN_FIRST_TEXT, POST_READY_TEXT,
    };

    const ALICE: UserId = UserId(1);
    const ALICE_CHAT: ChatId = ChatId(100);
    const BOB: UserId = UserId(2);
    const BOB_CHAT: ChatId = ChatId(200);

    /// Integration test: compose and publish with a stored credential
    #[tokio::test]
    async fn test_compose_and_publish() {
        let h = TestHarness::new();
        h.log_in(ALICE, "access-1");
        h.publisher.queue_result(Ok(PublishedPost {
            id: "p1".to_string(),
            url: Some("https://blog.example/p1".to_string()),
        }));

        let replies = h
            .say(ALICE, ALICE_CHAT, &["/compose", "My title", "My content", "/publish"])
            .await;

        assert_eq!(
            replies,
            vec![
                ASK_TITLE_TEXT.to_string(),
                ASK_CONTENT_TEXT.to_string(),
                POST_READY_TEXT.to_string(),
                "Post Published! ID: p1\nhttps://blog.example/p1".to_string(),
            ]
        );

        let calls = h.publisher.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "access-1");
        assert_eq!(calls[0].1, PostDraft::new("My title", "My content"));

        let session = h.dispatcher.session(ALICE).await.unwrap();
        assert_eq!(session.state, ComposeState::Idle);
    }

    #[tokio::test]
    async fn test_publish_without_draft_never_calls_publisher() {
        let h = TestHarness::new();
        h.log_in(ALICE, "access");

        let replies = h.say(ALICE, ALICE_CHAT, &["/publish", "/compose", "/publish"]).await;

        assert_eq!(
            replies[0],
            "No post ready for publish, use /compose to create a new one"
        );
        assert_eq!(replies[2], replies[0]);
        assert!(h.publisher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_publish_without_credential_keeps_draft() {
        let h = TestHarness::new();

        let replies = h
            .say(ALICE, ALICE_CHAT, &["/compose", "T", "C", "/publish"])
            .await;

        assert_eq!(replies[3], LOGIN_FIRST_TEXT);
        assert!(h.publisher.calls().is_empty());
        let session = h.dispatcher.session(ALICE).await.unwrap();
        assert_eq!(session.draft_title(), Some("T"));
        assert_eq!(session.draft_content(), Some("C"));
    }

    #[tokio::test]
    async fn test_failed_publish_keeps_draft_for_retry() {
        let h = TestHarness::new();
        h.log_in(ALICE, "access");
        h.publisher
            .queue_result(Err(PublishError::server_error("Server error: backend")));

        let replies = h
            .say(ALICE, ALICE_CHAT, &["/compose", "T", "C", "/publish"])
            .await;
        assert!(replies[3].starts_with("An error occurred: Server error: backend"));
        assert!(h.dispatcher.session(ALICE).await.unwrap().state.is_post_ready());

        // Retry goes through with the same draft
        let replies = h.say(ALICE, ALICE_CHAT, &["/publish"]).await;
        assert_eq!(replies, vec!["Post Published! ID: post-2".to_string()]);
        let calls = h.publisher.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, calls[1].1);
    }

    #[tokio::test]
    async fn test_rejected_token_is_reported() {
        let h = TestHarness::new();
        h.log_in(ALICE, "revoked");
        h.publisher.queue_result(Err(PublishError::auth(
            "Authentication failed: Invalid Credentials",
        )));

        let replies = h
            .say(ALICE, ALICE_CHAT, &["/compose", "T", "C", "/publish"])
            .await;
        assert!(replies[3].contains("Invalid Credentials"));
        assert!(h.dispatcher.session(ALICE).await.unwrap().state.is_post_ready());
    }

    #[tokio::test]
    async fn test_expired_credential_is_refreshed_before_publish() {
        let h = TestHarness::new();
        h.store.insert(
            ALICE,
            test_credential("stale", Some(Utc::now() - chrono::Duration::minutes(5))),
        );
        h.tokens.queue_refresh(Ok(TokenGrant {
            access_token: "renewed".to_string(),
            refresh_token: None,
            expires_in: Some(3600),
            scopes: None,
        }));

        h.say(ALICE, ALICE_CHAT, &["/compose", "T", "C", "/publish"])
            .await;

        let calls = h.publisher.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "renewed");
        assert_eq!(h.store.load(ALICE).await.unwrap().token, "renewed");
    }

    #[tokio::test]
    async fn test_every_message_gets_exactly_one_reply() {
        let h = TestHarness::new();
        h.log_in(ALICE, "access");
        let texts = [
            "/start",
            "hello",
            "/publish",
            "/frobnicate",
            "/compose",
            "T",
            "C",
            "more text",
            "/publish",
            "/login",
        ];

        let replies = h.say(ALICE, ALICE_CHAT, &texts).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(replies.len(), texts.len());
        assert_eq!(h.chat.replies().len(), texts.len());
        assert_eq!(replies[1], "Use /compose to create a new post");
        assert!(replies[3].starts_with("Unknown command /frobnicate"));
        assert_eq!(replies[7], "Sorry, I didn't understand your request");
        assert!(replies[9].starts_with("Click this link to login: https://accounts.example/auth?"));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated_and_ordered_per_user() {
        let h = TestHarness::new();
        h.log_in(ALICE, "alice-token");
        h.log_in(BOB, "bob-token");

        let alice = ["/compose", "Alice title", "Alice body", "/publish"];
        let bob = ["/compose", "Bob title", "Bob body"];
        // Interleave the two users' messages
        for (i, text) in alice.iter().enumerate() {
            h.dispatcher
                .dispatch(InboundMessage::new(ALICE, ALICE_CHAT, *text))
                .await;
            if let Some(text) = bob.get(i) {
                h.dispatcher
                    .dispatch(InboundMessage::new(BOB, BOB_CHAT, *text))
                    .await;
            }
        }
        assert!(h.chat.wait_for_replies(7, Duration::from_secs(2)).await);

        assert_eq!(
            h.chat.replies_to(ALICE_CHAT),
            vec![
                ASK_TITLE_TEXT.to_string(),
                ASK_CONTENT_TEXT.to_string(),
                POST_READY_TEXT.to_string(),
                "Post Published! ID: post-1".to_string(),
            ]
        );
        assert_eq!(
            h.chat.replies_to(BOB_CHAT),
            vec![
                ASK_TITLE_TEXT.to_string(),
                ASK_CONTENT_TEXT.to_string(),
                POST_READY_TEXT.to_string(),
            ]
        );

        let calls = h.publisher.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "alice-token");
        assert_eq!(calls[0].1, PostDraft::new("Alice title", "Alice body"));

        let bob_session = h.dispatcher.session(BOB).await.unwrap();
        assert_eq!(bob_session.draft_title(), Some("Bob title"));
        assert_eq!(h.dispatcher.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_login_link_completes_for_requesting_user() {
        let h = TestHarness::new();
        h.tokens.queue_exchange(Ok(TokenGrant {
            access_token: "fresh-access".to_string(),
            refresh_token: Some("fresh-refresh".to_string()),
            expires_in: Some(3600),
            scopes: None,
        }));

        let replies = h.say(ALICE, ALICE_CHAT, &["/login"]).await;
        let url: reqwest::Url = replies[0]
            .strip_prefix("Click this link to login: ")
            .unwrap()
            .parse()
            .unwrap();
        let state = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap();

        let done = h
            .oauth
            .complete_login(&CallbackQuery {
                state: Some(state),
                code: Some("code".to_string()),
                error: None,
            })
            .await
            .unwrap();
        assert_eq!(done.user, ALICE);
        assert_eq!(done.chat, ALICE_CHAT);

        h.say(ALICE, ALICE_CHAT, &["/compose", "T", "C", "/publish"])
            .await;
        assert_eq!(h.publisher.calls()[0].0, "fresh-access");
    }

    #[tokio::test]
    async fn test_slow_publish_does_not_hold_up_other_users() {
        let h = TestHarness::new();
        h.log_in(ALICE, "access");
        h.publisher.hold();

        let mut texts = vec!["/compose", "T", "C", "/publish"];
        texts.extend(std::iter::repeat("more text").take(40));
        // Dispatched back to back, as the polling loop does
        for text in texts {
            h.dispatcher
                .dispatch(InboundMessage::new(ALICE, ALICE_CHAT, text))
                .await;
        }
        tokio::time::timeout(
            Duration::from_secs(1),
            h.dispatcher
                .dispatch(InboundMessage::new(BOB, BOB_CHAT, "/start")),
        )
        .await
        .expect("dispatch waited on another user's session");

        assert!(
            h.chat
                .wait_for_replies_to(BOB_CHAT, 1, Duration::from_secs(2))
                .await
        );
        assert!(h.chat.replies_to(BOB_CHAT)[0].starts_with("Welcome!"));
        // Alice is still stuck behind her publish
        assert_eq!(h.chat.replies_to(ALICE_CHAT).len(), 3);

        h.publisher.release();
        assert!(
            h.chat
                .wait_for_replies_to(ALICE_CHAT, 44, Duration::from_secs(2))
                .await
        );
        let alice = h.chat.replies_to(ALICE_CHAT);
        assert_eq!(alice[3], "Post Published! ID: post-1");
        assert_eq!(alice.len(), 44);
    }

    #[tokio::test]
    async fn test_idle_sessions_are_evicted_and_recreated() {
        let h = TestHarness::with_idle_timeout(Duration::from_millis(50));
        h.say(ALICE, ALICE_CHAT, &["/start"]).await;
        h.say(BOB, BOB_CHAT, &["/compose"]).await;

        tokio::time::sleep(Duration::from_millis(300)).await;

        // Bob's half-written post keeps his session alive
        assert!(h.dispatcher.session(ALICE).await.is_none());
        assert_eq!(
            h.dispatcher.session(BOB).await.unwrap().state,
            ComposeState::WaitingTitle
        );
        assert_eq!(h.dispatcher.session_count().await, 1);

        let replies = h.say(ALICE, ALICE_CHAT, &["/start"]).await;
        assert!(replies[0].starts_with("Welcome!"));
        assert_eq!(h.dispatcher.session_count().await, 2);

        let replies = h.say(BOB, BOB_CHAT, &["Still here"]).await;
        assert_eq!(replies, vec![ASK_CONTENT_TEXT.to_string()]);
    }

    #[tokio::test]
    async fn test_credentials_are_per_user() {
        let h = TestHarness::new();
        h.log_in(ALICE, "alice-token");

        let replies = h.say(BOB, BOB_CHAT, &["/compose", "T", "C", "/publish"]).await;
        assert_eq!(replies[3], LOGIN_FIRST_TEXT);
        assert!(h.publisher.calls().is_empty());
    }
}

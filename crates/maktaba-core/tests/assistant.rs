//! End-to-end tests for the conversation orchestrator over a SQLite store.

use maktaba_core::llm::LlmError;
use maktaba_core::{
    AssistantError, BudgetRejection, ContextBudget, History, Reply, SessionIdentity,
    SqliteUserStore, TRIMMED_NOTICE, Turn, UserStore,
};
use maktaba_test_utils::session::{TEST_DOMAIN, TEST_MODEL, TEST_SYSTEM_PROMPT, TestSession};
use maktaba_test_utils::tracing_setup::init_test_tracing;
use pretty_assertions::assert_eq;

fn words(n: usize) -> String {
    vec!["w"; n].join(" ")
}

#[tokio::test]
async fn test_too_long_question_touches_nothing() {
    let session = TestSession::new();
    let alice = session.login_as("alice").await;

    let reply = session
        .assistant
        .answer(&session.store, &alice, &words(301))
        .await
        .unwrap();

    assert_eq!(reply, Reply::Rejected(BudgetRejection::QueryTooLong));
    assert_eq!(
        reply.to_string(),
        "Your question is too long. Please ask in fewer words."
    );
    assert_eq!(session.users.loads(), 0);
    assert_eq!(session.users.saves(), 0);
    assert_eq!(session.provider.call_count(), 0);
}

#[tokio::test]
async fn test_question_at_per_request_ceiling_is_answered() {
    let session = TestSession::new();
    session.provider.push_answer(&["ok"]);

    let reply = session
        .assistant
        .answer(&session.store, &SessionIdentity::Guest, &words(300))
        .await
        .unwrap();
    assert_eq!(reply.answer(), Some("ok"));
}

#[tokio::test]
async fn test_history_and_query_too_long_writes_nothing() {
    let session = TestSession::with_budget(ContextBudget::new(1500, 2500));
    let alice = session.login_as("alice").await;
    let before: History = vec![Turn::new("q", "a")].into();
    session.users.save_history("alice", &before).await.unwrap();
    let saves_before = session.users.saves();

    let reply = session
        .assistant
        .answer(&session.store, &alice, &words(2000))
        .await
        .unwrap();

    assert_eq!(reply, Reply::Rejected(BudgetRejection::HistoryAndQueryTooLong));
    assert_eq!(
        reply.to_string(),
        "Your question and conversation history exceed the allowed limit. Please ask a shorter question."
    );
    assert_eq!(session.users.saves(), saves_before);
    assert_eq!(session.provider.call_count(), 0);
    assert_eq!(session.users.load_history("alice").await.unwrap(), before);
}

#[test_log::test(tokio::test)]
async fn test_oversized_turn_is_evicted_and_replaced() {
    let session = TestSession::new();
    let alice = session.login_as("alice").await;
    let big: History = vec![Turn::new(words(1600), "")].into();
    session.users.save_history("alice", &big).await.unwrap();
    session.provider.push_answer(&["Wa ", "alaikum"]);

    let reply = session
        .assistant
        .answer(&session.store, &alice, "hi")
        .await
        .unwrap();

    assert_eq!(
        reply,
        Reply::Answer {
            text: "Wa alaikum".to_string(),
            trimmed: true
        }
    );
    assert_eq!(reply.trimmed_notice(), Some(TRIMMED_NOTICE));

    let stored = session.users.load_history("alice").await.unwrap();
    assert_eq!(stored, History::from(vec![Turn::new("hi", "Wa alaikum")]));

    // The evicted turn never reached the provider.
    let requests = session.provider.requests();
    assert_eq!(requests[0].messages.len(), 2);
}

#[tokio::test]
async fn test_many_small_turns_trim_oldest_only() {
    init_test_tracing();
    let session = TestSession::new();
    let alice = session.login_as("alice").await;
    let turns: Vec<Turn> = (0..200)
        .map(|i| Turn::new(format!("q{i} {}", words(4)), words(5)))
        .collect();
    session
        .users
        .save_history("alice", &History::from(turns.clone()))
        .await
        .unwrap();
    session.provider.push_answer(&["done"]);

    let reply = session
        .assistant
        .answer(&session.store, &alice, &words(10))
        .await
        .unwrap();
    assert_eq!(reply.trimmed_notice(), Some(TRIMMED_NOTICE));

    // 200 turns of 10 tokens plus a 10-token query: keep the newest 149.
    let stored = session.users.load_history("alice").await.unwrap();
    assert_eq!(stored.len(), 150);
    assert_eq!(&stored.turns()[..149], &turns[51..]);
    assert_eq!(stored.turns()[149], Turn::new(words(10), "done"));
}

#[tokio::test]
async fn test_guest_second_question_sees_first_turn() {
    let session = TestSession::new();
    session.provider.push_answer(&["first answer"]);
    session.provider.push_answer(&["second answer"]);

    let guest = SessionIdentity::Guest;
    session
        .assistant
        .answer(&session.store, &guest, "first question")
        .await
        .unwrap();
    session
        .assistant
        .answer(&session.store, &guest, "second question")
        .await
        .unwrap();

    let requests = session.provider.requests();
    let second: Vec<(&str, &str)> = requests[1]
        .messages
        .iter()
        .map(|m| (m.role.as_str(), m.content.as_str()))
        .collect();
    assert_eq!(
        second,
        vec![
            ("system", TEST_SYSTEM_PROMPT),
            ("user", "first question"),
            ("assistant", "first answer"),
            ("user", "second question"),
        ]
    );

    // Guest turns never hit the durable store.
    assert_eq!(session.users.saves(), 0);
    assert_eq!(
        session.store.load(&guest).await.unwrap().len(),
        2,
        "both guest turns kept in the session"
    );
    assert!(
        session
            .another_session()
            .load(&guest)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_request_carries_model_and_domain() {
    let session = TestSession::new();
    session.provider.push_answer(&["x"]);

    session
        .assistant
        .answer(&session.store, &SessionIdentity::Guest, "salam")
        .await
        .unwrap();

    let request = &session.provider.requests()[0];
    assert_eq!(request.model, TEST_MODEL);
    assert_eq!(request.include_domains, vec![TEST_DOMAIN.to_string()]);
}

#[tokio::test]
async fn test_provider_failure_leaves_history_unchanged() {
    let session = TestSession::new();
    let alice = session.login_as("alice").await;
    let before: History = vec![Turn::new("q", "a")].into();
    session.users.save_history("alice", &before).await.unwrap();
    let saves_before = session.users.saves();

    session.provider.push_failure(LlmError::RateLimited {
        retry_after_secs: 30,
    });
    let err = session
        .assistant
        .answer(&session.store, &alice, "hi")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AssistantError::Llm(LlmError::RateLimited { .. })
    ));

    session
        .provider
        .push_mid_stream_failure(&["half an"], LlmError::Stream("reset".into()));
    let err = session
        .assistant
        .answer(&session.store, &alice, "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, AssistantError::Llm(LlmError::Stream(_))));

    assert_eq!(session.users.saves(), saves_before);
    assert_eq!(session.users.load_history("alice").await.unwrap(), before);
}

#[tokio::test]
async fn test_authenticated_history_survives_reopen() {
    let session = TestSession::new();
    let alice = session.login_as("alice").await;
    session.provider.push_answer(&["جواب"]);

    session
        .assistant
        .answer(&session.store, &alice, "سوال")
        .await
        .unwrap();

    let reopened = SqliteUserStore::open(&session.db_path).unwrap();
    assert_eq!(
        reopened.load_history("alice").await.unwrap(),
        History::from(vec![Turn::new("سوال", "جواب")])
    );
}

#[tokio::test]
async fn test_second_session_sees_authenticated_history() {
    let session = TestSession::new();
    let alice = session.login_as("alice").await;
    session.provider.push_answer(&["a1"]);
    session.provider.push_answer(&["a2"]);

    session
        .assistant
        .answer(&session.store, &alice, "q1")
        .await
        .unwrap();
    let other = session.another_session();
    session
        .assistant
        .answer(&other, &alice, "q2")
        .await
        .unwrap();

    let stored = session.users.load_history("alice").await.unwrap();
    assert_eq!(
        stored,
        History::from(vec![Turn::new("q1", "a1"), Turn::new("q2", "a2")])
    );
}

use std::collections::HashSet;
use std::sync::Arc;

use newsreader::extraction::ArticleRecord;
use newsreader::sessions::{InMemorySessionStore, SessionError, SessionStore};

fn article(title: &str) -> ArticleRecord {
    ArticleRecord {
        url: format!("https://news.example.com/{}", title.to_lowercase()),
        title: title.to_string(),
        content: "Body text of the article. ".repeat(10),
        author: Some("A. Writer".to_string()),
        published_date: None,
        meta_description: None,
    }
}

#[tokio::test]
async fn test_session_crud() {
    let store = InMemorySessionStore::new();
    assert!(store.is_empty());

    // Test 1: Create session
    let id = store.create(article("Budget"), "A summary".to_string()).await;
    assert!(id.starts_with("session_"));

    // Test 2: Get session
    let session = store.get(&id).await.expect("session exists");
    assert_eq!(session.id, id);
    assert_eq!(session.article.title, "Budget");
    assert_eq!(session.summary, "A summary");
    assert!(session.turns.is_empty());

    // Test 3: Append turns
    let first = store
        .append_turn(&id, "Who?".to_string(), "The council.".to_string())
        .await
        .expect("append first");
    store
        .append_turn(&id, "When?".to_string(), "Tuesday.".to_string())
        .await
        .expect("append second");

    let session = store.get(&id).await.unwrap();
    assert_eq!(session.turns.len(), 2);
    assert_eq!(session.turns[0], first);
    assert_eq!(session.turns[1].question, "When?");
    assert!(session.turns[0].timestamp <= session.turns[1].timestamp);
    // Article and summary are untouched by appends
    assert_eq!(session.summary, "A summary");
    assert_eq!(session.article, article("Budget"));

    // Test 4: List
    let listed = store.list().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].session_id, id);
    assert_eq!(listed[0].title, "Budget");
    assert_eq!(listed[0].url, "https://news.example.com/budget");
    assert_eq!(listed[0].message_count, 2);
    assert_eq!(listed[0].created_at, session.created_at);
}

#[tokio::test]
async fn test_back_to_back_creates_yield_distinct_ids() {
    let store = InMemorySessionStore::new();
    let mut ids = HashSet::new();
    for _ in 0..100 {
        let id = store.create(article("Same"), "s".to_string()).await;
        assert!(ids.insert(id), "session id reused");
    }
    assert_eq!(store.len(), 100);
}

#[tokio::test]
async fn test_unknown_session() {
    let store = InMemorySessionStore::new();
    let id = store.create(article("Kept"), "s".to_string()).await;

    assert!(matches!(
        store.get("session_missing").await,
        Err(SessionError::NotFound(ref missing)) if missing == "session_missing"
    ));

    let result = store
        .append_turn("session_missing", "q".to_string(), "a".to_string())
        .await;
    assert!(matches!(result, Err(SessionError::NotFound(_))));

    // Nothing was created or modified
    assert_eq!(store.len(), 1);
    assert!(store.get(&id).await.unwrap().turns.is_empty());
    assert!(store.get("session_missing").await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_all_land() {
    let store = Arc::new(InMemorySessionStore::new());
    let id = store.create(article("Busy"), "s".to_string()).await;

    let mut handles = Vec::new();
    for i in 0..32 {
        let store = store.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            store
                .append_turn(&id, format!("q{i}"), format!("a{i}"))
                .await
                .expect("append");
        }));
    }
    for handle in handles {
        handle.await.expect("task");
    }

    let session = store.get(&id).await.unwrap();
    assert_eq!(session.turns.len(), 32);
    let questions: HashSet<_> = session.turns.iter().map(|t| t.question.clone()).collect();
    assert_eq!(questions.len(), 32);
}

#[tokio::test]
async fn test_store_behind_trait_object() {
    let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    assert!(store.list().await.is_empty());
    let id = store.create(article("Dyn"), "s".to_string()).await;
    assert_eq!(store.list().await.len(), 1);
    assert_eq!(store.get(&id).await.unwrap().article.title, "Dyn");
}

//! Role reactables end to end: marking messages, toggling roles from
//! reaction events, conduct-acceptance grants, and the roles-channel rebuild.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use serenity::async_trait;
use serenity::model::id::{ChannelId, MessageId, RoleId, UserId};

use common::{archived, test_ctx, MockHost, RecordingSink};
use custodian_bot::commands::roles::{
    accept_coc, addrolereactable, mark_role_reactable, regenroles, toggle_role, ROLE_REACT_EMOJI,
};
use custodian_bot::commands::Deps;
use custodian_bot::config::BotConfig;
use custodian_bot::dispatch::{Invocation, Outcome, ReactionEventKind};
use custodian_bot::errors::StoreError;
use custodian_bot::store::{MemoryReactableStore, ReactableRecord, ReactableStore};

const CONFIG: &str = r#"
    [[guilds]]
    name = "Main"
    id = 100
    roles_channel = 201
    conduct_roles = [302, 304]
    member_role = 303
    management = true
    role_list = [
        { header = "**Pick your roles:**" },
        { role = 310, text = "React for the events role" },
        { role = 999, text = "React for a retired role" },
    ]
"#;

fn deps(store: Arc<dyn ReactableStore>) -> Arc<Deps> {
    Arc::new(Deps {
        config: Arc::new(BotConfig::from_toml(CONFIG).unwrap()),
        store,
        worker_token: String::new(),
    })
}

/// Store whose writes always fail.
struct FailingStore;

#[async_trait]
impl ReactableStore for FailingStore {
    async fn get(&self, _message: MessageId) -> Result<Option<ReactableRecord>, StoreError> {
        Ok(None)
    }

    async fn upsert(
        &self,
        _message: MessageId,
        _function_name: &str,
        _function_args: &str,
    ) -> Result<(), StoreError> {
        Err(StoreError::Repository(sqlx::Error::RowNotFound))
    }

    async fn delete(&self, _message: MessageId) -> Result<(), StoreError> {
        Ok(())
    }
}

#[tokio::test]
async fn toggle_add_is_idempotent() {
    let host = Arc::new(MockHost::new());
    let ctx = test_ctx(host.clone(), Some(1), 5, 500);

    let first = toggle_role("77".to_string(), ReactionEventKind::Add, ctx.clone())
        .await
        .unwrap();
    assert_eq!(first, Outcome::Handled);
    let second = toggle_role("77".to_string(), ReactionEventKind::Add, ctx)
        .await
        .unwrap();
    assert_eq!(second, Outcome::Handled);

    // The second add saw the role already held and did nothing.
    assert_eq!(
        *host.role_adds.lock().await,
        vec![(UserId::new(5), RoleId::new(77))]
    );
}

#[tokio::test]
async fn toggle_remove_is_idempotent() {
    let mut host = MockHost::new();
    host.member_roles = tokio::sync::Mutex::new(vec![RoleId::new(77)]);
    let host = Arc::new(host);
    let ctx = test_ctx(host.clone(), Some(1), 5, 500);

    toggle_role("77".to_string(), ReactionEventKind::Remove, ctx.clone())
        .await
        .unwrap();
    toggle_role("77".to_string(), ReactionEventKind::Remove, ctx)
        .await
        .unwrap();

    assert_eq!(host.role_removes.lock().await.len(), 1);
    assert!(host.role_adds.lock().await.is_empty());
}

#[tokio::test]
async fn toggle_with_a_malformed_stored_argument_is_a_noop() {
    let host = Arc::new(MockHost::new());
    let ctx = test_ctx(host.clone(), Some(1), 5, 500);

    let outcome = toggle_role("not-a-role".to_string(), ReactionEventKind::Add, ctx)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::NotApplicable);
    assert!(host.role_adds.lock().await.is_empty());
}

#[tokio::test]
async fn conduct_acceptance_grants_every_conduct_role() {
    let host = Arc::new(MockHost::new());
    let deps = deps(Arc::new(MemoryReactableStore::new()));
    let ctx = test_ctx(host.clone(), Some(100), 5, 500);

    let outcome = accept_coc(deps, String::new(), ReactionEventKind::Add, ctx)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Handled);
    assert_eq!(
        *host.role_adds.lock().await,
        vec![
            (UserId::new(5), RoleId::new(302)),
            (UserId::new(5), RoleId::new(304)),
        ]
    );
}

#[tokio::test]
async fn conduct_acceptance_skips_existing_members() {
    let mut host = MockHost::new();
    host.member_roles = tokio::sync::Mutex::new(vec![RoleId::new(303)]);
    let host = Arc::new(host);
    let deps = deps(Arc::new(MemoryReactableStore::new()));
    let ctx = test_ctx(host.clone(), Some(100), 5, 500);

    let outcome = accept_coc(deps, String::new(), ReactionEventKind::Add, ctx)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Handled);
    assert!(host.role_adds.lock().await.is_empty());
}

#[tokio::test]
async fn conduct_acceptance_ignores_reaction_removal() {
    let host = Arc::new(MockHost::new());
    let deps = deps(Arc::new(MemoryReactableStore::new()));
    let ctx = test_ctx(host.clone(), Some(100), 5, 500);

    let outcome = accept_coc(deps, String::new(), ReactionEventKind::Remove, ctx)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::NotApplicable);
    assert!(host.role_adds.lock().await.is_empty());
}

#[tokio::test]
async fn marking_a_reactable_seeds_the_emoji_and_persists() {
    let host = MockHost::new();
    let store = MemoryReactableStore::new();

    let persisted = mark_role_reactable(
        &store,
        &host,
        ChannelId::new(1),
        MessageId::new(55),
        RoleId::new(77),
    )
    .await
    .unwrap();
    assert!(persisted);

    assert_eq!(
        *host.reactions.lock().await,
        vec![(MessageId::new(55), ROLE_REACT_EMOJI.to_string())]
    );
    let record = store.get(MessageId::new(55)).await.unwrap().unwrap();
    assert_eq!(record.function_name, "toggle_role");
    assert_eq!(record.function_args, "77");
}

#[tokio::test]
async fn persistence_failure_is_soft_and_keeps_the_emoji() {
    let host = MockHost::new();

    let persisted = mark_role_reactable(
        &FailingStore,
        &host,
        ChannelId::new(1),
        MessageId::new(55),
        RoleId::new(77),
    )
    .await
    .unwrap();
    assert!(!persisted);
    assert_eq!(host.reactions.lock().await.len(), 1);
}

#[tokio::test]
async fn addrolereactable_marks_an_existing_message() {
    let mut host = MockHost::new();
    host.roles.insert(RoleId::new(77), "Events".to_string());
    host.history = HashMap::from([(
        ChannelId::new(1),
        vec![archived(55, 1, 4, &[], "react to me")],
    )]);
    let host = Arc::new(host);
    let store = Arc::new(MemoryReactableStore::new());
    let deps = deps(store.clone());
    let ctx = test_ctx(host.clone(), Some(100), 5, 500);
    let sink = Arc::new(RecordingSink::new());
    let inv = Invocation {
        name: "addrolereactable".to_string(),
        args: vec!["55".to_string(), "77".to_string()],
    };

    let outcome = addrolereactable(deps, inv, ctx, sink.clone()).await.unwrap();
    assert_eq!(outcome, Outcome::Handled);

    assert!(store.get(MessageId::new(55)).await.unwrap().is_some());
    // The invoking message was tidied away.
    assert_eq!(*host.single_calls.lock().await, vec![MessageId::new(500)]);
    assert!(sink
        .sent
        .lock()
        .await
        .iter()
        .any(|text| text == "Added role react for Events"));
}

#[tokio::test]
async fn addrolereactable_rejects_an_unknown_role() {
    let host = Arc::new(MockHost::new());
    let store = Arc::new(MemoryReactableStore::new());
    let deps = deps(store.clone());
    let ctx = test_ctx(host.clone(), Some(100), 5, 500);
    let sink = Arc::new(RecordingSink::new());
    let inv = Invocation {
        name: "addrolereactable".to_string(),
        args: vec!["55".to_string(), "77".to_string()],
    };

    let outcome = addrolereactable(deps, inv, ctx, sink.clone()).await.unwrap();
    assert_eq!(outcome, Outcome::Handled);
    assert!(store.get(MessageId::new(55)).await.unwrap().is_none());
    assert!(sink
        .sent
        .lock()
        .await
        .iter()
        .any(|text| text == "No role with that id was found"));
}

#[tokio::test(start_paused = true)]
async fn regenroles_rebuilds_the_configured_channel() {
    let mut host = MockHost::new();
    host.roles.insert(RoleId::new(310), "Events".to_string());
    let host = Arc::new(host);
    let store = Arc::new(MemoryReactableStore::new());
    let deps = deps(store.clone());
    let ctx = test_ctx(host.clone(), Some(100), 5, 500);
    let sink = Arc::new(RecordingSink::new());
    let inv = Invocation {
        name: "regenroles".to_string(),
        args: Vec::new(),
    };

    let outcome = regenroles(deps, inv, ctx, sink.clone()).await.unwrap();
    assert_eq!(outcome, Outcome::Handled);

    let roles_channel = ChannelId::new(201);
    let sent = host.sent.lock().await;
    assert_eq!(
        *sent,
        vec![
            (roles_channel, "**Pick your roles:**".to_string()),
            (roles_channel, "React for the events role".to_string()),
        ]
    );
    drop(sent);

    // One reactable was seeded and persisted; the vanished role was skipped.
    let reactions = host.reactions.lock().await;
    assert_eq!(reactions.len(), 1);
    let record = store.get(reactions[0].0).await.unwrap().unwrap();
    assert_eq!(record.function_args, "310");
    drop(reactions);

    assert!(sink
        .sent
        .lock()
        .await
        .iter()
        .any(|text| text.contains("999 no longer exists")));
}

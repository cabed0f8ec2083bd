mod common;

use hydractor::config::ConfigSource;
use hydractor::{ActorSystem, SystemBuilder};

#[tokio::test]
async fn system_create_with_default_options() {
    assert!(ActorSystem::new().await.is_ok());
}

#[tokio::test]
async fn system_create_accepts_a_valid_name() {
    let result = SystemBuilder::new().name("valid-name_1").test(true).create().await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn system_create_rejects_an_invalid_name() {
    for bad in ["/", "*", "/a/b/c", "@", "#", "abc*", "has spaces"] {
        let result = SystemBuilder::new().name(bad).test(true).create().await;
        assert!(result.is_err(), "expected '{}' to be rejected", bad);
    }
}

#[tokio::test]
async fn default_system_is_a_lazily_initialized_singleton() {
    let a = ActorSystem::default().await.unwrap();
    let b = ActorSystem::default().await.unwrap();
    assert_eq!(a.id(), b.id());
}

#[tokio::test]
async fn root_actor_is_ready_by_the_time_create_returns() {
    let system = ActorSystem::new().await.unwrap();
    let root = system.root_actor();
    assert!(!root.id().is_empty());
    assert!(root.parent().is_none());
}

#[tokio::test]
async fn config_falls_back_to_empty_when_default_path_is_missing() {
    let app_root = common::unique_temp_dir("missing-config");
    tokio::fs::create_dir_all(&app_root).await.unwrap();

    // No actors.json under app_root: config load degrades to an empty
    // table rather than failing system bootstrap.
    let system = SystemBuilder::new()
        .app_root(app_root)
        .test(true)
        .create()
        .await
        .unwrap();
    assert!(!system.root_actor().id().is_empty());
}

#[tokio::test]
async fn config_path_fallback_to_app_root_default_when_given_path_is_missing() {
    let app_root = common::unique_temp_dir("fallback-config");
    tokio::fs::create_dir_all(&app_root).await.unwrap();
    tokio::fs::write(app_root.join("actors.json"), r#"{"worker":{"mode":"forked"}}"#)
        .await
        .unwrap();

    let system = SystemBuilder::new()
        .app_root(app_root)
        .config(ConfigSource::Path("/definitely/does/not/exist.json".into()))
        .test(true)
        .create()
        .await
        .unwrap();
    assert!(!system.root_actor().id().is_empty());
}

#[tokio::test]
async fn system_destroy_resolves() {
    let system = ActorSystem::new().await.unwrap();
    assert!(system.destroy().await.is_ok());
}

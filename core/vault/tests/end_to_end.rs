//! Signup, save, logout, login and load against real stores.

use std::sync::Arc;

use keyward_common::Error;
use keyward_crypto::{derive_key, KdfParams, KeyDerivation, KeyScheme};
use keyward_storage::{LocalStore, MemoryStore, VaultStore};
use keyward_vault::{to_item, VaultConfig, VaultItem, VaultManager, VaultSession};
use tempfile::TempDir;

fn fast_params() -> KdfParams {
    KdfParams {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}

fn config(scheme: KeyScheme) -> VaultConfig {
    VaultConfig {
        key_scheme: scheme,
        credential_params: fast_params(),
        load_concurrency: 4,
    }
}

fn bank_item() -> VaultItem {
    VaultItem::new("Bank", "alice", "s3cr3t!")
        .with_url("bank.com")
        .with_notes("")
}

#[tokio::test]
async fn signup_save_logout_login_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("vault.json");

    let id = {
        let store = Arc::new(LocalStore::new(&path).unwrap());
        let manager = VaultManager::new(store, config(KeyScheme::Direct)).unwrap();

        manager.signup("a@b.com", b"Tr0ub4dor").await.unwrap();
        let mut session = manager.login("a@b.com", b"Tr0ub4dor").await.unwrap();
        let id = manager.save(&session, &bank_item()).await.unwrap();
        session.close();
        id
    };

    // Nothing sensitive reached disk.
    let on_disk = std::fs::read_to_string(&path).unwrap();
    assert!(!on_disk.contains("s3cr3t!"));
    assert!(!on_disk.contains("Tr0ub4dor"));
    assert!(on_disk.contains("bank.com"));

    let store = Arc::new(LocalStore::new(&path).unwrap());
    let manager = VaultManager::new(store, config(KeyScheme::Direct)).unwrap();
    let session = manager.login("a@b.com", b"Tr0ub4dor").await.unwrap();
    let loaded = manager.list(&session).await.unwrap();

    assert_eq!(loaded.len(), 1);
    let item = loaded[0].result.as_ref().unwrap();
    let mut expected = bank_item();
    expected.id = Some(id);
    assert_eq!(item, &expected);
}

#[tokio::test]
async fn wrong_secret_fails_login_and_decryption() {
    let store = Arc::new(MemoryStore::new());
    let manager = VaultManager::new(store.clone(), config(KeyScheme::Direct)).unwrap();

    let user_id = manager.signup("a@b.com", b"Tr0ub4dor").await.unwrap();
    let session = manager.login("a@b.com", b"Tr0ub4dor").await.unwrap();
    manager.save(&session, &bank_item()).await.unwrap();

    assert!(matches!(
        manager.login("a@b.com", b"wrong").await,
        Err(Error::InvalidCredentials)
    ));

    // Bypass the login check and use a key from the wrong secret directly.
    let records = store.find_records_by_owner(&user_id).await.unwrap();
    let wrong_key = derive_key(b"wrong", &KeyDerivation::Direct).unwrap();
    assert!(matches!(
        to_item(&records[0], &wrong_key),
        Err(Error::Decryption(_))
    ));

    let wrong_session = VaultSession::open(user_id, b"wrong", &KeyDerivation::Direct).unwrap();
    let loaded = wrong_session.load_all(&records).unwrap();
    assert!(matches!(loaded[0].result, Err(Error::Decryption(_))));
}

#[tokio::test]
async fn corrupted_record_does_not_hide_the_rest() {
    let store = Arc::new(MemoryStore::new());
    let manager = VaultManager::new(store.clone(), config(KeyScheme::Direct)).unwrap();

    manager.signup("a@b.com", b"Tr0ub4dor").await.unwrap();
    let session = manager.login("a@b.com", b"Tr0ub4dor").await.unwrap();

    let mut ids = Vec::new();
    for title in ["Bank", "Mail", "Shop"] {
        let item = VaultItem::new(title, "alice", format!("{}-pw", title));
        ids.push(manager.save(&session, &item).await.unwrap());
    }

    store
        .tamper_record(&ids[1], |r| {
            r.encrypted_notes = "bm90IHJlYWxseSBjaXBoZXJ0ZXh0IGF0IGFsbA==".to_string()
        })
        .unwrap();

    let loaded = manager.list(&session).await.unwrap();
    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded.iter().filter(|l| l.is_ok()).count(), 2);
    assert_eq!(loaded[1].record_id.as_ref(), Some(&ids[1]));
    assert!(matches!(loaded[1].result, Err(Error::Decryption(_))));

    assert!(matches!(
        manager.get(&session, &ids[1]).await,
        Err(Error::Decryption(_))
    ));
    assert_eq!(
        manager.get(&session, &ids[2]).await.unwrap().password.expose(),
        "Shop-pw"
    );
}

#[tokio::test]
async fn same_secret_key_material_depends_on_scheme() {
    // Direct: identical secrets give identical keys, so one user's key
    // opens the other's records.
    let store = Arc::new(MemoryStore::new());
    let manager = VaultManager::new(store.clone(), config(KeyScheme::Direct)).unwrap();
    manager.signup("alice@b.com", b"shared").await.unwrap();
    manager.signup("bob@b.com", b"shared").await.unwrap();
    let alice = manager.login("alice@b.com", b"shared").await.unwrap();
    manager
        .save(&alice, &VaultItem::new("Bank", "alice", "pw"))
        .await
        .unwrap();
    let record = store
        .find_records_by_owner(alice.user_id())
        .await
        .unwrap()
        .remove(0);
    let bob_user = store.find_user_by_email("bob@b.com").await.unwrap().unwrap();
    let bob_key = derive_key(b"shared", &bob_user.key_derivation).unwrap();
    assert!(to_item(&record, &bob_key).is_ok());

    // Argon2id: per-user salt, so the same secret gives a different key.
    let store = Arc::new(MemoryStore::new());
    let manager = VaultManager::new(
        store.clone(),
        config(KeyScheme::Argon2id {
            params: fast_params(),
        }),
    )
    .unwrap();
    manager.signup("alice@b.com", b"shared").await.unwrap();
    manager.signup("bob@b.com", b"shared").await.unwrap();
    let alice = manager.login("alice@b.com", b"shared").await.unwrap();
    manager
        .save(&alice, &VaultItem::new("Bank", "alice", "pw"))
        .await
        .unwrap();
    let record = store
        .find_records_by_owner(alice.user_id())
        .await
        .unwrap()
        .remove(0);
    let bob_user = store.find_user_by_email("bob@b.com").await.unwrap().unwrap();
    let bob_key = derive_key(b"shared", &bob_user.key_derivation).unwrap();
    assert!(matches!(
        to_item(&record, &bob_key),
        Err(Error::Decryption(_))
    ));
}

#[tokio::test]
async fn duplicate_signup_is_a_conflict() {
    let manager =
        VaultManager::new(Arc::new(MemoryStore::new()), config(KeyScheme::Direct)).unwrap();
    manager.signup("a@b.com", b"one").await.unwrap();
    assert!(matches!(
        manager.signup("a@b.com", b"two").await,
        Err(Error::DuplicateUser)
    ));
}

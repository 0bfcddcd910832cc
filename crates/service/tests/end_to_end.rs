//! End-to-end flows over an in-memory database: upload, share, revoke,
//! re-key, delete, exercised the way a client and the backend would drive
//! them together.

use std::collections::BTreeMap;

use uuid::Uuid;

use common::crypto::{
    decrypt_content, decrypt_name, looks_encrypted, CryptoError, KdfParams, PublicKey, WrappedKey,
};
use common::fs::FileNode;
use common::ledger::{AccessLedger, AuditLog, FileStore, MemberDirectory};
use service::drive::{
    prepare_enrollment, seal_file, seal_dir, CascadeOutcome, Drive, DriveError, Enrollment,
};
use service::rekey::{seal_rekey, RekeyOutcome};
use service::{Config, ContentStore, Database};

fn kdf() -> KdfParams {
    KdfParams {
        mem_cost_kib: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}

async fn test_drive() -> (Drive<Database>, tempfile::TempDir) {
    service::telemetry::init_tracing(Config::default().log_level);
    let database = Database::in_memory().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let content = ContentStore::open(dir.path().join("blobs")).await.unwrap();
    (Drive::new(database, content), dir)
}

async fn enroll(drive: &Drive<Database>, username: &str, secret: &str) -> (Enrollment, FileNode) {
    let enrollment = prepare_enrollment(username, secret, &kdf()).await.unwrap();
    let root = drive
        .register_member(
            username,
            &enrollment.identity,
            enrollment.root_encrypted_name.clone(),
            enrollment.root_wrapped,
        )
        .await
        .unwrap();
    (enrollment, root)
}

fn solo_members(username: &str, key: PublicKey) -> BTreeMap<String, PublicKey> {
    BTreeMap::from([(username.to_string(), key)])
}

#[tokio::test]
async fn test_upload_share_revoke_rekey_scenario() {
    let (drive, _tmp) = test_drive().await;

    let (alice, alice_root) = enroll(&drive, "alice", "alice-secret").await;
    let (bob, _) = enroll(&drive, "bob", "bob-secret").await;

    let alice_session = drive.open_session("alice", "alice-secret", &kdf()).await.unwrap();
    let bob_session = drive.open_session("bob", "bob-secret", &kdf()).await.unwrap();

    // alice uploads report.txt into her root (sole member: alice)
    let sealed = seal_file(
        "report.txt",
        b"q3 numbers, do not leak",
        &solo_members("alice", alice.identity.public_key),
    )
    .unwrap();
    let file = drive
        .create_file(
            "alice",
            alice_root.id,
            sealed.encrypted_name.clone(),
            sealed.ciphertext.clone().unwrap(),
            sealed.wrapped.clone(),
        )
        .await
        .unwrap();

    // alice shares the file with bob
    let bob_wrapped = WrappedKey::wrap(&sealed.file_key, &bob.identity.public_key).unwrap();
    let report = drive
        .share("alice", file.id, "bob", &BTreeMap::from([(file.id, bob_wrapped)]))
        .await
        .unwrap();
    assert_eq!(report, vec![(file.id, CascadeOutcome::Applied)]);

    // both can decrypt content and name through their own grants
    for session in [&alice_session, &bob_session] {
        let actor = session.username().to_string();
        let (ciphertext, wrapped) = drive.download(&actor, file.id).await.unwrap();
        let key = wrapped.unwrap_with(session.secret_key().unwrap()).unwrap();
        assert_eq!(
            decrypt_content(&key, &ciphertext).unwrap(),
            b"q3 numbers, do not leak"
        );
        assert_eq!(decrypt_name(&key, &file.encrypted_name), "report.txt");
    }

    // bob keeps his old wrapped key and the old ciphertext
    let (old_ciphertext, old_bob_wrapped) = drive.download("bob", file.id).await.unwrap();
    let old_key = old_bob_wrapped
        .unwrap_with(bob_session.secret_key().unwrap())
        .unwrap();

    // owner revokes bob; the file is now flagged for re-keying
    let report = drive.revoke("alice", file.id, "bob").await.unwrap();
    assert_eq!(report, vec![(file.id, CascadeOutcome::Applied)]);
    let node = drive.provider().node(file.id).await.unwrap().unwrap();
    assert!(node.needs_rekey);

    // bob is locked out of the server-side operations immediately
    assert!(matches!(
        drive.download("bob", file.id).await.unwrap_err(),
        DriveError::Authorization { .. }
    ));

    // owner re-keys with a fresh key wrapped only for alice
    let (_, request) = seal_rekey(
        Some("report.txt"),
        Some(b"q3 numbers, rewritten".as_slice()),
        &solo_members("alice", alice.identity.public_key),
    )
    .unwrap();
    drive.rekey().rekey_leaf("alice", file.id, request).await.unwrap();

    let node = drive.provider().node(file.id).await.unwrap().unwrap();
    assert!(!node.needs_rekey);

    // alice recovers the new content through her new grant
    let (new_ciphertext, alice_wrapped) = drive.download("alice", file.id).await.unwrap();
    let new_key = alice_wrapped
        .unwrap_with(alice_session.secret_key().unwrap())
        .unwrap();
    assert_eq!(
        decrypt_content(&new_key, &new_ciphertext).unwrap(),
        b"q3 numbers, rewritten"
    );

    // bob's retained material is now useless: his old key cannot open the
    // new ciphertext, and no new grant unwraps under his private key
    assert!(decrypt_content(&old_key, &new_ciphertext).is_err());
    for grant in drive.provider().grants_for(file.id).await.unwrap() {
        assert!(matches!(
            grant
                .wrapped_key
                .unwrap_with(bob_session.secret_key().unwrap())
                .unwrap_err(),
            CryptoError::Decryption
        ));
    }

    // the old ciphertext he hoarded still opens with the old key; revocation
    // protects future versions, not the past
    assert_eq!(
        decrypt_content(&old_key, &old_ciphertext).unwrap(),
        b"q3 numbers, do not leak"
    );
}

#[tokio::test]
async fn test_create_under_shared_parent_requires_every_member() {
    let (drive, _tmp) = test_drive().await;

    let (alice, alice_root) = enroll(&drive, "alice", "s1").await;
    let (carol, _) = enroll(&drive, "carol", "s2").await;

    // alice creates a directory and shares it with carol
    let sealed_dir = seal_dir("projects", &solo_members("alice", alice.identity.public_key)).unwrap();
    let dir = drive
        .create_dir("alice", alice_root.id, sealed_dir.encrypted_name.clone(), sealed_dir.wrapped.clone())
        .await
        .unwrap();
    let carol_wrapped = WrappedKey::wrap(&sealed_dir.file_key, &carol.identity.public_key).unwrap();
    drive
        .share("alice", dir.id, "carol", &BTreeMap::from([(dir.id, carol_wrapped)]))
        .await
        .unwrap();

    // creating a child wrapped only for alice omits carol: rejected, and
    // nothing is persisted
    let incomplete = seal_file("plan.md", b"draft", &solo_members("alice", alice.identity.public_key)).unwrap();
    let err = drive
        .create_file(
            "alice",
            dir.id,
            incomplete.encrypted_name.clone(),
            incomplete.ciphertext.clone().unwrap(),
            incomplete.wrapped.clone(),
        )
        .await
        .unwrap_err();
    match err {
        DriveError::MembershipIncomplete { missing } => {
            assert_eq!(missing, vec!["carol".to_string()])
        }
        other => panic!("expected MembershipIncomplete, got {other:?}"),
    }
    assert!(drive.provider().children(dir.id).await.unwrap().is_empty());

    // with the full member set the create goes through and carol can read
    let members = drive
        .provider()
        .public_keys(&["alice".to_string(), "carol".to_string()])
        .await
        .unwrap();
    let complete = seal_file("plan.md", b"draft", &members).unwrap();
    let file = drive
        .create_file(
            "alice",
            dir.id,
            complete.encrypted_name.clone(),
            complete.ciphertext.clone().unwrap(),
            complete.wrapped.clone(),
        )
        .await
        .unwrap();

    let carol_session = drive.open_session("carol", "s2", &kdf()).await.unwrap();
    let (ciphertext, wrapped) = drive.download("carol", file.id).await.unwrap();
    let key = wrapped.unwrap_with(carol_session.secret_key().unwrap()).unwrap();
    assert_eq!(decrypt_content(&key, &ciphertext).unwrap(), b"draft");
}

#[tokio::test]
async fn test_rekey_survivors_share_one_key_and_revoked_member_fails() {
    let (drive, _tmp) = test_drive().await;

    let (alice, alice_root) = enroll(&drive, "alice", "sa").await;
    let (bob, _) = enroll(&drive, "bob", "sb").await;
    let (carol, _) = enroll(&drive, "carol", "sc").await;

    let sealed = seal_file("ledger.csv", b"rows", &solo_members("alice", alice.identity.public_key)).unwrap();
    let file = drive
        .create_file(
            "alice",
            alice_root.id,
            sealed.encrypted_name.clone(),
            sealed.ciphertext.clone().unwrap(),
            sealed.wrapped.clone(),
        )
        .await
        .unwrap();

    for (name, key) in [("bob", &bob), ("carol", &carol)] {
        let wrapped = WrappedKey::wrap(&sealed.file_key, &key.identity.public_key).unwrap();
        drive
            .share("alice", file.id, name, &BTreeMap::from([(file.id, wrapped)]))
            .await
            .unwrap();
    }

    drive.revoke("alice", file.id, "carol").await.unwrap();

    // an omitted survivor is rejected before any grant is touched
    let (_, short_request) =
        seal_rekey(None, None, &solo_members("alice", alice.identity.public_key)).unwrap();
    let err = drive
        .rekey()
        .rekey_leaf("alice", file.id, short_request)
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::MembershipIncomplete { .. }));

    // full surviving set {alice, bob}
    let survivors = drive
        .provider()
        .public_keys(&["alice".to_string(), "bob".to_string()])
        .await
        .unwrap();
    let (_, request) = seal_rekey(None, None, &survivors).unwrap();
    drive.rekey().rekey_leaf("alice", file.id, request).await.unwrap();

    let alice_session = drive.open_session("alice", "sa", &kdf()).await.unwrap();
    let bob_session = drive.open_session("bob", "sb", &kdf()).await.unwrap();
    let carol_session = drive.open_session("carol", "sc", &kdf()).await.unwrap();

    let grants = drive.provider().grants_for(file.id).await.unwrap();
    assert_eq!(grants.len(), 2);

    // A and B recover the same new symmetric key; C fails on every grant
    let alice_key = grants
        .iter()
        .find(|g| g.member == "alice")
        .unwrap()
        .wrapped_key
        .unwrap_with(alice_session.secret_key().unwrap())
        .unwrap();
    let bob_key = grants
        .iter()
        .find(|g| g.member == "bob")
        .unwrap()
        .wrapped_key
        .unwrap_with(bob_session.secret_key().unwrap())
        .unwrap();
    assert_eq!(alice_key, bob_key);

    for grant in &grants {
        assert!(matches!(
            grant
                .wrapped_key
                .unwrap_with(carol_session.secret_key().unwrap())
                .unwrap_err(),
            CryptoError::Decryption
        ));
    }
}

#[tokio::test]
async fn test_revoking_last_grant_does_not_flag() {
    let (drive, _tmp) = test_drive().await;
    let (alice, alice_root) = enroll(&drive, "alice", "s").await;

    let sealed = seal_file("note.txt", b"n", &solo_members("alice", alice.identity.public_key)).unwrap();
    let file = drive
        .create_file(
            "alice",
            alice_root.id,
            sealed.encrypted_name.clone(),
            sealed.ciphertext.clone().unwrap(),
            sealed.wrapped.clone(),
        )
        .await
        .unwrap();

    // removing the only grant leaves nobody to re-key for
    drive.revoke("alice", file.id, "alice").await.unwrap();
    let node = drive.provider().node(file.id).await.unwrap().unwrap();
    assert!(!node.needs_rekey);
    assert!(drive.provider().grants_for(file.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_subtree_revoke_and_rekey_converges() {
    let (drive, _tmp) = test_drive().await;

    let (alice, alice_root) = enroll(&drive, "alice", "sa").await;
    let (bob, _) = enroll(&drive, "bob", "sb").await;

    // a directory with two files, fully shared with bob
    let sealed_dir = seal_dir("shared", &solo_members("alice", alice.identity.public_key)).unwrap();
    let dir = drive
        .create_dir("alice", alice_root.id, sealed_dir.encrypted_name.clone(), sealed_dir.wrapped.clone())
        .await
        .unwrap();

    let mut files = Vec::new();
    for name in ["a.txt", "b.txt"] {
        let sealed = seal_file(name, name.as_bytes(), &solo_members("alice", alice.identity.public_key)).unwrap();
        let file = drive
            .create_file(
                "alice",
                dir.id,
                sealed.encrypted_name.clone(),
                sealed.ciphertext.clone().unwrap(),
                sealed.wrapped.clone(),
            )
            .await
            .unwrap();
        files.push(file);
    }

    // the realistic share flow: fetch own wrapped keys over the subtree,
    // unwrap each, re-wrap for the new member
    let alice_session = drive.open_session("alice", "sa", &kdf()).await.unwrap();
    let own_grants = drive.grants_in_subtree("alice", dir.id).await.unwrap();
    assert_eq!(own_grants.len(), 3);
    let mut wrapped_per_node = BTreeMap::new();
    for (node_id, wrapped) in &own_grants {
        let key = wrapped.unwrap_with(alice_session.secret_key().unwrap()).unwrap();
        wrapped_per_node.insert(
            *node_id,
            WrappedKey::wrap(&key, &bob.identity.public_key).unwrap(),
        );
    }
    let report = drive.share("alice", dir.id, "bob", &wrapped_per_node).await.unwrap();
    assert!(report.iter().all(|(_, o)| *o == CascadeOutcome::Applied));

    // revoke bob across the subtree: every node keeps alice, so every node
    // is flagged
    let report = drive.revoke("alice", dir.id, "bob").await.unwrap();
    assert!(report.iter().all(|(_, o)| *o == CascadeOutcome::Applied));
    for id in [dir.id, files[0].id, files[1].id] {
        assert!(drive.provider().node(id).await.unwrap().unwrap().needs_rekey);
    }

    // first pass only supplies a replacement for the directory and a.txt
    let alice_only = solo_members("alice", alice.identity.public_key);
    let mut requests = BTreeMap::new();
    let (_, dir_request) = seal_rekey(None, None, &alice_only).unwrap();
    requests.insert(dir.id, dir_request);
    let (_, a_request) = seal_rekey(None, None, &alice_only).unwrap();
    requests.insert(files[0].id, a_request);

    let report = drive.rekey().rekey_subtree("alice", dir.id, requests).await.unwrap();
    let outcome_for = |report: &Vec<(Uuid, RekeyOutcome)>, id: Uuid| {
        report.iter().find(|(i, _)| *i == id).unwrap().1.clone()
    };
    assert_eq!(outcome_for(&report, dir.id), RekeyOutcome::Rekeyed);
    assert_eq!(outcome_for(&report, files[0].id), RekeyOutcome::Rekeyed);
    assert!(matches!(
        outcome_for(&report, files[1].id),
        RekeyOutcome::Skipped { .. }
    ));
    assert!(drive.provider().node(files[1].id).await.unwrap().unwrap().needs_rekey);

    // re-issuing with the missing replacement converges
    let mut requests = BTreeMap::new();
    let (_, b_request) = seal_rekey(None, None, &alice_only).unwrap();
    requests.insert(files[1].id, b_request);
    let report = drive.rekey().rekey_subtree("alice", dir.id, requests).await.unwrap();
    assert_eq!(outcome_for(&report, files[1].id), RekeyOutcome::Rekeyed);
    assert_eq!(outcome_for(&report, dir.id), RekeyOutcome::Current);

    for id in [dir.id, files[0].id, files[1].id] {
        assert!(!drive.provider().node(id).await.unwrap().unwrap().needs_rekey);
    }
}

#[tokio::test]
async fn test_delete_cascade_skips_unreadable_nodes() {
    let (drive, _tmp) = test_drive().await;

    let (alice, alice_root) = enroll(&drive, "alice", "sa").await;
    let (bob, _) = enroll(&drive, "bob", "sb").await;

    // alice makes a dir, shares it with bob; bob creates his own file in it
    let sealed_dir = seal_dir("team", &solo_members("alice", alice.identity.public_key)).unwrap();
    let dir = drive
        .create_dir("alice", alice_root.id, sealed_dir.encrypted_name.clone(), sealed_dir.wrapped.clone())
        .await
        .unwrap();
    let bob_wrapped = WrappedKey::wrap(&sealed_dir.file_key, &bob.identity.public_key).unwrap();
    drive
        .share("alice", dir.id, "bob", &BTreeMap::from([(dir.id, bob_wrapped)]))
        .await
        .unwrap();

    let members = drive
        .provider()
        .public_keys(&["alice".to_string(), "bob".to_string()])
        .await
        .unwrap();
    let sealed = seal_file("bobs.txt", b"mine", &members).unwrap();
    let bob_file = drive
        .create_file(
            "bob",
            dir.id,
            sealed.encrypted_name.clone(),
            sealed.ciphertext.clone().unwrap(),
            sealed.wrapped.clone(),
        )
        .await
        .unwrap();

    // bob revokes alice from his file; alice then tries to delete the dir
    drive.revoke("bob", bob_file.id, "alice").await.unwrap();
    let report = drive.delete("alice", dir.id).await.unwrap();

    // the unreadable file survives, and so must its parent directory
    let skipped: Vec<Uuid> = report
        .iter()
        .filter(|(_, o)| matches!(o, CascadeOutcome::Skipped { .. }))
        .map(|(id, _)| *id)
        .collect();
    assert!(skipped.contains(&dir.id));
    assert!(skipped.contains(&bob_file.id));
    assert!(drive.provider().node(bob_file.id).await.unwrap().is_some());
    assert!(drive.provider().node(dir.id).await.unwrap().is_some());

    // bob can still read his file afterwards
    let (ciphertext, wrapped) = drive.download("bob", bob_file.id).await.unwrap();
    let bob_session = drive.open_session("bob", "sb", &kdf()).await.unwrap();
    let key = wrapped.unwrap_with(bob_session.secret_key().unwrap()).unwrap();
    assert_eq!(decrypt_content(&key, &ciphertext).unwrap(), b"mine");

    // once bob deletes his own file, alice's delete finishes the job
    drive.delete("bob", bob_file.id).await.unwrap();
    let report = drive.delete("alice", dir.id).await.unwrap();
    assert!(report.iter().all(|(_, o)| *o == CascadeOutcome::Applied));
    assert!(drive.provider().node(dir.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_listing_without_grant_shows_encrypted_names() {
    let (drive, _tmp) = test_drive().await;

    let (alice, alice_root) = enroll(&drive, "alice", "sa").await;
    let (bob, _) = enroll(&drive, "bob", "sb").await;

    let sealed_dir = seal_dir("inbox", &solo_members("alice", alice.identity.public_key)).unwrap();
    let dir = drive
        .create_dir("alice", alice_root.id, sealed_dir.encrypted_name.clone(), sealed_dir.wrapped.clone())
        .await
        .unwrap();
    let sealed = seal_file("private.txt", b"p", &solo_members("alice", alice.identity.public_key)).unwrap();
    drive
        .create_file(
            "alice",
            dir.id,
            sealed.encrypted_name.clone(),
            sealed.ciphertext.clone().unwrap(),
            sealed.wrapped.clone(),
        )
        .await
        .unwrap();

    // share only the directory itself with bob, not the child
    let bob_wrapped = WrappedKey::wrap(&sealed_dir.file_key, &bob.identity.public_key).unwrap();
    drive
        .share("alice", dir.id, "bob", &BTreeMap::from([(dir.id, bob_wrapped)]))
        .await
        .unwrap();

    let entries = drive.list_children("bob", dir.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert!(entry.wrapped_key.is_none());

    // without a key the display name stays in its encoded form; that is
    // the documented soft-failure of name decryption
    assert!(looks_encrypted(&entry.node.encrypted_name));

    // alice sees the plaintext name through her grant
    let entries = drive.list_children("alice", dir.id).await.unwrap();
    let entry = &entries[0];
    let alice_session = drive.open_session("alice", "sa", &kdf()).await.unwrap();
    let key = entry
        .wrapped_key
        .unwrap()
        .unwrap_with(alice_session.secret_key().unwrap())
        .unwrap();
    assert_eq!(decrypt_name(&key, &entry.node.encrypted_name), "private.txt");
}

#[tokio::test]
async fn test_authorization_rules() {
    let (drive, _tmp) = test_drive().await;

    let (alice, alice_root) = enroll(&drive, "alice", "sa").await;
    let (_bob, _) = enroll(&drive, "bob", "sb").await;

    let sealed = seal_file("doc.txt", b"d", &solo_members("alice", alice.identity.public_key)).unwrap();
    let file = drive
        .create_file(
            "alice",
            alice_root.id,
            sealed.encrypted_name.clone(),
            sealed.ciphertext.clone().unwrap(),
            sealed.wrapped.clone(),
        )
        .await
        .unwrap();

    // no grant: no read, no write, no create under the parent
    assert!(matches!(
        drive.download("bob", file.id).await.unwrap_err(),
        DriveError::Authorization { .. }
    ));
    assert!(matches!(
        drive.rename("bob", file.id, "x".into()).await.unwrap_err(),
        DriveError::Authorization { .. }
    ));
    assert!(matches!(
        drive
            .update_content("bob", file.id, vec![0u8; 32])
            .await
            .unwrap_err(),
        DriveError::Authorization { .. }
    ));

    // non-owners cannot share or revoke: the cascade skips the node
    let wrapped = WrappedKey::wrap(&sealed.file_key, &alice.identity.public_key).unwrap();
    let report = drive
        .share("bob", file.id, "bob", &BTreeMap::from([(file.id, wrapped)]))
        .await
        .unwrap();
    assert!(matches!(report[0].1, CascadeOutcome::Skipped { .. }));

    let report = drive.revoke("bob", file.id, "alice").await.unwrap();
    assert!(matches!(report[0].1, CascadeOutcome::Skipped { .. }));
    assert!(drive.provider().grant_for(file.id, "alice").await.unwrap().is_some());

    // unknown members are rejected outright
    assert!(matches!(
        drive
            .share("alice", file.id, "mallory", &BTreeMap::new())
            .await
            .unwrap_err(),
        DriveError::Ledger(common::ledger::LedgerError::MemberNotFound(_))
    ));
}

#[tokio::test]
async fn test_drive_from_config_with_file_backed_stores() {
    let tmp = tempfile::tempdir().unwrap();
    let config = Config {
        sqlite_path: Some(tmp.path().join("coffer.db")),
        content_dir: Some(tmp.path().join("blobs")),
        ..Config::default()
    };
    let drive = Drive::from_config(&config).await.unwrap();

    let (alice, alice_root) = enroll(&drive, "alice", "sa").await;
    let sealed = seal_file("disk.txt", b"on disk", &solo_members("alice", alice.identity.public_key)).unwrap();
    let file = drive
        .create_file(
            "alice",
            alice_root.id,
            sealed.encrypted_name.clone(),
            sealed.ciphertext.clone().unwrap(),
            sealed.wrapped.clone(),
        )
        .await
        .unwrap();

    let session = drive.open_session("alice", "sa", &kdf()).await.unwrap();
    let (ciphertext, wrapped) = drive.download("alice", file.id).await.unwrap();
    let key = wrapped.unwrap_with(session.secret_key().unwrap()).unwrap();
    assert_eq!(decrypt_content(&key, &ciphertext).unwrap(), b"on disk");
}

#[tokio::test]
async fn test_audit_trail_records_mutations() {
    let (drive, _tmp) = test_drive().await;
    let (alice, alice_root) = enroll(&drive, "alice", "sa").await;

    let sealed = seal_file("log.txt", b"l", &solo_members("alice", alice.identity.public_key)).unwrap();
    let file = drive
        .create_file(
            "alice",
            alice_root.id,
            sealed.encrypted_name.clone(),
            sealed.ciphertext.clone().unwrap(),
            sealed.wrapped.clone(),
        )
        .await
        .unwrap();

    let renamed = common::crypto::encrypt_name(&sealed.file_key, "renamed.txt");
    drive.rename("alice", file.id, renamed).await.unwrap();
    drive.update_content("alice", file.id, sealed.ciphertext.clone().unwrap()).await.unwrap();

    let entries = drive.provider().entries_for(file.id).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.actor == "alice"));
    assert!(entries[0].message.contains("created"));
    assert!(entries[1].message.contains("renamed"));
    assert!(entries[2].message.contains("updated"));

    // audit entries survive deletion of the file they describe
    drive.delete("alice", file.id).await.unwrap();
    let entries = drive.provider().entries_for(file.id).await.unwrap();
    assert_eq!(entries.len(), 4);
}

//! Races on the one-shot latches, against a real database file so that
//! several pooled connections contend for SQLite's write lock.

use mizhiwu_core::{Actor, CoreError, Money, NewUser, RegistrationForm, DEFAULT_BASE_PORT};
use mizhiwu_db::{Database, DbConfig, DbError, LedgerSettings};
use tempfile::TempDir;

async fn file_database() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(DbConfig::new(dir.path().join("race.db")).max_connections(4))
        .await
        .unwrap();
    (dir, db)
}

async fn staff(db: &Database) -> i64 {
    db.users()
        .insert(
            &NewUser {
                username: "admin".to_string(),
                email: "admin@example.com".to_string(),
                password_hash: "unused".to_string(),
                is_staff: true,
                invite_user_id: None,
                invitecode_num: 5,
                sspasswd: "ss".to_string(),
            },
            DEFAULT_BASE_PORT,
        )
        .await
        .unwrap()
        .id
}

fn form(username: &str, code: &str) -> RegistrationForm {
    RegistrationForm {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password: "password1".to_string(),
        code: code.to_string(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_money_code_redeemed_once_under_race() {
    let (_dir, db) = file_database().await;
    let admin = staff(&db).await;
    let ledger = db.ledger(LedgerSettings::default());
    db.invite_codes().insert("A", Some(admin)).await.unwrap();
    db.invite_codes().insert("B", Some(admin)).await.unwrap();
    let alice = ledger.register(&form("alice", "A")).await.unwrap().id;
    let bob = ledger.register(&form("bob", "B")).await.unwrap().id;
    db.money_codes().insert("RACE50", Money::from_units(50)).await.unwrap();

    let (l1, l2) = (ledger.clone(), ledger.clone());
    let first = tokio::spawn(async move { l1.charge(alice, "RACE50").await });
    let second = tokio::spawn(async move { l2.charge(bob, "RACE50").await });
    let results = [first.await.unwrap(), second.await.unwrap()];

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(DbError::Rule(CoreError::MoneyCodeIncorrect)))));

    let total = db
        .users()
        .require(alice)
        .await
        .unwrap()
        .balance
        .checked_add(db.users().require(bob).await.unwrap().balance);
    assert_eq!(total, Some(Money::from_units(50)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_codes_charged_to_one_account_both_land() {
    let (_dir, db) = file_database().await;
    let admin = staff(&db).await;
    let ledger = db.ledger(LedgerSettings::default());
    db.invite_codes().insert("A", Some(admin)).await.unwrap();
    let alice = ledger.register(&form("alice", "A")).await.unwrap().id;
    db.money_codes().insert("TOPUP30", Money::from_units(30)).await.unwrap();
    db.money_codes().insert("TOPUP20", Money::from_units(20)).await.unwrap();

    let (l1, l2) = (ledger.clone(), ledger.clone());
    let first = tokio::spawn(async move { l1.charge(alice, "TOPUP30").await });
    let second = tokio::spawn(async move { l2.charge(alice, "TOPUP20").await });
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let alice = db.users().require(alice).await.unwrap();
    assert_eq!(alice.balance, Money::from_units(50));
    assert!(db.money_codes().list_unused().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_balance_covers_one_of_many_concurrent_purchases() {
    let (_dir, db) = file_database().await;
    let admin = staff(&db).await;
    let ledger = db.ledger(LedgerSettings::default());
    db.invite_codes().insert("A", Some(admin)).await.unwrap();
    let alice = ledger.register(&form("alice", "A")).await.unwrap().id;
    db.money_codes().insert("TOPUP20", Money::from_units(20)).await.unwrap();
    ledger.charge(alice, "TOPUP20").await.unwrap();
    let basic = db.goods().insert("Basic", Money::from_units(15), 1, 10).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..6 {
        let ledger = ledger.clone();
        let good = basic.id.to_string();
        handles.push(tokio::spawn(async move { ledger.purchase(alice, &good).await }));
    }
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(DbError::Rule(CoreError::InsufficientBalance { .. }))))
        .count();
    assert_eq!(refused, 5);

    let alice = db.users().require(alice).await.unwrap();
    assert_eq!(alice.balance, Money::from_units(5));
    assert_eq!(db.purchases().count_by_user(alice.id).await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_invite_code_consumed_once_under_race() {
    let (_dir, db) = file_database().await;
    let admin = staff(&db).await;
    let ledger = db.ledger(LedgerSettings::default());
    db.invite_codes().insert("SHARED", Some(admin)).await.unwrap();

    let (l1, l2) = (ledger.clone(), ledger.clone());
    let first = tokio::spawn(async move { l1.register(&form("carol", "SHARED")).await });
    let second = tokio::spawn(async move { l2.register(&form("dave", "SHARED")).await });
    let results = [first.await.unwrap(), second.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    // one account from the race plus the admin
    assert_eq!(db.users().count().await.unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_get_distinct_ports() {
    let (_dir, db) = file_database().await;
    let admin = staff(&db).await;
    let ledger = db.ledger(LedgerSettings::default());

    let mut handles = Vec::new();
    for i in 0..6 {
        let code = format!("CODE{}", i);
        db.invite_codes().insert(&code, Some(admin)).await.unwrap();
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger.register(&form(&format!("user{}", i), &code)).await
        }));
    }

    let mut ports = Vec::new();
    for handle in handles {
        ports.push(handle.await.unwrap().unwrap().port);
    }
    ports.sort_unstable();
    ports.dedup();
    assert_eq!(ports.len(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_invite_cap_holds_under_race() {
    let (_dir, db) = file_database().await;
    let admin = staff(&db).await;
    let ledger = db.ledger(LedgerSettings {
        base_port: DEFAULT_BASE_PORT,
        invitecode_num: 1,
    });
    db.invite_codes().insert("E", Some(admin)).await.unwrap();
    let erin = ledger.register(&form("erin", "E")).await.unwrap();
    let actor = Actor {
        id: erin.id,
        is_staff: false,
    };

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move { ledger.issue_invite_code(&actor, "erin").await }));
    }
    for handle in handles {
        let _ = handle.await.unwrap();
    }

    // cap 1 allows holding 2
    assert_eq!(db.invite_codes().count_by_owner(erin.id).await.unwrap(), 2);
}

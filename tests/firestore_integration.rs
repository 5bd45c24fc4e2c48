//! Firestore backend tests.
//!
//! These run against the Firestore emulator only; set
//! FIRESTORE_EMULATOR_HOST (e.g. localhost:8080) to enable them.

mod common;

use chrono::NaiveDate;
use petfolio::models::{ChatMessage, ChatRole, Pet, PlanTier, Species, UsageStats, User, Vaccine};
use petfolio::store::{FirestoreStore, PetStore};
use petfolio::time_utils::now_millis;

async fn emulator_store() -> FirestoreStore {
    FirestoreStore::new("petfolio-test")
        .await
        .expect("Failed to connect to Firestore emulator")
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, now_millis())
}

fn user(uid: &str) -> User {
    let now = now_millis();
    User {
        uid: uid.to_string(),
        name: "Emulator User".to_string(),
        email: format!("{}@example.com", uid),
        photo_url: None,
        plan: PlanTier::Free,
        plan_expires_at: None,
        created_at: now,
        last_login: now,
        usage: Some(UsageStats::default()),
    }
}

#[tokio::test]
async fn test_user_round_trip_and_email_lookup() {
    require_emulator!();
    let store = emulator_store().await;

    let uid = unique("u");
    store.upsert_user(&user(&uid)).await.unwrap();

    let got = store.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(got.uid, uid);
    assert_eq!(got.plan, PlanTier::Free);

    let found = store
        .find_user_by_email(&format!("{}@example.com", uid))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.uid, uid);

    assert!(store.get_user("never-created").await.unwrap().is_none());
}

#[tokio::test]
async fn test_pet_delete_cascades_to_vaccines() {
    require_emulator!();
    let store = emulator_store().await;

    let uid = unique("u");
    store.upsert_user(&user(&uid)).await.unwrap();

    let pet = Pet {
        pet_id: unique("p"),
        owner_id: uid.clone(),
        name: "Rex".to_string(),
        species: Species::Dog,
        breed: "Unknown".to_string(),
        birth_date: NaiveDate::from_ymd_opt(2021, 3, 14).unwrap(),
        weight_kg: 24.5,
        photo_url: None,
        created_at: now_millis(),
    };
    store.upsert_pet(&pet).await.unwrap();

    for i in 0..3 {
        store
            .upsert_vaccine(
                &uid,
                &Vaccine {
                    vaccine_id: format!("{}-v{}", pet.pet_id, i),
                    pet_id: pet.pet_id.clone(),
                    first_dose: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                    next_dose: None,
                    applied: false,
                    notes: String::new(),
                    photo_url: None,
                    created_at: now_millis(),
                },
            )
            .await
            .unwrap();
    }
    assert_eq!(store.list_vaccines(&uid, &pet.pet_id).await.unwrap().len(), 3);

    store.delete_pet(&uid, &pet.pet_id).await.unwrap();

    assert!(store
        .list_pets(&uid)
        .await
        .unwrap()
        .iter()
        .all(|p| p.pet_id != pet.pet_id));
    assert!(store.list_vaccines(&uid, &pet.pet_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_history_ordering() {
    require_emulator!();
    let store = emulator_store().await;

    let uid = unique("u");
    store.upsert_user(&user(&uid)).await.unwrap();

    for (suffix, ts) in [("b", 2000), ("a", 1000), ("c", 3000)] {
        store
            .append_chat(
                &uid,
                &ChatMessage {
                    id: format!("{}-{}", uid, suffix),
                    role: ChatRole::User,
                    text: suffix.to_string(),
                    image_url: None,
                    timestamp: ts,
                },
            )
            .await
            .unwrap();
    }

    let history = store.chat_history(&uid).await.unwrap();
    let texts: Vec<&str> = history.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_mock_store_fails_closed() {
    // Offline mock must surface errors, never pretend success
    let store = FirestoreStore::new_mock();
    assert!(store.get_user("u1").await.is_err());
    assert!(store.list_pets("u1").await.is_err());
}

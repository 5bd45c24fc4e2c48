//! Behavior tests for the file-backed store.

mod common;

use chrono::NaiveDate;
use common::{free_user, seed_user, test_env};
use petfolio::models::{ChatMessage, ChatRole, Pet, Species, Vaccine};
use petfolio::store::PetStore;
use petfolio::time_utils::now_millis;

fn pet(owner: &str, id: &str, name: &str) -> Pet {
    Pet {
        pet_id: id.to_string(),
        owner_id: owner.to_string(),
        name: name.to_string(),
        species: Species::Dog,
        breed: "Labrador".to_string(),
        birth_date: NaiveDate::from_ymd_opt(2021, 3, 14).unwrap(),
        weight_kg: 24.5,
        photo_url: None,
        created_at: now_millis(),
    }
}

fn vaccine(pet_id: &str, id: &str) -> Vaccine {
    Vaccine {
        vaccine_id: id.to_string(),
        pet_id: pet_id.to_string(),
        first_dose: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        next_dose: Some(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()),
        applied: true,
        notes: "Annual booster".to_string(),
        photo_url: None,
        created_at: now_millis(),
    }
}

#[tokio::test]
async fn test_pet_round_trip_preserves_fields() {
    let (_dir, store, _) = test_env().await;

    let created = pet("u1", "p1", "Rex");
    store.upsert_pet(&created).await.unwrap();

    let pets = store.list_pets("u1").await.unwrap();
    assert_eq!(pets.len(), 1);
    let got = &pets[0];
    assert_eq!(got.pet_id, "p1");
    assert_eq!(got.name, "Rex");
    assert_eq!(got.breed, "Labrador");
    assert_eq!(got.birth_date, created.birth_date);
    assert_eq!(got.weight_kg, 24.5);

    // Other owners do not see it
    assert!(store.list_pets("u2").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upsert_same_id_overwrites() {
    let (_dir, store, _) = test_env().await;

    store.upsert_pet(&pet("u1", "p1", "Rex")).await.unwrap();
    store.upsert_pet(&pet("u1", "p1", "Max")).await.unwrap();

    let pets = store.list_pets("u1").await.unwrap();
    assert_eq!(pets.len(), 1);
    assert_eq!(pets[0].name, "Max");
}

#[tokio::test]
async fn test_delete_pet_and_id_reuse() {
    let (_dir, store, _) = test_env().await;

    store.upsert_pet(&pet("u1", "p1", "Rex")).await.unwrap();
    store.upsert_pet(&pet("u1", "p2", "Bella")).await.unwrap();

    store.delete_pet("u1", "p1").await.unwrap();
    let pets = store.list_pets("u1").await.unwrap();
    assert_eq!(pets.len(), 1);
    assert_eq!(pets[0].pet_id, "p2");

    // Deleted ids are not reserved
    store.upsert_pet(&pet("u1", "p1", "Rex II")).await.unwrap();
    let pets = store.list_pets("u1").await.unwrap();
    assert_eq!(pets.len(), 2);
}

#[tokio::test]
async fn test_delete_pet_cascades_to_vaccines() {
    let (_dir, store, _) = test_env().await;

    store.upsert_pet(&pet("u1", "p1", "Rex")).await.unwrap();
    store.upsert_pet(&pet("u1", "p2", "Bella")).await.unwrap();
    store.upsert_vaccine("u1", &vaccine("p1", "v1")).await.unwrap();
    store.upsert_vaccine("u1", &vaccine("p1", "v2")).await.unwrap();
    store.upsert_vaccine("u1", &vaccine("p2", "v3")).await.unwrap();

    store.delete_pet("u1", "p1").await.unwrap();

    assert!(store.list_vaccines("u1", "p1").await.unwrap().is_empty());
    // The sibling pet's records survive
    let remaining = store.list_vaccines("u1", "p2").await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].vaccine_id, "v3");
}

#[tokio::test]
async fn test_missing_collections_read_as_empty() {
    let (_dir, store, _) = test_env().await;

    assert!(store.list_pets("ghost").await.unwrap().is_empty());
    assert!(store.list_vaccines("ghost", "p0").await.unwrap().is_empty());
    assert!(store.chat_history("ghost").await.unwrap().is_empty());
    assert!(store.get_user("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn test_listings_sorted_by_creation_instant() {
    let (_dir, store, _) = test_env().await;

    for (id, stamp) in [("p-c", 300), ("p-a", 100), ("p-b", 200)] {
        let mut p = pet("u1", id, id);
        p.created_at = stamp;
        store.upsert_pet(&p).await.unwrap();
    }
    let ids: Vec<String> = store
        .list_pets("u1")
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.pet_id)
        .collect();
    assert_eq!(ids, ["p-a", "p-b", "p-c"]);

    for (id, stamp) in [("v-late", 900), ("v-early", 100)] {
        let mut v = vaccine("p-a", id);
        v.created_at = stamp;
        store.upsert_vaccine("u1", &v).await.unwrap();
    }
    let vaccine_ids: Vec<String> = store
        .list_vaccines("u1", "p-a")
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.vaccine_id)
        .collect();
    assert_eq!(vaccine_ids, ["v-early", "v-late"]);
}

#[tokio::test]
async fn test_chat_history_sorted_by_timestamp() {
    let (_dir, store, _) = test_env().await;

    // Append out of order; reads must come back ascending
    for (id, ts) in [("m3", 3000), ("m1", 1000), ("m2", 2000)] {
        store
            .append_chat(
                "u1",
                &ChatMessage {
                    id: id.to_string(),
                    role: ChatRole::User,
                    text: format!("message {}", id),
                    image_url: None,
                    timestamp: ts,
                },
            )
            .await
            .unwrap();
    }

    let history = store.chat_history("u1").await.unwrap();
    let ids: Vec<&str> = history.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2", "m3"]);
}

#[tokio::test]
async fn test_find_user_by_email() {
    let (_dir, store, _) = test_env().await;

    seed_user(store.as_ref(), &free_user("u1")).await;
    seed_user(store.as_ref(), &free_user("u2")).await;

    let found = store.find_user_by_email("u2@example.com").await.unwrap();
    assert_eq!(found.unwrap().uid, "u2");
    assert!(store
        .find_user_by_email("missing@example.com")
        .await
        .unwrap()
        .is_none());
}

use super::*;
use crate::db;

fn input(name: &str, age: i64, prefs: &[&str]) -> UserInput {
    UserInput {
        name: name.to_string(),
        age,
        music_preferences: prefs.iter().map(|s| s.to_string()).collect(),
    }
}

fn store() -> UserStore {
    UserStore::new(db::open(":memory:").unwrap())
}

#[test]
fn test_normalize_trims_and_title_cases_name() {
    let normalized = input("  juan perez  ", 20, &["Rock"]).normalize().unwrap();
    assert_eq!(normalized.name, "Juan Perez");
    assert_eq!(normalized.age, 20);
}

#[test]
fn test_normalize_rejects_blank_name() {
    let err = input("   ", 25, &[]).normalize().unwrap_err();
    assert_eq!(err.field, "name");
    assert_eq!(err.message, "name cannot be empty or whitespace");
}

#[test]
fn test_normalize_rejects_age_out_of_range() {
    for age in [15, 18, 120, 200] {
        let err = input("Kid", age, &[]).normalize().unwrap_err();
        assert_eq!(err.field, "age");
        assert_eq!(err.message, "User age must be between 18 and 120");
    }
    assert!(input("Adult", 19, &[]).normalize().is_ok());
    assert!(input("Elder", 119, &[]).normalize().is_ok());
}

#[test]
fn test_normalize_cleans_music_preferences() {
    let normalized = input("Test", 25, &["Rock", "", "  ", " Jazz "])
        .normalize()
        .unwrap();
    assert_eq!(normalized.music_preferences, vec!["Rock", "Jazz"]);
}

#[test]
fn test_title_case_lowercases_rest_of_word() {
    assert_eq!(title_case("mARIA o'neil"), "Maria O'Neil");
}

#[test]
fn test_create_and_get() {
    let store = store();
    let created = store
        .create(&input("Test User", 25, &["Rock", "Pop"]).normalize().unwrap())
        .unwrap();

    let fetched = store.get(created.id).unwrap().unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.music_preferences, vec!["Rock", "Pop"]);
    assert!(store.exists(created.id).unwrap());
}

#[test]
fn test_get_nonexistent() {
    let store = store();
    assert!(store.get(42).unwrap().is_none());
    assert!(!store.exists(42).unwrap());
}

#[test]
fn test_update_replaces_fields() {
    let store = store();
    let created = store.create(&input("Old", 30, &["Pop"])).unwrap();

    let updated = store
        .update(created.id, &input("Updated Name", 31, &["Jazz"]))
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, "Updated Name");

    let fetched = store.get(created.id).unwrap().unwrap();
    assert_eq!(fetched.age, 31);
    assert_eq!(fetched.music_preferences, vec!["Jazz"]);

    assert!(store.update(999, &input("Nobody", 30, &[])).unwrap().is_none());
}

#[test]
fn test_delete() {
    let store = store();
    let created = store.create(&input("Doomed", 40, &[])).unwrap();

    assert!(store.delete(created.id).unwrap());
    assert!(store.get(created.id).unwrap().is_none());
    assert!(!store.delete(created.id).unwrap());
}

#[test]
fn test_list_orders_by_id() {
    let store = store();
    store.create(&input("First", 20, &[])).unwrap();
    store.create(&input("Second", 21, &[])).unwrap();

    let users = store.list().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].name, "First");
    assert_eq!(users[1].name, "Second");
}

#[test]
fn test_database_rejects_invalid_age() {
    // The CHECK constraint backs up input validation
    let store = store();
    assert!(store.create(&input("Kid", 12, &[])).is_err());
}

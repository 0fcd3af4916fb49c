// Integration tests for the on-disk business store
//
// These tests reopen the same database file to make sure records, categories
// and the keyword query survive a connection round trip.

use annuaire_stockage::{BusinessStore, CategoryStore, NewBusiness, Storage, KEYWORD_RESULT_LIMIT};
use tempfile::NamedTempFile;

fn seed(storage: &Storage) -> Vec<i64> {
    BusinessStore::new(storage)
        .batch_insert(&[
            NewBusiness::new("Sunny Bakery", "Fresh bread", "Paris", "France")
                .with_category("Bakery")
                .with_rating(4.8, 120),
            NewBusiness::new("Night Club", "Loud music", "Berlin", "Germany")
                .with_category("Nightlife")
                .with_rating(3.9, 40),
            NewBusiness::new("Corner Shop", "", "Paris", "France"),
        ])
        .unwrap()
}

#[test]
fn records_survive_reopen() {
    let temp_file = NamedTempFile::new().unwrap();
    let ids = {
        let storage = Storage::open(temp_file.path()).unwrap();
        seed(&storage)
    };

    let storage = Storage::open(temp_file.path()).unwrap();
    let store = BusinessStore::new(&storage);
    assert_eq!(store.count().unwrap(), 3);

    let all = store.list_all().unwrap();
    let listed: Vec<i64> = all.iter().map(|b| b.id).collect();
    assert_eq!(listed, ids);
    assert_eq!(all[0].category_name.as_deref(), Some("Bakery"));
    assert_eq!(all[2].category_name, None);
}

#[test]
fn deleting_category_keeps_business() {
    let storage = Storage::open_in_memory().unwrap();
    seed(&storage);

    let categories = CategoryStore::new(&storage);
    let bakery = categories.get_by_name("Bakery").unwrap().unwrap();
    assert!(categories.delete(bakery.id).unwrap());

    let store = BusinessStore::new(&storage);
    let all = store.list_all().unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].category_id, None);
    assert!(store.keyword_search("bakery", KEYWORD_RESULT_LIMIT).unwrap().is_empty());
}

#[test]
fn keyword_search_orders_matches_by_rating() {
    let storage = Storage::open_in_memory().unwrap();
    seed(&storage);

    let names: Vec<String> = BusinessStore::new(&storage)
        .keyword_search("paris", KEYWORD_RESULT_LIMIT)
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["Sunny Bakery", "Corner Shop"]);
}

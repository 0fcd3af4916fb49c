// Integration tests for the lexical index
//
// These tests check ranking properties over generated corpora and the
// search facade end to end against a SQLite store.

#[cfg(test)]
mod tests {
    use annuaire_recherche::{
        extract_corpus, BusinessSource, CorpusEntry, KeywordFilter, LexicalIndex, SearchService,
    };
    use annuaire_stockage::{BusinessStore, NewBusiness, Storage};
    use proptest::prelude::*;

    const WORDS: &[&str] = &[
        "bakery", "bread", "coffee", "roastery", "pizza", "pasta", "music", "club", "garden",
        "florist", "books", "vinyl", "paris", "berlin", "lyon", "rome", "tea", "wine",
    ];

    fn text_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(WORDS), 0..8).prop_map(|words| words.join(" "))
    }

    fn corpus_strategy() -> impl Strategy<Value = Vec<CorpusEntry>> {
        prop::collection::vec(text_strategy(), 0..30).prop_map(|texts| {
            texts
                .into_iter()
                .enumerate()
                .map(|(i, text)| CorpusEntry::new(i as i64 + 1, text))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn search_is_deterministic(corpus in corpus_strategy(), query in text_strategy(), k in 1usize..40) {
            let index = LexicalIndex::build(&corpus);
            prop_assert_eq!(index.search(&query, k), index.search(&query, k));

            let rebuilt = LexicalIndex::build(&corpus);
            prop_assert_eq!(index.search(&query, k), rebuilt.search(&query, k));
        }

        #[test]
        fn result_count_is_min_of_k_and_corpus(corpus in corpus_strategy(), query in text_strategy(), k in 1usize..40) {
            let index = LexicalIndex::build(&corpus);
            prop_assert_eq!(index.search(&query, k).len(), k.min(corpus.len()));
        }

        #[test]
        fn scores_are_non_increasing(corpus in corpus_strategy(), query in text_strategy(), k in 1usize..40) {
            let index = LexicalIndex::build(&corpus);
            let hits = index.search_scored(&query, k);
            for pair in hits.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
            for hit in &hits {
                prop_assert!(hit.score >= 0.0 && hit.score <= 1.0 + 1e-5);
            }
        }

        #[test]
        fn results_come_from_the_indexed_corpus(corpus in corpus_strategy(), query in text_strategy()) {
            let index = LexicalIndex::build(&corpus);
            for id in index.search(&query, corpus.len().max(1)) {
                prop_assert!(corpus.iter().any(|entry| entry.id == id));
            }
        }

        #[test]
        fn smaller_k_is_a_prefix(corpus in corpus_strategy(), query in text_strategy(), k in 1usize..20) {
            let index = LexicalIndex::build(&corpus);
            let short = index.search(&query, k);
            let long = index.search(&query, k + 5);
            prop_assert_eq!(&long[..short.len()], &short[..]);
        }
    }

    fn seeded_storage() -> Storage {
        let storage = Storage::open_in_memory().unwrap();
        let store = BusinessStore::new(&storage);
        store
            .insert(&NewBusiness::new("Sunny Bakery", "Fresh bread in", "Paris", "France").with_category("Bakery"))
            .unwrap();
        store
            .insert(&NewBusiness::new("Night Club", "Loud music in", "Berlin", "Germany").with_category("Nightlife"))
            .unwrap();
        storage
    }

    #[test]
    fn test_service_over_sqlite_store() {
        let storage = seeded_storage();
        let service = SearchService::default();

        let bakery = service.search(&storage, "bread Paris", 1).unwrap();
        let club = service.search(&storage, "music Berlin", 1).unwrap();

        let store = BusinessStore::new(&storage);
        assert_eq!(store.get(bakery[0]).unwrap().unwrap().name, "Sunny Bakery");
        assert_eq!(store.get(club[0]).unwrap().unwrap().name, "Night Club");
    }

    #[test]
    fn test_reindex_picks_up_new_businesses() {
        let storage = seeded_storage();
        let service = SearchService::default();
        assert_eq!(service.reindex(&storage).unwrap(), 2);

        let id = BusinessStore::new(&storage)
            .insert(&NewBusiness::new("Leaf & Cup", "Green tea house", "Kyoto", "Japan"))
            .unwrap();

        // The published index is a snapshot until the next rebuild
        assert_ne!(service.search(&storage, "green tea", 1).unwrap(), vec![id]);

        assert_eq!(service.reindex(&storage).unwrap(), 3);
        assert_eq!(service.search(&storage, "green tea", 1).unwrap(), vec![id]);
    }

    #[test]
    fn test_index_matches_store_order() {
        let storage = seeded_storage();
        let businesses = BusinessStore::new(&storage).list_all().unwrap();
        let index = LexicalIndex::build(&extract_corpus(&businesses));
        let expected: Vec<i64> = businesses.iter().map(|b| b.id).collect();
        assert_eq!(index.ids(), expected.as_slice());
    }

    #[test]
    fn test_keyword_filter_over_sqlite_store() {
        let storage = seeded_storage();
        let results = KeywordFilter::default().search(&storage, "nightlife").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Night Club");
    }

    #[test]
    fn test_keyword_sources_agree_on_non_ascii_case() {
        let storage = seeded_storage();
        BusinessStore::new(&storage)
            .insert(&NewBusiness::new("CAFÉ ÉTOILE", "Croissants", "Genève", "Suisse"))
            .unwrap();
        let records = BusinessStore::new(&storage).list_all().unwrap();
        let filter = KeywordFilter::default();

        for query in ["café", "ÉTOILE", "genève"] {
            let from_store = filter.search(&storage, query).unwrap();
            let from_slice = filter.search(records.as_slice(), query).unwrap();
            assert_eq!(from_store.len(), 1, "query {}", query);
            assert_eq!(from_store, from_slice, "query {}", query);
        }
    }

    #[test]
    fn test_projection_of_a_very_large_result() {
        let storage = Storage::open_in_memory().unwrap();
        let businesses: Vec<NewBusiness> = (0..33_000)
            .map(|i| NewBusiness::new(format!("Bakery {i}"), "Fresh bread", "Paris", "France"))
            .collect();
        BusinessStore::new(&storage).batch_insert(&businesses).unwrap();

        let service = SearchService::default();
        let ids = service.search(&storage, "bread", 40_000).unwrap();
        assert_eq!(ids.len(), 33_000);

        let found = storage.businesses_by_ids(&ids).unwrap();
        assert_eq!(found.len(), 33_000);
    }
}

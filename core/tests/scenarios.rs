use ir_core::{
    DocId, Index, IndexConfig, IndexError, MemoryStore, Namespace, PostingsList, Query, QueryType, RankingType, SledStore,
    Store,
};
use tempfile::tempdir;

fn insert_text<S: Store>(idx: &mut Index<S>, doc_id: DocId, text: &str) {
    let words: Vec<&str> = text.split_whitespace().collect();
    for (offset, w) in words.iter().enumerate() {
        idx.insert(w, doc_id, offset as u32).unwrap();
    }
    idx.register_document(doc_id, format!("doc{doc_id}.txt"), words.len() as u32);
}

fn ids(pl: &PostingsList) -> Vec<DocId> {
    pl.doc_ids().collect()
}

fn cat_dog_index() -> Index<MemoryStore> {
    let mut idx = Index::create(MemoryStore::new(), IndexConfig::default()).unwrap();
    idx.insert("cat", 1, 0).unwrap();
    idx.insert("cat", 2, 5).unwrap();
    idx.insert("dog", 2, 6).unwrap();
    idx
}

#[test]
fn phrase_matches_adjacent_occurrences_only() {
    let idx = cat_dog_index();
    let r = idx.search(&Query::new(["cat", "dog"]), QueryType::Phrase, RankingType::TfIdf).unwrap();
    assert_eq!(ids(&r), vec![2]);
    assert_eq!(r.get(2).unwrap().offsets, vec![6]);
}

#[test]
fn intersection_requires_every_term() {
    let idx = cat_dog_index();
    let r = idx.search(&Query::new(["cat", "dog"]), QueryType::Intersection, RankingType::TfIdf).unwrap();
    assert_eq!(ids(&r), vec![2]);
}

#[test]
fn ranked_tf_idf_is_length_normalized() {
    let mut idx = Index::create(MemoryStore::new(), IndexConfig::default()).unwrap();
    for doc_id in 1..=3 {
        for offset in 0..10u32 {
            let term = if offset == 0 && doc_id != 3 { "x".to_string() } else { format!("filler{doc_id}_{offset}") };
            idx.insert(&term, doc_id, offset).unwrap();
        }
        idx.register_document(doc_id, format!("doc{doc_id}"), 10);
    }

    let r = idx.search(&Query::new(["x"]).with_weight("x", 1.0), QueryType::Ranked, RankingType::TfIdf).unwrap();
    let expected = (3.0f64 / 2.0).log10() / 10.0;
    assert_eq!(ids(&r), vec![1, 2]);
    for e in r.iter() {
        assert!((e.score - expected).abs() < 1e-9, "score {} != {expected}", e.score);
    }
}

#[test]
fn combination_adds_importance_to_lexical_score() {
    let mut idx = Index::create(MemoryStore::new(), IndexConfig { importance_multiplier: 2.0, ..Default::default() })
        .unwrap();
    insert_text(&mut idx, 1, "x a");
    insert_text(&mut idx, 2, "b c");
    insert_text(&mut idx, 3, "x d");
    insert_text(&mut idx, 4, "e f");
    idx.set_importance_scores([(1, 0.1), (2, 0.9), (3, 0.4), (4, 0.0)].into_iter().collect());

    let r = idx.search(&Query::new(["x"]), QueryType::Ranked, RankingType::Combination).unwrap();
    let lexical = (4.0f64 / 2.0).log10() / 2.0;
    assert_eq!(ids(&r), vec![3, 1]);
    assert!((r.get(3).unwrap().score - (lexical + 0.8)).abs() < 1e-9);
    assert!((r.get(1).unwrap().score - (lexical + 0.2)).abs() < 1e-9);
}

#[test]
fn merge_keeps_disjoint_postings_intact() {
    let mut a = Index::create(MemoryStore::new(), IndexConfig::default()).unwrap();
    insert_text(&mut a, 1, "x y");
    insert_text(&mut a, 2, "z x");
    let mut b = Index::create(MemoryStore::new(), IndexConfig::default()).unwrap();
    insert_text(&mut b, 3, "x x");
    insert_text(&mut b, 4, "w w x");
    let (a, b) = (a.finalize().unwrap(), b.finalize().unwrap());

    let merged = Index::merge(MemoryStore::new(), IndexConfig::default(), &[&b, &a]).unwrap();
    let x = merged.postings("x").unwrap();
    assert_eq!(ids(&x), vec![1, 2, 3, 4]);
    assert_eq!(x.get(1).unwrap().offsets, vec![0]);
    assert_eq!(x.get(2).unwrap().offsets, vec![1]);
    assert_eq!(x.get(3).unwrap().offsets, vec![0, 1]);
    assert_eq!(x.get(4).unwrap().offsets, vec![2]);
    assert_eq!(merged.number_of_docs(), 4);
    assert_eq!(merged.metadata().filename(3).unwrap(), "doc3.txt");
    assert_eq!(merged.metadata().length(4).unwrap(), 3);
}

#[test]
fn merge_rejects_overlapping_doc_ids() {
    let mut a = Index::create(MemoryStore::new(), IndexConfig::default()).unwrap();
    insert_text(&mut a, 1, "x");
    insert_text(&mut a, 2, "y");
    let mut b = Index::create(MemoryStore::new(), IndexConfig::default()).unwrap();
    insert_text(&mut b, 2, "x");
    let (a, b) = (a.finalize().unwrap(), b.finalize().unwrap());

    let dir = tempdir().unwrap();
    let err = Index::merge(SledStore::open(dir.path()).unwrap(), IndexConfig::default(), &[&a, &b]).err().unwrap();
    match err {
        IndexError::MergeConflict { doc_ids, first_source, second_source } => {
            assert_eq!(doc_ids, vec![2]);
            assert_eq!((first_source, second_source), (0, 1));
        }
        other => panic!("unexpected error: {other}"),
    }

    let dest = SledStore::open(dir.path()).unwrap();
    assert!(dest.keys(Namespace::Meta).unwrap().is_empty());
    assert!(dest.keys(Namespace::Postings).unwrap().is_empty());
}

#[test]
fn lenient_merge_combines_shared_documents() {
    let mut a = Index::create(MemoryStore::new(), IndexConfig::default()).unwrap();
    a.insert("x", 1, 0).unwrap();
    let mut b = Index::create(MemoryStore::new(), IndexConfig::default()).unwrap();
    b.insert("x", 1, 4).unwrap();
    let (a, b) = (a.finalize().unwrap(), b.finalize().unwrap());

    let cfg = IndexConfig { strict_merge: false, ..Default::default() };
    let merged = Index::merge(MemoryStore::new(), cfg, &[&a, &b]).unwrap();
    assert_eq!(merged.postings("x").unwrap().get(1).unwrap().offsets, vec![0, 4]);
}

#[test]
fn all_terms_eliminated() {
    let mut idx = Index::create(MemoryStore::new(), IndexConfig { elimination_threshold: 0.5, ..Default::default() })
        .unwrap();
    insert_text(&mut idx, 1, "the a");
    insert_text(&mut idx, 2, "the a b");
    insert_text(&mut idx, 3, "a the");
    insert_text(&mut idx, 4, "the");

    // "a" (df 3) is the smallest eliminated list and comes back unfiltered.
    let r = idx.search(&Query::new(["the", "a"]), QueryType::Intersection, RankingType::TfIdf).unwrap();
    assert_eq!(ids(&r), vec![1, 2, 3]);

    let r = idx.search(&Query::new(["the", "a"]), QueryType::Phrase, RankingType::TfIdf).unwrap();
    assert!(r.is_empty());

    let r = idx.search(&Query::new(["the", "a"]), QueryType::Ranked, RankingType::TfIdf).unwrap();
    assert!(r.is_empty());
}

#[test]
fn eliminated_middle_term_keeps_its_slot() {
    let mut idx = Index::create(MemoryStore::new(), IndexConfig { elimination_threshold: 0.6, ..Default::default() })
        .unwrap();
    insert_text(&mut idx, 1, "cat the sat");
    insert_text(&mut idx, 2, "cat sat the");
    insert_text(&mut idx, 3, "the dog");
    insert_text(&mut idx, 4, "the end");

    let r = idx.search(&Query::new(["cat", "the", "sat"]), QueryType::Phrase, RankingType::TfIdf).unwrap();
    assert_eq!(ids(&r), vec![1]);
    assert_eq!(r.get(1).unwrap().offsets, vec![2]);
}

#[test]
fn eliminated_leading_term_is_skipped() {
    let mut idx = Index::create(MemoryStore::new(), IndexConfig { elimination_threshold: 0.6, ..Default::default() })
        .unwrap();
    insert_text(&mut idx, 1, "the cat sat");
    insert_text(&mut idx, 2, "cat the sat");
    insert_text(&mut idx, 3, "the dog");
    insert_text(&mut idx, 4, "the end");

    let r = idx.search(&Query::new(["the", "cat", "sat"]), QueryType::Phrase, RankingType::TfIdf).unwrap();
    assert_eq!(ids(&r), vec![1]);
}

#[test]
fn sled_index_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let mut idx = Index::create(SledStore::open(dir.path()).unwrap(), IndexConfig::default()).unwrap();
        insert_text(&mut idx, 1, "hello world");
        insert_text(&mut idx, 2, "hello there");
        insert_text(&mut idx, 3, "general kenobi");
        idx.set_importance_scores([(1, 0.5), (2, 0.25), (3, 0.25)].into_iter().collect());
        idx.finalize().unwrap();
    }

    let idx = Index::open(SledStore::open(dir.path()).unwrap(), IndexConfig::default()).unwrap();
    assert_eq!(idx.number_of_docs(), 3);
    assert_eq!(idx.dictionary().unwrap(), vec!["general", "hello", "kenobi", "there", "world"]);
    let r = idx.search(&Query::new(["hello"]), QueryType::Ranked, RankingType::Importance).unwrap();
    assert_eq!(ids(&r), vec![1, 2]);
}

#[test]
fn dropped_index_still_persists_metadata() {
    let dir = tempdir().unwrap();
    {
        let mut idx = Index::create(SledStore::open(dir.path()).unwrap(), IndexConfig::default()).unwrap();
        insert_text(&mut idx, 7, "late arrival");
    }
    let idx = Index::open(SledStore::open(dir.path()).unwrap(), IndexConfig::default()).unwrap();
    assert_eq!(idx.metadata().filename(7).unwrap(), "doc7.txt");
    assert_eq!(idx.postings("arrival").unwrap().len(), 1);
}

#[test]
fn concurrent_queries_share_an_index() {
    let mut idx = Index::create(MemoryStore::new(), IndexConfig::default()).unwrap();
    for doc_id in 0..20 {
        insert_text(&mut idx, doc_id, if doc_id % 2 == 0 { "even number" } else { "odd number" });
    }
    let idx = &idx;
    std::thread::scope(|s| {
        let handles: Vec<_> = ["even", "odd"]
            .into_iter()
            .map(|t| s.spawn(move || idx.search(&Query::new([t]), QueryType::Ranked, RankingType::TfIdf).unwrap().len()))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 10);
        }
    });
}

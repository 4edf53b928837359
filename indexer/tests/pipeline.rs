use indexer::{build_index, import_importance, merge_indexes, parse_query, search, BuildOptions};
use ir_core::tokenizer::TokenizerOptions;
use ir_core::{IndexConfig, Namespace, QueryType, RankingType, SledStore, Store};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_docs(dir: &Path, docs: &[(&str, &str)]) {
    fs::create_dir_all(dir).unwrap();
    for (name, text) in docs {
        fs::write(dir.join(name), text).unwrap();
    }
}

#[test]
fn build_merge_and_search() {
    let tmp = tempdir().unwrap();
    let (in_a, in_b) = (tmp.path().join("in_a"), tmp.path().join("in_b"));
    write_docs(&in_a, &[("a1.txt", "the quick brown fox"), ("a2.txt", "a lazy brown dog")]);
    write_docs(&in_b, &[("b1.txt", "quick brown foxes jump"), ("b2.txt", "nothing to see here")]);

    let (part_a, part_b, merged) = (tmp.path().join("part_a"), tmp.path().join("part_b"), tmp.path().join("merged"));
    let report_a = build_index(&in_a, &part_a, IndexConfig::default(), &BuildOptions::default()).unwrap();
    assert_eq!(report_a.num_docs, 2);
    let opts_b = BuildOptions { first_doc_id: report_a.next_doc_id, ..Default::default() };
    build_index(&in_b, &part_b, IndexConfig::default(), &opts_b).unwrap();

    let num_docs =
        merge_indexes(&[part_a.clone(), part_b.clone()], &merged, IndexConfig::default(), true).unwrap();
    assert_eq!(num_docs, 4);
    assert!(!part_a.exists() && !part_b.exists());

    let q = parse_query("quick brown fox", TokenizerOptions::default(), &[]);
    let (total, hits) = search(&merged, &q, QueryType::Phrase, RankingType::TfIdf, 10, IndexConfig::default()).unwrap();
    assert_eq!(total, 2);
    let names: Vec<String> = hits.iter().filter_map(|h| h.filename.clone()).collect();
    assert!(names.iter().any(|n| n.ends_with("a1.txt")));
    assert!(names.iter().any(|n| n.ends_with("b1.txt")));

    let scores = tmp.path().join("importance.json");
    fs::write(&scores, r#"{"0": 0.1, "1": 0.2, "2": 0.6, "3": 0.1}"#).unwrap();
    assert_eq!(import_importance(&merged, &scores, IndexConfig::default()).unwrap(), 4);
    let q = parse_query("brown", TokenizerOptions::default(), &[]);
    let (_, hits) = search(&merged, &q, QueryType::Ranked, RankingType::Importance, 1, IndexConfig::default()).unwrap();
    assert_eq!(hits[0].doc_id, 2);
}

#[test]
fn overlapping_partial_indexes_fail_to_merge() {
    let tmp = tempdir().unwrap();
    let input = tmp.path().join("in");
    write_docs(&input, &[("x.txt", "alpha beta")]);
    let (p1, p2) = (tmp.path().join("p1"), tmp.path().join("p2"));
    build_index(&input, &p1, IndexConfig::default(), &BuildOptions::default()).unwrap();
    build_index(&input, &p2, IndexConfig::default(), &BuildOptions::default()).unwrap();

    let out = tmp.path().join("out");
    let err = merge_indexes(&[p1.clone(), p2], &out, IndexConfig::default(), true).unwrap_err();
    assert!(format!("{err:#}").contains("merge conflict"));
    assert!(p1.exists());
    let store = SledStore::open(&out).unwrap();
    assert!(store.keys(Namespace::Meta).unwrap().is_empty());
}

#[test]
fn jsonl_documents_use_their_ids_as_names() {
    let tmp = tempdir().unwrap();
    let input = tmp.path().join("docs.jsonl");
    fs::write(&input, "{\"id\":\"first\",\"body\":\"red apple\"}\n\n{\"id\":\"second\",\"body\":\"green apple pie\"}\n").unwrap();
    let out = tmp.path().join("idx");
    build_index(&input, &out, IndexConfig::default(), &BuildOptions::default()).unwrap();

    let q = parse_query("green", TokenizerOptions::default(), &[("green".to_string(), 2.0)]);
    assert_eq!(q.weight("green"), 2.0);
    let (total, hits) = search(&out, &q, QueryType::Intersection, RankingType::TfIdf, 10, IndexConfig::default()).unwrap();
    assert_eq!(total, 1);
    assert_eq!(hits[0].filename.as_deref(), Some("second"));
}

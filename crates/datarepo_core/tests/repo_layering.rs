mod common;

use common::{components, dataset_file_name, repo_config, visit_id};
use datarepo_core::model::{DataId, DataValue, Dataset, KeyKind};
use datarepo_core::{Hits, Materializer, RepoError, RepoGraph};
use std::fs;
use std::path::Path;

const OBS: &str = "obs";

fn seed(root: &Path, visit: i64, payload: &[u8]) {
    let name = dataset_file_name(OBS, &visit_id(visit));
    fs::write(root.join(name), payload).unwrap();
}

#[test]
fn writes_fan_out_over_self_and_peers() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let dir_c = tempfile::tempdir().unwrap();

    let registry = components();
    let materializer = Materializer::new(&registry);
    let mut graph = RepoGraph::new();

    let mut writer = repo_config(dir_c.path());
    writer.peers = vec![repo_config(dir_a.path()), repo_config(dir_b.path())];
    let handle = materializer.materialize(&mut graph, writer).unwrap();

    let data_id = visit_id(7);
    let locations = graph
        .map(handle, OBS, &data_id, true)
        .unwrap()
        .expect("write mapping always yields locations")
        .into_vec();
    assert_eq!(locations.len(), 3);

    for location in &locations {
        graph.write(location, &Dataset::Blob(b"pixels".to_vec())).unwrap();
    }

    let relative = dataset_file_name(OBS, &data_id);
    for root in [dir_c.path(), dir_a.path(), dir_b.path()] {
        let copy = fs::read(root.join(&relative)).unwrap();
        assert_eq!(copy, b"pixels");
    }
}

#[test]
fn left_join_returns_the_first_matching_parent() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let reader_dir = tempfile::tempdir().unwrap();
    seed(dir_a.path(), 7, b"from-a");
    seed(dir_b.path(), 7, b"from-b");

    let registry = components();
    let materializer = Materializer::new(&registry);
    let mut graph = RepoGraph::new();

    let mut reader = repo_config(reader_dir.path());
    reader.parents = vec![repo_config(dir_a.path()), repo_config(dir_b.path())];
    let handle = materializer.materialize(&mut graph, reader).unwrap();

    let location = graph.map_single(handle, OBS, &visit_id(7)).unwrap();
    let datasets = graph.read(&location).unwrap();
    assert_eq!(datasets, vec![Dataset::Blob(b"from-a".to_vec())]);
}

#[test]
fn left_join_falls_through_a_missing_parent() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let reader_dir = tempfile::tempdir().unwrap();
    seed(dir_b.path(), 7, b"from-b");

    let registry = components();
    let materializer = Materializer::new(&registry);
    let mut graph = RepoGraph::new();

    let mut reader = repo_config(reader_dir.path());
    reader.parents = vec![repo_config(dir_a.path()), repo_config(dir_b.path())];
    let handle = materializer.materialize(&mut graph, reader).unwrap();

    let location = graph.map_single(handle, OBS, &visit_id(7)).unwrap();
    let datasets = graph.read(&location).unwrap();
    assert_eq!(datasets, vec![Dataset::Blob(b"from-b".to_vec())]);
}

#[test]
fn grandparents_are_searched_depth_first() {
    let grand_dir = tempfile::tempdir().unwrap();
    let parent_dir = tempfile::tempdir().unwrap();
    let reader_dir = tempfile::tempdir().unwrap();
    seed(grand_dir.path(), 7, b"from-grand");

    let registry = components();
    let materializer = Materializer::new(&registry);
    let mut graph = RepoGraph::new();

    let mut parent = repo_config(parent_dir.path());
    parent.parents = vec![repo_config(grand_dir.path())];
    let mut reader = repo_config(reader_dir.path());
    reader.parents = vec![parent];
    let handle = materializer.materialize(&mut graph, reader).unwrap();

    let location = graph.map_single(handle, OBS, &visit_id(7)).unwrap();
    let datasets = graph.read(&location).unwrap();
    assert_eq!(datasets, vec![Dataset::Blob(b"from-grand".to_vec())]);
}

#[test]
fn outer_join_with_one_match_behaves_like_a_single_result() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let reader_dir = tempfile::tempdir().unwrap();
    seed(dir_b.path(), 7, b"from-b");

    let registry = components();
    let materializer = Materializer::new(&registry);
    let mut graph = RepoGraph::new();

    let mut reader = repo_config(reader_dir.path());
    reader.parents = vec![repo_config(dir_a.path()), repo_config(dir_b.path())];
    reader.parent_join = "outer".to_string();
    let handle = materializer.materialize(&mut graph, reader).unwrap();

    let location = graph.map_single(handle, OBS, &visit_id(7)).unwrap();
    let datasets = graph.read(&location).unwrap();
    assert_eq!(datasets, vec![Dataset::Blob(b"from-b".to_vec())]);
}

#[test]
fn outer_join_with_two_matches_reports_every_location() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let reader_dir = tempfile::tempdir().unwrap();
    seed(dir_a.path(), 7, b"from-a");
    seed(dir_b.path(), 7, b"from-b");

    let registry = components();
    let materializer = Materializer::new(&registry);
    let mut graph = RepoGraph::new();

    let mut reader = repo_config(reader_dir.path());
    reader.parents = vec![repo_config(dir_a.path()), repo_config(dir_b.path())];
    reader.parent_join = "outer".to_string();
    let handle = materializer.materialize(&mut graph, reader).unwrap();

    let error = graph.map_single(handle, OBS, &visit_id(7)).unwrap_err();
    let RepoError::MultipleResults(locations) = error else {
        panic!("expected a multiple-results error, got {error}");
    };
    assert_eq!(locations.len(), 2);

    // Declared parent order survives into the reported candidates.
    let payloads: Vec<Vec<Dataset>> = locations
        .iter()
        .map(|location| graph.read(location).unwrap())
        .collect();
    assert_eq!(
        payloads,
        vec![
            vec![Dataset::Blob(b"from-a".to_vec())],
            vec![Dataset::Blob(b"from-b".to_vec())],
        ]
    );
}

#[test]
fn read_miss_everywhere_is_not_found() {
    let dir_a = tempfile::tempdir().unwrap();
    let reader_dir = tempfile::tempdir().unwrap();

    let registry = components();
    let materializer = Materializer::new(&registry);
    let mut graph = RepoGraph::new();

    let mut reader = repo_config(reader_dir.path());
    reader.parents = vec![repo_config(dir_a.path())];
    let handle = materializer.materialize(&mut graph, reader).unwrap();

    let error = graph.map_single(handle, OBS, &visit_id(99)).unwrap_err();
    assert!(matches!(error, RepoError::NotFound(_)));
}

#[test]
fn metadata_queries_are_answered_by_the_first_matching_parent() {
    let dir_a = tempfile::tempdir().unwrap();
    let reader_dir = tempfile::tempdir().unwrap();
    seed(dir_a.path(), 1, b"one");
    seed(dir_a.path(), 2, b"two");

    let registry = components();
    let materializer = Materializer::new(&registry);
    let mut graph = RepoGraph::new();

    let mut reader = repo_config(reader_dir.path());
    reader.parents = vec![repo_config(dir_a.path())];
    let handle = materializer.materialize(&mut graph, reader).unwrap();

    let hits = graph
        .query_metadata(handle, OBS, &["visit".to_string()], &DataId::new())
        .unwrap()
        .expect("parent should answer the metadata query");
    let Hits::One(found) = hits else {
        panic!("expected a single parent answer");
    };
    assert_eq!(found.len(), 2);
    assert!(found.contains(&vec![DataValue::Int(1)]));
    assert!(found.contains(&vec![DataValue::Int(2)]));

    // A constrained query narrows the answer.
    let hits = graph
        .query_metadata(handle, OBS, &["visit".to_string()], &visit_id(2))
        .unwrap()
        .expect("constrained query should still match");
    let Hits::One(found) = hits else {
        panic!("expected a single parent answer");
    };
    assert_eq!(found.len(), 1);
    assert!(found.contains(&vec![DataValue::Int(2)]));
}

#[test]
fn key_and_level_queries_fall_back_to_parents() {
    let dir_a = tempfile::tempdir().unwrap();
    let reader_dir = tempfile::tempdir().unwrap();

    let registry = components();
    let materializer = Materializer::new(&registry);
    let mut graph = RepoGraph::new();

    let mut reader = repo_config(reader_dir.path());
    reader.parents = vec![repo_config(dir_a.path())];
    let handle = materializer.materialize(&mut graph, reader).unwrap();

    let hits = graph
        .get_keys(handle, OBS, None)
        .unwrap()
        .expect("parent mapper should report its keys");
    let Hits::One(keys) = hits else {
        panic!("expected a single parent answer");
    };
    assert_eq!(keys.get("visit"), Some(&KeyKind::Int));

    let hits = graph
        .default_level(handle)
        .unwrap()
        .expect("parent mapper should report a level");
    assert_eq!(hits, Hits::One("visit".to_string()));
}

#[test]
fn backup_preserves_the_dataset_on_self_and_peers() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_c = tempfile::tempdir().unwrap();
    seed(dir_c.path(), 7, b"mine");
    seed(dir_a.path(), 7, b"peer-copy");

    let registry = components();
    let materializer = Materializer::new(&registry);
    let mut graph = RepoGraph::new();

    let mut writer = repo_config(dir_c.path());
    writer.peers = vec![repo_config(dir_a.path())];
    let handle = materializer.materialize(&mut graph, writer).unwrap();

    graph.backup(handle, OBS, &visit_id(7)).unwrap();

    let backup_name = format!("{}~1", dataset_file_name(OBS, &visit_id(7)));
    assert_eq!(fs::read(dir_c.path().join(&backup_name)).unwrap(), b"mine");
    assert_eq!(
        fs::read(dir_a.path().join(&backup_name)).unwrap(),
        b"peer-copy"
    );
}

#[test]
fn layered_write_then_read_through_a_fresh_graph() {
    let shared_dir = tempfile::tempdir().unwrap();
    let writer_dir = tempfile::tempdir().unwrap();
    let reader_dir = tempfile::tempdir().unwrap();

    let registry = components();
    let materializer = Materializer::new(&registry);

    // Writer fans out to the shared repository.
    let mut write_graph = RepoGraph::new();
    let mut writer = repo_config(writer_dir.path());
    writer.peers = vec![repo_config(shared_dir.path())];
    let writer_handle = materializer.materialize(&mut write_graph, writer).unwrap();

    let data_id = visit_id(11);
    let locations = write_graph
        .map(writer_handle, OBS, &data_id, true)
        .unwrap()
        .expect("write mapping always yields locations")
        .into_vec();
    for location in &locations {
        write_graph
            .write(location, &Dataset::Blob(b"shared".to_vec()))
            .unwrap();
    }

    // A fresh reader graph layered on the shared repository sees the write.
    let mut read_graph = RepoGraph::new();
    let mut reader = repo_config(reader_dir.path());
    reader.parents = vec![repo_config(shared_dir.path())];
    let reader_handle = materializer.materialize(&mut read_graph, reader).unwrap();

    let location = read_graph.map_single(reader_handle, OBS, &data_id).unwrap();
    let datasets = read_graph.read(&location).unwrap();
    assert_eq!(datasets, vec![Dataset::Blob(b"shared".to_vec())]);
}

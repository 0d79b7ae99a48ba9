use shelf_core::distance::cosine_distances;
use shelf_core::{CacheKey, CacheSource, DistanceCache, RecError, TopicMatrix};
use std::fs;
use tempfile::{tempdir, NamedTempFile};

fn topics() -> TopicMatrix {
    TopicMatrix::from_weights(
        vec![
            vec![(0, 0.6), (2, 0.4)],
            vec![(1, 1.0)],
            vec![(0, 0.3), (1, 0.3), (2, 0.4)],
            vec![(2, 0.95)],
        ],
        3,
    )
    .unwrap()
}

#[test]
fn loaded_matrix_equals_computed() {
    let dir = tempdir().unwrap();
    let cache = DistanceCache::new(dir.path());
    let key = CacheKey::new("lda_3_topics-abc");
    let built = cache.get_or_build(&topics(), &key);
    let loaded = cache.load(&key, 4).unwrap().unwrap();
    assert_eq!(*built.matrix, loaded);
    assert_eq!(loaded, cosine_distances(&topics()));
}

#[test]
fn rebuilding_is_idempotent() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let key = CacheKey::new("same");
    let first = DistanceCache::new(a.path()).get_or_build(&topics(), &key);
    let second = DistanceCache::new(b.path()).get_or_build(&topics(), &key);
    assert_eq!(first.source, CacheSource::Computed);
    assert_eq!(second.source, CacheSource::Computed);
    assert_eq!(*first.matrix, *second.matrix);
}

#[test]
fn corrupt_artifact_falls_back_to_recompute() {
    let dir = tempdir().unwrap();
    let cache = DistanceCache::new(dir.path());
    let key = CacheKey::new("k");
    fs::write(cache.artifact_path(&key), b"definitely not bincode").unwrap();

    assert!(matches!(cache.load(&key, 4), Err(RecError::CacheCorrupt(_))));
    let outcome = cache.get_or_build(&topics(), &key);
    assert_eq!(outcome.source, CacheSource::Computed);
    assert_eq!(*outcome.matrix, cosine_distances(&topics()));
    // the bad artifact was replaced
    assert_eq!(cache.get_or_build(&topics(), &key).source, CacheSource::Hit);
}

#[test]
fn artifact_under_wrong_key_is_a_miss() {
    let dir = tempdir().unwrap();
    let cache = DistanceCache::new(dir.path());
    let old = CacheKey::new("old");
    let new = CacheKey::new("new");
    cache.get_or_build(&topics(), &old);
    fs::copy(cache.artifact_path(&old), cache.artifact_path(&new)).unwrap();

    assert!(matches!(cache.load(&new, 4), Err(RecError::CacheCorrupt(_))));
    assert_eq!(cache.get_or_build(&topics(), &new).source, CacheSource::Computed);
}

#[test]
fn unwritable_cache_still_returns_matrix() {
    // a regular file where the cache directory should be
    let blocker = NamedTempFile::new().unwrap();
    let cache = DistanceCache::new(blocker.path().join("cache"));
    let outcome = cache.get_or_build(&topics(), &CacheKey::new("k"));
    assert_eq!(outcome.source, CacheSource::Computed);
    assert!(outcome.store_error.is_some());
    assert_eq!(outcome.matrix.rows(), 4);
}

#[test]
fn distances_are_symmetric_with_zero_diagonal() {
    let d = cosine_distances(&topics());
    for i in 0..d.rows() {
        assert!(d.get(i, i).unwrap().abs() < 1e-6);
        for j in 0..d.rows() {
            assert!((d.get(i, j).unwrap() - d.get(j, i).unwrap()).abs() < 1e-6);
        }
    }
    // disjoint supports are exactly one apart
    assert!((d.get(0, 1).unwrap() - 1.0).abs() < 1e-6);
}

#[test]
fn concurrent_builds_agree() {
    let dir = tempdir().unwrap();
    let cache = DistanceCache::new(dir.path());
    let key = CacheKey::new("shared");
    let t = topics();
    let outcomes: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4).map(|_| s.spawn(|| cache.get_or_build(&t, &key))).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    let computed = outcomes.iter().filter(|o| o.source == CacheSource::Computed).count();
    assert_eq!(computed, 1);
    assert!(outcomes.iter().all(|o| *o.matrix == *outcomes[0].matrix));
}

#[test]
fn keys_differing_only_in_path_characters_do_not_share_artifacts() {
    let dir = tempdir().unwrap();
    let cache = DistanceCache::new(dir.path());
    let a = TopicMatrix::from_weights(vec![vec![(0, 1.0)], vec![(1, 1.0)]], 2).unwrap();
    let b = TopicMatrix::from_weights(vec![vec![(0, 0.99), (1, 0.01)], vec![(0, 0.98), (1, 0.02)]], 2).unwrap();
    let ka = CacheKey::new("model/a");
    let kb = CacheKey::new("model a");
    assert_ne!(cache.artifact_path(&ka), cache.artifact_path(&kb));

    cache.get_or_build(&a, &ka);
    let outcome = cache.get_or_build(&b, &kb);
    assert_eq!(outcome.source, CacheSource::Computed);
    assert_eq!(*outcome.matrix, cosine_distances(&b));
    assert!(outcome.matrix.get(0, 1).unwrap() < 0.01);

    // each key still loads its own matrix
    assert_eq!(cache.load(&ka, 2).unwrap().unwrap(), cosine_distances(&a));
    assert_eq!(cache.load(&kb, 2).unwrap().unwrap(), cosine_distances(&b));
}

#[test]
fn artifact_embeds_the_exact_key() {
    let dir = tempdir().unwrap();
    let cache = DistanceCache::new(dir.path());
    let stored = CacheKey::new("lda 30/topics");
    cache.get_or_build(&topics(), &stored);
    // another key pointed at the same bytes is refused
    let other = CacheKey::new("lda_30_topics");
    fs::copy(cache.artifact_path(&stored), cache.artifact_path(&other)).unwrap();
    assert!(matches!(cache.load(&other, 4), Err(RecError::CacheCorrupt(_))));
}

#[test]
fn separate_cache_instances_on_one_root_leave_a_valid_artifact() {
    let dir = tempdir().unwrap();
    let key = CacheKey::new("shared");
    let t = topics();
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                let cache = DistanceCache::new(dir.path());
                for _ in 0..5 {
                    cache.store(&key, &cosine_distances(&t)).unwrap();
                }
            });
        }
    });
    let cache = DistanceCache::new(dir.path());
    assert_eq!(cache.load(&key, 4).unwrap().unwrap(), cosine_distances(&t));
    let entries = fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 1);
}

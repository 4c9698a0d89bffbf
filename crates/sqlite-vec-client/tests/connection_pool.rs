use std::sync::Arc;
use std::thread;

use sqlite_vec_client::{ConnectionPool, DistanceMetric, VecClient, VecClientError};

fn pool(dir: &tempfile::TempDir, size: usize) -> Arc<ConnectionPool> {
    Arc::new(ConnectionPool::open(dir.path().join("pool.db"), size).unwrap())
}

#[test]
fn test_pool_refuses_threads_beyond_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let pool = pool(&dir, 3);

    for _ in 0..3 {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.get_connection().map(|_| ()))
            .join()
            .unwrap()
            .unwrap();
    }
    assert_eq!(pool.size(), 3);

    let extra = Arc::clone(&pool);
    let err = thread::spawn(move || extra.get_connection().map(|_| ()))
        .join()
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, VecClientError::PoolExhausted { max: 3 }));
}

#[test]
fn test_same_thread_reuses_its_connection() {
    let dir = tempfile::tempdir().unwrap();
    let pool = pool(&dir, 1);
    let first = pool.get_connection().unwrap();
    let second = pool.get_connection().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    pool.return_connection(&first);
    assert_eq!(pool.size(), 1);
}

#[test]
fn test_close_all_frees_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let pool = pool(&dir, 1);
    drop(pool.get_connection().unwrap());
    pool.close_all();
    assert_eq!(pool.size(), 0);

    let other = Arc::clone(&pool);
    thread::spawn(move || other.get_connection().map(|_| ()))
        .join()
        .unwrap()
        .unwrap();
}

#[test]
fn test_zero_sized_pool_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConnectionPool::open(dir.path().join("pool.db"), 0).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_pooled_clients_write_from_several_threads() {
    let dir = tempfile::tempdir().unwrap();
    let pool = pool(&dir, 4);

    let setup = VecClient::with_pool("docs", Arc::clone(&pool)).unwrap();
    setup.create_table(3, DistanceMetric::Cosine).unwrap();
    setup.close();

    let workers: Vec<_> = (0..3)
        .map(|worker| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let client = VecClient::with_pool("docs", pool).unwrap();
                let texts: Vec<String> = (0..20).map(|i| format!("w{worker}-{i}")).collect();
                let vectors: Vec<Vec<f32>> = (0..20)
                    .map(|i| vec![worker as f32 + 1.0, i as f32, 1.0])
                    .collect();
                let ids = client.add(&texts, &vectors, None).unwrap();
                client.close();
                ids
            })
        })
        .collect();

    let mut all_ids: Vec<i64> = workers
        .into_iter()
        .flat_map(|w| w.join().unwrap())
        .collect();
    all_ids.sort_unstable();
    all_ids.dedup();
    assert_eq!(all_ids.len(), 60);

    let reader = VecClient::with_pool("docs", Arc::clone(&pool)).unwrap();
    assert_eq!(reader.count().unwrap(), 60);
    assert_eq!(reader.similarity_search(&[1.0, 0.0, 1.0], 5).unwrap().len(), 5);
    assert_eq!(pool.size(), 4);
}

#[test]
fn test_pooled_client_on_same_thread_shares_connection_state() {
    let dir = tempfile::tempdir().unwrap();
    let pool = pool(&dir, 1);
    let writer = VecClient::with_pool("docs", Arc::clone(&pool)).unwrap();
    writer.create_table(2, DistanceMetric::L1).unwrap();
    writer.add(&["a"], &[vec![1.0, 2.0]], None).unwrap();

    let reader = VecClient::with_pool("docs", Arc::clone(&pool)).unwrap();
    assert_eq!(reader.count().unwrap(), 1);
    assert_eq!(reader.dimension().unwrap(), Some(2));
    assert_eq!(pool.size(), 1);
}

#[test]
fn test_close_all_closes_connections_held_by_live_clients() {
    let dir = tempfile::tempdir().unwrap();
    let pool = pool(&dir, 1);
    let client = VecClient::with_pool("docs", Arc::clone(&pool)).unwrap();
    client.create_table(2, DistanceMetric::Cosine).unwrap();

    pool.close_all();
    assert_eq!(pool.size(), 0);
    assert!(matches!(
        client.count().unwrap_err(),
        VecClientError::Connection(_)
    ));

    let other = Arc::clone(&pool);
    thread::spawn(move || {
        let client = VecClient::with_pool("docs", other).unwrap();
        client.count().unwrap()
    })
    .join()
    .unwrap();
    assert_eq!(pool.size(), 1);

    let extra = Arc::clone(&pool);
    let err = thread::spawn(move || extra.get_connection().map(|_| ()))
        .join()
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, VecClientError::PoolExhausted { max: 1 }));
}

#[test]
fn test_clients_sharing_a_connection_share_its_transaction() {
    let dir = tempfile::tempdir().unwrap();
    let pool = pool(&dir, 1);
    let a = VecClient::with_pool("docs", Arc::clone(&pool)).unwrap();
    let b = VecClient::with_pool("docs", Arc::clone(&pool)).unwrap();
    a.create_table(2, DistanceMetric::L2).unwrap();

    let result: sqlite_vec_client::Result<()> = a.transaction(|a| {
        a.add(&["from a"], &[vec![1.0, 0.0]], None)?;
        b.add(&["from b"], &[vec![0.0, 1.0]], None)?;
        assert!(matches!(
            b.transaction(|_| Ok(())),
            Err(VecClientError::Transaction(_))
        ));
        Err(VecClientError::Validation("abort".into()))
    });
    assert!(matches!(result, Err(VecClientError::Validation(_))));
    assert_eq!(b.count().unwrap(), 0);

    a.transaction(|a| {
        a.add(&["from a"], &[vec![1.0, 0.0]], None)?;
        b.add(&["from b"], &[vec![0.0, 1.0]], None)?;
        Ok(())
    })
    .unwrap();
    assert_eq!(a.count().unwrap(), 2);
}

use migration::MigratorTrait;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::{cdn, db, deliveryservice_server, ds_type, server, split_list, tenant, topology, topology_cachegroup};

#[tokio::test]
async fn reference_tables_round_trip() {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return; }
    let db = match db::connect().await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("skip: cannot connect to db: {}", e);
            return;
        }
    };
    if let Err(e) = migration::Migrator::up(&db, None).await {
        eprintln!("skip: migrate up failed: {}", e);
        return;
    }
    let tag = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();

    let root = tenant::create(&db, &format!("root-{tag}"), true, None).await.expect("create root tenant");
    let child = tenant::create(&db, &format!("child-{tag}"), false, Some(root.id)).await.expect("create child tenant");
    assert_eq!(child.parent_id, Some(root.id));

    let c = cdn::create(&db, &format!("cdn-{tag}"), "example.net").await.expect("create cdn");
    let ty = ds_type::create(&db, "EDGE", ds_type::USE_IN_SERVER).await.expect("create type");
    assert_eq!(ty.use_in_table, ds_type::USE_IN_SERVER);

    let top_name = format!("top-{tag}");
    topology::create(&db, &top_name, "edge only", &["cg-a", "cg-b"]).await.expect("create topology");
    let members = topology_cachegroup::Entity::find()
        .filter(topology_cachegroup::Column::Topology.eq(top_name.clone()))
        .all(&db)
        .await
        .expect("list cache groups");
    assert_eq!(members.len(), 2);
    assert!(topology::create(&db, "", "x", &["cg-a"]).await.is_err());

    let caps = vec!["bar".to_string(), "baz".to_string()];
    let s = server::create(&db, &format!("edge-{tag}"), c.id, "cg-a", "EDGE", &caps).await.expect("create server");
    assert_eq!(split_list(&s.capabilities), caps);

    // assignment needs a delivery service row; without one the FK rejects it
    assert!(deliveryservice_server::assign(&db, i32::MAX, s.id).await.is_err());
}

use sea_orm::{entity::prelude::*, Set, DatabaseConnection, TransactionTrait};
use chrono::{SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::{errors, topology_cachegroup};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "topology")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    pub description: String,
    pub last_updated: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Insert a topology together with its cache group membership.
pub async fn create(db: &DatabaseConnection, name: &str, description: &str, cache_groups: &[&str]) -> Result<Model, errors::ModelError> {
    if name.trim().is_empty() { return Err(errors::ModelError::Validation("name required".into())); }
    if cache_groups.is_empty() {
        return Err(errors::ModelError::Validation("a topology needs at least one cache group".into()));
    }
    let txn = db.begin().await?;
    let am = ActiveModel {
        name: Set(name.to_string()),
        description: Set(description.to_string()),
        last_updated: Set(Utc::now().trunc_subsecs(6).into()),
    };
    let created = am.insert(&txn).await?;
    for cg in cache_groups {
        topology_cachegroup::ActiveModel {
            topology: Set(name.to_string()),
            cachegroup: Set((*cg).to_owned()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }
    txn.commit().await?;
    Ok(created)
}

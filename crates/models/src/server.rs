use sea_orm::{entity::prelude::*, Set, DatabaseConnection};
use serde::{Deserialize, Serialize};

use crate::errors;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "server")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub host_name: String,
    pub cdn_id: i32,
    pub cachegroup: String,
    /// Server type name, e.g. `EDGE`, `MID`, `ORG`.
    pub type_name: String,
    /// Comma separated server capability names.
    pub capabilities: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub async fn create(
    db: &DatabaseConnection,
    host_name: &str,
    cdn_id: i32,
    cachegroup: &str,
    type_name: &str,
    capabilities: &[String],
) -> Result<Model, errors::ModelError> {
    if host_name.trim().is_empty() { return Err(errors::ModelError::Validation("host_name required".into())); }
    let am = ActiveModel {
        host_name: Set(host_name.to_string()),
        cdn_id: Set(cdn_id),
        cachegroup: Set(cachegroup.to_string()),
        type_name: Set(type_name.to_ascii_uppercase()),
        capabilities: Set(crate::join_list(capabilities)),
        ..Default::default()
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

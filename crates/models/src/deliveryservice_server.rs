use sea_orm::{entity::prelude::*, Set, DatabaseConnection};
use chrono::{SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::errors;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deliveryservice_server")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub deliveryservice: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub server: i32,
    pub last_updated: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub async fn assign(db: &DatabaseConnection, deliveryservice: i32, server: i32) -> Result<Model, errors::ModelError> {
    let am = ActiveModel {
        deliveryservice: Set(deliveryservice),
        server: Set(server),
        last_updated: Set(Utc::now().trunc_subsecs(6).into()),
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

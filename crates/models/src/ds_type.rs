//! The `type` table: names used for both delivery services and servers,
//! discriminated by `use_in_table`.
use sea_orm::{entity::prelude::*, Set, DatabaseConnection};
use serde::{Deserialize, Serialize};

use crate::errors;

pub const USE_IN_DELIVERYSERVICE: &str = "deliveryservice";
pub const USE_IN_SERVER: &str = "server";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "type")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub use_in_table: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub async fn create(db: &DatabaseConnection, name: &str, use_in_table: &str) -> Result<Model, errors::ModelError> {
    if ![USE_IN_DELIVERYSERVICE, USE_IN_SERVER].contains(&use_in_table) {
        return Err(errors::ModelError::Validation(format!("unsupported use_in_table '{use_in_table}'")));
    }
    let am = ActiveModel {
        name: Set(name.to_string()),
        use_in_table: Set(use_in_table.to_string()),
        ..Default::default()
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

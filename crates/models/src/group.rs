use chrono::Utc;
use sea_orm::{entity::prelude::*, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors;
use crate::group_user;

pub const GROUPNAME_MAX_LEN: usize = 64;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub groupname: String,
    pub description: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Members,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Members => Entity::has_many(group_user::Entity).into(),
        }
    }
}

impl Related<group_user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_groupname(name: &str) -> Result<(), errors::ModelError> {
    if name.trim().is_empty() {
        return Err(errors::ModelError::Validation("groupname required".into()));
    }
    if name.chars().count() > GROUPNAME_MAX_LEN {
        return Err(errors::ModelError::Validation(format!(
            "groupname must be at most {GROUPNAME_MAX_LEN} characters"
        )));
    }
    Ok(())
}

pub fn new_group(groupname: &str, description: Option<String>) -> ActiveModel {
    ActiveModel {
        id: Set(Uuid::new_v4()),
        groupname: Set(groupname.to_string()),
        description: Set(description),
        created_at: Set(Utc::now().into()),
    }
}

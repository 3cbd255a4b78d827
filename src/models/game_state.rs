use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Single-row table (id = 1) holding the currently active word.
/// Rotation is a single UPDATE of this row, so a reader can never
/// observe "no active word" in the middle of a rotation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "game_state")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub current_word_id: Option<i32>,
    pub activated_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::word::Entity",
        from = "Column::CurrentWordId",
        to = "super::word::Column::Id"
    )]
    Word,
}

impl Related<super::word::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Word.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

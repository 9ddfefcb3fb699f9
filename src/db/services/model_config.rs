use diesel::prelude::*;
use diesel::result::Error;
use diesel_async::RunQueryDsl;

use crate::db::{
    models::{ChatModelConfig, NewChatModelConfig, UpdateChatModelConfig},
    schema::chat_model_configs,
    DbConnection,
};

pub struct ModelConfigDbService<'a> {
    pub db: &'a mut DbConnection,
}

impl<'a> ModelConfigDbService<'a> {
    pub fn new(db: &'a mut DbConnection) -> Self {
        ModelConfigDbService { db }
    }

    pub async fn list_enabled(&mut self) -> Result<Vec<ChatModelConfig>, Error> {
        chat_model_configs::table
            .filter(chat_model_configs::enabled.eq(true))
            .select(ChatModelConfig::as_select())
            .order_by(chat_model_configs::id.asc())
            .load(self.db)
            .await
    }

    pub async fn find_enabled_by_name(
        &mut self,
        model_name: &str,
    ) -> Result<Option<ChatModelConfig>, Error> {
        chat_model_configs::table
            .filter(chat_model_configs::model_name.eq(model_name))
            .filter(chat_model_configs::enabled.eq(true))
            .select(ChatModelConfig::as_select())
            .first(self.db)
            .await
            .optional()
    }

    pub async fn create(&mut self, config: NewChatModelConfig<'_>) -> Result<ChatModelConfig, Error> {
        diesel::insert_into(chat_model_configs::table)
            .values(config)
            .returning(ChatModelConfig::as_returning())
            .get_result(self.db)
            .await
    }

    pub async fn update(
        &mut self,
        id: i32,
        data: UpdateChatModelConfig<'_>,
    ) -> Result<ChatModelConfig, Error> {
        diesel::update(chat_model_configs::table.find(id))
            .set(data)
            .returning(ChatModelConfig::as_returning())
            .get_result(self.db)
            .await
    }

    pub async fn delete(&mut self, id: i32) -> Result<i32, Error> {
        diesel::delete(chat_model_configs::table.find(id))
            .returning(chat_model_configs::id)
            .get_result(self.db)
            .await
    }
}

use async_trait::async_trait;
use diesel::prelude::*;

use mc_core::ports::{TokenStoreError, TokenStorePort};
use mc_core::{Token, TokenNamespace};

use crate::db::models::NewTokenRow;
use crate::db::ports::{DbExecutor, InsertMapper};
use crate::db::schema::tokens;

pub struct DieselTokenStore<E, M> {
    executor: E,
    mapper: M,
}

impl<E, M> DieselTokenStore<E, M> {
    pub fn new(executor: E, mapper: M) -> Self {
        Self { executor, mapper }
    }
}

#[async_trait]
impl<E, M> TokenStorePort for DieselTokenStore<E, M>
where
    E: DbExecutor,
    M: InsertMapper<Token, NewTokenRow> + Send + Sync,
{
    async fn save(&self, token: &Token) -> Result<(), TokenStoreError> {
        let row = self
            .mapper
            .to_row(token)
            .map_err(|e| TokenStoreError::Storage(e.to_string()))?;

        self.executor
            .run(move |conn| {
                diesel::insert_into(tokens::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(|e| TokenStoreError::Storage(e.to_string()))?;
                Ok(())
            })
            .map_err(|e| TokenStoreError::Storage(e.to_string()))
    }

    async fn lookup(
        &self,
        namespace: TokenNamespace,
        foreign_id: u32,
    ) -> Result<Option<String>, TokenStoreError> {
        let code = namespace.code();
        let foreign = i64::from(foreign_id);
        self.executor
            .run(move |conn| {
                tokens::table
                    .filter(tokens::namespace.eq(code))
                    .filter(tokens::foreign_id.eq(foreign))
                    .order(tokens::id.asc())
                    .select(tokens::token)
                    .first::<String>(conn)
                    .optional()
                    .map_err(|e| anyhow::anyhow!(e.to_string()))
            })
            .map_err(|e| TokenStoreError::Storage(e.to_string()))
    }

    async fn exists(&self, namespace: TokenNamespace, value: &str) -> Result<bool, TokenStoreError> {
        let code = namespace.code();
        let value = value.to_string();
        self.executor
            .run(move |conn| {
                diesel::select(diesel::dsl::exists(
                    tokens::table
                        .filter(tokens::namespace.eq(code))
                        .filter(tokens::token.eq(&value)),
                ))
                .get_result::<bool>(conn)
                .map_err(|e| anyhow::anyhow!(e.to_string()))
            })
            .map_err(|e| TokenStoreError::Storage(e.to_string()))
    }

    async fn delete(
        &self,
        namespace: TokenNamespace,
        foreign_id: u32,
    ) -> Result<usize, TokenStoreError> {
        let code = namespace.code();
        let foreign = i64::from(foreign_id);
        self.executor
            .run(move |conn| {
                diesel::delete(
                    tokens::table
                        .filter(tokens::namespace.eq(code))
                        .filter(tokens::foreign_id.eq(foreign)),
                )
                .execute(conn)
                .map_err(|e| anyhow::anyhow!(e.to_string()))
            })
            .map_err(|e| TokenStoreError::Storage(e.to_string()))
    }
}

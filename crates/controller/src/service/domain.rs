pub mod onelink;
pub mod page;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Serialize, Deserialize)]
pub struct Response<T>
where
    T: Serialize,
{
    data: T,
    pagination: Pagination,
}

#[derive(Serialize, Deserialize)]
pub struct Pagination {
    /// Only Some when queried with pagination params
    pub offset: Option<i64>,
    /// Only Some when queried with pagination params
    pub limit: Option<i64>,
    pub total_len: i64,
}

#[derive(Serialize, Deserialize, Default, Debug, FromRow)]
pub struct Count {
    pub count: i64,
}

impl<T> Response<T>
where
    T: Serialize,
{
    pub fn new(total_len: i64, data: T, offset: Option<i64>, limit: Option<i64>) -> Self {
        Response {
            data,
            pagination: Pagination {
                offset,
                limit,
                total_len,
            },
        }
    }
}

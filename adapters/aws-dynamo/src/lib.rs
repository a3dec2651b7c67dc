//! DynamoDB adapter implementing the `MovieRepository` port.
//!
//! - Stores movies in a single table with string partition key `id`.
//! - Ids are generated client-side (object-id layout) and protected by a
//!   conditional put so an existing item is never overwritten on create.
//! - The table name is supplied by the caller (`DYNAMO_TABLE_MOVIES` in the server).
//!
//! Notes:
//! - `find` is a filtered `Scan`. DynamoDB pages scan results, so the adapter
//!   follows `LastEvaluatedKey` until the table is exhausted.
//! - `year` is a reserved word in DynamoDB expressions; every attribute is
//!   referenced through expression attribute names.

use std::collections::HashMap;
use std::sync::Arc;

use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use domain::objectid::ObjectIdGenerator;
use domain::{CoreError, IdGenerator, Movie, MovieFilter, MovieId, MovieRepository, NewMovie};
use tracing::debug;

const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailedException";

/// Configuration for DynamoDB table names.
#[derive(Clone, Debug)]
pub struct DynamoTables {
    pub movies: String,
}

impl DynamoTables {
    /// Create with an explicit table name.
    pub fn new(movies: impl Into<String>) -> Self {
        Self {
            movies: movies.into(),
        }
    }
}

/// Repository backed by AWS DynamoDB.
#[derive(Clone)]
pub struct DynamoRepo {
    table_movies: String,
    client: Client,
    ids: Arc<ObjectIdGenerator>,
}

impl DynamoRepo {
    fn with_client(tables: DynamoTables, client: Client) -> Self {
        Self {
            table_movies: tables.movies,
            client,
            ids: Arc::new(ObjectIdGenerator::new()),
        }
    }

    /// Construct with table names and a default AWS SDK client. Region,
    /// credentials and `AWS_ENDPOINT_URL` come from the standard AWS variables.
    pub async fn new(tables: DynamoTables) -> Self {
        let conf = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        Self::with_client(tables, Client::new(&conf))
    }
}

impl MovieRepository for DynamoRepo {
    async fn create(&self, movie: NewMovie) -> Result<Movie, CoreError> {
        let stored = Movie::from_new(self.ids.next_id(), movie);
        self.client
            .put_item()
            .table_name(&self.table_movies)
            .set_item(Some(movie_to_item(&stored)))
            .condition_expression("attribute_not_exists(#id)")
            .expression_attribute_names("#id", "id")
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(se) if se.code() == Some(CONDITIONAL_CHECK_FAILED) => {
                    CoreError::Repository(format!("duplicate id {}", stored.id))
                }
                _ => map_sdk_err(e),
            })?;
        debug!(id = %stored.id, "dynamo put");
        Ok(stored)
    }

    async fn get(&self, id: &MovieId) -> Result<Option<Movie>, CoreError> {
        let out = self
            .client
            .get_item()
            .table_name(&self.table_movies)
            .key("id", AttributeValue::S(id.as_str().to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(map_sdk_err)?;
        match out.item() {
            Some(item) => Ok(Some(item_to_movie(item)?)),
            None => Ok(None),
        }
    }

    async fn find(&self, filter: &MovieFilter) -> Result<Vec<Movie>, CoreError> {
        let expr = filter_expression(filter);
        let mut out = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;
        loop {
            let mut req = self
                .client
                .scan()
                .table_name(&self.table_movies)
                .consistent_read(true)
                .set_exclusive_start_key(start_key.take());
            if let Some(ref e) = expr {
                req = req
                    .filter_expression(&e.expression)
                    .set_expression_attribute_names(Some(e.names.clone()))
                    .set_expression_attribute_values(Some(e.values.clone()));
            }
            let page = req.send().await.map_err(map_sdk_err)?;
            for item in page.items() {
                out.push(item_to_movie(item)?);
            }
            match page.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }
        Ok(out)
    }

    async fn replace(&self, id: &MovieId, movie: NewMovie) -> Result<u64, CoreError> {
        let replacement = Movie::from_new(id.clone(), movie);
        let res = self
            .client
            .put_item()
            .table_name(&self.table_movies)
            .set_item(Some(movie_to_item(&replacement)))
            .condition_expression("attribute_exists(#id)")
            .expression_attribute_names("#id", "id")
            .send()
            .await;
        match res {
            Ok(_) => Ok(1),
            Err(e) => match e.as_service_error() {
                Some(se) if se.code() == Some(CONDITIONAL_CHECK_FAILED) => Ok(0),
                _ => Err(map_sdk_err(e)),
            },
        }
    }

    async fn delete(&self, id: &MovieId) -> Result<u64, CoreError> {
        let out = self
            .client
            .delete_item()
            .table_name(&self.table_movies)
            .key("id", AttributeValue::S(id.as_str().to_string()))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(map_sdk_err)?;
        Ok(match out.attributes() {
            Some(old) if !old.is_empty() => 1,
            _ => 0,
        })
    }
}

fn map_sdk_err<E: ProvideErrorMetadata + std::fmt::Display>(e: E) -> CoreError {
    if let Some(code) = e.code() {
        if code == "ResourceNotFoundException" {
            return CoreError::Repository("missing table".into());
        }
    }
    CoreError::Repository(format!("dynamo error: {e}"))
}

/// Scan filter pieces for a `MovieFilter`; `None` when nothing is constrained.
#[derive(Debug, PartialEq)]
struct FilterExpr {
    expression: String,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

fn filter_expression(filter: &MovieFilter) -> Option<FilterExpr> {
    let mut parts = Vec::new();
    let mut names = HashMap::new();
    let mut values = HashMap::new();

    let mut add = |attr: &str, value: AttributeValue| {
        parts.push(format!("#{attr} = :{attr}"));
        names.insert(format!("#{attr}"), attr.to_string());
        values.insert(format!(":{attr}"), value);
    };
    if let Some(ref title) = filter.title {
        add("title", AttributeValue::S(title.clone()));
    }
    if let Some(year) = filter.year {
        add("year", AttributeValue::N(year.to_string()));
    }
    if let Some(ref language) = filter.language {
        add("language", AttributeValue::S(language.clone()));
    }

    if parts.is_empty() {
        return None;
    }
    Some(FilterExpr {
        expression: parts.join(" AND "),
        names,
        values,
    })
}

fn movie_to_item(movie: &Movie) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();
    item.insert("id".into(), AttributeValue::S(movie.id.as_str().to_string()));
    item.insert("title".into(), AttributeValue::S(movie.title.clone()));
    item.insert("year".into(), AttributeValue::N(movie.year.to_string()));
    item.insert("language".into(), AttributeValue::S(movie.language.clone()));
    item
}

fn item_to_movie(item: &HashMap<String, AttributeValue>) -> Result<Movie, CoreError> {
    let attr_s = |name: &str| {
        item.get(name)
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| CoreError::Repository(format!("item missing {name}")))
    };
    let id = attr_s("id")?;
    let title = attr_s("title")?;
    let language = attr_s("language")?;
    let year = item
        .get("year")
        .and_then(|v| v.as_n().ok())
        .ok_or_else(|| CoreError::Repository("item missing year".into()))?;

    let id = MovieId::parse(id).map_err(|e| CoreError::Repository(format!("bad id in item: {e}")))?;
    let year = year
        .parse::<i32>()
        .map_err(|e| CoreError::Repository(format!("bad year in item: {e}")))?;
    Ok(Movie {
        id,
        title: title.to_string(),
        year,
        language: language.to_string(),
    })
}

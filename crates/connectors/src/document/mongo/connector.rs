use crate::{
    adapter::{BackendKind, Connector, ConnectorState, Lifecycle},
    debug::log_query,
    document::mongo::{
        convert::{from_bson, nest, set_document, to_native_row},
        filter::{MongoFilterCompiler, sort_document},
        identity::id_candidates,
        schema::{ID_FIELD, infer_fields},
    },
    error::AdapterError,
    marshal::{DefaultMarshaller, TypeMarshaller},
    registry::ConnectOptions,
    requests::ListRequest,
    sql::base::{adapter::not_found, error::DbError},
};
use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures_util::TryStreamExt;
use model::{
    core::value::Value,
    filter::{Filter, OperatorSupport, QueryFamily},
    pagination::page::{Bounds, MinMax},
    records::row::NativeRow,
    resource::{field::FieldDescriptor, resource::Resource},
};
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

pub static MONGO_OPERATORS: OperatorSupport =
    OperatorSupport::all("mongodb", QueryFamily::Document);

/// Connector over the default database of a MongoDB connection string.
///
/// The driver owns pooling and reconnection; the connector only tracks its
/// own lifecycle.
pub struct MongoConnector {
    client: Client,
    database: Database,
    lifecycle: Lifecycle,
    sample_size: usize,
    marshaller: DefaultMarshaller,
}

impl MongoConnector {
    pub async fn connect(url: &str, options: ConnectOptions) -> Result<Self, AdapterError> {
        let client = Client::with_uri_str(url).await.map_err(DbError::from)?;
        let database = client.default_database().ok_or_else(|| {
            AdapterError::Configuration("MongoDB connection string names no database".into())
        })?;
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(DbError::from)?;

        let lifecycle = Lifecycle::new();
        lifecycle.mark_connected()?;
        info!("Connected to MongoDB database `{}`", database.name());
        Ok(MongoConnector {
            client,
            database,
            lifecycle,
            sample_size: options.schema_sample_size,
            marshaller: DefaultMarshaller,
        })
    }

    fn collection(&self, name: &str) -> Result<Collection<Document>, AdapterError> {
        self.lifecycle.ensure_open()?;
        Ok(self.database.collection::<Document>(name))
    }

    fn compile(&self, resource: &Resource, filter: &Filter) -> Result<Document, AdapterError> {
        Ok(MongoFilterCompiler::new(resource).compile(filter)?)
    }

    /// The first id encoding under which a document exists.
    async fn locate(
        &self,
        collection: &Collection<Document>,
        id: &Value,
    ) -> Result<Option<(Bson, Document)>, AdapterError> {
        for candidate in id_candidates(id) {
            let filter = doc! { ID_FIELD: candidate.clone() };
            log_query("mongodb", &format!("{}.findOne", collection.name()), &filter);
            if let Some(found) = collection.find_one(filter).await.map_err(DbError::from)? {
                return Ok(Some((candidate, found)));
            }
        }
        Ok(None)
    }
}

fn paths(resource: &Resource) -> Vec<String> {
    resource.fields().iter().map(|f| f.name.clone()).collect()
}

#[async_trait]
impl Connector for MongoConnector {
    fn kind(&self) -> BackendKind {
        BackendKind::MongoDb
    }

    fn operator_support(&self) -> &'static OperatorSupport {
        &MONGO_OPERATORS
    }

    fn marshaller(&self) -> &dyn TypeMarshaller {
        &self.marshaller
    }

    fn state(&self) -> ConnectorState {
        self.lifecycle.state()
    }

    /// Infers fields from the most recently inserted documents.
    async fn discover_fields(&self, table: &str) -> Result<Vec<FieldDescriptor>, AdapterError> {
        let collection = self.collection(table)?;
        let limit = i64::try_from(self.sample_size).unwrap_or(i64::MAX);
        let samples: Vec<Document> = collection
            .find(doc! {})
            .sort(doc! { ID_FIELD: -1 })
            .limit(limit)
            .await
            .map_err(DbError::from)?
            .try_collect()
            .await
            .map_err(DbError::from)?;
        if samples.is_empty() {
            return Err(AdapterError::Configuration(format!(
                "Collection `{table}` is empty or missing; no fields to infer"
            )));
        }
        let fields = infer_fields(&samples);
        debug!(
            "Inferred {} fields in `{table}` from {} documents",
            fields.len(),
            samples.len()
        );
        Ok(fields)
    }

    async fn list(
        &self,
        resource: &Resource,
        request: &ListRequest,
    ) -> Result<Vec<NativeRow>, AdapterError> {
        let collection = self.collection(&resource.table)?;
        let filter = self.compile(resource, &request.filter)?;
        let sort = sort_document(&request.stable_sort(&resource.primary_key().name));
        log_query("mongodb", &format!("{}.find", resource.table), &(&filter, &sort));

        let mut find = collection.find(filter).sort(sort).skip(request.offset);
        if let Some(limit) = request.limit {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let docs: Vec<Document> = find
            .await
            .map_err(DbError::from)?
            .try_collect()
            .await
            .map_err(DbError::from)?;

        let paths = paths(resource);
        Ok(docs
            .iter()
            .map(|doc| to_native_row(&resource.table, doc, &paths))
            .collect())
    }

    async fn find_by_pk(
        &self,
        resource: &Resource,
        id: &Value,
    ) -> Result<Option<NativeRow>, AdapterError> {
        let collection = self.collection(&resource.table)?;
        let paths = paths(resource);
        Ok(self
            .locate(&collection, id)
            .await?
            .map(|(_, doc)| to_native_row(&resource.table, &doc, &paths)))
    }

    async fn count(&self, resource: &Resource, filter: &Filter) -> Result<u64, AdapterError> {
        let collection = self.collection(&resource.table)?;
        let filter = self.compile(resource, filter)?;
        log_query("mongodb", &format!("{}.countDocuments", resource.table), &filter);
        Ok(collection
            .count_documents(filter)
            .await
            .map_err(DbError::from)?)
    }

    async fn min_max(
        &self,
        resource: &Resource,
        columns: &[String],
    ) -> Result<MinMax<Value>, AdapterError> {
        if columns.is_empty() {
            return Ok(Vec::new());
        }
        let collection = self.collection(&resource.table)?;
        let mut group = doc! { ID_FIELD: Bson::Null };
        for (i, column) in columns.iter().enumerate() {
            group.insert(format!("min_{i}"), doc! { "$min": format!("${column}") });
            group.insert(format!("max_{i}"), doc! { "$max": format!("${column}") });
        }
        let pipeline = vec![doc! { "$group": group }];
        log_query("mongodb", &format!("{}.aggregate", resource.table), &pipeline);

        let results: Vec<Document> = collection
            .aggregate(pipeline)
            .await
            .map_err(DbError::from)?
            .try_collect()
            .await
            .map_err(DbError::from)?;
        let Some(result) = results.into_iter().next() else {
            return Ok(Vec::new());
        };
        let bound = |key: String| result.get(&key).map_or(Value::Null, from_bson);
        Ok(columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let bounds = Bounds {
                    min: bound(format!("min_{i}")),
                    max: bound(format!("max_{i}")),
                };
                (column.clone(), bounds)
            })
            .collect())
    }

    async fn create(&self, resource: &Resource, row: NativeRow) -> Result<Value, AdapterError> {
        let collection = self.collection(&resource.table)?;
        let doc = nest(row)?;
        log_query("mongodb", &format!("{}.insertOne", resource.table), &doc);
        let result = collection.insert_one(doc).await.map_err(DbError::from)?;
        Ok(from_bson(&result.inserted_id))
    }

    async fn update(
        &self,
        resource: &Resource,
        id: &Value,
        values: NativeRow,
    ) -> Result<(), AdapterError> {
        let collection = self.collection(&resource.table)?;
        if values.is_empty() {
            return match self.locate(&collection, id).await? {
                Some(_) => Ok(()),
                None => Err(not_found(resource, id)),
            };
        }
        let update = doc! { "$set": set_document(values)? };
        for candidate in id_candidates(id) {
            let filter = doc! { ID_FIELD: candidate };
            log_query("mongodb", &format!("{}.updateOne", resource.table), &(&filter, &update));
            let result = collection
                .update_one(filter, update.clone())
                .await
                .map_err(DbError::from)?;
            if result.matched_count > 0 {
                return Ok(());
            }
        }
        Err(not_found(resource, id))
    }

    async fn delete(&self, resource: &Resource, id: &Value) -> Result<bool, AdapterError> {
        let collection = self.collection(&resource.table)?;
        for candidate in id_candidates(id) {
            let filter = doc! { ID_FIELD: candidate };
            log_query("mongodb", &format!("{}.deleteOne", resource.table), &filter);
            let result = collection.delete_one(filter).await.map_err(DbError::from)?;
            if result.deleted_count > 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn close(&self) -> Result<(), AdapterError> {
        if !self.lifecycle.mark_closed() {
            return Ok(());
        }
        self.client.clone().shutdown().await;
        info!("MongoDB client shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Live tests run against the database named by `POLYSTORE_TEST_MONGO_URL`:
    //! `cargo test -p connectors -- --ignored`.

    use super::*;
    use bson::oid::ObjectId;
    use model::{core::data_type::CanonicalType, filter::Operator, pagination::sort::SortSpec};

    async fn live() -> Option<MongoConnector> {
        let url = std::env::var("POLYSTORE_TEST_MONGO_URL").ok()?;
        Some(MongoConnector::connect(&url, ConnectOptions::default()).await.unwrap())
    }

    #[tokio::test]
    async fn test_url_without_database_is_rejected() {
        let err = MongoConnector::connect(
            "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200",
            ConnectOptions::default(),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, AdapterError::Configuration(_)));
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_documents_round() {
        let Some(connector) = live().await else { return };
        let collection = connector.collection("polystore_flats").unwrap();
        collection.drop().await.unwrap();
        collection
            .insert_many(vec![
                doc! { "_id": "a1", "rooms": 2, "address": { "city": "Lyon" } },
                doc! { "_id": "a2", "rooms": 4, "address": { "city": "Paris" } },
            ])
            .await
            .unwrap();

        let fields = connector.discover_fields("polystore_flats").await.unwrap();
        assert_eq!(fields[0].name, "_id");
        let city = fields.iter().find(|f| f.name == "address.city").unwrap();
        assert_eq!(city.canonical_type, CanonicalType::String);
        let resource = Resource::new("flats", "polystore_flats", "mongo", fields).unwrap();

        let request = ListRequest::builder()
            .filter(Filter::compare("rooms", Operator::Gt, Value::String("2".into())))
            .sort(vec![SortSpec::desc("rooms")])
            .build();
        let rows = connector.list(&resource, &request).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_value("address.city"), Value::String("Paris".into()));

        let id = Value::String("a1".into());
        let mut values = NativeRow::new("polystore_flats", vec![]);
        values.push("address.city", Value::String("Nice".into()));
        connector.update(&resource, &id, values).await.unwrap();
        let row = connector.find_by_pk(&resource, &id).await.unwrap().unwrap();
        assert_eq!(row.get_value("address.city"), Value::String("Nice".into()));

        assert!(connector.delete(&resource, &id).await.unwrap());
        assert!(!connector.delete(&resource, &id).await.unwrap());
        connector.close().await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_object_id_keys() {
        let Some(connector) = live().await else { return };
        let collection = connector.collection("polystore_oid_flats").unwrap();
        collection.drop().await.unwrap();
        let oid = ObjectId::new();
        collection
            .insert_many(vec![
                doc! { "_id": oid, "rooms": 2, "city": "Lyon" },
                doc! { "_id": ObjectId::new(), "rooms": 3, "city": "Oslo" },
            ])
            .await
            .unwrap();

        let fields = connector.discover_fields("polystore_oid_flats").await.unwrap();
        let resource = Resource::new("flats", "polystore_oid_flats", "mongo", fields).unwrap();
        let id = Value::String(oid.to_hex());

        let row = connector.find_by_pk(&resource, &id).await.unwrap().unwrap();
        assert_eq!(row.get_value("_id"), Value::ObjectId(oid.bytes()));

        let mut values = NativeRow::new("polystore_oid_flats", vec![]);
        values.push("city", Value::String("Nice".into()));
        connector.update(&resource, &id, values).await.unwrap();
        let row = connector.find_by_pk(&resource, &id).await.unwrap().unwrap();
        assert_eq!(row.get_value("city"), Value::String("Nice".into()));

        let others = Filter::and(vec![
            Filter::compare("city", Operator::Eq, Value::String("Nice".into())),
            Filter::compare("_id", Operator::Ne, id.clone()),
        ]);
        assert_eq!(connector.count(&resource, &others).await.unwrap(), 0);

        assert!(connector.delete(&resource, &id).await.unwrap());
        assert!(connector.find_by_pk(&resource, &id).await.unwrap().is_none());
        assert!(!connector.delete(&resource, &id).await.unwrap());
        connector.close().await.unwrap();
    }
}

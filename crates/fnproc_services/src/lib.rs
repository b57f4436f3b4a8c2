//! Collaborators processors use to reach the outside world.
//!
//! Nothing here is required by the execution core; processors opt in.

pub mod casting;
pub mod http;
pub mod mime;
pub mod record_store;

pub use casting::{cast, cast_object, CastOptions, CastResult, CastType, FieldSchema};
pub use http::{
    ContentType, FileField, FormField, HttpError, HttpResponse, HttpService, RequestBody,
    RequestConfig,
};
pub use record_store::{
    Criteria, CriteriaBuilder, FilterCondition, FilterOperator, FilterValue, RecordStoreAuth,
    RecordStoreClient, RecordStoreUrl, SortOrder,
};

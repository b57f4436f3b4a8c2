//! Record-store client: criteria builder and multipart data push.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::{
    ContentType, FileField, FormField, HttpError, HttpHeaders, HttpParams, HttpResponse,
    HttpService, RequestBody, RequestConfig,
};
use crate::mime::mime_type_for_filename;

pub const DEFAULT_DOMAIN: &str = "coreb.app";
pub const RECORD_ID_PARAM: &str = "$record_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "$eq")]
    Equals,
    #[serde(rename = "$neq")]
    NotEquals,
    #[serde(rename = "$text")]
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub field: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl FilterCondition {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<FilterValue>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginate {
    pub items: u32,
    pub page: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<BTreeMap<String, Vec<(FilterOperator, FilterValue)>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<BTreeMap<String, SortOrder>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paginate: Option<Paginate>,
}

impl Criteria {
    pub fn to_json(&self) -> String {
        // Only string keys and plain values: serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Parses criteria JSON, rejecting unknown operators, malformed filter
/// pairs and unknown sort orders.
pub fn parse_criteria(criteria_json: &str) -> Option<Criteria> {
    serde_json::from_str(criteria_json).ok()
}

#[derive(Debug, Clone, Default)]
pub struct CriteriaBuilder {
    criteria: Criteria,
}

impl CriteriaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filter(
        &mut self,
        field: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<FilterValue>,
    ) -> &mut Self {
        self.criteria
            .filters
            .get_or_insert_with(BTreeMap::new)
            .entry(field.into())
            .or_default()
            .push((operator, value.into()));
        self
    }

    pub fn add_filters(&mut self, conditions: impl IntoIterator<Item = FilterCondition>) -> &mut Self {
        for condition in conditions {
            self.add_filter(condition.field, condition.operator, condition.value);
        }
        self
    }

    pub fn set_fields(&mut self, fields: Vec<String>) -> &mut Self {
        self.criteria.fields = Some(fields);
        self
    }

    pub fn add_field(&mut self, field: impl Into<String>) -> &mut Self {
        let field = field.into();
        let fields = self.criteria.fields.get_or_insert_with(Vec::new);
        if !fields.contains(&field) {
            fields.push(field);
        }
        self
    }

    pub fn set_sort(&mut self, field: impl Into<String>, order: SortOrder) -> &mut Self {
        self.criteria
            .sort
            .get_or_insert_with(BTreeMap::new)
            .insert(field.into(), order);
        self
    }

    pub fn set_pagination(&mut self, items: u32, page: u32) -> &mut Self {
        self.criteria.paginate = Some(Paginate { items, page });
        self
    }

    pub fn reset(&mut self) -> &mut Self {
        self.criteria = Criteria::default();
        self
    }

    pub fn build(&self) -> Criteria {
        self.criteria.clone()
    }

    pub fn to_json(&self) -> String {
        self.criteria.to_json()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStoreAuth {
    QueryKey(String),
    BearerToken(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStoreUrl {
    pub namespace: String,
    pub domain: Option<String>,
}

impl RecordStoreUrl {
    pub fn base_url(&self) -> String {
        let domain = self.domain.as_deref().unwrap_or(DEFAULT_DOMAIN);
        format!("https://service.{}.{domain}", self.namespace)
    }
}

#[derive(Debug, Clone)]
pub struct RecordStoreClient {
    id: String,
    http: HttpService,
    default_params: HttpParams,
    default_headers: HttpHeaders,
}

impl RecordStoreClient {
    pub fn new(id: impl Into<String>, url: &RecordStoreUrl, auth: RecordStoreAuth) -> Result<Self, HttpError> {
        Self::with_base_url(id, &url.base_url(), auth)
    }

    pub fn with_base_url(
        id: impl Into<String>,
        base_url: &str,
        auth: RecordStoreAuth,
    ) -> Result<Self, HttpError> {
        let mut default_params = HttpParams::new();
        let mut default_headers = HttpHeaders::new();
        match auth {
            RecordStoreAuth::QueryKey(key) => {
                default_params.insert("key".to_string(), Value::String(key));
            }
            RecordStoreAuth::BearerToken(token) => {
                default_headers.insert("Authorization".to_string(), format!("Bearer {token}"));
            }
        }

        Ok(Self {
            id: id.into(),
            http: HttpService::new(base_url, HttpHeaders::new())?,
            default_params,
            default_headers,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Criteria identifying the affected record, wrapped in parentheses.
    pub fn affected_record_criteria(&self, filters: &[FilterCondition]) -> String {
        let mut builder = CriteriaBuilder::new();
        builder.add_filters(filters.iter().cloned());
        format!("({})", builder.to_json())
    }

    pub fn push_data_file(&self, content: impl Into<Vec<u8>>, filename: &str) -> FormField {
        FormField::File(
            FileField::new(content, filename).with_mime_type(mime_type_for_filename(filename)),
        )
    }

    pub async fn push(
        &self,
        affected_record: &str,
        data: Vec<(String, FormField)>,
    ) -> Result<HttpResponse, HttpError> {
        let mut params = self.default_params.clone();
        params.insert(RECORD_ID_PARAM.to_string(), Value::String(affected_record.to_string()));

        let config = RequestConfig {
            headers: self.default_headers.clone(),
            params,
            timeout: None,
            content_type: ContentType::FormData,
        };

        tracing::debug!(store = %self.id, affected_record, fields = data.len(), "pushing record data");
        self.http
            .post(
                &format!("/v1/external/pod/{}", self.id),
                Some(RequestBody::Fields(data)),
                &config,
            )
            .await
    }
}

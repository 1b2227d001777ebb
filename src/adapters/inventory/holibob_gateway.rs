//! Holibob inventory gateway (GraphQL product discovery).

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::{InventoryError, InventoryFilter, InventoryGateway, InventoryPage, InventoryProduct};

const PRODUCT_LIST_QUERY: &str = r#"
query ProductDiscovery($filter: ProductListFilter, $pageSize: Int) {
  productList(filter: $filter, pageSize: $pageSize) {
    recordCount
    nodes {
      id
      name
      categoryList { nodes { name } }
    }
  }
}
"#;

/// Configuration for the Holibob gateway.
#[derive(Debug, Clone)]
pub struct HolibobConfig {
    pub api_url: String,
    api_key: Secret<String>,
    pub partner_id: Option<String>,
    pub timeout: Duration,
}

impl HolibobConfig {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: Secret::new(api_key.into()),
            partner_id: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_partner_id(mut self, partner_id: impl Into<String>) -> Self {
        self.partner_id = Some(partner_id.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Inventory gateway backed by the Holibob partner API.
pub struct HolibobInventoryGateway {
    config: HolibobConfig,
    client: Client,
}

impl HolibobInventoryGateway {
    pub fn new(config: HolibobConfig) -> Result<Self, InventoryError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| InventoryError::Network(format!("HTTP client: {e}")))?;
        Ok(Self { config, client })
    }
}

fn build_request(filter: &InventoryFilter, page_size: u32) -> GraphQlRequest<'static> {
    GraphQlRequest {
        query: PRODUCT_LIST_QUERY,
        variables: Variables {
            filter: ProductListFilter {
                place_name: filter.destination.clone(),
                search: filter.category.clone(),
            },
            page_size,
        },
    }
}

fn parse_page(body: GraphQlResponse) -> Result<InventoryPage, InventoryError> {
    if let Some(first) = body.errors.as_ref().and_then(|errors| errors.first()) {
        return Err(InventoryError::Api {
            status: 200,
            message: first.message.clone(),
        });
    }

    let list = body
        .data
        .and_then(|d| d.product_list)
        .ok_or_else(|| InventoryError::Parse("missing productList".to_string()))?;

    let products = list
        .nodes
        .into_iter()
        .map(|node| InventoryProduct {
            id: node.id,
            name: node.name,
            category: node
                .category_list
                .and_then(|c| c.nodes.into_iter().next())
                .map(|c| c.name),
        })
        .collect();

    Ok(InventoryPage {
        products,
        total_count: list.record_count,
    })
}

#[async_trait]
impl InventoryGateway for HolibobInventoryGateway {
    async fn discover(&self, filter: &InventoryFilter, page_size: u32) -> Result<InventoryPage, InventoryError> {
        let mut request = self
            .client
            .post(&self.config.api_url)
            .header("x-api-key", self.config.api_key.expose_secret())
            .json(&build_request(filter, page_size));
        if let Some(partner) = &self.config.partner_id {
            request = request.header("x-holibob-partner", partner);
        }

        let response = request
            .send()
            .await
            .map_err(|e| InventoryError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InventoryError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| InventoryError::Parse(e.to_string()))?;
        parse_page(body)
    }
}

// ----- GraphQL Types -----

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Variables,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Variables {
    filter: ProductListFilter,
    page_size: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductListFilter {
    place_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ResponseData>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseData {
    product_list: Option<ProductList>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductList {
    #[serde(default)]
    record_count: u32,
    #[serde(default)]
    nodes: Vec<ProductNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductNode {
    id: String,
    name: String,
    category_list: Option<CategoryList>,
}

#[derive(Debug, Deserialize)]
struct CategoryList {
    #[serde(default)]
    nodes: Vec<CategoryNode>,
}

#[derive(Debug, Deserialize)]
struct CategoryNode {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_destination_and_category() {
        let filter = InventoryFilter::new("Lisbon").with_category("food tours");
        let json = serde_json::to_value(build_request(&filter, 10)).unwrap();

        assert_eq!(json["variables"]["filter"]["placeName"], "Lisbon");
        assert_eq!(json["variables"]["filter"]["search"], "food tours");
        assert_eq!(json["variables"]["pageSize"], 10);
    }

    #[test]
    fn parses_product_list() {
        let body: GraphQlResponse = serde_json::from_value(serde_json::json!({
            "data": {"productList": {
                "recordCount": 42,
                "nodes": [
                    {"id": "p1", "name": "Tapas Walk", "categoryList": {"nodes": [{"name": "Food"}]}},
                    {"id": "p2", "name": "Tram Ride"}
                ]
            }}
        }))
        .unwrap();

        let page = parse_page(body).unwrap();
        assert_eq!(page.total_count, 42);
        assert_eq!(page.products.len(), 2);
        assert_eq!(page.products[0].category.as_deref(), Some("Food"));
        assert_eq!(page.products[1].category, None);
    }

    #[test]
    fn graphql_errors_surface_as_api_errors() {
        let body: GraphQlResponse = serde_json::from_value(serde_json::json!({
            "data": null,
            "errors": [{"message": "Unknown place"}]
        }))
        .unwrap();

        assert!(matches!(parse_page(body), Err(InventoryError::Api { .. })));
    }
}

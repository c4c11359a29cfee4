//! Product route handlers.
//!
//! The catalog region lists every product the backend returns, in the order
//! it returns them. Creating a product goes straight to the backend.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use shopfront_core::{CurrencyCode, NewProduct, Price, Product};

use super::{ShellPage, open_shell, render};
use crate::error::Result;
use crate::session::SessionStore;
use crate::shell::View;
use crate::state::AppState;

/// Shown in place of the list when the catalog cannot be fetched.
pub const CATALOG_ERROR_MESSAGE: &str = "Could not load products. Please try again.";

/// Shown when the backend refuses or fails a product creation.
const CREATE_ERROR_MESSAGE: &str = "Could not add product. Please try again.";

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub price: String,
    pub description: String,
    pub image_url: String,
    pub rating: String,
    pub featured: bool,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            price: product.price.display(),
            description: product.description.clone(),
            image_url: product.image_url.clone(),
            rating: format!("{:.1}", product.average_rating),
            featured: product.featured,
        }
    }
}

/// Catalog region.
#[derive(Template, WebTemplate)]
#[template(path = "partials/catalog.html")]
pub struct CatalogRegion {
    pub products: Vec<ProductView>,
    pub signed_in: bool,
    pub error: Option<String>,
}

/// Fetch the catalog and build its region.
///
/// A failed fetch renders the error state instead of the list.
pub async fn catalog_region(state: &AppState, store: &SessionStore) -> CatalogRegion {
    let signed_in = store.is_signed_in();

    match state.backend().all_products().await {
        Ok(products) => CatalogRegion {
            products: products.iter().map(ProductView::from).collect(),
            signed_in,
            error: None,
        },
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch products");
            CatalogRegion {
                products: Vec::new(),
                signed_in,
                error: Some(CATALOG_ERROR_MESSAGE.to_string()),
            }
        }
    }
}

/// Display the catalog page.
#[instrument(skip_all)]
pub async fn page(State(state): State<AppState>, store: SessionStore) -> Result<Html<String>> {
    let (shell, _ticket) = open_shell(&state, &store, View::Catalog).await;
    let content = render(&catalog_region(&state, &store).await)?;

    let page = ShellPage {
        shell,
        title: "Products",
        content,
    };
    Ok(Html(render(&page)?))
}

/// Add-product form, with the outcome of the last submission.
#[derive(Template, WebTemplate, Default)]
#[template(path = "partials/new_product.html")]
pub struct NewProductForm {
    pub message: Option<String>,
    pub error: Option<String>,
    pub name: String,
    pub price: String,
    pub description: String,
    pub image_url: String,
    pub featured: bool,
}

/// Create product form data.
#[derive(Debug, Deserialize)]
pub struct CreateProductForm {
    pub name: String,
    pub price: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    pub featured: Option<String>,
}

impl CreateProductForm {
    fn is_featured(&self) -> bool {
        matches!(self.featured.as_deref(), Some("true" | "on"))
    }

    /// Convert to a backend request.
    fn to_new_product(&self) -> std::result::Result<NewProduct, String> {
        let amount = Decimal::from_str(self.price.trim())
            .map_err(|_| "Price must be a number".to_string())?;

        let product = NewProduct {
            name: self.name.trim().to_string(),
            price: Price::new(amount, CurrencyCode::default()),
            description: self.description.trim().to_string(),
            image_url: self.image_url.trim().to_string(),
            featured: self.is_featured(),
        };
        product.validate().map_err(|e| capitalize(&e.to_string()))?;
        Ok(product)
    }

    /// Re-populate the form after a failed submission.
    fn with_error(self, error: String) -> NewProductForm {
        let featured = self.is_featured();
        NewProductForm {
            message: None,
            error: Some(error),
            name: self.name,
            price: self.price,
            description: self.description,
            image_url: self.image_url,
            featured,
        }
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Display the add-product page.
#[instrument(skip_all)]
pub async fn new_page(State(state): State<AppState>, store: SessionStore) -> Result<Html<String>> {
    let (shell, _ticket) = open_shell(&state, &store, View::Catalog).await;

    let page = ShellPage {
        shell,
        title: "Add a product",
        content: render(&NewProductForm::default())?,
    };
    Ok(Html(render(&page)?))
}

/// Create a product.
///
/// HTMX submissions get the form fragment back; plain form posts get the
/// full page.
#[instrument(skip_all, fields(name = %form.name))]
pub async fn create(
    State(state): State<AppState>,
    store: SessionStore,
    headers: HeaderMap,
    Form(form): Form<CreateProductForm>,
) -> Result<Response> {
    let outcome = match form.to_new_product() {
        Err(error) => form.with_error(error),
        Ok(product) => match state.backend().add_product(product).await {
            Ok(created) => {
                tracing::info!(product_id = %created.id, "Product created");
                NewProductForm {
                    message: Some(format!(
                        "Added product {} with id {}",
                        created.name, created.id
                    )),
                    ..NewProductForm::default()
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to create product");
                form.with_error(CREATE_ERROR_MESSAGE.to_string())
            }
        },
    };

    if headers.contains_key("hx-request") {
        return Ok(outcome.into_response());
    }

    let (shell, _ticket) = open_shell(&state, &store, View::Catalog).await;
    let page = ShellPage {
        shell,
        title: "Add a product",
        content: render(&outcome)?,
    };
    Ok(Html(render(&page)?).into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopfront_core::ProductId;

    use super::*;

    fn product(name: &str) -> Product {
        Product {
            id: ProductId::generate(),
            name: name.to_string(),
            price: Price::new(Decimal::new(1999, 2), CurrencyCode::USD),
            description: format!("{name} description"),
            image_url: format!("https://img.test/{name}.png"),
            average_rating: 4.5,
            featured: false,
        }
    }

    fn form(name: &str, price: &str) -> CreateProductForm {
        CreateProductForm {
            name: name.to_string(),
            price: price.to_string(),
            description: "Hot".to_string(),
            image_url: String::new(),
            featured: Some("true".to_string()),
        }
    }

    #[test]
    fn test_product_view_formats_price_and_rating() {
        let view = ProductView::from(&product("Teapot"));
        assert_eq!(view.price, "$19.99");
        assert_eq!(view.rating, "4.5");
    }

    #[test]
    fn test_empty_catalog_renders_zero_entries() {
        let html = CatalogRegion {
            products: Vec::new(),
            signed_in: false,
            error: None,
        }
        .render()
        .unwrap();

        assert!(html.contains(r#"id="product-list""#));
        assert!(!html.contains(r#"class="product""#));
        assert!(!html.contains("catalog-error"));
    }

    #[test]
    fn test_catalog_renders_in_order_with_add_action() {
        let products = [product("Tea"), product("Cup")];
        let html = CatalogRegion {
            products: products.iter().map(ProductView::from).collect(),
            signed_in: true,
            error: None,
        }
        .render()
        .unwrap();

        let tea = html.find("Tea").unwrap();
        let cup = html.find("Cup").unwrap();
        assert!(tea < cup);
        assert_eq!(html.matches(r#"hx-post="/cart/add""#).count(), 2);
        assert!(html.contains(&format!(r#"value="{}""#, products[0].id)));
    }

    #[test]
    fn test_catalog_signed_out_prompts_login() {
        let html = CatalogRegion {
            products: vec![ProductView::from(&product("Tea"))],
            signed_in: false,
            error: None,
        }
        .render()
        .unwrap();

        assert!(!html.contains("/cart/add"));
        assert!(html.contains("sign-in-prompt"));
    }

    #[test]
    fn test_catalog_error_state() {
        let html = CatalogRegion {
            products: Vec::new(),
            signed_in: true,
            error: Some(CATALOG_ERROR_MESSAGE.to_string()),
        }
        .render()
        .unwrap();

        assert!(html.contains(CATALOG_ERROR_MESSAGE));
        assert!(!html.contains(r#"id="product-list""#));
    }

    #[test]
    fn test_form_converts_to_new_product() {
        let product = form("  Teapot ", "25.00").to_new_product().unwrap();
        assert_eq!(product.name, "Teapot");
        assert_eq!(product.price.amount, Decimal::new(2500, 2));
        assert!(product.featured);
    }

    #[test]
    fn test_form_rejects_bad_price_and_empty_name() {
        assert_eq!(
            form("Teapot", "cheap").to_new_product().unwrap_err(),
            "Price must be a number"
        );
        assert_eq!(
            form(" ", "1").to_new_product().unwrap_err(),
            "Product name cannot be empty"
        );
    }

    #[test]
    fn test_failed_form_keeps_values() {
        let rendered = form("Teapot", "cheap")
            .with_error("Price must be a number".to_string())
            .render()
            .unwrap();
        assert!(rendered.contains(r#"value="Teapot""#));
        assert!(rendered.contains(r#"value="cheap""#));
        assert!(rendered.contains("checked"));
    }
}
